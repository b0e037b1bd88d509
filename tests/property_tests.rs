//! Property-based tests using proptest
//!
//! These tests validate protocol invariants across a wide range of randomly
//! generated inputs, ensuring robust behavior under all conditions.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::Bytes;
use memwire::core::codec::FrameAssembler;
use memwire::core::packet::{encode_set, Frame, Request};
use memwire::error::Result;
use proptest::prelude::*;

// Property: Set commands round-trip through encode and decode
proptest! {
    #[test]
    fn prop_set_roundtrip(
        key in prop::collection::vec(any::<u8>(), 0..512),
        value in prop::collection::vec(any::<u8>(), 0..4096),
        flags in any::<u32>(),
        expiry in any::<u32>(),
    ) {
        let bytes = encode_set(key.clone(), value.clone(), flags, expiry)
            .expect("inputs are within field widths");
        let frame = Frame::parse(&bytes).expect("encoder output parses");
        let decoded = frame.decode_request().expect("encoder output decodes");

        prop_assert_eq!(decoded, Request::Set {
            key: Bytes::from(key),
            value: Bytes::from(value),
            flags,
            expiry,
        });
    }
}

// Property: Encoding is deterministic
proptest! {
    #[test]
    fn prop_encode_deterministic(
        key in prop::collection::vec(any::<u8>(), 0..128),
        value in prop::collection::vec(any::<u8>(), 0..1024),
    ) {
        let bytes1 = encode_set(key.clone(), value.clone(), 7, 60).unwrap();
        let bytes2 = encode_set(key, value, 7, 60).unwrap();
        prop_assert_eq!(bytes1, bytes2);
    }
}

// Property: The length invariant holds on every decoded frame
proptest! {
    #[test]
    fn prop_length_invariant(
        key in prop::collection::vec(any::<u8>(), 0..256),
        value in prop::collection::vec(any::<u8>(), 0..2048),
    ) {
        let bytes = encode_set(key, value, 0, 0).unwrap();
        let frame = Frame::parse(&bytes).unwrap();

        let header = &frame.header;
        let value_len = header.total_body_length() as usize
            - header.extras_length() as usize
            - header.key_length() as usize;
        prop_assert_eq!(
            header.total_body_length() as usize,
            header.extras_length() as usize + header.key_length() as usize + value_len
        );
        prop_assert_eq!(frame.body.len(), header.total_body_length() as usize);
    }
}

// Property: Framing is invariant under any partition of the stream into
// chunks - the assembler yields the identical frame sequence
proptest! {
    #[test]
    fn prop_framing_partition_invariant(
        commands in prop::collection::vec(
            (
                prop::collection::vec(any::<u8>(), 0..32),
                prop::collection::vec(any::<u8>(), 0..64),
            ),
            1..6,
        ),
        split_seed in prop::collection::vec(1usize..64, 0..64),
    ) {
        let mut stream = Vec::new();
        for (key, value) in &commands {
            stream.extend_from_slice(&encode_set(key.clone(), value.clone(), 0, 0).unwrap());
        }

        // reference: feed the whole stream at once
        let mut reference = FrameAssembler::new();
        let whole: Vec<_> = reference
            .feed(&stream)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        reference.finish().unwrap();

        // partition the stream by the generated split sizes, cycling
        let mut assembler = FrameAssembler::new();
        let mut frames = Vec::new();
        let mut rest = &stream[..];
        let mut splits = split_seed.iter().copied().cycle();
        while !rest.is_empty() {
            let take = splits.next().unwrap_or(1).min(rest.len());
            let (chunk, tail) = rest.split_at(take);
            frames.extend(
                assembler
                    .feed(chunk)
                    .collect::<Result<Vec<_>>>()
                    .unwrap(),
            );
            rest = tail;
        }
        assembler.finish().unwrap();

        prop_assert_eq!(frames, whole);
    }
}

// Property: Any prefix of a valid stream never yields a partial frame -
// every yielded frame is complete and the remainder stays buffered
proptest! {
    #[test]
    fn prop_prefix_yields_only_complete_frames(
        key in prop::collection::vec(any::<u8>(), 0..32),
        value in prop::collection::vec(any::<u8>(), 0..64),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = encode_set(key, value, 1, 2).unwrap();
        let cut = cut.index(bytes.len() + 1);

        let mut assembler = FrameAssembler::new();
        let frames: Vec<_> = assembler
            .feed(&bytes[..cut])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        if cut < bytes.len() {
            prop_assert!(frames.is_empty());
            prop_assert_eq!(assembler.buffered(), cut);
        } else {
            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(assembler.buffered(), 0);
        }
    }
}
