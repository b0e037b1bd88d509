//! # Service Layer
//!
//! Caller-facing connection contexts built on the codec and correlation
//! layers.

pub mod client;

pub use client::{Client, GetValue};
