#![deny(unsafe_code)]
//! Content-defined chunking of byte streams.
//!
//! A [`Chunker`] wraps any [`std::io::Read`] and yields variable-length
//! [`Block`]s whose boundaries are chosen by the data itself: a block ends
//! where the low bits of the Rabin rolling fingerprint match a mask derived
//! from the configured average block size. Identical input always produces
//! identical blocks, and an edit near the start of a stream does not shift
//! the boundaries of later, unrelated content.
//!
//! Each emitted block carries its weak sum (the fingerprint at the boundary)
//! and strong sum (MD5 of the block bytes), ready for the dedup engine.

mod block;
mod chunker;
mod config;
mod error;

pub use block::Block;
pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::ChunkerError;
