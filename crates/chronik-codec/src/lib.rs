#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **chronik-codec** – Codec pipeline for the chronik event-sourcing engine.
//!
//! This crate turns domain events into stored records and back. The write
//! path composes `transcode → compress → encrypt` in that fixed order; the
//! read path inverts it and additionally runs the upcaster chain over the
//! decoded state before the record is handed to the domain layer.
//!
//! Compression and encryption are optional stages; an absent stage is the
//! identity transform, so the pipeline always has one shape.

pub mod cipher;
pub mod compress;
pub mod mapper;
pub mod transcoder;
pub mod upcast;

pub use cipher::{random_key, Aes256GcmCipher, Cipher, NONCE_LEN, TAG_LEN};
pub use compress::{Compressor, ZlibCompressor};
pub use mapper::{Mapper, TIMESTAMP_KEY};
pub use transcoder::{JsonTranscoder, Transcoding, DATA_KEY, TYPE_KEY};
pub use upcast::{Upcaster, UpcasterChain, SCHEMA_VERSION_KEY};
