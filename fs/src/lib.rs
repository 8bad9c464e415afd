//! Byte-stream access contract between the image decoders and the host.
//!
//! The decoders never touch a filesystem directly; whatever the host uses
//! for storage is adapted to [`ByteStream`] and handed in. Opening and
//! closing are the adapter's business (construction and `Drop`), the
//! decoders only read, seek and tell.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

mod stream;

pub use stream::{ByteStream, SliceStream, StreamError, StreamResult};
