//! Image decoders that paint straight into a rasterkit framebuffer.
//!
//! Two formats are consumed: uncompressed 24/32-bpp BMP and animated
//! GIF87a/89a. Both stream from a [`rasterkit_fs::ByteStream`] and write
//! through the framebuffer's own pixel path, so every target layout the
//! framebuffer supports works here too.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod bmp;
mod context;
mod error;
mod gif;

pub use bmp::load_bmp;
pub use context::{CancelToken, Clock, GifOptions, NoDelay};
pub use error::DecodeError;
pub use gif::load_gif;
