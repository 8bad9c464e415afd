use rasterkit_fs::StreamError;
use thiserror::Error;

/// Errors surfaced by the image decoders.
///
/// A failed decode never unwinds pixels that were already painted; the
/// framebuffer simply keeps whatever rows completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The file does not start with the format's signature.
    #[error("bad file signature")]
    BadSignature,
    /// The file ended inside a structure the format requires.
    #[error("truncated file")]
    Truncated,
    /// The file is well-formed but uses an encoding outside the supported
    /// subset (e.g. a 8-bpp or RLE BMP).
    #[error("unsupported encoding")]
    Unsupported,
    /// The data stream contradicts itself (bad LZW code, palette index out
    /// of range, unknown block introducer).
    #[error("corrupt data stream")]
    Corrupt,
    /// The host's cancellation token fired between frames.
    #[error("decode cancelled")]
    Cancelled,
    /// The underlying byte stream failed.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}
