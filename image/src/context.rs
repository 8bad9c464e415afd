//! Host hooks for the GIF player: delay, cancellation, per-frame callback.

use core::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between the GIF player and the
/// host.
///
/// The host keeps a reference, the player polls it at every 10 ms tick of
/// the inter-frame delay and returns promptly once it fires. A single
/// atomic is all the synchronisation the single-threaded model needs.
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request that the current decode stop at the next tick boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Re-arm the token for another decode.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Millisecond delay primitive supplied by the host.
pub trait Clock {
    fn sleep_ms(&mut self, ms: u32);
}

/// A clock that never waits. Useful for tests and for hosts that pace
/// frames themselves through the per-frame callback.
#[derive(Debug, Default)]
pub struct NoDelay;

impl Clock for NoDelay {
    fn sleep_ms(&mut self, _ms: u32) {}
}

/// Playback options for [`crate::load_gif`].
pub struct GifOptions<'a> {
    /// Delay source for inter-frame pacing.
    pub clock: &'a mut dyn Clock,
    /// Checked between 10 ms ticks; see [`CancelToken`].
    pub cancel: &'a CancelToken,
    /// Invoked after each frame is composited, before the inter-frame
    /// sleep.
    pub on_frame: Option<&'a mut dyn FnMut()>,
}
