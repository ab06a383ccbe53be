//! Lazily created JIT scratch memory, one per cache.

/// Two-phase holder for the engine's shared scratch.
///
/// Starts `Uninitialized`; the first successful JIT compile moves it to
/// `Ready` and it stays there until the cache is destroyed.
#[derive(Debug)]
pub enum JitContext<S> {
    Uninitialized,
    Ready(S),
}

impl<S> Default for JitContext<S> {
    fn default() -> Self {
        JitContext::Uninitialized
    }
}

impl<S> JitContext<S> {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, JitContext::Ready(_))
    }

    #[inline]
    pub fn scratch_mut(&mut self) -> Option<&mut S> {
        match self {
            JitContext::Ready(scratch) => Some(scratch),
            JitContext::Uninitialized => None,
        }
    }

    /// Runs `init` if no scratch exists yet. A failed `init` leaves the
    /// context uninitialized so a later compile can retry.
    ///
    /// Reach the scratch afterwards through [`scratch_mut`](Self::scratch_mut).
    pub fn ensure_with<E>(&mut self, init: impl FnOnce() -> Result<S, E>) -> Result<(), E> {
        if let JitContext::Uninitialized = self {
            *self = JitContext::Ready(init()?);
        }
        Ok(())
    }

    /// Drops the scratch and returns to `Uninitialized`.
    pub fn release(&mut self) -> Option<S> {
        match std::mem::replace(self, JitContext::Uninitialized) {
            JitContext::Ready(scratch) => Some(scratch),
            JitContext::Uninitialized => None,
        }
    }
}
