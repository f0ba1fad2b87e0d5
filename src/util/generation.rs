use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Supersedable polling sessions.
///
/// Each new session calls [`Generation::begin`]; loops holding an older token
/// see `is_current() == false` on their next check and exit without further
/// side effects.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
pub struct GenerationToken {
    current: Arc<AtomicU64>,
    value: u64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> GenerationToken {
        let value = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        GenerationToken {
            current: Arc::clone(&self.current),
            value,
        }
    }

    /// Invalidate every outstanding token without starting a new session.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }
}

impl GenerationToken {
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.value
    }
}
