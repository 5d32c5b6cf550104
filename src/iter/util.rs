use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

///
/// Cooperative cancellation flag shared between a caller and an analysis.
///
/// Clones observe the same flag. The analysis checks it at every record
/// boundary and stops with a `Cancelled` error once it is raised.
///
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// raise the flag; cannot be lowered again
    pub fn cancel(&self) {
        self.flag.fetch_or(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
