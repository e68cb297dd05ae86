use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Identifier of an attached tray icon. Unique per process.
///
/// Every event delivered through a [`TrayProxy`][`crate::TrayProxy`] carries the `TrayId` of the
/// backend that raised it, so events from a handle that has since been replaced can be told apart.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrayId(usize);

impl TrayId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn into_raw(self) -> usize {
        self.0
    }

    /// This should only be called with integers returned from [`TrayId::into_raw`].
    pub const fn from_raw(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Debug for TrayId {
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmtr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_ids_are_distinct() {
        let a = TrayId::next();
        let b = TrayId::next();
        assert_ne!(a, b);
        assert_eq!(TrayId::from_raw(a.into_raw()), a);
    }
}
