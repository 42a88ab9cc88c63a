//! Debug-only reentrancy guard.
//!
//! The stores call user code (`K: Hash`, `K: Eq`) while a probe or split is
//! in flight. If that code reaches back into the same store, it would observe
//! a half-moved entry. In debug builds the guard turns that into a panic; in
//! release builds it compiles away.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-store tracker. Public entry points hold `self.reentrancy.enter()` for
/// their whole body; private helpers must not enter again.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Stores are single-threaded: keep every embedding type !Send + !Sync.
    _single_threaded: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _single_threaded: PhantomData,
        }
    }

    /// Mark the store busy until the returned guard drops.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrancy detected: store accessed from its own Hash/Eq code"
            );
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard {
                _owner: PhantomData,
            };
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_entries_are_fine() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter();
        }
        let _g = r.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn guard_released_after_panic_unwinds() {
        let r = DebugReentrancy::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = r.enter();
            panic!("user code failed");
        }));
        let _g = r.enter();
    }
}
