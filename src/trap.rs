//! Single-slot failure holder shared across threads, and the boundary that
//! turns panics in caller code into faults.
//!
//! The first recorded fault wins; later faults are dropped. Backed by a
//! `OnceLock` so readers on other threads always observe a fully written value.

use std::backtrace::Backtrace;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Once, OnceLock};

use crate::error::{ParallelError, TrappedPanic};

/// A fault that poisons a worker pool
#[derive(Debug, Clone)]
pub(crate) enum Fault {
    /// A mapper panicked on one of the pool's workers
    Panicked(TrappedPanic),
    /// The pool was shut down
    ShutDown,
}

impl From<Fault> for ParallelError {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Panicked(panic) => ParallelError::Trapped(panic),
            Fault::ShutDown => ParallelError::PoolShutDown,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FailureTrap {
    slot: OnceLock<Fault>,
}

impl FailureTrap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `fault` unless another fault got there first.
    ///
    /// Returns true when this call's fault is the one kept.
    pub(crate) fn record(&self, fault: Fault) -> bool {
        self.slot.set(fault).is_ok()
    }

    pub(crate) fn get(&self) -> Option<&Fault> {
        self.slot.get()
    }

    pub(crate) fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }
}

thread_local! {
    /// Set while caller code runs inside [`catch`] on this thread
    static ARMED: Cell<bool> = const { Cell::new(false) };
    static PANIC_SITE: Cell<Option<Backtrace>> = const { Cell::new(None) };
}

static HOOK: Once = Once::new();

/// Chain a panic hook that records the backtrace at the panic site.
///
/// Only panics raised inside [`catch`] are recorded; every panic still goes
/// to the previously installed hook.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if ARMED.try_with(Cell::get).unwrap_or(false) {
                let _ = PANIC_SITE.try_with(|site| site.set(Some(Backtrace::force_capture())));
            }
            previous(info);
        }));
    });
}

/// Run caller code, trapping a panic together with its payload and the
/// backtrace of the panicking frame.
pub(crate) fn catch<T>(f: impl FnOnce() -> T) -> Result<T, TrappedPanic> {
    install_hook();

    let outer = ARMED.replace(true);
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    ARMED.set(outer);

    // Also clears a site left behind by a panic the caller caught itself.
    let site = PANIC_SITE.take();
    outcome.map_err(|payload| {
        TrappedPanic::with_backtrace(payload, site.unwrap_or_else(Backtrace::force_capture))
    })
}
