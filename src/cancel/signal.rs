use crossbeam::channel::{Receiver, Sender, bounded};
use std::sync::{Mutex, PoisonError};

/// One-shot broadcast signal.
///
/// Never carries a message: firing drops the only sender, which disconnects
/// the channel and wakes every receiver blocked in `select!` at once.
#[derive(Debug)]
pub(crate) struct Signal {
    trigger: Mutex<Option<Sender<()>>>,
    fired: Receiver<()>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        let (trigger, fired) = bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            fired,
        }
    }

    /// Fire the signal. Returns false if it had already fired.
    pub(crate) fn fire(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Receiver that becomes ready (disconnected) once the signal fires
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.fired
    }
}
