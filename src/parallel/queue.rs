use crossbeam::channel::{SendError, Sender};
use std::fmt;

/// Submission side of an invocation.
///
/// Jobs sent here are mapped by exactly one worker each. The invocation ends
/// once every clone of the queue has been closed or dropped.
pub struct JobQueue<J> {
    sender: Sender<J>,
}

impl<J> JobQueue<J> {
    pub(crate) fn new(sender: Sender<J>) -> Self {
        Self { sender }
    }

    /// Submit one job, blocking while the queue is full.
    ///
    /// Fails only when no worker will ever receive the job, returning it.
    pub fn send(&self, job: J) -> Result<(), SendError<J>> {
        self.sender.send(job)
    }

    /// Submit every job from `jobs`, then close the queue
    pub fn send_all<I>(self, jobs: I) -> Result<(), SendError<J>>
    where
        I: IntoIterator<Item = J>,
    {
        for job in jobs {
            self.send(job)?;
        }
        Ok(())
    }

    /// Signal that this producer has no more jobs
    pub fn close(self) {}

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(usize::MAX)
    }

    /// Jobs waiting for a worker
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }
}

impl<J> Clone for JobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<J> fmt::Debug for JobQueue<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
