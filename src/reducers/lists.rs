use super::Latch;
use crate::error::ParallelError;
use crate::parallel::Reducer;

/// Collects string results into a `Vec<String>`, in arrival order
pub struct StringList {
    capacity: usize,
    latch: Latch<Vec<String>>,
}

impl StringList {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            latch: Latch::new(),
        }
    }

    /// An empty list with room for `capacity` results
    pub fn value(&self) -> Vec<String> {
        Vec::with_capacity(self.capacity)
    }

    /// Append step. Results converting to `None` are skipped.
    pub fn reducer<R>(&self) -> Option<Reducer<Vec<String>, R>>
    where
        R: Into<Option<String>> + 'static,
    {
        Some(Box::new(|mut list: Vec<String>, result: R| {
            if let Some(item) = result.into() {
                list.push(item);
            }
            list
        }))
    }

    pub fn then(&self) -> impl FnOnce(Result<Vec<String>, ParallelError>) + Send + use<> {
        self.latch.handler()
    }

    pub fn get(&self) -> Result<Vec<String>, ParallelError> {
        self.latch.wait()
    }
}

impl std::fmt::Debug for StringList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringList")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
