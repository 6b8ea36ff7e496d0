use std::fmt;
use std::ops::{Add, Mul};

use super::Latch;
use crate::error::ParallelError;
use crate::parallel::Reducer;

pub fn add<T: Add<Output = T>>(acc: T, value: T) -> T {
    acc + value
}

pub fn multiply<T: Mul<Output = T>>(acc: T, value: T) -> T {
    acc * value
}

/// The lesser of the two; keeps `acc` on ties
pub fn min<T: Ord>(acc: T, value: T) -> T {
    if value < acc { value } else { acc }
}

/// The greater of the two; keeps `acc` on ties
pub fn max<T: Ord>(acc: T, value: T) -> T {
    if value > acc { value } else { acc }
}

/// Folds results with an associative operation such as [`add`] or [`min`]
pub struct Associative<T> {
    initial: T,
    op: fn(T, T) -> T,
    latch: Latch<T>,
}

impl<T> Associative<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, op: fn(T, T) -> T) -> Self {
        Self {
            initial,
            op,
            latch: Latch::new(),
        }
    }

    pub fn value(&self) -> T {
        self.initial.clone()
    }

    /// Fold step applying the operation. Results converting to `None` are
    /// skipped.
    pub fn reducer<R>(&self) -> Option<Reducer<T, R>>
    where
        R: Into<Option<T>> + 'static,
    {
        let op = self.op;
        Some(Box::new(move |acc, result: R| match result.into() {
            Some(value) => op(acc, value),
            None => acc,
        }))
    }

    pub fn then(&self) -> impl FnOnce(Result<T, ParallelError>) + Send + use<T> {
        self.latch.handler()
    }

    /// Block until the invocation completes
    pub fn get(&self) -> Result<T, ParallelError> {
        self.latch.wait()
    }
}

impl<T: fmt::Debug> fmt::Debug for Associative<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Associative")
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_functions() {
        assert_eq!(add(2_i64, 3), 5);
        assert_eq!(multiply(-2_i64, 3), -6);
        assert_eq!(min(2_i64, -3), -3);
        assert_eq!(max(2_i64, -3), 2);
    }

    #[test]
    fn test_reducer_skips_none() {
        let sum = Associative::new(0_i64, add);
        let mut reducer = sum.reducer::<Option<i64>>().unwrap();

        let acc = reducer(sum.value(), Some(4));
        let acc = reducer(acc, None);
        let acc = reducer(acc, Some(-1));
        assert_eq!(acc, 3);
    }

    #[test]
    fn test_then_feeds_get() {
        let product = Associative::new(1_i64, multiply);
        (product.then())(Ok(-2));
        assert_eq!(product.get().unwrap(), -2);
    }
}
