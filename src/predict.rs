use std::iter::FusedIterator;

use crate::transition::GeneratorState;

/// Replays the generator from a recovered state.
///
/// The predictor only holds the recovered state and how many outputs were
/// already observed; every call to [`Predictor::iter`] starts a fresh stream
/// from that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predictor {
    state: GeneratorState,
    skip: usize,
}

impl Predictor {
    pub fn new(state: GeneratorState, skip: usize) -> Self { Self { state, skip } }

    pub fn state(&self) -> GeneratorState { self.state }

    pub fn skip(&self) -> usize { self.skip }

    /// Outputs that follow the observed prefix.
    pub fn iter(&self) -> Predictions {
        Predictions { state: self.state.advance(self.skip) }
    }

    pub fn take(&self, n: usize) -> Vec<f64> { self.iter().take(n).collect() }

    /// Feeds the stream through a caller-supplied domain mapping.
    pub fn map<T, F: FnMut(f64) -> T>(&self, f: F) -> std::iter::Map<Predictions, F> {
        self.iter().map(f)
    }
}

impl IntoIterator for &Predictor {
    type Item = f64;
    type IntoIter = Predictions;

    fn into_iter(self) -> Predictions { self.iter() }
}

/// Lazy, unbounded stream of predicted doubles.
#[derive(Debug, Clone)]
pub struct Predictions {
    state: GeneratorState,
}

impl Predictions {
    /// State after the most recently yielded output.
    pub fn state(&self) -> GeneratorState { self.state }
}

impl Iterator for Predictions {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.state = self.state.next();
        Some(self.state.output())
    }

    fn size_hint(&self) -> (usize, Option<usize>) { (usize::MAX, None) }
}

impl FusedIterator for Predictions {}
