use std::collections::VecDeque;

use ndarray::Array3;

use crate::activity_prediction::features_extractor::NUM_FEATURES;
use crate::activity_prediction::min_max_scaler::NormalizedVector;

pub const DEFAULT_WINDOW_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Empty,
    Filling(usize),
    Ready,
}

/// Fixed-capacity FIFO of the most recent normalized samples, oldest first.
/// Once full it stays full: every push evicts exactly the oldest entry.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    samples: VecDeque<NormalizedVector>,
}

impl SlidingWindow {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sliding window capacity must be non-zero");
        SlidingWindow {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: NormalizedVector) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn is_ready(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> WindowState {
        match self.samples.len() {
            0 => WindowState::Empty,
            n if n == self.capacity => WindowState::Ready,
            n => WindowState::Filling(n),
        }
    }

    /// The window contents in arrival order, or `None` until it is full.
    pub fn snapshot(&self) -> Option<Vec<NormalizedVector>> {
        if !self.is_ready() {
            return None;
        }
        Some(self.samples.iter().copied().collect())
    }

    /// Model input of shape (1, W, F), or `None` until the window is full.
    pub fn to_tensor(&self) -> Option<Array3<f32>> {
        if !self.is_ready() {
            return None;
        }
        Some(Array3::from_shape_fn(
            (1, self.capacity, NUM_FEATURES),
            |(_, step, feature)| self.samples[step][feature],
        ))
    }
}
