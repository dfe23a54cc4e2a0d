//! Pre-processors applied to each batch before it is handed out

use std::fmt;

use crate::batch::Batch;

/// An in-place transformation of a finished batch
pub trait BatchPreProcessor: Send + Sync {
    /// Modify `batch` in place
    fn pre_process(&self, batch: &mut Batch);
}

impl<F> BatchPreProcessor for F
where
    F: Fn(&mut Batch) + Send + Sync,
{
    fn pre_process(&self, batch: &mut Batch) {
        self(batch);
    }
}

/// Rescales features from `[0, max_value]` to `[lo, hi]`
///
/// Labels are left alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeScaler {
    /// Largest raw feature value
    pub max_value: f64,

    /// Lower end of the target range
    pub lo: f64,

    /// Upper end of the target range
    pub hi: f64,
}

impl RangeScaler {
    /// Create a scaler mapping `[0, max_value]` onto `[lo, hi]`
    pub fn new(max_value: f64, lo: f64, hi: f64) -> Self {
        Self { max_value, lo, hi }
    }

    /// Scale one value
    pub fn scale(&self, value: f64) -> f64 {
        value / self.max_value * (self.hi - self.lo) + self.lo
    }
}

impl Default for RangeScaler {
    /// 8-bit pixel intensities onto `[0, 1]`
    fn default() -> Self {
        Self::new(255.0, 0.0, 1.0)
    }
}

impl BatchPreProcessor for RangeScaler {
    fn pre_process(&self, batch: &mut Batch) {
        for value in batch.features_mut().as_mut_slice() {
            *value = self.scale(*value);
        }
    }
}

/// Pre-processors run one after another, in insertion order
#[derive(Default)]
pub struct PreProcessorChain {
    /// The pre-processors in this chain
    pre_processors: Vec<Box<dyn BatchPreProcessor>>,
}

impl PreProcessorChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-processor
    #[must_use]
    pub fn with<P: BatchPreProcessor + 'static>(mut self, pre_processor: P) -> Self {
        self.push(pre_processor);
        self
    }

    /// Append a pre-processor
    pub fn push<P: BatchPreProcessor + 'static>(&mut self, pre_processor: P) {
        self.pre_processors.push(Box::new(pre_processor));
    }

    /// Number of pre-processors
    pub fn len(&self) -> usize {
        self.pre_processors.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.pre_processors.is_empty()
    }
}

impl BatchPreProcessor for PreProcessorChain {
    fn pre_process(&self, batch: &mut Batch) {
        for pre_processor in &self.pre_processors {
            pre_processor.pre_process(batch);
        }
    }
}

impl fmt::Debug for PreProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreProcessorChain")
            .field("len", &self.pre_processors.len())
            .finish()
    }
}
