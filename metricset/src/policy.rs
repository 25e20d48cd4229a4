use serde::{Deserialize, Serialize};

/// How a toggleable check treats a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Check {
    /// Reject the time series.
    #[default]
    Enforce,
    /// Accept the time series and emit a warning.
    Warn,
    /// Accept the time series silently.
    Ignore,
}

/// Validation knobs that are policy decisions rather than hard invariants.
///
/// Deserializes from a partial document; omitted fields take their default.
///
/// ```yaml
/// unique_label_keys: true
/// end_time_order: warn
/// epoch_order: enforce
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Reject descriptors that repeat a label key.
    pub unique_label_keys: bool,

    /// `end_time` must not decrease across consecutive cumulative points
    /// sharing a `start_time`.
    pub end_time_order: Check,

    /// A cumulative point must not start after it ends, and a reset must not
    /// move `start_time` backwards.
    pub epoch_order: Check,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            unique_label_keys: true,
            end_time_order: Check::Enforce,
            epoch_order: Check::Enforce,
        }
    }
}

/// Accumulates violations found while walking a value.
///
/// In fail-fast mode the walk is told to stop after the first violation.
#[derive(Debug)]
pub(crate) struct Violations<E> {
    errors: Vec<E>,
    collect_all: bool,
}

impl<E> Violations<E> {
    pub(crate) fn fail_fast() -> Self {
        Self {
            errors: Vec::new(),
            collect_all: false,
        }
    }

    pub(crate) fn collect_all() -> Self {
        Self {
            errors: Vec::new(),
            collect_all: true,
        }
    }

    /// A fresh collector in the same mode, for walking a nested value.
    pub(crate) fn nested<T>(&self) -> Violations<T> {
        Violations {
            errors: Vec::new(),
            collect_all: self.collect_all,
        }
    }

    /// Records a violation. Returns true if the walk must stop.
    pub(crate) fn record(&mut self, error: E) -> bool {
        self.errors.push(error);
        self.stopped()
    }

    pub(crate) fn stopped(&self) -> bool {
        !self.collect_all && !self.errors.is_empty()
    }

    pub(crate) fn into_result(self) -> Result<(), E> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub(crate) fn into_vec(self) -> Vec<E> {
        self.errors
    }
}
