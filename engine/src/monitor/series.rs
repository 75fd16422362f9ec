use super::types::PerformanceMetric;

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// The samples of one metric name, oldest first.
#[derive(Debug, Default)]
pub(crate) struct MetricSeries {
  samples: VecDeque<PerformanceMetric>,
}

impl MetricSeries {
  /// Appends a sample, dropping the oldest ones beyond `max_len`.
  pub(crate) fn push(&mut self, metric: PerformanceMetric, max_len: usize) {
    self.samples.push_back(metric);
    while self.samples.len() > max_len {
      self.samples.pop_front();
    }
  }

  /// Removes samples stamped before `cutoff`. Returns how many went.
  pub(crate) fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
    let before = self.samples.len();
    self.samples.retain(|sample| sample.timestamp >= cutoff);
    before - self.samples.len()
  }

  /// The newest `limit` samples in recording order, or all of them when
  /// `limit` is 0.
  pub(crate) fn recent(&self, limit: usize) -> Vec<PerformanceMetric> {
    let skip = match limit {
      0 => 0,
      limit => self.samples.len().saturating_sub(limit),
    };
    self.samples.iter().skip(skip).cloned().collect()
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.samples.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }
}

/// The oldest timestamp still inside the retention window.
pub(crate) fn retention_cutoff(now: DateTime<Utc>, retention: Duration) -> Option<DateTime<Utc>> {
  let window = TimeDelta::from_std(retention).ok()?;
  now.checked_sub_signed(window)
}
