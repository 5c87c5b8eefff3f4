//! Early stopping driven by a published metric.
//!
//! The tracker reads `state.metrics[metric_name]` on every `EpochCompleted`
//! and terminates the run once the metric stops improving for `patience`
//! epochs. It re-arms itself on `Started`, so every run is judged on its own.

use super::{Engine, Events};
use crate::error::{EngineError, MetricError};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Whether a lower or a higher metric value is an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStoppingMode {
    Min,
    Max,
}

impl EarlyStoppingMode {
    /// `true` if `value` beats `best` by more than `min_delta`. NaN never does.
    fn improves(self, value: f64, best: f64, min_delta: f64) -> bool {
        match self {
            EarlyStoppingMode::Min => value < best - min_delta,
            EarlyStoppingMode::Max => value > best + min_delta,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    metric_name: String,
    mode: EarlyStoppingMode,
    patience: usize,
    min_delta: f64,
    /// Best value seen and the epoch it was published in.
    best: Option<(f64, usize)>,
    /// Epochs since `best` was last improved.
    stale_epochs: usize,
}

impl EarlyStopping {
    pub fn new(metric_name: &str, mode: EarlyStoppingMode, patience: usize) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            mode,
            patience,
            min_delta: 0.0,
            best: None,
            stale_epochs: 0,
        }
    }

    pub fn minimize(metric_name: &str, patience: usize) -> Self {
        Self::new(metric_name, EarlyStoppingMode::Min, patience)
    }

    pub fn maximize(metric_name: &str, patience: usize) -> Self {
        Self::new(metric_name, EarlyStoppingMode::Max, patience)
    }

    /// Minimal change that counts as an improvement.
    pub fn with_min_delta(mut self, min_delta: f64) -> Self {
        self.min_delta = min_delta.abs();
        self
    }

    /// Records the metric value of `epoch`; returns `true` once patience is exhausted.
    pub fn check(&mut self, value: f64, epoch: usize) -> bool {
        let improved = match self.best {
            None => !value.is_nan(),
            Some((best, _)) => self.mode.improves(value, best, self.min_delta),
        };
        if improved {
            self.best = Some((value, epoch));
            self.stale_epochs = 0;
        } else {
            self.stale_epochs += 1;
        }
        self.should_stop()
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best.map(|(value, _)| value)
    }

    /// Epoch of the best value, 0 before any value was recorded.
    pub fn best_epoch(&self) -> usize {
        self.best.map_or(0, |(_, epoch)| epoch)
    }

    pub fn should_stop(&self) -> bool {
        self.stale_epochs > 0 && self.stale_epochs >= self.patience
    }

    pub fn counter(&self) -> usize {
        self.stale_epochs
    }

    pub fn reset(&mut self) {
        self.best = None;
        self.stale_epochs = 0;
    }

    /// Registers the tracker with `engine`.
    ///
    /// The returned handle gives access to the tracker after the run. The
    /// metric must be attached to the same engine; a missing key fails the run.
    pub fn attach<B: 'static, O: 'static>(self, engine: &mut Engine<B, O>) -> Rc<RefCell<EarlyStopping>> {
        let tracker = Rc::new(RefCell::new(self));

        let on_start = Rc::clone(&tracker);
        engine.add_event_handler(Events::Started, move |_state| {
            on_start.borrow_mut().reset();
            Ok(())
        });

        let on_epoch = Rc::clone(&tracker);
        engine.add_event_handler(Events::EpochCompleted, move |state| {
            let mut tracker = on_epoch.borrow_mut();
            let value = state
                .metrics
                .get(&tracker.metric_name)
                .ok_or_else(|| MetricError::NotAttached(tracker.metric_name.clone()))?
                .as_scalar()?;
            let stop = tracker.check(value, state.epoch);
            debug!(metric = %tracker.metric_name, value, stale = tracker.stale_epochs, "early stopping check");
            if stop {
                warn!(
                    metric = %tracker.metric_name,
                    best = ?tracker.best_value(),
                    best_epoch = tracker.best_epoch(),
                    "early stopping: no improvement for {} epochs",
                    tracker.stale_epochs
                );
                state.terminate();
            }
            Ok::<(), EngineError>(())
        });
        tracker
    }
}
