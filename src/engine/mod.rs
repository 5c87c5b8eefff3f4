//! # Evaluation Engine
//!
//! A small event-driven loop that runs a process function over batches and
//! drives attached metrics through their lifecycle.
//!
//! ## Lifecycle
//!
//! ```text
//! Started
//! └── for each epoch:
//!     EpochStarted          -> attached metrics reset
//!     └── for each batch:
//!         IterationStarted
//!         process_fn(batch)
//!         IterationCompleted -> attached metrics updated with the output
//!     EpochCompleted        -> attached metrics published to state.metrics
//! Completed
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use rustymetrics::engine::Engine;
//! use rustymetrics::metrics::{MetricHandle, Precision, Recall};
//!
//! let mut evaluator = Engine::new(|_state, batch: &PredTarget| Ok(batch.clone()));
//!
//! let precision = MetricHandle::new(Precision::new());
//! let recall = MetricHandle::new(Recall::new());
//! let f1 = &precision * &recall * 2.0 / (&precision + &recall);
//! f1.attach(&mut evaluator, "f1")?;
//!
//! let state = evaluator.run(&batches, 1)?;
//! assert_eq!(state.metrics.len(), 1);
//! ```

pub mod binding;
pub mod config;
pub mod early_stopping;

pub use binding::MetricBinding;
pub use config::EngineConfig;
pub use early_stopping::{EarlyStopping, EarlyStoppingMode};

use crate::error::EngineError;
use crate::metrics::MetricValue;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Lifecycle events fired by [`Engine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Events {
    Started,
    EpochStarted,
    IterationStarted,
    IterationCompleted,
    EpochCompleted,
    Completed,
}

/// Mutable run state shared with the process function and event handlers.
#[derive(Debug, Clone)]
pub struct State<O> {
    /// Current epoch, starting at 1 once the first epoch begins.
    pub epoch: usize,
    /// Iterations processed since the run started.
    pub iteration: usize,
    pub max_epochs: usize,
    /// Output of the last processed batch.
    pub output: Option<O>,
    /// Published metric values, keyed by attachment name.
    pub metrics: BTreeMap<String, MetricValue>,
    should_terminate: bool,
}

impl<O> State<O> {
    fn new(max_epochs: usize) -> Self {
        Self {
            epoch: 0,
            iteration: 0,
            max_epochs,
            output: None,
            metrics: BTreeMap::new(),
            should_terminate: false,
        }
    }

    /// Stops the run after the current iteration.
    pub fn terminate(&mut self) {
        self.should_terminate = true;
    }

    pub fn should_terminate(&self) -> bool {
        self.should_terminate
    }
}

pub type ProcessFn<B, O> = Box<dyn FnMut(&mut State<O>, &B) -> Result<O, EngineError>>;
pub type EventHandler<O> = Box<dyn FnMut(&mut State<O>) -> Result<(), EngineError>>;

/// Runs a process function over batches of type `B` producing outputs of type `O`.
pub struct Engine<B, O> {
    process_fn: ProcessFn<B, O>,
    config: EngineConfig,
    state: State<O>,
    handlers: HashMap<Events, Vec<EventHandler<O>>>,
    binding: MetricBinding<O>,
}

impl<B, O> Engine<B, O> {
    pub fn new<F>(process_fn: F) -> Self
    where
        F: FnMut(&mut State<O>, &B) -> Result<O, EngineError> + 'static,
    {
        Self::with_config(process_fn, EngineConfig::default())
    }

    pub fn with_config<F>(process_fn: F, config: EngineConfig) -> Self
    where
        F: FnMut(&mut State<O>, &B) -> Result<O, EngineError> + 'static,
    {
        Self {
            process_fn: Box::new(process_fn),
            state: State::new(config.max_epochs),
            config,
            handlers: HashMap::new(),
            binding: MetricBinding::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &State<O> {
        &self.state
    }

    pub fn metric_binding(&self) -> &MetricBinding<O> {
        &self.binding
    }

    pub fn metric_binding_mut(&mut self) -> &mut MetricBinding<O> {
        &mut self.binding
    }

    /// Registers a user handler. Handlers run after the metric binding for
    /// the same event, so `EpochCompleted` handlers see published metrics.
    pub fn add_event_handler<F>(&mut self, event: Events, handler: F)
    where
        F: FnMut(&mut State<O>) -> Result<(), EngineError> + 'static,
    {
        self.handlers.entry(event).or_default().push(Box::new(handler));
    }

    pub fn has_event_handler(&self, event: Events) -> bool {
        self.handlers.get(&event).is_some_and(|h| !h.is_empty())
    }

    /// Runs with `max_epochs` from the engine configuration.
    pub fn run_default(&mut self, data: &[B]) -> Result<&State<O>, EngineError> {
        let max_epochs = self.config.max_epochs;
        self.run(data, max_epochs)
    }

    /// Runs `max_epochs` passes over `data`.
    ///
    /// The state (including `metrics`) is fresh for every call. At most
    /// `epoch_length` batches are processed per epoch when configured.
    pub fn run(&mut self, data: &[B], max_epochs: usize) -> Result<&State<O>, EngineError> {
        if max_epochs == 0 {
            return Err(EngineError::Config("max_epochs must be at least 1".to_string()));
        }
        let epoch_length = self.config.epoch_length.unwrap_or(data.len()).min(data.len());
        self.state = State::new(max_epochs);
        info!(batches = data.len(), max_epochs, metrics = ?self.binding.names(), "engine run started");

        self.fire(Events::Started)?;
        while self.state.epoch < max_epochs && !self.state.should_terminate {
            self.state.epoch += 1;
            self.fire(Events::EpochStarted)?;

            for batch in &data[..epoch_length] {
                self.state.iteration += 1;
                self.fire(Events::IterationStarted)?;
                let output = (self.process_fn)(&mut self.state, batch)?;
                self.state.output = Some(output);
                self.fire(Events::IterationCompleted)?;

                if self.state.iteration % self.config.log_every.max(1) == 0 {
                    debug!(epoch = self.state.epoch, iteration = self.state.iteration, "iteration completed");
                }
                if self.state.should_terminate {
                    break;
                }
            }

            self.fire(Events::EpochCompleted)?;
            for (name, value) in &self.state.metrics {
                info!(epoch = self.state.epoch, metric = %name, value = %value, "epoch metric");
            }
        }
        self.fire(Events::Completed)?;

        info!(epochs = self.state.epoch, iterations = self.state.iteration, "engine run completed");
        Ok(&self.state)
    }

    fn fire(&mut self, event: Events) -> Result<(), EngineError> {
        match event {
            Events::EpochStarted => self.binding.epoch_started(),
            Events::IterationCompleted => {
                if let Some(output) = &self.state.output {
                    self.binding.iteration_completed(output)?;
                }
            }
            Events::EpochCompleted => self.binding.epoch_completed(&mut self.state.metrics)?,
            _ => {}
        }
        if let Some(handlers) = self.handlers.get_mut(&event) {
            for handler in handlers.iter_mut() {
                handler(&mut self.state)?;
            }
        }
        Ok(())
    }
}
