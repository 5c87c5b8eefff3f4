//! # rustymetrics: composable lazy metrics for evaluation loops
//!
//! Metrics follow a `reset` / `update` / `compute` lifecycle. Primitive
//! metrics can be combined with arbitrary functions ([`metrics::MetricsLambda`])
//! or plain arithmetic into derived metrics; nothing is computed until the
//! derived metric is asked for its value.
//!
//! ## Usage Example
//!
//! ```no_run
//! use rustymetrics::engine::Engine;
//! use rustymetrics::metrics::{MetricHandle, PredTarget, Precision, Recall};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Evaluation loop that passes batches through unchanged
//! let mut evaluator = Engine::new(|_state, batch: &PredTarget| Ok(batch.clone()));
//!
//! // 2. Primitive metrics and a derived one
//! let precision = MetricHandle::new(Precision::new());
//! let recall = MetricHandle::new(Recall::new());
//! let f1 = &precision * &recall * 2.0 / (&precision + &recall);
//!
//! // 3. Only the derived metric is published; its ingredients still get updated
//! f1.attach(&mut evaluator, "f1")?;
//!
//! let batches: Vec<PredTarget> = Vec::new();
//! let state = evaluator.run(&batches, 1)?;
//! println!("{:?}", state.metrics.get("f1"));
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod metrics;

pub use engine::{Engine, EngineConfig, Events, State};
pub use error::{EngineError, MetricError};
pub use metrics::{Metric, MetricHandle, MetricValue, MetricsLambda};
