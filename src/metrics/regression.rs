// --- Файл: src/metrics/regression.rs ---

//! Метрики для задач регрессии.
//!
//! Все три метрики - среднее поэлементной ошибки по всем увиденным
//! элементам, отличаются только функцией ошибки и финальным преобразованием.

use super::{Metric, MetricValue, PredTarget};
use crate::error::{MetricError, Result};

/// Накопитель среднего поэлементной ошибки.
#[derive(Debug, Clone, Default)]
struct ErrorMean {
    total: f64,
    count: usize,
}

impl ErrorMean {
    fn accumulate(&mut self, output: &PredTarget, error: fn(f64) -> f64) -> Result<()> {
        let (predictions, targets) = output;
        if predictions.shape() != targets.shape() {
            return Err(MetricError::ShapeMismatch {
                expected: predictions.shape().to_vec(),
                found: targets.shape().to_vec(),
            });
        }
        self.total += predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| error(f64::from(*p) - f64::from(*t)))
            .sum::<f64>();
        self.count += predictions.len();
        Ok(())
    }

    fn mean(&self, metric: &str) -> Result<f64> {
        if self.count == 0 {
            return Err(MetricError::NotComputable {
                metric: metric.to_string(),
            });
        }
        Ok(self.total / self.count as f64)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

fn squared(diff: f64) -> f64 {
    diff * diff
}

/// Mean Squared Error (MSE).
///
/// MSE = (1/n) * Σ(y_pred - y_true)²
#[derive(Debug, Clone, Default)]
pub struct MeanSquaredError(ErrorMean);

impl MeanSquaredError {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric<PredTarget> for MeanSquaredError {
    fn update(&mut self, output: &PredTarget) -> Result<()> {
        self.0.accumulate(output, squared)
    }

    fn compute(&self) -> Result<MetricValue> {
        self.0.mean("MSE").map(MetricValue::Scalar)
    }

    fn reset(&mut self) {
        self.0.clear();
    }

    fn name(&self) -> &str {
        "MSE"
    }
}

/// Root Mean Squared Error (RMSE).
///
/// RMSE = √MSE. То же самое можно получить композицией: `mse.pow(0.5)`.
#[derive(Debug, Clone, Default)]
pub struct RootMeanSquaredError(ErrorMean);

impl RootMeanSquaredError {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric<PredTarget> for RootMeanSquaredError {
    fn update(&mut self, output: &PredTarget) -> Result<()> {
        self.0.accumulate(output, squared)
    }

    fn compute(&self) -> Result<MetricValue> {
        self.0.mean("RMSE").map(|mse| MetricValue::Scalar(mse.sqrt()))
    }

    fn reset(&mut self) {
        self.0.clear();
    }

    fn name(&self) -> &str {
        "RMSE"
    }
}

/// Mean Absolute Error (MAE).
///
/// MAE = (1/n) * Σ|y_pred - y_true|
#[derive(Debug, Clone, Default)]
pub struct MeanAbsoluteError(ErrorMean);

impl MeanAbsoluteError {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric<PredTarget> for MeanAbsoluteError {
    fn update(&mut self, output: &PredTarget) -> Result<()> {
        self.0.accumulate(output, f64::abs)
    }

    fn compute(&self) -> Result<MetricValue> {
        self.0.mean("MAE").map(MetricValue::Scalar)
    }

    fn reset(&mut self) {
        self.0.clear();
    }

    fn name(&self) -> &str {
        "MAE"
    }
}
