// --- Файл: src/metrics/mod.rs ---

//! Модуль метрик для оценки качества моделей.
//!
//! Предоставляет:
//! - **Базовый трейт** [`Metric`] с жизненным циклом `reset` / `update` / `compute`
//! - **Композицию метрик**: [`MetricsLambda`] и арифметику над [`MetricHandle`]
//! - **Классификацию**: Accuracy, Precision, Recall, F-beta
//! - **Регрессию**: MSE, MAE, RMSE
//!
//! # Пример использования
//!
//! ```rust,ignore
//! use rustymetrics::metrics::{MetricHandle, Precision, Recall};
//!
//! let precision = MetricHandle::new(Precision::new());
//! let recall = MetricHandle::new(Recall::new());
//! let f1 = &precision * &recall * 2.0 / (&precision + &recall);
//!
//! f1.attach(&mut evaluator, "f1")?;
//! let state = evaluator.run(&batches, 1)?;
//! println!("F1: {}", state.metrics["f1"]);
//! ```

pub mod classification;
pub mod fbeta;
pub mod handle;
pub mod lambda;
pub mod ops;
pub mod regression;
pub mod value;

pub use classification::{Accuracy, BinaryConfusionMatrix, MultiClassConfusionMatrix, Precision, Recall};
pub use fbeta::{f1_from_values, fbeta};
pub use handle::MetricHandle;
pub use lambda::{combine, Arg, LambdaArgs, LambdaFn, MetricsLambda, MetricsLambdaBuilder};
pub use regression::{MeanAbsoluteError, MeanSquaredError, RootMeanSquaredError};
pub use value::MetricValue;

use crate::error::Result;
use ndarray::ArrayD;

/// Выход шага оценки для встроенных метрик: (предсказания, целевые значения).
pub type PredTarget = (ArrayD<f32>, ArrayD<f32>);

/// Базовый трейт для всех метрик.
///
/// `O` - тип выхода одного шага цикла оценки, который получает `update`.
///
/// `reset` и `update` касаются только собственного состояния узла. До
/// зависимостей их доводит обход графа в [`MetricHandle::reset`] /
/// [`MetricHandle::update`] и в привязке к циклу оценки.
pub trait Metric<O> {
    /// Сбрасывает собственное накопленное состояние.
    fn reset(&mut self);

    /// Обновляет собственное состояние выходом одного шага.
    fn update(&mut self, output: &O) -> Result<()>;

    /// Вычисляет текущее значение метрики. Не должен менять состояние.
    fn compute(&self) -> Result<MetricValue>;

    /// Возвращает имя метрики.
    fn name(&self) -> &str;

    /// Метрики, от которых зависит эта. У листовых метрик список пуст.
    ///
    /// Каждая зависимость получает `reset`/`update` раньше этой метрики и
    /// ровно один раз за шаг, даже если она общая для нескольких узлов.
    fn dependencies(&self) -> Vec<MetricHandle<O>> {
        Vec::new()
    }
}
