// --- Файл: src/metrics/value.rs ---

//! Значение, возвращаемое `Metric::compute()`.
//!
//! Метрика может вернуть либо скаляр (accuracy, MSE), либо тензор
//! (precision/recall по классам при `average == false`). Арифметика над
//! значениями нужна `MetricsLambda` и операторам над метриками.

use crate::error::{MetricError, Result};
use ndarray::{ArrayD, IxDyn, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Результат вычисления метрики.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Scalar(f64),
    Tensor(ArrayD<f64>),
}

impl MetricValue {
    /// Создает одномерный тензор из вектора.
    pub fn from_vec(values: Vec<f64>) -> Self {
        let len = values.len();
        // Форма [len] всегда согласована с длиной вектора.
        match ArrayD::from_shape_vec(IxDyn(&[len]), values) {
            Ok(array) => MetricValue::Tensor(array),
            Err(_) => MetricValue::Tensor(ArrayD::zeros(IxDyn(&[0]))),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, MetricValue::Scalar(_))
    }

    /// Возвращает скаляр. Тензор из одного элемента тоже считается скаляром.
    pub fn as_scalar(&self) -> Result<f64> {
        match self {
            MetricValue::Scalar(v) => Ok(*v),
            MetricValue::Tensor(t) if t.len() == 1 => t
                .iter()
                .next()
                .copied()
                .ok_or_else(|| MetricError::NonScalar(format!("{:?}", t.shape()))),
            MetricValue::Tensor(t) => Err(MetricError::NonScalar(format!(
                "тензор формы {:?}",
                t.shape()
            ))),
        }
    }

    pub fn as_tensor(&self) -> Option<&ArrayD<f64>> {
        match self {
            MetricValue::Tensor(t) => Some(t),
            MetricValue::Scalar(_) => None,
        }
    }

    /// Форма значения; у скаляра она пустая.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            MetricValue::Scalar(_) => Vec::new(),
            MetricValue::Tensor(t) => t.shape().to_vec(),
        }
    }

    /// Среднее по всем элементам тензора (скаляр возвращается как есть).
    pub fn mean(&self) -> Result<MetricValue> {
        match self {
            MetricValue::Scalar(v) => Ok(MetricValue::Scalar(*v)),
            MetricValue::Tensor(t) => t.mean().map(MetricValue::Scalar).ok_or_else(|| {
                MetricError::InvalidArgument("среднее пустого тензора".to_string())
            }),
        }
    }

    /// Применяет функцию к каждому элементу.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> MetricValue {
        match self {
            MetricValue::Scalar(v) => MetricValue::Scalar(f(*v)),
            MetricValue::Tensor(t) => MetricValue::Tensor(t.mapv(f)),
        }
    }

    /// Поэлементная бинарная операция.
    ///
    /// Скаляр транслируется на тензор любой формы; два тензора должны
    /// иметь одинаковую форму.
    pub fn zip_with(&self, other: &MetricValue, f: impl Fn(f64, f64) -> f64) -> Result<MetricValue> {
        match (self, other) {
            (MetricValue::Scalar(a), MetricValue::Scalar(b)) => Ok(MetricValue::Scalar(f(*a, *b))),
            (MetricValue::Scalar(a), MetricValue::Tensor(t)) => {
                Ok(MetricValue::Tensor(t.mapv(|x| f(*a, x))))
            }
            (MetricValue::Tensor(t), MetricValue::Scalar(b)) => {
                Ok(MetricValue::Tensor(t.mapv(|x| f(x, *b))))
            }
            (MetricValue::Tensor(a), MetricValue::Tensor(b)) => {
                if a.shape() != b.shape() {
                    return Err(MetricError::ShapeMismatch {
                        expected: a.shape().to_vec(),
                        found: b.shape().to_vec(),
                    });
                }
                Ok(MetricValue::Tensor(
                    Zip::from(a).and(b).map_collect(|&x, &y| f(x, y)),
                ))
            }
        }
    }

    pub fn try_add(&self, other: &MetricValue) -> Result<MetricValue> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn try_sub(&self, other: &MetricValue) -> Result<MetricValue> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn try_mul(&self, other: &MetricValue) -> Result<MetricValue> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Деление по правилам f64: деление на ноль дает `inf`/`NaN`, а не ошибку.
    pub fn try_div(&self, other: &MetricValue) -> Result<MetricValue> {
        self.zip_with(other, |a, b| a / b)
    }

    pub fn try_pow(&self, exponent: &MetricValue) -> Result<MetricValue> {
        self.zip_with(exponent, f64::powf)
    }

    pub fn powf(&self, exponent: f64) -> MetricValue {
        self.map(|x| x.powf(exponent))
    }

    pub fn neg(&self) -> MetricValue {
        self.map(|x| -x)
    }

    pub fn abs(&self) -> MetricValue {
        self.map(f64::abs)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Scalar(value)
    }
}

impl From<ArrayD<f64>> for MetricValue {
    fn from(value: ArrayD<f64>) -> Self {
        MetricValue::Tensor(value)
    }
}

impl From<Vec<f64>> for MetricValue {
    fn from(values: Vec<f64>) -> Self {
        MetricValue::from_vec(values)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Scalar(v) => write!(f, "{:.6}", v),
            MetricValue::Tensor(t) => {
                let parts: Vec<String> = t.iter().map(|v| format!("{:.6}", v)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}
