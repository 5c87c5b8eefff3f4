// --- Файл: src/metrics/fbeta.rs ---

//! F-beta score как составная метрика над Precision и Recall.
//!
//! F_β = (1 + β²) · P · R / (β² · P + R)

use super::lambda::MetricsLambda;
use super::{MetricHandle, MetricValue};
use crate::error::{MetricError, Result};

// Защищает от 0/0 для классов, которые не встречались ни в предсказаниях, ни в целях.
const EPS: f64 = 1e-15;

/// Строит F-beta из уже существующих метрик Precision и Recall.
///
/// При `average == true` значения по классам усредняются (macro F-beta).
/// Метрики `precision` и `recall` могут быть подключены к циклу и отдельно:
/// обновляться они все равно будут один раз за шаг.
pub fn fbeta<O: 'static>(
    beta: f64,
    precision: &MetricHandle<O>,
    recall: &MetricHandle<O>,
    average: bool,
) -> Result<MetricHandle<O>> {
    if beta <= 0.0 || !beta.is_finite() {
        return Err(MetricError::InvalidArgument(format!(
            "beta должен быть положительным, получено {}",
            beta
        )));
    }

    let handle = MetricsLambda::builder("fbeta", move |args| {
        let p = args.named("precision")?;
        let r = args.named("recall")?;
        let beta2 = beta * beta;
        let numerator = p.try_mul(r)?.map(|x| (1.0 + beta2) * x);
        let denominator = p.map(|x| beta2 * x).try_add(r)?.map(|x| x + EPS);
        let score = numerator.try_div(&denominator)?;
        if average {
            score.mean()
        } else {
            Ok(score)
        }
    })
    .named("precision", precision)
    .named("recall", recall)
    .into_handle();
    Ok(handle)
}

/// Среднее значение F1 по классам для готовых значений P и R.
pub fn f1_from_values(precision: &MetricValue, recall: &MetricValue) -> Result<MetricValue> {
    let numerator = precision.try_mul(recall)?.map(|x| 2.0 * x);
    let denominator = precision.try_add(recall)?.map(|x| x + EPS);
    numerator.try_div(&denominator)?.mean()
}
