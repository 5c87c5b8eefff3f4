// --- Файл: src/metrics/classification.rs ---

//! Метрики для задач классификации.
//!
//! Все метрики принимают выход шага `(predictions, targets)`:
//! - **бинарный режим**: формы совпадают, предсказания сравниваются с порогом;
//! - **многоклассовый режим**: `predictions` имеет форму `[..., C]`,
//!   `targets` - индексы классов формы `[...]`; класс предсказания - argmax.

use super::{Metric, MetricValue, PredTarget};
use crate::error::{MetricError, Result};
use ndarray::ArrayD;

/// Режим входа, определяемый по формам предсказаний и целей.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Binary,
    MultiClass { num_classes: usize },
}

fn input_kind(predictions: &ArrayD<f32>, targets: &ArrayD<f32>) -> Result<InputKind> {
    if predictions.shape() == targets.shape() {
        return Ok(InputKind::Binary);
    }
    let pred_shape = predictions.shape();
    if pred_shape.len() == targets.ndim() + 1 && pred_shape[..targets.ndim()] == *targets.shape() {
        let num_classes = pred_shape[pred_shape.len() - 1];
        if num_classes < 2 {
            return Err(MetricError::InvalidArgument(format!(
                "многоклассовый вход требует хотя бы 2 классов, получено {}",
                num_classes
            )));
        }
        return Ok(InputKind::MultiClass { num_classes });
    }
    Err(MetricError::ShapeMismatch {
        expected: pred_shape.to_vec(),
        found: targets.shape().to_vec(),
    })
}

/// Индекс максимального элемента строки; при равенстве - первый.
fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, value) in row.iter().enumerate().skip(1) {
        if *value > row[best] {
            best = i;
        }
    }
    best
}

fn class_index(target: f32, num_classes: usize) -> Result<usize> {
    if target < 0.0 || target.fract() != 0.0 || target as usize >= num_classes {
        return Err(MetricError::InvalidArgument(format!(
            "индекс класса {} вне диапазона [0, {})",
            target, num_classes
        )));
    }
    Ok(target as usize)
}

/// Confusion Matrix для бинарной классификации.
#[derive(Debug, Clone, Default)]
pub struct BinaryConfusionMatrix {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl BinaryConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Обновляет матрицу ошибок.
    pub fn update(&mut self, predictions: &ArrayD<f32>, targets: &ArrayD<f32>, threshold: f32) {
        for (pred, target) in predictions.iter().zip(targets.iter()) {
            let pred_positive = *pred >= threshold;
            let actual_positive = *target >= 0.5;

            match (pred_positive, actual_positive) {
                (true, true) => self.true_positives += 1,
                (true, false) => self.false_positives += 1,
                (false, true) => self.false_negatives += 1,
                (false, false) => self.true_negatives += 1,
            }
        }
    }

    /// Общее количество образцов.
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        let denom = self.true_positives + self.false_positives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }

    /// Вычисляет recall (sensitivity).
    pub fn recall(&self) -> f64 {
        let denom = self.true_positives + self.false_negatives;
        if denom == 0 {
            return 0.0;
        }
        self.true_positives as f64 / denom as f64
    }
}

/// Confusion Matrix для многоклассовой классификации.
#[derive(Debug, Clone)]
pub struct MultiClassConfusionMatrix {
    num_classes: usize,
    matrix: Vec<Vec<usize>>, // [actual][predicted]
}

impl MultiClassConfusionMatrix {
    pub fn new(num_classes: usize) -> Result<Self> {
        if num_classes < 2 {
            return Err(MetricError::InvalidArgument(format!(
                "матрица ошибок требует хотя бы 2 классов, получено {}",
                num_classes
            )));
        }
        Ok(Self {
            num_classes,
            matrix: vec![vec![0; num_classes]; num_classes],
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Обновляет матрицу ошибок.
    ///
    /// `predictions` - оценки формы `[..., num_classes]`, `targets` - индексы
    /// классов формы `[...]`.
    pub fn update(&mut self, predictions: &ArrayD<f32>, targets: &ArrayD<f32>) -> Result<()> {
        match input_kind(predictions, targets)? {
            InputKind::MultiClass { num_classes } if num_classes == self.num_classes => {}
            InputKind::MultiClass { num_classes } => {
                return Err(MetricError::ShapeMismatch {
                    expected: vec![self.num_classes],
                    found: vec![num_classes],
                })
            }
            InputKind::Binary => {
                return Err(MetricError::InvalidArgument(
                    "ожидались оценки формы [..., C] и индексы классов формы [...]".to_string(),
                ))
            }
        }
        let scores: Vec<f32> = predictions.iter().copied().collect();
        let mut pairs = Vec::with_capacity(targets.len());
        for (row, &target) in scores.chunks(self.num_classes).zip(targets.iter()) {
            pairs.push((class_index(target, self.num_classes)?, argmax(row)));
        }
        // Матрица меняется только если весь батч корректен.
        for (actual, predicted) in pairs {
            self.matrix[actual][predicted] += 1;
        }
        Ok(())
    }

    /// Матрица `[actual][predicted]`.
    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flat_map(|row| row.iter()).sum()
    }

    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.num_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        correct as f64 / total as f64
    }

    /// Вычисляет precision для каждого класса.
    pub fn precision_per_class(&self) -> Vec<f64> {
        (0..self.num_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted_as_c: usize = (0..self.num_classes).map(|a| self.matrix[a][c]).sum();
                if predicted_as_c == 0 {
                    0.0
                } else {
                    tp as f64 / predicted_as_c as f64
                }
            })
            .collect()
    }

    /// Вычисляет recall для каждого класса.
    pub fn recall_per_class(&self) -> Vec<f64> {
        (0..self.num_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let actual_c: usize = self.matrix[c].iter().sum();
                if actual_c == 0 {
                    0.0
                } else {
                    tp as f64 / actual_c as f64
                }
            })
            .collect()
    }

    /// Вычисляет macro-averaged F1-Score.
    pub fn macro_f1(&self) -> f64 {
        let precisions = self.precision_per_class();
        let recalls = self.recall_per_class();

        let f1_sum: f64 = precisions
            .iter()
            .zip(recalls.iter())
            .map(|(&p, &r)| if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) })
            .sum();

        f1_sum / self.num_classes as f64
    }
}

/// Накопленные счетчики: режим выбирается по первому батчу после `reset()`.
#[derive(Debug, Clone, Default)]
enum Confusion {
    #[default]
    Empty,
    Binary(BinaryConfusionMatrix),
    MultiClass(MultiClassConfusionMatrix),
}

impl Confusion {
    fn update(&mut self, output: &PredTarget, threshold: f32) -> Result<()> {
        let (predictions, targets) = output;
        let kind = input_kind(predictions, targets)?;

        if let Confusion::Empty = self {
            *self = match kind {
                InputKind::Binary => Confusion::Binary(BinaryConfusionMatrix::new()),
                InputKind::MultiClass { num_classes } => {
                    Confusion::MultiClass(MultiClassConfusionMatrix::new(num_classes)?)
                }
            };
        }

        match (self, kind) {
            (Confusion::Binary(cm), InputKind::Binary) => {
                cm.update(predictions, targets, threshold);
                Ok(())
            }
            (Confusion::MultiClass(cm), InputKind::MultiClass { num_classes }) => {
                if cm.num_classes() != num_classes {
                    return Err(MetricError::ShapeMismatch {
                        expected: vec![cm.num_classes()],
                        found: vec![num_classes],
                    });
                }
                cm.update(predictions, targets)
            }
            _ => Err(MetricError::InvalidArgument(
                "тип входа (бинарный/многоклассовый) изменился между обновлениями".to_string(),
            )),
        }
    }

    fn total(&self) -> usize {
        match self {
            Confusion::Empty => 0,
            Confusion::Binary(cm) => cm.total(),
            Confusion::MultiClass(cm) => cm.total(),
        }
    }
}

fn per_class(values: Vec<f64>, average: bool) -> MetricValue {
    if average {
        MetricValue::Scalar(values.iter().sum::<f64>() / values.len() as f64)
    } else {
        MetricValue::from_vec(values)
    }
}

/// Метрика точности (Accuracy) для классификации.
///
/// Бинарный режим: (TP + TN) / total при пороге 0.5.
/// Многоклассовый: доля строк, у которых argmax совпал с целью.
#[derive(Debug, Clone, Default)]
pub struct Accuracy {
    confusion: Confusion,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metric<PredTarget> for Accuracy {
    fn update(&mut self, output: &PredTarget) -> Result<()> {
        self.confusion.update(output, 0.5)
    }

    fn compute(&self) -> Result<MetricValue> {
        match &self.confusion {
            Confusion::Binary(cm) if cm.total() > 0 => Ok(MetricValue::Scalar(cm.accuracy())),
            Confusion::MultiClass(cm) if cm.total() > 0 => Ok(MetricValue::Scalar(cm.accuracy())),
            _ => Err(MetricError::NotComputable {
                metric: "Accuracy".to_string(),
            }),
        }
    }

    fn reset(&mut self) {
        self.confusion = Confusion::Empty;
    }

    fn name(&self) -> &str {
        "Accuracy"
    }
}

/// Метрика Precision.
///
/// В многоклассовом режиме при `average == false` возвращает тензор значений
/// по классам, при `average == true` - их среднее (macro).
#[derive(Debug, Clone)]
pub struct Precision {
    confusion: Confusion,
    threshold: f32,
    average: bool,
}

impl Precision {
    pub fn new() -> Self {
        Self {
            confusion: Confusion::Empty,
            threshold: 0.5,
            average: true,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_average(mut self, average: bool) -> Self {
        self.average = average;
        self
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::new()
    }
}

impl Metric<PredTarget> for Precision {
    fn update(&mut self, output: &PredTarget) -> Result<()> {
        self.confusion.update(output, self.threshold)
    }

    fn compute(&self) -> Result<MetricValue> {
        if self.confusion.total() == 0 {
            return Err(MetricError::NotComputable {
                metric: "Precision".to_string(),
            });
        }
        match &self.confusion {
            Confusion::Binary(cm) => Ok(MetricValue::Scalar(cm.precision())),
            Confusion::MultiClass(cm) => Ok(per_class(cm.precision_per_class(), self.average)),
            Confusion::Empty => Err(MetricError::NotComputable {
                metric: "Precision".to_string(),
            }),
        }
    }

    fn reset(&mut self) {
        self.confusion = Confusion::Empty;
    }

    fn name(&self) -> &str {
        "Precision"
    }
}

/// Метрика Recall. Режимы те же, что у [`Precision`].
#[derive(Debug, Clone)]
pub struct Recall {
    confusion: Confusion,
    threshold: f32,
    average: bool,
}

impl Recall {
    pub fn new() -> Self {
        Self {
            confusion: Confusion::Empty,
            threshold: 0.5,
            average: true,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_average(mut self, average: bool) -> Self {
        self.average = average;
        self
    }
}

impl Default for Recall {
    fn default() -> Self {
        Self::new()
    }
}

impl Metric<PredTarget> for Recall {
    fn update(&mut self, output: &PredTarget) -> Result<()> {
        self.confusion.update(output, self.threshold)
    }

    fn compute(&self) -> Result<MetricValue> {
        if self.confusion.total() == 0 {
            return Err(MetricError::NotComputable {
                metric: "Recall".to_string(),
            });
        }
        match &self.confusion {
            Confusion::Binary(cm) => Ok(MetricValue::Scalar(cm.recall())),
            Confusion::MultiClass(cm) => Ok(per_class(cm.recall_per_class(), self.average)),
            Confusion::Empty => Err(MetricError::NotComputable {
                metric: "Recall".to_string(),
            }),
        }
    }

    fn reset(&mut self) {
        self.confusion = Confusion::Empty;
    }

    fn name(&self) -> &str {
        "Recall"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(shape: &[usize], values: Vec<f32>) -> ArrayD<f32> {
        ArrayD::from_shape_vec(ndarray::IxDyn(shape), values).unwrap()
    }

    #[test]
    fn test_accuracy_binary() {
        let mut acc = Accuracy::new();

        let preds = array(&[4], vec![0.9, 0.8, 0.3, 0.1]);
        let targets = array(&[4], vec![1.0, 1.0, 0.0, 0.0]);

        acc.update(&(preds, targets)).unwrap();
        assert!((acc.compute().unwrap().as_scalar().unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_accuracy_multiclass() {
        let mut acc = Accuracy::new();
        let preds = array(&[3, 3], vec![0.7, 0.2, 0.1, 0.1, 0.8, 0.1, 0.6, 0.3, 0.1]);
        let targets = array(&[3], vec![0.0, 1.0, 2.0]);

        acc.update(&(preds, targets)).unwrap();
        assert!((acc.compute().unwrap().as_scalar().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_binary_confusion_matrix() {
        let mut cm = BinaryConfusionMatrix::new();

        let preds = array(&[4], vec![0.9, 0.8, 0.3, 0.6]);
        let targets = array(&[4], vec![1.0, 0.0, 0.0, 1.0]);

        cm.update(&preds, &targets, 0.5);

        assert_eq!(cm.true_positives, 2); // 0.9->1, 0.6->1
        assert_eq!(cm.false_positives, 1); // 0.8->0 but pred 1
        assert_eq!(cm.true_negatives, 1); // 0.3->0
        assert_eq!(cm.false_negatives, 0);
    }

    #[test]
    fn test_precision_recall() {
        let mut precision = Precision::new();
        let mut recall = Recall::new();

        let preds = array(&[6], vec![0.9, 0.8, 0.7, 0.3, 0.2, 0.6]);
        let targets = array(&[6], vec![1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
        let output = (preds, targets);

        precision.update(&output).unwrap();
        recall.update(&output).unwrap();

        // TP=2 (0.9, 0.8), FP=2 (0.7, 0.6), FN=1 (0.2)
        // Precision = 2/4 = 0.5
        // Recall = 2/3 ≈ 0.667
        assert!((precision.compute().unwrap().as_scalar().unwrap() - 0.5).abs() < 1e-6);
        assert!((recall.compute().unwrap().as_scalar().unwrap() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_precision_per_class() {
        let mut precision = Precision::new().with_average(false);
        let preds = array(
            &[4, 3],
            vec![
                0.7, 0.2, 0.1, // -> 0
                0.1, 0.8, 0.1, // -> 1
                0.2, 0.7, 0.1, // -> 1
                0.2, 0.3, 0.5, // -> 2
            ],
        );
        let targets = array(&[4], vec![0.0, 1.0, 2.0, 2.0]);

        precision.update(&(preds, targets)).unwrap();
        let value = precision.compute().unwrap();
        assert_eq!(value, MetricValue::from_vec(vec![1.0, 0.5, 1.0]));
    }

    #[test]
    fn test_not_computable_before_update() {
        let precision = Precision::new();
        assert_eq!(
            precision.compute().unwrap_err(),
            MetricError::NotComputable {
                metric: "Precision".to_string()
            }
        );
    }

    #[test]
    fn test_reset_clears_mode() {
        let mut recall = Recall::new();
        recall
            .update(&(array(&[2], vec![0.9, 0.1]), array(&[2], vec![1.0, 0.0])))
            .unwrap();
        recall.reset();
        // после сброса можно перейти в многоклассовый режим
        recall
            .update(&(array(&[1, 2], vec![0.1, 0.9]), array(&[1], vec![1.0])))
            .unwrap();
        assert!((recall.compute().unwrap().as_scalar().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mode_and_class_count_checks() {
        let mut precision = Precision::new();
        precision
            .update(&(array(&[1, 3], vec![0.1, 0.2, 0.7]), array(&[1], vec![2.0])))
            .unwrap();

        let wrong_classes = (array(&[1, 2], vec![0.1, 0.9]), array(&[1], vec![1.0]));
        assert!(matches!(
            precision.update(&wrong_classes),
            Err(MetricError::ShapeMismatch { .. })
        ));

        let binary = (array(&[1], vec![0.9]), array(&[1], vec![1.0]));
        assert!(matches!(
            precision.update(&binary),
            Err(MetricError::InvalidArgument(_))
        ));

        let bad_target = (array(&[1, 3], vec![0.1, 0.2, 0.7]), array(&[1], vec![5.0]));
        assert!(matches!(
            precision.update(&bad_target),
            Err(MetricError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_multiclass_confusion() {
        let mut cm = MultiClassConfusionMatrix::new(3).unwrap();

        let preds = array(
            &[3, 3],
            vec![
                0.7, 0.2, 0.1, // class 0
                0.1, 0.8, 0.1, // class 1
                0.2, 0.3, 0.5, // class 2
            ],
        );
        let targets = array(&[3], vec![0.0, 1.0, 2.0]);

        cm.update(&preds, &targets).unwrap();
        assert_eq!(cm.matrix()[2], vec![0, 0, 1]);
        assert!((cm.accuracy() - 1.0).abs() < 1e-6);
        assert!((cm.macro_f1() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_multiclass_confusion_rejects_bad_input() {
        assert!(matches!(
            MultiClassConfusionMatrix::new(0),
            Err(MetricError::InvalidArgument(_))
        ));
        assert!(MultiClassConfusionMatrix::new(1).is_err());

        let mut cm = MultiClassConfusionMatrix::new(2).unwrap();
        let three_scores = array(&[2, 3], vec![0.1, 0.2, 0.7, 0.6, 0.3, 0.1]);
        assert!(matches!(
            cm.update(&three_scores, &array(&[2], vec![0.0, 1.0])),
            Err(MetricError::ShapeMismatch { .. })
        ));

        let two_scores = array(&[2, 2], vec![0.9, 0.1, 0.2, 0.8]);
        assert!(matches!(
            cm.update(&two_scores, &array(&[3], vec![0.0, 1.0, 1.0])),
            Err(MetricError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            cm.update(&two_scores, &array(&[2, 2], vec![1.0, 0.0, 0.0, 1.0])),
            Err(MetricError::InvalidArgument(_))
        ));
        assert_eq!(cm.total(), 0);

        cm.update(&two_scores, &array(&[2], vec![0.0, 1.0])).unwrap();
        assert_eq!(cm.matrix(), &[vec![1, 0], vec![0, 1]][..]);
    }

    #[test]
    fn test_argmax_ties_pick_first_class() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), 1);

        let mut cm = MultiClassConfusionMatrix::new(2).unwrap();
        cm.update(&array(&[1, 2], vec![0.5, 0.5]), &array(&[1], vec![0.0])).unwrap();
        assert_eq!(cm.matrix()[0], vec![1, 0]);

        let mut accuracy = Accuracy::new();
        accuracy
            .update(&(array(&[1, 3], vec![0.4, 0.4, 0.2]), array(&[1], vec![0.0])))
            .unwrap();
        assert_eq!(accuracy.compute().unwrap(), MetricValue::Scalar(1.0));
    }
}
