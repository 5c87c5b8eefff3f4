// --- Файл: src/error.rs ---

//! Типы ошибок для метрик и цикла оценки.

use thiserror::Error;

/// Ошибки, возникающие при работе с метриками.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    /// Метрика не получила ни одного примера с момента последнего `reset()`.
    #[error("Метрика '{metric}' должна получить хотя бы один пример до вызова compute()")]
    NotComputable { metric: String },

    #[error("Несовпадение форм: ожидалось {expected:?}, получено {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    #[error("Неверный аргумент: {0}")]
    InvalidArgument(String),

    /// Функция `MetricsLambda` запросила аргумент, которого нет.
    #[error("Отсутствует аргумент: {0}")]
    MissingArgument(String),

    #[error("Метрика с именем '{0}' уже подключена")]
    AlreadyAttached(String),

    #[error("Метрика с именем '{0}' не подключена")]
    NotAttached(String),

    #[error("Ожидалось скалярное значение: {0}")]
    NonScalar(String),
}

/// Ошибки цикла оценки (`Engine`).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Ошибка метрики: {0}")]
    Metric(#[from] MetricError),

    #[error("Ошибка функции обработки батча: {0}")]
    Process(String),

    #[error("Ошибка обработчика события: {0}")]
    Handler(String),

    #[error("Неверная конфигурация: {0}")]
    Config(String),

    #[error("Ошибка ввода/вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MetricError>;
