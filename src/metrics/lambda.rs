// --- Файл: src/metrics/lambda.rs ---

//! `MetricsLambda` - составная метрика.
//!
//! Значение составной метрики - это чистая функция от результатов `compute()`
//! ее аргументов-метрик (и произвольных констант). Аргументы сами могут быть
//! составными метриками, так что из метрик строится граф зависимостей:
//!
//! ```text
//!            f1 = 2 * p * r / (p + r)
//!               /              \
//!          mul(p, r)        add(p, r)
//!           /    \           /    \
//!          p      r         p      r      <- одни и те же листья
//! ```
//!
//! Сама `MetricsLambda` состояния не хранит: ее собственные `Metric::reset` и
//! `Metric::update` ничего не делают. Жизненный цикл распространяет обход
//! графа (`MetricHandle::reset` / `update` и привязка к циклу): каждый
//! *различный* узел получает свой вызов ровно один раз, сколько бы путей к
//! нему ни вело. `compute()` каждый раз заново вычисляет аргументы и ничего не
//! кэширует.

use super::handle::{collect_nodes, MetricHandle};
use super::{Metric, MetricValue};
use crate::error::{MetricError, Result};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Функция, вычисляющая значение составной метрики из значений аргументов.
pub type LambdaFn = Box<dyn Fn(&LambdaArgs) -> Result<MetricValue>>;

/// Аргумент `MetricsLambda`: отслеживаемая метрика или константа.
pub enum Arg<O> {
    Metric(MetricHandle<O>),
    Const(MetricValue),
}

impl<O> Clone for Arg<O> {
    fn clone(&self) -> Self {
        match self {
            Arg::Metric(m) => Arg::Metric(m.clone()),
            Arg::Const(c) => Arg::Const(c.clone()),
        }
    }
}

impl<O> Arg<O> {
    fn evaluate(&self) -> Result<MetricValue> {
        match self {
            Arg::Metric(m) => m.compute(),
            Arg::Const(c) => Ok(c.clone()),
        }
    }

    fn as_metric(&self) -> Option<&MetricHandle<O>> {
        match self {
            Arg::Metric(m) => Some(m),
            Arg::Const(_) => None,
        }
    }
}

impl<O> From<MetricHandle<O>> for Arg<O> {
    fn from(handle: MetricHandle<O>) -> Self {
        Arg::Metric(handle)
    }
}

impl<O> From<&MetricHandle<O>> for Arg<O> {
    fn from(handle: &MetricHandle<O>) -> Self {
        Arg::Metric(handle.clone())
    }
}

impl<O> From<MetricValue> for Arg<O> {
    fn from(value: MetricValue) -> Self {
        Arg::Const(value)
    }
}

impl<O> From<f64> for Arg<O> {
    fn from(value: f64) -> Self {
        Arg::Const(MetricValue::Scalar(value))
    }
}

impl<O> fmt::Debug for Arg<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Metric(m) => write!(f, "{:?}", m),
            Arg::Const(c) => write!(f, "Const({})", c),
        }
    }
}

/// Вычисленные аргументы, передаваемые в функцию `MetricsLambda`.
#[derive(Debug, Clone, Default)]
pub struct LambdaArgs {
    positional: Vec<MetricValue>,
    named: BTreeMap<String, MetricValue>,
}

impl LambdaArgs {
    pub fn new(positional: Vec<MetricValue>, named: BTreeMap<String, MetricValue>) -> Self {
        Self { positional, named }
    }

    /// Позиционный аргумент с индексом `index`.
    pub fn arg(&self, index: usize) -> Result<&MetricValue> {
        self.positional
            .get(index)
            .ok_or_else(|| MetricError::MissingArgument(format!("позиционный аргумент #{}", index)))
    }

    /// Именованный аргумент.
    pub fn named(&self, key: &str) -> Result<&MetricValue> {
        self.named
            .get(key)
            .ok_or_else(|| MetricError::MissingArgument(format!("именованный аргумент '{}'", key)))
    }

    /// Позиционный аргумент как скаляр.
    pub fn scalar(&self, index: usize) -> Result<f64> {
        self.arg(index)?.as_scalar()
    }

    pub fn positional(&self) -> &[MetricValue] {
        &self.positional
    }

    pub fn named_args(&self) -> &BTreeMap<String, MetricValue> {
        &self.named
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Составная метрика: `f(*args, **kwargs)` над значениями аргументов.
pub struct MetricsLambda<O> {
    name: String,
    f: LambdaFn,
    args: Vec<Arg<O>>,
    kwargs: Vec<(String, Arg<O>)>,
}

impl<O: 'static> MetricsLambda<O> {
    /// Создает составную метрику.
    ///
    /// Сразу после создания все листовые метрики, достижимые из аргументов,
    /// сбрасываются, так что накопление начинается с чистого состояния.
    pub fn new<F>(
        name: impl Into<String>,
        f: F,
        args: Vec<Arg<O>>,
        kwargs: Vec<(String, Arg<O>)>,
    ) -> Self
    where
        F: Fn(&LambdaArgs) -> Result<MetricValue> + 'static,
    {
        let lambda = Self {
            name: name.into(),
            f: Box::new(f),
            args,
            kwargs,
        };
        lambda.reset_arguments();
        lambda
    }

    /// Пошаговое построение составной метрики.
    pub fn builder<F>(name: impl Into<String>, f: F) -> MetricsLambdaBuilder<O>
    where
        F: Fn(&LambdaArgs) -> Result<MetricValue> + 'static,
    {
        MetricsLambdaBuilder {
            name: name.into(),
            f: Box::new(f),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    /// Создает метрику и сразу оборачивает ее в разделяемый дескриптор.
    pub fn into_handle(self) -> MetricHandle<O> {
        MetricHandle::new(self)
    }
}

impl<O> MetricsLambda<O> {
    fn metric_args(&self) -> impl Iterator<Item = &MetricHandle<O>> {
        self.args
            .iter()
            .chain(self.kwargs.iter().map(|(_, arg)| arg))
            .filter_map(Arg::as_metric)
    }

    fn evaluate_args(&self) -> Result<LambdaArgs> {
        let positional = self
            .args
            .iter()
            .map(Arg::evaluate)
            .collect::<Result<Vec<_>>>()?;
        let mut named = BTreeMap::new();
        for (key, arg) in &self.kwargs {
            named.insert(key.clone(), arg.evaluate()?);
        }
        Ok(LambdaArgs::new(positional, named))
    }

    /// Сбрасывает все различные узлы, достижимые из аргументов.
    fn reset_arguments(&self) {
        let nodes = collect_nodes(self.metric_args());
        trace!(metric = %self.name, nodes = nodes.len(), "reset arguments");
        for node in nodes {
            node.reset_node();
        }
    }
}

impl<O: 'static> Metric<O> for MetricsLambda<O> {
    // Аргументы сбрасывает и обновляет обход графа, своего состояния нет.
    fn reset(&mut self) {}

    fn update(&mut self, _output: &O) -> Result<()> {
        Ok(())
    }

    fn compute(&self) -> Result<MetricValue> {
        let args = self.evaluate_args()?;
        (self.f)(&args)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<MetricHandle<O>> {
        self.metric_args().cloned().collect()
    }
}

impl<O> fmt::Debug for MetricsLambda<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsLambda")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

/// Построитель `MetricsLambda`.
pub struct MetricsLambdaBuilder<O> {
    name: String,
    f: LambdaFn,
    args: Vec<Arg<O>>,
    kwargs: Vec<(String, Arg<O>)>,
}

impl<O: 'static> MetricsLambdaBuilder<O> {
    /// Добавляет позиционный аргумент (метрику или константу).
    pub fn arg(mut self, arg: impl Into<Arg<O>>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn metric(self, metric: &MetricHandle<O>) -> Self {
        self.arg(metric)
    }

    pub fn constant(self, value: impl Into<MetricValue>) -> Self {
        self.arg(Arg::Const(value.into()))
    }

    /// Добавляет именованный аргумент.
    pub fn named(mut self, key: impl Into<String>, arg: impl Into<Arg<O>>) -> Self {
        self.kwargs.push((key.into(), arg.into()));
        self
    }

    pub fn build(self) -> MetricsLambda<O> {
        let lambda = MetricsLambda {
            name: self.name,
            f: self.f,
            args: self.args,
            kwargs: self.kwargs,
        };
        lambda.reset_arguments();
        lambda
    }

    pub fn into_handle(self) -> MetricHandle<O> {
        MetricHandle::new(self.build())
    }
}

/// Комбинатор: составная метрика над позиционными аргументами.
///
/// На нем построены все арифметические операторы над `MetricHandle`.
pub fn combine<O, F>(name: &str, f: F, args: Vec<Arg<O>>) -> MetricHandle<O>
where
    O: 'static,
    F: Fn(&LambdaArgs) -> Result<MetricValue> + 'static,
{
    MetricHandle::new(MetricsLambda::new(name, f, args, Vec::new()))
}
