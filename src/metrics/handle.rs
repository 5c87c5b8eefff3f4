// --- Файл: src/metrics/handle.rs ---

//! Разделяемый дескриптор метрики.
//!
//! `MetricHandle` - это легковесная ссылка (`Rc<RefCell<dyn Metric<O>>>`) на
//! метрику. Одна и та же листовая метрика может входить в несколько составных
//! метрик и при этом быть подключенной к циклу под своим именем; идентичность
//! узла определяется указателем, а не значением.

use super::{Metric, MetricValue};
use crate::engine::Engine;
use crate::error::Result;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

pub struct MetricHandle<O> {
    inner: Rc<RefCell<dyn Metric<O>>>,
}

impl<O> Clone for MetricHandle<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<O: 'static> MetricHandle<O> {
    /// Оборачивает метрику в новый разделяемый дескриптор.
    pub fn new<M: Metric<O> + 'static>(metric: M) -> Self {
        Self {
            inner: Rc::new(RefCell::new(metric)),
        }
    }

    /// Создает дескриптор из уже разделяемой метрики.
    ///
    /// Позволяет вызывающему коду сохранить типизированный доступ к метрике
    /// (`Rc<RefCell<M>>`) и одновременно использовать ее в композиции.
    pub fn from_shared<M: Metric<O> + 'static>(shared: Rc<RefCell<M>>) -> Self {
        Self { inner: shared }
    }

    /// Подключает метрику к циклу оценки под именем `name`.
    pub fn attach<B>(&self, engine: &mut Engine<B, O>, name: &str) -> Result<()> {
        engine.metric_binding_mut().attach(name, self.clone())
    }

    /// Отключает метрику, подключенную под именем `name`.
    pub fn detach<B>(&self, engine: &mut Engine<B, O>, name: &str) -> Result<()> {
        engine.metric_binding_mut().detach(name, self)
    }

    /// Проверяет, подключена ли эта метрика под именем `name`.
    pub fn is_attached<B>(&self, engine: &Engine<B, O>, name: &str) -> bool {
        engine.metric_binding().is_attached(name, self)
    }
}

impl<O> MetricHandle<O> {
    /// Сбрасывает эту метрику и все различные метрики, от которых она зависит.
    ///
    /// Каждый узел подграфа получает свой `Metric::reset` ровно один раз.
    pub fn reset(&self) {
        let nodes = collect_nodes([self]);
        trace!(metric = %self.name(), nodes = nodes.len(), "reset");
        for node in &nodes {
            node.reset_node();
        }
    }

    /// Передает выход шага каждому различному узлу подграфа, зависимости первыми.
    pub fn update(&self, output: &O) -> Result<()> {
        for node in collect_nodes([self]) {
            node.update_node(output)?;
        }
        Ok(())
    }

    pub(crate) fn reset_node(&self) {
        self.inner.borrow_mut().reset();
    }

    pub(crate) fn update_node(&self, output: &O) -> Result<()> {
        self.inner.borrow_mut().update(output)
    }

    pub fn compute(&self) -> Result<MetricValue> {
        self.inner.borrow().compute()
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name().to_string()
    }

    pub fn dependencies(&self) -> Vec<MetricHandle<O>> {
        self.inner.borrow().dependencies()
    }

    /// Идентификатор узла (адрес разделяемой метрики).
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    /// Указывают ли два дескриптора на одну и ту же метрику.
    pub fn ptr_eq(&self, other: &MetricHandle<O>) -> bool {
        self.id() == other.id()
    }
}

impl<O> fmt::Debug for MetricHandle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(metric) => write!(f, "MetricHandle({} @ {:#x})", metric.name(), self.id()),
            Err(_) => write!(f, "MetricHandle(<borrowed> @ {:#x})", self.id()),
        }
    }
}

/// Собирает все различные узлы графа зависимостей, достижимые из `roots`.
///
/// Каждый узел попадает в результат один раз, даже если к нему ведут несколько
/// путей. Зависимости идут раньше зависящих от них узлов (post-order), корни -
/// в порядке перечисления.
pub(crate) fn collect_nodes<'a, O: 'a>(
    roots: impl IntoIterator<Item = &'a MetricHandle<O>>,
) -> Vec<MetricHandle<O>> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for root in roots {
        visit(root, &mut seen, &mut nodes);
    }
    nodes
}

fn visit<O>(node: &MetricHandle<O>, seen: &mut HashSet<usize>, nodes: &mut Vec<MetricHandle<O>>) {
    if !seen.insert(node.id()) {
        return;
    }
    for dep in node.dependencies() {
        visit(&dep, seen, nodes);
    }
    nodes.push(node.clone());
}
