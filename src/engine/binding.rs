//! Binding of attached metrics to the engine lifecycle.
//!
//! The engine owns exactly one [`MetricBinding`]. Every `attach` adds a named
//! root to it; the binding itself reacts to three events:
//!
//! - `EpochStarted`: reset every distinct node of all attached roots once;
//! - `IterationCompleted`: update every distinct node once with the step output,
//!   dependencies before the nodes built on them;
//! - `EpochCompleted`: compute each attached root once and publish it by name.
//!
//! Nodes shared between roots (or attached under their own name as well) are
//! therefore never reset or updated twice in the same step. Composites with
//! state of their own get their own `reset`/`update` like any leaf.

use crate::error::{MetricError, Result};
use crate::metrics::handle::collect_nodes;
use crate::metrics::{MetricHandle, MetricValue};
use std::collections::BTreeMap;
use tracing::debug;

pub struct MetricBinding<O> {
    attached: Vec<(String, MetricHandle<O>)>,
    nodes: Vec<MetricHandle<O>>,
}

impl<O> Default for MetricBinding<O> {
    fn default() -> Self {
        Self {
            attached: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

impl<O> MetricBinding<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, name: &str, metric: MetricHandle<O>) -> Result<()> {
        if self.attached.iter().any(|(n, _)| n == name) {
            return Err(MetricError::AlreadyAttached(name.to_string()));
        }
        self.attached.push((name.to_string(), metric));
        self.refresh_nodes();
        debug!(name, roots = self.attached.len(), nodes = self.nodes.len(), "metric attached");
        Ok(())
    }

    pub fn detach(&mut self, name: &str, metric: &MetricHandle<O>) -> Result<()> {
        let position = self
            .attached
            .iter()
            .position(|(n, m)| n == name && m.ptr_eq(metric))
            .ok_or_else(|| MetricError::NotAttached(name.to_string()))?;
        self.attached.remove(position);
        self.refresh_nodes();
        debug!(name, roots = self.attached.len(), nodes = self.nodes.len(), "metric detached");
        Ok(())
    }

    pub fn is_attached(&self, name: &str, metric: &MetricHandle<O>) -> bool {
        self.attached.iter().any(|(n, m)| n == name && m.ptr_eq(metric))
    }

    /// Attached names in attachment order.
    pub fn names(&self) -> Vec<&str> {
        self.attached.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Distinct nodes reachable from all attached roots, dependencies first.
    pub fn nodes(&self) -> &[MetricHandle<O>] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    // Dependency graphs are immutable once built, so the node set only
    // changes on attach/detach.
    fn refresh_nodes(&mut self) {
        self.nodes = collect_nodes(self.attached.iter().map(|(_, m)| m));
    }

    pub(crate) fn epoch_started(&self) {
        for node in &self.nodes {
            node.reset_node();
        }
    }

    pub(crate) fn iteration_completed(&self, output: &O) -> Result<()> {
        for node in &self.nodes {
            node.update_node(output)?;
        }
        Ok(())
    }

    pub(crate) fn epoch_completed(&self, metrics: &mut BTreeMap<String, MetricValue>) -> Result<()> {
        for (name, root) in &self.attached {
            let value = root.compute()?;
            metrics.insert(name.clone(), value);
        }
        Ok(())
    }
}
