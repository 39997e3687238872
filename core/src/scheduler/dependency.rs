use super::graph::DependencyGraph;
use crate::network::{ComponentId, Network};
use crate::schedule::Schedule;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt;

/// Human-readable name of a port slot, `component.port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotName {
    pub component: String,
    pub port: String,
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.port)
    }
}

/// The network has an instantaneous dependency loop.
///
/// Every offending strongly connected component is reported in full.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle detected: {}", describe(.cycles))]
pub struct CycleError {
    pub cycles: Vec<Vec<SlotName>>,
}

impl CycleError {
    /// Each component involved in any cycle, once, in order of appearance.
    pub fn components(&self) -> Vec<&str> {
        let mut seen = IndexSet::new();
        for slot in self.cycles.iter().flatten() {
            seen.insert(slot.component.as_str());
        }
        seen.into_iter().collect()
    }
}

fn describe(cycles: &[Vec<SlotName>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let slots: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            format!("[{}]", slots.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Orders components by a topological sort of the port dependency graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyScheduler;

impl DependencyScheduler {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, network: &Network) -> Result<Schedule, CycleError> {
        let graph = DependencyGraph::from_network(network);
        log::trace!(
            "DependencyScheduler: {} slots, {} edges",
            graph.len(),
            graph.edge_count()
        );

        let cycles = graph.cycles();
        if !cycles.is_empty() {
            return Err(CycleError {
                cycles: cycles
                    .iter()
                    .map(|cycle| slot_names(network, &graph, cycle))
                    .collect(),
            });
        }
        let order = graph.topological_order().map_err(|stuck| CycleError {
            cycles: vec![slot_names(network, &graph, &stuck)],
        })?;

        // A component is placed where it can first produce output: its
        // first sorted output slot, or its last sorted input slot when that
        // comes earlier (or it has no outputs).
        let mut first_output: HashMap<ComponentId, usize> = HashMap::new();
        let mut last_input: HashMap<ComponentId, usize> = HashMap::new();
        for (position, &node) in order.iter().enumerate() {
            let slot = graph.slot(node);
            let is_output = network
                .ports(slot.component)
                .and_then(|ports| ports.get(slot.port))
                .is_some_and(|p| p.is_output());
            if is_output {
                first_output.entry(slot.component).or_insert(position);
            } else {
                last_input.insert(slot.component, position);
            }
        }

        let mut scheduled: IndexSet<ComponentId> = IndexSet::with_capacity(network.len());
        for (position, &node) in order.iter().enumerate() {
            let component = graph.slot(node).component;
            let emit_at = match (first_output.get(&component), last_input.get(&component)) {
                (Some(&out), Some(&inp)) => out.min(inp),
                (Some(&out), None) => out,
                (None, Some(&inp)) => inp,
                (None, None) => continue,
            };
            if position == emit_at {
                scheduled.insert(component);
            }
        }
        for id in network.ids() {
            scheduled.insert(id);
        }

        let schedule = Schedule::new(scheduled, network.version());
        log::info!(
            "DependencyScheduler: Scheduled {} components: {:?}",
            schedule.len(),
            schedule.names(network)
        );
        Ok(schedule)
    }
}

fn slot_names(network: &Network, graph: &DependencyGraph, nodes: &[usize]) -> Vec<SlotName> {
    nodes
        .iter()
        .map(|&node| {
            let slot = graph.slot(node);
            SlotName {
                component: network.name(slot.component).unwrap_or("?").to_string(),
                port: network
                    .ports(slot.component)
                    .and_then(|ports| ports.get(slot.port))
                    .map(|p| p.id.clone())
                    .unwrap_or_default(),
            }
        })
        .collect()
}
