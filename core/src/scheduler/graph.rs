//! Port-level dependency graph used to order and validate a network.

use crate::network::{ComponentId, Network};
use crate::Dependencies;
use std::collections::{HashMap, HashSet, VecDeque};

/// One port of one component; the nodes of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub component: ComponentId,
    /// Position in the component's port list
    pub port: usize,
}

/// Directed graph whose edges mean "the value at slot A can influence the
/// value at slot B within one instant".
///
/// Nodes are numbered in discovery order: components in registration
/// order, ports in declaration order. Successor lists keep insertion order,
/// so every traversal below is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    slots: Vec<Slot>,
    index: HashMap<Slot, usize>,
    successors: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn from_network(network: &Network) -> Self {
        let mut graph = Self::default();

        for id in network.ids() {
            let ports = network.ports(id).unwrap_or_default();
            for port in 0..ports.len() {
                graph.add_slot(Slot {
                    component: id,
                    port,
                });
            }
        }

        // Connection edges: producer output -> consumer input
        for c in network.connections() {
            let (Some(src), Some(snk)) = (
                network.port_index(c.source, &c.source_port),
                network.port_index(c.sink, &c.sink_port),
            ) else {
                continue;
            };
            graph.add_edge(
                Slot {
                    component: c.source,
                    port: src,
                },
                Slot {
                    component: c.sink,
                    port: snk,
                },
            );
        }

        // Function dependency edges inside each component: input -> output
        for id in network.ids() {
            let ports = network.ports(id).unwrap_or_default();
            let pairs: Vec<(usize, usize)> = match network.dependencies(id) {
                Some(Dependencies::AllToAll) => {
                    let mut pairs = Vec::new();
                    for (i, input) in ports.iter().enumerate() {
                        for (o, output) in ports.iter().enumerate() {
                            if input.is_input() && output.is_output() {
                                pairs.push((i, o));
                            }
                        }
                    }
                    pairs
                }
                Some(Dependencies::Pairs(pairs)) => pairs
                    .iter()
                    .filter_map(|(input, output)| {
                        Some((
                            network.port_index(id, input)?,
                            network.port_index(id, output)?,
                        ))
                    })
                    .collect(),
                Some(Dependencies::Decoupled) | None => Vec::new(),
            };
            for (i, o) in pairs {
                graph.add_edge(
                    Slot {
                        component: id,
                        port: i,
                    },
                    Slot {
                        component: id,
                        port: o,
                    },
                );
            }
        }

        graph
    }

    fn add_slot(&mut self, slot: Slot) {
        self.index.insert(slot, self.slots.len());
        self.slots.push(slot);
        self.successors.push(Vec::new());
    }

    fn add_edge(&mut self, from: Slot, to: Slot) {
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            return;
        };
        if !self.successors[a].contains(&b) {
            self.successors[a].push(b);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, node: usize) -> Slot {
        self.slots[node]
    }

    pub fn node(&self, slot: Slot) -> Option<usize> {
        self.index.get(&slot).copied()
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.successors[node]
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// Tarjan's algorithm. Components come out in reverse topological order.
    ///
    /// Iterative, so arbitrarily long dependency chains cannot exhaust the
    /// call stack.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut index: Vec<Option<usize>> = vec![None; n];
        let mut lowlink = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut next_index = 0;
        let mut components = Vec::new();
        // (node, position of the next successor to examine)
        let mut work: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if index[root].is_some() {
                continue;
            }
            work.push((root, 0));

            'frames: while let Some(&(v, resume_at)) = work.last() {
                if index[v].is_none() {
                    index[v] = Some(next_index);
                    lowlink[v] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }

                let successors = &self.successors[v];
                let mut i = resume_at;
                while i < successors.len() {
                    let w = successors[i];
                    i += 1;
                    match index[w] {
                        None => {
                            if let Some(frame) = work.last_mut() {
                                frame.1 = i;
                            }
                            work.push((w, 0));
                            continue 'frames;
                        }
                        Some(w_index) if on_stack[w] => {
                            lowlink[v] = lowlink[v].min(w_index);
                        }
                        Some(_) => {}
                    }
                }

                work.pop();
                if index[v] == Some(lowlink[v]) {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    components.push(component);
                }
                if let Some(&(parent, _)) = work.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[v]);
                }
            }
        }
        components
    }

    /// Every SCC that makes the graph cyclic: more than one node, or a
    /// single node with a self-edge.
    ///
    /// Each cycle lists its nodes in depth-first order from the
    /// lowest-numbered member; cycles are sorted by that member.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let mut cycles: Vec<Vec<usize>> = self
            .strongly_connected_components()
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.successors[scc[0]].contains(&scc[0]))
            .map(|scc| self.walk_within(&scc))
            .collect();
        cycles.sort_by_key(|c| c[0]);
        cycles
    }

    /// Kahn's algorithm with FIFO tie-breaking in discovery order.
    ///
    /// On failure returns the nodes that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<usize>, Vec<usize>> {
        let mut in_degree = vec![0usize; self.len()];
        for succ in &self.successors {
            for &w in succ {
                in_degree[w] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&v| in_degree[v] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &w in &self.successors[v] {
                in_degree[w] -= 1;
                if in_degree[w] == 0 {
                    queue.push_back(w);
                }
            }
        }

        if order.len() == self.len() {
            Ok(order)
        } else {
            Err((0..self.len()).filter(|&v| in_degree[v] > 0).collect())
        }
    }

    fn walk_within(&self, members: &[usize]) -> Vec<usize> {
        let set: HashSet<usize> = members.iter().copied().collect();
        let start = members.iter().copied().min().unwrap_or_default();

        let mut seen = HashSet::new();
        let mut ordered = Vec::with_capacity(members.len());
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            if !seen.insert(v) {
                continue;
            }
            ordered.push(v);
            for &w in self.successors[v].iter().rev() {
                if set.contains(&w) && !seen.contains(&w) {
                    stack.push(w);
                }
            }
        }
        ordered
    }
}
