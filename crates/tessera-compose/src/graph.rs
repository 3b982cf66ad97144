//! Dependency graph management using `petgraph`.
//!
//! Nodes are resolved instances in declaration order; edges point from a
//! producer to the instances that consume its outputs, so a topological
//! walk yields producers first.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};
use tessera_common::error::CompositionError;
use tessera_common::types::InstanceId;
use tessera_schema::instance::ModuleInstance;

use crate::plan::CompositionPlan;
use crate::resolver::Reference;

/// A dependency graph of module instances.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: Graph<ModuleInstance, ()>,
    references: Vec<Reference>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            references: Vec::new(),
        }
    }

    /// Adds an instance node. Node order is declaration order.
    pub fn add_instance(&mut self, instance: ModuleInstance) -> NodeIndex {
        self.graph.add_node(instance)
    }

    /// Records that `dependent` consumes an output of `dependency`.
    ///
    /// Several references between the same pair collapse into one edge; the
    /// reference itself is kept for reporting.
    pub fn add_dependency(
        &mut self,
        dependent: NodeIndex,
        dependency: NodeIndex,
        reference: Reference,
    ) {
        let _ = self.graph.update_edge(dependency, dependent, ());
        self.references.push(reference);
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Instances in declaration order.
    pub fn instances(&self) -> impl Iterator<Item = &ModuleInstance> {
        self.graph.node_weights()
    }

    /// Looks up an instance by identifier.
    #[must_use]
    pub fn instance(&self, id: &InstanceId) -> Option<&ModuleInstance> {
        self.graph.node_weights().find(|i| i.id() == id)
    }

    /// Every resolved reference, in declaration order.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Identifiers of the instances `id` depends on, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, id: &InstanceId) -> Vec<&InstanceId> {
        let Some(node) = self.node_of(id) else {
            return Vec::new();
        };
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        deps.sort_unstable();
        deps.into_iter().map(|n| self.graph[n].id()).collect()
    }

    fn node_of(&self, id: &InstanceId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&n| self.graph[n].id() == id)
    }

    /// Returns the application order as instance identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] if the graph contains a cycle.
    pub fn resolve_order(&self) -> Result<Vec<InstanceId>, CompositionError> {
        Ok(self
            .sorted_nodes()?
            .into_iter()
            .map(|n| self.graph[n].id().clone())
            .collect())
    }

    /// Consumes the graph and returns the instances in application order.
    ///
    /// # Errors
    ///
    /// Returns [`CompositionError`] if the graph contains a cycle.
    pub fn compose(self) -> Result<CompositionPlan, CompositionError> {
        let order = self.sorted_nodes()?;
        let (nodes, _edges) = self.graph.into_nodes_edges();
        let mut slots: Vec<Option<ModuleInstance>> =
            nodes.into_iter().map(|n| Some(n.weight)).collect();
        let steps = order
            .into_iter()
            .filter_map(|n| slots.get_mut(n.index()).and_then(Option::take))
            .collect();
        Ok(CompositionPlan::new(steps, self.references))
    }

    /// Kahn's algorithm; among ready nodes the earliest declared goes first.
    fn sorted_nodes(&self) -> Result<Vec<NodeIndex>, CompositionError> {
        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| {
                self.graph
                    .neighbors_directed(n, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|n| pending[n.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                pending[next.index()] -= 1;
                if pending[next.index()] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == self.graph.node_count() {
            tracing::info!(instances = order.len(), "composition ordered");
            Ok(order)
        } else {
            let cycle = self.find_cycle();
            tracing::warn!(?cycle, "dependency cycle detected");
            Err(CompositionError { cycle })
        }
    }

    /// Picks the cyclic component holding the lexically-first identifier and
    /// walks its dependency edges from there: each member is reached in
    /// lexical order by a shortest path, then the walk returns to the start.
    /// Every listed instance depends on the next; the last depends on the first.
    fn find_cycle(&self) -> Vec<InstanceId> {
        let cyclic: Vec<Vec<NodeIndex>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();

        let Some(component) = cyclic
            .iter()
            .min_by(|a, b| self.min_id(a).cmp(&self.min_id(b)))
        else {
            return Vec::new();
        };
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let mut targets = component.clone();
        targets.sort_by(|&a, &b| self.graph[a].id().cmp(self.graph[b].id()));
        let Some(&start) = targets.first() else {
            return Vec::new();
        };

        let mut walk = vec![start];
        let mut seen = HashSet::from([start]);
        let mut current = start;
        for target in targets {
            if seen.contains(&target) {
                continue;
            }
            for node in self.shortest_path(current, target, &members) {
                let _ = seen.insert(node);
                walk.push(node);
            }
            current = target;
        }
        // The closing step back to `start` is implied.
        if let Some((_, back)) = self.shortest_path(current, start, &members).split_last() {
            walk.extend_from_slice(back);
        }

        walk.into_iter()
            .map(|n| self.graph[n].id().clone())
            .collect()
    }

    /// Dependencies of `node` inside `members`, in lexical order.
    fn dependencies_within(&self, node: NodeIndex, members: &HashSet<NodeIndex>) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .filter(|n| members.contains(n))
            .collect();
        deps.sort_by(|&a, &b| self.graph[a].id().cmp(self.graph[b].id()));
        deps.dedup();
        deps
    }

    /// Breadth-first path along dependency edges, excluding `from` and ending
    /// at `to`. With `from == to` it is the shortest cycle through `from`.
    fn shortest_path(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        members: &HashSet<NodeIndex>,
    ) -> Vec<NodeIndex> {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        for next in self.dependencies_within(from, members) {
            let _ = parent.insert(next, from);
            queue.push_back(next);
        }

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![node];
                let mut cursor = node;
                while let Some(&prev) = parent.get(&cursor) {
                    if prev == from {
                        break;
                    }
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return path;
            }
            for next in self.dependencies_within(node, members) {
                if !parent.contains_key(&next) {
                    let _ = parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        Vec::new()
    }

    fn min_id(&self, nodes: &[NodeIndex]) -> Option<&InstanceId> {
        nodes.iter().map(|&n| self.graph[n].id()).min()
    }
}
