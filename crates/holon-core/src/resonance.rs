//! Resonance detection: phase alignment between agents.
//!
//! Resonance is the cosine of the phase difference between two agents. The
//! detector builds a thresholded resonance graph (petgraph, undirected) and
//! derives clusters (connected components via union-find), the order
//! parameter, and a greedy approximate maximum clique.
//!
//! Nothing here changes agent state except [`ResonanceDetector::annotate`],
//! which writes the last computed resonance back into each agent's cache.

use crate::agent::FractalAgent;
use crate::types::{circular_mean, AgentId};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Configuration for the resonance detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    /// Minimum resonance for two agents to be linked (default: 0.95).
    pub threshold: f64,
    /// Use `|cos Δθ|` instead of `cos Δθ` (default: false).
    pub fold_absolute: bool,
    /// Smallest cluster handed to composition (default: 2).
    pub min_cluster_size: usize,
    /// Largest cluster handed to composition (default: 8).
    pub max_cluster_size: usize,
    /// How many seed vertices the greedy clique search tries (default: 8).
    pub clique_starts: usize,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            fold_absolute: false,
            min_cluster_size: 2,
            max_cluster_size: 8,
            clique_starts: 8,
        }
    }
}

/// Order parameter of a group: `r·e^{iψ}` = mean unit phase vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeanField {
    /// `r` in `[0, 1]`.
    pub magnitude: f64,
    /// `ψ` in `[0, 2π)`.
    pub phase: f64,
}

/// Thresholded resonance graph over a set of agents.
#[derive(Debug, Clone)]
pub struct ResonanceNetwork {
    graph: UnGraph<AgentId, f64>,
    node_index: BTreeMap<AgentId, NodeIndex>,
}

impl ResonanceNetwork {
    pub fn graph(&self) -> &UnGraph<AgentId, f64> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.node_index.contains_key(id)
    }

    /// Edge weight between two agents, if they are linked.
    pub fn weight(&self, a: &AgentId, b: &AgentId) -> Option<f64> {
        let ia = *self.node_index.get(a)?;
        let ib = *self.node_index.get(b)?;
        let edge = self.graph.find_edge(ia, ib)?;
        Some(self.graph[edge])
    }

    /// Linked agents with edge weights, strongest first (ties by id).
    pub fn neighbors(&self, id: &AgentId) -> Vec<(AgentId, f64)> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut result: Vec<(AgentId, f64)> = self
            .graph
            .edges(idx)
            .map(|edge| {
                let other = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other], *edge.weight())
            })
            .collect();
        result.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        result
    }

    /// Sum of incident edge weights.
    pub fn weighted_degree(&self, id: &AgentId) -> f64 {
        self.neighbors(id).iter().map(|(_, w)| w).sum()
    }

    /// Connected components, each sorted by id, ordered by smallest member.
    pub fn components(&self) -> Vec<Vec<AgentId>> {
        let n = self.graph.node_count();
        let mut uf: UnionFind<usize> = UnionFind::new(n);
        for edge in self.graph.edge_references() {
            uf.union(edge.source().index(), edge.target().index());
        }

        let mut groups: BTreeMap<usize, BTreeSet<AgentId>> = BTreeMap::new();
        for idx in self.graph.node_indices() {
            let root = uf.find(idx.index());
            groups.entry(root).or_default().insert(self.graph[idx]);
        }

        let mut components: Vec<Vec<AgentId>> = groups
            .into_values()
            .map(|members| members.into_iter().collect())
            .collect();
        components.sort_by(|a, b| a.first().cmp(&b.first()));
        components
    }
}

/// Computes phase alignment between agents and derives groupings.
#[derive(Debug, Clone, Default)]
pub struct ResonanceDetector {
    config: ResonanceConfig,
}

impl ResonanceDetector {
    pub fn new(config: ResonanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResonanceConfig {
        &self.config
    }

    /// Resonance between two phases.
    pub fn phase_resonance(&self, a: f64, b: f64) -> f64 {
        // |Δθ| keeps the value bit-identical in both argument orders.
        let r = (a - b).abs().cos();
        if self.config.fold_absolute {
            r.abs()
        } else {
            r
        }
    }

    /// `cos(θa − θb)`, folded to its magnitude when configured.
    pub fn resonance(&self, a: &FractalAgent, b: &FractalAgent) -> f64 {
        if a.id() == b.id() {
            return 1.0;
        }
        self.phase_resonance(a.phase(), b.phase())
    }

    /// Pairwise resonance matrix in input order. Diagonal is exactly 1.
    pub fn resonance_matrix(&self, agents: &[FractalAgent]) -> Vec<Vec<f64>> {
        let n = agents.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            matrix[i][i] = 1.0;
            for j in (i + 1)..n {
                let r = self.resonance(&agents[i], &agents[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }
        matrix
    }

    /// Graph linking every pair whose resonance is at least `threshold`.
    pub fn resonance_network(&self, agents: &[FractalAgent], threshold: f64) -> ResonanceNetwork {
        let mut graph = UnGraph::new_undirected();
        let mut node_index = BTreeMap::new();
        let mut ordered: Vec<&FractalAgent> = agents.iter().collect();
        ordered.sort_by_key(|a| a.id());
        ordered.dedup_by_key(|a| a.id());

        let indices: Vec<NodeIndex> = ordered
            .iter()
            .map(|a| {
                let idx = graph.add_node(a.id());
                node_index.insert(a.id(), idx);
                idx
            })
            .collect();

        for i in 0..ordered.len() {
            for j in (i + 1)..ordered.len() {
                let r = self.resonance(ordered[i], ordered[j]);
                if r >= threshold {
                    graph.add_edge(indices[i], indices[j], r);
                }
            }
        }

        ResonanceNetwork { graph, node_index }
    }

    /// Connected components of the resonance network within the size bounds.
    pub fn clusters(
        &self,
        agents: &[FractalAgent],
        min_size: usize,
        max_size: usize,
    ) -> Vec<Vec<AgentId>> {
        self.resonance_network(agents, self.config.threshold)
            .components()
            .into_iter()
            .filter(|c| c.len() >= min_size && c.len() <= max_size)
            .collect()
    }

    /// Clusters using the configured size bounds.
    pub fn candidate_clusters(&self, agents: &[FractalAgent]) -> Vec<Vec<AgentId>> {
        self.clusters(
            agents,
            self.config.min_cluster_size,
            self.config.max_cluster_size,
        )
    }

    /// Magnitude of the mean unit phase vector; 0 for an empty group.
    pub fn coherence(&self, agents: &[FractalAgent]) -> f64 {
        self.mean_field(agents).magnitude
    }

    pub fn mean_field(&self, agents: &[FractalAgent]) -> MeanField {
        let (phase, magnitude) = circular_mean(agents.iter().map(|a| a.phase()));
        MeanField { magnitude, phase }
    }

    /// Best-effort search for a fully mutually resonant subgroup.
    ///
    /// Greedy: from each of the strongest seed vertices, add neighbours in
    /// descending edge weight while they stay adjacent to every member.
    /// Returns an empty vector when no pair resonates.
    pub fn max_clique(&self, agents: &[FractalAgent]) -> Vec<AgentId> {
        let network = self.resonance_network(agents, self.config.threshold);
        if network.edge_count() == 0 {
            return Vec::new();
        }

        let mut seeds: Vec<(AgentId, f64)> = network
            .graph()
            .node_weights()
            .map(|id| (*id, network.weighted_degree(id)))
            .filter(|(_, degree)| *degree > 0.0)
            .collect();
        seeds.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        seeds.truncate(self.config.clique_starts.max(1));

        let mut best: Vec<AgentId> = Vec::new();
        let mut best_weight = 0.0;
        for (seed, _) in seeds {
            let mut clique = vec![seed];
            let mut weight = 0.0;
            for (candidate, _) in network.neighbors(&seed) {
                let links: Option<Vec<f64>> = clique
                    .iter()
                    .map(|member| network.weight(member, &candidate))
                    .collect();
                if let Some(links) = links {
                    weight += links.iter().sum::<f64>();
                    clique.push(candidate);
                }
            }
            if clique.len() > best.len() || (clique.len() == best.len() && weight > best_weight) {
                best = clique;
                best_weight = weight;
            }
        }

        if best.len() < 2 {
            return Vec::new();
        }
        best.sort();
        best
    }

    /// Cache each agent's mean folded resonance with its peers.
    pub fn annotate(&self, agents: &mut [FractalAgent]) {
        let phases: Vec<f64> = agents.iter().map(|a| a.phase()).collect();
        let n = phases.len();
        for (i, agent) in agents.iter_mut().enumerate() {
            if n < 2 {
                agent.set_resonance(0.0);
                continue;
            }
            let total: f64 = phases
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, &p)| (phases[i] - p).abs().cos().abs())
                .sum();
            agent.set_resonance(total / (n - 1) as f64);
        }
    }
}
