//! Community detection module

pub mod louvain;
pub mod metrics;
pub mod observer;

use crate::error::PartitionError;
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use louvain::{Detection, DetectionStats, LevelStats, Louvain};
pub use observer::{LogObserver, NoopObserver, ProgressObserver};

/// Contiguous community identifier, starting at 0
pub type CommunityId = usize;

/// Community id to its member nodes, ascending within each community
pub type CommunityClassMap = BTreeMap<CommunityId, Vec<NodeId>>;

/// Assignment of every node to exactly one community.
///
/// Nodes are kept ascending and community ids always cover `0..K` with no
/// gaps, where `K` is `community_count()`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partition {
    nodes: Vec<NodeId>,
    communities: Vec<CommunityId>,
    community_count: usize,
}

impl Partition {
    /// Validate a raw assignment; pairs may arrive in any node order
    pub fn from_assignments(
        nodes: Vec<NodeId>,
        communities: Vec<CommunityId>,
    ) -> Result<Self, PartitionError> {
        if nodes.len() != communities.len() {
            return Err(PartitionError::LengthMismatch {
                expected: nodes.len(),
                found: communities.len(),
            });
        }

        let mut pairs: Vec<(NodeId, CommunityId)> = nodes.into_iter().zip(communities).collect();
        pairs.sort_unstable();
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(PartitionError::DuplicateNode(w[0].0));
        }

        let community_count = pairs.iter().map(|&(_, c)| c + 1).max().unwrap_or(0);
        let mut used = vec![false; community_count];
        for &(_, c) in &pairs {
            used[c] = true;
        }
        if let Some(gap) = used.iter().position(|&u| !u) {
            return Err(PartitionError::Gap(gap));
        }

        let (nodes, communities) = pairs.into_iter().unzip();
        Ok(Self {
            nodes,
            communities,
            community_count,
        })
    }

    /// Renumber arbitrary labels by first appearance over ascending `nodes`
    pub(crate) fn canonical(nodes: Vec<NodeId>, labels: &[usize]) -> Self {
        let (communities, community_count) = renumber(labels);
        Self {
            nodes,
            communities,
            community_count,
        }
    }

    pub fn community_of(&self, node: NodeId) -> Option<CommunityId> {
        self.nodes
            .binary_search(&node)
            .ok()
            .map(|i| self.communities[i])
    }

    pub fn community_count(&self) -> usize {
        self.community_count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Community ids parallel to `nodes()`
    pub fn assignments(&self) -> &[CommunityId] {
        &self.communities
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, CommunityId)> + '_ {
        self.nodes.iter().copied().zip(self.communities.iter().copied())
    }
}

/// Relabel to `0..K` in order of first appearance; returns labels and `K`
pub(crate) fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let renumbered = labels
        .iter()
        .map(|&label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}
