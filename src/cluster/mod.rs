//! Community clustering module

pub mod detection;
pub mod metrics;

mod community;
mod heap;

use serde::{Serialize, Deserialize};

use crate::graph::{Graph, VertexId};

/// Represents one detected community in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Generated name, sequential within the partition ("C1", "C2", ...)
    pub name: String,

    /// Members of this cluster (vertex indices)
    pub members: Vec<VertexId>,

    /// Size of the cluster
    pub size: usize,
}

/// A complete assignment of the input vertices to disjoint clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub clusters: Vec<Cluster>,
}

impl Partition {
    /// Number of clusters
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of vertices across all clusters
    pub fn vertex_count(&self) -> usize {
        self.clusters.iter().map(|c| c.members.len()).sum()
    }

    /// Flatten the partition into three parallel output columns.
    ///
    /// `cluster_names` lists each cluster once; the two member columns hold
    /// one row per vertex, pairing the cluster name with the vertex label.
    /// Vertices without a supplied name fall back to their decimal index.
    pub fn to_columns(&self, graph: &Graph) -> PartitionColumns {
        let rows = self.vertex_count();
        let mut cluster_names = Vec::with_capacity(self.clusters.len());
        let mut member_cluster_names = Vec::with_capacity(rows);
        let mut member_vertex_names = Vec::with_capacity(rows);

        for cluster in &self.clusters {
            cluster_names.push(cluster.name.clone());
            for &vertex in &cluster.members {
                member_cluster_names.push(cluster.name.clone());
                member_vertex_names.push(graph.vertex_label(vertex));
            }
        }

        PartitionColumns {
            cluster_names,
            member_cluster_names,
            member_vertex_names,
        }
    }
}

/// Worksheet-shaped view of a partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionColumns {
    /// One entry per cluster
    pub cluster_names: Vec<String>,

    /// Cluster name of each membership row
    pub member_cluster_names: Vec<String>,

    /// Vertex label of each membership row, parallel to `member_cluster_names`
    pub member_vertex_names: Vec<String>,
}

/// Result of a cancellable detection run
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The merge loop ran to termination
    Completed(Partition),
    /// The cancellation flag was observed; no partition is produced
    Cancelled,
}

impl Outcome {
    /// The partition, unless the run was cancelled
    pub fn into_partition(self) -> Option<Partition> {
        match self {
            Outcome::Completed(partition) => Some(partition),
            Outcome::Cancelled => None,
        }
    }
}

/// Advisory progress report delivered during detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Rough completion percentage of the current phase, 0 to 100
    pub percent: u8,
    /// Human-readable description of the current phase
    pub phase: &'static str,
}
