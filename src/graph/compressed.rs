//! Memory-efficient graph representation

use std::mem;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vertex index type used throughout the crate
pub type VertexId = u32;

/// Errors raised while assembling a graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// An edge endpoint fell outside the declared vertex range
    #[error("edge ({0}, {1}) references a vertex outside 0..{2}")]
    VertexOutOfRange(VertexId, VertexId, usize),
}

/// Compressed sparse representation of an undirected graph optimized for memory efficiency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Number of vertices in the graph
    pub vertex_count: usize,

    /// Number of edges as supplied, counting duplicates and self-loops
    pub edge_count: usize,

    /// Offset array: index where each vertex's neighbors begin
    /// offsets[i] to offsets[i+1] defines the adjacency range for vertex i
    pub offsets: Vec<u32>,

    /// Adjacency array: concatenated sorted neighbor lists; a duplicate edge
    /// keeps both entries, a self-loop contributes a single entry
    pub adjacency: Vec<u32>,

    /// Distinct adjacent vertices per vertex (a self-loop counts once)
    pub structural_degrees: Vec<u32>,

    /// Optional mapping from vertex indices to display names
    pub vertex_names: Option<Vec<String>>,
}

impl Graph {
    /// Build a graph over `vertex_count` vertices from an undirected edge list.
    ///
    /// Endpoints must lie in `0..vertex_count`. Duplicate edges and self-loops
    /// are legal input and count toward `edge_count`.
    pub fn from_edge_list(
        vertex_count: usize,
        edge_list: &[(VertexId, VertexId)],
    ) -> Result<Self, GraphError> {
        let mut adjacency_lists: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];

        for &(src, dst) in edge_list {
            if src as usize >= vertex_count || dst as usize >= vertex_count {
                return Err(GraphError::VertexOutOfRange(src, dst, vertex_count));
            }
            adjacency_lists[src as usize].push(dst);
            if src != dst {
                adjacency_lists[dst as usize].push(src);
            }
        }

        Ok(Self::assemble(adjacency_lists, edge_list.len(), None))
    }

    /// Assemble the compressed form from per-vertex adjacency lists
    pub(crate) fn assemble(
        mut adjacency_lists: Vec<Vec<u32>>,
        edge_count: usize,
        vertex_names: Option<Vec<String>>,
    ) -> Self {
        let vertex_count = adjacency_lists.len();
        let entry_count: usize = adjacency_lists.iter().map(|list| list.len()).sum();

        // Create offsets array
        let mut offsets = Vec::with_capacity(vertex_count + 1);
        offsets.push(0);

        let mut offset = 0;
        for list in &adjacency_lists {
            offset += list.len() as u32;
            offsets.push(offset);
        }

        // Create adjacency array and per-vertex distinct neighbor counts
        let mut adjacency = Vec::with_capacity(entry_count);
        let mut structural_degrees = Vec::with_capacity(vertex_count);
        for list in &mut adjacency_lists {
            list.sort_unstable();
            structural_degrees.push(distinct_neighbor_count(list));
            adjacency.extend_from_slice(list);
        }

        Self {
            vertex_count,
            edge_count,
            offsets,
            adjacency,
            structural_degrees,
            vertex_names,
        }
    }

    /// Get the sorted neighbor list of a vertex (duplicates preserved)
    pub fn neighbors(&self, vertex: usize) -> &[u32] {
        let start = self.offsets[vertex] as usize;
        let end = self.offsets[vertex + 1] as usize;
        &self.adjacency[start..end]
    }

    /// Number of distinct vertices adjacent to a vertex
    pub fn structural_degree(&self, vertex: usize) -> usize {
        self.structural_degrees[vertex] as usize
    }

    /// Display name of a vertex, if names were supplied
    pub fn vertex_name(&self, vertex: usize) -> Option<&str> {
        self.vertex_names
            .as_ref()
            .and_then(|names| names.get(vertex))
            .map(String::as_str)
    }

    /// Display label of a vertex: its name, or its index rendered as decimal
    pub fn vertex_label(&self, vertex: VertexId) -> String {
        match self.vertex_name(vertex as usize) {
            Some(name) => name.to_string(),
            None => vertex.to_string(),
        }
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let adjacency = self.adjacency.capacity() * mem::size_of::<u32>();
        let degrees = self.structural_degrees.capacity() * mem::size_of::<u32>();

        // Add names if present
        let names = self
            .vertex_names
            .as_ref()
            .map(|names| names.iter().map(|s| s.capacity()).sum::<usize>())
            .unwrap_or(0);

        base + offsets + adjacency + degrees + names
    }
}

/// Count distinct values in a sorted slice
pub(crate) fn distinct_neighbor_count(sorted: &[u32]) -> u32 {
    sorted.iter().dedup().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_list_assembles_sorted_adjacency() {
        let graph = Graph::from_edge_list(4, &[(0, 1), (0, 2), (2, 1), (3, 0)]).unwrap();

        assert_eq!(graph.vertex_count, 4);
        assert_eq!(graph.edge_count, 4);
        assert_eq!(graph.neighbors(0), &[1, 2, 3]);
        assert_eq!(graph.neighbors(1), &[0, 2]);
        assert_eq!(graph.neighbors(2), &[0, 1]);
        assert_eq!(graph.neighbors(3), &[0]);
        assert_eq!(graph.structural_degree(0), 3);
        assert_eq!(graph.structural_degree(3), 1);
    }

    #[test]
    fn self_loops_and_duplicates_stay_in_the_totals() {
        let graph = Graph::from_edge_list(2, &[(0, 0), (0, 1), (0, 1)]).unwrap();

        assert_eq!(graph.edge_count, 3);
        // one entry for the loop, two copies of the duplicate edge
        assert_eq!(graph.neighbors(0), &[0, 1, 1]);
        assert_eq!(graph.neighbors(1), &[0, 0]);
        // distinct neighbors only
        assert_eq!(graph.structural_degree(0), 2);
        assert_eq!(graph.structural_degree(1), 1);
    }

    #[test]
    fn out_of_range_endpoint_is_rejected() {
        let err = Graph::from_edge_list(2, &[(0, 5)]).unwrap_err();
        assert!(matches!(err, GraphError::VertexOutOfRange(0, 5, 2)));
    }

    #[test]
    fn labels_fall_back_to_indices() {
        let graph = Graph::from_edge_list(2, &[(0, 1)]).unwrap();
        assert_eq!(graph.vertex_label(1), "1");
    }

    #[test]
    fn memory_usage_counts_the_arrays() {
        let graph = Graph::from_edge_list(3, &[(0, 1), (1, 2)]).unwrap();
        assert!(graph.memory_usage() >= mem::size_of::<Graph>());
    }
}
