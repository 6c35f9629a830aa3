//! Graph construction module

use anyhow::Result;
use crate::graph::compressed::{Graph, VertexId};
use std::collections::HashMap;

/// Builder for incrementally constructing an undirected Graph from named vertices
pub struct GraphBuilder {
    /// Number of vertices
    vertex_count: usize,

    /// Mapping from names to vertex indices
    name_to_index: HashMap<String, VertexId>,

    /// Vertex names
    vertex_names: Vec<String>,

    /// Adjacency lists for each vertex
    adjacency_lists: Vec<Vec<u32>>,

    /// Number of edges added, counting duplicates and self-loops
    edge_count: usize,
}

impl GraphBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new graph builder with the given vertex capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertex_count: 0,
            name_to_index: HashMap::with_capacity(capacity),
            vertex_names: Vec::with_capacity(capacity),
            adjacency_lists: Vec::with_capacity(capacity),
            edge_count: 0,
        }
    }

    /// Get or create the vertex index for the given name
    pub fn get_or_create_vertex(&mut self, name: &str) -> VertexId {
        if let Some(&idx) = self.name_to_index.get(name) {
            return idx;
        }

        // Create a new vertex
        let idx = self.vertex_count as VertexId;
        self.name_to_index.insert(name.to_string(), idx);
        self.vertex_names.push(name.to_string());
        self.adjacency_lists.push(Vec::new());
        self.vertex_count += 1;

        idx
    }

    /// Add an undirected edge between two named vertices
    pub fn add_edge(&mut self, name1: &str, name2: &str) {
        let idx1 = self.get_or_create_vertex(name1);
        let idx2 = self.get_or_create_vertex(name2);

        // Record both directions; a self-loop gets a single entry
        self.adjacency_lists[idx1 as usize].push(idx2);
        if idx1 != idx2 {
            self.adjacency_lists[idx2 as usize].push(idx1);
        }

        self.edge_count += 1;
    }

    /// Build the compressed graph
    pub fn build(self) -> Result<Graph> {
        Ok(Graph::assemble(
            self.adjacency_lists,
            self.edge_count,
            Some(self.vertex_names),
        ))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
