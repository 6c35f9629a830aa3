//! Core library for community detection by greedy modularity maximization

pub mod config;
pub mod graph;
pub mod cluster;

pub use anyhow::{Result, anyhow};

pub use cluster::detection::{detect_clusters, detect_clusters_cancellable};
pub use cluster::{Cluster, Outcome, Partition, PartitionColumns, Progress};
pub use config::Config;
pub use graph::{Graph, GraphBuilder, GraphError, VertexId};
