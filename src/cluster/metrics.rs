//! Partition quality metrics

use std::collections::HashSet;

use rayon::prelude::*;

use crate::cluster::Partition;
use crate::graph::{Graph, VertexId};

/// Clusters at or above this size are measured with parallel iteration
const PARALLEL_CUTOFF: usize = 1000;

/// Modularity Q of a finished partition.
///
/// Uses the same conventions as the merge engine: the edge total m counts
/// duplicates and self-loops, degrees are structural. A graph without edges
/// scores 0.
pub fn partition_modularity(graph: &Graph, partition: &Partition) -> f64 {
    if graph.edge_count == 0 || partition.is_empty() {
        return 0.0;
    }

    // vertex -> cluster ordinal
    let mut membership: Vec<Option<usize>> = vec![None; graph.vertex_count];
    for (ordinal, cluster) in partition.clusters.iter().enumerate() {
        for &vertex in &cluster.members {
            membership[vertex as usize] = Some(ordinal);
        }
    }

    let cluster_count = partition.len();
    let mut internal_edges = vec![0usize; cluster_count];
    let mut total_degrees = vec![0usize; cluster_count];

    for vertex in 0..graph.vertex_count {
        let own = match membership[vertex] {
            Some(ordinal) => ordinal,
            None => continue,
        };
        total_degrees[own] += graph.structural_degree(vertex);

        for &neighbor in graph.neighbors(vertex) {
            // count each intra-cluster edge once: at its lower endpoint, or
            // at the single adjacency entry a self-loop leaves
            if vertex <= neighbor as usize && membership[neighbor as usize] == Some(own) {
                internal_edges[own] += 1;
            }
        }
    }

    let m = graph.edge_count as f64;
    (0..cluster_count)
        .map(|c| {
            let intra = internal_edges[c] as f64 / m;
            let degree_fraction = total_degrees[c] as f64 / (2.0 * m);
            intra - degree_fraction * degree_fraction
        })
        .sum()
}

/// Density of one cluster: edges between members over the n(n-1)/2 possible
/// undirected pairs. Singleton clusters have density 1 by convention.
pub fn cluster_density(graph: &Graph, members: &[VertexId]) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 1.0;
    }

    let potential_edges = n * (n - 1) / 2;
    let member_set: HashSet<u32> = members.iter().copied().collect();

    // For small clusters, use sequential counting
    if n < PARALLEL_CUTOFF {
        let actual_edges = count_internal_edges(graph, members, &member_set);
        return actual_edges as f64 / potential_edges as f64;
    }

    // For larger clusters, count in parallel
    let actual_edges: usize = members
        .par_iter()
        .map(|&vertex| {
            graph
                .neighbors(vertex as usize)
                .iter()
                .filter(|&&neighbor| vertex < neighbor && member_set.contains(&neighbor))
                .count()
        })
        .sum();

    actual_edges as f64 / potential_edges as f64
}

/// Sequential edge count between cluster members, each undirected edge
/// counted at its lower endpoint
fn count_internal_edges(graph: &Graph, members: &[VertexId], member_set: &HashSet<u32>) -> usize {
    let mut actual_edges = 0;
    for &vertex in members {
        for &neighbor in graph.neighbors(vertex as usize) {
            if vertex < neighbor && member_set.contains(&neighbor) {
                actual_edges += 1;
            }
        }
    }
    actual_edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::detection::detect_clusters;
    use crate::config::Config;

    #[test]
    fn two_triangles_with_a_bridge_match_the_reference_value() {
        let graph = Graph::from_edge_list(
            6,
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)],
        )
        .unwrap();
        let partition = detect_clusters(&graph, &Config::default());
        assert_eq!(partition.len(), 2);

        let q = partition_modularity(&graph, &partition);
        assert!((q - 0.3571428571428571).abs() < 1e-12);
    }

    #[test]
    fn one_cluster_over_a_triangle_scores_zero() {
        let graph = Graph::from_edge_list(3, &[(0, 1), (1, 2), (2, 0)]).unwrap();
        let partition = detect_clusters(&graph, &Config::default());

        assert_eq!(partition.len(), 1);
        assert_eq!(partition_modularity(&graph, &partition), 0.0);
    }

    #[test]
    fn edgeless_graph_scores_zero() {
        let graph = Graph::from_edge_list(3, &[]).unwrap();
        let partition = detect_clusters(&graph, &Config::default());

        assert!(partition.is_empty());
        assert_eq!(partition_modularity(&graph, &partition), 0.0);
    }

    #[test]
    fn density_counts_undirected_pairs() {
        // a 4-cycle has 4 of the 6 possible edges
        let graph = Graph::from_edge_list(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
        let density = cluster_density(&graph, &[0, 1, 2, 3]);
        assert!((density - 4.0 / 6.0).abs() < 1e-12);

        // singletons default to full density
        assert_eq!(cluster_density(&graph, &[2]), 1.0);
    }

    #[test]
    fn density_of_a_clique_is_one() {
        let graph = Graph::from_edge_list(3, &[(0, 1), (1, 2), (2, 0)]).unwrap();
        assert_eq!(cluster_density(&graph, &[0, 1, 2]), 1.0);
    }
}
