//! Greedy modularity merge engine
//!
//! Starts from one singleton community per vertex and repeatedly merges the
//! pair of connected communities with the highest modularity gain, until every
//! remaining merge would lower modularity. Merges with zero gain are still
//! performed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use itertools::{EitherOrBoth, Itertools};

use crate::cluster::community::{Community, CommunityId, CommunityPair, CommunityStore};
use crate::cluster::heap::GainHeap;
use crate::cluster::{Cluster, Outcome, Partition, Progress};
use crate::config::Config;
use crate::graph::{Graph, VertexId};

/// Phase label reported while singleton communities are being seeded
pub const PHASE_INITIAL_CLUSTERS: &str = "Creating initial clusters.";

/// Phase label reported while communities are being merged
pub const PHASE_MERGING: &str = "Merging clusters.";

/// Mutable state threaded through the merge loop
struct EngineState {
    store: CommunityStore,
    heap: GainHeap,
    /// 2m, where m counts every supplied edge including duplicates and loops
    two_m: f64,
}

/// Detect communities by greedy modularity maximization.
///
/// Runs to completion; equivalent to `detect_clusters_cancellable` with a
/// flag that is never raised.
pub fn detect_clusters(graph: &Graph, config: &Config) -> Partition {
    let never = AtomicBool::new(false);
    match detect_clusters_cancellable(graph, config, &never, |_| {}) {
        Outcome::Completed(partition) => partition,
        Outcome::Cancelled => unreachable!("cancellation flag is never raised"),
    }
}

/// Detect communities with cooperative cancellation and progress reporting.
///
/// The cancellation flag is polled once per merge iteration. Progress reports
/// are advisory: percent 0 opens each phase, intermediate percentages arrive
/// every `config.progress_interval` merges, and percent 100 closes the run.
pub fn detect_clusters_cancellable(
    graph: &Graph,
    config: &Config,
    cancel_flag: &AtomicBool,
    mut on_progress: impl FnMut(Progress),
) -> Outcome {
    // Nothing to cluster without edges
    if graph.vertex_count == 0 || graph.edge_count == 0 {
        return Outcome::Completed(Partition {
            clusters: Vec::new(),
        });
    }

    log::info!(
        "Detecting communities in a graph with {} vertices and {} edges",
        graph.vertex_count,
        graph.edge_count
    );

    on_progress(Progress {
        percent: 0,
        phase: PHASE_INITIAL_CLUSTERS,
    });

    let mut state = initialize_communities(graph);
    log::info!(
        "Seeded {} singleton communities, {} of them mergeable",
        state.store.live_count(),
        state.heap.len()
    );

    on_progress(Progress {
        percent: 0,
        phase: PHASE_MERGING,
    });

    // A run over n communities performs at most n - 1 merges
    let max_merges = graph.vertex_count.saturating_sub(1).max(1);
    let interval = config.progress_interval.max(1);
    let mut merges = 0usize;

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            log::info!("Community detection cancelled after {} merges", merges);
            return Outcome::Cancelled;
        }

        if merge_step(&mut state).is_none() {
            break;
        }

        merges += 1;
        if merges % interval == 0 {
            let percent = (merges * 100 / max_merges).min(99) as u8;
            on_progress(Progress {
                percent,
                phase: PHASE_MERGING,
            });
        }
    }

    on_progress(Progress {
        percent: 100,
        phase: PHASE_MERGING,
    });

    let partition = extract_partition(&state.store, config);
    log::info!(
        "Found {} clusters after {} merges",
        partition.clusters.len(),
        merges
    );
    Outcome::Completed(partition)
}

/// Seed one singleton community per vertex and one pair per distinct
/// adjacency, then prime the gain heap with each community's best pair
fn initialize_communities(graph: &Graph) -> EngineState {
    let vertex_count = graph.vertex_count;
    let mut store = CommunityStore::with_capacity(vertex_count);

    // Vertex v becomes community v + 1
    for vertex in 0..vertex_count {
        let id = store.allocate_id();
        store.insert(Community::singleton(
            id,
            vertex as VertexId,
            graph.structural_degree(vertex),
        ));
    }

    let two_m = 2.0 * graph.edge_count as f64;

    // Seed pairs along edges. Duplicate neighbors collapse onto one pair and
    // self-loops seed nothing; both still count inside two_m.
    for vertex in 0..vertex_count {
        let own = vertex as CommunityId + 1;
        let own_degree = graph.structural_degree(vertex);
        for &neighbor in graph.neighbors(vertex).iter().dedup() {
            if neighbor as usize == vertex {
                continue;
            }
            let delta_q = initial_delta_q(
                own_degree,
                graph.structural_degree(neighbor as usize),
                two_m,
            );
            store.get_mut(own).record_pair(neighbor + 1, delta_q);
        }
    }

    let mut heap = GainHeap::with_capacity(vertex_count);
    let mut pair_entries = 0usize;
    for id in 1..=vertex_count as CommunityId {
        let community = store.get_mut(id);
        community.refresh_best();
        pair_entries += community.pair_count();
        if let Some(best) = community.best() {
            heap.push(id, best.delta_q);
        }
    }
    log::debug!("Seeded {} community pair entries", pair_entries);

    EngineState { store, heap, two_m }
}

/// Modularity gain for joining two adjacent singleton communities
fn initial_delta_q(degree1: usize, degree2: usize, two_m: f64) -> f64 {
    2.0 * (1.0 / two_m - (degree1 * degree2) as f64 / (two_m * two_m))
}

/// Perform the single most profitable merge. Returns the applied gain, or
/// None when the heap is empty or the best remaining gain is negative.
fn merge_step(state: &mut EngineState) -> Option<f64> {
    let top = state.heap.peek()?;
    if top.delta_q < 0.0 {
        return None;
    }

    let community1 = state.store.remove(top.community);
    let best = community1
        .best()
        .expect("heap entry exists for a community without pairs");
    debug_assert_eq!(best.delta_q, top.delta_q);
    let community2 = state.store.remove(best.community2);

    let popped = state.heap.pop();
    debug_assert_eq!(popped.map(|entry| entry.community), Some(community1.id));
    let removed = state.heap.remove(community2.id);
    debug_assert!(removed.is_some());

    let id1 = community1.id;
    let id2 = community2.id;
    let new_id = state.store.allocate_id();
    let two_m = state.two_m;
    let fraction1 = community1.degree as f64 / two_m;
    let fraction2 = community2.degree as f64 / two_m;
    let merged_degree = community1.degree + community2.degree;

    // Walk both pair lists in one ascending pass. A community adjacent to
    // both sides gets the summed gain; a one-sided neighbor pays the
    // degree-product correction for the side it was not adjacent to.
    let mut merged_pairs: BTreeMap<CommunityId, f64> = BTreeMap::new();
    let mut merged_best: Option<CommunityPair> = None;

    for joined in community1
        .pairs()
        .merge_join_by(community2.pairs(), |left, right| left.0.cmp(&right.0))
    {
        let (other, delta_q) = match joined {
            EitherOrBoth::Both((other, gain1), (_, gain2)) => (other, gain1 + gain2),
            EitherOrBoth::Left((other, gain1)) => {
                if other == id2 {
                    continue; // the pair being merged away
                }
                let neighbor_fraction = state.store.get(other).degree as f64 / two_m;
                (other, gain1 - 2.0 * fraction2 * neighbor_fraction)
            }
            EitherOrBoth::Right((other, gain2)) => {
                if other == id1 {
                    continue;
                }
                let neighbor_fraction = state.store.get(other).degree as f64 / two_m;
                (other, gain2 - 2.0 * fraction1 * neighbor_fraction)
            }
        };

        merged_pairs.insert(other, delta_q);
        if merged_best.map_or(true, |b| delta_q > b.delta_q) {
            merged_best = Some(CommunityPair {
                community2: other,
                delta_q,
            });
        }

        // Mirror the change on the neighbor; refresh its heap key when its
        // own best pair moved
        let neighbor = state.store.get_mut(other);
        if neighbor.on_merged_communities(id1, id2, new_id, delta_q) {
            let refreshed = neighbor
                .best()
                .expect("neighbor was just given a replacement pair");
            state.heap.update(other, refreshed.delta_q);
        }
    }

    let mut members = community1.members;
    members.extend(community2.members);
    let merged = Community::merged(new_id, merged_degree, members, merged_pairs, merged_best);

    if let Some(best) = merged.best() {
        state.heap.push(new_id, best.delta_q);
    }
    state.store.insert(merged);

    Some(top.delta_q)
}

/// Turn the surviving communities into named clusters, ordered by community id
fn extract_partition(store: &CommunityStore, config: &Config) -> Partition {
    let mut clusters = Vec::with_capacity(store.live_count());
    for (ordinal, community) in store.iter_live().enumerate() {
        clusters.push(Cluster {
            name: format!("{}{}", config.cluster_name_prefix, ordinal + 1),
            members: community.members.clone(),
            size: community.members.len(),
        });
    }
    Partition { clusters }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::from_edge_list(3, &[(0, 1), (1, 2), (2, 0)]).unwrap()
    }

    #[test]
    fn triangle_initialization_seeds_expected_state() {
        let state = initialize_communities(&triangle());

        assert_eq!(state.store.live_count(), 3);
        assert_eq!(state.heap.len(), 3);
        assert_eq!(state.two_m, 6.0);
        for community in state.store.iter_live() {
            assert_eq!(community.pair_count(), 2);
            assert_eq!(community.degree, 2);
        }

        let top = state.heap.peek().unwrap();
        assert_eq!(top.delta_q, 2.0 * (1.0 / 6.0 - (2.0 * 2.0) / 36.0));
        // every gain ties, so the smallest community id surfaces first
        assert_eq!(top.community, 1);
    }

    #[test]
    fn triangle_merges_to_a_single_community() {
        let mut state = initialize_communities(&triangle());

        let first = merge_step(&mut state).unwrap();
        assert_eq!(first, 2.0 * (1.0 / 6.0 - 4.0 / 36.0));
        assert_eq!(state.store.live_count(), 2);

        // the merged community pairs with the remaining singleton at the
        // summed gain of its two seed pairs
        let top = state.heap.peek().unwrap();
        assert_eq!(top.delta_q, 4.0 * (1.0 / 6.0 - 4.0 / 36.0));

        let second = merge_step(&mut state).unwrap();
        assert_eq!(second, 4.0 * (1.0 / 6.0 - 4.0 / 36.0));
        assert_eq!(state.store.live_count(), 1);
        assert!(merge_step(&mut state).is_none());

        let survivor = state.store.iter_live().next().unwrap();
        assert_eq!(survivor.members.len(), 3);
        assert_eq!(survivor.degree, 6);
        assert_eq!(survivor.pair_count(), 0);
    }

    #[test]
    fn tendril_vertex_offers_the_best_first_merge() {
        // a triangle with one extra vertex hanging off vertex 0
        let graph = Graph::from_edge_list(4, &[(0, 1), (1, 2), (2, 0), (0, 3)]).unwrap();
        let state = initialize_communities(&graph);

        let top = state.heap.peek().unwrap();
        assert_eq!(top.delta_q, 2.0 / 8.0 - 2.0 * 3.0 / 64.0);
        assert_eq!(top.community, 1);
    }

    #[test]
    fn four_cycle_finishes_with_a_zero_gain_merge() {
        let graph = Graph::from_edge_list(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap();
        let mut state = initialize_communities(&graph);

        let mut gains = Vec::new();
        while let Some(gain) = merge_step(&mut state) {
            gains.push(gain);
        }

        // the last merge gains nothing but is still taken
        assert_eq!(gains, vec![0.125, 0.125, 0.0]);
        assert_eq!(state.store.live_count(), 1);
        assert_eq!(state.store.iter_live().next().unwrap().members.len(), 4);
    }

    #[test]
    fn bridged_triangles_stop_before_a_negative_merge() {
        let graph = Graph::from_edge_list(
            6,
            &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)],
        )
        .unwrap();
        let mut state = initialize_communities(&graph);

        let total_degree: usize = (0..graph.vertex_count)
            .map(|v| graph.structural_degree(v))
            .sum();

        let mut gains = Vec::new();
        while let Some(gain) = merge_step(&mut state) {
            gains.push(gain);
            // merging never creates or destroys degree mass
            let live_degree: usize = state.store.iter_live().map(|c| c.degree).sum();
            assert_eq!(live_degree, total_degree);
        }

        assert_eq!(gains.len(), 4);
        assert!(gains.iter().all(|&gain| gain >= 0.0));
        assert_eq!(state.store.live_count(), 2);

        let mut sides: Vec<Vec<u32>> = state
            .store
            .iter_live()
            .map(|c| {
                let mut members = c.members.clone();
                members.sort_unstable();
                members
            })
            .collect();
        sides.sort();
        assert_eq!(sides, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn self_loops_count_in_the_edge_total_but_seed_no_pair() {
        let graph = Graph::from_edge_list(2, &[(0, 0), (0, 1)]).unwrap();
        let state = initialize_communities(&graph);

        assert_eq!(state.two_m, 4.0);
        let pairs: Vec<(CommunityId, f64)> = state.store.get(1).pairs().collect();
        assert_eq!(pairs, vec![(2, 2.0 * (1.0 / 4.0 - 2.0 / 16.0))]);
    }

    #[test]
    fn duplicate_edges_collapse_onto_one_pair() {
        let graph = Graph::from_edge_list(2, &[(0, 1), (0, 1)]).unwrap();
        let state = initialize_communities(&graph);

        // both copies raise 2m to 4 while the structural degrees stay 1
        let pairs: Vec<(CommunityId, f64)> = state.store.get(1).pairs().collect();
        assert_eq!(pairs, vec![(2, 2.0 * (1.0 / 4.0 - 1.0 / 16.0))]);
    }

    #[test]
    fn disconnected_components_never_share_a_pair() {
        let graph = Graph::from_edge_list(4, &[(0, 1), (2, 3)]).unwrap();
        let mut state = initialize_communities(&graph);

        let mut gains = Vec::new();
        while let Some(gain) = merge_step(&mut state) {
            gains.push(gain);
        }

        assert_eq!(gains, vec![0.375, 0.375]);
        assert_eq!(state.store.live_count(), 2);
        for community in state.store.iter_live() {
            assert_eq!(community.pair_count(), 0);
            assert_eq!(community.members.len(), 2);
        }
    }
}
