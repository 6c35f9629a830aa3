//! Community records and the arena that owns them during the merge loop

use std::collections::BTreeMap;

use crate::graph::VertexId;

/// Identifier of a community; ids start at 1 and are never reused
pub type CommunityId = u32;

/// A candidate merge partner together with the modularity gain the merge
/// would produce
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommunityPair {
    pub community2: CommunityId,
    pub delta_q: f64,
}

/// One community under construction
#[derive(Debug)]
pub struct Community {
    pub id: CommunityId,

    /// Sum of the structural degrees of all member vertices
    pub degree: usize,

    /// Member vertices, in merge concatenation order
    pub members: Vec<VertexId>,

    /// Delta Q toward each adjacent community; ascending key order drives the
    /// pair-list merge when two communities combine
    pairs: BTreeMap<CommunityId, f64>,

    /// Cached pair with the maximum delta Q (equal gains keep the smaller id)
    best: Option<CommunityPair>,
}

impl Community {
    /// Community holding a single vertex
    pub fn singleton(id: CommunityId, vertex: VertexId, degree: usize) -> Self {
        Self {
            id,
            degree,
            members: vec![vertex],
            pairs: BTreeMap::new(),
            best: None,
        }
    }

    /// Community produced by combining two others
    pub fn merged(
        id: CommunityId,
        degree: usize,
        members: Vec<VertexId>,
        pairs: BTreeMap<CommunityId, f64>,
        best: Option<CommunityPair>,
    ) -> Self {
        Self {
            id,
            degree,
            members,
            pairs,
            best,
        }
    }

    /// Cached best merge candidate, None when the community is isolated
    pub fn best(&self) -> Option<CommunityPair> {
        self.best
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Pairs in ascending order of the other community's id
    pub fn pairs(&self) -> impl Iterator<Item = (CommunityId, f64)> + '_ {
        self.pairs.iter().map(|(&other, &delta_q)| (other, delta_q))
    }

    /// Record a pair during initial seeding; the cache is rebuilt afterwards
    /// with `refresh_best`
    pub fn record_pair(&mut self, other: CommunityId, delta_q: f64) {
        debug_assert_ne!(other, self.id, "a community never pairs with itself");
        self.pairs.insert(other, delta_q);
    }

    /// Rescan all pairs for the maximum gain. Ascending iteration with a
    /// strictly-greater comparison keeps the smallest id among equal gains.
    pub fn refresh_best(&mut self) {
        let mut best: Option<CommunityPair> = None;
        for (&other, &delta_q) in &self.pairs {
            if best.map_or(true, |b| delta_q > b.delta_q) {
                best = Some(CommunityPair {
                    community2: other,
                    delta_q,
                });
            }
        }
        self.best = best;
    }

    /// React to two adjacent communities having merged into `replacement`.
    ///
    /// Drops the pairs toward the departed communities, records the pair
    /// toward the replacement, and repairs the best-pair cache. Returns true
    /// when the cached best changed, which means the owner's heap key is
    /// stale.
    pub fn on_merged_communities(
        &mut self,
        merged1: CommunityId,
        merged2: CommunityId,
        replacement: CommunityId,
        delta_q: f64,
    ) -> bool {
        debug_assert_ne!(replacement, self.id);

        let removed1 = self.pairs.remove(&merged1).is_some();
        let removed2 = self.pairs.remove(&merged2).is_some();
        debug_assert!(
            removed1 || removed2,
            "community {} was notified of a merge it is not adjacent to",
            self.id
        );

        self.pairs.insert(replacement, delta_q);

        let old_best = self.best;
        match old_best {
            // the cached best pointed at a departed community: full rescan
            Some(b) if b.community2 == merged1 || b.community2 == merged2 => self.refresh_best(),
            // otherwise the only challenger is the replacement pair
            Some(b) => {
                if delta_q > b.delta_q || (delta_q == b.delta_q && replacement < b.community2) {
                    self.best = Some(CommunityPair {
                        community2: replacement,
                        delta_q,
                    });
                }
            }
            None => self.refresh_best(),
        }

        self.best != old_best
    }
}

/// Arena of communities indexed by id. Ids are handed out by a monotonic
/// counter starting at 1; a merged community leaves an empty slot behind, so
/// surviving communities always iterate in ascending id order.
#[derive(Debug)]
pub struct CommunityStore {
    slots: Vec<Option<Community>>,
    next_id: CommunityId,
    live: usize,
}

impl CommunityStore {
    /// Arena sized for a run over `vertex_count` singletons; a full merge
    /// sequence allocates at most 2n - 1 ids
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            slots: Vec::with_capacity(vertex_count.saturating_mul(2)),
            next_id: 1,
            live: 0,
        }
    }

    /// Hand out the next community id
    pub fn allocate_id(&mut self) -> CommunityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert a community under the id it was allocated
    pub fn insert(&mut self, community: Community) {
        debug_assert_eq!(community.id as usize, self.slots.len() + 1);
        self.slots.push(Some(community));
        self.live += 1;
    }

    pub fn get(&self, id: CommunityId) -> &Community {
        self.slots[id as usize - 1]
            .as_ref()
            .expect("no live community under this id")
    }

    pub fn get_mut(&mut self, id: CommunityId) -> &mut Community {
        self.slots[id as usize - 1]
            .as_mut()
            .expect("no live community under this id")
    }

    /// Take a community out of the arena, leaving its slot empty
    pub fn remove(&mut self, id: CommunityId) -> Community {
        let community = self.slots[id as usize - 1]
            .take()
            .expect("no live community under this id");
        self.live -= 1;
        community
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Surviving communities in ascending id order
    pub fn iter_live(&self) -> impl Iterator<Item = &Community> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }
}
