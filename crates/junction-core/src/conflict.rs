//! Conflict matrix, priority order and green-conflict resolution.
//!
//! The [`ConflictMatrix`] lists the approach pairs that must never show
//! `go` at the same time. It is symmetric, and an approach is always
//! compatible with itself. The [`PriorityOrder`] ranks every approach and
//! breaks ties deterministically.
//!
//! [`resolve_green_conflicts`] decides which approaches keep `go` when the
//! joint state violates the matrix:
//!
//! 1. An approach that was already `go` before the current pass (an
//!    *incumbent*) takes precedence over one that just entered `go`.
//! 2. Among approaches with the same standing, higher priority wins.
//! 3. Candidates are granted in that order; a candidate conflicting with
//!    any already-granted approach is held at `stop`.
//!
//! The result is conflict-free by construction and depends only on the
//! inputs.

use std::collections::{BTreeMap, BTreeSet};

use junction_types::{ApproachId, ConflictResolution};

/// Errors raised while building the matrix or priority order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    /// A pair names the same approach twice.
    #[error("approach {0} cannot conflict with itself")]
    SelfConflict(ApproachId),

    /// A pair or priority entry names an approach that does not exist.
    #[error("unknown approach {0} in {1}")]
    UnknownApproach(ApproachId, &'static str),

    /// The priority order is not a permutation of the approaches.
    #[error("invalid priority order: {0}")]
    InvalidPriority(String),
}

/// Static symmetric relation of approaches that may not be `go` together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConflictMatrix {
    /// Pairs stored with the smaller id first.
    pairs: BTreeSet<(ApproachId, ApproachId)>,
}

impl ConflictMatrix {
    /// Build a matrix over the given approaches.
    ///
    /// Pairs are unordered: `(a, b)` and `(b, a)` are the same entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::SelfConflict`] for a pair `(a, a)` and
    /// [`ConflictError::UnknownApproach`] for ids not in `approaches`.
    pub fn new<'a, I>(approaches: &BTreeSet<ApproachId>, pairs: I) -> Result<Self, ConflictError>
    where
        I: IntoIterator<Item = &'a (ApproachId, ApproachId)>,
    {
        let mut normalized = BTreeSet::new();
        for (a, b) in pairs {
            for id in [a, b] {
                if !approaches.contains(id) {
                    return Err(ConflictError::UnknownApproach(id.clone(), "conflict matrix"));
                }
            }
            if a == b {
                return Err(ConflictError::SelfConflict(a.clone()));
            }
            normalized.insert(ordered_pair(a, b));
        }
        Ok(Self { pairs: normalized })
    }

    /// Whether `a` and `b` may not be `go` at the same time.
    pub fn conflicts(&self, a: &ApproachId, b: &ApproachId) -> bool {
        a != b && self.pairs.contains(&ordered_pair(a, b))
    }

    /// Whether `a` and `b` may be `go` at the same time.
    pub fn compatible(&self, a: &ApproachId, b: &ApproachId) -> bool {
        !self.conflicts(a, b)
    }

    /// Number of conflicting pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pairs conflict.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn ordered_pair(a: &ApproachId, b: &ApproachId) -> (ApproachId, ApproachId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Total ranking of approaches, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriorityOrder {
    order: Vec<ApproachId>,
    rank: BTreeMap<ApproachId, usize>,
}

impl PriorityOrder {
    /// Build a priority order. `order` must list every approach exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::UnknownApproach`] for ids not in
    /// `approaches`, or [`ConflictError::InvalidPriority`] for duplicates
    /// and missing approaches.
    pub fn new(
        approaches: &BTreeSet<ApproachId>,
        order: &[ApproachId],
    ) -> Result<Self, ConflictError> {
        let mut rank = BTreeMap::new();
        for (index, id) in order.iter().enumerate() {
            if !approaches.contains(id) {
                return Err(ConflictError::UnknownApproach(id.clone(), "priority order"));
            }
            if rank.insert(id.clone(), index).is_some() {
                return Err(ConflictError::InvalidPriority(format!("{id} listed twice")));
            }
        }
        if let Some(missing) = approaches.iter().find(|id| !rank.contains_key(*id)) {
            return Err(ConflictError::InvalidPriority(format!("{missing} not ranked")));
        }
        Ok(Self {
            order: order.to_vec(),
            rank,
        })
    }

    /// Zero-based rank of `id` (0 is highest). Unknown ids rank last.
    pub fn rank(&self, id: &ApproachId) -> usize {
        self.rank.get(id).copied().unwrap_or(usize::MAX)
    }

    /// Whether `a` has strictly higher priority than `b`.
    pub fn outranks(&self, a: &ApproachId, b: &ApproachId) -> bool {
        self.rank(a) < self.rank(b)
    }

    /// Approaches from highest to lowest priority.
    pub fn ordered(&self) -> &[ApproachId] {
        &self.order
    }
}

/// An approach currently showing `go`, as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreenClaim<'a> {
    /// The approach.
    pub id: &'a ApproachId,
    /// Whether it was already `go` before the current pass.
    pub incumbent: bool,
}

/// Decide which green approaches must be held at stop.
///
/// Returns one [`ConflictResolution`] per held approach, in the order the
/// holds were decided. An empty result means the joint state is valid.
pub fn resolve_green_conflicts(
    claims: &[GreenClaim<'_>],
    matrix: &ConflictMatrix,
    priority: &PriorityOrder,
) -> Vec<ConflictResolution> {
    let mut sorted: Vec<&GreenClaim<'_>> = claims.iter().collect();
    sorted.sort_by_key(|c| (!c.incumbent, priority.rank(c.id), c.id));

    let mut granted: Vec<&ApproachId> = Vec::new();
    let mut held = Vec::new();

    for claim in sorted {
        match granted.iter().find(|g| matrix.conflicts(g, claim.id)) {
            Some(winner) => held.push(ConflictResolution {
                held: claim.id.clone(),
                against: (*winner).clone(),
            }),
            None => granted.push(claim.id),
        }
    }

    held
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> BTreeSet<ApproachId> {
        names.iter().map(|n| ApproachId::from(*n)).collect()
    }

    fn pair(a: &str, b: &str) -> (ApproachId, ApproachId) {
        (ApproachId::from(a), ApproachId::from(b))
    }

    fn four_way() -> (ConflictMatrix, PriorityOrder) {
        let all = ids(&["north", "south", "east", "west"]);
        let pairs = [
            pair("north", "east"),
            pair("north", "west"),
            pair("south", "east"),
            pair("south", "west"),
        ];
        let matrix = ConflictMatrix::new(&all, &pairs).unwrap_or_default();
        let order: Vec<ApproachId> = ["north", "south", "east", "west"]
            .into_iter()
            .map(ApproachId::from)
            .collect();
        let priority = PriorityOrder::new(&all, &order).unwrap_or_default();
        (matrix, priority)
    }

    #[test]
    fn matrix_is_symmetric() {
        let (matrix, _) = four_way();
        let n = ApproachId::from("north");
        let e = ApproachId::from("east");
        assert!(matrix.conflicts(&n, &e));
        assert!(matrix.conflicts(&e, &n));
        assert_eq!(matrix.len(), 4);
    }

    #[test]
    fn approach_is_compatible_with_itself() {
        let (matrix, _) = four_way();
        let n = ApproachId::from("north");
        assert!(matrix.compatible(&n, &n));
    }

    #[test]
    fn same_axis_is_compatible() {
        let (matrix, _) = four_way();
        assert!(matrix.compatible(&ApproachId::from("north"), &ApproachId::from("south")));
    }

    #[test]
    fn self_pair_is_rejected() {
        let all = ids(&["north"]);
        let err = ConflictMatrix::new(&all, &[pair("north", "north")]);
        assert_eq!(err, Err(ConflictError::SelfConflict(ApproachId::from("north"))));
    }

    #[test]
    fn unknown_pair_member_is_rejected() {
        let all = ids(&["north"]);
        let err = ConflictMatrix::new(&all, &[pair("north", "east")]);
        assert!(matches!(err, Err(ConflictError::UnknownApproach(..))));
    }

    #[test]
    fn duplicate_pairs_collapse() {
        let all = ids(&["a", "b"]);
        let matrix = ConflictMatrix::new(&all, &[pair("a", "b"), pair("b", "a")]);
        assert_eq!(matrix.map(|m| m.len()), Ok(1));
    }

    #[test]
    fn priority_must_rank_everyone_once() {
        let all = ids(&["a", "b"]);
        let missing = PriorityOrder::new(&all, &[ApproachId::from("a")]);
        assert!(matches!(missing, Err(ConflictError::InvalidPriority(_))));

        let twice = PriorityOrder::new(
            &all,
            &[ApproachId::from("a"), ApproachId::from("b"), ApproachId::from("a")],
        );
        assert!(matches!(twice, Err(ConflictError::InvalidPriority(_))));
    }

    #[test]
    fn priority_ranks_in_listed_order() {
        let (_, priority) = four_way();
        assert!(priority.outranks(&ApproachId::from("north"), &ApproachId::from("east")));
        assert!(!priority.outranks(&ApproachId::from("west"), &ApproachId::from("south")));
        assert_eq!(priority.ordered().len(), 4);
    }

    #[test]
    fn newcomer_yields_to_incumbent_regardless_of_priority() {
        let (matrix, priority) = four_way();
        let north = ApproachId::from("north");
        let east = ApproachId::from("east");
        let claims = [
            GreenClaim { id: &north, incumbent: false },
            GreenClaim { id: &east, incumbent: true },
        ];
        let held = resolve_green_conflicts(&claims, &matrix, &priority);
        assert_eq!(
            held,
            vec![ConflictResolution {
                held: north,
                against: east
            }]
        );
    }

    #[test]
    fn simultaneous_newcomers_resolve_by_priority() {
        let (matrix, priority) = four_way();
        let west = ApproachId::from("west");
        let south = ApproachId::from("south");
        let claims = [
            GreenClaim { id: &west, incumbent: false },
            GreenClaim { id: &south, incumbent: false },
        ];
        let held = resolve_green_conflicts(&claims, &matrix, &priority);
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].held, west);
        assert_eq!(held[0].against, south);
    }

    #[test]
    fn compatible_greens_are_untouched() {
        let (matrix, priority) = four_way();
        let north = ApproachId::from("north");
        let south = ApproachId::from("south");
        let claims = [
            GreenClaim { id: &north, incumbent: true },
            GreenClaim { id: &south, incumbent: false },
        ];
        assert!(resolve_green_conflicts(&claims, &matrix, &priority).is_empty());
    }

    #[test]
    fn all_green_leaves_one_compatible_group() {
        let (matrix, priority) = four_way();
        let all: Vec<ApproachId> = ["north", "south", "east", "west"]
            .into_iter()
            .map(ApproachId::from)
            .collect();
        let claims: Vec<GreenClaim<'_>> = all
            .iter()
            .map(|id| GreenClaim { id, incumbent: false })
            .collect();
        let held = resolve_green_conflicts(&claims, &matrix, &priority);
        let held_ids: Vec<&str> = held.iter().map(|h| h.held.as_str()).collect();
        assert_eq!(held_ids, ["east", "west"]);
    }
}
