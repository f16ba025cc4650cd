use std::collections::BTreeSet;

use crate::engine::{AreaProperties, ProfileHandle};
use crate::geometry::{Matrix4, Point3};
use crate::matching::{
    exact_match, fallback_match, match_profiles, CandidateProfile, MatchKind, OriginalProfile,
};
use crate::snapshot::EntityId;

fn cid(seed: &str) -> EntityId {
    EntityId::new_deterministic(seed)
}

fn canonical(seeds: &[&str]) -> Vec<EntityId> {
    let set: BTreeSet<EntityId> = seeds.iter().map(|s| cid(s)).collect();
    set.into_iter().collect()
}

fn original(id_seed: &str, curves: &[&str]) -> OriginalProfile {
    OriginalProfile {
        id: cid(id_seed),
        curve_uuids: canonical(curves),
        area: 1.0,
        perimeter: 4.0,
        centroid: Point3::new(0.0, 0.0, 0.0),
    }
}

fn candidate(handle: u64, curves: &[&str]) -> CandidateProfile {
    CandidateProfile::new(
        ProfileHandle(handle),
        curves.iter().map(|s| cid(s)),
        AreaProperties {
            area: 1.0,
            perimeter: 4.0,
            centroid: Point3::new(0.0, 0.0, 0.0),
        },
    )
}

#[test]
fn sole_survivor_is_accepted_without_scoring() {
    // The single leftover shares no curve uuids with the original, but a
    // lone candidate is taken as-is.
    let missing = vec![original("p1", &["a", "b", "c"])];
    let mut pool = vec![candidate(10, &["x", "y"])];

    let (matches, unmatched) = fallback_match(&missing, &mut pool);
    assert!(unmatched.is_empty());
    assert!(pool.is_empty());
    assert_eq!(matches[0].kind, MatchKind::SoleCandidate);
    assert_eq!(matches[0].candidate.handle, ProfileHandle(10));
}

#[test]
fn overlap_score_picks_the_closest_region() {
    // Captured profile with curves {c1..c4}; the near-miss candidate shares
    // three of them and has the same set size, the other shares one.
    let missing = vec![original("p1", &["c1", "c2", "c3", "c4"])];
    let mut pool = vec![
        candidate(10, &["c1", "c9"]),
        candidate(20, &["c1", "c2", "c3", "c5"]),
    ];

    let (matches, unmatched) = fallback_match(&missing, &mut pool);
    assert!(unmatched.is_empty());
    assert_eq!(matches[0].candidate.handle, ProfileHandle(20));
    assert_eq!(matches[0].kind, MatchKind::ClosestOverlap { score: 3 });
    assert_eq!(pool.len(), 1, "only the matched candidate is consumed");
}

#[test]
fn score_must_be_strictly_positive() {
    // Both candidates are disjoint from the original; size penalties drive
    // every score to zero or below, so nothing may match.
    let missing = vec![original("p1", &["a", "b"])];
    let mut pool = vec![candidate(10, &["x", "y"]), candidate(20, &["z"])];

    let (matches, unmatched) = fallback_match(&missing, &mut pool);
    assert!(matches.is_empty());
    assert_eq!(unmatched, vec![cid("p1")]);
    assert_eq!(pool.len(), 2, "a failed fallback must not consume candidates");
}

#[test]
fn equal_scores_keep_the_first_candidate() {
    let missing = vec![original("p1", &["a", "b"])];
    let mut pool = vec![candidate(10, &["a", "x"]), candidate(20, &["b", "y"])];

    let (matches, _) = fallback_match(&missing, &mut pool);
    assert_eq!(matches[0].candidate.handle, ProfileHandle(10));
    assert_eq!(matches[0].kind, MatchKind::ClosestOverlap { score: 1 });
}

#[test]
fn consumed_candidates_cannot_be_assigned_twice() {
    // Both originals would score best against candidate 10. The second must
    // fall through to what is left instead of reusing it.
    let missing = vec![
        original("p1", &["a", "b", "c"]),
        original("p2", &["a", "b", "d"]),
    ];
    let mut pool = vec![candidate(10, &["a", "b", "e"]), candidate(20, &["z"])];

    let (matches, unmatched) = fallback_match(&missing, &mut pool);
    assert!(unmatched.is_empty());
    assert!(pool.is_empty());
    assert_eq!(matches[0].original, cid("p1"));
    assert_eq!(matches[0].candidate.handle, ProfileHandle(10));
    assert_eq!(matches[0].kind, MatchKind::ClosestOverlap { score: 2 });
    // Candidate 20 is the sole survivor by the time p2 is considered.
    assert_eq!(matches[1].original, cid("p2"));
    assert_eq!(matches[1].candidate.handle, ProfileHandle(20));
    assert_eq!(matches[1].kind, MatchKind::SoleCandidate);
}

#[test]
fn empty_pool_leaves_all_profiles_unmatched() {
    let missing = vec![original("p1", &["a"]), original("p2", &["b"])];
    let mut pool = Vec::new();

    let (matches, unmatched) = fallback_match(&missing, &mut pool);
    assert!(matches.is_empty());
    assert_eq!(unmatched, vec![cid("p1"), cid("p2")]);
}

#[test]
fn exact_then_fallback_covers_a_mixed_sketch() {
    let originals = vec![
        original("p1", &["a", "b"]),
        original("p2", &["c1", "c2", "c3"]),
    ];
    let pool = vec![
        candidate(10, &["a", "b"]),
        candidate(20, &["c1", "c2", "c9"]),
        candidate(30, &["x", "y"]),
    ];

    let outcome = match_profiles(&originals, pool, &Matrix4::identity());
    assert!(outcome.unmatched.is_empty());
    assert_eq!(outcome.matches.len(), 2);

    let exact = &outcome.matches[0];
    assert_eq!(exact.original, cid("p1"));
    assert_eq!(exact.kind, MatchKind::Exact);

    let recovered = &outcome.matches[1];
    assert_eq!(recovered.original, cid("p2"));
    assert_eq!(recovered.candidate.handle, ProfileHandle(20));
    assert_eq!(recovered.kind, MatchKind::ClosestOverlap { score: 2 });
}

#[test]
fn exact_pass_hands_unplaced_originals_to_the_caller() {
    let originals = vec![original("p1", &["a", "b"]), original("p2", &["c", "d"])];
    let mut pool = vec![candidate(10, &["a", "b"])];

    let (matches, missing) = exact_match(&originals, &mut pool, &Matrix4::identity());
    assert_eq!(matches.len(), 1);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].id, cid("p2"));
}
