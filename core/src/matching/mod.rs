//! Profile identity matching.
//!
//! The engine derives profile regions from sketch curves on its own, so a
//! replayed sketch ends up with anonymous regions that must be paired with
//! the captured profiles. Two passes run over the candidate pool:
//!
//! 1. An exact pass pairs a captured profile with the first candidate that
//!    has the same canonical curve-uuid set and identical measured
//!    properties (area, perimeter, centroid under the frame correction).
//! 2. A fallback pass handles the leftovers: a sole remaining candidate is
//!    accepted outright, otherwise the candidate with the best curve-uuid
//!    overlap score wins, provided the score is positive.
//!
//! Every match removes its candidate from the pool, so the final assignment
//! is one-to-one. Captured profiles that stay unpaired are reported rather
//! than being an error; callers decide whether an incomplete sketch is
//! acceptable.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{AreaProperties, ProfileHandle};
use crate::geometry::{Matrix4, Point3, EPSILON};
use crate::snapshot::{EntityId, ProfileData};

#[cfg(test)]
mod tests_fallback;

/// Identity evidence of a captured profile, prepared for matching.
#[derive(Debug, Clone)]
pub struct OriginalProfile {
    pub id: EntityId,
    /// Canonical curve-uuid set: deduplicated and sorted.
    pub curve_uuids: Vec<EntityId>,
    pub area: f64,
    pub perimeter: f64,
    /// Captured in the extraction frame; compared after applying the
    /// correction.
    pub centroid: Point3,
}

impl OriginalProfile {
    pub fn from_data(id: EntityId, data: &ProfileData) -> Self {
        Self {
            id,
            curve_uuids: data.curve_ids(),
            area: data.properties.area,
            perimeter: data.properties.perimeter,
            centroid: data.properties.centroid.to_point(),
        }
    }
}

/// A region enumerated from the live sketch, reduced to the evidence used
/// for identification.
#[derive(Debug, Clone)]
pub struct CandidateProfile {
    pub handle: ProfileHandle,
    /// Canonical curve-uuid set; curves without a recorded uuid contribute
    /// nothing here.
    pub curve_uuids: Vec<EntityId>,
    pub properties: AreaProperties,
}

impl CandidateProfile {
    /// Canonicalizes the uuid set on construction.
    pub fn new(
        handle: ProfileHandle,
        curve_uuids: impl IntoIterator<Item = EntityId>,
        properties: AreaProperties,
    ) -> Self {
        let set: BTreeSet<EntityId> = curve_uuids.into_iter().collect();
        Self {
            handle,
            curve_uuids: set.into_iter().collect(),
            properties,
        }
    }
}

/// How a pairing was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Same canonical curve set and identical measured properties.
    Exact,
    /// Only one candidate was left in the pool; accepted unconditionally.
    SoleCandidate,
    /// Best positive curve-overlap score among several leftovers.
    ClosestOverlap { score: i64 },
}

/// One captured profile paired with one live region.
#[derive(Debug, Clone)]
pub struct ProfileMatch {
    pub original: EntityId,
    pub candidate: CandidateProfile,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matches: Vec<ProfileMatch>,
    /// Captured profiles no candidate could be found for.
    pub unmatched: Vec<EntityId>,
}

/// Runs the exact pass followed by the fallback pass over one sketch's
/// candidate pool.
pub fn match_profiles(
    originals: &[OriginalProfile],
    mut pool: Vec<CandidateProfile>,
    correction: &Matrix4,
) -> MatchOutcome {
    let (mut matches, missing) = exact_match(originals, &mut pool, correction);
    if !missing.is_empty() {
        debug!(
            "{} missing profiles and {} remaining candidate regions",
            missing.len(),
            pool.len()
        );
    }
    let (recovered, unmatched) = fallback_match(&missing, &mut pool);
    matches.extend(recovered);
    MatchOutcome { matches, unmatched }
}

/// Exact pass: first-fit over the pool in engine enumeration order, keyed on
/// canonical curve-uuid set equality plus identical properties. Matched
/// candidates are removed from the pool; originals that stay unmatched are
/// returned for the fallback pass.
pub fn exact_match(
    originals: &[OriginalProfile],
    pool: &mut Vec<CandidateProfile>,
    correction: &Matrix4,
) -> (Vec<ProfileMatch>, Vec<OriginalProfile>) {
    let mut matches = Vec::new();
    let mut missing = Vec::new();
    for original in originals {
        let found = pool.iter().position(|candidate| {
            candidate.curve_uuids == original.curve_uuids
                && properties_identical(original, &candidate.properties, correction)
        });
        match found {
            Some(index) => {
                let candidate = pool.remove(index);
                debug!(
                    "profile {} matched exactly with {} curve uuids",
                    original.id,
                    candidate.curve_uuids.len()
                );
                matches.push(ProfileMatch {
                    original: original.id,
                    candidate,
                    kind: MatchKind::Exact,
                });
            }
            None => {
                debug!("no exact match for profile {}", original.id);
                missing.push(original.clone());
            }
        }
    }
    (matches, missing)
}

/// Fallback pass for originals the exact pass could not place. Each match
/// consumes its candidate so no region is assigned twice.
pub fn fallback_match(
    missing: &[OriginalProfile],
    pool: &mut Vec<CandidateProfile>,
) -> (Vec<ProfileMatch>, Vec<EntityId>) {
    let mut matches = Vec::new();
    let mut unmatched = Vec::new();
    for original in missing {
        match closest_candidate(original, pool) {
            Some((index, kind)) => {
                let candidate = pool.remove(index);
                debug!(
                    "profile {} with {} curves matched to a leftover region via {:?}",
                    original.id,
                    original.curve_uuids.len(),
                    kind
                );
                matches.push(ProfileMatch {
                    original: original.id,
                    candidate,
                    kind,
                });
            }
            None => unmatched.push(original.id),
        }
    }
    if !unmatched.is_empty() {
        warn!("{} left over unmatched profiles", unmatched.len());
    }
    (matches, unmatched)
}

/// Scores one original against the remaining pool.
///
/// A sole surviving candidate is taken as-is. Otherwise the score is the
/// curve-uuid overlap minus the difference in set sizes; the strict
/// comparison keeps the first candidate on ties and rejects anything not
/// strictly positive.
fn closest_candidate(
    original: &OriginalProfile,
    pool: &[CandidateProfile],
) -> Option<(usize, MatchKind)> {
    if pool.len() == 1 {
        return Some((0, MatchKind::SoleCandidate));
    }
    let original_count = original.curve_uuids.len() as i64;
    let mut best = None;
    let mut max_score = 0i64;
    for (index, candidate) in pool.iter().enumerate() {
        let overlap = overlap_count(&original.curve_uuids, &candidate.curve_uuids) as i64;
        let score = overlap - (candidate.curve_uuids.len() as i64 - original_count).abs();
        if score > max_score {
            max_score = score;
            best = Some(index);
        }
    }
    best.map(|index| (index, MatchKind::ClosestOverlap { score: max_score }))
}

/// Number of uuids two canonical (sorted, deduplicated) sets share.
fn overlap_count(left: &[EntityId], right: &[EntityId]) -> usize {
    let mut count = 0;
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

/// Area, perimeter and centroid all within the absolute tolerance. The
/// captured centroid is mapped through the correction before comparison
/// because the candidate's centroid is measured in the live frame.
fn properties_identical(
    original: &OriginalProfile,
    measured: &AreaProperties,
    correction: &Matrix4,
) -> bool {
    let tolerance = EPSILON;
    if (measured.area - original.area).abs() > tolerance {
        debug!(
            "profile area {} does not match captured {}",
            measured.area, original.area
        );
        return false;
    }
    if (measured.perimeter - original.perimeter).abs() > tolerance {
        debug!(
            "profile perimeter {} does not match captured {}",
            measured.perimeter, original.perimeter
        );
        return false;
    }
    let expected = correction.transform_point(&original.centroid);
    if (measured.centroid.x - expected.x).abs() > tolerance
        || (measured.centroid.y - expected.y).abs() > tolerance
        || (measured.centroid.z - expected.z).abs() > tolerance
    {
        debug!(
            "profile centroid {:?} does not match corrected {:?}",
            measured.centroid, expected
        );
        return false;
    }
    true
}
