//! Timeline replay: rebuilding a captured design inside a live engine.
//!
//! A [`ReplaySession`] walks a snapshot's timeline in ascending index order
//! and re-executes each entry against the engine: sketches are recreated
//! curve by curve, the regions the engine derives from those curves are
//! paired with the captured profiles, and extrude features consume the
//! paired regions. One entry failing is recorded in the report and replay
//! moves on; a snapshot with a broken feature still yields everything that
//! could be rebuilt.
//!
//! Coordinates captured in a sketch's extraction frame rarely land in the
//! frame the engine assigns the recreated sketch, so every captured point
//! passes through the [`frame_correction`] between the two before insertion.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{
    AreaProperties, CalculationAccuracy, CurveHandle, CurveRequest, EngineError, ExtrudeExtent,
    ExtrudeOperation, ExtrudeSpec, FeatureHandle, GeometryEngine, NurbsCurve, ProfileHandle,
    SideExtent, SketchHandle,
};
use crate::geometry::{frame_correction, Matrix4, Point3, SingularTransform};
use crate::matching::{self, CandidateProfile, MatchKind, OriginalProfile};
use crate::snapshot::{
    CurveData, CurveKind, DesignSnapshot, Entity, EntityId, ExtentData, ExtrudeData, PointData,
    ProfileData, SketchData, StartExtentData, TimelineEntry,
};

mod plane;

/// Errors a single timeline entry (or an incremental call) can fail with.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconstructError {
    #[error("sketch plane not found: {0}")]
    SketchPlaneNotFound(String),
    #[error("profile not found: {0}")]
    ProfileNotFound(EntityId),
    #[error(transparent)]
    TransformSingular(#[from] SingularTransform),
    #[error("sketch has too few points to close a profile")]
    InsufficientGeometry,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unsupported curve type for curve {0}")]
    UnsupportedCurveType(EntityId),
    #[error("invalid extrude operation: {0}")]
    ExtrudeOperationInvalid(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type ReplayResult<T> = Result<T, ReconstructError>;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    ProcessingSketch,
    ProcessingExtrude,
    Done,
}

/// Everything a replay produced, entry by entry in replay order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub entries: Vec<EntryRecord>,
}

impl ReplayReport {
    /// Entries whose replay failed outright.
    pub fn failures(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, EntryOutcome::Failed(_)))
    }

    /// Successfully replayed sketches with their records.
    pub fn sketch_records(&self) -> impl Iterator<Item = (&EntryRecord, &SketchRecord)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            EntryOutcome::Sketch(record) => Some((entry, record)),
            _ => None,
        })
    }

    /// Captured profile ids no live region could be paired with, across all
    /// replayed sketches.
    pub fn unmatched_profiles(&self) -> Vec<EntityId> {
        self.sketch_records()
            .flat_map(|(_, record)| record.unmatched.iter().copied())
            .collect()
    }
}

/// Outcome of one timeline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entity: EntityId,
    pub index: u32,
    pub name: Option<String>,
    pub outcome: EntryOutcome,
    /// Recoverable oddities hit along the way (skipped curves, plane
    /// fallbacks). Never empty-checked by replay itself.
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntryOutcome {
    Sketch(SketchRecord),
    Extrude(ExtrudeRecord),
    /// Entry carried nothing to replay (no captured geometry, or an entity
    /// type this crate does not handle).
    Skipped,
    Failed(ReconstructError),
}

/// A replayed sketch: the engine-side identity it got and the profile
/// pairings that were established on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchRecord {
    pub sketch_id: EntityId,
    pub sketch_name: String,
    pub profiles: BTreeMap<EntityId, MatchedRegion>,
    pub unmatched: Vec<EntityId>,
}

/// A live region paired with a captured profile id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedRegion {
    pub handle: ProfileHandle,
    pub kind: MatchKind,
    pub curve_uuids: Vec<EntityId>,
    pub properties: AreaProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrudeRecord {
    pub feature: FeatureHandle,
    pub operation: ExtrudeOperation,
    pub profiles: Vec<EntityId>,
}

/// Replays snapshots against a borrowed engine.
///
/// The session owns the identity side-tables: engine curve handles tagged
/// with the captured curve uuid they realize, and captured profile ids
/// mapped to the live region that now stands for them. Later timeline
/// entries (extrudes, sketches on profile planes) resolve through these
/// tables, so a session must replay the whole snapshot it was given before
/// its mappings mean anything.
pub struct ReplaySession<'a, E: GeometryEngine> {
    engine: &'a mut E,
    profile_map: HashMap<EntityId, ProfileHandle>,
    curve_tags: HashMap<CurveHandle, EntityId>,
    state: ReplayState,
}

impl<'a, E: GeometryEngine> ReplaySession<'a, E> {
    pub fn new(engine: &'a mut E) -> Self {
        Self {
            engine,
            profile_map: HashMap::new(),
            curve_tags: HashMap::new(),
            state: ReplayState::Idle,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Captured profile id to live region handle, as established so far.
    pub fn profile_map(&self) -> &HashMap<EntityId, ProfileHandle> {
        &self.profile_map
    }

    /// Replay every timeline entry of the snapshot, in ascending index
    /// order. Entries that fail are contained in their [`EntryRecord`];
    /// reconstruction itself always runs to the end of the timeline.
    pub fn reconstruct(&mut self, snapshot: &DesignSnapshot) -> ReplayReport {
        let mut ordered: Vec<&TimelineEntry> = snapshot.timeline.iter().collect();
        ordered.sort_by_key(|entry| entry.index);

        let mut entries = Vec::with_capacity(ordered.len());
        for entry in ordered {
            entries.push(self.process_entry(entry, snapshot));
        }
        self.state = ReplayState::Done;
        ReplayReport { entries }
    }

    fn process_entry(&mut self, entry: &TimelineEntry, snapshot: &DesignSnapshot) -> EntryRecord {
        let mut diagnostics = Vec::new();
        let entity = match snapshot.entities.get(&entry.entity) {
            Some(entity) => entity,
            None => {
                warn!("timeline references unknown entity {}", entry.entity);
                diagnostics.push(format!(
                    "timeline references unknown entity {}",
                    entry.entity
                ));
                return EntryRecord {
                    entity: entry.entity,
                    index: entry.index,
                    name: None,
                    outcome: EntryOutcome::Skipped,
                    diagnostics,
                };
            }
        };

        let name = entity.name().map(str::to_string);
        info!(
            "reconstructing {} (timeline index {})",
            name.as_deref().unwrap_or("<unnamed>"),
            entry.index
        );

        let outcome = match entity {
            Entity::Sketch(sketch) => {
                self.state = ReplayState::ProcessingSketch;
                match (&sketch.points, &sketch.curves, &sketch.profiles) {
                    (Some(points), Some(curves), Some(profiles)) => {
                        match self.replay_sketch(
                            entry.entity,
                            sketch,
                            points,
                            curves,
                            profiles,
                            &mut diagnostics,
                        ) {
                            Ok(record) => EntryOutcome::Sketch(record),
                            Err(error) => EntryOutcome::Failed(error),
                        }
                    }
                    _ => {
                        debug!("sketch {} has no captured geometry", sketch.name);
                        diagnostics.push("sketch has no captured geometry".to_string());
                        EntryOutcome::Skipped
                    }
                }
            }
            Entity::ExtrudeFeature(extrude) => {
                self.state = ReplayState::ProcessingExtrude;
                match self.replay_extrude(extrude) {
                    Ok(record) => EntryOutcome::Extrude(record),
                    Err(error) => EntryOutcome::Failed(error),
                }
            }
            Entity::Unsupported => {
                diagnostics.push("entity type is not replayable".to_string());
                EntryOutcome::Skipped
            }
        };

        if let EntryOutcome::Failed(error) = &outcome {
            warn!("entry {} failed: {}", entry.index, error);
        }
        EntryRecord {
            entity: entry.entity,
            index: entry.index,
            name,
            outcome,
            diagnostics,
        }
    }

    fn replay_sketch(
        &mut self,
        sketch_id: EntityId,
        data: &SketchData,
        points: &BTreeMap<EntityId, PointData>,
        curves: &BTreeMap<EntityId, CurveData>,
        profiles: &BTreeMap<EntityId, ProfileData>,
        diagnostics: &mut Vec<String>,
    ) -> ReplayResult<SketchRecord> {
        let surface = plane::resolve_reference_plane(
            self.engine,
            data.reference_plane.as_ref(),
            &self.profile_map,
            diagnostics,
        )?;
        let sketch = self.engine.create_sketch(surface)?;
        let sketch_name = self.engine.sketch_name(sketch)?;

        let import_transform = self.engine.sketch_transform(sketch)?;
        let extraction_transform = match &data.transform {
            Some(transform) => transform.to_matrix(),
            None => {
                diagnostics.push("sketch has no captured transform, assuming identity".to_string());
                Matrix4::identity()
            }
        };
        let correction = frame_correction(&import_transform, &extraction_transform)?;

        debug!(
            "replaying sketch {} with {} points and {} curves",
            sketch_name,
            points.len(),
            curves.len()
        );

        // Recompute stays deferred across the whole batch; the restore runs
        // even when an insertion failed, then either error surfaces.
        self.engine.set_deferred_recompute(sketch, true)?;
        let inserted = self.insert_curves(sketch, curves, points, &correction, diagnostics);
        let resumed = self.engine.set_deferred_recompute(sketch, false);
        inserted?;
        resumed?;

        let pool = self.candidate_pool(sketch)?;
        let originals: Vec<OriginalProfile> = profiles
            .iter()
            .map(|(id, data)| OriginalProfile::from_data(*id, data))
            .collect();
        let outcome = matching::match_profiles(&originals, pool, &correction);

        let mut matched = BTreeMap::new();
        for found in outcome.matches {
            self.profile_map.insert(found.original, found.candidate.handle);
            matched.insert(
                found.original,
                MatchedRegion {
                    handle: found.candidate.handle,
                    kind: found.kind,
                    curve_uuids: found.candidate.curve_uuids,
                    properties: found.candidate.properties,
                },
            );
        }
        Ok(SketchRecord {
            sketch_id,
            sketch_name,
            profiles: matched,
            unmatched: outcome.unmatched,
        })
    }

    /// Insert the captured curves of one sketch. Construction geometry is
    /// left out entirely; curves that cannot be realized (unsupported kind,
    /// dangling point reference) are skipped with a diagnostic. Engine
    /// failures abort the sketch.
    fn insert_curves(
        &mut self,
        sketch: SketchHandle,
        curves: &BTreeMap<EntityId, CurveData>,
        points: &BTreeMap<EntityId, PointData>,
        correction: &Matrix4,
        diagnostics: &mut Vec<String>,
    ) -> ReplayResult<()> {
        for (curve_id, curve) in curves {
            if curve.construction_geom {
                continue;
            }
            let request = match build_curve_request(curve_id, &curve.kind, points, correction) {
                Ok(request) => request,
                Err(skip) => {
                    debug!("skipping curve {}: {}", curve_id, skip);
                    diagnostics.push(skip.to_string());
                    continue;
                }
            };
            let handle = self.engine.add_curve(sketch, &request)?;
            self.curve_tags.insert(handle, *curve_id);
        }
        Ok(())
    }

    /// Enumerate the live regions of a sketch and reduce each to its
    /// matching evidence: the uuid set recovered through the curve tags and
    /// the measured properties.
    fn candidate_pool(&mut self, sketch: SketchHandle) -> ReplayResult<Vec<CandidateProfile>> {
        let enumerated = self.engine.enumerate_profiles(sketch)?;
        debug!("engine reports {} regions", enumerated.len());

        let mut pool = Vec::with_capacity(enumerated.len());
        for profile in enumerated {
            let curve_uuids: Vec<EntityId> = profile
                .loops
                .iter()
                .flat_map(|profile_loop| profile_loop.curves.iter())
                .filter_map(|handle| self.curve_tags.get(handle).copied())
                .collect();
            let properties = self
                .engine
                .profile_properties(profile.handle, CalculationAccuracy::High)?;
            pool.push(CandidateProfile::new(profile.handle, curve_uuids, properties));
        }
        Ok(pool)
    }

    fn replay_extrude(&mut self, data: &ExtrudeData) -> ReplayResult<ExtrudeRecord> {
        let mut handles = Vec::with_capacity(data.profiles.len());
        let mut consumed = Vec::with_capacity(data.profiles.len());
        for reference in &data.profiles {
            let handle = self
                .profile_map
                .get(&reference.profile)
                .copied()
                .ok_or(ReconstructError::ProfileNotFound(reference.profile))?;
            handles.push(handle);
            consumed.push(reference.profile);
        }

        let spec = translate_extrude(data)?;
        let feature = self.engine.create_extrude(&handles, &spec)?;
        debug!(
            "extrude {} rebuilt from {} profiles",
            data.name,
            handles.len()
        );
        Ok(ExtrudeRecord {
            feature,
            operation: spec.operation,
            profiles: consumed,
        })
    }
}

/// Realize one captured curve as an engine request, with every coordinate
/// mapped through the frame correction.
fn build_curve_request(
    curve_id: &EntityId,
    kind: &CurveKind,
    points: &BTreeMap<EntityId, PointData>,
    correction: &Matrix4,
) -> ReplayResult<CurveRequest> {
    let resolve = |point_id: &EntityId| -> ReplayResult<Point3> {
        let point = points.get(point_id).ok_or_else(|| {
            ReconstructError::InvalidState(format!(
                "curve {} references missing point {}",
                curve_id, point_id
            ))
        })?;
        Ok(correction.transform_point(&point.to_point()))
    };

    match kind {
        CurveKind::SketchLine {
            start_point,
            end_point,
        } => Ok(CurveRequest::Line {
            start: resolve(start_point)?,
            end: resolve(end_point)?,
        }),
        CurveKind::SketchArc {
            center_point,
            start_point,
            start_angle,
            end_angle,
        } => Ok(CurveRequest::Arc {
            center: resolve(center_point)?,
            start: resolve(start_point)?,
            sweep: end_angle - start_angle,
        }),
        CurveKind::SketchCircle {
            center_point,
            radius,
        } => Ok(CurveRequest::Circle {
            center: resolve(center_point)?,
            radius: *radius,
        }),
        CurveKind::SketchFittedSpline {
            control_points,
            degree,
            knots,
            weights,
            rational,
            periodic,
        } => {
            let control_points = control_points
                .iter()
                .map(|point| correction.transform_point(&point.to_point()))
                .collect();
            Ok(CurveRequest::FittedSpline(NurbsCurve {
                control_points,
                degree: *degree,
                knots: knots.clone(),
                weights: if *rational { weights.clone() } else { None },
                periodic: *periodic,
            }))
        }
        CurveKind::Unsupported => Err(ReconstructError::UnsupportedCurveType(*curve_id)),
    }
}

/// Translate the captured operation and extent strings into an engine
/// request.
fn translate_extrude(data: &ExtrudeData) -> ReplayResult<ExtrudeSpec> {
    let operation = parse_operation(&data.operation)?;
    let extent_one = data.extent_one.as_ref().ok_or_else(|| {
        ReconstructError::ExtrudeOperationInvalid(format!(
            "{} extrude has no primary extent",
            data.extent_type
        ))
    })?;

    let extent = match data.extent_type.as_str() {
        "OneSideFeatureExtentType" => ExtrudeExtent::OneSide(side_extent(extent_one)),
        "TwoSidesFeatureExtentType" => {
            let extent_two = data.extent_two.as_ref().ok_or_else(|| {
                ReconstructError::ExtrudeOperationInvalid(
                    "two sided extrude has no second extent".to_string(),
                )
            })?;
            ExtrudeExtent::TwoSides {
                side_one: side_extent(extent_one),
                side_two: side_extent(extent_two),
            }
        }
        "SymmetricFeatureExtentType" => {
            // Symmetric extents misbehave in the engine when a taper is
            // applied; an equal two-sided extent reproduces them. Full-length
            // distances span the whole extrusion and get split in half.
            let mut side = side_extent(extent_one);
            if extent_one.is_full_length {
                side.distance *= 0.5;
            }
            ExtrudeExtent::TwoSides {
                side_one: side,
                side_two: side,
            }
        }
        other => {
            return Err(ReconstructError::ExtrudeOperationInvalid(format!(
                "unknown extent type {:?}",
                other
            )))
        }
    };

    let start_offset = match &data.start_extent {
        Some(StartExtentData::OffsetStartDefinition { offset }) => offset.value,
        _ => 0.0,
    };

    Ok(ExtrudeSpec {
        operation,
        extent,
        start_offset,
    })
}

fn side_extent(extent: &ExtentData) -> SideExtent {
    SideExtent {
        distance: extent.distance.value,
        taper_angle: extent
            .taper_angle
            .as_ref()
            .map(|taper| taper.value)
            .unwrap_or(0.0),
    }
}

fn parse_operation(operation: &str) -> ReplayResult<ExtrudeOperation> {
    match operation {
        "NewBodyFeatureOperation" => Ok(ExtrudeOperation::NewBody),
        "JoinFeatureOperation" => Ok(ExtrudeOperation::Join),
        "CutFeatureOperation" => Ok(ExtrudeOperation::Cut),
        "IntersectFeatureOperation" => Ok(ExtrudeOperation::Intersect),
        other => Err(ReconstructError::ExtrudeOperationInvalid(format!(
            "unknown operation {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector3;
    use crate::snapshot::ValueData;

    fn extent(distance: f64, taper: Option<f64>, is_full_length: bool) -> ExtentData {
        ExtentData {
            distance: ValueData { value: distance },
            taper_angle: taper.map(|value| ValueData { value }),
            is_full_length,
        }
    }

    fn extrude(
        extent_type: &str,
        extent_one: Option<ExtentData>,
        extent_two: Option<ExtentData>,
    ) -> ExtrudeData {
        ExtrudeData {
            name: "Extrude1".to_string(),
            profiles: Vec::new(),
            operation: "NewBodyFeatureOperation".to_string(),
            extent_type: extent_type.to_string(),
            extent_one,
            extent_two,
            start_extent: None,
        }
    }

    #[test]
    fn one_sided_extents_translate_directly() {
        let data = extrude(
            "OneSideFeatureExtentType",
            Some(extent(2.5, Some(0.1), false)),
            None,
        );
        let spec = translate_extrude(&data).unwrap();
        assert_eq!(
            spec.extent,
            ExtrudeExtent::OneSide(SideExtent {
                distance: 2.5,
                taper_angle: 0.1,
            })
        );
        assert_eq!(spec.operation, ExtrudeOperation::NewBody);
        assert_eq!(spec.start_offset, 0.0);
    }

    #[test]
    fn two_sided_extents_keep_both_sides() {
        let data = extrude(
            "TwoSidesFeatureExtentType",
            Some(extent(1.0, None, false)),
            Some(extent(3.0, Some(0.2), false)),
        );
        let spec = translate_extrude(&data).unwrap();
        assert_eq!(
            spec.extent,
            ExtrudeExtent::TwoSides {
                side_one: SideExtent::straight(1.0),
                side_two: SideExtent {
                    distance: 3.0,
                    taper_angle: 0.2,
                },
            }
        );
    }

    #[test]
    fn symmetric_full_length_extents_split_the_distance() {
        let data = extrude(
            "SymmetricFeatureExtentType",
            Some(extent(4.0, Some(0.2), true)),
            None,
        );
        let spec = translate_extrude(&data).unwrap();
        let side = SideExtent {
            distance: 2.0,
            taper_angle: 0.2,
        };
        assert_eq!(
            spec.extent,
            ExtrudeExtent::TwoSides {
                side_one: side,
                side_two: side,
            }
        );
    }

    #[test]
    fn symmetric_per_side_extents_keep_the_distance() {
        let data = extrude(
            "SymmetricFeatureExtentType",
            Some(extent(4.0, None, false)),
            None,
        );
        let spec = translate_extrude(&data).unwrap();
        assert_eq!(
            spec.extent,
            ExtrudeExtent::TwoSides {
                side_one: SideExtent::straight(4.0),
                side_two: SideExtent::straight(4.0),
            }
        );
    }

    #[test]
    fn unknown_extent_types_are_rejected() {
        let data = extrude(
            "ThroughAllFeatureExtentType",
            Some(extent(1.0, None, false)),
            None,
        );
        assert!(matches!(
            translate_extrude(&data),
            Err(ReconstructError::ExtrudeOperationInvalid(_))
        ));
    }

    #[test]
    fn missing_primary_extent_is_rejected() {
        let data = extrude("OneSideFeatureExtentType", None, None);
        assert!(matches!(
            translate_extrude(&data),
            Err(ReconstructError::ExtrudeOperationInvalid(_))
        ));

        let data = extrude(
            "TwoSidesFeatureExtentType",
            Some(extent(1.0, None, false)),
            None,
        );
        assert!(matches!(
            translate_extrude(&data),
            Err(ReconstructError::ExtrudeOperationInvalid(_))
        ));
    }

    #[test]
    fn operation_names_parse_to_engine_operations() {
        assert_eq!(
            parse_operation("NewBodyFeatureOperation").unwrap(),
            ExtrudeOperation::NewBody
        );
        assert_eq!(
            parse_operation("JoinFeatureOperation").unwrap(),
            ExtrudeOperation::Join
        );
        assert_eq!(
            parse_operation("CutFeatureOperation").unwrap(),
            ExtrudeOperation::Cut
        );
        assert_eq!(
            parse_operation("IntersectFeatureOperation").unwrap(),
            ExtrudeOperation::Intersect
        );
        assert!(matches!(
            parse_operation("RevolveFeatureOperation"),
            Err(ReconstructError::ExtrudeOperationInvalid(_))
        ));
    }

    #[test]
    fn offset_start_definitions_shift_the_start_plane() {
        let mut data = extrude(
            "OneSideFeatureExtentType",
            Some(extent(1.0, None, false)),
            None,
        );
        data.start_extent = Some(StartExtentData::OffsetStartDefinition {
            offset: ValueData { value: 0.5 },
        });
        assert_eq!(translate_extrude(&data).unwrap().start_offset, 0.5);

        data.start_extent = Some(StartExtentData::ProfilePlaneStartDefinition);
        assert_eq!(translate_extrude(&data).unwrap().start_offset, 0.0);

        data.start_extent = Some(StartExtentData::Unsupported);
        assert_eq!(translate_extrude(&data).unwrap().start_offset, 0.0);
    }

    fn point_map(entries: &[(&str, f64, f64)]) -> BTreeMap<EntityId, PointData> {
        entries
            .iter()
            .map(|(seed, x, y)| {
                (
                    EntityId::new_deterministic(seed),
                    PointData {
                        x: *x,
                        y: *y,
                        z: 0.0,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn curve_requests_are_corrected_into_the_live_frame() {
        let correction = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        let points = point_map(&[("start", 0.0, 0.0), ("end", 1.0, 2.0)]);
        let kind = CurveKind::SketchLine {
            start_point: EntityId::new_deterministic("start"),
            end_point: EntityId::new_deterministic("end"),
        };

        let request =
            build_curve_request(&EntityId::new_deterministic("line"), &kind, &points, &correction)
                .unwrap();
        assert_eq!(
            request,
            CurveRequest::Line {
                start: Point3::new(10.0, 0.0, 0.0),
                end: Point3::new(11.0, 2.0, 0.0),
            }
        );
    }

    #[test]
    fn arc_sweep_is_the_captured_angle_difference() {
        let points = point_map(&[("center", 0.0, 0.0), ("start", 1.0, 0.0)]);
        let kind = CurveKind::SketchArc {
            center_point: EntityId::new_deterministic("center"),
            start_point: EntityId::new_deterministic("start"),
            start_angle: 0.5,
            end_angle: 2.0,
        };

        let request = build_curve_request(
            &EntityId::new_deterministic("arc"),
            &kind,
            &points,
            &Matrix4::identity(),
        )
        .unwrap();
        match request {
            CurveRequest::Arc { sweep, .. } => assert!((sweep - 1.5).abs() < 1e-12),
            other => panic!("expected an arc, got {:?}", other),
        }
    }

    #[test]
    fn spline_weights_are_dropped_for_non_rational_curves() {
        let kind = CurveKind::SketchFittedSpline {
            control_points: vec![
                PointData {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                },
                PointData {
                    x: 1.0,
                    y: 1.0,
                    z: 0.0,
                },
            ],
            degree: 1,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            weights: Some(vec![1.0, 2.0]),
            rational: false,
            periodic: false,
        };

        let request = build_curve_request(
            &EntityId::new_deterministic("spline"),
            &kind,
            &BTreeMap::new(),
            &Matrix4::identity(),
        )
        .unwrap();
        match request {
            CurveRequest::FittedSpline(curve) => {
                assert!(curve.weights.is_none());
                assert_eq!(curve.control_points.len(), 2);
            }
            other => panic!("expected a spline, got {:?}", other),
        }
    }

    #[test]
    fn unsupported_curves_and_dangling_points_are_reported() {
        let unsupported = build_curve_request(
            &EntityId::new_deterministic("curve"),
            &CurveKind::Unsupported,
            &BTreeMap::new(),
            &Matrix4::identity(),
        );
        assert!(matches!(
            unsupported,
            Err(ReconstructError::UnsupportedCurveType(_))
        ));

        let kind = CurveKind::SketchCircle {
            center_point: EntityId::new_deterministic("nowhere"),
            radius: 1.0,
        };
        let dangling = build_curve_request(
            &EntityId::new_deterministic("circle"),
            &kind,
            &BTreeMap::new(),
            &Matrix4::identity(),
        );
        match dangling {
            Err(ReconstructError::InvalidState(message)) => {
                assert!(message.contains("missing point"));
            }
            other => panic!("expected an invalid state error, got {:?}", other),
        }
    }
}
