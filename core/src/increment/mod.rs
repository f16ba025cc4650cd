//! Incremental construction: building a design call by call instead of
//! replaying a snapshot.
//!
//! An [`IncrementalSession`] lets a caller grow sketches point by point.
//! Each sketch carries a cursor over its sequential points: the first
//! `add_point` only primes the cursor, every later point draws a line from
//! the previous one, and `close_profile` joins the last point back to the
//! first. Responses carry the sketch's current profile set after every
//! change, addressed by ids the session assigns and keeps stable, so the
//! caller can pick a region and extrude it.
//!
//! State per sketch is nothing but cursor bookkeeping plus the identity
//! side-tables also used by replay; the geometry itself lives in the
//! engine.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{
    CalculationAccuracy, CurveHandle, CurveRequest, ExtrudeExtent, ExtrudeOperation, ExtrudeSpec,
    FeatureHandle, GeometryEngine, ProfileHandle, SideExtent, SketchHandle, SketchSurface,
    SurfaceKind,
};
use crate::geometry::{frame_correction, Point3};
use crate::replay::{ReconstructError, ReplayResult};
use crate::snapshot::{
    EntityId, LoopData, PointData, ProfileCurveData, ProfileData, ProfileProperties, TransformData,
};

/// How the caller names the plane for a new sketch: a construction plane
/// by name, or a planar body face by a point lying on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaneRef {
    Named(String),
    PointOnFace(PointData),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchResponse {
    pub sketch_id: EntityId,
    pub sketch_name: String,
}

/// Returned by every geometry-changing sketch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveResponse {
    pub sketch_id: EntityId,
    pub sketch_name: String,
    /// Absent when the call created no curve (the first point of a sketch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_id: Option<EntityId>,
    /// The sketch's full profile set after the change.
    pub profiles: BTreeMap<EntityId, ProfileData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrudeResponse {
    pub feature: FeatureHandle,
    /// The operation actually applied; differs from the requested one when
    /// the empty design forces `NewBody`.
    pub operation: ExtrudeOperation,
    pub profile: EntityId,
    pub distance: f64,
}

/// Cursor over the sequential points of one sketch.
///
/// Holds the caller's raw coordinates. A capture transform only affects
/// the line handed to the engine, so the closing line later drawn from
/// these points matches the untransformed ones the caller sent.
#[derive(Debug, Clone, Default)]
struct SketchCursor {
    first_pt: Option<Point3>,
    last_pt: Option<Point3>,
    pt_count: u32,
}

/// Per-sketch identity state: the engine handle, the id the session
/// announced for the sketch, and the curve/profile side-tables.
struct SketchEntry {
    handle: SketchHandle,
    id: EntityId,
    curve_tags: HashMap<CurveHandle, EntityId>,
    profile_ids: HashMap<ProfileHandle, EntityId>,
}

/// Builds up a design through a borrowed engine, one call at a time.
pub struct IncrementalSession<'a, E: GeometryEngine> {
    engine: &'a mut E,
    sketches: HashMap<String, SketchEntry>,
    cursors: HashMap<String, SketchCursor>,
}

impl<'a, E: GeometryEngine> IncrementalSession<'a, E> {
    pub fn new(engine: &'a mut E) -> Self {
        Self {
            engine,
            sketches: HashMap::new(),
            cursors: HashMap::new(),
        }
    }

    /// Forget every sketch and cursor. For starting over after the caller
    /// has reset the engine document; the session does not touch the
    /// engine itself.
    pub fn clear(&mut self) {
        self.sketches.clear();
        self.cursors.clear();
    }

    /// Create an empty sketch on the given plane. Unlike replay there is
    /// no XY fallback here; a plane that cannot be resolved is an error.
    pub fn add_sketch(&mut self, plane: &PlaneRef) -> ReplayResult<SketchResponse> {
        let surface = match plane {
            PlaneRef::Named(name) => {
                let found = self
                    .engine
                    .find_construction_plane(name)?
                    .ok_or_else(|| ReconstructError::SketchPlaneNotFound(name.clone()))?;
                SketchSurface::Plane(found)
            }
            PlaneRef::PointOnFace(point) => {
                match self.engine.face_at_point(&point.to_point())? {
                    Some(face) if face.surface == SurfaceKind::Plane => {
                        SketchSurface::Face(face.handle)
                    }
                    _ => {
                        return Err(ReconstructError::SketchPlaneNotFound(format!(
                            "no planar face at ({}, {}, {})",
                            point.x, point.y, point.z
                        )))
                    }
                }
            }
        };

        let handle = self.engine.create_sketch(surface)?;
        let sketch_name = self.engine.sketch_name(handle)?;
        let sketch_id = EntityId::new();
        self.sketches.insert(
            sketch_name.clone(),
            SketchEntry {
                handle,
                id: sketch_id,
                curve_tags: HashMap::new(),
                profile_ids: HashMap::new(),
            },
        );
        debug!("added sketch {} as {}", sketch_name, sketch_id);
        Ok(SketchResponse {
            sketch_id,
            sketch_name,
        })
    }

    /// Append a sequential point. The first point of a sketch only primes
    /// the cursor and creates nothing; each later point draws a line from
    /// the previous point to this one.
    pub fn add_point(
        &mut self,
        sketch_name: &str,
        point: &PointData,
        transform: Option<&TransformData>,
    ) -> ReplayResult<CurveResponse> {
        if !self.sketches.contains_key(sketch_name) {
            return Err(unknown_sketch(sketch_name));
        }
        let raw = point.to_point();

        let previous = match self.cursors.get(sketch_name) {
            Some(cursor) => match cursor.last_pt {
                Some(last) => last,
                None => {
                    return Err(ReconstructError::InvalidState(
                        "sketch cursor has no endpoint".to_string(),
                    ))
                }
            },
            None => {
                self.cursors.insert(
                    sketch_name.to_string(),
                    SketchCursor {
                        first_pt: Some(raw),
                        last_pt: Some(raw),
                        pt_count: 0,
                    },
                );
                let entry = self
                    .sketches
                    .get_mut(sketch_name)
                    .ok_or_else(|| unknown_sketch(sketch_name))?;
                let profiles = Self::report_profiles(self.engine, entry)?;
                return Ok(CurveResponse {
                    sketch_id: entry.id,
                    sketch_name: sketch_name.to_string(),
                    curve_id: None,
                    profiles,
                });
            }
        };

        self.create_line(sketch_name, previous, raw, transform)
    }

    /// Draw a line between explicit endpoints, bypassing the cursor for
    /// the start point. The end point still becomes the cursor position;
    /// on a sketch with no cursor yet, the cursor is created from the two
    /// endpoints with a point count of zero.
    pub fn add_line(
        &mut self,
        sketch_name: &str,
        start: &PointData,
        end: &PointData,
        transform: Option<&TransformData>,
    ) -> ReplayResult<CurveResponse> {
        if !self.sketches.contains_key(sketch_name) {
            return Err(unknown_sketch(sketch_name));
        }
        self.create_line(sketch_name, start.to_point(), end.to_point(), transform)
    }

    /// Join the last sequential point back to the first. Needs at least
    /// four counted points (two drawn lines); a triangle is the smallest
    /// closable shape.
    pub fn close_profile(&mut self, sketch_name: &str) -> ReplayResult<CurveResponse> {
        if !self.sketches.contains_key(sketch_name) {
            return Err(unknown_sketch(sketch_name));
        }
        let cursor = self.cursors.get(sketch_name).ok_or_else(|| {
            ReconstructError::InvalidState(format!("sketch {:?} has no cursor", sketch_name))
        })?;
        if cursor.pt_count < 4 {
            return Err(ReconstructError::InsufficientGeometry);
        }
        let (last, first) = match (cursor.last_pt, cursor.first_pt) {
            (Some(last), Some(first)) => (last, first),
            _ => {
                return Err(ReconstructError::InvalidState(
                    "sketch cursor endpoints are missing".to_string(),
                ))
            }
        };
        self.create_line(sketch_name, last, first, None)
    }

    /// Extrude one profile of a sketch with a one-sided positive extent.
    /// The profile id must resolve against a fresh enumeration; a region
    /// that no longer exists fails with `ProfileNotFound`. On a design
    /// with no bodies the operation is forced to `NewBody`.
    pub fn add_extrude(
        &mut self,
        sketch_name: &str,
        profile: EntityId,
        distance: f64,
        operation: ExtrudeOperation,
    ) -> ReplayResult<ExtrudeResponse> {
        let entry = self
            .sketches
            .get_mut(sketch_name)
            .ok_or_else(|| unknown_sketch(sketch_name))?;

        let enumerated = self.engine.enumerate_profiles(entry.handle)?;
        let handle = enumerated
            .iter()
            .map(|region| region.handle)
            .find(|handle| entry.profile_ids.get(handle) == Some(&profile))
            .ok_or(ReconstructError::ProfileNotFound(profile))?;

        let mut applied = operation;
        if self.engine.body_count()? == 0 {
            applied = ExtrudeOperation::NewBody;
        }

        let spec = ExtrudeSpec {
            operation: applied,
            extent: ExtrudeExtent::OneSide(SideExtent::straight(distance)),
            start_offset: 0.0,
        };
        let feature = self.engine.create_extrude(&[handle], &spec)?;
        debug!(
            "extruded profile {} of {} by {} ({:?})",
            profile, sketch_name, distance, applied
        );
        Ok(ExtrudeResponse {
            feature,
            operation: applied,
            profile,
            distance,
        })
    }

    /// Shared line creation path behind `add_point`, `add_line` and
    /// `close_profile`: applies the optional capture transform, draws the
    /// line, tags it, advances the cursor with the raw endpoints and
    /// reports the resulting profile set.
    fn create_line(
        &mut self,
        sketch_name: &str,
        start: Point3,
        end: Point3,
        transform: Option<&TransformData>,
    ) -> ReplayResult<CurveResponse> {
        let entry = self
            .sketches
            .get_mut(sketch_name)
            .ok_or_else(|| unknown_sketch(sketch_name))?;

        let (mut line_start, mut line_end) = (start, end);
        if let Some(capture) = transform {
            // Coordinates captured in another frame are corrected into
            // this sketch's live frame, the same algebra replay uses.
            let import_transform = self.engine.sketch_transform(entry.handle)?;
            let correction = frame_correction(&import_transform, &capture.to_matrix())?;
            line_start = correction.transform_point(&line_start);
            line_end = correction.transform_point(&line_end);
        }

        let curve = self.engine.add_curve(
            entry.handle,
            &CurveRequest::Line {
                start: line_start,
                end: line_end,
            },
        )?;
        let curve_id = EntityId::new();
        entry.curve_tags.insert(curve, curve_id);

        let profiles = Self::report_profiles(self.engine, entry)?;

        match self.cursors.get_mut(sketch_name) {
            Some(cursor) => {
                cursor.last_pt = Some(end);
                cursor.pt_count += 2;
            }
            None => {
                self.cursors.insert(
                    sketch_name.to_string(),
                    SketchCursor {
                        first_pt: Some(start),
                        last_pt: Some(end),
                        pt_count: 0,
                    },
                );
            }
        }

        Ok(CurveResponse {
            sketch_id: entry.id,
            sketch_name: sketch_name.to_string(),
            curve_id: Some(curve_id),
            profiles,
        })
    }

    /// Enumerate the sketch's regions and describe them in wire shape.
    /// Regions keep the id they were first reported under; unseen regions
    /// get a fresh one. The first reported loop is taken as the outer
    /// loop.
    fn report_profiles(
        engine: &mut E,
        entry: &mut SketchEntry,
    ) -> ReplayResult<BTreeMap<EntityId, ProfileData>> {
        let enumerated = engine.enumerate_profiles(entry.handle)?;
        let mut profiles = BTreeMap::new();
        for region in enumerated {
            let id = *entry
                .profile_ids
                .entry(region.handle)
                .or_insert_with(EntityId::new);
            let measured = engine.profile_properties(region.handle, CalculationAccuracy::High)?;
            let loops = region
                .loops
                .iter()
                .enumerate()
                .map(|(index, region_loop)| LoopData {
                    is_outer: index == 0,
                    profile_curves: region_loop
                        .curves
                        .iter()
                        .filter_map(|handle| {
                            entry
                                .curve_tags
                                .get(handle)
                                .map(|&curve| ProfileCurveData { curve })
                        })
                        .collect(),
                })
                .collect();
            profiles.insert(
                id,
                ProfileData {
                    loops,
                    properties: ProfileProperties {
                        area: measured.area,
                        perimeter: measured.perimeter,
                        centroid: measured.centroid.into(),
                    },
                },
            );
        }
        Ok(profiles)
    }
}

fn unknown_sketch(sketch_name: &str) -> ReconstructError {
    ReconstructError::InvalidState(format!("sketch {:?} not found", sketch_name))
}
