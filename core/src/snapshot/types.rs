//! Serialized design snapshot as captured at extraction time.
//!
//! The format is JSON: a flat `entities` map keyed by uuid plus a `timeline`
//! listing the order in which entities were created. Sketch geometry is
//! stored fully expanded (points, curves, profiles) so a replay can redraw
//! the curves and re-identify the profiles the engine generates from them.
//!
//! Unknown vocabulary is kept non-fatal on purpose: unrecognised entity,
//! curve, reference-plane and start-extent types parse into `Unsupported`
//! variants and are dealt with entry by entry at replay time instead of
//! failing the whole snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::EntityId;
use crate::geometry::{Matrix4, Point3};

/// A complete captured design: every entity that appeared in the timeline,
/// keyed by uuid, plus the timeline ordering itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignSnapshot {
    #[serde(default)]
    pub entities: BTreeMap<EntityId, Entity>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

impl DesignSnapshot {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One timeline slot: which entity was created at which position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub entity: EntityId,
    pub index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    Sketch(SketchData),
    ExtrudeFeature(ExtrudeData),
    #[serde(other)]
    Unsupported,
}

impl Entity {
    pub fn name(&self) -> Option<&str> {
        match self {
            Entity::Sketch(sketch) => Some(&sketch.name),
            Entity::ExtrudeFeature(extrude) => Some(&extrude.name),
            Entity::Unsupported => None,
        }
    }
}

/// A captured sketch. The three geometry sections are optional: extraction
/// writes none of them for a sketch the user left empty, and replay skips
/// such sketches entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchData {
    pub name: String,
    #[serde(default)]
    pub transform: Option<TransformData>,
    #[serde(default)]
    pub reference_plane: Option<ReferencePlaneData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<BTreeMap<EntityId, PointData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curves: Option<BTreeMap<EntityId, CurveData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<BTreeMap<EntityId, ProfileData>>,
}

impl SketchData {
    /// A sketch only takes part in replay when all three geometry sections
    /// were captured.
    pub fn has_geometry(&self) -> bool {
        self.points.is_some() && self.curves.is_some() && self.profiles.is_some()
    }
}

/// Shared shape for serialized points and axis vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointData {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PointData {
    pub fn to_point(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

impl From<Point3> for PointData {
    fn from(p: Point3) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

/// A captured coordinate frame: origin plus three axis vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    pub origin: PointData,
    pub x_axis: PointData,
    pub y_axis: PointData,
    pub z_axis: PointData,
}

impl TransformData {
    /// Homogeneous matrix with the axes as columns, so multiplying maps
    /// local coordinates into the captured frame.
    pub fn to_matrix(&self) -> Matrix4 {
        #[rustfmt::skip]
        let m = Matrix4::new(
            self.x_axis.x, self.y_axis.x, self.z_axis.x, self.origin.x,
            self.x_axis.y, self.y_axis.y, self.z_axis.y, self.origin.y,
            self.x_axis.z, self.y_axis.z, self.z_axis.z, self.origin.z,
            0.0,           0.0,           0.0,           1.0,
        );
        m
    }
}

/// The plane a sketch was created on, in one of the reference styles the
/// capture format supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReferencePlaneData {
    /// A named construction plane, e.g. "XY".
    ConstructionPlane {
        #[serde(default)]
        name: Option<String>,
    },
    /// A planar body face, located by a point known to lie on it.
    BRepFace {
        #[serde(default)]
        point_on_face: Option<PointData>,
    },
    /// A previously reconstructed profile.
    Profile {
        #[serde(default)]
        profile: Option<EntityId>,
    },
    #[serde(other)]
    Unsupported,
}

/// A sketch curve: the construction flag plus the per-type payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveData {
    #[serde(default)]
    pub construction_geom: bool,
    #[serde(flatten)]
    pub kind: CurveKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CurveKind {
    /// Endpoints reference the sketch point table.
    SketchLine {
        start_point: EntityId,
        end_point: EntityId,
    },
    /// Angles are radians; the replayed sweep is `end_angle - start_angle`.
    SketchArc {
        center_point: EntityId,
        start_point: EntityId,
        start_angle: f64,
        end_angle: f64,
    },
    SketchCircle {
        center_point: EntityId,
        radius: f64,
    },
    /// Control points are stored inline rather than in the point table.
    SketchFittedSpline {
        control_points: Vec<PointData>,
        degree: usize,
        knots: Vec<f64>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
        #[serde(default)]
        rational: bool,
        #[serde(default)]
        periodic: bool,
    },
    #[serde(other)]
    Unsupported,
}

/// A profile region the engine derived from the sketch curves, captured with
/// enough evidence to re-identify it after replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub loops: Vec<LoopData>,
    pub properties: ProfileProperties,
}

impl ProfileData {
    /// The canonical curve-uuid set: deduplicated across loops and sorted,
    /// so two profiles compare equal independent of loop or curve order.
    pub fn curve_ids(&self) -> Vec<EntityId> {
        let mut ids = BTreeSet::new();
        for profile_loop in &self.loops {
            for profile_curve in &profile_loop.profile_curves {
                ids.insert(profile_curve.curve);
            }
        }
        ids.into_iter().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopData {
    #[serde(default)]
    pub is_outer: bool,
    pub profile_curves: Vec<ProfileCurveData>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfileCurveData {
    pub curve: EntityId,
}

/// Geometric identity evidence for a profile, captured at highest accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileProperties {
    pub area: f64,
    pub perimeter: f64,
    pub centroid: PointData,
}

/// A captured extrude feature. Operation and extent type are kept as raw
/// wire strings; replay parses them and treats anything unknown as an
/// invalid extrude rather than a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtrudeData {
    pub name: String,
    pub profiles: Vec<ProfileRef>,
    pub operation: String,
    pub extent_type: String,
    #[serde(default)]
    pub extent_one: Option<ExtentData>,
    #[serde(default)]
    pub extent_two: Option<ExtentData>,
    #[serde(default)]
    pub start_extent: Option<StartExtentData>,
}

/// Reference to a profile an extrude consumes, with the sketch it came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfileRef {
    pub profile: EntityId,
    #[serde(default)]
    pub sketch: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtentData {
    pub distance: ValueData,
    #[serde(default)]
    pub taper_angle: Option<ValueData>,
    #[serde(default)]
    pub is_full_length: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StartExtentData {
    /// The default: extrusion starts at the profile plane.
    ProfilePlaneStartDefinition,
    OffsetStartDefinition {
        offset: ValueData,
    },
    #[serde(other)]
    Unsupported,
}

/// Scalar parameter serialized as `{"value": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueData {
    pub value: f64,
}
