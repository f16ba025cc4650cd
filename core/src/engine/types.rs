//! Handle and payload types exchanged with the geometry engine.

use serde::{Deserialize, Serialize};

use crate::geometry::Point3;

/// Opaque reference to a construction plane owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaneHandle(pub u64);

/// Opaque reference to a body face owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceHandle(pub u64);

/// Opaque reference to a sketch owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SketchHandle(pub u64);

/// Opaque reference to a single sketch curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurveHandle(pub u64);

/// Opaque reference to a profile region derived by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileHandle(pub u64);

/// Opaque reference to a created feature (e.g. an extrusion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureHandle(pub u64);

/// Surface classification of a body face. Only planar faces can host a
/// sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Plane,
    Cylinder,
    Cone,
    Sphere,
    Torus,
    Freeform,
}

/// Where a sketch lives: a construction plane or a planar body face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SketchSurface {
    Plane(PlaneHandle),
    Face(FaceHandle),
}

/// Result of locating a face by a point known to lie on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceInfo {
    pub handle: FaceHandle,
    pub surface: SurfaceKind,
}

/// A curve to insert into a sketch, with coordinates already expressed in
/// the live sketch frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveRequest {
    Line {
        start: Point3,
        end: Point3,
    },
    /// Swept counter-clockwise from the start point for positive angles.
    Arc {
        center: Point3,
        start: Point3,
        sweep: f64,
    },
    Circle {
        center: Point3,
        radius: f64,
    },
    FittedSpline(NurbsCurve),
}

/// NURBS curve description for fitted splines. `weights` must be present
/// iff the curve is rational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NurbsCurve {
    pub control_points: Vec<Point3>,
    pub degree: usize,
    pub knots: Vec<f64>,
    pub weights: Option<Vec<f64>>,
    pub periodic: bool,
}

/// One profile region as enumerated by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProfile {
    pub handle: ProfileHandle,
    pub loops: Vec<EngineLoop>,
}

/// A closed loop of curves bounding part of a profile. The same curve can
/// appear in more than one loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLoop {
    pub curves: Vec<CurveHandle>,
}

/// Measured geometric properties of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaProperties {
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Point3,
}

/// Accuracy the engine should use when measuring profile properties.
/// Identity checks always request `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationAccuracy {
    Low,
    Medium,
    High,
}

/// How an extrusion combines with existing bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtrudeOperation {
    #[default]
    NewBody,
    Join,
    Cut,
    Intersect,
}

/// Distance and taper for one side of an extrusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideExtent {
    pub distance: f64,
    pub taper_angle: f64,
}

impl SideExtent {
    pub fn straight(distance: f64) -> Self {
        Self {
            distance,
            taper_angle: 0.0,
        }
    }
}

/// Extent of an extrusion. Symmetric extents never reach the engine; they
/// are rewritten into an equivalent `TwoSides` form beforehand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExtrudeExtent {
    OneSide(SideExtent),
    TwoSides {
        side_one: SideExtent,
        side_two: SideExtent,
    },
}

/// Fully resolved extrusion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeSpec {
    pub operation: ExtrudeOperation,
    pub extent: ExtrudeExtent,
    /// Offset of the start plane from the profile plane; zero starts at the
    /// profile plane itself.
    pub start_offset: f64,
}
