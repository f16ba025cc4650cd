//! Geometry engine abstraction layer.
//!
//! This module defines the `GeometryEngine` trait, which decouples replay and
//! incremental construction from the external engine that owns the real
//! document state. The engine is the authority on geometry: it derives
//! profile regions from inserted curves, measures their properties and
//! executes extrusions. This crate only ever talks to it through handles.
//!
//! Sessions drive an engine from a single thread, so the trait imposes no
//! `Send` or `Sync` bound on implementations.

use thiserror::Error;

use serde::{Deserialize, Serialize};

use crate::geometry::{Matrix4, Point3};

pub mod mock;
pub use mock::{MockEngine, ScriptedProfile};

pub mod types;
pub use types::*;

/// Errors reported by the engine itself.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    #[error("unknown handle: {0}")]
    UnknownHandle(String),
    #[error("invalid input geometry: {0}")]
    InvalidGeometry(String),
    #[error("engine operation failed: {0}")]
    OperationFailed(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Abstraction over the external geometry engine.
///
/// Handles returned by one method are only meaningful when passed back to
/// the same engine instance. Methods that read derived state take `&mut`
/// where the engine may recompute internally to answer.
pub trait GeometryEngine {
    /// Look up a construction plane by name, e.g. "XY" or "XZ".
    fn find_construction_plane(&self, name: &str) -> EngineResult<Option<PlaneHandle>>;

    /// The world XY construction plane. Always present, so this is the
    /// fallback surface when nothing better resolves.
    fn xy_construction_plane(&self) -> PlaneHandle;

    /// Find the body face containing the given world-space point, together
    /// with its surface classification.
    fn face_at_point(&self, point: &Point3) -> EngineResult<Option<FaceInfo>>;

    /// Create a construction plane offset from a profile's plane.
    ///
    /// # Arguments
    /// * `profile` - Profile whose plane seeds the new construction plane.
    /// * `offset` - Signed offset distance; zero coplanar with the profile.
    fn create_offset_plane(&mut self, profile: ProfileHandle, offset: f64)
        -> EngineResult<PlaneHandle>;

    /// Create an empty sketch on the given surface. No edges of the surface
    /// are projected into the sketch.
    fn create_sketch(&mut self, surface: SketchSurface) -> EngineResult<SketchHandle>;

    /// The name the engine assigned to the sketch when it was created.
    fn sketch_name(&self, sketch: SketchHandle) -> EngineResult<String>;

    /// The sketch-to-world transform the engine assigned to the sketch.
    fn sketch_transform(&self, sketch: SketchHandle) -> EngineResult<Matrix4>;

    /// Suspend or resume profile recomputation for a sketch. Insertion of a
    /// curve batch is bracketed by a suspend/resume pair.
    fn set_deferred_recompute(&mut self, sketch: SketchHandle, deferred: bool) -> EngineResult<()>;

    /// Insert one curve into a sketch. Coordinates are in the sketch frame.
    fn add_curve(&mut self, sketch: SketchHandle, curve: &CurveRequest)
        -> EngineResult<CurveHandle>;

    /// Enumerate the closed profile regions the engine currently derives
    /// from the sketch curves. Order is engine-defined but stable for an
    /// unchanged sketch.
    fn enumerate_profiles(&mut self, sketch: SketchHandle) -> EngineResult<Vec<EngineProfile>>;

    /// Measure area, perimeter and centroid of a profile. The centroid is in
    /// world coordinates.
    fn profile_properties(
        &self,
        profile: ProfileHandle,
        accuracy: CalculationAccuracy,
    ) -> EngineResult<AreaProperties>;

    /// Execute an extrusion of one or more profiles.
    fn create_extrude(
        &mut self,
        profiles: &[ProfileHandle],
        spec: &ExtrudeSpec,
    ) -> EngineResult<FeatureHandle>;

    /// Number of solid bodies currently in the document.
    fn body_count(&self) -> EngineResult<usize>;
}
