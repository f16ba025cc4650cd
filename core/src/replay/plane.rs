//! Reference-plane resolution for replayed sketches.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::{EngineResult, GeometryEngine, ProfileHandle, SketchSurface, SurfaceKind};
use crate::snapshot::{EntityId, ReferencePlaneData};

/// Resolve the surface a replayed sketch should be created on.
///
/// Resolution tries the captured reference first: a named construction
/// plane, a planar body face located by a point, or a previously
/// reconstructed profile (turned into a zero-offset construction plane).
/// Whenever a step cannot resolve, the reason is recorded and resolution
/// falls through to the world XY plane; an unresolvable reference is never
/// fatal. Engine failures, by contrast, do propagate.
pub(crate) fn resolve_reference_plane<E: GeometryEngine>(
    engine: &mut E,
    reference: Option<&ReferencePlaneData>,
    profile_map: &HashMap<EntityId, ProfileHandle>,
    diagnostics: &mut Vec<String>,
) -> EngineResult<SketchSurface> {
    match reference {
        Some(ReferencePlaneData::ConstructionPlane { name: Some(name) }) => {
            if let Some(plane) = engine.find_construction_plane(name)? {
                debug!("sketch plane (construction plane) {}", name);
                return Ok(SketchSurface::Plane(plane));
            }
            diagnostics.push(format!("construction plane {:?} not found", name));
        }
        Some(ReferencePlaneData::BRepFace {
            point_on_face: Some(point),
        }) => match engine.face_at_point(&point.to_point())? {
            Some(face) if face.surface == SurfaceKind::Plane => {
                debug!("sketch plane (face) {:?}", face.handle);
                return Ok(SketchSurface::Face(face.handle));
            }
            Some(face) => {
                diagnostics.push(format!(
                    "face at reference point has invalid surface type {:?}",
                    face.surface
                ));
            }
            None => {
                diagnostics.push("sketch plane point on face not found".to_string());
            }
        },
        Some(ReferencePlaneData::Profile {
            profile: Some(profile_id),
        }) => {
            if let Some(&profile) = profile_map.get(profile_id) {
                // The engine cannot reference a profile directly as a sketch
                // plane, so a zero-offset construction plane stands in for it.
                let plane = engine.create_offset_plane(profile, 0.0)?;
                debug!("sketch plane (profile) {}", profile_id);
                return Ok(SketchSurface::Plane(plane));
            }
            diagnostics.push(format!("profile {} has not been reconstructed", profile_id));
        }
        _ => {}
    }
    diagnostics.push("sketch plane defaulted to world XY".to_string());
    debug!("sketch plane defaulted to world XY");
    Ok(SketchSurface::Plane(engine.xy_construction_plane()))
}
