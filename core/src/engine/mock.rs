//! MockEngine, a deterministic in-memory stand-in for the external engine.
//!
//! Profile derivation is the one piece of engine behavior this crate cannot
//! reproduce, so tests script it: each scripted profile names the insertion
//! indices of the curves bounding it, and becomes visible once all of those
//! curves exist in the sketch. Everything else (planes, sketches, curves,
//! extrusions) is tracked for later inspection by assertions.

use std::collections::{HashMap, VecDeque};

use crate::geometry::{ApproxEq, Matrix4, Point3};

use super::types::*;
use super::{EngineError, EngineResult, GeometryEngine};

/// A profile the mock should report for a sketch, expressed against curve
/// insertion order so it can be declared before the curves exist.
#[derive(Debug, Clone)]
pub struct ScriptedProfile {
    /// Loops as lists of curve insertion indices (0 = first inserted curve).
    pub loops: Vec<Vec<usize>>,
    pub properties: AreaProperties,
}

impl ScriptedProfile {
    /// Single-loop profile, the common case in tests.
    pub fn with_loop(curves: Vec<usize>, properties: AreaProperties) -> Self {
        Self {
            loops: vec![curves],
            properties,
        }
    }
}

/// One extrusion exactly as it was requested, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedExtrude {
    pub feature: FeatureHandle,
    pub profiles: Vec<ProfileHandle>,
    pub spec: ExtrudeSpec,
}

#[derive(Debug)]
struct MockSketch {
    name: String,
    transform: Matrix4,
    curves: Vec<(CurveHandle, CurveRequest)>,
    scripted: Vec<ScriptedProfile>,
    /// Lazily assigned, one slot per scripted profile, stable across
    /// repeated enumerations.
    profile_handles: Vec<Option<ProfileHandle>>,
    deferred_log: Vec<bool>,
}

/// Deterministic test double for the geometry engine.
pub struct MockEngine {
    next_handle: u64,
    planes: HashMap<String, PlaneHandle>,
    plane_transforms: HashMap<PlaneHandle, Matrix4>,
    xy: PlaneHandle,
    faces: Vec<(Point3, FaceInfo)>,
    sketches: HashMap<SketchHandle, MockSketch>,
    sketch_count: usize,
    pending_scripts: VecDeque<Vec<ScriptedProfile>>,
    profile_owner: HashMap<ProfileHandle, (SketchHandle, usize)>,
    offset_planes: Vec<(ProfileHandle, f64, PlaneHandle)>,
    extrudes: Vec<RecordedExtrude>,
    bodies: usize,
}

impl MockEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            next_handle: 1,
            planes: HashMap::new(),
            plane_transforms: HashMap::new(),
            xy: PlaneHandle(0),
            faces: Vec::new(),
            sketches: HashMap::new(),
            sketch_count: 0,
            pending_scripts: VecDeque::new(),
            profile_owner: HashMap::new(),
            offset_planes: Vec::new(),
            extrudes: Vec::new(),
            bodies: 0,
        };
        engine.xy = engine.add_construction_plane("XY");
        engine.add_construction_plane("XZ");
        engine.add_construction_plane("YZ");
        engine
    }

    fn alloc(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Register a named construction plane with an identity transform.
    pub fn add_construction_plane(&mut self, name: &str) -> PlaneHandle {
        let plane = PlaneHandle(self.alloc());
        self.planes.insert(name.to_string(), plane);
        self.plane_transforms.insert(plane, Matrix4::identity());
        plane
    }

    /// Override the sketch-to-world transform sketches created on this plane
    /// will receive.
    pub fn set_plane_transform(&mut self, plane: PlaneHandle, transform: Matrix4) {
        self.plane_transforms.insert(plane, transform);
    }

    /// Register a body face that `face_at_point` will find at `point`.
    pub fn seed_face(&mut self, point: Point3, surface: SurfaceKind) -> FaceHandle {
        let handle = FaceHandle(self.alloc());
        self.faces.push((point, FaceInfo { handle, surface }));
        handle
    }

    /// Queue the scripted profiles for the next sketch to be created.
    /// Queued sets are consumed in creation order.
    pub fn script_next_sketch(&mut self, profiles: Vec<ScriptedProfile>) {
        self.pending_scripts.push_back(profiles);
    }

    /// Look up a sketch handle by its engine-assigned name.
    pub fn sketch_named(&self, name: &str) -> Option<SketchHandle> {
        self.sketches
            .iter()
            .find(|(_, sk)| sk.name == name)
            .map(|(handle, _)| *handle)
    }

    /// Curves inserted into a sketch, in insertion order.
    pub fn curve_requests(&self, sketch: SketchHandle) -> &[(CurveHandle, CurveRequest)] {
        &self.sketches[&sketch].curves
    }

    /// Every deferred-recompute toggle the sketch received, in call order.
    pub fn deferred_log(&self, sketch: SketchHandle) -> &[bool] {
        &self.sketches[&sketch].deferred_log
    }

    pub fn extrudes(&self) -> &[RecordedExtrude] {
        &self.extrudes
    }

    pub fn offset_planes(&self) -> &[(ProfileHandle, f64, PlaneHandle)] {
        &self.offset_planes
    }

    fn sketch(&self, sketch: SketchHandle) -> EngineResult<&MockSketch> {
        self.sketches
            .get(&sketch)
            .ok_or_else(|| EngineError::UnknownHandle(format!("{:?}", sketch)))
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryEngine for MockEngine {
    fn find_construction_plane(&self, name: &str) -> EngineResult<Option<PlaneHandle>> {
        Ok(self.planes.get(name).copied())
    }

    fn xy_construction_plane(&self) -> PlaneHandle {
        self.xy
    }

    fn face_at_point(&self, point: &Point3) -> EngineResult<Option<FaceInfo>> {
        Ok(self
            .faces
            .iter()
            .find(|(seeded, _)| seeded.approx_eq(point))
            .map(|(_, info)| *info))
    }

    fn create_offset_plane(
        &mut self,
        profile: ProfileHandle,
        offset: f64,
    ) -> EngineResult<PlaneHandle> {
        if !self.profile_owner.contains_key(&profile) {
            return Err(EngineError::UnknownHandle(format!("{:?}", profile)));
        }
        let plane = PlaneHandle(self.alloc());
        self.plane_transforms.insert(plane, Matrix4::identity());
        self.offset_planes.push((profile, offset, plane));
        Ok(plane)
    }

    fn create_sketch(&mut self, surface: SketchSurface) -> EngineResult<SketchHandle> {
        let transform = match surface {
            SketchSurface::Plane(plane) => *self
                .plane_transforms
                .get(&plane)
                .ok_or_else(|| EngineError::UnknownHandle(format!("{:?}", plane)))?,
            SketchSurface::Face(face) => {
                if !self.faces.iter().any(|(_, info)| info.handle == face) {
                    return Err(EngineError::UnknownHandle(format!("{:?}", face)));
                }
                Matrix4::identity()
            }
        };
        let handle = SketchHandle(self.alloc());
        self.sketch_count += 1;
        let scripted = self.pending_scripts.pop_front().unwrap_or_default();
        self.sketches.insert(
            handle,
            MockSketch {
                name: format!("Sketch{}", self.sketch_count),
                transform,
                curves: Vec::new(),
                profile_handles: vec![None; scripted.len()],
                scripted,
                deferred_log: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn sketch_name(&self, sketch: SketchHandle) -> EngineResult<String> {
        Ok(self.sketch(sketch)?.name.clone())
    }

    fn sketch_transform(&self, sketch: SketchHandle) -> EngineResult<Matrix4> {
        Ok(self.sketch(sketch)?.transform)
    }

    fn set_deferred_recompute(&mut self, sketch: SketchHandle, deferred: bool) -> EngineResult<()> {
        self.sketches
            .get_mut(&sketch)
            .ok_or_else(|| EngineError::UnknownHandle(format!("{:?}", sketch)))?
            .deferred_log
            .push(deferred);
        Ok(())
    }

    fn add_curve(
        &mut self,
        sketch: SketchHandle,
        curve: &CurveRequest,
    ) -> EngineResult<CurveHandle> {
        let handle = CurveHandle(self.alloc());
        let sk = self
            .sketches
            .get_mut(&sketch)
            .ok_or_else(|| EngineError::UnknownHandle(format!("{:?}", sketch)))?;
        sk.curves.push((handle, curve.clone()));
        Ok(handle)
    }

    fn enumerate_profiles(&mut self, sketch: SketchHandle) -> EngineResult<Vec<EngineProfile>> {
        let Self {
            next_handle,
            sketches,
            profile_owner,
            ..
        } = self;
        let sk = sketches
            .get_mut(&sketch)
            .ok_or_else(|| EngineError::UnknownHandle(format!("{:?}", sketch)))?;

        let mut profiles = Vec::new();
        for (index, scripted) in sk.scripted.iter().enumerate() {
            let visible = scripted
                .loops
                .iter()
                .flatten()
                .all(|&curve_index| curve_index < sk.curves.len());
            if !visible {
                continue;
            }
            let handle = *sk.profile_handles[index].get_or_insert_with(|| {
                let handle = ProfileHandle(*next_handle);
                *next_handle += 1;
                profile_owner.insert(handle, (sketch, index));
                handle
            });
            let loops = scripted
                .loops
                .iter()
                .map(|loop_indices| EngineLoop {
                    curves: loop_indices.iter().map(|&i| sk.curves[i].0).collect(),
                })
                .collect();
            profiles.push(EngineProfile { handle, loops });
        }
        Ok(profiles)
    }

    fn profile_properties(
        &self,
        profile: ProfileHandle,
        _accuracy: CalculationAccuracy,
    ) -> EngineResult<AreaProperties> {
        let (sketch, index) = self
            .profile_owner
            .get(&profile)
            .ok_or_else(|| EngineError::UnknownHandle(format!("{:?}", profile)))?;
        Ok(self.sketch(*sketch)?.scripted[*index].properties)
    }

    fn create_extrude(
        &mut self,
        profiles: &[ProfileHandle],
        spec: &ExtrudeSpec,
    ) -> EngineResult<FeatureHandle> {
        if profiles.is_empty() {
            return Err(EngineError::InvalidGeometry(
                "extrude requires at least one profile".to_string(),
            ));
        }
        for profile in profiles {
            if !self.profile_owner.contains_key(profile) {
                return Err(EngineError::UnknownHandle(format!("{:?}", profile)));
            }
        }
        let feature = FeatureHandle(self.alloc());
        self.extrudes.push(RecordedExtrude {
            feature,
            profiles: profiles.to_vec(),
            spec: *spec,
        });
        if spec.operation == ExtrudeOperation::NewBody {
            self.bodies += 1;
        }
        Ok(feature)
    }

    fn body_count(&self) -> EngineResult<usize> {
        Ok(self.bodies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(area: f64) -> AreaProperties {
        AreaProperties {
            area,
            perimeter: 4.0 * area.sqrt(),
            centroid: Point3::new(0.0, 0.0, 0.0),
        }
    }

    fn line(x0: f64, x1: f64) -> CurveRequest {
        CurveRequest::Line {
            start: Point3::new(x0, 0.0, 0.0),
            end: Point3::new(x1, 0.0, 0.0),
        }
    }

    #[test]
    fn scripted_profile_appears_once_all_curves_exist() {
        let mut engine = MockEngine::new();
        engine.script_next_sketch(vec![ScriptedProfile::with_loop(vec![0, 1], props(1.0))]);

        let plane = engine.find_construction_plane("XY").unwrap().unwrap();
        let sketch = engine.create_sketch(SketchSurface::Plane(plane)).unwrap();

        engine.add_curve(sketch, &line(0.0, 1.0)).unwrap();
        assert!(engine.enumerate_profiles(sketch).unwrap().is_empty());

        engine.add_curve(sketch, &line(1.0, 2.0)).unwrap();
        let profiles = engine.enumerate_profiles(sketch).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].loops[0].curves.len(), 2);
    }

    #[test]
    fn profile_handles_are_stable_across_enumerations() {
        let mut engine = MockEngine::new();
        engine.script_next_sketch(vec![ScriptedProfile::with_loop(vec![0], props(1.0))]);
        let sketch = engine
            .create_sketch(SketchSurface::Plane(engine.xy_construction_plane()))
            .unwrap();
        engine.add_curve(sketch, &line(0.0, 1.0)).unwrap();

        let first = engine.enumerate_profiles(sketch).unwrap()[0].handle;
        let second = engine.enumerate_profiles(sketch).unwrap()[0].handle;
        assert_eq!(first, second);

        let measured = engine
            .profile_properties(first, CalculationAccuracy::High)
            .unwrap();
        assert_eq!(measured.area, 1.0);
    }

    #[test]
    fn handle_sequences_are_deterministic() {
        let run = || {
            let mut engine = MockEngine::new();
            engine.script_next_sketch(vec![ScriptedProfile::with_loop(vec![0], props(2.0))]);
            let sketch = engine
                .create_sketch(SketchSurface::Plane(engine.xy_construction_plane()))
                .unwrap();
            let curve = engine.add_curve(sketch, &line(0.0, 1.0)).unwrap();
            let profile = engine.enumerate_profiles(sketch).unwrap()[0].handle;
            (sketch, curve, profile)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn unknown_profile_handle_is_rejected() {
        let engine = MockEngine::new();
        let result = engine.profile_properties(ProfileHandle(999), CalculationAccuracy::High);
        assert!(matches!(result, Err(EngineError::UnknownHandle(_))));
    }

    #[test]
    fn only_new_body_extrudes_add_bodies() {
        let mut engine = MockEngine::new();
        engine.script_next_sketch(vec![ScriptedProfile::with_loop(vec![0], props(1.0))]);
        let sketch = engine
            .create_sketch(SketchSurface::Plane(engine.xy_construction_plane()))
            .unwrap();
        engine.add_curve(sketch, &line(0.0, 1.0)).unwrap();
        let profile = engine.enumerate_profiles(sketch).unwrap()[0].handle;

        let spec = ExtrudeSpec {
            operation: ExtrudeOperation::NewBody,
            extent: ExtrudeExtent::OneSide(SideExtent::straight(1.0)),
            start_offset: 0.0,
        };
        engine.create_extrude(&[profile], &spec).unwrap();
        assert_eq!(engine.body_count().unwrap(), 1);

        let join = ExtrudeSpec {
            operation: ExtrudeOperation::Join,
            ..spec
        };
        engine.create_extrude(&[profile], &join).unwrap();
        assert_eq!(engine.body_count().unwrap(), 1);
        assert_eq!(engine.extrudes().len(), 2);
    }

    #[test]
    fn face_lookup_matches_seeded_points_approximately() {
        let mut engine = MockEngine::new();
        let seeded = engine.seed_face(Point3::new(1.0, 2.0, 3.0), SurfaceKind::Plane);

        let hit = engine
            .face_at_point(&Point3::new(1.0, 2.0, 3.0 + 1e-9))
            .unwrap()
            .expect("seeded face should be found");
        assert_eq!(hit.handle, seeded);
        assert_eq!(hit.surface, SurfaceKind::Plane);

        let miss = engine.face_at_point(&Point3::new(9.0, 9.0, 9.0)).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn deferred_toggles_are_recorded_in_order() {
        let mut engine = MockEngine::new();
        let sketch = engine
            .create_sketch(SketchSurface::Plane(engine.xy_construction_plane()))
            .unwrap();
        engine.set_deferred_recompute(sketch, true).unwrap();
        engine.add_curve(sketch, &line(0.0, 1.0)).unwrap();
        engine.set_deferred_recompute(sketch, false).unwrap();
        assert_eq!(engine.deferred_log(sketch), &[true, false]);
    }
}
