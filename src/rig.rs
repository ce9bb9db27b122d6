//! Drone rigs: an imported model and a camera under one parent.
//!
//! Both rigs share one imported asset. The hovering rig carries the active
//! camera that renders the dataset; the flying rig carries an inactive camera
//! and is moved along the planned flight.

use crate::{Orientation, Pose};
use bevy::asset::LoadState;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::render::camera::Exposure;
use std::path::Path;

/// Which of the two rigs an entity belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RigRole {
    /// Static rig with the active camera, recorded as `drone_1_pose`
    Hovering,
    /// Animated rig, recorded as `drone_2_pose`
    Flying,
}

impl RigRole {
    pub const ALL: [RigRole; 2] = [RigRole::Hovering, RigRole::Flying];

    pub fn name(&self) -> &'static str {
        match self {
            RigRole::Hovering => "Hovering Drone",
            RigRole::Flying => "Flying Drone",
        }
    }

    pub fn camera_name(&self) -> &'static str {
        match self {
            RigRole::Hovering => "Drone Camera",
            RigRole::Flying => "Flying Drone Camera",
        }
    }

    /// Only the hovering rig's camera renders
    pub fn has_active_camera(&self) -> bool {
        matches!(self, RigRole::Hovering)
    }

    fn camera_order(&self) -> isize {
        match self {
            RigRole::Hovering => 0,
            RigRole::Flying => 1,
        }
    }
}

/// Rig parent marker
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DroneRig(pub RigRole);

/// Imported model under a rig
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DroneModel(pub RigRole);

/// Camera under a rig
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RigCamera(pub RigRole);

// ============================================================================
// Configuration
// ============================================================================

/// Physical camera lens, in the units a DCC tool would use.
#[derive(Clone, Debug, PartialEq)]
pub struct LensConfig {
    /// Focal length in millimeters (default: 18)
    pub focal_length_mm: f32,
    /// Sensor size along the wider image axis in millimeters (default: 100)
    pub sensor_width_mm: f32,
    /// Near clip distance in meters (default: 0.1)
    pub clip_start: f32,
    /// Far clip distance in meters. A dataset run sets it to
    /// `frames_per_folder` (see `DatasetConfig::rig_config`).
    pub clip_end: f32,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            focal_length_mm: 18.0,
            sensor_width_mm: 100.0,
            clip_start: 0.1,
            clip_end: crate::FRAMES_PER_FOLDER as f32,
        }
    }
}

impl LensConfig {
    /// Field of view across the full sensor, in radians
    pub fn sensor_fov(&self) -> f32 {
        2.0 * (self.sensor_width_mm / (2.0 * self.focal_length_mm)).atan()
    }

    /// Vertical field of view, the quantity Bevy's perspective projection takes.
    ///
    /// The sensor spans whichever image axis is longer.
    pub fn vertical_fov(&self, aspect_ratio: f32) -> f32 {
        if aspect_ratio >= 1.0 {
            2.0 * ((self.sensor_fov() / 2.0).tan() / aspect_ratio).atan()
        } else {
            self.sensor_fov()
        }
    }

    pub fn projection(&self, aspect_ratio: f32) -> PerspectiveProjection {
        PerspectiveProjection {
            fov: self.vertical_fov(aspect_ratio),
            aspect_ratio,
            near: self.clip_start,
            far: self.clip_end,
        }
    }
}

/// Where a rig and its camera sit.
#[derive(Clone, Debug, PartialEq)]
pub struct RigPlacement {
    /// Parent pose in the world
    pub pose: Pose,
    /// Camera pose relative to the parent
    pub camera: Pose,
}

/// Construction parameters of both rigs.
#[derive(Clone, Debug)]
pub struct RigConfig {
    /// Uniform scale applied to the imported model (default: 0.001)
    pub model_scale: f32,
    pub hovering: RigPlacement,
    pub flying: RigPlacement,
    pub lens: LensConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        let camera_offset = Vec3::new(0.07, 0.1, 0.1);
        Self {
            model_scale: 0.001,
            hovering: RigPlacement {
                pose: Pose::new(
                    Vec3::new(0.0, 0.0, 3.0),
                    Orientation::from_degrees(90.0, 0.0, 0.0),
                ),
                camera: Pose::new(camera_offset, Orientation::from_degrees(-90.0, -90.0, 0.0)),
            },
            flying: RigPlacement {
                pose: Pose::new(
                    Vec3::new(0.0, 0.0, 6.0),
                    Orientation::from_degrees(90.0, 0.0, 0.0),
                ),
                camera: Pose::new(camera_offset, Orientation::from_degrees(180.0, 0.0, 0.0)),
            },
            lens: LensConfig::default(),
        }
    }
}

impl RigConfig {
    pub fn placement(&self, role: RigRole) -> &RigPlacement {
        match role {
            RigRole::Hovering => &self.hovering,
            RigRole::Flying => &self.flying,
        }
    }
}

// ============================================================================
// Asset import
// ============================================================================

/// Asset server path for the drone file. glTF files expose their first scene
/// through a label; OBJ files load as a scene directly.
pub fn asset_path_for(path: &Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    let is_gltf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gltf") || e.eq_ignore_ascii_case("glb"))
        .unwrap_or(false);
    if is_gltf {
        format!("{}#Scene0", display)
    } else {
        display
    }
}

/// Load progress of the drone asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetProgress {
    Loading,
    Loaded,
    Failed(String),
}

impl AssetProgress {
    pub fn from_load_state(state: Option<LoadState>) -> Self {
        match state {
            Some(LoadState::Loaded) => AssetProgress::Loaded,
            Some(LoadState::Failed(err)) => AssetProgress::Failed(err.to_string()),
            _ => AssetProgress::Loading,
        }
    }
}

/// Verdict on the drone import
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportStatus {
    /// Keep waiting
    Pending,
    /// Every rig holds at least this many meshes
    Ready(usize),
    /// The asset loaded but the grace period passed without any mesh
    Empty,
    Failed(String),
}

/// Decide whether the import succeeded.
///
/// `mesh_count` is the smallest mesh count found under any rig model, and
/// `frames_since_loaded` counts updates since the asset reported loaded.
pub fn import_status(
    progress: &AssetProgress,
    frames_since_loaded: u32,
    grace_frames: u32,
    mesh_count: usize,
) -> ImportStatus {
    match progress {
        AssetProgress::Failed(msg) => ImportStatus::Failed(msg.clone()),
        AssetProgress::Loading => ImportStatus::Pending,
        AssetProgress::Loaded if mesh_count > 0 => ImportStatus::Ready(mesh_count),
        AssetProgress::Loaded if frames_since_loaded >= grace_frames => ImportStatus::Empty,
        AssetProgress::Loaded => ImportStatus::Pending,
    }
}

// ============================================================================
// Spawning
// ============================================================================

/// Spawn one rig under the Z-up root: the parent, the scaled model and the
/// camera. Returns the parent entity.
pub fn spawn_rig(
    parent: &mut ChildBuilder,
    role: RigRole,
    config: &RigConfig,
    model: Handle<Scene>,
    aspect_ratio: f32,
) -> Entity {
    let placement = config.placement(role);
    parent
        .spawn((
            Name::new(role.name()),
            DroneRig(role),
            placement.pose.to_transform(),
            Visibility::default(),
        ))
        .with_children(|rig| {
            rig.spawn((
                Name::new(format!("{} Model", role.name())),
                DroneModel(role),
                SceneRoot(model),
                Transform::from_scale(Vec3::splat(config.model_scale)),
            ));
            rig.spawn((
                Name::new(role.camera_name()),
                RigCamera(role),
                Camera3d::default(),
                Camera {
                    hdr: true,
                    is_active: role.has_active_camera(),
                    order: role.camera_order(),
                    ..default()
                },
                Projection::Perspective(config.lens.projection(aspect_ratio)),
                Tonemapping::None,
                Exposure::BLENDER,
                Msaa::Off,
                placement.camera.to_transform(),
            ));
        })
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::world::CommandQueue;
    use std::f32::consts::FRAC_PI_2;
    use std::path::PathBuf;

    #[test]
    fn test_default_placements() {
        let config = RigConfig::default();
        assert_eq!(config.model_scale, 0.001);
        assert_eq!(config.hovering.pose.position, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(config.flying.pose.position, Vec3::new(0.0, 0.0, 6.0));
        assert!((config.hovering.pose.orientation.roll - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(config.hovering.camera.position, Vec3::new(0.07, 0.1, 0.1));
        assert!((config.flying.camera.orientation.roll - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(config.lens.clip_end, 1000.0);
    }

    #[test]
    fn test_lens_fov() {
        let lens = LensConfig::default();
        // 18 mm on a 100 mm sensor is about 140 degrees across
        assert!((lens.sensor_fov().to_degrees() - 140.4).abs() < 0.1);
        let aspect = 16.0 / 9.0;
        let vertical = lens.vertical_fov(aspect);
        assert!(vertical < lens.sensor_fov());
        assert!(((vertical / 2.0).tan() * aspect - (lens.sensor_fov() / 2.0).tan()).abs() < 1e-4);
    }

    #[test]
    fn test_lens_fov_portrait() {
        let lens = LensConfig::default();
        let aspect = 9.0 / 16.0;
        assert_eq!(lens.vertical_fov(aspect), lens.sensor_fov());
        let landscape = lens.vertical_fov(1.0 / aspect);
        assert!(landscape < lens.sensor_fov());
    }

    #[test]
    fn test_projection_clip() {
        let projection = LensConfig::default().projection(1.5);
        assert_eq!(projection.near, 0.1);
        assert_eq!(projection.far, 1000.0);
        assert_eq!(projection.aspect_ratio, 1.5);
    }

    #[test]
    fn test_asset_path_for() {
        assert_eq!(asset_path_for(&PathBuf::from("drone.obj")), "drone.obj");
        assert_eq!(
            asset_path_for(&PathBuf::from("models/drone.glb")),
            "models/drone.glb#Scene0"
        );
        assert_eq!(
            asset_path_for(&PathBuf::from("drone.GLTF")),
            "drone.GLTF#Scene0"
        );
    }

    #[test]
    fn test_import_status() {
        let loaded = AssetProgress::Loaded;
        assert_eq!(
            import_status(&AssetProgress::Loading, 100, 30, 0),
            ImportStatus::Pending
        );
        assert_eq!(import_status(&loaded, 0, 30, 4), ImportStatus::Ready(4));
        assert_eq!(import_status(&loaded, 10, 30, 0), ImportStatus::Pending);
        assert_eq!(import_status(&loaded, 30, 30, 0), ImportStatus::Empty);
        assert_eq!(
            import_status(&AssetProgress::Failed("bad".into()), 0, 30, 0),
            ImportStatus::Failed("bad".into())
        );
    }

    #[test]
    fn test_progress_from_load_state() {
        assert_eq!(AssetProgress::from_load_state(None), AssetProgress::Loading);
        assert_eq!(
            AssetProgress::from_load_state(Some(LoadState::Loading)),
            AssetProgress::Loading
        );
        assert_eq!(
            AssetProgress::from_load_state(Some(LoadState::Loaded)),
            AssetProgress::Loaded
        );
    }

    #[test]
    fn test_rig_transform_keeps_euler_angles() {
        let pose = Pose::new(Vec3::new(1.0, -2.0, 4.0), Orientation::new(FRAC_PI_2, 0.0, 0.7));
        let transform = pose.to_transform();
        let (yaw, pitch, roll) = transform.rotation.to_euler(EulerRot::ZYX);
        assert!((transform.translation - pose.position).length() < 1e-6);
        assert!((roll - pose.orientation.roll).abs() < 1e-4);
        assert!((yaw - pose.orientation.yaw).abs() < 1e-4);
        assert!(pitch.abs() < 1e-4);
    }

    #[test]
    fn test_spawn_rig_hierarchy() {
        let config = RigConfig::default();
        let mut world = World::new();
        let mut queue = CommandQueue::default();
        let mut commands = Commands::new(&mut queue, &world);
        let root = commands.spawn(Transform::IDENTITY).id();
        let mut rigs = Vec::new();
        commands.entity(root).with_children(|parent| {
            for role in RigRole::ALL {
                rigs.push(spawn_rig(parent, role, &config, Handle::default(), 16.0 / 9.0));
            }
        });
        queue.apply(&mut world);

        assert_eq!(world.get::<Children>(root).unwrap().len(), 2);
        for (role, rig) in RigRole::ALL.into_iter().zip(rigs) {
            assert_eq!(world.get::<DroneRig>(rig), Some(&DroneRig(role)));
            assert_eq!(world.get::<Children>(rig).unwrap().len(), 2);
            let transform = world.get::<Transform>(rig).unwrap();
            assert_eq!(transform.translation, config.placement(role).pose.position);
        }

        let mut cameras = world.query::<(&RigCamera, &Camera)>();
        let active: Vec<RigRole> = cameras
            .iter(&world)
            .filter(|(_, camera)| camera.is_active)
            .map(|(rig, _)| rig.0)
            .collect();
        assert_eq!(active, vec![RigRole::Hovering]);

        let mut models = world.query::<(&DroneModel, &Transform)>();
        for (_, transform) in models.iter(&world) {
            assert_eq!(transform.scale, Vec3::splat(0.001));
        }
    }
}
