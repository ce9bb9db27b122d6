//! Bevy orchestration of a dataset run.
//!
//! A window sized to the output resolution renders through the hovering rig's
//! camera. A chain of update systems walks every frame through the same
//! steps:
//!
//! ```text
//! Importing -> Posing -> Settling -> Capturing -> Saving -> Posing ... -> Finished
//! ```
//!
//! The scene layout and the flight are planned before the app starts, so the
//! systems only apply precomputed poses and export what the window shows.
//! Captures come back through a `Screenshot` observer; the result of the run is
//! handed out of the app through a shared slot once `AppExit` is sent.

use crate::backend::{self, BackendConfig};
use crate::batch::{FrameExporter, OutputLayout};
use crate::flight::{plan_flight, FlightTrack};
use crate::rig::{
    self, import_status, AssetProgress, DroneModel, DroneRig, ImportStatus, RigConfig, RigRole,
};
use crate::scene::{self, SceneConfig, SceneLayout};
use crate::{DatasetConfig, DatasetError, Pose, RenderConfig, RunSummary};
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use bevy::window::{PresentMode, WindowResolution};
use bevy_obj::ObjPlugin;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::f32::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const LOG_FILTER: &str = "wgpu=error,naga=warn,bevy_render=info,bevy_nlos=info";

/// Everything the systems need, fixed before the app starts.
#[derive(Resource)]
struct GenerationJob {
    asset_path: String,
    asset_display: String,
    frame_start: u32,
    frame_end: u32,
    render: RenderConfig,
    scene: SceneConfig,
    rigs: RigConfig,
    layout: SceneLayout,
    track: FlightTrack,
    exporter: FrameExporter,
    output_dir: PathBuf,
}

impl GenerationJob {
    /// Plan the scene layout and the flight for `config`.
    fn plan(config: &DatasetConfig, asset_file: &Path, rng: &mut StdRng) -> Self {
        let layout = SceneLayout::generate(&config.scene, rng);
        let track = plan_flight(
            config.rigs.flying.pose.position,
            config.frame_start..=config.frame_end,
            &config.flight,
            rng,
        );
        Self {
            asset_path: rig::asset_path_for(asset_file),
            asset_display: config.drone_asset.display().to_string(),
            frame_start: config.frame_start,
            frame_end: config.frame_end,
            render: config.render.clone(),
            scene: config.scene.clone(),
            rigs: config.rig_config(),
            layout,
            track,
            exporter: FrameExporter::new(
                config.batch_layout(),
                OutputLayout::new(&config.output_dir),
            ),
            output_dir: config.output_dir.clone(),
        }
    }

    fn hovering_pose(&self) -> Pose {
        self.rigs.hovering.pose
    }

    /// Flying rig pose at `frame`, or its resting pose without a track
    fn flying_pose(&self, frame: u32) -> Pose {
        self.track
            .pose_at(frame as f32)
            .unwrap_or(self.rigs.flying.pose)
    }

    fn next_frame(&self, frame: u32) -> Option<u32> {
        frame.checked_add(1).filter(|next| *next <= self.frame_end)
    }
}

/// Handle of the imported drone
#[derive(Resource)]
struct DroneAsset(Handle<Scene>);

/// Load progress of [`DroneAsset`], refreshed every update
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
struct DroneLoad(AssetProgress);

impl Default for DroneLoad {
    fn default() -> Self {
        Self(AssetProgress::Loading)
    }
}

/// Marker for the entity that maps the Z-up world onto Bevy's Y-up world
#[derive(Component)]
struct WorldRoot;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum GenerationStep {
    #[default]
    Importing,
    Posing,
    Settling,
    Capturing,
    Saving,
    Finished,
}

#[derive(Resource, Default)]
struct GenerationState {
    step: GenerationStep,
    frame: u32,
    /// Updates spent in the current step
    wait: u32,
    frames_since_loaded: u32,
    frames_rendered: u32,
    batches: BTreeSet<u32>,
    captured: Option<Image>,
}

/// Slot the screenshot observer writes into
#[derive(Resource, Clone, Default)]
struct SharedCapture(Arc<Mutex<Option<Image>>>);

/// Result of the run, read after the app exits
#[derive(Resource, Clone, Default)]
struct SharedOutcome(Arc<Mutex<Option<Result<RunSummary, DatasetError>>>>);

/// Plan the scene and flight, run the app until the last frame is exported
/// and return the outcome.
pub(crate) fn run(config: &DatasetConfig) -> Result<RunSummary, DatasetError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (asset_root, asset_file) = split_asset_path(&config.drone_asset)?;
    let job = GenerationJob::plan(config, &asset_file, &mut rng);
    let outcome = SharedOutcome::default();
    // Reported from `backend::report_adapter` once logging is up
    let backend = BackendConfig::from_env();

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        resolution: WindowResolution::new(
                            config.render.width as f32,
                            config.render.height as f32,
                        )
                        .with_scale_factor_override(1.0),
                        present_mode: PresentMode::AutoNoVsync,
                        resizable: false,
                        title: "bevy-nlos".into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: asset_root.to_string_lossy().into_owned(),
                    ..default()
                })
                .set(LogPlugin {
                    filter: LOG_FILTER.to_string(),
                    level: Level::INFO,
                    ..default()
                })
                .set(backend.render_plugin()),
        )
        .add_plugins(ObjPlugin)
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: config.render.ambient_brightness,
        })
        .insert_resource(backend)
        .insert_resource(job)
        .insert_resource(outcome.clone())
        .init_resource::<SharedCapture>()
        .init_resource::<GenerationState>()
        .init_resource::<DroneLoad>()
        .add_systems(
            Startup,
            (backend::report_adapter, report_plan, setup_scene).chain(),
        )
        .add_systems(
            Update,
            (
                track_drone_load,
                check_import,
                pose_frame,
                request_capture,
                collect_capture,
                save_frame,
            )
                .chain(),
        )
        .run();

    let result = outcome.0.lock().ok().and_then(|mut guard| guard.take());
    result.unwrap_or_else(|| {
        Err(DatasetError::RenderFailed(
            "Render did not complete".to_string(),
        ))
    })
}

/// Split the drone path into the asset root and the file inside it
fn split_asset_path(path: &Path) -> Result<(PathBuf, PathBuf), DatasetError> {
    let absolute = std::fs::canonicalize(path)?;
    let file = absolute
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| DatasetError::AssetNotFound(path.display().to_string()))?;
    let root = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((root, file))
}

fn report_plan(job: Res<GenerationJob>) {
    info!(
        "Planned {} props, {} lights, {} flight keys for frames {}..={}",
        job.layout.props.len(),
        job.layout.lights.len(),
        job.track.keyframe_count(),
        job.frame_start,
        job.frame_end
    );
}

/// Spawn the Z-up root with the static scene and both rigs
fn setup_scene(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    job: Res<GenerationJob>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let model: Handle<Scene> = asset_server.load(job.asset_path.clone());
    commands.insert_resource(DroneAsset(model.clone()));

    commands
        .spawn((
            Name::new("World"),
            WorldRoot,
            Transform::from_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
            Visibility::default(),
        ))
        .with_children(|root| {
            scene::spawn_layout(root, &job.scene, &job.layout, &mut meshes, &mut materials);
            for role in RigRole::ALL {
                rig::spawn_rig(
                    root,
                    role,
                    &job.rigs,
                    model.clone(),
                    job.render.aspect_ratio(),
                );
            }
        });

    info!("Scene setup complete, importing {}", job.asset_display);
}

fn finish(
    state: &mut GenerationState,
    outcome: &SharedOutcome,
    exit: &mut EventWriter<AppExit>,
    result: Result<RunSummary, DatasetError>,
) {
    let app_exit = match &result {
        Ok(_) => AppExit::Success,
        Err(e) => {
            error!("{}", e);
            AppExit::error()
        }
    };
    if let Ok(mut guard) = outcome.0.lock() {
        *guard = Some(result);
    }
    state.step = GenerationStep::Finished;
    exit.send(app_exit);
}

/// Mirror the asset server's view of the drone into [`DroneLoad`]
fn track_drone_load(
    asset_server: Res<AssetServer>,
    drone: Option<Res<DroneAsset>>,
    mut load: ResMut<DroneLoad>,
) {
    let Some(drone) = drone else { return };
    let progress = AssetProgress::from_load_state(asset_server.get_load_state(&drone.0));
    if load.0 != progress {
        load.0 = progress;
    }
}

/// Wait for the drone asset and bail out if it produced nothing
#[allow(clippy::too_many_arguments)]
fn check_import(
    mut state: ResMut<GenerationState>,
    job: Res<GenerationJob>,
    load: Res<DroneLoad>,
    models: Query<Entity, With<DroneModel>>,
    children: Query<&Children>,
    mesh_entities: Query<(), With<Mesh3d>>,
    outcome: Res<SharedOutcome>,
    mut exit: EventWriter<AppExit>,
) {
    if state.step != GenerationStep::Importing {
        return;
    }

    let progress = &load.0;
    if *progress == AssetProgress::Loaded {
        state.frames_since_loaded += 1;
    }
    let mesh_count = models
        .iter()
        .map(|model| {
            children
                .iter_descendants(model)
                .filter(|e| mesh_entities.contains(*e))
                .count()
        })
        .min()
        .unwrap_or(0);

    match import_status(
        progress,
        state.frames_since_loaded,
        job.render.import_grace_frames,
        mesh_count,
    ) {
        ImportStatus::Pending => {}
        ImportStatus::Ready(count) => {
            info!("Imported {} ({} meshes per rig)", job.asset_display, count);
            state.frame = job.frame_start;
            state.step = GenerationStep::Posing;
        }
        ImportStatus::Empty => {
            let err = DatasetError::EmptyImport(job.asset_display.clone());
            finish(&mut state, &outcome, &mut exit, Err(err));
        }
        ImportStatus::Failed(msg) => {
            let err = DatasetError::ImportFailed(format!("{}: {}", job.asset_display, msg));
            finish(&mut state, &outcome, &mut exit, Err(err));
        }
    }
}

/// Move the flying rig to its pose for the current frame
fn pose_frame(
    mut state: ResMut<GenerationState>,
    job: Res<GenerationJob>,
    mut rigs: Query<(&DroneRig, &mut Transform)>,
) {
    if state.step != GenerationStep::Posing {
        return;
    }

    let pose = job.flying_pose(state.frame);
    for (rig, mut transform) in &mut rigs {
        if rig.0 == RigRole::Flying {
            *transform = pose.to_transform();
        }
    }

    state.wait = 0;
    state.step = GenerationStep::Settling;
}

/// After the pose settled, ask for a capture of the primary window
fn request_capture(
    mut commands: Commands,
    mut state: ResMut<GenerationState>,
    job: Res<GenerationJob>,
    capture: Res<SharedCapture>,
) {
    if state.step != GenerationStep::Settling {
        return;
    }
    state.wait += 1;
    if state.wait < job.render.settle_frames {
        return;
    }

    if let Ok(mut guard) = capture.0.lock() {
        *guard = None;
    }
    let slot = capture.0.clone();
    commands.spawn(Screenshot::primary_window()).observe(
        move |trigger: Trigger<ScreenshotCaptured>| {
            let image: &Image = &trigger.event().0;
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(image.clone());
            }
        },
    );

    state.wait = 0;
    state.step = GenerationStep::Capturing;
}

/// Pick up the captured image, or give up after the timeout
fn collect_capture(
    mut state: ResMut<GenerationState>,
    job: Res<GenerationJob>,
    capture: Res<SharedCapture>,
    outcome: Res<SharedOutcome>,
    mut exit: EventWriter<AppExit>,
) {
    if state.step != GenerationStep::Capturing {
        return;
    }

    let captured = capture.0.lock().ok().and_then(|mut guard| guard.take());
    match captured {
        Some(image) => {
            state.captured = Some(image);
            state.step = GenerationStep::Saving;
        }
        None => {
            state.wait += 1;
            if state.wait > job.render.capture_timeout_frames {
                let err = DatasetError::RenderFailed(format!(
                    "no capture for frame {} after {} updates",
                    state.frame, job.render.capture_timeout_frames
                ));
                finish(&mut state, &outcome, &mut exit, Err(err));
            }
        }
    }
}

/// Export image and record, then advance to the next frame or finish
fn save_frame(
    mut state: ResMut<GenerationState>,
    job: Res<GenerationJob>,
    outcome: Res<SharedOutcome>,
    mut exit: EventWriter<AppExit>,
) {
    if state.step != GenerationStep::Saving {
        return;
    }
    let Some(image) = state.captured.take() else {
        state.step = GenerationStep::Posing;
        return;
    };

    let frame = state.frame;
    let exported = image
        .try_into_dynamic()
        .map_err(|e| DatasetError::RenderFailed(format!("frame {}: {}", frame, e)))
        .and_then(|pixels| {
            job.exporter
                .export(frame, &job.hovering_pose(), &job.flying_pose(frame), &pixels)
        });

    let index = match exported {
        Ok(index) => index,
        Err(e) => {
            finish(&mut state, &outcome, &mut exit, Err(e));
            return;
        }
    };

    state.frames_rendered += 1;
    state.batches.insert(index.batch);
    info!(
        "Frame {}/{} saved to batch {}",
        frame, job.frame_end, index.batch
    );

    match job.next_frame(frame) {
        Some(next) => {
            state.frame = next;
            state.step = GenerationStep::Posing;
        }
        None => {
            let summary = RunSummary {
                frames_rendered: state.frames_rendered,
                batches: state.batches.iter().copied().collect(),
                output_dir: job.output_dir.clone(),
            };
            info!("Rendering complete. Images saved in {}", job.output_dir.display());
            finish(&mut state, &outcome, &mut exit, Ok(summary));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::read_frame_record;
    use bevy::render::render_asset::RenderAssetUsages;
    use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
    use tempfile::TempDir;

    fn test_job(output_dir: &Path, frame_end: u32) -> GenerationJob {
        let config = DatasetConfig {
            frames_per_folder: 2,
            starting_folder_number: 5,
            frame_end,
            output_dir: output_dir.to_path_buf(),
            ..DatasetConfig::preview()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut job = GenerationJob::plan(&config, Path::new("drone.obj"), &mut rng);
        job.render = RenderConfig {
            settle_frames: 2,
            capture_timeout_frames: 3,
            import_grace_frames: 2,
            ..RenderConfig::preview()
        };
        job
    }

    fn test_app(job: GenerationJob, step: GenerationStep, frame: u32) -> App {
        let mut app = App::new();
        app.insert_resource(job)
            .insert_resource(GenerationState {
                step,
                frame,
                ..default()
            })
            .init_resource::<SharedCapture>()
            .init_resource::<SharedOutcome>()
            .init_resource::<DroneLoad>()
            .add_systems(
                Update,
                (
                    check_import,
                    pose_frame,
                    request_capture,
                    collect_capture,
                    save_frame,
                )
                    .chain(),
            );
        app
    }

    /// Drone model entity with `meshes` mesh children
    fn spawn_model(app: &mut App, role: RigRole, meshes: usize) -> Entity {
        app.world_mut()
            .spawn(DroneModel(role))
            .with_children(|model| {
                for _ in 0..meshes {
                    model.spawn(Mesh3d(Handle::default()));
                }
            })
            .id()
    }

    fn test_image() -> Image {
        Image::new_fill(
            Extent3d {
                width: 4,
                height: 2,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            &[200, 100, 50, 255],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        )
    }

    fn step(app: &App) -> GenerationStep {
        app.world().resource::<GenerationState>().step
    }

    fn take_outcome(app: &App) -> Option<Result<RunSummary, DatasetError>> {
        app.world()
            .resource::<SharedOutcome>()
            .0
            .lock()
            .unwrap()
            .take()
    }

    #[test]
    fn test_next_frame_stops_at_end() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        assert_eq!(job.next_frame(1), Some(2));
        assert_eq!(job.next_frame(3), None);
        assert_eq!(job.next_frame(u32::MAX), None);
    }

    #[test]
    fn test_job_clips_cameras_at_folder_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        assert_eq!(job.rigs.lens.clip_end, 2.0);
        assert_eq!(job.frame_start, 1);
        assert_eq!(job.asset_path, "drone.obj");
    }

    #[test]
    fn test_import_waits_while_loading() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        let mut app = test_app(job, GenerationStep::Importing, 0);
        spawn_model(&mut app, RigRole::Hovering, 0);

        for _ in 0..5 {
            app.update();
        }
        assert_eq!(step(&app), GenerationStep::Importing);
        assert!(take_outcome(&app).is_none());
    }

    #[test]
    fn test_import_waits_for_every_rig_then_poses() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        let mut app = test_app(job, GenerationStep::Importing, 0);
        app.insert_resource(DroneLoad(AssetProgress::Loaded));
        spawn_model(&mut app, RigRole::Hovering, 2);
        let flying = spawn_model(&mut app, RigRole::Flying, 0);

        app.update();
        assert_eq!(step(&app), GenerationStep::Importing);

        app.world_mut().entity_mut(flying).with_children(|model| {
            model.spawn(Mesh3d(Handle::default()));
        });
        app.update();
        // Import and posing run in the same chain
        let state = app.world().resource::<GenerationState>();
        assert_eq!(state.frame, 1);
        assert_eq!(state.step, GenerationStep::Settling);
        assert!(take_outcome(&app).is_none());
    }

    #[test]
    fn test_empty_import_ends_run_before_rendering() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("out");
        let job = test_job(&output_dir, 3);
        let mut app = test_app(job, GenerationStep::Importing, 0);
        app.insert_resource(DroneLoad(AssetProgress::Loaded));
        spawn_model(&mut app, RigRole::Hovering, 0);
        spawn_model(&mut app, RigRole::Flying, 0);

        // One update inside the grace period, the second one gives up
        app.update();
        assert_eq!(step(&app), GenerationStep::Importing);
        app.update();
        assert_eq!(step(&app), GenerationStep::Finished);

        let outcome = take_outcome(&app).unwrap();
        assert!(matches!(outcome, Err(DatasetError::EmptyImport(_))));
        assert_eq!(app.world().resource::<Events<AppExit>>().len(), 1);
        assert!(!output_dir.exists());

        app.update();
        let mut screenshots = app.world_mut().query::<&Screenshot>();
        assert_eq!(screenshots.iter(app.world()).count(), 0);
    }

    #[test]
    fn test_failed_import_ends_run() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        let mut app = test_app(job, GenerationStep::Importing, 0);
        app.insert_resource(DroneLoad(AssetProgress::Failed(
            "unsupported format".to_string(),
        )));

        app.update();
        assert_eq!(step(&app), GenerationStep::Finished);
        match take_outcome(&app).unwrap() {
            Err(DatasetError::ImportFailed(msg)) => assert!(msg.contains("unsupported format")),
            other => panic!("expected ImportFailed, got {:?}", other.map(|s| s.frames_rendered)),
        }
    }

    #[test]
    fn test_flying_pose_follows_track() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 40);
        let first = job.flying_pose(1);
        assert_eq!(first.position, job.rigs.flying.pose.position);
        assert_eq!(job.hovering_pose().position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_pose_then_settle_then_request() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 4);
        let expected = job.flying_pose(3).to_transform();
        let mut app = test_app(job, GenerationStep::Posing, 3);
        let flying = app
            .world_mut()
            .spawn((DroneRig(RigRole::Flying), Transform::IDENTITY))
            .id();
        let hovering = app
            .world_mut()
            .spawn((DroneRig(RigRole::Hovering), Transform::IDENTITY))
            .id();

        // Posing and the first settle update run in the same chain
        app.update();
        assert_eq!(step(&app), GenerationStep::Settling);
        assert_eq!(*app.world().get::<Transform>(flying).unwrap(), expected);
        assert_eq!(
            *app.world().get::<Transform>(hovering).unwrap(),
            Transform::IDENTITY
        );

        app.update();
        assert_eq!(step(&app), GenerationStep::Capturing);
        let mut screenshots = app.world_mut().query::<&Screenshot>();
        assert_eq!(screenshots.iter(app.world()).count(), 1);
    }

    #[test]
    fn test_capture_is_saved_and_run_finishes() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        let mut app = test_app(job, GenerationStep::Capturing, 3);
        {
            let capture = app.world().resource::<SharedCapture>().clone();
            *capture.0.lock().unwrap() = Some(test_image());
        }

        app.update();
        assert_eq!(step(&app), GenerationStep::Finished);

        // Frame 3 with two frames per folder lands in batch 6
        let record_path = temp_dir.path().join("seq_0006/seq_6_0001.json");
        let record = read_frame_record(&record_path).unwrap();
        assert_eq!(record.timestamp, 3);
        assert_eq!(record.drone_1_pose.position.z, 3.0);
        assert!(temp_dir.path().join("seq_0006/seq_6_0001.exr").exists());

        let summary = take_outcome(&app).unwrap().unwrap();
        assert_eq!(summary.frames_rendered, 1);
        assert_eq!(summary.batches, vec![6]);

        let exits = app.world().resource::<Events<AppExit>>();
        assert_eq!(exits.len(), 1);
    }

    #[test]
    fn test_capture_advances_to_next_frame() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        let mut app = test_app(job, GenerationStep::Capturing, 1);
        {
            let capture = app.world().resource::<SharedCapture>().clone();
            *capture.0.lock().unwrap() = Some(test_image());
        }

        app.update();
        let state = app.world().resource::<GenerationState>();
        assert_eq!(state.step, GenerationStep::Posing);
        assert_eq!(state.frame, 2);
        assert_eq!(state.frames_rendered, 1);
        assert!(temp_dir.path().join("seq_0005/seq_5_0001.json").exists());
    }

    #[test]
    fn test_capture_timeout_fails_run() {
        let temp_dir = TempDir::new().unwrap();
        let job = test_job(temp_dir.path(), 3);
        let mut app = test_app(job, GenerationStep::Capturing, 1);

        for _ in 0..4 {
            app.update();
        }
        assert_eq!(step(&app), GenerationStep::Finished);
        let outcome = take_outcome(&app).unwrap();
        assert!(matches!(outcome, Err(DatasetError::RenderFailed(_))));
    }

    #[test]
    fn test_split_asset_path() {
        let temp_dir = TempDir::new().unwrap();
        let asset = temp_dir.path().join("drone.obj");
        std::fs::write(&asset, "o empty\n").unwrap();

        let (root, file) = split_asset_path(&asset).unwrap();
        assert_eq!(file, PathBuf::from("drone.obj"));
        assert_eq!(root, std::fs::canonicalize(temp_dir.path()).unwrap());
        assert!(split_asset_path(&temp_dir.path().join("missing.obj")).is_err());
    }
}
