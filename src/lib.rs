//! bevy-nlos: Synthetic NLOS imaging dataset generator
//!
//! This library builds a randomized indoor scene in Bevy, flies one drone rig
//! through it along random waypoints while a second rig hovers in place, and
//! renders every frame together with a pose record for both rigs. The output is
//! intended as training data for non-line-of-sight (NLOS) imaging experiments.
//!
//! # Generating a dataset
//!
//! ```ignore
//! use bevy_nlos::{generate_dataset, DatasetConfig};
//!
//! let config = DatasetConfig::default(); // 1000 frames into seq_0005/
//! let summary = generate_dataset(&config)?;
//! println!("rendered {} frames", summary.frames_rendered);
//! ```
//!
//! # Output layout
//!
//! Frames are grouped into fixed-capacity batches. Frame `f` (1-based) lands in
//! batch `(f - 1) / frames_per_folder + starting_folder_number`:
//!
//! ```text
//! nlos_dataset/
//!   seq_0005/
//!     seq_5_0001.exr   # RGBA, 32-bit float, linear
//!     seq_5_0001.json  # timestamp, both drone poses, image path
//!     ...
//! ```
//!
//! # Coordinates
//!
//! Poses and scene layout use a Z-up world frame. A single root entity rotates
//! that frame into Bevy's Y-up world, so every spawned child keeps Z-up values.

use bevy::prelude::*;
use std::path::{Path, PathBuf};

pub mod backend;
pub mod batch;
pub mod dataset;
pub mod flight;
mod render;
pub mod rig;
pub mod scene;
pub mod shapes;

pub use batch::{BatchLayout, FrameExporter, FrameIndex, FrameRecord, OutputLayout};
pub use flight::{FlightConfig, FlightTrack, WaypointBounds};
pub use rig::{LensConfig, RigRole};
pub use scene::{SceneConfig, SceneLayout};

/// Number of frames stored in one output folder.
pub const FRAMES_PER_FOLDER: u32 = 1000;

/// Batch number of the first output folder. Bump this between runs, re-using a
/// number silently overwrites the earlier sequence.
pub const STARTING_FOLDER_NUMBER: u32 = 5;

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "nlos_dataset";

/// Default drone asset, relative to the working directory.
pub const DEFAULT_DRONE_ASSET: &str = "drone.obj";

/// Rotation as XYZ Euler angles in radians.
///
/// Applied as `Rz(yaw) * Ry(pitch) * Rx(roll)`, the same convention the pose
/// records use, so values round-trip into JSON unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Orientation {
    /// Rotation around X in radians
    pub roll: f32,
    /// Rotation around Y in radians
    pub pitch: f32,
    /// Rotation around Z in radians
    pub yaw: f32,
}

impl Orientation {
    /// Create a new orientation from Euler angles in radians
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Create from Euler angles in degrees
    pub fn from_degrees(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self::new(roll.to_radians(), pitch.to_radians(), yaw.to_radians())
    }

    /// No rotation
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Angles as `[roll, pitch, yaw]`
    pub fn to_array(&self) -> [f32; 3] {
        [self.roll, self.pitch, self.yaw]
    }

    /// Convert to a quaternion in the Z-up world frame
    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(EulerRot::ZYX, self.yaw, self.pitch, self.roll)
    }
}

/// Position and orientation of a rig in the Z-up world frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// Location in meters
    pub position: Vec3,
    /// Euler orientation
    pub orientation: Orientation,
}

impl Pose {
    /// Create a new pose
    pub fn new(position: Vec3, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Convert to a Bevy transform (unit scale), valid under the Z-up root
    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.orientation.to_quat(),
            scale: Vec3::ONE,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Output resolution and pacing of the capture loop.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Image width in pixels (default: 1920)
    pub width: u32,
    /// Image height in pixels (default: 1080)
    pub height: u32,
    /// Updates to wait after posing a frame before capturing it
    pub settle_frames: u32,
    /// Updates to wait after the drone asset loaded before judging the import
    pub import_grace_frames: u32,
    /// Updates to wait for a requested capture before giving up
    pub capture_timeout_frames: u32,
    /// Ambient light brightness (default: 40.0)
    pub ambient_brightness: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            settle_frames: 3,
            import_grace_frames: 30,
            capture_timeout_frames: 120,
            ambient_brightness: 40.0,
        }
    }
}

impl RenderConfig {
    /// Small resolution for quick checks
    pub fn preview() -> Self {
        Self {
            width: 480,
            height: 270,
            ..Self::default()
        }
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Complete configuration of a dataset run.
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    /// Frames per output folder (default: [`FRAMES_PER_FOLDER`])
    pub frames_per_folder: u32,
    /// Batch number of the first folder (default: [`STARTING_FOLDER_NUMBER`])
    pub starting_folder_number: u32,
    /// First frame of the animation (1-based)
    pub frame_start: u32,
    /// Last frame of the animation, inclusive
    pub frame_end: u32,
    /// Root directory for the batch folders
    pub output_dir: PathBuf,
    /// Drone asset file (OBJ, glTF or GLB)
    pub drone_asset: PathBuf,
    /// Seed for layout and flight randomness. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Resolution and capture pacing
    pub render: RenderConfig,
    /// Room, props, lights and surfaces
    pub scene: SceneConfig,
    /// Waypoint animation of the flying rig
    pub flight: FlightConfig,
    /// Drone rig construction
    pub rigs: rig::RigConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            frames_per_folder: FRAMES_PER_FOLDER,
            starting_folder_number: STARTING_FOLDER_NUMBER,
            frame_start: 1,
            frame_end: FRAMES_PER_FOLDER,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            drone_asset: PathBuf::from(DEFAULT_DRONE_ASSET),
            seed: None,
            render: RenderConfig::default(),
            scene: SceneConfig::default(),
            flight: FlightConfig::default(),
            rigs: rig::RigConfig::default(),
        }
    }
}

impl DatasetConfig {
    /// A short low-resolution run, useful to check the asset and lighting.
    pub fn preview() -> Self {
        Self {
            frame_end: 40,
            render: RenderConfig::preview(),
            ..Self::default()
        }
    }

    /// Number of frames this config renders
    pub fn frame_count(&self) -> u32 {
        if self.frame_end < self.frame_start {
            0
        } else {
            self.frame_end - self.frame_start + 1
        }
    }

    /// Batch layout derived from the folder settings
    pub fn batch_layout(&self) -> BatchLayout {
        BatchLayout::new(self.frames_per_folder, self.starting_folder_number)
    }

    /// Rig construction for this run: the cameras clip at `frames_per_folder`
    /// meters.
    pub fn rig_config(&self) -> rig::RigConfig {
        let mut rigs = self.rigs.clone();
        rigs.lens.clip_end = self.frames_per_folder as f32;
        rigs
    }

    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.frames_per_folder == 0 {
            return Err(DatasetError::InvalidConfig(
                "frames_per_folder must be at least 1".to_string(),
            ));
        }
        if self.frame_start == 0 {
            return Err(DatasetError::InvalidConfig(
                "frame_start is 1-based".to_string(),
            ));
        }
        if self.frame_end < self.frame_start {
            return Err(DatasetError::InvalidConfig(format!(
                "frame_end {} is before frame_start {}",
                self.frame_end, self.frame_start
            )));
        }
        if self.batch_layout().locate(self.frame_end).is_none() {
            return Err(DatasetError::InvalidConfig(format!(
                "frame {} overflows the batch numbering from folder {}",
                self.frame_end, self.starting_folder_number
            )));
        }
        let keyed_past_end = self.flight.waypoint_interval.max(self.flight.substeps);
        if self.frame_end.checked_add(keyed_past_end).is_none() {
            return Err(DatasetError::InvalidConfig(format!(
                "frame_end {} leaves no room for the last flight segment",
                self.frame_end
            )));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "resolution {}x{} is empty",
                self.render.width, self.render.height
            )));
        }
        self.flight.validate()?;
        self.scene.validate()?;
        Ok(())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can end a dataset run.
#[derive(Debug)]
pub enum DatasetError {
    /// Drone asset file not found
    AssetNotFound(String),
    /// Drone asset failed to load
    ImportFailed(String),
    /// Drone asset loaded but produced no objects
    EmptyImport(String),
    /// Capture or renderer failure
    RenderFailed(String),
    /// Invalid configuration
    InvalidConfig(String),
    /// Output sequence not found
    SequenceNotFound(String),
    /// IO error
    Io(std::io::Error),
    /// JSON error
    Json(serde_json::Error),
    /// Image encoding or decoding error
    Image(image::ImageError),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::AssetNotFound(path) => write!(f, "Asset not found: {}", path),
            DatasetError::ImportFailed(msg) => write!(f, "Import failed: {}", msg),
            DatasetError::EmptyImport(path) => write!(
                f,
                "No objects produced by importing {}. Check your asset file.",
                path
            ),
            DatasetError::RenderFailed(msg) => write!(f, "Render failed: {}", msg),
            DatasetError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            DatasetError::SequenceNotFound(path) => write!(f, "Sequence not found: {}", path),
            DatasetError::Io(e) => write!(f, "IO error: {}", e),
            DatasetError::Json(e) => write!(f, "JSON error: {}", e),
            DatasetError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io(e) => Some(e),
            DatasetError::Json(e) => Some(e),
            DatasetError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(e: std::io::Error) -> Self {
        DatasetError::Io(e)
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(e: serde_json::Error) -> Self {
        DatasetError::Json(e)
    }
}

impl From<image::ImageError> for DatasetError {
    fn from(e: image::ImageError) -> Self {
        DatasetError::Image(e)
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// What a finished run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames rendered and exported
    pub frames_rendered: u32,
    /// Batch folders written to, ascending
    pub batches: Vec<u32>,
    /// Output root
    pub output_dir: PathBuf,
}

/// Build the scene, animate the flying rig, render every frame and export
/// images plus pose records.
///
/// Blocks until the last frame is written. The Bevy app is torn down before
/// this returns, on success and on failure.
///
/// # Errors
/// * [`DatasetError::InvalidConfig`] before anything starts
/// * [`DatasetError::AssetNotFound`] if the drone asset does not exist
/// * [`DatasetError::EmptyImport`] if the asset yields no objects; no frame is rendered
/// * IO, image or render failures while exporting
pub fn generate_dataset(config: &DatasetConfig) -> Result<RunSummary, DatasetError> {
    config.validate()?;
    ensure_asset_exists(&config.drone_asset)?;
    render::run(config)
}

fn ensure_asset_exists(path: &Path) -> Result<(), DatasetError> {
    if path.exists() {
        Ok(())
    } else {
        Err(DatasetError::AssetNotFound(path.display().to_string()))
    }
}

// Re-export bevy types that consumers will need
pub use bevy::prelude::{Quat, Transform, Vec3};
