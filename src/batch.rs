//! Batch indexing and per-frame export.
//!
//! Frames are numbered from 1 and grouped into fixed-capacity batches, one
//! output folder per batch. For every rendered frame this module writes the
//! image and a JSON record holding both drone poses.
//!
//! # Example
//!
//! ```ignore
//! use bevy_nlos::batch::{BatchLayout, OutputLayout};
//!
//! let layout = BatchLayout::new(1000, 5);
//! let index = layout.locate(1001).unwrap(); // batch 6, frame 1
//! let paths = OutputLayout::new("nlos_dataset");
//! assert!(paths.image_path(index).ends_with("seq_0006/seq_6_0001.exr"));
//! ```

use crate::{DatasetError, Pose};
use bevy::log::info;
use image::{DynamicImage, Rgba32FImage};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Position of a frame inside the batch grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameIndex {
    /// Batch (output folder) number
    pub batch: u32,
    /// 1-based frame number inside the batch
    pub frame_in_batch: u32,
}

/// Fixed-size bucketing of global frame numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLayout {
    /// Frames per batch
    pub frames_per_folder: u32,
    /// Batch number that frame 1 lands in
    pub starting_folder: u32,
}

impl BatchLayout {
    /// Create a new layout. A capacity of zero is treated as one.
    pub fn new(frames_per_folder: u32, starting_folder: u32) -> Self {
        Self {
            frames_per_folder: frames_per_folder.max(1),
            starting_folder,
        }
    }

    /// Map a 1-based global frame to its batch and in-batch frame.
    ///
    /// Returns `None` for frame 0 and when the batch number overflows.
    pub fn locate(&self, frame: u32) -> Option<FrameIndex> {
        let zero_based = frame.checked_sub(1)?;
        Some(FrameIndex {
            batch: (zero_based / self.frames_per_folder).checked_add(self.starting_folder)?,
            frame_in_batch: zero_based % self.frames_per_folder + 1,
        })
    }

    /// Recover the global frame from a batch position.
    ///
    /// Returns `None` if the index lies before the first batch, outside the
    /// batch capacity, or overflows.
    pub fn global_frame(&self, index: FrameIndex) -> Option<u32> {
        if index.frame_in_batch == 0 || index.frame_in_batch > self.frames_per_folder {
            return None;
        }
        let batch_offset = index.batch.checked_sub(self.starting_folder)?;
        batch_offset
            .checked_mul(self.frames_per_folder)?
            .checked_add(index.frame_in_batch)
    }

    /// Batches touched by an inclusive frame range, ascending.
    pub fn batches_for(&self, frame_start: u32, frame_end: u32) -> Vec<u32> {
        match (self.locate(frame_start), self.locate(frame_end)) {
            (Some(first), Some(last)) if first.batch <= last.batch => {
                (first.batch..=last.batch).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// File naming under the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Create a layout rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Output root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding one batch: `seq_0005`
    pub fn batch_dir(&self, batch: u32) -> PathBuf {
        self.root.join(batch_dir_name(batch))
    }

    /// Shared stem of a frame's files: `seq_5_0001`
    pub fn file_stem(index: FrameIndex) -> String {
        format!("seq_{}_{:04}", index.batch, index.frame_in_batch)
    }

    /// Image path for a frame
    pub fn image_path(&self, index: FrameIndex) -> PathBuf {
        self.batch_dir(index.batch)
            .join(format!("{}.exr", Self::file_stem(index)))
    }

    /// Record path for a frame
    pub fn record_path(&self, index: FrameIndex) -> PathBuf {
        self.batch_dir(index.batch)
            .join(format!("{}.json", Self::file_stem(index)))
    }
}

/// Name of a batch folder
pub fn batch_dir_name(batch: u32) -> String {
    format!("seq_{:04}", batch)
}

/// Parse a batch folder name back into its number
pub fn parse_batch_dir_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("seq_")?;
    if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ============================================================================
// Pose records
// ============================================================================

/// Position entry of a pose record
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation entry of a pose record, radians
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrientationRecord {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Pose of one drone rig in a frame record
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub position: PositionRecord,
    pub orientation: OrientationRecord,
}

impl From<&Pose> for PoseRecord {
    fn from(pose: &Pose) -> Self {
        Self {
            position: PositionRecord {
                x: pose.position.x as f64,
                y: pose.position.y as f64,
                z: pose.position.z as f64,
            },
            orientation: OrientationRecord {
                roll: pose.orientation.roll as f64,
                pitch: pose.orientation.pitch as f64,
                yaw: pose.orientation.yaw as f64,
            },
        }
    }
}

/// Metadata written next to every frame image
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Global frame number
    pub timestamp: u32,
    /// Hovering rig (carries the active camera)
    pub drone_1_pose: PoseRecord,
    /// Flying rig
    pub drone_2_pose: PoseRecord,
    /// Where the frame image was written
    pub image_path: String,
}

/// Write a record as JSON indented by four spaces.
pub fn write_frame_record(path: &Path, record: &FrameRecord) -> Result<(), DatasetError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    record.serialize(&mut serializer)?;
    writer.flush()?;
    Ok(())
}

/// Read a record back from disk
pub fn read_frame_record(path: &Path) -> Result<FrameRecord, DatasetError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

// ============================================================================
// Image conversion
// ============================================================================

/// Decode an sRGB-encoded channel value in [0, 1] to linear light.
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert a captured frame to linear float RGBA. Alpha stays as is.
pub fn to_linear_rgba32f(image: &DynamicImage) -> Rgba32FImage {
    let mut linear = image.to_rgba32f();
    for pixel in linear.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = srgb_to_linear(*channel);
        }
    }
    linear
}

// ============================================================================
// Exporter
// ============================================================================

/// Writes frame images and records into their batch folders.
#[derive(Clone, Debug)]
pub struct FrameExporter {
    layout: BatchLayout,
    paths: OutputLayout,
}

impl FrameExporter {
    /// Create a new exporter
    pub fn new(layout: BatchLayout, paths: OutputLayout) -> Self {
        Self { layout, paths }
    }

    /// Export one frame.
    ///
    /// Creates the batch folder if needed and overwrites files left by an
    /// earlier run with the same batch numbers. The record stores the absolute
    /// image path.
    pub fn export(
        &self,
        frame: u32,
        hovering: &Pose,
        flying: &Pose,
        image: &DynamicImage,
    ) -> Result<FrameIndex, DatasetError> {
        let index = self.layout.locate(frame).ok_or_else(|| {
            DatasetError::InvalidConfig(format!("frame {} has no batch, frames start at 1", frame))
        })?;

        let batch_dir = self.paths.batch_dir(index.batch);
        fs::create_dir_all(&batch_dir)?;

        let image_path = fs::canonicalize(&batch_dir)?
            .join(format!("{}.exr", OutputLayout::file_stem(index)));
        to_linear_rgba32f(image).save(&image_path)?;
        info!("Rendered image: {}", image_path.display());

        let record = FrameRecord {
            timestamp: frame,
            drone_1_pose: PoseRecord::from(hovering),
            drone_2_pose: PoseRecord::from(flying),
            image_path: image_path.display().to_string(),
        };
        let record_path = self.paths.record_path(index);
        write_frame_record(&record_path, &record)?;
        info!("Saved JSON: {}", record_path.display());

        Ok(index)
    }
}
