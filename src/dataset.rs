//! Reading generated sequences back from disk
//!
//! Loads the pose records of a batch folder so a dataset can be checked or
//! consumed without re-rendering.
//!
//! # Usage
//!
//! ```ignore
//! use bevy_nlos::dataset::{list_sequences, Sequence};
//!
//! for batch in list_sequences("nlos_dataset")? {
//!     let sequence = Sequence::load("nlos_dataset", batch)?;
//!     let record = sequence.record(1).unwrap();
//!     let image = sequence.load_image(1)?;
//! }
//! ```

use crate::batch::{parse_batch_dir_name, read_frame_record, FrameIndex, FrameRecord, OutputLayout};
use crate::DatasetError;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Batch numbers of every `seq_NNNN` folder under `root`, ascending
pub fn list_sequences<P: AsRef<Path>>(root: P) -> Result<Vec<u32>, DatasetError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(DatasetError::SequenceNotFound(root.display().to_string()));
    }

    let mut batches = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(batch) = entry.file_name().to_str().and_then(parse_batch_dir_name) {
            batches.push(batch);
        }
    }
    batches.sort_unstable();
    Ok(batches)
}

/// In-batch frame number of a record file named `seq_<batch>_<NNNN>.json`
fn parse_record_name(name: &str, batch: u32) -> Option<u32> {
    let stem = name.strip_suffix(".json")?;
    let frame = stem.strip_prefix(&format!("seq_{}_", batch))?;
    if frame.len() < 4 || !frame.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    frame.parse().ok().filter(|f| *f >= 1)
}

/// One batch folder with its records loaded
pub struct Sequence {
    paths: OutputLayout,
    batch: u32,
    records: BTreeMap<u32, FrameRecord>,
}

impl Sequence {
    /// Load every record of batch `batch` under `root`.
    ///
    /// Files that do not follow the record naming are skipped.
    pub fn load<P: AsRef<Path>>(root: P, batch: u32) -> Result<Self, DatasetError> {
        let paths = OutputLayout::new(root);
        let dir = paths.batch_dir(batch);
        if !dir.is_dir() {
            return Err(DatasetError::SequenceNotFound(dir.display().to_string()));
        }

        let mut records = BTreeMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(frame) = name.to_str().and_then(|n| parse_record_name(n, batch)) else {
                continue;
            };
            records.insert(frame, read_frame_record(&entry.path())?);
        }

        Ok(Self {
            paths,
            batch,
            records,
        })
    }

    /// Check whether a batch folder exists
    pub fn exists<P: AsRef<Path>>(root: P, batch: u32) -> bool {
        OutputLayout::new(root).batch_dir(batch).is_dir()
    }

    pub fn batch(&self) -> u32 {
        self.batch
    }

    /// Number of records in the batch
    pub fn frame_count(&self) -> usize {
        self.records.len()
    }

    /// In-batch frame numbers, ascending
    pub fn frames(&self) -> impl Iterator<Item = u32> + '_ {
        self.records.keys().copied()
    }

    /// Record of an in-batch frame (1-based)
    pub fn record(&self, frame: u32) -> Option<&FrameRecord> {
        self.records.get(&frame)
    }

    /// All records ordered by frame
    pub fn records(&self) -> impl Iterator<Item = &FrameRecord> + '_ {
        self.records.values()
    }

    /// Global timestamps covered by the batch, if any record exists
    pub fn timestamp_range(&self) -> Option<(u32, u32)> {
        let first = self.records.values().map(|r| r.timestamp).min()?;
        let last = self.records.values().map(|r| r.timestamp).max()?;
        Some((first, last))
    }

    /// Decode the image of an in-batch frame
    pub fn load_image(&self, frame: u32) -> Result<DynamicImage, DatasetError> {
        Ok(image::open(self.image_path(frame))?)
    }

    /// Frames whose record exists but whose image is missing
    pub fn missing_images(&self) -> Vec<u32> {
        self.frames()
            .filter(|frame| !self.image_path(*frame).exists())
            .collect()
    }

    fn image_path(&self, frame: u32) -> PathBuf {
        self.paths.image_path(FrameIndex {
            batch: self.batch,
            frame_in_batch: frame,
        })
    }
}
