//! Render an NLOS dataset with the default configuration.
//!
//! Usage:
//!   cargo run --release
//!
//! Expects `drone.obj` in the working directory and writes to `nlos_dataset/`.
//! Change `STARTING_FOLDER_NUMBER` between runs to keep earlier sequences.

use bevy_nlos::{generate_dataset, DatasetConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DatasetConfig::default();
    let layout = config.batch_layout();

    println!("=== bevy-nlos dataset generator ===");
    println!("Drone asset: {}", config.drone_asset.display());
    println!("Output directory: {}", config.output_dir.display());
    println!(
        "  Resolution: {}x{}",
        config.render.width, config.render.height
    );
    println!(
        "  Frames: {}..={} ({} per folder)",
        config.frame_start, config.frame_end, config.frames_per_folder
    );
    println!(
        "  Batches: {:?}",
        layout.batches_for(config.frame_start, config.frame_end)
    );

    let summary = match generate_dataset(&config) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return Err(e.into());
        }
    };

    println!("\n=== Rendering complete ===");
    println!("Frames rendered: {}", summary.frames_rendered);
    println!("Batches written: {:?}", summary.batches);
    println!("Images saved in {}", summary.output_dir.display());
    Ok(())
}
