//! Summarize generated NLOS sequences
//!
//! Usage:
//!   cargo run --bin nlos-inspect -- [--output-dir <path>] [--batch <n>]
//!
//! Default output directory: nlos_dataset/

use bevy_nlos::dataset::{list_sequences, Sequence};
use bevy_nlos::DEFAULT_OUTPUT_DIR;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let output_dir =
        parse_arg(&args, "--output-dir").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
    let batch_arg = parse_arg(&args, "--batch");

    let batches: Vec<u32> = match batch_arg {
        Some(b) => vec![b.trim().parse()?],
        None => list_sequences(&output_dir)?,
    };

    println!("=== bevy-nlos sequences ===");
    println!("Output directory: {}", output_dir);
    if batches.is_empty() {
        println!("No sequences found.");
        return Ok(());
    }

    let mut total_frames = 0;
    let mut total_missing = 0;
    for batch in batches {
        let sequence = Sequence::load(&output_dir, batch)?;
        let missing = sequence.missing_images();
        total_frames += sequence.frame_count();
        total_missing += missing.len();

        println!("\n--- seq_{:04} ---", batch);
        println!("  Records: {}", sequence.frame_count());
        if let Some((first, last)) = sequence.timestamp_range() {
            println!("  Timestamps: {}..={}", first, last);
        }
        if let (Some(first), Some(last)) = (sequence.records().next(), sequence.records().last())
        {
            let start = &first.drone_2_pose.position;
            let end = &last.drone_2_pose.position;
            println!(
                "  Flying rig: ({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2})",
                start.x, start.y, start.z, end.x, end.y, end.z
            );
        }
        if !missing.is_empty() {
            println!("  WARNING: {} images missing: {:?}", missing.len(), missing);
        }
    }

    println!("\n=== Summary ===");
    println!("Total records: {}", total_frames);
    println!("Missing images: {}", total_missing);
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}
