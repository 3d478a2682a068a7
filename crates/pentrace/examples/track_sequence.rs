use std::error::Error;

use image::ImageReader;

use pentrace::debug_dump::DebugDump;
use pentrace::{ImageSequenceSource, PenTracker};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <frame_dir> <last_frame> <template.jpg> [dump.json]",
            args[0]
        );
        std::process::exit(2);
    }

    let last_frame: u64 = args[2].parse()?;
    let mut source = ImageSequenceSource::new(&args[1], last_frame)?;
    let template = ImageReader::open(&args[3])?.decode()?.to_luma8();

    let tracker = PenTracker::new();
    let mut updates = Vec::new();
    let result = tracker.run_with_observer(&mut source, &template, |u| {
        if u.frame_number % 25 == 0 {
            println!(
                "frame {:>4}: fitness {:.3}{}",
                u.frame_number,
                u.matched.fitness,
                if u.registered { "" } else { " (unregistered)" }
            );
        }
        updates.push(*u);
    })?;

    println!(
        "Tracked {} frames ({} registered), {} raw tip samples.",
        result.frames_processed, result.frames_registered, result.raw_samples
    );
    println!(
        "Reconstructed {} strokes, {:.0} px of ink.",
        result.strokes.len(),
        result.ink_length()
    );

    if let Some(out_path) = args.get(4) {
        let mut dump = DebugDump::new(tracker.config(), result.image_size[0], result.image_size[1]);
        dump.video.path = Some(args[1].clone());
        for u in &updates {
            dump.record(u);
        }
        dump.result = Some(result);
        std::fs::write(out_path, serde_json::to_string_pretty(&dump)?)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
