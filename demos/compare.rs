//! Trusted vs. suspect comparison
//!
//! Run with: cargo run --example compare -- <trusted> <suspect> [output_dir]

use std::{env, fs, path::Path};

use document_forensics::{
    DocumentAnalyzer,
    error::Result,
    report::{ReportSlot, visualization::Visualizer},
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        println!("Usage: {} <trusted> <suspect> [output_dir]", args[0]);
        return Ok(());
    }

    let output_dir = args.get(3).map(|s| s.as_str()).unwrap_or("./output");
    fs::create_dir_all(output_dir)?;
    let out = Path::new(output_dir);

    let analyzer = DocumentAnalyzer::new();
    let slot = ReportSlot::new();

    let suspect = analyzer.open(&args[2])?;
    let outcome = analyzer.compare(&analyzer.open(&args[1])?, &suspect)?;
    let metrics = &outcome.report.metrics;

    println!("Comparison Report");
    let (trusted, suspect_id) = (&outcome.report.trusted, &outcome.report.suspect);
    println!("  Trusted: {} ({}...)", trusted.file_name, &trusted.content_hash[..12]);
    println!("  Suspect: {} ({}...)", suspect_id.file_name, &suspect_id.content_hash[..12]);
    println!("  Pixel diff: {}%", metrics.pixel_diff_percent);
    println!(
        "  Fingerprint similarity: {}% (Hamming {})",
        metrics.fingerprint_similarity, metrics.fingerprint_hamming
    );
    if let Some(ocr) = metrics.ocr_similarity {
        println!("  OCR similarity: {}%", ocr);
    }
    println!("  Hotspot boxes detected: {}", metrics.hotspot_boxes.len());

    let overlay = Visualizer::new().draw_hotspots(
        &suspect.pixels,
        &metrics.hotspot_boxes,
        outcome.working_size(),
    );
    overlay.save(out.join("hotspots.png"))?;
    outcome.ela_diff.to_dynamic().save(out.join("ela_diff.png"))?;

    slot.publish(outcome.report);
    slot.export(out.join("compare_report.json"))?;

    println!("Output written to {}", output_dir);

    Ok(())
}
