//! Single document analysis
//!
//! Run with: cargo run --example analyze -- <image_path> [output_dir]

use std::{env, fs, path::Path};

use document_forensics::{DocumentAnalyzer, Stage, error::Result, report::AnalysisReport};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: {} <image_path> [output_dir]", args[0]);
        return Ok(());
    }

    let image_path = &args[1];
    let output_dir = args.get(2).map(|s| s.as_str()).unwrap_or("./output");
    fs::create_dir_all(output_dir)?;

    let analyzer = DocumentAnalyzer::new().with_progress(|stage: Stage, percent: u8| {
        println!("  [{percent:>3}%] {stage:?}");
    });

    println!("Analyzing {}...", image_path);
    let analysis = analyzer.analyze_file(image_path)?;
    let signals = &analysis.signals;

    println!();
    println!("Verdict: {}", analysis.verdict.label);
    println!("  Why: {}", analysis.verdict.explanation);
    println!("  SHA-256: {}", signals.content_hash);
    println!("  Fingerprint: {}", signals.fingerprint);
    println!(
        "  Mean RGB: {}, {}, {}",
        signals.mean_rgb[0], signals.mean_rgb[1], signals.mean_rgb[2]
    );
    println!("  ELA bright: {}%", signals.ela_percent);

    for hit in &analysis.token_hits {
        println!("  {} token \"{}\"", if hit.found { "+" } else { "-" }, hit.token);
    }
    for reason in &analysis.reasons {
        println!("  ! {}: {}", reason.title, reason.detail);
    }

    let out = Path::new(output_dir);
    analysis.ela.map.to_dynamic().save(out.join("ela.png"))?;
    analysis.edge_map.to_dynamic().save(out.join("edges.png"))?;
    fs::write(out.join("analysis.json"), AnalysisReport::from(&analysis).to_json()?)?;

    println!();
    println!("Output written to {}", output_dir);

    Ok(())
}
