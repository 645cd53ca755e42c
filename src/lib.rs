use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{
        color::ColorStats,
        diff::{ela_diff_map, pixel_diff_percent},
        edges::EdgeDetector,
        ela::{ElaAnalyzer, ElaResult},
        fingerprint::{Fingerprint, hamming_hex, similarity_percent},
        hotspot::HotspotDetector,
        text,
    },
    codec::{Decoder, JpegReencoder, RasterDecoder, Reencoder, content_hash},
    detection::{Reason, TokenHit, Verdict, rules},
    error::{ForensicsError, Result},
    image_utils::resample_to_width,
    pixel::PixelBuffer,
    report::{CompareMetrics, CompareReport, ImageIdentity},
};

pub mod analysis;
pub mod codec;
pub mod detection;
pub mod error;
pub mod image_utils;
pub mod pixel;
pub mod report;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub ela_quality: u8,
    pub ela_amplification: f64,
    pub ela_bright_cutoff: u8,
    pub hotspot_threshold: f64,
    pub grid_size: u32,
    pub max_compare_width: u32,
    pub ocr_snippet_len: usize,
    pub expected_tokens: Vec<String>,
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ela_quality: analysis::ela::DEFAULT_QUALITY,
            ela_amplification: analysis::ela::DEFAULT_AMPLIFICATION,
            ela_bright_cutoff: analysis::ela::DEFAULT_BRIGHT_CUTOFF,
            hotspot_threshold: analysis::hotspot::DEFAULT_THRESHOLD,
            grid_size: analysis::hotspot::DEFAULT_GRID_SIZE,
            max_compare_width: 1200,
            ocr_snippet_len: 500,
            expected_tokens: rules::DEFAULT_TOKENS.iter().map(|t| t.to_string()).collect(),
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.ela_quality) {
            return Err(ForensicsError::InvalidParameter(format!(
                "ELA quality must be between 1 and 100, got {}",
                self.ela_quality
            )));
        }
        if !self.ela_amplification.is_finite() || self.ela_amplification <= 0.0 {
            return Err(ForensicsError::InvalidParameter(
                "ELA amplification must be a positive number".into(),
            ));
        }
        if self.max_compare_width == 0 {
            return Err(ForensicsError::InvalidParameter(
                "Maximum compare width must be at least 1".into(),
            ));
        }
        HotspotDetector::new(self.hotspot_threshold, self.grid_size)?;

        Ok(())
    }

    fn ela_analyzer(&self) -> ElaAnalyzer {
        ElaAnalyzer::new(self.ela_quality)
            .with_amplification(self.ela_amplification)
            .with_bright_cutoff(self.ela_bright_cutoff)
            .with_parallel(self.parallel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub file_name: String,
    /// SHA-256 of the PNG-normalized bitmap.
    pub content_hash: String,
    pub fingerprint: String,
    #[serde(rename = "meanRGB")]
    pub mean_rgb: [u8; 3],
    pub ela_percent: u8,
    pub ocr_snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Hashing,
    Fingerprint,
    ColorStats,
    Ela,
    EdgeMap,
    PixelDiff,
    Hotspots,
    Ocr,
    Rules,
    Complete,
    Failed,
}

/// Observes pipeline progress. Reporting never influences results.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: Stage, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(Stage, u8) + Send + Sync,
{
    fn report(&self, stage: Stage, percent: u8) {
        self(stage, percent)
    }
}

/// Text recognition backend. `progress` receives fractions in `0.0..=1.0`.
pub trait OcrProvider: Send + Sync {
    fn recognize(&self, image: &PixelBuffer, progress: &dyn Fn(f32)) -> Result<String>;
}

/// Shared flag checked between pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub file_name: String,
    pub pixels: PixelBuffer,
}

#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub signals: Signals,
    pub token_hits: Vec<TokenHit>,
    pub reasons: Vec<Reason>,
    pub verdict: Verdict,
    pub color: ColorStats,
    pub ela: ElaResult,
    pub edge_map: PixelBuffer,
}

#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub report: CompareReport,
    /// One-sided ELA difference at the working width.
    pub ela_diff: PixelBuffer,
}

impl CompareOutcome {
    pub fn working_size(&self) -> (u32, u32) {
        self.ela_diff.dimensions()
    }
}

pub struct DocumentAnalyzer {
    config: AnalysisConfig,
    decoder: Box<dyn Decoder>,
    reencoder: Box<dyn Reencoder>,
    ocr: Option<Box<dyn OcrProvider>>,
    progress: Option<Box<dyn ProgressSink>>,
    cancel: CancelToken,
}

impl DocumentAnalyzer {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            decoder: Box::new(RasterDecoder),
            reencoder: Box::new(JpegReencoder),
            ocr: None,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn with_reencoder(mut self, reencoder: impl Reencoder + 'static) -> Self {
        self.reencoder = Box::new(reencoder);
        self
    }

    pub fn with_ocr(mut self, ocr: impl OcrProvider + 'static) -> Self {
        self.ocr = Some(Box::new(ocr));
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn decode(&self, file_name: &str, bytes: &[u8]) -> Result<DecodedDocument> {
        let pixels = self.decoder.decode(bytes)?;
        debug!("decoded {} as {}x{}", file_name, pixels.width(), pixels.height());

        Ok(DecodedDocument {
            file_name: file_name.to_string(),
            pixels,
        })
    }

    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<DecodedDocument> {
        let bytes = std::fs::read(&path)?;
        let file_name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.decode(&file_name, &bytes)
    }

    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentAnalysis> {
        self.guarded(|| {
            self.step(Stage::Decoding, 5)?;
            let doc = self.open(path)?;
            self.analyze_decoded(&doc)
        })
    }

    pub fn analyze_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<DocumentAnalysis> {
        self.guarded(|| {
            self.step(Stage::Decoding, 5)?;
            let doc = self.decode(file_name, bytes)?;
            self.analyze_decoded(&doc)
        })
    }

    pub fn analyze(&self, doc: &DecodedDocument) -> Result<DocumentAnalysis> {
        self.guarded(|| self.analyze_decoded(doc))
    }

    pub fn compare_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        trusted: P,
        suspect: Q,
    ) -> Result<CompareOutcome> {
        self.guarded(|| {
            let trusted = self.open(trusted)?;
            self.checkpoint()?;
            let suspect = self.open(suspect)?;
            self.compare_decoded(&trusted, &suspect)
        })
    }

    pub fn compare(
        &self,
        trusted: &DecodedDocument,
        suspect: &DecodedDocument,
    ) -> Result<CompareOutcome> {
        self.guarded(|| self.compare_decoded(trusted, suspect))
    }

    fn analyze_decoded(&self, doc: &DecodedDocument) -> Result<DocumentAnalysis> {
        let image = &doc.pixels;
        info!("analyzing {} ({}x{})", doc.file_name, image.width(), image.height());
        self.step(Stage::Decoding, 15)?;

        if image.is_empty() {
            warn!("{} has no pixels, verdict is unknown", doc.file_name);
            return Ok(self.empty_analysis(doc));
        }

        let content_hash = content_hash(image)?;
        self.step(Stage::Hashing, 25)?;

        let fingerprint = Fingerprint::compute(image)?;
        self.step(Stage::Fingerprint, 35)?;

        let color = ColorStats::compute(image);
        self.step(Stage::ColorStats, 45)?;

        let ela = self.config.ela_analyzer().analyze(image, self.reencoder.as_ref())?;
        self.step(Stage::Ela, 60)?;

        let edge_map = EdgeDetector::new().analyze(image)?;
        self.step(Stage::EdgeMap, 70)?;

        let ocr_text = self.recognize(image, true);
        self.step(Stage::Ocr, 92)?;

        let token_hits = rules::token_hits(&ocr_text, &self.config.expected_tokens);
        let signals = Signals {
            file_name: doc.file_name.clone(),
            content_hash,
            fingerprint: fingerprint.to_hex(),
            mean_rgb: color.mean_rgb,
            ela_percent: ela.bright_percent,
            ocr_snippet: ocr_text
                .trim()
                .chars()
                .take(self.config.ocr_snippet_len)
                .collect(),
        };

        let reasons = rules::evaluate(&signals, &token_hits);
        let verdict = rules::select_verdict(signals.ela_percent, &reasons);
        self.step(Stage::Rules, 98)?;

        info!(
            "{}: {} (ELA {}%, {} reason(s))",
            doc.file_name,
            verdict.label,
            signals.ela_percent,
            reasons.len()
        );
        self.step(Stage::Complete, 100)?;

        Ok(DocumentAnalysis {
            signals,
            token_hits,
            reasons,
            verdict,
            color,
            ela,
            edge_map,
        })
    }

    fn compare_decoded(
        &self,
        trusted: &DecodedDocument,
        suspect: &DecodedDocument,
    ) -> Result<CompareOutcome> {
        let (t_img, s_img) = (&trusted.pixels, &suspect.pixels);
        if t_img.is_empty() || s_img.is_empty() {
            return Err(ForensicsError::InvalidParameter(
                "Cannot compare an image without pixels".into(),
            ));
        }
        info!("comparing {} against trusted {}", suspect.file_name, trusted.file_name);
        self.step(Stage::Decoding, 15)?;

        let t_identity = self.identity(trusted)?;
        let s_identity = self.identity(suspect)?;
        self.step(Stage::Fingerprint, 35)?;

        let width = t_img
            .width()
            .min(s_img.width())
            .min(self.config.max_compare_width);
        let t_small = resample_to_width(t_img, width)?;
        let s_small = resample_to_width(s_img, width)?;
        if t_small.height() != s_small.height() {
            warn!(
                "aspect ratios differ: {}x{} vs {}x{}, comparing shared rows only",
                width,
                t_small.height(),
                width,
                s_small.height()
            );
        }
        let pixel_diff_percent = pixel_diff_percent(&t_small, &s_small);
        self.step(Stage::PixelDiff, 45)?;

        let ela = self.config.ela_analyzer();
        let t_ela = ela.error_map(t_img, self.reencoder.as_ref())?;
        self.checkpoint()?;
        let s_ela = ela.error_map(s_img, self.reencoder.as_ref())?;
        let ela_diff = ela_diff_map(
            &resample_to_width(&t_ela, width)?,
            &resample_to_width(&s_ela, width)?,
        )?;

        let detector = HotspotDetector::new(self.config.hotspot_threshold, self.config.grid_size)?
            .with_parallel(self.config.parallel);
        let hotspot_boxes = detector.detect(&ela_diff);
        self.step(Stage::Hotspots, 60)?;

        let fingerprint_hamming = hamming_hex(&t_identity.fingerprint, &s_identity.fingerprint);
        let fingerprint_similarity = similarity_percent(fingerprint_hamming);

        let t_text = self.recognize(t_img, false);
        self.checkpoint()?;
        let s_text = self.recognize(s_img, false);
        let ocr_similarity = text::similarity_percent(&t_text, &s_text);
        self.step(Stage::Ocr, 90)?;

        debug!(
            "pixel diff {}%, hamming {}, {} hotspot(s) at {}x{}",
            pixel_diff_percent,
            fingerprint_hamming,
            hotspot_boxes.len(),
            ela_diff.width(),
            ela_diff.height()
        );

        let report = CompareReport {
            trusted: t_identity,
            suspect: s_identity,
            metrics: CompareMetrics {
                pixel_diff_percent,
                fingerprint_hamming,
                fingerprint_similarity,
                ocr_similarity,
                hotspot_boxes,
                threshold_used: detector.threshold(),
                grid_size: detector.grid_size(),
            },
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };
        self.step(Stage::Complete, 100)?;

        Ok(CompareOutcome { report, ela_diff })
    }

    fn identity(&self, doc: &DecodedDocument) -> Result<ImageIdentity> {
        let content_hash = content_hash(&doc.pixels)?;
        self.step(Stage::Hashing, 25)?;
        let fingerprint = Fingerprint::compute(&doc.pixels)?.to_hex();

        Ok(ImageIdentity {
            file_name: doc.file_name.clone(),
            content_hash,
            fingerprint,
        })
    }

    /// Missing or failing OCR yields empty text.
    fn recognize(&self, image: &PixelBuffer, report_progress: bool) -> String {
        let Some(ocr) = self.ocr.as_ref() else {
            return String::new();
        };

        let on_progress = |p: f32| {
            if report_progress {
                let percent = 70 + (p.clamp(0.0, 1.0) * 20.0).round() as u8;
                self.report(Stage::Ocr, percent);
            }
        };

        match ocr.recognize(image, &on_progress) {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR failed, continuing without text: {e}");
                String::new()
            }
        }
    }

    fn empty_analysis(&self, doc: &DecodedDocument) -> DocumentAnalysis {
        let empty = doc.pixels.clone();
        DocumentAnalysis {
            signals: Signals {
                file_name: doc.file_name.clone(),
                content_hash: String::new(),
                fingerprint: String::new(),
                mean_rgb: [0; 3],
                ela_percent: 0,
                ocr_snippet: String::new(),
            },
            token_hits: rules::token_hits("", &self.config.expected_tokens),
            reasons: Vec::new(),
            verdict: Verdict::unknown(),
            color: ColorStats { mean_rgb: [0; 3] },
            ela: ElaResult {
                map: empty.clone(),
                bright_percent: 0,
                max_level: 0,
                mean_level: 0.0,
            },
            edge_map: empty,
        }
    }

    fn guarded<T>(&self, run: impl FnOnce() -> Result<T>) -> Result<T> {
        let result = run();
        if let Err(ref e) = result {
            warn!("pipeline aborted: {e}");
            self.report(Stage::Failed, 0);
        }
        result
    }

    fn step(&self, stage: Stage, percent: u8) -> Result<()> {
        self.report(stage, percent);
        self.checkpoint()
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ForensicsError::Cancelled);
        }
        Ok(())
    }

    fn report(&self, stage: Stage, percent: u8) {
        if let Some(sink) = self.progress.as_ref() {
            sink.report(stage, percent);
        }
    }
}

impl Default for DocumentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_field_names() {
        let signals = Signals {
            file_name: "scan.png".to_string(),
            content_hash: "00".repeat(32),
            fingerprint: "ffffffffffffffff".to_string(),
            mean_rgb: [10, 20, 30],
            ela_percent: 3,
            ocr_snippet: String::new(),
        };
        let value = serde_json::to_value(&signals).unwrap();

        assert_eq!(value["meanRGB"], serde_json::json!([10, 20, 30]));
        assert!(value.get("meanRgb").is_none());
        assert_eq!(value["elaPercent"], 3);

        let back: Signals = serde_json::from_value(value).unwrap();
        assert_eq!(back, signals);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ela_quality, 90);
        assert_eq!(config.grid_size, 16);
        assert_eq!(config.expected_tokens.len(), 9);
    }

    #[test]
    fn test_config_ranges() {
        let bad = [
            AnalysisConfig { ela_quality: 0, ..Default::default() },
            AnalysisConfig { ela_quality: 101, ..Default::default() },
            AnalysisConfig { grid_size: 0, ..Default::default() },
            AnalysisConfig { hotspot_threshold: -0.5, ..Default::default() },
            AnalysisConfig { ela_amplification: 0.0, ..Default::default() },
            AnalysisConfig { max_compare_width: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(
                DocumentAnalyzer::new().with_config(config),
                Err(ForensicsError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let analyzer = DocumentAnalyzer::new().with_cancel_token(token.clone());
        token.cancel();
        assert!(analyzer.cancel_token().is_cancelled());
    }
}
