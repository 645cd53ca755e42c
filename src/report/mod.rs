pub mod visualization;

use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    DocumentAnalysis, Signals,
    analysis::hotspot::HotspotBox,
    detection::{Reason, TokenHit, Verdict, rules::NEXT_STEPS},
    error::Result,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIdentity {
    pub file_name: String,
    pub content_hash: String,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareMetrics {
    pub pixel_diff_percent: u8,
    pub fingerprint_hamming: u32,
    pub fingerprint_similarity: u8,
    pub ocr_similarity: Option<u8>,
    pub hotspot_boxes: Vec<HotspotBox>,
    pub threshold_used: f64,
    pub grid_size: u32,
}

/// Result of comparing a trusted image against a suspect one. Raw metrics
/// only; interpreting them is up to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReport {
    pub trusted: ImageIdentity,
    pub suspect: ImageIdentity,
    pub metrics: CompareMetrics,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
}

impl CompareReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Serializable summary of a single-image analysis.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub verdict: Verdict,
    pub signals: Signals,
    pub token_hits: Vec<TokenHit>,
    pub reasons: Vec<Reason>,
    pub next_steps: Vec<String>,
}

impl From<&DocumentAnalysis> for AnalysisReport {
    fn from(analysis: &DocumentAnalysis) -> Self {
        Self {
            verdict: analysis.verdict.clone(),
            signals: analysis.signals.clone(),
            token_hits: analysis.token_hits.clone(),
            reasons: analysis.reasons.clone(),
            next_steps: NEXT_STEPS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Holder for the most recent comparison, for hosts that want one.
///
/// Writers race with last-writer-wins semantics: `publish` overwrites
/// unconditionally and hands back whatever it replaced, so a caller can
/// detect that another comparison landed first. Only completed reports
/// should be published.
#[derive(Debug, Default)]
pub struct ReportSlot {
    last: RwLock<Option<CompareReport>>,
}

impl ReportSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, report: CompareReport) -> Option<CompareReport> {
        self.last.write().replace(report)
    }

    pub fn latest(&self) -> Option<CompareReport> {
        self.last.read().clone()
    }

    pub fn take(&self) -> Option<CompareReport> {
        self.last.write().take()
    }

    /// Writes the latest report to `path`; returns `false` if there is none.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        match self.last.read().as_ref() {
            Some(report) => {
                report.save(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(pixel_diff: u8) -> CompareReport {
        let identity = |name: &str| ImageIdentity {
            file_name: name.into(),
            content_hash: "ab".repeat(32),
            fingerprint: "ffffffffffffffff".into(),
        };
        CompareReport {
            trusted: identity("trusted.png"),
            suspect: identity("suspect.png"),
            metrics: CompareMetrics {
                pixel_diff_percent: pixel_diff,
                fingerprint_hamming: 0,
                fingerprint_similarity: 100,
                ocr_similarity: None,
                hotspot_boxes: vec![HotspotBox { x: 16, y: 32, w: 16, h: 16 }],
                threshold_used: 30.0,
                grid_size: 16,
            },
            timestamp: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_json_field_names() {
        let value: serde_json::Value = serde_json::from_str(&report(3).to_json().unwrap()).unwrap();

        assert_eq!(value["trusted"]["fileName"], "trusted.png");
        assert!(value["suspect"]["contentHash"].is_string());
        assert_eq!(value["suspect"]["fingerprint"], "ffffffffffffffff");
        assert_eq!(value["metrics"]["pixelDiffPercent"], 3);
        assert_eq!(value["metrics"]["fingerprintHamming"], 0);
        assert_eq!(value["metrics"]["fingerprintSimilarity"], 100);
        assert!(value["metrics"]["ocrSimilarity"].is_null());
        assert_eq!(value["metrics"]["hotspotBoxes"][0]["y"], 32);
        assert_eq!(value["metrics"]["hotspotBoxes"][0]["w"], 16);
        assert_eq!(value["metrics"]["thresholdUsed"], 30.0);
        assert_eq!(value["metrics"]["gridSize"], 16);
        assert_eq!(value["timestamp"], "2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_slot_is_last_writer_wins() {
        let slot = ReportSlot::new();
        assert!(slot.latest().is_none());
        assert!(slot.publish(report(1)).is_none());

        let replaced = slot.publish(report(2)).unwrap();
        assert_eq!(replaced.metrics.pixel_diff_percent, 1);
        assert_eq!(slot.latest().unwrap().metrics.pixel_diff_percent, 2);

        assert!(slot.take().is_some());
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_export_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compare_report.json");
        let slot = ReportSlot::new();

        assert!(!slot.export(&path).unwrap());
        slot.publish(report(7));
        assert!(slot.export(&path).unwrap());

        let loaded = CompareReport::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report(7));
    }
}
