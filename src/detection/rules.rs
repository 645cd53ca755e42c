//! Fixed rule set turning single-image signals into reasons and a verdict.

use crate::{
    Signals,
    analysis::color::ColorStats,
    detection::{Reason, TokenHit, Verdict, VerdictLabel},
};

pub const ELA_HOTSPOT_PERCENT: u8 = 3;
pub const LIKELY_TAMPERED_PERCENT: u8 = 10;
pub const LOW_CONTRAST_CUTOFF: u8 = 40;

pub const DEFAULT_TOKENS: [&str; 9] = [
    "name",
    "certificate",
    "degree",
    "institution",
    "university",
    "date",
    "roll",
    "reg",
    "id",
];

pub const NEXT_STEPS: [&str; 3] = [
    "Request the original file from issuer and compare the SHA-256.",
    "If suspicious, ask for authenticated digital copy (signed PDF) or on-chain anchor.",
    "Provide a higher-quality scan (300 DPI) for better OCR & analysis.",
];

/// Case-insensitive substring search for each token, in list order.
pub fn token_hits<S: AsRef<str>>(text: &str, tokens: &[S]) -> Vec<TokenHit> {
    let haystack = text.to_lowercase();
    tokens
        .iter()
        .map(|t| TokenHit {
            token: t.as_ref().to_string(),
            found: haystack.contains(&t.as_ref().to_lowercase()),
        })
        .collect()
}

/// Rules run in a fixed order and each contributes at most one reason.
pub fn evaluate(signals: &Signals, hits: &[TokenHit]) -> Vec<Reason> {
    let mut reasons = Vec::new();

    if signals.ela_percent > ELA_HOTSPOT_PERCENT {
        reasons.push(Reason::new(
            "ELA hotspots",
            format!(
                "ELA shows {}% bright pixels, a sign of recompression or editing in localized regions.",
                signals.ela_percent
            ),
        ));
    }

    let color = ColorStats {
        mean_rgb: signals.mean_rgb,
    };
    if color.all_below(LOW_CONTRAST_CUTOFF) {
        reasons.push(Reason::new(
            "Low contrast",
            "Image is generally dark/low-contrast; OCR and some visual checks may be unreliable.",
        ));
    }

    if !hits.iter().any(|h| h.found) {
        reasons.push(Reason::new(
            "Missing expected text tokens",
            "Common words like 'Name', 'Certificate', or 'Institution' weren't found. OCR may have failed or text was altered.",
        ));
    }

    if !signals.fingerprint.is_empty() && signals.fingerprint.chars().all(|c| c == '0') {
        reasons.push(Reason::new(
            "Weak visual fingerprint",
            "Image has low variance after downsampling, so the fingerprint is not very informative.",
        ));
    }

    reasons
}

/// First match wins: the ELA threshold outranks the reason count.
pub fn select_verdict(ela_percent: u8, reasons: &[Reason]) -> Verdict {
    let label = if ela_percent >= LIKELY_TAMPERED_PERCENT {
        VerdictLabel::LikelyTampered
    } else if !reasons.is_empty() {
        VerdictLabel::Suspicious
    } else {
        VerdictLabel::NoObviousTampering
    };

    Verdict::from_label(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(ela_percent: u8, mean_rgb: [u8; 3], fingerprint: &str) -> Signals {
        Signals {
            file_name: "doc.png".into(),
            content_hash: "00".repeat(32),
            fingerprint: fingerprint.into(),
            mean_rgb,
            ela_percent,
            ocr_snippet: String::new(),
        }
    }

    fn found(text: &str) -> Vec<TokenHit> {
        token_hits(text, &DEFAULT_TOKENS)
    }

    fn titles(reasons: &[Reason]) -> Vec<&str> {
        reasons.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_token_hits_case_insensitive() {
        let hits = found("CERTIFICATE of Completion");
        assert_eq!(hits.len(), DEFAULT_TOKENS.len());
        assert!(hits.iter().find(|h| h.token == "certificate").unwrap().found);
        assert!(!hits.iter().find(|h| h.token == "degree").unwrap().found);
    }

    #[test]
    fn test_empty_text_finds_nothing() {
        assert!(found("").iter().all(|h| !h.found));
    }

    #[test]
    fn test_clean_document() {
        let s = signals(2, [200, 200, 200], "ff00ff00ff00ff00");
        let reasons = evaluate(&s, &found("Name: Jane"));
        assert!(reasons.is_empty());
        assert_eq!(
            select_verdict(s.ela_percent, &reasons).label,
            VerdictLabel::NoObviousTampering
        );
    }

    #[test]
    fn test_rule_order() {
        let s = signals(5, [10, 20, 39], "0000000000000000");
        let reasons = evaluate(&s, &found(""));
        assert_eq!(
            titles(&reasons),
            vec![
                "ELA hotspots",
                "Low contrast",
                "Missing expected text tokens",
                "Weak visual fingerprint"
            ]
        );
        assert!(reasons[0].detail.contains("5%"));
        assert_eq!(select_verdict(5, &reasons).label, VerdictLabel::Suspicious);
    }

    #[test]
    fn test_ela_boundaries() {
        let hits = found("degree");
        assert!(evaluate(&signals(3, [90, 90, 90], "ff"), &hits).is_empty());
        assert_eq!(
            titles(&evaluate(&signals(4, [90, 90, 90], "ff"), &hits)),
            vec!["ELA hotspots"]
        );
        assert_eq!(select_verdict(9, &[]).label, VerdictLabel::NoObviousTampering);
        assert_eq!(select_verdict(10, &[]).label, VerdictLabel::LikelyTampered);
    }

    #[test]
    fn test_threshold_overrides_reason_count() {
        let verdict = select_verdict(15, &[]);
        assert_eq!(verdict.label, VerdictLabel::LikelyTampered);
        assert_eq!(verdict.severity_color, "#ff5252");
    }

    #[test]
    fn test_low_contrast_needs_every_channel() {
        let hits = found("id");
        assert!(evaluate(&signals(0, [39, 39, 40], "ff"), &hits).is_empty());
    }
}
