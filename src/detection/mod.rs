pub mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictLabel {
    Unknown,
    #[serde(rename = "Likely Tampered")]
    LikelyTampered,
    Suspicious,
    #[serde(rename = "No obvious tampering detected")]
    NoObviousTampering,
}

impl VerdictLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::Unknown => "Unknown",
            VerdictLabel::LikelyTampered => "Likely Tampered",
            VerdictLabel::Suspicious => "Suspicious",
            VerdictLabel::NoObviousTampering => "No obvious tampering detected",
        }
    }

    pub fn severity_color(&self) -> &'static str {
        match self {
            VerdictLabel::Unknown => "#ffb300",
            VerdictLabel::LikelyTampered => "#ff5252",
            VerdictLabel::Suspicious => "#ff8a00",
            VerdictLabel::NoObviousTampering => "#4caf50",
        }
    }

    fn explanation(&self) -> &'static str {
        match self {
            VerdictLabel::Unknown => "Insufficient signals",
            VerdictLabel::LikelyTampered => {
                "ELA detected widespread recompression/artifacts suggesting edits or pasted regions."
            }
            VerdictLabel::Suspicious => {
                "One or more signals indicate potential issues; manual review recommended."
            }
            VerdictLabel::NoObviousTampering => "Basic checks did not find strong signs of tampering.",
        }
    }
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub label: VerdictLabel,
    pub severity_color: String,
    pub explanation: String,
}

impl Verdict {
    pub fn from_label(label: VerdictLabel) -> Self {
        Self {
            label,
            severity_color: label.severity_color().into(),
            explanation: label.explanation().into(),
        }
    }

    /// Used when there is nothing to evaluate, e.g. a zero-area image.
    pub fn unknown() -> Self {
        Self::from_label(VerdictLabel::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub title: String,
    pub detail: String,
}

impl Reason {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHit {
    pub token: String,
    pub found: bool,
}
