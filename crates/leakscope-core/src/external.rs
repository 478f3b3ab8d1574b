//! External analysis-report intake.
//!
//! A separate analysis path (typically a generative model) can hand the
//! engine a structured report. The payload is JSON, often wrapped in
//! markdown code fences. Parsing never fails: malformed JSON falls back to
//! per-field regex extraction over the raw text, and anything still missing
//! is zeroed. Counts are clamped to be non-negative and the reported risk
//! score to 0–100.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::risk::ScanMetrics;

/// A normalized external report: metrics plus the reporter's own risk
/// score. A zero score means "no opinion" (§ risk calculator).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalReport {
    pub metrics: ScanMetrics,
    pub risk_score: u32,
}

impl ExternalReport {
    /// The score to forward to the risk calculator: `Some` only when the
    /// reporter actually took a position.
    pub fn external_score(&self) -> Option<u32> {
        (self.risk_score > 0).then_some(self.risk_score)
    }
}

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*").unwrap());

/// Parse an external report from raw text. Never fails; degraded input
/// yields degraded (zeroed) metrics.
pub fn parse_report(text: &str) -> ExternalReport {
    let json_text = extract_json(text);
    match serde_json::from_str::<Value>(&json_text) {
        Ok(value) => from_value(&value),
        Err(e) => {
            tracing::warn!(error = %e, "malformed external report, falling back to regex extraction");
            fallback_parse(text)
        }
    }
}

/// Strip markdown fences and cut to the outermost `{...}` block.
fn extract_json(text: &str) -> String {
    let cleaned = FENCE_RE.replace_all(text, "");
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => cleaned[start..=end].to_string(),
        _ => cleaned.trim().to_string(),
    }
}

/// Pull recognized fields out of parsed JSON. Non-numeric values count as
/// absent, matching the regex fallback.
fn from_value(value: &Value) -> ExternalReport {
    let field = |name: &str| -> u64 {
        value
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0)
    };
    build_report(field)
}

/// Per-field regex extraction for reports that are not valid JSON.
fn fallback_parse(text: &str) -> ExternalReport {
    let field = |name: &str| -> u64 {
        let pattern = format!(r#""{name}":\s*(\d+)"#);
        Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    build_report(field)
}

fn build_report(field: impl Fn(&str) -> u64) -> ExternalReport {
    let metrics = ScanMetrics {
        lines: field("lines_of_code"),
        sensitive_fields: field("sensitive_fields"),
        sensitive_data: field("sensitive_data"),
        personal: field("pii_count"),
        healthcare: field("hepa_count"),
        medical: field("medical_count"),
        secret_api: field("compliance_api_count"),
        ..Default::default()
    };
    ExternalReport {
        metrics,
        risk_score: field("risk_score").min(100) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_clean_json() {
        let report = parse_report(
            r#"{"lines_of_code": 42, "sensitive_fields": 3, "sensitive_data": 2,
                "pii_count": 1, "medical_count": 1, "compliance_api_count": 0,
                "risk_score": 55}"#,
        );
        assert_eq!(report.metrics.lines, 42);
        assert_eq!(report.metrics.sensitive_fields, 3);
        assert_eq!(report.metrics.personal, 1);
        assert_eq!(report.metrics.medical, 1);
        assert_eq!(report.risk_score, 55);
        assert_eq!(report.external_score(), Some(55));
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here is the analysis:\n```json\n{\"lines_of_code\": 10, \"risk_score\": 20}\n```\n";
        let report = parse_report(text);
        assert_eq!(report.metrics.lines, 10);
        assert_eq!(report.risk_score, 20);
    }

    #[test]
    fn test_malformed_json_falls_back_to_regex() {
        // Trailing comma makes this invalid JSON, but the fields are present.
        let text = r#"{"lines_of_code": 7, "sensitive_fields": 2, "risk_score": 33,}"#;
        let report = parse_report(text);
        assert_eq!(report.metrics.lines, 7);
        assert_eq!(report.metrics.sensitive_fields, 2);
        assert_eq!(report.risk_score, 33);
    }

    #[test]
    fn test_garbage_yields_zeroed_defaults() {
        let report = parse_report("the model refused to answer");
        assert_eq!(report, ExternalReport::default());
        assert_eq!(report.external_score(), None);
    }

    #[test]
    fn test_non_numeric_field_is_zeroed() {
        let report = parse_report(r#"{"lines_of_code": "many", "risk_score": 10}"#);
        assert_eq!(report.metrics.lines, 0);
        assert_eq!(report.risk_score, 10);
    }

    #[test]
    fn test_risk_score_clamped() {
        let report = parse_report(r#"{"risk_score": 9000}"#);
        assert_eq!(report.risk_score, 100);
    }

    #[test]
    fn test_zero_score_is_no_opinion() {
        let report = parse_report(r#"{"lines_of_code": 5, "risk_score": 0}"#);
        assert_eq!(report.external_score(), None);
    }
}
