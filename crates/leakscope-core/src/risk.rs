//! Risk calculator — turns scan counts into a bounded 0–100 assessment.
//!
//! An externally supplied risk score takes precedence when positive; a zero
//! external score is "no opinion" and falls through to the self-computed
//! path. The self-computed score combines field and data pressure, a
//! line-count normalization factor, and a capped category contribution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field-count weight in the base score
const FIELD_WEIGHT: f64 = 3.0;
/// Detected-data weight in the base score
const DATA_WEIGHT: f64 = 8.0;
/// Numerator of the line normalization factor
const LINE_NORM: f64 = 10.0;
/// Weight applied to the summed category contribution
const CATEGORY_WEIGHT: f64 = 5.0;
/// Cap on the field contribution
const FIELD_CAP: f64 = 50.0;
/// Cap on the data contribution
const DATA_CAP: f64 = 40.0;
/// Cap on the category contribution
const CATEGORY_CAP: f64 = 25.0;
/// Confidence reported when an external score is adopted
const EXTERNAL_CONFIDENCE: f64 = 0.95;

/// Five-band risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Band thresholds: 30 / 60 / 80 / 95
    pub fn from_score(score: u32) -> Self {
        if score >= 95 {
            RiskLevel::Critical
        } else if score >= 80 {
            RiskLevel::High
        } else if score >= 60 {
            RiskLevel::Medium
        } else if score >= 30 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Raw counts feeding the calculator. `healthcare` only arrives via
/// external reports; internal scans leave it zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub lines: u64,
    /// Potential flags: distinct sensitive field names present
    pub sensitive_fields: u64,
    /// Detected flags: fields with an actual non-empty value
    pub sensitive_data: u64,
    pub secret_api: u64,
    pub personal: u64,
    pub medical: u64,
    pub healthcare: u64,
    pub infrastructure: u64,
    pub compliance: u64,
}

impl ScanMetrics {
    /// Total per-category findings
    pub fn category_total(&self) -> u64 {
        self.secret_api
            + self.personal
            + self.medical
            + self.healthcare
            + self.infrastructure
            + self.compliance
    }
}

/// Output of the calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Direction of a score change between two assessments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskChange {
    Increased,
    Decreased,
    Unchanged,
}

/// Comparison of two assessments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskComparison {
    pub score_difference: i64,
    pub change: RiskChange,
    pub significant: bool,
    pub recommendations: Vec<String>,
}

/// Stateless scorer; construct once and reuse.
#[derive(Debug, Default, Clone)]
pub struct RiskCalculator;

impl RiskCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Produce an assessment from counts, preferring a positive external
    /// score when one is supplied.
    pub fn assess(&self, metrics: &ScanMetrics, external_score: Option<u32>) -> RiskAssessment {
        match external_score {
            Some(score) if score > 0 => {
                let risk_score = score.min(100);
                RiskAssessment {
                    risk_score,
                    risk_level: RiskLevel::from_score(risk_score),
                    confidence: EXTERNAL_CONFIDENCE,
                    factors: self.factors(metrics),
                    recommendations: self
                        .recommendations(RiskLevel::from_score(risk_score), metrics),
                }
            }
            _ => {
                let base = self.base_score(metrics);
                let category = self.category_score(metrics);
                let risk_score = ((base + category) as u32).min(100);
                let risk_level = RiskLevel::from_score(risk_score);
                RiskAssessment {
                    risk_score,
                    risk_level,
                    confidence: self.confidence(metrics),
                    factors: self.factors(metrics),
                    recommendations: self.recommendations(risk_level, metrics),
                }
            }
        }
    }

    /// Field and data pressure, normalized by submission size.
    fn base_score(&self, metrics: &ScanMetrics) -> f64 {
        if metrics.lines == 0 {
            return 0.0;
        }
        let field_risk = (metrics.sensitive_fields as f64 * FIELD_WEIGHT).min(FIELD_CAP);
        let data_risk = (metrics.sensitive_data as f64 * DATA_WEIGHT).min(DATA_CAP);
        let line_factor = (LINE_NORM / (metrics.lines.max(1) as f64)).clamp(0.1, 1.0);
        (field_risk + data_risk) * line_factor
    }

    /// Capped weighted sum of category counts.
    fn category_score(&self, metrics: &ScanMetrics) -> f64 {
        let weighted = metrics.medical as f64 * 1.2
            + metrics.healthcare as f64 * 1.1
            + metrics.personal as f64 * 1.0
            + metrics.secret_api as f64 * 0.9
            + metrics.compliance as f64 * 0.9
            + metrics.infrastructure as f64 * 0.9;
        (weighted * CATEGORY_WEIGHT).min(CATEGORY_CAP)
    }

    /// Confidence in a self-computed assessment: grows with submission size
    /// and finding count, capped at 1.0.
    fn confidence(&self, metrics: &ScanMetrics) -> f64 {
        if metrics.lines == 0 {
            return 0.0;
        }
        let line_factor = (metrics.lines as f64 / 20.0).min(1.0);
        let detail_factor =
            ((metrics.sensitive_fields + metrics.sensitive_data) as f64 / 10.0).min(1.0);
        (0.5 + line_factor * 0.3 + detail_factor * 0.2).min(1.0)
    }

    fn factors(&self, metrics: &ScanMetrics) -> Vec<String> {
        let mut factors = Vec::new();

        if metrics.lines > 100 {
            factors.push("Large codebase increases complexity".to_string());
        } else if metrics.lines < 10 {
            factors.push("Small code snippet limits analysis depth".to_string());
        }

        if metrics.sensitive_fields > 5 {
            factors.push(format!(
                "Many sensitive fields ({}) indicate high-risk practices",
                metrics.sensitive_fields
            ));
        } else if metrics.sensitive_fields > 0 {
            factors.push(format!(
                "Sensitive fields present ({})",
                metrics.sensitive_fields
            ));
        }

        if metrics.sensitive_data > 5 {
            factors.push(format!(
                "Multiple sensitive data instances ({}) detected",
                metrics.sensitive_data
            ));
        } else if metrics.sensitive_data > 0 {
            factors.push(format!(
                "Sensitive data instances present ({})",
                metrics.sensitive_data
            ));
        }

        for (label, count) in [
            ("secret/API", metrics.secret_api),
            ("personal", metrics.personal),
            ("medical", metrics.medical),
            ("healthcare", metrics.healthcare),
            ("infrastructure", metrics.infrastructure),
            ("compliance", metrics.compliance),
        ] {
            if count > 3 {
                factors.push(format!("High {label} exposure rate ({count} instances)"));
            } else if count > 0 {
                factors.push(format!("{label} data detected ({count} instances)"));
            }
        }

        if factors.is_empty() {
            factors.push("No significant risk factors identified".to_string());
        }
        factors
    }

    fn recommendations(&self, level: RiskLevel, metrics: &ScanMetrics) -> Vec<String> {
        let mut recs: Vec<String> = match level {
            RiskLevel::Critical => vec![
                "IMMEDIATE ACTION REQUIRED: critical security exposure detected",
                "Review and remove all hardcoded sensitive data",
                "Implement proper secrets management",
                "Consider code review and security audit",
            ],
            RiskLevel::High => vec![
                "HIGH PRIORITY: significant security risks detected",
                "Replace hardcoded credentials with environment variables",
                "Implement proper data classification",
                "Review data handling practices",
            ],
            RiskLevel::Medium => vec![
                "MEDIUM RISK: some security concerns identified",
                "Review sensitive data handling",
                "Consider input validation improvements",
                "Update security documentation",
            ],
            RiskLevel::Low => vec![
                "LOW RISK: minor security improvements needed",
                "Continue following security best practices",
                "Regular security reviews recommended",
            ],
            RiskLevel::Minimal => vec![
                "MINIMAL RISK: good security practices observed",
                "Continue current security approach",
                "Maintain regular security monitoring",
            ],
        }
        .into_iter()
        .map(String::from)
        .collect();

        if metrics.secret_api > 0 {
            recs.push("Review API credential handling and secret storage".to_string());
        }
        if metrics.personal > 0 {
            recs.push("Consider PII protection measures and consent requirements".to_string());
        }
        if metrics.medical > 0 {
            recs.push("Ensure HIPAA-grade handling for medical data".to_string());
        }
        if metrics.healthcare > 0 {
            recs.push("Verify healthcare data sharing agreements".to_string());
        }
        if metrics.infrastructure > 0 {
            recs.push("Keep internal infrastructure details out of shared code".to_string());
        }
        if metrics.compliance > 0 {
            recs.push("Check regulatory obligations before distributing this content".to_string());
        }
        recs
    }

    /// Diff two assessments (current vs previous).
    pub fn compare(&self, current: &RiskAssessment, previous: &RiskAssessment) -> RiskComparison {
        let delta = current.risk_score as i64 - previous.risk_score as i64;
        let change = match delta {
            d if d > 0 => RiskChange::Increased,
            d if d < 0 => RiskChange::Decreased,
            _ => RiskChange::Unchanged,
        };
        let mut recommendations = Vec::new();
        if delta > 10 {
            recommendations
                .push("Significant risk increase detected - review recent changes".to_string());
        } else if delta > 0 {
            recommendations.push("Minor risk increase - monitor trends".to_string());
        } else if delta < -10 {
            recommendations.push(
                "Significant risk improvement detected - continue good practices".to_string(),
            );
        } else if delta < 0 {
            recommendations.push("Minor risk improvement - maintain current approach".to_string());
        }
        RiskComparison {
            score_difference: delta,
            change,
            significant: delta.abs() > 10,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metrics(lines: u64, fields: u64, data: u64) -> ScanMetrics {
        ScanMetrics {
            lines,
            sensitive_fields: fields,
            sensitive_data: data,
            ..Default::default()
        }
    }

    #[test]
    fn test_score_bounded_for_extreme_counts() {
        let calc = RiskCalculator::new();
        let mut m = metrics(1, 10_000, 10_000);
        m.medical = 10_000;
        m.secret_api = 10_000;
        let assessment = calc.assess(&m, None);
        assert!(assessment.risk_score <= 100);
    }

    #[test]
    fn test_zero_metrics_scores_zero() {
        let calc = RiskCalculator::new();
        let assessment = calc.assess(&ScanMetrics::default(), None);
        assert_eq!(assessment.risk_score, 0);
        assert_eq!(assessment.risk_level, RiskLevel::Minimal);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn test_level_bands() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(95), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }

    #[test]
    fn test_positive_external_score_overrides() {
        let calc = RiskCalculator::new();
        let assessment = calc.assess(&metrics(5, 1, 1), Some(97));
        assert_eq!(assessment.risk_score, 97);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.confidence, EXTERNAL_CONFIDENCE);
    }

    #[test]
    fn test_zero_external_score_falls_through() {
        let calc = RiskCalculator::new();
        let with_zero = calc.assess(&metrics(5, 1, 1), Some(0));
        let without = calc.assess(&metrics(5, 1, 1), None);
        assert_eq!(with_zero.risk_score, without.risk_score);
        assert_eq!(with_zero.confidence, without.confidence);
    }

    #[test]
    fn test_external_score_clamped_to_100() {
        let calc = RiskCalculator::new();
        let assessment = calc.assess(&metrics(5, 1, 1), Some(250));
        assert_eq!(assessment.risk_score, 100);
    }

    #[test]
    fn test_line_factor_dilutes_large_submissions() {
        let calc = RiskCalculator::new();
        let small = calc.assess(&metrics(5, 3, 2), None);
        let large = calc.assess(&metrics(500, 3, 2), None);
        assert!(small.risk_score > large.risk_score);
    }

    #[test]
    fn test_medical_weighs_more_than_secret() {
        let calc = RiskCalculator::new();
        let mut medical = metrics(10, 2, 2);
        medical.medical = 2;
        let mut secret = metrics(10, 2, 2);
        secret.secret_api = 2;
        assert!(
            calc.assess(&medical, None).risk_score >= calc.assess(&secret, None).risk_score
        );
    }

    #[test]
    fn test_confidence_capped_at_one() {
        let calc = RiskCalculator::new();
        let assessment = calc.assess(&metrics(10_000, 50, 50), None);
        assert!(assessment.confidence <= 1.0);
    }

    #[test]
    fn test_category_recommendations_added() {
        let calc = RiskCalculator::new();
        let mut m = metrics(10, 1, 1);
        m.medical = 1;
        let assessment = calc.assess(&m, None);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r.contains("HIPAA")));
    }

    #[test]
    fn test_compare_direction_and_significance() {
        let calc = RiskCalculator::new();
        let low = calc.assess(&metrics(100, 0, 0), None);
        let mut m = metrics(5, 8, 5);
        m.secret_api = 5;
        let high = calc.assess(&m, None);
        let cmp = calc.compare(&high, &low);
        assert_eq!(cmp.change, RiskChange::Increased);
        assert!(cmp.significant);
        let same = calc.compare(&low, &low);
        assert_eq!(same.change, RiskChange::Unchanged);
        assert!(!same.significant);
    }
}
