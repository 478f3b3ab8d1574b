//! Classifier — per-category confidence constants and the free-standing
//! compliance-keyword scan.
//!
//! Field-name classification itself is `PatternRegistry::classify`, which
//! walks the category table in precedence order (medical first). Confidence
//! is a static per-category constant, never derived from the value.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::patterns::DataCategory;

/// Confidence attached to a free compliance-keyword hit.
pub const FREE_KEYWORD_CONFIDENCE: f64 = 0.8;

/// Static confidence for a classified field. Secret/API is the most
/// reliable signal, compliance the least.
pub fn category_confidence(category: DataCategory) -> f64 {
    match category {
        DataCategory::SecretApi => 0.9,
        DataCategory::Personal => 0.85,
        DataCategory::Medical => 0.8,
        DataCategory::Infrastructure => 0.75,
        DataCategory::Compliance => 0.7,
    }
}

/// A free-standing compliance keyword occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceHit {
    pub keyword: String,
    pub span: (usize, usize),
    pub context: String,
}

/// Bytes of surrounding text inspected when deciding whether a keyword
/// occurrence is a real mention (vs a comment, literal, or declaration).
const CONTEXT_PAD: usize = 50;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Scan for compliance keywords outside field/value matching.
///
/// Occurrences inside comments, string literals, declaration or call
/// contexts, and unbalanced-quote windows are skipped; only the first valid
/// occurrence per keyword is reported.
pub fn scan_compliance_keywords(text: &str, keywords: &[String]) -> Vec<ComplianceHit> {
    let mut hits = Vec::new();
    for keyword in keywords {
        if WORD_RE.find(keyword).is_none() {
            continue;
        }
        let re = match Regex::new(&format!(r"(?i){}", regex::escape(keyword))) {
            Ok(re) => re,
            Err(_) => continue,
        };
        for m in re.find_iter(text) {
            let context = context_window(text, m.start(), m.end());
            if is_guarded_context(context) {
                continue;
            }
            hits.push(ComplianceHit {
                keyword: keyword.clone(),
                span: (m.start(), m.end()),
                context: context.to_string(),
            });
            break;
        }
    }
    hits
}

/// Whether the surrounding window marks the occurrence as not-a-mention.
fn is_guarded_context(context: &str) -> bool {
    let trimmed = context.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return true;
    }
    if context.contains("def ") || context.contains("function ") {
        return true;
    }
    if context.matches('"').count() % 2 == 1 || context.matches('\'').count() % 2 == 1 {
        return true;
    }
    if context.contains("\"\"\"") || context.contains("'''") {
        return true;
    }
    if context.contains('=') || context.contains('(') {
        return true;
    }
    false
}

/// A char-boundary-safe window of `CONTEXT_PAD` bytes around `[start, end)`.
pub(crate) fn context_window(text: &str, start: usize, end: usize) -> &str {
    let mut lo = start.saturating_sub(CONTEXT_PAD);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + CONTEXT_PAD).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keywords() -> Vec<String> {
        ["hipaa", "gdpr", "audit"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(
            category_confidence(DataCategory::SecretApi)
                > category_confidence(DataCategory::Personal)
        );
        assert!(
            category_confidence(DataCategory::Personal)
                > category_confidence(DataCategory::Medical)
        );
        assert!(
            category_confidence(DataCategory::Infrastructure)
                > category_confidence(DataCategory::Compliance)
        );
    }

    #[test]
    fn test_plain_mention_is_flagged() {
        let hits = scan_compliance_keywords("this release needs hipaa review\n", &keywords());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keyword, "hipaa");
    }

    #[test]
    fn test_comment_is_skipped() {
        let hits = scan_compliance_keywords("# hipaa note for reviewers\n", &keywords());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_declaration_context_is_skipped() {
        let hits = scan_compliance_keywords("mode = hipaa\n", &keywords());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_unbalanced_quote_context_is_skipped() {
        let hits = scan_compliance_keywords("\"hipaa and more text follows here\n", &keywords());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_only_first_valid_occurrence_per_keyword() {
        let text = "needs hipaa review\nand another hipaa mention\n";
        let hits = scan_compliance_keywords(text, &keywords());
        assert_eq!(hits.len(), 1);
        assert_eq!(&text[hits[0].span.0..hits[0].span.1], "hipaa");
    }

    #[test]
    fn test_case_insensitive_match() {
        let hits = scan_compliance_keywords("pending GDPR assessment\n", &keywords());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keyword, "gdpr");
    }
}
