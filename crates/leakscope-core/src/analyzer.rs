//! Two-tier counter, deduplicator, and the engine entry point.
//!
//! Tier 1 counts "potential" flags: distinct sensitive field names present
//! in the input, values ignored. Tier 2 emits "detected" flags: one per
//! potential name whose first (base or suffixed) occurrence carries a
//! non-empty value, plus value-shape and free compliance-keyword hits.
//! Detected can never exceed potential in a returned result: after value
//! deduplication, any remaining excess is truncated in discovery order and
//! logged as a warning. Callers always get a result.
//!
//! A TTL memo cache keyed by a content hash skips recomputation (and
//! re-logging) for identical repeated submissions. Expired entries are
//! evicted lazily on the next lookup for the same content.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::classify;
use crate::clock::{Clock, SystemClock};
use crate::extract;
use crate::patterns::{DataCategory, PatternRegistry};
use crate::risk::{RiskCalculator, RiskLevel, ScanMetrics};
use crate::session::{input_preview, LogRecord, SessionLog};

/// Default memo-cache lifetime, seconds.
pub const CACHE_TTL_SECS: i64 = 30;

/// One non-duplicate, non-empty detection. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedContent {
    /// The leaked value (or matched keyword) itself
    pub content: String,
    pub category: DataCategory,
    /// Static per-category confidence
    pub confidence: f64,
    /// Byte span in the scanned text
    pub position: (usize, usize),
    /// Surrounding declaration or text window
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-call analysis output: counts plus the risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub lines_of_code: u64,
    /// Distinct sensitive field names present (tier 1)
    pub potential_fields: u64,
    /// Flags with actual content (tier 2, post-repair)
    pub detected_data: u64,
    pub category_counts: BTreeMap<DataCategory, u64>,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

struct CacheEntry {
    stored_at: DateTime<Utc>,
    potential_fields: u64,
    flags: Vec<FlaggedContent>,
}

/// The detection engine. Synchronous; stateless between calls except for
/// the memo cache and the session log. Safe to share across threads.
pub struct LeakMonitor {
    registry: PatternRegistry,
    calculator: RiskCalculator,
    log: SessionLog,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    cache: Mutex<HashMap<u64, CacheEntry>>,
}

impl LeakMonitor {
    pub fn new(registry: PatternRegistry, log: SessionLog) -> Self {
        Self {
            registry,
            calculator: RiskCalculator::new(),
            log,
            clock: Arc::new(SystemClock),
            cache_ttl: Duration::seconds(CACHE_TTL_SECS),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the time source (deterministic cache-expiry tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.log
    }

    /// Scan `text`, returning the flag list. Fresh results are appended to
    /// the session log (one record per flag, or one no-flags activity
    /// record); cached results are returned without re-logging.
    pub fn scan(&self, text: &str, session_id: &str) -> Vec<FlaggedContent> {
        self.scan_counted(text, session_id).1
    }

    /// Scan plus the tier-1 potential count.
    pub fn scan_counted(&self, text: &str, session_id: &str) -> (u64, Vec<FlaggedContent>) {
        // Inputs that cannot plausibly contain code or structured data are
        // skipped entirely: no flags, no counts, no log record.
        if !looks_like_code(text) {
            return (0, Vec::new());
        }

        let key = fxhash::hash64(text.as_bytes());
        let now = self.clock.now();
        {
            let mut cache = self.cache.lock();
            let fresh = cache.get(&key).and_then(|entry| {
                (now - entry.stored_at < self.cache_ttl)
                    .then(|| (entry.potential_fields, entry.flags.clone()))
            });
            match fresh {
                Some(result) => {
                    tracing::debug!(key, "returning cached scan result");
                    return result;
                }
                // Lazy eviction: drop whatever stale entry sits under this key.
                None => {
                    cache.remove(&key);
                }
            }
        }

        let (potential_fields, flags) = self.scan_uncached(text, now);

        self.cache.lock().insert(
            key,
            CacheEntry {
                stored_at: now,
                potential_fields,
                flags: flags.clone(),
            },
        );

        self.log_scan(text, session_id, potential_fields, &flags, now);
        (potential_fields, flags)
    }

    /// Full per-call analysis: scan, count, and assess. An external score
    /// is adopted only when positive (§ risk calculator).
    pub fn analyze(
        &self,
        text: &str,
        session_id: &str,
        external_score: Option<u32>,
    ) -> AnalysisResult {
        let (potential_fields, flags) = self.scan_counted(text, session_id);

        let mut metrics = ScanMetrics {
            lines: count_code_lines(text),
            sensitive_fields: potential_fields,
            sensitive_data: flags.len() as u64,
            ..Default::default()
        };
        for flag in &flags {
            match flag.category {
                DataCategory::SecretApi => metrics.secret_api += 1,
                DataCategory::Personal => metrics.personal += 1,
                DataCategory::Medical => metrics.medical += 1,
                DataCategory::Infrastructure => metrics.infrastructure += 1,
                DataCategory::Compliance => metrics.compliance += 1,
            }
        }

        let assessment = self.calculator.assess(&metrics, external_score);
        let mut category_counts = BTreeMap::new();
        for category in DataCategory::ALL {
            let count = match category {
                DataCategory::SecretApi => metrics.secret_api,
                DataCategory::Personal => metrics.personal,
                DataCategory::Medical => metrics.medical,
                DataCategory::Infrastructure => metrics.infrastructure,
                DataCategory::Compliance => metrics.compliance,
            };
            category_counts.insert(category, count);
        }

        AnalysisResult {
            lines_of_code: metrics.lines,
            potential_fields,
            detected_data: flags.len() as u64,
            category_counts,
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            confidence: assessment.confidence,
            factors: assessment.factors,
            recommendations: assessment.recommendations,
        }
    }

    fn scan_uncached(&self, text: &str, now: DateTime<Utc>) -> (u64, Vec<FlaggedContent>) {
        let potential = self.registry.potential_names(text);
        let potential_fields = potential.len() as u64;

        let mut flags = Vec::new();
        let mut seen_values: HashSet<String> = HashSet::new();

        // Tier 2: first non-empty occurrence per potential name. Repeated
        // suffixed declarations of one base name yield at most one flag.
        for name in &potential {
            let Some(field) = extract::first_non_empty(text, name) else {
                continue;
            };
            if !seen_values.insert(field.value.to_lowercase()) {
                continue;
            }
            let category = self.registry.classify(name);
            flags.push(FlaggedContent {
                content: field.value.clone(),
                category,
                confidence: classify::category_confidence(category),
                position: field.span,
                context: format!("{} = {}", field.name, field.value),
                timestamp: now,
            });
        }

        // Value shapes: literal formats flagged regardless of field name.
        // A shape hit on a value already flagged above dedups away here.
        for hit in self.registry.value_shape_matches(text) {
            let content = text[hit.span.0..hit.span.1].to_string();
            if !seen_values.insert(content.to_lowercase()) {
                continue;
            }
            flags.push(FlaggedContent {
                content,
                category: hit.category,
                confidence: classify::category_confidence(hit.category),
                position: hit.span,
                context: classify::context_window(text, hit.span.0, hit.span.1).to_string(),
                timestamp: now,
            });
        }

        // Free compliance keywords keep their own seen-set.
        for hit in classify::scan_compliance_keywords(text, self.registry.compliance_keywords()) {
            flags.push(FlaggedContent {
                content: hit.keyword,
                category: DataCategory::Compliance,
                confidence: classify::FREE_KEYWORD_CONFIDENCE,
                position: hit.span,
                context: hit.context,
                timestamp: now,
            });
        }

        (potential_fields, enforce_invariant(flags, potential_fields))
    }

    /// Append the scan outcome to the session log. Write failures are
    /// recorded to the process log; the in-memory result stands regardless.
    fn log_scan(
        &self,
        text: &str,
        session_id: &str,
        potential_fields: u64,
        flags: &[FlaggedContent],
        now: DateTime<Utc>,
    ) {
        let preview = input_preview(text);
        if flags.is_empty() {
            let record = LogRecord::NoFlags {
                session_id: session_id.to_string(),
                timestamp: now,
                context: format!("Input length: {} characters", text.len()),
                input_preview: preview,
                potential_fields,
            };
            if let Err(e) = self.log.append(&record) {
                tracing::error!(session_id, error = %e, "failed to write session activity record");
            }
            return;
        }

        for flag in flags {
            let record = LogRecord::Flag {
                session_id: session_id.to_string(),
                timestamp: flag.timestamp,
                category: flag.category,
                content: flag.content.clone(),
                confidence: flag.confidence,
                position: flag.position,
                context: flag.context.clone(),
                input_preview: preview.clone(),
                potential_fields,
            };
            if let Err(e) = self.log.append(&record) {
                tracing::error!(session_id, error = %e, "failed to write flag record");
            }
        }
    }
}

/// Repair `detected > potential`: re-deduplicate by normalized value, then
/// truncate to the potential count in discovery order. Never an error.
fn enforce_invariant(flags: Vec<FlaggedContent>, potential: u64) -> Vec<FlaggedContent> {
    if flags.len() as u64 <= potential {
        return flags;
    }
    tracing::warn!(
        detected = flags.len(),
        potential,
        "detected flags exceed potential flags, deduplicating"
    );

    let mut seen = HashSet::new();
    let mut deduped: Vec<FlaggedContent> = flags
        .into_iter()
        .filter(|f| seen.insert(f.content.trim().to_lowercase()))
        .collect();

    if deduped.len() as u64 > potential {
        tracing::warn!(
            detected = deduped.len(),
            potential,
            "still above potential after dedup, truncating detected list"
        );
        deduped.truncate(potential as usize);
    }
    deduped
}

/// Non-empty, non-`#`-comment lines.
pub fn count_code_lines(text: &str) -> u64 {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .count() as u64
}

/// Conversational openers that mark an input as chat, not code.
const CHAT_OPENERS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "how are you",
    "thanks",
    "thank you",
    "good morning",
    "good afternoon",
    "good evening",
    "bye",
    "goodbye",
    "what",
    "how",
    "why",
    "when",
    "where",
    "who",
    "can you",
    "could you",
    "please",
    "help",
    "assist",
    "explain",
    "tell me",
    "show me",
    "analyze",
];

/// Substrings that mark an input as code-bearing.
const CODE_INDICATORS: &[&str] = &[
    "def ",
    "class ",
    "function",
    "import ",
    "from ",
    "return ",
    "if ",
    "for ",
    "while ",
    "try:",
    "except:",
    "with ",
    "api_key",
    "password",
    "secret",
    "token",
    "key",
    "database",
    "server",
    "host",
    "port",
    "url",
    "email",
    "phone",
    "address",
    "name",
    "ssn",
    "patient",
    "medical",
    "diagnosis",
    "prescription",
];

/// Line-start keywords counted as code structure.
const STRUCTURE_KEYWORDS: &[&str] = &[
    "def ", "class ", "import ", "from ", "if ", "for ", "while ", "try:", "except:", "with ",
];

/// Whether an input plausibly contains code or structured data. Chat
/// traffic is skipped so greetings never produce scan records.
pub fn looks_like_code(text: &str) -> bool {
    let lower = text.to_lowercase();
    let lower = lower.trim();
    if lower.len() < 10 {
        return false;
    }
    if CHAT_OPENERS.iter().any(|opener| lower.starts_with(opener)) {
        return false;
    }

    // JSON objects always qualify, however short.
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return true;
    }

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 5 {
        return false;
    }

    if CODE_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return true;
    }

    let indented = lines
        .iter()
        .filter(|line| line.starts_with("    ") || line.starts_with('\t'))
        .count();
    if indented > 2 {
        return true;
    }

    let structure = lines
        .iter()
        .filter(|line| {
            let start = line.trim_start();
            STRUCTURE_KEYWORDS.iter().any(|kw| start.starts_with(kw))
        })
        .count();
    structure >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;

    fn monitor(dir: &std::path::Path) -> LeakMonitor {
        LeakMonitor::new(PatternRegistry::with_defaults(), SessionLog::new(dir))
    }

    fn manual_monitor(dir: &std::path::Path) -> (LeakMonitor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let m = monitor(dir).with_clock(clock.clone());
        (m, clock)
    }

    /// Five lines, one secret declaration.
    const SECRET_SNIPPET: &str = "import os\n\napi_key = \"sk-1234567890abcdef1234567890abcdef\"\n\nprint(api_key)\n";

    #[test]
    fn test_secret_in_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let result = m.analyze(SECRET_SNIPPET, "s1", None);
        assert_eq!(result.potential_fields, 1);
        assert_eq!(result.detected_data, 1);
        assert_eq!(result.category_counts[&DataCategory::SecretApi], 1);

        let flags = m.scan(SECRET_SNIPPET, "s1");
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].category, DataCategory::SecretApi);
        assert_eq!(flags[0].content, "sk-1234567890abcdef1234567890abcdef");
    }

    #[test]
    fn test_empty_value_raises_potential_only() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let text = "import os\n\napi_key = \"\"\n\nprint(\"done\")\n";
        let result = m.analyze(text, "s1", None);
        assert_eq!(result.potential_fields, 1);
        assert_eq!(result.detected_data, 0);
    }

    #[test]
    fn test_ten_empty_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let text = concat!(
            "api_key = \"\"\n",
            "access_token = \"\"\n",
            "ssn = \"\"\n",
            "email = \"\"\n",
            "phone = \"\"\n",
            "dob = \"\"\n",
            "cvv = \"\"\n",
            "diagnosis = \"\"\n",
            "medication = \"\"\n",
            "allergy = \"\"\n",
        );
        let result = m.analyze(text, "s1", None);
        assert_eq!(result.potential_fields, 10);
        assert_eq!(result.detected_data, 0);
    }

    #[test]
    fn test_suffixed_repeats_count_once() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let text =
            "import os\n\nssn_1 = \"123-45-6789\"\nssn_2 = \"987-65-4321\"\n\nprint(\"ok\")\n";
        let (potential, flags) = m.scan_counted(text, "s1");
        assert_eq!(potential, 1);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].content, "123-45-6789");
    }

    #[test]
    fn test_detected_never_exceeds_potential() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        // A free compliance mention with zero declared fields: the lone
        // detection is repaired away.
        let text = "import os\nimport sys\nimport json\nneeds hipaa review\nimport re\n";
        let (potential, flags) = m.scan_counted(text, "s1");
        assert_eq!(potential, 0);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_overlapping_value_shape_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        // The field flag and the OpenAI-shape hit carry the same value.
        let (potential, flags) = m.scan_counted(SECRET_SNIPPET, "s1");
        assert_eq!(potential, 1);
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn test_classification_precedence_patient_ssn() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let text = "import os\n\npatient_ssn = \"123-45-6789\"\n\nprint(\"ok\")\n";
        let flags = m.scan(text, "s1");
        assert!(flags
            .iter()
            .any(|f| f.category == DataCategory::Medical && f.content == "123-45-6789"));
        assert!(!flags.iter().any(|f| f.category == DataCategory::Personal));
    }

    #[test]
    fn test_chat_input_is_skipped_without_logging() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        assert!(m.scan("hello there, how is it going today?", "s1").is_empty());
        assert!(m.scan("hi", "s1").is_empty());
        assert!(m.session_log().read_session("s1").unwrap().is_empty());
    }

    #[test]
    fn test_json_object_bypasses_line_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let flags = m.scan(r#"{"password": "hunter2"}"#, "s1");
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].content, "hunter2");
    }

    #[test]
    fn test_zero_flag_scan_writes_one_activity_record() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let text = "import os\n\napi_key = \"\"\n\nprint(\"done\")\n";
        m.scan(text, "s1");
        let records = m.session_log().read_session("s1").unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_flag());
        assert_eq!(records[0].potential_fields(), 1);
    }

    #[test]
    fn test_cache_hit_is_byte_identical_and_not_relogged() {
        let dir = tempfile::tempdir().unwrap();
        let (m, clock) = manual_monitor(dir.path());
        let first = m.scan(SECRET_SNIPPET, "s1");
        clock.advance(Duration::seconds(10));
        let second = m.scan(SECRET_SNIPPET, "s1");
        assert_eq!(first, second);

        let records = m.session_log().read_session("s1").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let (m, clock) = manual_monitor(dir.path());
        let first = m.scan(SECRET_SNIPPET, "s1");
        clock.advance(Duration::seconds(CACHE_TTL_SECS + 1));
        let second = m.scan(SECRET_SNIPPET, "s1");
        // Recomputed: fresh timestamps, and a second round of log records.
        assert_ne!(first[0].timestamp, second[0].timestamp);
        let records = m.session_log().read_session("s1").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_external_score_used_only_when_positive() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let with_external = m.analyze(SECRET_SNIPPET, "s1", Some(97));
        assert_eq!(with_external.risk_score, 97);
        assert_eq!(with_external.risk_level, RiskLevel::Critical);

        let with_zero = m.analyze(SECRET_SNIPPET, "s2", Some(0));
        let without = m.analyze(SECRET_SNIPPET, "s3", None);
        assert_eq!(with_zero.risk_score, without.risk_score);
    }

    #[test]
    fn test_risk_score_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let m = monitor(dir.path());
        let mut text = String::from("import os\n");
        for i in 0..40 {
            text.push_str(&format!("password_{i} = \"hunter{i}\"\n"));
        }
        let result = m.analyze(&text, "s1", None);
        assert!(result.risk_score <= 100);
        assert!(result.detected_data <= result.potential_fields);
    }

    #[test]
    fn test_count_code_lines_skips_blanks_and_comments() {
        let text = "# header\n\nx = 1\n  # indented comment\ny = 2\n";
        assert_eq!(count_code_lines(text), 2);
    }

    #[test]
    fn test_looks_like_code_gate() {
        assert!(!looks_like_code("hi"));
        assert!(!looks_like_code("thanks for the help yesterday"));
        assert!(!looks_like_code("one\ntwo\nthree"));
        // Too short even for the JSON shortcut.
        assert!(!looks_like_code("{\"k\": 1}"));
        assert!(looks_like_code("{\"key\": 12}"));
        assert!(looks_like_code(
            "import os\nimport sys\n\nx = 1\nprint(x)\n"
        ));
    }
}
