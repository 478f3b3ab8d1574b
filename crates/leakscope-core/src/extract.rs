//! Field/value extractor — locates field declarations across assignment,
//! structured-object-key, and mapping syntaxes.
//!
//! Only quoted literals count as values. A declaration whose literal is
//! empty (or whitespace) has *no* value: it can raise the potential count
//! but never produces a detection. Numeric-suffix probing is hard-capped at
//! [`MAX_NUMERIC_SUFFIX`]; a tenth suffixed occurrence of the same base
//! name is invisible to suffix enumeration.

use once_cell::sync::Lazy;
use regex::Regex;

/// Highest numeric suffix recognized on a repeated field (`name_1`..`name_9`).
pub const MAX_NUMERIC_SUFFIX: u32 = 9;

/// A field declaration found in scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedField {
    /// Field name, case-normalized (lower-cased), suffix retained
    pub name: String,
    /// Trimmed literal value; empty means "declared with no value"
    pub value: String,
    /// Byte span of the value literal in the source text
    pub span: (usize, usize),
}

impl ExtractedField {
    /// Whether the declaration carries an actual value
    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}

/// `name = "value"` / `name = 'value'`
static ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// `"name": "value"`
static QUOTED_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([A-Za-z_][A-Za-z0-9_-]*)"\s*:\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// `name: "value"` at line start (YAML-style mapping)
static MAPPING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*([A-Za-z_][A-Za-z0-9_-]*)\s*:\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Extract every field declaration in `text`, in source order.
pub fn extract(text: &str) -> Vec<ExtractedField> {
    let mut fields = Vec::new();
    for re in [&*ASSIGN_RE, &*QUOTED_KEY_RE, &*MAPPING_RE] {
        for caps in re.captures_iter(text) {
            if let Some(field) = field_from_captures(&caps) {
                fields.push(field);
            }
        }
    }
    fields.sort_by_key(|f| f.span.0);
    fields.dedup_by_key(|f| f.span.0);
    fields
}

/// All declarations of `base` (optionally `_1`..`_9` suffixed), in source
/// order, across all three syntaxes. Case-insensitive on the name.
pub fn occurrences(text: &str, base: &str) -> Vec<ExtractedField> {
    let esc = regex::escape(base);
    let sources = [
        format!(r#"(?i)({esc}(?:_[1-9])?)\s*=\s*(?:"([^"]*)"|'([^']*)')"#),
        format!(r#"(?i)"({esc}(?:_[1-9])?)"\s*:\s*(?:"([^"]*)"|'([^']*)')"#),
        format!(r#"(?im)^\s*({esc}(?:_[1-9])?)\s*:\s*(?:"([^"]*)"|'([^']*)')"#),
    ];

    let mut fields = Vec::new();
    for source in &sources {
        // The escaped base is interpolated into a known-good template.
        let re = match Regex::new(source) {
            Ok(re) => re,
            Err(_) => continue,
        };
        for caps in re.captures_iter(text) {
            if let Some(field) = field_from_captures(&caps) {
                fields.push(field);
            }
        }
    }
    fields.sort_by_key(|f| f.span.0);
    fields.dedup_by_key(|f| f.span.0);
    fields
}

/// Value of the exact field `name`, if declared with a non-empty literal.
/// Tries assignment, then object-key, then mapping form.
pub fn value_of(text: &str, name: &str) -> Option<String> {
    let esc = regex::escape(name);
    let sources = [
        format!(r#"(?i){esc}\s*=\s*(?:"([^"]*)"|'([^']*)')"#),
        format!(r#"(?i)"{esc}"\s*:\s*(?:"([^"]*)"|'([^']*)')"#),
        format!(r#"(?im)^\s*{esc}\s*:\s*(?:"([^"]*)"|'([^']*)')"#),
    ];
    for source in &sources {
        let re = Regex::new(source).ok()?;
        if let Some(caps) = re.captures(text) {
            let raw = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| clean_value(m.as_str()))
                .unwrap_or_default();
            if !raw.is_empty() {
                return Some(raw);
            }
        }
    }
    None
}

/// Probe `base`, then `base_1`..`base_9`, returning the first declaration
/// with a non-empty value.
pub fn first_non_empty(text: &str, base: &str) -> Option<ExtractedField> {
    occurrences(text, base).into_iter().find(|f| f.has_value())
}

/// Value of `base` or any of its capped numeric-suffix variants.
pub fn probe_suffixed(text: &str, base: &str) -> Option<String> {
    if let Some(value) = value_of(text, base) {
        return Some(value);
    }
    for suffix in 1..=MAX_NUMERIC_SUFFIX {
        if let Some(value) = value_of(text, &format!("{base}_{suffix}")) {
            return Some(value);
        }
    }
    None
}

fn field_from_captures(caps: &regex::Captures<'_>) -> Option<ExtractedField> {
    let name = caps.get(1)?;
    let value = caps.get(2).or_else(|| caps.get(3))?;
    Some(ExtractedField {
        name: name.as_str().to_lowercase(),
        value: clean_value(value.as_str()),
        span: (value.start(), value.end()),
    })
}

/// Trim a literal; quote-only placeholders (`""`, `''`) count as empty.
fn clean_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().all(|c| c == '"' || c == '\'') {
        String::new()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_assignment_form() {
        let fields = extract(r#"api_key = "sk-test-value""#);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "api_key");
        assert_eq!(fields[0].value, "sk-test-value");
    }

    #[test]
    fn test_extract_object_key_form() {
        let fields = extract(r#"{"password": "hunter2"}"#);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "password");
        assert_eq!(fields[0].value, "hunter2");
    }

    #[test]
    fn test_extract_mapping_form() {
        let fields = extract("hostname: \"db01.corp\"\n");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "hostname");
        assert_eq!(fields[0].value, "db01.corp");
    }

    #[test]
    fn test_extract_name_case_normalized() {
        let fields = extract(r#"API_KEY = "x""#);
        assert_eq!(fields[0].name, "api_key");
    }

    #[test]
    fn test_empty_literal_is_no_value() {
        let fields = extract(r#"api_key = """#);
        assert_eq!(fields.len(), 1);
        assert!(!fields[0].has_value());
        assert_eq!(value_of(r#"api_key = """#, "api_key"), None);
    }

    #[test]
    fn test_whitespace_literal_is_no_value() {
        assert_eq!(value_of(r#"token = "   ""#, "token"), None);
    }

    #[test]
    fn test_suffixed_values_independently_retrievable() {
        let text = "ssn_1 = \"123-45-6789\"\nssn_2 = \"987-65-4321\"\n";
        assert_eq!(value_of(text, "ssn_1").as_deref(), Some("123-45-6789"));
        assert_eq!(value_of(text, "ssn_2").as_deref(), Some("987-65-4321"));
    }

    #[test]
    fn test_occurrences_in_source_order() {
        let text = "ssn_1 = \"\"\nssn_2 = \"987-65-4321\"\n";
        let occ = occurrences(text, "ssn");
        assert_eq!(occ.len(), 2);
        assert_eq!(occ[0].name, "ssn_1");
        assert!(!occ[0].has_value());
        assert_eq!(occ[1].name, "ssn_2");
    }

    #[test]
    fn test_first_non_empty_skips_placeholders() {
        let text = "ssn_1 = \"\"\nssn_2 = \"987-65-4321\"\n";
        let field = first_non_empty(text, "ssn").unwrap();
        assert_eq!(field.name, "ssn_2");
        assert_eq!(field.value, "987-65-4321");
    }

    #[test]
    fn test_tenth_suffix_is_invisible() {
        let text = "ssn_10 = \"000-00-0000\"\n";
        assert!(occurrences(text, "ssn").is_empty());
        assert_eq!(probe_suffixed(text, "ssn"), None);
        // The exact name still resolves when asked for directly.
        assert_eq!(value_of(text, "ssn_10").as_deref(), Some("000-00-0000"));
    }

    #[test]
    fn test_probe_suffixed_prefers_bare_name() {
        let text = "token = \"aaa\"\ntoken_1 = \"bbb\"\n";
        assert_eq!(probe_suffixed(text, "token").as_deref(), Some("aaa"));
    }
}
