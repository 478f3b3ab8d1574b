//! Pattern registry — categorized field-name and value-shape matchers.
//!
//! One data-driven category table is the single source of truth for both
//! potential-field counting and name classification. Each category compiles
//! three matchers from its keyword list: a declaration form (`name =` /
//! `name:`), a quoted-key form (`"name"`), and an unanchored name probe used
//! by the classifier. Field-name matchers accept a numeric suffix
//! (`_1`..`_9` style repeats) so repeated same-kind fields are recognized.
//!
//! An external JSON config resource may override the keyword lists, value
//! shapes, and compliance keywords. A missing resource is not an error —
//! built-in defaults apply.

mod defaults;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sensitive-data category. Closed set; classification precedence is fixed
/// by [`DataCategory::CLASSIFY_ORDER`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    /// API keys, tokens, credentials
    SecretApi,
    /// Personal-identifying information
    Personal,
    /// Medical / health records
    Medical,
    /// Internal infrastructure details
    Infrastructure,
    /// Compliance / regulatory data
    Compliance,
}

impl DataCategory {
    /// All categories, in declaration order.
    pub const ALL: [DataCategory; 5] = [
        DataCategory::SecretApi,
        DataCategory::Personal,
        DataCategory::Medical,
        DataCategory::Infrastructure,
        DataCategory::Compliance,
    ];

    /// Classification precedence. Medical is checked first because several
    /// of its tokens (`patient_ssn`, `insurance_id`, ...) would otherwise be
    /// claimed by the personal set.
    pub const CLASSIFY_ORDER: [DataCategory; 5] = [
        DataCategory::Medical,
        DataCategory::Personal,
        DataCategory::SecretApi,
        DataCategory::Infrastructure,
        DataCategory::Compliance,
    ];

    /// Fallback category for field names no keyword set claims.
    pub const DEFAULT: DataCategory = DataCategory::Personal;

    /// Short display name
    pub fn display_name(&self) -> &'static str {
        match self {
            DataCategory::SecretApi => "secret/API",
            DataCategory::Personal => "personal",
            DataCategory::Medical => "medical",
            DataCategory::Infrastructure => "infrastructure",
            DataCategory::Compliance => "compliance",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Which family a pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Matches a field declaration token regardless of value
    FieldName,
    /// Matches a literal value format regardless of field name
    ValueShape,
}

/// A single compiled pattern in the registry
#[derive(Debug, Clone)]
pub struct PatternEntry {
    /// Category the pattern reports into
    pub category: DataCategory,
    /// Pattern family
    pub kind: PatternKind,
    /// Human-readable label (e.g. "AWS Access Key")
    pub label: String,
    /// Compiled matcher
    pub matcher: Regex,
}

/// A value-shape hit in scanned text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueShapeMatch {
    pub label: String,
    pub category: DataCategory,
    pub span: (usize, usize),
}

/// Per-category compiled field-name matchers
struct CategoryMatchers {
    category: DataCategory,
    /// `name =` / `name:` declaration form
    decl: Regex,
    /// `"name"` structured-object-key form
    quoted_key: Regex,
    /// Unanchored keyword probe against a bare field name
    name_probe: Regex,
}

/// External registry configuration resource (JSON). Every section is
/// optional; omitted sections keep their built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Per-category keyword-fragment overrides
    #[serde(default)]
    pub categories: BTreeMap<DataCategory, Vec<String>>,
    /// Value-shape overrides
    #[serde(default)]
    pub value_shapes: Vec<ValueShapeConfig>,
    /// Free-standing compliance keyword overrides
    #[serde(default)]
    pub compliance_keywords: Vec<String>,
}

/// One configured value-shape pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueShapeConfig {
    pub label: String,
    pub category: DataCategory,
    pub pattern: String,
}

/// Categorized field-name/value-shape matchers, compiled once.
pub struct PatternRegistry {
    field_matchers: Vec<CategoryMatchers>,
    value_shapes: Vec<PatternEntry>,
    compliance_keywords: Vec<String>,
}

impl PatternRegistry {
    /// Build the registry from built-in defaults.
    pub fn with_defaults() -> Self {
        Self::from_config(RegistryConfig::default())
    }

    /// Build the registry from a config, falling back to defaults for any
    /// section (or any category whose override fails to compile).
    pub fn from_config(config: RegistryConfig) -> Self {
        let mut field_matchers = Vec::with_capacity(DataCategory::ALL.len());
        // Compile in classification order so `classify` can walk the same
        // vector front to back.
        for category in DataCategory::CLASSIFY_ORDER {
            let fragments: Vec<String> = match config.categories.get(&category) {
                Some(custom) if !custom.is_empty() => custom.clone(),
                _ => default_fragments(category)
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            };
            match compile_category(category, &fragments) {
                Some(m) => field_matchers.push(m),
                None => {
                    tracing::warn!(
                        category = %category,
                        "configured keyword list failed to compile, using defaults"
                    );
                    let fallback: Vec<String> = default_fragments(category)
                        .iter()
                        .map(|s| s.to_string())
                        .collect();
                    // Built-in fragments are known-good.
                    field_matchers.push(
                        compile_category(category, &fallback)
                            .expect("built-in keyword table must compile"),
                    );
                }
            }
        }

        let value_shapes = if config.value_shapes.is_empty() {
            defaults::VALUE_SHAPES
                .iter()
                .map(|(label, category, pattern)| PatternEntry {
                    category: *category,
                    kind: PatternKind::ValueShape,
                    label: label.to_string(),
                    matcher: Regex::new(pattern).expect("built-in value shape must compile"),
                })
                .collect()
        } else {
            config
                .value_shapes
                .iter()
                .filter_map(|shape| match Regex::new(&shape.pattern) {
                    Ok(matcher) => Some(PatternEntry {
                        category: shape.category,
                        kind: PatternKind::ValueShape,
                        label: shape.label.clone(),
                        matcher,
                    }),
                    Err(e) => {
                        tracing::warn!(label = %shape.label, error = %e, "skipping invalid value shape");
                        None
                    }
                })
                .collect()
        };

        let compliance_keywords = if config.compliance_keywords.is_empty() {
            defaults::COMPLIANCE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            config
                .compliance_keywords
                .iter()
                .map(|s| s.to_lowercase())
                .collect()
        };

        Self {
            field_matchers,
            value_shapes,
            compliance_keywords,
        }
    }

    /// Load the registry from an optional config resource. A missing path is
    /// the normal no-config case and silently yields defaults; an unreadable
    /// or unparsable file is logged and also yields defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::with_defaults();
        };
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            // Absent config is the documented default path, not a fault.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::with_defaults(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable registry config, using defaults");
                return Self::with_defaults();
            }
        };
        match serde_json::from_str::<RegistryConfig>(&content) {
            Ok(config) => Self::from_config(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid registry config, using defaults");
                Self::with_defaults()
            }
        }
    }

    /// Tier-1 scan: the set of distinct sensitive base names declared in
    /// `text`, case-normalized, suffixes stripped. Values are ignored.
    pub fn potential_names(&self, text: &str) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for matchers in &self.field_matchers {
            for caps in matchers.decl.captures_iter(text) {
                if let Some(name) = caps.get(1) {
                    names.insert(name.as_str().to_lowercase());
                }
            }
            for caps in matchers.quoted_key.captures_iter(text) {
                if let Some(name) = caps.get(1) {
                    names.insert(name.as_str().to_lowercase());
                }
            }
        }
        names
    }

    /// Classify a field name: first category (in precedence order) whose
    /// keyword set matches anywhere in the name wins; unclaimed names fall
    /// to [`DataCategory::DEFAULT`].
    pub fn classify(&self, field_name: &str) -> DataCategory {
        let normalized = field_name.to_lowercase();
        for matchers in &self.field_matchers {
            if matchers.name_probe.is_match(&normalized) {
                return matchers.category;
            }
        }
        DataCategory::DEFAULT
    }

    /// Scan for literal value formats, independent of field names.
    pub fn value_shape_matches(&self, text: &str) -> Vec<ValueShapeMatch> {
        let mut hits = Vec::new();
        for entry in &self.value_shapes {
            for m in entry.matcher.find_iter(text) {
                hits.push(ValueShapeMatch {
                    label: entry.label.clone(),
                    category: entry.category,
                    span: (m.start(), m.end()),
                });
            }
        }
        hits
    }

    /// The compiled value-shape entries.
    pub fn value_shape_entries(&self) -> &[PatternEntry] {
        &self.value_shapes
    }

    /// Free-standing compliance keywords, lower-cased.
    pub fn compliance_keywords(&self) -> &[String] {
        &self.compliance_keywords
    }
}

fn default_fragments(category: DataCategory) -> &'static [&'static str] {
    match category {
        DataCategory::SecretApi => defaults::SECRET_FIELDS,
        DataCategory::Personal => defaults::PERSONAL_FIELDS,
        DataCategory::Medical => defaults::MEDICAL_FIELDS,
        DataCategory::Infrastructure => defaults::INFRASTRUCTURE_FIELDS,
        DataCategory::Compliance => defaults::COMPLIANCE_FIELDS,
    }
}

fn compile_category(category: DataCategory, fragments: &[String]) -> Option<CategoryMatchers> {
    let alternation = fragments.join("|");
    let decl = Regex::new(&format!(r"(?i)({alternation})(?:_\d+)?\s*[:=]")).ok()?;
    let quoted_key = Regex::new(&format!(r#"(?i)"({alternation})(?:_\d+)?""#)).ok()?;
    let name_probe = Regex::new(&format!(r"(?i)(?:{alternation})")).ok()?;
    Some(CategoryMatchers {
        category,
        decl,
        quoted_key,
        name_probe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_compile() {
        let registry = PatternRegistry::with_defaults();
        assert_eq!(registry.field_matchers.len(), 5);
        assert!(!registry.value_shape_entries().is_empty());
        assert!(!registry.compliance_keywords().is_empty());
    }

    #[test]
    fn test_potential_names_assignment_form() {
        let registry = PatternRegistry::with_defaults();
        let names = registry.potential_names(r#"api_key = "abc""#);
        assert!(names.contains("api_key"));
    }

    #[test]
    fn test_potential_names_strips_numeric_suffix() {
        let registry = PatternRegistry::with_defaults();
        let names = registry.potential_names("ssn_1 = \"123-45-6789\"\nssn_2 = \"987-65-4321\"\n");
        assert!(names.contains("ssn"));
        assert!(!names.contains("ssn_1"));
        assert!(!names.contains("ssn_2"));
    }

    #[test]
    fn test_potential_names_quoted_key_form() {
        let registry = PatternRegistry::with_defaults();
        let names = registry.potential_names(r#"{"password": "hunter2"}"#);
        assert!(names.contains("password"));
    }

    #[test]
    fn test_potential_names_case_normalized() {
        let registry = PatternRegistry::with_defaults();
        let names = registry.potential_names("API_KEY = \"x\"");
        assert!(names.contains("api_key"));
        assert!(!names.contains("API_KEY"));
    }

    #[test]
    fn test_classify_precedence_medical_before_personal() {
        let registry = PatternRegistry::with_defaults();
        assert_eq!(registry.classify("patient_ssn"), DataCategory::Medical);
        assert_eq!(registry.classify("ssn"), DataCategory::Personal);
    }

    #[test]
    fn test_classify_each_category() {
        let registry = PatternRegistry::with_defaults();
        assert_eq!(registry.classify("api_key"), DataCategory::SecretApi);
        assert_eq!(registry.classify("diagnosis"), DataCategory::Medical);
        assert_eq!(registry.classify("email"), DataCategory::Personal);
        assert_eq!(registry.classify("password"), DataCategory::Infrastructure);
        assert_eq!(registry.classify("regulatory"), DataCategory::Compliance);
    }

    #[test]
    fn test_classify_unknown_defaults_to_personal() {
        let registry = PatternRegistry::with_defaults();
        assert_eq!(registry.classify("frobnicator"), DataCategory::DEFAULT);
    }

    #[test]
    fn test_value_shapes_match_openai_key() {
        let registry = PatternRegistry::with_defaults();
        let hits =
            registry.value_shape_matches("key is sk-1234567890abcdef1234567890abcdef here");
        assert!(hits
            .iter()
            .any(|h| h.label == "OpenAI API Key" && h.category == DataCategory::SecretApi));
    }

    #[test]
    fn test_load_missing_path_yields_defaults() {
        let registry = PatternRegistry::load(Some(Path::new("/nonexistent/registry.json")));
        assert!(registry.potential_names("api_key = \"x\"").contains("api_key"));
    }

    #[test]
    fn test_config_override_category() {
        let json = r#"{
            "categories": { "secret_api": ["launch[_-]?code"] },
            "compliance_keywords": ["itar"]
        }"#;
        let config: RegistryConfig = serde_json::from_str(json).unwrap();
        let registry = PatternRegistry::from_config(config);
        assert!(registry
            .potential_names("launch_code = \"0000\"")
            .contains("launch_code"));
        assert_eq!(registry.classify("launch_code"), DataCategory::SecretApi);
        // The overridden secret list no longer knows api_key.
        assert!(registry.potential_names("api_key = \"x\"").is_empty());
        assert_eq!(registry.compliance_keywords(), ["itar"]);
    }

    #[test]
    fn test_invalid_config_category_falls_back() {
        let mut config = RegistryConfig::default();
        config
            .categories
            .insert(DataCategory::SecretApi, vec!["(unclosed".to_string()]);
        let registry = PatternRegistry::from_config(config);
        // Default secret list restored.
        assert!(registry.potential_names("api_key = \"x\"").contains("api_key"));
    }
}
