//! Built-in pattern tables used when no registry config resource is present.
//!
//! Keyword entries are regex fragments, not literals: `api[_-]?key` matches
//! `api_key`, `api-key`, and `apikey` is listed separately where the original
//! data sets treat it as its own token. Order matters — alternations are
//! compiled in list order and the regex engine prefers earlier branches, so
//! longer tokens must precede their prefixes (`hostname` before `host`).

use super::DataCategory;

/// Secret / API credential field names.
pub(crate) const SECRET_FIELDS: &[&str] = &[
    "api[_-]?key",
    "apikey",
    "access[_-]?token",
    "token",
    "secret[_-]?key",
    "secretkey",
    "bearer[_-]?token",
    "jwt[_-]?token",
    "oauth[_-]?token",
    "endpoint",
    "google",
    "stripe",
    "aws",
    "db[_-]?connection",
    "connection",
    "status",
];

/// Personal-identifying field names.
pub(crate) const PERSONAL_FIELDS: &[&str] = &[
    "ssn",
    "social[_-]?security",
    "credit[_-]?card",
    "cc",
    "email",
    "phone",
    "telephone",
    "address",
    "name",
    "first[_-]?name",
    "last[_-]?name",
    "full[_-]?name",
    "date[_-]?of[_-]?birth",
    "dob",
    "street",
    "city",
    "state",
    "zip[_-]?code",
    "number",
    "expiry",
    "cvv",
    "account[_-]?number",
    "routing[_-]?number",
    "account[_-]?holder",
    "tax[_-]?id",
    "filing[_-]?status",
];

/// Medical / health-record field names. Checked before the personal set
/// during classification: `patient_ssn` must land here, not in personal.
pub(crate) const MEDICAL_FIELDS: &[&str] = &[
    "patient[_-]?name",
    "patient[_-]?id",
    "medical[_-]?record[_-]?number",
    "medical[_-]?record",
    "medical[_-]?history",
    "diagnosis[_-]?code",
    "diagnosis",
    "illness",
    "disease",
    "prescription[_-]?id",
    "prescription",
    "medication",
    "allergy",
    "blood[_-]?type",
    "blood[_-]?pressure",
    "health[_-]?insurance",
    "insurance[_-]?id",
    "insurance[_-]?provider",
    "dosage",
    "prescribing[_-]?doctor",
    "pharmacy",
    "lab[_-]?order[_-]?id",
    "test[_-]?date",
    "glucose",
    "cholesterol",
    "weight",
    "height",
    "physician",
    "claim[_-]?number",
    "policy[_-]?number",
    "group[_-]?number",
    "procedure[_-]?code",
    "patient[_-]?ssn",
    "therapist",
    "session[_-]?date",
    "therapy[_-]?notes",
    "next[_-]?appointment",
    "emergency[_-]?contact",
    "encryption[_-]?key",
];

/// Internal-infrastructure field names.
pub(crate) const INFRASTRUCTURE_FIELDS: &[&str] = &[
    "hostname",
    "host",
    "internal[_-]?ip",
    "private[_-]?ip",
    "session[_-]?id",
    "sessionid",
    "database[_-]?password",
    "db[_-]?password",
    "server[_-]?password",
    "admin[_-]?password",
    "password",
    "username",
    "database",
    "user[_-]?service",
    "payment[_-]?service",
    "notification[_-]?service",
    "admin[_-]?panel",
    "server",
    "protocol",
    "ca[_-]?cert",
    "client[_-]?cert",
    "client[_-]?key",
    "shared[_-]?secret",
    "session[_-]?secret",
    "redis[_-]?session[_-]?store",
    "session[_-]?cookie[_-]?domain",
    "admin[_-]?session[_-]?key",
    "bind[_-]?password",
    "gateway",
    "api[_-]?server",
    "namespace",
    "service[_-]?account",
];

/// Compliance / regulatory field names.
pub(crate) const COMPLIANCE_FIELDS: &[&str] = &[
    "hipaa",
    "gdpr",
    "sox",
    "pci",
    "ferpa",
    "ccpa",
    "compliance[_-]?deadline",
    "compliance[_-]?status",
    "compliance",
    "audit[_-]?id",
    "audit[_-]?date",
    "auditor",
    "audit",
    "regulatory",
    "regulation",
    "treatment[_-]?plan",
    "last[_-]?visit",
    "data[_-]?subject",
    "data[_-]?processing[_-]?purpose",
    "retention[_-]?period",
    "data[_-]?controller",
    "data[_-]?protection[_-]?officer",
    "data[_-]?retention[_-]?policy",
    "dpo[_-]?contact",
    "cardholder[_-]?name",
    "card[_-]?number",
    "expiry[_-]?date",
    "billing[_-]?address",
    "transaction[_-]?id",
    "merchant[_-]?id",
    "terminal[_-]?id",
    "company[_-]?name",
    "fiscal[_-]?year",
    "quarter",
    "internal[_-]?controls",
    "student[_-]?name",
    "student[_-]?id",
    "parent[_-]?guardian",
    "math",
    "science",
    "english",
    "history",
    "attendance",
    "disciplinary[_-]?records",
    "consumer[_-]?name",
    "ip[_-]?address",
    "browser[_-]?fingerprint",
    "scope",
    "remediation[_-]?due[_-]?date",
    "requirement",
    "implementation[_-]?date",
    "penalties",
    "privacy[_-]?policy[_-]?url",
    "access[_-]?controls",
    "penetration[_-]?testing",
];

/// Free-standing compliance keywords scanned outside field/value matching.
pub(crate) const COMPLIANCE_KEYWORDS: &[&str] = &[
    "hipaa",
    "gdpr",
    "sox",
    "pci",
    "ferpa",
    "ccpa",
    "compliance",
    "audit",
    "regulatory",
];

/// Value-shape patterns: literal value formats flagged independently of any
/// field name. `(label, category, pattern)`.
pub(crate) const VALUE_SHAPES: &[(&str, DataCategory, &str)] = &[
    (
        "OpenAI API Key",
        DataCategory::SecretApi,
        r"sk-[a-zA-Z0-9]{20,}",
    ),
    (
        "Anthropic API Key",
        DataCategory::SecretApi,
        r"sk-ant-[a-zA-Z0-9_-]{20,}",
    ),
    (
        "GitHub Token",
        DataCategory::SecretApi,
        r"gh[pousr]_[a-zA-Z0-9]{36,}",
    ),
    (
        "AWS Access Key",
        DataCategory::SecretApi,
        r"AKIA[0-9A-Z]{16}",
    ),
    (
        "Google API Key",
        DataCategory::SecretApi,
        r"AIza[0-9A-Za-z_-]{35}",
    ),
    (
        "Slack Token",
        DataCategory::SecretApi,
        r"xox[baprs]-[0-9]{10,}-[0-9a-zA-Z]{10,}",
    ),
    (
        "Bearer Token",
        DataCategory::SecretApi,
        r"(?i)bearer\s+[a-zA-Z0-9_.-]{20,}",
    ),
    (
        "Private Key",
        DataCategory::SecretApi,
        r"-----BEGIN\s+(?:RSA\s+)?PRIVATE\s+KEY-----",
    ),
    (
        "Social Security Number",
        DataCategory::Personal,
        r"\b\d{3}-\d{2}-\d{4}\b",
    ),
    (
        "Credit Card Number",
        DataCategory::Personal,
        r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
    ),
    (
        "Email Address",
        DataCategory::Personal,
        r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b",
    ),
    (
        "Medical Record Number",
        DataCategory::Medical,
        r"(?i)\bmrn[-:#]?\s*\d{6,10}\b",
    ),
    (
        "Diagnosis Code",
        DataCategory::Medical,
        r"\b[A-TV-Z]\d{2}\.\d{1,3}\b",
    ),
    (
        "Private IPv4 Address",
        DataCategory::Infrastructure,
        r"\b(?:192\.168|10\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01]))\.\d{1,3}\.\d{1,3}\b",
    ),
    (
        "Internal Hostname",
        DataCategory::Infrastructure,
        r"\b[a-zA-Z0-9][a-zA-Z0-9-]*\.(?:internal|local|corp|lan)\b",
    ),
    (
        "Regulatory Framework Reference",
        DataCategory::Compliance,
        r"\b(?:HIPAA|GDPR|PCI[-\s]?DSS|SOX|FERPA|CCPA)\b",
    ),
];
