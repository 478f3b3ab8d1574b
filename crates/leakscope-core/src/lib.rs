//! Core library for leakscope: sensitive-data detection, classification,
//! and risk scoring over free-form source-code text.
//!
//! The engine is synchronous and embeds cleanly: feed it text plus opaque
//! session/user ids, get back flags and a bounded risk assessment. The only
//! state between calls is a TTL memo cache, the append-only session log,
//! and the whole-file score/profile stores.

use std::path::PathBuf;

pub mod analyzer;
pub mod classify;
pub mod clock;
pub mod error;
pub mod external;
pub mod extract;
pub mod patterns;
pub mod risk;
pub mod scoring;
pub mod session;

pub use analyzer::{AnalysisResult, FlaggedContent, LeakMonitor};
pub use clock::{Clock, SystemClock};
pub use error::{Error, Result};
pub use external::{parse_report, ExternalReport};
pub use extract::ExtractedField;
pub use patterns::{DataCategory, PatternRegistry, RegistryConfig};
pub use risk::{RiskAssessment, RiskCalculator, RiskLevel, ScanMetrics};
pub use scoring::{ScoreLevel, ScoringSystem, SessionScore, UserProfile};
pub use session::{LogRecord, SessionLog};

/// Default on-disk home for session logs and score/profile stores.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("leakscope")
}
