//! Session scoring and per-user profiles.
//!
//! A session score starts at 100 and loses `penalty × confidence` per
//! flag, floored at 0. Profiles aggregate a user's sessions: best/worst,
//! running average, per-category flag history, and an improvement trend.
//! Scores and profiles are persisted whole-file (temp file + rename) and
//! reloaded on construction; corrupt files are logged and treated as
//! empty. Save failures never discard the in-memory result.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::patterns::DataCategory;
use crate::session::LogRecord;

/// Every session starts from this.
pub const BASE_SCORE: f64 = 100.0;

/// Sessions required before a user appears on the leaderboard.
pub const LEADERBOARD_MIN_SESSIONS: u64 = 3;

/// Points lost per flag of a category, scaled by the flag's confidence.
pub fn category_penalty(category: DataCategory) -> f64 {
    match category {
        DataCategory::SecretApi => 15.0,
        DataCategory::Personal => 12.0,
        DataCategory::Medical => 10.0,
        DataCategory::Infrastructure => 8.0,
        DataCategory::Compliance => 5.0,
    }
}

/// Coarse session-score bands
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ScoreLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl ScoreLevel {
    /// Bands at 90 / 80 / 70 / 60.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ScoreLevel::Excellent
        } else if score >= 80.0 {
            ScoreLevel::Good
        } else if score >= 70.0 {
            ScoreLevel::Fair
        } else if score >= 60.0 {
            ScoreLevel::Poor
        } else {
            ScoreLevel::Critical
        }
    }
}

/// A closed session's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScore {
    pub session_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_flags: u64,
    pub score: f64,
    pub flag_breakdown: BTreeMap<DataCategory, u64>,
    pub confidence_scores: Vec<f64>,
    pub improvement_areas: Vec<String>,
}

impl SessionScore {
    pub fn level(&self) -> ScoreLevel {
        ScoreLevel::from_score(self.score)
    }
}

/// A user's aggregate across sessions. Persisted whole-file; survives
/// process restarts via reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub total_sessions: u64,
    pub average_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub total_flags: u64,
    pub flag_history: BTreeMap<DataCategory, u64>,
    pub improvement_trend: f64,
    pub last_session_date: DateTime<Utc>,
}

impl UserProfile {
    fn new(user_id: &str, first_session: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_sessions: 0,
            average_score: 0.0,
            best_score: 0.0,
            worst_score: BASE_SCORE,
            total_flags: 0,
            flag_history: BTreeMap::new(),
            improvement_trend: 0.0,
            last_session_date: first_session,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub average_score: f64,
    pub total_sessions: u64,
    pub best_score: f64,
    pub improvement_trend: f64,
}

/// Aggregate statistics across all recorded sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_sessions: u64,
    pub total_users: u64,
    pub average_score: f64,
    pub score_distribution: BTreeMap<ScoreLevel, u64>,
    pub most_common_categories: Vec<(DataCategory, u64)>,
    pub best_overall_score: f64,
    pub worst_overall_score: f64,
}

#[derive(Default)]
struct Store {
    scores: Vec<SessionScore>,
    profiles: BTreeMap<String, UserProfile>,
}

/// Scoring engine plus its whole-file stores.
pub struct ScoringSystem {
    scores_path: PathBuf,
    profiles_path: PathBuf,
    clock: Arc<dyn Clock>,
    store: Mutex<Store>,
}

impl ScoringSystem {
    /// Open (or create) the score and profile stores under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let scores_path = dir.join("session_scores.json");
        let profiles_path = dir.join("user_profiles.json");
        let store = Store {
            scores: load_or_default(&scores_path),
            profiles: load_or_default(&profiles_path),
        };
        Self {
            scores_path,
            profiles_path,
            clock: Arc::new(SystemClock),
            store: Mutex::new(store),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Close a session: score its log records, persist the score, and fold
    /// it into the user's profile. Only flag records cost points; activity
    /// records still anchor the session's time span.
    pub fn score_session(
        &self,
        session_id: &str,
        user_id: &str,
        records: &[LogRecord],
    ) -> SessionScore {
        let now = self.clock.now();
        let start_time = records.first().map(LogRecord::timestamp).unwrap_or(now);
        let end_time = records.last().map(LogRecord::timestamp).unwrap_or(now);

        let mut score = BASE_SCORE;
        let mut flag_breakdown: BTreeMap<DataCategory, u64> = BTreeMap::new();
        let mut confidence_scores = Vec::new();

        for record in records {
            let LogRecord::Flag {
                category,
                confidence,
                ..
            } = record
            else {
                continue;
            };
            *flag_breakdown.entry(*category).or_insert(0) += 1;
            score -= category_penalty(*category) * confidence;
            confidence_scores.push(*confidence);
        }
        let score = score.max(0.0);

        let session_score = SessionScore {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            start_time,
            end_time,
            total_flags: confidence_scores.len() as u64,
            score,
            improvement_areas: improvement_areas(&flag_breakdown),
            flag_breakdown,
            confidence_scores,
        };

        let mut store = self.store.lock();
        store.scores.push(session_score.clone());
        update_profile(&mut store, &session_score);

        // Persist both stores; failures degrade to a process-log error.
        if let Err(e) = save(&self.scores_path, &store.scores) {
            tracing::error!(path = %self.scores_path.display(), error = %e, "failed to save session scores");
        }
        if let Err(e) = save(&self.profiles_path, &store.profiles) {
            tracing::error!(path = %self.profiles_path.display(), error = %e, "failed to save user profiles");
        }

        session_score
    }

    pub fn user_profile(&self, user_id: &str) -> Option<UserProfile> {
        self.store.lock().profiles.get(user_id).cloned()
    }

    pub fn user_scores(&self, user_id: &str) -> Vec<SessionScore> {
        self.store
            .lock()
            .scores
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Users with at least [`LEADERBOARD_MIN_SESSIONS`] sessions, best
    /// average first.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let store = self.store.lock();
        let mut rows: Vec<LeaderboardEntry> = store
            .profiles
            .values()
            .filter(|p| p.total_sessions >= LEADERBOARD_MIN_SESSIONS)
            .map(|p| LeaderboardEntry {
                user_id: p.user_id.clone(),
                average_score: p.average_score,
                total_sessions: p.total_sessions,
                best_score: p.best_score,
                improvement_trend: p.improvement_trend,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.average_score
                .partial_cmp(&a.average_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows.truncate(limit);
        rows
    }

    /// Aggregate statistics across every recorded session.
    pub fn statistics(&self) -> Statistics {
        let store = self.store.lock();
        if store.scores.is_empty() {
            return Statistics::default();
        }

        let total_sessions = store.scores.len() as u64;
        let average_score =
            store.scores.iter().map(|s| s.score).sum::<f64>() / total_sessions as f64;

        let mut score_distribution: BTreeMap<ScoreLevel, u64> = BTreeMap::new();
        let mut category_totals: BTreeMap<DataCategory, u64> = BTreeMap::new();
        for session in &store.scores {
            *score_distribution.entry(session.level()).or_insert(0) += 1;
            for (category, count) in &session.flag_breakdown {
                *category_totals.entry(*category).or_insert(0) += count;
            }
        }
        let mut most_common_categories: Vec<(DataCategory, u64)> =
            category_totals.into_iter().collect();
        most_common_categories.sort_by(|a, b| b.1.cmp(&a.1));
        most_common_categories.truncate(5);

        Statistics {
            total_sessions,
            total_users: store.profiles.len() as u64,
            average_score,
            score_distribution,
            most_common_categories,
            best_overall_score: store.scores.iter().map(|s| s.score).fold(0.0, f64::max),
            worst_overall_score: store
                .scores
                .iter()
                .map(|s| s.score)
                .fold(BASE_SCORE, f64::min),
        }
    }
}

/// Fold a freshly scored session into its user's profile.
fn update_profile(store: &mut Store, session: &SessionScore) {
    let profile = store
        .profiles
        .entry(session.user_id.clone())
        .or_insert_with(|| UserProfile::new(&session.user_id, session.start_time));

    profile.total_sessions += 1;
    profile.total_flags += session.total_flags;
    profile.last_session_date = session.start_time;
    profile.best_score = profile.best_score.max(session.score);
    profile.worst_score = profile.worst_score.min(session.score);
    for (category, count) in &session.flag_breakdown {
        *profile.flag_history.entry(*category).or_insert(0) += count;
    }

    let user_scores: Vec<f64> = store
        .scores
        .iter()
        .filter(|s| s.user_id == session.user_id)
        .map(|s| s.score)
        .collect();
    profile.average_score = user_scores.iter().sum::<f64>() / user_scores.len() as f64;
    profile.improvement_trend = improvement_trend(&user_scores);
}

/// Mean of the last (up to) three session scores minus the mean of all
/// earlier ones. Zero until there is history to compare against.
fn improvement_trend(scores: &[f64]) -> f64 {
    if scores.len() <= 3 {
        return 0.0;
    }
    let recent = scores[scores.len() - 3..].iter().sum::<f64>() / 3.0;
    let older = &scores[..scores.len() - 3];
    recent - older.iter().sum::<f64>() / older.len() as f64
}

/// One coaching line per category present in the session's breakdown.
fn improvement_areas(breakdown: &BTreeMap<DataCategory, u64>) -> Vec<String> {
    let mut areas = Vec::new();
    for (category, count) in breakdown {
        if *count == 0 {
            continue;
        }
        let line = match category {
            DataCategory::SecretApi => "Avoid sharing API keys and tokens",
            DataCategory::Personal => "Protect personal identifiable information",
            DataCategory::Medical => "Never share medical records or health information",
            DataCategory::Infrastructure => "Keep internal infrastructure details private",
            DataCategory::Compliance => "Be aware of compliance and regulatory requirements",
        };
        areas.push(line.to_string());
    }
    areas
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> T {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read store, starting empty");
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
            T::default()
        }
    }
}

/// Whole-file overwrite via temp file + rename, so readers never observe a
/// partial write.
fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let json = serde_json::to_string_pretty(value)?;

    let temp_path = path.with_extension("tmp");
    let _ = fs::remove_file(&temp_path);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| Error::io(&temp_path, e))?;
    file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}
