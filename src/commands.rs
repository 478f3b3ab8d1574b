//! Subcommand implementations: thin wrappers that drive the engine and
//! render its output.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use leakscope_core::{
    parse_report, AnalysisResult, LeakMonitor, PatternRegistry, RiskCalculator, ScoringSystem,
    SessionLog, SessionScore,
};

/// Resolve the data directory (CLI override or the platform default).
pub fn data_dir(override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(leakscope_core::default_data_dir)
}

fn session_log(data_dir: &Path) -> SessionLog {
    SessionLog::new(data_dir.join("sessions"))
}

fn scoring_system(data_dir: &Path) -> ScoringSystem {
    ScoringSystem::new(data_dir.join("scores"))
}

/// `leakscope scan`
pub fn scan(
    data_dir: &Path,
    registry_path: Option<&Path>,
    file: Option<&Path>,
    session: &str,
    external_score: Option<u32>,
    report: bool,
    json: bool,
) -> Result<()> {
    let text = read_input(file)?;

    if report {
        let parsed = parse_report(&text);
        let assessment =
            RiskCalculator::new().assess(&parsed.metrics, parsed.external_score());
        if json {
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        } else {
            println!(
                "Risk: {}/100 ({}) confidence {:.2}",
                assessment.risk_score, assessment.risk_level, assessment.confidence
            );
            for rec in &assessment.recommendations {
                println!("  - {rec}");
            }
        }
        return Ok(());
    }

    let registry = PatternRegistry::load(registry_path);
    let monitor = LeakMonitor::new(registry, session_log(data_dir));
    let result = monitor.analyze(&text, session, external_score);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_analysis(&result));
    }
    Ok(())
}

/// `leakscope score`
pub fn score(data_dir: &Path, session: &str, user: &str, json: bool) -> Result<()> {
    let records = session_log(data_dir)
        .read_session(session)
        .with_context(|| format!("failed to read session log for {session}"))?;
    let score = scoring_system(data_dir).score_session(session, user, &records);

    if json {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        print!("{}", render_score(&score));
    }
    Ok(())
}

/// `leakscope leaderboard`
pub fn leaderboard(data_dir: &Path, limit: usize, json: bool) -> Result<()> {
    let rows = scoring_system(data_dir).leaderboard(limit);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No users with enough sessions yet.");
        return Ok(());
    }
    println!(
        "{:<4} {:<20} {:>8} {:>10} {:>8} {:>8}",
        "#", "user", "avg", "sessions", "best", "trend"
    );
    for (i, row) in rows.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:>8.1} {:>10} {:>8.1} {:>+8.1}",
            i + 1,
            row.user_id,
            row.average_score,
            row.total_sessions,
            row.best_score,
            row.improvement_trend
        );
    }
    Ok(())
}

/// `leakscope stats`
pub fn stats(data_dir: &Path, json: bool) -> Result<()> {
    let stats = scoring_system(data_dir).statistics();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    if stats.total_sessions == 0 {
        println!("No sessions recorded yet.");
        return Ok(());
    }
    println!("Sessions: {}", stats.total_sessions);
    println!("Users: {}", stats.total_users);
    println!("Average score: {:.1}", stats.average_score);
    println!(
        "Best / worst: {:.1} / {:.1}",
        stats.best_overall_score, stats.worst_overall_score
    );
    for (level, count) in &stats.score_distribution {
        println!("  {level:?}: {count}");
    }
    if !stats.most_common_categories.is_empty() {
        println!("Most common flag categories:");
        for (category, count) in &stats.most_common_categories {
            println!("  {category}: {count}");
        }
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Risk: {}/100 ({}) confidence {:.2}\n",
        result.risk_score, result.risk_level, result.confidence
    ));
    out.push_str(&format!(
        "Lines: {}  potential fields: {}  detected: {}\n",
        result.lines_of_code, result.potential_fields, result.detected_data
    ));
    for (category, count) in &result.category_counts {
        if *count > 0 {
            out.push_str(&format!("  {category}: {count}\n"));
        }
    }
    if !result.factors.is_empty() {
        out.push_str("Factors:\n");
        for factor in &result.factors {
            out.push_str(&format!("  - {factor}\n"));
        }
    }
    if !result.recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for rec in &result.recommendations {
            out.push_str(&format!("  - {rec}\n"));
        }
    }
    out
}

fn render_score(score: &SessionScore) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Session {} ({}): {:.1}/100 ({:?})\n",
        score.session_id,
        score.user_id,
        score.score,
        score.level()
    ));
    out.push_str(&format!("Flags: {}\n", score.total_flags));
    for (category, count) in &score.flag_breakdown {
        out.push_str(&format!("  {category}: {count}\n"));
    }
    for area in &score.improvement_areas {
        out.push_str(&format!("  -> {area}\n"));
    }
    out
}
