//! View models derived from server payloads.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend returns raw rows and an opaque analysis document. This module
//! turns them into what a screen shows: dashboard rows with a status badge,
//! formatted stats, and the analysis report (see [`analysis`]) with its
//! standalone HTML export (see [`html`]).
//!
//! Missing values render as `—`; numbers default to zero.


pub mod analysis;
pub mod html;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::net::types::{PayslipStats, PayslipSummary};

pub use analysis::{AnalysisReport, Anomaly, Severity};

/// Placeholder for absent values.
pub const MISSING: &str = "—";

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Success,
    Errors,
    Warning,
}

impl RowStatus {
    #[must_use]
    pub fn from_processing_status(status: Option<&str>) -> Self {
        match status {
            Some("completed") => Self::Success,
            Some("error") => Self::Errors,
            _ => Self::Warning,
        }
    }
}

/// One dashboard line.
#[derive(Debug, Clone, PartialEq)]
pub struct PayslipRow {
    pub id: i64,
    pub period: String,
    pub date: String,
    pub status: RowStatus,
    pub score: f64,
    pub conformity_score: f64,
    pub anomalies: u64,
    pub file_name: String,
}

impl PayslipRow {
    #[must_use]
    pub fn from_summary(summary: &PayslipSummary) -> Self {
        Self {
            id: summary.id,
            period: non_empty(summary.period.as_deref()).unwrap_or(MISSING).to_owned(),
            date: format_date(summary.upload_date.as_deref()),
            status: RowStatus::from_processing_status(summary.processing_status.as_deref()),
            score: summary.analysis_score.unwrap_or_default(),
            conformity_score: summary.conformity_score.unwrap_or_default(),
            anomalies: summary.anomalies_count.unwrap_or_default(),
            file_name: file_name(summary.uploaded_file.as_deref()),
        }
    }

    /// Badge text; a hard error wins over the anomaly count.
    #[must_use]
    pub fn badge(&self) -> String {
        match self.status {
            RowStatus::Errors => "Erreurs".to_owned(),
            _ if self.anomalies > 0 => format!("{} anomalie(s)", self.anomalies),
            RowStatus::Success => "Conforme".to_owned(),
            RowStatus::Warning => "En cours".to_owned(),
        }
    }
}

/// Formatted dashboard header stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub total_analyses: u64,
    pub avg_score: String,
    pub avg_conformity_score: String,
    pub total_errors: u64,
    pub last_analysis: Option<String>,
}

impl StatsSummary {
    #[must_use]
    pub fn from_stats(stats: &PayslipStats) -> Self {
        Self {
            total_analyses: stats.total_analyses,
            avg_score: format!("{:.1}", stats.avg_score.unwrap_or_default()),
            avg_conformity_score: format!("{:.1}", stats.avg_conformity_score.unwrap_or_default()),
            total_errors: stats.total_errors,
            last_analysis: non_empty(stats.last_analysis.as_deref()).map(|raw| format_date(Some(raw))),
        }
    }
}

// =============================================================================
// FORMATTING
// =============================================================================

/// Last `/` segment of a stored file path.
#[must_use]
pub fn file_name(path: Option<&str>) -> String {
    path.and_then(|p| p.rsplit('/').next())
        .and_then(|name| non_empty(Some(name)))
        .unwrap_or(MISSING)
        .to_owned()
}

/// `dd/mm/yyyy` for RFC 3339 timestamps or plain dates; other text is
/// returned as is and absence renders as `—`.
#[must_use]
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = non_empty(raw) else {
        return MISSING.to_owned();
    };
    let day = format_description!("[day]/[month]/[year]");
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return at.format(day).unwrap_or_else(|_| raw.to_owned());
    }
    if let Ok(date) = time::Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return date.format(day).unwrap_or_else(|_| raw.to_owned());
    }
    raw.to_owned()
}

/// `dd/mm/yyyy HH:MM:SS` in the timestamp's own offset.
#[must_use]
pub fn format_datetime(raw: Option<&str>) -> String {
    let Some(raw) = non_empty(raw) else {
        return MISSING.to_owned();
    };
    match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(at) => at
            .format(format_description!("[day]/[month]/[year] [hour]:[minute]:[second]"))
            .unwrap_or_else(|_| raw.to_owned()),
        Err(_) => format_date(Some(raw)),
    }
}

/// `1234.50€`
#[must_use]
pub fn euros(amount: f64) -> String {
    format!("{amount:.2}€")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
