//! Analysis report derived from `details.gpt_analysis`.
//!
//! The analysis document is produced by a language model and its schema has
//! drifted, so every field is read defensively: wrong types count as absent,
//! amounts accept numeric prefixes (`"2500.50 €"`), and text fields accept
//! numbers.

#[cfg(test)]
#[path = "analysis_test.rs"]
mod analysis_test;

use serde_json::{Map, Value};

use super::{MISSING, format_datetime};
use crate::net::types::{AnalysisResult, leading_number};

const POSITIVE_CHECK: &str = "positive_check";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Ok,
}

impl Severity {
    /// Explicit `level` wins; otherwise `gravite` decides.
    #[must_use]
    pub fn classify(level: Option<&str>, gravite: Option<&str>) -> Self {
        match level {
            Some("error") => Self::Error,
            Some("warning") => Self::Warning,
            Some("info") => Self::Info,
            Some(_) => Self::Ok,
            None => match gravite {
                Some("haute") => Self::Error,
                Some("moyenne") => Self::Warning,
                _ => Self::Info,
            },
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "Erreur",
            Self::Warning => "Alerte",
            Self::Info => "Info",
            Self::Ok => "OK",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    pub financial_impact: Option<String>,
    pub fix: Option<String>,
    /// Marked `positive_check`: a passed control, not a problem.
    pub positive_check: bool,
}

impl Anomaly {
    fn from_value(value: &Value) -> Self {
        let level = str_field(value, "level");
        let gravite = str_field(value, "gravite");
        Self {
            kind: text_field(value, "type").unwrap_or_else(|| "Anomalie détectée".to_owned()),
            description: text_field(value, "description")
                .unwrap_or_else(|| "Aucune description disponible".to_owned()),
            severity: Severity::classify(level, gravite),
            financial_impact: text_field(value, "impact_financier"),
            fix: text_field(value, "recommandation_correctif"),
            positive_check: level.or(gravite) == Some(POSITIVE_CHECK),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub payslip_id: Option<i64>,
    pub analysis_id: Option<i64>,
    pub status: String,
    pub date: String,
    /// `Du <start> au <end>`, or `—`.
    pub period: String,
    /// Legal conformity out of 10, scaled to a clamped, rounded percentage.
    pub conformity_percent: u8,
    pub global_score: f64,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub employee_contributions: f64,
    pub convention: String,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<String>,
}

impl AnalysisReport {
    #[must_use]
    pub fn from_result(result: &AnalysisResult) -> Self {
        let empty = Map::new();
        let gpt = result
            .details
            .get("gpt_analysis")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let periode = gpt.get("periode");
        let period = match (
            periode.and_then(|p| text_field(p, "periode_du")),
            periode.and_then(|p| text_field(p, "periode_au")),
        ) {
            (Some(from), Some(to)) => format!("Du {from} au {to}"),
            _ => MISSING.to_owned(),
        };

        let remuneration = gpt.get("remuneration");
        let amount = |key: &str| remuneration.and_then(|r| r.get(key)).map_or(0.0, parse_amount);

        let anomalies = gpt
            .get("anomalies_potentielles_observees")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Anomaly::from_value).collect())
            .unwrap_or_default();
        let recommendations = gpt
            .get("recommandations_amelioration")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(value_text).collect())
            .unwrap_or_default();

        let conformity = gpt.get("note_conformite_legale").and_then(Value::as_f64).unwrap_or(0.0);

        Self {
            payslip_id: result.payslip_id,
            analysis_id: result.analysis_id,
            status: result
                .status
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "success".to_owned()),
            date: format_datetime(result.date.as_deref()),
            period,
            conformity_percent: conformity_percent(conformity),
            global_score: gpt.get("note_globale").and_then(Value::as_f64).unwrap_or(0.0),
            gross_salary: amount("salaire_brut_total"),
            net_salary: amount("net_a_payer"),
            employee_contributions: amount("total_cotisations_salariales"),
            convention: gpt
                .get("informations_generales")
                .and_then(|info| text_field(info, "convention_collective_applicable"))
                .unwrap_or_else(|| MISSING.to_owned()),
            anomalies,
            recommendations,
        }
    }

    /// Anomalies that are actual problems (passed controls excluded).
    #[must_use]
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|a| !a.positive_check).count()
    }
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn conformity_percent(score_out_of_ten: f64) -> u8 {
    if !score_out_of_ten.is_finite() {
        return 0;
    }
    (score_out_of_ten / 10.0 * 100.0).clamp(0.0, 100.0).round() as u8
}

/// Leading decimal number of a string or a JSON number; `0` otherwise.
#[must_use]
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Non-empty string or number rendered as text.
fn text_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(value_text)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
