//! Standalone HTML export of an [`AnalysisReport`].
//!
//! The document is self-contained (inline CSS, no scripts) so it can be
//! saved and opened offline. Every value coming from the analysis is
//! HTML-escaped.

#[cfg(test)]
#[path = "html_test.rs"]
mod html_test;

use std::fmt::Write;

use super::analysis::{AnalysisReport, Severity};
use super::euros;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:860px;margin:2rem auto;padding:0 1rem;color:#1f2937}\
h1{font-size:1.6rem}h2{font-size:1.2rem;margin-top:2rem;border-bottom:1px solid #e5e7eb;padding-bottom:.3rem}\
table{border-collapse:collapse;width:100%}td{padding:.3rem .5rem;border-bottom:1px solid #f3f4f6}\
td.amount{text-align:right;font-variant-numeric:tabular-nums}\
.badge{display:inline-block;padding:.1rem .5rem;border-radius:.5rem;font-size:.8rem;font-weight:600}\
.error{background:#fee2e2;color:#b91c1c}.warning{background:#fef3c7;color:#b45309}\
.info{background:#dbeafe;color:#1d4ed8}.ok{background:#dcfce7;color:#15803d}\
.anomaly{border:1px solid #e5e7eb;border-radius:.5rem;padding:.8rem;margin:.6rem 0}";

/// Render `report` as a complete HTML document.
#[must_use]
pub fn render(report: &AnalysisReport) -> String {
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Rapport d'analyse{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        report.payslip_id.map(|id| format!(" n°{id}")).unwrap_or_default(),
    );

    let _ = writeln!(out, "<h1>Rapport d'analyse de fiche de paie</h1>");
    let _ = writeln!(
        out,
        "<p>Période : {} · Analyse du {} · Statut : {}</p>",
        escape(&report.period),
        escape(&report.date),
        escape(&report.status),
    );

    let _ = writeln!(out, "<h2>Synthèse</h2>\n<table>");
    row(&mut out, "Conformité légale", &format!("{}%", report.conformity_percent));
    row(&mut out, "Note globale", &format!("{}/10", report.global_score));
    row(&mut out, "Anomalies", &report.anomaly_count().to_string());
    let _ = writeln!(out, "</table>");

    let _ = writeln!(out, "<h2>Détails financiers</h2>\n<table>");
    row(&mut out, "Salaire brut", &euros(report.gross_salary));
    row(&mut out, "Cotisations salariales", &format!("-{}", euros(report.employee_contributions)));
    row(&mut out, "Net à payer", &euros(report.net_salary));
    let _ = writeln!(out, "</table>");

    let _ = writeln!(out, "<h2>Convention collective</h2>\n<p>{}</p>", escape(&report.convention));

    let _ = writeln!(out, "<h2>Anomalies et observations</h2>");
    if report.anomalies.is_empty() {
        let _ = writeln!(out, "<p>Aucune anomalie détectée</p>");
    }
    for anomaly in &report.anomalies {
        let _ = write!(
            out,
            "<div class=\"anomaly\">\n<strong>{}</strong> <span class=\"badge {}\">{}</span>\n<p>{}</p>\n",
            escape(&anomaly.kind),
            severity_class(anomaly.severity),
            anomaly.severity.label(),
            escape(&anomaly.description),
        );
        if let Some(impact) = &anomaly.financial_impact {
            let _ = writeln!(out, "<p>Impact financier : {}</p>", escape(impact));
        }
        if let Some(fix) = &anomaly.fix {
            let _ = writeln!(out, "<p><em>Recommandation :</em> {}</p>", escape(fix));
        }
        let _ = writeln!(out, "</div>");
    }

    let _ = writeln!(out, "<h2>Recommandations générales</h2>");
    if report.recommendations.is_empty() {
        let _ = writeln!(out, "<p>Aucune recommandation spécifique</p>");
    } else {
        let _ = writeln!(out, "<ol>");
        for recommendation in &report.recommendations {
            let _ = writeln!(out, "<li>{}</li>", escape(recommendation));
        }
        let _ = writeln!(out, "</ol>");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "<tr><td>{}</td><td class=\"amount\">{}</td></tr>", escape(label), escape(value));
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
        Severity::Ok => "ok",
    }
}

/// Escape text for element content and double-quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
