use rstest::rstest;
use serde_json::json;

use super::*;

fn result(details: Value) -> AnalysisResult {
    AnalysisResult {
        payslip_id: Some(9),
        analysis_id: Some(2),
        status: Some("completed".into()),
        date: Some("2025-05-12T09:05:03+02:00".into()),
        details,
    }
}

fn full_analysis() -> Value {
    json!({
        "gpt_analysis": {
            "note_globale": 7.5,
            "note_conformite_legale": 8.4,
            "periode": { "periode_du": "01/05/2025", "periode_au": "31/05/2025" },
            "remuneration": {
                "salaire_brut_total": "2500.50",
                "net_a_payer": 1950,
                "total_cotisations_salariales": "550,50 €",
            },
            "informations_generales": { "convention_collective_applicable": "Syntec (IDCC 1486)" },
            "anomalies_potentielles_observees": [
                { "type": "Heures supplémentaires", "description": "Majoration absente", "gravite": "haute",
                  "impact_financier": "120 €", "recommandation_correctif": "Régulariser" },
                { "type": "Mutuelle", "level": "positive_check", "description": "Conforme" },
                { "gravite": "moyenne" },
            ],
            "recommandations_amelioration": ["Vérifier le contrat", "", 3],
        }
    })
}

#[test]
fn full_report_is_derived() {
    let report = AnalysisReport::from_result(&result(full_analysis()));

    assert_eq!(report.period, "Du 01/05/2025 au 31/05/2025");
    assert_eq!(report.conformity_percent, 84);
    assert!((report.global_score - 7.5).abs() < f64::EPSILON);
    assert!((report.gross_salary - 2500.5).abs() < f64::EPSILON);
    assert!((report.net_salary - 1950.0).abs() < f64::EPSILON);
    assert!((report.employee_contributions - 550.0).abs() < f64::EPSILON);
    assert_eq!(report.convention, "Syntec (IDCC 1486)");
    assert_eq!(report.date, "12/05/2025 09:05:03");
    assert_eq!(report.status, "completed");

    assert_eq!(report.anomalies.len(), 3);
    assert_eq!(report.anomaly_count(), 2);
    assert_eq!(report.anomalies[0].severity, Severity::Error);
    assert_eq!(report.anomalies[0].financial_impact.as_deref(), Some("120 €"));
    assert_eq!(report.anomalies[1].severity, Severity::Ok);
    assert!(report.anomalies[1].positive_check);
    assert_eq!(report.anomalies[2].kind, "Anomalie détectée");
    assert_eq!(report.anomalies[2].description, "Aucune description disponible");
    assert_eq!(report.anomalies[2].severity, Severity::Warning);

    assert_eq!(report.recommendations, ["Vérifier le contrat", "3"]);
}

#[test]
fn missing_analysis_yields_defaults() {
    let mut bare = result(json!({}));
    bare.status = None;
    bare.date = None;
    let report = AnalysisReport::from_result(&bare);

    assert_eq!(report.period, MISSING);
    assert_eq!(report.convention, MISSING);
    assert_eq!(report.date, MISSING);
    assert_eq!(report.status, "success");
    assert_eq!(report.conformity_percent, 0);
    assert_eq!(report.global_score, 0.0);
    assert_eq!(report.gross_salary, 0.0);
    assert!(report.anomalies.is_empty());
    assert!(report.recommendations.is_empty());
}

#[test]
fn half_period_is_missing() {
    let report = AnalysisReport::from_result(&result(json!({
        "gpt_analysis": { "periode": { "periode_du": "01/05/2025" } }
    })));
    assert_eq!(report.period, MISSING);
}

#[test]
fn non_object_analysis_is_ignored() {
    let report = AnalysisReport::from_result(&result(json!({ "gpt_analysis": "raw model output" })));
    assert_eq!(report.anomalies.len(), 0);
    assert_eq!(report.conformity_percent, 0);
}

#[test]
fn string_scores_are_not_numbers() {
    let report = AnalysisReport::from_result(&result(json!({
        "gpt_analysis": { "note_globale": "8", "note_conformite_legale": "9" }
    })));
    assert_eq!(report.global_score, 0.0);
    assert_eq!(report.conformity_percent, 0);
}

#[rstest]
#[case(Some("error"), None, Severity::Error)]
#[case(Some("warning"), Some("haute"), Severity::Warning)]
#[case(Some("info"), None, Severity::Info)]
#[case(Some("positive_check"), None, Severity::Ok)]
#[case(None, Some("haute"), Severity::Error)]
#[case(None, Some("moyenne"), Severity::Warning)]
#[case(None, Some("basse"), Severity::Info)]
#[case(None, None, Severity::Info)]
fn severity_classification(#[case] level: Option<&str>, #[case] gravite: Option<&str>, #[case] expected: Severity) {
    assert_eq!(Severity::classify(level, gravite), expected);
}

#[rstest]
#[case(8.4, 84)]
#[case(8.46, 85)]
#[case(-3.0, 0)]
#[case(12.0, 100)]
#[case(f64::NAN, 0)]
fn conformity_is_clamped_and_rounded(#[case] score: f64, #[case] expected: u8) {
    assert_eq!(conformity_percent(score), expected);
}

#[rstest]
#[case(json!("2500.50 €"), 2500.5)]
#[case(json!("  -12.5"), -12.5)]
#[case(json!("abc"), 0.0)]
#[case(json!(""), 0.0)]
#[case(json!(1234), 1234.0)]
#[case(json!(null), 0.0)]
fn amounts_parse_leading_number(#[case] raw: Value, #[case] expected: f64) {
    assert!((parse_amount(&raw) - expected).abs() < f64::EPSILON);
}

#[test]
fn severity_labels() {
    assert_eq!(Severity::Error.label(), "Erreur");
    assert_eq!(Severity::Warning.label(), "Alerte");
    assert_eq!(Severity::Info.label(), "Info");
    assert_eq!(Severity::Ok.label(), "OK");
}
