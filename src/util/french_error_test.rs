use rstest::rstest;
use serde_json::json;

use super::*;

// =============================================================================
// special statuses
// =============================================================================

#[rstest]
#[case(json!({ "status": 0, "error": "fetch failed" }), "Connexion impossible")]
#[case(json!({ "status": 403, "error": { "detail": "nope" } }), "Accès refusé")]
#[case(json!({ "status": 401, "error": { "detail": "Token is expired" } }), "Session expirée")]
#[case(json!({ "status": 401, "error": { "detail": "No active account found with the given credentials" } }), "Erreur de connexion")]
#[case(json!({ "status": 401, "error": "Unable to log in" }), "Erreur de connexion")]
#[case(json!({ "response": { "status": 403, "data": {} } }), "Accès refusé")]
fn status_titles(#[case] raw: Value, #[case] title: &str) {
    let translated = get_french_error(&raw);
    assert_eq!(translated.title, title);
    assert_eq!(translated.variant, ToastVariant::Destructive);
    assert!(!translated.description.is_empty());
}

#[test]
fn network_error_maps_to_connection_title() {
    let translated = get_french_error(&ApiError::Network("dns".into()));
    assert_eq!(translated.title, "Connexion impossible");
    assert_eq!(translated.status, Some(0));
}

#[test]
fn not_found_uses_server_message() {
    let err = ApiError::from_response(404, "Not Found", r#"{"detail":"Fiche introuvable"}"#);
    let translated = get_french_error(&err);
    assert_eq!(translated.title, "Introuvable");
    assert_eq!(translated.description, "Fiche introuvable");
}

#[test]
fn not_found_without_message_uses_default() {
    let translated = get_french_error(&json!({ "status": 404, "error": {} }));
    assert_eq!(translated.description, "{}");

    let translated = get_french_error(&json!({ "status": 404, "error": [null] }));
    assert_eq!(translated.description, "La ressource demandée est introuvable.");
}

// =============================================================================
// payment
// =============================================================================

#[test]
fn payment_required_from_status() {
    let err = ApiError::from_response(402, "Payment Required", "");
    let translated = get_french_error(&err);
    assert_eq!(translated.title, "Crédits insuffisants");
    assert_eq!(translated.code.as_deref(), Some("payment_required"));
    assert!(is_payment_required(&err));
}

#[test]
fn payment_required_from_code_only() {
    let raw = json!({ "status": 400, "error": { "code": "payment_required", "message": "Paiement requis" } });
    let translated = get_french_error(&raw);
    assert_eq!(translated.title, "Crédits insuffisants");
    assert_eq!(translated.status, Some(400));
    assert!(is_payment_required(&raw));
}

#[rstest]
#[case(json!({ "status": 402 }), true)]
#[case(json!({ "response": { "status": 402, "data": null } }), true)]
#[case(json!({ "status": 400, "error": { "code": "payment_required" } }), true)]
#[case(json!({ "code": "payment_required" }), true)]
#[case(json!({ "status": 4020 }), false)]
#[case(json!({ "status": 400, "error": { "code": "other" } }), false)]
#[case(json!("payment_required"), false)]
#[case(json!(null), false)]
fn payment_required_predicate(#[case] raw: Value, #[case] expected: bool) {
    assert_eq!(is_payment_required(&raw), expected);
}

// =============================================================================
// validation / generic
// =============================================================================

#[test]
fn field_errors_are_labelled_and_translated() {
    let err = ApiError::from_response(
        400,
        "Bad Request",
        r#"{"username":["A user with that username already exists."],"password":["This password is too common."]}"#,
    );
    let translated = get_french_error(&err);
    assert_eq!(translated.title, "Erreurs de validation");
    assert_eq!(
        translated.description,
        "Nom d'utilisateur: Un utilisateur avec ce nom existe déjà.\nMot de passe: Ce mot de passe est trop courant."
    );
}

#[test]
fn direct_keys_come_first() {
    let raw = json!({ "status": 500, "error": { "email": "bad", "detail": "Oups" } });
    let translated = get_french_error(&raw);
    assert_eq!(translated.title, "Erreurs de validation");
    assert_eq!(translated.description, "Oups\nAdresse email: bad");
}

#[test]
fn generic_server_error() {
    let err = ApiError::from_response(500, "Internal Server Error", "");
    let translated = get_french_error(&err);
    assert_eq!(translated.title, "Erreur");
    assert_eq!(translated.description, "Internal Server Error");
}

#[test]
fn partial_translation_patterns() {
    let raw = json!({ "status": 400, "error": ["user with this email already exists", "password is too short"] });
    let translated = get_french_error(&raw);
    assert_eq!(
        translated.description,
        "Un utilisateur avec cet email existe déjà.\nCe mot de passe est trop court."
    );
}

#[test]
fn local_errors_are_described() {
    let translated = get_french_error(&ApiError::Decode("missing field `id`".into()));
    assert_eq!(translated.title, "Erreur");
    assert!(translated.description.contains("missing field"));
    assert_eq!(translated.status, None);
}

// =============================================================================
// totality
// =============================================================================

#[rstest]
#[case(json!("boom"))]
#[case(json!(""))]
#[case(json!([]))]
#[case(json!([null, ""]))]
#[case(json!({}))]
#[case(json!(42))]
#[case(json!(null))]
#[case(json!(true))]
#[case(json!({ "status": 0 }))]
#[case(json!({ "status": 418, "error": null }))]
#[case(json!({ "response": {} }))]
fn any_shape_gets_a_description(#[case] raw: Value) {
    let translated = get_french_error(&raw);
    assert!(!translated.description.trim().is_empty());
    assert!(matches!(translated.variant, ToastVariant::Default | ToastVariant::Destructive));
}

#[test]
fn plain_string_is_used_verbatim() {
    let translated = get_french_error(&json!("Service indisponible"));
    assert_eq!(translated.title, "Erreur");
    assert_eq!(translated.description, "Service indisponible");
}
