use super::*;

#[test]
fn json_body_is_parsed() {
    let err = ApiError::from_response(400, "Bad Request", r#"{"email":["This field is required."]}"#);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.body(), Some(&json!({ "email": ["This field is required."] })));
    assert!(matches!(err, ApiError::Http { .. }));
}

#[test]
fn raw_text_body_is_wrapped() {
    let err = ApiError::from_response(502, "Bad Gateway", "<html>upstream down</html>");
    assert_eq!(err.body(), Some(&json!({ "status": 502, "message": "<html>upstream down</html>" })));
}

#[test]
fn empty_body_falls_back_to_reason_phrase() {
    let err = ApiError::from_response(500, "Internal Server Error", "");
    assert_eq!(err.body(), Some(&json!({ "status": 500, "message": "Internal Server Error" })));
}

#[test]
fn payment_required_without_code_gets_default_code() {
    let err = ApiError::from_response(402, "Payment Required", r#"{"detail":"no credits"}"#);
    assert!(matches!(&err, ApiError::Application { code, .. } if code == PAYMENT_REQUIRED_CODE));
    assert!(err.is_payment_required());
}

#[test]
fn payment_required_keeps_server_code() {
    let err = ApiError::from_response(402, "Payment Required", r#"{"code":"credits_exhausted"}"#);
    assert_eq!(err.code(), Some("credits_exhausted"));
    assert!(err.is_payment_required());
}

#[test]
fn coded_non_402_stays_http() {
    let err = ApiError::from_response(401, "Unauthorized", r#"{"detail":"expired","code":"token_not_valid"}"#);
    assert!(matches!(err, ApiError::Http { status: 401, .. }));
    assert_eq!(err.code(), Some("token_not_valid"));
    assert!(err.is_unauthorized());
    assert!(!err.is_payment_required());
}

#[test]
fn payment_code_on_other_status_counts_as_payment_required() {
    let err = ApiError::from_response(400, "Bad Request", r#"{"code":"payment_required"}"#);
    assert!(err.is_payment_required());
}

#[test]
fn network_errors_report_status_zero() {
    let err = ApiError::Network("connection refused".into());
    assert_eq!(err.status(), Some(0));
    assert!(err.body().is_none());
    assert_eq!(err.error_code(), "E_NETWORK");
}

#[test]
fn local_errors_have_no_status() {
    assert_eq!(ApiError::Decode("bad".into()).status(), None);
    assert_eq!(ApiError::Storage("disk".into()).status(), None);
}
