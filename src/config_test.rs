use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.base_url, DEFAULT_API_BASE_URL);
    assert_eq!(cfg.timeouts, Timeouts::default());
    assert_eq!(cfg.token_file, default_token_file());
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        (ENV_API_BASE_URL, "https://api.salariz.test/"),
        (ENV_TOKEN_FILE, "/tmp/salariz-token"),
        (ENV_REQUEST_TIMEOUT_SECS, "42"),
        (ENV_CONNECT_TIMEOUT_SECS, "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://api.salariz.test");
    assert_eq!(cfg.token_file, Some(PathBuf::from("/tmp/salariz-token")));
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn unparsable_timeouts_fall_back_to_defaults() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        (ENV_REQUEST_TIMEOUT_SECS, "soon"),
        (ENV_CONNECT_TIMEOUT_SECS, "-3"),
    ]))
    .unwrap();
    assert_eq!(cfg.timeouts, Timeouts::default());
}

#[test]
fn blank_token_file_uses_platform_default() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[(ENV_TOKEN_FILE, "   ")])).unwrap();
    assert_eq!(cfg.token_file, default_token_file());
}

#[test]
fn rejects_non_http_base_url() {
    let err = ClientConfig::from_lookup(lookup_from(&[(ENV_API_BASE_URL, "ftp://files.test")])).unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
}

#[test]
fn normalize_base_url_trims_slashes_and_whitespace() {
    assert_eq!(normalize_base_url("  http://127.0.0.1:8000//  ").unwrap(), "http://127.0.0.1:8000");
    assert_eq!(normalize_base_url("").unwrap(), DEFAULT_API_BASE_URL);
}

#[test]
fn new_keeps_memory_only_token() {
    let cfg = ClientConfig::new("http://localhost:9000/").unwrap();
    assert_eq!(cfg.base_url, "http://localhost:9000");
    assert!(cfg.token_file.is_none());
}

#[test]
fn cookie_file_sits_beside_token_file() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[(ENV_TOKEN_FILE, "/tmp/salariz/access_token")])).unwrap();
    assert_eq!(cfg.cookie_file(), Some(PathBuf::from("/tmp/salariz/access_token.cookies")));
    assert_eq!(ClientConfig::new("http://localhost:9000").unwrap().cookie_file(), None);
}
