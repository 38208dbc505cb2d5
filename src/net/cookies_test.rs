use reqwest::cookie::CookieStore as _;

use super::*;

fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

#[test]
fn stores_and_returns_cookie_for_same_host() {
    let jar = CookieJar::in_memory();
    jar.store_set_cookie("refresh_token=r-1; HttpOnly; Path=/; Max-Age=86400", &url("http://api.test/api/token/"));

    assert_eq!(jar.header_for(&url("http://api.test/api/token/refresh/")).as_deref(), Some("refresh_token=r-1"));
    assert_eq!(jar.header_for(&url("http://other.test/")), None);
}

#[test]
fn later_cookie_replaces_earlier_one() {
    let jar = CookieJar::in_memory();
    let origin = url("http://api.test/");
    jar.store_set_cookie("refresh_token=r-1; Path=/", &origin);
    jar.store_set_cookie("csrftoken=c; Path=/", &origin);
    jar.store_set_cookie("refresh_token=r-2; Path=/", &origin);

    assert_eq!(jar.header_for(&origin).as_deref(), Some("csrftoken=c; refresh_token=r-2"));
}

#[test]
fn zero_max_age_deletes_cookie() {
    let jar = CookieJar::in_memory();
    let origin = url("http://api.test/");
    jar.store_set_cookie("refresh_token=r-1; Path=/", &origin);
    jar.store_set_cookie("refresh_token=\"\"; expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/", &origin);

    assert_eq!(jar.header_for(&origin), None);
    assert!(jar.snapshot().is_empty());
}

#[test]
fn past_expires_without_max_age_deletes_cookie() {
    let jar = CookieJar::in_memory();
    let origin = url("http://api.test/");
    jar.store_set_cookie("refresh_token=r-1", &origin);
    jar.store_set_cookie("refresh_token=; Expires=Thu, 01 Jan 1970 00:00:00 GMT", &origin);

    assert_eq!(jar.header_for(&origin), None);
}

#[test]
fn secure_cookie_needs_https_or_loopback() {
    let jar = CookieJar::in_memory();
    jar.store_set_cookie("refresh_token=s; Secure", &url("https://api.test/"));
    assert_eq!(jar.header_for(&url("http://api.test/")), None);
    assert_eq!(jar.header_for(&url("https://api.test/")).as_deref(), Some("refresh_token=s"));

    jar.store_set_cookie("refresh_token=l; Secure", &url("http://localhost:8000/"));
    assert_eq!(jar.header_for(&url("http://localhost:8000/")).as_deref(), Some("refresh_token=l"));
}

#[test]
fn malformed_header_is_ignored() {
    let jar = CookieJar::in_memory();
    jar.store_set_cookie("no-equals-sign", &url("http://api.test/"));
    jar.store_set_cookie("=value-without-name", &url("http://api.test/"));
    assert!(jar.snapshot().is_empty());
}

#[test]
fn file_jar_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("salariz").join("access_token.cookies");
    let origin = url("http://127.0.0.1:8000/api/token/");

    let jar = CookieJar::load(path.clone()).unwrap();
    assert!(jar.snapshot().is_empty());
    jar.store_set_cookie("refresh_token=r-1; HttpOnly; Max-Age=86400; Path=/", &origin);

    let reopened = CookieJar::load(path.clone()).unwrap();
    assert_eq!(reopened.path(), Some(path.as_path()));
    assert_eq!(reopened.header_for(&origin).as_deref(), Some("refresh_token=r-1"));

    reopened.store_set_cookie("refresh_token=; Max-Age=0; Path=/", &origin);
    assert!(CookieJar::load(path).unwrap().snapshot().is_empty());
}

#[test]
fn expired_entries_are_dropped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jar.json");
    let stale = StoredCookie {
        host: "api.test".into(),
        name: "refresh_token".into(),
        value: "old".into(),
        secure: false,
        expires_at: Some(1),
    };
    std::fs::write(&path, serde_json::to_string(&[stale]).unwrap()).unwrap();

    assert!(CookieJar::load(path).unwrap().snapshot().is_empty());
}

#[test]
fn corrupt_file_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jar.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(CookieJar::load(path), Err(ApiError::Storage(_))));
}

#[cfg(unix)]
#[test]
fn file_jar_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jar.json");
    let jar = CookieJar::load(path.clone()).unwrap();
    jar.store_set_cookie("refresh_token=r; Max-Age=60", &url("http://api.test/"));

    assert_eq!(std::fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
}

#[test]
fn reqwest_store_round_trip() {
    let jar = CookieJar::in_memory();
    let origin = url("http://api.test/");
    let headers = [HeaderValue::from_static("refresh_token=r-9; Path=/"), HeaderValue::from_static("a=b")];
    jar.set_cookies(&mut headers.iter(), &origin);

    assert_eq!(jar.cookies(&origin), Some(HeaderValue::from_static("refresh_token=r-9; a=b")));
}
