mod common;

use common::{google_identity, spawn_app, TestApp};
use serde_json::Value;

/// Start the flow and return the state carried by the cookie
async fn start_google_login(app: &TestApp) -> String {
    let response = app.client.get(app.url("/auth/google")).send().await.unwrap();
    assert_eq!(302, response.status().as_u16());

    let location = response
        .headers()
        .get("location")
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();

    let cookie = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|c| c.starts_with("oauth_state="))
        .expect("state cookie not set")
        .to_string();
    assert!(cookie.contains("HttpOnly"));

    let state = cookie["oauth_state=".len()..]
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(location.ends_with(&format!("state={}", state)));
    state
}

async fn callback(app: &TestApp, cookie_state: Option<&str>, query_state: &str) -> reqwest::Response {
    let mut request = app.client.get(app.url(&format!(
        "/auth/google/callback?code=auth-code&state={}",
        query_state
    )));
    if let Some(state) = cookie_state {
        request = request.header("Cookie", format!("oauth_state={}", state));
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn google_callback_creates_account_and_issues_tokens() {
    let app = spawn_app();
    app.services
        .bridge
        .will_return(google_identity("g-123", "new@x.com"));

    let state = start_google_login(&app).await;
    let response = callback(&app, Some(&state), &state).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert!(body["access_token"].is_string());
    assert_eq!(body["user"]["email"], "new@x.com");
    assert_eq!(body["user"]["oauth_provider"], "google");
    assert_eq!(body["user"]["email_verified"], true);

    let response = app.get_authed("/api/users/me", body["access_token"].as_str().unwrap()).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn google_callback_links_existing_password_account() {
    let app = spawn_app();
    let login = app.verified_user("a@x.com").await;
    app.services.bridge.will_return(google_identity("g-1", "a@x.com"));

    for _ in 0..2 {
        let state = start_google_login(&app).await;
        let body: Value = callback(&app, Some(&state), &state).await.json().await.unwrap();
        assert_eq!(body["user"]["id"], login["user"]["id"]);
    }
}

#[tokio::test]
async fn google_callback_rejects_bad_state() {
    let app = spawn_app();
    app.services.bridge.will_return(google_identity("g-1", "a@x.com"));
    let state = start_google_login(&app).await;

    let mismatched = callback(&app, Some(&state), "forged-state").await;
    assert_eq!(401, mismatched.status().as_u16());

    let missing_cookie = callback(&app, None, &state).await;
    assert_eq!(401, missing_cookie.status().as_u16());

    let body: Value = missing_cookie.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn password_login_on_oauth_account_points_to_provider() {
    let app = spawn_app();
    app.services.bridge.will_return(google_identity("g-1", "g@x.com"));
    let state = start_google_login(&app).await;
    callback(&app, Some(&state), &state).await;

    let response = app.login("g@x.com", "some-password").await;
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "OAUTH_ACCOUNT");
}
