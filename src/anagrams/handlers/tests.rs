#![allow(clippy::unwrap_used)]

use crate::anagram::{store::memory::MemoryStore, AnagramRecord, AnagramService};
use crate::anagrams::{cookie_key, router, AppState, Session, SessionConfig, SESSION_COOKIE};
use crate::oidc::{testing::FakeProvider, AuthFlow, OidcConfig};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, Method, Request, StatusCode,
    },
    response::Response,
};
use axum_extra::extract::{cookie::Key, PrivateCookieJar};
use secrecy::SecretString;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tower::ServiceExt;
use url::Url;

const SECRET_KEY: &str = "test-secret-key-with-at-least-32-bytes!!";

struct Harness {
    state: AppState,
    provider: Arc<FakeProvider>,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new(provider: FakeProvider) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryStore::default());

        let config = OidcConfig::new(
            "client-123.apps.example.com".to_string(),
            SecretString::from("client-secret".to_string()),
        );

        let state = AppState {
            auth: Arc::new(AuthFlow::new(config, provider.clone())),
            anagrams: AnagramService::new(store.clone()),
            cookie_key: key(),
            session: SessionConfig::new(Duration::from_secs(3600), true),
        };

        Self {
            state,
            provider,
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        router(self.state.clone()).oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, body: &'static str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/AddStrings")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Run `/login` and return the session cookie and the issued state.
    async fn login(&self) -> (String, String) {
        let response = self.get("/login", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
        let query: HashMap<String, String> = location.query_pairs().into_owned().collect();

        (session_cookie(&response).unwrap(), query["state"].clone())
    }

    /// Full login; returns the cookie carrying the subject.
    async fn signed_in(&self) -> String {
        let (cookie, state) = self.login().await;
        let response = self
            .get(&format!("/callback?code=auth-code&state={state}"), Some(&cookie))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).unwrap()
    }
}

fn key() -> Key {
    cookie_key(&SecretString::from(SECRET_KEY.to_string())).unwrap()
}

/// `name=value` of the session `Set-Cookie` header, if any.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|value| value.split(';').next())
        .map(ToString::to_string)
}

fn set_cookie_header(response: &Response) -> String {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
        .unwrap()
        .to_string()
}

fn read_session(cookie: &str) -> Session {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
    Session::load(&PrivateCookieJar::from_headers(&headers, key()))
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn index_offers_login() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.get("/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/login"));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.get("/", None).await;
    assert!(response.headers().contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = harness.send(request).await;
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn protected_resource_requires_session() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.get("/protected_resource", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!body_text(response).await.contains("AddStrings"));
}

#[tokio::test]
async fn protected_resource_rejects_forged_cookie() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness
        .get(
            "/protected_resource",
            Some("anagrams_session={\"subject\":\"admin\"}"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_redirects_to_provider_with_state_in_session() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
    assert_eq!(location.host_str(), Some("accounts.google.com"));
    let query: HashMap<String, String> = location.query_pairs().into_owned().collect();

    let header = set_cookie_header(&response);
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("SameSite=Lax"));
    assert!(header.contains("Secure"));
    assert!(header.contains("Path=/"));

    let session = read_session(&session_cookie(&response).unwrap());
    assert_eq!(session.state.as_ref(), query.get("state"));
    assert_eq!(session.subject, None);
}

#[tokio::test]
async fn login_flow_grants_access() {
    let harness = Harness::new(FakeProvider::accepting("110169484474386276334"));
    let (cookie, state) = harness.login().await;

    let response = harness
        .get(&format!("/callback?code=auth-code&state={state}"), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/protected_resource");
    assert_eq!(harness.provider.exchanged_codes(), vec!["auth-code".to_string()]);

    let cookie = session_cookie(&response).unwrap();
    let session = read_session(&cookie);
    assert_eq!(session.subject.as_deref(), Some("110169484474386276334"));
    assert_eq!(session.state, None);

    let response = harness.get("/protected_resource", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("First String"));
}

#[tokio::test]
async fn callback_with_wrong_state_is_rejected_before_exchange() {
    let harness = Harness::new(FakeProvider::accepting("sub"));
    let (cookie, _state) = harness.login().await;

    let response = harness
        .get("/callback?code=auth-code&state=forged", Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(harness.provider.exchanged_codes().is_empty());

    let cookie = session_cookie(&response).unwrap();
    assert!(read_session(&cookie).is_empty());

    let response = harness.get("/protected_resource", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn callback_without_login_is_rejected() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness
        .get("/callback?code=auth-code&state=anything", None)
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(harness.provider.exchanged_codes().is_empty());
}

#[tokio::test]
async fn callback_state_is_single_use() {
    let harness = Harness::new(FakeProvider::accepting("sub"));
    let (cookie, state) = harness.login().await;
    let uri = format!("/callback?code=auth-code&state={state}");

    let first = harness.get(&uri, Some(&cookie)).await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    let signed_in = session_cookie(&first).unwrap();

    let replay = harness.get(&uri, Some(&signed_in)).await;
    assert_eq!(replay.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(harness.provider.exchanged_codes().len(), 1);
}

#[tokio::test]
async fn callback_with_foreign_token_is_unauthorized() {
    let harness = Harness::new(FakeProvider::rejecting());
    let (cookie, state) = harness.login().await;

    let response = harness
        .get(&format!("/callback?code=auth-code&state={state}"), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = session_cookie(&response).unwrap();
    assert_eq!(read_session(&cookie).subject, None);
}

#[tokio::test]
async fn callback_provider_error_is_unauthorized() {
    let harness = Harness::new(FakeProvider::accepting("sub"));
    let (cookie, state) = harness.login().await;

    let response = harness
        .get(
            &format!("/callback?error=access_denied&state={state}"),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(harness.provider.exchanged_codes().is_empty());
}

#[tokio::test]
async fn callback_without_code_is_bad_request() {
    let harness = Harness::new(FakeProvider::accepting("sub"));
    let (cookie, state) = harness.login().await;

    let response = harness
        .get(&format!("/callback?state={state}"), Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_clears_session() {
    let harness = Harness::new(FakeProvider::accepting("sub"));
    let cookie = harness.signed_in().await;

    let response = harness.get("/logout", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/");
    assert!(set_cookie_header(&response).contains("Max-Age=0"));

    let cleared = session_cookie(&response).unwrap();
    let response = harness.get("/protected_resource", Some(&cleared)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn add_strings_reports_anagram() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness
        .post_form("First+String=Listen&Second+String=Silent")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_text(response).await, "True");

    assert_eq!(
        harness.store.rows(),
        vec![AnagramRecord {
            string_one: "listen".to_string(),
            string_two: "silent".to_string(),
            is_anagram: true,
        }]
    );
}

#[tokio::test]
async fn add_strings_keeps_whitespace() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness
        .post_form("First%20String=nag%20a%20ram&Second%20String=anagram%20")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "False");
}

#[tokio::test]
async fn add_strings_reuses_stored_result() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let first = harness.post_form("First+String=Dusty&Second+String=Study").await;
    assert_eq!(body_text(first).await, "True");

    let second = harness.post_form("First+String=study&Second+String=dusty").await;
    assert_eq!(body_text(second).await, "True");

    assert_eq!(harness.store.rows().len(), 1);
}

#[tokio::test]
async fn add_strings_missing_field_is_bad_request() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.post_form("First+String=listen").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.store.rows().is_empty());
}

#[tokio::test]
async fn add_strings_rejects_nul_characters() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness
        .post_form("First+String=ab%00&Second+String=%00ba")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(harness.store.rows().is_empty());
}

#[tokio::test]
async fn add_strings_store_failure_is_server_error() {
    let harness = Harness::new(FakeProvider::accepting("sub"));
    harness.store.set_unavailable(true);

    let response = harness
        .post_form("First+String=Listen&Second+String=Silent")
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_reports_store_status() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["database"], "ok");

    harness.store.set_unavailable(true);
    let response = harness.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["database"], "error");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let harness = Harness::new(FakeProvider::accepting("sub"));

    let response = harness.get("/api-docs/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(body["paths"]["/AddStrings"].is_object());
}
