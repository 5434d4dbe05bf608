//! End-to-end flows through the axum router.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::Value;
use time::macros::datetime;
use tower::ServiceExt;

use warden_auth::config::UserConfig;
use warden_auth::storage::{
    ConfigCredentialVerifier, MemoryAuthorizationCodes, MemoryTokenStore, StaticClientRegistry,
};
use warden_auth::token::{SigningKey, TokenConfig};
use warden_auth::{
    Client, GrantType, JwtCodec, ManualClock, OAuthService, OAuthState, SigningAlgorithm,
    TokenService, router,
};

const WEB_BASIC: &str = "Basic d2ViOndlYi1zZWNyZXQ=";
const SVC_BASIC: &str = "Basic c3ZjOnN2Yy1zZWNyZXQ=";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

fn app_with_grants(enabled: Vec<GrantType>) -> TestApp {
    let clock = Arc::new(ManualClock::new(datetime!(2021-07-01 12:00:00 UTC)));

    let salt = SaltString::from_b64("c29tZXNhbHRzb21lc2FsdA").unwrap();
    let password_hash = Argon2::default()
        .hash_password(b"wonderland", &salt)
        .unwrap()
        .to_string();

    let tokens = Arc::new(TokenService::new(
        Arc::new(JwtCodec::new(SigningKey::new(
            SigningAlgorithm::HmacSha256,
            "integration-secret",
        ))),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(ConfigCredentialVerifier::new(&[UserConfig {
            username: "alice".to_string(),
            password_hash,
        }])),
        clock.clone(),
        TokenConfig::new("https://warden.test"),
    ));

    let clients = StaticClientRegistry::new([
        Client {
            client_id: "web".to_string(),
            secret: "web-secret".to_string(),
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::Implicit],
        },
        Client {
            client_id: "svc".to_string(),
            secret: "svc-secret".to_string(),
            redirect_uris: vec![],
            grant_types: vec![GrantType::ClientCredentials],
        },
    ]);

    let service = OAuthService::new(
        tokens,
        Arc::new(clients),
        Arc::new(MemoryAuthorizationCodes::new(
            std::time::Duration::from_secs(600),
            clock.clone(),
        )),
        enabled,
    );

    TestApp {
        router: router(OAuthState::new(Arc::new(service))),
        clock,
    }
}

fn app() -> TestApp {
    app_with_grants(GrantType::supported())
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn form_post(uri: &str, basic: Option<&str>, params: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(basic) = basic {
        builder = builder.header(header::AUTHORIZATION, basic);
    }
    builder.body(Body::from(body)).unwrap()
}

fn introspect(token: &str) -> Request<Body> {
    Request::post(format!("/introspection?token={token}"))
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn password_grant(app: &TestApp) -> Value {
    let (status, headers, body) = send(
        app,
        form_post(
            "/token",
            None,
            &[
                ("grant_type", "password"),
                ("username", "alice"),
                ("password", "wonderland"),
                ("scope", "read write"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    json(&body)
}

#[tokio::test]
async fn healthz_answers_ok() {
    let app = app();
    let (status, _, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn password_grant_then_introspect_and_refresh() {
    let app = app();
    let tokens = password_grant(&app).await;
    assert_eq!(tokens["token_type"], "bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "read write");

    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let (status, _, body) = send(&app, introspect(access)).await;
    assert_eq!(status, StatusCode::OK);
    let introspection = json(&body);
    assert_eq!(introspection["active"], true);
    assert_eq!(introspection["sub"], "alice");
    assert_eq!(introspection["iss"], "https://warden.test");
    assert_eq!(introspection["token_type"], "bearer");
    assert_eq!(introspection["scope"], "read write");

    let (status, _, body) = send(
        &app,
        form_post(
            "/token",
            None,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = json(&body);
    assert_ne!(refreshed["access_token"], tokens["access_token"]);
    assert_eq!(refreshed["scope"], "read write");

    // The old pair is gone
    let (status, _, _) = send(&app, introspect(access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        &app,
        form_post(
            "/token",
            None,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_grant");
}

#[tokio::test]
async fn wrong_password_is_invalid_grant() {
    let app = app();
    let (status, _, body) = send(
        &app,
        form_post(
            "/token",
            None,
            &[
                ("grant_type", "password"),
                ("username", "alice"),
                ("password", "guess"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_grant");
}

#[tokio::test]
async fn access_token_expires() {
    let app = app();
    let tokens = password_grant(&app).await;
    let access = tokens["access_token"].as_str().unwrap();

    app.clock.advance(time::Duration::seconds(3599));
    let (status, _, _) = send(&app, introspect(access)).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(time::Duration::seconds(1));
    let (status, _, _) = send(&app, introspect(access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The refresh half lives longer
    let refresh = tokens["refresh_token"].as_str().unwrap();
    let (status, _, body) = send(
        &app,
        Request::post(format!(
            "/introspection?token={refresh}&token_type_hint=refresh_token"
        ))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["token_type"], "refresh_token");
}

#[tokio::test]
async fn unsupported_grant_type_is_not_implemented() {
    let app = app();
    let (status, _, body) = send(
        &app,
        form_post("/token", None, &[("grant_type", "device_code")]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json(&body)["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn disabled_grant_type_is_not_implemented() {
    let app = app_with_grants(vec![GrantType::ClientCredentials]);
    let (status, _, _) = send(
        &app,
        form_post(
            "/token",
            None,
            &[
                ("grant_type", "password"),
                ("username", "alice"),
                ("password", "wonderland"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn unsupported_response_type_is_not_implemented() {
    let app = app();
    let (status, _, body) = send(
        &app,
        get("/authorize?response_type=id_token&client_id=web"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json(&body)["error"], "unsupported_response_type");
}

#[tokio::test]
async fn disallowed_redirect_is_forbidden_without_redirect() {
    let app = app();
    let (status, headers, body) = send(
        &app,
        get("/authorize?response_type=code&client_id=web&redirect_uri=https%3A%2F%2Fevil.example.com%2F"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!headers.contains_key(header::LOCATION));
    assert_eq!(json(&body)["error"], "access_denied");
}

#[tokio::test]
async fn authorization_code_flow() {
    let app = app();
    let (status, headers, _) = send(
        &app,
        get("/authorize?response_type=code&client_id=web&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback&scope=read&state=xyz"),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);

    let location = url::Url::parse(headers[header::LOCATION].to_str().unwrap()).unwrap();
    assert_eq!(location.host_str(), Some("app.example.com"));
    assert_eq!(location.path(), "/callback");
    let params: std::collections::HashMap<_, _> = location.query_pairs().into_owned().collect();
    assert_eq!(params["state"], "xyz");
    let code = params["code"].as_str();

    let exchange = |basic| {
        form_post(
            "/token",
            basic,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", "https://app.example.com/callback"),
            ],
        )
    };

    let (status, _, body) = send(&app, exchange(Some(WEB_BASIC))).await;
    assert_eq!(status, StatusCode::OK);
    let tokens = json(&body);
    assert_eq!(tokens["scope"], "read");

    let (status, _, body) = send(&app, introspect(tokens["access_token"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["sub"], "web");

    // Codes are single-use
    let (status, _, body) = send(&app, exchange(Some(WEB_BASIC))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "invalid_grant");
}

#[tokio::test]
async fn authorization_code_requires_client_authentication() {
    let app = app();
    let (status, _, body) = send(
        &app,
        get("/authorize?response_type=code&client_id=web"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = json(&body)["code"].as_str().unwrap().to_string();

    let (status, headers, body) = send(
        &app,
        form_post(
            "/token",
            None,
            &[("grant_type", "authorization_code"), ("code", code.as_str())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(json(&body)["error"], "invalid_client");
}

#[tokio::test]
async fn implicit_flow_returns_fragment() {
    let app = app();
    let (status, headers, _) = send(
        &app,
        get("/authorize?response_type=token&client_id=web&redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback&state=s1"),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);

    let location = url::Url::parse(headers[header::LOCATION].to_str().unwrap()).unwrap();
    assert_eq!(location.query(), None);
    let fragment = location.fragment().unwrap();
    let params: std::collections::HashMap<_, _> = url::form_urlencoded::parse(fragment.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(params["token_type"], "bearer");
    assert_eq!(params["expires_in"], "3600");
    assert_eq!(params["state"], "s1");

    let (status, _, _) = send(&app, introspect(params["access_token"].as_str())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn implicit_flow_without_redirect_issues_nothing() {
    let app = app();

    // "web" may use the implicit grant, but only through its redirect
    let (status, headers, body) = send(
        &app,
        get("/authorize?response_type=token&client_id=web&scope=admin"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers.get(header::LOCATION).is_none());
    let body = json(&body);
    assert_eq!(body["error"], "invalid_request");
    assert!(body.get("access_token").is_none());

    // "svc" is not registered for it at all
    let (status, _, body) = send(
        &app,
        get("/authorize?response_type=token&client_id=svc&scope=admin"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json(&body).get("access_token").is_none());
}

#[tokio::test]
async fn introspecting_garbage_is_unauthorized() {
    let app = app();
    for token in ["bad.bad.bad", "abc", "a.b.c.d"] {
        let (status, _, body) = send(&app, introspect(token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{token}");
        assert_eq!(json(&body)["error"], "unauthorized");
    }
}

#[tokio::test]
async fn revoke_invalidates_pair() {
    let app = app();
    let (status, _, body) = send(
        &app,
        form_post(
            "/token",
            Some(SVC_BASIC),
            &[("grant_type", "client_credentials"), ("scope", "read")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tokens = json(&body);
    let access = tokens["access_token"].as_str().unwrap();

    // Client authentication is required
    let (status, _, _) = send(&app, form_post("/revoke", None, &[("token", access)])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        form_post(
            "/revoke",
            Some(SVC_BASIC),
            &[("token", access), ("token_type_hint", "access_token")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, introspect(access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Revoking again still succeeds
    let (status, _, _) = send(
        &app,
        form_post("/revoke", Some(SVC_BASIC), &[("token", access)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn revoke_by_another_client_is_ignored() {
    let app = app();
    let (_, _, body) = send(
        &app,
        form_post("/token", Some(SVC_BASIC), &[("grant_type", "client_credentials")]),
    )
    .await;
    let tokens = json(&body);
    let access = tokens["access_token"].as_str().unwrap();

    let (status, _, _) = send(
        &app,
        form_post("/revoke", Some(WEB_BASIC), &[("token", access)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&app, introspect(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["client_id"], "svc");
}
