use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use warden_server::{AppConfig, build_app, build_service};

fn config() -> AppConfig {
    let cfg: AppConfig = toml::from_str(
        r#"
[auth]
issuer = "https://warden.test"

[auth.signing]
secret = "endpoint-secret"

[[auth.clients]]
client_id = "svc"
secret = "svc-secret"
grant_types = ["client_credentials"]
"#,
    )
    .expect("parse config");
    cfg.validate().expect("valid config");
    cfg
}

#[tokio::test]
async fn healthz_through_full_stack() {
    let cfg = config();
    let app = build_app(&cfg, build_service(&cfg).await.unwrap());

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn client_credentials_and_introspection() {
    let cfg = config();
    let service = build_service(&cfg).await.unwrap();
    let app = build_app(&cfg, service.clone());

    let response = app
        .clone()
        .oneshot(
            Request::post("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "grant_type=client_credentials&client_id=svc&client_secret=svc-secret&scope=read",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let tokens: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let access = tokens["access_token"].as_str().unwrap();

    let response = app
        .oneshot(
            Request::post(format!("/introspection?token={access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Fresh pairs survive a sweep
    assert_eq!(service.sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn password_grant_for_unknown_user_is_invalid_grant() {
    let cfg = config();
    let app = build_app(&cfg, build_service(&cfg).await.unwrap());

    let response = app
        .oneshot(
            Request::post("/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("grant_type=password&username=bob&password=x"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
