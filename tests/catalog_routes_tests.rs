use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::TimeDelta;
use serde_json::{Value, json};
use std::sync::Arc;
use storefront_catalog::db::{
    SqliteCategories, SqliteProducts, SqliteSessions, SqliteUsers, sqlite,
};
use storefront_catalog::router::{CatalogState, catalog_router};
use storefront_catalog::service::{Accounts, SessionManager};
use tower::ServiceExt;

async fn app() -> Router {
    let pool = sqlite::connect_in_memory()
        .await
        .expect("failed to open in-memory database");
    let sessions = SessionManager::new(
        Arc::new(SqliteSessions::new(pool.clone())),
        TimeDelta::hours(24),
    );
    let accounts = Accounts::new(Arc::new(SqliteUsers::new(pool.clone())), sessions);
    let state = CatalogState::new(
        accounts,
        Arc::new(SqliteCategories::new(pool.clone())),
        Arc::new(SqliteProducts::new(pool)),
        true,
    );
    catalog_router(state)
}

fn post(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

async fn body_json(resp: axum::response::Response) -> Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}

/// Registers `login` and returns the `sessionToken=...` pair to send back.
async fn register(app: &Router, login: &str) -> String {
    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/register",
            None,
            json!({"login": login, "password": "secret"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("missing set-cookie")
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    set_cookie
        .split(';')
        .next()
        .expect("empty set-cookie")
        .to_string()
}

#[tokio::test]
async fn mutating_routes_require_a_session() {
    let app = app().await;

    let resp = app
        .clone()
        .oneshot(post("/api/v1/category/add", None, json!({"name": "phone"})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/category/add",
            Some("sessionToken=not-a-real-token"),
            json!({"name": "phone"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_issues_a_working_cookie() {
    let app = app().await;
    register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/login",
            None,
            json!({"login": "alice", "password": "wrong"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/login",
            None,
            json!({"login": "alice", "password": "secret"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("missing set-cookie")
        .to_string();

    let resp = app
        .clone()
        .oneshot(post("/api/v1/category/add", Some(&cookie), json!({"name": "phone"})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app().await;
    register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/register",
            None,
            json!({"login": "alice", "password": "other"}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_and_product_lifecycle() {
    let app = app().await;
    let cookie = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(post("/api/v1/category/add", Some(&cookie), json!({"name": "phone"})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let phone = body_json(resp).await;
    let phone_id = phone["id"].as_i64().expect("category id");

    let resp = app
        .clone()
        .oneshot(post("/api/v1/category/add", Some(&cookie), json!({"name": "phone"})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["error"]["code"], "ALREADY_EXISTS");

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/product/add",
            Some(&cookie),
            json!({"productName": "iphone", "categoryId": phone_id}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let iphone_id = body_json(resp).await["id"].as_i64().expect("product id");

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/product/add",
            Some(&cookie),
            json!({"productName": "redmi", "categoryId": 999}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["code"], "CATEGORY_NOT_FOUND");

    let resp = app
        .clone()
        .oneshot(get(&format!("/api/v1/product/get/{phone_id}")))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!([{"id": iphone_id, "name": "iphone"}])
    );

    let resp = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/category/delete/{phone_id}"),
            Some(&cookie),
            json!({}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(get("/api/v1/category/getAll"))
        .await
        .expect("request failed");
    assert_eq!(body_json(resp).await, json!([]));

    let resp = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/product/delete/{iphone_id}"),
            Some(&cookie),
            json!({}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let app = app().await;
    let cookie = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(post("/api/v1/category/add", Some(&cookie), json!({"name": ""})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/product/updateCategory",
            Some(&cookie),
            json!({"productId": 1, "oldCategoryId": 0, "newCategoryId": 2}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(get("/api/v1/product/get/abc"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_invalidates_the_cookie() {
    let app = app().await;
    let cookie = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(post("/api/v1/logout", Some(&cookie), json!({})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(post("/api/v1/category/add", Some(&cookie), json!({"name": "phone"})))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
