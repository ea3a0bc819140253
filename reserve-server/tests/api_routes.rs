//! HTTP surface: routing, auth gates, envelopes and status codes

mod common;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use reserve_server::api::build_app;
use reserve_server::{BookingPolicy, ServerState};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(state: &ServerState) -> Router {
    build_app(state).with_state(state.clone())
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, name: &str, email: &str, role: Option<&str>) -> Value {
    let mut body = json!({ "name": name, "email": email, "password": "password123" });
    if let Some(role) = role {
        body["role"] = json!(role);
    }
    let (status, json) = call(app, "POST", "/api/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

async fn login(app: &Router, email: &str) -> String {
    let body = json!({ "email": email, "password": "password123" });
    let (status, json) = call(app, "POST", "/api/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["data"]["token"].as_str().unwrap().to_string()
}

/// Admin token, customer token, customer id
async fn tokens(app: &Router) -> (String, String, i64) {
    register(app, "Manager", "admin@wereserve.com", Some("admin")).await;
    let guest = register(app, "Guest", "guest@example.com", None).await;
    let admin = login(app, "admin@wereserve.com").await;
    let customer = login(app, "guest@example.com").await;
    (admin, customer, guest["data"]["id"].as_i64().unwrap())
}

async fn create_table(app: &Router, admin: &str, name: &str) -> i64 {
    let body = json!({ "table_name": name, "capacity": 4, "status": "available" });
    let (status, json) = call(app, "POST", "/api/tables", Some(admin), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let state = common::state(BookingPolicy::ExactSlot);
    let (status, json) = call(&app(&state), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["booking_policy"], "exact_slot");
}

#[tokio::test]
async fn register_and_login_use_the_success_envelope() {
    let state = common::state(BookingPolicy::ExactSlot);
    let app = app(&state);

    let json = register(&app, "Guest", "guest@example.com", None).await;
    assert_eq!(json["message"], "User registered successfully");
    assert_eq!(json["data"]["role"], "customer");
    assert!(json["data"].get("password_hash").is_none());

    let body = json!({ "email": "guest@example.com", "password": "password123" });
    let (status, json) = call(&app, "POST", "/api/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(json["data"]["user"]["email"], "guest@example.com");

    let body = json!({ "email": "guest@example.com", "password": "not-the-one" });
    let (status, json) = call(&app, "POST", "/api/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 1002);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn bad_input_is_a_400_envelope() {
    let state = common::state(BookingPolicy::ExactSlot);
    let app = app(&state);

    let body = json!({ "name": "Al", "email": "nope", "password": "password123" });
    let (status, json) = call(&app, "POST", "/api/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 2);
    assert!(json["details"]["email"].is_array());

    let req = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let state = common::state(BookingPolicy::ExactSlot);
    let app = app(&state);

    let (status, json) = call(&app, "GET", "/api/tables", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 1001);

    let (status, json) = call(&app, "GET", "/api/tables", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 1004);

    let (status, _) = call(&app, "GET", "/api/reservation/my-reservation", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn table_management_is_admin_only() {
    let state = common::state(BookingPolicy::ExactSlot);
    let app = app(&state);
    let (admin, customer, _) = tokens(&app).await;

    let body = json!({ "table_name": "Window", "capacity": 4 });
    let (status, json) = call(&app, "POST", "/api/tables", Some(&customer), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], 2003);

    let id = create_table(&app, &admin, "Window").await;

    let (status, json) = call(&app, "GET", "/api/tables", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let uri = "/api/tables/status?status=available";
    let (status, json) = call(&app, "GET", uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["id"], id);

    let uri = "/api/tables/status?status=broken";
    let (status, json) = call(&app, "GET", uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 7005);

    let body = json!({ "table_name": "Window", "capacity": 2 });
    let (status, json) = call(&app, "POST", "/api/tables", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], 7002);

    let uri = format!("/api/tables/{id}");
    let (status, json) = call(&app, "PUT", &uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 6);

    let (status, json) = call(&app, "PUT", &uri, Some(&admin), Some(json!({ "capacity": 6 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["capacity"], 6);

    let (status, _) = call(&app, "DELETE", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = call(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 7001);
}

#[tokio::test]
async fn reservation_lifecycle_over_http() {
    let state = common::state(BookingPolicy::ExactSlot);
    let app = app(&state);
    let (admin, customer, customer_id) = tokens(&app).await;
    let table_id = create_table(&app, &admin, "Patio").await;

    let booking = json!({
        "table_id": table_id,
        "reservation_datetime": "2024-06-01T19:00:00Z",
        "number_of_people": 2
    });
    let (status, json) =
        call(&app, "POST", "/api/reservation", Some(&customer), Some(booking.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["data"]["user_id"], customer_id);
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) =
        call(&app, "POST", "/api/reservation", Some(&customer), Some(booking)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], 4002);

    let uri = format!("/api/tables/{table_id}");
    let (_, json) = call(&app, "GET", &uri, Some(&customer), None).await;
    assert_eq!(json["data"]["status"], "reserved");

    let (status, json) =
        call(&app, "GET", "/api/reservation/my-reservation", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["id"], id);
    assert_eq!(json["data"][0]["table"]["name"], "Patio");

    let (status, _) = call(&app, "GET", "/api/reservation", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, json) = call(&app, "GET", "/api/reservation", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/reservation/{id}");
    let (status, json) = call(&app, "PUT", &uri, Some(&customer), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 6);

    let change = json!({ "number_of_people": 4 });
    let (status, json) = call(&app, "PUT", &uri, Some(&customer), Some(change)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["number_of_people"], 4);

    let (status, json) = call(&app, "GET", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["reservation_datetime"], "2024-06-01T19:00:00Z");

    let (status, _) = call(&app, "DELETE", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = call(&app, "GET", &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 4001);

    let uri = format!("/api/tables/{table_id}");
    let (_, json) = call(&app, "GET", &uri, Some(&customer), None).await;
    assert_eq!(json["data"]["status"], "available");

    let (status, json) = call(&app, "GET", "/api/reservation", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!([]));
}

#[tokio::test]
async fn users_see_only_themselves() {
    let state = common::state(BookingPolicy::ExactSlot);
    let app = app(&state);
    let (admin, customer, customer_id) = tokens(&app).await;

    let (status, _) = call(&app, "GET", "/api/users", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, json) = call(&app, "GET", "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let own = format!("/api/users/{customer_id}");
    let (status, json) = call(&app, "GET", &own, Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["email"], "guest@example.com");

    // the admin registered first
    let (status, _) = call(&app, "GET", "/api/users/1", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let promote = json!({ "role": "admin" });
    let (status, json) = call(&app, "PUT", &own, Some(&customer), Some(promote)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], 2003);

    let (status, _) = call(&app, "DELETE", &own, Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "DELETE", &own, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let state = common::state(BookingPolicy::ExactSlot);
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app(&state).oneshot(req).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}
