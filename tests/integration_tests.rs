use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use gym_scheduler::settings::Settings;
use gym_scheduler::{AppState, build_router};
use serde_json::{Value, json};
use tower::Service;

const TOKEN: &str = "test-token-123";
const ADMIN: &str = "admin-token-456";
const TENANT: &str = "gym-a";

/// Helper function to create test app with default settings
fn create_test_app() -> Router {
    let settings = Settings {
        debug: true,
        auth_token: TOKEN.to_string(),
        admin_token: Some(ADMIN.to_string()),
        ..Settings::default()
    };
    build_router(AppState::new(settings).unwrap())
}

/// Helper to extract response body as string
async fn response_body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(
    app: &mut Router,
    method: Method,
    uri: &str,
    tenant: &str,
    body: Option<Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header("x-tenant-id", tenant);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.call(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    (status, response_body_string(response.into_body()).await)
}

async fn post_json(app: &mut Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::POST, uri, TENANT, Some(body)).await;
    let json = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, json)
}

/// Registers Yoga (capacity 10) and trainer Jane, returning their ids.
async fn seed(app: &mut Router) -> (String, String) {
    let (_, class) = post_json(
        app,
        "/classes",
        json!({"name": "Yoga", "category": "mind-body", "duration_min": 60, "capacity": 10}),
    )
    .await;
    let (_, staff) = post_json(app, "/staff", json!({"name": "Jane", "role": "trainer"})).await;
    (
        class["id"].as_str().unwrap().to_string(),
        staff["id"].as_str().unwrap().to_string(),
    )
}

fn session_body(class_id: &str, instructor_id: &str, room: &str, start: &str, end: &str) -> Value {
    json!({
        "class_id": class_id,
        "instructor_id": instructor_id,
        "room": room,
        "start_time": format!("2024-01-01T{start}:00Z"),
        "end_time": format!("2024-01-01T{end}:00Z"),
    })
}

#[tokio::test]
async fn test_root_endpoint() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let response = app
        .call(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("Gym Scheduler API"));
    assert!(body.contains("/sessions"));
}

#[tokio::test]
async fn test_healthz_live() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let response = app
        .call(
            Request::builder()
                .uri("/healthz/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_body_string(response.into_body()).await;
    assert!(body.contains(r#""status":"ok"#));
}

#[tokio::test]
async fn test_sessions_no_auth_token() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let response = app
        .call(
            Request::builder()
                .uri("/sessions?date=2024-01-01")
                .header("x-tenant-id", TENANT)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert - should fail without token
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sessions_query_token_requires_tenant() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let response = app
        .call(
            Request::builder()
                .uri(format!("/sessions?date=2024-01-01&token={TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_session_and_room_conflict() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;
    let (_, tom) = post_json(&mut app, "/staff", json!({"name": "Tom", "role": "trainer"})).await;
    let tom = tom["id"].as_str().unwrap().to_string();

    // Act
    let (created, session) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "R1", "09:00", "10:00"),
    )
    .await;
    let (clash, message) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &tom, "R1", "09:30", "10:30"),
    )
    .await;
    let (back_to_back, _) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &tom, "R1", "10:00", "11:00"),
    )
    .await;

    // Assert
    assert_eq!(created, StatusCode::CREATED);
    assert_eq!(session["status"], "scheduled");
    assert_eq!(session["max_capacity"], 10);
    assert_eq!(clash, StatusCode::CONFLICT);
    assert_eq!(message, "room already booked");
    assert_eq!(back_to_back, StatusCode::CREATED);
}

#[tokio::test]
async fn test_non_trainer_is_unprocessable() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, _) = seed(&mut app).await;
    let (_, manager) =
        post_json(&mut app, "/staff", json!({"name": "Mark", "role": "manager"})).await;

    // Act
    let (status, message) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, manager["id"].as_str().unwrap(), "R9", "06:00", "07:00"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(message, "instructor is not a trainer");
}

#[tokio::test]
async fn test_invalid_interval_is_bad_request() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;

    // Act
    let (status, _) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "R1", "10:00", "09:00"),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enrollment_lifecycle() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;
    let (_, session) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "Room A", "09:00", "10:00"),
    )
    .await;
    let session_id = session["id"].as_str().unwrap().to_string();
    let (_, member) = post_json(&mut app, "/members", json!({"name": "M1"})).await;
    let member_id = member["id"].as_str().unwrap().to_string();
    let enroll_uri = format!("/sessions/{session_id}/enrollments");

    // Act
    let (enrolled, list) =
        post_json(&mut app, &enroll_uri, json!({"member_id": member_id})).await;
    let (duplicate, _) = post_json(&mut app, &enroll_uri, json!({"member_id": member_id})).await;
    let (marked, _) = send(
        &mut app,
        Method::PUT,
        &format!("/sessions/{session_id}/enrollments/{member_id}/attendance"),
        TENANT,
        Some(json!({"attended": true})),
    )
    .await;
    let (_, stats) = send(
        &mut app,
        Method::GET,
        &format!("/sessions/{session_id}/stats"),
        TENANT,
        None,
    )
    .await;
    let (_, view) = send(
        &mut app,
        Method::GET,
        &format!("/sessions/{session_id}"),
        TENANT,
        None,
    )
    .await;

    // Assert
    assert_eq!(enrolled, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(duplicate, StatusCode::CONFLICT);
    assert_eq!(marked, StatusCode::OK);

    let stats: Value = serde_json::from_str(&stats).unwrap();
    assert_eq!(
        stats["attendance"],
        json!({"attended": 1, "total": 1, "percentage": 100})
    );

    let view: Value = serde_json::from_str(&view).unwrap();
    assert_eq!(view["class"]["name"], "Yoga");
    assert_eq!(view["instructor"]["name"], "Jane");
    assert_eq!(view["enrolled_members"][0]["member"]["name"], "M1");
    assert_eq!(view["enrolled_members"][0]["attended"], true);
}

#[tokio::test]
async fn test_unenroll_unknown_member_is_not_found() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;
    let (_, session) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "Room A", "09:00", "10:00"),
    )
    .await;

    // Act
    let (status, _) = send(
        &mut app,
        Method::DELETE,
        &format!(
            "/sessions/{}/enrollments/{}",
            session["id"].as_str().unwrap(),
            uuid::Uuid::new_v4()
        ),
        TENANT,
        None,
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_are_tenant_isolated() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;
    let (_, session) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "Room A", "09:00", "10:00"),
    )
    .await;
    let uri = format!("/sessions/{}", session["id"].as_str().unwrap());

    // Act
    let (foreign_get, _) = send(&mut app, Method::GET, &uri, "gym-b", None).await;
    let (foreign_list, body) =
        send(&mut app, Method::GET, "/sessions?date=2024-01-01", "gym-b", None).await;
    let (own_list, own_body) =
        send(&mut app, Method::GET, "/sessions?date=2024-01-01", TENANT, None).await;

    // Assert
    assert_eq!(foreign_get, StatusCode::NOT_FOUND);
    assert_eq!(foreign_list, StatusCode::OK);
    assert_eq!(body, "[]");
    assert_eq!(own_list, StatusCode::OK);
    let listed: Value = serde_json::from_str(&own_body).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_superuser_can_use_foreign_class() {
    // Arrange
    let mut app = create_test_app();
    let (_, foreign_class) = {
        let (status, body) = send(
            &mut app,
            Method::POST,
            "/classes",
            "gym-b",
            Some(json!({"name": "Spin", "duration_min": 45, "capacity": 20})),
        )
        .await;
        (status, serde_json::from_str::<Value>(&body).unwrap())
    };
    let (_, jane) = post_json(&mut app, "/staff", json!({"name": "Jane", "role": "trainer"})).await;
    let body = session_body(
        foreign_class["id"].as_str().unwrap(),
        jane["id"].as_str().unwrap(),
        "R1",
        "09:00",
        "10:00",
    );

    // Act
    let (tenant_status, _) = post_json(&mut app, "/sessions", body.clone()).await;
    let response = app
        .call(
            Request::builder()
                .method(Method::POST)
                .uri("/sessions")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN}"))
                .header("x-tenant-id", TENANT)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(tenant_status, StatusCode::NOT_FOUND);
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_update_and_delete_session() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;
    let (_, session) = post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "Room A", "09:00", "10:00"),
    )
    .await;
    let uri = format!("/sessions/{}", session["id"].as_str().unwrap());

    // Act
    let (patched, body) = send(
        &mut app,
        Method::PATCH,
        &uri,
        TENANT,
        Some(json!({"notes": "bring mats", "status": "cancelled"})),
    )
    .await;
    let (deleted, _) = send(&mut app, Method::DELETE, &uri, TENANT, None).await;
    let (missing, _) = send(&mut app, Method::DELETE, &uri, TENANT, None).await;

    // Assert
    assert_eq!(patched, StatusCode::OK);
    let updated: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(updated["notes"], "bring mats");
    assert_eq!(updated["status"], "cancelled");
    assert_eq!(deleted, StatusCode::OK);
    assert_eq!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ical_endpoint_empty_sessions() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let (status, _) = send(
        &mut app,
        Method::GET,
        "/sessions.ical?date=2024-01-01&days=7",
        TENANT,
        None,
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ical_endpoint_invalid_days() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let (status, _) = send(
        &mut app,
        Method::GET,
        "/sessions.ical?date=2024-01-01&days=0",
        TENANT,
        None,
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sessions_date_at_end_of_calendar_is_bad_request() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let (status, body) = send(
        &mut app,
        Method::GET,
        "/sessions?date=%2B262142-12-31",
        TENANT,
        None,
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("date out of range"));
}

#[tokio::test]
async fn test_ical_endpoint_with_sessions() {
    // Arrange
    let mut app = create_test_app();
    let (class_id, jane) = seed(&mut app).await;
    post_json(
        &mut app,
        "/sessions",
        session_body(&class_id, &jane, "Room A", "09:00", "10:00"),
    )
    .await;

    // Act
    let response = app
        .call(
            Request::builder()
                .uri(format!("/sessions.ical?date=2024-01-01&days=1&token={TOKEN}"))
                .header("x-tenant-id", TENANT)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/calendar"
    );
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("BEGIN:VCALENDAR"));
    assert!(body.contains("SUMMARY:Yoga"));
    assert!(body.contains("Instructor: Jane"));
}

#[tokio::test]
async fn test_openapi_json_is_served() {
    // Arrange
    let mut app = create_test_app();

    // Act
    let response = app
        .call(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("/sessions/{id}/enrollments"));
}
