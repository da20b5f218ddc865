use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{
        AttendanceRequest, ClassDefinition, ClassSession, CreateSessionRequest, EnrollRequest,
        Enrollment, Member, NewClassDefinition, NewMember, NewStaffMember, SessionStats,
        StaffMember, TenantContext, UpdateSessionRequest,
    },
    validation::validate_days,
    views::SessionView,
};

#[derive(Debug, serde::Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, serde::Deserialize)]
pub struct CalendarQuery {
    pub date: Option<NaiveDate>,
    #[serde(default = "default_days")]
    pub days: u8,
}

fn default_days() -> u8 {
    7
}

fn today(state: &AppState) -> NaiveDate {
    Utc::now()
        .with_timezone(&state.scheduler.config().time_zone)
        .date_naive()
}

#[utoipa::path(get, path = "/", tag = "system")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Gym Scheduler API",
        "endpoints": {
            "/sessions": "Schedule and list class sessions",
            "/sessions.ical": "Download the session calendar as iCal file",
            "/classes": "Class definitions",
            "/staff": "Staff directory",
            "/members": "Member directory"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "system")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "system")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    post,
    path = "/classes",
    request_body = NewClassDefinition,
    responses((status = 201, description = "Class registered", body = ClassDefinition)),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn create_class(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<NewClassDefinition>,
) -> Result<impl IntoResponse, ApiError> {
    if body.capacity == 0 {
        return Err(ApiError::BadRequest("capacity must be a positive integer".into()));
    }
    let class = state.directory.add_class(&ctx.tenant_id, body).await;
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    get,
    path = "/classes",
    responses((status = 200, description = "Class definitions", body = [ClassDefinition])),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn list_classes(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.directory.list_classes(&ctx.tenant_id).await))
}

#[utoipa::path(
    post,
    path = "/staff",
    request_body = NewStaffMember,
    responses((status = 201, description = "Staff member registered", body = StaffMember)),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn create_staff(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<NewStaffMember>,
) -> Result<impl IntoResponse, ApiError> {
    let staff = state.directory.add_staff(&ctx.tenant_id, body).await;
    Ok((StatusCode::CREATED, Json(staff)))
}

#[utoipa::path(
    get,
    path = "/staff",
    responses((status = 200, description = "Staff directory", body = [StaffMember])),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn list_staff(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.directory.list_staff(&ctx.tenant_id).await))
}

#[utoipa::path(
    post,
    path = "/members",
    request_body = NewMember,
    responses((status = 201, description = "Member registered", body = Member)),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn create_member(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<NewMember>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state.directory.add_member(&ctx.tenant_id, body).await;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    get,
    path = "/members",
    responses((status = 200, description = "Member directory", body = [Member])),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "directory"
)]
pub async fn list_members(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.directory.list_members(&ctx.tenant_id).await))
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session scheduled", body = ClassSession),
        (status = 400, description = "Invalid time interval, room or capacity"),
        (status = 404, description = "Class or instructor not found"),
        (status = 409, description = "Room or instructor already booked"),
        (status = 422, description = "Instructor is not an active trainer")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(body): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.scheduler.create_session(&ctx, body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/sessions",
    params(
        ("date" = Option<String>, Query, description = "Calendar day (YYYY-MM-DD), defaults to today")
    ),
    responses((status = 200, description = "Sessions starting that day", body = [SessionView])),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| today(&state));
    let sessions = state.scheduler.list_sessions_by_date(&ctx, date).await?;
    let views = state.scheduler.describe_all(&ctx, sessions).await?;
    Ok(Json(views))
}

#[utoipa::path(
    get,
    path = "/sessions.ical",
    params(
        ("date" = Option<String>, Query, description = "First calendar day (YYYY-MM-DD), defaults to today"),
        ("days" = u8, Query, description = "Number of days (1-31)")
    ),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 404, description = "No sessions found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn get_ical(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = validate_days(query.days)?;
    let from = query.date.unwrap_or_else(|| today(&state));

    let sessions = state
        .scheduler
        .list_sessions_for_days(&ctx, from, days.into())
        .await?;
    if sessions.is_empty() {
        return Err(ApiError::NotFound("No sessions found".into()));
    }
    let views = state.scheduler.describe_all(&ctx, sessions).await?;

    let body = state.exporter.generate(&views);
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            (
                "content-disposition",
                "attachment; filename=sessions.ics",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session with resolved class, instructor and members", body = SessionView),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.scheduler.session_view(&ctx, id).await?))
}

#[utoipa::path(
    patch,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Updated session", body = ClassSession),
        (status = 400, description = "Invalid field value"),
        (status = 404, description = "Session, class or instructor not found"),
        (status = 409, description = "Room or instructor already booked"),
        (status = 422, description = "Invalid instructor or status transition")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn update_session(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateSessionRequest>,
) -> Result<Json<ClassSession>, ApiError> {
    Ok(Json(state.scheduler.update_session(&ctx, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.scheduler.delete_session(&ctx, id).await?;
    Ok(Json(serde_json::json!({"deleted": removed.id})))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/stats",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Attendance and occupancy", body = SessionStats),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "sessions"
)]
pub async fn get_session_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStats>, ApiError> {
    Ok(Json(state.scheduler.session_stats(&ctx, id).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Enrollment list", body = [Enrollment]),
        (status = 404, description = "Session or member not found"),
        (status = 409, description = "Already enrolled or session full"),
        (status = 422, description = "Session no longer accepts enrollments")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "enrollments"
)]
pub async fn enroll(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(body): Json<EnrollRequest>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    Ok(Json(state.scheduler.enroll(&ctx, id, body.member_id).await?))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}/enrollments/{member_id}",
    params(
        ("id" = Uuid, Path, description = "Session id"),
        ("member_id" = Uuid, Path, description = "Member id")
    ),
    responses(
        (status = 200, description = "Enrollment list", body = [Enrollment]),
        (status = 404, description = "Session or enrollment not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "enrollments"
)]
pub async fn unenroll(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    Ok(Json(state.scheduler.unenroll(&ctx, id, member_id).await?))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/enrollments/{member_id}/attendance",
    params(
        ("id" = Uuid, Path, description = "Session id"),
        ("member_id" = Uuid, Path, description = "Member id")
    ),
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Enrollment list", body = [Enrollment]),
        (status = 404, description = "Session or enrollment not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "enrollments"
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<AttendanceRequest>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    Ok(Json(
        state
            .scheduler
            .mark_attendance(&ctx, id, member_id, body.attended)
            .await?,
    ))
}
