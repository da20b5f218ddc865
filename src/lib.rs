pub mod auth;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod ical;
pub mod models;
pub mod openapi;
pub mod scheduler;
pub mod settings;
pub mod slot;
pub mod store;
pub mod validation;
pub mod views;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use handlers::{
    create_class, create_member, create_session, create_staff, delete_session, enroll,
    get_ical, get_session, get_session_stats, healthz_live, healthz_ready, list_classes,
    list_members, list_sessions, list_staff, mark_attendance, root, unenroll, update_session,
};
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::directory::InMemoryDirectory;
use crate::ical::ICalExporter;
use crate::openapi::ApiDoc;
use crate::scheduler::{SchedulerConfig, SessionScheduler};
use crate::settings::Settings;
use crate::store::InMemorySessionStore;

#[derive(Clone)]
pub struct AppState {
    pub(crate) settings: Settings,
    pub(crate) scheduler: SessionScheduler,
    pub(crate) directory: Arc<InMemoryDirectory>,
    pub(crate) exporter: Arc<ICalExporter>,
}

impl AppState {
    /// Wires the scheduler to in-memory session storage and directory.
    pub fn new(settings: Settings) -> Result<Self, config::ConfigError> {
        let config = SchedulerConfig::from_settings(&settings)?;
        let directory = Arc::new(InMemoryDirectory::new());
        let scheduler = SessionScheduler::new(
            Arc::new(InMemorySessionStore::new()),
            directory.clone(),
            directory.clone(),
            directory.clone(),
            config,
        );
        Ok(Self {
            exporter: Arc::new(ICalExporter::new(settings.calendar_title.clone())),
            settings,
            scheduler,
            directory,
        })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings)?;
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!(
        "Starting Gym Scheduler API on {addr} (time zone {})",
        state.settings.timezone
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/classes", get(list_classes).post(create_class))
        .route("/staff", get(list_staff).post(create_staff))
        .route("/members", get(list_members).post(create_member))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions.ical", get(get_ical))
        .route(
            "/sessions/{id}",
            get(get_session).patch(update_session).delete(delete_session),
        )
        .route("/sessions/{id}/stats", get(get_session_stats))
        .route("/sessions/{id}/enrollments", post(enroll))
        .route(
            "/sessions/{id}/enrollments/{member_id}",
            delete(unenroll),
        )
        .route(
            "/sessions/{id}/enrollments/{member_id}/attendance",
            put(mark_attendance),
        )
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer).layer(CorsLayer::permissive())
}
