use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{
    AttendanceRequest, AttendanceStats, ClassDefinition, ClassSession, CreateSessionRequest,
    EnrollRequest, Enrollment, Member, NewClassDefinition, NewMember, NewStaffMember,
    SessionStats, SessionStatus, StaffMember, StaffRole, UpdateSessionRequest,
};
use crate::views::{ClassSummary, EnrollmentView, PersonSummary, SessionView};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
        components.add_security_scheme(
            "tenant",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-tenant-id"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::create_class,
        crate::handlers::list_classes,
        crate::handlers::create_staff,
        crate::handlers::list_staff,
        crate::handlers::create_member,
        crate::handlers::list_members,
        crate::handlers::create_session,
        crate::handlers::list_sessions,
        crate::handlers::get_ical,
        crate::handlers::get_session,
        crate::handlers::update_session,
        crate::handlers::delete_session,
        crate::handlers::get_session_stats,
        crate::handlers::enroll,
        crate::handlers::unenroll,
        crate::handlers::mark_attendance
    ),
    components(schemas(
        ClassDefinition,
        StaffMember,
        StaffRole,
        Member,
        ClassSession,
        SessionStatus,
        Enrollment,
        AttendanceStats,
        SessionStats,
        CreateSessionRequest,
        UpdateSessionRequest,
        NewClassDefinition,
        NewStaffMember,
        NewMember,
        EnrollRequest,
        AttendanceRequest,
        SessionView,
        ClassSummary,
        PersonSummary,
        EnrollmentView
    )),
    tags(
        (name = "sessions", description = "Class session scheduling"),
        (name = "enrollments", description = "Session enrollment and attendance"),
        (name = "directory", description = "Classes, staff and members"),
        (name = "system", description = "Service info and health")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
