//! Presentation join: sessions store bare ids, views resolve them to display
//! data in one explicit step.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::models::{ClassSession, SessionStats, SessionStatus, TenantContext};
use crate::scheduler::SessionScheduler;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClassSummary {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub duration_min: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PersonSummary {
    pub id: Uuid,
    /// `None` when the record has since been removed from the directory.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EnrollmentView {
    pub member: PersonSummary,
    pub enrollment_date: DateTime<Utc>,
    pub attended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub class: Option<ClassSummary>,
    pub instructor: PersonSummary,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub room: String,
    pub max_capacity: u32,
    pub status: SessionStatus,
    pub notes: String,
    pub enrolled_members: Vec<EnrollmentView>,
    pub stats: SessionStats,
}

impl SessionView {
    pub fn class_name(&self) -> &str {
        self.class.as_ref().map_or("Class", |c| c.name.as_str())
    }

    pub fn instructor_name(&self) -> &str {
        self.instructor.name.as_deref().unwrap_or("TBA")
    }
}

impl SessionScheduler {
    pub async fn session_view(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
    ) -> Result<SessionView, SchedulerError> {
        let session = self.get_session(ctx, session_id).await?;
        self.describe(ctx, session).await
    }

    /// Resolves class, instructor and member references of a stored session.
    pub async fn describe(
        &self,
        ctx: &TenantContext,
        session: ClassSession,
    ) -> Result<SessionView, SchedulerError> {
        let scope = (!ctx.superuser).then_some(ctx.tenant_id.as_str());
        let class = self
            .classes()
            .find_class(scope, session.class_id)
            .await?
            .map(|c| ClassSummary {
                id: c.id,
                name: c.name,
                category: c.category,
                duration_min: c.duration_min,
            });
        let instructor = PersonSummary {
            id: session.instructor_id,
            name: self
                .staff()
                .find_staff(&ctx.tenant_id, session.instructor_id)
                .await?
                .map(|s| s.name),
        };

        let lookups = session.enrolled_members.iter().map(|enrollment| async move {
            let member = self
                .members()
                .find_member(&ctx.tenant_id, enrollment.member_id)
                .await?;
            Ok::<_, SchedulerError>(EnrollmentView {
                member: PersonSummary {
                    id: enrollment.member_id,
                    name: member.map(|m| m.name),
                },
                enrollment_date: enrollment.enrollment_date,
                attended: enrollment.attended,
            })
        });
        let enrolled_members = try_join_all(lookups).await?;

        Ok(SessionView {
            id: session.id,
            stats: session.stats(Utc::now()),
            class,
            instructor,
            start_time: session.start_time,
            end_time: session.end_time,
            room: session.room,
            max_capacity: session.max_capacity,
            status: session.status,
            notes: session.notes,
            enrolled_members,
        })
    }

    pub async fn describe_all(
        &self,
        ctx: &TenantContext,
        sessions: Vec<ClassSession>,
    ) -> Result<Vec<SessionView>, SchedulerError> {
        try_join_all(sessions.into_iter().map(|s| self.describe(ctx, s))).await
    }
}
