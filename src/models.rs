use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::slot::TimeSlot;

/// Tenant the caller acts for. Superusers may reference class definitions
/// owned by any tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: String,
    pub superuser: bool,
}

impl TenantContext {
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            superuser: false,
        }
    }

    pub fn superuser(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            superuser: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClassDefinition {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub category: String,
    pub duration_min: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Trainer,
    Manager,
    Receptionist,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct StaffMember {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub role: StaffRole,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Member {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Allowed moves: scheduled -> in_progress -> completed, and cancellation
    /// from either open state. Staying put is always allowed.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        self == next
            || matches!(
                (self, next),
                (Scheduled, InProgress)
                    | (InProgress, Completed)
                    | (Scheduled, Cancelled)
                    | (InProgress, Cancelled)
            )
    }

    pub fn accepts_enrollment(self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Enrollment {
    pub member_id: Uuid,
    pub enrollment_date: DateTime<Utc>,
    pub attended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ClassSession {
    pub id: Uuid,
    pub tenant_id: String,
    pub class_id: Uuid,
    pub instructor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub room: String,
    pub max_capacity: u32,
    pub status: SessionStatus,
    pub enrolled_members: Vec<Enrollment>,
    pub notes: String,
    /// Bumped by the store on every successful write.
    pub revision: u64,
}

impl ClassSession {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time, self.end_time)
    }

    pub fn enrollment(&self, member_id: Uuid) -> Option<&Enrollment> {
        self.enrolled_members
            .iter()
            .find(|e| e.member_id == member_id)
    }

    pub fn is_enrolled(&self, member_id: Uuid) -> bool {
        self.enrollment(member_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_members.len() >= self.max_capacity as usize
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.start_time < now
    }

    pub fn stats(&self, now: DateTime<Utc>) -> SessionStats {
        SessionStats {
            attendance: self.attendance_stats(),
            capacity: self.max_capacity,
            is_full: self.is_full(),
            is_past: self.is_past(now),
        }
    }

    pub fn attendance_stats(&self) -> AttendanceStats {
        let total = self.enrolled_members.len() as u32;
        let attended = self.enrolled_members.iter().filter(|e| e.attended).count() as u32;
        let percentage = if total > 0 {
            (f64::from(attended) / f64::from(total) * 100.0).round() as u32
        } else {
            0
        };
        AttendanceStats {
            attended,
            total,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct AttendanceStats {
    pub attended: u32,
    pub total: u32,
    pub percentage: u32,
}

/// Derived, side-effect free view of a session's occupancy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SessionStats {
    pub attendance: AttendanceStats,
    pub capacity: u32,
    pub is_full: bool,
    pub is_past: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub class_id: Uuid,
    pub instructor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub room: String,
    pub max_capacity: Option<u32>,
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSessionRequest {
    pub class_id: Option<Uuid>,
    pub instructor_id: Option<Uuid>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub room: Option<String>,
    pub max_capacity: Option<u32>,
    pub status: Option<SessionStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewClassDefinition {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub duration_min: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewStaffMember {
    pub name: String,
    pub role: StaffRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMember {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollRequest {
    pub member_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    pub attended: bool,
}
