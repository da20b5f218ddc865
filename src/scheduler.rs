use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};
use uuid::Uuid;

use crate::directory::{ClassCatalog, MemberDirectory, StaffDirectory};
use crate::error::{SchedulerError, StoreError};
use crate::models::{
    ClassDefinition, ClassSession, CreateSessionRequest, Enrollment, SessionStats, SessionStatus,
    StaffMember, StaffRole, TenantContext, UpdateSessionRequest,
};
use crate::settings::Settings;
use crate::slot::TimeSlot;
use crate::store::{ConflictScope, SessionStore};
use crate::validation::{validate_capacity, validate_interval, validate_room};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Reject enrollment once `max_capacity` is reached.
    pub enforce_capacity: bool,
    pub strict_status_transitions: bool,
    pub time_zone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enforce_capacity: true,
            strict_status_transitions: true,
            time_zone: Tz::UTC,
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, config::ConfigError> {
        Ok(Self {
            enforce_capacity: settings.enforce_capacity,
            strict_status_transitions: settings.strict_status_transitions,
            time_zone: settings.time_zone()?,
        })
    }
}

/// Enrollment writes are reapplied on a fresh copy when another write
/// bumped the revision in between.
const ENROLLMENT_WRITE_ATTEMPTS: usize = 3;

/// First instant of `day` in `tz`. Days starting inside a DST gap begin an
/// hour after local midnight.
fn start_of_day(day: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let midnight = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            let shifted = midnight.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .map(|local| local.with_timezone(&Utc))
}

/// Local calendar days `[date, date + days)` in `tz`, expressed in UTC.
pub fn local_day_window(date: NaiveDate, days: u32, tz: Tz) -> Result<TimeSlot, SchedulerError> {
    let out_of_range = || SchedulerError::invalid_argument("date out of range");
    let end_date = date
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(out_of_range)?;
    let start = start_of_day(date, tz).ok_or_else(out_of_range)?;
    let end = start_of_day(end_date, tz).ok_or_else(out_of_range)?;
    Ok(TimeSlot::new(start, end))
}

/// Validates and persists class sessions and drives the per-member
/// enrollment lifecycle.
#[derive(Clone)]
pub struct SessionScheduler {
    store: Arc<dyn SessionStore>,
    classes: Arc<dyn ClassCatalog>,
    staff: Arc<dyn StaffDirectory>,
    members: Arc<dyn MemberDirectory>,
    config: SchedulerConfig,
}

impl SessionScheduler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        classes: Arc<dyn ClassCatalog>,
        staff: Arc<dyn StaffDirectory>,
        members: Arc<dyn MemberDirectory>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            classes,
            staff,
            members,
            config,
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn classes(&self) -> &dyn ClassCatalog {
        self.classes.as_ref()
    }

    pub fn staff(&self) -> &dyn StaffDirectory {
        self.staff.as_ref()
    }

    pub fn members(&self) -> &dyn MemberDirectory {
        self.members.as_ref()
    }

    async fn resolve_class(
        &self,
        ctx: &TenantContext,
        class_id: Uuid,
    ) -> Result<ClassDefinition, SchedulerError> {
        let scope = (!ctx.superuser).then_some(ctx.tenant_id.as_str());
        self.classes
            .find_class(scope, class_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found("class"))
    }

    async fn resolve_instructor(
        &self,
        ctx: &TenantContext,
        instructor_id: Uuid,
    ) -> Result<StaffMember, SchedulerError> {
        let staff = self
            .staff
            .find_staff(&ctx.tenant_id, instructor_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found("instructor"))?;
        if staff.role != StaffRole::Trainer {
            return Err(SchedulerError::invalid_state("instructor is not a trainer"));
        }
        if !staff.active {
            return Err(SchedulerError::invalid_state("instructor is not active"));
        }
        Ok(staff)
    }

    async fn load(&self, ctx: &TenantContext, session_id: Uuid) -> Result<ClassSession, SchedulerError> {
        self.store
            .get(&ctx.tenant_id, session_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found("session"))
    }

    async fn save(
        &self,
        session: ClassSession,
        scope: ConflictScope,
    ) -> Result<ClassSession, SchedulerError> {
        self.store
            .replace(session, scope)
            .await?
            .ok_or_else(|| SchedulerError::not_found("session"))
    }

    pub async fn create_session(
        &self,
        ctx: &TenantContext,
        request: CreateSessionRequest,
    ) -> Result<ClassSession, SchedulerError> {
        let class = self.resolve_class(ctx, request.class_id).await?;
        let instructor = self.resolve_instructor(ctx, request.instructor_id).await?;
        validate_interval(request.start_time, request.end_time)?;
        let room = validate_room(&request.room)?;
        let max_capacity = validate_capacity(request.max_capacity.unwrap_or(class.capacity))?;

        let session = ClassSession {
            id: Uuid::new_v4(),
            tenant_id: ctx.tenant_id.clone(),
            class_id: class.id,
            instructor_id: instructor.id,
            start_time: request.start_time,
            end_time: request.end_time,
            room,
            max_capacity,
            status: SessionStatus::Scheduled,
            enrolled_members: Vec::new(),
            notes: request.notes.unwrap_or_default(),
            revision: 0,
        };

        let session = self
            .store
            .insert(session)
            .await
            .map_err(SchedulerError::from)
            .inspect_err(|err| debug!(tenant = %ctx.tenant_id, "Session rejected: {err}"))?;
        info!(
            tenant = %ctx.tenant_id,
            session_id = %session.id,
            room = %session.room,
            "Scheduled {} with {} at {}",
            class.name,
            instructor.name,
            session.start_time
        );
        Ok(session)
    }

    /// Applies a partial update. Only the fields that actually change are
    /// re-validated, and conflict checks run only when room, instructor or
    /// time moved.
    pub async fn update_session(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
        patch: UpdateSessionRequest,
    ) -> Result<ClassSession, SchedulerError> {
        let existing = self.load(ctx, session_id).await?;
        let mut next = existing.clone();

        if let Some(class_id) = patch.class_id.filter(|id| *id != existing.class_id) {
            next.class_id = self.resolve_class(ctx, class_id).await?.id;
        }
        let instructor_changed = match patch.instructor_id.filter(|id| *id != existing.instructor_id)
        {
            Some(instructor_id) => {
                next.instructor_id = self.resolve_instructor(ctx, instructor_id).await?.id;
                true
            }
            None => false,
        };

        next.start_time = patch.start_time.unwrap_or(existing.start_time);
        next.end_time = patch.end_time.unwrap_or(existing.end_time);
        let time_changed =
            next.start_time != existing.start_time || next.end_time != existing.end_time;
        if time_changed {
            validate_interval(next.start_time, next.end_time)?;
        }

        let room_changed = match patch.room {
            Some(room) => {
                next.room = validate_room(&room)?;
                next.room != existing.room
            }
            None => false,
        };

        if let Some(capacity) = patch.max_capacity {
            next.max_capacity = validate_capacity(capacity)?;
            if (next.max_capacity as usize) < existing.enrolled_members.len() {
                return Err(SchedulerError::conflict(
                    "capacity below current enrollment",
                ));
            }
        }

        if let Some(status) = patch.status {
            if self.config.strict_status_transitions && !existing.status.can_transition_to(status)
            {
                return Err(SchedulerError::invalid_state(format!(
                    "cannot change status from {} to {}",
                    existing.status.as_str(),
                    status.as_str()
                )));
            }
            next.status = status;
        }

        if let Some(notes) = patch.notes {
            next.notes = notes;
        }

        // Cancelled sessions hold no slot, so reopening one must re-book it.
        let reopened =
            existing.status == SessionStatus::Cancelled && next.status != SessionStatus::Cancelled;
        let scope = if reopened {
            ConflictScope::ALL
        } else {
            ConflictScope {
                room: room_changed || time_changed,
                instructor: instructor_changed || time_changed,
            }
        };
        let updated = self
            .save(next, scope)
            .await
            .inspect_err(|err| debug!(%session_id, "Update rejected: {err}"))?;
        info!(tenant = %ctx.tenant_id, %session_id, "Session updated");
        Ok(updated)
    }

    pub async fn get_session(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
    ) -> Result<ClassSession, SchedulerError> {
        self.load(ctx, session_id).await
    }

    /// Sessions starting on `date` in the configured time zone.
    pub async fn list_sessions_by_date(
        &self,
        ctx: &TenantContext,
        date: NaiveDate,
    ) -> Result<Vec<ClassSession>, SchedulerError> {
        self.list_sessions_for_days(ctx, date, 1).await
    }

    pub async fn list_sessions_for_days(
        &self,
        ctx: &TenantContext,
        from: NaiveDate,
        days: u32,
    ) -> Result<Vec<ClassSession>, SchedulerError> {
        let window = local_day_window(from, days, self.config.time_zone)?;
        Ok(self
            .store
            .list_starting_within(&ctx.tenant_id, window)
            .await?)
    }

    pub async fn delete_session(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
    ) -> Result<ClassSession, SchedulerError> {
        let removed = self
            .store
            .remove(&ctx.tenant_id, session_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found("session"))?;
        info!(tenant = %ctx.tenant_id, %session_id, "Session deleted");
        Ok(removed)
    }

    /// Loads the session, applies `apply` and writes it back. `apply`
    /// returns `false` when nothing changed and no write is needed. A stale
    /// revision reruns `apply` against a freshly loaded copy.
    async fn modify_enrollments<F>(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
        mut apply: F,
    ) -> Result<ClassSession, SchedulerError>
    where
        F: FnMut(&mut ClassSession) -> Result<bool, SchedulerError> + Send,
    {
        let mut attempt = 1;
        loop {
            let mut session = self.load(ctx, session_id).await?;
            if !apply(&mut session)? {
                return Ok(session);
            }
            match self.store.replace(session, ConflictScope::NONE).await {
                Ok(Some(saved)) => return Ok(saved),
                Ok(None) => return Err(SchedulerError::not_found("session")),
                Err(StoreError::StaleRevision) if attempt < ENROLLMENT_WRITE_ATTEMPTS => {
                    debug!(%session_id, attempt, "Enrollment write raced, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn enroll(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<Enrollment>, SchedulerError> {
        if self
            .members
            .find_member(&ctx.tenant_id, member_id)
            .await?
            .is_none()
        {
            return Err(SchedulerError::not_found("member"));
        }
        let enforce_capacity = self.config.enforce_capacity;

        let session = self
            .modify_enrollments(ctx, session_id, |session| {
                if !session.status.accepts_enrollment() {
                    return Err(SchedulerError::invalid_state(format!(
                        "session is {}",
                        session.status.as_str()
                    )));
                }
                if session.is_enrolled(member_id) {
                    return Err(SchedulerError::conflict("already enrolled"));
                }
                if enforce_capacity && session.is_full() {
                    debug!(%session_id, %member_id, "Enrollment rejected: session full");
                    return Err(SchedulerError::conflict("session full"));
                }
                session.enrolled_members.push(Enrollment {
                    member_id,
                    enrollment_date: Utc::now(),
                    attended: false,
                });
                Ok(true)
            })
            .await?;
        info!(%session_id, %member_id, "Member enrolled");
        Ok(session.enrolled_members)
    }

    /// Drops the enrollment together with its attendance flag.
    pub async fn unenroll(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<Enrollment>, SchedulerError> {
        let session = self
            .modify_enrollments(ctx, session_id, |session| {
                let position = session
                    .enrolled_members
                    .iter()
                    .position(|e| e.member_id == member_id)
                    .ok_or_else(|| SchedulerError::not_found("enrollment"))?;
                session.enrolled_members.remove(position);
                Ok(true)
            })
            .await?;
        info!(%session_id, %member_id, "Member unenrolled");
        Ok(session.enrolled_members)
    }

    pub async fn mark_attendance(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
        member_id: Uuid,
        attended: bool,
    ) -> Result<Vec<Enrollment>, SchedulerError> {
        let session = self
            .modify_enrollments(ctx, session_id, |session| {
                let enrollment = session
                    .enrolled_members
                    .iter_mut()
                    .find(|e| e.member_id == member_id)
                    .ok_or_else(|| SchedulerError::not_found("enrollment"))?;
                let changed = enrollment.attended != attended;
                enrollment.attended = attended;
                Ok(changed)
            })
            .await?;
        debug!(%session_id, %member_id, attended, "Attendance marked");
        Ok(session.enrolled_members)
    }

    pub async fn session_stats(
        &self,
        ctx: &TenantContext,
        session_id: Uuid,
    ) -> Result<SessionStats, SchedulerError> {
        Ok(self.load(ctx, session_id).await?.stats(Utc::now()))
    }
}
