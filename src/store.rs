//! Session persistence. Room and instructor exclusivity is a property of the
//! store: the overlap scan and the write happen under the same lock, so two
//! concurrent bookings of one slot cannot both succeed.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ClassSession, SessionStatus};
use crate::slot::TimeSlot;

/// Which exclusivity rules a write must be checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConflictScope {
    pub room: bool,
    pub instructor: bool,
}

impl ConflictScope {
    pub const ALL: ConflictScope = ConflictScope {
        room: true,
        instructor: true,
    };
    pub const NONE: ConflictScope = ConflictScope {
        room: false,
        instructor: false,
    };

    pub fn is_empty(&self) -> bool {
        !self.room && !self.instructor
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session unless it collides with an existing booking.
    async fn insert(&self, session: ClassSession) -> Result<ClassSession, StoreError>;

    /// Overwrites a stored session. `session.revision` must match the stored
    /// revision. Returns `None` when the session no longer exists.
    async fn replace(
        &self,
        session: ClassSession,
        scope: ConflictScope,
    ) -> Result<Option<ClassSession>, StoreError>;

    async fn get(&self, tenant_id: &str, id: Uuid) -> Result<Option<ClassSession>, StoreError>;

    /// Sessions whose start time falls inside `window`, ordered by start time.
    async fn list_starting_within(
        &self,
        tenant_id: &str,
        window: TimeSlot,
    ) -> Result<Vec<ClassSession>, StoreError>;

    async fn remove(&self, tenant_id: &str, id: Uuid) -> Result<Option<ClassSession>, StoreError>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    tenants: RwLock<HashMap<String, HashMap<Uuid, ClassSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cancelled sessions release their room and instructor.
fn find_conflict<'a>(
    existing: impl Iterator<Item = &'a ClassSession>,
    candidate: &ClassSession,
    scope: ConflictScope,
) -> Option<StoreError> {
    if scope.is_empty() {
        return None;
    }
    let slot = candidate.slot();
    let overlapping: Vec<&ClassSession> = existing
        .filter(|s| s.id != candidate.id && s.status != SessionStatus::Cancelled)
        .filter(|s| s.slot().overlaps(&slot))
        .collect();

    if scope.room && overlapping.iter().any(|s| s.room == candidate.room) {
        return Some(StoreError::RoomBooked);
    }
    if scope.instructor
        && overlapping
            .iter()
            .any(|s| s.instructor_id == candidate.instructor_id)
    {
        return Some(StoreError::InstructorBusy);
    }
    None
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, mut session: ClassSession) -> Result<ClassSession, StoreError> {
        let mut tenants = self.tenants.write().await;
        let sessions = tenants.entry(session.tenant_id.clone()).or_default();

        if let Some(conflict) = find_conflict(sessions.values(), &session, ConflictScope::ALL) {
            debug!(room = %session.room, "Rejected session insert: {conflict}");
            return Err(conflict);
        }

        session.revision = 1;
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn replace(
        &self,
        mut session: ClassSession,
        scope: ConflictScope,
    ) -> Result<Option<ClassSession>, StoreError> {
        let mut tenants = self.tenants.write().await;
        let Some(sessions) = tenants.get_mut(&session.tenant_id) else {
            return Ok(None);
        };
        let Some(current) = sessions.get(&session.id) else {
            return Ok(None);
        };
        if current.revision != session.revision {
            return Err(StoreError::StaleRevision);
        }
        if let Some(conflict) = find_conflict(sessions.values(), &session, scope) {
            debug!(session_id = %session.id, "Rejected session update: {conflict}");
            return Err(conflict);
        }

        session.revision += 1;
        sessions.insert(session.id, session.clone());
        Ok(Some(session))
    }

    async fn get(&self, tenant_id: &str, id: Uuid) -> Result<Option<ClassSession>, StoreError> {
        let tenants = self.tenants.read().await;
        Ok(tenants
            .get(tenant_id)
            .and_then(|sessions| sessions.get(&id))
            .cloned())
    }

    async fn list_starting_within(
        &self,
        tenant_id: &str,
        window: TimeSlot,
    ) -> Result<Vec<ClassSession>, StoreError> {
        let tenants = self.tenants.read().await;
        let mut sessions: Vec<ClassSession> = tenants
            .get(tenant_id)
            .map(|sessions| {
                sessions
                    .values()
                    .filter(|s| window.contains(s.start_time))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.room.cmp(&b.room)));
        Ok(sessions)
    }

    async fn remove(&self, tenant_id: &str, id: Uuid) -> Result<Option<ClassSession>, StoreError> {
        let mut tenants = self.tenants.write().await;
        Ok(tenants
            .get_mut(tenant_id)
            .and_then(|sessions| sessions.remove(&id)))
    }
}
