//! Read-only lookups the scheduler depends on: class definitions, staff and
//! members. `InMemoryDirectory` backs all three and also accepts
//! registrations from the HTTP layer.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ClassDefinition, Member, NewClassDefinition, NewMember, NewStaffMember, StaffMember,
};

#[async_trait]
pub trait ClassCatalog: Send + Sync {
    /// `tenant_id = None` searches every tenant (platform superuser).
    async fn find_class(
        &self,
        tenant_id: Option<&str>,
        class_id: Uuid,
    ) -> Result<Option<ClassDefinition>, StoreError>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_staff(
        &self,
        tenant_id: &str,
        staff_id: Uuid,
    ) -> Result<Option<StaffMember>, StoreError>;
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_member(
        &self,
        tenant_id: &str,
        member_id: Uuid,
    ) -> Result<Option<Member>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    classes: RwLock<HashMap<Uuid, ClassDefinition>>,
    staff: RwLock<HashMap<Uuid, StaffMember>>,
    members: RwLock<HashMap<Uuid, Member>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_class(&self, tenant_id: &str, new: NewClassDefinition) -> ClassDefinition {
        let class = ClassDefinition {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: new.name,
            category: new.category,
            duration_min: new.duration_min,
            capacity: new.capacity,
        };
        self.classes.write().await.insert(class.id, class.clone());
        class
    }

    pub async fn add_staff(&self, tenant_id: &str, new: NewStaffMember) -> StaffMember {
        let staff = StaffMember {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: new.name,
            role: new.role,
            active: new.active,
        };
        self.staff.write().await.insert(staff.id, staff.clone());
        staff
    }

    pub async fn add_member(&self, tenant_id: &str, new: NewMember) -> Member {
        let member = Member {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: new.name,
            email: new.email,
        };
        self.members.write().await.insert(member.id, member.clone());
        member
    }

    pub async fn list_classes(&self, tenant_id: &str) -> Vec<ClassDefinition> {
        let mut classes: Vec<_> = self
            .classes
            .read()
            .await
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        classes
    }

    pub async fn list_staff(&self, tenant_id: &str) -> Vec<StaffMember> {
        let mut staff: Vec<_> = self
            .staff
            .read()
            .await
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        staff.sort_by(|a, b| a.name.cmp(&b.name));
        staff
    }

    pub async fn list_members(&self, tenant_id: &str) -> Vec<Member> {
        let mut members: Vec<_> = self
            .members
            .read()
            .await
            .values()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }
}

#[async_trait]
impl ClassCatalog for InMemoryDirectory {
    async fn find_class(
        &self,
        tenant_id: Option<&str>,
        class_id: Uuid,
    ) -> Result<Option<ClassDefinition>, StoreError> {
        let classes = self.classes.read().await;
        Ok(classes
            .get(&class_id)
            .filter(|c| tenant_id.is_none_or(|t| c.tenant_id == t))
            .cloned())
    }
}

#[async_trait]
impl StaffDirectory for InMemoryDirectory {
    async fn find_staff(
        &self,
        tenant_id: &str,
        staff_id: Uuid,
    ) -> Result<Option<StaffMember>, StoreError> {
        let staff = self.staff.read().await;
        Ok(staff
            .get(&staff_id)
            .filter(|s| s.tenant_id == tenant_id)
            .cloned())
    }
}

#[async_trait]
impl MemberDirectory for InMemoryDirectory {
    async fn find_member(
        &self,
        tenant_id: &str,
        member_id: Uuid,
    ) -> Result<Option<Member>, StoreError> {
        let members = self.members.read().await;
        Ok(members
            .get(&member_id)
            .filter(|m| m.tenant_id == tenant_id)
            .cloned())
    }
}
