use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

/// The authenticated caller of an operation, as vouched for by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn customer(id: impl Into<String>) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns(&self, user_id: &str) -> bool {
        self.id == user_id
    }

    /// Owners and administrators may act on a resource.
    pub fn can_access(&self, user_id: &str) -> bool {
        self.is_admin() || self.owns(user_id)
    }
}
