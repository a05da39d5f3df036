use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Access level of an account. Roles are strictly ordered: every admin can do
/// what a manager can, every manager what a clerk can.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "clerk")]
    Clerk,
}

impl UserRole {
    fn rank(&self) -> u8 {
        match self {
            UserRole::Admin => 3,
            UserRole::Manager => 2,
            UserRole::Clerk => 1,
        }
    }

    /// True when this role grants at least the privileges of `other`.
    pub fn at_least(&self, other: UserRole) -> bool {
        self.rank() >= other.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Clerk => "clerk",
        }
    }

    pub fn parse(value: &str) -> Option<UserRole> {
        match value {
            "admin" => Some(UserRole::Admin),
            "manager" => Some(UserRole::Manager),
            "clerk" => Some(UserRole::Clerk),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id hash; never serialized into responses
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,

    /// Deactivated accounts keep their rows but cannot log in
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_is_transitive() {
        assert!(UserRole::Admin.at_least(UserRole::Manager));
        assert!(UserRole::Admin.at_least(UserRole::Clerk));
        assert!(UserRole::Manager.at_least(UserRole::Clerk));
        assert!(!UserRole::Clerk.at_least(UserRole::Manager));
        assert!(!UserRole::Manager.at_least(UserRole::Admin));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [UserRole::Admin, UserRole::Manager, UserRole::Clerk] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("owner"), None);
    }
}
