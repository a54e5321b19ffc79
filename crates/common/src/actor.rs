use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of an authenticated staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StaffRole {
    Admin,
    Manager,
    #[default]
    Staff,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Manager => "manager",
            StaffRole::Staff => "staff",
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown staff role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for StaffRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(StaffRole::Admin),
            "manager" => Ok(StaffRole::Manager),
            "staff" => Ok(StaffRole::Staff),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// The authenticated staff user performing an operation.
///
/// Authentication happens outside the core; by the time an `Actor` exists the
/// caller is trusted. The id is whatever the identity provider issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: StaffRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: StaffRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Actor used for operations the system performs on its own behalf.
    pub fn system() -> Self {
        Self::new("system", StaffRole::Admin)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Admin".parse::<StaffRole>().unwrap(), StaffRole::Admin);
        assert_eq!(" manager ".parse::<StaffRole>().unwrap(), StaffRole::Manager);
        assert!("owner".parse::<StaffRole>().is_err());
    }

    #[test]
    fn actor_display() {
        let actor = Actor::new("u-42", StaffRole::Staff);
        assert_eq!(actor.to_string(), "u-42 (staff)");
    }

    #[test]
    fn role_serializes_kebab_case() {
        let json = serde_json::to_string(&StaffRole::Manager).unwrap();
        assert_eq!(json, "\"manager\"");
    }
}
