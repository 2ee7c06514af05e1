//! Roles and acting identities for workflow authorization

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Workflow roles. Every actor carries exactly one.
///
/// Names are normalized from the domain vocabulary: the contractor
/// (`izvodjac`) keeps the book, the supervisor (`nadzor`) reviews it, the
/// investor (`investitor`) follows it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Contractor,
    Supervisor,
    Investor,
    Admin,
}

impl Role {
    /// Every role, in bootstrap order
    pub fn all() -> &'static [Role] {
        &[Role::Contractor, Role::Supervisor, Role::Investor, Role::Admin]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Contractor => "contractor",
            Role::Supervisor => "supervisor",
            Role::Investor => "investor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contractor" | "izvodjac" => Ok(Role::Contractor),
            "supervisor" | "nadzor" => Ok(Role::Supervisor),
            "investor" | "investitor" => Ok(Role::Investor),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A resolved, authenticated actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Login name; the identity compared against `Sheet::created_by`
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        let username = normalize_username(&username.into());
        Self {
            name: username.clone(),
            username,
            email: String::new(),
            role,
            active: true,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Admins bypass every authorization rule
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this actor is the given identity
    pub fn is(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }
}

/// Usernames are compared case-insensitively and stored lowercase
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_accepts_domain_vocabulary() {
        assert_eq!("izvodjac".parse::<Role>().unwrap(), Role::Contractor);
        assert_eq!("NADZOR".parse::<Role>().unwrap(), Role::Supervisor);
        assert_eq!("investitor".parse::<Role>().unwrap(), Role::Investor);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("foreman".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_display_roundtrip() {
        for role in Role::all() {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), *role);
        }
    }

    #[test]
    fn test_actor_identity_is_case_insensitive() {
        let actor = Actor::new("JSmith", Role::Contractor);
        assert_eq!(actor.username, "jsmith");
        assert!(actor.is("JSMITH"));
        assert!(!actor.is("bwilson"));
        assert!(!actor.is_admin());
        assert!(actor.has_role(Role::Contractor));
    }
}
