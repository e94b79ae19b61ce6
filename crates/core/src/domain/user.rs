use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Portal roles. The backend has sent several historical spellings for
/// the same role (`sale`/`sales`, `dev`/`developer`), so parsing accepts
/// the aliases and normalizes to one canonical value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Sales,
    Developer,
    Customer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Sales, Role::Developer, Role::Customer];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "sale" | "sales" => Some(Self::Sales),
            "dev" | "developer" => Some(Self::Developer),
            "customer" => Some(Self::Customer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Sales => "sales",
            Self::Developer => "developer",
            Self::Customer => "customer",
        }
    }

    /// Home dashboard route for the role.
    pub fn dashboard(&self) -> &'static str {
        match self {
            Self::Admin => "/dashboard/admin",
            Self::Sales => "/dashboard/sales",
            Self::Developer => "/dashboard/developer",
            Self::Customer => "/dashboard/customer",
        }
    }

    /// Roles allowed to author and edit proposals.
    pub fn can_author_proposals(&self) -> bool {
        matches!(self, Self::Admin | Self::Sales)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| DomainError::UnknownRole(value.to_string()))
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Role::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown role `{raw}`")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Outcome of a page/command access check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// No session profile present.
    RedirectToLogin,
    /// Authenticated but the role is not allowed here; send the user to
    /// their own dashboard.
    RedirectTo(&'static str),
}

/// Gate a role-restricted surface. An empty `allowed` slice means any
/// authenticated user may enter.
pub fn authorize(profile: Option<&UserProfile>, allowed: &[Role]) -> AccessDecision {
    let Some(profile) = profile else {
        return AccessDecision::RedirectToLogin;
    };

    if allowed.is_empty() || allowed.contains(&profile.role) {
        AccessDecision::Granted
    } else {
        AccessDecision::RedirectTo(profile.role.dashboard())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{authorize, AccessDecision, Role, UserId, UserProfile};

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            id: UserId(Uuid::new_v4()),
            email: "user@operis.vn".to_string(),
            full_name: "Test User".to_string(),
            role,
            is_active: true,
        }
    }

    #[test]
    fn role_aliases_normalize() {
        assert_eq!(Role::parse("sale"), Some(Role::Sales));
        assert_eq!(Role::parse("sales"), Some(Role::Sales));
        assert_eq!(Role::parse("dev"), Some(Role::Developer));
        assert_eq!(Role::parse("Developer"), Some(Role::Developer));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("intern"), None);
    }

    #[test]
    fn role_round_trips_through_serde_with_aliases() {
        let role: Role = serde_json::from_str("\"sale\"").expect("alias should parse");
        assert_eq!(role, Role::Sales);
        assert_eq!(serde_json::to_string(&role).expect("serialize"), "\"sales\"");
    }

    #[test]
    fn missing_session_redirects_to_login() {
        assert_eq!(authorize(None, &[Role::Admin]), AccessDecision::RedirectToLogin);
    }

    #[test]
    fn wrong_role_redirects_to_own_dashboard() {
        let customer = profile(Role::Customer);
        assert_eq!(
            authorize(Some(&customer), &[Role::Admin, Role::Sales]),
            AccessDecision::RedirectTo("/dashboard/customer")
        );
    }

    #[test]
    fn matching_role_is_granted() {
        let sales = profile(Role::Sales);
        assert_eq!(authorize(Some(&sales), &[Role::Admin, Role::Sales]), AccessDecision::Granted);
        assert_eq!(authorize(Some(&sales), &[]), AccessDecision::Granted);
    }
}
