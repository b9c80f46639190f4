//! Member domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Member,
    Treasurer,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "Member",
            Role::Treasurer => "Treasurer",
            Role::Administrator => "Administrator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Member" => Some(Role::Member),
            "Treasurer" => Some(Role::Treasurer),
            "Administrator" => Some(Role::Administrator),
            _ => None,
        }
    }

    /// Treasurers and administrators may act on behalf of others and
    /// decide money moves.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Treasurer | Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum role an operation demands from its actor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoleRequirement {
    AnyMember,
    Privileged,
    Administrator,
}

impl RoleRequirement {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            RoleRequirement::AnyMember => true,
            RoleRequirement::Privileged => role.is_privileged(),
            RoleRequirement::Administrator => role == Role::Administrator,
        }
    }
}

impl fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRequirement::AnyMember => f.write_str("any member"),
            RoleRequirement::Privileged => f.write_str("treasurer or administrator"),
            RoleRequirement::Administrator => f.write_str("administrator"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    /// Argon2id PHC string. Never serialized to callers.
    #[serde(skip_serializing)]
    pub pin_hash: String,
    /// Set when the lifecycle guard force-deactivated the member.
    /// Such members cannot be reactivated.
    pub removed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_active_administrator(&self) -> bool {
        self.is_active && self.role == Role::Administrator
    }
}

// Hand-written so the PIN hash never ends up in logs.
impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("removed_at", &self.removed_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub display_name: String,
    pub role: Role,
    /// Raw PIN (hashed with Argon2id before storage).
    pub pin: String,
}

impl fmt::Debug for CreateMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateMember")
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMember {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateMember {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.role.is_none() && self.is_active.is_none()
    }

    /// Whether applying this update to `current` would take an active
    /// administrator out of the administrator roster.
    pub fn demotes_administrator(&self, current: &Member) -> bool {
        if !current.is_active_administrator() {
            return false;
        }
        let role_lost = self.role.is_some_and(|r| r != Role::Administrator);
        let deactivated = self.is_active == Some(false);
        role_lost || deactivated
    }
}

/// Category of historical records that reference a member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelatedRecordCategory {
    Consumptions,
    MoneyMoves,
    AuditEntries,
}

impl RelatedRecordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedRecordCategory::Consumptions => "consumptions",
            RelatedRecordCategory::MoneyMoves => "money_moves",
            RelatedRecordCategory::AuditEntries => "audit_entries",
        }
    }
}

/// Result of the read-only related-records pre-flight for one member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRecords {
    /// Consumptions consumed by or booked by the member.
    pub consumptions: u64,
    /// Money moves targeting, created by, or decided by the member.
    pub money_moves: u64,
    /// Audit entries performed by the member.
    pub audit_entries: u64,
}

impl RelatedRecords {
    pub fn is_empty(&self) -> bool {
        self.consumptions == 0 && self.money_moves == 0 && self.audit_entries == 0
    }

    pub fn categories(&self) -> Vec<RelatedRecordCategory> {
        let mut out = Vec::new();
        if self.consumptions > 0 {
            out.push(RelatedRecordCategory::Consumptions);
        }
        if self.money_moves > 0 {
            out.push(RelatedRecordCategory::MoneyMoves);
        }
        if self.audit_entries > 0 {
            out.push(RelatedRecordCategory::AuditEntries);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role, is_active: bool) -> Member {
        Member {
            id: Uuid::new_v4(),
            display_name: "m".into(),
            role,
            is_active,
            pin_hash: "$argon2id$secret".into(),
            removed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn requirements() {
        assert!(RoleRequirement::AnyMember.permits(Role::Member));
        assert!(!RoleRequirement::Privileged.permits(Role::Member));
        assert!(RoleRequirement::Privileged.permits(Role::Treasurer));
        assert!(RoleRequirement::Privileged.permits(Role::Administrator));
        assert!(!RoleRequirement::Administrator.permits(Role::Treasurer));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Member, Role::Treasurer, Role::Administrator] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn debug_hides_pin_hash() {
        let m = member(Role::Member, true);
        assert!(!format!("{m:?}").contains("argon2id"));
    }

    #[test]
    fn demotion_detection() {
        let admin = member(Role::Administrator, true);
        let demote = UpdateMember {
            role: Some(Role::Treasurer),
            ..Default::default()
        };
        let deactivate = UpdateMember {
            is_active: Some(false),
            ..Default::default()
        };
        let rename = UpdateMember {
            display_name: Some("x".into()),
            ..Default::default()
        };
        assert!(demote.demotes_administrator(&admin));
        assert!(deactivate.demotes_administrator(&admin));
        assert!(!rename.demotes_administrator(&admin));
        assert!(!demote.demotes_administrator(&member(Role::Administrator, false)));
        assert!(!deactivate.demotes_administrator(&member(Role::Treasurer, true)));
    }

    #[test]
    fn related_categories_only_list_non_empty() {
        let related = RelatedRecords {
            consumptions: 3,
            money_moves: 0,
            audit_entries: 2,
        };
        assert_eq!(
            related.categories(),
            vec![
                RelatedRecordCategory::Consumptions,
                RelatedRecordCategory::AuditEntries
            ]
        );
        assert!(RelatedRecords::default().is_empty());
        assert!(RelatedRecords::default().categories().is_empty());
    }
}
