//! Lead ownership and attribution rules.
//!
//! A lead carries an optional `manager_id` and an optional `agent_id`, both
//! pointing at affiliate profiles. Leads owned by an agent always also carry
//! the agent's branch manager, so a manager's view of "my leads" is a single
//! `manager_id = me` filter.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Profile type
// ---------------------------------------------------------------------------

/// Kind of affiliate profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    BranchManager,
    SalesAgent,
}

impl ProfileType {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BranchManager => "BRANCH_MANAGER",
            Self::SalesAgent => "SALES_AGENT",
        }
    }

    /// Parse the database representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "BRANCH_MANAGER" => Ok(Self::BranchManager),
            "SALES_AGENT" => Ok(Self::SalesAgent),
            other => Err(CoreError::Validation(format!(
                "Unknown affiliate profile type: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Owner resolution
// ---------------------------------------------------------------------------

/// The `(manager_id, agent_id)` pair stored on a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LeadOwnership {
    pub manager_id: Option<DbId>,
    pub agent_id: Option<DbId>,
}

impl LeadOwnership {
    pub fn new(manager_id: Option<DbId>, agent_id: Option<DbId>) -> Self {
        Self {
            manager_id,
            agent_id,
        }
    }

    /// `true` when neither a manager nor an agent owns the lead.
    pub fn is_unowned(&self) -> bool {
        self.manager_id.is_none() && self.agent_id.is_none()
    }

    pub fn owner(&self) -> LeadOwner {
        resolve_owner(self.manager_id, self.agent_id)
    }
}

/// Who a lead belongs to for commission and access purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadOwner {
    Agent {
        agent_id: DbId,
        manager_id: Option<DbId>,
    },
    Manager {
        manager_id: DbId,
    },
    Headquarters,
}

/// Resolve the owner of a lead: the agent when set, otherwise the manager,
/// otherwise headquarters.
pub fn resolve_owner(manager_id: Option<DbId>, agent_id: Option<DbId>) -> LeadOwner {
    match (manager_id, agent_id) {
        (manager_id, Some(agent_id)) => LeadOwner::Agent {
            agent_id,
            manager_id,
        },
        (Some(manager_id), None) => LeadOwner::Manager { manager_id },
        (None, None) => LeadOwner::Headquarters,
    }
}

/// Ownership a new lead receives when created by (or attributed to) the
/// given profile.
///
/// Agents pass their own manager along; managers own their leads directly.
pub fn ownership_for_profile(
    profile_type: ProfileType,
    profile_id: DbId,
    manager_profile_id: Option<DbId>,
) -> LeadOwnership {
    match profile_type {
        ProfileType::SalesAgent => LeadOwnership::new(manager_profile_id, Some(profile_id)),
        ProfileType::BranchManager => LeadOwnership::new(Some(profile_id), None),
    }
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

/// Outcome of attributing an incoming touch (checkout with an affiliate code,
/// landing-page registration) to an existing lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// Write the incoming ownership to the lead.
    Assign(LeadOwnership),
    /// Leave the lead as it is. `conflict` is set when a different affiliate
    /// attempted to claim an already-owned lead.
    Keep { conflict: bool },
}

/// First-touch attribution: an owned lead never changes hands through an
/// incoming touch, an unowned lead is claimed by the first affiliate to touch
/// it.
pub fn attribute(existing: LeadOwnership, incoming: Option<LeadOwnership>) -> Attribution {
    let Some(incoming) = incoming.filter(|o| !o.is_unowned()) else {
        return Attribution::Keep { conflict: false };
    };

    if existing.is_unowned() {
        return Attribution::Assign(incoming);
    }

    Attribution::Keep {
        conflict: existing != incoming,
    }
}

// ---------------------------------------------------------------------------
// Access scope
// ---------------------------------------------------------------------------

/// The party viewing or mutating affiliate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Admin,
    Manager {
        profile_id: DbId,
    },
    Agent {
        profile_id: DbId,
        manager_id: Option<DbId>,
    },
}

impl Viewer {
    /// Build a viewer from an affiliate profile.
    pub fn from_profile(
        profile_type: ProfileType,
        profile_id: DbId,
        manager_profile_id: Option<DbId>,
    ) -> Self {
        match profile_type {
            ProfileType::BranchManager => Self::Manager { profile_id },
            ProfileType::SalesAgent => Self::Agent {
                profile_id,
                manager_id: manager_profile_id,
            },
        }
    }

    /// The viewer's own affiliate profile, if any.
    pub fn profile_id(&self) -> Option<DbId> {
        match self {
            Self::Admin => None,
            Self::Manager { profile_id } | Self::Agent { profile_id, .. } => Some(*profile_id),
        }
    }

    /// Whether this viewer may see a lead with the given ownership.
    pub fn can_access(&self, ownership: LeadOwnership) -> bool {
        match self {
            Self::Admin => true,
            Self::Manager { profile_id } => ownership.manager_id == Some(*profile_id),
            Self::Agent { profile_id, .. } => ownership.agent_id == Some(*profile_id),
        }
    }

    /// Ownership given to leads this viewer creates. Admin-created leads
    /// belong to headquarters.
    pub fn creation_ownership(&self) -> LeadOwnership {
        match self {
            Self::Admin => LeadOwnership::default(),
            Self::Manager { profile_id } => LeadOwnership::new(Some(*profile_id), None),
            Self::Agent {
                profile_id,
                manager_id,
            } => LeadOwnership::new(*manager_id, Some(*profile_id)),
        }
    }

    /// Whether this viewer may assign a lead to an agent whose manager is
    /// `agent_manager_id`. Managers stay within their own team; agents never
    /// reassign.
    pub fn can_assign_agent(&self, agent_manager_id: Option<DbId>) -> bool {
        match self {
            Self::Admin => true,
            Self::Manager { profile_id } => agent_manager_id == Some(*profile_id),
            Self::Agent { .. } => false,
        }
    }

    /// Whether this viewer may read or edit the given affiliate profile.
    pub fn can_access_profile(&self, profile_id: DbId, manager_profile_id: Option<DbId>) -> bool {
        match self {
            Self::Admin => true,
            Self::Manager { profile_id: me } => {
                profile_id == *me || manager_profile_id == Some(*me)
            }
            Self::Agent { profile_id: me, .. } => profile_id == *me,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
