//! Account domain types: roles, verification states, moderation decisions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role an account registers under. Determines registration requirements and privilege.
///
/// Wire format: lowercase string (`"client"`, `"vendor"`, `"moderator"`, `"admin"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Client,
    Vendor,
    Moderator,
    Admin,
}

impl AccountRole {
    pub const ALL: [AccountRole; 4] = [
        AccountRole::Client,
        AccountRole::Vendor,
        AccountRole::Moderator,
        AccountRole::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Vendor => "vendor",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// Roles whose accounts start `pending` and need a moderation decision.
    pub fn is_restricted(self) -> bool {
        !matches!(self, Self::Client)
    }

    /// Roles allowed to act on the moderation surface.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the four known roles.
#[derive(Debug, Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for AccountRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "vendor" => Ok(Self::Vendor),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Approval state of an account.
///
/// `UnderReview` is reserved: no transition currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    UnderReview,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::UnderReview => "under_review",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown verification status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for VerificationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            "under_review" => Ok(Self::UnderReview),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Kind of administrative decision recorded in the decision ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approval,
    Rejection,
    Suspension,
    Activation,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Rejection => "rejection",
            Self::Suspension => "suspension",
            Self::Activation => "activation",
        }
    }

    /// Rejections and suspensions must carry a non-empty reason.
    pub fn requires_reason(self) -> bool {
        matches!(self, Self::Rejection | Self::Suspension)
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown decision kind: {0:?}")]
pub struct UnknownDecisionKind(pub String);

impl FromStr for DecisionKind {
    type Err = UnknownDecisionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approval" => Ok(Self::Approval),
            "rejection" => Ok(Self::Rejection),
            "suspension" => Ok(Self::Suspension),
            "activation" => Ok(Self::Activation),
            other => Err(UnknownDecisionKind(other.to_owned())),
        }
    }
}

/// The two accepted gender values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown gender: {0:?}")]
pub struct UnknownGender(pub String);

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(UnknownGender(other.to_owned())),
        }
    }
}
