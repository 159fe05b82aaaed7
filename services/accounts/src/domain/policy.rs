//! Per-role registration requirements and invitation codes.

use chrono::{DateTime, Utc};

use marche_domain::account::{AccountRole, VerificationStatus};

// ── Registration fields ──────────────────────────────────────────────────────

/// A field of the registration payload, named as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationField {
    Name,
    Surname,
    Email,
    Password,
    Phone,
    Gender,
    ShopName,
    ShopDescription,
    ShopSite,
}

impl RegistrationField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Surname => "surname",
            Self::Email => "email",
            Self::Password => "password",
            Self::Phone => "phone",
            Self::Gender => "gender",
            Self::ShopName => "shop_name",
            Self::ShopDescription => "shop_description",
            Self::ShopSite => "shop_site",
        }
    }
}

// ── Role policy ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    Automatic,
    Manual,
}

/// How freely a role can be signed up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InscriptionLimit {
    Unlimited,
    Open,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirements {
    pub required: &'static [RegistrationField],
    pub optional: &'static [RegistrationField],
    pub validates_phone: bool,
    pub requires_invitation: bool,
    pub approval: ApprovalMode,
    pub limit: InscriptionLimit,
}

const CLIENT: RoleRequirements = RoleRequirements {
    required: &[
        RegistrationField::Name,
        RegistrationField::Surname,
        RegistrationField::Email,
        RegistrationField::Password,
        RegistrationField::Gender,
    ],
    optional: &[RegistrationField::Phone],
    validates_phone: true,
    requires_invitation: false,
    approval: ApprovalMode::Automatic,
    limit: InscriptionLimit::Unlimited,
};

const VENDOR: RoleRequirements = RoleRequirements {
    required: &[
        RegistrationField::Name,
        RegistrationField::Surname,
        RegistrationField::Email,
        RegistrationField::Password,
        RegistrationField::Phone,
        RegistrationField::Gender,
    ],
    optional: &[
        RegistrationField::ShopName,
        RegistrationField::ShopDescription,
        RegistrationField::ShopSite,
    ],
    validates_phone: true,
    requires_invitation: true,
    approval: ApprovalMode::Manual,
    limit: InscriptionLimit::Open,
};

const STAFF: RoleRequirements = RoleRequirements {
    required: &[
        RegistrationField::Name,
        RegistrationField::Surname,
        RegistrationField::Email,
        RegistrationField::Password,
        RegistrationField::Phone,
        RegistrationField::Gender,
    ],
    optional: &[],
    validates_phone: true,
    requires_invitation: true,
    approval: ApprovalMode::Manual,
    limit: InscriptionLimit::Restricted,
};

/// Registration rules for one role.
///
/// The set of roles is closed: adding a role means adding a variant here,
/// and every `match` on it fails to compile until the new role is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolePolicy {
    Client(RoleRequirements),
    Vendor(RoleRequirements),
    Moderator(RoleRequirements),
    Admin(RoleRequirements),
}

impl RolePolicy {
    pub fn for_role(role: AccountRole) -> Self {
        match role {
            AccountRole::Client => Self::Client(CLIENT),
            AccountRole::Vendor => Self::Vendor(VENDOR),
            AccountRole::Moderator => Self::Moderator(STAFF),
            AccountRole::Admin => Self::Admin(STAFF),
        }
    }

    /// Resolve a role identifier as sent by a registrant.
    pub fn resolve(identifier: &str) -> Result<Self, String> {
        identifier
            .trim()
            .parse::<AccountRole>()
            .map(Self::for_role)
            .map_err(|_| identifier.to_owned())
    }

    pub fn role(&self) -> AccountRole {
        match self {
            Self::Client(_) => AccountRole::Client,
            Self::Vendor(_) => AccountRole::Vendor,
            Self::Moderator(_) => AccountRole::Moderator,
            Self::Admin(_) => AccountRole::Admin,
        }
    }

    pub fn requirements(&self) -> &RoleRequirements {
        match self {
            Self::Client(r) | Self::Vendor(r) | Self::Moderator(r) | Self::Admin(r) => r,
        }
    }

    /// Status a fresh account of this role starts in.
    pub fn initial_status(&self) -> VerificationStatus {
        match self.requirements().approval {
            ApprovalMode::Automatic => VerificationStatus::Verified,
            ApprovalMode::Manual => VerificationStatus::Pending,
        }
    }

    /// Whether admins are emailed when someone applies for this role.
    pub fn alerts_admins_by_email(&self) -> bool {
        matches!(self, Self::Moderator(_) | Self::Admin(_))
    }

    pub fn accepts_shop_profile(&self) -> bool {
        matches!(self, Self::Vendor(_))
    }
}

// ── Invitation codes ─────────────────────────────────────────────────────────

/// A configured invitation code for one restricted role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationCode {
    pub code: String,
    pub max_uses: u64,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvitationRejection {
    #[error("an invitation code is required for this role")]
    Missing,
    #[error("invitation code does not match")]
    Mismatch,
    #[error("invitation code has expired")]
    Expired,
    #[error("invitation code has reached its usage limit")]
    Exhausted,
}

/// Invitation codes per restricted role.
///
/// A role without a configured code cannot be registered for, whatever is
/// supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationTable {
    pub vendor: Option<InvitationCode>,
    pub moderator: Option<InvitationCode>,
    pub admin: Option<InvitationCode>,
}

impl InvitationTable {
    pub fn code_for(&self, role: AccountRole) -> Option<&InvitationCode> {
        match role {
            AccountRole::Client => None,
            AccountRole::Vendor => self.vendor.as_ref(),
            AccountRole::Moderator => self.moderator.as_ref(),
            AccountRole::Admin => self.admin.as_ref(),
        }
    }

    /// Check `supplied` against the code configured for `role`.
    ///
    /// Only an exact match of the role's own code is accepted; another role's
    /// code never unlocks this one. Usage caps are checked by the caller,
    /// which owns the count of past registrations.
    pub fn check(
        &self,
        role: AccountRole,
        supplied: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<&InvitationCode, InvitationRejection> {
        let supplied = supplied
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(InvitationRejection::Missing)?;
        let expected = self
            .code_for(role)
            .filter(|c| c.code == supplied)
            .ok_or(InvitationRejection::Mismatch)?;
        if expected.expires_at.is_some_and(|at| at <= now) {
            return Err(InvitationRejection::Expired);
        }
        Ok(expected)
    }
}
