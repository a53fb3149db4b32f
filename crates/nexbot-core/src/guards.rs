//! Permission guards run before a command handler.
//!
//! A failed guard raises an [`InteractionError`], so the user is told through the normal
//! error boundary. Members who can manage the chat also get the list of what is missing.

use std::{collections::BTreeSet, fmt};

use crate::interaction::error::InteractionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    ManageChat,
    ManageMessages,
    RestrictMembers,
    PinMessages,
    InviteUsers,
    ChangeInfo,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ManageChat,
        Permission::ManageMessages,
        Permission::RestrictMembers,
        Permission::PinMessages,
        Permission::InviteUsers,
        Permission::ChangeInfo,
    ];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ManageChat => "ManageChat",
            Permission::ManageMessages => "ManageMessages",
            Permission::RestrictMembers => "RestrictMembers",
            Permission::PinMessages => "PinMessages",
            Permission::InviteUsers => "InviteUsers",
            Permission::ChangeInfo => "ChangeInfo",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn all() -> Self {
        Self(Permission::ALL.into_iter().collect())
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn missing(&self, required: &[Permission]) -> Vec<Permission> {
        let mut out: Vec<Permission> = required
            .iter()
            .copied()
            .filter(|p| !self.has(*p))
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where a command runs and what the bot and the invoker may do there.
///
/// `None` means the membership lookup failed or was not attempted.
#[derive(Clone, Debug, Default)]
pub struct GuardScope {
    pub in_group: bool,
    pub bot: Option<PermissionSet>,
    pub invoker: Option<PermissionSet>,
}

impl GuardScope {
    /// One-to-one chat with the bot: guards do not apply.
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn group(bot: Option<PermissionSet>, invoker: Option<PermissionSet>) -> Self {
        Self {
            in_group: true,
            bot,
            invoker,
        }
    }

    fn invoker_can_manage(&self) -> bool {
        self.invoker
            .as_ref()
            .is_some_and(|p| p.has(Permission::ManageChat))
    }
}

pub fn require_bot_permissions(
    scope: &GuardScope,
    required: &[Permission],
) -> Result<(), InteractionError> {
    if required.is_empty() || !scope.in_group {
        return Ok(());
    }
    let Some(bot) = &scope.bot else {
        return Ok(());
    };

    let missing = bot.missing(required);
    if missing.is_empty() {
        return Ok(());
    }
    Err(denied(
        "❌ I don't have the required permissions to do that.",
        &missing,
        scope.invoker_can_manage(),
    ))
}

pub fn require_member_permissions(
    scope: &GuardScope,
    required: &[Permission],
) -> Result<(), InteractionError> {
    if required.is_empty() || !scope.in_group {
        return Ok(());
    }

    let missing = match &scope.invoker {
        Some(perms) => perms.missing(required),
        None => PermissionSet::default().missing(required),
    };
    if missing.is_empty() {
        return Ok(());
    }
    Err(denied(
        "❌ You don't have the required permissions to do that.",
        &missing,
        scope.invoker_can_manage(),
    ))
}

fn denied(base: &str, missing: &[Permission], show_missing: bool) -> InteractionError {
    let mut message = base.to_string();
    if show_missing {
        let list = missing
            .iter()
            .map(|p| format!("`{p}`"))
            .collect::<Vec<_>>()
            .join(", ");
        message.push_str(&format!("\nMissing permissions: {list}"));
    }
    InteractionError::new(message).with_internal(format!(
        "permission guard failed, missing: {}",
        missing
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    ))
}
