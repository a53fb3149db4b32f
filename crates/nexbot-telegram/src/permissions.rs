//! Chat member lookups for the command guards.

use teloxide::{prelude::*, types::ChatMemberKind};

use nexbot_core::guards::{GuardScope, Permission, PermissionSet};

/// Owners can do everything; everyone else gets what their member record grants.
pub fn permission_set(kind: &ChatMemberKind) -> PermissionSet {
    if kind.is_owner() {
        return PermissionSet::all();
    }
    [
        (Permission::ManageChat, kind.can_manage_chat()),
        (Permission::ManageMessages, kind.can_delete_messages()),
        (Permission::RestrictMembers, kind.can_restrict_members()),
        (Permission::PinMessages, kind.can_pin_messages()),
        (Permission::InviteUsers, kind.can_invite_users()),
        (Permission::ChangeInfo, kind.can_change_info()),
    ]
    .into_iter()
    .filter_map(|(p, granted)| granted.then_some(p))
    .collect()
}

async fn member_permissions(
    bot: &Bot,
    chat: teloxide::types::ChatId,
    user: UserId,
) -> Option<PermissionSet> {
    match bot.get_chat_member(chat, user).await {
        Ok(member) => Some(permission_set(&member.kind)),
        Err(e) => {
            tracing::warn!(chat = chat.0, user = user.0, "chat member lookup failed: {e}");
            None
        }
    }
}

/// Look up both sides in a group chat. Private chats need no lookup.
pub async fn guard_scope(
    bot: &Bot,
    chat: &teloxide::types::Chat,
    bot_id: UserId,
    invoker: UserId,
) -> GuardScope {
    if !is_group(chat) {
        return GuardScope::direct();
    }
    let (bot_perms, invoker_perms) = tokio::join!(
        member_permissions(bot, chat.id, bot_id),
        member_permissions(bot, chat.id, invoker),
    );
    GuardScope::group(bot_perms, invoker_perms)
}

pub fn is_group(chat: &teloxide::types::Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}
