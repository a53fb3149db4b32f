use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{prelude::*, types::UserId};

use nexbot_core::{
    commands::{execute, Command, Invocation, RawCommand},
    guards::GuardScope,
    interaction::{replies::MessageRequester, requester::Requester},
    services::Services,
    Result,
};

use super::{attachment, message_ref, user_id, user_profile};
use crate::{permissions, router::AppState};

pub async fn handle_command(bot: Bot, msg: Message, raw: RawCommand, state: Arc<AppState>) {
    let services = state.services.clone();
    let requester = Arc::new(MessageRequester::new(
        services.messenger.clone(),
        message_ref(&msg),
    ));

    let task = run_command(
        bot,
        msg,
        raw,
        services.clone(),
        requester.clone(),
        state.bot_id,
        Utc::now(),
    );
    services
        .boundary
        .run(Some(requester as Arc<dyn Requester>), task)
        .await;
}

async fn run_command(
    bot: Bot,
    msg: Message,
    raw: RawCommand,
    services: Services,
    requester: Arc<MessageRequester>,
    bot_id: UserId,
    received_at: DateTime<Utc>,
) -> Result<()> {
    let command = Command::parse(&raw)?;
    let Some(from) = msg.from() else {
        return Ok(());
    };

    let scope = if command.needs_permissions() {
        permissions::guard_scope(&bot, &msg.chat, bot_id, from.id).await
    } else if permissions::is_group(&msg.chat) {
        GuardScope::group(None, None)
    } else {
        GuardScope::direct()
    };

    let origin = requester.origin();
    let parent = msg.reply_to_message();
    let inv = Invocation {
        chat: origin.chat_id,
        user: user_id(from),
        user_name: from.full_name(),
        message: origin,
        scope,
        received_at,
        reply_to: parent.and_then(|p| p.from()).map(user_profile),
        attachment: attachment(&msg).or_else(|| parent.and_then(attachment)),
    };
    tracing::info!(
        command = command.name(),
        chat = inv.chat.0,
        user = inv.user.0,
        "command received"
    );
    execute(&services, command, &inv, &requester).await
}
