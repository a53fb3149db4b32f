//! Telegram update handlers.
//!
//! Each handler turns an update into core types, runs the core logic on the error
//! boundary, and always returns `Ok`: failures have already been reported or logged.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use nexbot_core::{
    commands::{parse_command_text, RawCommand},
    domain,
};

use crate::router::AppState;

mod callback;
mod commands;
mod feedback;
mod members;

/// What a message update should turn into.
#[derive(Debug)]
pub(crate) enum Route<'a> {
    Welcome(&'a [User]),
    Command(RawCommand),
    /// An answer to an open feedback prompt.
    Feedback {
        prompt: domain::MessageRef,
        text: &'a str,
    },
    Ignore,
}

/// Decide what to do with a message. `is_prompt` tells whether a message is an open
/// feedback prompt.
pub(crate) fn route<'a>(
    msg: &'a Message,
    bot_username: &str,
    is_prompt: impl Fn(domain::MessageRef) -> bool,
) -> Route<'a> {
    if let Some(users) = msg.new_chat_members() {
        return Route::Welcome(users);
    }
    // Channel posts have no sender to answer or check permissions for.
    if msg.from().is_none() {
        return Route::Ignore;
    }

    let Some(text) = msg.text().or_else(|| msg.caption()) else {
        return Route::Ignore;
    };
    if text.trim_start().starts_with('/') {
        return match parse_command_text(text, Some(bot_username)) {
            Some(raw) => Route::Command(raw),
            None => Route::Ignore,
        };
    }

    match (msg.text(), msg.reply_to_message()) {
        (Some(text), Some(parent)) if is_prompt(message_ref(parent)) => Route::Feedback {
            prompt: message_ref(parent),
            text,
        },
        _ => Route::Ignore,
    }
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    callback::handle_callback(q, state).await;
    Ok(())
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let feedback = state.services.feedback.clone();
    match route(&msg, &state.bot_username, |m| feedback.is_pending(m)) {
        Route::Welcome(users) => members::handle_new_members(&msg, users, &state).await,
        Route::Command(raw) => commands::handle_command(bot, msg.clone(), raw, state).await,
        Route::Feedback { prompt, text } => {
            feedback::handle_feedback(&msg, prompt, text, &state).await
        }
        Route::Ignore => {}
    }
    Ok(())
}

fn message_ref(msg: &Message) -> domain::MessageRef {
    domain::MessageRef {
        chat_id: domain::ChatId(msg.chat.id.0),
        message_id: domain::MessageId(msg.id.0),
    }
}

fn user_id(user: &User) -> domain::UserId {
    domain::UserId(user.id.0 as i64)
}

fn user_profile(user: &User) -> domain::UserProfile {
    domain::UserProfile {
        id: user_id(user),
        name: user.full_name(),
        username: user.username.clone(),
        is_bot: user.is_bot,
    }
}

/// The largest photo size, or a document, on this message.
fn attachment(msg: &Message) -> Option<domain::Attachment> {
    let largest = msg
        .photo()
        .and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height));
    if let Some(photo) = largest {
        // Telegram re-encodes photos as JPEG and drops the file name.
        return Some(domain::Attachment {
            file_name: None,
            mime_type: Some("image/jpeg".to_string()),
            size: photo.file.size,
            dimensions: Some((photo.width, photo.height)),
        });
    }
    msg.document().map(|doc| domain::Attachment {
        file_name: doc.file_name.clone(),
        mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
        size: doc.file.size,
        dimensions: None,
    })
}
