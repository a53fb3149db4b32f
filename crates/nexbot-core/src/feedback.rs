//! Anonymous `/feedback`: the bot asks for a reply, and the answer ends up in the logs.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use crate::{
    domain::{MessageRef, UserId, UserProfile},
    interaction::{error::InteractionError, replies::MessageRequester},
    services::Services,
    Result,
};

pub const PROMPT: &str = "📝 **Feedback Form**\n\nReply to this message with your feedback. \
Put the subject on the first line and your message below it.";

pub const THANKS: &str = "Thank you for your feedback!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub subject: String,
    pub message: String,
}

/// Open prompts, keyed by the prompt message. Only the user who asked may answer.
#[derive(Debug, Default)]
pub struct FeedbackStore {
    pending: Mutex<HashMap<MessageRef, UserId>>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, prompt: MessageRef, user: UserId) {
        self.lock().insert(prompt, user);
    }

    pub fn is_pending(&self, prompt: MessageRef) -> bool {
        self.lock().contains_key(&prompt)
    }

    pub fn owner(&self, prompt: MessageRef) -> Option<UserId> {
        self.lock().get(&prompt).copied()
    }

    pub fn close(&self, prompt: MessageRef) -> Option<UserId> {
        self.lock().remove(&prompt)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MessageRef, UserId>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// First line is the subject, the rest is the message.
pub fn parse_feedback(text: &str) -> std::result::Result<Feedback, InteractionError> {
    let text = text.trim();
    let (subject, message) = text.split_once('\n').unwrap_or((text, ""));
    let (subject, message) = (subject.trim(), message.trim());
    if subject.is_empty() || message.is_empty() {
        return Err(InteractionError::new(
            "❌ Put the subject on the first line and your feedback below it.",
        ));
    }
    Ok(Feedback {
        subject: subject.to_string(),
        message: message.to_string(),
    })
}

/// Handle a reply to a feedback prompt. Replies from anyone but the prompt's owner are
/// ignored; a malformed answer keeps the prompt open.
pub async fn receive(
    services: &Services,
    prompt: MessageRef,
    author: &UserProfile,
    text: &str,
    requester: &MessageRequester,
) -> Result<()> {
    if services.feedback.owner(prompt) != Some(author.id) {
        return Ok(());
    }
    let feedback = parse_feedback(text)?;
    services.feedback.close(prompt);

    tracing::info!(
        from = %author.name,
        subject = %feedback.subject,
        message = %feedback.message,
        "new feedback received"
    );
    requester.respond(THANKS).await
}
