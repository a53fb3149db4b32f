//! Requesters built on [`MessagingPort`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::MessageRef,
    errors::Error,
    formatting::{markdown_to_html, strip_markdown, truncate_chars},
    interaction::requester::{Lifecycle, ReplyTracker, Requester, Visibility},
    messaging::{port::MessagingPort, types::InlineKeyboard},
    Result,
};

const DEFER_PLACEHOLDER: &str = "⏳ Working on it…";

fn already_acknowledged() -> Error {
    Error::External("interaction has already been acknowledged".to_string())
}

/// A command message. Replies are threaded under it.
///
/// Chat messages cannot be scoped to one user, so private replies go out as regular
/// replies to the command.
pub struct MessageRequester {
    messenger: Arc<dyn MessagingPort>,
    origin: MessageRef,
    tracker: ReplyTracker,
}

impl MessageRequester {
    pub fn new(messenger: Arc<dyn MessagingPort>, origin: MessageRef) -> Self {
        Self {
            messenger,
            origin,
            tracker: ReplyTracker::default(),
        }
    }

    pub fn origin(&self) -> MessageRef {
        self.origin
    }

    /// The message currently holding our reply.
    pub fn reply_ref(&self) -> Option<MessageRef> {
        self.tracker.reply_ref()
    }

    /// Post a placeholder that a later [`Requester::edit_reply`] replaces.
    pub async fn defer(&self) -> Result<()> {
        if self.tracker.lifecycle() != Lifecycle::Fresh {
            return Ok(());
        }
        let sent = self
            .messenger
            .reply_html(self.origin, DEFER_PLACEHOLDER)
            .await?;
        self.tracker.advance(Lifecycle::Deferred, Some(sent));
        Ok(())
    }

    /// Reply when fresh, otherwise edit the existing reply.
    pub async fn respond(&self, content: &str) -> Result<()> {
        match self.tracker.lifecycle() {
            Lifecycle::Fresh => self.reply(content, Visibility::Public).await,
            Lifecycle::Deferred | Lifecycle::Replied => self.edit_reply(content).await,
        }
    }

    /// Initial reply carrying inline buttons.
    pub async fn reply_with_keyboard(
        &self,
        content: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        if self.tracker.lifecycle() != Lifecycle::Fresh {
            return Err(already_acknowledged());
        }
        let sent = self
            .messenger
            .send_inline_keyboard(self.origin.chat_id, &self.render(content), keyboard)
            .await?;
        self.tracker.advance(Lifecycle::Replied, Some(sent));
        Ok(sent)
    }

    /// Initial reply that asks the invoker to answer it.
    pub async fn reply_with_prompt(&self, content: &str) -> Result<MessageRef> {
        if self.tracker.lifecycle() != Lifecycle::Fresh {
            return Err(already_acknowledged());
        }
        let sent = self
            .messenger
            .prompt_reply(self.origin, &self.render(content))
            .await?;
        self.tracker.advance(Lifecycle::Replied, Some(sent));
        Ok(sent)
    }

    fn render(&self, content: &str) -> String {
        let limit = self.messenger.capabilities().max_message_len;
        markdown_to_html(&truncate_chars(content, limit))
    }
}

#[async_trait]
impl Requester for MessageRequester {
    fn is_repliable(&self) -> bool {
        true
    }

    fn lifecycle(&self) -> Lifecycle {
        self.tracker.lifecycle()
    }

    async fn reply(&self, content: &str, _visibility: Visibility) -> Result<()> {
        if self.tracker.lifecycle() != Lifecycle::Fresh {
            return Err(already_acknowledged());
        }
        let sent = self
            .messenger
            .reply_html(self.origin, &self.render(content))
            .await?;
        self.tracker.advance(Lifecycle::Replied, Some(sent));
        Ok(())
    }

    async fn edit_reply(&self, content: &str) -> Result<()> {
        let Some(target) = self.tracker.reply_ref() else {
            return Err(Error::External("no reply to edit".to_string()));
        };
        self.messenger
            .edit_html(target, &self.render(content), None)
            .await?;
        self.tracker.advance(Lifecycle::Replied, None);
        Ok(())
    }
}

/// A button press on one of our messages.
///
/// The first answer is a toast only the presser sees. After that, content goes into a
/// follow-up message under the message that carried the button.
pub struct CallbackRequester {
    messenger: Arc<dyn MessagingPort>,
    callback_id: String,
    origin: Option<MessageRef>,
    tracker: ReplyTracker,
}

impl CallbackRequester {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        callback_id: impl Into<String>,
        origin: Option<MessageRef>,
    ) -> Self {
        Self {
            messenger,
            callback_id: callback_id.into(),
            origin,
            tracker: ReplyTracker::default(),
        }
    }

    pub fn origin(&self) -> Option<MessageRef> {
        self.origin
    }

    /// Acknowledge the press without showing anything.
    pub async fn defer(&self) -> Result<()> {
        if self.tracker.lifecycle() != Lifecycle::Fresh {
            return Ok(());
        }
        self.messenger
            .answer_callback_query(&self.callback_id, None)
            .await?;
        self.tracker.advance(Lifecycle::Deferred, None);
        Ok(())
    }

    /// Telegram keeps a spinner on the button until the query is answered.
    pub async fn ensure_answered(&self) -> Result<()> {
        self.defer().await
    }
}

#[async_trait]
impl Requester for CallbackRequester {
    fn is_repliable(&self) -> bool {
        self.tracker.lifecycle() == Lifecycle::Fresh || self.origin.is_some()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.tracker.lifecycle()
    }

    async fn reply(&self, content: &str, _visibility: Visibility) -> Result<()> {
        if self.tracker.lifecycle() != Lifecycle::Fresh {
            return Err(already_acknowledged());
        }
        let limit = self.messenger.capabilities().max_callback_answer_len;
        let text = truncate_chars(&strip_markdown(content), limit);
        self.messenger
            .answer_callback_query(&self.callback_id, Some(&text))
            .await?;
        self.tracker.advance(Lifecycle::Replied, None);
        Ok(())
    }

    async fn edit_reply(&self, content: &str) -> Result<()> {
        let limit = self.messenger.capabilities().max_message_len;
        let html = markdown_to_html(&truncate_chars(content, limit));

        if let Some(followup) = self.tracker.reply_ref() {
            self.messenger.edit_html(followup, &html, None).await?;
        } else {
            let Some(origin) = self.origin else {
                return Err(Error::External(
                    "callback has no message to follow up on".to_string(),
                ));
            };
            let sent = self.messenger.reply_html(origin, &html).await?;
            self.tracker.set_reply_ref(sent);
        }
        self.tracker.advance(Lifecycle::Replied, None);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{Call, FakeMessenger};
    use super::*;
    use crate::domain::{ChatId, MessageId};
    use crate::messaging::types::InlineButton;

    fn origin() -> MessageRef {
        MessageRef {
            chat_id: ChatId(7),
            message_id: MessageId(1),
        }
    }

    #[tokio::test]
    async fn message_reply_then_edit_targets_the_reply() {
        let api = Arc::new(FakeMessenger::new());
        let req = MessageRequester::new(api.clone(), origin());

        req.reply("**Pong!**", Visibility::Private).await.unwrap();
        assert_eq!(req.lifecycle(), Lifecycle::Replied);
        assert!(req.reply("again", Visibility::Public).await.is_err());

        req.edit_reply("edited").await.unwrap();

        let reply = MessageRef {
            chat_id: ChatId(7),
            message_id: MessageId(100),
        };
        assert_eq!(
            api.calls(),
            vec![
                Call::Reply(origin(), "<b>Pong!</b>".to_string()),
                Call::Edit(reply, "edited".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn deferred_message_edits_the_placeholder() {
        let api = Arc::new(FakeMessenger::new());
        let req = MessageRequester::new(api.clone(), origin());

        req.defer().await.unwrap();
        assert_eq!(req.lifecycle(), Lifecycle::Deferred);
        req.defer().await.unwrap();

        req.respond("done").await.unwrap();
        assert_eq!(req.lifecycle(), Lifecycle::Replied);

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(&calls[0], Call::Reply(_, t) if t == DEFER_PLACEHOLDER));
        assert!(matches!(&calls[1], Call::Edit(m, t, _) if m.message_id == MessageId(100) && t == "done"));
    }

    #[tokio::test]
    async fn fresh_message_cannot_be_edited() {
        let api = Arc::new(FakeMessenger::new());
        let req = MessageRequester::new(api.clone(), origin());
        assert!(req.edit_reply("x").await.is_err());
        assert_eq!(req.lifecycle(), Lifecycle::Fresh);
    }

    #[tokio::test]
    async fn keyboard_reply_marks_replied() {
        let api = Arc::new(FakeMessenger::new());
        let req = MessageRequester::new(api.clone(), origin());
        let kb = InlineKeyboard::row(vec![InlineButton::new("Yes", "vote:yes")]);

        let sent = req.reply_with_keyboard("Lunch?", kb.clone()).await.unwrap();
        assert_eq!(req.reply_ref(), Some(sent));
        assert!(req.reply_with_keyboard("again", kb).await.is_err());
    }

    #[tokio::test]
    async fn prompt_reply_marks_replied() {
        let api = Arc::new(FakeMessenger::new());
        let req = MessageRequester::new(api.clone(), origin());

        let sent = req.reply_with_prompt("Tell us **more**").await.unwrap();
        assert_eq!(req.lifecycle(), Lifecycle::Replied);
        assert_eq!(req.reply_ref(), Some(sent));
        assert!(req.reply_with_prompt("again").await.is_err());
        assert_eq!(
            api.calls(),
            vec![Call::Prompt(origin(), "Tell us <b>more</b>".to_string())]
        );
    }

    #[tokio::test]
    async fn callback_reply_is_a_plain_truncated_toast() {
        let api = Arc::new(FakeMessenger::new());
        let req = CallbackRequester::new(api.clone(), "cb1", Some(origin()));

        req.reply("You voted **Yes** and that is final", Visibility::Private)
            .await
            .unwrap();

        assert_eq!(
            api.calls(),
            vec![Call::Answer(
                "cb1".to_string(),
                Some("You voted Yes and t…".to_string())
            )]
        );
        assert_eq!(req.lifecycle(), Lifecycle::Replied);
    }

    #[tokio::test]
    async fn callback_edit_creates_then_reuses_followup() {
        let api = Arc::new(FakeMessenger::new());
        let req = CallbackRequester::new(api.clone(), "cb1", Some(origin()));

        req.defer().await.unwrap();
        req.edit_reply("first").await.unwrap();
        req.edit_reply("second").await.unwrap();

        let followup = MessageRef {
            chat_id: ChatId(7),
            message_id: MessageId(100),
        };
        assert_eq!(
            api.calls(),
            vec![
                Call::Answer("cb1".to_string(), None),
                Call::Reply(origin(), "first".to_string()),
                Call::Edit(followup, "second".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn answered_callback_without_message_is_not_repliable() {
        let api = Arc::new(FakeMessenger::new());
        let req = CallbackRequester::new(api.clone(), "cb1", None);
        assert!(req.is_repliable());

        req.ensure_answered().await.unwrap();
        assert!(!req.is_repliable());
        assert!(req.edit_reply("x").await.is_err());

        req.ensure_answered().await.unwrap();
        assert_eq!(api.calls().len(), 1);
    }
}
