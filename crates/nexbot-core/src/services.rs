use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{
    feedback::FeedbackStore,
    formatting::markdown_to_html,
    interaction::{boundary::ErrorBoundary, requester::ExecutionContext},
    logging::LogSink,
    messaging::port::MessagingPort,
    polls::{self, Poll, PollStore},
    store::ConfigStore,
    Result,
};

/// Shared state handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub messenger: Arc<dyn MessagingPort>,
    pub polls: Arc<PollStore>,
    pub config_store: Arc<ConfigStore>,
    pub feedback: Arc<FeedbackStore>,
    pub boundary: ErrorBoundary,
    pub poll_default_duration: Duration,
}

impl Services {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        sink: Arc<dyn LogSink>,
        poll_default_duration: Duration,
    ) -> Self {
        Self {
            messenger,
            polls: Arc::new(PollStore::new()),
            config_store: Arc::new(ConfigStore::new()),
            feedback: Arc::new(FeedbackStore::new()),
            boundary: ErrorBoundary::new(sink),
            poll_default_duration,
        }
    }

    /// Close the poll once `after` has elapsed. Failures have nobody to tell, so they are
    /// only logged.
    pub fn schedule_poll_close(&self, id: String, after: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(e) = this.close_poll(&id).await {
                this.boundary
                    .handle(e.into(), ExecutionContext::detached())
                    .await;
            }
        })
    }

    /// Remove the poll and rewrite its message with the results, dropping the buttons.
    pub async fn close_poll(&self, id: &str) -> Result<Option<Poll>> {
        let Some(poll) = self.polls.close(id) else {
            return Ok(None);
        };
        if let Some(msg) = poll.message {
            self.messenger
                .edit_html(msg, &markdown_to_html(&polls::render_closed(&poll)), None)
                .await?;
        }
        tracing::info!(poll = %poll.id, votes = poll.votes.len(), "poll closed");
        Ok(Some(poll))
    }
}
