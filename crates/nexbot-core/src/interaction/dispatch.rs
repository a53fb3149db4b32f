use crate::{
    interaction::{
        classify::ClassifiedError,
        requester::{Lifecycle, Requester, Visibility},
    },
    logging::{LogRecord, LogSink},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Skipped,
    Failed,
}

/// Send the user message through the channel the requester's lifecycle allows.
///
/// Exactly one attempt. A failure is logged once and reported as `Failed`; it is never
/// retried or fed back into the error boundary.
pub async fn deliver(
    requester: Option<&dyn Requester>,
    message: &ClassifiedError,
    sink: &dyn LogSink,
) -> DeliveryOutcome {
    let Some(requester) = requester else {
        return DeliveryOutcome::Skipped;
    };

    let sent = match requester.lifecycle() {
        Lifecycle::Deferred | Lifecycle::Replied => {
            requester.edit_reply(&message.user_message).await
        }
        Lifecycle::Fresh => {
            requester
                .reply(&message.user_message, Visibility::Private)
                .await
        }
    };

    match sent {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(e) => {
            sink.record(LogRecord::warn(
                "dispatch",
                format!("failed to deliver error notice: {e}"),
            ));
            DeliveryOutcome::Failed
        }
    }
}
