use std::{future::Future, sync::Arc};

use serde_json::json;

use crate::{
    interaction::{
        classify::{classify, ClassifiedError},
        dispatch::{deliver, DeliveryOutcome},
        error::{CaughtError, HttpError},
        requester::{ExecutionContext, Requester},
        resolve::resolve_requester,
    },
    logging::{LogRecord, LogSink},
    Result,
};

pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Response for the API boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundaryOutcome {
    Interactive(DeliveryOutcome),
    Api(ApiResponse),
}

/// Catch-all for failures that escaped a handler.
///
/// Steps run in a fixed order: resolve the requester, classify, decide on logging,
/// deliver. Nothing here returns an error; every failure ends in a log record.
#[derive(Clone)]
pub struct ErrorBoundary {
    sink: Arc<dyn LogSink>,
}

impl ErrorBoundary {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &dyn LogSink {
        self.sink.as_ref()
    }

    pub async fn handle(&self, err: CaughtError, ctx: ExecutionContext) -> BoundaryOutcome {
        match ctx {
            ExecutionContext::Api => BoundaryOutcome::Api(self.handle_api(err)),
            interactive => {
                let requester = resolve_requester(&interactive);
                BoundaryOutcome::Interactive(self.handle_interactive(err, requester).await)
            }
        }
    }

    /// `requester` should come from [`resolve_requester`]; unrepliable ones are dropped again.
    pub async fn handle_interactive(
        &self,
        err: CaughtError,
        requester: Option<Arc<dyn Requester>>,
    ) -> DeliveryOutcome {
        let requester = requester.filter(|r| r.is_repliable());
        let classified = classify(&err);

        if should_log(&err, requester.is_some()) {
            self.log_failure(&classified);
        }

        deliver(requester.as_deref(), &classified, self.sink.as_ref()).await
    }

    /// Run `task` on its own tokio task. A returned error or a panic goes to
    /// [`Self::handle_interactive`]; `None` means the task succeeded.
    pub async fn run<F>(
        &self,
        requester: Option<Arc<dyn Requester>>,
        task: F,
    ) -> Option<DeliveryOutcome>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let caught = match tokio::spawn(task).await {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => CaughtError::from(e),
            Err(join) if join.is_panic() => CaughtError::from_panic(join.into_panic()),
            Err(join) => CaughtError::generic(format!("handler task cancelled: {join}")),
        };
        Some(self.handle_interactive(caught, requester).await)
    }

    pub fn handle_api(&self, err: CaughtError) -> ApiResponse {
        let classified = classify(&err);
        if should_log(&err, false) {
            self.log_failure(&classified);
        }
        api_response(&err, &classified)
    }

    fn log_failure(&self, classified: &ClassifiedError) {
        self.sink
            .record(LogRecord::error("boundary", classified.log_line()));
    }
}

/// Log decision; first match wins.
///
/// 1. Nobody can be told (API call, detached event, expired interaction): log.
/// 2. Intentional errors shown to the requester: skip.
/// 3. Expected platform codes shown to the requester: skip.
/// 4. Everything else: log.
pub fn should_log(err: &CaughtError, requester_reachable: bool) -> bool {
    if !requester_reachable {
        return true;
    }
    match err {
        CaughtError::Intentional(_) | CaughtError::Http(_) => false,
        CaughtError::Platform(p) => p.known_code().is_none(),
        CaughtError::Generic(_) => true,
    }
}

fn api_response(err: &CaughtError, classified: &ClassifiedError) -> ApiResponse {
    let status_code = match err {
        CaughtError::Http(e) => e.status,
        _ => INTERNAL_SERVER_ERROR,
    };

    let body = match err {
        CaughtError::Http(HttpError {
            body: Some(body), ..
        }) => body.clone(),
        _ => json!({
            "statusCode": status_code,
            "message": classified.user_message,
        }),
    };

    ApiResponse { status_code, body }
}
