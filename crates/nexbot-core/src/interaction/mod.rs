//! Interaction error pipeline: classify a failure, find who can be told, tell them once.

pub mod boundary;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod replies;
pub mod requester;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testing;

pub use boundary::{should_log, ApiResponse, BoundaryOutcome, ErrorBoundary};
pub use classify::{classify, ClassifiedError, GENERIC_USER_MESSAGE};
pub use dispatch::{deliver, DeliveryOutcome};
pub use error::{CaughtError, GenericError, HttpError, InteractionError, KnownCode, PlatformError};
pub use requester::{ExecutionContext, Lifecycle, ReplyTracker, Requester, Visibility};
pub use resolve::resolve_requester;
