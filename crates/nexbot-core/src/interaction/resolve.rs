use std::sync::Arc;

use crate::interaction::requester::{ExecutionContext, Requester};

/// The requester an error notice can still reach, if any. No I/O.
pub fn resolve_requester(ctx: &ExecutionContext) -> Option<Arc<dyn Requester>> {
    match ctx {
        ExecutionContext::Api => None,
        ExecutionContext::Interactive { requester } => requester
            .as_ref()
            .filter(|r| r.is_repliable())
            .cloned(),
    }
}
