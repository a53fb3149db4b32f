use crate::interaction::error::CaughtError;

pub const GENERIC_USER_MESSAGE: &str = "Something went wrong";

/// A caught error split into what the user sees and what the logs get.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedError {
    pub user_message: String,
    pub internal_message: Option<String>,
}

impl ClassifiedError {
    /// Best description for a log line.
    pub fn log_line(&self) -> &str {
        self.internal_message
            .as_deref()
            .unwrap_or(self.user_message.as_str())
    }
}

pub fn classify(err: &CaughtError) -> ClassifiedError {
    match err {
        CaughtError::Intentional(e) => ClassifiedError {
            user_message: non_empty_or_generic(e.user_message()),
            internal_message: e.internal_message().map(str::to_string),
        },
        CaughtError::Platform(e) => ClassifiedError {
            user_message: e
                .known_code()
                .map(|code| code.user_message())
                .unwrap_or(GENERIC_USER_MESSAGE)
                .to_string(),
            internal_message: Some(e.to_string()),
        },
        CaughtError::Http(e) => ClassifiedError {
            user_message: non_empty_or_generic(&e.message),
            internal_message: Some(format!("{} {}", e.status, e.message)),
        },
        CaughtError::Generic(e) => ClassifiedError {
            user_message: GENERIC_USER_MESSAGE.to_string(),
            internal_message: Some(e.description.clone()),
        },
    }
}

fn non_empty_or_generic(message: &str) -> String {
    if message.trim().is_empty() {
        GENERIC_USER_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}
