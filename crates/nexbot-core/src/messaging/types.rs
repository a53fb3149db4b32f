/// Inline keyboard (buttons) attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    /// All buttons on a single row.
    pub fn row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    /// Convenience for "one button per row" layouts, truncating long labels.
    pub fn one_per_row(buttons: Vec<InlineButton>, max_label_len: usize) -> Self {
        let rows = buttons
            .into_iter()
            .map(|mut b| {
                if b.label.chars().count() > max_label_len {
                    b.label = format!(
                        "{}...",
                        b.label.chars().take(max_label_len).collect::<String>()
                    );
                }
                vec![b]
            })
            .collect();
        Self { rows }
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_edit: bool,
    /// Whether a message can be made visible to a single user.
    pub supports_private_messages: bool,
    pub max_message_len: usize,
    /// Length limit for callback query answers.
    pub max_callback_answer_len: usize,
}
