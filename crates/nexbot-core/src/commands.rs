//! Command catalog, argument parsing and execution.
//!
//! Handlers only talk to [`MessagingPort`](crate::messaging::port::MessagingPort) through the
//! requesters and [`Services`], so the whole catalog runs against a fake messenger in tests.

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{
    domain::{Attachment, ChatId, MessageId, MessageRef, UserId, UserProfile},
    feedback,
    formatting::markdown_to_html,
    guards::{require_bot_permissions, require_member_permissions, GuardScope, Permission},
    interaction::{
        error::InteractionError,
        replies::{CallbackRequester, MessageRequester},
        requester::{Requester, Visibility},
    },
    messaging::types::{InlineButton, InlineKeyboard},
    polls, search,
    services::Services,
    Result,
};

pub const ECHO_MAX_CHARS: usize = 200;
pub const PURGE_MAX: u32 = 100;

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub bot_permissions: &'static [Permission],
    pub member_permissions: &'static [Permission],
    pub group_only: bool,
}

const fn spec(name: &'static str, usage: &'static str, description: &'static str) -> CommandSpec {
    CommandSpec {
        name,
        usage,
        description,
        bot_permissions: &[],
        member_permissions: &[],
        group_only: false,
    }
}

pub const CATALOG: &[CommandSpec] = &[
    spec("help", "/help", "Show the available commands"),
    spec("ping", "/ping", "Ping-Pong command"),
    spec("echo", "/echo [--loud] <text>", "Back at you!"),
    spec("vote", "/vote <question>", "Start a simple Yes/No poll"),
    CommandSpec {
        member_permissions: &[Permission::ManageMessages],
        ..spec(
            "poll",
            "/poll [duration] | <question> | <choice 1> | <choice 2> [| up to 5 choices]",
            "Create a timed poll with up to five choices",
        )
    },
    spec(
        "config",
        "/config view | set <key> <value> | delete <key> | clear",
        "View or change this chat's settings",
    ),
    CommandSpec {
        bot_permissions: &[Permission::ManageMessages],
        member_permissions: &[Permission::ManageMessages],
        group_only: true,
        ..spec("purge", "/purge <amount>", "Delete recent messages (max 100)")
    },
    spec(
        "search",
        "/search <category> <term>",
        "Search a small catalog of technologies",
    ),
    spec(
        "whatis",
        "/whatis (in reply to a message)",
        "Show information about a user",
    ),
    spec(
        "upload",
        "/upload (as the caption of an image)",
        "Describe an uploaded image",
    ),
    spec("feedback", "/feedback", "Send anonymous feedback to the bot owner"),
    spec("select", "/select string | dynamic", "Pick an option from a button menu"),
];

pub fn find_spec(name: &str) -> Option<&'static CommandSpec> {
    CATALOG.iter().find(|c| c.name == name)
}

pub fn help_text() -> String {
    let lines = CATALOG
        .iter()
        .map(|c| format!("`{}` - {}", c.usage, c.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!("🤖 **Available commands**\n\n{lines}")
}

/// `/name@bot args` split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCommand {
    pub name: String,
    pub args: String,
}

/// Returns `None` for plain text and for commands addressed to another bot.
pub fn parse_command_text(text: &str, bot_username: Option<&str>) -> Option<RawCommand> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((h, a)) => (h, a.trim()),
        None => (rest, ""),
    };
    let (name, target) = match head.split_once('@') {
        Some((n, t)) => (n, Some(t)),
        None => (head, None),
    };
    if name.is_empty() {
        return None;
    }
    if let (Some(target), Some(me)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(me) {
            return None;
        }
    }
    Some(RawCommand {
        name: name.to_ascii_lowercase(),
        args: args.to_string(),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    View,
    Set { key: String, value: String },
    Delete { key: String },
    Clear,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollRequest {
    pub duration: Option<String>,
    pub question: String,
    pub choices: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectMenu {
    /// Five fixed options.
    Strings,
    /// The menu's item name travels in the button data.
    Dynamic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Ping,
    Echo { text: String, loud: bool },
    Vote { question: String },
    Poll(PollRequest),
    Config(ConfigAction),
    Purge { amount: u32 },
    Search { category: String, term: String },
    Whatis,
    Upload,
    Feedback,
    Select(SelectMenu),
    Unknown(String),
}

impl Command {
    pub fn parse(raw: &RawCommand) -> std::result::Result<Self, InteractionError> {
        let args = raw.args.trim();
        match raw.name.as_str() {
            "help" | "start" => Ok(Self::Help),
            "ping" => Ok(Self::Ping),
            "echo" => parse_echo(args),
            "vote" => {
                if args.is_empty() {
                    return Err(usage("vote"));
                }
                Ok(Self::Vote {
                    question: args.to_string(),
                })
            }
            "poll" => parse_poll(args).map(Self::Poll),
            "config" => parse_config(args).map(Self::Config),
            "purge" => parse_purge(args),
            "search" => parse_search(args),
            "whatis" => Ok(Self::Whatis),
            "upload" => Ok(Self::Upload),
            "feedback" => Ok(Self::Feedback),
            "select" => match args.to_ascii_lowercase().as_str() {
                "string" => Ok(Self::Select(SelectMenu::Strings)),
                "dynamic" => Ok(Self::Select(SelectMenu::Dynamic)),
                _ => Err(usage("select")),
            },
            other => Ok(Self::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Help => "help",
            Self::Ping => "ping",
            Self::Echo { .. } => "echo",
            Self::Vote { .. } => "vote",
            Self::Poll(_) => "poll",
            Self::Config(_) => "config",
            Self::Purge { .. } => "purge",
            Self::Search { .. } => "search",
            Self::Whatis => "whatis",
            Self::Upload => "upload",
            Self::Feedback => "feedback",
            Self::Select(_) => "select",
            Self::Unknown(name) => name.as_str(),
        }
    }

    pub fn spec(&self) -> Option<&'static CommandSpec> {
        find_spec(self.name())
    }

    /// Whether the adapter must look up permissions before running the command.
    pub fn needs_permissions(&self) -> bool {
        self.spec()
            .is_some_and(|s| !s.bot_permissions.is_empty() || !s.member_permissions.is_empty())
    }
}

fn usage(name: &str) -> InteractionError {
    let text = find_spec(name).map(|s| s.usage).unwrap_or("/help");
    InteractionError::new(format!("❌ Usage: `{text}`"))
}

fn parse_echo(args: &str) -> std::result::Result<Command, InteractionError> {
    let (loud, text) = match args.strip_prefix("--loud") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            (true, rest.trim())
        }
        _ => (false, args),
    };
    let len = text.chars().count();
    if len == 0 || len > ECHO_MAX_CHARS {
        return Err(InteractionError::new(format!(
            "❌ Text must be between 1 and {ECHO_MAX_CHARS} characters."
        )));
    }
    Ok(Command::Echo {
        text: text.to_string(),
        loud,
    })
}

/// `[duration] | question | c1 | c2 ...`. With four or more segments a leading segment that
/// is blank or reads as a duration is the duration; anything else is the question.
fn parse_poll(args: &str) -> std::result::Result<PollRequest, InteractionError> {
    let mut parts: Vec<&str> = args.split('|').map(str::trim).collect();
    let has_duration = parts.len() >= 4
        && parts
            .first()
            .is_some_and(|p| p.is_empty() || polls::parse_duration(p).is_some());
    let duration = if has_duration {
        Some(parts.remove(0).to_string()).filter(|d| !d.is_empty())
    } else {
        None
    };

    if parts.len() < 1 + polls::MIN_CHOICES {
        return Err(usage("poll"));
    }
    let question = parts.remove(0).to_string();
    if question.is_empty() {
        return Err(usage("poll"));
    }
    Ok(PollRequest {
        duration,
        question,
        choices: parts.into_iter().map(str::to_string).collect(),
    })
}

fn parse_config(args: &str) -> std::result::Result<ConfigAction, InteractionError> {
    let (sub, rest) = match args.split_once(char::is_whitespace) {
        Some((s, r)) => (s, r.trim()),
        None => (args, ""),
    };
    match sub.to_ascii_lowercase().as_str() {
        "" | "view" => Ok(ConfigAction::View),
        "clear" => Ok(ConfigAction::Clear),
        "set" => match rest.split_once(char::is_whitespace) {
            Some((key, value)) if !value.trim().is_empty() => Ok(ConfigAction::Set {
                key: key.to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(usage("config")),
        },
        "delete" if !rest.is_empty() => Ok(ConfigAction::Delete {
            key: rest.to_string(),
        }),
        _ => Err(usage("config")),
    }
}

fn parse_purge(args: &str) -> std::result::Result<Command, InteractionError> {
    match args.parse::<u32>() {
        Ok(amount) if (1..=PURGE_MAX).contains(&amount) => Ok(Command::Purge { amount }),
        _ => Err(InteractionError::new(format!(
            "❌ Amount must be a number between 1 and {PURGE_MAX}."
        ))),
    }
}

fn parse_search(args: &str) -> std::result::Result<Command, InteractionError> {
    let Some((category, term)) = args.split_once(char::is_whitespace) else {
        return Err(usage("search"));
    };
    let term = term.trim();
    let len = term.chars().count();
    if len == 0 || len > search::TERM_MAX_CHARS {
        return Err(InteractionError::new(format!(
            "❌ Search terms must be 1 to {} characters.",
            search::TERM_MAX_CHARS
        )));
    }
    Ok(Command::Search {
        category: category.to_string(),
        term: term.to_string(),
    })
}

/// Everything a handler needs to know about the message that carried the command.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub chat: ChatId,
    pub user: UserId,
    pub user_name: String,
    pub message: MessageRef,
    pub scope: GuardScope,
    pub received_at: DateTime<Utc>,
    /// Author of the message the command replied to.
    pub reply_to: Option<UserProfile>,
    /// File on the command message, or on the message it replied to.
    pub attachment: Option<Attachment>,
}

/// Check the command's guards, then run it. Failures are left to the caller's boundary.
pub async fn execute(
    services: &Services,
    command: Command,
    inv: &Invocation,
    requester: &MessageRequester,
) -> Result<()> {
    if let Some(spec) = command.spec() {
        if spec.group_only && !inv.scope.in_group {
            return Err(
                InteractionError::new("❌ This command can only be used in group chats.").into(),
            );
        }
        require_bot_permissions(&inv.scope, spec.bot_permissions)?;
        require_member_permissions(&inv.scope, spec.member_permissions)?;
    }

    match command {
        Command::Help => requester.respond(&help_text()).await,
        Command::Unknown(name) => {
            requester
                .respond(&format!("Unknown command `/{name}`.\n\n{}", help_text()))
                .await
        }
        Command::Ping => {
            // Message timestamps only have second precision; time a real round trip.
            let started = Instant::now();
            requester.reply("🏓 Pinging…", Visibility::Public).await?;
            let latency = started.elapsed().as_millis();
            requester
                .edit_reply(&format!("Pong! 🏓 Latency: **{latency} ms**"))
                .await
        }
        Command::Echo { text, loud } => {
            let reply = if loud {
                format!("Echo: {}!!!", text.to_uppercase())
            } else {
                format!("Echo: {text}.")
            };
            requester.respond(&reply).await
        }
        Command::Vote { question } => {
            let keyboard = InlineKeyboard::row(vec![
                InlineButton::new("👍 Yes", VOTE_YES),
                InlineButton::new("👎 No", VOTE_NO),
            ]);
            requester.reply_with_keyboard(&question, keyboard).await?;
            Ok(())
        }
        Command::Poll(request) => start_poll(services, request, inv, requester).await,
        Command::Config(action) => {
            let reply = match action {
                ConfigAction::View => services.config_store.view(inv.chat)?,
                ConfigAction::Set { key, value } => {
                    services.config_store.set(inv.chat, &key, &value)?
                }
                ConfigAction::Delete { key } => services.config_store.delete(inv.chat, &key),
                ConfigAction::Clear => services.config_store.clear(inv.chat),
            };
            requester.respond(&reply).await
        }
        Command::Purge { amount } => purge(services, amount, inv, requester).await,
        Command::Search { category, term } => {
            let hits = search::search(&category, &term)?;
            requester
                .respond(&search::render_results(&category, &term, &hits))
                .await
        }
        Command::Whatis => {
            let Some(user) = &inv.reply_to else {
                return Err(InteractionError::new(
                    "❌ Reply to someone's message with `/whatis` to see who they are.",
                )
                .into());
            };
            requester.respond(&describe_user(user)).await
        }
        Command::Upload => {
            let image = inv.attachment.as_ref().filter(|a| a.is_image());
            let Some(image) = image else {
                return Err(InteractionError::new("❌ Please upload a valid image file.").into());
            };
            requester
                .respond(&describe_upload(image, &inv.user_name))
                .await
        }
        Command::Feedback => {
            let prompt = requester.reply_with_prompt(feedback::PROMPT).await?;
            services.feedback.open(prompt, inv.user);
            Ok(())
        }
        Command::Select(menu) => {
            let (text, keyboard) = select_menu(menu);
            requester.reply_with_keyboard(text, keyboard).await?;
            Ok(())
        }
    }
}

fn describe_user(user: &UserProfile) -> String {
    let username = user
        .username
        .as_deref()
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| "None".to_string());
    format!(
        "👤 **User: {}**\n\nID: `{}`\nUsername: {username}\nBot: {}",
        user.name,
        user.id.0,
        if user.is_bot { "Yes" } else { "No" }
    )
}

fn describe_upload(image: &Attachment, uploader: &str) -> String {
    let dimensions = image
        .dimensions
        .map(|(w, h)| format!("{w}x{h}"))
        .unwrap_or_else(|| "Unknown".to_string());
    format!(
        "🖼️ **Uploaded Image**\n\n\
         File Name: {}\n\
         File Size: {:.2} KB\n\
         File Type: {}\n\
         Dimensions: {dimensions}\n\n\
         Uploaded by {uploader}",
        image.file_name.as_deref().unwrap_or("Unknown"),
        f64::from(image.size) / 1024.0,
        image.mime_type.as_deref().unwrap_or("Unknown"),
    )
}

const SELECT_STRING_ITEM: &str = "string";
const SELECT_DYNAMIC_ITEM: &str = "color";

fn select_menu(menu: SelectMenu) -> (&'static str, InlineKeyboard) {
    let button = |item: &str, label: &str, value: &str| {
        InlineButton::new(label, format!("select:{item}:{value}"))
    };
    match menu {
        SelectMenu::Strings => (
            "Select a string from the menu below:",
            InlineKeyboard::one_per_row(
                (1..=5)
                    .map(|i| {
                        let label = format!("Option {i}");
                        button(SELECT_STRING_ITEM, &label, &format!("option_{i}"))
                    })
                    .collect(),
                32,
            ),
        ),
        SelectMenu::Dynamic => (
            "Select one option below:",
            InlineKeyboard::row(
                ["Red", "Blue", "Yellow"]
                    .into_iter()
                    .map(|c| button(SELECT_DYNAMIC_ITEM, c, c))
                    .collect(),
            ),
        ),
    }
}

pub fn poll_id(origin: MessageRef) -> String {
    format!("{}_{}", origin.chat_id.0, origin.message_id.0)
}

async fn start_poll(
    services: &Services,
    request: PollRequest,
    inv: &Invocation,
    requester: &MessageRequester,
) -> Result<()> {
    let duration =
        polls::poll_duration(request.duration.as_deref(), services.poll_default_duration)?;
    let poll = services.polls.create(
        poll_id(inv.message),
        &request.question,
        request.choices,
        duration,
        inv.received_at,
    )?;

    let sent = match requester
        .reply_with_keyboard(&polls::render_open(&poll), polls::keyboard(&poll))
        .await
    {
        Ok(sent) => sent,
        Err(e) => {
            services.polls.close(&poll.id);
            return Err(e);
        }
    };
    services.polls.attach_message(&poll.id, sent);
    services.schedule_poll_close(poll.id.clone(), duration);
    tracing::info!(poll = %poll.id, choices = poll.choices.len(), ?duration, "poll started");
    Ok(())
}

/// Telegram cannot list history, so ids below the command are deleted one by one.
async fn purge(
    services: &Services,
    amount: u32,
    inv: &Invocation,
    requester: &MessageRequester,
) -> Result<()> {
    requester.defer().await?;

    let newest = inv.message.message_id.0;
    let mut deleted = 0u32;
    for id in (1..newest).rev().take(amount as usize) {
        let target = MessageRef {
            chat_id: inv.chat,
            message_id: MessageId(id),
        };
        match services.messenger.delete_message(target).await {
            Ok(()) => deleted += 1,
            Err(e) => tracing::debug!(message_id = id, "purge skipped message: {e}"),
        }
    }

    tracing::info!(chat = inv.chat.0, requested = amount, deleted, "purge finished");
    requester
        .respond(&format!("✅ Deleted **{deleted}** messages."))
        .await
}

pub const VOTE_YES: &str = "vote:yes";
pub const VOTE_NO: &str = "vote:no";

/// Button presses we understand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Vote { yes: bool },
    Poll { id: String, choice: String },
    Select { item: String, value: String },
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            VOTE_YES => Some(Self::Vote { yes: true }),
            VOTE_NO => Some(Self::Vote { yes: false }),
            _ if data.starts_with("select:") => {
                let (item, value) = data["select:".len()..].split_once(':')?;
                (!item.is_empty() && !value.is_empty()).then(|| Self::Select {
                    item: item.to_string(),
                    value: value.to_string(),
                })
            }
            _ => polls::parse_callback(data).map(|(id, choice)| Self::Poll {
                id: id.to_string(),
                choice: choice.to_string(),
            }),
        }
    }
}

pub async fn execute_callback(
    services: &Services,
    action: CallbackAction,
    user: UserId,
    now: DateTime<Utc>,
    requester: &CallbackRequester,
) -> Result<()> {
    match action {
        CallbackAction::Vote { yes } => {
            let text = if yes {
                "You voted **Yes** 👍"
            } else {
                "You voted **No** 👎"
            };
            requester.reply(text, Visibility::Private).await
        }
        CallbackAction::Poll { id, choice } => {
            let receipt = services.polls.vote(&id, user, &choice, now)?;
            if let (true, Some(msg)) = (receipt.changed, receipt.poll.message) {
                services
                    .messenger
                    .edit_html(
                        msg,
                        &markdown_to_html(&polls::render_open(&receipt.poll)),
                        Some(polls::keyboard(&receipt.poll)),
                    )
                    .await?;
            }
            requester
                .reply(
                    &format!("You voted for {}.", receipt.choice),
                    Visibility::Private,
                )
                .await
        }
        CallbackAction::Select { item, value } => {
            // Selections are announced in the chat, not as a toast.
            requester.defer().await?;
            let text = if item == SELECT_STRING_ITEM {
                format!("Your selection:\n- {value}")
            } else {
                format!("{item} = {value}")
            };
            requester.edit_reply(&text).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::TimeZone;

    use super::*;
    use crate::{
        guards::PermissionSet,
        interaction::{
            replies::fake::{Call, FakeMessenger},
            testing::RecordingSink,
        },
        interaction::Lifecycle,
        Error,
    };

    const CHAT: ChatId = ChatId(-1001);

    fn services() -> (Services, Arc<FakeMessenger>) {
        let messenger = Arc::new(FakeMessenger::new());
        let services = Services::new(
            messenger.clone(),
            Arc::new(RecordingSink::default()),
            Duration::from_secs(60),
        );
        (services, messenger)
    }

    fn invocation(scope: GuardScope) -> Invocation {
        Invocation {
            chat: CHAT,
            user: UserId(42),
            user_name: "Dana".into(),
            message: MessageRef {
                chat_id: CHAT,
                message_id: MessageId(10),
            },
            scope,
            received_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            reply_to: None,
            attachment: None,
        }
    }

    fn raw(text: &str) -> RawCommand {
        parse_command_text(text, Some("nexbot")).unwrap()
    }

    fn manager_scope() -> GuardScope {
        GuardScope::group(Some(PermissionSet::all()), Some(PermissionSet::all()))
    }

    async fn run(
        services: &Services,
        text: &str,
        scope: GuardScope,
    ) -> (Result<()>, MessageRequester) {
        run_with(services, text, invocation(scope)).await
    }

    async fn run_with(
        services: &Services,
        text: &str,
        inv: Invocation,
    ) -> (Result<()>, MessageRequester) {
        let requester = MessageRequester::new(services.messenger.clone(), inv.message);
        let res = match Command::parse(&raw(text)) {
            Ok(cmd) => execute(services, cmd, &inv, &requester).await,
            Err(e) => Err(e.into()),
        };
        (res, requester)
    }

    fn user_message(res: Result<()>) -> String {
        match res {
            Err(Error::Interaction(e)) => e.user_message().to_string(),
            other => panic!("expected interaction error, got {other:?}"),
        }
    }

    #[test]
    fn command_text_parsing() {
        assert_eq!(
            parse_command_text("/Echo@NexBot  hi there ", Some("nexbot")),
            Some(RawCommand {
                name: "echo".into(),
                args: "hi there".into()
            })
        );
        assert_eq!(parse_command_text("/ping@otherbot", Some("nexbot")), None);
        assert_eq!(parse_command_text("hello", None), None);
        assert_eq!(parse_command_text("/", None), None);
        assert_eq!(
            parse_command_text("/ping", None),
            Some(RawCommand {
                name: "ping".into(),
                args: String::new()
            })
        );
    }

    #[test]
    fn argument_parsing() {
        assert_eq!(
            Command::parse(&raw("/echo --loud hey")),
            Ok(Command::Echo {
                text: "hey".into(),
                loud: true
            })
        );
        assert_eq!(
            Command::parse(&raw("/echo --loudness")),
            Ok(Command::Echo {
                text: "--loudness".into(),
                loud: false
            })
        );
        assert!(Command::parse(&raw("/echo --loud")).is_err());
        assert!(Command::parse(&raw(&format!("/echo {}", "a".repeat(201)))).is_err());

        assert_eq!(
            Command::parse(&raw("/poll 10m | Lunch? | Pizza | Sushi")),
            Ok(Command::Poll(PollRequest {
                duration: Some("10m".into()),
                question: "Lunch?".into(),
                choices: vec!["Pizza".into(), "Sushi".into()],
            }))
        );
        assert_eq!(
            Command::parse(&raw("/poll Lunch? | Pizza | Sushi | Tacos")),
            Ok(Command::Poll(PollRequest {
                duration: None,
                question: "Lunch?".into(),
                choices: vec!["Pizza".into(), "Sushi".into(), "Tacos".into()],
            }))
        );
        assert_eq!(
            Command::parse(&raw("/poll 3 things for lunch? | Pizza | Sushi | Tacos")),
            Ok(Command::Poll(PollRequest {
                duration: None,
                question: "3 things for lunch?".into(),
                choices: vec!["Pizza".into(), "Sushi".into(), "Tacos".into()],
            }))
        );
        assert_eq!(
            Command::parse(&raw("/poll | Lunch? | Pizza | Sushi")),
            Ok(Command::Poll(PollRequest {
                duration: None,
                question: "Lunch?".into(),
                choices: vec!["Pizza".into(), "Sushi".into()],
            }))
        );
        assert!(Command::parse(&raw("/poll Lunch? | Pizza")).is_err());

        assert_eq!(
            Command::parse(&raw("/config set theme dark mode")),
            Ok(Command::Config(ConfigAction::Set {
                key: "theme".into(),
                value: "dark mode".into()
            }))
        );
        assert_eq!(
            Command::parse(&raw("/config")),
            Ok(Command::Config(ConfigAction::View))
        );
        assert!(Command::parse(&raw("/config set theme")).is_err());
        assert!(Command::parse(&raw("/config delete")).is_err());

        assert_eq!(
            Command::parse(&raw("/purge 5")),
            Ok(Command::Purge { amount: 5 })
        );
        assert!(Command::parse(&raw("/purge 0")).is_err());
        assert!(Command::parse(&raw("/purge 101")).is_err());
        assert_eq!(
            Command::parse(&raw("/search devops github actions")),
            Ok(Command::Search {
                category: "devops".into(),
                term: "github actions".into()
            })
        );
        assert!(Command::parse(&raw("/search devops")).is_err());
        assert!(Command::parse(&raw(&format!("/search languages {}", "r".repeat(33)))).is_err());
        assert_eq!(
            Command::parse(&raw("/select Dynamic")),
            Ok(Command::Select(SelectMenu::Dynamic))
        );
        assert!(Command::parse(&raw("/select role")).is_err());
        assert_eq!(
            Command::parse(&raw("/frobnicate")),
            Ok(Command::Unknown("frobnicate".into()))
        );
    }

    #[test]
    fn catalog_guards() {
        let purge = find_spec("purge").unwrap();
        assert!(purge.group_only);
        assert_eq!(purge.bot_permissions, &[Permission::ManageMessages]);
        assert!(Command::Purge { amount: 1 }.needs_permissions());
        assert!(!Command::Ping.needs_permissions());
        assert!(help_text().contains("`/ping` - Ping-Pong command"));
    }

    #[tokio::test]
    async fn ping_and_echo_reply_to_the_command() {
        let (services, messenger) = services();
        let (res, _) = run(&services, "/ping", GuardScope::direct()).await;
        res.unwrap();
        let (res, _) = run(&services, "/echo --loud hey", GuardScope::direct()).await;
        res.unwrap();

        let origin = invocation(GuardScope::direct()).message;
        let calls = messenger.calls();
        assert_eq!(calls[0], Call::Reply(origin, "🏓 Pinging…".into()));
        assert!(matches!(
            &calls[1],
            Call::Edit(m, t, false)
                if m.message_id == MessageId(100)
                    && t.starts_with("Pong! 🏓 Latency: <b>")
                    && t.ends_with(" ms</b>")
        ));
        assert_eq!(calls[2], Call::Reply(origin, "Echo: HEY!!!".into()));
    }

    #[tokio::test]
    async fn purge_is_group_only_and_guarded() {
        let (services, _) = services();
        let (res, _) = run(&services, "/purge 3", GuardScope::direct()).await;
        assert_eq!(
            user_message(res),
            "❌ This command can only be used in group chats."
        );

        let scope = GuardScope::group(Some(PermissionSet::default()), Some(PermissionSet::all()));
        let (res, _) = run(&services, "/purge 3", scope).await;
        assert!(user_message(res).starts_with("❌ I don't have the required permissions"));
    }

    #[tokio::test]
    async fn purge_deletes_best_effort_and_reports() {
        let (services, messenger) = services();
        messenger.fail_delete(8);

        let (res, requester) = run(&services, "/purge 3", manager_scope()).await;
        res.unwrap();
        assert_eq!(requester.lifecycle(), Lifecycle::Replied);

        let calls = messenger.calls();
        let deleted: Vec<i32> = calls
            .iter()
            .filter_map(|c| match c {
                Call::Delete(m) => Some(m.message_id.0),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec![9, 7]);
        assert!(matches!(calls.first(), Some(Call::Reply(_, t)) if t.starts_with("⏳")));
        assert!(matches!(
            calls.last(),
            Some(Call::Edit(_, t, false)) if t == "✅ Deleted <b>2</b> messages."
        ));
    }

    #[tokio::test]
    async fn config_round_trip() {
        let (services, messenger) = services();
        let (res, _) = run(&services, "/config view", manager_scope()).await;
        assert!(user_message(res).starts_with("The configuration is empty."));

        run(&services, "/config set lang en", manager_scope()).await.0.unwrap();
        run(&services, "/config view", manager_scope()).await.0.unwrap();

        let calls = messenger.calls();
        assert!(matches!(
            &calls[0],
            Call::Reply(_, t) if t == "Configuration updated: <code>lang</code> set to <code>en</code>."
        ));
        assert!(matches!(&calls[1], Call::Reply(_, t) if t.contains("<pre>{")));
    }

    #[tokio::test]
    async fn poll_needs_manage_messages_from_the_member() {
        let (services, _) = services();
        let scope = GuardScope::group(Some(PermissionSet::all()), Some(PermissionSet::default()));
        let (res, _) = run(&services, "/poll Lunch? | Pizza | Sushi", scope).await;
        assert_eq!(
            user_message(res),
            "❌ You don't have the required permissions to do that."
        );
        assert!(services.polls.is_empty());
    }

    #[tokio::test]
    async fn poll_lifecycle_through_callbacks() {
        let (services, messenger) = services();
        let (res, _) = run(&services, "/poll 10m | Lunch? | Pizza | Sushi", manager_scope()).await;
        res.unwrap();

        let id = poll_id(invocation(manager_scope()).message);
        let poll = services.polls.get(&id).unwrap();
        assert_eq!(poll.duration, Duration::from_secs(600));
        let poll_msg = poll.message.unwrap();

        let now = invocation(manager_scope()).received_at;
        let press = |data: &str| CallbackAction::parse(data).unwrap();

        let cb = CallbackRequester::new(services.messenger.clone(), "cb1", Some(poll_msg));
        execute_callback(&services, press(&format!("poll:{id}:1")), UserId(5), now, &cb)
            .await
            .unwrap();

        let calls = messenger.calls();
        assert!(matches!(
            &calls[calls.len() - 2],
            Call::Edit(m, t, true) if *m == poll_msg && t.contains("Sushi (1 vote)")
        ));
        assert_eq!(
            calls.last(),
            Some(&Call::Answer("cb1".into(), Some("You voted for Sushi.".into())))
        );

        let cb = CallbackRequester::new(services.messenger.clone(), "cb2", Some(poll_msg));
        let err = execute_callback(&services, press(&format!("poll:{id}:7")), UserId(5), now, &cb)
            .await;
        assert_eq!(user_message(err), "❌ Invalid choice.");

        let closed = services.close_poll(&id).await.unwrap().unwrap();
        assert_eq!(closed.tally(), vec![0, 1]);
        assert!(matches!(
            messenger.calls().last(),
            Some(Call::Edit(m, t, false)) if *m == poll_msg && t.contains("This poll has ended.")
        ));

        let cb = CallbackRequester::new(services.messenger.clone(), "cb3", Some(poll_msg));
        let err = execute_callback(&services, press(&format!("poll:{id}:0")), UserId(5), now, &cb)
            .await;
        assert_eq!(user_message(err), "❌ Poll not found.");
    }

    #[tokio::test]
    async fn yes_no_vote_answers_privately() {
        let (services, messenger) = services();
        let (res, _) = run(&services, "/vote Pineapple on pizza?", GuardScope::direct()).await;
        res.unwrap();

        let cb = CallbackRequester::new(services.messenger.clone(), "cb", None);
        execute_callback(
            &services,
            CallbackAction::parse(VOTE_NO).unwrap(),
            UserId(1),
            Utc::now(),
            &cb,
        )
        .await
        .unwrap();

        let calls = messenger.calls();
        assert_eq!(calls[0], Call::Keyboard(CHAT, "Pineapple on pizza?".into()));
        assert_eq!(
            calls[1],
            Call::Answer("cb".into(), Some("You voted No 👎".into()))
        );
        assert_eq!(CallbackAction::parse("whatever"), None);
    }

    #[tokio::test]
    async fn search_reports_hits_and_misses() {
        let (services, messenger) = services();
        run(&services, "/search languages ru", GuardScope::direct())
            .await
            .0
            .unwrap();
        assert!(matches!(
            &messenger.calls()[0],
            Call::Reply(_, t) if t == "🔍 Results for <code>ru</code> in category <code>languages</code>: Ruby, Rust"
        ));

        let (res, _) = run(&services, "/search database oracle", GuardScope::direct()).await;
        assert_eq!(
            user_message(res),
            "❌ No results found for `oracle` in category `database`."
        );
    }

    #[tokio::test]
    async fn whatis_describes_the_replied_to_user() {
        let (services, messenger) = services();
        let (res, _) = run(&services, "/whatis", GuardScope::direct()).await;
        assert!(user_message(res).contains("Reply to someone's message"));

        let inv = Invocation {
            reply_to: Some(UserProfile {
                id: UserId(7),
                name: "Eve".into(),
                username: Some("eve".into()),
                is_bot: true,
            }),
            ..invocation(GuardScope::direct())
        };
        run_with(&services, "/whatis", inv).await.0.unwrap();
        assert!(matches!(
            &messenger.calls()[0],
            Call::Reply(_, t) if t == "👤 <b>User: Eve</b>\n\nID: <code>7</code>\nUsername: @eve\nBot: Yes"
        ));
    }

    #[tokio::test]
    async fn upload_requires_an_image() {
        let (services, messenger) = services();
        let (res, _) = run(&services, "/upload", GuardScope::direct()).await;
        assert_eq!(user_message(res), "❌ Please upload a valid image file.");

        let pdf = Attachment {
            file_name: Some("notes.pdf".into()),
            mime_type: Some("application/pdf".into()),
            size: 2048,
            dimensions: None,
        };
        let inv = Invocation {
            attachment: Some(pdf.clone()),
            ..invocation(GuardScope::direct())
        };
        let (res, _) = run_with(&services, "/upload", inv).await;
        assert_eq!(user_message(res), "❌ Please upload a valid image file.");

        let photo = Attachment {
            file_name: None,
            mime_type: Some("image/jpeg".into()),
            size: 1536,
            dimensions: Some((1280, 720)),
        };
        let inv = Invocation {
            attachment: Some(photo),
            ..invocation(GuardScope::direct())
        };
        run_with(&services, "/upload", inv).await.0.unwrap();
        let calls = messenger.calls();
        let Call::Reply(_, text) = &calls[0] else {
            panic!("expected a reply, got {calls:?}");
        };
        assert!(text.contains("File Name: Unknown\nFile Size: 1.50 KB\nFile Type: image/jpeg"));
        assert!(text.contains("Dimensions: 1280x720"));
        assert!(text.ends_with("Uploaded by Dana"));
    }

    #[tokio::test]
    async fn feedback_opens_a_prompt_for_the_invoker() {
        let (services, messenger) = services();
        run(&services, "/feedback", GuardScope::direct())
            .await
            .0
            .unwrap();

        let origin = invocation(GuardScope::direct()).message;
        let calls = messenger.calls();
        assert!(matches!(&calls[0], Call::Prompt(m, t) if *m == origin && t.contains("Feedback Form")));

        let prompt = MessageRef {
            chat_id: CHAT,
            message_id: MessageId(100),
        };
        assert_eq!(services.feedback.owner(prompt), Some(UserId(42)));
    }

    #[tokio::test]
    async fn select_menus_announce_the_choice() {
        let (services, messenger) = services();
        run(&services, "/select string", GuardScope::direct())
            .await
            .0
            .unwrap();
        assert_eq!(
            messenger.calls()[0],
            Call::Keyboard(CHAT, "Select a string from the menu below:".into())
        );

        let menu = MessageRef {
            chat_id: CHAT,
            message_id: MessageId(100),
        };
        let cb = CallbackRequester::new(services.messenger.clone(), "cb", Some(menu));
        let action = CallbackAction::parse("select:string:option_3").unwrap();
        execute_callback(&services, action, UserId(1), Utc::now(), &cb)
            .await
            .unwrap();

        let cb = CallbackRequester::new(services.messenger.clone(), "cb2", Some(menu));
        let action = CallbackAction::parse("select:color:Blue").unwrap();
        execute_callback(&services, action, UserId(1), Utc::now(), &cb)
            .await
            .unwrap();

        let calls = messenger.calls();
        assert_eq!(
            calls[1..],
            [
                Call::Answer("cb".into(), None),
                Call::Reply(menu, "Your selection:\n- option_3".into()),
                Call::Answer("cb2".into(), None),
                Call::Reply(menu, "color = Blue".into()),
            ]
        );
        assert_eq!(CallbackAction::parse("select:color:"), None);
    }
}
