//! Button polls: an owned store plus the pure rendering/validation helpers.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    domain::{MessageRef, UserId},
    interaction::error::InteractionError,
    messaging::types::{InlineButton, InlineKeyboard},
};

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 5;
pub const MIN_DURATION: Duration = Duration::from_secs(10);
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const CALLBACK_PREFIX: &str = "poll:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub choices: Vec<String>,
    pub duration: Duration,
    pub ends_at: DateTime<Utc>,
    /// One vote per user; voting again replaces the earlier choice.
    pub votes: BTreeMap<UserId, usize>,
    pub message: Option<MessageRef>,
}

impl Poll {
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at < now
    }

    pub fn tally(&self) -> Vec<usize> {
        let mut counts = vec![0; self.choices.len()];
        for &idx in self.votes.values() {
            if let Some(c) = counts.get_mut(idx) {
                *c += 1;
            }
        }
        counts
    }

    /// Indexes of the choices with the most votes (all of them when nobody voted).
    pub fn winners(&self) -> Vec<usize> {
        let counts = self.tally();
        let max = counts.iter().copied().max().unwrap_or(0);
        counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == max)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn summary(&self, now: DateTime<Utc>) -> PollSummary {
        let tally = self.tally();
        PollSummary {
            id: self.id.clone(),
            question: self.question.clone(),
            choices: self
                .choices
                .iter()
                .zip(tally)
                .map(|(label, votes)| ChoiceSummary {
                    label: label.clone(),
                    votes,
                })
                .collect(),
            ends_at: self.ends_at.to_rfc3339(),
            closed: self.is_closed_at(now),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub id: String,
    pub question: String,
    pub choices: Vec<ChoiceSummary>,
    pub ends_at: String,
    pub closed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChoiceSummary {
    pub label: String,
    pub votes: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub choice: String,
    /// False when the user picked the same choice again.
    pub changed: bool,
    pub poll: Poll,
}

/// Polls that are still running. Owned by the bot's services; polls leave on close.
#[derive(Debug, Default)]
pub struct PollStore {
    polls: Mutex<HashMap<String, Poll>>,
}

impl PollStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        id: impl Into<String>,
        question: &str,
        choices: Vec<String>,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<Poll, InteractionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(InteractionError::new("❌ The poll needs a question."));
        }
        let choices: Vec<String> = choices
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if choices.len() < MIN_CHOICES || choices.len() > MAX_CHOICES {
            return Err(InteractionError::new(format!(
                "❌ A poll needs between {MIN_CHOICES} and {MAX_CHOICES} choices."
            )));
        }
        let ends_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| InteractionError::new("❌ Duration must be between 10 seconds and 7 days."))?;

        let poll = Poll {
            id: id.into(),
            question: question.to_string(),
            choices,
            duration,
            ends_at,
            votes: BTreeMap::new(),
            message: None,
        };
        self.lock().insert(poll.id.clone(), poll.clone());
        Ok(poll)
    }

    pub fn attach_message(&self, id: &str, message: MessageRef) {
        if let Some(p) = self.lock().get_mut(id) {
            p.message = Some(message);
        }
    }

    pub fn vote(
        &self,
        id: &str,
        user: UserId,
        raw_choice: &str,
        now: DateTime<Utc>,
    ) -> Result<VoteReceipt, InteractionError> {
        let choice_index: usize = raw_choice
            .trim()
            .parse()
            .map_err(|_| InteractionError::new("❌ Invalid choice index."))?;

        let mut polls = self.lock();
        let poll = polls
            .get_mut(id)
            .ok_or_else(|| InteractionError::new("❌ Poll not found."))?;
        if poll.is_closed_at(now) {
            return Err(InteractionError::new("❌ Poll is closed."));
        }
        let choice = poll
            .choices
            .get(choice_index)
            .cloned()
            .ok_or_else(|| InteractionError::new("❌ Invalid choice."))?;

        let previous = poll.votes.insert(user, choice_index);
        Ok(VoteReceipt {
            choice,
            changed: previous != Some(choice_index),
            poll: poll.clone(),
        })
    }

    pub fn get(&self, id: &str) -> Option<Poll> {
        self.lock().get(id).cloned()
    }

    /// Remove the poll, returning its final state.
    pub fn close(&self, id: &str) -> Option<Poll> {
        self.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Poll>> {
        self.polls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse a human duration: `10s`, `10m`, `1.5h`, `2 days`, `1w`. A bare number is milliseconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() || s.len() > 100 {
        return None;
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let value: f64 = number.parse().ok()?;

    let unit_ms: f64 = match unit.trim() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        "w" | "week" | "weeks" => 604_800_000.0,
        _ => return None,
    };

    let ms = (value * unit_ms).round();
    if !ms.is_finite() || ms <= 0.0 {
        return None;
    }
    Some(Duration::from_millis(ms as u64))
}

/// Resolve the user's duration (or the default) and enforce the allowed range.
pub fn poll_duration(raw: Option<&str>, default: Duration) -> Result<Duration, InteractionError> {
    let duration = match raw {
        Some(r) if !r.trim().is_empty() => parse_duration(r).ok_or_else(|| {
            InteractionError::new("❌ Invalid duration format. Use formats like '10m', '1h', '1d'.")
                .with_internal(format!("unparseable poll duration {r:?}"))
        })?,
        _ => default,
    };
    if duration < MIN_DURATION || duration > MAX_DURATION {
        return Err(InteractionError::new(
            "❌ Duration must be between 10 seconds and 7 days.",
        ));
    }
    Ok(duration)
}

/// Long form, largest unit, rounded: "1 minute", "2 hours".
pub fn humanize(d: Duration) -> String {
    const UNITS: [(u128, &str); 5] = [
        (604_800_000, "week"),
        (86_400_000, "day"),
        (3_600_000, "hour"),
        (60_000, "minute"),
        (1_000, "second"),
    ];
    let ms = d.as_millis();
    for (unit_ms, name) in UNITS {
        if ms >= unit_ms {
            let n = (ms as f64 / unit_ms as f64).round() as u64;
            let plural = if n == 1 { "" } else { "s" };
            return format!("{n} {name}{plural}");
        }
    }
    format!("{ms} ms")
}

pub fn describe(poll: &Poll, show_winner: bool) -> String {
    let tally = poll.tally();
    let winners = poll.winners();
    let icon = if winners.len() > 1 { " ⚖️" } else { " 🏆" };

    poll.choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let votes = tally[i];
            let plural = if votes == 1 { "" } else { "s" };
            let suffix = if show_winner && winners.contains(&i) {
                icon
            } else {
                ""
            };
            format!("**{}**. {choice} ({votes} vote{plural}){suffix}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message body for a running poll.
pub fn render_open(poll: &Poll) -> String {
    format!(
        "📊 **{}**\n\n{}\n\nPoll ends in {}",
        poll.question,
        describe(poll, false),
        humanize(poll.duration)
    )
}

/// Message body once voting is over.
pub fn render_closed(poll: &Poll) -> String {
    format!(
        "📊 **{}**\n\n{}\n\nThis poll has ended.",
        poll.question,
        describe(poll, true)
    )
}

pub fn keyboard(poll: &Poll) -> InlineKeyboard {
    InlineKeyboard::one_per_row(
        poll.choices
            .iter()
            .enumerate()
            .map(|(i, c)| InlineButton::new(c.clone(), format!("{CALLBACK_PREFIX}{}:{i}", poll.id)))
            .collect(),
        30,
    )
}

/// `poll:<id>:<choice>` -> `(id, raw choice)`.
pub fn parse_callback(data: &str) -> Option<(&str, &str)> {
    let rest = data.strip_prefix(CALLBACK_PREFIX)?;
    let (id, choice) = rest.rsplit_once(':')?;
    if id.is_empty() {
        return None;
    }
    Some((id, choice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn store_with_poll() -> PollStore {
        let store = PollStore::new();
        store
            .create(
                "-100_42",
                "Lunch?",
                vec!["Pizza".into(), "Sushi".into(), " ".into(), "Tacos".into()],
                Duration::from_secs(60),
                t0(),
            )
            .unwrap();
        store
    }

    #[test]
    fn durations_parse_like_ms() {
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("2 days"), Some(Duration::from_secs(172_800)));
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1500"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("10 S"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5 fortnights"), None);
        assert_eq!(parse_duration("0s"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn duration_range_is_enforced() {
        let default = Duration::from_secs(60);
        assert_eq!(poll_duration(None, default), Ok(default));
        assert_eq!(poll_duration(Some("  "), default), Ok(default));
        assert_eq!(
            poll_duration(Some("5s"), default).unwrap_err().user_message(),
            "❌ Duration must be between 10 seconds and 7 days."
        );
        assert!(poll_duration(Some("8d"), default).is_err());
        assert!(poll_duration(Some("7d"), default).is_ok());
        assert_eq!(
            poll_duration(Some("later"), default).unwrap_err().user_message(),
            "❌ Invalid duration format. Use formats like '10m', '1h', '1d'."
        );
    }

    #[test]
    fn create_validates_choices() {
        let store = PollStore::new();
        let err = store
            .create("p", "Q?", vec!["only".into()], Duration::from_secs(60), t0())
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "❌ A poll needs between 2 and 5 choices."
        );

        let poll = store_with_poll().get("-100_42").unwrap();
        assert_eq!(poll.choices, vec!["Pizza", "Sushi", "Tacos"]);
        assert_eq!(poll.ends_at, t0() + chrono::Duration::seconds(60));
    }

    #[test]
    fn votes_are_validated_in_order() {
        let store = store_with_poll();
        let u = UserId(1);

        let msg = |r: Result<VoteReceipt, InteractionError>| r.unwrap_err().user_message().to_string();
        assert_eq!(msg(store.vote("-100_42", u, "x", t0())), "❌ Invalid choice index.");
        assert_eq!(msg(store.vote("nope", u, "0", t0())), "❌ Poll not found.");
        assert_eq!(
            msg(store.vote("-100_42", u, "0", t0() + chrono::Duration::seconds(61))),
            "❌ Poll is closed."
        );
        assert_eq!(msg(store.vote("-100_42", u, "3", t0())), "❌ Invalid choice.");
    }

    #[test]
    fn revoting_replaces_the_previous_choice() {
        let store = store_with_poll();
        store.vote("-100_42", UserId(1), "0", t0()).unwrap();
        store.vote("-100_42", UserId(2), "0", t0()).unwrap();
        let receipt = store.vote("-100_42", UserId(1), "2", t0()).unwrap();

        assert_eq!(receipt.choice, "Tacos");
        assert!(receipt.changed);
        assert_eq!(receipt.poll.tally(), vec![1, 0, 1]);

        let again = store.vote("-100_42", UserId(1), "2", t0()).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn describe_marks_winners_and_ties() {
        let store = store_with_poll();
        store.vote("-100_42", UserId(1), "1", t0()).unwrap();
        let poll = store.get("-100_42").unwrap();
        assert_eq!(
            describe(&poll, true),
            "**1**. Pizza (0 votes)\n**2**. Sushi (1 vote) 🏆\n**3**. Tacos (0 votes)"
        );

        store.vote("-100_42", UserId(2), "2", t0()).unwrap();
        let poll = store.get("-100_42").unwrap();
        assert!(describe(&poll, true).contains("Sushi (1 vote) ⚖️"));
        assert!(describe(&poll, true).contains("Tacos (1 vote) ⚖️"));
        assert!(!describe(&poll, false).contains('⚖'));
    }

    #[test]
    fn rendering_open_and_closed() {
        let store = store_with_poll();
        store.vote("-100_42", UserId(1), "0", t0()).unwrap();
        let poll = store.get("-100_42").unwrap();
        assert_eq!(
            render_open(&poll),
            "📊 **Lunch?**\n\n**1**. Pizza (1 vote)\n**2**. Sushi (0 votes)\n**3**. Tacos (0 votes)\n\nPoll ends in 1 minute"
        );
        assert!(render_closed(&poll).ends_with("Pizza (1 vote) 🏆\n**2**. Sushi (0 votes)\n**3**. Tacos (0 votes)\n\nThis poll has ended."));
    }

    #[test]
    fn close_removes_poll() {
        let store = store_with_poll();
        assert!(store.close("-100_42").is_some());
        assert!(store.close("-100_42").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn callback_data_round_trips_negative_chat_ids() {
        let poll = store_with_poll().get("-100_42").unwrap();
        let kb = keyboard(&poll);
        assert_eq!(kb.rows.len(), 3);
        let data = &kb.rows[2][0].callback_data;
        assert_eq!(data, "poll:-100_42:2");
        assert_eq!(parse_callback(data), Some(("-100_42", "2")));
        assert_eq!(parse_callback("vote:yes"), None);
        assert_eq!(parse_callback("poll::1"), None);
    }

    #[test]
    fn humanize_uses_largest_unit() {
        assert_eq!(humanize(Duration::from_secs(60)), "1 minute");
        assert_eq!(humanize(Duration::from_secs(90)), "2 minutes");
        assert_eq!(humanize(Duration::from_secs(7 * 86_400)), "1 week");
        assert_eq!(humanize(Duration::from_secs(10)), "10 seconds");
    }

    #[test]
    fn summary_reports_tally_and_state() {
        let store = store_with_poll();
        store.vote("-100_42", UserId(9), "0", t0()).unwrap();
        let s = store.get("-100_42").unwrap().summary(t0());
        assert_eq!(s.choices[0], ChoiceSummary { label: "Pizza".into(), votes: 1 });
        assert!(!s.closed);
        assert_eq!(s.ends_at, "2026-01-01T12:01:00+00:00");
    }
}
