//! Message text helpers.
//!
//! Handlers write a tiny markdown subset (`**bold**`, `` `code` ``, fenced blocks); the
//! Telegram adapter sends HTML, and callback answers take plain text.

/// Escape HTML special characters for Telegram.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Convert the markdown subset to Telegram-compatible HTML.
pub fn markdown_to_html(input: &str) -> String {
    render(input, Target::Html)
}

/// Drop the markdown markers, keeping the text.
pub fn strip_markdown(input: &str) -> String {
    render(input, Target::Plain)
}

/// Cut to `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Html,
    Plain,
}

fn render(input: &str, target: Target) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while !rest.is_empty() {
        if let Some((body, after)) = delimited(rest, "```") {
            let body = strip_fence_language(body).trim_matches('\n');
            wrap(&mut out, target, "pre", body);
            rest = after;
            continue;
        }
        if let Some((body, after)) = delimited(rest, "`") {
            wrap(&mut out, target, "code", body);
            rest = after;
            continue;
        }
        if let Some((body, after)) = delimited(rest, "**") {
            wrap(&mut out, target, "b", body);
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        let Some(ch) = chars.next() else {
            break;
        };
        match target {
            Target::Html => out.push_str(&escape_html(ch.encode_utf8(&mut [0; 4]))),
            Target::Plain => out.push(ch),
        }
        rest = chars.as_str();
    }

    out
}

/// `marker body marker rest` -> `(body, rest)`; unterminated or empty spans don't count.
fn delimited<'a>(s: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let after = s.strip_prefix(marker)?;
    let end = after.find(marker)?;
    if end == 0 {
        return None;
    }
    Some((&after[..end], &after[end + marker.len()..]))
}

fn strip_fence_language(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest))
            if !first.is_empty() && first.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => body,
    }
}

fn wrap(out: &mut String, target: Target, tag: &str, body: &str) {
    match target {
        Target::Html => {
            out.push_str(&format!("<{tag}>{}</{tag}>", escape_html(body)));
        }
        Target::Plain => out.push_str(body),
    }
}
