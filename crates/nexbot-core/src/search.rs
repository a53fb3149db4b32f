//! `/search` over a small built-in catalog of technologies.

use crate::interaction::error::InteractionError;

pub const TERM_MAX_CHARS: usize = 32;

pub const DATASET: &[(&str, &[&str])] = &[
    ("frontend", &["React", "Vue", "Angular", "Svelte", "Ember"]),
    ("backend", &["Node.js", "Django", "Flask", "Spring", "Rails"]),
    ("database", &["PostgreSQL", "MySQL", "MongoDB", "Redis", "SQLite"]),
    (
        "devops",
        &["Docker", "Kubernetes", "Jenkins", "GitHub Actions", "Travis CI"],
    ),
    (
        "languages",
        &["JavaScript", "Python", "Java", "C#", "Ruby", "Go", "Rust"],
    ),
];

pub fn categories() -> impl Iterator<Item = &'static str> {
    DATASET.iter().map(|(name, _)| *name)
}

/// Case-insensitive substring match within one category.
pub fn search(category: &str, term: &str) -> Result<Vec<&'static str>, InteractionError> {
    let needle = term.to_lowercase();
    let hits: Vec<&'static str> = DATASET
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, items)| {
            items
                .iter()
                .copied()
                .filter(|item| item.to_lowercase().contains(&needle))
                .collect()
        })
        .unwrap_or_default();

    if hits.is_empty() {
        return Err(InteractionError::new(format!(
            "❌ No results found for `{term}` in category `{category}`."
        )));
    }
    Ok(hits)
}

pub fn render_results(category: &str, term: &str, hits: &[&str]) -> String {
    format!(
        "🔍 Results for `{term}` in category `{category}`: {}",
        hits.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignore_case() {
        assert_eq!(search("languages", "JA").unwrap(), vec!["JavaScript", "Java"]);
        assert_eq!(search("DevOps", "actions").unwrap(), vec!["GitHub Actions"]);
    }

    #[test]
    fn misses_and_unknown_categories_are_user_errors() {
        let err = search("database", "oracle").unwrap_err();
        assert_eq!(
            err.user_message(),
            "❌ No results found for `oracle` in category `database`."
        );
        assert!(search("cooking", "pasta").is_err());
    }

    #[test]
    fn results_line() {
        assert_eq!(
            render_results("frontend", "v", &["Vue", "Svelte"]),
            "🔍 Results for `v` in category `frontend`: Vue, Svelte"
        );
        assert_eq!(categories().count(), 5);
    }
}
