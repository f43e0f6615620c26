//! Search text and display titles derived from folder and file names, and
//! episode display ordering.

use std::sync::OnceLock;

use anilib_db::models::Episode;
use regex::Regex;

fn square_brackets() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]").unwrap())
}

fn braces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^}]*\}").unwrap())
}

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap())
}

fn digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Metadata search text for an anime folder name: `[...]` release tags
/// removed, whitespace collapsed.
///
/// ```
/// use anilib::scanner::title::folder_search_text;
///
/// assert_eq!(folder_search_text("[Judas] Cowboy Bebop [BD 1080p]"), "Cowboy Bebop");
/// ```
pub fn folder_search_text(folder_name: &str) -> String {
    let stripped = square_brackets().replace_all(folder_name, " ");
    whitespace().replace_all(&stripped, " ").trim().to_string()
}

/// Display title for an episode file stem.
///
/// `[...]` and `{...}` annotations are removed, and every run of characters
/// that are neither letters nor digits becomes one space. Text inside
/// `(...)` is kept, only the parentheses go, so a resolution or year in
/// parentheses stays part of the title.
///
/// ```
/// use anilib::scanner::title::episode_title;
///
/// assert_eq!(
///     episode_title("[SubsPlease] Show Name - 01 (1080p) [ABCD1234]"),
///     "Show Name 01 1080p"
/// );
/// ```
pub fn episode_title(file_stem: &str) -> String {
    let stripped = square_brackets().replace_all(file_stem, " ");
    let stripped = braces().replace_all(&stripped, " ");
    non_alphanumeric()
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Sum of every decimal number in `title`.
pub fn numeric_sum(title: &str) -> u64 {
    digits()
        .find_iter(title)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .fold(0u64, u64::saturating_add)
}

/// Order episodes for display by the sum of the numbers in their titles.
///
/// Equal sums keep their current relative order.
pub fn sort_by_numeric_sum(episodes: &mut [Episode]) {
    episodes.sort_by_cached_key(|e| numeric_sum(&e.title));
}
