//! Title similarity scoring used to pick the best metadata match.
//!
//! Scores are Sørensen–Dice coefficients over character bigrams, compared
//! case-insensitively. An entity's score against a text is the best score
//! of any of its title variants.

use std::collections::HashMap;

use anilib_db::models::{Anime, AnimeTitle};

use super::provider::AnimeCandidate;

/// Anything carrying provider title variants.
pub trait Titled {
    fn title(&self) -> &AnimeTitle;
}

impl Titled for Anime {
    fn title(&self) -> &AnimeTitle {
        &self.title
    }
}

impl Titled for AnimeCandidate {
    fn title(&self) -> &AnimeTitle {
        &self.title
    }
}

/// An item paired with its similarity to the query text.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64,
}

/// Dice coefficient of two strings over character bigrams, in `[0, 1]`.
///
/// Strings shorter than two characters score 0.
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut matches = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    (2 * matches) as f64 / (a.len() + b.len() - 2) as f64
}

/// Best score of any present title variant; 0 when none is present.
pub fn title_similarity(title: &AnimeTitle, text: &str) -> f64 {
    title
        .variants()
        .map(|variant| dice_coefficient(text, variant))
        .fold(0.0, f64::max)
}

/// Score every item and order them by descending similarity.
///
/// The sort is stable: equal scores keep their input order.
pub fn rank_by_similarity<T: Titled>(items: Vec<T>, text: &str) -> Vec<Scored<T>> {
    let mut scored: Vec<Scored<T>> = items
        .into_iter()
        .map(|item| {
            let score = title_similarity(item.title(), text);
            Scored { item, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// The item whose title best matches `text`, or `None` for no items.
pub fn most_similar<T: Titled>(items: Vec<T>, text: &str) -> Option<Scored<T>> {
    rank_by_similarity(items, text).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::provider::FuzzyDate;
    use anilib_common::{AnimeFormat, AnimeStatus};

    fn candidate(id: i64, romaji: Option<&str>, english: Option<&str>) -> AnimeCandidate {
        AnimeCandidate {
            external_id: id,
            title: AnimeTitle {
                romaji: romaji.map(String::from),
                english: english.map(String::from),
                native: None,
            },
            cover_url: None,
            description: None,
            episodes: None,
            start_date: FuzzyDate::default(),
            status: AnimeStatus::Unknown,
            genres: Vec::new(),
            format: AnimeFormat::Tv,
        }
    }

    #[test]
    fn dice_identical_is_one() {
        assert_eq!(dice_coefficient("Cowboy Bebop", "Cowboy Bebop"), 1.0);
        assert_eq!(dice_coefficient("ab", "ab"), 1.0);
    }

    #[test]
    fn dice_is_case_insensitive() {
        assert_eq!(dice_coefficient("NARUTO", "naruto"), 1.0);
    }

    #[test]
    fn dice_short_strings_score_zero() {
        assert_eq!(dice_coefficient("a", "a"), 0.0);
        assert_eq!(dice_coefficient("", "naruto"), 0.0);
    }

    #[test]
    fn dice_known_value() {
        // night/nacht share only "ht": 2 * 1 / (5 + 5 - 2)
        assert!((dice_coefficient("night", "nacht") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn dice_handles_multibyte_titles() {
        assert_eq!(dice_coefficient("カウボーイビバップ", "カウボーイビバップ"), 1.0);
        assert!(dice_coefficient("進撃の巨人", "進撃の巨人 Season 2") > 0.4);
    }

    #[test]
    fn absent_variants_score_zero() {
        let title = AnimeTitle::default();
        assert_eq!(title_similarity(&title, "Naruto"), 0.0);
    }

    #[test]
    fn best_variant_wins() {
        let c = candidate(1, Some("Shingeki no Kyojin"), Some("Attack on Titan"));
        assert_eq!(title_similarity(&c.title, "attack on titan"), 1.0);
    }

    #[test]
    fn exact_title_beats_longer_title() {
        let candidates = vec![
            candidate(1, Some("Naruto Shippuden"), None),
            candidate(2, Some("Naruto"), None),
        ];
        let best = most_similar(candidates, "Naruto").unwrap();
        assert_eq!(best.item.external_id, 2);
        assert_eq!(best.score, 1.0);
    }

    #[test]
    fn ties_keep_input_order() {
        let candidates = vec![
            candidate(1, Some("Alpha"), None),
            candidate(2, Some("Alpha"), None),
            candidate(3, Some("Alpha"), None),
        ];
        let ranked = rank_by_similarity(candidates, "Alpha");
        let ids: Vec<i64> = ranked.iter().map(|s| s.item.external_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn empty_text_returns_first_candidate() {
        let candidates = vec![candidate(7, Some("Bleach"), None), candidate(8, Some("One Piece"), None)];
        let best = most_similar(candidates, "").unwrap();
        assert_eq!(best.item.external_id, 7);
        assert_eq!(best.score, 0.0);
    }

    #[test]
    fn no_candidates_returns_none() {
        assert!(most_similar(Vec::<AnimeCandidate>::new(), "Naruto").is_none());
    }
}
