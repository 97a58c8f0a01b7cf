//! Built-in copy-editing transforms
//!
//! An explicit catalogue of text -> text transforms that can be selected by
//! name from configuration or the CLI. Each one is a plain function; the
//! catalogue wraps them as [`Transform`] values.

use super::chain::Transform;
use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const CORRECT_A_AN: &str = "correct_a_an";
pub const REPLACE_ABSENT_THE: &str = "replace_absent_the";
pub const REPLACE_ABU_DHABI_EXPAND: &str = "replace_abu_dhabi_expand";

/// (name, description) for every built-in transform, in catalogue order
pub const BUILTIN_TRANSFORMS: &[(&str, &str)] = &[
    (CORRECT_A_AN, "Correct 'a' vs 'an' before the following word."),
    (
        REPLACE_ABSENT_THE,
        "Replace 'absent the' with 'without the', keeping initial capitalization.",
    ),
    (
        REPLACE_ABU_DHABI_EXPAND,
        "Replace 'Abu Dhabi' with 'Abu Dhabi Sovereign'.",
    ),
];

// Article plus its trailing whitespace; the next word is peeked, not consumed,
// so back-to-back articles are each corrected.
static ARTICLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?i:(an?))(\s+)").expect("article regex is valid"));

static LEADING_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w[\w'’-]*").expect("leading-word regex is valid"));

static ABSENT_THE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\babsent the\b").expect("absent-the regex is valid"));

static ABU_DHABI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAbu\s+Dhabi\b").expect("abu-dhabi regex is valid"));

// Words whose spelling and initial sound disagree (compared lowercase)
const VOWEL_SOUND_EXCEPTIONS: &[&str] = &[
    "honest", "hour", "heir", "mba", "fbi", "mri", "sos", "honour", "heirloom", "hourglass",
    "honestly", "honorary", "honorable", "honouring", "heirship", "herb", "herbal", "herbs",
    "honesty", "honours", "honored", "honor",
];

const CONSONANT_SOUND_EXCEPTIONS: &[&str] = &[
    "university", "unicorn", "euro", "one", "use", "user", "ubiquity", "unilateral", "unison",
    "united", "uniform", "unique", "unit", "union", "universe", "eulogy", "euphemism",
    "euphoria", "eucalyptus", "eugenics", "euphonium", "eureka", "european", "eurovision",
];

// Letters whose spoken name starts with a vowel sound (eff, aitch, ell, ...)
const ACRONYM_VOWEL_INITIALS: &str = "AEFHILMNORSX";

fn starts_with_vowel_sound(word: &str) -> bool {
    let Some(first) = word.chars().next() else {
        return false;
    };
    let lower = word.to_lowercase();

    if VOWEL_SOUND_EXCEPTIONS.contains(&lower.as_str()) {
        return true;
    }
    if CONSONANT_SOUND_EXCEPTIONS.contains(&lower.as_str()) {
        return false;
    }

    let is_acronym = word.chars().all(char::is_alphabetic)
        && word.chars().any(char::is_uppercase)
        && !word.chars().any(char::is_lowercase);
    if is_acronym {
        return ACRONYM_VOWEL_INITIALS.contains(first);
    }

    lower.starts_with(['a', 'e', 'i', 'o', 'u'])
}

fn choose_article(next_word: &str, original_article: &str) -> &'static str {
    let vowel = starts_with_vowel_sound(next_word);
    let capitalized = original_article
        .chars()
        .next()
        .is_some_and(char::is_uppercase);
    match (vowel, capitalized) {
        (true, true) => "An",
        (true, false) => "an",
        (false, true) => "A",
        (false, false) => "a",
    }
}

/// Pick "a" or "an" for every article followed by a word, keeping the
/// article's capitalization and the original spacing.
pub fn correct_a_an(text: &str) -> String {
    ARTICLE_REGEX
        .replace_all(text, |caps: &Captures| {
            let rest = caps.get(0).map_or("", |m| &text[m.end()..]);
            match LEADING_WORD_REGEX.find(rest) {
                Some(next_word) => {
                    format!("{}{}", choose_article(next_word.as_str(), &caps[1]), &caps[2])
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Replace "absent the" with "without the", case-insensitively, keeping a
/// sentence-initial capital.
pub fn replace_absent_the(text: &str) -> String {
    ABSENT_THE_REGEX
        .replace_all(text, |caps: &Captures| {
            if caps[0].starts_with(char::is_uppercase) {
                "Without the"
            } else {
                "without the"
            }
        })
        .into_owned()
}

/// Replace "Abu Dhabi" with "Abu Dhabi Sovereign", lowercased when the match
/// starts lowercase.
pub fn replace_abu_dhabi_expand(text: &str) -> String {
    ABU_DHABI_REGEX
        .replace_all(text, |caps: &Captures| {
            if caps[0].starts_with(char::is_uppercase) {
                "Abu Dhabi Sovereign"
            } else {
                "abu dhabi sovereign"
            }
        })
        .into_owned()
}

/// Look up one built-in transform by name
pub fn builtin_transform(name: &str) -> Option<Transform> {
    let func: fn(&str) -> String = match name {
        CORRECT_A_AN => correct_a_an,
        REPLACE_ABSENT_THE => replace_absent_the,
        REPLACE_ABU_DHABI_EXPAND => replace_abu_dhabi_expand,
        _ => return None,
    };
    let description = BUILTIN_TRANSFORMS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| *d)
        .unwrap_or_default();
    Some(Transform::immediate(name, func).with_description(description))
}

/// The full catalogue in catalogue order
pub fn builtin_transforms() -> Vec<Transform> {
    BUILTIN_TRANSFORMS
        .iter()
        .filter_map(|(name, _)| builtin_transform(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_a_an_basic() {
        assert_eq!(correct_a_an("a apple and an banana"), "an apple and a banana");
    }

    #[test]
    fn test_correct_a_an_exceptions() {
        assert_eq!(correct_a_an("a honest man"), "an honest man");
        assert_eq!(correct_a_an("an university"), "a university");
        assert_eq!(correct_a_an("She holds a MBA"), "She holds an MBA");
        assert_eq!(correct_a_an("a FBI agent"), "an FBI agent");
        assert_eq!(correct_a_an("an NASA probe"), "an NASA probe");
        assert_eq!(correct_a_an("an KPI"), "a KPI");
    }

    #[test]
    fn test_correct_a_an_preserves_case_and_spacing() {
        assert_eq!(correct_a_an("A  owl.\nAn tree"), "An  owl.\nA tree");
    }

    #[test]
    fn test_correct_a_an_ignores_words_containing_a() {
        assert_eq!(correct_a_an("banana apple"), "banana apple");
        assert_eq!(correct_a_an("plan a."), "plan a.");
    }

    #[test]
    fn test_correct_a_an_back_to_back_articles() {
        assert_eq!(correct_a_an("a a apple"), "an an apple");
        assert_eq!(correct_a_an("an a"), "an a");
        assert_eq!(correct_a_an("ends with a "), "ends with a ");
    }

    #[test]
    fn test_replace_absent_the() {
        assert_eq!(
            replace_absent_the("Absent the data, we wait; absent the team, we stop."),
            "Without the data, we wait; without the team, we stop."
        );
        assert_eq!(replace_absent_the("absentthe"), "absentthe");
    }

    #[test]
    fn test_replace_abu_dhabi_expand() {
        assert_eq!(
            replace_abu_dhabi_expand("Abu  Dhabi and abu dhabi"),
            "Abu Dhabi Sovereign and abu dhabi sovereign"
        );
    }

    #[test]
    fn test_catalogue_lookup() {
        let names: Vec<String> = builtin_transforms()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![CORRECT_A_AN, REPLACE_ABSENT_THE, REPLACE_ABU_DHABI_EXPAND]
        );
        assert!(builtin_transform("no_such_transform").is_none());
        assert!(!builtin_transform(CORRECT_A_AN)
            .unwrap()
            .description()
            .is_empty());
    }
}
