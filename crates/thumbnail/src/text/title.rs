//! Turning identifier-style game names into readable titles.

use std::sync::LazyLock;

use regex::Regex;

static LETTER_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z])(\d)").expect("valid regex"));
static DIGIT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)([A-Za-z])").expect("valid regex"));
static LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));
static ACRONYM_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]{2,})([A-Z][a-z])").expect("valid regex"));
static WORD_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]+)([A-Z])").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Insert spaces at word boundaries hidden in a game identifier.
///
/// `15DragonCoins` becomes `15 Dragon Coins`, `VIPAutoRoulette` becomes
/// `VIP Auto Roulette`. Underscores separate words. In `CODE_Studio_game`
/// names, where an all-caps provider code leads, the studio segment is kept
/// as written, so `MGS_RedRake_getTheCoins` becomes `MGS RedRake get The Coins`.
pub fn split_title(raw: &str) -> String {
    let segments: Vec<&str> = raw.split('_').map(str::trim).filter(|s| !s.is_empty()).collect();
    let studio_after_code = segments.len() > 2 && is_provider_code(segments[0]);
    let words: Vec<String> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if studio_after_code && i == 1 { segment.to_string() } else { split_segment(segment) }
        })
        .collect();
    WHITESPACE.replace_all(words.join(" ").trim(), " ").into_owned()
}

/// `MGS`, `NE2`: short all-caps codes with at least one letter.
fn is_provider_code(segment: &str) -> bool {
    segment.len() >= 2
        && segment.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && segment.chars().any(|c| c.is_ascii_uppercase())
}

fn split_segment(segment: &str) -> String {
    let s = LETTER_DIGIT.replace_all(segment, "${1} ${2}");
    let s = DIGIT_LETTER.replace_all(&s, "${1} ${2}");
    let s = LOWER_UPPER.replace_all(&s, "${1} ${2}");
    let s = ACRONYM_WORD.replace_all(&s, "${1} ${2}");
    WORD_UPPER.replace_all(&s, "${1} ${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_boundaries() {
        assert_eq!(split_title("15DragonCoins"), "15 Dragon Coins");
        assert_eq!(split_title("Book99Lines"), "Book 99 Lines");
    }

    #[test]
    fn test_acronym_prefix() {
        assert_eq!(split_title("VIPAutoRoulette"), "VIP Auto Roulette");
    }

    #[test]
    fn test_underscore_segments() {
        assert_eq!(split_title("MGS_RedRake_getTheCoins"), "MGS RedRake get The Coins");
        assert_eq!(split_title("Pragmatic_GatesOfOlympus"), "Pragmatic Gates Of Olympus");
        assert_eq!(split_title("Big_BassBonanza"), "Big Bass Bonanza");
    }

    #[test]
    fn test_studio_kept_only_after_provider_code() {
        assert_eq!(split_title("NE_NetEnt_DeadOrAlive2"), "NE NetEnt Dead Or Alive 2");
        assert_eq!(split_title("Mgs_RedRake_getTheCoins"), "Mgs Red Rake get The Coins");
        assert_eq!(split_title("MGS_RedRake"), "MGS Red Rake");
    }

    #[test]
    fn test_already_readable() {
        assert_eq!(split_title("  Sweet   Bonanza "), "Sweet Bonanza");
        assert_eq!(split_title(""), "");
    }
}
