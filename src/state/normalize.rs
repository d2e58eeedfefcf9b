//! Canonical form of free-text answers used for equality checks.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Case-fold, strip diacritics and collapse every run of non-alphanumeric characters into a
/// single space, trimming both ends.
pub fn normalize_answer(input: &str) -> String {
    let mut normalized = String::with_capacity(input.len());
    let mut pending_separator = false;

    for ch in input.nfd().filter(|ch| !is_combining_mark(*ch)) {
        if ch.is_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_separator = false;
            normalized.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    normalized
}

/// Whole-string match of a guess against either the title or the artist.
pub fn is_correct_guess(guess: &str, title: &str, artist: &str) -> bool {
    let guess = normalize_answer(guess);
    !guess.is_empty() && (guess == normalize_answer(title) || guess == normalize_answer(artist))
}
