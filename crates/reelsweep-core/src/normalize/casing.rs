use lazy_static::lazy_static;
use regex::Regex;

use super::blacklist::{is_ordinal, is_preserved_acronym};

lazy_static! {
    static ref ABBREVIATION_TOKEN: Regex = Regex::new(r"^(?:[A-Za-z]\.){2,}[A-Za-z]?$").unwrap();
}

/// How a single whitespace-separated token is cased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `1st`, `25TH`: digits kept, suffix lowercased.
    Ordinal,
    /// Dotted initialisms like `U.S.` or `S.H.I.E.L.D.`: uppercased.
    Abbreviation,
    /// All-caps tokens that must stay all-caps (`TNG`, `SHIELD` in a mixed-case title).
    Acronym,
    Word,
}

fn is_all_caps(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic())
        && !token.chars().any(|c| c.is_lowercase())
}

/// Classifies a token. `mixed_case` tells whether the surrounding title has any lowercase
/// letter; in a fully uppercased title only allow-listed acronyms keep their caps.
pub fn classify(token: &str, mixed_case: bool) -> TokenKind {
    if is_ordinal(token) {
        return TokenKind::Ordinal;
    }
    if ABBREVIATION_TOKEN.is_match(token) {
        return TokenKind::Abbreviation;
    }
    if is_all_caps(token) {
        if is_preserved_acronym(token) {
            return TokenKind::Acronym;
        }
        let letters_only = token.chars().all(|c| c.is_ascii_uppercase());
        if mixed_case && letters_only && token.len() >= 2 {
            return TokenKind::Acronym;
        }
    }
    TokenKind::Word
}

fn capitalize(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut seen_letter = false;
    for c in token.chars() {
        if c.is_alphabetic() {
            if seen_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
                seen_letter = true;
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn case_token(token: &str, kind: TokenKind) -> String {
    match kind {
        TokenKind::Ordinal => token.to_lowercase(),
        TokenKind::Abbreviation => token.to_uppercase(),
        TokenKind::Acronym => token.to_string(),
        TokenKind::Word => capitalize(token),
    }
}

/// Title-cases `s` token by token. Whitespace runs collapse to a single space.
pub fn title_case(s: &str) -> String {
    let mixed_case = s.chars().any(|c| c.is_lowercase());
    s.split_whitespace()
        .map(|token| case_token(token, classify(token, mixed_case)))
        .collect::<Vec<_>>()
        .join(" ")
}
