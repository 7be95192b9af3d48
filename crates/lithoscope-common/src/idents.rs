//! Identifier format validation: DOI and ISBN.

use std::sync::OnceLock;

use regex::Regex;

fn doi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").unwrap())
}

/// Syntactic DOI check (prefix `10.`, registrant code, non-empty suffix).
pub fn is_doi(value: &str) -> bool {
    doi_regex().is_match(value.trim())
}

/// Normalize an ISBN: strip separators, validate the ISBN-10 or ISBN-13
/// check digit. Returns `None` for anything invalid.
pub fn normalize_isbn(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    match cleaned.len() {
        10 if valid_isbn10(&cleaned) => Some(cleaned),
        13 if valid_isbn13(&cleaned) => Some(cleaned),
        _ => None,
    }
}

fn valid_isbn10(s: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in s.chars().enumerate() {
        let v = match c {
            'X' if i == 9 => 10,
            c => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += v * (10 - i as u32);
    }
    sum % 11 == 0
}

fn valid_isbn13(s: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in s.chars().enumerate() {
        let Some(d) = c.to_digit(10) else { return false };
        sum += d * if i % 2 == 0 { 1 } else { 3 };
    }
    sum % 10 == 0
}
