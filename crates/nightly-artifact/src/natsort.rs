//! Natural ordering for listing keys.
//!
//! Splits a string into alternating text and digit runs. Digit runs compare
//! as unbounded integers, text runs compare case-insensitively.

use std::cmp::{Ordering, Reverse};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    /// Digits with leading zeros stripped
    Number(String),
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
            (Token::Text(_), Token::Number(_)) => Ordering::Less,
            (Token::Number(_), Token::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Comparison key produced by [`natural_key`].
///
/// The token sequence always starts with a (possibly empty) text run, so
/// two keys line up text-against-text and number-against-number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Token>);

/// Build the natural comparison key of `s`.
pub fn natural_key(s: &str) -> NaturalKey {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if digits.is_empty() {
                tokens.push(Token::Text(std::mem::take(&mut text)));
            }
            digits.push(c);
        } else {
            if !digits.is_empty() {
                tokens.push(number_token(std::mem::take(&mut digits)));
            }
            text.extend(c.to_lowercase());
        }
    }

    if !digits.is_empty() {
        tokens.push(number_token(digits));
    }
    tokens.push(Token::Text(text));

    NaturalKey(tokens)
}

fn number_token(digits: String) -> Token {
    let trimmed = digits.trim_start_matches('0');
    Token::Number(trimmed.to_string())
}

/// Sort `items` newest first (descending natural order of `key`).
pub fn sort_newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_cached_key(|item| Reverse(natural_key(key(item))));
}
