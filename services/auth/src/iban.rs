//! IBAN normalisation, mod-97 checksum validation and display masking

use regex::Regex;
use std::sync::OnceLock;

/// Number of decimal digits folded into the running remainder per step.
/// Nine digits plus a two-digit remainder stays well inside `u64`.
const CHUNK_DIGITS: usize = 9;

/// Strip all whitespace and upper-case the remainder.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Check the shape and the mod-97 checksum of an IBAN.
///
/// The input is normalised first, so spacing and letter case do not matter.
pub fn is_valid(iban: &str) -> bool {
    let iban = normalize(iban);

    static IBAN_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = IBAN_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{1,30}$").expect("Failed to compile IBAN regex")
    });

    if !regex.is_match(&iban) {
        return false;
    }

    let (head, tail) = iban.split_at(4);
    let mut digits = String::with_capacity(iban.len() * 2);
    for ch in tail.chars().chain(head.chars()) {
        match ch.to_digit(36) {
            Some(value) => digits.push_str(&value.to_string()),
            None => return false,
        }
    }

    mod97(&digits) == 1
}

/// Remainder of a decimal digit string modulo 97, computed chunk by chunk.
fn mod97(digits: &str) -> u64 {
    digits
        .as_bytes()
        .chunks(CHUNK_DIGITS)
        .fold(0u64, |remainder, chunk| {
            let chunk_value = chunk
                .iter()
                .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));
            (remainder * 10u64.pow(chunk.len() as u32) + chunk_value) % 97
        })
}

/// Display form exposing only the last four characters.
pub fn mask(iban: &str) -> String {
    let chars: Vec<char> = iban.chars().collect();
    if chars.len() <= 4 {
        return iban.to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
