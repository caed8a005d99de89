use crate::core::error::{NameError, PhoneError};

/// Trim and collapse every run of whitespace into a single space
pub fn normalize_full_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize then validate a "Surname I. O." style entry.
///
/// Accepts 2 to 4 words, each at least two characters long.
pub fn validate_full_name(raw: &str) -> Result<String, NameError> {
    let normalized = normalize_full_name(raw);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    if !(2..=4).contains(&words.len()) {
        return Err(NameError::WordCount(words.len()));
    }

    if let Some(short) = words.iter().find(|w| w.chars().count() < 2) {
        return Err(NameError::ShortWord(short.to_string()));
    }

    Ok(normalized)
}

/// Reduce a phone entry to the canonical `+7XXXXXXXXXX` form
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 11 {
        return Err(PhoneError::DigitCount(digits.len()));
    }

    match digits.strip_prefix('7').or_else(|| digits.strip_prefix('8')) {
        Some(rest) => Ok(format!("+7{}", rest)),
        None => Err(PhoneError::CountryPrefix),
    }
}
