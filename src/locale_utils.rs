use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// Locale utilities for string table locale codes
///
/// Collections carry IETF-style locale codes ("en", "ko", "pt-BR"): an
/// ISO 639 base language subtag with optional region/script subtags.
/// CSV columns use the `Name(code)` header form, e.g. `English(en)` or
/// `Portuguese (Brazil)(pt-BR)`.
// @const: `Name(code)` header regex, the trailing parenthesized group is the code
static HEADER_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*\(\s*([A-Za-z]{2,3}(?:-[A-Za-z0-9]+)*)\s*\)\s*$").unwrap()
});

// @const: bare locale code, e.g. "en", "kor", "zh-Hans"
static BARE_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:-[A-Za-z0-9]+)*$").unwrap()
});

/// Split a locale code into its base language subtag and the remainder
fn split_subtags(code: &str) -> (&str, Option<&str>) {
    match code.trim().split_once('-') {
        Some((base, rest)) => (base, Some(rest)),
        None => (code.trim(), None),
    }
}

/// Look up the base language of a locale code through isolang
fn base_language(code: &str) -> Option<Language> {
    let (base, _) = split_subtags(code);
    let lowered = base.to_lowercase();
    match lowered.len() {
        2 => Language::from_639_1(&lowered),
        3 => Language::from_639_3(&lowered),
        _ => None,
    }
}

/// Validate that a locale code has a known ISO 639 base language
pub fn validate_locale_code(code: &str) -> Result<()> {
    if base_language(code).is_some() {
        Ok(())
    } else {
        Err(anyhow!("Invalid locale code: {}", code))
    }
}

/// English display name for a locale code, falling back to the code itself
pub fn locale_display_name(code: &str) -> String {
    match base_language(code) {
        Some(lang) => lang.to_name().to_string(),
        None => code.trim().to_string(),
    }
}

/// Render the CSV column header for a locale, e.g. `English(en)`
pub fn locale_column_header(code: &str) -> String {
    format!("{}({})", locale_display_name(code), code.trim())
}

/// Extract the locale code from a CSV column header
///
/// Accepts both the `Name(code)` form and a bare code; either way the
/// base language must be a known ISO 639 code. Returns None for headers
/// that name no locale.
pub fn parse_locale_header(header: &str) -> Option<String> {
    if let Some(caps) = HEADER_CODE_REGEX.captures(header) {
        let code = caps[1].to_string();
        if base_language(&code).is_some() {
            return Some(code);
        }
        return None;
    }
    let trimmed = header.trim();
    if BARE_CODE_REGEX.is_match(trimmed) && base_language(trimmed).is_some() {
        return Some(trimmed.to_string());
    }
    None
}

/// Check if two locale codes refer to the same locale
///
/// Base languages are compared through ISO 639 normalization, so "en"
/// matches "eng"; region/script subtags must match case-insensitively.
pub fn locale_codes_match(a: &str, b: &str) -> bool {
    let (_, rest_a) = split_subtags(a);
    let (_, rest_b) = split_subtags(b);

    let same_base = match (base_language(a), base_language(b)) {
        (Some(lang_a), Some(lang_b)) => lang_a == lang_b,
        _ => return false,
    };

    let same_rest = match (rest_a, rest_b) {
        (Some(ra), Some(rb)) => ra.eq_ignore_ascii_case(rb),
        (None, None) => true,
        _ => false,
    };

    same_base && same_rest
}
