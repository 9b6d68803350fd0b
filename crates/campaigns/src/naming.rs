//! Campaign name generation.
//!
//! Generated names follow the fixed ad-account template
//! `{country}-{vertical}-{platform}-{segment}-{sequence}-{initials}-{short_description}`,
//! e.g. `PE-MOTOPER-FB-ADQ-001-GF-Verano2025`.

use siscoca_core::types::{Country, Platform, Segment, Vertical};

/// Build the deterministic fallback name from classification fields.
/// The sequence is zero-padded to three digits; initials are uppercased.
pub fn generate_name(
    country: Country,
    vertical: Vertical,
    platform: Platform,
    segment: Segment,
    sequence: usize,
    owner_initials: &str,
    short_description: &str,
) -> String {
    format!(
        "{}-{}-{}-{}-{:03}-{}-{}",
        country.code(),
        vertical.code(),
        platform.code(),
        segment.abbrev(),
        sequence,
        owner_initials.to_uppercase(),
        short_description
    )
}

/// Name resolution priority: explicit manual name, then the UI's
/// pre-generated name, then the deterministic template.
pub fn resolve_name(
    manual: Option<&str>,
    pregenerated: Option<&str>,
    fallback: impl FnOnce() -> String,
) -> String {
    match (non_empty(manual), non_empty(pregenerated)) {
        (Some(name), _) => name.to_string(),
        (None, Some(name)) => name.to_string(),
        (None, None) => fallback(),
    }
}

/// Initials from a display name: first letter of the first word plus
/// first letter of the last word, uppercased. "Juan Pérez" → "JP".
pub fn initials_from_name(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let mut initials = String::new();
    if let Some(first) = words.first().and_then(|w| w.chars().next()) {
        initials.push(first);
    }
    if words.len() > 1 {
        if let Some(last) = words.last().and_then(|w| w.chars().next()) {
            initials.push(last);
        }
    }
    initials.to_uppercase()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
