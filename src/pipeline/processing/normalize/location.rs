use crate::constants::{CIRCUIT_COUNTRIES, COUNTRY_NAMES};
use crate::pipeline::utils::StringUtils;

/// Collapse whitespace and strip dangling separators
pub fn clean_location(raw: &str) -> String {
    StringUtils::collapse_whitespace(raw)
        .trim_matches(|c: char| matches!(c, '-' | '–' | '—' | '|' | ',' | ';') || c.is_whitespace())
        .to_string()
}

fn country_named(folded: &str) -> Option<&'static str> {
    COUNTRY_NAMES.iter().find(|(name, _)| *name == folded).map(|(_, country)| *country)
}

/// Country of a location string.
///
/// A trailing `, <country>` (or `- <country>`, `(country)`) segment wins;
/// otherwise known circuit and host-city names are looked up, longest name
/// first.
pub fn infer_country(location: &str) -> Option<String> {
    let folded = StringUtils::fold(location);
    if folded.is_empty() {
        return None;
    }

    let last_segment = location
        .rsplit(|c: char| matches!(c, ',' | '-' | '–' | '(' | '/'))
        .next()
        .map(StringUtils::fold)
        .unwrap_or_default();
    if let Some(country) = country_named(&last_segment).or_else(|| country_named(&folded)) {
        return Some(country.to_string());
    }

    let padded = format!(" {} ", folded);
    CIRCUIT_COUNTRIES
        .iter()
        .filter(|(place, _)| padded.contains(&format!(" {} ", place)))
        .max_by_key(|(place, _)| place.len())
        .map(|(_, country)| country.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_location() {
        assert_eq!(clean_location("  Interlagos,   São Paulo – "), "Interlagos, São Paulo");
        assert_eq!(clean_location(""), "");
    }

    #[test]
    fn test_trailing_country_segment() {
        assert_eq!(infer_country("Hungaroring, Hungria").as_deref(), Some("Hungary"));
        assert_eq!(infer_country("Autódromo de Termas (Argentina)").as_deref(), Some("Argentina"));
        assert_eq!(infer_country("Brasil").as_deref(), Some("Brazil"));
    }

    #[test]
    fn test_circuit_lookup() {
        assert_eq!(infer_country("Autódromo José Carlos Pace - Interlagos").as_deref(), Some("Brazil"));
        assert_eq!(infer_country("Circuit de Spa-Francorchamps").as_deref(), Some("Belgium"));
        assert_eq!(infer_country("Yas Marina Circuit").as_deref(), Some("United Arab Emirates"));
        assert_eq!(infer_country("Somewhere Else"), None);
        assert_eq!(infer_country(""), None);
    }
}
