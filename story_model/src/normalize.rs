//! Key normalization for entity names.
//!
//! Every map in the narrative model is keyed by the normalized form of an
//! entity's surface text, so "Elara", " elara " and "ELARA." share one key.

/// Normalize an entity name into a map key.
///
/// Lowercases, collapses internal whitespace and strips leading/trailing
/// punctuation. Articles are kept: "a small village by the sea" stays as is.
pub fn normalize_key(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_whitespace() {
        assert_eq!(normalize_key("  Elara  "), "elara");
        assert_eq!(normalize_key("The   Mysterious\tShip"), "the mysterious ship");
    }

    #[test]
    fn test_normalize_strips_outer_punctuation() {
        assert_eq!(normalize_key("Elara."), "elara");
        assert_eq!(normalize_key("\"a small village by the sea,\""), "a small village by the sea");
        assert_eq!(normalize_key("O'Brien"), "o'brien");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key(" ... "), "");
    }
}
