//! Share identifier generation

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of generated share identifiers
pub const SHARE_ID_LEN: usize = 7;

/// Generate a short random share identifier.
///
/// Lowercase alphanumeric, [`SHARE_ID_LEN`] characters. Uniqueness is best
/// effort: ~7.8e10 combinations, no collision check.
pub fn generate_share_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .map(|b| (b as char).to_ascii_lowercase())
        .take(SHARE_ID_LEN)
        .collect()
}

/// Whether `id` is acceptable inside a `/share/{id}` path segment.
pub fn is_valid_share_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        for _ in 0..100 {
            let id = generate_share_id();
            assert_eq!(id.len(), SHARE_ID_LEN);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
            assert!(is_valid_share_id(&id));
        }
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = generate_share_id();
        let b = generate_share_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_share_id_validation() {
        assert!(is_valid_share_id("abc_DEF-123"));
        assert!(!is_valid_share_id(""));
        assert!(!is_valid_share_id("../etc"));
        assert!(!is_valid_share_id("a b"));
    }
}
