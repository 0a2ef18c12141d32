pub mod discount;
pub mod order;
pub mod payment_config;
pub mod product;
pub mod promotion;
pub mod security_log;
pub mod ticket;
pub mod user;

use rand::Rng;

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Human-facing reference such as `MB-20260301-7KQ2XD`.
///
/// Uniqueness is enforced by the column's unique index; callers retry on collision.
pub(crate) fn reference_number(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| char::from(REFERENCE_ALPHABET[rng.random_range(0..REFERENCE_ALPHABET.len())]))
        .collect();

    format!(
        "{prefix}-{}-{suffix}",
        chrono::Utc::now().format("%Y%m%d")
    )
}

/// Parses a timestamp column written with `to_rfc3339`.
pub(crate) fn parse_timestamp(raw: &str) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    Ok(chrono::DateTime::parse_from_rfc3339(raw)?.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_number_shape() {
        let number = reference_number("MB");
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "MB");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].bytes().all(|b| REFERENCE_ALPHABET.contains(&b)));
    }

    #[test]
    fn timestamps_round_trip() {
        let now = chrono::Utc::now();
        assert_eq!(parse_timestamp(&now.to_rfc3339()).unwrap(), now);
        assert!(parse_timestamp("ayer").is_err());
    }
}
