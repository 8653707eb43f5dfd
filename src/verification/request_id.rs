use rand::Rng;
use time::OffsetDateTime;

const PREFIX: &str = "req_";
const RANDOM_LEN: usize = 13;
const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Produces an opaque request id of the form `req_<ts36>_<rand36>`: current
/// milliseconds since the epoch in base 36, then 13 random base-36
/// characters. Uniqueness is enforced by the partial unique index at write
/// time, not here.
pub fn generate() -> String {
    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u128;
    format!("{PREFIX}{}_{}", to_base36(millis), random_segment(RANDOM_LEN))
}

/// Namespace prefix followed by two non-empty segments.
pub fn looks_like_request_id(value: &str) -> bool {
    match value.strip_prefix(PREFIX) {
        Some(rest) => matches!(
            rest.split_once('_'),
            Some((ts, rand)) if !ts.is_empty() && !rand.is_empty()
        ),
        None => false,
    }
}

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize] as char);
        n /= 36;
    }
    digits.into_iter().rev().collect()
}

fn random_segment(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| DIGITS[rng.gen_range(0..DIGITS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn base36_renders_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(36 * 36 + 1), "101");
    }

    #[test]
    fn generated_ids_match_the_expected_shape() {
        let id = generate();
        assert!(looks_like_request_id(&id));
        let rest = id.strip_prefix(PREFIX).unwrap();
        let (ts, rand) = rest.split_once('_').unwrap();
        assert!(ts.chars().all(|c| DIGITS.contains(&(c as u8))));
        assert_eq!(rand.len(), RANDOM_LEN);
        assert!(rand.chars().all(|c| DIGITS.contains(&(c as u8))));
    }

    #[test]
    fn generated_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..200).map(|_| generate()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn shape_check_rejects_malformed_ids() {
        assert!(!looks_like_request_id(""));
        assert!(!looks_like_request_id("req_"));
        assert!(!looks_like_request_id("req__"));
        assert!(!looks_like_request_id("req_onlyonesegment"));
        assert!(!looks_like_request_id("req_ts_"));
        assert!(!looks_like_request_id("other_ts_rand"));
        assert!(looks_like_request_id("req_ts_rand"));
    }
}
