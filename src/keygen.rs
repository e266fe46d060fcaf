//! Key generation module
//!
//! Derives short `[0-9a-z]` record keys from the current epoch-millisecond
//! timestamp: `fold(convert(fold(millis)))`.

use std::sync::atomic::{AtomicU64, Ordering};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Interleave a string outer-in: `12345` becomes `51423`.
pub fn fold(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let middle = len / 2;

    let mut result = String::with_capacity(s.len());
    for i in 0..middle {
        result.push(chars[len - 1 - i]);
        result.push(chars[i]);
    }
    if len % 2 == 1 {
        result.push(chars[middle]);
    }
    result
}

/// Convert a decimal string to base 36.
///
/// Zero and unparseable input both produce an empty string.
pub fn convert(s: &str) -> String {
    let Ok(mut value) = s.parse::<u64>() else {
        return String::new();
    };

    let mut digits = Vec::new();
    while value > 0 {
        #[allow(clippy::cast_possible_truncation)]
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Derive the key for a given epoch-millisecond timestamp
pub fn hash_millis(millis: u64) -> String {
    fold(&convert(&fold(&millis.to_string())))
}

/// Process-wide key source.
///
/// Never hands out two keys derived from the same millisecond: when the
/// clock has not moved past the last timestamp used, the next millisecond
/// is borrowed instead.
pub struct KeyGenerator {
    last_millis: AtomicU64,
}

impl KeyGenerator {
    pub const fn new() -> Self {
        Self {
            last_millis: AtomicU64::new(0),
        }
    }

    /// Produce the next key
    pub fn next_key(&self) -> String {
        hash_millis(self.next_millis(now_millis()))
    }

    fn next_millis(&self, now: u64) -> u64 {
        let step = |last: u64| now.max(last.saturating_add(1));
        match self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(step(last)))
        {
            Ok(prev) | Err(prev) => step(prev),
        }
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sorted_chars(s: &str) -> Vec<char> {
        let mut chars: Vec<char> = s.chars().collect();
        chars.sort_unstable();
        chars
    }

    fn decode36(s: &str) -> u64 {
        if s.is_empty() {
            0
        } else {
            u64::from_str_radix(s, 36).unwrap()
        }
    }

    #[test]
    fn test_fold_examples() {
        assert_eq!(fold("12345"), "51423");
        assert_eq!(fold("1234"), "4132");
        assert_eq!(fold("7"), "7");
        assert_eq!(fold(""), "");
    }

    #[test]
    fn test_fold_is_permutation() {
        let mut s = String::new();
        for i in 0..40u32 {
            s.push(char::from_digit((i * 7 + 3) % 10, 10).unwrap());
            let folded = fold(&s);
            assert_eq!(folded.len(), s.len());
            assert_eq!(sorted_chars(&folded), sorted_chars(&s), "input {s}");
        }
    }

    #[test]
    fn test_convert_examples() {
        assert_eq!(convert("35"), "z");
        assert_eq!(convert("36"), "10");
        assert_eq!(convert("1295"), "zz");
        assert_eq!(convert("0"), "");
        assert_eq!(convert("not a number"), "");
    }

    #[test]
    fn test_convert_decodes_back() {
        let mut v: u64 = 1;
        while v < 36u64.pow(11) {
            for candidate in [v - 1, v, v + 1, v * 7 + 5] {
                let encoded = convert(&candidate.to_string());
                assert!(encoded.bytes().all(|b| DIGITS.contains(&b)));
                assert_eq!(decode36(&encoded), candidate);
            }
            v *= 3;
        }
    }

    #[test]
    fn test_hash_known_timestamps() {
        assert_eq!(hash_millis(1_700_000_000_000), "81edc51l");
        assert_eq!(hash_millis(1_760_000_000_123), "k1r3mwbli");
        assert_eq!(hash_millis(1_234_567_890_123), "f1j3wuvab");
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_millis(1_760_000_000_123), hash_millis(1_760_000_000_123));
        assert_ne!(hash_millis(1_760_000_000_123), hash_millis(1_760_000_000_124));
    }

    #[test]
    fn test_next_millis_never_repeats() {
        let keys = KeyGenerator::new();
        assert_eq!(keys.next_millis(1000), 1000);
        assert_eq!(keys.next_millis(1000), 1001);
        assert_eq!(keys.next_millis(999), 1002);
        assert_eq!(keys.next_millis(5000), 5000);
    }

    #[test]
    fn test_next_key_unique_and_alphanumeric() {
        let keys = KeyGenerator::new();
        let generated: HashSet<String> = (0..500).map(|_| keys.next_key()).collect();
        assert_eq!(generated.len(), 500);
        for key in &generated {
            assert!(!key.is_empty());
            assert!(key.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
        }
    }
}
