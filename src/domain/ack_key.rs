//! Ack-key codec.
//!
//! An ack key binds a message id to the single-use token issued by the claim
//! that returned it. Rendered as `"<id>/<token>"`; tokens never contain the
//! separator.

use std::fmt;
use std::str::FromStr;

use rand::distr::Alphanumeric;
use rand::Rng;

use super::error::BrokerError;

const SEPARATOR: char = '/';

/// Length of tokens produced by [`random_token`].
pub const TOKEN_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckKey {
    pub message_id: i64,
    pub token: String,
}

impl AckKey {
    pub fn new(message_id: i64, token: impl Into<String>) -> Self {
        Self {
            message_id,
            token: token.into(),
        }
    }
}

impl fmt::Display for AckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.message_id, SEPARATOR, self.token)
    }
}

impl FromStr for AckKey {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BrokerError::InvalidAckKey(s.to_string());

        let (id, token) = s.split_once(SEPARATOR).ok_or_else(invalid)?;
        if token.is_empty() || token.contains(SEPARATOR) {
            return Err(invalid());
        }
        let message_id = id.parse::<i64>().map_err(|_| invalid())?;

        Ok(Self::new(message_id, token))
    }
}

/// Fresh alphanumeric claim token.
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(AckKey::new(17, "a1b2c3d").to_string(), "17/a1b2c3d");
    }

    #[test]
    fn test_parse_returns_exact_pair() {
        let key: AckKey = "9001/zZ09xy".parse().unwrap();
        assert_eq!(key.message_id, 9001);
        assert_eq!(key.token, "zZ09xy");
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for input in ["", "17", "17/", "/tok", "abc/tok", "1/2/3", "17 /tok", "1.5/tok"] {
            assert!(
                matches!(input.parse::<AckKey>(), Err(BrokerError::InvalidAckKey(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_random_tokens_are_separator_free() {
        for _ in 0..100 {
            let token = random_token();
            assert_eq!(token.len(), TOKEN_LEN);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
            let key = AckKey::new(1, token.clone());
            assert_eq!(key.to_string().parse::<AckKey>().unwrap().token, token);
        }
    }
}
