//! Identifier and timestamp generation
//!
//! Id shapes mirror what the impersonated network hands out, so captured
//! traffic and mock traffic are indistinguishable to clients:
//! - provider member ids: `ACoAAA` + 22 url-safe characters
//! - chat/message ids: bare 22-character tokens
//! - invitation/reaction/comment ids: `<prefix>_<millis>_<random>`
//! - post ids: millisecond timestamps as decimal strings

use chrono::Utc;
use rand::Rng;

const TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Member id prefix used by the impersonated network
pub const MEMBER_ID_PREFIX: &str = "ACoAAA";

/// URN prefix stamped on locally authored posts
pub const POST_URN_PREFIX: &str = "urn:li:ugcPost:";

/// 22-character url-safe token, used for chat and message ids
pub fn token() -> String {
    let mut rng = rand::thread_rng();
    (0..22)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Synthetic provider member id (`ACoAAA` + token)
pub fn member_id() -> String {
    format!("{}{}", MEMBER_ID_PREFIX, token())
}

/// `<prefix>_<millis>_<random>` id for invitations, reactions, comments
pub fn prefixed_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), suffix)
}

/// Millisecond-timestamp id for locally authored posts
pub fn post_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Social id for a locally authored post
pub fn post_social_id(post_id: &str) -> String {
    format!("{}{}", POST_URN_PREFIX, post_id)
}

/// Current time as an RFC 3339 UTC string, the timestamp format used in
/// every persisted entity
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let t = token();
        assert_eq!(t.len(), 22);
        assert!(t.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_member_id_prefix() {
        let id = member_id();
        assert!(id.starts_with(MEMBER_ID_PREFIX));
        assert_eq!(id.len(), MEMBER_ID_PREFIX.len() + 22);
    }

    #[test]
    fn test_prefixed_id_shape() {
        let id = prefixed_id("inv");
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "inv");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_post_social_id_round_trip() {
        let id = post_id();
        let social = post_social_id(&id);
        assert_eq!(social.strip_prefix(POST_URN_PREFIX), Some(id.as_str()));
    }

    #[test]
    fn test_now_iso_parses() {
        assert!(chrono::DateTime::parse_from_rfc3339(&now_iso()).is_ok());
    }
}
