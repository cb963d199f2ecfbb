//! Identifier reconciliation for posts
//!
//! Activity can be recorded against a post by raw id (`1712000000000`), by
//! URN-style social id (`urn:li:ugcPost:1712000000000`), or by the numeric
//! suffix of either. These helpers decide whether a candidate reference
//! names a given post, checking raw and prefix-stripped forms on both
//! sides. Pure functions, no failure mode beyond returning `false`.

use serde_json::Value;

use crate::model;

/// Strip a URN-style `scheme:type:` prefix, keeping the trailing segment.
/// Non-URN ids pass through unchanged.
fn strip_urn(id: &str) -> &str {
    if id.starts_with("urn:") {
        id.rsplit(':').next().unwrap_or(id)
    } else {
        id
    }
}

fn eq_nonempty(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// True when `candidate` names the post identified by `raw_id`/`social_id`.
/// All four cross combinations (raw and stripped on either side) count;
/// an empty or absent candidate never matches.
pub fn matches_ids(candidate: &str, raw_id: Option<&str>, social_id: Option<&str>) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let stripped_candidate = strip_urn(candidate);

    [raw_id, social_id].into_iter().flatten().any(|id| {
        let stripped = strip_urn(id);
        eq_nonempty(candidate, id)
            || eq_nonempty(candidate, stripped)
            || eq_nonempty(stripped_candidate, id)
            || eq_nonempty(stripped_candidate, stripped)
    })
}

/// [`matches_ids`] against a post in blob form
pub fn matches_post(candidate: &str, post: &Value) -> bool {
    let (raw, social) = model::post_ids(post);
    matches_ids(candidate, raw, social)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_four_combinations() {
        let raw = Some("123");
        let social = Some("urn:li:ugcPost:123");

        // raw candidate vs raw id
        assert!(matches_ids("123", raw, None));
        // raw candidate vs stripped social id
        assert!(matches_ids("123", None, social));
        // stripped candidate vs raw id
        assert!(matches_ids("urn:li:ugcPost:123", raw, None));
        // stripped candidate vs stripped social id
        assert!(matches_ids("urn:li:activity:123", None, social));
    }

    #[test]
    fn test_activity_and_ugc_prefixes_interchange() {
        let post = json!({"id": "987", "social_id": "urn:li:activity:987"});
        assert!(matches_post("urn:li:ugcPost:987", &post));
        assert!(matches_post("987", &post));
    }

    #[test]
    fn test_empty_candidate_never_matches() {
        assert!(!matches_ids("", Some("123"), Some("urn:li:ugcPost:123")));
        assert!(!matches_ids("", Some(""), None));
    }

    #[test]
    fn test_malformed_ids_return_false() {
        // trailing colon strips to nothing; nothing must not match nothing
        assert!(!matches_ids("urn:li:activity:", Some("urn:li:ugcPost:"), None));
        assert!(!matches_ids("urn:li:activity:", Some("123"), None));
        // missing both ids
        assert!(!matches_ids("123", None, None));
    }

    #[test]
    fn test_non_urn_colons_compare_verbatim() {
        assert!(matches_ids("weird:id", Some("weird:id"), None));
        assert!(!matches_ids("weird:id", Some("id"), None));
    }

    #[test]
    fn test_different_posts_do_not_match() {
        let post = json!({"id": "111", "social_id": "urn:li:ugcPost:111"});
        assert!(!matches_post("222", &post));
        assert!(!matches_post("urn:li:ugcPost:222", &post));
    }
}
