//! Topic tag parsing and the per-run interest cache.
//!
//! Interests and event tags arrive as loosely formatted text: a JSON array, a
//! JSON object whose values are the topics, or a comma-separated list. Every
//! topic is trimmed and lower-cased and empty entries are dropped.
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use foura_core::{StoreError, TopicInterestLookup, identity_key};
use serde_json::Value;

/// Parse an actor's declared interests.
///
/// Text that looks like JSON but fails to parse is treated as a
/// comma-separated list.
///
/// # Examples
/// ```
/// use foura_scorer::parse_interests;
///
/// assert_eq!(parse_interests(r#"["AI", " Data "]"#), vec!["ai", "data"]);
/// assert_eq!(parse_interests("ai, ,Cloud"), vec!["ai", "cloud"]);
/// ```
#[must_use]
pub fn parse_interests(raw: &str) -> Vec<String> {
    if looks_like_json(raw)
        && let Ok(value) = serde_json::from_str::<Value>(raw)
        && let Some(topics) = json_topics(&value)
    {
        return topics;
    }
    split_csv(raw)
}

/// Parse an event's `topic_tax` tags.
///
/// Returns `None` when the value looks like JSON but is not a JSON array or
/// object; such events get no topic boost.
///
/// # Examples
/// ```
/// use foura_scorer::parse_event_topics;
///
/// assert_eq!(parse_event_topics(r#"{"a": "Security"}"#), Some(vec!["security".to_owned()]));
/// assert_eq!(parse_event_topics("[broken"), None);
/// ```
#[must_use]
pub fn parse_event_topics(raw: &str) -> Option<Vec<String>> {
    if looks_like_json(raw) {
        return serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|value| json_topics(&value));
    }
    Some(split_csv(raw))
}

/// Affinity multiplier for an event against an actor's interests.
///
/// Returns `boost` when any event topic appears in `interests`, otherwise
/// `1.0`. Either side being empty yields `1.0`.
#[must_use]
pub fn topic_affinity(event_topics: &[String], interests: &[String], boost: f64) -> f64 {
    let matched = event_topics
        .iter()
        .any(|topic| interests.iter().any(|interest| interest == topic));
    if matched { boost } else { 1.0 }
}

fn looks_like_json(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    trimmed.starts_with('[') || trimmed.starts_with('{')
}

fn json_topics(value: &Value) -> Option<Vec<String>> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => return None,
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => normalise(text),
                Value::Number(number) => normalise(&number.to_string()),
                _ => None,
            })
            .collect(),
    )
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').filter_map(normalise).collect()
}

fn normalise(topic: &str) -> Option<String> {
    let cleaned = topic.trim().to_lowercase();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Parsed interests keyed by canonical e-mail key, scoped to one scoring run.
#[derive(Debug, Default)]
pub struct TopicCache {
    entries: HashMap<String, Vec<String>>,
}

impl TopicCache {
    /// Return the parsed interests for `email`, querying `lookup` on first use.
    ///
    /// # Errors
    /// Propagates [`StoreError`] from the lookup.
    pub fn interests<L>(&mut self, lookup: &L, email: &str) -> Result<&[String], StoreError>
    where
        L: TopicInterestLookup + ?Sized,
    {
        let key = identity_key(email);
        let topics = match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let raw = lookup.raw_interests(entry.key())?;
                entry.insert(raw.as_deref().map(parse_interests).unwrap_or_default())
            }
        };
        Ok(topics.as_slice())
    }

    /// Number of cached actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Report whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use rstest::rstest;

    #[rstest]
    #[case(r#"["AI","Data"]"#, &["ai", "data"])]
    #[case(r#"{"first":"Cloud","second":" "}"#, &["cloud"])]
    #[case("ai,  Data ,", &["ai", "data"])]
    #[case("[ai, data", &["[ai", "data"])]
    #[case(r#"[1, true, "x"]"#, &["1", "x"])]
    #[case("", &[])]
    fn parses_interest_formats(#[case] raw: &str, #[case] expected: &[&str]) {
        assert_eq!(parse_interests(raw), expected);
    }

    #[rstest]
    #[case("[not json", None)]
    #[case(r#"["Pricing"]"#, Some(vec!["pricing".to_owned()]))]
    #[case("pricing, demos", Some(vec!["pricing".to_owned(), "demos".to_owned()]))]
    fn parses_event_topics(#[case] raw: &str, #[case] expected: Option<Vec<String>>) {
        assert_eq!(parse_event_topics(raw), expected);
    }

    #[rstest]
    fn affinity_requires_overlap() {
        let interests = vec!["ai".to_owned()];
        let matching = vec!["cloud".to_owned(), "ai".to_owned()];
        let other = vec!["cloud".to_owned()];
        assert_eq!(topic_affinity(&matching, &interests, 1.2), 1.2);
        assert_eq!(topic_affinity(&other, &interests, 1.2), 1.0);
        assert_eq!(topic_affinity(&matching, &[], 1.2), 1.0);
    }

    struct CountingLookup {
        calls: Cell<u32>,
    }

    impl TopicInterestLookup for CountingLookup {
        fn raw_interests(&self, email: &str) -> Result<Option<String>, StoreError> {
            self.calls.set(self.calls.get() + 1);
            Ok((email == "ada@example.com").then(|| "AI, data".to_owned()))
        }
    }

    #[rstest]
    fn cache_queries_each_actor_once() {
        let lookup = CountingLookup {
            calls: Cell::new(0),
        };
        let mut cache = TopicCache::default();

        let first = cache
            .interests(&lookup, "Ada@Example.com")
            .expect("lookup succeeds")
            .to_vec();
        let second = cache
            .interests(&lookup, "ada@example.com")
            .expect("lookup succeeds")
            .to_vec();
        let missing = cache
            .interests(&lookup, "bob@example.com")
            .expect("lookup succeeds")
            .to_vec();

        assert_eq!(first, vec!["ai", "data"]);
        assert_eq!(second, first);
        assert!(missing.is_empty());
        assert_eq!(lookup.calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }
}
