//! Touchpoint events recorded by the ingestion collaborator.

use chrono::{DateTime, Utc};

/// A single behavioural touchpoint.
///
/// Events are immutable once appended. Each one belongs to at most one actor
/// (by e-mail) and at most one company (by domain). Depth signals and topic
/// tags are optional and are interpreted permissively by the scorer.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use foura_core::Event;
///
/// let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().unwrap_or_default();
/// let event = Event::new("evt-1", "pricing_page_view", at)
///     .with_actor("Ada@Example.com")
///     .with_company("example.com");
/// assert_eq!(event.actor_email.as_deref(), Some("Ada@Example.com"));
/// assert_eq!(event.ingested_at, at);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Opaque unique identifier.
    pub event_id: String,
    /// When the behaviour happened.
    pub occurred_at: DateTime<Utc>,
    /// When the event was recorded.
    pub ingested_at: DateTime<Utc>,
    /// Person identity key.
    #[cfg_attr(feature = "serde", serde(default))]
    pub actor_email: Option<String>,
    /// Company identity key.
    #[cfg_attr(feature = "serde", serde(default))]
    pub company_domain: Option<String>,
    /// Key into the weight table, e.g. `email_open`.
    pub touchpoint: String,
    /// Explicit funnel-stage override.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stage_hint: Option<String>,
    /// Scroll depth in percent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub depth_scroll: Option<f64>,
    /// Dwell time in seconds.
    #[cfg_attr(feature = "serde", serde(default))]
    pub depth_dwell_sec: Option<f64>,
    /// Completion in percent (videos, webinars, courses).
    #[cfg_attr(feature = "serde", serde(default))]
    pub depth_pct_complete: Option<f64>,
    /// Raw topic tags: a JSON array or a comma-separated list.
    #[cfg_attr(feature = "serde", serde(default))]
    pub topic_tax: Option<String>,
}

impl Event {
    /// Build an event that was ingested at the moment it occurred.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        touchpoint: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            occurred_at,
            ingested_at: occurred_at,
            actor_email: None,
            company_domain: None,
            touchpoint: touchpoint.into(),
            stage_hint: None,
            depth_scroll: None,
            depth_dwell_sec: None,
            depth_pct_complete: None,
            topic_tax: None,
        }
    }

    /// Attach the actor e-mail.
    #[must_use]
    pub fn with_actor(mut self, email: impl Into<String>) -> Self {
        self.actor_email = Some(email.into());
        self
    }

    /// Attach the company domain.
    #[must_use]
    pub fn with_company(mut self, domain: impl Into<String>) -> Self {
        self.company_domain = Some(domain.into());
        self
    }

    /// Override the ingestion timestamp.
    #[must_use]
    pub const fn ingested(mut self, at: DateTime<Utc>) -> Self {
        self.ingested_at = at;
        self
    }

    /// Attach an explicit stage hint.
    #[must_use]
    pub fn with_stage_hint(mut self, hint: impl Into<String>) -> Self {
        self.stage_hint = Some(hint.into());
        self
    }

    /// Attach depth signals (scroll %, dwell seconds, completion %).
    #[must_use]
    pub const fn with_depth(
        mut self,
        scroll: Option<f64>,
        dwell_sec: Option<f64>,
        pct_complete: Option<f64>,
    ) -> Self {
        self.depth_scroll = scroll;
        self.depth_dwell_sec = dwell_sec;
        self.depth_pct_complete = pct_complete;
        self
    }

    /// Attach raw topic tags.
    #[must_use]
    pub fn with_topics(mut self, topics: impl Into<String>) -> Self {
        self.topic_tax = Some(topics.into());
        self
    }
}

/// Canonical form of an actor e-mail or company domain.
///
/// Surrounding whitespace is dropped and ASCII letters are lower-cased. Other
/// characters are kept as written, matching `SQLite`'s `lower()` and `NOCASE`
/// folding so keys compare the same in memory and in the database.
///
/// # Examples
/// ```
/// use foura_core::identity_key;
///
/// assert_eq!(identity_key("  Ada@Example.COM "), "ada@example.com");
/// assert_eq!(identity_key("ÅSA@x.io"), "Åsa@x.io");
/// ```
#[must_use]
pub fn identity_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
