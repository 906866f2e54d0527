use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const ID_KEYS: &[&str] = &["id", "wm-id"];
const SOURCE_KEYS: &[&str] = &["source", "wm-source"];
const TARGET_KEYS: &[&str] = &["target", "wm-target"];
const VERIFIED_KEYS: &[&str] = &["verified_date", "wm-received"];
const MARKER_KEY: &str = "timestamp";

/// A single webmention as delivered by the service.
///
/// The payload is kept verbatim and round-tripped unchanged; the accessors
/// below only read the handful of fields used for identity and routing.
/// Each logical field is resolvable under two key names (the classic and
/// the microformats vocabularies), first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mention(pub Value);

/// Position from which the next incremental fetch resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Last seen mention id (`since_id` query parameter).
    Id(u64),
    /// Last seen verification instant (`since` query parameter).
    Since(OffsetDateTime),
}

impl Mention {
    /// Builds the pseudo-mention that remembers a store's high-water mark.
    pub fn marker(instant: OffsetDateTime) -> Result<Self, time::error::Format> {
        let rendered = instant.format(&Rfc3339)?;
        Ok(Self(serde_json::json!({ MARKER_KEY: rendered })))
    }

    fn first_of(&self, keys: &[&str]) -> Option<&Value> {
        let object = self.0.as_object()?;
        keys.iter().find_map(|key| object.get(*key))
    }

    pub fn id(&self) -> Option<u64> {
        self.first_of(ID_KEYS)?.as_u64()
    }

    pub fn source(&self) -> Option<&str> {
        self.first_of(SOURCE_KEYS)?.as_str()
    }

    pub fn target(&self) -> Option<&str> {
        self.first_of(TARGET_KEYS)?.as_str()
    }

    pub fn verified_at(&self) -> Option<OffsetDateTime> {
        let raw = self.first_of(VERIFIED_KEYS)?.as_str()?;
        OffsetDateTime::parse(raw, &Rfc3339).ok()
    }

    /// True for an object whose only field is a `timestamp` string.
    pub fn is_marker(&self) -> bool {
        match self.0.as_object() {
            Some(object) => {
                object.len() == 1 && object.get(MARKER_KEY).is_some_and(Value::is_string)
            }
            None => false,
        }
    }

    pub fn marker_instant(&self) -> Option<OffsetDateTime> {
        if !self.is_marker() {
            return None;
        }
        let raw = self.0.as_object()?.get(MARKER_KEY)?.as_str()?;
        OffsetDateTime::parse(raw, &Rfc3339).ok()
    }

    /// Whether two records describe the same mention.
    ///
    /// Identity is the pair (source, verified instant) compared as instants,
    /// so `+00:00` and `Z` spellings of the same time are equal. A missing
    /// or unparseable field on either side makes the records distinct. The
    /// service-global `id` deliberately takes no part here: a routed store
    /// only ever holds a subset of ids, and two exports of the same mention
    /// may carry ids from different vocabularies. The flip side is that two
    /// genuinely different mentions sharing a source URL and a verification
    /// second collapse into one.
    pub fn same_mention(&self, other: &Mention) -> bool {
        let (Some(source_a), Some(source_b)) = (self.source(), other.source()) else {
            return false;
        };
        if source_a != source_b {
            return false;
        }
        match (self.verified_at(), other.verified_at()) {
            (Some(verified_a), Some(verified_b)) => verified_a == verified_b,
            _ => false,
        }
    }
}

/// Highest mention id in `mentions`, or 0 when none carries one.
pub fn latest_id(mentions: &[Mention]) -> u64 {
    mentions.iter().filter_map(Mention::id).max().unwrap_or(0)
}

/// Most recent verification instant in `mentions`.
pub fn latest_received(mentions: &[Mention]) -> Option<OffsetDateTime> {
    mentions.iter().filter_map(Mention::verified_at).max()
}

/// High-water mark stored in a store's timestamp marker, if any.
pub fn stored_timestamp(mentions: &[Mention]) -> Option<OffsetDateTime> {
    mentions.iter().filter_map(Mention::marker_instant).max()
}

/// Replaces any existing marker with one remembering `instant`.
pub fn set_marker(
    mentions: &mut Vec<Mention>,
    instant: OffsetDateTime,
) -> Result<(), time::error::Format> {
    mentions.retain(|mention| !mention.is_marker());
    mentions.push(Mention::marker(instant)?);
    Ok(())
}
