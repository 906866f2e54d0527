use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::mention::Mention;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("could not parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not recognize feed shape")]
    UnrecognizedShape,
}

/// On-disk envelope for a store. Purely a serialization choice: readers
/// accept every shape regardless of how the store will be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    /// Bare array of mentions.
    Array,
    /// Classic `{"links": [...]}` object.
    Links,
    /// JF2 `{"type": "feed", "name": "Webmentions", "children": [...]}`.
    Jf2Feed,
}

#[derive(Serialize)]
struct LinksEnvelope<'a> {
    links: &'a [Mention],
}

#[derive(Serialize)]
struct Jf2Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
    children: &'a [Mention],
}

/// Decodes a page or store into its ordered mention sequence.
///
/// Accepts a bare array, an object with a `links` array, or a JF2 object
/// with a `children` array. `links` wins over `children` when both are
/// present; everything else is unparseable. Individual mentions are not
/// validated here.
pub fn parse(bytes: &[u8]) -> Result<Vec<Mention>, FeedError> {
    let document: Value = serde_json::from_slice(bytes)?;
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match extract_list(&mut object) {
            Some(entries) => entries,
            None => return Err(FeedError::UnrecognizedShape),
        },
        _ => return Err(FeedError::UnrecognizedShape),
    };
    Ok(entries.into_iter().map(Mention).collect())
}

fn extract_list(object: &mut serde_json::Map<String, Value>) -> Option<Vec<Value>> {
    for key in ["links", "children"] {
        match object.remove(key) {
            Some(Value::Array(entries)) => return Some(entries),
            Some(_) | None => continue,
        }
    }
    None
}

/// Encodes mentions in the selected envelope, with a trailing newline.
pub fn render(
    mentions: &[Mention],
    format: StoreFormat,
    pretty: bool,
) -> Result<Vec<u8>, FeedError> {
    let mut bytes = match format {
        StoreFormat::Array => to_bytes(&mentions, pretty)?,
        StoreFormat::Links => to_bytes(&LinksEnvelope { links: mentions }, pretty)?,
        StoreFormat::Jf2Feed => to_bytes(
            &Jf2Envelope {
                kind: "feed",
                name: "Webmentions",
                children: mentions,
            },
            pretty,
        )?,
    };
    bytes.push(b'\n');
    Ok(bytes)
}

fn to_bytes<T: Serialize>(value: &T, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
    if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
}
