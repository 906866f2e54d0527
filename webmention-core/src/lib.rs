mod client;
pub mod feed;
mod mention;

pub use client::{DEFAULT_ENDPOINT, FetchError, MentionsClient};
pub use feed::{FeedError, StoreFormat};
pub use mention::{
    Cursor, Mention, latest_id, latest_received, set_marker, stored_timestamp,
};
