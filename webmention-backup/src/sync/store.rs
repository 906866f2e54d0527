use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use webmention_core::{FeedError, Mention, StoreFormat, feed};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no filename specified")]
    MissingFilename,
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Reads a whole store file. Any of the three envelope shapes is accepted.
pub fn read(path: &Path) -> Result<Vec<Mention>, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(feed::parse(&bytes)?)
}

/// Rewrites a whole store file in the selected envelope.
///
/// Parent directories are never created here: routing only places
/// mentions into directories that already exist in the content tree.
pub fn write(
    path: &Path,
    mentions: &[Mention],
    format: StoreFormat,
    pretty: bool,
) -> Result<(), StoreError> {
    let bytes = feed::render(mentions, format, pretty)?;
    fs::write(path, bytes).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
