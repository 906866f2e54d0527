use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use webmention_core::{
    Cursor, FetchError, Mention, MentionsClient, StoreFormat, latest_id, latest_received,
    set_marker, stored_timestamp,
};

use super::paths::{dir_from_url, filename_for_url};
use super::store::{self, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("timestamp format error: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Immutable per-run configuration, fixed before the engine starts.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Store filename, used for the flat store, the content root store and
    /// (locale-suffixed) every leaf store.
    pub filename: String,
    /// When set, mentions are routed into this directory's subtree.
    pub content_dir: Option<PathBuf>,
    /// Locale prefixes stripped while deriving directories.
    pub locales: Vec<String>,
    pub format: StoreFormat,
    pub pretty: bool,
    /// Resume from the stored verification timestamp instead of the
    /// highest mention id.
    pub timestamp_cursor: bool,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub existing: usize,
    pub fetched: usize,
    /// Mentions in the flat store after the run (flat layout only).
    pub flat_total: Option<usize>,
}

pub struct SyncEngine {
    client: MentionsClient,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(client: MentionsClient, config: SyncConfig) -> Self {
        Self { client, config }
    }

    /// One full incremental sync: read existing state, fetch everything
    /// past the cursor, persist. Safe to re-run: routed merges are
    /// deduplicated, and a failed run leaves already-written stores in
    /// place for the next attempt.
    pub async fn run(&self) -> Result<SyncReport, EngineError> {
        let root_path = self.root_store_path();
        let existing = read_or_empty(&root_path);

        let cursor = if self.config.timestamp_cursor {
            Cursor::Since(stored_timestamp(&existing).unwrap_or(OffsetDateTime::UNIX_EPOCH))
        } else {
            Cursor::Id(latest_id(&existing))
        };
        info!(?cursor, "fetching new mentions");
        let new = self.client.fetch_since(cursor).await?;

        let mut report = SyncReport {
            existing: existing.len(),
            fetched: new.len(),
            flat_total: None,
        };
        if new.is_empty() {
            return Ok(report);
        }

        match &self.config.content_dir {
            Some(content_dir) => {
                let prior_mark = stored_timestamp(&existing);
                self.save_to_dirs(content_dir, &new)?;
                if self.config.timestamp_cursor {
                    self.update_high_water_mark(&root_path, prior_mark, &new)?;
                }
            }
            None => {
                self.ensure_filename()?;
                let mut merged = existing;
                merged.extend(new.iter().cloned());
                if self.config.timestamp_cursor {
                    let prior = stored_timestamp(&merged);
                    if let Some(mark) = high_water_mark(prior, &new) {
                        set_marker(&mut merged, mark)?;
                    }
                }
                store::write(&root_path, &merged, self.config.format, self.config.pretty)?;
                report.flat_total = Some(merged.len());
            }
        }
        Ok(report)
    }

    /// Routes each mention into the directory mirroring its target URL,
    /// falling back to the content root when no directory can be
    /// suggested or the leaf store cannot be written (the content tree is
    /// never extended with new directories). A fallback failure is fatal.
    fn save_to_dirs(&self, content_dir: &Path, new: &[Mention]) -> Result<(), EngineError> {
        for mention in new {
            if self.save_routed(content_dir, mention) {
                continue;
            }
            let root = content_dir.join(&self.config.filename);
            self.merge_into(&root, mention)?;
        }
        Ok(())
    }

    fn save_routed(&self, content_dir: &Path, mention: &Mention) -> bool {
        let Some(target) = mention.target() else {
            return false;
        };
        let Some(dir) = dir_from_url(target, &self.config.locales) else {
            info!(url = target, "no directory suggested");
            return false;
        };
        let filename = filename_for_url(target, &self.config.locales, &self.config.filename);
        let path = content_dir.join(dir).join(filename);
        match self.merge_into(&path, mention) {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "could not save to suggested directory, falling back to content root"
                );
                false
            }
        }
    }

    /// Read-modify-write merge of one mention into a store file. The
    /// mention is skipped when an entry with the same source and
    /// verification instant is already present, which makes re-runs over
    /// the same remote data idempotent.
    fn merge_into(&self, path: &Path, mention: &Mention) -> Result<(), EngineError> {
        self.ensure_filename()?;
        let mut mentions = store::read(path).unwrap_or_default();
        if mentions.iter().any(|existing| existing.same_mention(mention)) {
            return Ok(());
        }
        mentions.push(mention.clone());
        info!(path = %path.display(), "saving new mention");
        store::write(path, &mentions, self.config.format, self.config.pretty)?;
        Ok(())
    }

    /// Rewrites the content root store with a single timestamp marker
    /// remembering the most recent verification instant seen so far.
    fn update_high_water_mark(
        &self,
        root_path: &Path,
        prior: Option<OffsetDateTime>,
        processed: &[Mention],
    ) -> Result<(), EngineError> {
        let Some(mark) = high_water_mark(prior, processed) else {
            return Ok(());
        };
        self.ensure_filename()?;
        let mut mentions = read_or_empty(root_path);
        set_marker(&mut mentions, mark)?;
        store::write(root_path, &mentions, self.config.format, self.config.pretty)?;
        Ok(())
    }

    fn root_store_path(&self) -> PathBuf {
        match &self.config.content_dir {
            Some(dir) => dir.join(&self.config.filename),
            None => PathBuf::from(&self.config.filename),
        }
    }

    fn ensure_filename(&self) -> Result<(), StoreError> {
        if self.config.filename.is_empty() {
            return Err(StoreError::MissingFilename);
        }
        Ok(())
    }
}

fn high_water_mark(
    prior: Option<OffsetDateTime>,
    processed: &[Mention],
) -> Option<OffsetDateTime> {
    prior.into_iter().chain(latest_received(processed)).max()
}

fn read_or_empty(path: &Path) -> Vec<Mention> {
    match store::read(path) {
        Ok(mentions) => mentions,
        Err(error) => {
            warn!(path = %path.display(), %error, "no readable store, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
