use reqwest::{Client, StatusCode};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::feed::{self, FeedError};
use crate::mention::{Cursor, Mention};

pub const DEFAULT_ENDPOINT: &str = "https://webmention.io/api/mentions";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("cursor format error: {0}")]
    Cursor(#[from] time::error::Format),
}

#[derive(Clone)]
pub struct MentionsClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
    domain: Option<String>,
    jf2: bool,
}

impl MentionsClient {
    pub fn new(
        token: Option<String>,
        domain: Option<String>,
        jf2: bool,
    ) -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_ENDPOINT, token, domain, jf2)
    }

    pub fn with_base_url(
        base_url: &str,
        token: Option<String>,
        domain: Option<String>,
        jf2: bool,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.filter(|value| !value.is_empty()),
            domain: domain.filter(|value| !value.is_empty()),
            jf2,
        })
    }

    /// Fetches every mention past `cursor`, in arrival order.
    ///
    /// The cursor parameter is set once; pages are then requested with an
    /// incrementing 0-based `page` parameter until one parses to zero
    /// mentions. Any transport or parse failure aborts the whole fetch.
    pub async fn fetch_since(&self, cursor: Cursor) -> Result<Vec<Mention>, FetchError> {
        let mut url = self.endpoint();
        {
            let mut query = url.query_pairs_mut();
            match cursor {
                Cursor::Id(id) => {
                    query.append_pair("since_id", &id.to_string());
                }
                Cursor::Since(instant) => {
                    query.append_pair("since", &instant.format(&Rfc3339)?);
                }
            }
        }

        let mut mentions = Vec::new();
        for page in 0u32.. {
            let batch = self.fetch_page(&url, page).await?;
            if batch.is_empty() {
                break;
            }
            mentions.extend(batch);
        }
        Ok(mentions)
    }

    async fn fetch_page(&self, url: &Url, page: u32) -> Result<Vec<Mention>, FetchError> {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api { status, body });
        }
        let bytes = response.bytes().await?;
        Ok(feed::parse(&bytes)?)
    }

    fn endpoint(&self) -> Url {
        let mut url = self.base_url.clone();
        if self.jf2 {
            let path = format!("{}.jf2", url.path());
            url.set_path(&path);
        }
        // query_pairs_mut leaves a dangling "?" behind when nothing is
        // appended, so only touch the query when there is something to add.
        if self.token.is_some() || self.domain.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(token) = &self.token {
                query.append_pair("token", token);
            }
            if let Some(domain) = &self.domain {
                query.append_pair("domain", domain);
            }
        }
        url
    }
}
