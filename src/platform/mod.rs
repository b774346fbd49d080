mod instagram;

#[cfg(test)]
pub mod fake;

pub use instagram::InstagramClient;

use crate::media::MediaItem;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Authenticated identity returned by [`PlatformClient::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: u64,
    pub username: String,
}

/// How much of the feed to fetch before selecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    FirstPage,
    AllPages { max_pages: usize },
}

/// One page of a user's feed, newest first.
#[derive(Debug, Clone, Default)]
pub struct MediaPage {
    pub items: Vec<MediaItem>,
    /// Opaque cursor for the next page, `None` when the feed is exhausted.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    BadCredentials(String),

    #[error("Authentication failed: the platform requires a challenge to be solved ({0})")]
    ChallengeRequired(String),

    #[error("Authentication failed: two-factor authentication is enabled for this account")]
    TwoFactorRequired,

    #[error("Rate limited by the platform: {0}")]
    RateLimited(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Platform returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from the platform: {0}")]
    InvalidResponse(String),
}

/// The operations this tool needs from the platform. Everything protocol
/// related (sessions, cookies, request signing) stays behind this trait.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Logs in and resolves the numeric id of `username`.
    async fn login(&self, username: &str, password: &str) -> Result<Session>;

    /// Lists one page of the user's media. `cursor` is `None` for the first page.
    async fn list_media(&self, session: &Session, cursor: Option<&str>) -> Result<MediaPage>;

    async fn delete_media(&self, session: &Session, item: &MediaItem) -> Result<()>;

    /// Downloads every file of `item` into `destination`, returning the written paths.
    async fn download_media(
        &self,
        session: &Session,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<Vec<PathBuf>>;
}

/// Fetches the user's media according to `mode`, preserving platform order.
pub async fn collect_media<C>(
    client: &C,
    session: &Session,
    mode: PaginationMode,
) -> Result<Vec<MediaItem>>
where
    C: PlatformClient + ?Sized,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = client.list_media(session, cursor.as_deref()).await?;
        pages += 1;
        debug!("Fetched media page {} with {} items", pages, page.items.len());
        items.extend(page.items);

        let next = match (mode, page.next_cursor) {
            (PaginationMode::FirstPage, _) | (_, None) => break,
            (PaginationMode::AllPages { max_pages }, Some(next)) => {
                if pages >= max_pages {
                    warn!(
                        "Stopped after {} pages, more media is available (raise media.max_pages)",
                        pages
                    );
                    break;
                }
                next
            }
        };
        cursor = Some(next);
    }

    info!("Retrieved {} media items in {} page(s)", items.len(), pages);
    Ok(items)
}
