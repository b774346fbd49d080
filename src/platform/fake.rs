//! In-memory platform used by tests. Records every delegated call.

use super::{MediaPage, PlatformClient, PlatformError, Session};
use crate::media::{MediaItem, MediaKind};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login { username: String },
    ListMedia { cursor: Option<String> },
    Delete { pk: String },
    Download { pk: String, destination: PathBuf },
}

#[derive(Default)]
pub struct FakePlatform {
    pages: Vec<Vec<MediaItem>>,
    failing: HashSet<String>,
    reject_login: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakePlatform {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self::with_pages(vec![items])
    }

    pub fn with_pages(pages: Vec<Vec<MediaItem>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn rejecting_login() -> Self {
        Self {
            reject_login: true,
            ..Default::default()
        }
    }

    /// Makes the delegated action fail for `pk`.
    pub fn failing_on(mut self, pk: &str) -> Self {
        self.failing.insert(pk.to_string());
        self
    }

    pub fn item(pk: &str, taken_at_secs: i64) -> MediaItem {
        MediaItem {
            pk: pk.to_string(),
            id: format!("{pk}_42"),
            taken_at: Utc.timestamp_opt(taken_at_secs, 0).unwrap(),
            kind: MediaKind::Photo,
            code: None,
        }
    }

    pub fn items(spec: &[(&str, i64)]) -> Vec<MediaItem> {
        spec.iter()
            .map(|(pk, secs)| Self::item(pk, *secs))
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Calls that would have reached the network.
    pub fn network_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn login(&self, username: &str, _password: &str) -> Result<Session> {
        self.record(Call::Login {
            username: username.to_string(),
        });
        if self.reject_login {
            let message = "The password you entered is incorrect.".to_string();
            return Err(PlatformError::BadCredentials(message).into());
        }
        Ok(Session {
            user_id: 42,
            username: username.to_string(),
        })
    }

    async fn list_media(&self, _session: &Session, cursor: Option<&str>) -> Result<MediaPage> {
        self.record(Call::ListMedia {
            cursor: cursor.map(str::to_string),
        });
        let index = match cursor {
            None => 0,
            Some(c) => c
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| PlatformError::InvalidResponse(format!("bad cursor {c}")))?,
        };
        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_cursor = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(MediaPage { items, next_cursor })
    }

    async fn delete_media(&self, _session: &Session, item: &MediaItem) -> Result<()> {
        self.record(Call::Delete {
            pk: item.pk.clone(),
        });
        if self.failing.contains(&item.pk) {
            return Err(PlatformError::Api {
                status: 400,
                message: format!("could not delete {}", item.pk),
            }
            .into());
        }
        Ok(())
    }

    async fn download_media(
        &self,
        _session: &Session,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<Vec<PathBuf>> {
        self.record(Call::Download {
            pk: item.pk.clone(),
            destination: destination.to_path_buf(),
        });
        if self.failing.contains(&item.pk) {
            return Err(PlatformError::Api {
                status: 404,
                message: format!("media {} not found", item.pk),
            }
            .into());
        }
        std::fs::create_dir_all(destination)?;
        let path = destination.join(format!("{}.jpg", item.pk));
        std::fs::write(&path, item.pk.as_bytes())?;
        Ok(vec![path])
    }
}
