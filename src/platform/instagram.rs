use super::{MediaPage, PlatformClient, PlatformError, Session};
use crate::config::PlatformConfig;
use crate::media::{MediaItem, MediaKind, MediaResource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Thin adapter over the platform's private mobile API.
pub struct InstagramClient {
    http: reqwest::Client,
    base_url: Url,
    app_id: String,
    page_size: u32,
    authorization: RwLock<Option<String>>,
}

impl InstagramClient {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: normalize_base_url(&config.base_url)?,
            app_id: config.app_id.clone(),
            page_size: config.page_size,
            authorization: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-IG-App-ID", &self.app_id);
        match self.authorization.read().ok().and_then(|auth| auth.clone()) {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    fn store_token(&self, token: String) -> Result<()> {
        let mut auth = self
            .authorization
            .write()
            .map_err(|_| anyhow::anyhow!("Session state is unusable after an earlier panic"))?;
        *auth = Some(token);
        Ok(())
    }

    fn ensure_logged_in(&self) -> Result<()> {
        let logged_in = self
            .authorization
            .read()
            .map(|auth| auth.is_some())
            .map_err(|_| anyhow::anyhow!("Session state is unusable after an earlier panic"))?;
        if logged_in {
            Ok(())
        } else {
            Err(PlatformError::NotLoggedIn.into())
        }
    }

    async fn user_id_from_username(&self, username: &str) -> Result<u64> {
        let url = self.endpoint(&format!("users/{}/usernameinfo/", username))?;
        let response = self
            .with_headers(self.http.get(url))
            .send()
            .await
            .context("Failed to look up user id")?;
        let info: UserInfoResponse = decode(response).await?;
        info.user.pk.as_u64().ok_or_else(|| {
            PlatformError::InvalidResponse(format!("non-numeric user pk for {}", username)).into()
        })
    }

    async fn media_resources(&self, item: &MediaItem) -> Result<Vec<MediaResource>> {
        let url = self.endpoint(&format!("media/{}/info/", item.pk))?;
        let response = self
            .with_headers(self.http.get(url))
            .send()
            .await
            .with_context(|| format!("Failed to fetch media info for {}", item.pk))?;
        let info: MediaInfoResponse = decode(response).await?;
        let media = info.items.into_iter().next().ok_or_else(|| {
            PlatformError::InvalidResponse(format!("no media info for {}", item.pk))
        })?;
        Ok(media.resources())
    }

    async fn download_resource(&self, resource: &MediaResource, path: &Path) -> Result<()> {
        debug!("Downloading {} to {}", resource.url, path.display());

        let mut response = self
            .http
            .get(&resource.url)
            .send()
            .await
            .context("Failed to fetch media URL")?;

        if !response.status().is_success() {
            return Err(PlatformError::Api {
                status: response.status().as_u16(),
                message: format!("download of {} failed", resource.url),
            }
            .into());
        }

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        while let Some(chunk) = response.chunk().await.context("Failed to read media data")? {
            file.write_all(&chunk)?;
        }
        file.persist(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for InstagramClient {
    async fn login(&self, username: &str, password: &str) -> Result<Session> {
        info!("Logging in as {}", username);

        let payload = serde_json::json!({
            "username": username,
            "enc_password": format!("#PWD_INSTAGRAM:0:{}:{}", Utc::now().timestamp(), password),
            "device_id": device_id(username),
            "login_attempt_count": "0",
        });
        let url = self.endpoint("accounts/login/")?;
        let response = self
            .with_headers(self.http.post(url))
            .form(&[("signed_body", format!("SIGNATURE.{}", payload))])
            .send()
            .await
            .context("Failed to reach the login endpoint")?;

        let token = response
            .headers()
            .get("ig-set-authorization")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let login: LoginResponse = decode(response).await?;
        if login.logged_in_user.is_none() {
            let message = login
                .status
                .message
                .unwrap_or_else(|| "login was not accepted".to_string());
            return Err(PlatformError::BadCredentials(message).into());
        }

        let token = token.ok_or_else(|| {
            PlatformError::InvalidResponse("login succeeded without an authorization token".into())
        })?;
        self.store_token(token)?;

        let user_id = self.user_id_from_username(username).await?;
        Ok(Session {
            user_id,
            username: username.to_string(),
        })
    }

    async fn list_media(&self, session: &Session, cursor: Option<&str>) -> Result<MediaPage> {
        self.ensure_logged_in()?;

        let url = self.endpoint(&format!("feed/user/{}/", session.user_id))?;
        let mut query = vec![("count", self.page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("max_id", cursor.to_string()));
        }

        let response = self
            .with_headers(self.http.get(url).query(&query))
            .send()
            .await
            .context("Failed to list user media")?;
        let feed: FeedResponse = decode(response).await?;
        feed.into_page()
    }

    async fn delete_media(&self, _session: &Session, item: &MediaItem) -> Result<()> {
        self.ensure_logged_in()?;

        let url = self.endpoint(&format!("media/{}/delete/", item.id))?;
        let payload = serde_json::json!({ "media_id": item.id });
        let request = self
            .http
            .post(url)
            .query(&[("media_type", delete_media_type(item.kind))]);
        let response = self
            .with_headers(request)
            .form(&[("signed_body", format!("SIGNATURE.{}", payload))])
            .send()
            .await
            .with_context(|| format!("Failed to delete media {}", item.pk))?;

        let result: DeleteResponse = decode(response).await?;
        if result.did_delete {
            Ok(())
        } else {
            Err(PlatformError::Api {
                status: 200,
                message: format!("media {} was not deleted", item.pk),
            }
            .into())
        }
    }

    async fn download_media(
        &self,
        _session: &Session,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<Vec<PathBuf>> {
        self.ensure_logged_in()?;

        let resources = self.media_resources(item).await?;
        if resources.is_empty() {
            return Err(PlatformError::InvalidResponse(format!(
                "media {} has no downloadable files",
                item.pk
            ))
            .into());
        }

        tokio::fs::create_dir_all(destination)
            .await
            .with_context(|| format!("Failed to create {}", destination.display()))?;

        let mut written = Vec::with_capacity(resources.len());
        for (index, resource) in resources.iter().enumerate() {
            let filename = resource_filename(&item.pk, index, resources.len(), resource);
            let path = destination.join(filename);
            self.download_resource(resource, &path).await?;
            written.push(path);
        }
        Ok(written)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn device_id(username: &str) -> String {
    let mut hasher = DefaultHasher::new();
    username.hash(&mut hasher);
    format!("android-{:016x}", hasher.finish())
}

fn delete_media_type(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "PHOTO",
        MediaKind::Video => "VIDEO",
        MediaKind::Album => "CAROUSEL",
    }
}

fn resource_filename(pk: &str, index: usize, total: usize, resource: &MediaResource) -> String {
    if total == 1 {
        format!("{}.{}", pk, resource.extension)
    } else {
        format!("{}_{}.{}", pk, index + 1, resource.extension)
    }
}

/// Turns a failed response into a [`PlatformError`], otherwise decodes the body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;

    if !status.is_success() {
        let api_status: ApiStatus = serde_json::from_str(&body).unwrap_or_default();
        return Err(classify_failure(status, api_status).into());
    }

    serde_json::from_str(&body)
        .map_err(|e| PlatformError::InvalidResponse(e.to_string()).into())
}

fn classify_failure(status: StatusCode, body: ApiStatus) -> PlatformError {
    let message = body
        .message
        .clone()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        return PlatformError::RateLimited(message);
    }
    if body.two_factor_required.unwrap_or(false) {
        return PlatformError::TwoFactorRequired;
    }

    match body.error_type.as_deref().unwrap_or(message.as_str()) {
        "challenge_required" | "checkpoint_required" => PlatformError::ChallengeRequired(message),
        "bad_password" | "invalid_user" | "invalid_parameters" => {
            PlatformError::BadCredentials(message)
        }
        "rate_limit_error" => PlatformError::RateLimited(message),
        "login_required" => PlatformError::NotLoggedIn,
        _ => PlatformError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexPk {
    Number(u64),
    Text(String),
}

impl FlexPk {
    fn as_u64(&self) -> Option<u64> {
        match self {
            FlexPk::Number(n) => Some(*n),
            FlexPk::Text(s) => s.parse().ok(),
        }
    }

    fn into_string(self) -> String {
        match self {
            FlexPk::Number(n) => n.to_string(),
            FlexPk::Text(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    message: Option<String>,
    error_type: Option<String>,
    two_factor_required: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    logged_in_user: Option<serde_json::Value>,
    #[serde(flatten)]
    status: ApiStatus,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: UserRef,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    pk: FlexPk,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    did_delete: bool,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    items: Vec<FeedItem>,
    #[serde(default)]
    more_available: bool,
    next_max_id: Option<FlexPk>,
}

impl FeedResponse {
    fn into_page(self) -> Result<MediaPage> {
        let next_cursor = if self.more_available {
            self.next_max_id.map(FlexPk::into_string)
        } else {
            None
        };
        let items = self
            .items
            .into_iter()
            .filter_map(|item| match item.into_media_item() {
                Ok(media) => Some(media),
                Err(e) => {
                    warn!("Skipping feed item: {:#}", e);
                    None
                }
            })
            .collect();
        Ok(MediaPage { items, next_cursor })
    }
}

#[derive(Debug, Deserialize)]
struct MediaInfoResponse {
    #[serde(default)]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImageVersions {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct CarouselChild {
    media_type: u8,
    image_versions2: Option<ImageVersions>,
    video_versions: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    pk: FlexPk,
    id: String,
    taken_at: i64,
    media_type: u8,
    code: Option<String>,
    image_versions2: Option<ImageVersions>,
    video_versions: Option<Vec<Candidate>>,
    carousel_media: Option<Vec<CarouselChild>>,
}

impl FeedItem {
    fn into_media_item(self) -> Result<MediaItem> {
        let kind = MediaKind::from_code(self.media_type).ok_or_else(|| {
            PlatformError::InvalidResponse(format!("unknown media_type {}", self.media_type))
        })?;
        let taken_at = DateTime::<Utc>::from_timestamp(self.taken_at, 0).ok_or_else(|| {
            PlatformError::InvalidResponse(format!("invalid taken_at {}", self.taken_at))
        })?;
        Ok(MediaItem {
            pk: self.pk.into_string(),
            id: self.id,
            taken_at,
            kind,
            code: self.code,
        })
    }

    fn resources(&self) -> Vec<MediaResource> {
        match &self.carousel_media {
            Some(children) if self.media_type == 8 => children
                .iter()
                .filter_map(|child| {
                    best_resource(
                        child.media_type,
                        child.image_versions2.as_ref(),
                        child.video_versions.as_deref(),
                    )
                })
                .collect(),
            _ => best_resource(
                self.media_type,
                self.image_versions2.as_ref(),
                self.video_versions.as_deref(),
            )
            .into_iter()
            .collect(),
        }
    }
}

/// The platform lists candidates largest first.
fn best_resource(
    media_type: u8,
    images: Option<&ImageVersions>,
    videos: Option<&[Candidate]>,
) -> Option<MediaResource> {
    if media_type == 2 {
        if let Some(video) = videos.and_then(|v| v.first()) {
            return Some(MediaResource {
                url: video.url.clone(),
                extension: "mp4",
            });
        }
    }
    images
        .and_then(|i| i.candidates.first())
        .map(|image| MediaResource {
            url: image.url.clone(),
            extension: "jpg",
        })
}
