use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Album,
}

impl MediaKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(MediaKind::Photo),
            2 => Some(MediaKind::Video),
            8 => Some(MediaKind::Album),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Album => "album",
        }
    }
}

/// A single posted item as listed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Primary key, used for downloads and as the stable display identifier.
    pub pk: String,
    /// Full media id (`{pk}_{owner_id}`), required by the delete endpoint.
    pub id: String,
    pub taken_at: DateTime<Utc>,
    pub kind: MediaKind,
    /// Shortcode from the public permalink, when the platform returns one.
    pub code: Option<String>,
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pk={} {} taken_at={}",
            self.pk,
            self.kind.as_str(),
            self.taken_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        if let Some(code) = &self.code {
            write!(f, " code={}", code)?;
        }
        Ok(())
    }
}

/// One downloadable file belonging to a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResource {
    pub url: String,
    pub extension: &'static str,
}
