//! Models for the external catalog API responses.
//!
//! These types match the JSON structure returned by the catalog service.
//! Fields the pipeline does not interpret are kept in `extra` so that stored
//! payloads stay lossless.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Pagination
// =============================================================================

/// One page of a paginated listing.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ItemPage<T> {
    pub items: Vec<T>,
    pub offset: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Default for ItemPage<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            offset: 0,
            limit: 0,
            total: 0,
        }
    }
}

impl<T> ItemPage<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            limit: items.len() as u32,
            items,
            offset: 0,
            total,
        }
    }
}

/// Result of a keyword search.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchResults {
    pub query: Option<String>,
    pub artists: ItemPage<ArtistRecord>,
    pub genres: ItemPage<GenreRecord>,
    pub labels: ItemPage<LabelRecord>,
    pub albums: ItemPage<AlbumRecord>,
    pub tracks: ItemPage<TrackRecord>,
}

// =============================================================================
// Artists, genres, labels
// =============================================================================

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ArtistImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extralarge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mega: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ArtistRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albums_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ArtistImage>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GenreRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub path: Vec<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LabelRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albums_count: Option<i64>,
}

// =============================================================================
// Albums
// =============================================================================

/// Cover art URLs at the resolutions the catalog publishes.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AlbumImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
}

/// An album as returned by search (stub) or by the detail endpoint (with `tracks`).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AlbumRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qobuz_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<AlbumImage>,
    /// Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date_original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_bit_depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_sampling_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<ArtistRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<GenreRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelRecord>,
    /// Present only on album detail responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<ItemPage<TrackRecord>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AlbumRecord {
    pub fn artist_name(&self) -> Option<&str> {
        self.artist.as_ref().map(|a| a.name.as_str())
    }

    /// Returns a copy of this record without its track listing.
    pub fn without_tracks(&self) -> AlbumRecord {
        AlbumRecord {
            tracks: None,
            ..self.clone()
        }
    }

    pub fn track_items(&self) -> &[TrackRecord] {
        self.tracks
            .as_ref()
            .map(|page| page.items.as_slice())
            .unwrap_or_default()
    }
}

// =============================================================================
// Tracks
// =============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Performer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TrackRecord {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer: Option<Performer>,
    /// Present on standalone search results, absent inside an album detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<Box<AlbumRecord>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackRecord {
    pub fn without_album(&self) -> TrackRecord {
        TrackRecord {
            album: None,
            ..self.clone()
        }
    }
}

// =============================================================================
// Download URLs
// =============================================================================

/// Audio format requested from the file URL endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DownloadQuality {
    /// FLAC up to 24 bit / 192 kHz.
    #[default]
    #[serde(rename = "27")]
    HiRes192,
    /// FLAC up to 24 bit / 96 kHz.
    #[serde(rename = "7")]
    HiRes96,
    /// FLAC 16 bit / 44.1 kHz.
    #[serde(rename = "6")]
    Lossless,
    #[serde(rename = "5")]
    Mp3,
}

impl DownloadQuality {
    pub fn format_id(&self) -> &'static str {
        match self {
            DownloadQuality::HiRes192 => "27",
            DownloadQuality::HiRes96 => "7",
            DownloadQuality::Lossless => "6",
            DownloadQuality::Mp3 => "5",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "27" => Some(DownloadQuality::HiRes192),
            "7" => Some(DownloadQuality::HiRes96),
            "6" => Some(DownloadQuality::Lossless),
            "5" => Some(DownloadQuality::Mp3),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.format_id())
    }
}

/// Response of the file URL endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileUrlResponse {
    pub url: Option<String>,
    pub format_id: Option<i64>,
    pub mime_type: Option<String>,
    pub bit_depth: Option<i64>,
    pub sampling_rate: Option<f64>,
}
