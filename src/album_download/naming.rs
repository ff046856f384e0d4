//! Folder and file naming for downloaded albums.

use chrono::{DateTime, Datelike};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::catalog_api::AlbumImage;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown Genre";
pub const UNKNOWN_RELEASE_YEAR: &str = "Unknown Release Year";
pub const COVER_FILE_NAME: &str = "cover.jpg";

lazy_static! {
    static ref ILLEGAL_CHARS: Regex = Regex::new(r#"[\x00-\x1f\x7f"/\\<>:|?*]"#).unwrap();
    static ref WHITESPACE_RUNS: Regex = Regex::new(r"\s+").unwrap();
}

/// Makes `name` safe to use as a single path component.
///
/// Control characters, double quotes, slashes and `<>:|?*` are removed, runs
/// of whitespace collapse to one space and the result is trimmed.
pub fn sanitize(name: &str) -> String {
    let stripped = ILLEGAL_CHARS.replace_all(name, "");
    WHITESPACE_RUNS
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Falls back to `placeholder` when nothing usable is left, dot-only names
/// included since `.` and `..` would escape the parent directory.
fn sanitize_or(name: Option<&str>, placeholder: &str) -> String {
    name.map(sanitize)
        .filter(|s| !s.chars().all(|c| c == '.'))
        .unwrap_or_else(|| placeholder.to_string())
}

/// UTC year of a unix timestamp in seconds.
pub fn release_year(released_at: Option<i64>) -> Option<i32> {
    released_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.year())
}

/// `<root>/<artist>/<title> --- <genre> --- <year>`
pub fn album_folder(
    root: &Path,
    artist_name: Option<&str>,
    album_title: Option<&str>,
    genre_name: Option<&str>,
    released_at: Option<i64>,
) -> PathBuf {
    let year = release_year(released_at).map(|y| y.to_string());
    let folder_title = format!(
        "{} --- {} --- {}",
        sanitize_or(album_title, UNKNOWN_ALBUM),
        sanitize_or(genre_name, UNKNOWN_GENRE),
        sanitize_or(year.as_deref(), UNKNOWN_RELEASE_YEAR)
    );
    root.join(sanitize_or(artist_name, UNKNOWN_ARTIST))
        .join(folder_title)
}

/// Picks the cover URL. Later fields override earlier ones in the order
/// large, thumbnail, small, back.
pub fn cover_url(image: &AlbumImage) -> Option<&str> {
    [&image.large, &image.thumbnail, &image.small, &image.back]
        .into_iter()
        .filter_map(|url| url.as_deref())
        .filter(|url| !url.is_empty())
        .last()
}

/// `<n> - <title>.flac`, `n` being the 1-based position in the album listing.
pub fn track_file_name(position: usize, title: Option<&str>, external_id: i64) -> String {
    format!("{} - {}", position, loose_track_file_name(title, external_id))
}

/// `<title>.flac`, for tracks downloaded outside of an album run.
pub fn loose_track_file_name(title: Option<&str>, external_id: i64) -> String {
    let fallback = format!("Track_{}", external_id);
    format!("{}.flac", sanitize_or(title, &fallback))
}
