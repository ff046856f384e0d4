//! Shared constants for end-to-end tests
//!
//! When the fake catalog data changes, update only this file.

// ============================================================================
// Fake Catalog IDs
// ============================================================================

pub const ARTIST_ID: i64 = 100;
pub const ARTIST_NAME: &str = "Miles Davis";

pub const GENRE_ID: i64 = 10;
pub const GENRE_NAME: &str = "Jazz";

pub const LABEL_ID: i64 = 20;
pub const LABEL_NAME: &str = "Columbia";

pub const ALBUM_ID: &str = "kob-1959";
pub const ALBUM_TITLE: &str = "Kind of Blue";
/// 1959-08-17T00:00:00Z
pub const ALBUM_RELEASED_AT: i64 = -327_456_000;

pub const TRACK_1_ID: i64 = 11;
pub const TRACK_1_TITLE: &str = "So What";

pub const TRACK_2_ID: i64 = 12;
pub const TRACK_2_TITLE: &str = "Freddie Freeloader";

pub const COVER_URL: &str = "https://cdn.test/covers/kob-1959_600.jpg";

// ============================================================================
// Timeouts
// ============================================================================

/// Request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum time to wait for the server to start
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Maximum time to wait for background jobs to finish
pub const JOB_IDLE_TIMEOUT_MS: u64 = 10_000;
