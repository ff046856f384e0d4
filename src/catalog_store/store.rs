//! SQLite-backed catalog store.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::models::{
    Album, AlbumRelations, Artist, CatalogCounts, DownloadStatus, Genre, Label, Track,
};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use crate::sqlite_persistence::open_versioned_db;

const ALBUM_COLUMNS: &str =
    "id, external_id, artist_id, label_id, genre_id, upc, upload_status, download_status, data";
const TRACK_COLUMNS: &str =
    "id, external_id, album_id, isrc, folder_path, upload_status, download_status, data";

pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Opens (or creates) the catalog database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let (conn, _) = open_versioned_db(db_path.as_ref(), CATALOG_VERSIONED_SCHEMAS, "catalog")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory catalog with the latest schema.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        CATALOG_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn parse_status(value: String, column: usize) -> rusqlite::Result<DownloadStatus> {
        DownloadStatus::from_db_str(&value).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                format!("unknown status {}", value).into(),
            )
        })
    }

    fn parse_json<T: serde::de::DeserializeOwned>(
        value: &str,
        column: usize,
    ) -> rusqlite::Result<T> {
        serde_json::from_str(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn row_to_artist(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        let image: Option<String> = row.get(4)?;
        Ok(Artist {
            id: row.get(0)?,
            external_id: row.get(1)?,
            name: row.get(2)?,
            albums_count: row.get(3)?,
            image: image.map(|s| Self::parse_json(&s, 4)).transpose()?,
        })
    }

    fn row_to_genre(row: &rusqlite::Row) -> rusqlite::Result<Genre> {
        let path: String = row.get(4)?;
        Ok(Genre {
            id: row.get(0)?,
            external_id: row.get(1)?,
            name: row.get(2)?,
            color: row.get(3)?,
            path: Self::parse_json(&path, 4)?,
        })
    }

    fn row_to_label(row: &rusqlite::Row) -> rusqlite::Result<Label> {
        Ok(Label {
            id: row.get(0)?,
            external_id: row.get(1)?,
            name: row.get(2)?,
            albums_count: row.get(3)?,
        })
    }

    fn row_to_album(row: &rusqlite::Row) -> rusqlite::Result<Album> {
        let data: String = row.get(8)?;
        Ok(Album {
            id: row.get(0)?,
            external_id: row.get(1)?,
            artist_id: row.get(2)?,
            label_id: row.get(3)?,
            genre_id: row.get(4)?,
            upc: row.get(5)?,
            upload_status: Self::parse_status(row.get(6)?, 6)?,
            download_status: Self::parse_status(row.get(7)?, 7)?,
            data: Self::parse_json(&data, 8)?,
        })
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        let data: String = row.get(7)?;
        Ok(Track {
            id: row.get(0)?,
            external_id: row.get(1)?,
            album_id: row.get(2)?,
            isrc: row.get(3)?,
            folder_path: row.get(4)?,
            upload_status: Self::parse_status(row.get(5)?, 5)?,
            download_status: Self::parse_status(row.get(6)?, 6)?,
            data: Self::parse_json(&data, 7)?,
        })
    }

    fn count(conn: &Connection, table: &str) -> Result<usize> {
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get(0)
        })?;
        Ok(count as usize)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn find_artist_by_external_id(&self, external_id: i64) -> Result<Option<Artist>> {
        let conn = self.conn.lock().unwrap();
        let artist = conn
            .query_row(
                "SELECT id, external_id, name, albums_count, image FROM artists WHERE external_id = ?1",
                params![external_id],
                Self::row_to_artist,
            )
            .optional()?;
        Ok(artist)
    }

    fn insert_artist(&self, artist: &Artist) -> Result<()> {
        let image = artist.image.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (id, external_id, name, albums_count, image) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![artist.id, artist.external_id, artist.name, artist.albums_count, image],
        )
        .with_context(|| format!("Failed to insert artist {}", artist.external_id))?;
        Ok(())
    }

    fn update_artist(&self, artist: &Artist) -> Result<()> {
        let image = artist.image.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE artists SET name = ?1, albums_count = ?2, image = ?3,
             updated_at = cast(strftime('%s','now') as int) WHERE id = ?4",
            params![artist.name, artist.albums_count, image, artist.id],
        )?;
        Ok(())
    }

    fn find_genre_by_external_id(&self, external_id: i64) -> Result<Option<Genre>> {
        let conn = self.conn.lock().unwrap();
        let genre = conn
            .query_row(
                "SELECT id, external_id, name, color, path FROM genres WHERE external_id = ?1",
                params![external_id],
                Self::row_to_genre,
            )
            .optional()?;
        Ok(genre)
    }

    fn insert_genre(&self, genre: &Genre) -> Result<()> {
        let path = serde_json::to_string(&genre.path)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO genres (id, external_id, name, color, path) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![genre.id, genre.external_id, genre.name, genre.color, path],
        )
        .with_context(|| format!("Failed to insert genre {}", genre.external_id))?;
        Ok(())
    }

    fn update_genre(&self, genre: &Genre) -> Result<()> {
        let path = serde_json::to_string(&genre.path)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE genres SET name = ?1, color = ?2, path = ?3,
             updated_at = cast(strftime('%s','now') as int) WHERE id = ?4",
            params![genre.name, genre.color, path, genre.id],
        )?;
        Ok(())
    }

    fn find_label_by_external_id(&self, external_id: i64) -> Result<Option<Label>> {
        let conn = self.conn.lock().unwrap();
        let label = conn
            .query_row(
                "SELECT id, external_id, name, albums_count FROM labels WHERE external_id = ?1",
                params![external_id],
                Self::row_to_label,
            )
            .optional()?;
        Ok(label)
    }

    fn insert_label(&self, label: &Label) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO labels (id, external_id, name, albums_count) VALUES (?1, ?2, ?3, ?4)",
            params![label.id, label.external_id, label.name, label.albums_count],
        )
        .with_context(|| format!("Failed to insert label {}", label.external_id))?;
        Ok(())
    }

    fn update_label(&self, label: &Label) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE labels SET name = ?1, albums_count = ?2,
             updated_at = cast(strftime('%s','now') as int) WHERE id = ?3",
            params![label.name, label.albums_count, label.id],
        )?;
        Ok(())
    }

    fn get_album(&self, id: &str) -> Result<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        let album = conn
            .query_row(
                &format!("SELECT {} FROM albums WHERE id = ?1", ALBUM_COLUMNS),
                params![id],
                Self::row_to_album,
            )
            .optional()?;
        Ok(album)
    }

    fn find_album_by_external_id(&self, external_id: &str) -> Result<Option<Album>> {
        let conn = self.conn.lock().unwrap();
        let album = conn
            .query_row(
                &format!("SELECT {} FROM albums WHERE external_id = ?1", ALBUM_COLUMNS),
                params![external_id],
                Self::row_to_album,
            )
            .optional()?;
        Ok(album)
    }

    fn insert_album(&self, album: &Album) -> Result<()> {
        let data = serde_json::to_string(&album.data)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO albums ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                ALBUM_COLUMNS
            ),
            params![
                album.id,
                album.external_id,
                album.artist_id,
                album.label_id,
                album.genre_id,
                album.upc,
                album.upload_status.as_db_str(),
                album.download_status.as_db_str(),
                data,
            ],
        )
        .with_context(|| format!("Failed to insert album {}", album.external_id))?;
        Ok(())
    }

    fn update_album_data(&self, album: &Album) -> Result<()> {
        let data = serde_json::to_string(&album.data)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE albums SET data = ?1, updated_at = cast(strftime('%s','now') as int) WHERE id = ?2",
            params![data, album.id],
        )?;
        Ok(())
    }

    fn list_albums_by_download_status(
        &self,
        status: DownloadStatus,
        limit: usize,
    ) -> Result<Vec<Album>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM albums WHERE download_status = ?1
             ORDER BY EXISTS (SELECT 1 FROM tracks t WHERE t.album_id = albums.id) DESC, rowid
             LIMIT ?2",
            ALBUM_COLUMNS
        ))?;
        let albums = stmt
            .query_map(params![status.as_db_str(), limit as i64], Self::row_to_album)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    fn get_album_relations(&self, album_id: &str) -> Result<AlbumRelations> {
        let conn = self.conn.lock().unwrap();
        let relations = conn
            .query_row(
                "SELECT ar.name, g.name FROM albums a
                 LEFT JOIN artists ar ON ar.id = a.artist_id
                 LEFT JOIN genres g ON g.id = a.genre_id
                 WHERE a.id = ?1",
                params![album_id],
                |row| {
                    Ok(AlbumRelations {
                        artist_name: row.get(0)?,
                        genre_name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        relations.with_context(|| format!("Album {} not found", album_id))
    }

    fn set_album_download_status(&self, album_id: &str, status: DownloadStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE albums SET download_status = ?1, updated_at = cast(strftime('%s','now') as int)
             WHERE id = ?2",
            params![status.as_db_str(), album_id],
        )?;
        if updated == 0 {
            anyhow::bail!("Album {} not found", album_id);
        }
        Ok(())
    }

    fn find_track_by_external_id(&self, external_id: i64) -> Result<Option<Track>> {
        let conn = self.conn.lock().unwrap();
        let track = conn
            .query_row(
                &format!("SELECT {} FROM tracks WHERE external_id = ?1", TRACK_COLUMNS),
                params![external_id],
                Self::row_to_track,
            )
            .optional()?;
        Ok(track)
    }

    fn insert_track(&self, track: &Track) -> Result<()> {
        let data = serde_json::to_string(&track.data)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO tracks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                TRACK_COLUMNS
            ),
            params![
                track.id,
                track.external_id,
                track.album_id,
                track.isrc,
                track.folder_path,
                track.upload_status.as_db_str(),
                track.download_status.as_db_str(),
                data,
            ],
        )
        .with_context(|| format!("Failed to insert track {}", track.external_id))?;
        Ok(())
    }

    fn update_track_data(&self, track: &Track) -> Result<()> {
        let data = serde_json::to_string(&track.data)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE tracks SET data = ?1, isrc = ?2, updated_at = cast(strftime('%s','now') as int)
             WHERE id = ?3",
            params![data, track.isrc, track.id],
        )?;
        Ok(())
    }

    fn list_tracks_by_download_status(
        &self,
        status: DownloadStatus,
        limit: Option<usize>,
    ) -> Result<Vec<Track>> {
        // A negative LIMIT means no limit in SQLite
        let limit = limit.map_or(-1, |n| n as i64);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tracks WHERE download_status = ?1 ORDER BY rowid LIMIT ?2",
            TRACK_COLUMNS
        ))?;
        let tracks = stmt
            .query_map(params![status.as_db_str(), limit], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn list_album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tracks WHERE album_id = ?1
             ORDER BY json_extract(data, '$.media_number'), json_extract(data, '$.track_number'), rowid",
            TRACK_COLUMNS
        ))?;
        let tracks = stmt
            .query_map(params![album_id], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn set_track_download_status(&self, track_id: &str, status: DownloadStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tracks SET download_status = ?1, updated_at = cast(strftime('%s','now') as int)
             WHERE id = ?2",
            params![status.as_db_str(), track_id],
        )?;
        if updated == 0 {
            anyhow::bail!("Track {} not found", track_id);
        }
        Ok(())
    }

    fn set_track_folder_path(&self, track_id: &str, folder_path: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE tracks SET folder_path = ?1 WHERE id = ?2",
            params![folder_path, track_id],
        )?;
        Ok(())
    }

    fn get_counts(&self) -> Result<CatalogCounts> {
        let conn = self.conn.lock().unwrap();
        Ok(CatalogCounts {
            artists: Self::count(&conn, "artists")?,
            genres: Self::count(&conn, "genres")?,
            labels: Self::count(&conn, "labels")?,
            albums: Self::count(&conn, "albums")?,
            tracks: Self::count(&conn, "tracks")?,
        })
    }
}
