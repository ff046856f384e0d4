//! Create-or-update resolution of external catalog records into entities.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::catalog_api::{AlbumRecord, ArtistRecord, GenreRecord, LabelRecord, TrackRecord};
use crate::catalog_store::{
    Album, Artist, CatalogStore, DownloadStatus, Genre, Label, Track,
};

/// Outcome of resolving one external record.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Created(T),
    Updated(T),
    /// The record was deliberately ignored (compilation artists).
    Skipped,
}

impl<T> Resolution<T> {
    pub fn entity(&self) -> Option<&T> {
        match self {
            Resolution::Created(e) | Resolution::Updated(e) => Some(e),
            Resolution::Skipped => None,
        }
    }

    pub fn into_entity(self) -> Option<T> {
        match self {
            Resolution::Created(e) | Resolution::Updated(e) => Some(e),
            Resolution::Skipped => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Internal ids of the entities an album refers to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumRefs {
    pub artist_id: Option<String>,
    pub genre_id: Option<String>,
    pub label_id: Option<String>,
}

/// Compilation pseudo-artists ("Various Artists" and spelling variants).
pub fn is_various_artists(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.contains("various") && lowered.contains("artists")
}

fn new_internal_id() -> String {
    Uuid::now_v7().to_string()
}

/// Counters keep the stored value unless the incoming one is a positive number.
fn merge_count(incoming: Option<i64>, existing: i64) -> i64 {
    match incoming {
        Some(count) if count > 0 => count,
        _ => existing,
    }
}

/// Maps external records onto the entity graph, keyed by external id.
///
/// Each call performs exactly one lookup and one insert or update.
#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn CatalogStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn resolve_artist(&self, record: &ArtistRecord) -> Result<Resolution<Artist>> {
        if is_various_artists(&record.name) {
            debug!("Skipping compilation artist '{}'", record.name);
            return Ok(Resolution::Skipped);
        }

        match self.store.find_artist_by_external_id(record.id)? {
            None => {
                let artist = Artist {
                    id: new_internal_id(),
                    external_id: record.id,
                    name: record.name.clone(),
                    albums_count: record.albums_count.unwrap_or(0),
                    image: record.image.clone(),
                };
                self.store.insert_artist(&artist)?;
                Ok(Resolution::Created(artist))
            }
            Some(existing) => {
                let artist = Artist {
                    name: record.name.clone(),
                    albums_count: merge_count(record.albums_count, existing.albums_count),
                    image: record.image.clone().or(existing.image),
                    ..existing
                };
                self.store.update_artist(&artist)?;
                Ok(Resolution::Updated(artist))
            }
        }
    }

    pub fn resolve_genre(&self, record: &GenreRecord) -> Result<Resolution<Genre>> {
        match self.store.find_genre_by_external_id(record.id)? {
            None => {
                let genre = Genre {
                    id: new_internal_id(),
                    external_id: record.id,
                    name: record.name.clone(),
                    color: record.color.clone(),
                    path: record.path.clone(),
                };
                self.store.insert_genre(&genre)?;
                Ok(Resolution::Created(genre))
            }
            Some(existing) => {
                let genre = Genre {
                    name: record.name.clone(),
                    color: record.color.clone(),
                    path: record.path.clone(),
                    ..existing
                };
                self.store.update_genre(&genre)?;
                Ok(Resolution::Updated(genre))
            }
        }
    }

    pub fn resolve_label(&self, record: &LabelRecord) -> Result<Resolution<Label>> {
        match self.store.find_label_by_external_id(record.id)? {
            None => {
                let label = Label {
                    id: new_internal_id(),
                    external_id: record.id,
                    name: record.name.clone(),
                    albums_count: record.albums_count.unwrap_or(0),
                };
                self.store.insert_label(&label)?;
                Ok(Resolution::Created(label))
            }
            Some(existing) => {
                let label = Label {
                    name: record.name.clone(),
                    albums_count: merge_count(record.albums_count, existing.albums_count),
                    ..existing
                };
                self.store.update_label(&label)?;
                Ok(Resolution::Updated(label))
            }
        }
    }

    /// Upserts an album from its detail (when available) or its stub.
    ///
    /// The stored payload never includes the track listing.
    pub fn resolve_album(
        &self,
        stub: &AlbumRecord,
        detail: Option<&AlbumRecord>,
        refs: AlbumRefs,
    ) -> Result<Resolution<Album>> {
        let source = detail.unwrap_or(stub);
        let data = source.without_tracks();

        match self.store.find_album_by_external_id(&stub.id)? {
            None => {
                let album = Album {
                    id: new_internal_id(),
                    external_id: stub.id.clone(),
                    artist_id: refs.artist_id,
                    label_id: refs.label_id,
                    genre_id: refs.genre_id,
                    upc: source.upc.clone(),
                    upload_status: DownloadStatus::Pending,
                    download_status: DownloadStatus::Pending,
                    data,
                };
                self.store.insert_album(&album)?;
                Ok(Resolution::Created(album))
            }
            Some(existing) => {
                let album = Album { data, ..existing };
                self.store.update_album_data(&album)?;
                Ok(Resolution::Updated(album))
            }
        }
    }

    /// Upserts a track under the album with internal id `album_id`.
    pub fn resolve_track(&self, record: &TrackRecord, album_id: &str) -> Result<Resolution<Track>> {
        let data = record.without_album();

        match self.store.find_track_by_external_id(record.id)? {
            None => {
                let track = Track {
                    id: new_internal_id(),
                    external_id: record.id,
                    album_id: album_id.to_string(),
                    isrc: record.isrc.clone(),
                    folder_path: None,
                    upload_status: DownloadStatus::Pending,
                    download_status: DownloadStatus::Pending,
                    data,
                };
                self.store.insert_track(&track)?;
                Ok(Resolution::Created(track))
            }
            Some(existing) => {
                let track = Track {
                    isrc: record.isrc.clone().or(existing.isrc.clone()),
                    data,
                    ..existing
                };
                self.store.update_track_data(&track)?;
                Ok(Resolution::Updated(track))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_api::ArtistImage;
    use crate::catalog_store::SqliteCatalogStore;

    fn make_resolver() -> (EntityResolver, Arc<SqliteCatalogStore>) {
        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        (EntityResolver::new(store.clone()), store)
    }

    fn artist_record(id: i64, name: &str, albums_count: Option<i64>) -> ArtistRecord {
        ArtistRecord {
            id,
            name: name.to_string(),
            albums_count,
            image: None,
        }
    }

    fn track_record(id: i64, isrc: Option<&str>) -> TrackRecord {
        TrackRecord {
            id,
            title: Some(format!("Track {}", id)),
            version: None,
            track_number: Some(1),
            media_number: Some(1),
            duration: Some(180),
            isrc: isrc.map(str::to_string),
            performer: None,
            album: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_various_artists_detection() {
        assert!(is_various_artists("Various Artists"));
        assert!(is_various_artists("VARIOUS ARTISTS"));
        assert!(is_various_artists("Artists, Various"));
        assert!(!is_various_artists("Various Production"));
        assert!(!is_various_artists("Arctic Monkeys"));
    }

    #[test]
    fn test_resolving_twice_creates_then_updates() {
        let (resolver, store) = make_resolver();
        let record = artist_record(42, "Miles Davis", Some(300));

        let first = resolver.resolve_artist(&record).unwrap();
        let second = resolver.resolve_artist(&record).unwrap();

        assert!(first.is_created());
        assert!(matches!(second, Resolution::Updated(_)));
        assert_eq!(first.entity().unwrap().id, second.entity().unwrap().id);
        assert_eq!(store.get_counts().unwrap().artists, 1);
    }

    #[test]
    fn test_various_artists_never_touch_the_store() {
        let (resolver, store) = make_resolver();
        let result = resolver
            .resolve_artist(&artist_record(1, "Various Artists", Some(5)))
            .unwrap();

        assert_eq!(result, Resolution::Skipped);
        assert!(store.find_artist_by_external_id(1).unwrap().is_none());
    }

    #[test]
    fn test_artist_update_keeps_existing_values_when_absent() {
        let (resolver, store) = make_resolver();
        let image = ArtistImage {
            large: Some("https://img/large.jpg".to_string()),
            ..Default::default()
        };
        resolver
            .resolve_artist(&ArtistRecord {
                image: Some(image.clone()),
                ..artist_record(7, "Nina Simone", Some(80))
            })
            .unwrap();

        resolver
            .resolve_artist(&artist_record(7, "Nina Simone (Live)", None))
            .unwrap();

        let stored = store.find_artist_by_external_id(7).unwrap().unwrap();
        assert_eq!(stored.name, "Nina Simone (Live)");
        assert_eq!(stored.albums_count, 80);
        assert_eq!(stored.image, Some(image));
    }

    #[test]
    fn test_new_artist_defaults_count_to_zero() {
        let (resolver, _) = make_resolver();
        let artist = resolver
            .resolve_artist(&artist_record(3, "Unknown", None))
            .unwrap()
            .into_entity()
            .unwrap();
        assert_eq!(artist.albums_count, 0);
        assert!(artist.image.is_none());
    }

    #[test]
    fn test_label_update_keeps_count() {
        let (resolver, store) = make_resolver();
        resolver
            .resolve_label(&LabelRecord {
                id: 9,
                name: "Blue Note".to_string(),
                albums_count: Some(1200),
            })
            .unwrap();
        resolver
            .resolve_label(&LabelRecord {
                id: 9,
                name: "Blue Note Records".to_string(),
                albums_count: Some(0),
            })
            .unwrap();

        let label = store.find_label_by_external_id(9).unwrap().unwrap();
        assert_eq!(label.name, "Blue Note Records");
        assert_eq!(label.albums_count, 1200);
    }

    #[test]
    fn test_genre_update_overwrites_fields() {
        let (resolver, store) = make_resolver();
        let mut record = GenreRecord {
            id: 80,
            name: "Jazz".to_string(),
            color: Some("#0070ef".to_string()),
            path: vec![80],
        };
        resolver.resolve_genre(&record).unwrap();
        record.color = None;
        record.path = vec![1, 80];
        resolver.resolve_genre(&record).unwrap();

        let genre = store.find_genre_by_external_id(80).unwrap().unwrap();
        assert_eq!(genre.color, None);
        assert_eq!(genre.path, vec![1, 80]);
    }

    #[test]
    fn test_album_update_replaces_payload_only() {
        let (resolver, store) = make_resolver();
        let stub = AlbumRecord {
            id: "alb-1".to_string(),
            title: Some("Stub title".to_string()),
            upc: Some("0001".to_string()),
            ..Default::default()
        };
        let created = resolver
            .resolve_album(
                &stub,
                None,
                AlbumRefs {
                    artist_id: None,
                    genre_id: None,
                    label_id: None,
                },
            )
            .unwrap()
            .into_entity()
            .unwrap();
        store
            .set_album_download_status(&created.id, DownloadStatus::Success)
            .unwrap();

        let detail = AlbumRecord {
            title: Some("Detailed title".to_string()),
            tracks: Some(crate::catalog_api::ItemPage::from_items(vec![track_record(1, None)])),
            ..stub.clone()
        };
        let updated = resolver
            .resolve_album(&stub, Some(&detail), AlbumRefs::default())
            .unwrap();
        assert!(matches!(updated, Resolution::Updated(_)));

        let stored = store.find_album_by_external_id("alb-1").unwrap().unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.title(), Some("Detailed title"));
        assert!(stored.data.tracks.is_none());
        assert_eq!(stored.download_status, DownloadStatus::Success);
        assert_eq!(stored.upc.as_deref(), Some("0001"));
    }

    #[test]
    fn test_track_upsert_keyed_by_external_id() {
        let (resolver, store) = make_resolver();
        let album = resolver
            .resolve_album(
                &AlbumRecord {
                    id: "alb-1".to_string(),
                    ..Default::default()
                },
                None,
                AlbumRefs::default(),
            )
            .unwrap()
            .into_entity()
            .unwrap();

        let first = resolver
            .resolve_track(&track_record(100, Some("USRC17607839")), &album.id)
            .unwrap();
        let second = resolver
            .resolve_track(&track_record(100, None), &album.id)
            .unwrap();

        assert!(first.is_created());
        assert!(matches!(second, Resolution::Updated(_)));
        let stored = store.find_track_by_external_id(100).unwrap().unwrap();
        assert_eq!(stored.isrc.as_deref(), Some("USRC17607839"));
        assert_eq!(stored.album_id, album.id);
        assert_eq!(store.get_counts().unwrap().tracks, 1);
    }
}
