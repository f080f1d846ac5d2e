//! Pure mapping from one source record to graph descriptors.
//!
//! No store access happens here. A record either maps to a
//! [`MappedRecord`] or fails with a [`MapError`]; the coordinator records
//! the failure and moves on.

use thiserror::Error;

use crate::model::{EdgeSpec, Label, MappedRecord, NodeRef, NodeSpec, PropValue, RelType};
use crate::source::SourceRecord;

/// Field names of the source format. These are the contract between the
/// CSV export and the mapper.
pub mod fields {
    /// Radio station id (required identity).
    pub const RADIO_ID: &str = "RADIO_ID";
    /// Radio station display name.
    pub const RADIO_NAME: &str = "RADIO_NAME";
    /// Radio station genre.
    pub const RADIO_GENRE: &str = "RADIO_GENRE";
    /// Radio market; defaults to `"Unknown"` when absent.
    pub const RADIO_MARKET: &str = "RADIO_MARKET";
    /// Radio city.
    pub const RADIO_CITY: &str = "RADIO_CITY";
    /// Radio country code.
    pub const RADIO_CC: &str = "RADIO_CC";
    /// Track ISRC code (required identity).
    pub const ISRC: &str = "ISRC";
    /// Track display name.
    pub const TRACK_NAME: &str = "TRACK_NAME";
    /// Album name; blank means the track has no album edge.
    pub const ALBUM_NAME: &str = "ALBUM_NAME";
    /// Playlist count, integer when present.
    pub const SPOTIFY_PLAYLIST_COUNT: &str = "SPOTIFY_PLAYLIST_COUNT";
    /// Track genres, JSON string array.
    pub const GENRES: &str = "GENRES";
    /// Artist ids for the track, JSON string array.
    pub const SPOTIFY_ARTIST_IDS: &str = "SPOTIFY_ARTIST_IDS";
    /// Artist display name.
    pub const ARTIST_NAME: &str = "ARTIST_NAME";
    /// Artist code.
    pub const ARTIST_CODE: &str = "ARTIST_CODE";
    /// Source-system artist label.
    pub const CM_ARTIST: &str = "CM_ARTIST";
    /// Artist genres, JSON string array.
    pub const ARTIST_GENRE: &str = "ARTIST_GENRE";
    /// Related artist ids, JSON string array.
    pub const SPOTIFY_RELATED_ARTISTS_IDS: &str = "SPOTIFY_RELATED_ARTISTS_IDS";
}

/// Market value used when `RADIO_MARKET` is absent or blank.
pub const DEFAULT_MARKET: &str = "Unknown";

/// Why a record could not be mapped. The record is skipped; the run
/// continues.
#[derive(Debug, Error)]
pub enum MapError {
    /// A required identity field is absent or blank.
    #[error("missing required field {0}")]
    MissingField(&'static str),
    /// A numeric field holds a non-integer value.
    #[error("field {field} is not an integer: {value:?}")]
    BadInteger {
        /// Offending field name.
        field: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
    /// A list field is not a JSON string array.
    #[error("field {field} is not a JSON string list: {source}")]
    BadList {
        /// Offending field name.
        field: &'static str,
        /// Decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// A list field contains a blank element, which cannot serve as an
    /// identity key.
    #[error("field {field} contains a blank entry")]
    BlankListEntry {
        /// Offending field name.
        field: &'static str,
    },
}

/// Maps one source record to the nodes and edges it materializes.
///
/// Shape per record: one Radio, one Track, one Artist per listed artist
/// id, one Album when the album name is non-blank, one Genre per listed
/// genre, and one bare Artist per related-artist id. Edges: `PLAYS`,
/// `COMPOSED_BY` per artist, `PART_OF` when the album exists, `RELATED_TO`
/// from every listed artist to every related id, `HAS_GENRE` per genre.
pub fn map_record(record: &SourceRecord) -> std::result::Result<MappedRecord, MapError> {
    let radio_id = record
        .get_nonblank(fields::RADIO_ID)
        .ok_or(MapError::MissingField(fields::RADIO_ID))?;
    let isrc = record
        .get_nonblank(fields::ISRC)
        .ok_or(MapError::MissingField(fields::ISRC))?;

    let genres = decode_list(record, fields::GENRES)?;
    let artist_ids = decode_list(record, fields::SPOTIFY_ARTIST_IDS)?;
    let artist_genres = decode_list(record, fields::ARTIST_GENRE)?;
    let related_ids = decode_list(record, fields::SPOTIFY_RELATED_ARTISTS_IDS)?;
    let playlist_count = parse_optional_int(record, fields::SPOTIFY_PLAYLIST_COUNT)?;
    let album_name = record.get_nonblank(fields::ALBUM_NAME);

    let mut mapped = MappedRecord::default();

    let mut radio_props = Vec::new();
    push_str(&mut radio_props, "name", record.get_nonblank(fields::RADIO_NAME));
    push_str(&mut radio_props, "genre", record.get_nonblank(fields::RADIO_GENRE));
    radio_props.push((
        "market",
        PropValue::Str(
            record
                .get_nonblank(fields::RADIO_MARKET)
                .unwrap_or(DEFAULT_MARKET)
                .to_string(),
        ),
    ));
    push_str(&mut radio_props, "city", record.get_nonblank(fields::RADIO_CITY));
    push_str(&mut radio_props, "countryCode", record.get_nonblank(fields::RADIO_CC));
    mapped.nodes.push(NodeSpec {
        label: Label::Radio,
        key: radio_id.to_string(),
        props: radio_props,
    });

    let mut track_props = Vec::new();
    push_str(&mut track_props, "name", record.get_nonblank(fields::TRACK_NAME));
    push_str(&mut track_props, "albumName", album_name);
    if let Some(count) = playlist_count {
        track_props.push(("spotifyPlaylistCount", PropValue::Int(count)));
    }
    if !genres.is_empty() {
        track_props.push(("genres", PropValue::List(genres.clone())));
    }
    mapped.nodes.push(NodeSpec {
        label: Label::Track,
        key: isrc.to_string(),
        props: track_props,
    });

    mapped.edges.push(EdgeSpec::new(
        NodeRef::new(Label::Radio, radio_id),
        RelType::Plays,
        NodeRef::new(Label::Track, isrc),
    ));

    for artist_id in &artist_ids {
        let mut props = Vec::new();
        push_str(&mut props, "name", record.get_nonblank(fields::ARTIST_NAME));
        push_str(&mut props, "code", record.get_nonblank(fields::ARTIST_CODE));
        push_str(&mut props, "cmArtist", record.get_nonblank(fields::CM_ARTIST));
        if !artist_genres.is_empty() {
            props.push(("genre", PropValue::List(artist_genres.clone())));
        }
        mapped.nodes.push(NodeSpec {
            label: Label::Artist,
            key: artist_id.clone(),
            props,
        });
        mapped.edges.push(EdgeSpec::new(
            NodeRef::new(Label::Track, isrc),
            RelType::ComposedBy,
            NodeRef::new(Label::Artist, artist_id.clone()),
        ));
    }

    if let Some(album) = album_name {
        mapped.nodes.push(NodeSpec::bare(Label::Album, album));
        mapped.edges.push(EdgeSpec::new(
            NodeRef::new(Label::Track, isrc),
            RelType::PartOf,
            NodeRef::new(Label::Album, album),
        ));
    }

    for related_id in &related_ids {
        mapped
            .nodes
            .push(NodeSpec::bare(Label::Artist, related_id.clone()));
        for artist_id in &artist_ids {
            mapped.edges.push(EdgeSpec::new(
                NodeRef::new(Label::Artist, artist_id.clone()),
                RelType::RelatedTo,
                NodeRef::new(Label::Artist, related_id.clone()),
            ));
        }
    }

    for genre in &genres {
        mapped.nodes.push(NodeSpec::bare(Label::Genre, genre.clone()));
        mapped.edges.push(EdgeSpec::new(
            NodeRef::new(Label::Track, isrc),
            RelType::HasGenre,
            NodeRef::new(Label::Genre, genre.clone()),
        ));
    }

    Ok(mapped)
}

fn push_str(props: &mut Vec<(&'static str, PropValue)>, name: &'static str, value: Option<&str>) {
    if let Some(value) = value {
        props.push((name, PropValue::Str(value.to_string())));
    }
}

/// Decodes a JSON string-array field. Absent or blank fields decode to
/// the empty list.
fn decode_list(
    record: &SourceRecord,
    field: &'static str,
) -> std::result::Result<Vec<String>, MapError> {
    let raw = match record.get_nonblank(field) {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };
    let items: Vec<String> =
        serde_json::from_str(raw).map_err(|source| MapError::BadList { field, source })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            return Err(MapError::BlankListEntry { field });
        }
        out.push(trimmed.to_string());
    }
    Ok(out)
}

fn parse_optional_int(
    record: &SourceRecord,
    field: &'static str,
) -> std::result::Result<Option<i64>, MapError> {
    match record.get_nonblank(field) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| MapError::BadInteger {
                field,
                value: raw.to_string(),
            }),
    }
}
