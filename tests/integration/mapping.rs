//! End-to-end mapping: CSV file through the record source and mapper,
//! no store involved.

use std::io::Write;

use radiograph::mapper::{map_record, MapError};
use radiograph::model::{Label, RelType};
use radiograph::source::CsvSource;

const HEADER: &str = "RADIO_ID,RADIO_NAME,RADIO_MARKET,ISRC,TRACK_NAME,ALBUM_NAME,\
SPOTIFY_PLAYLIST_COUNT,GENRES,SPOTIFY_ARTIST_IDS,SPOTIFY_RELATED_ARTISTS_IDS";

fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn csv_rows_map_to_graph_descriptors() {
    let file = write_csv(&[
        r#"R1,Radio One,,T1,Song,,12,"[""pop""]","[""A1"",""A2""]","[""B1""]""#,
    ]);
    let source = CsvSource::new(file.path());

    let records: Vec<_> = source.records().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 1);
    let mapped = map_record(&records[0]).unwrap();

    // Empty album: no PART_OF edge, no Album node.
    assert!(mapped.nodes.iter().all(|n| n.label != Label::Album));
    assert!(mapped.edges.iter().all(|e| e.rel != RelType::PartOf));

    // Market default flows through the CSV path too.
    let radio = mapped
        .nodes
        .iter()
        .find(|n| n.label == Label::Radio)
        .unwrap();
    assert!(radio.props.iter().any(|(name, value)| {
        *name == "market" && *value == radiograph::model::PropValue::Str("Unknown".into())
    }));

    let composed: Vec<_> = mapped
        .edges
        .iter()
        .filter(|e| e.rel == RelType::ComposedBy)
        .collect();
    assert_eq!(composed.len(), 2);

    let related: Vec<_> = mapped
        .edges
        .iter()
        .filter(|e| e.rel == RelType::RelatedTo)
        .collect();
    assert_eq!(related.len(), 2, "one per (artist, related) pair");
}

#[test]
fn bad_rows_fail_individually_not_collectively() {
    let file = write_csv(&[
        r#"R1,Radio One,London,T1,Song,Album X,12,,,"#,
        r#"R1,Radio One,London,T2,Song,Album X,not-a-number,,,"#,
        r#",Radio One,London,T3,Song,Album X,7,,,"#,
    ]);
    let source = CsvSource::new(file.path());

    let outcomes: Vec<_> = source
        .records()
        .unwrap()
        .map(|r| map_record(&r.unwrap()))
        .collect();

    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(MapError::BadInteger { .. })));
    assert!(matches!(outcomes[2], Err(MapError::MissingField(_))));
}

#[test]
fn reprocessing_the_source_yields_identical_descriptors() {
    let file = write_csv(&[
        r#"R1,Radio One,London,T1,Song,Album X,12,"[""pop""]","[""A1""]","#,
    ]);
    let source = CsvSource::new(file.path());

    let first: Vec<_> = source
        .records()
        .unwrap()
        .map(|r| map_record(&r.unwrap()).unwrap())
        .collect();
    let second: Vec<_> = source
        .records()
        .unwrap()
        .map(|r| map_record(&r.unwrap()).unwrap())
        .collect();

    assert_eq!(first, second);
}
