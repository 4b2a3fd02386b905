//! Delimited-text reader for raw entry rows.

use crate::config::ColumnMapping;
use crate::error::LoadError;
use crate::records::RawEntryRecord;
use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Opens `path` for reading, decompressing it if it ends in `.gz`.
pub fn open_source(path: &str) -> Result<Box<dyn Read>, LoadError> {
    let file = BufReader::new(File::open(path)?);
    let gzipped = Path::new(path).extension().and_then(|e| e.to_str()) == Some("gz");
    debug!(path, gzipped, "Opening entry source");

    if gzipped {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Header positions of each mapped column.
struct ColumnIndex {
    date: usize,
    hour: usize,
    minute: Option<usize>,
    time_period: Option<usize>,
    vehicle_class: usize,
    region: usize,
    count: usize,
    excluded: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, mapping: &ColumnMapping) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require =
            |name: &str| find(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()));

        Ok(Self {
            date: require(&mapping.date)?,
            hour: require(&mapping.hour)?,
            minute: mapping.minute.as_deref().and_then(find),
            time_period: find(&mapping.time_period),
            vehicle_class: require(&mapping.vehicle_class)?,
            region: require(&mapping.region)?,
            count: require(&mapping.count)?,
            excluded: mapping.excluded.as_deref().and_then(find),
        })
    }
}

fn cell(row: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| row.get(i))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads every data row of a headed CSV into [`RawEntryRecord`]s.
///
/// Fields are trimmed. Short rows are kept with their missing cells absent.
///
/// # Errors
///
/// Fails if a required column is missing from the header, or on I/O and
/// CSV framing errors.
pub fn read_raw_records<R: Read>(
    reader: R,
    mapping: &ColumnMapping,
) -> Result<Vec<RawEntryRecord>, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let columns = ColumnIndex::resolve(rdr.headers()?, mapping)?;
    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let row = result?;
        rows.push(RawEntryRecord {
            line: i as u64 + 1,
            date: cell(&row, Some(columns.date)),
            hour: cell(&row, Some(columns.hour)),
            minute: cell(&row, columns.minute),
            vehicle_class: cell(&row, Some(columns.vehicle_class)),
            time_period: cell(&row, columns.time_period),
            region: cell(&row, Some(columns.region)),
            count: cell(&row, Some(columns.count)),
            excluded: cell(&row, columns.excluded),
        });
    }

    debug!(rows = rows.len(), "Raw rows read");
    Ok(rows)
}

/// Convenience wrapper: [`open_source`] followed by [`read_raw_records`].
pub fn read_raw_file(path: &str, mapping: &ColumnMapping) -> Result<Vec<RawEntryRecord>, LoadError> {
    read_raw_records(open_source(path)?, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::fs;
    use std::io::Write;

    const SAMPLE: &str = r#"Toll Date,Hour of Day,Minute of Hour,Time Period,Vehicle Class,Detection Region,CRZ Entries,Excluded Roadway Entries
01/05/2025,8,10,Peak,"1 - Cars, Pickups and Vans",Holland Tunnel,10,2
"#;

    #[test]
    fn test_read_default_mapping() {
        let rows = read_raw_records(SAMPLE.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.line, 1);
        assert_eq!(row.date.as_deref(), Some("01/05/2025"));
        assert_eq!(row.hour.as_deref(), Some("8"));
        assert_eq!(row.minute.as_deref(), Some("10"));
        assert_eq!(row.vehicle_class.as_deref(), Some("1 - Cars, Pickups and Vans"));
        assert_eq!(row.region.as_deref(), Some("Holland Tunnel"));
        assert_eq!(row.count.as_deref(), Some("10"));
        assert_eq!(row.excluded.as_deref(), Some("2"));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Toll Date,Hour of Day,Vehicle Class,CRZ Entries\n2025-01-02,8,Cars,1\n";
        let result = read_raw_records(csv.as_bytes(), &ColumnMapping::default());
        assert!(matches!(result, Err(LoadError::MissingColumn(c)) if c == "Detection Region"));
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let csv = "Toll Date,Hour of Day,Vehicle Class,Detection Region,CRZ Entries\n\
                   2025-01-02,8,Cars,Holland Tunnel,1\n";
        let rows = read_raw_records(csv.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(rows[0].minute, None);
        assert_eq!(rows[0].time_period, None);
        assert_eq!(rows[0].excluded, None);
    }

    #[test]
    fn test_renamed_headers_and_trimming() {
        let mapping = ColumnMapping {
            date: "day".into(),
            hour: "hr".into(),
            minute: None,
            time_period: "period".into(),
            vehicle_class: "class".into(),
            region: "where".into(),
            count: "n".into(),
            excluded: None,
        };
        let csv = "day,hr,period,class,where,n\n 2025-01-02 , 8 ,Overnight,Bus, Lincoln Tunnel ,  7 \n";
        let rows = read_raw_records(csv.as_bytes(), &mapping).unwrap();
        assert_eq!(rows[0].date.as_deref(), Some("2025-01-02"));
        assert_eq!(rows[0].region.as_deref(), Some("Lincoln Tunnel"));
        assert_eq!(rows[0].count.as_deref(), Some("7"));
    }

    #[test]
    fn test_short_rows_have_absent_cells() {
        let csv = "Toll Date,Hour of Day,Vehicle Class,Detection Region,CRZ Entries\n2025-01-02,8\n";
        let rows = read_raw_records(csv.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hour.as_deref(), Some("8"));
        assert_eq!(rows[0].region, None);
        assert_eq!(rows[0].count, None);
    }

    #[test]
    fn test_read_gzipped_file() {
        let path = format!("{}/crz_heatmap_parser_test.csv.gz", env::temp_dir().display());
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let rows = read_raw_file(&path, &ColumnMapping::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].region.as_deref(), Some("Holland Tunnel"));

        fs::remove_file(&path).unwrap();
    }
}
