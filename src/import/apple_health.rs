//! Apple Health Import
//!
//! Reads blood-glucose samples from an Apple Health export, either the
//! exported ZIP archive or the `export.xml` inside it:
//!
//! ```xml
//! <Record type="HKQuantityTypeIdentifierBloodGlucose" sourceName="Dexcom"
//!         unit="mg/dL" startDate="2024-01-15 10:30:00 -0500" value="112"/>
//! ```
//!
//! Other record types in the export are skipped.

use super::{parse_offset_minutes, parse_timestamp, ImportError};
use crate::store::{ClinicalRecord, GlucoseUnits, RecordKind};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

const BLOOD_GLUCOSE_TYPE: &str = "HKQuantityTypeIdentifierBloodGlucose";

/// Imports blood-glucose samples from Apple Health exports
pub struct AppleHealthImporter {
    user_id: String,
}

impl AppleHealthImporter {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Import from a `.zip` export or a bare `export.xml`
    pub fn import_path(&self, path: &Path) -> Result<Vec<ClinicalRecord>, ImportError> {
        let file = File::open(path)?;
        let is_zip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);

        if is_zip {
            self.import_zip(file)
        } else {
            parse_export_xml(BufReader::new(file), &self.user_id)
        }
    }

    /// Find `export.xml` in the archive and parse it
    pub fn import_zip<R: Read + Seek>(&self, archive: R) -> Result<Vec<ClinicalRecord>, ImportError> {
        let mut archive = zip::ZipArchive::new(archive)?;

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let name = file.name().to_string();
            if name.ends_with("export.xml") || name.ends_with("Export.xml") {
                tracing::debug!(entry = %name, "Reading Apple Health export");
                return parse_export_xml(BufReader::new(file), &self.user_id);
            }
        }

        Err(ImportError::MissingExport)
    }
}

/// Parse glucose samples from export XML
///
/// Sample ids derive from timestamp, source and value, so importing the
/// same export twice replaces rather than duplicates.
pub fn parse_export_xml<R: BufRead>(input: R, user_id: &str) -> Result<Vec<ClinicalRecord>, ImportError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"Record" {
                    match glucose_from_element(&e, user_id) {
                        Some(record) => records.push(record),
                        None => skipped += 1,
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ImportError::Xml(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    tracing::info!(
        samples = records.len(),
        skipped,
        "Parsed Apple Health export"
    );
    Ok(records)
}

fn glucose_from_element(element: &BytesStart<'_>, user_id: &str) -> Option<ClinicalRecord> {
    let mut record_type = None;
    let mut value = None;
    let mut unit = None;
    let mut start_date = None;
    let mut source = None;

    for attr in element.attributes().flatten() {
        let Ok(text) = std::str::from_utf8(&attr.value) else {
            continue;
        };
        match attr.key.as_ref() {
            b"type" => record_type = Some(text.to_string()),
            b"value" => value = text.trim().parse::<f64>().ok(),
            b"unit" => unit = Some(text.to_string()),
            b"startDate" => start_date = Some(text.to_string()),
            b"sourceName" => source = Some(text.to_string()),
            _ => {}
        }
    }

    if record_type.as_deref() != Some(BLOOD_GLUCOSE_TYPE) {
        return None;
    }
    let value = value?;
    let start_date = start_date?;
    let timestamp = match parse_timestamp(&start_date, None) {
        Ok(ts) => ts,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping glucose sample");
            return None;
        }
    };
    let units = unit
        .as_deref()
        .and_then(GlucoseUnits::parse)
        .unwrap_or_default();

    let id = format!(
        "hk-{}-{}-{}",
        timestamp,
        source.as_deref().unwrap_or("unknown").replace(' ', "_"),
        value
    );
    let record = ClinicalRecord::new(
        id,
        user_id,
        timestamp,
        RecordKind::Glucose {
            value: Some(value),
            units,
            source,
        },
    )
    .timezone_offset(parse_offset_minutes(&start_date).unwrap_or(0));
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HealthData locale="en_US">
 <Record type="HKQuantityTypeIdentifierBloodGlucose" sourceName="Dexcom G6" unit="mg/dL" startDate="2024-01-15 10:30:00 -0500" endDate="2024-01-15 10:30:00 -0500" value="112"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Apple Watch" unit="count/min" startDate="2024-01-15 10:31:00 -0500" value="72"/>
 <Record type="HKQuantityTypeIdentifierBloodGlucose" sourceName="Meter" unit="mmol&lt;180.1558800000541&gt;/L" startDate="2024-01-15 11:00:00 -0500" value="6.2">
  <MetadataEntry key="HKMetadataKeyBloodGlucoseMealTime" value="1"/>
 </Record>
</HealthData>
"#;

    #[test]
    fn test_parse_glucose_only() {
        let records = parse_export_xml(EXPORT.as_bytes(), "u1").unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.user_id, "u1");
        assert_eq!(first.timezone_offset_minutes, -300);
        assert!(matches!(
            first.kind,
            RecordKind::Glucose { value: Some(v), units: GlucoseUnits::MgDl, .. } if v == 112.0
        ));

        assert!(matches!(
            records[1].kind,
            RecordKind::Glucose { units: GlucoseUnits::MmolL, .. }
        ));
    }

    #[test]
    fn test_ids_are_stable() {
        let a = parse_export_xml(EXPORT.as_bytes(), "u1").unwrap();
        let b = parse_export_xml(EXPORT.as_bytes(), "u1").unwrap();
        assert_eq!(a[0].id, b[0].id);
        assert_ne!(a[0].id, a[1].id);
    }

    #[test]
    fn test_import_zip() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file(
                    "apple_health_export/export.xml",
                    zip::write::SimpleFileOptions::default(),
                )
                .unwrap();
            writer.write_all(EXPORT.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("export.zip");
        std::fs::write(&path, buf.into_inner()).unwrap();

        let records = AppleHealthImporter::new("u1").import_path(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_zip_without_export() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        buf.set_position(0);
        let result = AppleHealthImporter::new("u1").import_zip(buf);
        assert!(matches!(result, Err(ImportError::MissingExport)));
    }
}
