// src/report.rs

//! CSV report of matched filings.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::models::ResultRecord;

/// Column headers, in output order.
pub fn headers(designator: &str) -> [String; 7] {
    [
        "Company Name".to_string(),
        "CIK Number".to_string(),
        "Ticker Symbol".to_string(),
        "Metric Value".to_string(),
        "Filing Date".to_string(),
        format!("Exhibit {designator} URL"),
        "Accession Number".to_string(),
    ]
}

/// Write `records` as CSV to `writer`. The header row is always written.
pub fn write_records<W: Write>(writer: W, records: &[ResultRecord], designator: &str) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(headers(designator))?;

    for record in records {
        csv.write_record([
            record.display_name.clone(),
            record.entity_key.clone(),
            record.identifier.to_string(),
            record.metric.to_string(),
            record.filing_date.format("%Y-%m-%d").to_string(),
            record.document_url.clone(),
            record.accession_dashed(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the report file at `path`, creating parent directories.
pub fn write_csv(path: impl AsRef<Path>, records: &[ResultRecord], designator: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(path)?;
    write_records(file, records, designator)?;
    log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::models::{FilingRecord, Identifier};

    fn record(identifier: Identifier, metric: u64) -> ResultRecord {
        let filing = FilingRecord::new(
            "1861449",
            "Beyond Meat, Inc.",
            "000186144924000012",
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            "https://www.sec.gov/Archives/edgar/data/1861449/0001861449-24-000012.txt",
        )
        .unwrap();
        ResultRecord::new(
            &filing,
            identifier,
            metric,
            "https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/ex991.htm".into(),
        )
    }

    fn render(records: &[ResultRecord]) -> String {
        let mut out = Vec::new();
        write_records(&mut out, records, "99.1").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_report_has_header() {
        assert_eq!(
            render(&[]),
            "Company Name,CIK Number,Ticker Symbol,Metric Value,Filing Date,Exhibit 99.1 URL,Accession Number\n"
        );
    }

    #[test]
    fn test_row_format() {
        let out = render(&[
            record(Identifier::Symbol("BYND".into()), 12_345),
            record(Identifier::Unresolved, 0),
        ]);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "\"Beyond Meat, Inc.\",1861449,BYND,12345,2024-03-04,\
             https://www.sec.gov/Archives/edgar/data/1861449/000186144924000012/ex991.htm,\
             0001861449-24-000012"
        );
        assert!(lines[2].contains(",N/A,0,"));
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/nested/report.csv");

        write_csv(&path, &[record(Identifier::Unresolved, 0)], "99.2").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Company Name,"));
        assert!(content.contains("Exhibit 99.2 URL"));
        assert_eq!(content.lines().count(), 2);
    }
}
