//! Tab-separated output files for population centers and facilities.
//!
//! Both schemas terminate every field, including the last, with a tab. Files
//! are written to a temporary sibling and renamed into place, so readers never
//! observe a partially written output. A replaced file keeps its permissions;
//! a new one gets the same mode a plain `fs::write` would give it.

use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::records::{FacilityRecord, PopulationRecord};

pub const POPULATION_HEADER: [&str; 7] = ["id", "name", "lat", "lon", "pop", "vacc", "adi"];
pub const FACILITY_HEADER: [&str; 5] = ["id", "name", "lat", "lon", "cap"];

/// Writes population records in the order given, numbering them from 0.
pub fn write_population<'a, I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a PopulationRecord>,
{
    let rows = records.into_iter().enumerate().map(|(id, r)| {
        vec![
            id.to_string(),
            r.code.to_string(),
            float_field(r.lat),
            float_field(r.lon),
            r.pop.to_string(),
            r.vacc.to_string(),
            adi_field(r.adi),
        ]
    });

    write_table(path, &POPULATION_HEADER, rows)
}

/// Writes facility records keyed by their own ids.
pub fn write_facilities<'a, I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a FacilityRecord>,
{
    let rows = records.into_iter().map(|f| {
        vec![
            f.id.to_string(),
            f.name.clone(),
            float_field(f.lat),
            float_field(f.lon),
            f.cap.to_string(),
        ]
    });

    write_table(path, &FACILITY_HEADER, rows)
}

/// Floats always carry a decimal point (`41.88`, `88.0`).
fn float_field(value: f64) -> String {
    format!("{value:?}")
}

/// A region without ADI observations is written as a bare `0`; an observed
/// mean keeps its decimal point, including `0.0`.
fn adi_field(value: Option<f64>) -> String {
    match value {
        Some(mean) => float_field(mean),
        None => "0".to_string(),
    }
}

/// Creates the temporary sibling of `target`.
fn temp_sibling(dir: &Path, target: &Path) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // the process umask still applies, as it does for fs::write
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let tmp = builder
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;

    if let Ok(existing) = fs::metadata(target) {
        fs::set_permissions(tmp.path(), existing.permissions()).with_context(|| {
            format!("failed to copy permissions of {}", target.display())
        })?;
    }
    Ok(tmp)
}

fn write_table<I>(path: &Path, header: &[&str], rows: I) -> Result<usize>
where
    I: Iterator<Item = Vec<String>>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = temp_sibling(dir, path)?;

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(tmp);

    writer.write_record(header.iter().copied().chain([""]))?;

    let mut count = 0;
    for row in rows {
        writer.write_record(row.iter().map(String::as_str).chain([""]))?;
        count += 1;
    }

    let mut tmp = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush {}: {}", path.display(), e.error()))?;
    tmp.flush()?;

    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), rows = count, "Wrote output");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: u64, lat: f64, lon: f64, pop: i64, vacc: i64, adi: Option<f64>) -> PopulationRecord {
        PopulationRecord {
            code,
            lat,
            lon,
            pop,
            vacc,
            adi,
        }
    }

    #[test]
    fn test_population_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.tsv");

        let rows = write_population(&path, []).unwrap();

        assert_eq!(rows, 0);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id\tname\tlat\tlon\tpop\tvacc\tadi\t\n"
        );
    }

    #[test]
    fn test_population_rows_are_tab_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.tsv");
        let records = vec![
            record(60601, 41.88, -87.62, 18, 150, None),
            record(60602, 41.9, -87.6, 1200, 7, Some(88.0)),
        ];

        write_population(&path, &records).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0\t60601\t41.88\t-87.62\t18\t150\t0\t");
        assert_eq!(lines[2], "1\t60602\t41.9\t-87.6\t1200\t7\t88.0\t");
    }

    #[test]
    fn test_fractional_adi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.tsv");

        write_population(&path, &[record(1, 1.5, 2.5, 3, 4, Some(87.5))]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("0\t1\t1.5\t2.5\t3\t4\t87.5\t\n"));
    }

    #[test]
    fn test_observed_zero_adi_keeps_decimal_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.tsv");

        write_population(&path, &[record(1, 1.5, 2.5, 3, 4, Some(0.0))]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("0\t1\t1.5\t2.5\t3\t4\t0.0\t\n"));
    }

    #[test]
    fn test_facility_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fac.tsv");

        write_facilities(&path, []).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id\tname\tlat\tlon\tcap\t\n"
        );
    }

    #[test]
    fn test_facility_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fac.tsv");
        let facility = FacilityRecord {
            id: 3,
            name: "Malcolm X College".to_string(),
            lat: 41.877,
            lon: -87.675,
            cap: 500,
        };

        write_facilities(&path, [&facility]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().nth(1).unwrap(),
            "3\tMalcolm X College\t41.877\t-87.675\t500\t"
        );
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.tsv");
        fs::write(&path, "stale contents that are much longer than the header\n").unwrap();

        write_population(&path, []).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id\tname\tlat\tlon\tpop\tvacc\tadi\t\n"
        );
    }

    #[test]
    fn test_missing_directory_is_error() {
        let path = Path::new("/nonexistent/dir/pop.tsv");
        assert!(write_population(path, []).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_new_output_mode_matches_plain_write() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.tsv");
        let path = dir.path().join("pop.tsv");
        fs::write(&plain, "").unwrap();

        write_population(&path, []).unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&plain));
    }

    #[cfg(unix)]
    #[test]
    fn test_replaced_output_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.tsv");
        fs::write(&path, "stale\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_population(&path, []).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
