use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Local;

use crate::domain::listing::ResultSet;

pub struct PersistedOutput {
    pub path: PathBuf,
    pub record_count: usize,
    pub header: Vec<String>,
}

/// Commit the run's records to a CSV file. The header is the sorted union of
/// every field name observed across all records; a record lacking a column
/// renders empty there. Zero records still produces an output file.
pub fn finalize(
    results: &ResultSet,
    site_slug: &str,
    output_dir: &str,
    filename: Option<String>,
) -> anyhow::Result<PersistedOutput> {
    let filename = filename.unwrap_or_else(|| {
        format!(
            "{}_jobs_{}.csv",
            site_slug,
            Local::now().format("%Y%m%d_%H%M%S")
        )
    });

    fs::create_dir_all(output_dir)
        .with_context(|| format!("could not create output directory {}", output_dir))?;
    let path = Path::new(output_dir).join(filename);

    let header = results.field_union();
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("could not open {} for writing", path.display()))?;

    if !header.is_empty() {
        writer.write_record(&header)?;
        for record in results.records() {
            let row: Vec<&str> = header
                .iter()
                .map(|field| record.get(field).unwrap_or(""))
                .collect();
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;

    log::info!("Saved {} records to {}", results.len(), path.display());

    Ok(PersistedOutput {
        path,
        record_count: results.len(),
        header,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::domain::listing::ListingRecord;

    fn scratch_dir(tag: &str) -> String {
        let dir = std::env::temp_dir().join(format!("prospect_{}_{}", tag, std::process::id()));
        dir.to_string_lossy().to_string()
    }

    #[test]
    fn header_is_the_sorted_union_and_missing_fields_render_empty() {
        let mut results = ResultSet::new();

        let mut a = ListingRecord::new("A".to_string(), "https://x.test/a".to_string());
        a.set("company", "Acme".to_string());
        let mut b = ListingRecord::new("B".to_string(), "https://x.test/b".to_string());
        b.set("location", "Bangalore".to_string());
        results.extend_page(vec![a, b]);

        let dir = scratch_dir("union");
        let output =
            finalize(&results, "naukri", &dir, Some("union.csv".to_string())).unwrap();

        assert_eq!(output.header, vec!["company", "location", "title", "url"]);
        assert_eq!(output.record_count, 2);

        let written = fs::read_to_string(&output.path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("company,location,title,url"));
        assert_eq!(lines.next(), Some("Acme,,A,https://x.test/a"));
        assert_eq!(lines.next(), Some(",Bangalore,B,https://x.test/b"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn zero_records_still_yields_an_output() {
        let dir = scratch_dir("empty");
        let output = finalize(
            &ResultSet::new(),
            "naukri",
            &dir,
            Some("empty.csv".to_string()),
        )
        .unwrap();

        assert_eq!(output.record_count, 0);
        assert!(output.header.is_empty());
        assert!(output.path.exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn default_filename_is_timestamped_per_site() {
        let dir = scratch_dir("name");
        let output = finalize(&ResultSet::new(), "naukri", &dir, None).unwrap();

        let name = output.path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("naukri_jobs_"));
        assert!(name.ends_with(".csv"));

        fs::remove_dir_all(&dir).ok();
    }
}
