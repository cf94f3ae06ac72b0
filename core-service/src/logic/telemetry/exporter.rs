//! Report Exporter
//!
//! Writes the generated telemetry as CSV and root-cause candidates /
//! evaluation results as pretty JSON.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::record::TelemetryRecord;

// ============================================================================
// EXPORT FORMATS
// ============================================================================

pub const CSV_HEADER: &str =
    "timestamp,service,log_level,message,cpu_usage,latency,trace_id,span_id,event_type";

/// Export records to CSV, returns number of rows written
pub fn export_csv(records: &[TelemetryRecord], destination: &Path) -> std::io::Result<usize> {
    ensure_parent(destination)?;
    let mut file = std::io::BufWriter::new(std::fs::File::create(destination)?);

    writeln!(file, "{}", CSV_HEADER)?;

    for record in records {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            record.canonical_timestamp(),
            escape(&record.service),
            record.log_level,
            escape(&record.message),
            format_opt(record.cpu_usage),
            format_opt(record.latency),
            escape(&record.trace_id),
            record.span_id.as_deref().map(escape).unwrap_or_default(),
            escape(&record.event_type),
        )?;
    }

    file.flush()?;
    log::info!("Synthetic data saved to {}", destination.display());
    Ok(records.len())
}

/// Export any serializable value as a pretty JSON document
pub fn export_json<T: Serialize + ?Sized>(value: &T, destination: &Path) -> std::io::Result<()> {
    ensure_parent(destination)?;
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(destination, json)
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

fn format_opt(value: Option<f64>) -> String {
    value.filter(|v| v.is_finite()).map(|v| v.to_string()).unwrap_or_default()
}

/// Quote fields containing separators
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::GeneratorConfig;
    use crate::logic::telemetry::SyntheticGenerator;
    use tempfile::TempDir;

    #[test]
    fn test_export_csv() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("nested").join("synthetic_data.csv");
        let config = GeneratorConfig { size: 25, ..GeneratorConfig::default() };
        let records = SyntheticGenerator::new(&config).generate();

        let count = export_csv(&records, &dest).unwrap();
        assert_eq!(count, 25);

        let content = std::fs::read_to_string(&dest).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 26); // header + 25 records
        assert!(lines[0].starts_with("timestamp,service"));
    }

    #[test]
    fn test_export_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("values.json");

        export_json(&vec![1, 2, 3], &dest).unwrap();

        let content = std::fs::read_to_string(&dest).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
