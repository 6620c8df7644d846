use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::parse::parse_snapshot;
use super::record::Snapshot;

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read position snapshot {}", path.display()))?;
    let snapshot = parse_snapshot(&raw)
        .with_context(|| format!("failed to parse position snapshot {}", path.display()))?;

    info!(
        path = %path.display(),
        markets = snapshot.markets.len(),
        positions = snapshot.position_count(),
        "loaded position snapshot"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_snapshot_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"markets": [{{"id": "m1", "title": "First", "positions": [
                {{"id": "0x1", "side": "yes", "magnitude": 2500}}
            ]}}]}}"#
        )
        .expect("write snapshot");

        let snapshot = load_snapshot(file.path()).expect("load snapshot");
        assert_eq!(snapshot.markets.len(), 1);
        assert_eq!(snapshot.markets[0].title, "First");
        assert_eq!(snapshot.position_count(), 1);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let error = load_snapshot(&path).expect_err("missing file");
        assert!(format!("{error:#}").contains("absent.json"));
    }

    #[test]
    fn parse_failure_keeps_the_cause() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "[{{").expect("write snapshot");
        let error = load_snapshot(file.path()).expect_err("broken json");
        let message = format!("{error:#}");
        assert!(message.contains("failed to parse position snapshot"));
        assert!(message.contains("invalid JSON"));
    }
}
