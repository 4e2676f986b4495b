//! Exit report decoding handler

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use girder_core::domain::report::TrapExitReport;
use girder_shells::trap::decode_stream;

fn find_report<R: BufRead>(reader: R) -> Result<TrapExitReport> {
    decode_stream(reader)
        .context("Failed to read job log")?
        .ok_or_else(|| anyhow::anyhow!("No exit report found"))
}

/// Print the last exit report of a job log as JSON
///
/// Fails when the log carries no report.
pub fn decode_exit(file: Option<&Path>) -> Result<()> {
    let report = match file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open log {}", path.display()))?;
            find_report(BufReader::new(file))?
        }
        None => find_report(std::io::stdin().lock())?,
    };

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_last_report_wins() {
        let log = concat!(
            "Running on runner-1...\n",
            "{\"command_exit_code\": 1, \"script\": \"/b/first.sh\"}\n",
            "more output\n",
            "\n",
            "{\"command_exit_code\": 0, \"script\": \"/b/second.sh\"}\n",
        );
        let report = find_report(Cursor::new(log)).unwrap();
        assert_eq!(report, TrapExitReport::new(0, "/b/second.sh"));
    }

    #[test]
    fn test_missing_report() {
        let error = find_report(Cursor::new("no report here\n{\"script\": \"x\"}\n")).unwrap_err();
        assert_eq!(error.to_string(), "No exit report found");
    }

    #[test]
    fn test_decode_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{\"command_exit_code\": 3, \"script\": \"s.sh\"}\n").unwrap();
        assert!(decode_exit(Some(file.path())).is_ok());
        assert!(decode_exit(Some(Path::new("/nonexistent/log"))).is_err());
    }
}
