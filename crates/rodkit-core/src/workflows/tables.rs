//! CSV export of the per-frame and per-node series in an [`AnalysisReport`].

use super::analyze::AnalysisReport;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("CSV error: {0}")]
    Write(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct NodeRmsdRow {
    node: usize,
    rmsd: f64,
}

/// Writes `frame,stretch,bend,twist` rows of rod-averaged energies.
pub fn write_energy_table<W: Write>(report: &AnalysisReport, writer: W) -> Result<(), TableError> {
    energy_rows(report, csv::Writer::from_writer(writer))
}

/// Writes `node,rmsd` rows of the time-averaged RMSD of each node.
pub fn write_rmsd_table<W: Write>(report: &AnalysisReport, writer: W) -> Result<(), TableError> {
    rmsd_rows(report, csv::Writer::from_writer(writer))
}

/// Writes both tables as `<stem>_energies.csv` and `<stem>_rmsd.csv` inside `dir`.
pub fn write_tables(report: &AnalysisReport, dir: &Path, stem: &str) -> Result<(), TableError> {
    energy_rows(report, create(&dir.join(format!("{}_energies.csv", stem)))?)?;
    rmsd_rows(report, create(&dir.join(format!("{}_rmsd.csv", stem)))?)
}

fn create(path: &Path) -> Result<csv::Writer<File>, TableError> {
    csv::Writer::from_path(path).map_err(|e| TableError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn energy_rows<W: Write>(report: &AnalysisReport, mut csv: csv::Writer<W>) -> Result<(), TableError> {
    for row in &report.energies.per_frame {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

fn rmsd_rows<W: Write>(report: &AnalysisReport, mut csv: csv::Writer<W>) -> Result<(), TableError> {
    for (node, &rmsd) in report.rmsd.per_node.iter().enumerate() {
        csv.serialize(NodeRmsdRow { node, rmsd })?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::analyze::{EnergySummary, FrameEnergies, PersistenceSummary, RmsdSummary};
    use std::fs;
    use tempfile::tempdir;

    fn report() -> AnalysisReport {
        AnalysisReport {
            nodes: 3,
            frames: 2,
            backend: "reference",
            energies: EnergySummary {
                per_frame: vec![
                    FrameEnergies { frame: 0, stretch: 0.0, bend: 0.0, twist: 0.0 },
                    FrameEnergies { frame: 1, stretch: 0.5, bend: 0.25, twist: 0.125 },
                ],
                mean_stretch: 0.25,
                mean_bend: 0.125,
                mean_twist: 0.0625,
                ei: 1.0,
                half_kbt: None,
            },
            persistence: PersistenceSummary {
                mean_cos: 0.9,
                saturated: false,
                mean_length: 10.0,
                fjc_mean: 9.0,
                wlc_mean: 11.0,
                analytical: None,
                detail: None,
            },
            rmsd: RmsdSummary {
                aligner: None,
                per_node: vec![0.0, 1.5, 3.0],
                per_frame: vec![1.0, 2.0],
                mean: 1.5,
            },
            deflection: None,
        }
    }

    #[test]
    fn energy_table_has_one_row_per_frame() {
        let mut out = Vec::new();
        write_energy_table(&report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "frame,stretch,bend,twist");
        assert_eq!(lines[2], "1,0.5,0.25,0.125");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn rmsd_table_has_one_row_per_node() {
        let mut out = Vec::new();
        write_rmsd_table(&report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("node,rmsd\n"));
        assert!(text.contains("2,3.0"));
    }

    #[test]
    fn write_tables_creates_both_files() {
        let dir = tempdir().unwrap();
        write_tables(&report(), dir.path(), "run").unwrap();
        let energies = fs::read_to_string(dir.path().join("run_energies.csv")).unwrap();
        let rmsd = fs::read_to_string(dir.path().join("run_rmsd.csv")).unwrap();
        assert_eq!(energies.lines().count(), 3);
        assert_eq!(rmsd.lines().count(), 4);
    }

    #[test]
    fn write_tables_reports_the_failing_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent");
        match write_tables(&report(), &missing, "run") {
            Err(TableError::Csv { path, .. }) => assert!(path.ends_with("run_energies.csv")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
