use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::dataset::{Dataset, Record};
use crate::error::{ClusterError, Result};
use crate::kmeans::{Centroid, Clustering};

/// A record with the index of its cluster appended
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedRecord {
    pub fields: Record,
    pub cluster: usize,
}

/// Every record tagged with its cluster, ordered by cluster then by input order
pub fn augment(dataset: &Dataset, clustering: &Clustering) -> Vec<AugmentedRecord> {
    clustering
        .clusters()
        .into_iter()
        .enumerate()
        .flat_map(|(cluster, members)| {
            members.points_idx.into_iter().map(move |idx| AugmentedRecord {
                fields: dataset.records[idx].clone(),
                cluster,
            })
        })
        .collect()
}

pub fn write_augmented<W: Write>(writer: W, records: &[AugmentedRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for record in records {
        let mut row: Vec<String> = record.fields.iter().map(|v| v.to_string()).collect();
        row.push(record.cluster.to_string());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Rendered files that are written together or not at all.
///
/// Each file is first staged as `<name>.partial` beside its target. Targets are
/// only touched once every file has been staged, and any failure removes what
/// this batch has created so far.
#[derive(Debug, Default)]
pub struct PendingOutputs {
    files: Vec<(PathBuf, Vec<u8>)>,
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

impl PendingOutputs {
    pub fn add<P: Into<PathBuf>>(&mut self, path: P, contents: Vec<u8>) {
        self.files.push((path.into(), contents));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file, returning the paths in the order they were added
    pub fn persist(self) -> Result<Vec<PathBuf>> {
        let mut staged = Vec::with_capacity(self.files.len());
        for (path, contents) in &self.files {
            let partial = staging_path(path);
            if let Err(source) = fs::write(&partial, contents) {
                remove_all(&staged);
                return Err(ClusterError::Write {
                    path: path.clone(),
                    source,
                });
            }
            staged.push(partial);
        }

        let mut placed = Vec::with_capacity(self.files.len());
        for ((path, _), partial) in self.files.iter().zip(&staged) {
            if let Err(source) = fs::rename(partial, path) {
                remove_all(&staged[placed.len()..]);
                remove_all(&placed);
                return Err(ClusterError::Write {
                    path: path.clone(),
                    source,
                });
            }
            placed.push(path.clone());
        }
        Ok(placed)
    }
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove {}: {}", path.display(), e);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub centroid: Centroid,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub column: usize,
    pub k: usize,
    pub seed: u64,
    pub n_records: usize,
    pub iterations: usize,
    pub initial_centroids: Vec<Centroid>,
    pub clusters: IndexMap<usize, ClusterSummary>,
}

impl RunSummary {
    pub fn new(input: &Path, column: usize, seed: u64, clustering: &Clustering) -> Self {
        let clusters = clustering
            .centroids
            .iter()
            .zip(clustering.sizes())
            .enumerate()
            .map(|(idx, (&centroid, size))| (idx, ClusterSummary { centroid, size }))
            .collect();
        RunSummary {
            input: input.to_path_buf(),
            column,
            k: clustering.centroids.len(),
            seed,
            n_records: clustering.assignments.len(),
            iterations: clustering.iterations,
            initial_centroids: clustering.initial_centroids.clone(),
            clusters,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmeans::{run_from_centroids, KMeansConfig};
    use tempfile::TempDir;

    fn reference() -> (Dataset, Clustering) {
        let data = b"1,1,1,1,1,10\n2,2,2,2,2,50\n2,2,2,2,2,10\n2,2,2,2,2,12\n";
        let ds = Dataset::from_reader(&data[..]).unwrap();
        let config = KMeansConfig {
            k: 2,
            ..KMeansConfig::default()
        };
        let clustering = run_from_centroids(&ds.column(5).unwrap(), vec![10.0, 50.0], &config).unwrap();
        (ds, clustering)
    }

    #[test]
    fn augmented_records_grouped_by_cluster() {
        let (ds, clustering) = reference();
        let records = augment(&ds, &clustering);
        assert_eq!(records.len(), ds.len());
        let tags: Vec<(f64, usize)> = records.iter().map(|r| (r.fields[5], r.cluster)).collect();
        assert_eq!(tags, vec![(10.0, 0), (10.0, 0), (12.0, 0), (50.0, 1)]);
        assert_eq!(records[0].fields, ds.records[0]);
        assert_eq!(records[1].fields, ds.records[2]);
    }

    #[test]
    fn writes_one_line_per_record() {
        let (ds, clustering) = reference();
        let mut buf = Vec::new();
        write_augmented(&mut buf, &augment(&ds, &clustering)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "1,1,1,1,1,10,0");
        assert_eq!(lines[3], "2,2,2,2,2,50,1");
    }

    #[test]
    fn summary_lists_clusters_in_order() {
        let (_, clustering) = reference();
        let summary = RunSummary::new(Path::new("gen0.csv"), 5, 42, &clustering);
        let mut buf = Vec::new();
        summary.write(&mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["iterations"], 2);
        assert_eq!(value["clusters"]["0"]["size"], 3);
        assert_eq!(value["clusters"]["1"]["centroid"], 50.0);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.find("\"0\"").unwrap() < text.find("\"1\"").unwrap());
    }

    #[test]
    fn all_outputs_are_written() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("out.csv");
        let svg_path = dir.path().join("plot.svg");

        let mut pending = PendingOutputs::default();
        pending.add(&csv_path, b"1,0\n".to_vec());
        pending.add(&svg_path, b"<svg/>".to_vec());
        let written = pending.persist().unwrap();

        assert_eq!(written, vec![csv_path.clone(), svg_path.clone()]);
        assert_eq!(fs::read(&csv_path).unwrap(), b"1,0\n");
        assert_eq!(fs::read(&svg_path).unwrap(), b"<svg/>");
        assert!(!staging_path(&csv_path).exists());
    }

    #[test]
    fn failed_plot_leaves_no_csv_behind() {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("out.csv");
        let svg_path = dir.path().join("missing").join("plot.svg");

        let mut pending = PendingOutputs::default();
        pending.add(&csv_path, b"1,0\n".to_vec());
        pending.add(&svg_path, b"<svg/>".to_vec());

        match pending.persist() {
            Err(ClusterError::Write { path, .. }) => assert_eq!(path, svg_path),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!csv_path.exists());
        assert!(!staging_path(&csv_path).exists());
    }

    #[test]
    fn write_error_names_the_path() {
        let dir = TempDir::new().unwrap();
        let svg_path = dir.path().join("missing").join("plot.svg");
        let mut pending = PendingOutputs::default();
        pending.add(&svg_path, Vec::new());
        let message = pending.persist().unwrap_err().to_string();
        assert!(message.contains("plot.svg"), "{}", message);
    }
}
