// One-dimensional Lloyd iteration over a single column of values.
use std::thread;

use crossbeam_channel::unbounded;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::dataset::distinct_sorted;
use crate::error::{ClusterError, Result};

pub type Centroid = f64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iter: usize,
    /// Largest per-centroid move still counted as converged; 0.0 means the
    /// centroids must repeat exactly. Returned labels always refer to the
    /// returned centroids.
    pub tolerance: f64,
    pub threads: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 10,
            max_iter: 300,
            tolerance: 0.0,
            threads: 1,
        }
    }
}

impl KMeansConfig {
    fn check(&self) -> Result<()> {
        if self.k == 0 {
            return Err(ClusterError::InvalidConfig("k must be at least 1".into()));
        }
        if self.max_iter == 0 {
            return Err(ClusterError::InvalidConfig("max_iter must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(ClusterError::InvalidConfig("threads must be at least 1".into()));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ClusterError::InvalidConfig(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub centroid: Centroid,
    pub points_idx: Vec<usize>,
}

impl Cluster {
    fn new(centroid: Centroid) -> Self {
        Self {
            centroid,
            points_idx: Vec::new(),
        }
    }
}

/// Result of a converged run
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub initial_centroids: Vec<Centroid>,
    pub centroids: Vec<Centroid>,
    /// record index -> centroid index
    pub assignments: Vec<usize>,
    pub iterations: usize,
}

impl Clustering {
    /// Record indices grouped by centroid index, ascending
    pub fn clusters(&self) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = self.centroids.iter().map(|&c| Cluster::new(c)).collect();
        for (idx, &label) in self.assignments.iter().enumerate() {
            clusters[label].points_idx.push(idx);
        }
        clusters
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.assignments {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Pick k distinct values at random and sort them
pub fn init_centroids<R: Rng + ?Sized>(values: &[f64], k: usize, rng: &mut R) -> Result<Vec<Centroid>> {
    let distinct = distinct_sorted(values);
    if distinct.len() < k {
        return Err(ClusterError::InsufficientDistinctValues {
            k,
            distinct: distinct.len(),
        });
    }
    let mut centroids: Vec<Centroid> = distinct.choose_multiple(rng, k).copied().collect();
    centroids.sort_by(|a, b| a.total_cmp(b));
    Ok(centroids)
}

/// Index of the closest centroid. Exact ties go to the lower index.
pub fn nearest(value: f64, centroids: &[Centroid]) -> usize {
    let mut closest_idx = 0;
    let mut closest_dist = (centroids[0] - value).abs();
    for (idx, &centroid) in centroids.iter().enumerate().skip(1) {
        let dist = (centroid - value).abs();
        if dist < closest_dist {
            closest_dist = dist;
            closest_idx = idx;
        }
    }
    closest_idx
}

/// Rebuild the whole assignment map
pub fn assign(values: &[f64], centroids: &[Centroid], threads: usize) -> Vec<usize> {
    if threads <= 1 || values.len() < 2 {
        return values.iter().map(|&v| nearest(v, centroids)).collect();
    }

    let chunk_size = values.len().div_ceil(threads);
    let (sender, receiver) = unbounded::<(usize, Vec<usize>)>();
    let mut assignments = vec![0; values.len()];
    thread::scope(|s| {
        for (n, chunk) in values.chunks(chunk_size).enumerate() {
            let sender = sender.clone();
            s.spawn(move || {
                let labels: Vec<usize> = chunk.iter().map(|&v| nearest(v, centroids)).collect();
                // Receiver is held until every worker has finished
                let _ = sender.send((n * chunk_size, labels));
            });
        }
        drop(sender);
        for (offset, labels) in receiver.iter() {
            assignments[offset..offset + labels.len()].copy_from_slice(&labels);
        }
    });
    assignments
}

/// Mean of each cluster's members; a cluster with no members keeps its previous value
pub fn update(values: &[f64], assignments: &[usize], previous: &[Centroid]) -> Vec<Centroid> {
    let mut sums = vec![0.0; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (&value, &label) in values.iter().zip(assignments) {
        sums[label] += value;
        counts[label] += 1;
    }
    sums.iter()
        .zip(&counts)
        .zip(previous)
        .map(|((&sum, &count), &prev)| if count == 0 { prev } else { sum / count as f64 })
        .collect()
}

pub fn converged(old: &[Centroid], new: &[Centroid], tolerance: f64) -> bool {
    if tolerance == 0.0 {
        return old == new;
    }
    old.len() == new.len() && old.iter().zip(new).all(|(a, b)| (a - b).abs() <= tolerance)
}

/// One assign + update pass
pub fn step(values: &[f64], centroids: &[Centroid], threads: usize) -> (Vec<usize>, Vec<Centroid>) {
    let assignments = assign(values, centroids, threads);
    let new_centroids = update(values, &assignments, centroids);
    (assignments, new_centroids)
}

pub fn run<R: Rng + ?Sized>(values: &[f64], config: &KMeansConfig, rng: &mut R) -> Result<Clustering> {
    run_with(values, config, rng, |_, _| {})
}

/// `run`, calling `on_iter(iteration, new_centroids)` after every pass
pub fn run_with<R, F>(values: &[f64], config: &KMeansConfig, rng: &mut R, on_iter: F) -> Result<Clustering>
where
    R: Rng + ?Sized,
    F: FnMut(usize, &[Centroid]),
{
    config.check()?;
    if values.is_empty() {
        return Err(ClusterError::EmptyDataset);
    }
    let initial = init_centroids(values, config.k, rng)?;
    info!("initial centroids {:?}", initial);
    iterate(values, initial, config, on_iter)
}

/// Run from a caller-chosen starting centroid set instead of a random one
pub fn run_from_centroids(values: &[f64], initial: Vec<Centroid>, config: &KMeansConfig) -> Result<Clustering> {
    config.check()?;
    if values.is_empty() {
        return Err(ClusterError::EmptyDataset);
    }
    if initial.len() != config.k {
        return Err(ClusterError::InvalidConfig(format!(
            "expected {} initial centroids, got {}",
            config.k,
            initial.len()
        )));
    }
    iterate(values, initial, config, |_, _| {})
}

fn iterate<F>(values: &[f64], initial: Vec<Centroid>, config: &KMeansConfig, mut on_iter: F) -> Result<Clustering>
where
    F: FnMut(usize, &[Centroid]),
{
    let mut centroids = initial.clone();
    for iteration in 1..=config.max_iter {
        let (assignments, new_centroids) = step(values, &centroids, config.threads);
        debug!("iteration {}: {:?}", iteration, new_centroids);
        on_iter(iteration, &new_centroids);

        if converged(&centroids, &new_centroids, config.tolerance) {
            info!("converged after {} iterations", iteration);
            // Labels must refer to the returned centroids
            let assignments = if new_centroids == centroids {
                assignments
            } else {
                assign(values, &new_centroids, config.threads)
            };
            return Ok(Clustering {
                initial_centroids: initial,
                centroids: new_centroids,
                assignments,
                iterations: iteration,
            });
        }
        centroids = new_centroids;
    }

    warn!("centroids still moving after {} iterations", config.max_iter);
    Err(ClusterError::MaxIterationsExceeded {
        max_iter: config.max_iter,
    })
}
