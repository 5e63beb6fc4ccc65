use clap::Parser;

use kclust1d::kmeans::KMeansConfig;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "One-dimensional k-means over a column of a numeric CSV")]
pub struct ArgParser {
    /// Comma-separated numeric records
    #[arg(short, long)]
    pub input: std::path::PathBuf,

    /// Number of clusters
    #[arg(short, long, default_value_t = 10)]
    pub k: usize,

    /// 0-based column to cluster on
    #[arg(short, long, default_value_t = 5)]
    pub column: usize,

    /// Seed for picking the initial centroids (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Give up after this many iterations
    #[arg(long, default_value_t = 300)]
    pub max_iter: usize,

    /// Largest centroid movement still counted as converged (0 = exact)
    #[arg(long, default_value_t = 0.0)]
    pub tolerance: f64,

    /// Number of threads for the assignment pass
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Output csv of records with their cluster appended
    #[arg(short, long)]
    pub out: Option<std::path::PathBuf>,

    /// Output svg scatter plot
    #[arg(long)]
    pub plot: Option<std::path::PathBuf>,

    /// Column for the plot's x axis
    #[arg(long, default_value_t = 2)]
    pub x_col: usize,

    /// Column for the plot's y axis
    #[arg(long, default_value_t = 3)]
    pub y_col: usize,

    /// Label of the plot's x axis
    #[arg(long, default_value = "Max Lower Energy")]
    pub x_label: String,

    /// Label of the plot's y axis
    #[arg(long, default_value = "Max Shoot Distance")]
    pub y_label: String,

    /// Output json summary of the run
    #[arg(long)]
    pub summary: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl ArgParser {
    /// Validate command line arguments
    pub fn validate(&self) -> bool {
        let mut is_ok = true;

        if !self.input.exists() {
            error!("--input does not exist");
            is_ok = false;
        } else if !self.input.is_file() {
            error!("--input is not a file");
            is_ok = false;
        }

        if self.k == 0 {
            error!("--k must be at least 1");
            is_ok = false;
        }

        if self.max_iter == 0 {
            error!("--max-iter must be at least 1");
            is_ok = false;
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            error!("--tolerance must be a non-negative number");
            is_ok = false;
        }

        if self.threads == 0 {
            error!("--threads must be at least 1");
            is_ok = false;
        }

        is_ok
    }

    pub fn kmeans_config(&self) -> KMeansConfig {
        KMeansConfig {
            k: self.k,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
            threads: self.threads,
        }
    }
}
