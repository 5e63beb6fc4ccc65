extern crate pretty_env_logger;

#[macro_use]
extern crate log;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

mod cli;

use crate::cli::ArgParser;
use kclust1d::dataset::Dataset;
use kclust1d::error::Result;
use kclust1d::kmeans;
use kclust1d::output::{augment, write_augmented, PendingOutputs, RunSummary};
use kclust1d::plot::ScatterPlot;

use indicatif::{ProgressBar, ProgressStyle};

fn cluster(args: &ArgParser) -> Result<()> {
    let dataset = Dataset::from_path(&args.input)?;
    info!("{} records loaded from {}", dataset.len(), args.input.display());
    if args.plot.is_some() {
        dataset.check_column(args.x_col)?;
        dataset.check_column(args.y_col)?;
    }
    let values = dataset.column(args.column)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let pbar = ProgressBar::new_spinner();
    if let Ok(sty) = ProgressStyle::with_template(" [{elapsed_precise}] {spinner} iteration {pos}") {
        pbar.set_style(sty);
    }
    let clustering = kmeans::run_with(&values, &args.kmeans_config(), &mut rng, |_, _| pbar.inc(1));
    pbar.finish_and_clear();
    let clustering = clustering?;

    for (idx, (centroid, size)) in clustering.centroids.iter().zip(clustering.sizes()).enumerate() {
        info!("cluster {}: centroid {} with {} records", idx, centroid, size);
    }

    let records = augment(&dataset, &clustering);

    // Everything is rendered before any file is created
    let mut pending = PendingOutputs::default();
    if let Some(path) = &args.out {
        let mut buf = Vec::new();
        write_augmented(&mut buf, &records)?;
        pending.add(path, buf);
    }

    if let Some(path) = &args.plot {
        let plot = ScatterPlot {
            x_col: args.x_col,
            y_col: args.y_col,
            x_label: &args.x_label,
            y_label: &args.y_label,
            centroids: &clustering.centroids,
        };
        let mut buf = Vec::new();
        plot.render(&mut buf, &records)?;
        pending.add(path, buf);
    }

    if let Some(path) = &args.summary {
        let mut buf = Vec::new();
        RunSummary::new(&args.input, args.column, seed, &clustering).write(&mut buf)?;
        pending.add(path, buf);
    }

    if !pending.is_empty() {
        for path in pending.persist()? {
            info!("wrote {}", path.display());
        }
    }

    Ok(())
}

fn main() {
    let args = ArgParser::parse();
    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    pretty_env_logger::formatted_timed_builder()
        .filter_level(level)
        .init();

    if !args.validate() {
        std::process::exit(1);
    }

    if let Err(e) = cluster(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("finished");
}
