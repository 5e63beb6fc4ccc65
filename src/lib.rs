//! One-dimensional k-means clustering over a single column of a numeric
//! table, plus the loader, writers and scatter plot around it.

#[macro_use]
extern crate log;

pub mod dataset;
pub mod error;
pub mod kmeans;
pub mod output;
pub mod plot;
