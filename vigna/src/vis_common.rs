#![allow(dead_code)]

pub use log::{info, warn};

pub type Mat = nalgebra::DMatrix<f32>;

pub use clap::Parser;

pub const DEFAULT_SEED: u64 = 42;

/// Column names of the two color scalars every coordinate table carries
pub const TIME_COLUMN: &str = "Simulation Time";
pub const CLUSTER_COLUMN: &str = "k-Means Clusters";
pub const STEADY_STATE_COLUMN: &str = "Steady State Groups";
