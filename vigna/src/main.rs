mod binarize;
mod coords;
mod embed;
mod plot;
mod run_visualize;
mod sim_input;
mod tsne;
mod umap;
mod vis_common;

use crate::vis_common::*;
use run_visualize::{run_visualize, VisualizeArgs};

fn main() -> anyhow::Result<()> {
    let args = VisualizeArgs::parse();
    run_visualize(&args)
}
