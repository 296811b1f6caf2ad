use crate::vis_common::*;
use std::path::{Path, PathBuf};
use table_util::named_table::TableWithNames;

pub const EXPRESSION_FILE: &str = "ExpressionData.csv";
pub const PSEUDO_TIME_FILE: &str = "PseudoTime.csv";
pub const CLUSTER_FILE: &str = "ClusterIds.csv";
pub const STEADY_STATE_FILE: &str = "steady_states.tsv";

/// Resolved locations of the simulation output files
#[derive(Debug)]
pub struct SimPaths {
    pub expression: PathBuf,
    pub pseudo_time: PathBuf,
    pub clusters: Option<PathBuf>,
    pub steady_states: Option<PathBuf>,
}

///
/// Resolve and check every input file the run will need. Optional
/// files are only required when the matching coloring was requested.
///
pub fn resolve_paths(
    dir: &str,
    with_clusters: bool,
    ss_dir: Option<&str>,
) -> anyhow::Result<SimPaths> {
    let required = |file: &str, dir: &str| -> anyhow::Result<PathBuf> {
        let path = Path::new(dir).join(file);
        anyhow::ensure!(
            path.exists(),
            "no {} file is present in the specified path to files ({})",
            file,
            dir
        );
        Ok(path)
    };

    Ok(SimPaths {
        expression: required(EXPRESSION_FILE, dir)?,
        pseudo_time: required(PSEUDO_TIME_FILE, dir)?,
        clusters: if with_clusters {
            Some(required(CLUSTER_FILE, dir)?)
        } else {
            None
        },
        steady_states: match ss_dir {
            Some(ss_dir) => Some(required(STEADY_STATE_FILE, ss_dir)?),
            None => None,
        },
    })
}

/// Load the genes × cells expression table
pub fn read_expression(path: &Path) -> anyhow::Result<TableWithNames<f32>> {
    let path = path_str(path)?;
    let expr = TableWithNames::<f32>::read_file_delim(path, ",")?;
    anyhow::ensure!(
        expr.mat.nrows() > 0 && expr.mat.ncols() > 0,
        "empty expression table in {}",
        path
    );
    Ok(expr)
}

/// Maximum of the `Time` column of the pseudo-time table
pub fn read_time_scale(path: &Path) -> anyhow::Result<f32> {
    let path = path_str(path)?;
    let table = TableWithNames::<f32>::read_file_delim(path, ",")?;
    let time = table
        .column("Time")
        .ok_or_else(|| anyhow::anyhow!("no 'Time' column in {}", path))?;
    let scale = time.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    anyhow::ensure!(
        scale.is_finite() && scale > 0.0,
        "the 'Time' column of {} has no positive maximum",
        path
    );
    Ok(scale)
}

/// The time-slice index embedded in a cell name `<sample>_<timeslice>`
pub fn time_slice(cell: &str) -> anyhow::Result<u32> {
    cell.split('_')
        .nth(1)
        .and_then(|x| x.parse::<u32>().ok())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "cell name '{}' does not follow the <sample>_<timeslice> convention",
                cell
            )
        })
}

/// Cluster ids from the `cl` column, normalized by the largest id
pub fn read_cluster_scalars(path: &Path, n_cells: usize) -> anyhow::Result<Vec<f32>> {
    let path = path_str(path)?;
    let table = TableWithNames::<f32>::read_file_delim(path, ",")?;
    let raw = table
        .column("cl")
        .ok_or_else(|| anyhow::anyhow!("no 'cl' column in {}", path))?;
    anyhow::ensure!(
        raw.len() == n_cells,
        "{} assigns {} cells but the expression table has {}",
        path,
        raw.len(),
        n_cells
    );
    let scale = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    anyhow::ensure!(
        scale.is_finite() && scale > 0.0,
        "the 'cl' column of {} has no positive maximum",
        path
    );
    Ok(raw.into_iter().map(|x| x / scale).collect())
}

///
/// Load the steady-state table: one row per called steady state, one
/// {0,1} column per gene. The gene columns must match the expression
/// table's gene index exactly, otherwise the file belongs to a
/// different network and the run aborts.
///
pub fn read_steady_states(path: &Path, genes: &[Box<str>]) -> anyhow::Result<Mat> {
    let path = path_str(path)?;
    let table = TableWithNames::<f32>::read_file_delim(path, "\t")?;
    anyhow::ensure!(
        table.cols == genes,
        "the {} file does not contain the same gene names as the simulated \
         expression data of the network; the file may correspond to a different network",
        STEADY_STATE_FILE
    );
    Ok(table.mat)
}

fn path_str(path: &Path) -> anyhow::Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("non-UTF8 path: {}", path.display()))
}
