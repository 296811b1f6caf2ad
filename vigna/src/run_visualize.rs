use crate::binarize::binarize;
use crate::coords::CoordTable;
use crate::embed::{embed, parse_dim, Method};
use crate::plot::render_figure;
use crate::sim_input::*;
use crate::vis_common::*;
use table_util::common_io::basename;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "VIGNA",
    long_about = "VIsualizing Gene-expression via Nonlinear/linear Arrangements\n\
		  Projects simulated single-cell expression data into 2-D or 3-D\n\
		  with PCA, t-SNE, or UMAP; writes the coordinates as CSV and\n\
		  renders one colored scatter figure per method."
)]
pub struct VisualizeArgs {
    /// Path to the folder containing the ExpressionData.csv and
    /// PseudoTime.csv files generated by the simulation, as well as
    /// the ClusterIds.csv if it is present.
    #[arg(long = "path-to-files", short = 'f', default_value = "")]
    pub path_to_files: Box<str>,

    /// Use PCA for visualizing the data. Specify the number of
    /// dimensions (2 or 3) as argument. Default is 2.
    #[arg(long, short = 'p', num_args = 0..)]
    pub pca: Option<Vec<usize>>,

    /// Use t-SNE for visualizing the data. Specify the number of
    /// dimensions (2 or 3) as argument. Default is 2.
    #[arg(long, short = 't', num_args = 0..)]
    pub tsne: Option<Vec<usize>>,

    /// Use UMAP for visualizing the data. Specify the number of
    /// dimensions (2 or 3) as argument. Default is 2.
    #[arg(long, short = 'u', num_args = 0..)]
    pub umap: Option<Vec<usize>>,

    /// Use the cluster file ClusterIds.csv to color cells if at least
    /// 2 clusters were simulated.
    #[arg(long = "cluster-file", short = 'c', default_value_t = false)]
    pub cluster_file: bool,

    /// Path to the folder containing the steady_states.tsv file used
    /// for labeling which cells are in a called steady state.
    #[arg(long = "ss-file", short = 's')]
    pub ss_file: Option<Box<str>>,

    /// Name of the regulatory network, used in figure titles.
    #[arg(long = "data-name", short = 'n', num_args = 1.., default_value = "Network")]
    pub data_name: Vec<String>,

    /// RNG seed for t-SNE and UMAP.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Maximum number of worker threads.
    #[arg(long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Verbosity
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

pub fn run_visualize(args: &VisualizeArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::try_init();

    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.min(num_cpus::get()).max(1))
        .build_global();

    // 1. Validate the request before touching any file
    let requested = requested_methods(args)?;
    anyhow::ensure!(
        !requested.is_empty(),
        "no dimensional reduction was requested; give at least one of --pca, --tsne, --umap"
    );

    let paths = resolve_paths(
        &args.path_to_files,
        args.cluster_file,
        args.ss_file.as_deref(),
    )?;

    // 2. Read the expression data (genes × cells) and flip it for the reducers
    let expr = read_expression(&paths.expression)?;
    let cells_by_genes = expr.mat.transpose();
    info!(
        "Loaded expression table: {} genes × {} cells",
        expr.mat.nrows(),
        expr.mat.ncols()
    );

    // steady-state gene names are checked before any output is written
    let ss_states = match &paths.steady_states {
        Some(path) => Some(read_steady_states(path, &expr.rows)?),
        None => None,
    };

    // 3. Dimensionality reduction, one coordinate block per method
    let mut coords = CoordTable::new(expr.cols.clone());
    for &(method, dim) in &requested {
        info!("Computing {}-D {} ...", dim, method.display_name());
        let y = embed(method, &cells_by_genes, dim, args.seed)?;
        coords.push_embedding(method.column_label(), &y)?;
    }

    // 4. Color scalars, both normalized to [0, 1]
    let time_scale = read_time_scale(&paths.pseudo_time)?;
    let time_colors = expr
        .cols
        .iter()
        .map(|cell| Ok(time_slice(cell)? as f32 / time_scale))
        .collect::<anyhow::Result<Vec<f32>>>()?;
    coords.push_column(TIME_COLUMN, time_colors)?;

    let cluster_colors = match &paths.clusters {
        Some(path) => read_cluster_scalars(path, expr.cols.len())?,
        None => vec![0.5; expr.cols.len()],
    };
    coords.push_column(CLUSTER_COLUMN, cluster_colors)?;

    // 5. Persist the coordinate table next to the inputs
    let out_csv = std::path::Path::new(args.path_to_files.as_ref())
        .join("ExpressionData_dimred.csv");
    let out_csv = out_csv
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path"))?;
    coords.write_csv(out_csv)?;
    info!("Wrote {}", out_csv);

    // 6. Steady-state-only subset
    let ss_coords = match &ss_states {
        Some(states) => Some(steady_state_subset(&coords, &expr.mat, states)?),
        None => None,
    };

    // 7. One figure per method
    let data_name = args.data_name.join(" ");
    let base = basename(paths.expression.to_str().unwrap_or(EXPRESSION_FILE))?;
    for &(method, dim) in &requested {
        let out_png = std::path::Path::new(args.path_to_files.as_ref()).join(format!(
            "{}_{}_{}d.png",
            base,
            method.file_label(),
            dim
        ));
        let out_png = out_png
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path"))?;
        render_figure(out_png, method, dim, &data_name, &coords, ss_coords.as_ref())?;
    }

    info!("Done");
    Ok(())
}

/// The methods named on the command line, with validated dimensions,
/// in the fixed PCA, t-SNE, UMAP order
fn requested_methods(args: &VisualizeArgs) -> anyhow::Result<Vec<(Method, usize)>> {
    let flags = [
        (Method::Pca, &args.pca),
        (Method::Tsne, &args.tsne),
        (Method::Umap, &args.umap),
    ];

    let mut requested = vec![];
    for (method, values) in flags {
        if let Some(values) = values {
            requested.push((method, parse_dim(method, values)?));
        }
    }
    Ok(requested)
}

///
/// Restrict the coordinate table to cells whose binarized expression
/// vector exactly equals one of the called steady states, adding the
/// normalized "Steady State Groups" scalar. An empty result (no cell
/// in any steady state) is a valid, if degenerate, outcome.
///
fn steady_state_subset(
    coords: &CoordTable,
    expr_gc: &Mat,
    states: &Mat,
) -> anyhow::Result<CoordTable> {
    let bin = binarize(expr_gc);
    let n_states = states.nrows();
    let n_genes = bin.nrows();

    let mut keep = vec![];
    let mut scalars = vec![];
    for cell in 0..bin.ncols() {
        for j in 0..n_states {
            if (0..n_genes).all(|g| bin[(g, cell)] == states[(j, g)]) {
                keep.push(cell);
                scalars.push(j as f32 / n_states as f32);
                break;
            }
        }
    }

    if keep.is_empty() {
        warn!("no cell matches any called steady state; the steady-state panel will be empty");
    }

    let mut subset = coords.subset(&keep);
    subset.push_column(STEADY_STATE_COLUMN, scalars)?;
    Ok(subset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_util::common_io::write_lines;

    fn write_sim_dir(dir: &std::path::Path) -> anyhow::Result<()> {
        write_lines(
            &[
                ",1_0,1_1,2_0,2_1",
                "g1,0.1,2.0,0.2,1.9",
                "g2,2.0,0.1,1.8,0.0",
                "g3,0.0,1.5,0.1,1.6",
            ],
            dir.join(EXPRESSION_FILE).to_str().unwrap(),
        )?;
        write_lines(
            &[",Time", "1_0,0.0", "1_1,2.0", "2_0,0.1", "2_1,1.9"],
            dir.join(PSEUDO_TIME_FILE).to_str().unwrap(),
        )?;
        write_lines(
            &[",cl", "1_0,1", "1_1,2", "2_0,1", "2_1,2"],
            dir.join(CLUSTER_FILE).to_str().unwrap(),
        )?;
        write_lines(
            &["\tg1\tg2\tg3", "ss0\t0\t1\t0", "ss1\t1\t0\t1"],
            dir.join(STEADY_STATE_FILE).to_str().unwrap(),
        )?;
        Ok(())
    }

    fn base_args(dir: &str) -> VisualizeArgs {
        VisualizeArgs {
            path_to_files: dir.into(),
            pca: None,
            tsne: None,
            umap: None,
            cluster_file: false,
            ss_file: None,
            data_name: vec!["Network".to_string()],
            seed: DEFAULT_SEED,
            threads: 1,
            verbose: false,
        }
    }

    #[test]
    fn end_to_end_pca() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_sim_dir(dir.path())?;

        let mut args = base_args(dir.path().to_str().unwrap());
        args.pca = Some(vec![]);
        args.cluster_file = true;
        args.ss_file = Some(dir.path().to_str().unwrap().into());
        run_visualize(&args)?;

        let csv = std::fs::read_to_string(dir.path().join("ExpressionData_dimred.csv"))?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            ",PCA1,PCA2,Simulation Time,k-Means Clusters"
        );
        // one row per cell, in input order
        for (line, cell) in lines[1..].iter().zip(["1_0", "1_1", "2_0", "2_1"]) {
            assert!(line.starts_with(&format!("{},", cell)));
        }
        // derived time scalars with max Time = 2
        let time: Vec<f32> = lines[1..]
            .iter()
            .map(|l| l.split(',').nth(3).unwrap().parse().unwrap())
            .collect();
        assert_eq!(time, vec![0.0, 0.5, 0.0, 0.5]);
        // cluster scalars normalized by the largest id
        let cl: Vec<f32> = lines[1..]
            .iter()
            .map(|l| l.split(',').nth(4).unwrap().parse().unwrap())
            .collect();
        assert_eq!(cl, vec![0.5, 1.0, 0.5, 1.0]);

        assert!(dir.path().join("ExpressionData_PCA_2d.png").exists());
        Ok(())
    }

    #[test]
    fn invalid_dimension_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_sim_dir(dir.path())?;

        let mut args = base_args(dir.path().to_str().unwrap());
        args.pca = Some(vec![4]);
        assert!(run_visualize(&args).is_err());

        args.pca = Some(vec![2, 3]);
        assert!(run_visualize(&args).is_err());

        assert!(!dir.path().join("ExpressionData_dimred.csv").exists());
        Ok(())
    }

    #[test]
    fn no_method_requested_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_sim_dir(dir.path())?;
        let args = base_args(dir.path().to_str().unwrap());
        assert!(run_visualize(&args).is_err());
        Ok(())
    }

    #[test]
    fn foreign_steady_states_abort_before_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_sim_dir(dir.path())?;
        write_lines(
            &["\tgA\tgB\tgC", "ss0\t0\t1\t0"],
            dir.path().join(STEADY_STATE_FILE).to_str().unwrap(),
        )?;

        let mut args = base_args(dir.path().to_str().unwrap());
        args.pca = Some(vec![]);
        args.ss_file = Some(dir.path().to_str().unwrap().into());
        assert!(run_visualize(&args).is_err());
        assert!(!dir.path().join("ExpressionData_dimred.csv").exists());
        Ok(())
    }

    #[test]
    fn steady_state_groups() {
        // binarized at half-max: g1 -> [0,1,0,1], g2 -> [1,0,1,0], g3 -> [0,1,0,1]
        let expr = Mat::from_row_slice(
            3,
            4,
            &[0.1, 2.0, 0.2, 1.9, 2.0, 0.1, 1.8, 0.0, 0.0, 1.5, 0.1, 1.6],
        );
        let states = Mat::from_row_slice(2, 3, &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

        let mut coords = CoordTable::new(vec![
            "1_0".into(),
            "1_1".into(),
            "2_0".into(),
            "2_1".into(),
        ]);
        coords
            .push_column("PCA1", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();

        let subset = steady_state_subset(&coords, &expr, &states).unwrap();
        assert_eq!(subset.nrows(), 4);
        assert_eq!(
            subset.column(STEADY_STATE_COLUMN).unwrap(),
            &[0.0, 0.5, 0.0, 0.5]
        );
    }

    #[test]
    fn no_matching_cell_yields_empty_subset() {
        let expr = Mat::from_row_slice(1, 2, &[0.0, 2.0]);
        // the only state never matches [0] or [1] jointly with itself
        let states = Mat::from_row_slice(1, 1, &[0.5]);

        let coords = CoordTable::new(vec!["1_0".into(), "1_1".into()]);
        let subset = steady_state_subset(&coords, &expr, &states).unwrap();
        assert_eq!(subset.nrows(), 0);
    }
}
