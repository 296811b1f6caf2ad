use crate::vis_common::*;
use table_util::mat_ops::MatOps;

/// The closed set of dimensionality-reduction methods. Dispatch is a
/// plain `match`; there is no dynamic method lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Pca,
    Tsne,
    Umap,
}

impl Method {
    /// CLI flag, for error messages
    pub fn flag(&self) -> &'static str {
        match self {
            Method::Pca => "--pca",
            Method::Tsne => "--tsne",
            Method::Umap => "--umap",
        }
    }

    /// Prefix of the coordinate-table columns (`PCA1`, `TSNE2`, ...)
    pub fn column_label(&self) -> &'static str {
        match self {
            Method::Pca => "PCA",
            Method::Tsne => "TSNE",
            Method::Umap => "UMAP",
        }
    }

    /// Token used in output image file names
    pub fn file_label(&self) -> &'static str {
        match self {
            Method::Pca => "PCA",
            Method::Tsne => "tSNE",
            Method::Umap => "UMAP",
        }
    }

    /// Human-readable name for titles and axis labels
    pub fn display_name(&self) -> &'static str {
        match self {
            Method::Pca => "PCA",
            Method::Tsne => "t-SNE",
            Method::Umap => "UMAP",
        }
    }

    /// Axis label for the `k`-th embedding coordinate (1-based)
    pub fn axis_label(&self, k: usize) -> String {
        format!("{} {}", self.display_name(), k)
    }
}

///
/// Resolve the dimension argument of one method flag. No value means
/// the default of 2; more than one value or a value outside {2, 3} is
/// a usage error.
///
pub fn parse_dim(method: Method, values: &[usize]) -> anyhow::Result<usize> {
    let dim = match values {
        [] => 2,
        [d] => *d,
        _ => anyhow::bail!(
            "gave too many values for {}: specify only a single number of dimensions (2 or 3)",
            method.flag()
        ),
    };
    if dim != 2 && dim != 3 {
        anyhow::bail!(
            "invalid number of dimensions {} for {}: only 2 and 3 are valid",
            dim,
            method.flag()
        );
    }
    Ok(dim)
}

///
/// Embed the cells × genes matrix into `dim` dimensions with the
/// requested method. Returns a cells × dim coordinate matrix.
///
pub fn embed(method: Method, x_ng: &Mat, dim: usize, seed: u64) -> anyhow::Result<Mat> {
    match method {
        Method::Pca => pca_fit_transform(x_ng, dim),
        Method::Tsne => crate::tsne::TSne::new(dim).seed(seed).fit(x_ng),
        Method::Umap => crate::umap::Umap::new(dim).seed(seed).fit(x_ng),
    }
}

///
/// Project onto the top principal components: centre the gene columns,
/// take a thin SVD, and scale the left singular vectors by their
/// singular values.
///
pub fn pca_fit_transform(x_ng: &Mat, dim: usize) -> anyhow::Result<Mat> {
    let nn = x_ng.nrows();
    let dd = x_ng.ncols();
    anyhow::ensure!(nn >= 2, "PCA needs at least 2 cells, found {}", nn);
    anyhow::ensure!(
        dim <= nn.min(dd),
        "cannot extract {} components from a {} x {} matrix",
        dim,
        nn,
        dd
    );

    let centred = x_ng.centre_columns();
    let svd = centred.svd(true, false);
    let u = svd
        .u
        .ok_or_else(|| anyhow::anyhow!("SVD did not return left singular vectors"))?;

    let mut coords = Mat::zeros(nn, dim);
    for j in 0..dim {
        let sigma = svd.singular_values[j];
        for i in 0..nn {
            coords[(i, j)] = u[(i, j)] * sigma;
        }
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_parsing() {
        assert_eq!(parse_dim(Method::Pca, &[]).unwrap(), 2);
        assert_eq!(parse_dim(Method::Tsne, &[3]).unwrap(), 3);
        assert!(parse_dim(Method::Umap, &[2, 3]).is_err());
        assert!(parse_dim(Method::Pca, &[4]).is_err());
        assert!(parse_dim(Method::Pca, &[1]).is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(Method::Tsne.column_label(), "TSNE");
        assert_eq!(Method::Tsne.file_label(), "tSNE");
        assert_eq!(Method::Tsne.axis_label(1), "t-SNE 1");
        assert_eq!(Method::Pca.axis_label(2), "PCA 2");
    }

    #[test]
    fn pca_dominant_direction() {
        // rank-1 structure plus a little noise: component 1 should
        // carry nearly all the spread
        let nn = 40;
        let x = Mat::from_fn(nn, 5, |i, j| {
            let signal = i as f32 * (j as f32 + 1.0);
            let noise = ((i * 7 + j * 13) % 11) as f32 * 1e-3;
            signal + noise
        });
        let coords = pca_fit_transform(&x, 2).unwrap();
        assert_eq!(coords.nrows(), nn);
        assert_eq!(coords.ncols(), 2);

        let var1 = coords.column(0).map(|v| v * v).sum();
        let var2 = coords.column(1).map(|v| v * v).sum();
        assert!(var1 > 100.0 * var2);
    }

    #[test]
    fn pca_rejects_degenerate_input() {
        let x = Mat::zeros(1, 5);
        assert!(pca_fit_transform(&x, 2).is_err());

        let x = Mat::zeros(10, 2);
        assert!(pca_fit_transform(&x, 3).is_err());
    }
}
