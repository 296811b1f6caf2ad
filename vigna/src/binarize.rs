use crate::vis_common::*;

///
/// Threshold the genes × cells expression matrix into {0, 1}: a value
/// counts as ON when it reaches half of the gene's maximum. Genes that
/// never fire stay all-zero.
///
pub fn binarize(expr_gc: &Mat) -> Mat {
    let mut out = Mat::zeros(expr_gc.nrows(), expr_gc.ncols());
    for g in 0..expr_gc.nrows() {
        let row_max = expr_gc.row(g).iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if row_max <= 0.0 {
            continue;
        }
        let threshold = row_max * 0.5;
        for c in 0..expr_gc.ncols() {
            if expr_gc[(g, c)] >= threshold {
                out[(g, c)] = 1.0;
            }
        }
    }
    out
}
