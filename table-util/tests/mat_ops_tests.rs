use approx::assert_abs_diff_eq;
use table_util::mat_ops::MatOps;

#[test]
fn centre_columns_zero_mean() {
    let mut xx = nalgebra::DMatrix::<f32>::from_fn(50, 8, |i, j| (i * j) as f32 * 0.1 + 1.0);
    xx.centre_columns_inplace();

    for j in 0..xx.ncols() {
        let mean = xx.column(j).sum() / xx.nrows() as f32;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-4);
    }
}

#[test]
fn centre_columns_copy_leaves_original() {
    let xx = nalgebra::DMatrix::<f32>::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let yy = xx.centre_columns();

    assert_eq!(xx[(0, 0)], 1.0);
    assert_abs_diff_eq!(yy[(0, 0)], -1.0);
    assert_abs_diff_eq!(yy[(1, 1)], 1.0);
}
