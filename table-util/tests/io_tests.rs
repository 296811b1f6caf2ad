use table_util::common_io::{create_temp_dir_file, read_lines_of_words, write_lines};
use table_util::named_table::TableWithNames;

fn toy_table() -> TableWithNames<f32> {
    TableWithNames {
        rows: vec!["g1".into(), "g2".into(), "g3".into()],
        cols: vec!["1_0".into(), "1_1".into()],
        mat: nalgebra::DMatrix::<f32>::from_row_slice(3, 2, &[0.5, 1.5, 2.0, 0.0, 3.25, 4.0]),
    }
}

#[test]
fn named_table_round_trip() -> anyhow::Result<()> {
    let xx = toy_table();

    let csv_file = create_temp_dir_file("csv")?;
    let csv_file = csv_file.to_str().unwrap();
    xx.write_file_delim(csv_file, ",")?;

    let yy = TableWithNames::<f32>::read_file_delim(csv_file, ",")?;
    assert_eq!(xx.rows, yy.rows);
    assert_eq!(xx.cols, yy.cols);
    approx::assert_abs_diff_eq!(xx.mat, yy.mat);

    Ok(())
}

#[test]
fn named_table_round_trip_gz() -> anyhow::Result<()> {
    let xx = toy_table();

    let gz_file = create_temp_dir_file("csv.gz")?;
    let gz_file = gz_file.to_str().unwrap();
    xx.write_file_delim(gz_file, ",")?;

    let yy = TableWithNames::<f32>::read_file_delim(gz_file, ",")?;
    assert_eq!(xx.rows, yy.rows);
    approx::assert_abs_diff_eq!(xx.mat, yy.mat);

    Ok(())
}

#[test]
fn named_table_column_and_transpose() {
    let xx = toy_table();

    let c = xx.column("1_1").unwrap();
    assert_eq!(c, vec![1.5, 0.0, 4.0]);
    assert!(xx.column("nope").is_none());

    let tt = xx.transpose();
    assert_eq!(tt.rows, xx.cols);
    assert_eq!(tt.cols, xx.rows);
    assert_eq!(tt.mat[(0, 2)], xx.mat[(2, 0)]);
}

#[test]
fn comment_lines_are_skipped() -> anyhow::Result<()> {
    let file = create_temp_dir_file("tsv")?;
    let file = file.to_str().unwrap();
    write_lines(
        &["# a comment", "\ta\tb", "r1\t1\t2", "% another", "r2\t3\t4"],
        file,
    )?;

    let table = TableWithNames::<f32>::read_file_delim(file, "\t")?;
    assert_eq!(table.rows.len(), 2);
    let expected: Vec<Box<str>> = vec!["a".into(), "b".into()];
    assert_eq!(table.cols, expected);
    assert_eq!(table.mat[(1, 1)], 4.0);

    let words = read_lines_of_words(file, "\t", false)?;
    assert_eq!(words.lines.len(), 3);

    Ok(())
}

#[test]
fn ragged_rows_fail() -> anyhow::Result<()> {
    let file = create_temp_dir_file("csv")?;
    let file = file.to_str().unwrap();
    write_lines(&[",a,b", "r1,1,2", "r2,3"], file)?;

    assert!(TableWithNames::<f32>::read_file_delim(file, ",").is_err());
    Ok(())
}
