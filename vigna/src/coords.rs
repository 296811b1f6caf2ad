use crate::vis_common::*;
use std::io::Write;
use table_util::common_io::open_buf_writer;

/// Per-cell coordinate table: named f32 columns over a fixed cell
/// index, one row per expression-table cell in input order. An
/// explicit value threaded through the pipeline, never shared state.
pub struct CoordTable {
    pub cells: Vec<Box<str>>,
    columns: Vec<(Box<str>, Vec<f32>)>,
}

impl CoordTable {
    pub fn new(cells: Vec<Box<str>>) -> Self {
        Self {
            cells,
            columns: vec![],
        }
    }

    pub fn nrows(&self) -> usize {
        self.cells.len()
    }

    /// Append a named column; its length must match the cell index
    pub fn push_column(&mut self, name: &str, values: Vec<f32>) -> anyhow::Result<()> {
        anyhow::ensure!(
            values.len() == self.cells.len(),
            "column '{}' has {} values for {} cells",
            name,
            values.len(),
            self.cells.len()
        );
        self.columns.push((name.into(), values));
        Ok(())
    }

    /// Append the columns `<label>1..=dim` of an embedding matrix
    pub fn push_embedding(&mut self, label: &str, coords: &Mat) -> anyhow::Result<()> {
        for k in 0..coords.ncols() {
            let name = format!("{}{}", label, k + 1);
            self.push_column(&name, coords.column(k).iter().copied().collect())?;
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&[f32]> {
        self.columns
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Copy of the rows at `keep`, preserving their relative order
    pub fn subset(&self, keep: &[usize]) -> Self {
        Self {
            cells: keep.iter().map(|&i| self.cells[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| {
                    (
                        name.clone(),
                        keep.iter().map(|&i| values[i]).collect::<Vec<f32>>(),
                    )
                })
                .collect(),
        }
    }

    /// Write as CSV with an empty leading header field (index column)
    pub fn write_csv(&self, file_path: &str) -> anyhow::Result<()> {
        let mut buf = open_buf_writer(file_path)?;

        let header = self
            .columns
            .iter()
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(buf, ",{}", header)?;

        for (i, cell) in self.cells.iter().enumerate() {
            let line = self
                .columns
                .iter()
                .map(|(_, values)| format!("{}", values[i]))
                .collect::<Vec<_>>()
                .join(",");
            writeln!(buf, "{},{}", cell, line)?;
        }
        buf.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_util::common_io::create_temp_dir_file;

    fn toy() -> CoordTable {
        let mut table = CoordTable::new(vec!["1_0".into(), "1_1".into(), "2_0".into()]);
        table.push_column("PCA1", vec![0.1, 0.2, 0.3]).unwrap();
        table.push_column("PCA2", vec![1.0, 2.0, 3.0]).unwrap();
        table
    }

    #[test]
    fn one_row_per_cell_in_order() {
        let table = toy();
        assert_eq!(table.nrows(), 3);
        assert_eq!(table.cells[1].as_ref(), "1_1");
        assert_eq!(table.column("PCA2").unwrap()[2], 3.0);
        assert!(table.column("UMAP1").is_none());
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut table = toy();
        assert!(table.push_column("bad", vec![1.0]).is_err());
    }

    #[test]
    fn subset_keeps_order() {
        let table = toy();
        let sub = table.subset(&[0, 2]);
        assert_eq!(sub.nrows(), 2);
        assert_eq!(sub.cells[1].as_ref(), "2_0");
        assert_eq!(sub.column("PCA1").unwrap(), &[0.1, 0.3]);
    }

    #[test]
    fn csv_layout() -> anyhow::Result<()> {
        let table = toy();
        let file = create_temp_dir_file("csv")?;
        let file = file.to_str().unwrap();
        table.write_csv(file)?;

        let text = std::fs::read_to_string(file)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(",PCA1,PCA2"));
        assert_eq!(lines.next(), Some("1_0,0.1,1"));
        assert_eq!(text.lines().count(), 4);
        Ok(())
    }
}
