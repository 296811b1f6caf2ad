use crate::common_io::{open_buf_writer, read_lines_of_words, Delimiter};
use nalgebra::DMatrix;
use std::fmt::{Debug, Display};
use std::io::Write;
use std::str::FromStr;

/// A dense matrix together with its row and column names, as parsed
/// from a delimited file with a header line and a leading row-name
/// column (the usual data-frame layout).
pub struct TableWithNames<T: nalgebra::Scalar> {
    pub rows: Vec<Box<str>>,
    pub cols: Vec<Box<str>>,
    pub mat: DMatrix<T>,
}

impl<T> TableWithNames<T>
where
    T: nalgebra::Scalar + FromStr + Display + Copy,
    <T as FromStr>::Err: Debug,
{
    ///
    /// Parse a delimited file into a named table. The first
    /// non-comment line is the header; its first field names the index
    /// and is ignored (it may be empty). The first field of every
    /// other line is the row name.
    ///
    /// * `file_path` - file name--either gzipped or not
    /// * `delim` - delimiter
    ///
    pub fn read_file_delim(
        file_path: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<Self> {
        let parsed = read_lines_of_words(file_path, delim, true)?;

        if parsed.header.len() < 2 {
            return Err(anyhow::anyhow!(
                "no data columns in the header of {}",
                file_path
            ));
        }

        let cols: Vec<Box<str>> = parsed.header[1..].to_vec();
        let ncols = cols.len();

        let mut rows = Vec::with_capacity(parsed.lines.len());
        let mut data = Vec::with_capacity(parsed.lines.len() * ncols);

        for (i, words) in parsed.lines.iter().enumerate() {
            if words.len() != ncols + 1 {
                return Err(anyhow::anyhow!(
                    "line {} of {} has {} fields, expected {}",
                    i + 2,
                    file_path,
                    words.len(),
                    ncols + 1
                ));
            }
            rows.push(words[0].clone());
            for x in &words[1..] {
                let x = x.parse::<T>().map_err(|e| {
                    anyhow::anyhow!("failed to parse '{}' in {}: {:?}", x, file_path, e)
                })?;
                data.push(x);
            }
        }

        let nrows = rows.len();
        Ok(Self {
            rows,
            cols,
            mat: DMatrix::<T>::from_row_iterator(nrows, ncols, data),
        })
    }

    ///
    /// Write the table back out with an empty leading header field,
    /// mirroring the layout `read_file_delim` accepts.
    ///
    pub fn write_file_delim(&self, file_path: &str, delim: &str) -> anyhow::Result<()> {
        let mut buf = open_buf_writer(file_path)?;

        let header = self
            .cols
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<_>>()
            .join(delim);
        writeln!(buf, "{}{}", delim, header)?;

        for (name, row) in self.rows.iter().zip(self.mat.row_iter()) {
            let line = row
                .iter()
                .map(|x| format!("{}", *x))
                .collect::<Vec<_>>()
                .join(delim);
            writeln!(buf, "{}{}{}", name, delim, line)?;
        }
        buf.flush()?;
        Ok(())
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<Vec<T>> {
        let j = self.cols.iter().position(|x| x.as_ref() == name)?;
        Some(self.mat.column(j).iter().copied().collect())
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> Self {
        Self {
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            mat: self.mat.transpose(),
        }
    }
}
