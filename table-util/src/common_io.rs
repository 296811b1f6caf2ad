use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::tempdir;

/// Delimiter for splitting fields--either a string or a set of characters
pub enum Delimiter {
    Str(String),
    Chars(Vec<char>),
}

impl From<&str> for Delimiter {
    fn from(s: &str) -> Self {
        Delimiter::Str(s.to_string())
    }
}

impl From<Vec<char>> for Delimiter {
    fn from(chars: Vec<char>) -> Self {
        Delimiter::Chars(chars)
    }
}

impl Delimiter {
    pub fn split<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            Delimiter::Str(s) => Box::new(line.split(s.as_str())),
            Delimiter::Chars(chars) => Box::new(line.split(chars.as_slice())),
        }
    }
}

pub struct LinesOfWords {
    pub lines: Vec<Vec<Box<str>>>,
    pub header: Vec<Box<str>>,
}

///
/// Read a delimited file into a header line and a vector of word
/// vectors, skipping `#` and `%` comment lines.
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - delimiter
/// * `with_header` - treat the first non-comment line as a header
///
pub fn read_lines_of_words(
    input_file: &str,
    delim: impl Into<Delimiter>,
    with_header: bool,
) -> anyhow::Result<LinesOfWords> {
    let delim = delim.into();
    let buf: Box<dyn BufRead> = open_buf_reader(input_file)?;

    let lines_raw: Vec<Box<str>> = buf
        .lines()
        .map_while(Result::ok)
        .map(|x| x.into_boxed_str())
        .filter(|x| !x.starts_with('#') && !x.starts_with('%'))
        .collect();

    let parse = |line: &str| -> Vec<Box<str>> {
        delim
            .split(line)
            .map(|x| x.to_owned().into_boxed_str())
            .collect()
    };

    let mut header = vec![];
    let body = if with_header {
        let Some(first) = lines_raw.first() else {
            return Err(anyhow::anyhow!("no header line in {}", input_file));
        };
        header.extend(parse(first));
        &lines_raw[1..]
    } else {
        &lines_raw[..]
    };

    // parsing dominates, so split it into parallel jobs and restore order
    let mut lines: Vec<(usize, Vec<Box<str>>)> = body
        .iter()
        .enumerate()
        .par_bridge()
        .map(|(i, s)| (i, parse(s)))
        .collect();

    lines.sort_by_key(|&(i, _)| i);
    let lines = lines.into_iter().map(|(_, x)| x).collect();
    Ok(LinesOfWords { lines, header })
}

///
/// Write displayable items one per line into the output file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T>(lines: &[T], output_file: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        writeln!(buf, "{}", line)?;
    }
    buf.flush()?;
    Ok(())
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file = File::open(input_file)?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    let file = File::create(output_file)?;
    match ext {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Take the basename (file stem) of a file
/// * `file` - file name
///
pub fn basename(file: &str) -> anyhow::Result<Box<str>> {
    let path = Path::new(file);
    if let Some(base) = path.file_stem().and_then(|x| x.to_str()) {
        Ok(base.to_string().into_boxed_str())
    } else {
        Err(anyhow::anyhow!("no file stem: {}", file))
    }
}

///
/// Create a temporary directory and suggest a file name
/// * `suffix` - suffix of the file name
///
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<std::path::PathBuf> {
    let temp_dir = tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();

    Ok(temp_file)
}
