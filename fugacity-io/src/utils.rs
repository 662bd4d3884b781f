use std::fs::File;
use std::io::{stderr, stdout, BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

/// Errors raised while reading simulation input files.
#[derive(Debug, Error)]
pub enum ParsingError {
    #[error("can't open file: {fname}")]
    FileNotFound { fname: String },
    #[error("{fname}:{line}: can't parse field `{field}` as a number")]
    BadNumber { fname: String, line: usize, field: String },
    #[error("{fname}:{line}: expected at least {expected} fields, found {found}")]
    TooFewFields { fname: String, line: usize, expected: usize, found: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Creates a `Write` object for a given destination.
///
/// A file under `out_fname` is opened, unless the name is `"stdout"`,
/// `"stderr"` or empty, in which case the returned writer is connected to the
/// respective standard stream.
///
/// # Arguments
/// * `out_fname` - file name, `"stdout"` or `"stderr"`
/// * `if_append` - an existing file will be truncated if false, appended to otherwise
pub fn out_writer(out_fname: &str, if_append: bool) -> Box<dyn Write> {
    match out_fname {
        "" | "stdout" => Box::new(stdout()) as Box<dyn Write>,
        "stderr" => Box::new(stderr()) as Box<dyn Write>,
        _ => {
            let path = Path::new(out_fname);
            let file = if if_append {
                File::options().append(true).create(true).open(path)
            } else {
                File::create(path)
            };
            match file {
                Ok(file) => Box::new(file) as Box<dyn Write>,
                Err(e) => panic!("can't open >{:?}< for writing, error is: {:?}", &path, e),
            }
        }
    }
}

/// Opens a file for buffered reading, transparently decompressing `.gz` input.
pub fn open_file(fname: &str) -> Result<Box<dyn BufRead>, ParsingError> {
    let file = File::open(fname).map_err(|_| ParsingError::FileNotFound { fname: fname.to_string() })?;
    let reader: Box<dyn Read> = if fname.ends_with(".gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Reads numeric values from a comma-separated file, skipping malformed rows.
pub fn read_csv<T: std::str::FromStr, R: BufRead>(reader: R) -> Result<Vec<Vec<T>>, ParsingError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut data: Vec<Vec<T>> = Vec::new();
    for record in rdr.records() {
        if let Ok(r) = &record {
            let row: Result<Vec<T>, _> = r.iter().map(|e| e.trim().parse::<T>()).collect();
            if let Ok(row) = row {
                data.push(row);
            }
        }
    }
    Ok(data)
}

/// Parses the `i`-th whitespace field of a line as `T`, with file context in the error.
pub fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    i: usize,
    fname: &str,
    line: usize,
) -> Result<T, ParsingError> {
    let field = fields.get(i).ok_or(ParsingError::TooFewFields {
        fname: fname.to_string(),
        line,
        expected: i + 1,
        found: fields.len(),
    })?;
    field.parse::<T>().map_err(|_| ParsingError::BadNumber {
        fname: fname.to_string(),
        line,
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_parse_and_comments_are_skipped() {
        let text = "# lnpi table\n0, -1.5\n1, -0.25\n";
        let rows: Vec<Vec<f64>> = read_csv(std::io::BufReader::new(text.as_bytes())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], -0.25);
    }

    #[test]
    fn field_errors_carry_context() {
        let fields = ["12", "oops"];
        let ok: f64 = parse_field(&fields, 0, "f.xyz", 3).unwrap();
        assert_eq!(ok, 12.0);
        let err = parse_field::<f64>(&fields, 1, "f.xyz", 3).unwrap_err();
        assert!(format!("{}", err).contains("f.xyz:3"));
        let err = parse_field::<f64>(&fields, 5, "f.xyz", 4).unwrap_err();
        assert!(format!("{}", err).contains("expected at least 6"));
    }
}
