//! Loader for delimited numeric text (CSV, TSV, whitespace).

use ndarray::Array2;

use crate::data::loader::{ItemLoader, LoaderError};

/// Loader for plain-text numeric grids.
///
/// One row per line, cells separated by commas, tabs or spaces. Blank lines
/// and lines starting with `#` are skipped. Every row must have the same
/// number of cells. In comma-separated rows an empty cell is a missing
/// value and reads as NaN.
pub struct TextLoader;

impl TextLoader {
    fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
        text.lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
    }

    fn parse_row(line: &str, line_no: usize) -> Result<Vec<f64>, LoaderError> {
        let parse = |cell: &str| {
            cell.parse::<f64>().map_err(|_| {
                LoaderError::new(format!("line {}: '{}' is not a number", line_no, cell))
            })
        };

        if line.contains(',') {
            line.split(',')
                .map(str::trim)
                .map(|cell| if cell.is_empty() { Ok(f64::NAN) } else { parse(cell) })
                .collect()
        } else {
            line.split_whitespace().map(parse).collect()
        }
    }
}

impl ItemLoader for TextLoader {
    fn id(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv", "tsv", "txt", "dat"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        let Ok(text) = std::str::from_utf8(data) else {
            return false;
        };
        match Self::content_lines(text).next() {
            Some((line_no, line)) => Self::parse_row(line, line_no).is_ok(),
            None => false,
        }
    }

    fn load(&self, data: &[u8]) -> Result<Array2<f64>, LoaderError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| LoaderError::new(format!("not valid UTF-8: {}", e)))?;

        let mut values = Vec::new();
        let mut cols = None;
        let mut rows = 0;

        for (line_no, line) in Self::content_lines(text) {
            let row = Self::parse_row(line, line_no)?;
            match cols {
                None => cols = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(LoaderError::new(format!(
                        "line {}: expected {} values, found {}",
                        line_no,
                        expected,
                        row.len()
                    )));
                }
                Some(_) => {}
            }
            values.extend(row);
            rows += 1;
        }

        let cols = cols.ok_or_else(|| LoaderError::new("no numeric rows found"))?;
        log::debug!("TextLoader: parsed {}x{} grid", rows, cols);

        Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| LoaderError::new(format!("invalid grid shape: {}", e)))
    }

    fn priority(&self) -> i32 {
        -10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_whitespace_grid() {
        let array = TextLoader.load(b"1 2 3\n4\t5  6\n").unwrap();
        assert_eq!(array, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_csv_with_comments() {
        let text = b"# exported grid\n1.5,2.5\n\n-3,4e2\n";
        let array = TextLoader.load(text).unwrap();
        assert_eq!(array, array![[1.5, 2.5], [-3.0, 400.0]]);
    }

    #[test]
    fn test_empty_csv_cells_are_missing_values() {
        let array = TextLoader.load(b"1,,3\n4,5,\n").unwrap();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[[0, 0]], 1.0);
        assert!(array[[0, 1]].is_nan());
        assert_eq!(array[[0, 2]], 3.0);
        assert_eq!(array[[1, 1]], 5.0);
        assert!(array[[1, 2]].is_nan());
    }

    #[test]
    fn test_ragged_rows() {
        let err = TextLoader.load(b"1 2 3\n4 5\n").unwrap_err();
        assert!(err.message.contains("line 2"));
    }

    #[test]
    fn test_non_numeric_cell() {
        let err = TextLoader.load(b"1 2\n3 x\n").unwrap_err();
        assert!(err.message.contains("'x'"));
    }

    #[test]
    fn test_empty_input() {
        assert!(TextLoader.load(b"# only a comment\n").is_err());
        assert!(!TextLoader.can_load(b""));
    }

    #[test]
    fn test_can_load() {
        assert!(TextLoader.can_load(b"0.1, 0.2\n"));
        assert!(!TextLoader.can_load(b"name,value\n"));
        assert!(!TextLoader.can_load(&[0xff, 0xfe, 0x00]));
    }
}
