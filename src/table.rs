//! In-memory table of one time step's exit-photon records.
//!
//! Exit-data files are schema-less: plain text, one record per line, fields as
//! whitespace-separated float literals. What was recorded per photon (weight,
//! path lengths, exit coordinates, ...) varies with how the upstream simulation
//! was configured, so the column count is inferred from the file itself rather
//! than declared anywhere.
//!
//! # First-line policy
//!
//! The first line of a file is a schema probe: its field count fixes
//! `column_count` for the whole file, and its values are then **discarded**,
//! not stored as row 0. The upstream writer emits a sacrificial first record
//! for exactly this purpose; treating it as data would double-count one photon
//! per time step.

use std::io::{self, BufRead};

/// Count the leading fields of `line` that parse as floating-point numbers.
///
/// Counting stops at the first token that fails to parse or at end of line.
/// The result becomes the column count for the whole file; rows are not
/// re-sniffed per line. An empty line yields 0.
pub fn sniff_column_count(line: &str) -> usize {
    line.split_whitespace()
        .take_while(|token| token.parse::<f64>().is_ok())
        .count()
}

/// One time step's exit-photon records: rows are photons, columns are the
/// recorded per-photon fields.
///
/// All rows have the same length, fixed by the first line of the source file.
/// [`RecordTable::load`] clears and fully repopulates the table; it is never
/// partially updated, so the table always reflects exactly one file.
#[derive(Debug, Default)]
pub struct RecordTable {
    rows: Vec<Vec<f64>>,
    column_count: usize,
    truncated_rows: usize,
}

impl RecordTable {
    /// Create an empty table, pre-reserving room for `capacity_hint` rows.
    ///
    /// The hint only sizes the allocation; it never bounds how many rows a
    /// load may produce.
    pub fn with_capacity(capacity_hint: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity_hint),
            column_count: 0,
            truncated_rows: 0,
        }
    }

    /// Replace the table's contents with the records read from `reader`.
    ///
    /// The first line is sniffed for the column count and discarded (see the
    /// module docs). The remainder is consumed as one whitespace-separated
    /// token stream: each row starts zero-initialized at `column_count` wide
    /// and is filled field by field. A missing or non-numeric token ends that
    /// row and the whole load — the partially filled row is kept (trailing
    /// fields stay `0.0`) and counted in [`RecordTable::truncated_rows`]. A
    /// row that received no tokens at all is not kept, so a file that ends
    /// cleanly on a row boundary produces no phantom trailing row.
    ///
    /// # Errors
    ///
    /// Only genuine read failures from `reader`. Malformed content is not an
    /// error at this layer; it is surfaced through `truncated_rows`.
    pub fn load<R: BufRead>(&mut self, mut reader: R) -> io::Result<()> {
        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        self.column_count = sniff_column_count(&first_line);
        self.rows.clear();
        self.truncated_rows = 0;

        let mut rest = String::new();
        reader.read_to_string(&mut rest)?;
        let mut tokens = rest.split_whitespace();

        loop {
            let mut row = vec![0.0; self.column_count];
            let mut filled = 0;
            for slot in row.iter_mut() {
                match tokens.next().and_then(|t| t.parse::<f64>().ok()) {
                    Some(value) => {
                        *slot = value;
                        filled += 1;
                    }
                    None => break,
                }
            }
            if filled == 0 {
                break;
            }
            let truncated = filled < self.column_count;
            self.rows.push(row);
            if truncated {
                self.truncated_rows += 1;
                break;
            }
        }
        Ok(())
    }

    /// Number of records in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Fields per record, as inferred from the source file's first line.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// How many rows of the last load were cut short by malformed or missing
    /// fields. At most one per load, since a short row ends the row loop.
    pub fn truncated_rows(&self) -> usize {
        self.truncated_rows
    }

    /// The record at `index`, if in range.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// All records, in file order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load_str(input: &str) -> RecordTable {
        let mut table = RecordTable::with_capacity(16);
        table.load(Cursor::new(input)).expect("load");
        table
    }

    #[test]
    fn sniffs_three_columns() {
        assert_eq!(sniff_column_count("1.0 2.0 3.0"), 3);
    }

    #[test]
    fn sniff_stops_at_first_non_numeric_token() {
        assert_eq!(sniff_column_count("0.5 1e-3 oops 4.0"), 2);
    }

    #[test]
    fn sniff_of_empty_line_is_zero() {
        assert_eq!(sniff_column_count(""), 0);
        assert_eq!(sniff_column_count("   \t "), 0);
    }

    #[test]
    fn first_line_is_discarded_not_stored() {
        let table = load_str("9.0 9.0 9.0\n1.0 2.0 3.0\n4.0 5.0 6.0\n");
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(0), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(table.row(1), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn short_last_row_is_kept_zero_padded() {
        let table = load_str("0.0 0.0 0.0\n1.0 2.0 3.0\n7.0 8.0\n");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), Some(&[7.0, 8.0, 0.0][..]));
        assert_eq!(table.truncated_rows(), 1);
    }

    #[test]
    fn clean_end_of_file_leaves_no_phantom_row() {
        let table = load_str("0.0 0.0\n1.0 2.0\n3.0 4.0\n");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.truncated_rows(), 0);
    }

    #[test]
    fn non_numeric_token_ends_the_load() {
        let table = load_str("0.0 0.0\n1.0 2.0\n3.0 nan?\n5.0 6.0\n");
        // Row 1 is fine; row 2 truncates at the bad token; row 3 is never read.
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(1), Some(&[3.0, 0.0][..]));
        assert_eq!(table.truncated_rows(), 1);
    }

    #[test]
    fn empty_first_line_yields_degenerate_table() {
        let table = load_str("\n1.0 2.0 3.0\n");
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let table = load_str("");
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.truncated_rows(), 0);
    }

    #[test]
    fn reload_replaces_previous_contents() {
        let mut table = RecordTable::with_capacity(4);
        table
            .load(Cursor::new("0.0 0.0 0.0\n1.0 2.0 3.0\n"))
            .expect("first load");
        table
            .load(Cursor::new("0.0 0.0\n4.0 5.0\n6.0 7.0\n"))
            .expect("second load");
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.row(0), Some(&[4.0, 5.0][..]));
    }
}
