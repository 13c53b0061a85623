//! CSV input for the import row contract.

use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use mudclub_core::import::ImportRow;

/// Read every record from `reader` as an [`ImportRow`].
///
/// Records may have any number of fields; missing trailing columns read as
/// absent. Each row keeps the 1-based line it started on. Rows whose cells
/// are all blank are dropped.
pub fn read_rows<R: io::Read>(reader: R, has_headers: bool) -> Result<Vec<ImportRow>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(index + 1 + usize::from(has_headers));
        let cells = record.iter().map(str::to_string).collect();
        rows.push(ImportRow::new(line, cells));
    }
    Ok(rows)
}

/// Read rows from a CSV file on disk.
pub fn read_path(path: &Path, has_headers: bool) -> Result<Vec<ImportRow>, csv::Error> {
    let file = std::fs::File::open(path)?;
    read_rows(io::BufReader::new(file), has_headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_skipped_and_lines_kept() {
        let data = "dni,name,surname\n1A,Ana,Ruiz\n\n,Eva,Gil,,,,,,,42\n";
        let rows = read_rows(data.as_bytes(), true).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].cells, ["1A", "Ana", "Ruiz"]);
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].record_id(), Some(42));
    }

    #[test]
    fn test_without_headers_first_line_is_data() {
        let rows = read_rows("1A,Ana,Ruiz\n".as_bytes(), false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 1);
    }

    #[test]
    fn test_quoted_cells_keep_commas() {
        let rows = read_rows("\"\",Ana,Ruiz,,,\"Calle 1, 2B\"\n".as_bytes(), false).unwrap();
        assert_eq!(rows[0].person_attrs().address.as_deref(), Some("Calle 1, 2B"));
    }
}
