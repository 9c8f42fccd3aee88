use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SheetError};

lazy_static! {
    static ref CELL_REGEX: Regex = Regex::new(r"^\$?([A-Za-z]+)\$?([0-9]+)$").unwrap();
    static ref COLUMN_REGEX: Regex = Regex::new(r"^[A-Za-z]+$").unwrap();
}

/// Largest column the service accepts (`ZZZ`).
pub const MAX_COLUMN: u32 = 18_278;

/// Convert a 1-based column index to its letters (`1 -> "A"`, `28 -> "AB"`).
pub fn column_letter(col: u32) -> Result<String> {
    if col == 0 {
        return Err(SheetError::Validation(
            "column index must be 1 or greater".to_string(),
        ));
    }
    Ok(letters(col))
}

/// Column letters for a column already known to be 1 or greater.
pub(crate) fn letters(col: u32) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Convert column letters to a 1-based index (`"A" -> 1`, `"ab" -> 28`).
pub fn column_index(letters: &str) -> Result<u32> {
    if !COLUMN_REGEX.is_match(letters) {
        return Err(SheetError::Validation(format!(
            "'{}' is not a column label",
            letters
        )));
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        acc.checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| SheetError::Validation(format!("column '{}' is too wide", letters)))
    })
}

/// Render a 1-based `(row, col)` pair in A1 notation.
pub fn coordinates_to_a1(row: u32, col: u32) -> Result<String> {
    if row == 0 {
        return Err(SheetError::Validation(
            "row index must be 1 or greater".to_string(),
        ));
    }
    Ok(format!("{}{}", column_letter(col)?, row))
}

/// Parse an A1 reference (`"B7"`, `"$C$2"`) into a 1-based `(row, col)` pair.
pub fn a1_to_coordinates(label: &str) -> Result<(u32, u32)> {
    let caps = CELL_REGEX
        .captures(label.trim())
        .ok_or_else(|| SheetError::Validation(format!("'{}' is not an A1 reference", label)))?;
    let col = column_index(&caps[1])?;
    let row: u32 = caps[2]
        .parse()
        .map_err(|_| SheetError::Validation(format!("row in '{}' is out of range", label)))?;
    if row == 0 {
        return Err(SheetError::Validation(format!(
            "'{}' has a zero row",
            label
        )));
    }
    Ok((row, col))
}

/// Quote a sheet title for use inside a range (`Sheet 1` -> `'Sheet 1'`).
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Build a range string like `'Sheet1'!A1:C4`.
pub fn range_to_a1(
    title: &str,
    min_row: u32,
    min_col: u32,
    max_row: u32,
    max_col: u32,
) -> Result<String> {
    let start = coordinates_to_a1(min_row, min_col)?;
    let end = coordinates_to_a1(max_row, max_col)?;
    if start == end {
        Ok(format!("{}!{}", quote_title(title), start))
    } else {
        Ok(format!("{}!{}:{}", quote_title(title), start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_cover_boundaries() {
        assert_eq!(column_letter(1).unwrap(), "A");
        assert_eq!(column_letter(26).unwrap(), "Z");
        assert_eq!(column_letter(27).unwrap(), "AA");
        assert_eq!(column_letter(702).unwrap(), "ZZ");
        assert_eq!(column_letter(703).unwrap(), "AAA");
        assert_eq!(column_letter(MAX_COLUMN).unwrap(), "ZZZ");
        assert!(column_letter(0).is_err());
    }

    #[test]
    fn column_index_is_case_insensitive() {
        assert_eq!(column_index("A").unwrap(), 1);
        assert_eq!(column_index("ab").unwrap(), 28);
        assert_eq!(column_index("ZZZ").unwrap(), MAX_COLUMN);
        assert!(column_index("A1").is_err());
        assert!(column_index("").is_err());
    }

    #[test]
    fn a1_round_trips() {
        for row in [1, 2, 9, 10, 99, 1000] {
            for col in [1, 2, 25, 26, 27, 52, 53, 702, 703, MAX_COLUMN] {
                let label = coordinates_to_a1(row, col).unwrap();
                assert_eq!(a1_to_coordinates(&label).unwrap(), (row, col), "{}", label);
            }
        }
    }

    #[test]
    fn a1_parsing_accepts_absolute_markers() {
        assert_eq!(a1_to_coordinates("$C$2").unwrap(), (2, 3));
        assert_eq!(a1_to_coordinates(" b7 ").unwrap(), (7, 2));
    }

    #[test]
    fn a1_parsing_rejects_garbage() {
        for bad in ["", "A", "7", "A0", "1A", "A1B", "A-1"] {
            assert!(
                matches!(a1_to_coordinates(bad), Err(SheetError::Validation(_))),
                "{} should not parse",
                bad
            );
        }
    }

    #[test]
    fn ranges_quote_titles() {
        assert_eq!(range_to_a1("Sheet1", 1, 1, 3, 2).unwrap(), "'Sheet1'!A1:B3");
        assert_eq!(range_to_a1("Bob's", 2, 2, 2, 2).unwrap(), "'Bob''s'!B2");
    }
}
