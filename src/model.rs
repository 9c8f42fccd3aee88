//! Wire types exchanged with the spreadsheet service.
//!
//! Field names follow the Sheets v4 JSON so the same structs serve the HTTP
//! backend and the in-memory one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::styles::{Border, Color, Font, HorizontalAlign};

/// Document metadata: title plus tabs in service order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetMeta {
    pub spreadsheet_id: String,
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl SpreadsheetMeta {
    pub fn sheet_properties(&self) -> impl Iterator<Item = &SheetProperties> {
        self.sheets.iter().map(|s| &s.properties)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub column_count: u32,
}

/// How values are rendered on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueRenderOption {
    /// As displayed in the UI.
    #[default]
    FormattedValue,
    /// Computed value without number formatting.
    UnformattedValue,
    /// Formula text where a formula exists.
    Formula,
}

impl ValueRenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueRenderOption::FormattedValue => "FORMATTED_VALUE",
            ValueRenderOption::UnformattedValue => "UNFORMATTED_VALUE",
            ValueRenderOption::Formula => "FORMULA",
        }
    }
}

/// A single cell value as it travels over the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.starts_with('='))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// A block of values addressed by an A1 range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<CellValue>>,
}

/// Zero-based, end-exclusive rectangle, as the batchUpdate API expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: u32,
    pub end_row_index: u32,
    pub start_column_index: u32,
    pub end_column_index: u32,
}

impl GridRange {
    /// Build from 1-based inclusive bounds.
    pub fn from_bounds(sheet_id: i64, start_row: u32, end_row: u32, start_col: u32, end_col: u32) -> Self {
        GridRange {
            sheet_id,
            start_row_index: start_row - 1,
            end_row_index: end_row,
            start_column_index: start_col - 1,
            end_column_index: end_col,
        }
    }

    pub fn single(sheet_id: i64, row: u32, col: u32) -> Self {
        Self::from_bounds(sheet_id, row, row, col, col)
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row > self.start_row_index
            && row <= self.end_row_index
            && col > self.start_column_index
            && col <= self.end_column_index
    }
}

/// The subset of a cell's user-entered format this crate writes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_format: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_alignment: Option<HorizontalAlign>,
}

impl CellFormat {
    /// Field mask naming exactly the attributes that are set.
    pub fn field_mask(&self) -> String {
        let mut fields = Vec::new();
        if self.text_format.is_some() {
            fields.push("userEnteredFormat.textFormat");
        }
        if self.background_color.is_some() {
            fields.push("userEnteredFormat.backgroundColor");
        }
        if self.horizontal_alignment.is_some() {
            fields.push("userEnteredFormat.horizontalAlignment");
        }
        fields.join(",")
    }

    pub fn is_empty(&self) -> bool {
        self.text_format.is_none() && self.background_color.is_none() && self.horizontal_alignment.is_none()
    }

    /// Overlay the attributes set in `other`.
    pub fn merge(&mut self, other: &CellFormat) {
        if other.text_format.is_some() {
            self.text_format = other.text_format.clone();
        }
        if other.background_color.is_some() {
            self.background_color = other.background_color;
        }
        if other.horizontal_alignment.is_some() {
            self.horizontal_alignment = other.horizontal_alignment;
        }
    }
}

/// One entry of a `spreadsheets:batchUpdate` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    RepeatCell(RepeatCellRequest),
    UpdateBorders(UpdateBordersRequest),
    AddSheet(AddSheetRequest),
    DeleteSheet(DeleteSheetRequest),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepeatCellRequest {
    pub range: GridRange,
    pub cell: CellData,
    pub fields: String,
}

impl RepeatCellRequest {
    pub fn new(range: GridRange, format: CellFormat) -> Self {
        let fields = format.field_mask();
        RepeatCellRequest {
            range,
            cell: CellData {
                user_entered_format: format,
            },
            fields,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub user_entered_format: CellFormat,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateBordersRequest {
    pub range: GridRange,
    #[serde(flatten)]
    pub border: Border,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddSheetRequest {
    pub properties: NewSheetProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSheetProperties {
    pub title: String,
    pub grid_properties: GridProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSheetRequest {
    pub sheet_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{BorderSide, BorderStyle};

    #[test]
    fn values_decode_untagged() {
        let range: ValueRange =
            serde_json::from_str(r#"{"range":"'S'!A1:C1","values":[["x", 2.5, true]]}"#).unwrap();
        assert_eq!(
            range.values[0],
            vec![CellValue::from("x"), CellValue::Number(2.5), CellValue::Bool(true)]
        );
    }

    #[test]
    fn repeat_cell_request_names_its_fields() {
        let format = CellFormat {
            background_color: Some(Color::rgb(255, 0, 0)),
            horizontal_alignment: Some(HorizontalAlign::Right),
            ..Default::default()
        };
        let req = Request::RepeatCell(RepeatCellRequest::new(GridRange::single(7, 2, 3), format));
        let json = serde_json::to_value(&req).unwrap();
        let inner = &json["repeatCell"];
        assert_eq!(
            inner["fields"],
            "userEnteredFormat.backgroundColor,userEnteredFormat.horizontalAlignment"
        );
        assert_eq!(inner["range"]["startRowIndex"], 1);
        assert_eq!(inner["range"]["endRowIndex"], 2);
        assert_eq!(inner["range"]["startColumnIndex"], 2);
        assert_eq!(inner["cell"]["userEnteredFormat"]["horizontalAlignment"], "RIGHT");
    }

    #[test]
    fn update_borders_flattens_sides() {
        let side = BorderSide::new(BorderStyle::Solid, Color::rgb(0, 0, 0));
        let req = Request::UpdateBorders(UpdateBordersRequest {
            range: GridRange::from_bounds(0, 1, 3, 1, 2),
            border: Border::outline(side),
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["updateBorders"]["left"]["style"], "SOLID");
        assert_eq!(json["updateBorders"]["range"]["endColumnIndex"], 2);
    }

    #[test]
    fn grid_range_contains_is_one_based() {
        let range = GridRange::from_bounds(0, 2, 3, 2, 4);
        assert!(range.contains(2, 2));
        assert!(range.contains(3, 4));
        assert!(!range.contains(1, 2));
        assert!(!range.contains(3, 5));
    }
}
