//! In-process spreadsheet service.
//!
//! [`MemoryClient`] implements [`SheetsClient`] over plain maps and records
//! every request it receives, so callers can check exactly which round trips
//! an operation made. Clones share the same state.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::a1;
use crate::client::SheetsClient;
use crate::error::{Result, SheetError};
use crate::model::{
    CellFormat, CellValue, GridProperties, GridRange, Request, Sheet, SheetProperties,
    SpreadsheetMeta, SpreadsheetProperties, ValueRange, ValueRenderOption,
};
use crate::styles::Border;

/// A request as received by the in-memory service.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    FetchSpreadsheet,
    GetValues { range: String, render: ValueRenderOption },
    UpdateValues { data: Vec<ValueRange> },
    BatchUpdate { requests: Vec<Request> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    FetchSpreadsheet,
    GetValues,
    UpdateValues,
    BatchUpdate,
}

#[derive(Clone, Debug, Default)]
struct StoredCell {
    entered: CellValue,
    computed: CellValue,
}

#[derive(Clone, Debug)]
struct MemorySheet {
    properties: SheetProperties,
    cells: BTreeMap<(u32, u32), StoredCell>,
    formats: BTreeMap<(u32, u32), CellFormat>,
    borders: Vec<(GridRange, Border)>,
}

#[derive(Clone, Debug)]
struct MemoryDocument {
    title: String,
    sheets: Vec<MemorySheet>,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<String, MemoryDocument>,
    next_sheet_id: i64,
    calls: Vec<Call>,
    fail_next: Option<CallKind>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryClient {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document.
    pub fn add_document(&self, spreadsheet_id: &str, title: &str) {
        self.state.borrow_mut().documents.insert(
            spreadsheet_id.to_string(),
            MemoryDocument {
                title: title.to_string(),
                sheets: Vec::new(),
            },
        );
    }

    /// Append a tab to a document and return its sheet id.
    pub fn add_sheet(&self, spreadsheet_id: &str, title: &str, rows: u32, cols: u32) -> Result<i64> {
        let mut state = self.state.borrow_mut();
        add_sheet_to(&mut state, spreadsheet_id, title, rows, cols)
    }

    /// Retitle a tab in place, keeping its sheet id and contents.
    pub fn rename_sheet(&self, spreadsheet_id: &str, title: &str, new_title: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let sheet = sheet_by_title(&mut state, spreadsheet_id, title)?;
        sheet.properties.title = new_title.to_string();
        Ok(())
    }

    /// Seed a value without logging a call.
    pub fn seed(&self, spreadsheet_id: &str, title: &str, row: u32, col: u32, value: impl Into<CellValue>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let sheet = sheet_by_title(&mut state, spreadsheet_id, title)?;
        let entered = value.into();
        let computed = compute(&entered);
        sheet.cells.insert((row, col), StoredCell { entered, computed });
        Ok(())
    }

    /// Seed a formula together with the value it evaluates to.
    pub fn seed_formula(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row: u32,
        col: u32,
        formula: &str,
        computed: impl Into<CellValue>,
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let sheet = sheet_by_title(&mut state, spreadsheet_id, title)?;
        sheet.cells.insert(
            (row, col),
            StoredCell {
                entered: CellValue::from(formula),
                computed: computed.into(),
            },
        );
        Ok(())
    }

    /// Stored value of a cell, `Empty` if never written.
    pub fn value(&self, spreadsheet_id: &str, title: &str, row: u32, col: u32) -> Result<CellValue> {
        let mut state = self.state.borrow_mut();
        let sheet = sheet_by_title(&mut state, spreadsheet_id, title)?;
        Ok(sheet
            .cells
            .get(&(row, col))
            .map(|c| c.computed.clone())
            .unwrap_or_default())
    }

    pub fn format(&self, spreadsheet_id: &str, title: &str, row: u32, col: u32) -> Result<Option<CellFormat>> {
        let mut state = self.state.borrow_mut();
        let sheet = sheet_by_title(&mut state, spreadsheet_id, title)?;
        Ok(sheet.formats.get(&(row, col)).cloned())
    }

    pub fn borders(&self, spreadsheet_id: &str, title: &str) -> Result<Vec<(GridRange, Border)>> {
        let mut state = self.state.borrow_mut();
        let sheet = sheet_by_title(&mut state, spreadsheet_id, title)?;
        Ok(sheet.borders.clone())
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of requests of one kind received so far.
    pub fn count(&self, kind: CallKind) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Reject the next request of `kind` with a 503.
    pub fn fail_next(&self, kind: CallKind) {
        self.state.borrow_mut().fail_next = Some(kind);
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let kind = call.kind();
        state.calls.push(call);
        if state.fail_next == Some(kind) {
            state.fail_next = None;
            return Err(SheetError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::FetchSpreadsheet => CallKind::FetchSpreadsheet,
            Call::GetValues { .. } => CallKind::GetValues,
            Call::UpdateValues { .. } => CallKind::UpdateValues,
            Call::BatchUpdate { .. } => CallKind::BatchUpdate,
        }
    }
}

impl SheetsClient for MemoryClient {
    fn fetch_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetMeta> {
        self.record(Call::FetchSpreadsheet)?;
        let state = self.state.borrow();
        let doc = state
            .documents
            .get(spreadsheet_id)
            .ok_or_else(|| not_found(spreadsheet_id))?;
        Ok(SpreadsheetMeta {
            spreadsheet_id: spreadsheet_id.to_string(),
            properties: SpreadsheetProperties {
                title: doc.title.clone(),
            },
            sheets: doc
                .sheets
                .iter()
                .map(|s| Sheet {
                    properties: s.properties.clone(),
                })
                .collect(),
        })
    }

    fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRenderOption,
    ) -> Result<Vec<Vec<CellValue>>> {
        self.record(Call::GetValues {
            range: range.to_string(),
            render,
        })?;
        let mut state = self.state.borrow_mut();
        let (title, min_row, min_col, max_row, max_col) = parse_range(range)?;
        let sheet = sheet_by_title(&mut state, spreadsheet_id, &title)?;
        check_grid(sheet, max_row, max_col, range)?;

        let mut rows: Vec<Vec<CellValue>> = (min_row..=max_row)
            .map(|r| {
                let mut row: Vec<CellValue> = (min_col..=max_col)
                    .map(|c| {
                        sheet
                            .cells
                            .get(&(r, c))
                            .map(|cell| render_cell(cell, render))
                            .unwrap_or_default()
                    })
                    .collect();
                while row.last().is_some_and(CellValue::is_empty) {
                    row.pop();
                }
                row
            })
            .collect();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    fn update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()> {
        self.record(Call::UpdateValues {
            data: data.to_vec(),
        })?;
        let mut state = self.state.borrow_mut();
        for block in data {
            let (title, min_row, min_col, max_row, max_col) = parse_range(&block.range)?;
            let sheet = sheet_by_title(&mut state, spreadsheet_id, &title)?;
            check_grid(sheet, max_row, max_col, &block.range)?;
            for (dr, row) in block.values.iter().enumerate() {
                for (dc, value) in row.iter().enumerate() {
                    let (r, c) = (min_row + dr as u32, min_col + dc as u32);
                    if r > max_row || c > max_col {
                        return Err(SheetError::Api {
                            status: 400,
                            message: format!("values overflow range {}", block.range),
                        });
                    }
                    sheet.cells.insert(
                        (r, c),
                        StoredCell {
                            entered: value.clone(),
                            computed: compute(value),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: &[Request]) -> Result<()> {
        self.record(Call::BatchUpdate {
            requests: requests.to_vec(),
        })?;
        let mut state = self.state.borrow_mut();
        for request in requests {
            match request {
                Request::RepeatCell(req) => {
                    let sheet = sheet_by_id(&mut state, spreadsheet_id, req.range.sheet_id)?;
                    let range = req.range;
                    for r in range.start_row_index + 1..=range.end_row_index {
                        for c in range.start_column_index + 1..=range.end_column_index {
                            sheet
                                .formats
                                .entry((r, c))
                                .or_default()
                                .merge(&req.cell.user_entered_format);
                        }
                    }
                }
                Request::UpdateBorders(req) => {
                    let sheet = sheet_by_id(&mut state, spreadsheet_id, req.range.sheet_id)?;
                    sheet.borders.push((req.range, req.border));
                }
                Request::AddSheet(req) => {
                    let grid = req.properties.grid_properties;
                    add_sheet_to(
                        &mut state,
                        spreadsheet_id,
                        &req.properties.title,
                        grid.row_count,
                        grid.column_count,
                    )?;
                }
                Request::DeleteSheet(req) => {
                    let doc = state
                        .documents
                        .get_mut(spreadsheet_id)
                        .ok_or_else(|| not_found(spreadsheet_id))?;
                    let before = doc.sheets.len();
                    doc.sheets.retain(|s| s.properties.sheet_id != req.sheet_id);
                    if doc.sheets.len() == before {
                        return Err(SheetError::Api {
                            status: 400,
                            message: format!("no sheet with id {}", req.sheet_id),
                        });
                    }
                    for (i, sheet) in doc.sheets.iter_mut().enumerate() {
                        sheet.properties.index = i;
                    }
                }
            }
        }
        Ok(())
    }
}

fn not_found(spreadsheet_id: &str) -> SheetError {
    SheetError::Api {
        status: 404,
        message: format!("spreadsheet {} not found", spreadsheet_id),
    }
}

fn add_sheet_to(state: &mut MemoryState, spreadsheet_id: &str, title: &str, rows: u32, cols: u32) -> Result<i64> {
    let sheet_id = state.next_sheet_id;
    let doc = state
        .documents
        .get_mut(spreadsheet_id)
        .ok_or_else(|| not_found(spreadsheet_id))?;
    if doc.sheets.iter().any(|s| s.properties.title == title) {
        return Err(SheetError::Api {
            status: 400,
            message: format!("a sheet named '{}' already exists", title),
        });
    }
    let index = doc.sheets.len();
    doc.sheets.push(MemorySheet {
        properties: SheetProperties {
            sheet_id,
            title: title.to_string(),
            index,
            grid_properties: GridProperties {
                row_count: rows,
                column_count: cols,
            },
        },
        cells: BTreeMap::new(),
        formats: BTreeMap::new(),
        borders: Vec::new(),
    });
    state.next_sheet_id += 1;
    Ok(sheet_id)
}

fn sheet_by_title<'a>(state: &'a mut MemoryState, spreadsheet_id: &str, title: &str) -> Result<&'a mut MemorySheet> {
    state
        .documents
        .get_mut(spreadsheet_id)
        .ok_or_else(|| not_found(spreadsheet_id))?
        .sheets
        .iter_mut()
        .find(|s| s.properties.title == title)
        .ok_or_else(|| SheetError::Api {
            status: 400,
            message: format!("unable to parse range: no sheet named '{}'", title),
        })
}

fn sheet_by_id<'a>(state: &'a mut MemoryState, spreadsheet_id: &str, sheet_id: i64) -> Result<&'a mut MemorySheet> {
    state
        .documents
        .get_mut(spreadsheet_id)
        .ok_or_else(|| not_found(spreadsheet_id))?
        .sheets
        .iter_mut()
        .find(|s| s.properties.sheet_id == sheet_id)
        .ok_or_else(|| SheetError::Api {
            status: 400,
            message: format!("no sheet with id {}", sheet_id),
        })
}

fn check_grid(sheet: &MemorySheet, max_row: u32, max_col: u32, range: &str) -> Result<()> {
    let grid = sheet.properties.grid_properties;
    if max_row > grid.row_count || max_col > grid.column_count {
        return Err(SheetError::Api {
            status: 400,
            message: format!("range {} exceeds grid limits", range),
        });
    }
    Ok(())
}

/// Split `'Title'!A1:C3` into the title and its inclusive bounds.
fn parse_range(range: &str) -> Result<(String, u32, u32, u32, u32)> {
    let bad = || SheetError::Api {
        status: 400,
        message: format!("unable to parse range: {}", range),
    };
    let (title, cells) = range.rsplit_once('!').ok_or_else(bad)?;
    let title = title
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .map(|t| t.replace("''", "'"))
        .unwrap_or_else(|| title.to_string());
    let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
    let (r1, c1) = a1::a1_to_coordinates(start).map_err(|_| bad())?;
    let (r2, c2) = a1::a1_to_coordinates(end).map_err(|_| bad())?;
    Ok((title, r1.min(r2), c1.min(c2), r1.max(r2), c1.max(c2)))
}

/// What the service stores after parsing a user-entered value.
fn compute(entered: &CellValue) -> CellValue {
    match entered {
        CellValue::Text(s) if s.starts_with('=') => CellValue::Empty,
        CellValue::Text(s) if s.is_empty() => CellValue::Empty,
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => match s.to_ascii_uppercase().as_str() {
                "TRUE" => CellValue::Bool(true),
                "FALSE" => CellValue::Bool(false),
                _ => CellValue::Text(s.clone()),
            },
        },
        other => other.clone(),
    }
}

fn render_cell(cell: &StoredCell, render: ValueRenderOption) -> CellValue {
    match render {
        ValueRenderOption::Formula if cell.entered.is_formula() => cell.entered.clone(),
        ValueRenderOption::Formula | ValueRenderOption::UnformattedValue => cell.computed.clone(),
        ValueRenderOption::FormattedValue => match &cell.computed {
            CellValue::Empty => CellValue::Empty,
            other => CellValue::Text(other.to_string()),
        },
    }
}
