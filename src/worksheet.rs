use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use crate::a1;
use crate::cell::Cell;
use crate::config::WritePolicy;
use crate::error::{Result, SheetError};
use crate::model::{
    CellFormat, CellValue, GridRange, RepeatCellRequest, Request, SheetProperties,
    UpdateBordersRequest, ValueRange, ValueRenderOption,
};
use crate::styles::Border;
use crate::workbook::Workbook;

/// Addresses one cell, either as `"B7"` or as a 1-based `(row, col)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellSelector {
    A1(String),
    Position(u32, u32),
}

impl From<&str> for CellSelector {
    fn from(label: &str) -> Self {
        CellSelector::A1(label.to_string())
    }
}

impl From<String> for CellSelector {
    fn from(label: String) -> Self {
        CellSelector::A1(label)
    }
}

impl From<(u32, u32)> for CellSelector {
    fn from((row, col): (u32, u32)) -> Self {
        CellSelector::Position(row, col)
    }
}

impl CellSelector {
    fn resolve(&self) -> Result<(u32, u32)> {
        match self {
            CellSelector::A1(label) => a1::a1_to_coordinates(label),
            CellSelector::Position(row, col) => {
                if *row == 0 || *col == 0 {
                    Err(SheetError::Validation(format!(
                        "({}, {}) is not a cell: rows and columns start at 1",
                        row, col
                    )))
                } else {
                    Ok((*row, *col))
                }
            }
        }
    }
}

/// Optional 1-based inclusive bounds for [`Worksheet::iter_rows`] and
/// [`Worksheet::iter_cols`]. Unset bounds extend to the sheet's edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min_row: Option<u32>,
    pub max_row: Option<u32>,
    pub min_col: Option<u32>,
    pub max_col: Option<u32>,
}

impl Bounds {
    /// The whole sheet.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn rows(mut self, min_row: u32, max_row: u32) -> Self {
        self.min_row = Some(min_row);
        self.max_row = Some(max_row);
        self
    }

    pub fn cols(mut self, min_col: u32, max_col: u32) -> Self {
        self.min_col = Some(min_col);
        self.max_col = Some(max_col);
        self
    }
}

/// Unflushed changes for one position. Either half may be absent.
#[derive(Clone, Debug, Default, PartialEq)]
struct PendingChange {
    value: Option<CellValue>,
    format: CellFormat,
}

impl PendingChange {
    fn is_empty(&self) -> bool {
        self.value.is_none() && self.format.is_empty()
    }
}

/// One tab of a [`Workbook`].
///
/// The worksheet borrows its workbook and collects the changes made through
/// its cells in a dirty set keyed by position. Nothing in the dirty set
/// reaches the service until [`Worksheet::flush_pending_changes`].
///
/// Handles are not shared: looking the same tab up twice yields two
/// worksheets with independent dirty sets. Not for use across threads.
#[derive(Debug)]
pub struct Worksheet<'wb> {
    workbook: &'wb Workbook,
    sheet_id: i64,
    // Last title seen from the service; display only. Ranges are addressed
    // with the title looked up by sheet id at request time.
    title: RefCell<String>,
    policy: WritePolicy,
    pending: RefCell<BTreeMap<(u32, u32), PendingChange>>,
}

impl fmt::Display for Worksheet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Worksheet '{}'>", self.title.borrow())
    }
}

impl<'wb> Worksheet<'wb> {
    pub(crate) fn new(workbook: &'wb Workbook, properties: &SheetProperties, policy: WritePolicy) -> Self {
        Worksheet {
            workbook,
            sheet_id: properties.sheet_id,
            title: RefCell::new(properties.title.clone()),
            policy,
            pending: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn workbook(&self) -> &'wb Workbook {
        self.workbook
    }

    /// Remote sheet id; stable across renames.
    pub fn id(&self) -> i64 {
        self.sheet_id
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.policy
    }

    /// Current properties, fetched from the service.
    pub fn properties(&self) -> Result<SheetProperties> {
        let properties = self.workbook.properties_of(self.sheet_id)?;
        if *self.title.borrow() != properties.title {
            self.title.replace(properties.title.clone());
        }
        Ok(properties)
    }

    /// Worksheet title.
    pub fn name(&self) -> Result<String> {
        Ok(self.properties()?.title)
    }

    pub fn row_count(&self) -> Result<u32> {
        Ok(self.properties()?.grid_properties.row_count)
    }

    pub fn column_count(&self) -> Result<u32> {
        Ok(self.properties()?.grid_properties.column_count)
    }

    pub fn max_row(&self) -> Result<u32> {
        self.row_count()
    }

    pub fn max_column(&self) -> Result<u32> {
        self.column_count()
    }

    /// Read one cell.
    ///
    /// # Arguments
    /// * `selector` - `"B7"` or `(7, 2)`
    /// * `render` - formatted, raw, or formula text
    ///
    /// # Errors
    /// * [`SheetError::Validation`] for a malformed reference
    /// * [`SheetError::Range`] if the cell is outside the sheet
    pub fn cell(&self, selector: impl Into<CellSelector>, render: ValueRenderOption) -> Result<Cell<'_>> {
        let (row, col) = selector.into().resolve()?;
        let properties = self.properties()?;
        check_bounds(&properties, row, col)?;
        let value = self.read_value(&properties.title, row, col, render)?;
        Ok(Cell::new(self, row, col, value))
    }

    pub(crate) fn fetch_value(&self, row: u32, col: u32, render: ValueRenderOption) -> Result<CellValue> {
        let title = self.name()?;
        self.read_value(&title, row, col, render)
    }

    fn read_value(&self, title: &str, row: u32, col: u32, render: ValueRenderOption) -> Result<CellValue> {
        let range = a1::range_to_a1(title, row, col, row, col)?;
        let rows = self
            .workbook
            .client()
            .get_values(self.workbook.key(), &range, render)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|r| r.into_iter().next())
            .unwrap_or_default())
    }

    /// Cells of a rectangle grouped by row, each row ordered by column.
    ///
    /// The rectangle is read in one request; the result is a snapshot.
    pub fn iter_rows(&self, bounds: Bounds) -> Result<Vec<Vec<Cell<'_>>>> {
        let cells = self.read_rectangle(bounds)?;
        let mut rows: BTreeMap<u32, Vec<Cell<'_>>> = BTreeMap::new();
        for cell in cells {
            rows.entry(cell.row()).or_default().push(cell);
        }
        Ok(rows
            .into_values()
            .map(|mut row| {
                row.sort_by_key(|c| c.column());
                row
            })
            .collect())
    }

    /// Cells of a rectangle grouped by column, each column ordered by row.
    pub fn iter_cols(&self, bounds: Bounds) -> Result<Vec<Vec<Cell<'_>>>> {
        let cells = self.read_rectangle(bounds)?;
        let mut cols: BTreeMap<u32, Vec<Cell<'_>>> = BTreeMap::new();
        for cell in cells {
            cols.entry(cell.column()).or_default().push(cell);
        }
        Ok(cols
            .into_values()
            .map(|mut col| {
                col.sort_by_key(|c| c.row());
                col
            })
            .collect())
    }

    fn read_rectangle(&self, bounds: Bounds) -> Result<Vec<Cell<'_>>> {
        let properties = self.properties()?;
        let grid = properties.grid_properties;
        let min_row = bounds.min_row.unwrap_or(1);
        let max_row = bounds.max_row.unwrap_or(grid.row_count);
        let min_col = bounds.min_col.unwrap_or(1);
        let max_col = bounds.max_col.unwrap_or(grid.column_count);

        if min_row == 0 || min_col == 0 || min_row > max_row || min_col > max_col {
            return Err(SheetError::Validation(format!(
                "bad bounds: rows {}..={}, columns {}..={}",
                min_row, max_row, min_col, max_col
            )));
        }
        check_bounds(&properties, max_row, max_col)?;

        let range = a1::range_to_a1(&properties.title, min_row, min_col, max_row, max_col)?;
        let values = self.workbook.client().get_values(
            self.workbook.key(),
            &range,
            ValueRenderOption::FormattedValue,
        )?;
        log::debug!("read {} ({} rows returned)", range, values.len());

        // The service drops trailing blanks; pad back out to the full rectangle.
        let mut cells = Vec::with_capacity(((max_row - min_row + 1) * (max_col - min_col + 1)) as usize);
        for row in min_row..=max_row {
            let fetched = values.get((row - min_row) as usize);
            for col in min_col..=max_col {
                let value = fetched
                    .and_then(|r| r.get((col - min_col) as usize))
                    .cloned()
                    .unwrap_or_default();
                cells.push(Cell::new(self, row, col, value));
            }
        }
        Ok(cells)
    }

    /// Draw borders around and inside a rectangle (1-based, inclusive).
    ///
    /// Remote only: cells already read are not updated.
    pub fn apply_border(
        &self,
        start_row: u32,
        end_row: u32,
        start_col: u32,
        end_col: u32,
        border: &Border,
    ) -> Result<()> {
        if start_row == 0 || start_col == 0 || start_row > end_row || start_col > end_col {
            return Err(SheetError::Validation(format!(
                "bad border rectangle: rows {}..={}, columns {}..={}",
                start_row, end_row, start_col, end_col
            )));
        }
        if border.is_empty() {
            return Err(SheetError::Validation("border has no sides".to_string()));
        }
        let request = Request::UpdateBorders(UpdateBordersRequest {
            range: GridRange::from_bounds(self.sheet_id, start_row, end_row, start_col, end_col),
            border: *border,
        });
        self.workbook.client().batch_update(self.workbook.key(), &[request])
    }

    /// Write one value straight away, bypassing the dirty set.
    ///
    /// # Errors
    /// * [`SheetError::NotFound`] if this tab has been deleted
    pub fn update_cell(&self, row: u32, col: u32, value: impl Into<CellValue>) -> Result<()> {
        let title = self.name()?;
        let block = ValueRange {
            range: a1::range_to_a1(&title, row, col, row, col)?,
            values: vec![vec![wire_value(value.into())]],
        };
        self.workbook
            .client()
            .update_values(self.workbook.key(), &[block])
    }

    /// Send the dirty set to the service.
    ///
    /// Values go out in one `values:batchUpdate`, formatting in one
    /// `batchUpdate`; an empty half sends nothing. Each half leaves the dirty
    /// set only once its request succeeds, so a failed flush can be retried.
    ///
    /// Values are addressed by the tab's current title, looked up by sheet id
    /// just before the write. A deleted tab fails with
    /// [`SheetError::NotFound`] and keeps the dirty set intact.
    pub fn flush_pending_changes(&self) -> Result<()> {
        if self.pending.borrow().is_empty() {
            return Ok(());
        }
        let has_values = self.pending.borrow().values().any(|c| c.value.is_some());
        let title = if has_values {
            self.name()?
        } else {
            self.title.borrow().clone()
        };
        let (values, formats) = {
            let pending = self.pending.borrow();
            let mut values = Vec::new();
            let mut formats = Vec::new();
            for (&(row, col), change) in pending.iter() {
                if let Some(value) = &change.value {
                    values.push(ValueRange {
                        range: a1::range_to_a1(&title, row, col, row, col)?,
                        values: vec![vec![wire_value(value.clone())]],
                    });
                }
                if !change.format.is_empty() {
                    formats.push(Request::RepeatCell(RepeatCellRequest::new(
                        GridRange::single(self.sheet_id, row, col),
                        change.format.clone(),
                    )));
                }
            }
            (values, formats)
        };

        let client = self.workbook.client();
        if !values.is_empty() {
            client.update_values(self.workbook.key(), &values)?;
            self.clear_pending(|change| change.value = None);
            log::debug!("flushed {} value(s) to '{}'", values.len(), title);
        }
        if !formats.is_empty() {
            client.batch_update(self.workbook.key(), &formats)?;
            self.clear_pending(|change| change.format = CellFormat::default());
            log::debug!("flushed {} format(s) to '{}'", formats.len(), title);
        }
        Ok(())
    }

    fn clear_pending(&self, clear: impl Fn(&mut PendingChange)) {
        let mut pending = self.pending.borrow_mut();
        for change in pending.values_mut() {
            clear(change);
        }
        pending.retain(|_, change| !change.is_empty());
    }

    /// Positions with unflushed changes, in row-major order.
    pub fn pending_cells(&self) -> Vec<(u32, u32)> {
        self.pending.borrow().keys().copied().collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    pub(crate) fn stage_value(&self, row: u32, col: u32, value: CellValue) {
        self.pending
            .borrow_mut()
            .entry((row, col))
            .or_default()
            .value = Some(value);
    }

    pub(crate) fn stage_format(&self, row: u32, col: u32, format: &CellFormat) {
        self.pending
            .borrow_mut()
            .entry((row, col))
            .or_default()
            .format
            .merge(format);
    }

    /// Drop an unflushed value, keeping any unflushed formatting.
    pub(crate) fn discard_value(&self, row: u32, col: u32) {
        let mut pending = self.pending.borrow_mut();
        if let Some(change) = pending.get_mut(&(row, col)) {
            change.value = None;
            if change.is_empty() {
                pending.remove(&(row, col));
            }
        }
    }

    pub(crate) fn value_pending(&self, row: u32, col: u32) -> bool {
        self.pending
            .borrow()
            .get(&(row, col))
            .is_some_and(|c| c.value.is_some())
    }

    pub(crate) fn format_pending(&self, row: u32, col: u32) -> bool {
        self.pending
            .borrow()
            .get(&(row, col))
            .is_some_and(|c| !c.format.is_empty())
    }
}

fn check_bounds(properties: &SheetProperties, row: u32, col: u32) -> Result<()> {
    let grid = properties.grid_properties;
    if row > grid.row_count || col > grid.column_count {
        return Err(SheetError::Range {
            label: format!("{}{}", a1::letters(col), row),
            rows: grid.row_count,
            cols: grid.column_count,
        });
    }
    Ok(())
}

// An empty value must be sent as "" to clear the cell; null leaves it as is.
fn wire_value(value: CellValue) -> CellValue {
    match value {
        CellValue::Empty => CellValue::Text(String::new()),
        other => other,
    }
}
