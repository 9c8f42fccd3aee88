use std::fmt;

use crate::a1;
use crate::config::WritePolicy;
use crate::error::{Result, SheetError};
use crate::model::{CellFormat, CellValue, ValueRenderOption};
use crate::styles::{Color, Font, HorizontalAlign, StyleValue};
use crate::worksheet::Worksheet;

/// One cell of a worksheet, as last read or written locally.
///
/// `row` and `column` are 1-based and fixed. Setters record the change in
/// the owning worksheet's dirty set; the worksheet is borrowed, not owned.
#[derive(Debug, Clone)]
pub struct Cell<'a> {
    sheet: &'a Worksheet<'a>,
    row: u32,
    column: u32,
    value: CellValue,
    font: Option<Font>,
    fill: Option<Color>,
    horizontal_align: Option<HorizontalAlign>,
}

impl<'a> Cell<'a> {
    pub(crate) fn new(sheet: &'a Worksheet<'a>, row: u32, column: u32, value: CellValue) -> Self {
        Cell {
            sheet,
            row,
            column,
            value,
            font: None,
            fill: None,
            horizontal_align: None,
        }
    }

    pub fn worksheet(&self) -> &'a Worksheet<'a> {
        self.sheet
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn col(&self) -> u32 {
        self.column
    }

    pub fn column_letter(&self) -> String {
        a1::letters(self.column)
    }

    /// Position in A1 notation, e.g. `B7`.
    pub fn coordinates(&self) -> String {
        format!("{}{}", a1::letters(self.column), self.row)
    }

    /// Last known value. May lag the service until [`Cell::refresh`], or lead
    /// it until the worksheet is flushed.
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    /// Assign a value.
    ///
    /// Under [`WritePolicy::Deferred`] the value is only staged; under
    /// [`WritePolicy::Immediate`] it is written at once and nothing is staged.
    pub fn set_value(&mut self, value: impl Into<CellValue>) -> Result<()> {
        let value = value.into();
        match self.sheet.write_policy() {
            WritePolicy::Deferred => {
                self.sheet.stage_value(self.row, self.column, value.clone());
            }
            WritePolicy::Immediate => {
                self.sheet.update_cell(self.row, self.column, value.clone())?;
            }
        }
        self.value = value;
        Ok(())
    }

    pub fn font(&self) -> Option<&Font> {
        self.font.as_ref()
    }

    pub fn set_font(&mut self, font: Font) -> Result<()> {
        if font.font_size == Some(0) {
            return Err(SheetError::Validation("font size must be positive".to_string()));
        }
        if font.font_family.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(SheetError::Validation("font family must not be blank".to_string()));
        }
        self.sheet.stage_format(
            self.row,
            self.column,
            &CellFormat {
                text_format: Some(font.clone()),
                ..Default::default()
            },
        );
        self.font = Some(font);
        Ok(())
    }

    pub fn fill(&self) -> Option<Color> {
        self.fill
    }

    /// Set the background color from a [`Color`] or a name / hex string.
    pub fn set_fill(&mut self, fill: impl StyleValue<Color>) -> Result<()> {
        let color = fill.into_style()?;
        self.sheet.stage_format(
            self.row,
            self.column,
            &CellFormat {
                background_color: Some(color),
                ..Default::default()
            },
        );
        self.fill = Some(color);
        Ok(())
    }

    pub fn horizontal_align(&self) -> Option<HorizontalAlign> {
        self.horizontal_align
    }

    /// Set the alignment; `"centre"` is accepted for `center`.
    pub fn set_horizontal_align(&mut self, align: impl StyleValue<HorizontalAlign>) -> Result<()> {
        let align = align.into_style()?;
        self.sheet.stage_format(
            self.row,
            self.column,
            &CellFormat {
                horizontal_alignment: Some(align),
                ..Default::default()
            },
        );
        self.horizontal_align = Some(align);
        Ok(())
    }

    /// Whether this position has a value waiting for a flush.
    pub fn is_value_dirty(&self) -> bool {
        self.sheet.value_pending(self.row, self.column)
    }

    /// Whether this position has formatting waiting for a flush.
    pub fn is_style_dirty(&self) -> bool {
        self.sheet.format_pending(self.row, self.column)
    }

    /// Re-read the value from the service.
    ///
    /// An unflushed value for this position is discarded; unflushed
    /// formatting is kept.
    pub fn refresh(&mut self) -> Result<()> {
        self.value = self
            .sheet
            .fetch_value(self.row, self.column, ValueRenderOption::FormattedValue)?;
        self.sheet.discard_value(self.row, self.column);
        Ok(())
    }

    /// The same cell read as formula text.
    pub fn as_formula(&self) -> Result<Cell<'a>> {
        self.sheet
            .cell((self.row, self.column), ValueRenderOption::Formula)
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Cell '{}'>", self.coordinates())
    }
}
