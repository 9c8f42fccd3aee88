use crate::error::Result;
use crate::model::{CellValue, Request, SpreadsheetMeta, ValueRange, ValueRenderOption};

/// The operations the access layer needs from the remote spreadsheet service.
///
/// Every call is a blocking request/response round trip. Implementations
/// surface transport failures unchanged and never retry.
pub trait SheetsClient {
    /// Document title and tab list, in tab order.
    fn fetch_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetMeta>;

    /// Values of an A1 range such as `'Sheet1'!A1:C3`.
    ///
    /// Like the service, trailing empty rows and cells may be omitted.
    fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRenderOption,
    ) -> Result<Vec<Vec<CellValue>>>;

    /// Write several ranges in one request, parsed as if typed by a user.
    fn update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()>;

    /// Structural and formatting changes in one request.
    fn batch_update(&self, spreadsheet_id: &str, requests: &[Request]) -> Result<()>;
}
