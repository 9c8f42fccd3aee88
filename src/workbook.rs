use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::client::SheetsClient;
use crate::config::{Config, WritePolicy};
use crate::error::{Result, SheetError};
use crate::model::{
    AddSheetRequest, DeleteSheetRequest, GridProperties, NewSheetProperties, Request,
    SheetProperties,
};
use crate::worksheet::Worksheet;

#[cfg(feature = "google")]
use crate::credentials::Credentials;
#[cfg(feature = "google")]
use crate::google::GoogleClient;

lazy_static! {
    static ref URL_KEY_REGEX: Regex = Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap();
    static ref URL_KEY_PARAM_REGEX: Regex = Regex::new(r"[?&#]key=([^&#]+)").unwrap();
}

const DOCUMENT_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// Extract the document key from a spreadsheet URL.
///
/// # Errors
/// * [`SheetError::DocumentNotFound`] if the URL carries no key
pub fn spreadsheet_key(url: &str) -> Result<String> {
    URL_KEY_REGEX
        .captures(url)
        .or_else(|| URL_KEY_PARAM_REGEX.captures(url))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| SheetError::DocumentNotFound(format!("no spreadsheet key in '{}'", url)))
}

/// Picks a worksheet by zero-based position or by title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "index {}", i),
            SheetSelector::Name(n) => write!(f, "'{}'", n),
        }
    }
}

/// Names a worksheet to delete.
///
/// `Id` is the remote sheet id, which is what a handle obtained from another
/// wrapper or straight from [`SheetProperties`] carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetTarget {
    Id(i64),
    Index(usize),
    Name(String),
}

impl From<&Worksheet<'_>> for SheetTarget {
    fn from(sheet: &Worksheet<'_>) -> Self {
        SheetTarget::Id(sheet.id())
    }
}

impl From<&SheetProperties> for SheetTarget {
    fn from(properties: &SheetProperties) -> Self {
        SheetTarget::Id(properties.sheet_id)
    }
}

impl From<SheetSelector> for SheetTarget {
    fn from(selector: SheetSelector) -> Self {
        match selector {
            SheetSelector::Index(i) => SheetTarget::Index(i),
            SheetSelector::Name(n) => SheetTarget::Name(n),
        }
    }
}

impl From<usize> for SheetTarget {
    fn from(index: usize) -> Self {
        SheetTarget::Index(index)
    }
}

impl From<&str> for SheetTarget {
    fn from(name: &str) -> Self {
        SheetTarget::Name(name.to_string())
    }
}

impl From<String> for SheetTarget {
    fn from(name: String) -> Self {
        SheetTarget::Name(name)
    }
}

/// One remote spreadsheet document.
///
/// The workbook owns the connection to the service. Worksheets borrow the
/// workbook and cells borrow their worksheet, so neither can outlive it.
pub struct Workbook {
    url: String,
    key: String,
    client: Box<dyn SheetsClient>,
    write_policy: WritePolicy,
}

impl fmt::Debug for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workbook")
            .field("url", &self.url)
            .field("key", &self.key)
            .field("write_policy", &self.write_policy)
            .finish()
    }
}

impl fmt::Display for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Workbook '{}'>", self.url)
    }
}

impl Workbook {
    /// Authenticate with a service account and bind to the document at `url`.
    ///
    /// Settings come from [`Config::from_env`].
    ///
    /// # Arguments
    /// * `url` - Document URL, e.g. `https://docs.google.com/spreadsheets/d/<key>/edit`
    /// * `credentials` - Key file path, JSON text or decoded map
    ///
    /// # Errors
    /// * [`SheetError::Input`] / [`SheetError::Authentication`] for bad credentials
    /// * [`SheetError::DocumentNotFound`] if the URL doesn't resolve
    ///
    /// # Examples
    /// ```no_run
    /// use sheetlink::Workbook;
    ///
    /// let workbook = Workbook::open(
    ///     "https://docs.google.com/spreadsheets/d/1pzCWLj0Azskd8LVggQ/edit",
    ///     "static/cred.json",
    /// )?;
    /// println!("{:?}", workbook.sheet_names()?);
    /// # Ok::<(), sheetlink::SheetError>(())
    /// ```
    #[cfg(feature = "google")]
    pub fn open(url: &str, credentials: impl Into<Credentials>) -> Result<Self> {
        Self::open_with_config(url, credentials, &Config::from_env()?)
    }

    #[cfg(feature = "google")]
    pub fn open_with_config(url: &str, credentials: impl Into<Credentials>, config: &Config) -> Result<Self> {
        let key = spreadsheet_key(url)?;
        let service_key = credentials.into().load()?;
        let client = GoogleClient::authorize(&service_key, config)?;
        Self::bind(url.to_string(), key, Box::new(client), config.write_policy)
    }

    /// Same as [`Workbook::open`] for a bare document key.
    #[cfg(feature = "google")]
    pub fn open_by_key(key: &str, credentials: impl Into<Credentials>) -> Result<Self> {
        Self::open_with_config(&format!("{}{}", DOCUMENT_URL_PREFIX, key), credentials, &Config::from_env()?)
    }

    /// Bind to `url` through an already constructed client.
    pub fn with_client(url: &str, client: impl SheetsClient + 'static) -> Result<Self> {
        Self::with_client_and_config(url, client, &Config::default())
    }

    pub fn with_client_and_config(url: &str, client: impl SheetsClient + 'static, config: &Config) -> Result<Self> {
        let key = spreadsheet_key(url)?;
        Self::bind(url.to_string(), key, Box::new(client), config.write_policy)
    }

    fn bind(url: String, key: String, client: Box<dyn SheetsClient>, write_policy: WritePolicy) -> Result<Self> {
        let meta = client.fetch_spreadsheet(&key).map_err(|e| match e {
            SheetError::Api { status: 404, .. } => SheetError::DocumentNotFound(url.clone()),
            other => other,
        })?;
        log::info!(
            "opened workbook '{}' ({} worksheets)",
            meta.properties.title,
            meta.sheets.len()
        );
        Ok(Workbook {
            url,
            key,
            client,
            write_policy,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Document key parsed from the URL.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn client(&self) -> &dyn SheetsClient {
        self.client.as_ref()
    }

    /// Document title, read from the service.
    pub fn title(&self) -> Result<String> {
        Ok(self.client.fetch_spreadsheet(&self.key)?.properties.title)
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Policy for worksheets materialized from now on. Existing worksheet
    /// handles keep the policy they were created with.
    pub fn set_write_policy(&mut self, policy: WritePolicy) {
        self.write_policy = policy;
    }

    /// Properties of every tab, in tab order.
    pub fn sheet_properties(&self) -> Result<Vec<SheetProperties>> {
        let meta = self.client.fetch_spreadsheet(&self.key)?;
        let mut sheets: Vec<SheetProperties> = meta.sheet_properties().cloned().collect();
        sheets.sort_by_key(|s| s.index);
        Ok(sheets)
    }

    /// Current properties of one tab.
    pub(crate) fn properties_of(&self, sheet_id: i64) -> Result<SheetProperties> {
        self.sheet_properties()?
            .into_iter()
            .find(|s| s.sheet_id == sheet_id)
            .ok_or_else(|| SheetError::NotFound(format!("worksheet with id {}", sheet_id)))
    }

    /// Every worksheet, in tab order.
    ///
    /// The tab list is queried on each call; the iterator itself makes no
    /// further requests.
    pub fn worksheets(&self) -> Result<Worksheets<'_>> {
        Ok(Worksheets {
            workbook: self,
            sheets: self.sheet_properties()?.into_iter(),
        })
    }

    /// Tab titles in tab order.
    pub fn sheet_names(&self) -> Result<Vec<String>> {
        Ok(self.sheet_properties()?.into_iter().map(|s| s.title).collect())
    }

    /// Look up a worksheet by zero-based index or by title.
    ///
    /// # Errors
    /// * [`SheetError::NotFound`] if nothing matches
    pub fn worksheet(&self, selector: impl Into<SheetSelector>) -> Result<Worksheet<'_>> {
        let selector: SheetSelector = selector.into();
        let properties = self.resolve(&SheetTarget::from(selector))?;
        Ok(Worksheet::new(self, &properties, self.write_policy))
    }

    pub fn get_sheet_by_name(&self, name: &str) -> Result<Worksheet<'_>> {
        self.worksheet(name)
    }

    /// The first tab.
    pub fn active_worksheet(&self) -> Result<Worksheet<'_>> {
        self.worksheet(0usize)
    }

    /// Append a tab and return it.
    pub fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> Result<Worksheet<'_>> {
        let request = Request::AddSheet(AddSheetRequest {
            properties: NewSheetProperties {
                title: title.to_string(),
                grid_properties: GridProperties {
                    row_count: rows,
                    column_count: cols,
                },
            },
        });
        self.client.batch_update(&self.key, &[request])?;
        log::info!("added worksheet '{}' ({}x{})", title, rows, cols);
        self.worksheet(title)
    }

    /// Delete a tab named by handle, sheet id, title or index.
    ///
    /// # Errors
    /// * [`SheetError::NotFound`] if the target doesn't resolve
    pub fn delete_worksheet<T: Into<SheetTarget>>(&self, target: T) -> Result<()> {
        let properties = self.resolve(&target.into())?;
        let request = Request::DeleteSheet(DeleteSheetRequest {
            sheet_id: properties.sheet_id,
        });
        self.client.batch_update(&self.key, &[request])?;
        log::info!("deleted worksheet '{}'", properties.title);
        Ok(())
    }

    fn resolve(&self, target: &SheetTarget) -> Result<SheetProperties> {
        let sheets = self.sheet_properties()?;
        let found = match target {
            SheetTarget::Id(id) => sheets.into_iter().find(|s| s.sheet_id == *id),
            SheetTarget::Index(i) => sheets.into_iter().nth(*i),
            SheetTarget::Name(n) => sheets.into_iter().find(|s| &s.title == n),
        };
        found.ok_or_else(|| {
            let what = match target {
                SheetTarget::Id(id) => format!("worksheet with id {}", id),
                SheetTarget::Index(i) => format!("worksheet at index {}", i),
                SheetTarget::Name(n) => format!("worksheet '{}'", n),
            };
            SheetError::NotFound(what)
        })
    }
}

/// Iterator over a workbook's tabs, from [`Workbook::worksheets`].
pub struct Worksheets<'wb> {
    workbook: &'wb Workbook,
    sheets: std::vec::IntoIter<SheetProperties>,
}

impl<'wb> Iterator for Worksheets<'wb> {
    type Item = Worksheet<'wb>;

    fn next(&mut self) -> Option<Self::Item> {
        let properties = self.sheets.next()?;
        Some(Worksheet::new(
            self.workbook,
            &properties,
            self.workbook.write_policy,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sheets.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_come_out_of_urls() {
        assert_eq!(
            spreadsheet_key("https://docs.google.com/spreadsheets/d/1pzCWLj0Az-skd_8/edit#gid=0").unwrap(),
            "1pzCWLj0Az-skd_8"
        );
        assert_eq!(
            spreadsheet_key("https://spreadsheets.google.com/ccc?key=0Bm&usp=sharing").unwrap(),
            "0Bm"
        );
        assert!(matches!(
            spreadsheet_key("https://example.com/nothing"),
            Err(SheetError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn selectors_convert() {
        assert_eq!(SheetSelector::from(2usize), SheetSelector::Index(2));
        assert_eq!(SheetSelector::from("Data"), SheetSelector::Name("Data".to_string()));
        assert_eq!(
            SheetTarget::from(SheetSelector::from("Data")),
            SheetTarget::Name("Data".to_string())
        );
    }
}
