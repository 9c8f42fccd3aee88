#![cfg(not(tarpaulin_include))]

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cell::RefCell;

use crate::client::SheetsClient;
use crate::config::Config;
use crate::credentials::ServiceAccountKey;
use crate::error::{Result, SheetError};
use crate::model::{CellValue, Request, SpreadsheetMeta, ValueRange, ValueRenderOption};

const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the token actually expires.
const TOKEN_SLACK_SECS: i64 = 60;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone, Debug)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Sheets v4 over HTTPS, authorized as a service account.
pub struct GoogleClient {
    http: Client,
    key: ServiceAccountKey,
    api_base: String,
    token_url: String,
    scopes: Vec<String>,
    token: RefCell<Option<AccessToken>>,
}

impl GoogleClient {
    /// Build a client and fetch a first access token.
    ///
    /// # Errors
    /// * [`SheetError::Authentication`] if the key can't sign or the token
    ///   endpoint rejects the grant
    pub fn authorize(key: &ServiceAccountKey, config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        let client = GoogleClient {
            http,
            key: key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_url: key.token_uri.clone().unwrap_or_else(|| config.token_url.clone()),
            scopes: config.scopes.clone(),
            token: RefCell::new(None),
        };
        client.access_token()?;
        log::info!("authorized as {}", client.key.client_email);
        Ok(client)
    }

    fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token.borrow().as_ref() {
            if token_is_fresh(token, Utc::now()) {
                return Ok(token.token.clone());
            }
        }
        let fresh = self.request_token()?;
        let token = fresh.token.clone();
        self.token.replace(Some(fresh));
        Ok(token)
    }

    fn request_token(&self) -> Result<AccessToken> {
        let now = Utc::now();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.token_url,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| SheetError::Authentication(format!("unusable private key: {}", e)))?;
        let assertion = jsonwebtoken::encode(&header, &claims, &signing_key)
            .map_err(|e| SheetError::Authentication(format!("cannot sign token request: {}", e)))?;

        log::debug!("requesting access token from {}", self.token_url);
        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(SheetError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }
        let body: TokenResponse = response.json()?;
        Ok(AccessToken {
            token: body.access_token,
            expires_at: now + ChronoDuration::seconds(body.expires_in.unwrap_or(TOKEN_LIFETIME_SECS)),
        })
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(self.access_token()?).send()?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let text = response.text().unwrap_or_default();
        let err = api_error(status, text);
        log::warn!("sheets API: {}", err);
        Err(err)
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> String {
        format!("{}/spreadsheets/{}", self.api_base, spreadsheet_id)
    }
}

// A cached token is reused until it is within TOKEN_SLACK_SECS of expiry.
fn token_is_fresh(token: &AccessToken, now: DateTime<Utc>) -> bool {
    token.expires_at - ChronoDuration::seconds(TOKEN_SLACK_SECS) > now
}

/// Turn a failed response into [`SheetError::Api`], preferring the message
/// from a Google error body over the raw text.
fn api_error(status: u16, body: String) -> SheetError {
    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body,
    };
    SheetError::Api { status, message }
}

impl SheetsClient for GoogleClient {
    fn fetch_spreadsheet(&self, spreadsheet_id: &str) -> Result<SpreadsheetMeta> {
        let request = self
            .http
            .get(self.spreadsheet_url(spreadsheet_id))
            .query(&[("fields", "spreadsheetId,properties.title,sheets.properties")]);
        Ok(self.send(request)?.json()?)
    }

    fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRenderOption,
    ) -> Result<Vec<Vec<CellValue>>> {
        let url = format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet_id),
            urlencoding::encode(range)
        );
        let request = self.http.get(url).query(&[
            ("valueRenderOption", render.as_str()),
            ("majorDimension", "ROWS"),
        ]);
        let block: ValueRange = self.send(request)?.json()?;
        Ok(block.values)
    }

    fn update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()> {
        let url = format!("{}/values:batchUpdate", self.spreadsheet_url(spreadsheet_id));
        let body = json!({
            "valueInputOption": "USER_ENTERED",
            "data": data,
        });
        self.send(self.http.post(url).json(&body))?;
        Ok(())
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: &[Request]) -> Result<()> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(spreadsheet_id));
        let body = json!({ "requests": requests });
        self.send(self.http.post(url).json(&body))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Workbook;

    fn token_expiring_at(expires_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            token: "ya29.token".to_string(),
            expires_at,
        }
    }

    #[test]
    fn tokens_are_reused_until_close_to_expiry() {
        let now = Utc::now();
        assert!(token_is_fresh(&token_expiring_at(now + ChronoDuration::seconds(3600)), now));
        assert!(token_is_fresh(
            &token_expiring_at(now + ChronoDuration::seconds(TOKEN_SLACK_SECS + 1)),
            now
        ));
        assert!(!token_is_fresh(
            &token_expiring_at(now + ChronoDuration::seconds(TOKEN_SLACK_SECS)),
            now
        ));
        assert!(!token_is_fresh(&token_expiring_at(now - ChronoDuration::seconds(5)), now));
    }

    #[test]
    fn google_error_bodies_are_decoded() {
        let body = r#"{"error": {"code": 400, "message": "Unable to parse range: Nope!A1", "status": "INVALID_ARGUMENT"}}"#;
        match api_error(400, body.to_string()) {
            SheetError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Unable to parse range: Nope!A1");
            }
            other => panic!("expected an API error, got {:?}", other),
        }
    }

    #[test]
    fn other_error_bodies_are_kept_verbatim() {
        for body in ["<html>Bad Gateway</html>", "", r#"{"error": {}}"#] {
            match api_error(502, body.to_string()) {
                SheetError::Api { status, message } => {
                    assert_eq!(status, 502);
                    assert_eq!(message, body);
                }
                other => panic!("expected an API error, got {:?}", other),
            }
        }
    }

    struct MissingDocument;

    impl SheetsClient for MissingDocument {
        fn fetch_spreadsheet(&self, _: &str) -> Result<SpreadsheetMeta> {
            let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
            Err(api_error(404, body.to_string()))
        }

        fn get_values(&self, _: &str, _: &str, _: ValueRenderOption) -> Result<Vec<Vec<CellValue>>> {
            unreachable!()
        }

        fn update_values(&self, _: &str, _: &[ValueRange]) -> Result<()> {
            unreachable!()
        }

        fn batch_update(&self, _: &str, _: &[Request]) -> Result<()> {
            unreachable!()
        }
    }

    #[test]
    fn a_404_from_the_service_means_no_document() {
        let err = Workbook::with_client("https://docs.google.com/spreadsheets/d/gone/edit", MissingDocument)
            .unwrap_err();
        assert!(matches!(err, SheetError::DocumentNotFound(_)));
    }
}
