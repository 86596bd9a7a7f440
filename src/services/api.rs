//! Predictions API
//!
//! HTTP client for the prediction service: paginated browse and search
//! endpoints, the dataset catalog, and the one-shot spreadsheet export.

use std::borrow::Cow;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::constants::EXPORT_FILE_SUFFIX;
use crate::domain::{ApiConfig, DatasetKey, LoadMode, PageBody, ResultPage};
use crate::error::{Error, Result};
use crate::services::{PageRequest, PageSource};

/// Downloaded export of a full result set
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// Suggested file name for the download
    pub file_name: String,
    /// Content type reported by the server, if any
    pub content_type: Option<String>,
    /// Opaque spreadsheet payload
    pub bytes: Bytes,
}

#[derive(Deserialize)]
struct FilesBody {
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Deserialize)]
struct SheetsBody {
    #[serde(default)]
    sheets: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the prediction service
#[derive(Clone, Debug)]
pub struct PredictionsApi {
    client: Client,
    base_url: Url,
}

impl PredictionsApi {
    /// Create a client; the timeout applies to every request
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| Error::Invalid {
            message: format!("invalid api.base_url {:?}: {e}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Invalid {
                message: format!("api.base_url {base_url} cannot be used as a base"),
            });
        }

        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Invalid {
                message: format!("{} cannot be used as a base", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL and query parameters for one page request
    pub fn page_url(&self, request: &PageRequest) -> Result<Url> {
        let dataset = &request.dataset;
        let mut url = match request.mode {
            LoadMode::Browse => self.endpoint(&["predict_churn", dataset.file(), dataset.sheet()])?,
            LoadMode::Search => {
                self.endpoint(&["predict_churn", dataset.file(), dataset.sheet(), "search"])?
            }
        };
        {
            let mut pairs = url.query_pairs_mut();
            if request.mode == LoadMode::Search {
                pairs.append_pair("search", &request.query);
            }
            pairs
                .append_pair("page", &request.page.to_string())
                .append_pair("page_size", &request.page_size.to_string());
        }
        Ok(url)
    }

    /// Fetch one page of predictions
    pub async fn fetch(&self, request: PageRequest) -> Result<ResultPage> {
        let url = self.page_url(&request)?;
        tracing::debug!(
            dataset = %request.dataset,
            mode = %request.mode,
            page = request.page,
            "Requesting prediction page"
        );

        let body: PageBody = self.get_json(url).await?;
        Ok(body.into_page(request.page))
    }

    /// List uploaded dataset files
    pub async fn list_files(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["get_files"])?;
        let body: FilesBody = self.get_json(url).await?;
        Ok(body.files)
    }

    /// List the sheets of one uploaded file
    pub async fn list_sheets(&self, file: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["get_sheets", file])?;
        let body: SheetsBody = self.get_json(url).await?;
        Ok(body.sheets)
    }

    /// Resolve a selection the way the dashboard does: first file, first sheet
    pub async fn default_dataset(&self) -> Result<Option<DatasetKey>> {
        let Some(file) = self.list_files().await?.into_iter().next() else {
            return Ok(None);
        };
        let sheet = self.list_sheets(&file).await?.into_iter().next();
        Ok(sheet.and_then(|sheet| DatasetKey::new(file, sheet).ok()))
    }

    /// Download the complete formatted result set for a dataset
    pub async fn export(&self, dataset: &DatasetKey) -> Result<ExportArtifact> {
        let url = self.endpoint(&["predict_churn", dataset.file(), dataset.sheet(), "export"])?;
        tracing::info!(dataset = %dataset, "Requesting prediction export");

        let response = self.send(url).await?;
        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition)
            .unwrap_or_else(|| default_export_name(dataset));
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        tracing::info!(
            dataset = %dataset,
            bytes = bytes.len(),
            file = %file_name,
            "Export downloaded"
        );

        Ok(ExportArtifact {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Issue a GET and turn non-success statuses into errors
    async fn send(&self, url: Url) -> Result<Response> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Err(Error::Status {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(url.clone()).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl PageSource for PredictionsApi {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<ResultPage>> {
        let api = self.clone();
        async move { api.fetch(request).await }.boxed()
    }
}

fn default_export_name(dataset: &DatasetKey) -> String {
    format!("{}_{}_{}", dataset.file_stem(), dataset.sheet(), EXPORT_FILE_SUFFIX)
}

/// Extract the file name from a `Content-Disposition` header value
fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            // RFC 5987 form: filename*=UTF-8''name.xlsx
            "filename*" => {
                if let Some((_, encoded)) = raw.split_once("''") {
                    let decoded = urlencoding::decode(encoded.trim_matches('"'))
                        .ok()
                        .map(Cow::into_owned);
                    if let Some(decoded) = decoded.filter(|name| !name.is_empty()) {
                        return Some(decoded);
                    }
                }
            }
            "filename" => {
                let name = raw.trim().trim_matches('"').to_string();
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn api() -> PredictionsApi {
        PredictionsApi::new(&ApiConfig::default()).expect("api")
    }

    fn request(mode: LoadMode, query: &str, page: u32) -> PageRequest {
        PageRequest {
            dataset: DatasetKey::new("sales report.xlsx", "Q1").expect("key"),
            mode,
            query: Arc::from(query),
            page,
            page_size: 20,
        }
    }

    #[test]
    fn test_browse_url() {
        let url = api().page_url(&request(LoadMode::Browse, "", 2)).expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:5001/predict_churn/sales%20report.xlsx/Q1?page=2&page_size=20"
        );
    }

    #[test]
    fn test_search_url_encodes_term() {
        let url = api().page_url(&request(LoadMode::Search, "churn=1", 1)).expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:5001/predict_churn/sales%20report.xlsx/Q1/search?search=churn%3D1&page=1&page_size=20"
        );
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let config = ApiConfig {
            base_url: "http://gateway.local/api/".to_string(),
            ..Default::default()
        };
        let api = PredictionsApi::new(&config).expect("api");
        let url = api.endpoint(&["get_sheets", "a/b.xlsx"]).expect("url");
        assert_eq!(url.as_str(), "http://gateway.local/api/get_sheets/a%2Fb.xlsx");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(PredictionsApi::new(&config), Err(Error::Invalid { .. })));
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="sales_Q1.xlsx""#).as_deref(),
            Some("sales_Q1.xlsx")
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=plain.xlsx").as_deref(),
            Some("plain.xlsx")
        );
        assert_eq!(
            parse_content_disposition(
                "attachment; filename=\"fallback.xlsx\"; filename*=UTF-8''ventas%20T1.xlsx"
            )
            .as_deref(),
            Some("ventas T1.xlsx")
        );
        // undecodable extended form falls back to the plain name
        assert_eq!(
            parse_content_disposition(
                "attachment; filename=\"fallback.xlsx\"; filename*=UTF-8''%FF.xlsx"
            )
            .as_deref(),
            Some("fallback.xlsx")
        );
        assert_eq!(parse_content_disposition("inline"), None);
    }

    #[test]
    fn test_default_export_name() {
        let key = DatasetKey::new("sales.xlsx", "Q1").expect("key");
        assert_eq!(default_export_name(&key), "sales_Q1_predictions.xlsx");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
        };
        let api = PredictionsApi::new(&config).expect("api");
        let err = api.fetch(request(LoadMode::Browse, "", 1)).await.expect_err("error");
        assert!(err.is_transport(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_silent_service_times_out() {
        // the kernel completes the handshake; nothing ever answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let config = ApiConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: 1,
        };
        let api = PredictionsApi::new(&config).expect("api");

        let err = api.fetch(request(LoadMode::Browse, "", 1)).await.expect_err("error");
        assert!(matches!(err, Error::Timeout { .. }), "unexpected error: {err}");
        assert!(err.is_transport());
        drop(listener);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let body = "not json!";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        });

        let config = ApiConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: 5,
        };
        let api = PredictionsApi::new(&config).expect("api");
        let err = api.fetch(request(LoadMode::Browse, "", 1)).await.expect_err("error");
        assert!(matches!(err, Error::Malformed { .. }), "unexpected error: {err}");
        assert!(err.is_malformed());
        let _ = server.join();
    }
}
