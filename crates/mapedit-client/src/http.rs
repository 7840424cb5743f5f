//! HTTP access to the map data API and the sidebar views.

use gloo::net::http::{Request, Response};
use mapedit_core::Query;
use serde::de::DeserializeOwned;
use tracing::debug;
use wasm_bindgen::JsValue;
use web_sys::UrlSearchParams;

/// Marks requests as AJAX so the server answers with a fragment.
const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("network error: {0}")]
    Transport(#[from] gloo::net::Error),
    #[error("HTTP {status} {status_text}")]
    Status { status: u16, status_text: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("browser API error: {0}")]
    Browser(String),
}

impl HttpError {
    /// Status and text shown in the sidebar error panel. Transport errors
    /// have no status and report `0`.
    pub fn status(&self) -> (u16, String) {
        match self {
            Self::Status {
                status,
                status_text,
            } => (*status, status_text.clone()),
            other => (0, other.to_string()),
        }
    }
}

fn browser_error(value: &JsValue) -> HttpError {
    HttpError::Browser(format!("{value:?}"))
}

fn encode(pairs: &[(String, String)]) -> Result<UrlSearchParams, HttpError> {
    let params = UrlSearchParams::new().map_err(|err| browser_error(&err))?;
    for (name, value) in pairs {
        params.append(name, value);
    }
    Ok(params)
}

/// Appends `query` to `url`, repeating keys as given.
pub fn with_query(url: &str, query: &Query) -> Result<String, HttpError> {
    if query.is_empty() {
        return Ok(url.to_string());
    }
    let params = encode(query)?;
    let encoded = params.to_string().as_string().unwrap_or_default();
    let separator = if url.contains('?') { '&' } else { '?' };
    Ok(format!("{url}{separator}{encoded}"))
}

fn check(response: Response) -> Result<Response, HttpError> {
    if response.ok() {
        Ok(response)
    } else {
        Err(HttpError::Status {
            status: response.status(),
            status_text: response.status_text(),
        })
    }
}

pub async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, HttpError> {
    debug!("GET {url}");
    let response = Request::get(url)
        .header("Accept", "application/json")
        .send()
        .await?;
    check(response)?
        .json::<T>()
        .await
        .map_err(|err| HttpError::Decode(err.to_string()))
}

/// Loads a sidebar fragment.
pub async fn get_fragment(url: &str) -> Result<String, HttpError> {
    debug!("GET {url} (sidebar)");
    let response = Request::get(url)
        .header(REQUESTED_WITH.0, REQUESTED_WITH.1)
        .send()
        .await?;
    Ok(check(response)?.text().await?)
}

/// Posts form fields url-encoded and returns the answering fragment.
pub async fn post_form(url: &str, fields: &[(String, String)]) -> Result<String, HttpError> {
    debug!("POST {url} ({} fields)", fields.len());
    let body = encode(fields)?;
    let response = Request::post(url)
        .header(REQUESTED_WITH.0, REQUESTED_WITH.1)
        .body(JsValue::from(body))?
        .send()
        .await?;
    Ok(check(response)?.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_query_repeats_type() {
        let query = vec![
            ("level".to_string(), "0".to_string()),
            ("type".to_string(), "room".to_string()),
            ("type".to_string(), "door".to_string()),
        ];
        assert_eq!(
            with_query("/api/geometries/", &query).unwrap(),
            "/api/geometries/?level=0&type=room&type=door"
        );
        assert_eq!(with_query("/api/x/?a=1", &query[..1].to_vec()).unwrap(), "/api/x/?a=1&level=0");
    }

    #[wasm_bindgen_test]
    fn test_status_for_error_panel() {
        let err = HttpError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(err.status(), (404, "Not Found".to_string()));
        assert_eq!(HttpError::Decode("eof".to_string()).status().0, 0);
    }
}
