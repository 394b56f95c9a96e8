// Entry API module: the record exchanged with the statistics service, the
// two base URLs discovered at startup, pure request builders for the five
// commands, and a small blocking transport that sends them. The request
// builders never touch the network so validation failures cost nothing.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{CommandError, ResolveError};

/// One test-run statistics record. `(date, application)` is the key the
/// remote service uses; the counters are carried through untouched.
///
/// Missing or `null` fields default to empty/zero so that a file without
/// `date` is reported as missing a mandatory field rather than as malformed
/// JSON.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Entry {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub application: String,
    #[serde(deserialize_with = "null_as_default")]
    pub passed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub failed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Entry {
    /// Parse an entry and check that both key fields are present.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CommandError> {
        let entry: Entry = serde_json::from_slice(bytes)?;
        if entry.date.is_empty() || entry.application.is_empty() {
            return Err(CommandError::MissingMandatoryFields);
        }
        Ok(entry)
    }
}

/// Base URLs of the deployed entry API: the singular CRUD resource and the
/// plural list resource. Built once by the resolver and read-only after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    crud: Url,
    list: Url,
}

impl Endpoints {
    /// `http://<api_id>.<host>/<stage>/entry` and `.../entries`.
    pub fn for_api(api_id: &str, host: &str, stage: &str) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidApiId {
            id: api_id.to_string(),
            reason,
        };
        if api_id.is_empty()
            || !api_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid("expected only ASCII letters, digits and '-'".into()));
        }

        let base = format!("http://{api_id}.{host}/{stage}");
        let crud = Url::parse(&format!("{base}/entry")).map_err(|e| invalid(e.to_string()))?;
        let list = Url::parse(&format!("{base}/entries")).map_err(|e| invalid(e.to_string()))?;
        Ok(Endpoints { crud, list })
    }

    pub fn crud(&self) -> &Url {
        &self.crud
    }

    pub fn list(&self) -> &Url {
        &self.list
    }
}

/// A fully built request, ready to hand to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub method: Method,
    pub url: Url,
    /// JSON body; sent with `Content-Type: application/json` when present.
    pub body: Option<Vec<u8>>,
}

/// POST the file bytes verbatim to the CRUD endpoint.
pub fn create(endpoints: &Endpoints, body: Vec<u8>) -> EntryRequest {
    EntryRequest {
        method: Method::POST,
        url: endpoints.crud().clone(),
        body: Some(body),
    }
}

/// PUT the file bytes to the CRUD endpoint keyed by the entry's own date
/// and application.
pub fn update(endpoints: &Endpoints, body: Vec<u8>) -> Result<EntryRequest, CommandError> {
    let entry = Entry::from_json(&body)?;
    let url = with_query(
        endpoints.crud(),
        &[
            ("date", entry.date.as_str()),
            ("application", entry.application.as_str()),
        ],
    );
    Ok(EntryRequest {
        method: Method::PUT,
        url,
        body: Some(body),
    })
}

pub fn delete(
    endpoints: &Endpoints,
    date: &str,
    application: &str,
) -> Result<EntryRequest, CommandError> {
    Ok(EntryRequest {
        method: Method::DELETE,
        url: keyed_url(endpoints, date, application)?,
        body: None,
    })
}

pub fn find(
    endpoints: &Endpoints,
    date: &str,
    application: &str,
) -> Result<EntryRequest, CommandError> {
    Ok(EntryRequest {
        method: Method::GET,
        url: keyed_url(endpoints, date, application)?,
        body: None,
    })
}

/// GET the list endpoint, filtering only on the values that are not blank.
pub fn list(endpoints: &Endpoints, date: &str, application: &str) -> EntryRequest {
    let filters: Vec<(&str, &str)> = [("date", date.trim()), ("application", application.trim())]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    EntryRequest {
        method: Method::GET,
        url: with_query(endpoints.list(), &filters),
        body: None,
    }
}

fn keyed_url(endpoints: &Endpoints, date: &str, application: &str) -> Result<Url, CommandError> {
    let (date, application) = (date.trim(), application.trim());
    if date.is_empty() || application.is_empty() {
        return Err(CommandError::MissingParameters);
    }
    Ok(with_query(
        endpoints.crud(),
        &[("date", date), ("application", application)],
    ))
}

/// Encodes each value; no `?` at all when `pairs` is empty.
fn with_query(base: &Url, pairs: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs.iter().copied());
    }
    url
}

/// What came back. The status is informational only; bodies of error
/// responses are shown exactly like successful ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// Sends one request and returns the fully drained response.
pub trait Transport {
    fn send(&self, request: &EntryRequest) -> Result<Reply>;
}

/// Blocking reqwest transport with a per-request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &EntryRequest) -> Result<Reply> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let spinner = spinner(format!("{} {}", request.method, request.url));
        let sent = builder.send();
        spinner.finish_and_clear();
        let res = sent.with_context(|| format!("Error sending {} request", request.method))?;

        let status = res.status();
        // `text` consumes the response, so the connection goes back to the
        // pool (or is closed) whichever way this returns.
        let body = res.text().context("Error reading response body")?;
        tracing::info!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            "entry request completed"
        );
        Ok(Reply {
            status: status.as_u16(),
            body,
        })
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
