use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::verify::{LookupError, MetadataProvider, SeriesMatch};
use crate::config::MetadataConfig;
use crate::error::Result;

const TVDB_BASE_URL: &str = "https://api4.thetvdb.com/v4";
const OMDB_BASE_URL: &str = "https://www.omdbapi.com/";

fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn transient(err: reqwest::Error) -> LookupError {
    LookupError::Transient(err.to_string())
}

fn status_error(response: Response) -> LookupError {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => LookupError::AuthExpired,
        StatusCode::TOO_MANY_REQUESTS => LookupError::RateLimited,
        _ => LookupError::Transient(format!("API returned status {}: {}", status.as_u16(), body)),
    }
}

#[derive(Deserialize)]
struct TvdbLoginResponse {
    data: TvdbToken,
}

#[derive(Deserialize)]
struct TvdbToken {
    token: String,
}

#[derive(Deserialize)]
struct TvdbSearchResponse {
    #[serde(default)]
    data: Vec<TvdbSeries>,
}

#[derive(Deserialize)]
struct TvdbSeries {
    #[serde(default)]
    tvdb_id: String,
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    year: Option<String>,
}

/// TheTVDB v4 client. Logs in lazily and keeps the bearer token for the session.
pub struct TvdbClient {
    api_key: String,
    base_url: String,
    http: Client,
    token: Mutex<Option<String>>,
}

impl TvdbClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: TVDB_BASE_URL.to_string(),
            http: http_client(timeout)?,
            token: Mutex::new(None),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn login(&self) -> std::result::Result<String, LookupError> {
        debug!("Logging in to TVDB");
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&serde_json::json!({ "apikey": self.api_key }))
            .send()
            .map_err(transient)?;
        if !response.status().is_success() {
            return Err(match status_error(response) {
                LookupError::AuthExpired => {
                    LookupError::Rejected("TVDB rejected the API key".to_string())
                }
                other => other,
            });
        }
        let login: TvdbLoginResponse = response.json().map_err(transient)?;
        Ok(login.data.token)
    }

    fn token(&self) -> std::result::Result<String, LookupError> {
        let mut token = self
            .token
            .lock()
            .map_err(|_| LookupError::Transient("token lock poisoned".to_string()))?;
        if let Some(existing) = token.as_ref() {
            return Ok(existing.clone());
        }
        let fresh = self.login()?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }
}

impl MetadataProvider for TvdbClient {
    fn name(&self) -> &str {
        "tvdb"
    }

    fn search_series(&self, title: &str) -> std::result::Result<Option<SeriesMatch>, LookupError> {
        if self.api_key.is_empty() {
            return Err(LookupError::NotConfigured("TVDB".to_string()));
        }
        let token = self.token()?;
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("query", title), ("type", "series")])
            .bearer_auth(token)
            .send()
            .map_err(transient)?;
        if !response.status().is_success() {
            return Err(status_error(response));
        }
        let search: TvdbSearchResponse = response.json().map_err(transient)?;
        Ok(search.data.into_iter().next().map(|series| SeriesMatch {
            id: if series.tvdb_id.is_empty() {
                series.id
            } else {
                series.tvdb_id
            },
            name: series.name,
            year: series.year.filter(|y| !y.is_empty()),
        }))
    }

    fn reauthenticate(&self) {
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }
}

#[derive(Deserialize)]
struct OmdbSeries {
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "imdbID", default)]
    imdb_id: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

/// OMDb client, used as the fallback provider.
pub struct OmdbClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OmdbClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: OMDB_BASE_URL.to_string(),
            http: http_client(timeout)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl MetadataProvider for OmdbClient {
    fn name(&self) -> &str {
        "omdb"
    }

    fn search_series(&self, title: &str) -> std::result::Result<Option<SeriesMatch>, LookupError> {
        if self.api_key.is_empty() {
            return Err(LookupError::NotConfigured("OMDb".to_string()));
        }
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("t", title), ("type", "series"), ("apikey", self.api_key.as_str())])
            .send()
            .map_err(transient)?;
        if !response.status().is_success() {
            return Err(status_error(response));
        }
        let series: OmdbSeries = response.json().map_err(transient)?;
        match series.error {
            Some(message) if message.to_lowercase().contains("not found") => Ok(None),
            Some(message) => Err(LookupError::Rejected(format!("OMDb error: {message}"))),
            None => Ok(Some(SeriesMatch {
                id: series.imdb_id,
                name: series.title,
                // OMDb reports running series as "2008–2013"
                year: series
                    .year
                    .map(|y| y.chars().take(4).collect::<String>())
                    .filter(|y| !y.is_empty()),
            })),
        }
    }
}

/// Builds the primary (TVDB) and fallback (OMDb) providers from whichever keys are set.
pub fn from_config(
    config: &MetadataConfig,
) -> Result<(Option<Box<dyn MetadataProvider>>, Option<Box<dyn MetadataProvider>>)> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let primary: Option<Box<dyn MetadataProvider>> = match config.tvdb_api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Some(Box::new(TvdbClient::new(key.trim(), timeout)?)),
        _ => None,
    };
    let secondary: Option<Box<dyn MetadataProvider>> = match config.omdb_api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Some(Box::new(OmdbClient::new(key.trim(), timeout)?)),
        _ => None,
    };
    Ok((primary, secondary))
}
