use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{MatchSource, SeriesCandidate, TitleResolution};
use crate::error::{Error, Result};

/// One series returned by a metadata provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMatch {
    pub id: String,
    pub name: String,
    pub year: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("authentication expired")]
    AuthExpired,

    #[error("rate limited")]
    RateLimited,

    #[error("{0} API key not configured")]
    NotConfigured(String),

    /// The provider answered definitively; retrying will not change it.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transient(String),
}

impl LookupError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LookupError::AuthExpired | LookupError::RateLimited | LookupError::Transient(_)
        )
    }
}

/// A TV metadata service that can look up a series by title.
pub trait MetadataProvider: Send + Sync {
    /// Short lowercase name, used in cache keys and reasons.
    fn name(&self) -> &str;

    /// Best match for `title`. `Ok(None)` means the service found nothing.
    fn search_series(&self, title: &str) -> std::result::Result<Option<SeriesMatch>, LookupError>;

    /// Forget any session token so the next search logs in again.
    fn reauthenticate(&self) {}
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based): 1s, 2s, 4s with the default base.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

#[derive(Debug, Clone)]
enum CachedLookup {
    Found(SeriesMatch),
    Missing,
    Failed(LookupError),
}

impl CachedLookup {
    fn from_result(result: &std::result::Result<Option<SeriesMatch>, LookupError>) -> Self {
        match result {
            Ok(Some(found)) => CachedLookup::Found(found.clone()),
            Ok(None) => CachedLookup::Missing,
            Err(err) => CachedLookup::Failed(err.clone()),
        }
    }

    fn to_result(&self) -> std::result::Result<Option<SeriesMatch>, LookupError> {
        match self {
            CachedLookup::Found(found) => Ok(Some(found.clone())),
            CachedLookup::Missing => Ok(None),
            CachedLookup::Failed(err) => Err(err.clone()),
        }
    }
}

/// Lookup results for one session, keyed by `provider:title`.
#[derive(Debug, Default)]
pub struct VerificationCache {
    entries: RwLock<HashMap<String, CachedLookup>>,
}

impl VerificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(provider: &str, title: &str) -> String {
        format!("{provider}:{title}")
    }

    fn get(&self, key: &str) -> Option<CachedLookup> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// Stores `value` unless `key` already has an entry, and returns whatever is stored.
    /// The first answer for a key wins.
    fn insert_first(&self, key: String, value: CachedLookup) -> CachedLookup {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert(value).clone()
    }

    pub fn contains(&self, provider: &str, title: &str) -> bool {
        self.get(&Self::key(provider, title)).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

fn accept_single(
    resolution: &mut TitleResolution,
    provider: &str,
    found: &SeriesMatch,
    side: MatchSource,
) {
    resolution.resolved_title = found.name.clone();
    resolution.ambiguous = false;
    resolution.confidence = 0.95;
    resolution.reason = format!(
        "{provider} verified: '{}' ({side} match, no other match)",
        found.name
    );
}

/// Settles ambiguous TV titles against external metadata providers.
///
/// The secondary provider is only consulted when the primary one fails outright.
pub struct Verifier {
    primary: Option<Box<dyn MetadataProvider>>,
    secondary: Option<Box<dyn MetadataProvider>>,
    retry: RetryPolicy,
    cache: VerificationCache,
}

impl Verifier {
    pub fn new(
        primary: Option<Box<dyn MetadataProvider>>,
        secondary: Option<Box<dyn MetadataProvider>>,
    ) -> Self {
        Self {
            primary,
            secondary,
            retry: RetryPolicy::default(),
            cache: VerificationCache::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    fn search_with_retry(
        &self,
        provider: &dyn MetadataProvider,
        title: &str,
    ) -> std::result::Result<Option<SeriesMatch>, LookupError> {
        let mut last_error = LookupError::Transient("no attempt made".to_string());
        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let backoff = self.retry.delay_for(attempt);
                debug!(
                    "{} lookup for '{}' retry {} in {:?}",
                    provider.name(),
                    title,
                    attempt,
                    backoff
                );
                thread::sleep(backoff);
            }

            match provider.search_series(title) {
                Ok(found) => return Ok(found),
                Err(LookupError::AuthExpired) => {
                    provider.reauthenticate();
                    last_error = LookupError::AuthExpired;
                }
                Err(err) if err.is_retryable() => last_error = err,
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    /// Cached lookup of `title`. Failures are cached as well.
    fn lookup(
        &self,
        provider: &dyn MetadataProvider,
        title: &str,
    ) -> std::result::Result<Option<SeriesMatch>, LookupError> {
        let key = VerificationCache::key(provider.name(), title);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return cached.to_result();
        }
        let result = self.search_with_retry(provider, title);
        if let Err(err) = &result {
            warn!("{} lookup for '{}' failed: {}", provider.name(), title, err);
        }
        self.cache
            .insert_first(key, CachedLookup::from_result(&result))
            .to_result()
    }

    fn verify_with(
        &self,
        provider: &dyn MetadataProvider,
        resolution: &mut TitleResolution,
    ) -> std::result::Result<(), String> {
        let name = provider.name().to_string();
        let folder = self.lookup(provider, &resolution.folder_match.title);
        let filename = self.lookup(provider, &resolution.filename_match.title);

        let (folder, filename) = match (folder, filename) {
            (Err(a), Err(b)) => {
                return Err(format!(
                    "failed to search both titles (folder: {a}, filename: {b})"
                ))
            }
            (a, b) => (a.ok().flatten(), b.ok().flatten()),
        };

        let candidate = |found: &SeriesMatch, matched: MatchSource| SeriesCandidate {
            provider: name.clone(),
            id: found.id.clone(),
            name: found.name.clone(),
            year: found.year.clone(),
            matched,
        };

        match (folder, filename) {
            (None, None) => return Err("no results found for either title".to_string()),
            (Some(found), None) => {
                accept_single(resolution, &name, &found, MatchSource::Folder)
            }
            (None, Some(found)) => {
                accept_single(resolution, &name, &found, MatchSource::Filename)
            }
            (Some(a), Some(b)) if a.id == b.id => {
                resolution.resolved_title = a.name.clone();
                resolution.ambiguous = false;
                resolution.confidence = 1.0;
                resolution.reason =
                    format!("{name} verified: '{}' (both match same series)", a.name);
            }
            (Some(a), Some(b)) => {
                resolution.candidates = vec![
                    candidate(&a, MatchSource::Folder),
                    candidate(&b, MatchSource::Filename),
                ];
                resolution.resolved_title = a.name.clone();
                resolution.ambiguous = true;
                resolution.confidence = 0.6;
                resolution.reason = format!(
                    "{name} conflict: '{}' (folder) vs '{}' (filename) - different series",
                    a.name, b.name
                );
                // Still needs a human; the candidates are there to pick from.
                resolution.verified = false;
                return Ok(());
            }
        }
        resolution.verified = true;
        Ok(())
    }

    /// Verifies one ambiguous resolution in place.
    ///
    /// An error means every configured provider failed; the resolution is left untouched
    /// and stays ambiguous.
    pub fn verify(&self, resolution: &mut TitleResolution) -> Result<()> {
        if !self.is_configured() {
            return Err(Error::Verification(
                "no metadata provider configured".to_string(),
            ));
        }

        let mut failures = Vec::new();
        for provider in [&self.primary, &self.secondary].into_iter().flatten() {
            match self.verify_with(provider.as_ref(), resolution) {
                Ok(()) => {
                    info!("{}", resolution.reason);
                    return Ok(());
                }
                Err(reason) => {
                    warn!(
                        "{} verification failed for '{}': {}",
                        provider.name(),
                        resolution.resolved_title,
                        reason
                    );
                    failures.push(format!("{}: {}", provider.name(), reason));
                }
            }
        }
        Err(Error::Verification(failures.join("; ")))
    }

    /// Verifies every ambiguous, unverified resolution. Returns how many were verified.
    pub fn verify_all(&self, resolutions: &mut [TitleResolution]) -> usize {
        let mut verified = 0;
        for resolution in resolutions.iter_mut().filter(|r| r.ambiguous && !r.verified) {
            if self.verify(resolution).is_ok() && resolution.verified {
                verified += 1;
            }
        }
        verified
    }
}
