use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use reqwest::header::{AGE, CACHE_CONTROL, CONTENT_ENCODING, HeaderMap};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One cached response, keyed by request URL in [`HttpCache`](super::HttpCache).
///
/// An entry with `redirect_target` set is a pointer: lookups continue at the
/// target key and the other fields carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `ETag` of the stored response.
    pub etag: Option<String>,
    /// `Last-Modified` of the stored response.
    pub last_modified: Option<String>,
    /// Body bytes exactly as received (still gzip-encoded if `compressed`).
    pub body: Vec<u8>,
    /// Instant until which the entry may be served without revalidation.
    pub expire: DateTime<Utc>,
    /// Whether `body` is gzip-encoded.
    pub compressed: bool,
    /// Key of the entry this URL permanently redirects to.
    pub redirect_target: Option<String>,
}

impl CacheEntry {
    /// Entry for a `200` response received at `now`.
    pub fn from_response(headers: &HeaderMap, body: Vec<u8>, now: DateTime<Utc>) -> Self {
        Self {
            etag: header_string(headers, &reqwest::header::ETAG),
            last_modified: header_string(headers, &reqwest::header::LAST_MODIFIED),
            body,
            expire: expiry(headers, now),
            compressed: is_gzip(headers),
            redirect_target: None,
        }
    }

    /// Pointer entry for a `301` to `target`.
    pub fn redirect(target: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            etag: None,
            last_modified: None,
            body: Vec::new(),
            expire: now,
            compressed: false,
            redirect_target: Some(target.into()),
        }
    }

    /// Whether the entry may be served at `now` without contacting the origin.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expire > now
    }

    /// Whether a conditional request can revalidate this entry.
    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    /// A `200` entry is only worth keeping if it can be served or revalidated later.
    pub fn is_worth_storing(&self, now: DateTime<Utc>) -> bool {
        self.has_validators() || self.is_fresh(now)
    }

    /// The body as the caller should see it.
    ///
    /// # Errors
    ///
    /// Fails if the entry is marked compressed and the bytes are not valid gzip.
    pub fn decoded_body(&self) -> std::io::Result<Vec<u8>> {
        if self.compressed {
            gunzip(&self.body)
        } else {
            Ok(self.body.clone())
        }
    }
}

/// Decompress a gzip stream.
pub fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Whether the response declares `Content-Encoding: gzip`.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"))
}

/// `max-age` from `Cache-Control`, in seconds. Absent or malformed is `0`.
pub fn max_age(headers: &HeaderMap) -> i64 {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|directive| {
            let (name, value) = directive.trim().split_once('=')?;
            if name.trim().eq_ignore_ascii_case("max-age") {
                value.trim().trim_matches('"').parse::<i64>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

/// `Age` header in seconds. Absent or malformed is `0`.
pub fn age(headers: &HeaderMap) -> i64 {
    headers
        .get(AGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Remaining freshness: `max(max-age - Age, 0)`.
pub fn freshness_lifetime(headers: &HeaderMap) -> Duration {
    Duration::seconds(max_age(headers).saturating_sub(age(headers)).max(0))
}

/// `now + freshness_lifetime(headers)`; never earlier than `now`.
pub fn expiry(headers: &HeaderMap, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_signed(freshness_lifetime(headers)).unwrap_or(now)
}

pub(super) fn header_string(
    headers: &HeaderMap,
    name: &reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
