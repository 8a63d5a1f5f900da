//! Semantic equality for string attributes
//!
//! Some attributes are stored as strings but follow a grammar in which
//! different spellings mean the same thing (`https://Example.com/` versus
//! `https://example.com:443`). A [`SemanticEquality`] decides whether a change
//! between the stored and the desired spelling is real drift, so the planner
//! can suppress cosmetic diffs.

use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("`{value}` is not a valid URL: {reason}")]
    InvalidUrl { value: String, reason: String },
}

/// Grammar-aware equality between two spellings of an attribute
pub trait SemanticEquality: Send + Sync + fmt::Debug {
    /// Whether two spellings that differ byte-wise mean the same thing
    fn equivalent(&self, old: &str, new: &str) -> Result<bool, ComparisonError>;

    /// Compare two spellings; identical strings are equal without parsing
    fn compare(&self, old: &str, new: &str) -> Result<bool, ComparisonError> {
        if old == new {
            return Ok(true);
        }
        self.equivalent(old, new)
    }
}

/// URL reduced to the components that decide equivalence
///
/// Userinfo and fragment are dropped and the host is lowercased. A missing
/// port means 80 for http and 443 for https, and nothing for other schemes.
/// The path is taken as written apart from trailing slashes, so dot segments
/// and percent-encoding count. The query string is kept verbatim, parameter
/// order included.
///
/// Internationalized hosts are compared as written. `bücher.example` and its
/// punycode form `xn--bcher-kva.example` are different hosts here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

impl NormalizedUrl {
    pub fn parse(raw: &str) -> Result<Self, ComparisonError> {
        let url = Url::parse(raw).map_err(|e| ComparisonError::InvalidUrl {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = url.scheme().to_string();
        let Some(written) = Written::split(raw) else {
            // No authority to read back, as in `mailto:` or `https:host`
            return Ok(Self {
                host: url.host_str().unwrap_or_default().to_ascii_lowercase(),
                port: url.port().or_else(|| default_port(&scheme)),
                path: url.path().trim_end_matches('/').to_string(),
                query: url.query().map(str::to_string),
                scheme,
            });
        };

        // `Url` elides the default port of every special scheme; only
        // http and https fall back to theirs
        let port = match written.port.filter(|p| !p.is_empty()) {
            Some(port) => Some(port.parse().map_err(|e: std::num::ParseIntError| {
                ComparisonError::InvalidUrl {
                    value: raw.to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => default_port(&scheme),
        };
        Ok(Self {
            host: match written.host {
                Some(host) if !host.is_ascii() => host.to_lowercase(),
                _ => url.host_str().unwrap_or_default().to_ascii_lowercase(),
            },
            port,
            path: written.path.trim_end_matches('/').to_string(),
            query: written.query.map(str::to_string),
            scheme,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

/// Components as spelled in the input
///
/// `Url` maps hosts to punycode, resolves dot segments, and percent-encodes
/// the path and query. None of that happens here.
#[derive(Debug, PartialEq, Eq)]
struct Written<'a> {
    /// `None` for IP literals
    host: Option<&'a str>,
    port: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
}

impl<'a> Written<'a> {
    fn split(raw: &'a str) -> Option<Self> {
        let (_, rest) = raw.split_once("://")?;
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };
        let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

        let (host, port) = match host_port.strip_prefix('[') {
            Some(literal) => {
                let (_, after) = literal.split_once(']')?;
                (None, after.strip_prefix(':'))
            }
            None => match host_port.split_once(':') {
                Some((host, port)) => (Some(host), Some(port)),
                None => (Some(host_port), None),
            },
        };
        Some(Self {
            host,
            port,
            path,
            query,
        })
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Equivalence of absolute URLs, see [`NormalizedUrl`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEquality;

impl SemanticEquality for UrlEquality {
    fn equivalent(&self, old: &str, new: &str) -> Result<bool, ComparisonError> {
        // Both sides must parse before any component is compared
        let old = NormalizedUrl::parse(old)?;
        let new = NormalizedUrl::parse(new)?;
        Ok(old == new)
    }
}

/// ASCII case-insensitive equality, for DNS names and hostnames
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitive;

impl SemanticEquality for CaseInsensitive {
    fn equivalent(&self, old: &str, new: &str) -> Result<bool, ComparisonError> {
        Ok(old.eq_ignore_ascii_case(new))
    }
}

pub static URL: UrlEquality = UrlEquality;
pub static CASE_INSENSITIVE: CaseInsensitive = CaseInsensitive;
