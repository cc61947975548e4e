//! API microversion negotiation.
//!
//! The server advertises the range it supports through the
//! `X-OpenStack-Arsenal-API-Minimum-Version` and `...-Maximum-Version`
//! headers, either on the 406 that rejected a request or on its root document.

use std::fmt;
use std::str::FromStr;

use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::{debug, info, warn};

use ars_core::constants::headers::{API_MAX_VERSION, API_MIN_VERSION};
use ars_core::error::{ArsError, ArsResult};

use crate::transport::Transport;

/// `major.minor` API version. A bare major (`"1"`) means `major.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = ArsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ArsError::Validation(format!("invalid API version: {s:?}"));
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, "0"),
        };
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// Version range advertised by the server. Either bound may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<ApiVersion>,
    pub max: Option<ApiVersion>,
}

impl VersionRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// How the version currently sent to the server was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelection {
    /// Nothing chosen yet; no version header is sent.
    Default,
    /// Pinned by the user; negotiation may not move it.
    User,
    /// Picked by a previous negotiation.
    Negotiated,
}

/// Version state carried by a client across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionState {
    pub version: ApiVersion,
    pub selection: VersionSelection,
}

impl VersionState {
    /// Unpinned state starting from `version`.
    pub fn default_version(version: ApiVersion) -> Self {
        Self {
            version,
            selection: VersionSelection::Default,
        }
    }

    /// State pinned to a user-requested version.
    pub fn pinned(version: ApiVersion) -> Self {
        Self {
            version,
            selection: VersionSelection::User,
        }
    }

    /// Version to put on the wire, if any.
    pub fn header_value(&self) -> Option<String> {
        match self.selection {
            VersionSelection::Default => None,
            VersionSelection::User | VersionSelection::Negotiated => Some(self.version.to_string()),
        }
    }

    /// Record the outcome of a negotiation.
    pub fn negotiated(self, version: ApiVersion) -> Self {
        match self.selection {
            VersionSelection::User => self,
            _ => Self {
                version,
                selection: VersionSelection::Negotiated,
            },
        }
    }
}

/// Read the advertised range from response headers. Unparsable values count as absent.
pub fn parse_version_headers(headers: &HeaderMap) -> VersionRange {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<ApiVersion>().ok())
    };
    VersionRange {
        min: read(API_MIN_VERSION),
        max: read(API_MAX_VERSION),
    }
}

/// Pick the version to use given the server's range.
pub fn select_version(range: VersionRange, state: &VersionState) -> ArsResult<ApiVersion> {
    let (Some(min), Some(max)) = (range.min.or(range.max), range.max.or(range.min)) else {
        return Err(ArsError::UnsupportedVersion(
            "server did not advertise a supported API version range".into(),
        ));
    };

    let requested = state.version;
    if state.selection == VersionSelection::User && !(min..=max).contains(&requested) {
        return Err(ArsError::UnsupportedVersion(format!(
            "requested API version {requested} is not supported by the server \
             (supported range {min} to {max})"
        )));
    }

    Ok(requested.min(max).max(min))
}

/// Negotiate a version after a 406.
///
/// `headers` are the headers of the rejecting response. When they carry no
/// range, the endpoint root is queried once for it.
pub fn negotiate(
    transport: &dyn Transport,
    headers: &HeaderMap,
    state: &VersionState,
) -> ArsResult<ApiVersion> {
    let mut range = transport.parse_version_headers(headers);
    if range.is_empty() {
        debug!("406 carried no version range, querying endpoint root");
        match transport.simple_request(Method::GET, "/") {
            Ok(response) => range = transport.parse_version_headers(&response.headers),
            Err(e) => warn!("version discovery request failed: {e}"),
        }
    }

    let version = select_version(range, state)?;
    info!(
        "negotiated API version {version} (server range {:?} to {:?})",
        range.min.map(|v| v.to_string()),
        range.max.map(|v| v.to_string())
    );
    Ok(version)
}
