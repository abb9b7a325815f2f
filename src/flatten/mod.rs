//! Statistics flattener: turns one site's nested statistics into flat records.
//!
//! Every extractor is lazy and yields one `Result` per leaf entry, so the
//! caller decides whether a malformed entry ends the cycle or is skipped.
//! Values are copied through untouched; only a missing key is an error.

mod families;

use crate::domain::statistics::display_id;
use crate::domain::{FlatRecord, MetricDetail, MetricFamily, SiteStatistics, TimestampedEntry};
use serde_json::Value;
use std::{fmt, iter};
use thiserror::Error;

pub use families::{error_response_types, origin_response_time, pop_latency};

/// Where in the payload a flattening failure was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Entry { account_id: String },
    Site { site_id: String },
    Family { family: MetricFamily, site_id: String },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Entry { account_id } => write!(f, "entry of account {account_id}"),
            Location::Site { site_id } => write!(f, "site {site_id}"),
            Location::Family { family, site_id } => write!(f, "{family} of site {site_id}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenError {
    #[error("Missing field `{field}` in {location}")]
    MissingField {
        field: &'static str,
        location: Location,
    },
    #[error("Unexpected shape for {location}: expected {expected}")]
    UnexpectedShape {
        location: Location,
        expected: &'static str,
    },
}

pub type RecordResult = Result<FlatRecord, FlattenError>;
pub type RecordIter<'a> = Box<dyn Iterator<Item = RecordResult> + Send + 'a>;

/// Entry-level fields every record of the entry inherits.
#[derive(Debug, Clone, Copy)]
pub struct EntryScope<'a> {
    pub timestamp: &'a Value,
    pub account_id: &'a Value,
    sites: &'a [Value],
}

impl<'a> EntryScope<'a> {
    /// Requires `timestamp` and `accountId`. A missing site list is empty.
    pub fn parse(entry: &'a TimestampedEntry) -> Result<Self, FlattenError> {
        let location = || Location::Entry {
            account_id: display_id(entry.account_id()),
        };
        let missing = |field| FlattenError::MissingField {
            field,
            location: location(),
        };

        let timestamp = entry.timestamp().ok_or_else(|| missing("timestamp"))?;
        let account_id = entry.account_id().ok_or_else(|| missing("accountId"))?;
        let sites = match entry.sites() {
            None => &[][..],
            Some(Value::Array(sites)) => sites.as_slice(),
            Some(_) => {
                return Err(FlattenError::UnexpectedShape {
                    location: location(),
                    expected: "array of sites",
                });
            }
        };

        Ok(Self {
            timestamp,
            account_id,
            sites,
        })
    }

    pub fn sites(self) -> impl Iterator<Item = SiteStatistics<'a>> + 'a {
        self.sites.iter().map(SiteStatistics::new)
    }
}

/// Entry and site fields every record of one site inherits.
#[derive(Debug, Clone, Copy)]
pub struct SiteScope<'a> {
    entry: EntryScope<'a>,
    site_id: &'a Value,
    site_name: &'a Value,
    site: SiteStatistics<'a>,
}

impl<'a> SiteScope<'a> {
    /// Requires `siteId` and `siteName`.
    pub fn new(entry: EntryScope<'a>, site: SiteStatistics<'a>) -> Result<Self, FlattenError> {
        let missing = |field| FlattenError::MissingField {
            field,
            location: Location::Site {
                site_id: display_id(site.site_id()),
            },
        };

        let site_id = site.site_id().ok_or_else(|| missing("siteId"))?;
        let site_name = site.site_name().ok_or_else(|| missing("siteName"))?;
        Ok(Self {
            entry,
            site_id,
            site_name,
            site,
        })
    }

    fn record(&self, detail: MetricDetail) -> FlatRecord {
        FlatRecord {
            timestamp: self.entry.timestamp.clone(),
            account_id: self.entry.account_id.clone(),
            site_id: self.site_id.clone(),
            site_name: self.site_name.clone(),
            detail,
        }
    }

    fn location(&self, family: MetricFamily) -> Location {
        Location::Family {
            family,
            site_id: display_id(Some(self.site_id)),
        }
    }

    fn unexpected_shape(&self, family: MetricFamily, expected: &'static str) -> FlattenError {
        FlattenError::UnexpectedShape {
            location: self.location(family),
            expected,
        }
    }

    /// Reads a required key of one leaf object.
    fn field<'v>(
        &self,
        family: MetricFamily,
        entry: &'v Value,
        field: &'static str,
    ) -> Result<&'v Value, FlattenError> {
        match entry {
            Value::Object(fields) => fields.get(field).ok_or_else(|| FlattenError::MissingField {
                field,
                location: self.location(family),
            }),
            _ => Err(self.unexpected_shape(family, "object")),
        }
    }
}

/// Flattens every metric family of one site in emission order:
/// error response types, then origin response time, then PoP latency.
///
/// Sites without statistics yield nothing and are not inspected further.
pub fn flatten_site<'a>(entry: EntryScope<'a>, site: SiteStatistics<'a>) -> RecordIter<'a> {
    if !site.has_statistics() {
        return Box::new(iter::empty());
    }

    let scope = match SiteScope::new(entry, site) {
        Ok(scope) => scope,
        Err(e) => return Box::new(iter::once(Err(e))),
    };
    if !matches!(site.statistics(), Some(Value::Object(_))) {
        return Box::new(iter::once(Err(FlattenError::UnexpectedShape {
            location: Location::Site {
                site_id: display_id(Some(scope.site_id)),
            },
            expected: "statistics object",
        })));
    }

    Box::new(
        error_response_types(scope)
            .chain(origin_response_time(scope))
            .chain(pop_latency(scope)),
    )
}
