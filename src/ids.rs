use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Correlation id attached to every dispatch, backed by a ULID.
///
/// Fan-out branches get their own id so their log lines can be told apart.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct DispatchId(ulid::Ulid);

impl DispatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse an id supplied by the transport (e.g. an `X-Request-Id` header),
    /// or mint a fresh one when it is absent or not a ULID.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<DispatchId>().ok())
            .unwrap_or_default()
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DispatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DispatchId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(DispatchId)
    }
}

impl Serialize for DispatchId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
