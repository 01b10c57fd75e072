//! Filters, filter queries, and filter tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoopError;
use crate::proto::ramps::{Depth, RampSet};

// ── Lifespan ─────────────────────────────────────────────────────

/// When a filter should be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifespan {
    /// Remove the filter now. Only the filter's identity fields matter.
    Remove,
    /// Remove the filter when this session disconnects.
    UntilDeath,
    /// Keep the filter until its removal is explicitly requested.
    UntilRemoval,
}

impl fmt::Display for Lifespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifespan::Remove => write!(f, "remove"),
            Lifespan::UntilDeath => write!(f, "until-death"),
            Lifespan::UntilRemoval => write!(f, "until-removal"),
        }
    }
}

// ── FilterClass ──────────────────────────────────────────────────

/// A validated filter class identifier of the form
/// `"${PACKAGE}::${COMMAND}::${RULE}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilterClass(String);

impl FilterClass {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> (&str, &str, &str) {
        let mut it = self.0.splitn(3, "::");
        // Guaranteed by construction.
        let package = it.next().unwrap_or("");
        let command = it.next().unwrap_or("");
        let rule = it.next().unwrap_or("");
        (package, command, rule)
    }

    pub fn package(&self) -> &str {
        self.parts().0
    }

    pub fn command(&self) -> &str {
        self.parts().1
    }

    pub fn rule(&self) -> &str {
        self.parts().2
    }
}

impl FromStr for FilterClass {
    type Err = CoopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("::").collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(CoopError::InvalidFilterClass(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for FilterClass {
    type Error = CoopError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FilterClass> for String {
    fn from(class: FilterClass) -> Self {
        class.0
    }
}

impl fmt::Display for FilterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Filter ───────────────────────────────────────────────────────

/// A client's adjustment request: apply, update, or remove a filter.
///
/// Filters are keyed by `(crtc, class)`. Higher priority is composed first
/// by the server; the plain gamma correction convention is priority 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Composition priority, higher first.
    pub priority: i64,
    /// The output this filter applies to.
    pub crtc: String,
    /// The filter's class identity.
    pub class: FilterClass,
    /// Removal policy.
    pub lifespan: Lifespan,
    /// The adjustment ramps. Must be present unless `lifespan` is
    /// [`Lifespan::Remove`].
    pub ramps: Option<RampSet>,
}

impl Filter {
    /// An apply/update request.
    pub fn apply(
        priority: i64,
        crtc: impl Into<String>,
        class: FilterClass,
        lifespan: Lifespan,
        ramps: RampSet,
    ) -> Self {
        Self {
            priority,
            crtc: crtc.into(),
            class,
            lifespan,
            ramps: Some(ramps),
        }
    }

    /// An immediate-removal request. Only identity fields are carried.
    pub fn removal(crtc: impl Into<String>, class: FilterClass) -> Self {
        Self {
            priority: 0,
            crtc: crtc.into(),
            class,
            lifespan: Lifespan::Remove,
            ramps: None,
        }
    }

    /// The ramp stop depth, implied by the ramps.
    pub fn depth(&self) -> Option<Depth> {
        self.ramps.as_ref().map(RampSet::depth)
    }

    /// Check the send-side encoding constraints.
    pub(crate) fn validate(&self) -> Result<(), CoopError> {
        if self.lifespan != Lifespan::Remove && self.ramps.is_none() {
            return Err(CoopError::ProtocolViolation(
                "non-removal filter carries no ramps",
            ));
        }
        Ok(())
    }
}

// ── FilterQuery ──────────────────────────────────────────────────

/// A request for the active filter table of one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    /// Do not return filters with priority above this bound (inclusive).
    pub high_priority: i64,
    /// Do not return filters with priority below this bound (inclusive).
    pub low_priority: i64,
    /// The output whose filters shall be returned.
    pub crtc: String,
    /// Coalesce all filters into one effective ramp triplet.
    pub coalesce: bool,
}

impl FilterQuery {
    /// Query the full priority range of `crtc`, uncoalesced.
    pub fn new(crtc: impl Into<String>) -> Self {
        Self {
            high_priority: i64::MAX,
            low_priority: i64::MIN,
            crtc: crtc.into(),
            coalesce: false,
        }
    }

    pub fn with_bounds(mut self, low: i64, high: i64) -> Self {
        self.low_priority = low;
        self.high_priority = high;
        self
    }

    pub fn coalesced(mut self) -> Self {
        self.coalesce = true;
        self
    }
}

// ── QueriedFilter / FilterTable ──────────────────────────────────

/// One entry in a filter-table response.
///
/// Under a coalesced query `priority` and `class` are semantically
/// undefined and must not be inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedFilter {
    pub priority: i64,
    pub class: String,
    pub ramps: RampSet,
}

/// Full response to a filter query.
///
/// The server should order `filters` by descending priority, but a
/// non-conformant peer may not; consumers must not rely on the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTable {
    pub red_size: u32,
    pub green_size: u32,
    pub blue_size: u32,
    pub depth: Depth,
    pub filters: Vec<QueriedFilter>,
}

impl FilterTable {
    /// Build a zero-filled [`RampSet`] matching this table's geometry.
    pub fn make_ramps(&self) -> RampSet {
        RampSet::of_size(
            self.depth,
            self.red_size as usize,
            self.green_size as usize,
            self.blue_size as usize,
        )
    }
}
