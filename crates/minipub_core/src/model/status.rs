//! Publication status tokens.
//!
//! # Responsibility
//! - Define the status token carried by every publishable record.
//! - Define the ordered set of tokens a deployment accepts (`StatusChoices`).
//! - Define the subset a section treats as its live state (`AllowedStatuses`).
//!
//! # Invariants
//! - The first token in `StatusChoices` is the initial draft-equivalent state.
//! - Tokens are lowercase ASCII words (`[a-z][a-z0-9_]*`).
//! - `AllowedStatuses` is never empty.

use crate::model::record::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

static STATUS_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid status token regex"));

pub const DRAFT: &str = "draft";
pub const PUBLISHED: &str = "published";

/// One status token, e.g. `draft`, `published` or an application-defined
/// token such as `archived`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Status(String);

impl Status {
    /// Parses a token, rejecting anything outside `[a-z][a-z0-9_]*`.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if !STATUS_TOKEN_RE.is_match(&value) {
            return Err(ValidationError::InvalidStatusToken(value));
        }
        Ok(Self(value))
    }

    pub fn draft() -> Self {
        Self(DRAFT.to_string())
    }

    pub fn published() -> Self {
        Self(PUBLISHED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Status {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.0
    }
}

/// Ordered set of status tokens accepted by a deployment.
///
/// Applications extend the default `draft, published` pair with their own
/// tokens (`draft, published, archived`). Order matters only for the first
/// entry, which every new record starts in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct StatusChoices {
    tokens: Vec<Status>,
}

impl StatusChoices {
    /// Builds a choice list from tokens in declaration order.
    ///
    /// # Errors
    /// - `EmptyStatusChoices` when no token is given.
    /// - `InvalidStatusToken` for malformed tokens.
    /// - `DuplicateStatus` when a token repeats.
    pub fn new<I, S>(tokens: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut parsed = Vec::new();
        for token in tokens {
            let status = Status::parse(token)?;
            if !seen.insert(status.clone()) {
                return Err(ValidationError::DuplicateStatus(status.0));
            }
            parsed.push(status);
        }
        if parsed.is_empty() {
            return Err(ValidationError::EmptyStatusChoices);
        }
        Ok(Self { tokens: parsed })
    }

    /// The draft-equivalent state new records start in.
    pub fn initial(&self) -> &Status {
        &self.tokens[0]
    }

    pub fn is_initial(&self, status: &Status) -> bool {
        self.initial() == status
    }

    pub fn contains(&self, status: &Status) -> bool {
        self.tokens.contains(status)
    }

    /// Looks up a raw token, failing with `UnknownStatus` when not declared.
    pub fn get(&self, token: &str) -> Result<Status, ValidationError> {
        self.tokens
            .iter()
            .find(|status| status.as_str() == token)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownStatus(token.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.tokens.iter()
    }

    /// Returns true when every declared token is a member of `statuses`.
    pub fn is_covered_by(&self, statuses: &AllowedStatuses) -> bool {
        self.tokens.iter().all(|status| statuses.contains(status))
    }
}

impl Default for StatusChoices {
    fn default() -> Self {
        Self {
            tokens: vec![Status::draft(), Status::published()],
        }
    }
}

impl TryFrom<Vec<String>> for StatusChoices {
    type Error = ValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatusChoices> for Vec<String> {
    fn from(value: StatusChoices) -> Self {
        value.tokens.into_iter().map(String::from).collect()
    }
}

/// Statuses a section treats as its live state.
///
/// A news section allows `{published}`; an archive section of the same
/// records allows `{archived}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AllowedStatuses(BTreeSet<Status>);

impl AllowedStatuses {
    pub fn new<I, S>(tokens: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = tokens
            .into_iter()
            .map(Status::parse)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if set.is_empty() {
            return Err(ValidationError::EmptyAllowedStatuses);
        }
        Ok(Self(set))
    }

    pub fn published() -> Self {
        Self(BTreeSet::from([Status::published()]))
    }

    pub fn contains(&self, status: &Status) -> bool {
        self.0.contains(status)
    }

    /// Returns a copy of this set with `extra` added.
    pub fn with(&self, extra: &Status) -> Self {
        let mut set = self.0.clone();
        set.insert(extra.clone());
        Self(set)
    }

    /// Iterates members in token order.
    pub fn iter(&self) -> impl Iterator<Item = &Status> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AllowedStatuses {
    fn default() -> Self {
        Self::published()
    }
}

impl TryFrom<Vec<String>> for AllowedStatuses {
    type Error = ValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AllowedStatuses> for Vec<String> {
    fn from(value: AllowedStatuses) -> Self {
        value.0.into_iter().map(String::from).collect()
    }
}
