//! Archive version numbers and version ranges.
//!
//! Versions are the four-part `major.minor.micro.qualifier` form used in
//! archive manifests. The first three segments compare numerically, the
//! qualifier lexicographically, so `1.2.4` orders before `1.2.10` and
//! `1.0.0` before `1.0.0.RC1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a version or a version range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedVersionError {
    /// The version string was empty.
    #[error("empty version string")]
    Empty,

    /// A numeric segment did not parse as an unsigned integer.
    #[error("invalid segment '{segment}' in version '{text}'")]
    Segment { text: String, segment: String },

    /// A range opened with `[` or `(` but never closed.
    #[error("unterminated version range '{0}'")]
    Unterminated(String),

    /// A range had brackets but no comma-separated upper bound.
    #[error("version range '{0}' is missing an upper bound")]
    MissingUpperBound(String),
}

/// An ordered `(major, minor, micro, qualifier)` version tuple.
///
/// Omitted trailing segments default to zero / the empty qualifier, so
/// `"1"`, `"1.0"` and `"1.0.0"` are all equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    /// The zero version `0.0.0`, the default for capabilities declared
    /// without an explicit version.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Parse the textual `major[.minor[.micro[.qualifier]]]` form.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedVersionError`] if the string is empty or a numeric
    /// segment is not an unsigned integer.
    pub fn parse(text: &str) -> Result<Self, MalformedVersionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MalformedVersionError::Empty);
        }

        let mut segments = text.splitn(4, '.');
        let mut numeric = |segment: Option<&str>| -> Result<u32, MalformedVersionError> {
            match segment {
                None => Ok(0),
                Some(s) => s.parse::<u32>().map_err(|_| MalformedVersionError::Segment {
                    text: text.to_string(),
                    segment: s.to_string(),
                }),
            }
        };

        let major = numeric(segments.next())?;
        let minor = numeric(segments.next())?;
        let micro = numeric(segments.next())?;
        let qualifier = segments.next().unwrap_or("").to_string();

        Ok(Self {
            major,
            minor,
            micro,
            qualifier,
        })
    }
}

impl FromStr for Version {
    type Err = MalformedVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.micro.cmp(&other.micro))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// A single version or an interval with inclusive/exclusive bounds.
///
/// A bare version `1.2` means "at least 1.2", i.e. lower-inclusive and
/// unbounded above. When brackets are omitted on an interval the defaults
/// are `[` on the left and `)` on the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    pub lower: Version,
    pub lower_inclusive: bool,
    pub upper: Option<Version>,
    pub upper_inclusive: bool,
}

impl VersionRange {
    /// The range `[0.0.0,∞)`, matched by every version.
    pub fn any() -> Self {
        Self::at_least(Version::zero())
    }

    /// The unbounded range `[lower,∞)`.
    pub fn at_least(lower: Version) -> Self {
        Self {
            lower,
            lower_inclusive: true,
            upper: None,
            upper_inclusive: false,
        }
    }

    /// Parse the textual range form: `[1.0,2.0)`, `(1.0,2.0]`, or a bare
    /// version meaning lower-inclusive and unbounded above.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedVersionError`] when a bound is not a valid version,
    /// an opened bracket is never closed, or an interval lacks its upper
    /// bound.
    pub fn parse(text: &str) -> Result<Self, MalformedVersionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MalformedVersionError::Empty);
        }

        let (lower_inclusive, rest) = match trimmed.as_bytes()[0] {
            b'[' => (true, &trimmed[1..]),
            b'(' => (false, &trimmed[1..]),
            _ => (true, trimmed),
        };
        let explicit_open = rest.len() != trimmed.len();

        let (upper_inclusive, rest) = match rest.as_bytes().last() {
            Some(b']') => (Some(true), &rest[..rest.len() - 1]),
            Some(b')') => (Some(false), &rest[..rest.len() - 1]),
            _ => (None, rest),
        };

        if explicit_open && upper_inclusive.is_none() {
            return Err(MalformedVersionError::Unterminated(trimmed.to_string()));
        }

        match rest.split_once(',') {
            Some((lo, hi)) => Ok(Self {
                lower: Version::parse(lo)?,
                lower_inclusive,
                upper: Some(Version::parse(hi)?),
                // Right bracket defaults to ')' when omitted.
                upper_inclusive: upper_inclusive.unwrap_or(false),
            }),
            None if explicit_open || upper_inclusive.is_some() => {
                Err(MalformedVersionError::MissingUpperBound(trimmed.to_string()))
            }
            None => Ok(Self::at_least(Version::parse(rest)?)),
        }
    }

    /// Whether `v` lies within this range, honoring bound exclusivity.
    pub fn contains(&self, v: &Version) -> bool {
        let above_lower = if self.lower_inclusive {
            *v >= self.lower
        } else {
            *v > self.lower
        };
        let below_upper = match &self.upper {
            None => true,
            Some(upper) if self.upper_inclusive => *v <= *upper,
            Some(upper) => *v < *upper,
        };
        above_lower && below_upper
    }
}

impl FromStr for VersionRange {
    type Err = MalformedVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.upper {
            None => write!(f, "{}", self.lower),
            Some(upper) => write!(
                f,
                "{}{},{}{}",
                if self.lower_inclusive { '[' } else { '(' },
                self.lower,
                upper,
                if self.upper_inclusive { ']' } else { ')' },
            ),
        }
    }
}
