//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Halo.
//! The Halo project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Halo Version Module
//!
//! Plugin version numbers and the constraint expressions manifests use to
//! describe compatible dependency ranges.
//!
//! Versions follow the `major.minor.patch[-pre]` shape. Constraint
//! expressions are comparator lists: a bare version means exact equality,
//! `=`, `>`, `>=`, `<`, `<=` prefix a single comparator, and several
//! whitespace-separated comparators conjoin (`>=1.0.0 <2.0.0`).

use std::cmp::Ordering;
use std::fmt;

use crate::errors::{HaloError, Result};

/// A parsed `major.minor.patch[-pre]` plugin or library version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HaloVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: Option<String>,
}

impl HaloVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        HaloVersion {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    /// Parse a version string. The patch component may be omitted
    /// (`"1.2"` parses as `1.2.0`); a pre-release tag may follow the last
    /// numeric component after a dash.
    pub fn parse(version_str: &str) -> Result<Self> {
        let version_str = version_str.trim();
        let (numeric, pre_release) = match version_str.find('-') {
            Some(dash) => (
                &version_str[..dash],
                Some(version_str[dash + 1..].to_string()),
            ),
            None => (version_str, None),
        };

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(HaloError::internal(format!(
                "invalid version '{}': expected major.minor[.patch]",
                version_str
            )));
        }

        let component = |s: &str, name: &str| -> Result<u32> {
            s.parse::<u32>().map_err(|_| {
                HaloError::internal(format!(
                    "invalid version '{}': bad {} component",
                    version_str, name
                ))
            })
        };

        let major = component(parts[0], "major")?;
        let minor = component(parts[1], "minor")?;
        let patch = if parts.len() == 3 {
            component(parts[2], "patch")?
        } else {
            0
        };

        Ok(HaloVersion {
            major,
            minor,
            patch,
            pre_release,
        })
    }
}

impl fmt::Display for HaloVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pre_release {
            Some(pre) => write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, pre),
            None => write!(f, "{}.{}.{}", self.major, self.minor, self.patch),
        }
    }
}

impl Ord for HaloVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                // A pre-release sorts below the corresponding release.
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for HaloVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A single comparator inside a constraint expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HaloComparatorOp {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

#[derive(Clone, Debug)]
struct HaloComparator {
    op: HaloComparatorOp,
    version: HaloVersion,
}

impl HaloComparator {
    fn matches(&self, candidate: &HaloVersion) -> bool {
        match self.op {
            HaloComparatorOp::Exact => candidate == &self.version,
            HaloComparatorOp::Greater => candidate > &self.version,
            HaloComparatorOp::GreaterEq => candidate >= &self.version,
            HaloComparatorOp::Less => candidate < &self.version,
            HaloComparatorOp::LessEq => candidate <= &self.version,
        }
    }
}

/// A parsed constraint expression: the conjunction of its comparators.
#[derive(Clone, Debug)]
pub struct HaloVersionReq {
    comparators: Vec<HaloComparator>,
    source: String,
}

impl HaloVersionReq {
    /// Parse a constraint expression. An empty expression matches any
    /// version.
    pub fn parse(expr: &str) -> Result<Self> {
        let mut comparators = Vec::new();
        for token in expr.split_whitespace() {
            let (op, rest) = if let Some(rest) = token.strip_prefix(">=") {
                (HaloComparatorOp::GreaterEq, rest)
            } else if let Some(rest) = token.strip_prefix("<=") {
                (HaloComparatorOp::LessEq, rest)
            } else if let Some(rest) = token.strip_prefix('>') {
                (HaloComparatorOp::Greater, rest)
            } else if let Some(rest) = token.strip_prefix('<') {
                (HaloComparatorOp::Less, rest)
            } else if let Some(rest) = token.strip_prefix("==") {
                (HaloComparatorOp::Exact, rest)
            } else if let Some(rest) = token.strip_prefix('=') {
                (HaloComparatorOp::Exact, rest)
            } else {
                (HaloComparatorOp::Exact, token)
            };

            let rest = rest.trim();
            if rest.is_empty() {
                return Err(HaloError::internal(format!(
                    "invalid version constraint '{}': dangling operator",
                    expr
                )));
            }

            comparators.push(HaloComparator {
                op,
                version: HaloVersion::parse(rest)?,
            });
        }

        Ok(HaloVersionReq {
            comparators,
            source: expr.trim().to_string(),
        })
    }

    /// Whether the candidate version satisfies every comparator.
    pub fn matches(&self, candidate: &HaloVersion) -> bool {
        self.comparators.iter().all(|c| c.matches(candidate))
    }

    /// The original constraint expression, for diagnostics.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for HaloVersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.source)
        }
    }
}
