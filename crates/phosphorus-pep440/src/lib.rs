//! Python version numbers and version clauses, implementing
//! [PEP 440](https://peps.python.org/pep-0440)
//!
//! ```rust
//! use std::str::FromStr;
//! use phosphorus_pep440::{Version, VersionClause, VersionClauses};
//!
//! let version = Version::from_str("1.19").unwrap();
//! let clause = VersionClause::from_str("== 1.*").unwrap();
//! assert!(clause.contains(&version));
//! let clauses = VersionClauses::from_str(">=1.16, <2.0").unwrap();
//! assert!(clauses.contains(&version));
//! ```
//!
//! Things to keep in mind:
//!
//! * A lower epoch (`N!`) always means a lower version: `2.0 < 1!0.1`.
//! * Trailing zeros don't matter for comparisons, `1.0 == 1.0.0`, but are kept when displaying.
//! * Post-releases are compared before pre-releases, so `1.0a1.post1 > 1.0`.
//! * Ordering contradicts matching: `1.0+local > 1.0` when sorting, but `==1.0` matches
//!   `1.0+local`.
//! * Strings that don't follow PEP 440 still parse. They only match themselves, through `===`.
#![deny(missing_docs)]

pub use {
    filter::VersionFilter,
    version::{
        Epoch, LocalSegment, Operator, OperatorParseError, Prerelease, PrereleaseKind, Release,
        ReleasePaddingError, Version, VersionParseError,
    },
    version_clause::{
        VersionClause, VersionClauseBuildError, VersionClauseBuildErrorKind,
        VersionClauseParseError, VersionClauses, VersionClausesParseError,
    },
};

mod filter;
mod version;
mod version_clause;
