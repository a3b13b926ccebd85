use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use unscanny::Scanner;

use crate::version::{OperatorParseError, VersionParseError};
use crate::{Epoch, Operator, Version};

/// A list of [`VersionClause`]s such as `>= 1.19, < 2.0`, all of which must hold.
///
/// Parse with [`VersionClauses::from_str`]. The clauses are kept in the order they were written.
///
/// ```rust
/// use std::str::FromStr;
/// use phosphorus_pep440::{Version, VersionClauses};
///
/// let clauses = VersionClauses::from_str(">=1.16, <2.0").unwrap();
/// assert!(clauses.contains(&Version::from_str("1.19").unwrap()));
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash, Default)]
pub struct VersionClauses(Vec<VersionClause>);

impl VersionClauses {
    /// Matches all versions.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether the version satisfies every clause.
    pub fn contains(&self, version: &Version) -> bool {
        self.iter().all(|clause| clause.contains(version))
    }
}

impl Deref for VersionClauses {
    type Target = [VersionClause];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<VersionClause> for VersionClauses {
    fn from_iter<T: IntoIterator<Item = VersionClause>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for VersionClauses {
    type Item = VersionClause;
    type IntoIter = std::vec::IntoIter<VersionClause>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<VersionClause> for VersionClauses {
    fn from(clause: VersionClause) -> Self {
        Self(vec![clause])
    }
}

impl FromStr for VersionClauses {
    type Err = VersionClausesParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version_clauses(s).map(Self)
    }
}

impl Display for VersionClauses {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, clause) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for VersionClauses {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for VersionClauses {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Error with span information (unicode width) inside the parsed line.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct VersionClausesParseError {
    inner: Box<VersionClausesParseErrorInner>,
}

#[derive(Debug, Eq, PartialEq, Clone)]
struct VersionClausesParseErrorInner {
    /// The underlying error that occurred.
    err: VersionClauseParseError,
    /// The string that failed to parse.
    line: String,
    /// The starting byte offset of the failing clause.
    start: usize,
    /// The ending byte offset of the failing clause.
    end: usize,
}

impl VersionClausesParseError {
    /// The string that failed to parse.
    pub fn line(&self) -> &str {
        &self.inner.line
    }

    /// The error of the clause that failed to parse.
    pub fn clause_error(&self) -> &VersionClauseParseError {
        &self.inner.err
    }
}

impl Display for VersionClausesParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use unicode_width::UnicodeWidthStr;

        let VersionClausesParseErrorInner {
            ref err,
            ref line,
            start,
            end,
        } = *self.inner;
        writeln!(f, "Failed to parse version: {err}:")?;
        writeln!(f, "{line}")?;
        let indent = line[..start].width();
        let point = line[start..end].width();
        writeln!(f, "{}{}", " ".repeat(indent), "^".repeat(point))?;
        Ok(())
    }
}

impl std::error::Error for VersionClausesParseError {}

/// A single clause such as `>1.2.3`, `<=4!5.6.7a8.post9.dev0` or `== 4.1.*`.
///
/// Parse with [`VersionClause::from_str`] or build with [`VersionClause::new`], which both
/// reject combinations PEP 440 doesn't allow.
///
/// ```rust
/// use std::str::FromStr;
/// use phosphorus_pep440::{Version, VersionClause};
///
/// let clause = VersionClause::from_str("== 1.*").unwrap();
/// assert!(clause.contains(&Version::from_str("1.19").unwrap()));
/// ```
#[derive(Eq, Ord, PartialEq, PartialOrd, Debug, Clone, Hash)]
pub struct VersionClause {
    operator: Operator,
    version: Version,
}

impl VersionClause {
    /// Build a clause, validating the combination of operator and version.
    pub fn new(operator: Operator, version: Version) -> Result<Self, VersionClauseBuildError> {
        if operator.is_marker_only() {
            return Err(VersionClauseBuildErrorKind::UnsupportedOperator(operator).into());
        }

        if !version.is_pep440_compliant() {
            if operator != Operator::ExactEqual {
                return Err(VersionClauseBuildErrorKind::NonPep440 {
                    operator,
                    version: version.to_string(),
                }
                .into());
            }
            return Ok(Self { operator, version });
        }

        if version.is_local() && !operator.permits_local() {
            return Err(VersionClauseBuildErrorKind::OperatorLocalCombo {
                operator,
                local: itertools::join(version.local(), "."),
            }
            .into());
        }

        if operator == Operator::TildeEqual && version.release().full().len() < 2 {
            return Err(VersionClauseBuildErrorKind::CompatibleRelease.into());
        }

        if version.is_prefix_match() && !operator.permits_wildcard() {
            return Err(VersionClauseBuildErrorKind::OperatorWithWildcard(operator).into());
        }

        Ok(Self { operator, version })
    }

    /// `==<version>`, without validation.
    fn equals_version(version: Version) -> Self {
        Self {
            operator: Operator::Equal,
            version,
        }
    }

    /// The operator.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// The version on the right-hand side of the operator.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Whether the version satisfies this clause.
    ///
    /// ```rust
    /// use std::str::FromStr;
    /// use phosphorus_pep440::{Version, VersionClause};
    ///
    /// let clause = VersionClause::from_str("~= 1.2").unwrap();
    /// assert!(clause.contains(&Version::from_str("1.3").unwrap()));
    /// assert!(!clause.contains(&Version::from_str("2.0").unwrap()));
    /// ```
    pub fn contains(&self, candidate: &Version) -> bool {
        if !self.version.is_pep440_compliant() || !candidate.is_pep440_compliant() {
            return *candidate == self.version;
        }

        match self.operator {
            Operator::Equal => self.contains_equal(candidate),
            Operator::NotEqual => !self.contains_equal(candidate),
            Operator::TildeEqual => self.contains_compatible(candidate),
            Operator::LessThanEqual => *candidate <= self.version,
            Operator::GreaterThanEqual => *candidate >= self.version,
            Operator::LessThan => {
                let candidate = candidate.public_version();
                if self.version.is_pre_release() {
                    candidate < self.version
                } else {
                    candidate.base_version() < self.version
                }
            }
            Operator::GreaterThan => {
                let candidate = candidate.public_version();
                if self.version.is_post_release() {
                    candidate > self.version
                } else {
                    candidate.base_version() > self.version
                }
            }
            Operator::ExactEqual => *candidate == self.version,
            Operator::In | Operator::NotIn => {
                unreachable!("`in` and `not in` are rejected when building a version clause")
            }
        }
    }

    /// `~=1.2.3` means `>=1.2.3, ==1.2.*`.
    fn contains_compatible(&self, candidate: &Version) -> bool {
        if *candidate < self.version {
            return false;
        }
        let Some((_, prefix)) = self.version.release().full().split_last() else {
            return false;
        };
        let wildcard = Version::wildcard(self.version.epoch(), prefix.iter().copied());
        Self::equals_version(wildcard).contains_equal(candidate)
    }

    fn contains_equal(&self, candidate: &Version) -> bool {
        let identifier = &self.version;
        if candidate.epoch() != identifier.epoch() {
            return identifier.epoch() == Epoch::Any;
        }

        if identifier.is_match_all() {
            return true;
        }

        if !identifier.is_prefix_match() {
            // A local identifier only matches that exact local version, otherwise the candidate's
            // local segment is ignored.
            return if identifier.is_local() {
                candidate == identifier
            } else {
                candidate.public_version() == identifier.public_version()
            };
        }

        if !identifier.is_base_version() {
            return candidate
                .canonical_form()
                .starts_with(&identifier.canonical_form());
        }

        // `1.2.*` matches `1.2` and `1.2.0.5` but not `1.20`: compare whole segments, with the
        // candidate's release zero-padded to the wildcard's length.
        let prefix = identifier.release().full();
        let base = candidate.base_version();
        let release = base.release().full();
        prefix.iter().enumerate().all(|(idx, segment)| {
            release.get(idx).copied().unwrap_or_default() == *segment
        })
    }
}

impl FromStr for VersionClause {
    type Err = VersionClauseParseError;

    /// Parses a clause such as `>= 1.19`, `== 1.1.*`, `~=1.0` or `1.0`, which defaults to `==`.
    fn from_str(clause: &str) -> Result<Self, Self::Err> {
        let mut s = Scanner::new(clause);
        s.eat_while(char::is_whitespace);
        // Greedy, so `===` isn't read as `==` followed by a version starting with `=`.
        let symbols = s.eat_while(['=', '!', '~', '<', '>']);
        let operator = if symbols.is_empty() {
            eat_word_operator(&mut s).unwrap_or(Operator::Equal)
        } else {
            Operator::from_str(symbols).map_err(ParseErrorKind::InvalidOperator)?
        };
        s.eat_while(char::is_whitespace);
        let version = s.eat_while(|c: char| !c.is_whitespace());
        if version.is_empty() {
            return Err(ParseErrorKind::MissingVersion.into());
        }
        let version = Version::from_str(version).map_err(ParseErrorKind::InvalidVersion)?;
        let clause = Self::new(operator, version).map_err(ParseErrorKind::InvalidClause)?;
        s.eat_while(char::is_whitespace);
        if !s.done() {
            return Err(ParseErrorKind::InvalidTrailing(s.after().to_string()).into());
        }
        Ok(clause)
    }
}

/// Reads the word operators `in` and `not in`, which must be followed by whitespace.
fn eat_word_operator(s: &mut Scanner) -> Option<Operator> {
    let checkpoint = s.cursor();
    if s.eat_if("not")
        && !s.eat_while(char::is_whitespace).is_empty()
        && s.eat_if("in")
        && s.peek().is_some_and(char::is_whitespace)
    {
        return Some(Operator::NotIn);
    }
    s.jump(checkpoint);
    if s.eat_if("in") && s.peek().is_some_and(char::is_whitespace) {
        return Some(Operator::In);
    }
    s.jump(checkpoint);
    None
}

impl Display for VersionClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

impl<'de> Deserialize<'de> for VersionClause {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for VersionClause {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// An error that can occur when constructing a version clause.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(transparent)]
pub struct VersionClauseBuildError {
    // Boxed to keep `Result<VersionClause, _>` small.
    kind: Box<VersionClauseBuildErrorKind>,
}

impl VersionClauseBuildError {
    /// The reason the clause was rejected.
    pub fn kind(&self) -> &VersionClauseBuildErrorKind {
        &self.kind
    }
}

/// The kinds of invalid operator and version combinations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum VersionClauseBuildErrorKind {
    /// `in` or `not in` used outside of an environment marker.
    #[error("Only environment markers are permitted to use `{0}`")]
    UnsupportedOperator(Operator),
    /// A version that doesn't follow PEP 440 with an operator other than `===`.
    #[error(
        "Operator {operator} cannot be used with the non PEP 440 version `{version}`, only `===` can"
    )]
    NonPep440 {
        /// The operator that was used.
        operator: Operator,
        /// The version that doesn't follow PEP 440.
        version: String,
    },
    /// A local version with `<`, `<=`, `>=`, `>` or `~=`.
    #[error(
        "Operator {operator} is incompatible with versions containing non-empty local segments (`+{local}`)"
    )]
    OperatorLocalCombo {
        /// The operator that was used.
        operator: Operator,
        /// The local segments, joined by `.`.
        local: String,
    },
    /// `~=` with a single release segment.
    #[error("The ~= operator requires at least two segments in the release version")]
    CompatibleRelease,
    /// A wildcard version with an operator other than `==` or `!=`.
    #[error("Operator {0} cannot be used with a wildcard version specifier")]
    OperatorWithWildcard(Operator),
}

impl From<VersionClauseBuildErrorKind> for VersionClauseBuildError {
    fn from(kind: VersionClauseBuildErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }
}

/// An error that can occur when parsing a single clause.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(transparent)]
pub struct VersionClauseParseError {
    kind: Box<ParseErrorKind>,
}

impl From<ParseErrorKind> for VersionClauseParseError {
    fn from(kind: ParseErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }
}

impl VersionClauseParseError {
    /// The build error, if the clause was well-formed but not a valid combination.
    pub fn as_build_error(&self) -> Option<&VersionClauseBuildError> {
        match &*self.kind {
            ParseErrorKind::InvalidClause(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
enum ParseErrorKind {
    #[error(transparent)]
    InvalidOperator(OperatorParseError),
    #[error(transparent)]
    InvalidVersion(VersionParseError),
    #[error(transparent)]
    InvalidClause(VersionClauseBuildError),
    #[error("Unexpected end of version clause, expected version")]
    MissingVersion,
    #[error("Trailing `{0}` is not allowed")]
    InvalidTrailing(String),
}

/// Splits on `,` and parses every clause, remembering where the failing clause starts and ends.
pub(crate) fn parse_version_clauses(
    line: &str,
) -> Result<Vec<VersionClause>, VersionClausesParseError> {
    let mut clauses = Vec::new();
    if line.trim().is_empty() {
        return Ok(clauses);
    }
    let mut start: usize = 0;
    let separator = ",";
    for clause in line.split(separator) {
        match VersionClause::from_str(clause) {
            Err(err) => {
                return Err(VersionClausesParseError {
                    inner: Box::new(VersionClausesParseErrorInner {
                        err,
                        line: line.to_string(),
                        start,
                        end: start + clause.len(),
                    }),
                });
            }
            Ok(clause) => clauses.push(clause),
        }
        start += clause.len();
        start += separator.len();
    }
    Ok(clauses)
}
