//! A library for python [dependency specifiers](https://packaging.python.org/en/latest/specifications/dependency-specifiers/)
//! better known as [PEP 508](https://peps.python.org/pep-0508/)
//!
//! ## Usage
//!
//! ```
//! use std::str::FromStr;
//! use phosphorus_pep508::Requirement;
//! use phosphorus_normalize::ExtraName;
//!
//! let marker = r#"requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8""#;
//! let dependency_specification = Requirement::from_str(marker).unwrap();
//! assert_eq!(dependency_specification.name.as_ref(), "requests");
//! assert_eq!(dependency_specification.extras, vec![ExtraName::from_str("security").unwrap(), ExtraName::from_str("tests").unwrap()]);
//! ```

#![deny(missing_docs)]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use unicode_width::UnicodeWidthChar;

pub use marker::{
    BooleanOperator, Marker, MarkerAtom, MarkerEnvironment, MarkerEvaluationError, MarkerNode,
    MarkerValues, MarkerVariable, MissingMarkerValue, UnknownMarkerVariable,
};
use phosphorus_normalize::{ExtraName, InvalidNameError, PackageName};
use phosphorus_pep440::{Version, VersionClause, VersionClauseParseError, VersionClauses};

use crate::cursor::Cursor;

mod cursor;
mod marker;

/// Error with a span attached. `start` and `len` are byte offsets into `input`.
#[derive(Debug)]
pub struct Pep508Error {
    /// Either we have an error string from our parser or an upstream error
    pub message: Pep508ErrorSource,
    /// Span start index
    pub start: usize,
    /// Span length
    pub len: usize,
    /// The input string so we can print it underlined
    pub input: String,
}

/// Either we have an error string from our parser or an upstream error
#[derive(Debug, Error)]
pub enum Pep508ErrorSource {
    /// An error from our parser.
    #[error("{0}")]
    String(String),
    /// A package or extra name that failed validation.
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),
    /// A version clause that failed to parse.
    #[error(transparent)]
    VersionClause(#[from] VersionClauseParseError),
}

impl Display for Pep508Error {
    /// Pretty formatting with underline.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let start_offset = self.input[..self.start]
            .chars()
            .filter_map(UnicodeWidthChar::width)
            .sum::<usize>();
        // An error at the end of the input still gets one caret.
        let underline_len = if self.start == self.input.len() {
            1
        } else {
            self.input[self.start..self.start + self.len]
                .chars()
                .filter_map(UnicodeWidthChar::width)
                .sum::<usize>()
        };
        write!(
            f,
            "{}\n{}\n{}{}",
            self.message,
            self.input,
            " ".repeat(start_offset),
            "^".repeat(underline_len)
        )
    }
}

/// We need this to allow e.g. anyhow's `.context()`
impl std::error::Error for Pep508Error {}

/// A PEP 508 dependency specification
#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub struct Requirement {
    /// The distribution name such as `requests` in
    /// `requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8"`
    pub name: PackageName,
    /// The list of extras such as `security`, `tests` in
    /// `requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8"`
    pub extras: Vec<ExtraName>,
    /// The version clauses such as `>= 2.8.1`, `== 2.8.*` in
    /// `requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8"`,
    /// empty if any version is acceptable
    pub clauses: VersionClauses,
    /// The markers such as `python_version > "3.8"` in
    /// `requests [security,tests] >= 2.8.1, == 2.8.* ; python_version > "3.8"`,
    /// empty if the requirement always applies
    pub marker: Marker,
}

impl Requirement {
    /// Whether the version satisfies every clause of the requirement.
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.clauses.contains(version)
    }

    /// Whether the requirement applies to the environment when installing `extra`.
    pub fn evaluate_marker(
        &self,
        env: &impl MarkerValues,
        extra: Option<&ExtraName>,
    ) -> Result<bool, MarkerEvaluationError> {
        self.marker.evaluate(env, extra)
    }
}

impl Display for Requirement {
    /// Renders `name[extras] (clauses) ; marker`, leaving out empty parts.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(
                f,
                "[{}]",
                self.extras
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            )?;
        }
        if !self.clauses.is_empty() {
            write!(f, " ({})", self.clauses)?;
        }
        if !self.marker.is_empty() {
            write!(f, " ; {}", self.marker)?;
        }
        Ok(())
    }
}

/// <https://github.com/serde-rs/serde/issues/908#issuecomment-298027413>
impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

/// <https://github.com/serde-rs/serde/issues/1316#issue-332908452>
impl Serialize for Requirement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl FromStr for Requirement {
    type Err = Pep508Error;

    /// Parse a [dependency specifier](https://packaging.python.org/en/latest/specifications/dependency-specifiers)
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse(&mut Cursor::new(input))
    }
}

fn parse_name(cursor: &mut Cursor) -> Result<PackageName, Pep508Error> {
    // https://peps.python.org/pep-0508/#names
    // ^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$ with re.IGNORECASE
    let Some((index, char)) = cursor.next() else {
        return Err(cursor.error("Empty field is not allowed for PEP508", 0, 1));
    };
    if !char.is_ascii_alphanumeric() {
        return Err(cursor.error(
            format!("Expected package name starting with an alphanumeric character, found '{char}'"),
            index,
            char.len_utf8(),
        ));
    }

    let (start, len) =
        cursor.take_while(|char| char.is_ascii_alphanumeric() || matches!(char, '.' | '-' | '_'));
    let rest = cursor.slice(start, len);
    // [.-_] can't be the final character
    if let Some(last @ ('.' | '-' | '_')) = rest.chars().last() {
        return Err(cursor.error(
            format!("Package name must end with an alphanumeric character, not '{last}'"),
            start + len - 1,
            1,
        ));
    }

    let name = cursor.slice(index, start + len - index);
    PackageName::from_str(name).map_err(|err| Pep508Error {
        message: Pep508ErrorSource::InvalidName(err),
        start: index,
        len: name.len(),
        input: cursor.input().to_string(),
    })
}

/// parses extras in the `[extra1,extra2] format`
fn parse_extras(cursor: &mut Cursor) -> Result<Vec<ExtraName>, Pep508Error> {
    let Some(bracket_pos) = cursor.eat_char('[') else {
        return Ok(vec![]);
    };
    let early_eof_error = |cursor: &Cursor| {
        cursor.error(
            "Missing closing bracket (expected ']', found end of dependency specification)",
            bracket_pos,
            1,
        )
    };

    let mut extras = Vec::new();
    // `[]` is no extras.
    cursor.eat_whitespace();
    if cursor.eat_char(']').is_some() {
        return Ok(extras);
    }

    loop {
        // wsp* before the identifier
        cursor.eat_whitespace();

        // First char of the identifier
        match cursor.peek() {
            Some((_, char)) if char.is_ascii_alphanumeric() => {}
            Some((pos, other)) => {
                return Err(cursor.error(
                    format!(
                        "Expected an alphanumeric character starting the extra name, found '{other}'"
                    ),
                    pos,
                    other.len_utf8(),
                ));
            }
            None => return Err(early_eof_error(cursor)),
        }
        // identifier_end = letterOrDigit | (('-' | '_' | '.' )* letterOrDigit)
        let (start, len) = cursor
            .take_while(|char| char.is_ascii_alphanumeric() || matches!(char, '-' | '_' | '.'));
        match cursor.peek() {
            Some((pos, char)) if char != ',' && char != ']' && !char.is_whitespace() => {
                return Err(cursor.error(
                    format!(
                        "Invalid character in extras name, expected an alphanumeric character, '-', '_', '.', ',' or ']', found '{char}'"
                    ),
                    pos,
                    char.len_utf8(),
                ));
            }
            _ => {}
        }
        let extra = ExtraName::from_str(cursor.slice(start, len)).map_err(|err| Pep508Error {
            message: Pep508ErrorSource::InvalidName(err),
            start,
            len,
            input: cursor.input().to_string(),
        })?;
        extras.push(extra);

        // wsp* after the identifier
        cursor.eat_whitespace();
        // end or next identifier?
        match cursor.next() {
            Some((_, ',')) => {}
            Some((_, ']')) => break,
            Some((pos, other)) => {
                return Err(cursor.error(
                    format!(
                        "Expected either ',' (separating extras) or ']' (ending the extras section), found '{other}'"
                    ),
                    pos,
                    other.len_utf8(),
                ));
            }
            None => return Err(early_eof_error(cursor)),
        }
    }

    Ok(extras)
}

/// Parses the clause between `start` and `end`, reporting errors against that span.
fn parse_clause(cursor: &Cursor, start: usize, end: usize) -> Result<VersionClause, Pep508Error> {
    VersionClause::from_str(cursor.slice(start, end - start)).map_err(|err| Pep508Error {
        message: Pep508ErrorSource::VersionClause(err),
        start,
        len: end - start,
        input: cursor.input().to_string(),
    })
}

/// Such as `>=1.19,<2.0`, either delimited by the end of the specifier or a `;` for the marker part
///
/// ```text
/// version_one (wsp* ',' version_one)*
/// ```
fn parse_version_clauses(cursor: &mut Cursor) -> Result<VersionClauses, Pep508Error> {
    let mut start = cursor.pos();
    let mut clauses = Vec::new();
    loop {
        match cursor.peek() {
            Some((end, ',')) => {
                clauses.push(parse_clause(cursor, start, end)?);
                cursor.next();
                start = end + 1;
            }
            Some((end, ';')) => {
                clauses.push(parse_clause(cursor, start, end)?);
                break;
            }
            None => {
                clauses.push(parse_clause(cursor, start, cursor.pos())?);
                break;
            }
            Some(_) => {
                cursor.next();
            }
        }
    }
    Ok(clauses.into_iter().collect())
}

/// Such as `(>=1.19,<2.0)`
///
/// ```text
/// '(' version_one (wsp* ',' version_one)* ')'
/// ```
fn parse_version_clauses_parentheses(cursor: &mut Cursor) -> Result<VersionClauses, Pep508Error> {
    let brace_pos = cursor.pos();
    cursor.next();
    // Makes for slightly better error underline
    cursor.eat_whitespace();
    let mut start = cursor.pos();
    let mut clauses = Vec::new();
    loop {
        match cursor.next() {
            Some((end, ',')) => {
                clauses.push(parse_clause(cursor, start, end)?);
                start = end + 1;
            }
            Some((end, ')')) => {
                clauses.push(parse_clause(cursor, start, end)?);
                break;
            }
            Some(_) => {}
            None => {
                return Err(cursor.error(
                    "Missing closing parenthesis (expected ')', found end of dependency specification)",
                    brace_pos,
                    1,
                ));
            }
        }
    }
    Ok(clauses.into_iter().collect())
}

/// Parse a [dependency specifier](https://packaging.python.org/en/latest/specifications/dependency-specifiers)
fn parse(cursor: &mut Cursor) -> Result<Requirement, Pep508Error> {
    // ```text
    // specification = wsp* name wsp* extras? wsp* (('(' versionspec ')') | (versionspec)) wsp* (';' wsp* marker)? wsp*
    // ```
    // Where the extras start with '[' if any, then we have '(' or one of the version comparison
    // operators. Markers start with ';' if any
    // wsp*
    cursor.eat_whitespace();
    // name
    let name = parse_name(cursor)?;
    // wsp*
    cursor.eat_whitespace();
    // extras?
    let extras = parse_extras(cursor)?;
    // wsp*
    cursor.eat_whitespace();

    // versionspec?
    let clauses = match cursor.peek_char() {
        Some('(') => parse_version_clauses_parentheses(cursor)?,
        // A clause without an operator, `foo 1.0`, is `foo ==1.0`.
        Some('<' | '=' | '>' | '~' | '!' | '*' | 'v' | 'V' | '0'..='9') => {
            parse_version_clauses(cursor)?
        }
        Some(';') | None => VersionClauses::empty(),
        Some(other) => {
            return Err(cursor.error(
                format!(
                    "Expected one of `(`, `<`, `=`, `>`, `~`, `!`, `;` or a version, found `{other}`"
                ),
                cursor.pos(),
                other.len_utf8(),
            ));
        }
    };

    // wsp*
    cursor.eat_whitespace();
    // quoted_marker?, which runs to the end of the input
    if cursor.eat_char(';').is_some() {
        let marker = marker::parse::parse_marker(cursor.input(), cursor.pos())?;
        return Ok(Requirement {
            name,
            extras,
            clauses,
            marker,
        });
    }

    // wsp*
    cursor.eat_whitespace();
    if let Some((pos, char)) = cursor.next() {
        return Err(cursor.error(
            format!("Expected end of input or ';', found '{char}'"),
            pos,
            char.len_utf8(),
        ));
    }

    Ok(Requirement {
        name,
        extras,
        clauses,
        marker: Marker::empty(),
    })
}
