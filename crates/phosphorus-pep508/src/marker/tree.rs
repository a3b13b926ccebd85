use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use tracing::warn;

use phosphorus_normalize::ExtraName;
use phosphorus_pep440::{
    Operator, Version, VersionClause, VersionClauseBuildError, VersionParseError,
};

use crate::marker::environment::{MarkerValues, MissingMarkerValue};
use crate::marker::parse::parse_marker;
use crate::marker::variable::MarkerVariable;
use crate::Pep508Error;

/// `and` or `or`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BooleanOperator {
    /// All children must hold.
    And,
    /// At least one child must hold.
    Or,
}

impl Display for BooleanOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
        }
    }
}

/// A single comparison such as `python_version >= '3.8'`.
///
/// The variable is always on the left, whichever side it was written on.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MarkerAtom {
    /// The environment variable being tested.
    pub variable: MarkerVariable,
    /// A comparison operator, or `in`/`not in`.
    pub operator: Operator,
    /// The quoted literal, without its quotes.
    pub value: String,
}

impl MarkerAtom {
    /// Evaluate against the environment, reading `extra` from the argument instead.
    pub fn evaluate(
        &self,
        env: &impl MarkerValues,
        extra: Option<&ExtraName>,
    ) -> Result<bool, MarkerEvaluationError> {
        let environment_value = match self.variable {
            MarkerVariable::Extra => Cow::Borrowed(extra.map_or("", ExtraName::as_str)),
            variable => env.value(variable)?,
        };
        let environment_value = environment_value.as_ref();

        match self.operator {
            Operator::In => return Ok(self.value.contains(environment_value)),
            Operator::NotIn => return Ok(!self.value.contains(environment_value)),
            _ => {}
        }

        if self.variable.is_version() {
            return self.evaluate_version(environment_value);
        }

        let value = self.value.as_str();
        match self.operator {
            Operator::Equal => Ok(environment_value == value),
            Operator::NotEqual => Ok(environment_value != value),
            Operator::LessThanEqual
            | Operator::GreaterThanEqual
            | Operator::LessThan
            | Operator::GreaterThan => {
                warn!(
                    "Comparing `{}` (`{environment_value}`) and `{value}` lexicographically in `{self}`",
                    self.variable
                );
                Ok(match self.operator {
                    Operator::LessThanEqual => environment_value <= value,
                    Operator::GreaterThanEqual => environment_value >= value,
                    Operator::LessThan => environment_value < value,
                    _ => environment_value > value,
                })
            }
            Operator::TildeEqual | Operator::ExactEqual => {
                Err(MarkerEvaluationError::UnsupportedOperator {
                    variable: self.variable,
                    operator: self.operator,
                })
            }
            Operator::In | Operator::NotIn => {
                unreachable!("`in` and `not in` are evaluated before any comparison")
            }
        }
    }

    fn evaluate_version(&self, environment_value: &str) -> Result<bool, MarkerEvaluationError> {
        let invalid_version = |err| MarkerEvaluationError::InvalidVersion {
            atom: self.to_string(),
            err,
        };
        let identifier = Version::from_str(&self.value).map_err(invalid_version)?;
        let clause = VersionClause::new(self.operator, identifier).map_err(|err| {
            MarkerEvaluationError::InvalidClause {
                atom: self.to_string(),
                err,
            }
        })?;
        let candidate = Version::from_str(environment_value).map_err(invalid_version)?;
        Ok(clause.contains(&candidate))
    }
}

impl Display for MarkerAtom {
    /// Renders `variable op 'value'`, switching to double quotes if the value contains `'`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.value.contains('\'') {
            write!(f, "{} {} \"{}\"", self.variable, self.operator, self.value)
        } else {
            write!(f, "{} {} '{}'", self.variable, self.operator, self.value)
        }
    }
}

/// A child of a [`Marker`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum MarkerNode {
    /// A single comparison.
    Atom(MarkerAtom),
    /// A nested boolean group.
    Group(Marker),
}

impl MarkerNode {
    fn evaluate(
        &self,
        env: &impl MarkerValues,
        extra: Option<&ExtraName>,
    ) -> Result<bool, MarkerEvaluationError> {
        match self {
            Self::Atom(atom) => atom.evaluate(env, extra),
            Self::Group(marker) => marker.evaluate(env, extra),
        }
    }

    /// Unwraps a group without an operator to its only child, `None` for the empty group.
    fn simplify(self) -> Option<Self> {
        match self {
            Self::Group(marker) if marker.boolean.is_none() => marker.markers.into_iter().next(),
            node => Some(node),
        }
    }
}

impl Display for MarkerNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atom(atom) => write!(f, "{atom}"),
            Self::Group(marker) => write!(f, "{marker}"),
        }
    }
}

/// An environment marker such as `python_version >= '3.8' and sys_platform == 'linux'`.
///
/// A marker is a boolean group of [`MarkerNode`]s. Without a boolean operator it holds at most one
/// child; the empty marker holds none and always evaluates to `true`.
///
/// Mixed `and`/`or` sequences follow the usual precedence, `a and b or c` is `(a and b) or c`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Marker {
    boolean: Option<BooleanOperator>,
    markers: Vec<MarkerNode>,
}

impl Marker {
    /// The marker without conditions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A marker holding a single comparison.
    pub fn atom(atom: MarkerAtom) -> Self {
        Self {
            boolean: None,
            markers: vec![MarkerNode::Atom(atom)],
        }
    }

    /// All the children must hold.
    ///
    /// Empty groups are dropped and a single remaining child is returned as is, so the marker
    /// reads back unchanged from its string form.
    pub fn and(markers: Vec<MarkerNode>) -> Self {
        Self::group(BooleanOperator::And, markers)
    }

    /// At least one child must hold.
    ///
    /// Normalized the same way as [`Marker::and`].
    pub fn or(markers: Vec<MarkerNode>) -> Self {
        Self::group(BooleanOperator::Or, markers)
    }

    fn group(boolean: BooleanOperator, markers: Vec<MarkerNode>) -> Self {
        let mut markers: Vec<MarkerNode> =
            markers.into_iter().filter_map(MarkerNode::simplify).collect();
        if markers.len() > 1 {
            Self {
                boolean: Some(boolean),
                markers,
            }
        } else {
            markers.pop().map_or_else(Self::empty, Self::from)
        }
    }

    /// The operator joining the children, `None` for a single child or the empty marker.
    pub fn boolean(&self) -> Option<BooleanOperator> {
        self.boolean
    }

    /// The children, in the order they were written.
    pub fn markers(&self) -> &[MarkerNode] {
        &self.markers
    }

    /// Whether this marker has no conditions.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Evaluate against an environment, with `extra` as the value of the `extra` variable (the
    /// empty string if `None`).
    ///
    /// `and` and `or` short-circuit, so an invalid comparison after the deciding one isn't
    /// reported.
    pub fn evaluate(
        &self,
        env: &impl MarkerValues,
        extra: Option<&ExtraName>,
    ) -> Result<bool, MarkerEvaluationError> {
        let Some(first) = self.markers.first() else {
            return Ok(true);
        };
        match self.boolean {
            None => first.evaluate(env, extra),
            Some(BooleanOperator::And) => {
                for marker in &self.markers {
                    if !marker.evaluate(env, extra)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Some(BooleanOperator::Or) => {
                for marker in &self.markers {
                    if marker.evaluate(env, extra)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl From<MarkerNode> for Marker {
    fn from(node: MarkerNode) -> Self {
        match node {
            MarkerNode::Atom(atom) => Self::atom(atom),
            MarkerNode::Group(marker) => marker,
        }
    }
}

impl FromStr for Marker {
    type Err = Pep508Error;

    /// Parse a marker such as `os_name == 'posix' and (python_version < '3.8' or extra == 'compat')`.
    fn from_str(marker: &str) -> Result<Self, Self::Err> {
        parse_marker(marker, 0)
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(boolean) = self.boolean else {
            return match self.markers.first() {
                Some(node) => write!(f, "{node}"),
                None => Ok(()),
            };
        };
        for (idx, node) in self.markers.iter().enumerate() {
            if idx > 0 {
                write!(f, " {boolean} ")?;
            }
            match node {
                MarkerNode::Atom(atom) => write!(f, "{atom}")?,
                MarkerNode::Group(marker) => write!(f, "({marker})")?,
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Marker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Marker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Why a marker couldn't be evaluated.
#[derive(Debug, Error)]
pub enum MarkerEvaluationError {
    /// `~=` or `===` on a variable that isn't a version.
    #[error("Cannot compare `{variable}` with `{operator}`")]
    UnsupportedOperator {
        /// The variable being compared.
        variable: MarkerVariable,
        /// The operator that only works on versions.
        operator: Operator,
    },
    /// A version comparison with an operator and version that don't form a valid clause.
    #[error("Invalid version comparison `{atom}`")]
    InvalidClause {
        /// The comparison, as written.
        atom: String,
        /// The reason the clause is invalid.
        #[source]
        err: VersionClauseBuildError,
    },
    /// A version comparison on a value that doesn't parse as a version.
    #[error("Invalid version in `{atom}`")]
    InvalidVersion {
        /// The comparison, as written.
        atom: String,
        /// The version parse error.
        #[source]
        err: VersionParseError,
    },
    /// The environment doesn't know the variable.
    #[error(transparent)]
    MissingValue(#[from] MissingMarkerValue),
}
