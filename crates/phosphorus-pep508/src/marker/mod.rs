//! Environment markers: `python_version >= '3.8' and sys_platform == 'linux'`.

pub use environment::{MarkerEnvironment, MarkerValues, MissingMarkerValue};
pub use tree::{BooleanOperator, Marker, MarkerAtom, MarkerEvaluationError, MarkerNode};
pub use variable::{MarkerVariable, UnknownMarkerVariable};

mod environment;
pub(crate) mod parse;
mod tokenizer;
mod tree;
mod variable;

#[cfg(test)]
mod tests;
