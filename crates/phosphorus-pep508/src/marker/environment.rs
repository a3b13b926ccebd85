use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marker::variable::MarkerVariable;

/// Provides the values of marker variables for evaluation.
///
/// `extra` is never read from the provider, it is passed to [`crate::Marker::evaluate`] instead.
pub trait MarkerValues {
    /// The value of `variable` in this environment.
    fn value(&self, variable: MarkerVariable) -> Result<Cow<'_, str>, MissingMarkerValue>;
}

/// The environment doesn't provide a value for the variable.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("The environment has no value for the marker variable `{variable}`")]
pub struct MissingMarkerValue {
    /// The variable that was looked up.
    pub variable: MarkerVariable,
}

/// A snapshot of the marker variables of a Python interpreter.
///
/// This is the JSON shape printed by the interpreter query.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct MarkerEnvironment {
    pub implementation_name: String,
    pub implementation_version: String,
    pub os_name: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub python_full_version: String,
    pub python_version: String,
    pub sys_platform: String,
}

impl MarkerEnvironment {
    /// The value of the variable, `None` for `extra`, which isn't part of the environment.
    pub fn get(&self, variable: MarkerVariable) -> Option<&str> {
        let value = match variable {
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformPythonImplementation => &self.platform_python_implementation,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::Extra => return None,
        };
        Some(value)
    }
}

impl MarkerValues for MarkerEnvironment {
    fn value(&self, variable: MarkerVariable) -> Result<Cow<'_, str>, MissingMarkerValue> {
        self.get(variable)
            .map(Cow::Borrowed)
            .ok_or(MissingMarkerValue { variable })
    }
}

/// A partial environment, such as a test fixture.
impl MarkerValues for HashMap<MarkerVariable, String> {
    fn value(&self, variable: MarkerVariable) -> Result<Cow<'_, str>, MissingMarkerValue> {
        self.get(&variable)
            .map(|value| Cow::Borrowed(value.as_str()))
            .ok_or(MissingMarkerValue { variable })
    }
}

/// Computes values on demand.
impl<F> MarkerValues for F
where
    F: Fn(MarkerVariable) -> Option<String>,
{
    fn value(&self, variable: MarkerVariable) -> Result<Cow<'_, str>, MissingMarkerValue> {
        self(variable)
            .map(Cow::Owned)
            .ok_or(MissingMarkerValue { variable })
    }
}
