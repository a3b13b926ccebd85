use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the predefined environment variables a marker can test.
///
/// <https://packaging.python.org/en/latest/specifications/dependency-specifiers/#environment-markers>
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerVariable {
    /// `python_version`
    PythonVersion,
    /// `python_full_version`
    PythonFullVersion,
    /// `os_name`, or the legacy `os.name`
    OsName,
    /// `sys_platform`, or the legacy `sys.platform`
    SysPlatform,
    /// `platform_release`
    PlatformRelease,
    /// `platform_system`
    PlatformSystem,
    /// `platform_version`, or the legacy `platform.version`
    PlatformVersion,
    /// `platform_machine`, or the legacy `platform.machine`
    PlatformMachine,
    /// `platform_python_implementation`, or the legacy `platform.python_implementation`
    PlatformPythonImplementation,
    /// `implementation_name`
    ImplementationName,
    /// `implementation_version`
    ImplementationVersion,
    /// `extra`, the extra being installed
    Extra,
}

impl MarkerVariable {
    /// The marker name, with the legacy dotted spellings normalized to underscores.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PythonVersion => "python_version",
            Self::PythonFullVersion => "python_full_version",
            Self::OsName => "os_name",
            Self::SysPlatform => "sys_platform",
            Self::PlatformRelease => "platform_release",
            Self::PlatformSystem => "platform_system",
            Self::PlatformVersion => "platform_version",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformPythonImplementation => "platform_python_implementation",
            Self::ImplementationName => "implementation_name",
            Self::ImplementationVersion => "implementation_version",
            Self::Extra => "extra",
        }
    }

    /// Whether values of this variable are compared as PEP 440 versions instead of strings.
    pub fn is_version(self) -> bool {
        matches!(
            self,
            Self::PythonVersion
                | Self::PythonFullVersion
                | Self::ImplementationVersion
                | Self::PlatformVersion
        )
    }
}

impl FromStr for MarkerVariable {
    type Err = UnknownMarkerVariable;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let variable = match name {
            "python_version" => Self::PythonVersion,
            "python_full_version" => Self::PythonFullVersion,
            "os_name" | "os.name" => Self::OsName,
            "sys_platform" | "sys.platform" => Self::SysPlatform,
            "platform_release" => Self::PlatformRelease,
            "platform_system" => Self::PlatformSystem,
            "platform_version" | "platform.version" => Self::PlatformVersion,
            "platform_machine" | "platform.machine" => Self::PlatformMachine,
            "platform_python_implementation" | "platform.python_implementation" => {
                Self::PlatformPythonImplementation
            }
            "implementation_name" => Self::ImplementationName,
            "implementation_version" => Self::ImplementationVersion,
            "extra" => Self::Extra,
            _ => {
                return Err(UnknownMarkerVariable {
                    name: name.to_string(),
                });
            }
        };
        Ok(variable)
    }
}

impl Display for MarkerVariable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name that isn't one of the [`MarkerVariable`]s.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("`{name}` is not a marker variable")]
pub struct UnknownMarkerVariable {
    name: String,
}
