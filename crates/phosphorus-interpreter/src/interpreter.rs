use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use phosphorus_pep508::{MarkerEnvironment, MarkerValues, MarkerVariable, MissingMarkerValue};

use crate::find_python::find_python;
use crate::Error;

/// A Python executable and the marker values it reported.
///
/// The interpreter is run once, when the [`Interpreter`] is created.
#[derive(Debug, Clone)]
pub struct Interpreter {
    executable: PathBuf,
    markers: MarkerEnvironment,
}

impl Interpreter {
    /// Detect the Python executable from the host environment and query it.
    ///
    /// See [`find_python`] for the lookup order.
    pub fn from_env() -> Result<Self, Error> {
        let executable = find_python()?;
        Self::query(executable)
    }

    /// Run the Python executable to read its marker values.
    pub fn query(executable: impl AsRef<Path>) -> Result<Self, Error> {
        let executable = executable.as_ref();
        debug!("Querying markers for {}", executable.display());
        let output = Command::new(executable)
            .args(["-c", include_str!("get_marker_values.py")])
            .output()
            .map_err(|err| Error::PythonSubcommandLaunch {
                interpreter: executable.to_path_buf(),
                err,
            })?;

        // stderr isn't technically a criterion for success, but i don't know of any cases where there
        // should be stderr output and if there is, we want to know
        if !output.status.success() || !output.stderr.is_empty() {
            return Err(Error::PythonSubcommandOutput {
                message: format!(
                    "Querying Python at `{}` failed with {}",
                    executable.display(),
                    output.status,
                ),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let markers = serde_json::from_slice::<MarkerEnvironment>(&output.stdout).map_err(|err| {
            Error::PythonSubcommandOutput {
                message: format!(
                    "Querying Python at `{}` did not return the expected data: {err}",
                    executable.display(),
                ),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        })?;
        debug!(
            "Found {} {} at {}",
            markers.implementation_name,
            markers.python_full_version,
            executable.display()
        );

        Ok(Self {
            executable: executable.to_path_buf(),
            markers,
        })
    }

    /// Returns the path to the Python executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the [`MarkerEnvironment`] for this Python executable.
    pub fn markers(&self) -> &MarkerEnvironment {
        &self.markers
    }
}

impl MarkerValues for Interpreter {
    fn value(&self, variable: MarkerVariable) -> Result<Cow<'_, str>, MissingMarkerValue> {
        self.markers.value(variable)
    }
}
