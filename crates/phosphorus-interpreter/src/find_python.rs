//! Find the Python interpreter to query.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use phosphorus_static::EnvVars;

use crate::Error;

/// Find the Python executable to query, in order:
///
/// * `PHOSPHORUS_PYTHON`, as a path or a name on `PATH`.
/// * The interpreter of the virtual environment in `VIRTUAL_ENV`.
/// * `python3`, then `python`, on `PATH`.
pub fn find_python() -> Result<PathBuf, Error> {
    if let Some(request) = env::var_os(EnvVars::PHOSPHORUS_PYTHON).filter(|value| !value.is_empty())
    {
        debug!(
            "Using `{}` from `{}`",
            request.to_string_lossy(),
            EnvVars::PHOSPHORUS_PYTHON
        );
        return find_requested_python(&request);
    }

    if let Some(venv) = env::var_os(EnvVars::VIRTUAL_ENV).filter(|value| !value.is_empty()) {
        let venv = PathBuf::from(venv);
        let executable = venv_python(&venv);
        if !executable.is_file() {
            return Err(Error::BrokenVirtualEnv { venv, executable });
        }
        debug!("Using the active virtual environment at {}", venv.display());
        return Ok(executable);
    }

    find_default_python()
}

/// Find a user requested Python.
///
/// * `python3.10` or `python.exe` looks for a binary on `PATH`.
/// * `/home/ferris/.local/bin/python3.10` uses this exact Python.
#[instrument]
pub fn find_requested_python(request: &OsStr) -> Result<PathBuf, Error> {
    let is_path = Path::new(request).components().count() > 1;
    if is_path {
        Ok(fs_err::canonicalize(request)?)
    } else {
        which::which(request).map_err(|err| Error::RequestedPythonNotFound {
            request: request.to_string_lossy().to_string(),
            err,
        })
    }
}

/// Pick a sensible default for the python a user wants when they didn't specify a version.
#[instrument]
pub fn find_default_python() -> Result<PathBuf, Error> {
    let python = which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|_| Error::NoPythonInstalled)?;
    Ok(fs_err::canonicalize(python)?)
}

/// The path to the Python executable inside a virtual environment.
pub(crate) fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}
