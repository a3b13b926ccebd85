//! Find a Python interpreter and read the values of the environment markers from it.
//!
//! ```no_run
//! use phosphorus_interpreter::Interpreter;
//!
//! let interpreter = Interpreter::from_env()?;
//! println!("{}", interpreter.markers().python_full_version);
//! # Ok::<(), phosphorus_interpreter::Error>(())
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use crate::find_python::{find_default_python, find_python, find_requested_python};
pub use crate::interpreter::Interpreter;

mod find_python;
mod interpreter;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Failed to run Python at `{}`", interpreter.display())]
    PythonSubcommandLaunch {
        interpreter: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("{message}:\n--- stdout:\n{stdout}\n--- stderr:\n{stderr}\n---")]
    PythonSubcommandOutput {
        message: String,
        stdout: String,
        stderr: String,
    },
    #[error("Failed to find the requested Python `{request}` on `PATH`")]
    RequestedPythonNotFound {
        request: String,
        #[source]
        err: which::Error,
    },
    #[error("The virtual environment at `{}` has no Python executable at `{}`", venv.display(), executable.display())]
    BrokenVirtualEnv { venv: PathBuf, executable: PathBuf },
    #[error("Could not find `python3` or `python` on `PATH`")]
    NoPythonInstalled,
}

#[cfg(all(test, unix))]
mod tests;
