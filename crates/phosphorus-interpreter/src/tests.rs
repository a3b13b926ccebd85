use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indoc::{formatdoc, indoc};
use temp_env::with_vars;
use tempfile::TempDir;

use phosphorus_pep508::{Marker, MarkerVariable, MarkerValues};
use phosphorus_static::EnvVars;

use crate::find_python::venv_python;
use crate::{Error, Interpreter, find_python};

const MARKERS: &str = indoc! {r##"
    {
        "implementation_name": "cpython",
        "implementation_version": "3.11.7",
        "os_name": "posix",
        "platform_machine": "x86_64",
        "platform_python_implementation": "CPython",
        "platform_release": "6.5.0-13-generic",
        "platform_system": "Linux",
        "platform_version": "#13-Ubuntu SMP PREEMPT_DYNAMIC Fri Nov  3 12:16:05 UTC 2023",
        "python_full_version": "3.11.7",
        "python_version": "3.11",
        "sys_platform": "linux"
    }
"##};

/// Create a fake Python interpreter executable that runs `body` instead of the query script.
fn create_mock_interpreter(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(
        path,
        formatdoc! {r"
        #!/bin/sh
        {body}
        "},
    )?;
    fs_err::set_permissions(path, std::os::unix::fs::PermissionsExt::from_mode(0o770))?;
    Ok(())
}

/// Create a fake Python interpreter that prints fixed marker values.
fn create_markers_interpreter(path: &Path) -> Result<()> {
    create_mock_interpreter(path, &format!("echo '{MARKERS}'"))
}

/// The environment for discovery, with the interpreter variables unset and `PATH` set to `path`.
fn discovery_vars(path: &OsString) -> [(&'static str, Option<OsString>); 3] {
    [
        (EnvVars::PHOSPHORUS_PYTHON, None),
        (EnvVars::VIRTUAL_ENV, None),
        (EnvVars::PATH, Some(path.clone())),
    ]
}

#[test]
fn query_mock_interpreter() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("python");
    create_markers_interpreter(&python)?;

    let interpreter = Interpreter::query(&python)?;
    assert_eq!(interpreter.executable(), python);
    assert_eq!(interpreter.markers().python_full_version, "3.11.7");
    assert_eq!(interpreter.value(MarkerVariable::SysPlatform)?, "linux");

    let marker = "python_version >= '3.8' and platform_system == 'Linux'".parse::<Marker>()?;
    assert!(marker.evaluate(&interpreter, None)?);
    Ok(())
}

#[test]
fn query_failing_interpreter() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("python");
    create_mock_interpreter(&python, "echo 'Unknown option: -c' 1>&2\nexit 2")?;

    let err = Interpreter::query(&python).unwrap_err();
    let (message, stdout, stderr) = match err {
        Error::PythonSubcommandOutput {
            message,
            stdout,
            stderr,
        } => (message, stdout, stderr),
        err => panic!("expected a subcommand error, got {err:?}"),
    };
    assert!(message.starts_with("Querying Python at"), "{message}");
    assert_eq!(stdout, "");
    assert_eq!(stderr, "Unknown option: -c");
    Ok(())
}

#[test]
fn query_malformed_output() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("python");
    create_mock_interpreter(&python, "echo '{\"os_name\": \"posix\"}'")?;

    let err = Interpreter::query(&python).unwrap_err();
    let (message, stdout) = match err {
        Error::PythonSubcommandOutput {
            message, stdout, ..
        } => (message, stdout),
        err => panic!("expected a subcommand error, got {err:?}"),
    };
    assert!(
        message.contains("did not return the expected data"),
        "{message}"
    );
    assert_eq!(stdout, r#"{"os_name": "posix"}"#);
    Ok(())
}

#[test]
fn query_missing_executable() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("python");

    let err = Interpreter::query(&python).unwrap_err();
    assert!(matches!(err, Error::PythonSubcommandLaunch { .. }), "{err:?}");
    Ok(())
}

#[test]
fn find_requested_python_path() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("custom").join("python3.11");
    create_markers_interpreter(&python)?;
    let venv = tempdir.path().join(".venv");
    create_markers_interpreter(&venv_python(&venv))?;

    let found = with_vars(
        [
            (EnvVars::PHOSPHORUS_PYTHON, Some(python.as_os_str())),
            (EnvVars::VIRTUAL_ENV, Some(venv.as_os_str())),
        ],
        find_python,
    )?;
    assert_eq!(found, fs_err::canonicalize(&python)?);
    Ok(())
}

#[test]
fn find_requested_python_name() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("python3.11");
    create_markers_interpreter(&python)?;

    let found = with_vars(
        [
            (EnvVars::PHOSPHORUS_PYTHON, Some(OsString::from("python3.11"))),
            (EnvVars::VIRTUAL_ENV, None),
            (EnvVars::PATH, Some(tempdir.path().as_os_str().to_owned())),
        ],
        find_python,
    )?;
    assert_eq!(found, python);

    let err = with_vars(
        [
            (EnvVars::PHOSPHORUS_PYTHON, Some(OsString::from("python2.7"))),
            (EnvVars::PATH, Some(tempdir.path().as_os_str().to_owned())),
        ],
        find_python,
    )
    .unwrap_err();
    assert!(
        matches!(err, Error::RequestedPythonNotFound { ref request, .. } if request == "python2.7"),
        "{err:?}"
    );
    Ok(())
}

#[test]
fn find_virtual_env_python() -> Result<()> {
    let tempdir = TempDir::new()?;
    let venv = tempdir.path().join(".venv");
    create_markers_interpreter(&venv_python(&venv))?;

    let found = with_vars(
        [
            (EnvVars::PHOSPHORUS_PYTHON, None),
            (EnvVars::VIRTUAL_ENV, Some(venv.as_os_str())),
        ],
        find_python,
    )?;
    assert_eq!(found, venv.join("bin").join("python"));
    Ok(())
}

#[test]
fn find_broken_virtual_env() -> Result<()> {
    let tempdir = TempDir::new()?;
    let venv = tempdir.path().join(".venv");
    fs_err::create_dir_all(&venv)?;

    let err = with_vars(
        [
            (EnvVars::PHOSPHORUS_PYTHON, None),
            (EnvVars::VIRTUAL_ENV, Some(venv.as_os_str())),
        ],
        find_python,
    )
    .unwrap_err();
    assert!(matches!(err, Error::BrokenVirtualEnv { .. }), "{err:?}");
    Ok(())
}

#[test]
fn find_default_python_prefers_python3() -> Result<()> {
    let tempdir = TempDir::new()?;
    let first = tempdir.path().join("first");
    let second = tempdir.path().join("second");
    create_markers_interpreter(&first.join("python"))?;
    create_markers_interpreter(&second.join("python3"))?;
    let path = std::env::join_paths([&first, &second])?;

    let found = with_vars(discovery_vars(&path), find_python)?;
    assert_eq!(found, fs_err::canonicalize(second.join("python3"))?);
    Ok(())
}

#[test]
fn find_default_python_empty_path() {
    let found = with_vars(discovery_vars(&OsString::new()), find_python);
    assert!(matches!(found, Err(Error::NoPythonInstalled)), "{found:?}");
}

#[test]
fn from_env_with_mock() -> Result<()> {
    let tempdir = TempDir::new()?;
    let python = tempdir.path().join("python3");
    create_markers_interpreter(&python)?;
    let path = tempdir.path().as_os_str().to_owned();

    let interpreter = with_vars(discovery_vars(&path), Interpreter::from_env)?;
    assert_eq!(interpreter.markers().implementation_name, "cpython");
    Ok(())
}

/// Runs the query script against the first real Python on `PATH`, if any.
#[test]
fn query_real_python() -> Result<()> {
    let Ok(python) = which::which("python3").or_else(|_| which::which("python")) else {
        return Ok(());
    };
    let interpreter = Interpreter::query(python)?;
    let markers = interpreter.markers();
    assert!(
        markers
            .python_full_version
            .starts_with(&markers.python_version),
        "{markers:?}"
    );
    assert_eq!(markers.os_name, "posix");
    Ok(())
}

#[test]
fn broken_virtual_env_message() {
    let err = Error::BrokenVirtualEnv {
        venv: PathBuf::from("/home/ferris/project/.venv"),
        executable: PathBuf::from("/home/ferris/project/.venv/bin/python"),
    };
    insta::assert_snapshot!(err, @"The virtual environment at `/home/ferris/project/.venv` has no Python executable at `/home/ferris/project/.venv/bin/python`");
}
