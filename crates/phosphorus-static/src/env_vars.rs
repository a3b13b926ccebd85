/// Declares all environment variable used throughout `phosphorus` and its crates.
pub struct EnvVars;

impl EnvVars {
    /// The Python interpreter to query for marker values, as a path or a name on `PATH`.
    ///
    /// Takes precedence over an active virtual environment.
    pub const PHOSPHORUS_PYTHON: &'static str = "PHOSPHORUS_PYTHON";

    /// Used to detect an activated virtual environment.
    pub const VIRTUAL_ENV: &'static str = "VIRTUAL_ENV";

    /// The standard `PATH` env var.
    pub const PATH: &'static str = "PATH";
}
