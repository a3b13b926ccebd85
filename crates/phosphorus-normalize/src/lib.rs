use thiserror::Error;

pub use extra_name::ExtraName;
pub use package_name::PackageName;

mod extra_name;
mod package_name;

/// Canonicalize an arbitrary name: lowercase it and collapse every run of `-`, `_` and `.` into a
/// single `-`.
///
/// Unlike [`PackageName`] and [`ExtraName`], this accepts any input. It's what marker comparands
/// for `extra` go through, since those are free-form strings.
///
/// ```text
/// Friendly.Bard -> friendly-bard
/// friendly_bard -> friendly-bard
/// FRIENDLY--BARD -> friendly-bard
/// ```
pub fn canonicalize_name(name: &str) -> String {
    Canonicalized::new(name).name
}

/// Canonicalize a package or extra name, rejecting anything that isn't a valid name.
pub(crate) fn validated_name(name: &str) -> Result<String, InvalidNameError> {
    let canonicalized = Canonicalized::new(name);
    if canonicalized.valid {
        Ok(canonicalized.name)
    } else {
        Err(InvalidNameError(name.to_string()))
    }
}

/// Like [`validated_name`], but reuses the allocation when the name is already canonical.
pub(crate) fn validated_owned_name(name: String) -> Result<String, InvalidNameError> {
    let canonicalized = Canonicalized::new(&name);
    if !canonicalized.valid {
        Err(InvalidNameError(name))
    } else if canonicalized.name == name {
        Ok(name)
    } else {
        Ok(canonicalized.name)
    }
}

/// The canonical form of a name, and whether the name was a valid package or extra name.
///
/// Valid names are ASCII letters, digits and separators, and don't start or end with a separator.
struct Canonicalized {
    name: String,
    valid: bool,
}

impl Canonicalized {
    fn new(name: &str) -> Self {
        let mut canonical = String::with_capacity(name.len());
        let mut valid = true;
        let mut after_separator = false;
        for char in name.chars() {
            if matches!(char, '-' | '_' | '.') {
                if canonical.is_empty() {
                    valid = false;
                }
                if !after_separator {
                    canonical.push('-');
                }
                after_separator = true;
            } else {
                valid &= char.is_ascii_alphanumeric();
                canonical.extend(char.to_lowercase());
                after_separator = false;
            }
        }
        Self {
            name: canonical,
            valid: valid && !after_separator,
        }
    }
}

/// Invalid [`PackageName`] or [`ExtraName`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "Not a valid package or extra name: \"{0}\". Names must start and end with a letter or \
    digit and may only contain -, _, ., and alphanumeric characters."
)]
pub struct InvalidNameError(String);

impl InvalidNameError {
    /// Returns the invalid name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests;
