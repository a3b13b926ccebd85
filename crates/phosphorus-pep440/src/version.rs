use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use smallvec::SmallVec;
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::warn;

/// The PEP 440 version grammar, without the wildcard forms (`*`, `N!*` and a trailing `.*`),
/// which are split off before matching.
///
/// See <https://peps.python.org/pep-0440/#appendix-b-parsing-version-strings-with-regular-expressions>
pub(crate) const VERSION_RE_INNER: &str = r"
(?:
    (?:v?)                                            # <https://peps.python.org/pep-0440/#preceding-v-character>
    (?:(?P<epoch>[0-9]+)!)?                           # epoch
    (?P<release>[0-9]+(?:\.[0-9]+)*)                  # release segment
    (?P<pre_field>                                    # pre-release
        [-_\.]?
        (?P<pre_name>(a|b|c|rc|alpha|beta|pre|preview))
        [-_\.]?
        (?P<pre>[0-9]+)?
    )?
    (?P<post_field>                                   # post release
        (?:-(?P<post_old>[0-9]+))
        |
        (?:
            [-_\.]?
            (?P<post_l>post|rev|r)
            [-_\.]?
            (?P<post_new>[0-9]+)?
        )
    )?
    (?P<dev_field>                                    # dev release
        [-_\.]?
        (?P<dev_l>dev)
        [-_\.]?
        (?P<dev>[0-9]+)?
    )?
)
(?:\+(?P<local>[a-z0-9]+(?:[-_\.][a-z0-9]+)*))?       # local version
";

/// Matches a python version, such as `1.19.a1`.
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?xi)^{VERSION_RE_INNER}$")).unwrap());

/// One of `~=` `==` `!=` `<=` `>=` `<` `>` `===`, or one of the marker-only containment operators
/// `in` and `not in`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Operator {
    /// `===` (discouraged)
    ///
    /// <https://peps.python.org/pep-0440/#arbitrary-equality>
    ExactEqual,
    /// `== 1.2.3` or `== 1.2.*`
    Equal,
    /// `!= 1.2.3` or `!= 1.2.*`
    NotEqual,
    /// `~=`
    TildeEqual,
    /// `<=`
    LessThanEqual,
    /// `>=`
    GreaterThanEqual,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `in`, only valid in environment markers
    In,
    /// `not in`, only valid in environment markers
    NotIn,
}

impl Operator {
    /// Whether the operator only makes sense between a marker variable and a string, never in a
    /// version clause.
    pub fn is_marker_only(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Whether a version with a local segment may be used with this operator.
    pub fn permits_local(self) -> bool {
        !matches!(
            self,
            Self::LessThan
                | Self::LessThanEqual
                | Self::GreaterThanEqual
                | Self::GreaterThan
                | Self::TildeEqual
        )
    }

    /// Whether a wildcard (`.*`) version may be used with this operator.
    pub fn permits_wildcard(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }
}

impl FromStr for Operator {
    type Err = OperatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let operator = match s {
            "==" => Self::Equal,
            "===" => {
                #[cfg(feature = "tracing")]
                {
                    warn!("Using arbitrary equality (`===`) is discouraged");
                }
                Self::ExactEqual
            }
            "!=" => Self::NotEqual,
            "~=" => Self::TildeEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessThanEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterThanEqual,
            "in" => Self::In,
            other => {
                // `not in` may be separated by any amount of whitespace.
                let mut words = other.split_whitespace();
                if words.next() == Some("not") && words.next() == Some("in") && words.next().is_none()
                {
                    Self::NotIn
                } else {
                    return Err(OperatorParseError {
                        got: other.to_string(),
                    });
                }
            }
        };
        Ok(operator)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let operator = match self {
            Self::ExactEqual => "===",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::TildeEqual => "~=",
            Self::LessThanEqual => "<=",
            Self::GreaterThanEqual => ">=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::In => "in",
            Self::NotIn => "not in",
        };
        f.write_str(operator)
    }
}

/// An error that occurs when parsing an invalid operator string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("No such comparison operator `{got}`, must be one of ~= == != <= >= < > === in, not in")]
pub struct OperatorParseError {
    pub(crate) got: String,
}

/// The epoch of a version.
///
/// Besides the numeric `N!` prefix, two sentinels exist: [`Epoch::Any`] for the match-all
/// literal `*`, which matches every epoch, and [`Epoch::NotPep440`] for versions that failed the
/// PEP 440 grammar. They order as `NotPep440 < Any < Number(_)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Epoch {
    /// The version does not follow PEP 440.
    NotPep440,
    /// The bare `*` wildcard, matching any epoch.
    Any,
    /// An explicit or implicit (`0`) epoch.
    Number(u64),
}

impl Epoch {
    /// The numeric epoch, if this is one.
    pub fn number(self) -> Option<u64> {
        match self {
            Self::Number(number) => Some(number),
            Self::Any | Self::NotPep440 => None,
        }
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl Display for Epoch {
    /// Renders the `N!` prefix, which is omitted for the implicit epoch `0` and the sentinels.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(0) | Self::Any | Self::NotPep440 => Ok(()),
            Self::Number(number) => write!(f, "{number}!"),
        }
    }
}

/// The release segment of a version, such as `1.2.0`.
///
/// The segments are kept as written, but equality, ordering and hashing ignore trailing zeros:
/// `1.0 == 1.0.0`, while both keep their own display string.
#[derive(Clone, Debug)]
pub struct Release {
    full: SmallVec<[u64; 4]>,
}

impl Release {
    /// Create a release from its segments, as written.
    pub fn new(full: impl IntoIterator<Item = u64>) -> Self {
        Self {
            full: full.into_iter().collect(),
        }
    }

    /// The segments as written, including trailing zeros.
    pub fn full(&self) -> &[u64] {
        &self.full
    }

    /// The segments with trailing zeros stripped, as used for comparisons.
    pub fn canonical(&self) -> &[u64] {
        let len = self
            .full
            .iter()
            .rposition(|segment| *segment != 0)
            .map_or(0, |last| last + 1);
        &self.full[..len]
    }

    /// Right-pad the release with zeros to `len` segments.
    ///
    /// If the stripped release already has `len` segments, the release is returned unchanged.
    pub fn padded(&self, len: usize) -> Result<Self, ReleasePaddingError> {
        let canonical = self.canonical();
        if len < canonical.len() {
            return Err(ReleasePaddingError {
                release: self.to_string(),
                len,
            });
        }
        if len == canonical.len() {
            return Ok(self.clone());
        }
        Ok(Self::new(
            canonical
                .iter()
                .copied()
                .chain(std::iter::repeat_n(0, len - canonical.len())),
        ))
    }

    /// Renders the stripped release, or `0` if every segment is zero.
    fn canonical_string(&self) -> String {
        let canonical = self.canonical();
        if canonical.is_empty() {
            "0".to_string()
        } else {
            join_segments(canonical)
        }
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Release {}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(other.canonical())
    }
}

impl Hash for Release {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl Display for Release {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&join_segments(&self.full))
    }
}

fn join_segments(segments: &[u64]) -> String {
    itertools::join(segments, ".")
}

/// An error when padding would have to drop non-zero release segments.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("Padding `{release}` to {len} segments cannot truncate the release")]
pub struct ReleasePaddingError {
    release: String,
    len: usize,
}

/// The kind of a pre-release: alpha, beta or release candidate.
///
/// <https://peps.python.org/pep-0440/#pre-releases>
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PrereleaseKind {
    /// alpha pre-release
    Alpha,
    /// beta pre-release
    Beta,
    /// release candidate pre-release
    Rc,
}

impl PrereleaseKind {
    /// Normalizes the spellings permitted by PEP 440: `alpha`, `beta`, `c`, `pre` and `preview`.
    fn from_letter(letter: &str) -> Option<Self> {
        match letter.to_ascii_lowercase().as_str() {
            "a" | "alpha" => Some(Self::Alpha),
            "b" | "beta" => Some(Self::Beta),
            "c" | "rc" | "pre" | "preview" => Some(Self::Rc),
            _ => None,
        }
    }
}

impl Display for PrereleaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alpha => f.write_str("a"),
            Self::Beta => f.write_str("b"),
            Self::Rc => f.write_str("rc"),
        }
    }
}

/// A pre-release marker such as `rc2`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Prerelease {
    /// The kind of pre-release.
    pub kind: PrereleaseKind,
    /// The number following the kind, `0` if omitted.
    pub number: u64,
}

impl Display for Prerelease {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind, self.number)
    }
}

/// A segment of the [local version identifier](https://peps.python.org/pep-0440/#local-version-identifiers).
///
/// Numeric segments sort before string segments.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LocalSegment {
    /// A segment made only of digits.
    Number(u64),
    /// Any other segment, lowercased.
    String(String),
}

impl LocalSegment {
    fn parse(segment: &str) -> Self {
        if let Ok(number) = segment.parse::<u64>() {
            Self::Number(number)
        } else {
            Self::String(segment.to_lowercase())
        }
    }
}

impl Display for LocalSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::String(string) => f.write_str(string),
        }
    }
}

/// A version such as `1.2.3`, `4!5.6.7a8.post9.dev0+local`, the wildcards `1.2.*`, `*` and
/// `2!*`, or a string that does not follow PEP 440 at all.
///
/// Versions are totally ordered, comparing field by field with the first difference winning:
///
/// 1. epoch,
/// 2. release, ignoring trailing zeros,
/// 3. post-release, where no post-release is smallest,
/// 4. whether it's a dev-release, dev-releases being smaller,
/// 5. pre-release, where no pre-release is largest,
/// 6. dev-release number,
/// 7. local segments, where no local version is smallest.
///
/// The wildcard flags break remaining ties, so a wildcard is never equal to a concrete version.
///
/// A string that fails the grammar still parses: it gets [`Epoch::NotPep440`], a `0` release, and
/// the raw text as its only local segment. Such versions are only equal to the exact same text.
///
/// ```text
/// 1.1.dev1 < 1.1a1 < 1.1b1 < 1.1rc1 < 1.1 < 1.1.post1
/// ```
#[derive(Clone, Debug)]
pub struct Version {
    epoch: Epoch,
    release: Release,
    pre: Option<Prerelease>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
    prefix_match: bool,
    match_all: bool,
}

impl Version {
    /// A final release with the given release segments, such as `Version::new([3, 8])`.
    pub fn new(release: impl IntoIterator<Item = u64>) -> Self {
        Self {
            epoch: Epoch::default(),
            release: Release::new(release),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
            prefix_match: false,
            match_all: false,
        }
    }

    /// The wildcard `{epoch}!{release}.*`.
    pub(crate) fn wildcard(epoch: Epoch, release: impl IntoIterator<Item = u64>) -> Self {
        Self {
            epoch,
            prefix_match: true,
            ..Self::new(release)
        }
    }

    /// The match-all wildcard, `*` for [`Epoch::Any`] or `N!*` for an epoch number.
    fn match_all(epoch: Epoch) -> Self {
        Self {
            epoch,
            prefix_match: true,
            match_all: true,
            ..Self::new([0])
        }
    }

    /// A version that doesn't follow PEP 440.
    fn not_pep440(raw: &str) -> Self {
        Self {
            epoch: Epoch::NotPep440,
            local: vec![LocalSegment::String(raw.to_string())],
            ..Self::new([0])
        }
    }

    /// Set the epoch.
    #[must_use]
    pub fn with_epoch(self, epoch: u64) -> Self {
        Self {
            epoch: Epoch::Number(epoch),
            ..self
        }
    }

    /// Set the pre-release.
    #[must_use]
    pub fn with_pre(self, pre: Option<Prerelease>) -> Self {
        Self { pre, ..self }
    }

    /// Set the post-release.
    #[must_use]
    pub fn with_post(self, post: Option<u64>) -> Self {
        Self { post, ..self }
    }

    /// Set the dev-release.
    #[must_use]
    pub fn with_dev(self, dev: Option<u64>) -> Self {
        Self { dev, ..self }
    }

    /// Set the local segments.
    ///
    /// String segments are normalized as if parsed: lowercased, split on `-`, `_` and `.`, and
    /// read as numbers when they are all digits.
    #[must_use]
    pub fn with_local(self, local: Vec<LocalSegment>) -> Self {
        let local = local
            .into_iter()
            .flat_map(|segment| match segment {
                LocalSegment::Number(_) => vec![segment],
                LocalSegment::String(string) => string
                    .split(['-', '_', '.'])
                    .filter(|part| !part.is_empty())
                    .map(LocalSegment::parse)
                    .collect(),
            })
            .collect();
        Self { local, ..self }
    }
}

impl Version {
    /// The epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// The release segments.
    pub fn release(&self) -> &Release {
        &self.release
    }

    /// The pre-release, if any.
    pub fn pre(&self) -> Option<Prerelease> {
        self.pre
    }

    /// The post-release number, if any.
    pub fn post(&self) -> Option<u64> {
        self.post
    }

    /// The dev-release number, if any.
    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    /// The local segments, empty if there's no local version.
    pub fn local(&self) -> &[LocalSegment] {
        &self.local
    }

    /// The first release segment.
    pub fn major(&self) -> u64 {
        self.release_segment(0)
    }

    /// The second release segment, `0` if absent.
    pub fn minor(&self) -> u64 {
        self.release_segment(1)
    }

    /// The third release segment, `0` if absent.
    pub fn micro(&self) -> u64 {
        self.release_segment(2)
    }

    fn release_segment(&self, index: usize) -> u64 {
        self.release.full().get(index).copied().unwrap_or_default()
    }

    /// Whether the version ended with a `.*` wildcard (also set for `*` and `N!*`).
    pub fn is_prefix_match(&self) -> bool {
        self.prefix_match
    }

    /// Whether the version is `*` or `N!*`.
    pub fn is_match_all(&self) -> bool {
        self.match_all
    }

    /// Whether the version follows the PEP 440 grammar.
    pub fn is_pep440_compliant(&self) -> bool {
        self.epoch != Epoch::NotPep440
    }

    /// Whether this is an alpha, beta or release candidate.
    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }

    /// Whether this is a post-release.
    pub fn is_post_release(&self) -> bool {
        self.post.is_some()
    }

    /// Whether this is a dev-release.
    pub fn is_dev_release(&self) -> bool {
        self.dev.is_some()
    }

    /// Whether this is a local version (e.g. `1.2.3+ubuntu.1`).
    pub fn is_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// Whether this is a plain final release without pre, post, dev or local segments.
    pub fn is_base_version(&self) -> bool {
        self.pre.is_none() && self.post.is_none() && self.dev.is_none() && self.local.is_empty()
    }

    /// The epoch and release only, e.g. `1.2` for `1.2rc1.post3+local`.
    ///
    /// Versions that don't follow PEP 440 are returned unchanged.
    pub fn base_version(&self) -> Self {
        if !self.is_pep440_compliant() {
            return self.clone();
        }
        Self {
            epoch: self.epoch,
            ..Self::new(self.release.full().iter().copied())
        }
    }

    /// The version without its local segment, e.g. `1.2rc1.post3` for `1.2rc1.post3+local`.
    ///
    /// Versions that don't follow PEP 440 are returned unchanged.
    pub fn public_version(&self) -> Self {
        if !self.is_pep440_compliant() {
            return self.clone();
        }
        Self {
            local: Vec::new(),
            prefix_match: false,
            match_all: false,
            ..self.clone()
        }
    }

    /// The normalized string with trailing zeros stripped from the release, e.g. `1.2rc1` for
    /// `1.2.0.0c1`. The wildcard suffix `.*` is not part of the canonical form.
    pub fn canonical_form(&self) -> String {
        if !self.is_pep440_compliant() || self.match_all {
            return self.to_string();
        }
        format!(
            "{}{}{}",
            self.epoch,
            self.release.canonical_string(),
            self.suffixes()
        )
    }

    /// Right-pad the release with zeros to `len` segments.
    pub fn padded(&self, len: usize) -> Result<Self, ReleasePaddingError> {
        Ok(Self {
            release: self.release.padded(len)?,
            ..self.clone()
        })
    }

    /// Renders everything after the release segment.
    fn suffixes(&self) -> String {
        let mut suffixes = String::new();
        if let Some(pre) = self.pre {
            suffixes.push_str(&pre.to_string());
        }
        if let Some(post) = self.post {
            suffixes.push_str(&format!(".post{post}"));
        }
        if let Some(dev) = self.dev {
            suffixes.push_str(&format!(".dev{dev}"));
        }
        if !self.local.is_empty() {
            suffixes.push('+');
            suffixes.push_str(&itertools::join(&self.local, "."));
        }
        suffixes
    }
}

/// Shows the normalized version, keeping the release segments as written.
impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.epoch {
            Epoch::NotPep440 => {
                return match self.local.first() {
                    Some(raw) => write!(f, "{raw}"),
                    None => Ok(()),
                };
            }
            Epoch::Any if self.match_all => return f.write_str("*"),
            Epoch::Number(epoch) if self.match_all => return write!(f, "{epoch}!*"),
            Epoch::Any | Epoch::Number(_) => {}
        }
        write!(f, "{}{}{}", self.epoch, self.release, self.suffixes())?;
        if self.prefix_match {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses a version such as `1.19`, `1.0a1`, `1.0+abc.5`, `1!2012.2` or a wildcard such as
    /// `1.2.*`, `*` or `3!*`. Text that doesn't follow PEP 440 is accepted as a non-compliant
    /// version.
    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let version = version.trim();

        if version == "*" {
            return Ok(Self::match_all(Epoch::Any));
        }
        if let Some(epoch) = version.strip_suffix("!*") {
            let epoch = epoch
                .parse::<u64>()
                .map_err(|_| VersionParseError::InvalidMatchAllEpoch {
                    version: version.to_string(),
                })?;
            return Ok(Self::match_all(Epoch::Number(epoch)));
        }

        let (stripped, prefix_match) = match version.strip_suffix(".*") {
            Some(stripped) => (stripped, true),
            None => (version, false),
        };

        let Some(captures) = VERSION_RE.captures(stripped) else {
            return Ok(Self::not_pep440(version));
        };
        let mut parsed = Self::parse_captures(version, &captures)?;

        if prefix_match {
            if parsed.dev.is_some() || !parsed.local.is_empty() {
                return Err(VersionParseError::PrefixMatchWithDevOrLocal {
                    version: version.to_string(),
                });
            }
            parsed.prefix_match = true;
        }
        Ok(parsed)
    }
}

impl Version {
    fn parse_captures(version: &str, captures: &Captures) -> Result<Self, VersionParseError> {
        let number_field = |field_name: &'static str| -> Result<Option<u64>, VersionParseError> {
            let Some(field) = captures.name(field_name) else {
                return Ok(None);
            };
            field
                .as_str()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| VersionParseError::NumberTooLarge {
                    version: version.to_string(),
                    number: field.as_str().to_string(),
                })
        };

        // "If no explicit epoch is given, the implicit epoch is 0"
        let epoch = Epoch::Number(number_field("epoch")?.unwrap_or_default());
        let release = captures
            .name("release")
            .map(|release| release.as_str())
            .unwrap_or_default()
            .split('.')
            .map(|segment| {
                segment
                    .parse::<u64>()
                    .map_err(|_| VersionParseError::NumberTooLarge {
                        version: version.to_string(),
                        number: segment.to_string(),
                    })
            })
            .collect::<Result<SmallVec<[u64; 4]>, _>>()?;
        let pre = match captures
            .name("pre_name")
            .and_then(|name| PrereleaseKind::from_letter(name.as_str()))
        {
            // <https://peps.python.org/pep-0440/#implicit-pre-release-number>
            Some(kind) => Some(Prerelease {
                kind,
                number: number_field("pre")?.unwrap_or_default(),
            }),
            None => None,
        };
        let post = if captures.name("post_field").is_some() {
            Some(
                number_field("post_new")?
                    .or(number_field("post_old")?)
                    .unwrap_or_default(),
            )
        } else {
            None
        };
        let dev = if captures.name("dev_field").is_some() {
            // <https://peps.python.org/pep-0440/#implicit-development-release-number>
            Some(number_field("dev")?.unwrap_or_default())
        } else {
            None
        };
        let local = captures
            .name("local")
            .map(|local| {
                local
                    .as_str()
                    .split(['-', '_', '.'])
                    .map(LocalSegment::parse)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            epoch,
            release: Release { full: release },
            pre,
            post,
            dev,
            local,
            prefix_match: false,
            match_all: false,
        })
    }
}

/// An error when parsing a version.
///
/// Text that merely doesn't follow PEP 440 is not an error, see [`Version`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum VersionParseError {
    /// `N!*` with an `N` that isn't a number.
    #[error("Invalid epoch in match-all version `{version}`, expected a number before `!*`")]
    InvalidMatchAllEpoch {
        /// The version being parsed.
        version: String,
    },
    /// A numeric field that doesn't fit into 64 bits.
    #[error("The number `{number}` in version `{version}` is too large")]
    NumberTooLarge {
        /// The version being parsed.
        version: String,
        /// The offending digits.
        number: String,
    },
    /// A trailing `.*` combined with a dev or local segment, such as `1.0.dev1.*`.
    #[error("Prefix match containing a dev or local release is invalid: `{version}`")]
    PrefixMatchWithDevOrLocal {
        /// The version being parsed.
        version: String,
    },
}

/// Orders `None` after every `Some`, for fields where absence means "final".
fn cmp_none_greatest<T: Ord>(left: Option<T>, right: Option<T>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => left.cmp(&right),
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.release.hash(state);
        self.post.hash(state);
        self.pre.hash(state);
        self.dev.hash(state);
        self.local.hash(state);
        self.prefix_match.hash(state);
        self.match_all.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.release.cmp(&other.release))
            .then_with(|| self.post.cmp(&other.post))
            // A dev-release sorts below a version that isn't one.
            .then_with(|| other.is_dev_release().cmp(&self.is_dev_release()))
            .then_with(|| cmp_none_greatest(self.pre, other.pre))
            .then_with(|| cmp_none_greatest(self.dev, other.dev))
            .then_with(|| self.local.cmp(&other.local))
            .then_with(|| self.prefix_match.cmp(&other.prefix_match))
            .then_with(|| self.match_all.cmp(&other.match_all))
    }
}

/// <https://github.com/serde-rs/serde/issues/1316#issue-332908452>
impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

/// <https://github.com/serde-rs/serde/issues/1316#issue-332908452>
impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
