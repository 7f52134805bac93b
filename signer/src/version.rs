//! Release version extraction.
//!
//! Source archive names embed the `major.minor.patch` part of the release
//! tag. The first run of ASCII digits, dot, digits, dot, digits found in the
//! tag is taken as the version; anything around it (`v`, `release-`,
//! `-rc.1`) is ignored.

use crate::error::{Result, SignerError};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// A `major.minor.patch` version taken from a release tag.
///
/// # Examples
///
/// ```
/// use release_signer::version::ReleaseVersion;
///
/// let version = ReleaseVersion::from_tag("v1.2.3")?;
/// assert_eq!(version.as_str(), "1.2.3");
///
/// assert!(ReleaseVersion::from_tag("release-a").is_err());
/// # Ok::<(), release_signer::error::SignerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Extract the first `major.minor.patch` substring of `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::TagVersion`] naming the tag when it contains no
    /// such substring.
    pub fn from_tag(tag: &str) -> Result<Self> {
        find_version(tag)
            .map(|version| Self(version.to_owned()))
            .ok_or_else(|| SignerError::TagVersion {
                tag: tag.to_owned(),
            })
    }

    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Three dot-separated ASCII digit runs. `[0-9]` rather than `\d`, which the
/// regex crate treats as Unicode.
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+").expect("version pattern is valid")
});

/// Return the leftmost `digits.digits.digits` match in `tag`.
///
/// Every component is taken greedily, so `1.2.345` yields `1.2.345` and
/// `1.2.3.4` yields `1.2.3`.
fn find_version(tag: &str) -> Option<&str> {
    VERSION_RE.find(tag).map(|found| found.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::prefixed("v1.2.3", "1.2.3")]
    #[case::bare("1.2.3", "1.2.3")]
    #[case::named_prefix("release-10.20.30", "10.20.30")]
    #[case::prerelease("v1.2.3-rc.1", "1.2.3")]
    #[case::four_components("1.2.3.4", "1.2.3")]
    #[case::first_of_two("v1.2.3-from-4.5.6", "1.2.3")]
    #[case::skips_partial("v1.2-build.4.5.6", "4.5.6")]
    #[case::skips_dangling_dot("1.2.x1.2.3", "1.2.3")]
    #[case::leading_zeroes("v01.002.0003", "01.002.0003")]
    #[case::skips_non_ascii_digits("v\u{0661}.2.3-build-7.8.9", "7.8.9")]
    fn extracts_first_version(#[case] tag: &str, #[case] expected: &str) {
        let version = ReleaseVersion::from_tag(tag).expect("tag should contain a version");
        assert_eq!(version.as_str(), expected);
    }

    #[rstest]
    #[case::words("release-a")]
    #[case::two_components("v1.2")]
    #[case::empty("")]
    #[case::trailing_dot("v1.2.")]
    #[case::non_ascii_digits("v\u{0661}.\u{0662}.\u{0663}")]
    fn rejects_tags_without_version(#[case] tag: &str) {
        let err = ReleaseVersion::from_tag(tag).expect_err("tag should be rejected");
        assert!(
            matches!(&err, SignerError::TagVersion { tag: reported } if reported == tag),
            "unexpected error: {err}"
        );
    }
}
