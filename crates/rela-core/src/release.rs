//! Release boundary resolution.
//!
//! Maps a product version string (`131.0`, `131.0.2`, `131`) onto the pair of
//! release tags that delimit its history. Tags follow the
//! `{PREFIX}_{major}_{minor}[_{patch}]_RELEASE` convention, with `PREFIX`
//! supplied by a [`TagScheme`].
//!
//! | Version   | End tag                    | Previous version |
//! |-----------|----------------------------|------------------|
//! | `131.0.2` | `FIREFOX_131_0_2_RELEASE`  | `131.0`          |
//! | `131.0`   | `FIREFOX_131_0_RELEASE`    | `130.0`          |
//! | `131.3`   | `FIREFOX_131_3_RELEASE`    | `131.2`          |
//! | `131`     | `FIREFOX_131_0_RELEASE`    | `130.0`          |
//!
//! The end tag is matched by substring so vendor suffixes on tag names are
//! tolerated. The start tag must match exactly; if none does, the boundary
//! has no start and callers fall back to a time window ending at `end`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors from release boundary resolution.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// A version component is not a non-negative integer.
    #[error("invalid version {version:?}: component {component:?} is not a number")]
    InvalidVersion {
        /// The version string as given.
        version: String,
        /// The offending component.
        component: String,
    },

    /// No tag in the universe matches the version's release tag.
    #[error("could not find release tag {target} for version {version}")]
    UnresolvableVersion {
        /// The version string as given.
        version: String,
        /// The tag name that was searched for.
        target: String,
    },
}

/// Result alias for boundary resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Naming convention for release tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagScheme {
    /// Product prefix, e.g. `FIREFOX`.
    pub prefix: String,
}

impl TagScheme {
    /// Create a scheme for the given product prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Release tag for a sequence of numeric version components.
    pub fn release_tag(&self, components: &[u64]) -> String {
        let mut tag = self.prefix.clone();
        for component in components {
            tag.push('_');
            tag.push_str(&component.to_string());
        }
        tag.push_str("_RELEASE");
        tag
    }

    /// Glob matching every release tag of this scheme (for `git tag -l`).
    pub fn tag_glob(&self) -> String {
        format!("*{}*RELEASE*", self.prefix)
    }
}

/// The pair of tags delimiting a release's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseBoundary {
    /// Previous release tag, if one was found.
    pub start: Option<String>,
    /// This release's tag, verbatim from the tag universe.
    pub end: String,
}

impl ReleaseBoundary {
    /// The `git log` revision range for this boundary.
    ///
    /// Without a start tag this is just the end tag; pair it with a
    /// `--since` window.
    pub fn revision_range(&self) -> String {
        match self.start {
            Some(ref start) => format!("{start}..{}", self.end),
            None => self.end.clone(),
        }
    }
}

impl fmt::Display for ReleaseBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(ref start) => write!(f, "{start}..{}", self.end),
            None => write!(f, "(time window)..{}", self.end),
        }
    }
}

/// A parsed product version and its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPlan {
    /// Components used to build this release's tag.
    pub target: Vec<u64>,
    /// Components of the release this one follows, if any.
    pub previous: Option<Vec<u64>>,
}

impl VersionPlan {
    /// Parse a version string.
    ///
    /// Only the first three components are considered; `143.0.1.5` plans
    /// like `143.0.1`. A `0` major has no predecessor.
    pub fn parse(version: &str) -> ResolveResult<Self> {
        let parts: Vec<&str> = version.split('.').collect();
        let number = |idx: usize| -> ResolveResult<u64> {
            let component = parts[idx];
            component
                .parse::<u64>()
                .map_err(|_| ResolveError::InvalidVersion {
                    version: version.to_string(),
                    component: component.to_string(),
                })
        };

        let plan = match parts.len() {
            1 => {
                let major = number(0)?;
                Self {
                    target: vec![major, 0],
                    previous: major.checked_sub(1).map(|prev| vec![prev, 0]),
                }
            }
            2 => {
                let (major, minor) = (number(0)?, number(1)?);
                let previous = match minor.checked_sub(1) {
                    Some(prev_minor) => Some(vec![major, prev_minor]),
                    None => major.checked_sub(1).map(|prev| vec![prev, 0]),
                };
                Self {
                    target: vec![major, minor],
                    previous,
                }
            }
            _ => {
                let (major, minor, patch) = (number(0)?, number(1)?, number(2)?);
                Self {
                    target: vec![major, minor, patch],
                    previous: Some(vec![major, minor]),
                }
            }
        };
        Ok(plan)
    }

    /// Exact tag names to try for the previous release, in priority order.
    pub fn previous_patterns(&self, scheme: &TagScheme) -> Vec<String> {
        match self.previous.as_deref() {
            Some(prev @ [major, minor, _]) => vec![
                scheme.release_tag(prev),
                scheme.release_tag(&[*major, *minor]),
            ],
            Some(prev) => vec![scheme.release_tag(prev)],
            None => Vec::new(),
        }
    }
}

/// Resolve `version` to a boundary within `tags`.
///
/// `tags` is searched in the order given; it is never sorted.
#[instrument(skip(tags), fields(tag_count = tags.len()))]
pub fn resolve<S: AsRef<str>>(
    version: &str,
    tags: &[S],
    scheme: &TagScheme,
) -> ResolveResult<ReleaseBoundary> {
    let plan = VersionPlan::parse(version)?;
    let target = scheme.release_tag(&plan.target);

    let end = tags
        .iter()
        .map(AsRef::as_ref)
        .find(|tag| tag.contains(target.as_str()))
        .ok_or_else(|| ResolveError::UnresolvableVersion {
            version: version.to_string(),
            target: target.clone(),
        })?
        .to_string();

    let start = plan.previous_patterns(scheme).into_iter().find_map(|pattern| {
        tags.iter()
            .map(AsRef::as_ref)
            .find(|tag| *tag == pattern)
            .map(str::to_string)
    });

    match start {
        Some(ref start) => debug!(%start, %end, "resolved release boundary"),
        None => warn!(%end, "no previous release tag found, falling back to a time window"),
    }

    Ok(ReleaseBoundary { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firefox() -> TagScheme {
        TagScheme::new("FIREFOX")
    }

    fn plan(version: &str) -> VersionPlan {
        VersionPlan::parse(version).unwrap()
    }

    #[test]
    fn point_release_targets_patch_tag_and_follows_base() {
        let p = plan("143.0.1");
        assert_eq!(firefox().release_tag(&p.target), "FIREFOX_143_0_1_RELEASE");
        assert_eq!(p.previous, Some(vec![143, 0]));
    }

    #[test]
    fn major_release_follows_previous_major() {
        let p = plan("131.0");
        assert_eq!(firefox().release_tag(&p.target), "FIREFOX_131_0_RELEASE");
        assert_eq!(p.previous, Some(vec![130, 0]));
    }

    #[test]
    fn minor_release_follows_previous_minor() {
        let p = plan("131.3");
        assert_eq!(firefox().release_tag(&p.target), "FIREFOX_131_3_RELEASE");
        assert_eq!(p.previous, Some(vec![131, 2]));
    }

    #[test]
    fn bare_major_is_dot_zero() {
        let p = plan("131");
        assert_eq!(firefox().release_tag(&p.target), "FIREFOX_131_0_RELEASE");
        assert_eq!(p.previous, Some(vec![130, 0]));
    }

    #[test]
    fn zero_major_has_no_predecessor() {
        assert_eq!(plan("0.0").previous, None);
        assert_eq!(plan("0").previous, None);
    }

    #[test]
    fn extra_components_are_ignored() {
        let p = plan("143.0.1.7");
        assert_eq!(p.target, vec![143, 0, 1]);
    }

    #[test]
    fn non_numeric_components_are_invalid() {
        for version in ["131.0b5", "abc", "131.x", "", "1..2", "131.0.x"] {
            let err = VersionPlan::parse(version).unwrap_err();
            assert!(
                matches!(err, ResolveError::InvalidVersion { .. }),
                "{version:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn resolves_start_and_end() {
        let tags = ["FIREFOX_130_0_RELEASE", "FIREFOX_131_0_RELEASE"];
        let boundary = resolve("131.0", &tags, &firefox()).unwrap();
        assert_eq!(
            boundary,
            ReleaseBoundary {
                start: Some("FIREFOX_130_0_RELEASE".into()),
                end: "FIREFOX_131_0_RELEASE".into(),
            }
        );
        assert_eq!(
            boundary.revision_range(),
            "FIREFOX_130_0_RELEASE..FIREFOX_131_0_RELEASE"
        );
    }

    #[test]
    fn missing_start_is_fallback_not_error() {
        let tags = ["FIREFOX_131_0_RELEASE"];
        let boundary = resolve("131.0", &tags, &firefox()).unwrap();
        assert_eq!(boundary.start, None);
        assert_eq!(boundary.end, "FIREFOX_131_0_RELEASE");
        assert_eq!(boundary.revision_range(), "FIREFOX_131_0_RELEASE");
    }

    #[test]
    fn missing_end_is_unresolvable() {
        let tags = ["FIREFOX_130_0_RELEASE"];
        let err = resolve("131.0", &tags, &firefox()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnresolvableVersion {
                version: "131.0".into(),
                target: "FIREFOX_131_0_RELEASE".into(),
            }
        );
    }

    #[test]
    fn end_tag_matches_by_substring_in_given_order() {
        let tags = [
            "FIREFOX_131_0_RELEASE_vendor",
            "FIREFOX_131_0_RELEASE",
            "FIREFOX_130_0_RELEASE",
        ];
        let boundary = resolve("131.0", &tags, &firefox()).unwrap();
        assert_eq!(boundary.end, "FIREFOX_131_0_RELEASE_vendor");
    }

    #[test]
    fn start_tag_requires_exact_match() {
        let tags = ["FIREFOX_130_0_RELEASE_vendor", "FIREFOX_131_0_RELEASE"];
        let boundary = resolve("131.0", &tags, &firefox()).unwrap();
        assert_eq!(boundary.start, None);
    }

    #[test]
    fn point_release_starts_at_base_release() {
        let tags = [
            "FIREFOX_143_0_RELEASE",
            "FIREFOX_143_0_1_RELEASE",
            "FIREFOX_142_0_RELEASE",
        ];
        let boundary = resolve("143.0.1", &tags, &firefox()).unwrap();
        assert_eq!(boundary.start.as_deref(), Some("FIREFOX_143_0_RELEASE"));
        assert_eq!(boundary.end, "FIREFOX_143_0_1_RELEASE");
    }

    #[test]
    fn three_part_previous_tries_patch_then_base_form() {
        let scheme = firefox();
        let p = VersionPlan {
            target: vec![143, 0, 2],
            previous: Some(vec![143, 0, 1]),
        };
        assert_eq!(
            p.previous_patterns(&scheme),
            vec!["FIREFOX_143_0_1_RELEASE", "FIREFOX_143_0_RELEASE"]
        );
    }

    #[test]
    fn invalid_version_is_reported_before_tag_search() {
        let tags = ["FIREFOX_131_0_RELEASE"];
        let err = resolve("131.zero", &tags, &firefox()).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidVersion { .. }));
    }

    #[test]
    fn prefix_comes_from_scheme() {
        let tags = ["THUNDERBIRD_128_0_RELEASE", "THUNDERBIRD_129_0_RELEASE"];
        let boundary = resolve("129", &tags, &TagScheme::new("THUNDERBIRD")).unwrap();
        assert_eq!(boundary.start.as_deref(), Some("THUNDERBIRD_128_0_RELEASE"));
        assert_eq!(TagScheme::new("THUNDERBIRD").tag_glob(), "*THUNDERBIRD*RELEASE*");
    }
}
