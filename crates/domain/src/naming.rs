//! Project naming and tag-key normalization.

use crate::BuildRun;
use std::borrow::Cow;

/// Fallback used when a build has no usable project path.
pub const UNKNOWN_PROJECT: &str = "unknown_project";

/// Derives the logical project name for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectNameRenderer {
    prefix: Option<String>,
    custom_name: Option<String>,
}

impl ProjectNameRenderer {
    /// Blank values are treated as absent.
    pub fn new(prefix: Option<&str>, custom_name: Option<&str>) -> Self {
        Self {
            prefix: non_blank(prefix),
            custom_name: non_blank(custom_name),
        }
    }

    /// Configured prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Render the project name for a run.
    ///
    /// A custom name is used verbatim; otherwise path separators and
    /// whitespace in the run's project path become `_`. The prefix, when set,
    /// is joined with `_`.
    #[must_use]
    pub fn render(&self, run: &BuildRun) -> String {
        let base = self
            .custom_name
            .clone()
            .unwrap_or_else(|| normalize_project_path(&run.project_path));
        self.with_prefix(&base)
    }

    /// Apply the configured prefix to an arbitrary series name.
    #[must_use]
    pub fn with_prefix(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_owned(),
        }
    }
}

fn normalize_project_path(project_path: &str) -> String {
    let trimmed = project_path.trim().trim_matches(|c| c == '/' || c == '\\');
    if trimmed.is_empty() {
        return UNKNOWN_PROJECT.to_owned();
    }
    trimmed
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Normalize a tag key: when enabled, every `-` becomes `_`.
///
/// Only tag keys go through here; field keys and all values are written
/// as given.
pub fn sanitize_tag_key(key: &str, enabled: bool) -> Cow<'_, str> {
    if enabled && key.contains('-') {
        Cow::Owned(key.replace('-', "_"))
    } else {
        Cow::Borrowed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn custom_name_is_used_verbatim_with_prefix() {
        let renderer = ProjectNameRenderer::new(Some("pre"), Some("custom"));
        assert_eq!(renderer.render(&BuildRun::new("folder/sub/job", 1)), "pre_custom");
    }

    #[test]
    fn project_path_separators_are_flattened() {
        let renderer = ProjectNameRenderer::new(None, None);
        let rendered = renderer.render(&BuildRun::new("folder/sub/job", 1));
        assert_eq!(rendered, "folder_sub_job");
        assert!(!rendered.contains('/'));
    }

    #[test]
    fn blank_options_are_ignored() {
        let renderer = ProjectNameRenderer::new(Some("  "), Some(""));
        assert_eq!(renderer.prefix(), None);
        assert_eq!(renderer.render(&BuildRun::new("job", 1)), "job");
    }

    #[test]
    fn missing_project_path_falls_back() {
        let renderer = ProjectNameRenderer::new(Some("ci"), None);
        assert_eq!(renderer.render(&BuildRun::new(" / ", 1)), "ci_unknown_project");
    }

    #[test]
    fn sanitizer_only_rewrites_when_enabled() {
        assert_eq!(sanitize_tag_key("my-custom-tag", true), "my_custom_tag");
        assert_eq!(sanitize_tag_key("my-custom-tag", false), "my-custom-tag");
        assert!(matches!(sanitize_tag_key("plain", true), Cow::Borrowed(_)));
    }

    proptest! {
        #[test]
        fn sanitizer_is_idempotent(key in "[a-z_-]{0,24}") {
            let once = sanitize_tag_key(&key, true).into_owned();
            let twice = sanitize_tag_key(&once, true).into_owned();
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains('-'));
        }

        #[test]
        fn rendered_names_never_contain_slashes(path in "[a-z/ ]{0,32}") {
            let rendered = ProjectNameRenderer::new(None, None).render(&BuildRun::new(path, 1));
            prop_assert!(!rendered.contains('/'));
            prop_assert!(!rendered.is_empty());
        }
    }
}
