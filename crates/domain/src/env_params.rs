//! Environment-derived fields and tags.
//!
//! A spec is properties-style text:
//!
//! ```text
//! # comment
//! commit=$GIT_COMMIT
//! branch: ${BRANCH_NAME}
//! runner=linux
//! ```
//!
//! Values starting with `$` are looked up in the run environment when the
//! spec is resolved; unresolved references keep their literal text.

use build_metrics_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;

/// Parse failures for env-parameter specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParameterError {
    /// A non-comment line has no `=` or `:` separator.
    MissingSeparator {
        /// 1-based line number.
        line: usize,
    },
    /// A line has an empty key.
    EmptyKey {
        /// 1-based line number.
        line: usize,
    },
}

impl fmt::Display for EnvParameterError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator { line } => {
                write!(formatter, "line {line}: expected `key=value`")
            },
            Self::EmptyKey { line } => write!(formatter, "line {line}: key must be non-empty"),
        }
    }
}

impl std::error::Error for EnvParameterError {}

impl From<EnvParameterError> for ErrorEnvelope {
    fn from(error: EnvParameterError) -> Self {
        let line = match &error {
            EnvParameterError::MissingSeparator { line } | EnvParameterError::EmptyKey { line } => {
                *line
            },
        };
        Self::expected(
            ErrorCode::new("domain", "invalid_env_parameter"),
            error.to_string(),
        )
        .with_metadata("line", line.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParameterValue {
    Literal(String),
    Reference { name: String, raw: String },
}

/// One `key=value` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvParameter {
    key: String,
    value: ParameterValue,
}

impl EnvParameter {
    /// Parameter key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the referenced environment variable, if the value is a reference.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match &self.value {
            ParameterValue::Reference { name, .. } => Some(name),
            ParameterValue::Literal(_) => None,
        }
    }

    fn resolve(&self, lookup: &impl Fn(&str) -> Option<String>) -> String {
        match &self.value {
            ParameterValue::Literal(value) => value.clone(),
            ParameterValue::Reference { name, raw } => lookup(name).unwrap_or_else(|| raw.clone()),
        }
    }
}

/// Parsed env-parameter spec, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvParameterSpec {
    entries: Vec<EnvParameter>,
}

impl EnvParameterSpec {
    /// Parse properties-style text. Blank lines and `#`/`!` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, EnvParameterError> {
        let mut entries = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some(split_at) = line.find(['=', ':']) else {
                return Err(EnvParameterError::MissingSeparator { line: line_number });
            };
            let (key, rest) = line.split_at(split_at);
            let key = key.trim();
            if key.is_empty() {
                return Err(EnvParameterError::EmptyKey { line: line_number });
            }
            let value = rest.get(1..).unwrap_or_default().trim();
            entries.push(EnvParameter {
                key: key.to_owned(),
                value: parse_value(value),
            });
        }
        Ok(Self { entries })
    }

    /// Returns true when the spec has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[EnvParameter] {
        &self.entries
    }

    /// Resolve every entry against an environment lookup.
    ///
    /// Later duplicates win, matching properties-file semantics.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<(String, String)> {
        let mut resolved: Vec<(String, String)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let value = entry.resolve(&lookup);
            if let Some(existing) = resolved.iter_mut().find(|(key, _)| key == &entry.key) {
                existing.1 = value;
            } else {
                resolved.push((entry.key.clone(), value));
            }
        }
        resolved
    }
}

fn parse_value(value: &str) -> ParameterValue {
    let Some(reference) = value.strip_prefix('$') else {
        return ParameterValue::Literal(value.to_owned());
    };
    let name = reference
        .strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(reference)
        .trim();
    if name.is_empty() {
        return ParameterValue::Literal(value.to_owned());
    }
    ParameterValue::Reference {
        name: name.to_owned(),
        raw: value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::error::Error;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn parses_literals_references_and_comments() -> Result<(), Box<dyn Error>> {
        let spec = EnvParameterSpec::parse(concat!(
            "# leading comment\n\ncommit=$GIT_COMMIT\n",
            "! bang comment\nbranch: ${BRANCH}\nrunner = linux\n",
        ))?;

        let keys: Vec<&str> = spec.entries().iter().map(EnvParameter::key).collect();
        assert_eq!(keys, ["commit", "branch", "runner"]);
        assert_eq!(spec.entries().first().and_then(EnvParameter::reference), Some("GIT_COMMIT"));
        assert_eq!(spec.entries().get(1).and_then(EnvParameter::reference), Some("BRANCH"));
        Ok(())
    }

    #[test]
    fn resolves_against_lookup_and_keeps_unresolved_literal() -> Result<(), Box<dyn Error>> {
        let spec = EnvParameterSpec::parse("commit=$GIT_COMMIT\nmissing=$NOPE\nurl=http://x:1")?;
        let vars = env(&[("GIT_COMMIT", "abc123")]);
        let resolved = spec.resolve(|name| vars.get(name).cloned());

        assert_eq!(
            resolved,
            vec![
                ("commit".to_owned(), "abc123".to_owned()),
                ("missing".to_owned(), "$NOPE".to_owned()),
                ("url".to_owned(), "http://x:1".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn later_duplicates_win() -> Result<(), Box<dyn Error>> {
        let spec = EnvParameterSpec::parse("a=1\na=2")?;
        assert_eq!(spec.resolve(|_| None), vec![("a".to_owned(), "2".to_owned())]);
        Ok(())
    }

    #[test]
    fn rejects_lines_without_separator_or_key() {
        assert_eq!(
            EnvParameterSpec::parse("ok=1\nbroken"),
            Err(EnvParameterError::MissingSeparator { line: 2 })
        );
        assert_eq!(
            EnvParameterSpec::parse("=value"),
            Err(EnvParameterError::EmptyKey { line: 1 })
        );
    }

    #[test]
    fn lone_dollar_is_literal() -> Result<(), Box<dyn Error>> {
        let spec = EnvParameterSpec::parse("price=$")?;
        assert_eq!(spec.resolve(|_| Some("x".into())), vec![("price".into(), "$".into())]);
        Ok(())
    }
}
