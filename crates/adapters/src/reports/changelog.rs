//! Generator summarising the git changes between two revisions.

use build_metrics_ports::{Availability, GeneratorContext, Point, PointGenerator};
use build_metrics_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result, ResultExt};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

/// Measurement written by the changelog generator.
pub const CHANGELOG_MEASUREMENT: &str = "changelog_data";

const RECORD_SEPARATOR: char = '\u{1e}';
const UNIT_SEPARATOR: char = '\u{1f}';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%an%x1f%s";

/// Runs `git log` over a revision range and emits one `changelog_data` point.
#[derive(Debug, Clone)]
pub struct GitChangeLogGenerator {
    git_binary: String,
    repository: PathBuf,
    range: String,
}

impl GitChangeLogGenerator {
    /// Create a generator for `repository` over `range` (e.g. `HEAD~1..HEAD`).
    pub fn new(repository: impl Into<PathBuf>, range: impl Into<String>) -> Self {
        Self {
            git_binary: "git".to_owned(),
            repository: repository.into(),
            range: range.into(),
        }
    }

    /// Use a different git executable.
    #[must_use]
    pub fn with_git_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    // The range always follows `--end-of-options`.
    const fn count_args(&self) -> [&str; 4] {
        ["rev-list", "--count", "--end-of-options", self.range.as_str()]
    }

    const fn log_args(&self) -> [&str; 5] {
        [
            "log",
            LOG_FORMAT,
            "--name-only",
            "--end-of-options",
            self.range.as_str(),
        ]
    }

    fn git(&self, args: &[&str]) -> Result<String, GitCommandError> {
        let output = Command::new(&self.git_binary)
            .arg("-C")
            .arg(&self.repository)
            .args(args)
            .output()
            .map_err(|error| GitCommandError {
                kind: error.kind(),
                message: format!("failed to run {}: {error}", self.git_binary),
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(GitCommandError {
            kind: ErrorKind::Other,
            message: format!("git {} failed: {}", args.join(" "), stderr.trim()),
        })
    }
}

impl PointGenerator for GitChangeLogGenerator {
    fn name(&self) -> &str {
        "git_changelog"
    }

    fn availability(&self) -> Availability {
        match self.git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(stdout) if stdout.trim() == "true" => Availability::Available,
            Ok(_) => Availability::unavailable(format!(
                "{} is not a git work tree",
                self.repository.display()
            )),
            Err(error) if error.kind == ErrorKind::NotFound => {
                Availability::unavailable(format!("{} is not installed", self.git_binary))
            },
            Err(error) => Availability::unavailable(error.message),
        }
    }

    fn has_data(&self, _ctx: &GeneratorContext) -> bool {
        self.git(&self.count_args())
            .ok()
            .and_then(|stdout| stdout.trim().parse::<u64>().ok())
            .is_some_and(|count| count > 0)
    }

    fn generate(&self, ctx: &GeneratorContext) -> Result<Vec<Point>> {
        let stdout = self
            .git(&self.log_args())
            .map_err(ErrorEnvelope::from)
            .with_metadata("repository", self.repository.display().to_string())
            .with_metadata("range", self.range.clone())?;

        let summary = ChangeSummary::parse(&stdout);
        if summary.commit_count == 0 {
            return Ok(Vec::new());
        }

        let point = ctx
            .identity_point(CHANGELOG_MEASUREMENT)
            .field("commit_count", summary.commit_count)
            .field("commit_messages", summary.messages.join("; "))
            .field("culprits", join(&summary.culprits))
            .field("affected_paths", join(&summary.affected_paths))
            .build()?;
        Ok(vec![point])
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Commits, authors and paths found in one `git log` listing.
#[derive(Debug, Default, PartialEq, Eq)]
struct ChangeSummary {
    commit_count: i64,
    messages: Vec<String>,
    culprits: BTreeSet<String>,
    affected_paths: BTreeSet<String>,
}

impl ChangeSummary {
    fn parse(stdout: &str) -> Self {
        let mut summary = Self::default();
        for record in stdout.split(RECORD_SEPARATOR) {
            let mut lines = record.lines();
            let Some(header) = lines.next() else {
                continue;
            };
            let mut parts = header.splitn(3, UNIT_SEPARATOR);
            let (Some(hash), Some(author), subject) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            if hash.trim().is_empty() {
                continue;
            }

            summary.commit_count += 1;
            summary
                .messages
                .push(subject.unwrap_or_default().trim().to_owned());
            if !author.trim().is_empty() {
                summary.culprits.insert(author.trim().to_owned());
            }
            summary.affected_paths.extend(
                lines
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned),
            );
        }
        summary
    }
}

#[derive(Debug)]
struct GitCommandError {
    kind: ErrorKind,
    message: String,
}

impl From<GitCommandError> for ErrorEnvelope {
    fn from(error: GitCommandError) -> Self {
        Self::unexpected(
            ErrorCode::new("report", "git_failed"),
            error.message,
            ErrorClass::NonRetriable,
        )
    }
}
