//! Batch publisher: one write per target, per-target failure policy.

use crate::diagnostics::{Diagnostics, log_fields};
use build_metrics_domain::{ConsistencyLevel, Point, Precision};
use build_metrics_ports::{LogFields, LogLevel, TargetEndpoint, TimeSeriesStorePort, WriteBatch};
use build_metrics_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One configured destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    /// Label used in logs and reports.
    pub label: Box<str>,
    /// Connection settings.
    pub endpoint: TargetEndpoint,
    /// Database name.
    pub database: Box<str>,
    /// Retention policy name.
    pub retention_policy: Box<str>,
    /// Fail the publish when this target cannot be written.
    pub expose_exceptions: bool,
}

/// Result of writing to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The batch was accepted.
    Written {
        /// Points in the batch.
        points: usize,
    },
    /// Connect or write failed.
    Failed {
        /// The failure.
        error: ErrorEnvelope,
        /// Whether the failure aborts the publish.
        propagate: bool,
    },
}

/// Outcome for one attempted target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Target label.
    pub target: Box<str>,
    /// What happened.
    pub outcome: TargetOutcome,
}

/// Outcomes for every attempted target, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// One entry per attempted target.
    pub targets: Vec<TargetReport>,
}

impl PublishReport {
    /// Targets that accepted the batch.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|report| matches!(report.outcome, TargetOutcome::Written { .. }))
            .count()
    }

    /// Targets whose write failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.targets.len() - self.written_count()
    }
}

/// Dependencies of the batch publisher.
#[derive(Clone)]
pub struct PublishPointsDeps {
    /// Store adapter.
    pub store: Arc<dyn TimeSeriesStorePort>,
    /// Logger and console mirror.
    pub diagnostics: Diagnostics,
}

impl fmt::Debug for PublishPointsDeps {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PublishPointsDeps")
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

/// Write the same batch to every target, in order.
///
/// A failing target with `expose_exceptions` stops the run with
/// `publish:target_write_failed`; other failures are logged and recorded.
pub async fn publish_points(
    ctx: &RequestContext,
    deps: &PublishPointsDeps,
    points: Arc<[Point]>,
    precision: Precision,
    targets: &[PublishTarget],
) -> Result<PublishReport> {
    let mut report = PublishReport::default();

    for target in targets {
        let label = &*target.label;
        deps.diagnostics.info(
            "publish.target.start",
            &format!("Publishing {} points to {label}", points.len()),
            target_fields(target, points.len()),
        );

        let batch = WriteBatch {
            database: target.database.clone(),
            retention_policy: target.retention_policy.clone(),
            consistency: ConsistencyLevel::Any,
            precision,
            points: Arc::clone(&points),
        };

        let outcome = match write_target(ctx, deps.store.as_ref(), target, &batch).await {
            Ok(()) => TargetOutcome::Written {
                points: batch.len(),
            },
            Err(error) => TargetOutcome::Failed {
                error,
                propagate: target.expose_exceptions,
            },
        };

        match &outcome {
            TargetOutcome::Written { points } => deps.diagnostics.info(
                "publish.target.written",
                &format!("Published {points} points to {label}"),
                target_fields(target, *points),
            ),
            TargetOutcome::Failed { error, propagate } => {
                let level = if *propagate {
                    LogLevel::Error
                } else {
                    LogLevel::Warn
                };
                deps.diagnostics.failure(
                    level,
                    "publish.target.failed",
                    &format!("Failed to publish to {label}"),
                    error,
                    target_fields(target, batch.len()),
                );
            },
        }

        if let TargetOutcome::Failed {
            error,
            propagate: true,
        } = outcome
        {
            return Err(error
                .wrap(
                    ErrorCode::new("publish", "target_write_failed"),
                    format!("failed to publish build metrics to {label}"),
                )
                .with_metadata("target", label));
        }

        report.targets.push(TargetReport {
            target: target.label.clone(),
            outcome,
        });
    }

    Ok(report)
}

async fn write_target(
    ctx: &RequestContext,
    store: &dyn TimeSeriesStorePort,
    target: &PublishTarget,
    batch: &WriteBatch,
) -> Result<()> {
    let connection = store.connect(&target.endpoint)?;
    connection.write(ctx, batch).await
}

fn target_fields(target: &PublishTarget, points: usize) -> LogFields {
    log_fields([
        ("target", Value::from(&*target.label)),
        ("database", Value::from(&*target.database)),
        ("retentionPolicy", Value::from(&*target.retention_policy)),
        ("points", Value::from(points)),
    ])
}
