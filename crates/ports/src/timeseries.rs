//! Time-series store boundary contract.

use crate::BoxFuture;
use build_metrics_domain::{ConsistencyLevel, Point, Precision};
use build_metrics_shared::{RequestContext, Result, SecretString};
use std::fmt;
use std::sync::Arc;

/// Username/password pair for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: Box<str>,
    /// Password (redacted in `Debug`).
    pub password: SecretString,
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEndpoint {
    /// Base URL of the store (e.g. `http://influx:8086`).
    pub url: Box<str>,
    /// Credentials; `None` connects anonymously.
    pub credentials: Option<Credentials>,
}

/// One write request: every collected point for one database.
#[derive(Clone, PartialEq)]
pub struct WriteBatch {
    /// Database name.
    pub database: Box<str>,
    /// Retention policy name.
    pub retention_policy: Box<str>,
    /// Requested consistency.
    pub consistency: ConsistencyLevel,
    /// Timestamp precision of every point.
    pub precision: Precision,
    /// Points, shared across targets.
    pub points: Arc<[Point]>,
}

impl WriteBatch {
    /// Number of points in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true when the batch has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WriteBatch")
            .field("database", &self.database)
            .field("retention_policy", &self.retention_policy)
            .field("consistency", &self.consistency)
            .field("precision", &self.precision)
            .field("points", &self.points.len())
            .finish()
    }
}

/// An open connection to one target.
pub trait TimeSeriesConnection: Send + Sync {
    /// Write the batch with a single request.
    fn write<'a>(&'a self, ctx: &'a RequestContext, batch: &'a WriteBatch)
    -> BoxFuture<'a, Result<()>>;
}

/// Factory for target connections.
pub trait TimeSeriesStorePort: Send + Sync {
    /// Open a connection; credentials are used when present.
    fn connect(&self, endpoint: &TargetEndpoint) -> Result<Box<dyn TimeSeriesConnection>>;
}
