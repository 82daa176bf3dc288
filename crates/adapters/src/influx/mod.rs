//! InfluxDB 1.x HTTP store adapter.
//!
//! One `POST /write` per batch, line protocol body, basic auth when the
//! target has credentials.

pub mod error;
pub mod line_protocol;

use crate::influx::error::InfluxWriteError;
use crate::influx::line_protocol::encode_points;
use build_metrics_ports::{
    BoxFuture, Credentials, TargetEndpoint, TimeSeriesConnection, TimeSeriesStorePort, WriteBatch,
};
use build_metrics_shared::{ErrorEnvelope, RequestContext, Result};
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

/// HTTP settings shared by every connection the store opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxStoreConfig {
    /// Request timeout in milliseconds; `None` keeps the client default (no timeout).
    pub timeout_ms: Option<u64>,
    /// `User-Agent` header value.
    pub user_agent: Box<str>,
}

impl Default for InfluxStoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            user_agent: concat!("build-metrics/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Store factory handing out one HTTP connection per target.
#[derive(Debug, Clone, Default)]
pub struct InfluxStore {
    config: InfluxStoreConfig,
}

impl InfluxStore {
    /// Create a store with the given HTTP settings.
    #[must_use]
    pub const fn new(config: InfluxStoreConfig) -> Self {
        Self { config }
    }
}

impl TimeSeriesStorePort for InfluxStore {
    fn connect(&self, endpoint: &TargetEndpoint) -> Result<Box<dyn TimeSeriesConnection>> {
        let write_url = to_write_url(&endpoint.url)?;
        let mut builder = reqwest::Client::builder().user_agent(self.config.user_agent.as_ref());
        if let Some(timeout_ms) = self.config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|error| InfluxWriteError::ClientInit {
                message: error.to_string(),
            })?;

        Ok(Box::new(InfluxConnection {
            client,
            write_url,
            credentials: endpoint.credentials.clone(),
        }))
    }
}

/// Connection to one InfluxDB server.
pub struct InfluxConnection {
    client: reqwest::Client,
    write_url: Url,
    credentials: Option<Credentials>,
}

impl InfluxConnection {
    fn request_url(&self, batch: &WriteBatch) -> Url {
        let mut url = self.write_url.clone();
        url.query_pairs_mut()
            .append_pair("db", &batch.database)
            .append_pair("rp", &batch.retention_policy)
            .append_pair("precision", batch.precision.as_query_value())
            .append_pair("consistency", batch.consistency.as_str());
        url
    }

    async fn send(&self, batch: &WriteBatch) -> Result<(), InfluxWriteError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = encode_points(&batch.points)?;

        let mut request = self
            .client
            .post(self.request_url(batch))
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .body(body);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(
                credentials.username.as_ref(),
                Some(credentials.password.expose()),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|error| InfluxWriteError::from_transport(&error))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let payload = response.text().await.unwrap_or_default();
        Err(InfluxWriteError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&payload),
        })
    }
}

impl TimeSeriesConnection for InfluxConnection {
    fn write<'a>(
        &'a self,
        ctx: &'a RequestContext,
        batch: &'a WriteBatch,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.send(batch).await.map_err(|error| {
                ErrorEnvelope::from(error)
                    .with_metadata("database", batch.database.to_string())
                    .with_metadata("correlation_id", ctx.correlation_id().as_str())
            })
        })
    }
}

#[derive(Debug, Deserialize)]
struct InfluxErrorBody {
    error: String,
}

fn rejection_message(payload: &str) -> String {
    serde_json::from_str::<InfluxErrorBody>(payload).map_or_else(
        |_| {
            let trimmed = payload.trim();
            if trimmed.is_empty() {
                "empty response body".to_owned()
            } else {
                trimmed.chars().take(512).collect()
            }
        },
        |body| body.error,
    )
}

fn to_write_url(base: &str) -> Result<Url, InfluxWriteError> {
    let invalid = |reason: &str| InfluxWriteError::InvalidUrl {
        url: strip_credentials(base),
        reason: reason.to_owned(),
    };
    let mut url = Url::parse(base.trim()).map_err(|error| invalid(&error.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| invalid("url cannot be a base"))?
        .pop_if_empty()
        .push("write");
    Ok(url)
}

fn strip_credentials(raw: &str) -> String {
    Url::parse(raw).map_or_else(
        |_| "[invalid url]".to_owned(),
        |mut url| {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        },
    )
}
