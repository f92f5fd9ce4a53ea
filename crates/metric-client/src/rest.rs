//! Synchronous HTTP fallback: one request per batch, no retry.

use crate::auth::TokenIssuer;
use crate::config::MetricClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::request::Request;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Header carrying the trusted user's certificate subject DN.
pub const SUBJECT_DN_HEADER: &str = "X-SSL-clientcert-subject";
/// Header carrying the trusted user's certificate issuer DN.
pub const ISSUER_DN_HEADER: &str = "X-SSL-clientcert-issuer";

/// Posts metric updates straight to the update endpoint.
pub struct RestSubmitter {
    client: Client,
    config: Arc<MetricClientConfig>,
    token_issuer: Option<Arc<dyn TokenIssuer>>,
}

impl RestSubmitter {
    pub fn new(
        config: Arc<MetricClientConfig>,
        token_issuer: Option<Arc<dyn TokenIssuer>>,
    ) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            config,
            token_issuer,
        })
    }

    /// Submit the whole request in one call.
    ///
    /// A single metric goes to the single-update path as an object, more
    /// than one to the list path as an array. Any non-2xx status is an
    /// error for the caller.
    pub async fn submit(&self, request: &Request) -> ClientResult<()> {
        let metric_type = request.validate()?;
        if request.user().is_none() && request.trusted_user().is_none() {
            return Err(ClientError::MissingIdentity);
        }

        let metrics = request.metrics();
        let single = metrics.len() == 1;
        let mut url = self.config.endpoint_url(single)?;
        url.query_pairs_mut()
            .append_pair("metricType", metric_type.as_str());

        let mut builder = self.client.post(url.clone());
        builder = if single {
            builder.json(&metrics[0])
        } else {
            builder.json(metrics)
        };

        if let Some(user) = request.user() {
            let issuer = self
                .token_issuer
                .as_ref()
                .ok_or(ClientError::MissingTokenIssuer)?;
            builder = builder.bearer_auth(issuer.issue_token(user)?);
        }
        if let Some(trusted) = request.trusted_user() {
            builder = builder
                .header(SUBJECT_DN_HEADER, &trusted.subject_dn)
                .header(ISSUER_DN_HEADER, &trusted.issuer_dn);
        }

        debug!(url = %url, metrics = metrics.len(), "Submitting metric update");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Rest {
                status: status.as_u16(),
                message,
            });
        }

        debug!(status = status.as_u16(), "Metric update accepted");
        Ok(())
    }
}
