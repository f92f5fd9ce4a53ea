//! metric-client binary entry point.
//!
//! Usage: metric-client --metrics <file.json> --metric-type complete [--config <file>]
//!
//! The metrics file holds one JSON object or an array of them.

use anyhow::{Context, Result};
use clap::Parser;
use metric_client::{
    cancellation, MetricClient, MetricClientConfig, MetricType, Request, StaticTokenIssuer,
    TransportType, TrustedUser, User,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Submit query metric updates.
#[derive(Parser, Debug)]
#[command(name = "metric-client")]
#[command(about = "Submit query metric updates with confirmed delivery")]
struct Args {
    /// JSON file with one metric object or an array of them.
    #[arg(long)]
    metrics: PathBuf,

    /// Metric type (complete, distributed).
    #[arg(long, default_value = "complete")]
    metric_type: String,

    /// JSON configuration file.
    #[arg(long, env = "METRIC_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Transport override (message, http, https).
    #[arg(long)]
    transport: Option<String>,

    /// User to authenticate as on the HTTP transports.
    #[arg(long)]
    user: Option<String>,

    /// Comma-separated users the request is made on behalf of.
    #[arg(long, value_delimiter = ',')]
    proxied_users: Vec<String>,

    /// Bearer token for --user.
    #[arg(long, env = "METRIC_CLIENT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Trusted user certificate subject DN.
    #[arg(long, requires = "issuer_dn")]
    subject_dn: Option<String>,

    /// Trusted user certificate issuer DN.
    #[arg(long, requires = "subject_dn")]
    issuer_dn: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines instead of the compact format.
    #[arg(long)]
    json_logs: bool,
}

fn read_metrics(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading metrics file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing metrics file {}", path.display()))?;

    Ok(match value {
        serde_json::Value::Array(metrics) => metrics,
        metric => vec![metric],
    })
}

fn build_request(args: &Args) -> Result<Request> {
    let metric_type: MetricType = args.metric_type.parse().map_err(anyhow::Error::msg)?;
    let mut builder = Request::builder()
        .metrics(read_metrics(&args.metrics)?)
        .metric_type(metric_type);

    if let Some(name) = &args.user {
        builder = builder.user(User::new(name).with_proxied_users(args.proxied_users.clone()));
    }
    if let (Some(subject), Some(issuer)) = (&args.subject_dn, &args.issuer_dn) {
        builder = builder.trusted_user(TrustedUser::new(subject, issuer));
    }

    Ok(builder.build())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    observability::init_with_config(observability::LogConfig {
        service_name: "metric-client".into(),
        default_level: args.log_level.clone(),
        format: if args.json_logs {
            observability::LogFormat::Json
        } else {
            observability::LogFormat::Compact
        },
        ..Default::default()
    });

    let mut config = MetricClientConfig::load(args.config.as_deref())?;
    if let Some(transport) = &args.transport {
        config.transport = transport
            .parse::<TransportType>()
            .map_err(anyhow::Error::msg)?;
    }

    info!(
        transport = %config.transport,
        host = %config.host,
        port = config.port,
        confirm_ack_enabled = config.confirm_ack_enabled,
        max_attempts = config.retry.max_attempts,
        "Configuration loaded"
    );

    let request = build_request(&args)?;

    let mut client = match config.transport {
        TransportType::Message => MetricClient::connect(config).await?,
        TransportType::Http | TransportType::Https => MetricClient::new(config)?,
    };
    if let Some(token) = &args.token {
        client = client.with_token_issuer(Arc::new(StaticTokenIssuer::new(token)))?;
    }

    let (cancel, signal) = cancellation();
    let result = {
        let submit = client.submit_cancellable(request, signal);
        tokio::pin!(submit);

        tokio::select! {
            result = &mut submit => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("Received shutdown signal, cancelling delivery...");
                cancel.cancel();
                (&mut submit).await
            }
        }
    };

    client.shutdown().await;

    match result {
        Ok(()) => {
            info!("Metric update delivered");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Metric update failed");
            Err(e.into())
        }
    }
}
