use std::time::Duration;

use anyhow::Context;
use backon::{BackoffBuilder, ExponentialBuilder};
use clap::Parser;
use tokio::net::TcpStream;
use tracing::{error, info, warn};

use cot_mta::protocols::client::{AliceClient, ProtocolStats};
use cot_mta::protocols::config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
use cot_mta::protocols::framing::DEFAULT_MAX_FRAME_LENGTH;
use cot_mta::protocols::ProtocolError;
use cot_mta::utilities::rng;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs Alice's side of the MTA protocol against a remote peer.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[arg(long, env("MTA_HOST"), default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, env("MTA_PORT"), default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Alice's multiplicative share. A random one in 1..=1000000 is used
    /// when it is missing or zero.
    #[arg(long, env("MTA_SHARE"))]
    share: Option<u32>,
    /// Total number of attempts.
    #[arg(long, env("MTA_MAX_RETRIES"), default_value_t = 3)]
    max_retries: usize,
    /// Delay before the second attempt. It doubles after each failure.
    #[arg(long, env("MTA_RETRY_DELAY_MS"), default_value_t = 2000)]
    retry_delay_ms: u64,
    #[arg(long, env("MTA_MAX_FRAME_LENGTH"), default_value_t = DEFAULT_MAX_FRAME_LENGTH)]
    max_frame_length: usize,
    /// Attach the binary OT messages to the response frame.
    #[arg(long, env("MTA_ATTACH_OT_PAYLOAD"))]
    attach_ot_payload: bool,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            max_frame_length: self.max_frame_length,
            attach_ot_payload: self.attach_ot_payload,
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => {
            if let Err(e) = result {
                error!("Error: {e:#}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, closing the connection");
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.client_config();
    let x_share = match cli.share {
        Some(share) if share > 0 => share,
        _ => rng::random_small_share(),
    };

    info!(
        address = %config.address(),
        x_share,
        max_retries = cli.max_retries,
        retry_delay_ms = cli.retry_delay_ms,
        "starting MTA client"
    );

    probe(&config).await?;

    let stats = run_with_retries(&config, x_share, cli.max_retries, cli.retry_delay_ms).await?;
    println!(
        "{}",
        serde_json::to_string(&stats).context("failed to serialize the run summary")?
    );

    Ok(())
}

// Fails early when nothing listens on the configured address.
async fn probe(config: &ClientConfig) -> anyhow::Result<()> {
    let address = config.address();
    match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&address)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e).with_context(|| format!("cannot reach the peer at {address}")),
        Err(_) => anyhow::bail!("connecting to {address} timed out after {PROBE_TIMEOUT:?}"),
    }
}

async fn run_with_retries(
    config: &ClientConfig,
    x_share: u32,
    max_retries: usize,
    retry_delay_ms: u64,
) -> anyhow::Result<ProtocolStats> {
    let mut backoff = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(retry_delay_ms))
        .with_factor(2.0)
        .with_max_times(max_retries.saturating_sub(1))
        .build();

    let mut attempt = 1;
    loop {
        match run_once(config, x_share).await {
            Ok(stats) => return Ok(stats),
            Err(err) => match backoff.next() {
                Some(delay) => {
                    warn!(attempt, %err, ?delay, "MTA run failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(err)
                        .with_context(|| format!("MTA run failed after {attempt} attempt(s)"));
                }
            },
        }
    }
}

// Each attempt uses a new connection and a new batch.
async fn run_once(config: &ClientConfig, x_share: u32) -> Result<ProtocolStats, ProtocolError> {
    let mut client = AliceClient::connect(config).await?;
    client.start_run(x_share).await?;

    let stats = client.stats();
    if let Err(err) = client.close().await {
        warn!(%err, "failed to close the connection");
    }

    Ok(stats)
}
