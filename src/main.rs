use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail};
use echoprobe::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use echoprobe::{
    EchoForm, EchoRequester, HealthChecker, ProbeConfig, SubmitOutcome, TcpTransport,
    TerminalReporter,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Smoke-test the toy service /echo and /healthz endpoints", long_about = None)]
struct Cli {
    /// Base URL of the service
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message to /echo and print the response fields
    Echo {
        /// Message to send (words are joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Query /healthz and print the reported status
    Health,
    /// Read messages from stdin, one per line, and echo each
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("echoprobe=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ProbeConfig::builder()
        .base_url(cli.base_url)
        .timeout(Duration::from_millis(cli.timeout_ms))
        .build();

    match cli.command {
        Command::Echo { message } => {
            let requester = EchoRequester::new(config).wrap_err("Invalid echo configuration")?;
            let form = EchoForm::new(requester, TerminalReporter::new());
            match form.submit(&message.join(" ")).await {
                SubmitOutcome::Sent(_) => {}
                SubmitOutcome::Rejected => bail!("Refusing to send an empty message"),
                SubmitOutcome::Busy => bail!("A request is already in flight"),
                SubmitOutcome::Failed(e) => return Err(e).wrap_err("Echo request failed"),
            }
        }
        Command::Health => {
            let checker = HealthChecker::new(config).wrap_err("Invalid health check configuration")?;
            info!(url = %checker.url(), "Checking service health");
            let status = checker.check().await.wrap_err("Health check failed")?;
            println!("{status}");
        }
        Command::Interactive => run_interactive(config).await?,
    }

    Ok(())
}

/// One form submission per stdin line until EOF
async fn run_interactive(config: ProbeConfig) -> Result<()> {
    let requester = EchoRequester::new(config).wrap_err("Invalid echo configuration")?;
    let form: EchoForm<TcpTransport, TerminalReporter> = EchoForm::new(requester, TerminalReporter::new());
    info!("Interactive mode: type a message and press enter, Ctrl-D to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failures = 0usize;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.wrap_err("Failed to read from stdin")? else {
                    break;
                };
                if let SubmitOutcome::Failed(e) = form.submit(&line).await {
                    failures += 1;
                    error!(error = %e, failures, "Submission failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, leaving interactive mode");
                break;
            }
        }
    }

    info!(failures, "Interactive session finished");
    Ok(())
}
