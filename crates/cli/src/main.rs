use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::MachinesClient;
use machinery_core::{Dialect, PublishRequest, SourceInputs};
use publisher::{PublishError, PublishOrchestrator};
use sandbox::ProcessValidator;

mod config;

#[derive(Parser)]
#[command(name = "machinery")]
#[command(about = "Client for the machinery hosted state-machine backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a machine definition and publish it as a new version.
    Publish {
        /// Machine to publish into.
        #[arg(long)]
        machine: String,

        /// Pre-built script to ship as-is.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Node-dialect entrypoint to bundle.
        #[arg(long)]
        node: Option<PathBuf>,

        /// Deno-dialect entrypoint to bundle.
        #[arg(long)]
        deno: Option<PathBuf>,

        /// Human-readable reference attached to the new version.
        #[arg(long, default_value = "latest")]
        version_ref: String,

        /// Make the new version the machine's current version.
        #[arg(long)]
        make_current: bool,

        /// Skip the sandboxed validation pass.
        #[arg(long)]
        skip_validation: bool,

        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        token: Option<String>,
    },
}

enum CliError {
    Config(anyhow::Error),
    Publish(PublishError),
    Interrupted,
}

impl CliError {
    fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Publish(e) => e.category(),
            Self::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e:#}"),
            Self::Publish(e) => write!(f, "{e}"),
            Self::Interrupted => write!(f, "publish interrupted; partial work was cleaned up"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Publish {
            machine,
            script,
            node,
            deno,
            version_ref,
            make_current,
            skip_validation,
            api_url,
            token,
        } => {
            publish(
                machine,
                SourceInputs {
                    script,
                    node_entry: node,
                    deno_entry: deno,
                },
                version_ref,
                make_current,
                skip_validation,
                api_url,
                token,
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error ({}): {}", e.category(), e);
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn publish(
    machine: String,
    inputs: SourceInputs,
    version_ref: String,
    make_current: bool,
    skip_validation: bool,
    api_url: Option<String>,
    token: Option<String>,
) -> Result<(), CliError> {
    let settings = config::resolve(api_url, token).map_err(CliError::Config)?;
    tracing::debug!(api_url = %settings.api_url, "resolved configuration");

    let mut client = MachinesClient::new(settings.api_url);
    if let Some(token) = settings.token {
        client = client.with_token(token);
    }

    // Raw scripts default to the node runtime for validation.
    let dialect = if inputs.deno_entry.is_some() {
        Some(Dialect::Deno)
    } else if inputs.node_entry.is_some() {
        Some(Dialect::Node)
    } else {
        None
    };
    let validator = Arc::new(ProcessValidator::for_dialect(dialect));

    let orchestrator =
        PublishOrchestrator::new(Arc::new(client), validator).skip_validation(skip_validation);

    let mut request = PublishRequest::new(machine, version_ref);
    if make_current {
        request = request.make_current();
    }

    // Dropping the in-flight publish on Ctrl+C tears down its temporary
    // workspace through the guard's Drop.
    tokio::select! {
        result = orchestrator.publish(inputs, request) => {
            let version = result.map_err(CliError::Publish)?;
            println!(
                "published {} version {} ({})",
                version.machine, version.version_reference, version.machine_version_id
            );
            if version.current {
                println!("{} now serves this version", version.machine);
            }
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "machinery=warn,publisher=warn,bundler=warn,sandbox=warn,backend=warn".into()
            }),
        )
        .init();
}
