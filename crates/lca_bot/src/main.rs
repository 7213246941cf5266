use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lca_bot::server::{self, DEFAULT_PRODUCT};
use lca_report::{Config, ModelChoice, ReportFormat, ReportPipeline, ReportRequest};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Generates life cycle assessment reports from inventory data.
///
/// Settings come from the environment (`OPENAI_API_KEY`, `LCA_MODEL`, `LCA_OUTPUT_DIR`, ...);
/// the flags below override them.
#[derive(Parser)]
#[command(author, version, about = "LCA report generator")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Language model used for narrative sections.
    #[arg(long, global = true)]
    model: Option<ModelChoice>,

    /// Root directory for run outputs.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Document format (`docx` or `pdf`).
    #[arg(long, global = true)]
    format: Option<ReportFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the report form over HTTP.
    Serve {
        #[arg(long, default_value_t = 8501)]
        port: u16,
    },

    /// Generate one report and print its path.
    Generate {
        #[arg(long, default_value = DEFAULT_PRODUCT)]
        product: String,

        /// Inventory CSV; a synthetic table is used when omitted or malformed.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lca_report=info,lca_bot=info,tower_http=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(overrides: Overrides) -> anyhow::Result<Config> {
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(model) = overrides.model {
        config = config.with_model(model);
    }
    if let Some(dir) = overrides.output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(format) = overrides.format {
        config = config.with_format(format);
    }
    if !config.has_credential() {
        tracing::warn!("OPENAI_API_KEY is not set; narrative sections will use fallback text");
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.overrides)?;

    match cli.command {
        Commands::Serve { port } => {
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(serve(config, port))
        }
        Commands::Generate { product, csv } => {
            let upload = match csv {
                Some(path) => Some(
                    std::fs::read(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let request = ReportRequest::new(product).with_upload(upload);
            let report = ReportPipeline::new(config).run(&request)?;
            println!("{}", report.path.display());
            Ok(())
        }
    }
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let app = server::create_router(config);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
