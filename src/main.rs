use anyhow::Result;
use clap::{Parser, Subcommand};
use medpredict_lib::commands;
use medpredict_lib::config::DEFAULT_BIND;
use medpredict_lib::types::EquipmentInfo;
use medpredict_lib::{AppConfig, InferenceContext};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "medpredict", version, about = "Predictive maintenance from equipment logs and technical manuals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the upload form over HTTP.
    Serve {
        #[arg(long, env = "MEDPREDICT_BIND", default_value = DEFAULT_BIND)]
        bind: String,
    },
    /// Annotate one log file and write the result workbook.
    Annotate {
        #[arg(long)]
        equipment: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        model: String,
        /// Equipment log spreadsheet (.xlsx)
        #[arg(long)]
        logs: PathBuf,
        /// Technical manual (.pdf, .docx or .txt)
        #[arg(long)]
        manual: PathBuf,
        /// Output path; defaults to medpredict_results.xlsx in Downloads
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Open the written workbook with the system viewer
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    info!("Starting MedPredict {}", env!("CARGO_PKG_VERSION"));
    let ctx = match InferenceContext::load(&config.model_path, &config.scaler_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    match cli.command {
        Command::Serve { bind } => medpredict_lib::run(ctx, config, &bind).await,
        Command::Annotate {
            equipment,
            company,
            model,
            logs,
            manual,
            output,
            open,
        } => {
            let equipment = EquipmentInfo {
                equipment_name: equipment,
                company,
                model,
            };
            let result = tokio::task::spawn_blocking(move || {
                let (outcome, path) =
                    commands::annotate_files(&ctx, &config, equipment, &logs, &manual, output.as_deref())?;
                for notice in &outcome.notices {
                    warn!("{}", notice);
                }
                println!("Results written to {}", path.display());
                if let Some(alert) = &outcome.alert {
                    eprintln!("WARNING: {}", alert.message);
                    alert.wait();
                    // Terminal bell stands in for the alert sound.
                    print!("\x07");
                    let _ = std::io::stdout().flush();
                }
                if open {
                    if let Err(e) = opener::open(&path) {
                        warn!("Could not open {}: {}", path.display(), e);
                    }
                }
                Ok::<_, medpredict_lib::StageError>(())
            })
            .await?;
            if let Err(e) = result {
                error!("{}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
