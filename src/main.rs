use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use parchment_calendar::{
    render_html, CalendarContext, CalendarView, DisplayedMonth, EventSource, GoogleEventSource,
    Surface, ViewMode,
};
use parchment_core::{AppError, Config, ConfigError};

#[derive(Parser)]
#[command(name = "parchment")]
#[command(about = "Render the lodge's Google Calendar as month, list or upcoming views")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write the rendered HTML here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Month grid (defaults to the current month)
    Month {
        #[arg(long)]
        year: Option<i32>,

        /// 1-12
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Upcoming events as a list
    List,
    /// Compact upcoming-events panel for the dashboard
    Upcoming,
    /// Revoke the stored credential
    Disconnect,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = parchment_core::init() {
        eprintln!("{:#}", e);
    }
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let (config, validation) =
        Config::load_validated().map_err(|e| ConfigError::Invalid(format!("{:#}", e)))?;
    for warning in &validation.warnings {
        tracing::warn!("Config: {}", warning);
    }

    let source = GoogleEventSource::from_config(&config)?;
    if let Commands::Disconnect = cli.command {
        return disconnect(&source).await;
    }

    let readiness = source.readiness();
    let ctx = CalendarContext::new(source, config.calendar.clone()).with_readiness(readiness);
    let mut view = CalendarView::new(ctx);

    // Pick the view while signed out so connecting fetches it once
    if let Commands::List = cli.command {
        view.switch_view(ViewMode::List).await;
    }
    if let Commands::Month { year, month } = cli.command {
        let current = view.displayed_month();
        let year = year.unwrap_or(current.year());
        let month0 = month.map_or(current.month0(), |m| m - 1);
        let target = DisplayedMonth::new(year, month0).ok_or_else(|| {
            ConfigError::InvalidArgument(format!("{}-{:02} is out of range", year, month0 + 1))
        })?;
        view.show_month(target).await;
    }

    if let Err(e) = view.connect().await {
        tracing::warn!("Continuing signed out: {}", e.user_message());
    }

    let surface = match cli.command {
        Commands::Month { .. } | Commands::List | Commands::Disconnect => view.surface(),
        Commands::Upcoming => {
            let max = view.context().settings.upcoming_max_results;
            let body = view.render_upcoming(max).await;
            Surface {
                body,
                ..view.surface()
            }
        }
    };
    let html = render_html(&surface).context("Failed to render calendar")?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, html)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => print!("{}", html),
    }

    Ok(())
}

/// Revoke whatever token is stored, without starting a sign-in.
async fn disconnect(source: &GoogleEventSource) -> Result<(), AppError> {
    let Some(credential) = source.stored_credential() else {
        tracing::info!("No stored Google credential; nothing to disconnect");
        return Ok(());
    };
    source.revoke(&credential).await?;
    tracing::info!("Disconnected from Google Calendar");
    Ok(())
}
