//! Almar - search and replace for subject fields in Alma catalog records

use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use almar::{
    cli::{Cli, Commands},
    config::AppConfig,
    services::{
        email::{report_subject, ReportMailer},
        job::Job,
        snapshots::SnapshotStore,
        Services,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(&cli, &config);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Console logging, plus a log file unless this is a dry run
fn init_tracing(cli: &Cli, config: &AppConfig) -> Option<WorkerGuard> {
    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("almar={}", level).into());

    let (file_layer, guard) = if cli.dry_run {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::never(".", &config.logging.file);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(LevelFilter::INFO);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Running almar v{}", env!("CARGO_PKG_VERSION"));

    let options = cli.job_options(&config.vocabulary.marc_code)?;
    let env = config.environment(cli.env.as_deref())?;
    tracing::debug!("Alma environment: {}", env.name);

    let services = Services::new(&config, env, !cli.non_interactive);
    let dry_run = options.dry_run;
    let mut job = Job::new(services, options).await?;
    if let (Some(jobs_dir), false) = (&config.jobs_dir, dry_run) {
        let store = SnapshotStore::new(jobs_dir, job.started);
        tracing::debug!("Saving record snapshots to {}", store.dir().display());
        job = job.with_snapshots(store);
    }

    let result = job.start().await;

    if !dry_run {
        if let Some(jobs_dir) = &config.jobs_dir {
            if let Err(e) = SnapshotStore::new(jobs_dir, job.started).save_summary(&job.report) {
                tracing::warn!("Could not write job summary: {}", e);
            }
        }
        if let (Some(email), true) = (&config.email, job.report.records_changed > 0) {
            let subject = report_subject(
                command_name(&cli.command),
                &job_description(&job),
                job.report.records_changed,
            );
            if let Err(e) = ReportMailer::new(email.clone())
                .send_report(&subject, &job.report.render())
                .await
            {
                tracing::warn!("{}", e);
            }
        }
    }

    result?;
    tracing::info!("Job complete");
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Rename(_) => "rename",
        Commands::Delete(_) => "delete",
        Commands::Add(_) => "add",
        Commands::Interactive(_) => "interactive",
        Commands::List(_) => "list",
    }
}

/// e.g. `650 "Monstre" -> "Mønstre"`
fn job_description(job: &Job) -> String {
    let options = job.options();
    let quoted = |concepts: &[almar::models::Concept]| {
        concepts
            .iter()
            .map(|c| format!("\"{}\"", c.term))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let tag = options
        .sources
        .first()
        .map(|c| c.tag.to_string())
        .unwrap_or_default();
    if options.targets.is_empty() {
        format!("{} {}", tag, quoted(&options.sources))
    } else {
        format!("{} {} -> {}", tag, quoted(&options.sources), quoted(&options.targets))
    }
}
