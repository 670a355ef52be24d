mod cron_time_utils;
mod db_core;
mod email_client;
mod error;
mod report;
mod server_config;
#[cfg(test)]
mod tests;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use cron_time_utils::{daily_cron_expression, next_daily_run, parse_send_time, parse_timezone};
use lib_utils::envs;
use mimalloc::MiMalloc;
use report::{DailyReportMailer, ReportRunner, RunTrigger};
use server_config::ServerConfig;
use tokio::signal;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Arc::new(ServerConfig::load()?);
    tracing::info!("{}", cfg);

    let http_client = reqwest::Client::builder()
        .use_rustls_tls()
        .connect_timeout(Duration::from_secs(cfg.report.http_timeout_secs))
        .timeout(Duration::from_secs(cfg.report.http_timeout_secs))
        .build()?;

    let runner = ReportRunner::new(DailyReportMailer::new(cfg.clone(), http_client)?);
    let tz = parse_timezone(&cfg.report.timezone)?;
    let cron_time = daily_cron_expression(&cfg.report.send_time)?;

    let mut scheduler = JobScheduler::new().await?;

    if cfg.report.run_on_startup {
        let runner = runner.clone();
        // Run once at startup
        scheduler
            .add(Job::new_one_shot_async(
                Duration::from_secs(0),
                move |uuid, _l| {
                    let runner = runner.clone();
                    Box::pin(async move {
                        tracing::info!("Running startup report job {}", uuid);
                        runner.run_and_log(RunTrigger::Startup).await;
                    })
                },
            )?)
            .await?;
    }

    tracing::info!(
        "Adding daily report job at {} {} ({})",
        cfg.report.send_time,
        cfg.report.timezone,
        cron_time
    );
    {
        let runner = runner.clone();
        scheduler
            .add(Job::new_async_tz(
                cron_time.as_str(),
                tz,
                move |uuid, mut l: JobScheduler| {
                    let runner = runner.clone();
                    Box::pin(async move {
                        tracing::info!("Running daily report job {}", uuid);
                        runner.run_and_log(RunTrigger::Scheduled).await;

                        // Query the next execution time for this job
                        match l.next_tick_for_job(uuid).await {
                            Ok(Some(ts)) => {
                                tracing::info!("Next time for daily report job is {:?}", ts)
                            }
                            _ => tracing::warn!("Could not get next tick for daily report job"),
                        }
                    })
                },
            )?)
            .await?;
    }

    if let Some(next) = next_daily_run(parse_send_time(&cfg.report.send_time)?, tz, Utc::now()) {
        tracing::info!("First scheduled report at {}", next);
    }

    scheduler.set_shutdown_handler(Box::new(move || {
        Box::pin(async move {
            tracing::info!("Shutting down scheduler");
        })
    }));

    scheduler.start().await?;
    tracing::info!("Scheduler started");

    signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down");
    scheduler.shutdown().await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if envs::get_env_opt("LOG_FORMAT").as_deref() == Some("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
            .init();
    }
}
