use std::time::Duration;

use anyhow::{Context, Error};
use envconfig::Envconfig;
use mixpanel_migrator::{
    config::{Config, SinkKind},
    emit::{capture::CaptureQueue, IngestionQueue, NoOpQueue, StdoutQueue},
    error::{get_user_message, ToUserError, UserError},
    job::{Migration, MigrationSettings},
    lib_version,
    source::mixpanel::MixpanelExportSource,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

async fn build_queue(config: &Config) -> Result<Box<dyn IngestionQueue>, Error> {
    let queue: Box<dyn IngestionQueue> = match config.sink {
        SinkKind::Capture => {
            if config.posthog_project_key.is_empty() {
                return Err(UserError::new(
                    "POSTHOG_PROJECT_KEY must be set to the destination project's API key when SINK=capture",
                )
                .into());
            }
            info!("Sending events to capture at {}", config.posthog_endpoint);
            Box::new(
                CaptureQueue::new(
                    &config.posthog_project_key,
                    &config.posthog_endpoint,
                    config.capture_batch_size,
                )
                .await,
            )
        }
        SinkKind::Stdout { as_json } => Box::new(StdoutQueue { as_json }),
        SinkKind::NoOp => Box::new(NoOpQueue),
    };
    Ok(queue)
}

// Capture accepts batches well before they're queryable, so give it a bounded head start before
// the process exits. Ctrl-C cuts the wait short
async fn drain_wait(wait: Duration) {
    if wait.is_zero() {
        return;
    }
    info!(
        "Waiting {:?} for PostHog to finish processing, events may take several minutes to show up (ctrl-c to exit now)",
        wait
    );
    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Failed to listen for ctrl-c: {:?}", e);
            }
        }
    }
}

async fn run(config: Config) -> Result<(), Error> {
    let source = MixpanelExportSource::new(
        &config.mixpanel_api_url,
        config.mixpanel_project_id.clone(),
        &config.mixpanel_username,
        &config.mixpanel_password,
        config.export_timeout(),
    )
    .context("Failed to build the export client")?;

    let mut queue = build_queue(&config).await?;

    let settings = MigrationSettings {
        from_date: config.from_date,
        to_date: config.to_date,
        chunk_size_days: config.chunk_size_days,
        enqueue_delay: config.enqueue_delay(),
        lib_version: lib_version(),
        import_tag: config.import_tag.clone(),
    };

    let result = Migration::new(settings, &source, &mut queue).run().await;

    // Close on failure too, so everything accepted before the failing chunk is delivered and a
    // rerun can start from that chunk
    let closed = queue
        .close()
        .await
        .context("Failed to flush the last events to the destination");

    let summary = match (result, closed) {
        (Ok(summary), Ok(())) => summary,
        (Ok(_), Err(close_err)) => return Err(close_err),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                error!("Also failed to close the destination queue: {:?}", close_err);
            }
            return Err(e.into());
        }
    };

    info!(
        "Success! Imported {} events over {} chunks",
        summary.imported, summary.chunks
    );
    drain_wait(config.drain_wait()).await;
    Ok(())
}

#[tokio::main]
pub async fn main() -> Result<(), Error> {
    setup_tracing();
    info!("Starting {}", lib_version());

    let config = Config::init_from_env().user_error(
        "Missing or invalid configuration, check the MIXPANEL_*, POSTHOG_*, FROM_DATE and TO_DATE variables",
    )?;

    if let Err(e) = run(config).await {
        error!("{}", get_user_message(&e));
        return Err(e);
    }

    Ok(())
}
