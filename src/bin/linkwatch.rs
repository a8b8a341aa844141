use std::sync::Arc;

use clap::Parser;
use linkwatch::config::read_config_file;
use linkwatch::dispatch::{AlertDispatchHandle, ReactionDispatcher};
use linkwatch::scheduler::{SchedulerHandle, SchedulerOptions};
use linkwatch::sinks::{AlertSink, JsonFailureSink, JsonReportSink, LogAlertSink, WebhookAlertSink};
use linkwatch::store::SnapshotStore;
use linkwatch::transport::SnmpTransport;
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![("linkwatch", LevelFilter::TRACE)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    config.validate()?;

    let transport = Arc::new(SnmpTransport::new(config.community.as_bytes().to_vec()));
    let store = Arc::new(SnapshotStore::new());

    let alert_sink: Arc<dyn AlertSink> = match &config.alert_webhook {
        Some(url) => Arc::new(WebhookAlertSink::new(url.clone())),
        None => Arc::new(LogAlertSink),
    };
    let alerts = AlertDispatchHandle::spawn(alert_sink);
    let report_sink = Arc::new(JsonReportSink::new(&config.output_dir).await?);
    let failure_sink = Arc::new(JsonFailureSink::new(&config.output_dir).await?);

    let dispatcher =
        ReactionDispatcher::new(alerts.clone(), report_sink, config.status_metric.clone());

    let scheduler = SchedulerHandle::spawn(
        config.assignments(),
        transport,
        store,
        dispatcher,
        failure_sink,
        SchedulerOptions::from_config(&config),
    );

    debug!("polling started; ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    debug!("shutting down");
    scheduler.shutdown().await;
    alerts.shutdown().await;

    Ok(())
}
