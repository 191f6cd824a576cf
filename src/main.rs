use std::process;

use sbcmon::{
    config::{metrics::MetricsConfig, Config},
    core::{
        collectors::registry::ProbeRegistry, executor::Executor, host::HostIdentity,
        metric::MetricKind,
    },
    logger::LoggerManager,
    print_error,
};
use sbcmon_mqtt::Session;
use tracing::{debug, error, info, warn};

fn log_metrics_table(config: &MetricsConfig, registry: &ProbeRegistry) {
    let name_width = MetricKind::ALL
        .iter()
        .map(|kind| kind.as_str().len())
        .max()
        .unwrap_or(10)
        .max("Metric".len());

    let header = format!("{:<width$} | Status", "Metric", width = name_width);
    let sep = format!("{}-+-{}", "-".repeat(name_width), "-".repeat(12));

    info!("{}", header);
    info!("{}", sep);

    for kind in MetricKind::ALL {
        let status = match (config.is_enabled(kind), registry.contains(kind)) {
            (true, true) => "ENABLED",
            // Enabled but no probe linked in; the run will fail on it.
            (true, false) => "ENABLED (missing)",
            (false, _) => "DISABLED",
        };

        info!("{:<width$} | {}", kind.as_str(), status, width = name_width);
    }
}

#[tokio::main]
async fn main() {
    let cfg = Config::new().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting sbcmon version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.transport);

    let registry = ProbeRegistry::new(&cfg.metrics.sources);
    log_metrics_table(&cfg.metrics, &registry);
    if cfg.metrics.enabled_kinds().is_empty() {
        warn!("No metrics enabled, only an empty run will be published");
    }

    let host = HostIdentity::resolve(&cfg.publish.device).await;
    info!(hostname = %host.hostname, model = %host.model, "Host identity");

    let executor = Executor::new(&cfg, &registry, &host);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, stopping run"),
            Err(e) => {
                warn!("Unable to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    if let Err(e) = executor
        .run_once(|| Session::connect(&cfg.transport), shutdown)
        .await
    {
        error!("Run failed: {}", e);
        process::exit(1);
    }
    info!("Run complete");
}
