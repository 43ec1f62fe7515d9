//! Build command - run one build on the configured engine

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::BuildResult;
use crate::orchestration::{create_engine, run_build, BuildOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config, addr: Option<String>) -> BuildResult<()> {
    let engine = create_engine(&config.engine, addr);
    debug!("Using engine: {}", engine.engine_name());

    let options = build_options(args, config);
    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = run_build(engine, options, &cancel).await;
    signal_task.abort();

    let response = result?;
    info!(
        "Build finished with {} exporter response entries",
        response.exporter_response.len()
    );
    Ok(())
}

/// Merge command-line flags with configured defaults
fn build_options(args: BuildArgs, config: &Config) -> BuildOptions {
    BuildOptions {
        exporter: args.exporter,
        exporter_opts: args.exporter_opt,
        progress: args.progress.unwrap_or(config.progress.mode),
        trace: args.trace,
        locals: args.local,
        frontend: args.frontend,
        frontend_opts: args.frontend_opt,
        no_cache: args.no_cache,
        export_cache: args.export_cache,
        export_cache_opts: args.export_cache_opt,
        import_cache: args.import_cache,
        secrets: args.secret,
        allow: args.allow,
        ssh: args.ssh,
        queue_capacity: config.progress.queue_capacity.max(1),
    }
}

/// Cancel the build on SIGINT or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), cancelling build"),
        _ = terminate => info!("Received SIGTERM, cancelling build"),
    }

    cancel.cancel();
}
