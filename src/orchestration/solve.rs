//! Build invocation
//!
//! `prepare` turns command-line options into a ready-to-run request, doing
//! every validation and resource acquisition up front. `execute` then runs
//! the engine call, the display and the optional trace recorder as one
//! task group.

use super::engine::{BuildEngine, SolveRequest, SolveResponse};
use super::group::TaskGroup;
use crate::definition::Definition;
use crate::error::{BuildError, BuildResult};
use crate::exporter::{resolve_exporter_output, ExporterKind};
use crate::options::{
    parse_entitlements, parse_export_cache, parse_flat_assignments, parse_import_cache,
    parse_secret_specs, parse_ssh_specs,
};
use crate::session::{Attachable, AuthProvider, Session, SshAgentProvider};
use crate::status::{channel, fan_out, TraceRecorder};
use crate::ui::{ProgressMode, RenderMode, StatusDisplay, UiContext};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default size of each bounded status queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Options for one build, as given on the command line
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub exporter: String,
    pub exporter_opts: Vec<String>,
    pub progress: ProgressMode,
    pub trace: Option<PathBuf>,
    pub locals: Vec<String>,
    pub frontend: Option<String>,
    pub frontend_opts: Vec<String>,
    pub no_cache: bool,
    pub export_cache: Vec<String>,
    pub export_cache_opts: Vec<String>,
    pub import_cache: Vec<String>,
    pub secrets: Vec<String>,
    pub allow: Vec<String>,
    pub ssh: Vec<String>,
    pub queue_capacity: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            exporter: String::new(),
            exporter_opts: Vec::new(),
            progress: ProgressMode::default(),
            trace: None,
            locals: Vec::new(),
            frontend: None,
            frontend_opts: Vec::new(),
            no_cache: false,
            export_cache: Vec::new(),
            export_cache_opts: Vec::new(),
            import_cache: Vec::new(),
            secrets: Vec::new(),
            allow: Vec::new(),
            ssh: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A validated build, ready to run
#[derive(Debug)]
pub struct PreparedBuild {
    pub request: SolveRequest,
    pub definition: Option<Definition>,
    pub trace: Option<TraceRecorder>,
    pub render: RenderMode,
    pub queue_capacity: usize,
}

/// Validate options and acquire the files the build needs.
///
/// Nothing is spawned here. The trace file and the output file are opened
/// last, after every other check has passed.
pub fn prepare<R: Read>(
    options: BuildOptions,
    ctx: &UiContext,
    auth: AuthProvider,
    mut stdin: R,
) -> BuildResult<PreparedBuild> {
    let render = options.progress.resolve(ctx)?;

    let mut session = Session::new(auth);
    if !options.ssh.is_empty() {
        let provider = SshAgentProvider::new(parse_ssh_specs(&options.ssh))?;
        session.attach(Attachable::Ssh(provider));
    }
    if !options.secrets.is_empty() {
        let store = parse_secret_specs(&options.secrets)?;
        session.attach(Attachable::Secrets(store));
    }

    let allowed_entitlements = parse_entitlements(&options.allow)?;
    let cache_exports = parse_export_cache(&options.export_cache, &options.export_cache_opts)?;
    let cache_imports = parse_import_cache(&options.import_cache)?;

    let mut exporter_attrs = parse_flat_assignments(&options.exporter_opts)
        .map_err(|e| BuildError::invalid_option("exporter-opt", e))?;
    let mut frontend_attrs = parse_flat_assignments(&options.frontend_opts)
        .map_err(|e| BuildError::invalid_option("frontend-opt", e))?;
    let local_dirs = parse_flat_assignments(&options.locals)
        .map_err(|e| BuildError::invalid_option("local", e))?;

    let frontend = options.frontend.filter(|name| !name.is_empty());
    let definition = match &frontend {
        Some(_) => {
            if options.no_cache {
                frontend_attrs.insert("no-cache".to_string(), String::new());
            }
            None
        }
        None => {
            if ctx.stdin_is_terminal() {
                return Err(BuildError::NoBuildInput);
            }
            let mut input = Vec::new();
            stdin
                .read_to_end(&mut input)
                .map_err(|e| BuildError::io("reading build definition from stdin", e))?;
            if input.iter().all(u8::is_ascii_whitespace) {
                return Err(BuildError::EmptyDefinition);
            }
            let mut definition = Definition::read_from(input.as_slice())?;
            if definition.is_empty() {
                return Err(BuildError::EmptyDefinition);
            }
            if options.no_cache {
                definition.ignore_cache();
            }
            Some(definition)
        }
    };

    let trace = options
        .trace
        .as_deref()
        .map(TraceRecorder::open)
        .transpose()?;

    let exporter = ExporterKind::parse(&options.exporter);
    let output = exporter_attrs.get("output").cloned().unwrap_or_default();
    let exporter_output = resolve_exporter_output(&exporter, &output, ctx)
        .map_err(|e| BuildError::invalid_option("exporter-opt: output", e))?;
    if exporter_output.is_resolved() {
        exporter_attrs.remove("output");
    }

    debug!(
        "Prepared session {} with {} attachables",
        session.id,
        session.attachables.len()
    );

    Ok(PreparedBuild {
        request: SolveRequest {
            exporter,
            exporter_attrs,
            exporter_output,
            frontend,
            frontend_attrs,
            local_dirs,
            cache_exports,
            cache_imports,
            session,
            allowed_entitlements,
        },
        definition,
        trace,
        render,
        queue_capacity: options.queue_capacity,
    })
}

/// Run a prepared build.
///
/// The engine call, the status forwarder and the trace recorder share the
/// group's cancellation scope. The display never looks at it: it renders
/// until the status stream closes, so output already queued is shown even
/// when the engine fails first. A display error fails the build; trace
/// errors never do.
pub async fn execute(
    engine: Arc<dyn BuildEngine>,
    prepared: PreparedBuild,
    cancel: &CancellationToken,
    plain_out: Box<dyn Write + Send>,
) -> BuildResult<SolveResponse> {
    let PreparedBuild {
        request,
        definition,
        trace,
        render,
        queue_capacity,
    } = prepared;

    let mut group = TaskGroup::new(cancel);

    let (status_tx, status_rx) = channel(queue_capacity);
    let consumers = 1 + usize::from(trace.is_some());
    let (forwarder, receivers) = fan_out(status_rx, consumers, queue_capacity);
    let mut receivers = receivers.into_iter();
    let display_rx = receivers
        .next()
        .ok_or_else(|| BuildError::Internal("no status queue for display".to_string()))?;

    let (response_tx, response_rx) = oneshot::channel();
    let token = group.token();
    info!("Solving with {}", engine.engine_name());
    group.spawn("solve", async move {
        let response = engine.solve(definition, request, status_tx, token).await?;
        for (key, value) in &response.exporter_response {
            debug!("exporter response: {}={}", key, value);
        }
        let _ = response_tx.send(response);
        Ok(())
    });

    if let Some(forwarder) = forwarder {
        group.spawn("forward", async move {
            forwarder.run().await;
            Ok(())
        });
    }

    if let (Some(recorder), Some(trace_rx)) = (trace, receivers.next()) {
        group.spawn("trace", recorder.record(trace_rx));
    }

    let display = StatusDisplay::new(render, plain_out);
    group.spawn_blocking("display", move || display.run(display_rx));

    group.wait().await?;

    response_rx
        .await
        .map_err(|_| BuildError::Internal("build finished without a response".to_string()))
}

/// Run `prepare` on the blocking pool so a stalled stdin read can still be
/// cancelled. The abandoned read is left behind on cancellation.
async fn prepare_blocking<F>(task: F, cancel: &CancellationToken) -> BuildResult<PreparedBuild>
where
    F: FnOnce() -> BuildResult<PreparedBuild> + Send + 'static,
{
    let preparing = tokio::task::spawn_blocking(task);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Build cancelled while preparing");
            Err(BuildError::Cancelled)
        }
        joined = preparing => joined
            .map_err(|e| BuildError::Internal(format!("preparing build failed: {}", e)))?,
    }
}

/// Prepare and execute a build against the process's stdio
pub async fn run_build(
    engine: Arc<dyn BuildEngine>,
    options: BuildOptions,
    cancel: &CancellationToken,
) -> BuildResult<SolveResponse> {
    let prepared = prepare_blocking(
        move || {
            let ctx = UiContext::detect();
            prepare(options, &ctx, AuthProvider::from_env(), std::io::stdin().lock())
        },
        cancel,
    )
    .await?;

    let plain_out: Box<dyn Write + Send> = if prepared.request.exporter_output.is_stdout() {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };

    execute(engine, prepared, cancel, plain_out).await
}
