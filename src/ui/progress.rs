//! Build progress display
//!
//! Renders the status stream either as `indicatif` spinners on the
//! terminal or as plain `#N ...` lines for logs and CI.

use super::context::UiContext;
use crate::error::{BuildError, BuildResult};
use crate::status::{SolveStatus, StatusReceiver};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::time::Duration;

/// Requested progress style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Terminal rendering when stderr is a terminal, plain otherwise
    #[default]
    Auto,
    /// Plain line output, shows container output
    Plain,
    /// Terminal rendering, fails without a terminal
    Tty,
}

/// Resolved rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Plain,
    Tty,
}

impl ProgressMode {
    /// Pick the rendering style for the current terminal
    pub fn resolve(self, ctx: &UiContext) -> BuildResult<RenderMode> {
        match self {
            ProgressMode::Auto if ctx.stderr_is_terminal() => Ok(RenderMode::Tty),
            ProgressMode::Auto | ProgressMode::Plain => Ok(RenderMode::Plain),
            ProgressMode::Tty if ctx.stderr_is_terminal() => Ok(RenderMode::Tty),
            ProgressMode::Tty => Err(BuildError::TerminalUnavailable),
        }
    }
}

enum Renderer {
    Plain(Box<dyn Write + Send>),
    Tty(MultiProgress),
}

#[derive(Default)]
struct VertexState {
    index: usize,
    name: String,
    cached: bool,
    done: bool,
    announced: bool,
    bar: Option<ProgressBar>,
}

/// Consumes the status stream and renders it
pub struct StatusDisplay {
    renderer: Renderer,
    vertices: HashMap<String, VertexState>,
    finished_statuses: HashSet<String>,
}

impl StatusDisplay {
    /// Plain output into `out`
    pub fn plain(out: Box<dyn Write + Send>) -> Self {
        Self::with_renderer(Renderer::Plain(out))
    }

    /// Spinner output on stderr
    pub fn tty() -> Self {
        Self::with_renderer(Renderer::Tty(MultiProgress::with_draw_target(
            ProgressDrawTarget::stderr(),
        )))
    }

    /// Create a display for a resolved mode
    pub fn new(mode: RenderMode, plain_out: Box<dyn Write + Send>) -> Self {
        match mode {
            RenderMode::Plain => Self::plain(plain_out),
            RenderMode::Tty => Self::tty(),
        }
    }

    fn with_renderer(renderer: Renderer) -> Self {
        Self {
            renderer,
            vertices: HashMap::new(),
            finished_statuses: HashSet::new(),
        }
    }

    /// Render events until the queue closes.
    ///
    /// Blocks the calling thread; run it on a blocking task. Any write
    /// failure ends rendering with an error.
    pub fn run(mut self, mut events: StatusReceiver) -> BuildResult<()> {
        while let Some(event) = events.blocking_recv() {
            self.apply(&event)?;
        }
        self.finish()
    }

    fn apply(&mut self, status: &SolveStatus) -> BuildResult<()> {
        for vertex in &status.vertexes {
            self.register(&vertex.digest, &vertex.name)?;

            if vertex.cached {
                self.mark_cached(&vertex.digest)?;
            }
            if let Some(err) = &vertex.error {
                self.mark_error(&vertex.digest, err)?;
            } else if let Some(completed) = vertex.completed {
                self.mark_done(&vertex.digest, elapsed(vertex.started, completed))?;
            }
        }

        for vs in &status.statuses {
            self.register(&vs.vertex, "")?;
            let progress = if vs.total > 0 {
                format!("{} {}/{}", vs.name, vs.current, vs.total)
            } else {
                format!("{} {}", vs.name, vs.current)
            };

            if vs.completed.is_some() {
                if self.finished_statuses.insert(vs.id.clone()) {
                    self.line(&vs.vertex, &format!("{} done", progress))?;
                }
            } else if let Some(bar) = self.vertices.get(&vs.vertex).and_then(|s| s.bar.as_ref()) {
                bar.set_message(progress);
            }
        }

        for log in &status.logs {
            self.register(&log.vertex, "")?;
            for line in log.data.lines() {
                self.line(&log.vertex, line)?;
            }
        }

        Ok(())
    }

    /// Track a vertex. In plain mode the `#N name` header is written once
    /// the name is known; statuses and logs may arrive before it.
    fn register(&mut self, digest: &str, name: &str) -> BuildResult<()> {
        if !self.vertices.contains_key(digest) {
            let index = self.vertices.len() + 1;
            let mut state = VertexState {
                index,
                ..Default::default()
            };

            if let Renderer::Tty(multi) = &self.renderer {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.cyan} {prefix:.dim} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.set_prefix(format!("#{}", index));
                bar.enable_steady_tick(Duration::from_millis(120));
                state.bar = Some(bar);
            }

            self.vertices.insert(digest.to_string(), state);
        }

        let Some(state) = self.vertices.get_mut(digest) else {
            return Ok(());
        };
        if name.is_empty() || state.announced {
            return Ok(());
        }
        state.name = name.to_string();
        state.announced = true;

        match &mut self.renderer {
            Renderer::Plain(out) => {
                writeln!(out, "#{} {}", state.index, name).map_err(write_error)
            }
            Renderer::Tty(_) => {
                if let Some(bar) = &state.bar {
                    bar.set_message(name.to_string());
                }
                Ok(())
            }
        }
    }

    fn mark_cached(&mut self, digest: &str) -> BuildResult<()> {
        let Some(state) = self.vertices.get_mut(digest) else {
            return Ok(());
        };
        if state.cached {
            return Ok(());
        }
        state.cached = true;

        match &mut self.renderer {
            Renderer::Plain(out) => writeln!(out, "#{} CACHED", state.index).map_err(write_error),
            Renderer::Tty(_) => {
                if let Some(bar) = &state.bar {
                    bar.set_message(format!("{} {}", state.name, style("CACHED").dim()));
                }
                Ok(())
            }
        }
    }

    fn mark_done(&mut self, digest: &str, took: Option<Duration>) -> BuildResult<()> {
        let Some(state) = self.vertices.get_mut(digest) else {
            return Ok(());
        };
        if state.done {
            return Ok(());
        }
        state.done = true;
        let took = took
            .map(|d| format!(" {:.1}s", d.as_secs_f64()))
            .unwrap_or_default();

        match &mut self.renderer {
            Renderer::Plain(out) => {
                writeln!(out, "#{} DONE{}", state.index, took).map_err(write_error)
            }
            Renderer::Tty(_) => {
                if let Some(bar) = &state.bar {
                    bar.finish_with_message(format!(
                        "{} {}{}",
                        style("✓").green(),
                        state.name,
                        style(took).dim()
                    ));
                }
                Ok(())
            }
        }
    }

    fn mark_error(&mut self, digest: &str, err: &str) -> BuildResult<()> {
        let Some(state) = self.vertices.get_mut(digest) else {
            return Ok(());
        };
        if state.done {
            return Ok(());
        }
        state.done = true;

        match &mut self.renderer {
            Renderer::Plain(out) => {
                writeln!(out, "#{} ERROR: {}", state.index, err).map_err(write_error)
            }
            Renderer::Tty(_) => {
                if let Some(bar) = &state.bar {
                    bar.abandon_with_message(format!(
                        "{} {}: {}",
                        style("✗").red(),
                        state.name,
                        style(err).red()
                    ));
                }
                Ok(())
            }
        }
    }

    fn line(&mut self, digest: &str, text: &str) -> BuildResult<()> {
        let index = self.vertices.get(digest).map(|s| s.index).unwrap_or(0);
        match &mut self.renderer {
            Renderer::Plain(out) => writeln!(out, "#{} {}", index, text).map_err(write_error),
            Renderer::Tty(multi) => multi
                .println(format!("{} {}", style(format!("#{}", index)).dim(), text))
                .map_err(write_error),
        }
    }

    fn finish(mut self) -> BuildResult<()> {
        match &mut self.renderer {
            Renderer::Plain(out) => out.flush().map_err(write_error),
            Renderer::Tty(_) => {
                for state in self.vertices.values() {
                    if let Some(bar) = &state.bar {
                        if !bar.is_finished() {
                            bar.disable_steady_tick();
                            bar.abandon();
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn write_error(e: std::io::Error) -> BuildError {
    BuildError::io("writing progress output", e)
}

fn elapsed(started: Option<DateTime<Utc>>, completed: DateTime<Utc>) -> Option<Duration> {
    started.and_then(|s| (completed - s).to_std().ok())
}
