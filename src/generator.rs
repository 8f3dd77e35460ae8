//! Generation orchestrator
//!
//! Drives one run: choose the mode, resolve the context, build the
//! per-run registries, lay out a fresh project, then plan and apply every
//! artifact. Per-artifact failures are collected into the [`RunReport`];
//! only configuration and definition errors (and layout failures) abort.

use crate::config::{CommandMode, GenerationConfig, GenerationContext};
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::layout;
use crate::planner::{self, GenerationRequest};
use crate::policy::{self, Decision};
use crate::report::{ArtifactResult, Outcome, RunReport};
use crate::sdm::ServiceDefinitionModel;
use crate::templates::{ProjectView, Renderer, TemplateRegistry, UpdateBehavior};
use std::collections::HashSet;
use std::io;
use std::path::Path;

/// Pick the run mode: the explicit command, else inspect the target tree
pub fn resolve_mode(config: &GenerationConfig, fs: &dyn FileSystem) -> CommandMode {
    if let Some(mode) = config.command {
        return mode;
    }
    let existing = [&config.handler_dir, &config.router_dir]
        .into_iter()
        .find(|dir| fs.exists(Path::new(dir.as_str())));
    match existing {
        Some(dir) => {
            tracing::debug!(dir = %dir, "found existing project directory");
            CommandMode::Update
        }
        None => CommandMode::Initialize,
    }
}

/// Runs generation against a filesystem
pub struct Generator<'f> {
    fs: &'f mut dyn FileSystem,
    renderer: Renderer,
}

impl<'f> Generator<'f> {
    pub fn new(fs: &'f mut dyn FileSystem) -> Self {
        Self {
            fs,
            renderer: Renderer::new(),
        }
    }

    pub fn run(&mut self, config: &GenerationConfig, sdm: &ServiceDefinitionModel) -> Result<RunReport> {
        sdm.validate()?;
        let mode = resolve_mode(config, &*self.fs);
        let ctx = GenerationContext::resolve(config, sdm, mode == CommandMode::Initialize)?;
        let project = ProjectView::build(sdm, &ctx);
        tracing::info!(
            mode = %mode,
            module = %ctx.module,
            services = sdm.services.len(),
            methods = sdm.method_count(),
            "starting generation"
        );

        let mut artifacts = TemplateRegistry::artifacts();
        if let Some(path) = &config.customize_package {
            artifacts.load_overrides_path(path)?;
        }

        let mut report = RunReport::new(mode);
        if mode == CommandMode::Initialize {
            let mut registry = TemplateRegistry::layout();
            if let Some(path) = &config.customize_layout {
                registry.load_overrides_path(path)?;
            }
            report.layout = layout::generate(&mut *self.fs, &self.renderer, &ctx, &project, &registry)?;
        }

        let mut claimed = HashSet::new();
        for planned in planner::plan(&project, &ctx, &artifacts) {
            let result = match planned {
                Ok(request) => {
                    let behavior = match mode {
                        CommandMode::Initialize => UpdateBehavior::Overwrite,
                        CommandMode::Update => request.template.update.clone(),
                    };
                    if claimed.insert(request.path.clone()) {
                        self.generate(&request, &behavior)
                    } else {
                        failure(&request.key, &request.path, Error::DuplicatePath(request.path.clone()))
                    }
                }
                Err(f) => failure(&f.key, &f.path, f.error),
            };
            report.artifacts.push(result);
        }

        tracing::info!(
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            status = ?report.status(),
            "generation finished"
        );
        Ok(report)
    }

    fn generate(&mut self, request: &GenerationRequest<'_>, behavior: &UpdateBehavior) -> ArtifactResult {
        match apply(&mut *self.fs, &self.renderer, request, behavior) {
            Ok((content, outcome)) => {
                tracing::debug!(key = %request.key, path = %request.path, outcome = ?outcome, "artifact done");
                ArtifactResult {
                    key: request.key.clone(),
                    path: request.path.clone(),
                    content,
                    outcome,
                }
            }
            Err(err) => failure(&request.key, &request.path, err),
        }
    }
}

/// Run generation with `config` against `fs`
pub fn run(
    config: &GenerationConfig,
    sdm: &ServiceDefinitionModel,
    fs: &mut dyn FileSystem,
) -> Result<RunReport> {
    Generator::new(fs).run(config, sdm)
}

fn failure(key: &str, path: &str, err: Error) -> ArtifactResult {
    tracing::warn!(key = %key, path = %path, error = %err, "artifact failed");
    ArtifactResult {
        key: key.to_string(),
        path: path.to_string(),
        content: None,
        outcome: Outcome::failed(&err),
    }
}

/// Render one request and apply `behavior` to its target.
///
/// Returns the content written (if any) and the outcome. On error nothing
/// has been written.
pub(crate) fn apply(
    fs: &mut dyn FileSystem,
    renderer: &Renderer,
    request: &GenerationRequest<'_>,
    behavior: &UpdateBehavior,
) -> Result<(Option<String>, Outcome)> {
    let path = Path::new(&request.path);
    let data = request.data();
    let candidate = renderer.render(request.template, &data)?;

    let existing = match fs.read(path)? {
        Some(bytes) => Some(String::from_utf8(bytes).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {}", request.path, e),
            )
        })?),
        None => None,
    };

    let entities = match behavior {
        UpdateBehavior::Append(rule) => request.project.entities(request.scope, rule.entity),
        _ => Vec::new(),
    };
    let decision = policy::decide(
        behavior,
        existing.as_deref(),
        candidate,
        renderer,
        request.template,
        &entities,
    )?;

    match decision {
        Decision::Write(content) | Decision::Merge(content) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs.mkdir_all(parent)?;
            }
            fs.write(path, content.as_bytes())?;
            Ok((Some(content), Outcome::Written))
        }
        Decision::NoOp => Ok((None, Outcome::Skipped)),
    }
}
