//! Project layout
//!
//! Scaffolding for a fresh project: the standard directories plus the
//! layout templates (`main.go`, `.gitignore`, and `go.mod` when asked for).
//! Runs only in initialize mode, before any artifact. Layout files follow
//! their declared update behavior, so hand-edited files survive a re-init.
//! Any failure here aborts the run.

use crate::config::GenerationContext;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::generator;
use crate::planner;
use crate::report::ArtifactResult;
use crate::templates::{ProjectView, Renderer, TemplateRegistry, GO_MOD_KEY};
use std::collections::HashSet;
use std::path::Path;

/// Create the project directories and render the layout templates
pub fn generate(
    fs: &mut dyn FileSystem,
    renderer: &Renderer,
    ctx: &GenerationContext,
    project: &ProjectView,
    registry: &TemplateRegistry,
) -> Result<Vec<ArtifactResult>> {
    let dirs = [&ctx.handler_dir, &ctx.router_dir, &ctx.model_dir]
        .into_iter()
        .chain(ctx.client_dir.as_ref());
    for dir in dirs {
        tracing::debug!(dir = %dir, "creating directory");
        fs.mkdir_all(Path::new(dir.as_str()))?;
    }

    let mut results = Vec::new();
    let mut claimed = HashSet::new();
    for planned in planner::plan(project, ctx, registry) {
        let request = planned.map_err(|f| f.error)?;
        if request.key == GO_MOD_KEY && !ctx.need_go_mod {
            continue;
        }
        if !claimed.insert(request.path.clone()) {
            return Err(Error::DuplicatePath(request.path));
        }
        let (content, outcome) =
            generator::apply(fs, renderer, &request, &request.template.update)?;
        tracing::info!(path = %request.path, outcome = ?outcome, "layout file");
        results.push(ArtifactResult {
            key: request.key.clone(),
            path: request.path.clone(),
            content,
            outcome,
        });
    }
    Ok(results)
}
