//! Generation planner
//!
//! Expands the active templates over the service definition into concrete
//! [`GenerationRequest`]s: one per template for `Once`, one per service for
//! `PerService`, one per method for `PerMethod`. Planning is lazy; requests
//! come out in template order, then service order, then method order.

use crate::config::GenerationContext;
use crate::error::Error;
use crate::templates::{
    ProjectView, Renderer, Repeat, Scope, ScopeData, TemplateRegistry, TemplateSpec, CLIENT_KEY,
};

/// One file to produce: a template bound to a scope, with its output path
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub key: String,
    /// Project-relative output path
    pub path: String,
    pub template: &'a TemplateSpec,
    pub scope: Scope,
    pub project: &'a ProjectView,
}

impl<'a> GenerationRequest<'a> {
    /// Render data for this request
    pub fn data(&self) -> ScopeData<'a> {
        self.project.scoped(self.scope)
    }
}

/// A request whose output path could not be rendered
#[derive(Debug)]
pub struct PlanFailure {
    pub key: String,
    /// Unrendered path template
    pub path: String,
    pub error: Error,
}

/// Lazy iterator over generation requests
pub struct Planner<'a> {
    project: &'a ProjectView,
    ctx: &'a GenerationContext,
    templates: Vec<&'a TemplateSpec>,
    renderer: Renderer,
    template: usize,
    service: usize,
    method: usize,
}

/// Plan the requests for the active templates of `registry`
pub fn plan<'a>(
    project: &'a ProjectView,
    ctx: &'a GenerationContext,
    registry: &'a TemplateRegistry,
) -> Planner<'a> {
    let templates = registry
        .active()
        .into_iter()
        .filter(|t| {
            if t.key == CLIENT_KEY && ctx.client_dir.is_none() {
                tracing::debug!("client_dir not set, not planning client stubs");
                false
            } else {
                true
            }
        })
        .collect();
    Planner {
        project,
        ctx,
        templates,
        renderer: Renderer::new(),
        template: 0,
        service: 0,
        method: 0,
    }
}

impl<'a> Planner<'a> {
    /// Next scope for the current template, advancing the cursor
    fn next_scope(&mut self) -> Option<(&'a TemplateSpec, Scope)> {
        let project = self.project;
        let services = &project.services;
        while let Some(&template) = self.templates.get(self.template) {
            match template.repeat() {
                Repeat::Once => {
                    self.template += 1;
                    return Some((template, Scope::Run));
                }
                Repeat::PerService => {
                    if self.service < services.len() {
                        self.service += 1;
                        return Some((template, Scope::Service(self.service - 1)));
                    }
                }
                Repeat::PerMethod => {
                    while let Some(service) = services.get(self.service) {
                        if self.method < service.methods.len() {
                            self.method += 1;
                            return Some((template, Scope::Method(self.service, self.method - 1)));
                        }
                        self.service += 1;
                        self.method = 0;
                    }
                }
            }
            self.template += 1;
            self.service = 0;
            self.method = 0;
        }
        None
    }
}

impl<'a> Iterator for Planner<'a> {
    type Item = Result<GenerationRequest<'a>, PlanFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (template, scope) = self.next_scope()?;
            let data = self.project.scoped(scope);
            let path = match self.renderer.render_path(template, &data) {
                Ok(path) => path,
                Err(error) => {
                    return Some(Err(PlanFailure {
                        key: template.key.clone(),
                        path: template.path.clone(),
                        error,
                    }))
                }
            };
            if self.ctx.is_excluded(&path) {
                tracing::debug!(key = %template.key, path = %path, "excluded by exclude_file");
                continue;
            }
            return Some(Ok(GenerationRequest {
                key: template.key.clone(),
                path,
                template,
                scope,
                project: self.project,
            }));
        }
    }
}
