//! Template renderer
//!
//! `(template, data) -> text`, without I/O. Delimiters belong to the
//! template, so each render builds its own MiniJinja environment with the
//! template's syntax; two templates in one run never share syntax state.

use crate::error::{Error, Result};
use crate::templates::filters;
use crate::templates::{Delimiters, TemplateSpec};
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::path::{Component, Path};

/// Stateless renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a template body
    pub fn render<S: Serialize>(&self, spec: &TemplateSpec, data: &S) -> Result<String> {
        self.render_str(&spec.key, &spec.delimiters, &spec.body, data)
    }

    /// Render a template's output path into a project-relative path.
    ///
    /// The result never leaves the project root: `..` segments are an error.
    pub fn render_path<S: Serialize>(&self, spec: &TemplateSpec, data: &S) -> Result<String> {
        let name = format!("{} (path)", spec.key);
        let rendered = self.render_str(&name, &spec.path_delimiters, &spec.path, data)?;
        let path = rendered.trim().trim_start_matches("./").trim_start_matches('/');
        if path.is_empty() {
            return Err(Error::render(name, "output path rendered empty"));
        }
        if Path::new(path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(Error::render(
                name,
                format!("output path {:?} escapes the project root", path),
            ));
        }
        Ok(path.to_string())
    }

    /// Render an arbitrary source with the given delimiters
    pub fn render_str<S: Serialize>(
        &self,
        name: &str,
        delimiters: &Delimiters,
        source: &str,
        data: &S,
    ) -> Result<String> {
        let env = environment(delimiters).map_err(|e| Error::render(name, e))?;
        env.render_named_str(name, source, data)
            .map_err(|e| Error::render(name, e))
    }
}

/// Syntax for a delimiter pair. The default pair keeps the standard
/// `{% %}` / `{# #}` syntax; any other pair derives block and comment
/// markers from it (`[[` `]]` -> `[[%` `%]]`, `[[#` `#]]`).
fn syntax(delimiters: &Delimiters) -> std::result::Result<SyntaxConfig, minijinja::Error> {
    if delimiters.is_default() {
        return Ok(SyntaxConfig::default());
    }
    let open = delimiters.open.clone();
    let close = delimiters.close.clone();
    SyntaxConfig::builder()
        .block_delimiters(format!("{}%", open), format!("%{}", close))
        .variable_delimiters(open.clone(), close.clone())
        .comment_delimiters(format!("{}#", open), format!("#{}", close))
        .build()
}

fn environment(delimiters: &Delimiters) -> std::result::Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_syntax(syntax(delimiters)?);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    filters::register_filters(&mut env);
    Ok(env)
}
