//! Template registry
//!
//! Holds the built-in default templates (embedded in the binary) and the
//! user-declared overrides loaded from an override document. A registry is
//! a per-run value: build it at the start of a run, drop it at the end.
//!
//! Overrides are declared with the same schema for the artifact templates
//! (`customize_package`) and the layout templates (`customize_layout`):
//!
//! ```yaml
//! layouts:
//!   - path: router.go
//!     delims: ["{{", "}}"]
//!     body: "..."
//!     update_behavior:
//!       type: append
//!       insert_key: "// layergen:routes"
//!       append_tpl: "..."
//!       import_tpl: ["..."]
//!       append_location: before
//! ```

pub mod context;
pub mod filters;
pub mod render;

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub use context::{MethodView, ProjectView, Scope, ScopeData, ServiceView};
pub use render::Renderer;

// Embedded templates (compiled into binary)
mod embedded {
    pub const HANDLER: &str = include_str!("../../templates/artifacts/handler.go.jinja");
    pub const ROUTER: &str = include_str!("../../templates/artifacts/router.go.jinja");
    pub const CLIENT: &str = include_str!("../../templates/artifacts/client.go.jinja");

    pub const MAIN: &str = include_str!("../../templates/layout/main.go.jinja");
    pub const GO_MOD: &str = include_str!("../../templates/layout/go.mod.jinja");
    pub const GITIGNORE: &str = include_str!("../../templates/layout/gitignore.jinja");
}

/// Built-in artifact keys
pub const HANDLER_KEY: &str = "handler.go";
pub const ROUTER_KEY: &str = "router.go";
pub const CLIENT_KEY: &str = "client.go";

/// Built-in layout keys
pub const MAIN_KEY: &str = "main.go";
pub const GO_MOD_KEY: &str = "go.mod";
pub const GITIGNORE_KEY: &str = ".gitignore";

pub const DEFAULT_OPEN: &str = "{{";
pub const DEFAULT_CLOSE: &str = "}}";

/// Variable delimiter pair of one template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.open == DEFAULT_OPEN && self.close == DEFAULT_CLOSE
    }
}

/// How many times a template is instantiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    PerService,
    PerMethod,
}

/// What a merge iterates over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Method,
    Service,
}

/// Where appended content goes relative to the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertLocation {
    Before,
    After,
}

/// Merge rule for [`UpdateBehavior::Append`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRule {
    pub entity: EntityKind,
    /// Anchor template; its first occurrence in the file is authoritative
    pub insert_key: String,
    pub append_tpl: String,
    pub import_tpls: Vec<String>,
    /// Anchor for the import block; the first `import (` block otherwise
    pub import_key: Option<String>,
    pub location: InsertLocation,
}

/// What to do with a file that already exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateBehavior {
    Skip,
    Overwrite,
    Append(AppendRule),
}

/// One template: a default or a user override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    /// Logical key (the declared `path` for overrides)
    pub key: String,
    /// Output path template, rendered with the same data as the body
    pub path: String,
    /// Delimiters of `path`; differ from `delimiters` when the path is
    /// inherited from a built-in
    pub path_delimiters: Delimiters,
    pub delimiters: Delimiters,
    pub body: String,
    pub disabled: bool,
    pub loop_method: bool,
    pub loop_service: bool,
    pub update: UpdateBehavior,
}

impl TemplateSpec {
    /// A default-delimited template whose output path equals its key
    pub fn new(key: impl Into<String>, body: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            path: key.clone(),
            key,
            path_delimiters: Delimiters::default(),
            delimiters: Delimiters::default(),
            body: body.into(),
            disabled: false,
            loop_method: false,
            loop_service: false,
            update: UpdateBehavior::Skip,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn per_method(mut self) -> Self {
        self.loop_method = true;
        self
    }

    pub fn per_service(mut self) -> Self {
        self.loop_service = true;
        self
    }

    pub fn with_update(mut self, update: UpdateBehavior) -> Self {
        self.update = update;
        self
    }

    /// Per-method wins when both loop flags are set
    pub fn repeat(&self) -> Repeat {
        if self.loop_method {
            Repeat::PerMethod
        } else if self.loop_service {
            Repeat::PerService
        } else {
            Repeat::Once
        }
    }
}

/// Built-in artifact templates
pub fn default_artifacts() -> Vec<TemplateSpec> {
    vec![
        TemplateSpec::new(HANDLER_KEY, embedded::HANDLER)
            .with_path("{{ handler_dir }}/{{ method.name | snake_case }}.go")
            .per_method()
            .with_update(UpdateBehavior::Skip),
        TemplateSpec::new(ROUTER_KEY, embedded::ROUTER)
            .with_path("{{ router_dir }}/router.go")
            .with_update(UpdateBehavior::Overwrite),
        TemplateSpec::new(CLIENT_KEY, embedded::CLIENT)
            .with_path("{{ client_dir }}/{{ service.name | snake_case }}_client.go")
            .per_service()
            .with_update(UpdateBehavior::Overwrite),
    ]
}

/// Built-in layout templates
pub fn default_layout() -> Vec<TemplateSpec> {
    vec![
        TemplateSpec::new(MAIN_KEY, embedded::MAIN),
        TemplateSpec::new(GO_MOD_KEY, embedded::GO_MOD),
        TemplateSpec::new(GITIGNORE_KEY, embedded::GITIGNORE),
    ]
}

/// Result of resolving a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Default(&'a TemplateSpec),
    Override(&'a TemplateSpec),
    /// Overridden to disabled: generate nothing, do not fall back
    Disabled,
}

impl<'a> Resolution<'a> {
    pub fn template(&self) -> Option<&'a TemplateSpec> {
        match self {
            Resolution::Default(t) | Resolution::Override(t) => Some(t),
            Resolution::Disabled => None,
        }
    }
}

/// Default templates layered under user overrides
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    defaults: Vec<TemplateSpec>,
    overrides: Vec<TemplateSpec>,
}

impl TemplateRegistry {
    pub fn new(defaults: Vec<TemplateSpec>) -> Self {
        Self {
            defaults,
            overrides: Vec::new(),
        }
    }

    /// Registry seeded with the built-in artifact templates
    pub fn artifacts() -> Self {
        Self::new(default_artifacts())
    }

    /// Registry seeded with the built-in layout templates
    pub fn layout() -> Self {
        Self::new(default_layout())
    }

    fn default_for(&self, key: &str) -> Option<&TemplateSpec> {
        self.defaults.iter().find(|t| t.key == key)
    }

    fn override_for(&self, key: &str) -> Option<&TemplateSpec> {
        self.overrides.iter().find(|t| t.key == key)
    }

    /// Add overrides. An override of a built-in key keeps the built-in
    /// output path, and its repetition when it declares no loop flag.
    pub fn add_overrides(&mut self, overrides: Vec<TemplateSpec>) -> Result<()> {
        let mut seen: HashSet<String> = self.overrides.iter().map(|t| t.key.clone()).collect();
        for mut spec in overrides {
            if !seen.insert(spec.key.clone()) {
                return Err(Error::Config(format!(
                    "template path declared more than once: {}",
                    spec.key
                )));
            }
            if let Some(default) = self.default_for(&spec.key) {
                spec.path = default.path.clone();
                spec.path_delimiters = default.path_delimiters.clone();
                if !spec.loop_method && !spec.loop_service {
                    spec.loop_method = default.loop_method;
                    spec.loop_service = default.loop_service;
                }
            }
            tracing::debug!(key = %spec.key, disabled = spec.disabled, "registered template override");
            self.overrides.push(spec);
        }
        Ok(())
    }

    /// Parse an override document and add its templates
    pub fn load_overrides_str(&mut self, yaml: &str) -> Result<()> {
        let specs = parse_override_document(yaml)?;
        self.add_overrides(specs)
    }

    /// Read an override document from disk and add its templates
    pub fn load_overrides_path(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "read template config file {} failed: {}",
                path.display(),
                e
            ))
        })?;
        self.load_overrides_str(&content)
    }

    /// Resolve a key: enabled override, else disabled marker, else default
    pub fn resolve(&self, key: &str) -> Option<Resolution<'_>> {
        match self.override_for(key) {
            Some(spec) if spec.disabled => Some(Resolution::Disabled),
            Some(spec) => Some(Resolution::Override(spec)),
            None => self.default_for(key).map(Resolution::Default),
        }
    }

    /// Every template that generates something, in planning order:
    /// built-in keys first, then additional overrides in declaration order
    pub fn active(&self) -> Vec<&TemplateSpec> {
        let builtin = self
            .defaults
            .iter()
            .filter_map(|d| self.resolve(&d.key).and_then(|r| r.template()));
        let extra = self
            .overrides
            .iter()
            .filter(|o| !o.disabled && self.default_for(&o.key).is_none());
        builtin.chain(extra).collect()
    }
}

/// Override document as declared on disk
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OverrideDocument {
    #[serde(default)]
    pub layouts: Vec<TemplateDecl>,
}

/// One declared template
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TemplateDecl {
    /// Output path template; also the key that built-ins are overridden by
    pub path: String,
    /// `[open, close]` variable delimiters; empty means `{{`/`}}`
    #[serde(default)]
    pub delims: Vec<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub loop_method: bool,
    #[serde(default)]
    pub loop_service: bool,
    #[serde(default)]
    pub update_behavior: Option<UpdateBehaviorDecl>,
}

/// Declared update behavior
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateBehaviorDecl {
    /// `skip`, `cover` / `overwrite`, or `append`
    #[serde(rename = "type")]
    pub kind: String,
    /// `method` (default) or `service`
    #[serde(default)]
    pub append_key: Option<String>,
    #[serde(default)]
    pub insert_key: Option<String>,
    #[serde(default)]
    pub append_tpl: Option<String>,
    #[serde(default)]
    pub import_tpl: Vec<String>,
    #[serde(default)]
    pub import_key: Option<String>,
    /// `before` or `after` (default)
    #[serde(default)]
    pub append_location: Option<String>,
}

/// Parse and validate an override document
pub fn parse_override_document(yaml: &str) -> Result<Vec<TemplateSpec>> {
    let doc: OverrideDocument = serde_norway::from_str(yaml)
        .map_err(|e| Error::Config(format!("unmarshal template config failed: {}", e)))?;
    doc.layouts.into_iter().map(TemplateSpec::try_from).collect()
}

fn parse_delims(path: &str, delims: &[String]) -> Result<Delimiters> {
    match delims {
        [] => Ok(Delimiters::default()),
        [open, close] if open.is_empty() && close.is_empty() => Ok(Delimiters::default()),
        [open, close] if !open.is_empty() && !close.is_empty() => {
            Ok(Delimiters::new(open.clone(), close.clone()))
        }
        _ => Err(Error::Config(format!(
            "{}: delims must be a pair of non-empty strings",
            path
        ))),
    }
}

fn required(path: &str, field: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{}: missing required field {}", path, field)))
}

impl UpdateBehaviorDecl {
    fn into_behavior(self, path: &str) -> Result<UpdateBehavior> {
        match self.kind.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(UpdateBehavior::Skip),
            "cover" | "overwrite" => Ok(UpdateBehavior::Overwrite),
            "append" => {
                let entity = match self.append_key.as_deref().map(str::trim) {
                    None | Some("") | Some("method") => EntityKind::Method,
                    Some("service") => EntityKind::Service,
                    Some(other) => {
                        return Err(Error::Config(format!(
                            "{}: unknown append_key {:?}",
                            path, other
                        )))
                    }
                };
                let location = match self.append_location.as_deref().map(str::trim) {
                    None | Some("") | Some("after") => InsertLocation::After,
                    Some("before") => InsertLocation::Before,
                    Some(other) => {
                        return Err(Error::Config(format!(
                            "{}: unknown append_location {:?}",
                            path, other
                        )))
                    }
                };
                Ok(UpdateBehavior::Append(AppendRule {
                    entity,
                    insert_key: required(path, "update_behavior.insert_key", self.insert_key)?,
                    append_tpl: required(path, "update_behavior.append_tpl", self.append_tpl)?,
                    import_tpls: self.import_tpl,
                    import_key: self.import_key.filter(|k| !k.is_empty()),
                    location,
                }))
            }
            other => Err(Error::Config(format!(
                "{}: unknown update_behavior type {:?}",
                path, other
            ))),
        }
    }
}

impl TryFrom<TemplateDecl> for TemplateSpec {
    type Error = Error;

    fn try_from(decl: TemplateDecl) -> Result<Self> {
        let path = decl.path.trim().to_string();
        if path.is_empty() {
            return Err(Error::Config("template declared without a path".into()));
        }
        let delimiters = parse_delims(&path, &decl.delims)?;
        let body = if decl.disable {
            decl.body.unwrap_or_default()
        } else {
            required(&path, "body", decl.body)?
        };
        let update = match decl.update_behavior {
            Some(ub) => ub.into_behavior(&path)?,
            None => UpdateBehavior::Skip,
        };

        Ok(TemplateSpec {
            key: path.clone(),
            path,
            path_delimiters: delimiters.clone(),
            delimiters,
            body,
            disabled: decl.disable,
            loop_method: decl.loop_method,
            loop_service: decl.loop_service,
            update,
        })
    }
}
