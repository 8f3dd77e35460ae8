//! Generation configuration
//!
//! Parses the flat `key=value,key=value` parameter string a protoc plugin
//! receives into a [`GenerationConfig`], and resolves that together with
//! the service definition into the read-only [`GenerationContext`] every
//! downstream component works from.

use crate::error::{Error, Result};
use crate::sdm::ServiceDefinitionModel;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_HANDLER_DIR: &str = "biz/handler";
pub const DEFAULT_ROUTER_DIR: &str = "biz/router";
pub const DEFAULT_MODEL_DIR: &str = "biz/model";
pub const DEFAULT_SERVICE_NAME: &str = "hertz_service";

/// Prefix of pass-through option keys (`option_package:<name>=<value>`)
pub const OPTION_PACKAGE_PREFIX: &str = "option_package:";

/// Run mode, chosen once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    /// Fresh project: layout stage, then every artifact overwritten
    Initialize,
    /// Existing project: artifacts follow their declared update behavior
    Update,
}

impl std::str::FromStr for CommandMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(CommandMode::Initialize),
            "update" => Ok(CommandMode::Update),
            other => Err(Error::Config(format!(
                "unknown command {:?} (expected \"new\" or \"update\")",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CommandMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandMode::Initialize => write!(f, "new"),
            CommandMode::Update => write!(f, "update"),
        }
    }
}

/// Configuration record handed in by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Explicit mode; detected from the target tree when absent
    pub command: Option<CommandMode>,
    pub verbose: bool,
    pub out_dir: PathBuf,
    pub handler_dir: String,
    pub router_dir: String,
    pub model_dir: String,
    /// Client stubs are only generated when this is set
    pub client_dir: Option<String>,
    pub base_domain: String,
    pub module: Option<String>,
    pub service_name: String,
    pub need_go_mod: bool,
    pub excludes: Vec<String>,
    pub customize_layout: Option<PathBuf>,
    pub customize_package: Option<PathBuf>,
    /// `option_package:` pass-through values, exposed to templates as `options`
    pub options: BTreeMap<String, String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            command: None,
            verbose: false,
            out_dir: PathBuf::from("."),
            handler_dir: DEFAULT_HANDLER_DIR.to_string(),
            router_dir: DEFAULT_ROUTER_DIR.to_string(),
            model_dir: DEFAULT_MODEL_DIR.to_string(),
            client_dir: None,
            base_domain: String::new(),
            module: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            need_go_mod: false,
            excludes: Vec::new(),
            customize_layout: None,
            customize_package: None,
            options: BTreeMap::new(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    value == "true" || value == "1"
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl GenerationConfig {
    /// Parse a comma-separated `key=value` parameter string.
    ///
    /// `exclude_file` takes a comma list itself, so a bare segment directly
    /// following it continues that list.
    pub fn from_params(params: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut last_key: Option<String> = None;

        for segment in params.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim();
                    config.apply(key, value.trim())?;
                    last_key = Some(key.to_string());
                }
                None if last_key.as_deref() == Some("exclude_file") => {
                    config.excludes.push(segment.to_string());
                }
                None => {
                    return Err(Error::Config(format!(
                        "invalid parameter format: {}",
                        segment
                    )));
                }
            }
        }

        Ok(config)
    }

    /// Apply a single parameter
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "command" | "cmd" => self.command = Some(value.parse()?),
            "verbose" => self.verbose = parse_bool(value),
            "out_dir" => self.out_dir = PathBuf::from(if value.is_empty() { "." } else { value }),
            "handler_dir" => self.handler_dir = value.to_string(),
            "router_dir" => self.router_dir = value.to_string(),
            "model_dir" => self.model_dir = value.to_string(),
            "client_dir" => self.client_dir = non_empty(value),
            "base_domain" => self.base_domain = value.to_string(),
            "module" | "go_module" => self.module = non_empty(value),
            "service" => self.service_name = value.to_string(),
            "need_go_mod" => self.need_go_mod = parse_bool(value),
            "exclude_file" => self.excludes.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            ),
            "customize_layout" => self.customize_layout = non_empty(value).map(PathBuf::from),
            "customize_package" => self.customize_package = non_empty(value).map(PathBuf::from),
            _ => {
                if let Some(name) = key.strip_prefix(OPTION_PACKAGE_PREFIX) {
                    if value.is_empty() {
                        return Err(Error::Config(format!(
                            "option_package value cannot be empty: {}",
                            name
                        )));
                    }
                    self.options.insert(name.to_string(), value.to_string());
                } else {
                    return Err(Error::Config(format!("unknown parameter: {}", key)));
                }
            }
        }
        Ok(())
    }
}

/// Read-only per-run context shared by planner, layout and renderer
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub module: String,
    pub out_dir: PathBuf,
    pub handler_dir: String,
    pub router_dir: String,
    pub model_dir: String,
    pub client_dir: Option<String>,
    /// Import path of the model package
    pub model_package: String,
    pub service_name: String,
    pub base_domain: String,
    pub need_go_mod: bool,
    pub options: BTreeMap<String, String>,
    pub excludes: Vec<String>,
    exclude_set: GlobSet,
}

impl GenerationContext {
    /// Resolve configuration against the service definition.
    ///
    /// The module root comes from the `module` parameter, else from the
    /// model package; `require_module` turns its absence into an error.
    pub fn resolve(
        config: &GenerationConfig,
        sdm: &ServiceDefinitionModel,
        require_module: bool,
    ) -> Result<Self> {
        let module = config
            .module
            .clone()
            .or_else(|| sdm.derived_module())
            .unwrap_or_default();
        if require_module && module.is_empty() {
            return Err(Error::Config(
                "module is required for the new command (set module=<path> or a package in the service descriptor)"
                    .into(),
            ));
        }

        let model_package = match sdm.package.as_deref().map(str::trim) {
            Some(pkg) if !pkg.is_empty() => pkg.to_string(),
            _ if module.is_empty() => config.model_dir.clone(),
            _ => format!("{}/{}", module, config.model_dir),
        };

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.excludes {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("invalid exclude glob {}: {}", pattern, e)))?;
            builder.add(glob);
        }
        let exclude_set = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid exclude globs: {}", e)))?;

        Ok(Self {
            module,
            out_dir: config.out_dir.clone(),
            handler_dir: config.handler_dir.clone(),
            router_dir: config.router_dir.clone(),
            model_dir: config.model_dir.clone(),
            client_dir: config.client_dir.clone(),
            model_package,
            service_name: config.service_name.clone(),
            base_domain: config.base_domain.clone(),
            need_go_mod: config.need_go_mod,
            options: config.options.clone(),
            excludes: config.excludes.clone(),
            exclude_set,
        })
    }

    /// Whether a project-relative path matches an exclusion glob
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_set.is_match(path)
    }
}
