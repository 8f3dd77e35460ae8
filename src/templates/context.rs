//! Template context structures
//!
//! Converts the service definition and generation context into
//! template-friendly views. Every template renders against a [`ScopeData`]:
//! the whole-project view plus, depending on scope, the current `service`
//! and `method`.

use crate::config::GenerationContext;
use crate::sdm::ServiceDefinitionModel;
use crate::templates::EntityKind;
use crate::util;
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole-project view shared by every template in a run
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    /// Generator version (no timestamps, so reruns are byte-identical)
    pub version: String,
    pub idl: Option<String>,
    pub module: String,
    pub service_name: String,
    pub base_domain: String,
    pub need_go_mod: bool,

    pub handler_dir: String,
    pub router_dir: String,
    pub model_dir: String,
    pub client_dir: Option<String>,

    /// Import paths and package names derived from the directories
    pub handler_package: String,
    pub handler_package_name: String,
    pub router_package: String,
    pub router_package_name: String,
    pub client_package_name: String,
    pub model_package: String,
    pub model_package_name: String,

    /// `option_package:` pass-through values
    pub options: BTreeMap<String, String>,

    pub services: Vec<ServiceView>,
    /// All methods of all services, in IDL order
    pub methods: Vec<MethodView>,
    pub router: RouterView,
}

/// View of a service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    pub name: String,
    pub name_snake: String,
    pub name_camel: String,
    pub base_domain: String,
    pub methods: Vec<MethodView>,
}

/// View of a method, with its route already resolved
#[derive(Debug, Clone, Serialize)]
pub struct MethodView {
    pub name: String,
    pub name_snake: String,
    pub name_camel: String,
    pub service: String,
    pub verb: String,
    pub path: String,
    pub request_type: String,
    pub response_type: String,
}

/// Route registration lines, for custom router templates
#[derive(Debug, Clone, Serialize)]
pub struct RouterView {
    pub registers: Vec<String>,
}

/// Which SDM entity a request is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Run,
    /// Index into `ProjectView::services`
    Service(usize),
    /// Service index, method index within that service
    Method(usize, usize),
}

/// Render data for one scope
#[derive(Debug, Clone, Serialize)]
pub struct ScopeData<'a> {
    #[serde(flatten)]
    pub project: &'a ProjectView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'a ServiceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'a MethodView>,
}

fn join_import(module: &str, dir: &str) -> String {
    if module.is_empty() {
        dir.to_string()
    } else {
        format!("{}/{}", module.trim_end_matches('/'), dir.trim_start_matches('/'))
    }
}

fn package_name(dir: &str) -> String {
    util::last_segment(dir.trim_end_matches('/')).to_string()
}

impl ProjectView {
    /// Project the service definition into render views
    pub fn build(sdm: &ServiceDefinitionModel, ctx: &GenerationContext) -> Self {
        let handler_package_name = package_name(&ctx.handler_dir);

        let services: Vec<ServiceView> = sdm
            .services
            .iter()
            .map(|service| ServiceView {
                name: service.name.clone(),
                name_snake: util::to_snake_case(&service.name),
                name_camel: util::to_camel_case(&service.name),
                base_domain: ctx.base_domain.clone(),
                methods: service
                    .methods
                    .iter()
                    .map(|method| {
                        let (verb, path) = method.route(&service.name);
                        MethodView {
                            name: method.name.clone(),
                            name_snake: util::to_snake_case(&method.name),
                            name_camel: util::to_camel_case(&method.name),
                            service: service.name.clone(),
                            verb,
                            path,
                            request_type: method.request_type.clone(),
                            response_type: method.response_type.clone(),
                        }
                    })
                    .collect(),
            })
            .collect();

        let methods: Vec<MethodView> = services
            .iter()
            .flat_map(|s| s.methods.iter().cloned())
            .collect();

        let registers = methods
            .iter()
            .map(|m| format!("r.{}(\"{}\", {}.{})", m.verb, m.path, handler_package_name, m.name))
            .collect();

        Self {
            version: crate::VERSION.to_string(),
            idl: sdm.idl.clone(),
            module: ctx.module.clone(),
            service_name: ctx.service_name.clone(),
            base_domain: ctx.base_domain.clone(),
            need_go_mod: ctx.need_go_mod,
            handler_dir: ctx.handler_dir.clone(),
            router_dir: ctx.router_dir.clone(),
            model_dir: ctx.model_dir.clone(),
            client_dir: ctx.client_dir.clone(),
            handler_package: join_import(&ctx.module, &ctx.handler_dir),
            handler_package_name,
            router_package: join_import(&ctx.module, &ctx.router_dir),
            router_package_name: package_name(&ctx.router_dir),
            client_package_name: ctx
                .client_dir
                .as_deref()
                .map(package_name)
                .unwrap_or_else(|| "client".to_string()),
            model_package: ctx.model_package.clone(),
            model_package_name: package_name(&ctx.model_package),
            options: ctx.options.clone(),
            services,
            methods,
            router: RouterView { registers },
        }
    }

    /// Render data bound to one scope
    pub fn scoped(&self, scope: Scope) -> ScopeData<'_> {
        match scope {
            Scope::Run => ScopeData {
                project: self,
                service: None,
                method: None,
            },
            Scope::Service(s) => ScopeData {
                project: self,
                service: self.services.get(s),
                method: None,
            },
            Scope::Method(s, m) => {
                let service = self.services.get(s);
                ScopeData {
                    project: self,
                    service,
                    method: service.and_then(|svc| svc.methods.get(m)),
                }
            }
        }
    }

    /// Merge entities of `kind` covered by `scope`, each as its own render data
    pub fn entities(&self, scope: Scope, kind: EntityKind) -> Vec<ScopeData<'_>> {
        let service_indices: Vec<usize> = match scope {
            Scope::Run => (0..self.services.len()).collect(),
            Scope::Service(s) | Scope::Method(s, _) => vec![s],
        };

        match (kind, scope) {
            (EntityKind::Method, Scope::Method(s, m)) => vec![self.scoped(Scope::Method(s, m))],
            (EntityKind::Method, _) => service_indices
                .into_iter()
                .flat_map(|s| {
                    let count = self.services.get(s).map_or(0, |svc| svc.methods.len());
                    (0..count).map(move |m| Scope::Method(s, m))
                })
                .map(|scope| self.scoped(scope))
                .collect(),
            (EntityKind::Service, _) => service_indices
                .into_iter()
                .map(|s| self.scoped(Scope::Service(s)))
                .collect(),
        }
    }
}
