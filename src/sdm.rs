//! Service Definition Model
//!
//! The already-parsed form of one or more IDL service interfaces. The IDL
//! front-end is external; it hands the engine a descriptor document with
//! services, methods and request/response type names, which is loaded and
//! validated here. The model is immutable once loaded.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// HTTP verbs a route annotation may carry
pub const HTTP_VERBS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "ANY"];

/// Verb assigned to methods without a route annotation
pub const DEFAULT_VERB: &str = "POST";

/// All services extracted from one IDL compilation unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinitionModel {
    /// Main IDL file name (e.g. `greeter.proto`)
    #[serde(default)]
    pub idl: Option<String>,

    /// Import path of the generated model package (`go_package` for proto)
    #[serde(default)]
    pub package: Option<String>,

    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

/// One service and its methods, in IDL order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
}

/// One RPC method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub name: String,
    pub request_type: String,
    pub response_type: String,

    /// Explicit HTTP binding; absent when the IDL carries no annotation
    #[serde(default)]
    pub http: Option<HttpRule>,
}

/// HTTP verb/path annotation on a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRule {
    pub method: String,
    pub path: String,
}

impl ServiceDefinitionModel {
    /// Parse and validate a descriptor document (YAML or JSON)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut model: ServiceDefinitionModel = serde_norway::from_str(yaml)
            .map_err(|e| Error::Definition(format!("Failed to parse service descriptor: {}", e)))?;
        model.normalize();
        model.validate()?;
        Ok(model)
    }

    /// Load a descriptor document from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Definition(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    fn normalize(&mut self) {
        for method in self.services.iter_mut().flat_map(|s| s.methods.iter_mut()) {
            if let Some(rule) = method.http.as_mut() {
                rule.method = rule.method.trim().to_ascii_uppercase();
                rule.path = rule.path.trim().to_string();
            }
        }
    }

    /// Check structural invariants of the model
    pub fn validate(&self) -> Result<()> {
        let mut service_names = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(Error::Definition("service with empty name".into()));
            }
            if !service_names.insert(service.name.as_str()) {
                return Err(Error::Definition(format!(
                    "duplicate service name: {}",
                    service.name
                )));
            }

            let mut method_names = HashSet::new();
            for method in &service.methods {
                if method.name.trim().is_empty() {
                    return Err(Error::Definition(format!(
                        "service {} has a method with an empty name",
                        service.name
                    )));
                }
                if !method_names.insert(method.name.as_str()) {
                    return Err(Error::Definition(format!(
                        "duplicate method {} in service {}",
                        method.name, service.name
                    )));
                }
                if let Some(rule) = &method.http {
                    if !HTTP_VERBS.contains(&rule.method.as_str()) {
                        return Err(Error::Definition(format!(
                            "{}.{}: unsupported HTTP verb {:?}",
                            service.name, method.name, rule.method
                        )));
                    }
                    if rule.path.is_empty() || !rule.path.starts_with('/') {
                        return Err(Error::Definition(format!(
                            "{}.{}: route path must be non-empty and start with '/', got {:?}",
                            service.name, method.name, rule.path
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Total number of methods across all services
    pub fn method_count(&self) -> usize {
        self.services.iter().map(|s| s.methods.len()).sum()
    }

    /// Module root derived from the model package.
    ///
    /// `github.com/acme/greeter/biz/model` -> `github.com/acme/greeter`;
    /// without a `/biz/` segment the last path segment is dropped.
    pub fn derived_module(&self) -> Option<String> {
        let package = self.package.as_deref()?.trim();
        if package.is_empty() {
            return None;
        }
        let root = if let Some(idx) = package.find("/biz/") {
            &package[..idx]
        } else if let Some(idx) = package.rfind('/') {
            &package[..idx]
        } else {
            package
        };
        Some(root.to_string())
    }
}

impl MethodDefinition {
    /// Verb and path for this method, falling back to `POST /{Service}/{Method}`
    pub fn route(&self, service: &str) -> (String, String) {
        match &self.http {
            Some(rule) => (rule.method.clone(), rule.path.clone()),
            None => (
                DEFAULT_VERB.to_string(),
                format!("/{}/{}", service, self.name),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETER: &str = r#"
idl: greeter.proto
package: github.com/acme/greeter/biz/model
services:
  - name: Greeter
    methods:
      - name: SayHello
        request_type: HelloRequest
        response_type: HelloReply
      - name: Wave
        request_type: WaveRequest
        response_type: WaveReply
        http:
          method: get
          path: /wave
"#;

    #[test]
    fn test_parse_descriptor() {
        let model = ServiceDefinitionModel::from_yaml(GREETER).unwrap();
        assert_eq!(model.services.len(), 1);
        assert_eq!(model.method_count(), 2);
        let wave = &model.services[0].methods[1];
        assert_eq!(wave.http.as_ref().unwrap().method, "GET");
    }

    #[test]
    fn test_default_route() {
        let model = ServiceDefinitionModel::from_yaml(GREETER).unwrap();
        let hello = &model.services[0].methods[0];
        assert_eq!(
            hello.route("Greeter"),
            ("POST".to_string(), "/Greeter/SayHello".to_string())
        );
        let wave = &model.services[0].methods[1];
        assert_eq!(wave.route("Greeter"), ("GET".to_string(), "/wave".to_string()));
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let yaml = r#"
services:
  - name: Greeter
    methods:
      - { name: A, request_type: R, response_type: S }
      - { name: A, request_type: R, response_type: S }
"#;
        let err = ServiceDefinitionModel::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
        assert!(err.to_string().contains("duplicate method A"));
    }

    #[test]
    fn test_malformed_descriptor_is_definition_error() {
        let err = ServiceDefinitionModel::from_yaml("services: [").unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_path_rejected() {
        let yaml = r#"
services:
  - name: Greeter
    methods:
      - name: A
        request_type: R
        response_type: S
        http: { method: POST, path: "" }
"#;
        assert!(ServiceDefinitionModel::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_verb_rejected() {
        let yaml = r#"
services:
  - name: Greeter
    methods:
      - name: A
        request_type: R
        response_type: S
        http: { method: FETCH, path: /a }
"#;
        assert!(ServiceDefinitionModel::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_derived_module() {
        let model = ServiceDefinitionModel::from_yaml(GREETER).unwrap();
        assert_eq!(model.derived_module().as_deref(), Some("github.com/acme/greeter"));

        let flat = ServiceDefinitionModel {
            package: Some("github.com/acme/greeter/model".into()),
            ..Default::default()
        };
        assert_eq!(flat.derived_module().as_deref(), Some("github.com/acme/greeter"));
        assert_eq!(ServiceDefinitionModel::default().derived_module(), None);
    }
}
