// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # layergen: layered templates for HTTP service scaffolding
//!
//! Generates handler, router and client source files for HTTP services
//! described in an IDL, from built-in templates that users can override
//! file by file. Regeneration respects hand edits: each template declares
//! what happens to a file that already exists.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use layergen::{GenerationConfig, MemoryFs, ServiceDefinitionModel};
//!
//! let sdm = ServiceDefinitionModel::from_yaml(r#"
//!   package: github.com/acme/greeter/biz/model
//!   services:
//!     - name: Greeter
//!       methods:
//!         - name: SayHello
//!           request_type: HelloReq
//!           response_type: HelloResp
//! "#)?;
//!
//! let mut fs = MemoryFs::new();
//! let report = layergen::run(&GenerationConfig::default(), &sdm, &mut fs)?;
//! assert!(fs.get("biz/handler/say_hello.go").is_some());
//! ```
//!
//! ## Regeneration
//!
//! | existing file | `skip`  | `cover` / `overwrite` | `append`              |
//! |---------------|---------|-----------------------|-----------------------|
//! | absent        | write   | write                 | write                 |
//! | present       | keep    | replace               | merge at the anchor   |
//!
//! A fresh project (`command=new`, or neither the handler nor the router
//! directory exists) is laid out first and then every artifact is
//! overwritten. An existing project is updated following each template's
//! declared behavior.
//!
//! ## Architecture
//!
//! ```text
//! config ──► GenerationContext ─┐
//! sdm ─────► ProjectView ───────┼──► planner ──► GenerationRequest
//! templates::TemplateRegistry ──┘                    │
//!                                                    ▼
//!                              Renderer ──► policy::decide ──► FileSystem
//!                                                    │
//!                                                    ▼
//!                                                RunReport
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod generator;
pub mod layout;
pub mod planner;
pub mod policy;
pub mod report;
pub mod sdm;
pub mod templates;
pub mod util;

pub use config::{CommandMode, GenerationConfig, GenerationContext};
pub use error::{Error, PolicyError, Result};
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use generator::{resolve_mode, run, Generator};
pub use planner::{plan, GenerationRequest, Planner};
pub use policy::Decision;
pub use report::{ArtifactResult, FailureKind, Outcome, RunReport, RunStatus};
pub use sdm::{HttpRule, MethodDefinition, ServiceDefinition, ServiceDefinitionModel};
pub use templates::{
    OverrideDocument, Renderer, TemplateRegistry, TemplateSpec, UpdateBehavior,
};

/// Version of layergen
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
