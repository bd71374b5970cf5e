//! Typed description of the GrandMA2 console Lua API.
//!
//! The console exposes a fixed set of host functions under the `gma` table.
//! This crate declares that surface as data, builds a validated
//! [`ApiRegistry`] from it and offers the tooling built on top: overload
//! resolution, operator-marker translation, call-convention checks, EmmyLua
//! stubs and a dry-run probe host.
//!
//! # Example
//!
//! ```
//! use gma_lua_api::{ApiRegistry, ValueType};
//!
//! let registry = ApiRegistry::gma2().unwrap();
//! let handle = registry.parse_type("handle").unwrap();
//! let label = registry.resolve("gma.show.getobj.label", &[handle]).unwrap();
//! assert!(label.returns.is_nilable());
//!
//! let dmx = registry.resolve("gma.show.getdmx", &[ValueType::NUMBER]).unwrap();
//! assert_eq!(dmx.returns.to_string(), "number");
//! ```

pub mod api_data;
pub mod api_registry;
pub mod call_check;
pub mod config;
pub mod emmylua;
pub mod error;
pub mod lua_api_schema;
pub mod operators;
mod overloads;
pub mod probe;
pub mod value_types;

pub use api_data::GMA2_LUA_API;
pub use api_registry::{ApiRegistry, Namespace, Param, Signature};
pub use call_check::{
    CallChecker, CallManifest, CallSite, Diagnostic, Lint, LintLevel, LintPolicy, ManifestError,
    ResultUsage, Severity,
};
pub use config::{ConfigError, ToolConfig};
pub use error::{RegistryError, ResolveError};
pub use operators::{InfixOperator, TranslateError, Translation, Translator};
pub use probe::{ExecutionLimits, ProbeRuntime, RecordedCall};
pub use value_types::{Primitive, ReturnType, TypeAlias, ValueType};
