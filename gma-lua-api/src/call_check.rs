//! Call-convention checks for consumer call sites.
//!
//! The registry types two conventions the host never enforces: queries that
//! may have no answer return a nilable value, and command entry points return
//! an error message that is empty on success. [`CallChecker`] turns those
//! declarations into diagnostics for code that ignores them, plus the handle
//! rule: handles are compared through `gma.show.getobj.compare`, not numerically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api_registry::ApiRegistry;
use crate::error::ResolveError;
use crate::lua_api_schema::AliasKind;
use crate::value_types::{ReturnType, ValueType};

/// Convention lints with configurable levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lint {
    /// Nilable result used as a value without a presence check.
    UncheckedNilable,
    /// Error message result thrown away.
    DiscardedError,
    /// Opaque handle compared numerically or used in arithmetic.
    HandleArithmetic,
}

impl Lint {
    pub fn name(self) -> &'static str {
        match self {
            Lint::UncheckedNilable => "unchecked-nilable",
            Lint::DiscardedError => "discarded-error",
            Lint::HandleArithmetic => "handle-arithmetic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Allow,
    Warn,
    Deny,
}

impl FromStr for LintLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(LintLevel::Allow),
            "warn" => Ok(LintLevel::Warn),
            "deny" => Ok(LintLevel::Deny),
            other => Err(format!("unknown lint level '{other}'")),
        }
    }
}

/// Level per lint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintPolicy {
    pub unchecked_nilable: LintLevel,
    pub discarded_error: LintLevel,
    pub handle_arithmetic: LintLevel,
}

impl Default for LintPolicy {
    fn default() -> Self {
        Self {
            unchecked_nilable: LintLevel::Deny,
            discarded_error: LintLevel::Warn,
            handle_arithmetic: LintLevel::Deny,
        }
    }
}

impl LintPolicy {
    pub fn level(&self, lint: Lint) -> LintLevel {
        match lint {
            Lint::UncheckedNilable => self.unchecked_nilable,
            Lint::DiscardedError => self.discarded_error,
            Lint::HandleArithmetic => self.handle_arithmetic,
        }
    }
}

/// How a call site uses the returned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultUsage {
    /// The result is thrown away.
    Discarded,
    /// The caller tests the result (nil check, branching on content) before use.
    Checked,
    /// The result is used directly, optionally where a specific type is expected.
    Value(Option<ValueType>),
    /// The result is compared with `==`, `<` and friends.
    Compared,
    /// The result is an arithmetic operand.
    Arithmetic,
}

/// A call written against the host API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub path: String,
    pub args: Vec<ValueType>,
    pub usage: ResultUsage,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<Lint>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.line {
            Some(line) => write!(f, "{severity}: line {line}: {}: {}", self.path, self.message)?,
            None => write!(f, "{severity}: {}: {}", self.path, self.message)?,
        }
        if let Some(lint) = self.lint {
            write!(f, " [{}]", lint.name())?;
        }
        Ok(())
    }
}

/// Checks call sites against a registry.
pub struct CallChecker<'r> {
    registry: &'r ApiRegistry,
    policy: LintPolicy,
}

impl<'r> CallChecker<'r> {
    pub fn new(registry: &'r ApiRegistry, policy: LintPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn check_all<'a>(&self, sites: impl IntoIterator<Item = &'a CallSite>) -> Vec<Diagnostic> {
        sites.into_iter().flat_map(|site| self.check(site)).collect()
    }

    pub fn check(&self, site: &CallSite) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let error = |message: String| Diagnostic {
            severity: Severity::Error,
            lint: None,
            path: site.path.clone(),
            line: site.line,
            message,
        };

        let signature = match self.registry.resolve(&site.path, &site.args) {
            Ok(signature) => signature,
            Err(err) => {
                diagnostics.push(error(err.to_string()));
                return diagnostics;
            }
        };

        if let Some(op) = signature.operator {
            diagnostics.push(error(format!(
                "operator marker must be translated to `{}` before execution",
                op.rewrite("left", "right")
            )));
            return diagnostics;
        }

        let returns = signature.returns;
        let value = returns.value_type();

        match (site.usage, returns) {
            (ResultUsage::Discarded, _) => {
                if value.is_some_and(|ty| ty.kind() == AliasKind::ErrorMessage) {
                    self.lint(
                        &mut diagnostics,
                        site,
                        Lint::DiscardedError,
                        "command result discarded; an empty string means success, anything else is the failure message".to_string(),
                    );
                }
            }
            (_, ReturnType::Nothing) => {
                diagnostics.push(error("function returns no value".to_string()));
            }
            (ResultUsage::Checked, _) => {}
            (ResultUsage::Value(expected), returns) => {
                if let (Some(expected), Some(actual)) = (expected, value) {
                    if !expected.accepts(actual) {
                        diagnostics.push(error(format!(
                            "returns {actual}, used where {expected} is expected"
                        )));
                    }
                }
                if returns.is_nilable() {
                    self.lint(
                        &mut diagnostics,
                        site,
                        Lint::UncheckedNilable,
                        format!("result is {returns} and may be nil; check it before use"),
                    );
                }
            }
            (ResultUsage::Compared | ResultUsage::Arithmetic, returns) => {
                if value.is_some_and(|ty| ty.kind() == AliasKind::OpaqueHandle) {
                    self.lint(
                        &mut diagnostics,
                        site,
                        Lint::HandleArithmetic,
                        "handles are opaque; use gma.show.getobj.compare or verify".to_string(),
                    );
                } else if returns.is_nilable() {
                    self.lint(
                        &mut diagnostics,
                        site,
                        Lint::UncheckedNilable,
                        format!("result is {returns} and may be nil; check it before use"),
                    );
                }
            }
        }

        diagnostics
    }

    fn lint(&self, diagnostics: &mut Vec<Diagnostic>, site: &CallSite, lint: Lint, message: String) {
        let severity = match self.policy.level(lint) {
            LintLevel::Allow => return,
            LintLevel::Warn => Severity::Warning,
            LintLevel::Deny => Severity::Error,
        };
        diagnostics.push(Diagnostic {
            severity,
            lint: Some(lint),
            path: site.path.clone(),
            line: site.line,
            message,
        });
    }
}

/// A manifest entry that does not describe a call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("unknown usage '{0}' (expected discard, checked, value, value:<type>, compare or arith)")]
    UnknownUsage(String),

    #[error(transparent)]
    Type(#[from] ResolveError),
}

/// Call sites as written by an external analyzer, with type names as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct CallManifest {
    pub calls: Vec<CallSiteSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallSiteSpec {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// `discard`, `checked`, `value`, `value:<type>`, `compare` or `arith`
    #[serde(default = "default_usage")]
    pub usage: String,
    #[serde(default)]
    pub line: Option<u32>,
}

fn default_usage() -> String {
    "discard".to_string()
}

impl CallSiteSpec {
    pub fn to_call_site(&self, registry: &ApiRegistry) -> Result<CallSite, ManifestError> {
        let args = self
            .args
            .iter()
            .map(|name| registry.parse_type(name))
            .collect::<Result<Vec<_>, _>>()?;
        let usage = match self.usage.split_once(':') {
            Some(("value", ty)) => ResultUsage::Value(Some(registry.parse_type(ty)?)),
            _ => match self.usage.as_str() {
                "discard" => ResultUsage::Discarded,
                "checked" => ResultUsage::Checked,
                "value" => ResultUsage::Value(None),
                "compare" => ResultUsage::Compared,
                "arith" => ResultUsage::Arithmetic,
                other => return Err(ManifestError::UnknownUsage(other.to_string())),
            },
        };
        Ok(CallSite {
            path: self.path.clone(),
            args,
            usage,
            line: self.line,
        })
    }
}
