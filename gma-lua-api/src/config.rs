//! Tool configuration.
//!
//! The configuration is a Lua file that returns a table:
//!
//! ```lua
//! return {
//!     lint = { unchecked_nilable = "deny", discarded_error = "warn" },
//!     probe = { timeout_ms = 500 },
//! }
//! ```
//!
//! Missing sections and fields keep their defaults. The file runs in a bare
//! Luau state with only the safe standard libraries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gma_lua_traits::{extract_int_opt, extract_parsed_opt, ExtractField, FromLuaTable};
use log::{debug, info};
use mlua::prelude::*;

use crate::call_check::{LintLevel, LintPolicy};
use crate::probe::ExecutionLimits;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file failed to evaluate or a field was malformed.
    #[error("invalid config {name}: {message}")]
    Lua { name: String, message: String },

    #[error("config {name} must return a table, got {found}")]
    NotATable { name: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_ms: 1000 }
    }
}

impl ProbeConfig {
    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits::with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolConfig {
    pub lint: LintPolicy,
    pub probe: ProbeConfig,
}

impl FromLuaTable for LintPolicy {
    fn from_lua_table(table: &LuaTable) -> LuaResult<Option<Self>> {
        let unchecked_nilable = extract_parsed_opt::<LintLevel>(table, "unchecked_nilable")?;
        let discarded_error = extract_parsed_opt::<LintLevel>(table, "discarded_error")?;
        let handle_arithmetic = extract_parsed_opt::<LintLevel>(table, "handle_arithmetic")?;

        if unchecked_nilable.is_none() && discarded_error.is_none() && handle_arithmetic.is_none() {
            return Ok(None);
        }

        let defaults = LintPolicy::default();
        Ok(Some(LintPolicy {
            unchecked_nilable: unchecked_nilable.unwrap_or(defaults.unchecked_nilable),
            discarded_error: discarded_error.unwrap_or(defaults.discarded_error),
            handle_arithmetic: handle_arithmetic.unwrap_or(defaults.handle_arithmetic),
        }))
    }
}

impl FromLuaTable for ProbeConfig {
    fn from_lua_table(table: &LuaTable) -> LuaResult<Option<Self>> {
        let Some(timeout_ms) = extract_int_opt(table, "timeout_ms")? else {
            return Ok(None);
        };
        let timeout_ms = u64::try_from(timeout_ms).map_err(|_| {
            LuaError::external(format!("timeout_ms must not be negative, got {timeout_ms}"))
        })?;
        Ok(Some(ProbeConfig { timeout_ms }))
    }
}

impl FromLuaTable for ToolConfig {
    fn from_lua_table(table: &LuaTable) -> LuaResult<Option<Self>> {
        let lint: Option<LintPolicy> = table.extract_field("lint")?;
        let probe: Option<ProbeConfig> = table.extract_field("probe")?;
        if lint.is_none() && probe.is_none() {
            return Ok(None);
        }
        Ok(Some(ToolConfig {
            lint: lint.unwrap_or_default(),
            probe: probe.unwrap_or_default(),
        }))
    }
}

impl ToolConfig {
    /// Evaluate `source` and decode the table it returns.
    ///
    /// A chunk returning nothing yields the defaults.
    pub fn from_lua_source(source: &str, name: &str) -> Result<Self, ConfigError> {
        let lua_error = |e: LuaError| ConfigError::Lua {
            name: name.to_string(),
            message: e.to_string(),
        };

        let lua = Lua::new();
        lua.load_std_libs(LuaStdLib::ALL_SAFE).map_err(lua_error)?;

        let value: LuaValue = lua.load(source).set_name(name).eval().map_err(lua_error)?;
        match value {
            LuaValue::Nil => Ok(Self::default()),
            LuaValue::Table(table) => Self::from_lua_table_or_default(&table).map_err(lua_error),
            other => Err(ConfigError::NotATable {
                name: name.to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_lua_source(&source, &path.display().to_string())?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/gma-lua/config.lua` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gma-lua").join("config.lua"))
    }

    /// Load an explicit config file, or the default one if it exists.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}
