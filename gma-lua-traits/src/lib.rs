//! Shared traits and helpers for reading Lua tables into Rust values.
//!
//! `gma-lua-api` uses these to decode the tool configuration, which is written
//! as a Lua file returning a table. Unlike permissive extraction, a field that
//! is present with the wrong Lua type is an error: a typo in a config file
//! should not silently fall back to a default.

use std::str::FromStr;

use mlua::prelude::*;

/// Types that can be constructed from a Lua table.
///
/// Implementations return `Ok(Some(Self))` if any relevant field was present,
/// `Ok(None)` if the table had none of them, and `Err` if a field was malformed.
pub trait FromLuaTable: Sized {
    /// Extract this type from a Lua table.
    fn from_lua_table(table: &LuaTable) -> LuaResult<Option<Self>>;

    /// Extract this type, returning default if no fields present.
    fn from_lua_table_or_default(table: &LuaTable) -> LuaResult<Self>
    where
        Self: Default,
    {
        Ok(Self::from_lua_table(table)?.unwrap_or_default())
    }
}

/// Extracting a nested table field as a [`FromLuaTable`] type.
pub trait ExtractField<T> {
    fn extract_field(&self, field: &str) -> LuaResult<Option<T>>;
}

impl<T> ExtractField<T> for LuaTable
where
    T: FromLuaTable,
{
    fn extract_field(&self, field: &str) -> LuaResult<Option<T>> {
        match self.get::<LuaValue>(field)? {
            LuaValue::Nil => Ok(None),
            LuaValue::Table(table) => T::from_lua_table(&table),
            other => Err(type_mismatch(field, "table", &other)),
        }
    }
}

fn type_mismatch(field: &str, expected: &str, found: &LuaValue) -> LuaError {
    LuaError::external(format!(
        "expected {expected} for field '{field}', found {}",
        found.type_name()
    ))
}

/// Extract an optional string field.
pub fn extract_string_opt(table: &LuaTable, field: &str) -> LuaResult<Option<String>> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Nil => Ok(None),
        LuaValue::String(s) => Ok(Some(s.to_string_lossy().to_string())),
        other => Err(type_mismatch(field, "string", &other)),
    }
}

/// Extract an optional boolean field.
pub fn extract_bool_opt(table: &LuaTable, field: &str) -> LuaResult<Option<bool>> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Nil => Ok(None),
        LuaValue::Boolean(b) => Ok(Some(b)),
        other => Err(type_mismatch(field, "boolean", &other)),
    }
}

/// Extract an optional integer field. Numbers with a fractional part are rejected.
pub fn extract_int_opt(table: &LuaTable, field: &str) -> LuaResult<Option<i64>> {
    match table.get::<LuaValue>(field)? {
        LuaValue::Nil => Ok(None),
        LuaValue::Integer(i) => Ok(Some(i)),
        LuaValue::Number(n) if n.fract() == 0.0 => Ok(Some(n as i64)),
        other => Err(type_mismatch(field, "integer", &other)),
    }
}

/// Types that can be parsed from a Lua string value (lint levels, modes).
pub trait FromLuaString: Sized {
    fn from_lua_string(s: &str) -> Option<Self>;
}

impl<T> FromLuaString for T
where
    T: FromStr,
{
    fn from_lua_string(s: &str) -> Option<Self> {
        T::from_str(s).ok()
    }
}

/// Extract a string field and parse it, failing on values that do not parse.
pub fn extract_parsed_opt<T: FromLuaString>(
    table: &LuaTable,
    field: &str,
) -> LuaResult<Option<T>> {
    match extract_string_opt(table, field)? {
        Some(s) => T::from_lua_string(&s)
            .map(Some)
            .ok_or_else(|| LuaError::external(format!("invalid value '{s}' for field '{field}'"))),
        None => Ok(None),
    }
}
