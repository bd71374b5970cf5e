//! EmmyLua annotation stubs for editor completion.

use std::fmt;

use crate::api_registry::{ApiRegistry, Signature};
use crate::value_types::ReturnType;

/// Render the whole registry as a `---@meta` stub file.
pub fn generate(registry: &ApiRegistry) -> String {
    Stubs(registry).to_string()
}

/// Stub file for a registry, rendered through `Display`.
pub struct Stubs<'r>(pub &'r ApiRegistry);

impl fmt::Display for Stubs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.0;
        writeln!(f, "---@meta")?;
        writeln!(f, "-- Generated from the registered host API. Do not edit.")?;

        for alias in registry.aliases() {
            writeln!(f)?;
            if !alias.description.is_empty() {
                writeln!(f, "---{}", alias.description)?;
            }
            writeln!(f, "---@alias {} {}", alias.name, alias.base.name())?;
        }

        for ns in registry.namespaces() {
            writeln!(f)?;
            if !ns.description.is_empty() {
                writeln!(f, "---{}", ns.description)?;
            }
            writeln!(f, "---@class {}", ns.path)?;
            writeln!(f, "{} = {{}}", ns.path)?;

            for name in ns.function_names() {
                let Some(overloads) = ns.overloads(name) else {
                    continue;
                };
                let Some((primary, rest)) = overloads.split_first() else {
                    continue;
                };
                writeln!(f)?;
                write_function(f, primary, rest)?;
            }
        }
        Ok(())
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, primary: &Signature, rest: &[&Signature]) -> fmt::Result {
    if !primary.description.is_empty() {
        writeln!(f, "---{}", primary.description)?;
    }
    if let Some(op) = primary.operator {
        writeln!(f, "---Not callable on the host: rewritten to `{}`", op.rewrite("left", "right"))?;
    }
    for param in &primary.params {
        if param.variadic {
            writeln!(f, "---@param ... {}", param.ty)?;
        } else if param.optional {
            writeln!(f, "---@param {}? {}", param.name, param.ty)?;
        } else {
            writeln!(f, "---@param {} {}", param.name, param.ty)?;
        }
    }
    if primary.returns != ReturnType::Nothing {
        writeln!(f, "---@return {}", primary.returns)?;
    }
    for overload in rest {
        writeln!(f, "---@overload {}", FunType(overload))?;
    }

    let names: Vec<&str> = primary
        .params
        .iter()
        .map(|p| if p.variadic { "..." } else { p.name })
        .collect();
    writeln!(f, "function {}({}) end", primary.path, names.join(", "))
}

/// `fun(a: T, b?: U): R`
struct FunType<'a>(&'a Signature);

impl fmt::Display for FunType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fun(")?;
        for (i, param) in self.0.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if param.variadic {
                write!(f, "...: {}", param.ty)?;
            } else if param.optional {
                write!(f, "{}?: {}", param.name, param.ty)?;
            } else {
                write!(f, "{}: {}", param.name, param.ty)?;
            }
        }
        f.write_str(")")?;
        if self.0.returns != ReturnType::Nothing {
            write!(f, ": {}", self.0.returns)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::lua_api_schema::{
        AliasKind, AliasSchema, FunctionSchema, LuaApiSchema, NamespaceSchema, ParamSchema,
        ReturnSchema,
    };

    const SMALL: LuaApiSchema = LuaApiSchema {
        namespaces: &[
            NamespaceSchema {
                path: "host",
                description: "Host functions",
                functions: &[
                    FunctionSchema::new(
                        "log",
                        "Write to the log",
                        &[ParamSchema::variadic("any")],
                        None,
                    ),
                    FunctionSchema::new(
                        "run",
                        "Run a command",
                        &[ParamSchema::required("command", "string")],
                        ReturnSchema::of("error"),
                    ),
                ],
            },
            NamespaceSchema {
                path: "host.obj",
                description: "",
                functions: &[
                    FunctionSchema::new(
                        "find",
                        "Find an object",
                        &[ParamSchema::required("name", "string")],
                        ReturnSchema::of("handle?"),
                    ),
                    FunctionSchema::new(
                        "find",
                        "Find an object",
                        &[
                            ParamSchema::required("handle", "handle"),
                            ParamSchema::optional("deep", "boolean"),
                        ],
                        ReturnSchema::of("handle?"),
                    ),
                ],
            },
        ],
        aliases: &[
            AliasSchema {
                name: "handle",
                ty: "number",
                description: "Reference to a host object",
                kind: AliasKind::OpaqueHandle,
            },
            AliasSchema {
                name: "error",
                ty: "string",
                description: "",
                kind: AliasKind::ErrorMessage,
            },
        ],
    };

    #[test]
    fn small_schema_stubs() {
        let registry = ApiRegistry::build(&SMALL).unwrap();
        assert_snapshot!(generate(&registry), @r"
        ---@meta
        -- Generated from the registered host API. Do not edit.

        ---Reference to a host object
        ---@alias handle number

        ---@alias error string

        ---Host functions
        ---@class host
        host = {}

        ---Write to the log
        ---@param ... any
        function host.log(...) end

        ---Run a command
        ---@param command string
        ---@return error
        function host.run(command) end

        ---@class host.obj
        host.obj = {}

        ---Find an object
        ---@param name string
        ---@return handle?
        ---@overload fun(handle: handle, deep?: boolean): handle?
        function host.obj.find(name) end
        ");
    }

    #[test]
    fn gma2_stubs_cover_every_function() {
        let registry = ApiRegistry::gma2().unwrap();
        let stubs = generate(&registry);

        assert!(stubs.starts_with("---@meta\n"));
        assert!(stubs.contains("---@alias handle number\n"));
        assert!(stubs.contains("gma.show.getobj = {}\n"));
        assert!(stubs.contains("---@overload fun(recycle: table, dmx_addr: number, amount: number): table\n"));
        assert!(stubs.contains("---@return string?\n"));
        assert!(stubs.contains("---Not callable on the host: rewritten to `left // right`\n"));

        for ns in registry.namespaces() {
            for name in ns.function_names() {
                let decl = format!("function {}.{}(", ns.path, name);
                assert_eq!(stubs.matches(&decl).count(), 1, "{decl}");
                let overloads = ns.overloads(name).unwrap().len();
                let section = stubs.split(&decl).next().unwrap();
                let tail = section.rsplit("\n\n").next().unwrap();
                assert_eq!(tail.matches("---@overload").count(), overloads - 1, "{decl}");
            }
        }
    }

    #[test]
    fn stubs_are_valid_lua() {
        let registry = ApiRegistry::gma2().unwrap();
        let lua = mlua::Lua::new();
        lua.load(generate(&registry).as_str()).exec().unwrap();
        let show: mlua::Table = lua
            .globals()
            .get::<mlua::Table>("gma")
            .unwrap()
            .get("show")
            .unwrap();
        assert!(show.get::<mlua::Function>("getdmx").is_ok());
    }
}
