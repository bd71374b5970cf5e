// Lua API schema definitions.
//
// These are the static declaration types the console surface is written in
// (see `api_data.rs`). They carry type names as strings in EmmyLua syntax;
// `ApiRegistry::build` resolves and validates them.

use crate::operators::InfixOperator;

/// Complete schema of a host Lua API.
#[derive(Debug, Clone)]
pub struct LuaApiSchema {
    /// Namespaces in declaration order. Parents must precede their children.
    pub namespaces: &'static [NamespaceSchema],
    /// Named aliases of primitive types (handle, error, success)
    pub aliases: &'static [AliasSchema],
}

/// Schema for a Lua namespace table.
#[derive(Debug, Clone)]
pub struct NamespaceSchema {
    /// Dotted path (e.g. "gma", "gma.show.property")
    pub path: &'static str,
    /// Namespace description
    pub description: &'static str,
    /// Functions declared directly in this namespace. Repeated names are overloads.
    pub functions: &'static [FunctionSchema],
}

/// Schema for one call shape of a function.
#[derive(Debug, Clone)]
pub struct FunctionSchema {
    /// Name as seen by Lua
    pub name: &'static str,
    /// Function description
    pub description: &'static str,
    /// Parameters in call order
    pub params: &'static [ParamSchema],
    /// Return value, `None` for functions returning nothing
    pub returns: Option<ReturnSchema>,
    /// Set on operator-translation markers: calls must become this infix operator
    pub operator: Option<InfixOperator>,
}

impl FunctionSchema {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        params: &'static [ParamSchema],
        returns: Option<ReturnSchema>,
    ) -> Self {
        Self {
            name,
            description,
            params,
            returns,
            operator: None,
        }
    }

    /// Mark this entry as an operator-translation marker.
    pub const fn translated_to(mut self, operator: InfixOperator) -> Self {
        self.operator = Some(operator);
        self
    }
}

/// Schema for a function parameter.
#[derive(Debug, Clone)]
pub struct ParamSchema {
    /// Parameter name; `...` declares a trailing variadic parameter
    pub name: &'static str,
    /// Parameter type name
    pub ty: &'static str,
    /// Whether the parameter may be omitted
    pub optional: bool,
}

impl ParamSchema {
    pub const fn required(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, ty: &'static str) -> Self {
        Self {
            name,
            ty,
            optional: true,
        }
    }

    pub const fn variadic(ty: &'static str) -> Self {
        Self {
            name: "...",
            ty,
            optional: true,
        }
    }
}

/// Schema for a function return value.
#[derive(Debug, Clone)]
pub struct ReturnSchema {
    /// Return type name; a trailing `?` marks a nilable result
    pub ty: &'static str,
}

impl ReturnSchema {
    pub const fn of(ty: &'static str) -> Option<Self> {
        Some(Self { ty })
    }
}

/// What a type alias means to callers beyond its base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AliasKind {
    /// Just another name for the base type.
    #[default]
    Plain,
    /// Reference to a host object. Only the host may compare or validate it.
    OpaqueHandle,
    /// Command result: empty string on success, failure message otherwise.
    ErrorMessage,
    /// Boolean success flag.
    SuccessFlag,
}

/// Schema for a type alias.
#[derive(Debug, Clone)]
pub struct AliasSchema {
    /// Alias name
    pub name: &'static str,
    /// Aliased primitive type name
    pub ty: &'static str,
    /// Alias description
    pub description: &'static str,
    /// Calling convention carried by the alias
    pub kind: AliasKind,
}
