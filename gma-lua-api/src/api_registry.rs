//! Built, validated form of a [`LuaApiSchema`].
//!
//! [`ApiRegistry::build`] resolves every type name, checks the namespace tree
//! and rejects ambiguous overload sets. The result is immutable; tooling
//! constructs it once and passes it by reference wherever calls are checked.

use std::fmt;

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::api_data::GMA2_LUA_API;
use crate::error::{RegistryError, ResolveError};
use crate::lua_api_schema::{FunctionSchema, LuaApiSchema, NamespaceSchema};
use crate::operators::InfixOperator;
use crate::overloads;
use crate::value_types::{Primitive, ReturnType, TypeAlias, ValueType};

/// A resolved function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub ty: ValueType,
    pub optional: bool,
    pub variadic: bool,
}

/// One call shape of a host function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    /// Full dotted path, e.g. `gma.show.getdmx`
    pub path: String,
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<Param>,
    pub returns: ReturnType,
    /// Set on operator-translation markers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<InfixOperator>,
}

impl Signature {
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// Smallest accepted argument count.
    pub fn min_arity(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    /// Largest accepted argument count, `None` if variadic.
    pub fn max_arity(&self) -> Option<usize> {
        if self.is_variadic() {
            None
        } else {
            Some(self.params.len())
        }
    }

    pub fn accepts_arity(&self, n: usize) -> bool {
        n >= self.min_arity() && self.max_arity().map_or(true, |max| n <= max)
    }

    /// Declared type of the argument at `index`, repeating a variadic tail.
    pub fn param_type_at(&self, index: usize) -> Option<ValueType> {
        match self.params.get(index) {
            Some(param) => Some(param.ty),
            None => self.params.last().filter(|p| p.variadic).map(|p| p.ty),
        }
    }

    /// Whether a call with `n` arguments uses exactly the declared parameters.
    pub fn is_exact_arity(&self, n: usize) -> bool {
        !self.is_variadic() && n == self.params.len()
    }

    pub fn is_marker(&self) -> bool {
        self.operator.is_some()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.path)?;
        for (i, param) in self.params.iter().enumerate() {
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
        if self.returns != ReturnType::Nothing {
            write!(f, ": {}", self.returns)?;
        }
        Ok(())
    }
}

/// A namespace table and the signatures declared directly in it.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub path: String,
    pub description: &'static str,
    signatures: Vec<Signature>,
    /// Function name to indices into `signatures`, in declaration order.
    functions: IndexMap<&'static str, Vec<usize>>,
    children: Vec<String>,
}

impl Namespace {
    /// Last path segment, the key under which the parent stores this table.
    pub fn name(&self) -> &str {
        self.path.rsplit_once('.').map_or(self.path.as_str(), |(_, name)| name)
    }

    pub fn parent(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// Every declared signature in declaration order, one entry per overload.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &Signature)> + '_ {
        self.signatures.iter().map(|sig| (sig.name, sig))
    }

    /// Distinct function names in declaration order.
    pub fn function_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    /// All overloads of `name`, in declaration order.
    pub fn overloads(&self, name: &str) -> Option<Vec<&Signature>> {
        self.functions
            .get(name)
            .map(|indices| indices.iter().map(|&i| &self.signatures[i]).collect())
    }

    /// Paths of direct child namespaces.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Validated, immutable API surface.
#[derive(Debug, Clone)]
pub struct ApiRegistry {
    namespaces: IndexMap<String, Namespace>,
    aliases: IndexMap<&'static str, TypeAlias>,
}

impl ApiRegistry {
    /// Registry for the GrandMA2 console API.
    pub fn gma2() -> Result<Self, RegistryError> {
        Self::build(&GMA2_LUA_API)
    }

    /// Validate `schema` and build the registry.
    ///
    /// # Errors
    ///
    /// Returns the first structural defect found; see [`RegistryError`].
    pub fn build(schema: &LuaApiSchema) -> Result<Self, RegistryError> {
        let mut registry = ApiRegistry {
            namespaces: IndexMap::new(),
            aliases: IndexMap::new(),
        };

        for alias in schema.aliases {
            if Primitive::from_name(alias.name).is_some()
                || registry.aliases.contains_key(alias.name)
            {
                return Err(RegistryError::DuplicateAlias {
                    name: alias.name.to_string(),
                });
            }
            let base = Primitive::from_name(alias.ty).ok_or_else(|| RegistryError::UnknownType {
                ty: alias.ty.to_string(),
                context: format!("alias '{}'", alias.name),
            })?;
            registry.aliases.insert(
                alias.name,
                TypeAlias {
                    name: alias.name,
                    base,
                    kind: alias.kind,
                    description: alias.description,
                },
            );
        }

        for ns in schema.namespaces {
            registry.add_namespace(ns)?;
        }

        for ns in registry.namespaces.values() {
            for child in &ns.children {
                let (_, name) = child.rsplit_once('.').unwrap_or(("", child.as_str()));
                if ns.functions.contains_key(name) {
                    return Err(RegistryError::PathConflict {
                        path: child.clone(),
                    });
                }
            }
            for indices in ns.functions.values() {
                let overloads: Vec<&Signature> =
                    indices.iter().map(|&i| &ns.signatures[i]).collect();
                if let Some(conflict) = overloads::find_conflict(&overloads) {
                    return Err(RegistryError::AmbiguousOverload {
                        path: conflict.first.path.clone(),
                        arity: conflict.arity,
                        first: conflict.first.to_string(),
                        second: conflict.second.to_string(),
                    });
                }
            }
        }

        debug!(
            "Built API registry: {} namespaces, {} signatures, {} aliases",
            registry.namespaces.len(),
            registry.namespaces.values().map(Namespace::len).sum::<usize>(),
            registry.aliases.len()
        );

        Ok(registry)
    }

    fn add_namespace(&mut self, schema: &NamespaceSchema) -> Result<(), RegistryError> {
        let path = schema.path;
        if self.namespaces.contains_key(path) {
            return Err(RegistryError::DuplicateNamespace {
                path: path.to_string(),
            });
        }
        if let Some((parent, _)) = path.rsplit_once('.') {
            let Some(parent_ns) = self.namespaces.get_mut(parent) else {
                return Err(RegistryError::MissingParent {
                    path: path.to_string(),
                    parent: parent.to_string(),
                });
            };
            parent_ns.children.push(path.to_string());
        }

        let mut namespace = Namespace {
            path: path.to_string(),
            description: schema.description,
            signatures: Vec::with_capacity(schema.functions.len()),
            functions: IndexMap::new(),
            children: Vec::new(),
        };

        for func in schema.functions {
            let signature = self.build_signature(path, func)?;
            let index = namespace.signatures.len();
            namespace.signatures.push(signature);
            namespace.functions.entry(func.name).or_default().push(index);
        }

        self.namespaces.insert(path.to_string(), namespace);
        Ok(())
    }

    fn build_signature(
        &self,
        namespace: &str,
        func: &FunctionSchema,
    ) -> Result<Signature, RegistryError> {
        let path = format!("{namespace}.{}", func.name);
        let mut params = Vec::with_capacity(func.params.len());
        let mut seen_optional = false;

        for (i, param) in func.params.iter().enumerate() {
            let variadic = param.name == "...";
            if variadic && i + 1 != func.params.len() {
                return Err(RegistryError::InvalidParameters {
                    path,
                    reason: "variadic parameter must be last".to_string(),
                });
            }
            if seen_optional && !param.optional {
                return Err(RegistryError::InvalidParameters {
                    path,
                    reason: format!("required parameter '{}' follows an optional one", param.name),
                });
            }
            seen_optional |= param.optional;

            let ty = self.parse_type(param.ty).map_err(|_| RegistryError::UnknownType {
                ty: param.ty.to_string(),
                context: format!("parameter '{}' of {path}", param.name),
            })?;
            params.push(Param {
                name: param.name,
                ty,
                optional: param.optional || variadic,
                variadic,
            });
        }

        let returns = match &func.returns {
            None => ReturnType::Nothing,
            Some(ret) => {
                let (name, nilable) = match ret.ty.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (ret.ty, false),
                };
                let ty = self.parse_type(name).map_err(|_| RegistryError::UnknownType {
                    ty: ret.ty.to_string(),
                    context: format!("return type of {path}"),
                })?;
                if nilable {
                    ReturnType::Nilable(ty)
                } else {
                    ReturnType::Value(ty)
                }
            }
        };

        Ok(Signature {
            path,
            name: func.name,
            description: func.description,
            params,
            returns,
            operator: func.operator,
        })
    }

    /// Resolve a type name: a primitive or a declared alias.
    pub fn parse_type(&self, name: &str) -> Result<ValueType, ResolveError> {
        if let Some(p) = Primitive::from_name(name) {
            return Ok(ValueType::Primitive(p));
        }
        self.aliases
            .get(name)
            .map(|alias| ValueType::Alias(*alias))
            .ok_or_else(|| ResolveError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Declared aliases in declaration order.
    pub fn aliases(&self) -> impl Iterator<Item = &TypeAlias> + '_ {
        self.aliases.values()
    }

    pub fn namespace(&self, path: &str) -> Result<&Namespace, ResolveError> {
        self.namespaces
            .get(path)
            .ok_or_else(|| ResolveError::NamespaceNotFound {
                path: path.to_string(),
            })
    }

    /// All namespaces, parents before children.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> + '_ {
        self.namespaces.values()
    }

    /// Declared `(name, signature)` entries of a namespace, in declaration order.
    ///
    /// Overloads appear once per signature. Calling again yields the same sequence.
    pub fn enumerate(
        &self,
        path: &str,
    ) -> Result<impl Iterator<Item = (&'static str, &Signature)> + '_, ResolveError> {
        Ok(self.namespace(path)?.entries())
    }

    /// Paths of the child namespaces of `path`.
    pub fn children(&self, path: &str) -> Result<&[String], ResolveError> {
        Ok(self.namespace(path)?.children())
    }

    /// All overloads declared for a dotted function path.
    pub fn overloads(&self, path: &str) -> Result<Vec<&Signature>, ResolveError> {
        let (namespace, name) = path.rsplit_once('.').ok_or_else(|| {
            ResolveError::FunctionNotFound {
                path: path.to_string(),
            }
        })?;
        self.namespace(namespace)?
            .overloads(name)
            .ok_or_else(|| ResolveError::FunctionNotFound {
                path: path.to_string(),
            })
    }

    /// Select the overload of `path` that a call with `args` dispatches to.
    ///
    /// Overloads whose declared parameter count equals the argument count are
    /// preferred; among those the unique most specific one wins.
    pub fn resolve(&self, path: &str, args: &[ValueType]) -> Result<&Signature, ResolveError> {
        let overloads = self.overloads(path)?;
        overloads::select(path, &overloads, args)
    }

    /// Declared return of a signature.
    pub fn describe_return(&self, signature: &Signature) -> ReturnType {
        signature.returns
    }

    /// Operator-translation markers: `(path, operator)` pairs.
    pub fn markers(&self) -> impl Iterator<Item = (&str, InfixOperator)> + '_ {
        self.namespaces
            .values()
            .flat_map(|ns| ns.signatures.iter())
            .filter_map(|sig| sig.operator.map(|op| (sig.path.as_str(), op)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua_api_schema::{AliasKind, AliasSchema, ParamSchema, ReturnSchema};

    fn registry() -> ApiRegistry {
        ApiRegistry::gma2().expect("GrandMA2 schema must build")
    }

    fn build_single(functions: &'static [FunctionSchema]) -> Result<ApiRegistry, RegistryError> {
        let namespaces: &'static [NamespaceSchema] = Box::leak(Box::new([NamespaceSchema {
            path: "t",
            description: "test",
            functions,
        }]));
        ApiRegistry::build(&LuaApiSchema {
            namespaces,
            aliases: &[AliasSchema {
                name: "handle",
                ty: "number",
                description: "handle",
                kind: AliasKind::OpaqueHandle,
            }],
        })
    }

    #[test]
    fn gma2_builds() {
        let registry = registry();
        assert_eq!(registry.namespaces().count(), 10);
        assert_eq!(registry.aliases().count(), 3);
    }

    #[test]
    fn label_return_is_nilable() {
        let registry = registry();
        let sig = registry
            .resolve("gma.show.getobj.label", &[registry.parse_type("handle").unwrap()])
            .unwrap();
        assert_eq!(
            registry.describe_return(sig),
            ReturnType::Nilable(ValueType::STRING)
        );
        assert_eq!(sig.to_string(), "gma.show.getobj.label(handle: handle): string?");
    }

    #[test]
    fn cmd_returns_error_message() {
        let registry = registry();
        let sig = registry.resolve("gma.cmd", &[ValueType::STRING]).unwrap();
        let ty = sig.returns.value_type().unwrap();
        assert_eq!(ty.kind(), AliasKind::ErrorMessage);
        assert_eq!(ty.base(), Primitive::String);
    }

    #[test]
    fn children_are_recorded() {
        let registry = registry();
        assert_eq!(
            registry.children("gma.show").unwrap(),
            &["gma.show.getobj".to_string(), "gma.show.property".to_string()]
        );
        assert_eq!(registry.namespace("gma.gui.progress").unwrap().name(), "progress");
        assert_eq!(registry.namespace("gma.gui.progress").unwrap().parent(), Some("gma.gui"));
        assert_eq!(registry.namespace("gma").unwrap().parent(), None);
    }

    #[test]
    fn enumerate_counts_every_declared_entry() {
        let registry = registry();
        assert_eq!(registry.enumerate("gma.show").unwrap().count(), 4);
        assert_eq!(registry.enumerate("gma.show.getobj").unwrap().count(), 12);
        assert_eq!(registry.enumerate("gma.show.property").unwrap().count(), 6);
        assert_eq!(registry.enumerate("gma.network").unwrap().count(), 11);
        assert_eq!(registry.enumerate("Lua").unwrap().count(), 2);
        assert!(matches!(
            registry.enumerate("gma.nope"),
            Err(ResolveError::NamespaceNotFound { .. })
        ));
    }

    #[test]
    fn markers_are_listed() {
        let registry = registry();
        let markers: Vec<_> = registry.markers().collect();
        assert_eq!(
            markers,
            vec![
                ("Lua.Modulo", InfixOperator::Modulo),
                ("Lua.FloorDiv", InfixOperator::FloorDivision)
            ]
        );
    }

    #[test]
    fn unknown_parameter_type_is_rejected() {
        static FUNCS: [FunctionSchema; 1] = [FunctionSchema::new(
            "f",
            "f",
            &[ParamSchema::required("x", "integer")],
            None,
        )];
        let err = build_single(&FUNCS).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownType {
                ty: "integer".to_string(),
                context: "parameter 'x' of t.f".to_string()
            }
        );
    }

    #[test]
    fn unknown_return_type_is_rejected() {
        static FUNCS: [FunctionSchema; 1] =
            [FunctionSchema::new("f", "f", &[], ReturnSchema::of("userdata?"))];
        assert!(matches!(
            build_single(&FUNCS),
            Err(RegistryError::UnknownType { .. })
        ));
    }

    #[test]
    fn variadic_must_be_last() {
        static FUNCS: [FunctionSchema; 1] = [FunctionSchema::new(
            "f",
            "f",
            &[ParamSchema::variadic("any"), ParamSchema::required("x", "number")],
            None,
        )];
        assert!(matches!(
            build_single(&FUNCS),
            Err(RegistryError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn required_after_optional_is_rejected() {
        static FUNCS: [FunctionSchema; 1] = [FunctionSchema::new(
            "f",
            "f",
            &[ParamSchema::optional("a", "number"), ParamSchema::required("b", "number")],
            None,
        )];
        assert!(matches!(
            build_single(&FUNCS),
            Err(RegistryError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn ambiguous_overloads_abort_construction() {
        static FUNCS: [FunctionSchema; 2] = [
            FunctionSchema::new("f", "by number", &[ParamSchema::required("x", "number")], None),
            FunctionSchema::new("f", "again", &[ParamSchema::required("y", "number")], None),
        ];
        let err = build_single(&FUNCS).unwrap_err();
        assert_eq!(
            err,
            RegistryError::AmbiguousOverload {
                path: "t.f".to_string(),
                arity: 1,
                first: "t.f(x: number)".to_string(),
                second: "t.f(y: number)".to_string(),
            }
        );
    }

    #[test]
    fn nil_in_shared_optional_position_is_ambiguous() {
        // f(h, nil) fits both: the handle wins the first position, the
        // optionals tie on the second.
        static FUNCS: [FunctionSchema; 2] = [
            FunctionSchema::new(
                "f",
                "by handle",
                &[
                    ParamSchema::required("h", "handle"),
                    ParamSchema::optional("s", "string"),
                ],
                None,
            ),
            FunctionSchema::new(
                "f",
                "by number",
                &[
                    ParamSchema::required("n", "number"),
                    ParamSchema::optional("t", "table"),
                ],
                None,
            ),
        ];
        let err = build_single(&FUNCS).unwrap_err();
        assert!(
            matches!(err, RegistryError::AmbiguousOverload { arity: 2, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn alias_refinement_is_not_ambiguous() {
        static FUNCS: [FunctionSchema; 2] = [
            FunctionSchema::new("f", "number", &[ParamSchema::required("x", "number")], None),
            FunctionSchema::new("f", "handle", &[ParamSchema::required("h", "handle")], None),
        ];
        let registry = build_single(&FUNCS).unwrap();
        let handle = registry.parse_type("handle").unwrap();
        assert_eq!(registry.resolve("t.f", &[handle]).unwrap().description, "handle");
        assert_eq!(
            registry.resolve("t.f", &[ValueType::NUMBER]).unwrap().description,
            "handle"
        );
    }

    #[test]
    fn duplicate_namespace_is_rejected() {
        static NAMESPACES: [NamespaceSchema; 2] = [
            NamespaceSchema {
                path: "a",
                description: "a",
                functions: &[],
            },
            NamespaceSchema {
                path: "a",
                description: "again",
                functions: &[],
            },
        ];
        let err = ApiRegistry::build(&LuaApiSchema {
            namespaces: &NAMESPACES,
            aliases: &[],
        })
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateNamespace {
                path: "a".to_string()
            }
        );
    }

    #[test]
    fn child_before_parent_is_rejected() {
        static NAMESPACES: [NamespaceSchema; 1] = [NamespaceSchema {
            path: "a.b",
            description: "orphan",
            functions: &[],
        }];
        assert!(matches!(
            ApiRegistry::build(&LuaApiSchema {
                namespaces: &NAMESPACES,
                aliases: &[],
            }),
            Err(RegistryError::MissingParent { .. })
        ));
    }

    #[test]
    fn function_shadowing_namespace_is_rejected() {
        static NAMESPACES: [NamespaceSchema; 2] = [
            NamespaceSchema {
                path: "a",
                description: "a",
                functions: &[FunctionSchema::new("b", "b", &[], None)],
            },
            NamespaceSchema {
                path: "a.b",
                description: "b",
                functions: &[],
            },
        ];
        assert_eq!(
            ApiRegistry::build(&LuaApiSchema {
                namespaces: &NAMESPACES,
                aliases: &[],
            })
            .unwrap_err(),
            RegistryError::PathConflict {
                path: "a.b".to_string()
            }
        );
    }

    #[test]
    fn alias_shadowing_primitive_is_rejected() {
        static ALIASES: [AliasSchema; 1] = [AliasSchema {
            name: "string",
            ty: "number",
            description: "nope",
            kind: AliasKind::Plain,
        }];
        assert!(matches!(
            ApiRegistry::build(&LuaApiSchema {
                namespaces: &[],
                aliases: &ALIASES,
            }),
            Err(RegistryError::DuplicateAlias { .. })
        ));
    }
}
