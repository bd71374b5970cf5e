/// Structural defects found while building an [`ApiRegistry`](crate::ApiRegistry).
///
/// Any of these aborts construction: a consumer never sees a partially valid
/// surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate namespace path: {path}")]
    DuplicateNamespace { path: String },

    /// Namespaces must be declared after their parent.
    #[error("namespace '{path}' is declared before its parent '{parent}'")]
    MissingParent { path: String, parent: String },

    /// A function and a child namespace would occupy the same table field.
    #[error("'{path}' is declared both as a function and as a namespace")]
    PathConflict { path: String },

    #[error("duplicate or reserved type alias: {name}")]
    DuplicateAlias { name: String },

    #[error("unknown type '{ty}' in {context}")]
    UnknownType { ty: String, context: String },

    #[error("invalid parameter list for {path}: {reason}")]
    InvalidParameters { path: String, reason: String },

    /// Two overloads accept the same argument list with equal specificity.
    #[error("ambiguous overloads for {path} with {arity} argument(s): `{first}` and `{second}`")]
    AmbiguousOverload {
        path: String,
        arity: usize,
        first: String,
        second: String,
    },
}

/// Lookup failures against a built registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("namespace not found: {path}")]
    NamespaceNotFound { path: String },

    #[error("function not found: {path}")]
    FunctionNotFound { path: String },

    #[error("no overload of {path} accepts ({args})")]
    NoMatchingOverload { path: String, args: String },

    /// The argument types match several overloads equally well.
    #[error("call to {path} with ({args}) is ambiguous between {}", .candidates.join(" and "))]
    Ambiguous {
        path: String,
        args: String,
        candidates: Vec<String>,
    },

    #[error("unknown type: {name}")]
    UnknownType { name: String },
}
