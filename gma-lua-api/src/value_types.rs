//! Value types of the host API and the relations overload resolution uses.
//!
//! The host language is dynamically typed, so the lattice is shallow: `any`
//! on top, the Lua primitives below it, and schema aliases (`handle`, `error`,
//! `success`) as refinements of one primitive each. An alias is narrower than
//! its base when ranking overloads but interchangeable with it when accepting
//! arguments, because at runtime the host only ever sees the base value.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::lua_api_schema::AliasKind;

/// A Lua primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Any,
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
}

impl Primitive {
    pub const ALL: [Primitive; 7] = [
        Primitive::Any,
        Primitive::Nil,
        Primitive::Boolean,
        Primitive::Number,
        Primitive::String,
        Primitive::Table,
        Primitive::Function,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Any => "any",
            Primitive::Nil => "nil",
            Primitive::Boolean => "boolean",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Table => "table",
            Primitive::Function => "function",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// A named refinement of a primitive declared by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeAlias {
    pub name: &'static str,
    pub base: Primitive,
    pub kind: AliasKind,
    pub description: &'static str,
}

/// Type of a parameter, argument or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Primitive(Primitive),
    Alias(TypeAlias),
}

impl ValueType {
    pub const ANY: ValueType = ValueType::Primitive(Primitive::Any);
    pub const NIL: ValueType = ValueType::Primitive(Primitive::Nil);
    pub const BOOLEAN: ValueType = ValueType::Primitive(Primitive::Boolean);
    pub const NUMBER: ValueType = ValueType::Primitive(Primitive::Number);
    pub const STRING: ValueType = ValueType::Primitive(Primitive::String);
    pub const TABLE: ValueType = ValueType::Primitive(Primitive::Table);
    pub const FUNCTION: ValueType = ValueType::Primitive(Primitive::Function);

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Primitive(p) => p.name(),
            ValueType::Alias(alias) => alias.name,
        }
    }

    /// The primitive the host sees at runtime.
    pub fn base(self) -> Primitive {
        match self {
            ValueType::Primitive(p) => p,
            ValueType::Alias(alias) => alias.base,
        }
    }

    pub fn kind(self) -> AliasKind {
        match self {
            ValueType::Primitive(_) => AliasKind::Plain,
            ValueType::Alias(alias) => alias.kind,
        }
    }

    pub fn is_any(self) -> bool {
        self.base() == Primitive::Any
    }

    /// Whether a parameter of this type accepts an argument of type `arg`.
    pub fn accepts(self, arg: ValueType) -> bool {
        self.is_any() || arg.is_any() || self.base() == arg.base()
    }

    /// Whether `self` is at least as specific as `other`.
    pub fn is_narrower_or_equal(self, other: ValueType) -> bool {
        if self == other || other.is_any() {
            return true;
        }
        matches!(
            (self, other),
            (ValueType::Alias(alias), ValueType::Primitive(p)) if alias.base == p
        )
    }

    /// Whether some runtime value belongs to both types.
    pub fn overlaps(self, other: ValueType) -> bool {
        self.accepts(other)
    }
}

impl From<Primitive> for ValueType {
    fn from(p: Primitive) -> Self {
        ValueType::Primitive(p)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// What a call produces.
///
/// `Nilable` keeps "no value" distinct from every value of the inner type: a
/// missing object label is not an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Nothing,
    Value(ValueType),
    Nilable(ValueType),
}

impl ReturnType {
    pub fn value_type(self) -> Option<ValueType> {
        match self {
            ReturnType::Nothing => None,
            ReturnType::Value(ty) | ReturnType::Nilable(ty) => Some(ty),
        }
    }

    pub fn is_nilable(self) -> bool {
        matches!(self, ReturnType::Nilable(_))
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Nothing => f.write_str("nothing"),
            ReturnType::Value(ty) => write!(f, "{ty}"),
            ReturnType::Nilable(ty) => write!(f, "{ty}?"),
        }
    }
}

impl Serialize for ReturnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
