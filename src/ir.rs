// Strongly-typed resolved IR for codegen. No `TypeRef`/`ValueRef` survives here.
use std::fmt;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::file_group::ModulePath;
use crate::schema::{EnumValue, Primitive, RecordKind, Requiredness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Record(RecordKind),
    Enum,
    EnumValue { value: i64 },
    Service,
    Constant,
}

/// A concrete definition, addressed by its canonical qualified name
/// (`module.Name`, or `module.Enum.MEMBER` for enum values).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Primitive(Primitive),
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Named(Entity),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(OrderedFloat<f64>),
    String(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Named(Entity),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub required: Requiredness,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub oneway: bool,
    pub return_type: Option<Type>,      // None = void
    pub params: Vec<Field>,
    pub exceptions: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub name: String,
    pub kind: RecordKind,
    pub dest: ModulePath,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enum {
    pub name: String,
    pub dest: ModulePath,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub name: String,
    pub dest: ModulePath,
    pub extends: Option<Entity>,
    pub functions: Vec<Function>,
}

/// Everything one file defines, fully resolved. Declaration order is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub namespace: Option<String>,
    pub constants_module: ModulePath,
    pub typedefs: Vec<(String, Type)>,
    pub enums: Vec<Enum>,
    pub records: Vec<Record>,
    pub constants: Vec<Constant>,
    pub services: Vec<Service>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self { name: name.into(), kind }
    }

    /// Owning module of the entity (`common` for `common.Weather.SUNNY`).
    pub fn module(&self) -> &str {
        self.name.split_once('.').map(|(m, _)| m).unwrap_or(&self.name)
    }

    /// Module-local name (`Weather.SUNNY` for `common.Weather.SUNNY`).
    pub fn local_name(&self) -> &str {
        self.name.split_once('.').map(|(_, l)| l).unwrap_or(&self.name)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntityKind::Record(RecordKind::Struct) => "struct",
            EntityKind::Record(RecordKind::Union) => "union",
            EntityKind::Record(RecordKind::Exception) => "exception",
            EntityKind::Enum => "enum",
            EntityKind::EnumValue { .. } => "enum value",
            EntityKind::Service => "service",
            EntityKind::Constant => "const",
        };
        write!(f, "{kind} {}", self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => f.write_str(p.as_str()),
            Type::List(t) => write!(f, "list<{t}>"),
            Type::Set(t) => write!(f, "set<{t}>"),
            Type::Map(k, v) => write!(f, "map<{k},{v}>"),
            Type::Named(e) => f.write_str(&e.name),
        }
    }
}
