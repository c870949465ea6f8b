//! Schema model: the syntax tree of exactly one IDL file.
//!
//! Produced by the front end (see `crate::source`), never mutated afterwards.
//! References to other definitions are kept as names (`TypeRef` / `ValueRef`)
//! and are only ever dereferenced through a `FileGroup`.
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Byte,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
}

/// Unresolved placeholder for a type, spelled exactly as at the use site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub referenced_type: String,
}

/// Unresolved placeholder for a value (enum member or constant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueRef {
    pub referenced_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Primitive(Primitive),
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    Ref(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Double(OrderedFloat<f64>),
    String(String),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
    Ref(ValueRef),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requiredness {
    Required,
    Optional,
    #[default]
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub required: Requiredness,
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub name: String,
    #[serde(default)]
    pub default: Option<ConstValue>,
}

/// Structs, unions and exceptions share one shape; the kind is only a role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Struct,
    Union,
    Exception,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub kind: RecordKind,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,      // explicit, or inferred by the front end
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TEnum {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub oneway: bool,
    /// `None` is `void`.
    #[serde(default)]
    pub return_type: Option<FieldType>,
    #[serde(default)]
    pub params: Vec<Field>,
    #[serde(default)]
    pub exceptions: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub functions: IndexMap<String, Function>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub target: String,
    pub value: String,
}

/// One parsed file. Every category keeps declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub includes: Vec<Include>,
    pub namespaces: IndexMap<String, Namespace>,
    pub typedefs: IndexMap<String, FieldType>,
    pub enums: IndexMap<String, TEnum>,
    pub structs: IndexMap<String, Record>,
    pub unions: IndexMap<String, Record>,
    pub exceptions: IndexMap<String, Record>,
    pub services: IndexMap<String, Service>,
    pub constants: IndexMap<String, Constant>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Double => "double",
            Self::String => "string",
            Self::Binary => "binary",
        }
    }
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { referenced_type: name.into() }
    }
}

impl ValueRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { referenced_value: name.into() }
    }
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Ref(TypeRef::new(name))
    }
    pub fn list(of: FieldType) -> Self {
        Self::List(Box::new(of))
    }
    pub fn set(of: FieldType) -> Self {
        Self::Set(Box::new(of))
    }
    pub fn map(key: FieldType, value: FieldType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }
}

impl ConstValue {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Ref(ValueRef::new(name))
    }
}

impl Field {
    pub fn new(id: i64, name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            id: Some(id),
            required: Requiredness::Default,
            ty,
            name: name.into(),
            default: None,
        }
    }
    pub fn with_default(mut self, value: ConstValue) -> Self {
        self.default = Some(value);
        self
    }
    pub fn required(mut self, required: Requiredness) -> Self {
        self.required = required;
        self
    }
}

impl Record {
    pub fn new(kind: RecordKind, name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(), kind, fields }
    }
}

impl TEnum {
    /// Members without an explicit value continue from the previous one, starting at 0.
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<i64>)>,
        S: Into<String>,
    {
        let mut next = 0;
        let values = members.into_iter().map(|(name, explicit)| {
            let value = explicit.unwrap_or(next);
            next = value.saturating_add(1);
            EnumValue { name: name.into(), value }
        }).collect();
        Self { name: name.into(), values }
    }

    pub fn value(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.name == name)
    }
}

impl Schema {
    /// Declared namespace for a generation target, if any.
    pub fn namespace_for(&self, target: &str) -> Option<&str> {
        self.namespaces.get(target).map(|ns| ns.value.as_str())
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        self.structs.get(name)
            .or_else(|| self.unions.get(name))
            .or_else(|| self.exceptions.get(name))
    }

    /// Names that can collide with a constants module, in scan order:
    /// enums, exceptions, structs, services, unions.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.enums.keys()
            .chain(self.exceptions.keys())
            .chain(self.structs.keys())
            .chain(self.services.keys())
            .chain(self.unions.keys())
            .map(String::as_str)
    }

    // builders, mostly for front ends that assemble trees by hand

    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.includes.push(Include { path: path.into() });
        self
    }
    pub fn namespace(mut self, target: impl Into<String>, value: impl Into<String>) -> Self {
        let target = target.into();
        self.namespaces.insert(target.clone(), Namespace { target, value: value.into() });
        self
    }
    pub fn typedef(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.typedefs.insert(name.into(), ty);
        self
    }
    pub fn enumeration(mut self, e: TEnum) -> Self {
        self.enums.insert(e.name.clone(), e);
        self
    }
    pub fn record_def(mut self, r: Record) -> Self {
        let slot = match r.kind {
            RecordKind::Struct => &mut self.structs,
            RecordKind::Union => &mut self.unions,
            RecordKind::Exception => &mut self.exceptions,
        };
        slot.insert(r.name.clone(), r);
        self
    }
    pub fn service(mut self, s: Service) -> Self {
        self.services.insert(s.name.clone(), s);
        self
    }
    pub fn constant(mut self, name: impl Into<String>, ty: FieldType, value: ConstValue) -> Self {
        let name = name.into();
        self.constants.insert(name.clone(), Constant { name, ty, value });
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
