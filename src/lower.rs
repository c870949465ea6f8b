//! Lowering: schema references → resolved IR, under one module's scope.
//!
//! A `Scope` is a read-only view over the group's symbol table. Inside module
//! `M` a name `X` means `M.X` when that key exists, and the verbatim global
//! key `X` otherwise. Typedef targets are always read in the scope of the file
//! that declared them.
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::file_group::FileGroup;
use crate::ir::{self, Entity, EntityKind, Type, Value};
use crate::resolver::{Symbol, SymbolTable};
use crate::schema::{self, ConstValue, FieldType, Service};

#[derive(Debug, Clone, Copy)]
pub struct Scope<'g> {
    table: &'g SymbolTable,
    module: Option<&'g str>,
    /// Precomputed `X → module.X` overlay, present for the group's current module.
    aliases: Option<&'g IndexMap<String, String>>,
}

impl<'g> Scope<'g> {
    pub(crate) fn new(table: &'g SymbolTable, module: Option<&'g str>) -> Self {
        Self { table, module, aliases: None }
    }

    pub(crate) fn with_aliases(mut self, aliases: &'g IndexMap<String, String>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn module(&self) -> Option<&'g str> {
        self.module
    }

    /// Find the symbol a name denotes here, together with its canonical key.
    pub fn lookup(&self, name: &str) -> Option<(&'g str, &'g Symbol)> {
        let local = match (self.aliases, self.module) {
            (Some(aliases), _) => aliases.get(name).and_then(|key| self.table.get_key_value(key.as_str())),
            (None, Some(module)) => self.table.get_key_value(format!("{module}.{name}").as_str()),
            (None, None) => None,
        };
        local
            .or_else(|| self.table.get_key_value(name))
            .map(|(key, symbol)| (key.as_str(), symbol))
    }

    pub fn resolve_type(&self, ty: &FieldType) -> Result<Type> {
        self.type_in(ty, &mut Vec::new())
    }

    /// Resolve a bare name (`Weather`, `common.Weather`, a typedef) to the type it denotes.
    pub fn resolve_name(&self, name: &str) -> Result<Type> {
        self.name_in(name, &mut Vec::new())
    }

    pub fn resolve_value(&self, value: &ConstValue) -> Result<Value> {
        Ok(match value {
            ConstValue::Bool(b) => Value::Bool(*b),
            ConstValue::Int(i) => Value::Int(*i),
            ConstValue::Double(d) => Value::Double(*d),
            ConstValue::String(s) => Value::String(s.clone()),
            ConstValue::List(xs) => Value::List(
                xs.iter().map(|x| self.resolve_value(x)).collect::<Result<_>>()?
            ),
            ConstValue::Map(kvs) => Value::Map(
                kvs.iter()
                    .map(|(k, v)| Ok((self.resolve_value(k)?, self.resolve_value(v)?)))
                    .collect::<Result<_>>()?
            ),
            ConstValue::Ref(r) => {
                let name = &r.referenced_value;
                match self.lookup(name) {
                    Some((_, Symbol::Definition(entity))) => Value::Named(entity.clone()),
                    // a typedef names a type, never a value
                    Some((_, Symbol::Alias { .. })) | None => return Err(self.unresolved(name)),
                }
            }
        })
    }

    pub fn resolve_field(&self, field: &schema::Field) -> Result<ir::Field> {
        Ok(ir::Field {
            id: field.id,
            name: field.name.clone(),
            ty: self.resolve_type(&field.ty)?,
            required: field.required,
            default: field.default.as_ref().map(|v| self.resolve_value(v)).transpose()?,
        })
    }

    pub fn resolve_fields(&self, fields: &[schema::Field]) -> Result<Vec<ir::Field>> {
        fields.iter().map(|f| self.resolve_field(f)).collect()
    }

    pub fn resolve_function(&self, function: &schema::Function) -> Result<ir::Function> {
        Ok(ir::Function {
            name: function.name.clone(),
            oneway: function.oneway,
            return_type: function.return_type.as_ref().map(|t| self.resolve_type(t)).transpose()?,
            params: self.resolve_fields(&function.params)?,
            exceptions: self.resolve_fields(&function.exceptions)?,
        })
    }

    /// The service named by `extends`, if any. Anything but a service is unresolved.
    pub fn resolve_service_base(&self, service: &Service) -> Result<Option<Entity>> {
        let Some(base) = service.extends.as_deref() else {
            return Ok(None);
        };
        match self.resolve_name(base)? {
            Type::Named(entity) if entity.kind == EntityKind::Service => Ok(Some(entity)),
            _ => Err(self.unresolved(base)),
        }
    }

    // ————————————————————————————————————————————————————————————————————————
    // INTERNAL HELPERS
    // ————————————————————————————————————————————————————————————————————————

    fn enter(&self, module: &'g str) -> Scope<'g> {
        if self.module == Some(module) {
            *self
        } else {
            Scope::new(self.table, Some(module))
        }
    }

    fn type_in(&self, ty: &FieldType, chain: &mut Vec<String>) -> Result<Type> {
        Ok(match ty {
            FieldType::Primitive(p) => Type::Primitive(*p),
            FieldType::List(t) => Type::List(Box::new(self.type_in(t, chain)?)),
            FieldType::Set(t) => Type::Set(Box::new(self.type_in(t, chain)?)),
            FieldType::Map(k, v) => Type::Map(
                Box::new(self.type_in(k, chain)?),
                Box::new(self.type_in(v, chain)?),
            ),
            FieldType::Ref(r) => self.name_in(&r.referenced_type, chain)?,
        })
    }

    // `chain` holds the typedef keys currently being expanded.
    fn name_in(&self, name: &str, chain: &mut Vec<String>) -> Result<Type> {
        let (key, symbol) = self.lookup(name).ok_or_else(|| self.unresolved(name))?;
        if chain.iter().any(|k| k == key) {
            let mut cycle = chain.clone();
            cycle.push(key.to_string());
            return Err(Error::CyclicReference { chain: cycle });
        }
        match symbol {
            Symbol::Definition(entity) => Ok(Type::Named(entity.clone())),
            Symbol::Alias { module, target } => {
                chain.push(key.to_string());
                let resolved = self.enter(module).type_in(target, chain);
                chain.pop();
                resolved
            }
        }
    }

    fn unresolved(&self, name: &str) -> Error {
        Error::UnresolvedReference {
            name: name.to_string(),
            module: self.module.map(str::to_string),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MODULE LOWERING
// ————————————————————————————————————————————————————————————————————————————

/// Lower everything `module` defines into the resolved IR, with destinations.
pub fn lower_module(group: &FileGroup, module: &str) -> Result<ir::Module> {
    let schema = group.schema(module).ok_or_else(|| Error::UnknownModule(module.to_string()))?;
    let scope = group.scope(module)?;
    let dest = |local: &str| group.dest_module(&format!("{module}.{local}"));

    let typedefs: Vec<(String, Type)> = schema.typedefs.keys()
        .map(|name| Ok((name.clone(), scope.resolve_name(name)?)))
        .collect::<Result<_>>()?;

    let enums: Vec<ir::Enum> = schema.enums.values()
        .map(|e| Ok(ir::Enum { name: e.name.clone(), dest: dest(&e.name)?, values: e.values.clone() }))
        .collect::<Result<_>>()?;

    let records: Vec<ir::Record> = schema.structs.values()
        .chain(schema.unions.values())
        .chain(schema.exceptions.values())
        .map(|r| Ok(ir::Record {
            name: r.name.clone(),
            kind: r.kind,
            dest: dest(&r.name)?,
            fields: scope.resolve_fields(&r.fields)?,
        }))
        .collect::<Result<_>>()?;

    let constants: Vec<ir::Constant> = schema.constants.values()
        .map(|c| Ok(ir::Constant {
            name: c.name.clone(),
            ty: scope.resolve_type(&c.ty)?,
            value: scope.resolve_value(&c.value)?,
        }))
        .collect::<Result<_>>()?;

    let services: Vec<ir::Service> = schema.services.values()
        .map(|s| Ok(ir::Service {
            name: s.name.clone(),
            dest: dest(&s.name)?,
            extends: scope.resolve_service_base(s)?,
            functions: s.functions.values().map(|f| scope.resolve_function(f)).collect::<Result<_>>()?,
        }))
        .collect::<Result<_>>()?;

    Ok(ir::Module {
        name: module.to_string(),
        namespace: group.namespaces().get(module).cloned().flatten(),
        constants_module: group.constants_module(module)?,
        typedefs,
        enums,
        records,
        constants,
        services,
    })
}
