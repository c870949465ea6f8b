//! Local resolver: the flat symbol table of a single schema.
//!
//! Keys are qualified with the owning module (`common.Weather`,
//! `common.Weather.SUNNY`). Nothing here knows about other files.
use indexmap::IndexMap;
use serde::Serialize;

use crate::ir::{Entity, EntityKind};
use crate::schema::{FieldType, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    /// A typedef: transparent, points straight at its target type.
    /// `module` is the file the target must be read in.
    Alias { module: String, target: FieldType },
    Definition(Entity),
}

pub type SymbolTable = IndexMap<String, Symbol>;

pub fn build(schema: &Schema, module: &str) -> SymbolTable {
    let mut table = SymbolTable::new();
    let key = |local: &str| format!("{module}.{local}");
    let define = |table: &mut SymbolTable, local: &str, kind: EntityKind| {
        let name = key(local);
        table.insert(name.clone(), Symbol::Definition(Entity::new(name, kind)));
    };

    for name in schema.constants.keys() {
        define(&mut table, name, EntityKind::Constant);
    }
    for name in schema.services.keys() {
        define(&mut table, name, EntityKind::Service);
    }
    for records in [&schema.structs, &schema.exceptions, &schema.unions] {
        for record in records.values() {
            define(&mut table, &record.name, EntityKind::Record(record.kind));
        }
    }
    for (name, target) in &schema.typedefs {
        table.insert(key(name), Symbol::Alias {
            module: module.to_string(),
            target: target.clone(),
        });
    }
    for name in schema.enums.keys() {
        define(&mut table, name, EntityKind::Enum);
    }
    for e in schema.enums.values() {
        for v in &e.values {
            let local = format!("{}.{}", e.name, v.name);
            define(&mut table, &local, EntityKind::EnumValue { value: v.value });
        }
    }
    table
}
