//! Destination modules: where each definition lands in the generated code.
use std::fmt;
use indexmap::IndexMap;
use serde::Serialize;

use super::FileGroup;
use crate::error::{Error, Result};
use crate::ir::{Entity, EntityKind};
use crate::schema::Schema;

/// Hierarchical output identity, e.g. `Acme.Common.Weather`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModulePath(pub Vec<String>);

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FileGroup {
    /// Destination of a qualified `module.Local` name.
    pub fn dest_module(&self, name: &str) -> Result<ModulePath> {
        let (module, local) = name.split_once('.')
            .ok_or_else(|| Error::UnqualifiedName(name.to_string()))?;
        let local = initial_case(local);
        let mut segments = match self.namespaces.get(module) {
            Some(Some(namespace)) => namespace.split('.').map(camelize).collect(),
            _ => Vec::new(),
        };
        segments.push(local);
        Ok(ModulePath(segments))
    }

    /// Enum values land with their enum; constants in their file's constants module.
    pub fn dest_module_of(&self, entity: &Entity) -> Result<ModulePath> {
        match entity.kind {
            EntityKind::EnumValue { .. } => {
                let (enum_name, _) = entity.name.rsplit_once('.')
                    .ok_or_else(|| Error::UnqualifiedName(entity.name.clone()))?;
                self.dest_module(enum_name)
            }
            EntityKind::Constant => self.constants_module(entity.module()),
            _ => self.dest_module(&entity.name),
        }
    }

    /// Qualified name of a file's constants pseudo-entity: `base.Base`, unless
    /// a type in the file already has that name up to case, whose spelling wins.
    pub fn constants_name(&self, module: &str) -> Result<String> {
        let schema = self.schemas.get(module)
            .ok_or_else(|| Error::UnknownModule(module.to_string()))?;
        let default = camelize(module);
        let local = colliding_type_name(schema, &default).unwrap_or(default.as_str());
        Ok(format!("{module}.{local}"))
    }

    pub fn constants_module(&self, module: &str) -> Result<ModulePath> {
        self.dest_module(&self.constants_name(module)?)
    }

    /// Constants module of the root file.
    pub fn root_constants_module(&self) -> Result<ModulePath> {
        let root = self.initial_module.as_deref()
            .ok_or_else(|| Error::UnknownModule(String::new()))?;
        self.constants_module(root)
    }
}

// first match in scan order; ties between spellings are settled by that order
fn colliding_type_name<'a>(schema: &'a Schema, default: &str) -> Option<&'a str> {
    let wanted = default.to_lowercase();
    schema.type_names().find(|name| name.to_lowercase() == wanted)
}

/// Declared namespace for `target` per module, else the configured default.
pub fn build_namespaces<'a>(
    schemas: impl IntoIterator<Item = (&'a str, &'a Schema)>,
    target: &str,
    default: Option<&str>,
) -> IndexMap<String, Option<String>> {
    schemas.into_iter()
        .map(|(module, schema)| {
            let namespace = schema.namespace_for(target).or(default).map(str::to_string);
            (module.to_string(), namespace)
        })
        .collect()
}

/// Upper-case the first character only.
pub fn initial_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `foo_bar` → `FooBar`.
pub fn camelize(s: &str) -> String {
    s.split('_').filter(|piece| !piece.is_empty()).map(initial_case).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::config::GroupConfig;
    use crate::schema::{ConstValue, FieldType, Primitive, Record, RecordKind, Service, TEnum};
    use crate::source::MemorySources;

    fn load(config: GroupConfig, files: Vec<(&str, Schema)>) -> FileGroup {
        let root = files[0].0.to_string();
        let sources = files.into_iter().fold(MemorySources::new(), |s, (p, schema)| s.with_schema(p, schema));
        let (group, errors) = FileGroup::load(config, &sources, Path::new(&root)).unwrap();
        assert!(errors.is_empty());
        group
    }

    fn one_const(schema: Schema) -> Schema {
        schema.constant("LIMIT", FieldType::Primitive(Primitive::I32), ConstValue::Int(10))
    }

    #[test]
    fn casing_helpers() {
        assert_eq!(initial_case("weather"), "Weather");
        assert_eq!(initial_case("fooBar"), "FooBar");
        assert_eq!(initial_case(""), "");
        assert_eq!(camelize("foo_bar"), "FooBar");
        assert_eq!(camelize("acme"), "Acme");
    }

    #[test]
    fn declared_namespace_is_title_cased_per_segment() {
        let group = load(GroupConfig::default(), vec![
            ("weather.thrift", Schema::default().namespace("rs", "a.b")),
        ]);
        assert_eq!(group.dest_module("weather.weather").unwrap().to_string(), "A.B.Weather");
    }

    #[test]
    fn missing_namespace_uses_configured_default() {
        let config = GroupConfig::default().with_namespace("my_org.gen");
        let group = load(config, vec![
            ("weather.thrift", Schema::default().namespace("py", "ignored")),
        ]);
        assert_eq!(group.dest_module("weather.Forecast").unwrap(), ModulePath(vec![
            "MyOrg".into(), "Gen".into(), "Forecast".into(),
        ]));
    }

    #[test]
    fn no_namespace_anywhere_yields_bare_name() {
        let group = load(GroupConfig::default(), vec![("weather.thrift", Schema::default())]);
        assert_eq!(group.dest_module("weather.forecast").unwrap().to_string(), "Forecast");
        assert_eq!(group.dest_module("Forecast"), Err(Error::UnqualifiedName("Forecast".into())));
    }

    #[test]
    fn namespaces_follow_the_configured_target() {
        let schemas = [
            ("a", Schema::default().namespace("rs", "x.y").namespace("py", "p")),
            ("b", Schema::default()),
        ];
        let table = build_namespaces(schemas.iter().map(|(m, s)| (*m, s)), "py", Some("dflt"));
        assert_eq!(table["a"].as_deref(), Some("p"));
        assert_eq!(table["b"].as_deref(), Some("dflt"));
    }

    #[test]
    fn constants_module_reuses_colliding_type_spelling() {
        let schema = one_const(Schema::default().record_def(Record::new(RecordKind::Struct, "Foo", vec![])));
        let group = load(GroupConfig::default(), vec![("foo.thrift", schema)]);
        assert_eq!(group.constants_name("foo").unwrap(), "foo.Foo");
        assert_eq!(group.root_constants_module().unwrap().to_string(), "Foo");
    }

    #[test]
    fn constants_module_collision_keeps_exact_casing() {
        let schema = one_const(Schema::default()
            .service(Service { name: "MYSVC".into(), extends: None, functions: Default::default() })
            .enumeration(TEnum::new("MySvc", [("A", None)])));
        let group = load(GroupConfig::default(), vec![("my_svc.thrift", schema)]);
        // enums are scanned before services
        assert_eq!(group.constants_name("my_svc").unwrap(), "my_svc.MySvc");

        let schema = one_const(Schema::default()
            .record_def(Record::new(RecordKind::Exception, "MYSVC", vec![])));
        let group = load(GroupConfig::default(), vec![("mysvc.thrift", schema)]);
        assert_eq!(group.constants_name("mysvc").unwrap(), "mysvc.MYSVC");
    }

    #[test]
    fn constants_module_without_collision_is_title_cased_basename() {
        let schema = one_const(Schema::default().namespace("rs", "acme"));
        let group = load(GroupConfig::default(), vec![("shared_defs.thrift", schema)]);
        assert_eq!(group.constants_name("shared_defs").unwrap(), "shared_defs.SharedDefs");
        assert_eq!(group.constants_module("shared_defs").unwrap().to_string(), "Acme.SharedDefs");
    }

    #[test]
    fn entities_map_to_their_destination() {
        let schema = one_const(Schema::default()
            .namespace("rs", "acme.weather")
            .enumeration(TEnum::new("Sky", [("CLEAR", None)])));
        let group = load(GroupConfig::default(), vec![("weather.thrift", schema)]);
        let value = Entity::new("weather.Sky.CLEAR", EntityKind::EnumValue { value: 0 });
        assert_eq!(group.dest_module_of(&value).unwrap().to_string(), "Acme.Weather.Sky");
        let constant = Entity::new("weather.LIMIT", EntityKind::Constant);
        assert_eq!(group.dest_module_of(&constant).unwrap().to_string(), "Acme.Weather.Weather");
    }
}
