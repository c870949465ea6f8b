//! File group: the include closure of one root schema, merged into a single
//! symbol environment.
//!
//! - `add` registers a schema and, recursively, everything it includes.
//!   Each module is parsed at most once, so include cycles terminate.
//! - The base symbol table only ever grows; the "current module" is an
//!   overlay of unqualified aliases rebuilt from it on every switch.
//! - Every reference is resolved on demand through a `Scope`; definitions are
//!   addressed by qualified name and borrowed back out of `schemas`.
pub mod naming;

use std::path::{Path, PathBuf};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace, warn};

use crate::config::GroupConfig;
use crate::error::{Error, ParseError, Result};
use crate::ir::{self, Entity, EntityKind};
use crate::lower::Scope;
use crate::resolver::{self, Symbol, SymbolTable};
use crate::schema::{Constant, ConstValue, EnumValue, FieldType, Record, RecordKind, Schema, Service, TEnum};
use crate::source::Sources;

pub use naming::{build_namespaces, camelize, initial_case, ModulePath};

const SCHEMA_SUFFIX: &str = ".thrift";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct FileGroup {
    config: GroupConfig,
    initial_module: Option<String>,
    schemas: IndexMap<String, Schema>,
    paths: IndexMap<String, PathBuf>,
    /// Modules whose include failed to parse; reported once, never retried.
    failed: IndexSet<String>,
    /// Qualified keys only; add-only.
    resolutions: SymbolTable,
    current: Option<String>,
    /// Unqualified alias → qualified key, for `current` only.
    aliases: IndexMap<String, String>,
    namespaces: IndexMap<String, Option<String>>,
}

/// A concrete definition borrowed out of the group's schemas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Definition<'a> {
    Record(&'a Record),
    Enum(&'a TEnum),
    EnumValue(&'a TEnum, &'a EnumValue),
    Service(&'a Service),
    Constant(&'a Constant),
}

// ————————————————————————————————————————————————————————————————————————————
// INCLUDE CLOSURE
// ————————————————————————————————————————————————————————————————————————————

impl FileGroup {
    pub fn new(config: GroupConfig) -> Self {
        Self {
            config,
            initial_module: None,
            schemas: IndexMap::new(),
            paths: IndexMap::new(),
            failed: IndexSet::new(),
            resolutions: SymbolTable::new(),
            current: None,
            aliases: IndexMap::new(),
            namespaces: IndexMap::new(),
        }
    }

    /// Parse `root` and build its include closure. Only the root failing to
    /// parse is fatal; include failures come back alongside the group.
    pub fn load(
        config: GroupConfig,
        sources: &impl Sources,
        root: &Path,
    ) -> std::result::Result<(Self, Vec<ParseError>), ParseError> {
        let schema = sources.parse(root)?;
        let mut group = Self::new(config);
        let errors = group.add(sources, root, schema);
        Ok((group, errors))
    }

    /// Register `schema` as the file at `path`, merge its symbols (last write
    /// wins) and pull in its includes. Includes of a module that is already
    /// present are neither parsed nor recursed into again.
    pub fn add(&mut self, sources: &impl Sources, path: &Path, schema: Schema) -> Vec<ParseError> {
        let module = module_name(path);
        let first_visit = !self.schemas.contains_key(&module);
        debug!(module = %module, path = %path.display(), first_visit, "adding schema");

        if self.initial_module.is_none() {
            self.initial_module = Some(module.clone());
        }
        self.resolutions.extend(resolver::build(&schema, &module));
        let includes = schema.includes.iter().map(|i| i.path.clone()).collect::<Vec<_>>();
        self.schemas.insert(module.clone(), schema);
        self.paths.insert(module.clone(), path.to_path_buf());

        let mut errors = Vec::new();
        if first_visit {
            let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
            for include in &includes {
                errors.extend(self.add_include(sources, base_dir, include));
            }
        }
        self.refresh_views();
        errors
    }

    fn add_include(&mut self, sources: &impl Sources, base_dir: &Path, include: &str) -> Vec<ParseError> {
        let path = self.find_include(sources, base_dir, include);
        let module = module_name(&path);
        if self.schemas.contains_key(&module) || self.failed.contains(&module) {
            trace!(module = %module, "already visited, skipping include");
            return Vec::new();
        }
        match sources.parse(&path) {
            Ok(schema) => self.add(sources, &path, schema),
            Err(error) => {
                warn!(path = %path.display(), %error, "include failed to parse");
                self.failed.insert(module);
                vec![error]
            }
        }
    }

    /// The including file's directory first, then each include path; the
    /// literal include when nothing matches.
    fn find_include(&self, sources: &impl Sources, base_dir: &Path, include: &str) -> PathBuf {
        std::iter::once(base_dir)
            .chain(self.config.include_paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(include))
            .find(|candidate| sources.exists(candidate))
            .unwrap_or_else(|| PathBuf::from(include))
    }

    fn refresh_views(&mut self) {
        if let Some(current) = &self.current {
            self.aliases = build_aliases(&self.resolutions, current);
        }
        self.namespaces = build_namespaces(
            self.schemas.iter().map(|(m, s)| (m.as_str(), s)),
            &self.config.target,
            self.config.namespace.as_deref(),
        );
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCOPED RESOLUTION
// ————————————————————————————————————————————————————————————————————————————

impl FileGroup {
    /// Make names defined in `module` reachable without their qualifier.
    pub fn set_current_module(&mut self, module: &str) -> Result<()> {
        if !self.schemas.contains_key(module) {
            return Err(Error::UnknownModule(module.to_string()));
        }
        debug!(module, "switching current module");
        self.current = Some(module.to_string());
        self.refresh_views();
        Ok(())
    }

    /// The current resolution view: every qualified key, then the aliases of
    /// the current module.
    pub fn resolutions(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        let qualified = self.resolutions.iter().map(|(k, s)| (k.as_str(), s));
        let aliases = self.aliases.iter().filter_map(|(alias, key)| {
            self.resolutions.get(key).map(|s| (alias.as_str(), s))
        });
        qualified.chain(aliases)
    }

    pub fn current_scope(&self) -> Scope<'_> {
        let scope = Scope::new(&self.resolutions, self.current.as_deref());
        if self.current.is_some() { scope.with_aliases(&self.aliases) } else { scope }
    }

    /// A view from inside any module, leaving the current one untouched.
    pub fn scope(&self, module: &str) -> Result<Scope<'_>> {
        if self.current.as_deref() == Some(module) {
            return Ok(self.current_scope());
        }
        let (module, _) = self.schemas.get_key_value(module)
            .ok_or_else(|| Error::UnknownModule(module.to_string()))?;
        Ok(Scope::new(&self.resolutions, Some(module.as_str())))
    }

    pub fn resolve_type(&self, ty: &FieldType) -> Result<ir::Type> {
        self.current_scope().resolve_type(ty)
    }

    pub fn resolve_name(&self, name: &str) -> Result<ir::Type> {
        self.current_scope().resolve_name(name)
    }

    pub fn resolve_value(&self, value: &ConstValue) -> Result<ir::Value> {
        self.current_scope().resolve_value(value)
    }

    pub fn resolve_field(&self, field: &crate::schema::Field) -> Result<ir::Field> {
        self.current_scope().resolve_field(field)
    }

    pub fn definition(&self, entity: &Entity) -> Option<Definition<'_>> {
        let (module, local) = entity.name.split_once('.')?;
        let schema = self.schemas.get(module)?;
        match entity.kind {
            EntityKind::Record(RecordKind::Struct) => schema.structs.get(local).map(Definition::Record),
            EntityKind::Record(RecordKind::Union) => schema.unions.get(local).map(Definition::Record),
            EntityKind::Record(RecordKind::Exception) => schema.exceptions.get(local).map(Definition::Record),
            EntityKind::Enum => schema.enums.get(local).map(Definition::Enum),
            EntityKind::EnumValue { .. } => {
                let (enum_name, member) = local.split_once('.')?;
                let e = schema.enums.get(enum_name)?;
                e.value(member).map(|v| Definition::EnumValue(e, v))
            }
            EntityKind::Service => schema.services.get(local).map(Definition::Service),
            EntityKind::Constant => schema.constants.get(local).map(Definition::Constant),
        }
    }

    /// Resolve every reference reachable from every schema, each in its own
    /// module's scope. One error per distinct failure.
    pub fn check(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        let mut note = |result: Result<()>| {
            if let Err(error) = result.map_err(canonical_cycle) {
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
        };
        for (module, schema) in &self.schemas {
            let scope = Scope::new(&self.resolutions, Some(module.as_str()));
            for target in schema.typedefs.values() {
                note(scope.resolve_type(target).map(drop));
            }
            for records in [&schema.structs, &schema.unions, &schema.exceptions] {
                for field in records.values().flat_map(|r| &r.fields) {
                    check_field(&scope, field, &mut note);
                }
            }
            for constant in schema.constants.values() {
                note(scope.resolve_type(&constant.ty).map(drop));
                note(scope.resolve_value(&constant.value).map(drop));
            }
            for service in schema.services.values() {
                note(scope.resolve_service_base(service).map(drop));
                for function in service.functions.values() {
                    if let Some(ty) = &function.return_type {
                        note(scope.resolve_type(ty).map(drop));
                    }
                    for field in function.params.iter().chain(&function.exceptions) {
                        check_field(&scope, field, &mut note);
                    }
                }
            }
        }
        errors
    }
}

/// One error per cycle: drop the lead-in and start the loop at its smallest key,
/// so `A -> B -> A` and `B -> A -> B` compare equal.
fn canonical_cycle(error: Error) -> Error {
    let Error::CyclicReference { chain } = error else { return error };
    let Some(last) = chain.last() else { return Error::CyclicReference { chain } };
    let start = chain.iter().position(|key| key == last).unwrap_or(0);
    let mut cycle = chain[start..chain.len() - 1].to_vec();
    if let Some(min) = cycle.iter().enumerate().min_by_key(|(_, key)| *key).map(|(i, _)| i) {
        cycle.rotate_left(min);
    }
    if let Some(first) = cycle.first().cloned() {
        cycle.push(first);
    }
    Error::CyclicReference { chain: cycle }
}

fn check_field(scope: &Scope<'_>, field: &crate::schema::Field, note: &mut impl FnMut(Result<()>)) {
    note(scope.resolve_type(&field.ty).map(drop));
    if let Some(default) = &field.default {
        note(scope.resolve_value(default).map(drop));
    }
}

// ————————————————————————————————————————————————————————————————————————————
// READ ACCESS
// ————————————————————————————————————————————————————————————————————————————

impl FileGroup {
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }
    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }
    pub fn schema(&self, module: &str) -> Option<&Schema> {
        self.schemas.get(module)
    }
    /// Path each module was read from.
    pub fn path(&self, module: &str) -> Option<&Path> {
        self.paths.get(module).map(PathBuf::as_path)
    }
    pub fn namespaces(&self) -> &IndexMap<String, Option<String>> {
        &self.namespaces
    }
    pub fn initial_module(&self) -> Option<&str> {
        self.initial_module.as_deref()
    }
    pub fn current_module(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `basename(path, ".thrift")`.
pub fn module_name(path: &Path) -> String {
    let base = path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match base.strip_suffix(SCHEMA_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => base,
    }
}

fn build_aliases(table: &SymbolTable, module: &str) -> IndexMap<String, String> {
    let prefix = format!("{module}.");
    table.keys()
        .filter_map(|key| key.strip_prefix(&prefix).map(|alias| (alias.to_string(), key.clone())))
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Function, Primitive, ValueRef};
    use crate::source::MemorySources;

    fn common() -> Schema {
        Schema::default()
            .namespace("rs", "acme.common")
            .enumeration(TEnum::new("Weather", [("SUNNY", None), ("RAINY", None)]))
            .record_def(Record::new(RecordKind::Struct, "Location", vec![
                Field::new(1, "lat", FieldType::Primitive(Primitive::Double)),
            ]))
            .typedef("Celsius", FieldType::Primitive(Primitive::Double))
    }

    fn forecast() -> Schema {
        Schema::default()
            .include("common.thrift")
            .record_def(Record::new(RecordKind::Struct, "Forecast", vec![
                Field::new(1, "weather", FieldType::named("common.Weather"))
                    .with_default(ConstValue::named("common.Weather.RAINY")),
                Field::new(2, "temps", FieldType::list(FieldType::named("common.Celsius"))),
                Field::new(3, "where", FieldType::named("common.Location")),
            ]))
    }

    fn sources() -> MemorySources {
        MemorySources::new()
            .with_schema("idl/common.thrift", common())
            .with_schema("idl/forecast.thrift", forecast())
    }

    fn group() -> FileGroup {
        let (group, errors) = FileGroup::load(GroupConfig::default(), &sources(), Path::new("idl/forecast.thrift")).unwrap();
        assert!(errors.is_empty(), "{errors:?}");
        group
    }

    #[test]
    fn module_name_strips_suffix_and_directory() {
        assert_eq!(module_name(Path::new("idl/shared/common.thrift")), "common");
        assert_eq!(module_name(Path::new("common")), "common");
    }

    #[test]
    fn includes_are_found_next_to_the_including_file() {
        let group = group();
        let modules = group.schemas().keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(modules, vec!["forecast", "common"]);
        assert_eq!(group.initial_module(), Some("forecast"));
        assert_eq!(group.path("common"), Some(Path::new("idl/common.thrift")));
    }

    #[test]
    fn include_paths_are_searched_in_order_after_own_directory() {
        let sources = MemorySources::new()
            .with_schema("app/main.thrift", Schema::default().include("common.thrift"))
            .with_schema("first/common.thrift", Schema::default().typedef("Id", FieldType::Primitive(Primitive::I32)))
            .with_schema("second/common.thrift", Schema::default().typedef("Id", FieldType::Primitive(Primitive::I64)));
        let config = GroupConfig::default().with_include_path("second").with_include_path("first");
        let (group, errors) = FileGroup::load(config, &sources, Path::new("app/main.thrift")).unwrap();
        assert!(errors.is_empty());
        assert_eq!(group.path("common"), Some(Path::new("second/common.thrift")));
        assert_eq!(group.resolve_name("common.Id").unwrap(), ir::Type::Primitive(Primitive::I64));
    }

    #[test]
    fn include_parse_failures_are_collected_and_siblings_continue() {
        let sources = MemorySources::new()
            .with_schema("main.thrift", Schema::default().include("broken.thrift").include("common.thrift"))
            .with_text("broken.thrift", "{ not json")
            .with_schema("common.thrift", common());
        let (group, errors) = FileGroup::load(GroupConfig::default(), &sources, Path::new("main.thrift")).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, PathBuf::from("broken.thrift"));
        assert!(group.schema("common").is_some());
        assert!(group.schema("broken").is_none());
    }

    #[test]
    fn missing_include_falls_back_to_literal_path() {
        let sources = MemorySources::new()
            .with_schema("dir/main.thrift", Schema::default().include("gone.thrift"));
        let (_, errors) = FileGroup::load(GroupConfig::default(), &sources, Path::new("dir/main.thrift")).unwrap();
        assert_eq!(errors, vec![ParseError::new("gone.thrift", "no such file")]);
    }

    #[test]
    fn cyclic_includes_terminate() {
        let sources = MemorySources::new()
            .with_schema("a.thrift", Schema::default().include("b.thrift").typedef("A", FieldType::named("b.B")))
            .with_schema("b.thrift", Schema::default().include("a.thrift").typedef("B", FieldType::Primitive(Primitive::String)));
        let (group, errors) = FileGroup::load(GroupConfig::default(), &sources, Path::new("a.thrift")).unwrap();
        assert!(errors.is_empty());
        assert_eq!(group.schemas().len(), 2);
        assert_eq!(group.scope("a").unwrap().resolve_name("A").unwrap(), ir::Type::Primitive(Primitive::String));
    }

    #[test]
    fn adding_the_same_schema_twice_changes_nothing() {
        let sources = sources();
        let mut group = group();
        let resolutions = group.resolutions().map(|(k, s)| (k.to_string(), s.clone())).collect::<Vec<_>>();
        let namespaces = group.namespaces().clone();
        let errors = group.add(&sources, Path::new("idl/forecast.thrift"), forecast());
        assert!(errors.is_empty());
        let again = group.resolutions().map(|(k, s)| (k.to_string(), s.clone())).collect::<Vec<_>>();
        assert_eq!(resolutions, again);
        assert_eq!(&namespaces, group.namespaces());
    }

    #[test]
    fn qualified_reference_matches_owner_unqualified_reference() {
        let mut group = group();
        group.set_current_module("forecast").unwrap();
        let from_forecast = group.resolve_name("common.Location").unwrap();
        group.set_current_module("common").unwrap();
        let from_common = group.resolve_name("Location").unwrap();
        assert_eq!(from_forecast, from_common);
        assert_eq!(from_common, ir::Type::Named(Entity::new("common.Location", EntityKind::Record(RecordKind::Struct))));
    }

    #[test]
    fn enum_members_resolve_qualified_and_unqualified() {
        let mut group = group();
        group.set_current_module("common").unwrap();
        let local = group.resolve_value(&ConstValue::named("Weather.RAINY")).unwrap();
        let qualified = group.resolve_value(&ConstValue::named("common.Weather.RAINY")).unwrap();
        assert_eq!(local, qualified);
        assert_eq!(local, ir::Value::Named(Entity::new("common.Weather.RAINY", EntityKind::EnumValue { value: 1 })));
    }

    #[test]
    fn switching_modules_drops_previous_aliases() {
        let mut group = group();
        group.set_current_module("common").unwrap();
        assert!(group.resolve_name("Weather").is_ok());
        group.set_current_module("forecast").unwrap();
        assert_eq!(group.resolve_name("Weather").unwrap_err(), Error::UnresolvedReference {
            name: "Weather".into(),
            module: Some("forecast".into()),
        });
        assert!(group.resolutions().all(|(k, _)| k != "Weather"));
        assert!(group.resolutions().any(|(k, _)| k == "Forecast"));
    }

    #[test]
    fn current_scope_agrees_with_explicit_scope() {
        let mut group = group();
        group.set_current_module("common").unwrap();
        let explicit = group.scope("common").unwrap();
        let fresh = Scope::new(&group.resolutions, Some("common"));
        for name in ["Weather", "Celsius", "Location", "Weather.SUNNY", "common.Weather"] {
            assert_eq!(explicit.lookup(name), fresh.lookup(name), "{name}");
        }
    }

    #[test]
    fn unknown_module_cannot_become_current() {
        let mut group = group();
        assert_eq!(group.set_current_module("nope"), Err(Error::UnknownModule("nope".into())));
        assert!(group.scope("nope").is_err());
    }

    #[test]
    fn fields_resolve_type_and_default() {
        let mut group = group();
        group.set_current_module("forecast").unwrap();
        let record = group.schema("forecast").unwrap().record("Forecast").unwrap();
        let field = group.resolve_field(&record.fields[0]).unwrap();
        assert_eq!(field.ty, ir::Type::Named(Entity::new("common.Weather", EntityKind::Enum)));
        assert!(matches!(field.default, Some(ir::Value::Named(ref e)) if e.name == "common.Weather.RAINY"));
        let temps = group.resolve_field(&record.fields[1]).unwrap();
        assert_eq!(temps.ty, ir::Type::List(Box::new(ir::Type::Primitive(Primitive::Double))));
    }

    #[test]
    fn entities_borrow_their_definitions() {
        let group = group();
        let location = Entity::new("common.Location", EntityKind::Record(RecordKind::Struct));
        assert!(matches!(group.definition(&location), Some(Definition::Record(r)) if r.name == "Location"));
        let rainy = Entity::new("common.Weather.RAINY", EntityKind::EnumValue { value: 1 });
        assert!(matches!(group.definition(&rainy), Some(Definition::EnumValue(e, v)) if e.name == "Weather" && v.value == 1));
        let wrong_kind = Entity::new("common.Location", EntityKind::Enum);
        assert_eq!(group.definition(&wrong_kind), None);
    }

    #[test]
    fn check_reports_each_unresolved_name_once() {
        let broken = Schema::default()
            .include("common.thrift")
            .record_def(Record::new(RecordKind::Struct, "S", vec![
                Field::new(1, "a", FieldType::named("Missing")),
                Field::new(2, "b", FieldType::named("Missing")),
                Field::new(3, "c", FieldType::named("common.Weather"))
                    .with_default(ConstValue::Ref(ValueRef::new("common.Weather.FOGGY"))),
            ]))
            .service(Service {
                name: "Svc".into(),
                extends: Some("common.Location".into()),
                functions: [("get".to_string(), Function {
                    name: "get".into(),
                    oneway: false,
                    return_type: Some(FieldType::named("Nope")),
                    params: vec![],
                    exceptions: vec![],
                })].into_iter().collect(),
            });
        let sources = MemorySources::new()
            .with_schema("broken.thrift", broken)
            .with_schema("common.thrift", common());
        let (group, _) = FileGroup::load(GroupConfig::default(), &sources, Path::new("broken.thrift")).unwrap();
        let names = group.check().iter().filter_map(|e| e.reference().map(str::to_string)).collect::<Vec<_>>();
        assert_eq!(names, vec!["Missing", "common.Weather.FOGGY", "common.Location", "Nope"]);
    }

    #[test]
    fn broken_include_shared_by_siblings_is_reported_once() {
        let sources = MemorySources::new()
            .with_schema("main.thrift", Schema::default().include("a.thrift").include("b.thrift").include("broken.thrift"))
            .with_schema("a.thrift", Schema::default().include("broken.thrift"))
            .with_schema("b.thrift", Schema::default().include("broken.thrift"))
            .with_text("broken.thrift", "{ nope");
        let (group, errors) = FileGroup::load(GroupConfig::default(), &sources, Path::new("main.thrift")).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, PathBuf::from("broken.thrift"));
        assert_eq!(group.schemas().keys().collect::<Vec<_>>(), ["main", "a", "b"]);
    }

    #[test]
    fn check_reports_an_alias_cycle_once() {
        let looping = Schema::default()
            .typedef("Pong", FieldType::named("Ping"))
            .typedef("Ping", FieldType::named("Pong"))
            .typedef("Entry", FieldType::list(FieldType::named("Pong")));
        let sources = MemorySources::new().with_schema("loop.thrift", looping);
        let (group, _) = FileGroup::load(GroupConfig::default(), &sources, Path::new("loop.thrift")).unwrap();
        assert_eq!(group.check(), vec![Error::CyclicReference {
            chain: vec!["loop.Ping".into(), "loop.Pong".into(), "loop.Ping".into()],
        }]);
    }
}
