//! The generator collaborator: runtime carrier of an entity definition, the
//! extension ("inherits") relation between generators, and record generation.
//!
//! Per `spec.md` §9 ("use an index into a registry ... not a raw reference,
//! to avoid lifetime coupling"), generators live in a [`GeneratorArena`]
//! addressed by [`GeneratorId`] — the same indirection the teacher uses for
//! `NamespaceId` (`namespace.rs`) rather than threading lifetimes through
//! parent pointers.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rand::Rng;

use crate::{
    dict::DictionaryRegistry,
    error::InterpretError,
    node::{Bound, SourcePos},
    resource::ResourceLimits,
};

/// Index into a [`GeneratorArena`]. Stable for the lifetime of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratorId(u32);

impl GeneratorId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }
}

/// The built-in primitive field types the field validator and generator
/// collaborator both honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveFieldType {
    String,
    Integer,
    Decimal,
    Date,
    Dict,
}

impl PrimitiveFieldType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "decimal" => Some(Self::Decimal),
            "date" => Some(Self::Date),
            "dict" => Some(Self::Dict),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Dict => "dict",
        }
    }
}

/// The validated argument payload for a primitive dynamic field, per the
/// `spec.md` §4.4 payload-shape table.
#[derive(Debug, Clone)]
pub enum ArgPayload {
    Length(i64),
    IntRange(i64, i64),
    FloatRange(f64, f64),
    DateRange(DateTime<Utc>, DateTime<Utc>),
    DictName(String),
}

/// A dynamic field's definition, as registered by `with_field` /
/// `with_entity_field`.
#[derive(Debug, Clone)]
pub enum FieldDef {
    Primitive { field_type: PrimitiveFieldType, payload: ArgPayload, bound: Bound },
    /// `count` is the entity-field argument quirk flagged in `spec.md` §9:
    /// here an integer argument means "produce this many nested records per
    /// occurrence", not a value parameterization like every other type.
    Entity { nested: GeneratorId, count: i64, bound: Bound },
}

impl FieldDef {
    fn bound(&self) -> Bound {
        match self {
            Self::Primitive { bound, .. } | Self::Entity { bound, .. } => *bound,
        }
    }
}

/// A single field declaration kept on a generator: either a constant
/// (`static`) or a value drawn at generate time (`dynamic`).
#[derive(Debug, Clone)]
enum Field {
    Static(crate::node::Value),
    Dynamic(FieldDef),
}

/// The runtime carrier of an entity definition.
///
/// Field lookup for `generate` walks this generator's own declarations first
/// and falls back to the parent chain, so a child's declaration overrides
/// the parent's on name collision (`spec.md` §3's Generator invariant).
#[derive(Debug, Clone)]
pub struct Generator {
    name: String,
    parent: Option<GeneratorId>,
    own_fields: IndexMap<String, Field>,
}

impl Generator {
    fn new(name: impl Into<String>, parent: Option<GeneratorId>) -> Self {
        Self { name: name.into(), parent, own_fields: IndexMap::new() }
    }

    /// The type tag used as the output accumulator's key.
    pub fn type_tag(&self) -> &str {
        &self.name
    }

    pub fn with_static_field(&mut self, name: impl Into<String>, value: crate::node::Value) {
        self.own_fields.insert(name.into(), Field::Static(value));
    }

    pub fn with_field(
        &mut self,
        name: impl Into<String>,
        field_type: PrimitiveFieldType,
        payload: ArgPayload,
        bound: Bound,
    ) {
        self.own_fields
            .insert(name.into(), Field::Dynamic(FieldDef::Primitive { field_type, payload, bound }));
    }

    pub fn with_entity_field(&mut self, name: impl Into<String>, nested: GeneratorId, count: i64, bound: Bound) {
        self.own_fields
            .insert(name.into(), Field::Dynamic(FieldDef::Entity { nested, count, bound }));
    }
}

/// Arena owning every generator constructed during an interpretation.
///
/// Generators are immutable once the evaluator finishes processing their
/// declaring AST node (`spec.md` §3); the arena enforces this by handing out
/// `&Generator` only after construction completes via `get`.
#[derive(Debug, Default)]
pub struct GeneratorArena {
    generators: Vec<Generator>,
}

impl GeneratorArena {
    #[must_use]
    pub fn new() -> Self {
        Self { generators: Vec::new() }
    }

    pub fn new_generator(&mut self, name: impl Into<String>, parent: Option<GeneratorId>) -> GeneratorId {
        let id = GeneratorId::new(self.generators.len() as u32);
        self.generators.push(Generator::new(name, parent));
        id
    }

    /// Equivalent to `new_generator`, kept distinct to mirror the collaborator
    /// contract in `spec.md` §6 (`extendGenerator` vs `newGenerator`).
    pub fn extend_generator(&mut self, name: impl Into<String>, parent: GeneratorId) -> GeneratorId {
        self.new_generator(name, Some(parent))
    }

    pub fn get(&self, id: GeneratorId) -> &Generator {
        &self.generators[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: GeneratorId) -> &mut Generator {
        &mut self.generators[id.0 as usize]
    }

    /// Resolves a field by name along the generator's parent chain, child
    /// declarations taking precedence (`spec.md` §3's override invariant).
    fn resolve_field(&self, id: GeneratorId, name: &str) -> Option<(&Field, GeneratorId)> {
        let mut current = id;
        loop {
            let gen = self.get(current);
            if let Some(field) = gen.own_fields.get(name) {
                return Some((field, current));
            }
            current = gen.parent?;
        }
    }

    /// The full, order-preserving set of field names visible on a generator:
    /// its own declarations, then any parent fields it did not override.
    pub fn field_names(&self, id: GeneratorId) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let gen = self.get(cur);
            for name in gen.own_fields.keys() {
                if seen.insert(name.clone()) {
                    names.push(name.clone());
                }
            }
            current = gen.parent;
        }
        names
    }

    /// Produces `count` records for the generator at `id`.
    pub fn generate(
        &self,
        id: GeneratorId,
        count: i64,
        rng: &mut impl Rng,
        dicts: &DictionaryRegistry,
        limits: &ResourceLimits,
        pos: Option<&SourcePos>,
    ) -> Result<Vec<Record>, InterpretError> {
        self.generate_at_depth(id, count, rng, dicts, limits, pos, 0)
    }

    fn generate_at_depth(
        &self,
        id: GeneratorId,
        count: i64,
        rng: &mut impl Rng,
        dicts: &DictionaryRegistry,
        limits: &ResourceLimits,
        pos: Option<&SourcePos>,
        depth: u32,
    ) -> Result<Vec<Record>, InterpretError> {
        if depth > limits.max_recursion_depth {
            return Err(InterpretError::resource_limit(
                pos.cloned(),
                format!(
                    "nested entity generation exceeded max recursion depth ({})",
                    limits.max_recursion_depth
                ),
            ));
        }
        if count > limits.max_records_per_generate {
            return Err(InterpretError::resource_limit(
                pos.cloned(),
                format!(
                    "requested {count} records exceeds the configured limit of {}",
                    limits.max_records_per_generate
                ),
            ));
        }

        let mut records = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            records.push(self.generate_one(id, rng, dicts, limits, pos, depth)?);
        }
        Ok(records)
    }

    fn generate_one(
        &self,
        id: GeneratorId,
        rng: &mut impl Rng,
        dicts: &DictionaryRegistry,
        limits: &ResourceLimits,
        pos: Option<&SourcePos>,
        depth: u32,
    ) -> Result<Record, InterpretError> {
        let mut record = Record::new();
        for name in self.field_names(id) {
            let (field, _owner) = self.resolve_field(id, &name).expect("field_names only returns known names");
            let value = match field {
                Field::Static(value) => static_to_generated(value),
                Field::Dynamic(def) => self.generate_field(def, rng, dicts, limits, pos, depth)?,
            };
            record.insert(name, value);
        }
        Ok(record)
    }

    fn generate_field(
        &self,
        def: &FieldDef,
        rng: &mut impl Rng,
        dicts: &DictionaryRegistry,
        limits: &ResourceLimits,
        pos: Option<&SourcePos>,
        depth: u32,
    ) -> Result<GeneratedValue, InterpretError> {
        let bound = def.bound();
        let occurrences = if bound.min == bound.max {
            bound.min
        } else {
            rng.gen_range(bound.min..=bound.max)
        };

        if bound.is_scalar() {
            return self.draw_occurrence(def, rng, dicts, limits, pos, depth);
        }

        let mut values = Vec::with_capacity(occurrences.max(0) as usize);
        for _ in 0..occurrences {
            values.push(self.draw_occurrence(def, rng, dicts, limits, pos, depth)?);
        }
        Ok(GeneratedValue::List(values))
    }

    fn draw_occurrence(
        &self,
        def: &FieldDef,
        rng: &mut impl Rng,
        dicts: &DictionaryRegistry,
        limits: &ResourceLimits,
        pos: Option<&SourcePos>,
        depth: u32,
    ) -> Result<GeneratedValue, InterpretError> {
        match def {
            FieldDef::Primitive { field_type, payload, .. } => Ok(draw_primitive(*field_type, payload, rng, dicts)?),
            FieldDef::Entity { nested, count, .. } => {
                let mut records = self.generate_at_depth(*nested, *count, rng, dicts, limits, pos, depth + 1)?;
                if *count == 1 {
                    Ok(GeneratedValue::Record(records.pop().unwrap_or_default()))
                } else {
                    Ok(GeneratedValue::List(records.into_iter().map(GeneratedValue::Record).collect()))
                }
            }
        }
    }
}

fn static_to_generated(value: &crate::node::Value) -> GeneratedValue {
    use crate::node::Value as V;
    match value {
        V::Str(s) => GeneratedValue::Str(s.clone()),
        V::Int(i) => GeneratedValue::Int(*i),
        V::Float(f) => GeneratedValue::Float(*f),
        V::Timestamp(t) => GeneratedValue::Timestamp(*t),
        V::Bool(b) => GeneratedValue::Bool(*b),
        V::Null => GeneratedValue::Null,
        V::Node(_) => GeneratedValue::Null,
    }
}

fn draw_primitive(
    field_type: PrimitiveFieldType,
    payload: &ArgPayload,
    rng: &mut impl Rng,
    dicts: &DictionaryRegistry,
) -> Result<GeneratedValue, InterpretError> {
    match (field_type, payload) {
        (PrimitiveFieldType::String, ArgPayload::Length(len)) => {
            const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
            let s: String = (0..(*len).max(0))
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                .collect();
            Ok(GeneratedValue::Str(s))
        }
        (PrimitiveFieldType::Integer, ArgPayload::IntRange(min, max)) => {
            let (lo, hi) = if min <= max { (*min, *max) } else { (*max, *min) };
            Ok(GeneratedValue::Int(rng.gen_range(lo..=hi)))
        }
        (PrimitiveFieldType::Decimal, ArgPayload::FloatRange(min, max)) => {
            let (lo, hi) = if min <= max { (*min, *max) } else { (*max, *min) };
            Ok(GeneratedValue::Float(rng.gen_range(lo..=hi)))
        }
        (PrimitiveFieldType::Date, ArgPayload::DateRange(start, end)) => {
            let (lo, hi) = if start <= end { (*start, *end) } else { (*end, *start) };
            let span = (hi - lo).num_seconds().max(0);
            let offset = rng.gen_range(0..=span);
            Ok(GeneratedValue::Timestamp(lo + chrono::Duration::seconds(offset)))
        }
        (PrimitiveFieldType::Dict, ArgPayload::DictName(name)) => Ok(GeneratedValue::Str(dicts.sample(name, rng)?)),
        _ => unreachable!("field validator guarantees payload shape matches field_type"),
    }
}

/// A produced record: field name to concrete value.
pub type Record = IndexMap<String, GeneratedValue>;

/// The value a generated field holds once drawn. Distinct from
/// [`crate::node::Value`], which also has to represent unresolved AST
/// payloads (`Value::Node`) that never survive to a finished record.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum GeneratedValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    #[serde(serialize_with = "serialize_timestamp")]
    Timestamp(DateTime<Utc>),
    Null,
    List(Vec<GeneratedValue>),
    Record(Record),
}

/// Renders a timestamp as `YYYY-MM-DD HH:MM:SS ±HHMM`, the canonical form
/// `spec.md` §8's round-trip law names.
fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S %z").to_string())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::node::Value;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn static_field_passes_through_verbatim() {
        let mut arena = GeneratorArena::new();
        let id = arena.new_generator("Const", None);
        arena.get_mut(id).with_static_field("kind", Value::Str("fixed".into()));
        let records = arena
            .generate(id, 1, &mut rng(), &DictionaryRegistry::new(), &ResourceLimits::default(), None)
            .unwrap();
        assert!(matches!(&records[0]["kind"], GeneratedValue::Str(s) if s == "fixed"));
    }

    #[test]
    fn string_field_respects_requested_length() {
        let mut arena = GeneratorArena::new();
        let id = arena.new_generator("Person", None);
        arena
            .get_mut(id)
            .with_field("name", PrimitiveFieldType::String, ArgPayload::Length(5), Bound::default());
        let records = arena
            .generate(id, 3, &mut rng(), &DictionaryRegistry::new(), &ResourceLimits::default(), None)
            .unwrap();
        assert_eq!(records.len(), 3);
        for record in &records {
            match &record["name"] {
                GeneratedValue::Str(s) => assert_eq!(s.len(), 5),
                other => panic!("expected a string, got {other:?}"),
            }
        }
    }

    #[test]
    fn child_overrides_parent_field_by_name() {
        let mut arena = GeneratorArena::new();
        let a = arena.new_generator("A", None);
        arena
            .get_mut(a)
            .with_field("x", PrimitiveFieldType::String, ArgPayload::Length(4), Bound::default());
        let b = arena.extend_generator("B", a);
        arena
            .get_mut(b)
            .with_field("x", PrimitiveFieldType::String, ArgPayload::Length(8), Bound::default());

        let records = arena
            .generate(b, 1, &mut rng(), &DictionaryRegistry::new(), &ResourceLimits::default(), None)
            .unwrap();
        match &records[0]["x"] {
            GeneratedValue::Str(s) => assert_eq!(s.len(), 8),
            other => panic!("expected a string, got {other:?}"),
        }
    }

    #[test]
    fn bound_controls_field_multiplicity() {
        let mut arena = GeneratorArena::new();
        let id = arena.new_generator("X", None);
        arena.get_mut(id).with_field(
            "tags",
            PrimitiveFieldType::String,
            ArgPayload::Length(3),
            Bound { min: 1, max: 3 },
        );
        let records = arena
            .generate(id, 20, &mut rng(), &DictionaryRegistry::new(), &ResourceLimits::default(), None)
            .unwrap();
        for record in &records {
            match &record["tags"] {
                GeneratedValue::List(values) => assert!((1..=3).contains(&values.len())),
                other => panic!("expected a list, got {other:?}"),
            }
        }
    }
}
