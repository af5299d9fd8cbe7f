#![doc = include_str!("../../../README.md")]
#![expect(clippy::module_name_repetitions, reason = "public names mirror their module for discoverability")]
#![expect(clippy::must_use_candidate, reason = "builder-style methods are the common case, not every call site")]

mod anon;
mod dict;
mod error;
mod eval;
mod generator;
mod node;
mod output;
mod parser;
mod resource;
mod scope;
mod timestamp;
mod validate;

pub use crate::{
    dict::DictionaryRegistry,
    error::{InterpretError, WrapErr},
    eval::Interpreter,
    generator::{ArgPayload, FieldDef, Generator, GeneratorArena, GeneratorId, GeneratedValue, PrimitiveFieldType, Record},
    node::{Bound, LiteralKind, Node, NodeKind, SourcePos, Value},
    output::OutputAccumulator,
    resource::ResourceLimits,
    scope::{Binding, Scope, ScopeEntry},
};
