//! Error kinds for the interpreter, grounded on the teacher's `RunError` /
//! `ExcType` pattern (`exception_private.rs`): plain enums with a hand-rolled
//! `Display` and `std::error::Error`, no derive-macro error crate — the
//! teacher doesn't reach for one either.

use std::{fmt, io, path::PathBuf};

use crate::node::SourcePos;

/// The seven error kinds of `spec.md` §7, plus a resource-limit kind this
/// expansion adds for the recursive self-reference case flagged in §9.
#[derive(Debug)]
pub enum InterpretError {
    /// Unknown symbol, or a symbol resolved to the wrong kind of binding.
    Resolution { message: String, pos: Option<SourcePos> },
    /// Unexpected node kind at a given position.
    Shape { message: String, pos: Option<SourcePos> },
    /// Wrong number of args or bound values.
    Arity { message: String, pos: Option<SourcePos> },
    /// Literal value type does not match the expected type.
    Type { message: String, pos: Option<SourcePos> },
    /// `max < min` in a bound, or a count below the allowed minimum.
    Range { message: String, pos: Option<SourcePos> },
    /// File open/parse failures, passed through from the filesystem or parser.
    Io { source: io::Error, path: Option<PathBuf> },
    /// Import path resolution failures.
    Import { message: String, pos: Option<SourcePos> },
    /// A configured resource limit (recursion depth, record count) was exceeded.
    ResourceLimit { message: String, pos: Option<SourcePos> },
}

impl InterpretError {
    pub fn resolution(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Resolution { message: message.into(), pos: Some(pos) }
    }

    pub fn shape(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Shape { message: message.into(), pos: Some(pos) }
    }

    pub fn arity(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Arity { message: message.into(), pos: Some(pos) }
    }

    pub fn type_mismatch(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Type { message: message.into(), pos: Some(pos) }
    }

    pub fn range(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Range { message: message.into(), pos: Some(pos) }
    }

    pub fn import(pos: SourcePos, message: impl Into<String>) -> Self {
        Self::Import { message: message.into(), pos: Some(pos) }
    }

    pub fn resource_limit(pos: Option<SourcePos>, message: impl Into<String>) -> Self {
        Self::ResourceLimit { message: message.into(), pos }
    }

    pub fn io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io { source, path: Some(path.into()) }
    }

    /// The position carried by this error, if any.
    pub fn pos(&self) -> Option<&SourcePos> {
        match self {
            Self::Resolution { pos, .. }
            | Self::Shape { pos, .. }
            | Self::Arity { pos, .. }
            | Self::Type { pos, .. }
            | Self::Range { pos, .. }
            | Self::Import { pos, .. }
            | Self::ResourceLimit { pos, .. } => pos.as_ref(),
            Self::Io { .. } => None,
        }
    }

    /// Fills in a source position, but only if this error doesn't already
    /// carry one — the innermost position wins, matching the teacher's
    /// `field.WrapErr(err)` call sites in the original interpreter.
    #[must_use]
    pub fn with_pos(mut self, pos: SourcePos) -> Self {
        let slot = match &mut self {
            Self::Resolution { pos, .. }
            | Self::Shape { pos, .. }
            | Self::Arity { pos, .. }
            | Self::Type { pos, .. }
            | Self::Range { pos, .. }
            | Self::Import { pos, .. }
            | Self::ResourceLimit { pos, .. } => pos,
            Self::Io { .. } => return self,
        };
        if slot.is_none() {
            *slot = Some(pos);
        }
        self
    }
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { message, pos }
            | Self::Shape { message, pos }
            | Self::Arity { message, pos }
            | Self::Type { message, pos }
            | Self::Range { message, pos }
            | Self::Import { message, pos }
            | Self::ResourceLimit { message, pos } => match pos {
                Some(pos) => write!(f, "{message} (at {pos})"),
                None => write!(f, "{message}"),
            },
            Self::Io { source, path } => match path {
                Some(path) => write!(f, "{}: {source}", path.display()),
                None => write!(f, "{source}"),
            },
        }
    }
}

impl std::error::Error for InterpretError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Chains a wrapping node's position onto an inner error without discarding
/// the position the error already carries, matching `field.WrapErr(err)` in
/// the original interpreter.
pub trait WrapErr<T> {
    fn wrap_err(self, pos: SourcePos) -> Result<T, InterpretError>;
}

impl<T> WrapErr<T> for Result<T, InterpretError> {
    fn wrap_err(self, pos: SourcePos) -> Result<T, InterpretError> {
        self.map_err(|e| e.with_pos(pos))
    }
}
