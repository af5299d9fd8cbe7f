//! Per-field-type arity and value-type checks, default-argument synthesis,
//! and bound (multiplicity) validation — `spec.md` §4.4 and §4.7.

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    error::InterpretError,
    generator::{ArgPayload, PrimitiveFieldType},
    node::{Bound, Node, Value},
};

/// The default argument synthesized when a primitive field's `args` is
/// empty, per the table in `spec.md` §4.4.
pub fn default_primitive_argument(field_type: PrimitiveFieldType, pos: &crate::node::SourcePos) -> ArgPayload {
    let _ = pos;
    match field_type {
        PrimitiveFieldType::String => ArgPayload::Length(5),
        PrimitiveFieldType::Integer => ArgPayload::IntRange(1, 10),
        PrimitiveFieldType::Decimal => ArgPayload::FloatRange(1.0, 10.0),
        PrimitiveFieldType::Date => ArgPayload::DateRange(unix_epoch(), Utc::now()),
        PrimitiveFieldType::Dict => unreachable!("dict fields always require an explicit dictionary name"),
    }
}

/// The default argument for `entity`/`identifier` fields: a count of `1`.
pub const DEFAULT_ENTITY_COUNT: i64 = 1;

fn unix_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().expect("epoch is always a valid timestamp")
}

fn expect_int(node: &Node) -> Result<i64, InterpretError> {
    node.value_int().ok_or_else(|| {
        InterpretError::type_mismatch(
            node.pos.clone(),
            format!("Expected {} to be a integer, but was {}.", describe(node), kind_name(node)),
        )
    })
}

fn expect_float(node: &Node) -> Result<f64, InterpretError> {
    match &node.value {
        Some(Value::Float(f)) => Ok(*f),
        _ => Err(InterpretError::type_mismatch(
            node.pos.clone(),
            format!("Expected {} to be a decimal, but was {}.", describe(node), kind_name(node)),
        )),
    }
}

fn expect_str(node: &Node) -> Result<&str, InterpretError> {
    node.value_str().ok_or_else(|| {
        InterpretError::type_mismatch(
            node.pos.clone(),
            format!("Expected {} to be a string, but was {}.", describe(node), kind_name(node)),
        )
    })
}

fn expect_timestamp(node: &Node) -> Result<DateTime<Utc>, InterpretError> {
    match &node.value {
        Some(Value::Timestamp(t)) => Ok(*t),
        _ => Err(InterpretError::type_mismatch(
            node.pos.clone(),
            format!("Expected {} to be a datetime, but was {}.", describe(node), kind_name(node)),
        )),
    }
}

fn describe(node: &Node) -> String {
    match &node.value {
        Some(Value::Str(s)) => s.clone(),
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::Float(f)) => f.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Timestamp(t)) => t.to_rfc3339(),
        Some(Value::Node(_)) | None => node.kind.to_string(),
    }
}

fn kind_name(node: &Node) -> &'static str {
    node.value.as_ref().map_or("nothing", Value::type_name)
}

fn check_arity(field_type: &str, expected: usize, args: &[Node], pos: &crate::node::SourcePos) -> Result<(), InterpretError> {
    if args.len() != expected {
        return Err(InterpretError::arity(
            args.first().map_or_else(|| pos.clone(), |n| n.pos.clone()),
            format!("Field type `{field_type}` expected {expected} args, but {} found.", args.len()),
        ));
    }
    Ok(())
}

/// Validates a non-empty `args` list against `field_type`'s arity/type rule
/// (`spec.md` §4.4's table) and produces the typed payload.
pub fn validate_primitive_args(
    field_type: PrimitiveFieldType,
    args: &[Node],
    field_pos: &crate::node::SourcePos,
) -> Result<ArgPayload, InterpretError> {
    match field_type {
        PrimitiveFieldType::Integer => {
            check_arity("integer", 2, args, field_pos)?;
            Ok(ArgPayload::IntRange(expect_int(&args[0])?, expect_int(&args[1])?))
        }
        PrimitiveFieldType::Decimal => {
            check_arity("decimal", 2, args, field_pos)?;
            Ok(ArgPayload::FloatRange(expect_float(&args[0])?, expect_float(&args[1])?))
        }
        PrimitiveFieldType::String => {
            check_arity("string", 1, args, field_pos)?;
            Ok(ArgPayload::Length(expect_int(&args[0])?))
        }
        PrimitiveFieldType::Dict => {
            check_arity("dict", 1, args, field_pos)?;
            Ok(ArgPayload::DictName(expect_str(&args[0])?.to_owned()))
        }
        PrimitiveFieldType::Date => {
            check_arity("date", 2, args, field_pos)?;
            Ok(ArgPayload::DateRange(expect_timestamp(&args[0])?, expect_timestamp(&args[1])?))
        }
    }
}

/// Validates the single integer argument an `entity`/`identifier` field
/// carries when `args` is non-empty (`spec.md` §4.4, the entity-field count).
pub fn validate_entity_count(args: &[Node], field_pos: &crate::node::SourcePos) -> Result<i64, InterpretError> {
    check_arity("entity", 1, args, field_pos)?;
    expect_int(&args[0])
}

/// Validates `field.bound` (0–2 nodes) per `spec.md` §4.7.
pub fn validate_bound(bound: Option<&[Node]>, field_pos: &crate::node::SourcePos) -> Result<Bound, InterpretError> {
    let Some(bound) = bound else {
        return Ok(Bound::default());
    };
    match bound.len() {
        0 => Ok(Bound::default()),
        1 => {
            let v = expect_int(&bound[0])?;
            Ok(Bound::exact(v))
        }
        2 => {
            let min = expect_int(&bound[0])?;
            let max = expect_int(&bound[1])?;
            if max < min {
                return Err(InterpretError::range(
                    field_pos.clone(),
                    format!("Max {max} cannot be less than min {min}"),
                ));
            }
            Ok(Bound { min, max })
        }
        _ => Err(InterpretError::arity(field_pos.clone(), "Field bound must be one or two values only")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{LiteralKind, NodeKind, SourcePos};
    use std::rc::Rc;

    fn pos() -> SourcePos {
        SourcePos::new(Rc::from("test.lang"), 1, 1)
    }

    fn int_node(v: i64) -> Node {
        Node::new(NodeKind::Literal(LiteralKind::Integer), pos()).with_value(Value::Int(v))
    }

    #[test]
    fn integer_field_requires_exactly_two_args() {
        let err = validate_primitive_args(PrimitiveFieldType::Integer, &[int_node(1)], &pos()).unwrap_err();
        assert!(matches!(err, InterpretError::Arity { .. }));
    }

    #[test]
    fn integer_field_rejects_non_integer_args() {
        let bad = Node::new(NodeKind::Literal(LiteralKind::Str), pos()).with_value(Value::Str("x".into()));
        let err = validate_primitive_args(PrimitiveFieldType::Integer, &[int_node(1), bad], &pos()).unwrap_err();
        assert!(matches!(err, InterpretError::Type { .. }));
    }

    #[test]
    fn bound_of_two_requires_max_at_least_min() {
        let err = validate_bound(Some(&[int_node(3), int_node(1)]), &pos()).unwrap_err();
        assert!(matches!(err, InterpretError::Range { .. }));
    }

    #[test]
    fn bound_of_one_produces_an_exact_range() {
        let bound = validate_bound(Some(&[int_node(4)]), &pos()).unwrap();
        assert_eq!(bound, Bound { min: 4, max: 4 });
    }

    #[test]
    fn bound_of_more_than_two_is_an_arity_error() {
        let err = validate_bound(Some(&[int_node(1), int_node(2), int_node(3)]), &pos()).unwrap_err();
        assert!(matches!(err, InterpretError::Arity { .. }));
    }

    #[test]
    fn absent_bound_defaults_to_one_one() {
        assert_eq!(validate_bound(None, &pos()).unwrap(), Bound::default());
    }
}
