//! JSON to Bolt parameter conversion.
//!
//! Records and run parameters live as `serde_json` values until execution;
//! this module converts them into the driver's Bolt types so a whole record
//! chunk can travel as one `$DictList` array parameter.

use std::collections::HashMap;

use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltString, BoltType, Query,
};
use serde_json::Value;

use crate::statement::GraphStatement;

/// Convert one JSON value to its Bolt equivalent.
///
/// Nulls inside objects are dropped rather than encoded: Cypher reads a
/// missing map key as `null`, so `SET i.prop = item.field` behaves
/// identically and the wire payload stays smaller.
pub fn json_to_bolt(value: &Value) -> Option<BoltType> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(BoltType::Boolean(BoltBoolean { value: *b })),
        Value::Number(n) => Some(if let Some(i) = n.as_i64() {
            BoltType::Integer(BoltInteger { value: i })
        } else {
            BoltType::Float(BoltFloat {
                value: n.as_f64().unwrap_or(f64::NAN),
            })
        }),
        Value::String(s) => Some(BoltType::String(BoltString { value: s.clone() })),
        Value::Array(items) => {
            let value = items.iter().filter_map(json_to_bolt).collect();
            Some(BoltType::List(BoltList { value }))
        }
        Value::Object(map) => {
            let mut value = HashMap::new();
            for (k, v) in map {
                if let Some(bolt) = json_to_bolt(v) {
                    value.insert(BoltString { value: k.clone() }, bolt);
                }
            }
            Some(BoltType::Map(BoltMap { value }))
        }
    }
}

/// Build a driver query from a compiled statement.
pub fn to_query(stmt: &GraphStatement) -> Query {
    let mut query = Query::new(stmt.query.clone());
    for (name, value) in &stmt.parameters {
        if let Some(bolt) = json_to_bolt(value) {
            query = query.param(name, bolt);
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_convert() {
        assert_eq!(
            json_to_bolt(&json!("w1")),
            Some(BoltType::String(BoltString { value: "w1".into() }))
        );
        assert_eq!(
            json_to_bolt(&json!(42)),
            Some(BoltType::Integer(BoltInteger { value: 42 }))
        );
        assert_eq!(
            json_to_bolt(&json!(true)),
            Some(BoltType::Boolean(BoltBoolean { value: true }))
        );
    }

    #[test]
    fn test_null_is_dropped() {
        assert_eq!(json_to_bolt(&Value::Null), None);
    }

    #[test]
    fn test_object_drops_null_fields() {
        let bolt = json_to_bolt(&json!({"id": "w1", "name": null})).unwrap();
        match bolt {
            BoltType::Map(map) => {
                assert_eq!(map.value.len(), 1);
                assert!(map.value.contains_key(&BoltString { value: "id".into() }));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn test_array_of_records_converts() {
        let bolt = json_to_bolt(&json!([{"id": "a"}, {"id": "b"}])).unwrap();
        match bolt {
            BoltType::List(list) => assert_eq!(list.value.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }
}
