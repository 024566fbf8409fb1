//! Rebuilding `Message`s from whatever the durable mirror held.
//!
//! Shape-checks each record, normalizes its timestamp and guarantees id
//! uniqueness across the recovered set. Rejected records are logged and
//! dropped; a bad record never aborts recovery of the others.
//!
//! Replacement ids are derived from the record's position and content, so a
//! mirror that is never rewritten (the journal) recovers the same ids on
//! every restart.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::RecoveryError;
use crate::models::{Message, Role};

/// Namespace for ids derived during recovery.
const RECOVERED_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d1e_7a7c_4b0f_4e0a_9a51_2c3f_8e4d_b917);

/// Stable id for the record at `index`. `previous` is the id it carried, if any.
fn derived_id(index: usize, role: Role, content: &str, previous: Option<Uuid>) -> Uuid {
    let previous = previous.map(|id| id.to_string()).unwrap_or_default();
    let name = format!("{}:{}:{}:{}", index, role, previous, content);
    Uuid::new_v5(&RECOVERED_ID_NAMESPACE, name.as_bytes())
}

/// Recover every usable record from `records`, in order.
pub fn recover_records(records: Vec<Value>, now: DateTime<Utc>) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut messages = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        match recover_record(index, record, now) {
            Ok(mut msg) => {
                if !seen.insert(msg.id) {
                    let fresh = derived_id(index, msg.role, &msg.content, Some(msg.id));
                    tracing::warn!(index, old = %msg.id, new = %fresh, "Duplicate message id in chat log, reassigning");
                    msg.id = fresh;
                    seen.insert(fresh);
                }
                messages.push(msg);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping unrecoverable chat record"),
        }
    }

    messages
}

/// Shape-check a single persisted record.
pub fn recover_record(
    index: usize,
    record: Value,
    now: DateTime<Utc>,
) -> Result<Message, RecoveryError> {
    let invalid = |reason: &str| RecoveryError::InvalidRecord {
        index,
        reason: reason.to_string(),
    };

    let obj = record.as_object().ok_or_else(|| invalid("not an object"))?;

    let role: Role = obj
        .get("role")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing 'role'"))?
        .parse()
        .map_err(|_| invalid("unknown 'role'"))?;

    let content = obj
        .get("content")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| invalid("missing 'content'"))?
        .to_string();

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| derived_id(index, role, &content, None));

    let metadata = obj.get("metadata").filter(|m| !m.is_null()).cloned();

    Ok(Message {
        id,
        role,
        content,
        timestamp: normalize_timestamp(obj.get("timestamp"), now),
        metadata,
    })
}

/// Accepts RFC 3339 strings and epoch-millisecond numbers; anything else,
/// including an absent field, becomes `now`.
pub fn normalize_timestamp(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(now),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let record = json!({"id": Uuid::new_v4().to_string(), "role": "user", "content": "hi"});
        let msg = recover_record(0, record, fixed_now()).unwrap();
        assert_eq!(msg.timestamp, fixed_now());
    }

    #[test]
    fn test_unparseable_timestamp_defaults_to_now() {
        let ts = normalize_timestamp(Some(&json!("last tuesday")), fixed_now());
        assert_eq!(ts, fixed_now());
        let ts = normalize_timestamp(Some(&json!(true)), fixed_now());
        assert_eq!(ts, fixed_now());
    }

    #[test]
    fn test_rfc3339_and_epoch_millis_accepted() {
        let expected = Utc.with_ymd_and_hms(2025, 11, 4, 8, 30, 0).unwrap();
        assert_eq!(
            normalize_timestamp(Some(&json!("2025-11-04T08:30:00.000Z")), fixed_now()),
            expected
        );
        assert_eq!(
            normalize_timestamp(Some(&json!(expected.timestamp_millis())), fixed_now()),
            expected
        );
    }

    #[test]
    fn test_record_shape_checks() {
        assert!(recover_record(0, json!("just a string"), fixed_now()).is_err());
        assert!(recover_record(0, json!({"role": "user"}), fixed_now()).is_err());
        assert!(recover_record(0, json!({"role": "user", "content": ""}), fixed_now()).is_err());
        assert!(recover_record(0, json!({"role": "system", "content": "x"}), fixed_now()).is_err());
    }

    #[test]
    fn test_missing_id_gets_fresh_uuid() {
        let msg = recover_record(0, json!({"role": "assistant", "content": "ok"}), fixed_now()).unwrap();
        assert!(!msg.id.is_nil());
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_replacement_ids_are_stable_across_loads() {
        let dup = Uuid::new_v4().to_string();
        let records = || {
            vec![
                json!({"role": "user", "content": "no id"}),
                json!({"id": dup, "role": "user", "content": "a"}),
                json!({"id": dup, "role": "assistant", "content": "b"}),
            ]
        };

        let first = recover_records(records(), fixed_now());
        let second = recover_records(records(), fixed_now());
        let ids = |msgs: &[Message]| msgs.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));

        let unique: HashSet<Uuid> = first.iter().map(|m| m.id).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_same_content_at_different_positions_gets_distinct_ids() {
        let records = vec![
            json!({"role": "user", "content": "repeat"}),
            json!({"role": "user", "content": "repeat"}),
        ];
        let messages = recover_records(records, fixed_now());
        assert_ne!(messages[0].id, messages[1].id);
    }

    #[test]
    fn test_missing_timestamp_keeps_file_order_not_time_order() {
        // "now" is assigned as-is; recovery never reorders or rewrites the
        // persisted timestamps of neighbouring records
        let older = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let records = vec![
            json!({"role": "user", "content": "undated"}),
            json!({"role": "user", "content": "dated", "timestamp": older.to_rfc3339()}),
        ];
        let messages = recover_records(records, fixed_now());
        assert_eq!(messages[0].content, "undated");
        assert_eq!(messages[0].timestamp, fixed_now());
        assert_eq!(messages[1].timestamp, older);
    }

    #[test]
    fn test_duplicate_ids_are_reassigned() {
        let id = Uuid::new_v4().to_string();
        let records = vec![
            json!({"id": id, "role": "user", "content": "first"}),
            json!({"id": id, "role": "assistant", "content": "second"}),
        ];
        let messages = recover_records(records, fixed_now());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id.to_string(), id);
        assert_ne!(messages[0].id, messages[1].id);
    }

    #[test]
    fn test_bad_records_dropped_order_kept() {
        let records = vec![
            json!({"role": "user", "content": "one"}),
            json!(42),
            json!({"role": "assistant", "content": "two", "metadata": {"source": "msha"}}),
        ];
        let messages = recover_records(records, fixed_now());
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert_eq!(messages[1].metadata, Some(json!({"source": "msha"})));
    }
}
