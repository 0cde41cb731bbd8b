//! # Merge-Patch Update Contract
//!
//! Passport updates are JSON Merge Patch documents (RFC 7396) applied to the
//! camelCase JSON form of the stored passport:
//!
//! - objects merge recursively,
//! - `null` removes a member,
//! - arrays and scalars replace wholesale.
//!
//! On top of the generic algorithm, [`apply_passport_patch`] enforces the
//! server-managed members:
//!
//! | Member | Rule |
//! |--------|------|
//! | `id` | may appear only with the current value |
//! | `anchorHistory`, `blockchainIdentifiers` | written by anchoring only; rejected |
//! | `consumerScans` | written by scan recording only; rejected |
//! | `metadata.createdAt` | restored from the stored passport |
//! | `metadata.lastUpdated` | advanced by the server |
//!
//! Archived passports accept patches that touch `metadata` only.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{PatchError, ValidationError};
use crate::passport::Passport;

/// Members that only dedicated operations may write.
const SERVER_MANAGED: &[&str] = &["anchorHistory", "blockchainIdentifiers", "consumerScans"];

/// Apply an RFC 7396 merge patch to `target` in place.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_obj) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_obj) = target {
        for (key, value) in patch_obj {
            if value.is_null() {
                target_obj.remove(key);
            } else {
                merge_patch(target_obj.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Produce the updated passport for `patch`, leaving `current` untouched.
pub fn apply_passport_patch(
    current: &Passport,
    patch: &Value,
    now: DateTime<Utc>,
) -> Result<Passport, PatchError> {
    let Value::Object(members) = patch else {
        return Err(ValidationError::InvalidField {
            field: "body".to_string(),
            reason: "merge patch must be a JSON object".to_string(),
        }
        .into());
    };

    if let Some(id) = members.get("id") {
        if id.as_str() != Some(current.id.as_str()) {
            return Err(ValidationError::ImmutableField("id".to_string()).into());
        }
    }
    if let Some(field) = SERVER_MANAGED.iter().find(|f| members.contains_key(**f)) {
        return Err(ValidationError::ImmutableField((*field).to_string()).into());
    }
    if current.is_archived() && members.keys().any(|k| k != "metadata" && k != "id") {
        return Err(PatchError::Archived(current.id.clone()));
    }

    let mut doc = serde_json::to_value(current)
        .map_err(|e| ValidationError::MalformedPassport(e.to_string()))?;
    merge_patch(&mut doc, patch);

    let mut updated: Passport = serde_json::from_value(doc)
        .map_err(|e| ValidationError::MalformedPassport(e.to_string()))?;

    updated.metadata.created_at = current.metadata.created_at;
    updated.metadata.last_updated = current.metadata.last_updated;
    updated.touch(now);

    if patch_sets(members, "verification", "status") {
        if let Some(v) = updated.verification.as_mut() {
            v.last_checked = Some(now);
        }
    }

    if let Some(Value::Object(entries)) = members.get("complianceMap") {
        for (key, entry_patch) in entries {
            let explicit_time = entry_patch.get("lastChecked").is_some_and(|t| !t.is_null());
            let status_changed = entry_patch.get("status").is_some_and(|s| !s.is_null());
            if status_changed && !explicit_time {
                if let Some(entry) = updated.compliance_map.get_mut(key) {
                    entry.last_checked = now;
                }
            }
        }
    }

    updated.validate()?;
    Ok(updated)
}

fn patch_sets(members: &Map<String, Value>, object: &str, field: &str) -> bool {
    members
        .get(object)
        .and_then(|o| o.get(field))
        .is_some_and(|v| !v.is_null())
}
