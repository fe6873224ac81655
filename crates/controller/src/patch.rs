//! JSON merge patch (RFC 7386) helpers for status writes.

use ferry_api::ResourceStatus;
use serde_json::{Map, Value as Json};

/// Merge patch that turns `base` into `target`, or `None` when they are equal.
/// Keys missing from `target` are emitted as `null`.
pub fn merge_patch(target: &Json, base: &Json) -> Option<Json> {
    match (target, base) {
        (Json::Object(to), Json::Object(bo)) => {
            let mut out = Map::new();
            for (k, tv) in to.iter() {
                match bo.get(k) {
                    Some(bv) if bv == tv => continue,
                    Some(bv) if tv.is_object() && bv.is_object() => {
                        if let Some(p) = merge_patch(tv, bv) { out.insert(k.clone(), p); }
                    }
                    _ => { out.insert(k.clone(), tv.clone()); }
                }
            }
            for k in bo.keys() {
                if !to.contains_key(k) { out.insert(k.clone(), Json::Null); }
            }
            if out.is_empty() { None } else { Some(Json::Object(out)) }
        }
        (t, b) => if t == b { None } else { Some(t.clone()) },
    }
}

/// Apply a merge patch in place.
pub fn apply_merge_patch(target: &mut Json, patch: &Json) {
    let Json::Object(po) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() { *target = Json::Object(Map::new()); }
    if let Json::Object(to) = target {
        for (k, pv) in po.iter() {
            if pv.is_null() {
                to.remove(k);
            } else {
                apply_merge_patch(to.entry(k.clone()).or_insert(Json::Null), pv);
            }
        }
    }
}

/// `{"status": {...}}` with only the fields that changed, or `None`.
pub fn status_patch(before: &ResourceStatus, after: &ResourceStatus) -> Result<Option<Json>, serde_json::Error> {
    let diff = merge_patch(&serde_json::to_value(after)?, &serde_json::to_value(before)?);
    Ok(diff.map(|d| serde_json::json!({ "status": d })))
}
