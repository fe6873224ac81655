//! Typed view over the untyped `access` document of a component resource entry.
//!
//! Only global (digest-addressed registry) access is understood today. Every other shape
//! is rejected with an [`AccessError`] rather than guessed at.

use serde_json::Value as Json;

/// Access kinds this controller knows how to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Remote repository plus content digest, resolvable from anywhere.
    Global(GlobalAccess),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalAccess {
    /// Remote repository address, e.g. `ghcr.io/acme/app`.
    pub reference: String,
    /// Content digest, e.g. `sha256:...`.
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("access document must be an object, got {0}")]
    NotAnObject(&'static str),
    #[error("access document has no recognised access kind (expected globalAccess)")]
    Unrecognised,
    #[error("globalAccess must be an object, got {0}")]
    GlobalNotAnObject(&'static str),
    #[error("globalAccess.{0} is missing")]
    MissingField(&'static str),
    #[error("globalAccess.{field} must be a non-empty string, got {found}")]
    WrongType { field: &'static str, found: &'static str },
}

const GLOBAL_ACCESS: &str = "globalAccess";

impl Access {
    /// Interpret a raw access document. Fails closed on anything unexpected.
    pub fn from_document(doc: &Json) -> Result<Self, AccessError> {
        let obj = doc.as_object().ok_or(AccessError::NotAnObject(json_kind(doc)))?;
        let global = obj.get(GLOBAL_ACCESS).ok_or(AccessError::Unrecognised)?;
        let global = global.as_object().ok_or(AccessError::GlobalNotAnObject(json_kind(global)))?;
        let reference = required_str(global, "ref")?;
        let digest = required_str(global, "digest")?;
        Ok(Access::Global(GlobalAccess { reference, digest }))
    }

    pub fn global(&self) -> &GlobalAccess {
        match self { Access::Global(g) => g }
    }
}

impl TryFrom<&Json> for Access {
    type Error = AccessError;

    fn try_from(doc: &Json) -> Result<Self, Self::Error> {
        Access::from_document(doc)
    }
}

fn required_str(obj: &serde_json::Map<String, Json>, field: &'static str) -> Result<String, AccessError> {
    match obj.get(field) {
        None | Some(Json::Null) => Err(AccessError::MissingField(field)),
        Some(Json::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Json::String(_)) => Err(AccessError::WrongType { field, found: "empty string" }),
        Some(other) => Err(AccessError::WrongType { field, found: json_kind(other) }),
    }
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
