//! Typed decoding of the `{success, message?, data}` envelope and of each
//! payload shape the engine consumes.
//!
//! Every decode takes the endpoint label (for error messages), the HTTP
//! status and the raw body, so the same functions serve the live client and
//! tests that feed canned bodies.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use roster_core::PersonaId;

use crate::error::{decode_err, ApiError};

/// Wire envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

fn is_ok_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Decode a read response into its `data` payload.
///
/// - non-2xx → [`ApiError::Protocol`] with the payload message if any
/// - `success: false` → [`ApiError::Protocol`] without status
/// - non-JSON body, missing or mistyped `data` → [`ApiError::Decode`]
pub fn decode_data<T: DeserializeOwned>(
    endpoint: &str,
    status: u16,
    body: &str,
) -> Result<T, ApiError> {
    let envelope = match serde_json::from_str::<Envelope<Value>>(body) {
        Ok(envelope) => envelope,
        Err(_) if !is_ok_status(status) => {
            return Err(ApiError::Protocol {
                status: Some(status),
                message: None,
            })
        }
        Err(e) => {
            return Err(decode_err(
                endpoint,
                format!("non-JSON response (status {status}): {e}"),
            ))
        }
    };
    if !is_ok_status(status) {
        return Err(ApiError::Protocol {
            status: Some(status),
            message: envelope.message,
        });
    }
    if !envelope.success {
        return Err(ApiError::Protocol {
            status: None,
            message: envelope.message,
        });
    }
    let data = match envelope.data {
        Some(Value::Null) | None => return Err(decode_err(endpoint, "missing data field")),
        Some(data) => data,
    };
    serde_json::from_value(data).map_err(|e| decode_err(endpoint, e.to_string()))
}

/// Decode the response of a mutating call.
///
/// An empty or non-JSON 2xx body is an acknowledgement; a JSON body with
/// `success: false` is a rejection.
pub fn decode_ack(status: u16, body: &str) -> Result<(), ApiError> {
    let envelope = serde_json::from_str::<Envelope<Value>>(body).ok();
    if !is_ok_status(status) {
        return Err(ApiError::Protocol {
            status: Some(status),
            message: envelope.and_then(|e| e.message),
        });
    }
    match envelope {
        Some(Envelope {
            success: false,
            message,
            ..
        }) if body_declares_failure(body) => Err(ApiError::Protocol {
            status: None,
            message,
        }),
        _ => Ok(()),
    }
}

/// Only an explicit `"success": false` rejects an acknowledgement; bodies
/// that omit the flag are accepted.
fn body_declares_failure(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("success").and_then(Value::as_bool))
        == Some(false)
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// One entry of the class list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClass {
    pub ge_clase_id: u64,
    pub ge_clase: Option<String>,
    pub ge_clase_clave: Option<String>,
}

impl RemoteClass {
    /// Display name: `geClase`, falling back to `geClaseClave`.
    pub fn name(&self) -> Option<&str> {
        [self.ge_clase.as_deref(), self.ge_clase_clave.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonaRef {
    persona_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StaffEntry {
    persona_id: Option<u64>,
    persona: Option<PersonaRef>,
}

impl StaffEntry {
    fn persona_id(&self) -> Option<PersonaId> {
        self.persona_id
            .or_else(|| self.persona.as_ref().map(|p| p.persona_id))
            .map(PersonaId)
    }
}

/// Keys under which some deployments nest the staff list.
const STAFF_LIST_KEYS: &[&str] = &[
    "claseStaff",
    "staff",
    "personas",
    "personaRoles",
    "content",
    "items",
    "lista",
    "data",
];

/// Decode a class staff listing into the set of persona ids.
///
/// `data` is either the list itself, an object wrapping the list under one
/// of [`STAFF_LIST_KEYS`], or a single entry object.
pub fn decode_staff(endpoint: &str, status: u16, body: &str) -> Result<BTreeSet<PersonaId>, ApiError> {
    let data: Value = decode_data(endpoint, status, body)?;
    let list = match data {
        Value::Array(list) => Value::Array(list),
        Value::Object(mut map) => {
            let key = STAFF_LIST_KEYS
                .iter()
                .find(|key| map.get(**key).is_some_and(Value::is_array));
            match key {
                Some(key) => map.remove(*key).unwrap_or_default(),
                None if map.contains_key("personaId") => Value::Array(vec![Value::Object(map)]),
                None => {
                    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                    return Err(decode_err(
                        endpoint,
                        format!("data is not a list (keys: {})", keys.join(", ")),
                    ));
                }
            }
        }
        _ => return Err(decode_err(endpoint, "data is not a list")),
    };
    let entries: Vec<StaffEntry> =
        serde_json::from_value(list).map_err(|e| decode_err(endpoint, e.to_string()))?;

    entries
        .iter()
        .map(|entry| {
            entry
                .persona_id()
                .ok_or_else(|| decode_err(endpoint, "staff entry without personaId"))
        })
        .collect()
}

/// `activo` arrives as a bool, a number, or a string depending on the
/// deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ActiveFlag {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ActiveFlag {
    fn is_active(&self) -> bool {
        match self {
            ActiveFlag::Bool(b) => *b,
            ActiveFlag::Number(n) => *n != 0.0,
            ActiveFlag::Text(s) => {
                matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "si" | "sí" | "yes")
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LevelRosterItem {
    persona: PersonaRef,
    activo: Option<ActiveFlag>,
}

/// Decode a per-level teacher roster into `persona → active`.
///
/// A persona listed under several roles is active if any role is active.
/// A missing `activo` flag reads as inactive.
pub fn decode_level_roster(
    endpoint: &str,
    status: u16,
    body: &str,
) -> Result<BTreeMap<PersonaId, bool>, ApiError> {
    let items: Vec<LevelRosterItem> = decode_data(endpoint, status, body)?;
    let mut roster = BTreeMap::new();
    for item in items {
        let active = item.activo.as_ref().is_some_and(ActiveFlag::is_active);
        let slot = roster.entry(PersonaId(item.persona.persona_id)).or_insert(false);
        *slot |= active;
    }
    Ok(roster)
}
