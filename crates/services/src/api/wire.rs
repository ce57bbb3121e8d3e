//! Response shapes the backend is known to send.
//!
//! Payloads arrive bare or wrapped (`{ data: .. }`, `{ tutorials: .. }`,
//! `{ progress: .. }`); [`unwrap_envelope`] peels those layers before typed
//! decoding.

use std::collections::BTreeSet;

use diy_core::model::{Progress, Tutorial, TutorialId, UserProfile};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{AuthSession, ProgressRecord, TutorialRef};
use crate::error::ApiError;

/// Peel `data` wrappers, then the first matching named wrapper in `keys`.
pub(crate) fn unwrap_envelope(mut value: Value, keys: &[&str]) -> Value {
    loop {
        let mut map = match value {
            Value::Object(map) => map,
            other => return other,
        };
        if let Some(inner) = map.remove("data") {
            value = inner;
            continue;
        }
        return match keys.iter().find(|k| map.contains_key(**k)) {
            Some(key) => map.remove(*key).unwrap_or(Value::Null),
            None => Value::Object(map),
        };
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

pub(crate) fn auth_session(body: Value) -> Result<AuthSession, ApiError> {
    let mut body = unwrap_envelope(body, &[]);
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);
    let user = match body.as_object_mut().and_then(|m| m.remove("user")) {
        Some(user) => user,
        None => body,
    };
    Ok(AuthSession {
        user: decode::<UserProfile>(user)?,
        token,
    })
}

pub(crate) fn user(body: Value) -> Result<UserProfile, ApiError> {
    decode(unwrap_envelope(body, &["user"]))
}

pub(crate) fn tutorials(body: Value) -> Result<Vec<Tutorial>, ApiError> {
    let list: Vec<Tutorial> = decode(unwrap_envelope(body, &["tutorials"]))?;
    Ok(list.into_iter().map(Tutorial::normalized).collect())
}

pub(crate) fn tutorial(body: Value) -> Result<Tutorial, ApiError> {
    decode::<Tutorial>(unwrap_envelope(body, &["tutorial"])).map(Tutorial::normalized)
}

pub(crate) fn progress_records(body: Value) -> Result<Vec<ProgressRecord>, ApiError> {
    let wires: Vec<ProgressWire> = decode(unwrap_envelope(body, &["progress"]))?;
    Ok(wires.into_iter().filter_map(ProgressWire::into_record).collect())
}

/// `None` when the backend has nothing stored for this learner yet.
pub(crate) fn tutorial_progress(
    body: Value,
    tutorial_id: &TutorialId,
) -> Result<Option<Progress>, ApiError> {
    let inner = unwrap_envelope(body, &["progress"]);
    if inner.is_null() {
        return Ok(None);
    }
    let mut wire: ProgressWire = decode(inner)?;
    if wire.tutorial_id.is_none() && wire.tutorial.is_none() {
        wire.tutorial_id = Some(tutorial_id.clone());
    }
    Ok(wire.into_record().map(|r| r.progress))
}

// ─── Progress records ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressWire {
    #[serde(default)]
    tutorial: Option<TutorialField>,
    #[serde(default)]
    tutorial_id: Option<TutorialId>,
    #[serde(default = "first_step")]
    current_step: u32,
    #[serde(default)]
    completed_steps: Vec<CompletedStep>,
    #[serde(default)]
    is_completed: bool,
    #[serde(default, deserialize_with = "de_seconds")]
    time_spent: u64,
}

fn first_step() -> u32 {
    1
}

/// A bare id or a populated tutorial document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TutorialField {
    Id(TutorialId),
    Populated(PopulatedTutorial),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopulatedTutorial {
    #[serde(alias = "_id")]
    id: TutorialId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default, alias = "image", alias = "thumbnail")]
    image_url: Option<String>,
    #[serde(default)]
    steps: Vec<Value>,
    #[serde(default)]
    total_steps: Option<u32>,
}

/// Completed steps are stored as plain numbers or as `{stepNumber, completed}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletedStep {
    Number(u32),
    Entry {
        #[serde(alias = "stepNumber", alias = "step")]
        number: u32,
        #[serde(default = "yes")]
        completed: bool,
    },
}

fn yes() -> bool {
    true
}

fn de_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    match value {
        None => Ok(0),
        Some(v) if v.is_finite() && v >= 0.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let secs = v.round() as u64;
            Ok(secs)
        }
        Some(v) => Err(de::Error::custom(format!("invalid time spent: {v}"))),
    }
}

impl ProgressWire {
    fn into_record(self) -> Option<ProgressRecord> {
        let (tutorial_id, tutorial) = match self.tutorial {
            Some(TutorialField::Populated(doc)) => {
                let total_steps = doc
                    .total_steps
                    .or_else(|| u32::try_from(doc.steps.len()).ok())
                    .unwrap_or(0);
                let summary = TutorialRef {
                    id: doc.id.clone(),
                    title: doc.title,
                    category: doc.category,
                    image_url: doc.image_url,
                    total_steps,
                };
                (doc.id, Some(summary))
            }
            Some(TutorialField::Id(id)) => (id, None),
            None => (self.tutorial_id?, None),
        };

        let completed_steps: BTreeSet<u32> = self
            .completed_steps
            .into_iter()
            .filter_map(|entry| match entry {
                CompletedStep::Number(n) => Some(n),
                CompletedStep::Entry { number, completed } => completed.then_some(number),
            })
            .filter(|n| *n > 0)
            .collect();

        Some(ProgressRecord {
            progress: Progress {
                tutorial_id,
                current_step: self.current_step.max(1),
                completed_steps,
                is_completed: self.is_completed,
                time_spent_secs: self.time_spent,
            },
            tutorial,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_layers_are_peeled() {
        let body = json!({"success": true, "data": {"tutorials": [1, 2]}});
        assert_eq!(unwrap_envelope(body, &["tutorials"]), json!([1, 2]));
        assert_eq!(unwrap_envelope(json!([3]), &["tutorials"]), json!([3]));
    }

    #[test]
    fn auth_response_flat_or_nested() {
        let flat = json!({
            "_id": "u1", "name": "Budi", "username": "budi",
            "email": "budi@mail.com", "token": "jwt"
        });
        let session = auth_session(flat).unwrap();
        assert_eq!(session.token.as_deref(), Some("jwt"));
        assert_eq!(session.user.username, "budi");

        let nested = json!({"data": {"token": "t2", "user": {"name": "Sari", "username": "sari", "email": "s@mail.com"}}});
        let session = auth_session(nested).unwrap();
        assert_eq!(session.token.as_deref(), Some("t2"));
        assert_eq!(session.user.email, "s@mail.com");
    }

    #[test]
    fn progress_records_accept_populated_and_bare_tutorials() {
        let body = json!({"progress": [
            {
                "tutorial": {"_id": "t1", "title": "Keran", "category": "Plambing", "steps": [{}, {}, {}]},
                "currentStep": 2,
                "completedSteps": [{"stepNumber": 1, "completed": true}, {"stepNumber": 2, "completed": false}],
                "timeSpent": 90.4
            },
            {"tutorial": "t2", "completedSteps": [1, 2], "isCompleted": true},
            {"currentStep": 3}
        ]});
        let records = progress_records(body).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.progress.tutorial_id.as_str(), "t1");
        assert_eq!(first.progress.completed_steps, BTreeSet::from([1]));
        assert_eq!(first.progress.time_spent_secs, 90);
        assert_eq!(first.tutorial.as_ref().unwrap().total_steps, 3);

        let second = &records[1];
        assert!(second.progress.is_completed);
        assert!(second.tutorial.is_none());
    }

    #[test]
    fn missing_tutorial_progress_is_none() {
        let id = TutorialId::new("t9");
        assert!(tutorial_progress(json!({"progress": null}), &id).unwrap().is_none());
        let found = tutorial_progress(json!({"currentStep": 4, "timeSpent": 30}), &id)
            .unwrap()
            .unwrap();
        assert_eq!(found.tutorial_id, id);
        assert_eq!(found.current_step, 4);
    }
}
