use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::display::ScoreField;
use crate::error::LiveScoreError;
use crate::form::FormFields;


// Score update pushed by the server. Every field is optional and independent: only fields
// present in the payload touch the page. A field that is present but `null` is kept as
// `Some(Value::Null)`, which clears the slot.
#[derive(Clone, PartialEq, Default, Debug, Serialize, Deserialize)]
pub struct ScoreUpdate {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub home_score: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub away_score: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub current_batsman: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub current_bowler: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub balls_remaining: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub innings: Option<Value>,
}

// Without this `null` would collapse into `None`, i.e. "absent".
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ScoreUpdate {
    pub fn parse(payload: &str) -> Result<Self, LiveScoreError> {
        let value: Value = serde_json::from_str(payload)?;
        if !value.is_object() {
            return Err(LiveScoreError::MalformedPayload(format!(
                "expected JSON object, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn get(&self, field: ScoreField) -> Option<&Value> {
        match field {
            ScoreField::HomeScore => self.home_score.as_ref(),
            ScoreField::AwayScore => self.away_score.as_ref(),
            ScoreField::CurrentBatsman => self.current_batsman.as_ref(),
            ScoreField::CurrentBowler => self.current_bowler.as_ref(),
            ScoreField::BallsRemaining => self.balls_remaining.as_ref(),
            ScoreField::Innings => self.innings.as_ref(),
        }
    }

    pub fn set(&mut self, field: ScoreField, value: Value) {
        let slot = match field {
            ScoreField::HomeScore => &mut self.home_score,
            ScoreField::AwayScore => &mut self.away_score,
            ScoreField::CurrentBatsman => &mut self.current_batsman,
            ScoreField::CurrentBowler => &mut self.current_bowler,
            ScoreField::BallsRemaining => &mut self.balls_remaining,
            ScoreField::Innings => &mut self.innings,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool { self.iter_present().next().is_none() }

    // Present fields with their display text, in application order.
    pub fn iter_present(&self) -> impl Iterator<Item = (ScoreField, String)> + '_ {
        ScoreField::iter()
            .filter_map(|field| self.get(field).map(|value| (field, display_text(value))))
    }
}

// Text a page shows for a value, following JavaScript string conversion: `120.0` is "120",
// arrays are comma-joined with `null` items empty, objects are "[object Object]".
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => js_number_text(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

// Improvement potential: JavaScript switches to exponent notation below 1e-6 and from 1e21 on.
fn js_number_text(f: f64) -> String {
    if f == 0.0 {
        // Covers -0.0, which JavaScript prints as "0".
        "0".to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Envelope for a score-update form relayed over the match socket.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FormSubmission<'a> {
    pub message: &'a FormFields,
}

impl<'a> FormSubmission<'a> {
    pub fn new(fields: &'a FormFields) -> Self { FormSubmission { message: fields } }

    pub fn to_json(&self) -> Result<String, LiveScoreError> {
        serde_json::to_string(self).map_err(|err| LiveScoreError::SocketSend(err.to_string()))
    }
}
