use crate::core::error::AppError;
use fsb_types::Trigger;
use serde_yaml::Value;

/// Accepted shapes of the workflow `on:` field.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerDeclaration {
    /// `on: push`
    Event(String),
    /// `on: { issue_comment: { types: [created] } }`, in document order.
    Events(Vec<(String, Vec<String>)>),
}

impl TryFrom<&Value> for TriggerDeclaration {
    type Error = AppError;

    fn try_from(on: &Value) -> Result<Self, Self::Error> {
        match on {
            Value::String(event) => Ok(TriggerDeclaration::Event(event.clone())),
            Value::Mapping(events) => {
                let mut parsed = Vec::with_capacity(events.len());
                for (event, details) in events {
                    let event = event.as_str().ok_or_else(|| {
                        AppError::unrecognized_shape(format!(
                            "unexpected `on` event key: {}",
                            describe(event)
                        ))
                    })?;
                    parsed.push((event.to_string(), event_actions(event, details)?));
                }
                Ok(TriggerDeclaration::Events(parsed))
            }
            other => Err(AppError::unrecognized_shape(format!(
                "unexpected `on` type: {}",
                describe(other)
            ))),
        }
    }
}

fn event_actions(event: &str, details: &Value) -> Result<Vec<String>, AppError> {
    let Some(types) = details.as_mapping().and_then(|d| d.get("types")) else {
        return Ok(Vec::new());
    };
    match types {
        Value::String(action) => Ok(vec![action.clone()]),
        Value::Sequence(actions) => actions
            .iter()
            .map(|action| {
                action.as_str().map(String::from).ok_or_else(|| {
                    AppError::unrecognized_shape(format!(
                        "unexpected `{}.types` entry: {}",
                        event,
                        describe(action)
                    ))
                })
            })
            .collect(),
        other => Err(AppError::unrecognized_shape(format!(
            "unexpected `{}.types` type: {}",
            event,
            describe(other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Flatten a declaration into triggers, keeping document order.
pub fn normalize_triggers(declaration: &TriggerDeclaration) -> Vec<Trigger> {
    match declaration {
        TriggerDeclaration::Event(event) => vec![Trigger::new(event.clone())],
        TriggerDeclaration::Events(events) => events
            .iter()
            .map(|(event, actions)| Trigger::with_actions(event.clone(), actions.iter().cloned()))
            .collect(),
    }
}
