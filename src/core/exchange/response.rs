//! Decoding of downstream delivery responses

use crate::adapters::upstream::TransportResponse;
use crate::domain::exchange::{ARRAY_NAME, ROW_STATUS_SUCCESS};
use crate::domain::{DeliveryOutcome, SUCCESS_SENTINEL};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(rename = "UsersStatus")]
    users_status: Option<Vec<SubjectStatus>>,
}

#[derive(Debug, Deserialize)]
struct SubjectStatus {
    #[serde(rename = "userGuid", default)]
    user_guid: String,
    #[serde(default)]
    status: String,
}

/// Decoded response of one delivery call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretedResponse {
    pub outcome: DeliveryOutcome,
    /// A 200 whose body could not be read as a status array
    pub malformed: bool,
}

/// Maps an HTTP answer of a downstream target to a delivery outcome
///
/// - non-200: batch error `status <code>: <body>`
/// - 200 with an empty body: delivered
/// - 200 with a status array: per-subject statuses, `Success` stored as the
///   success sentinel; the first status of a repeated subject wins
/// - 200 with anything else: batch error, flagged malformed
pub fn interpret_response(response: &TransportResponse) -> InterpretedResponse {
    if response.status != 200 {
        return InterpretedResponse {
            outcome: DeliveryOutcome::BatchError(format!(
                "status {}: {}",
                response.status,
                response.body.trim()
            )),
            malformed: false,
        };
    }

    let body = response.body.trim();
    if body.is_empty() {
        return InterpretedResponse {
            outcome: DeliveryOutcome::Delivered,
            malformed: false,
        };
    }

    let statuses = match serde_json::from_str::<StatusEnvelope>(body) {
        Ok(StatusEnvelope {
            users_status: Some(statuses),
        }) => statuses,
        Ok(StatusEnvelope { users_status: None }) => {
            return malformed(format!("response has no {ARRAY_NAME} array"));
        }
        Err(e) => return malformed(format!("unparseable response: {e}")),
    };

    let mut per_subject = HashMap::new();
    for entry in statuses {
        let subject = entry.user_guid.trim().to_string();
        if subject.is_empty() {
            continue;
        }
        let status = if entry.status.trim() == ROW_STATUS_SUCCESS {
            SUCCESS_SENTINEL.to_string()
        } else {
            entry.status.trim().to_string()
        };
        per_subject.entry(subject).or_insert(status);
    }

    InterpretedResponse {
        outcome: DeliveryOutcome::PerSubject(per_subject),
        malformed: false,
    }
}

fn malformed(text: String) -> InterpretedResponse {
    InterpretedResponse {
        outcome: DeliveryOutcome::BatchError(text),
        malformed: true,
    }
}
