use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound request body: where to start and who is playing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub email: String,
    pub secret: String,
    pub url: String,
}

/// The JSON object posted to a quiz submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerPayload {
    pub email: String,
    pub secret: String,
    pub url: String,
    pub answer: Value,
}

/// One recorded outcome of a chain iteration. Serialized untagged so each
/// variant lands on the wire as the flat object the chain protocol expects;
/// the variant is implied by which fields are present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StepRecord {
    /// The page was rendered and its text measured.
    Rendered { url: String, page_text_len: usize },

    /// Something went wrong at this URL; the `error` string says what.
    Failed { url: String, error: String },

    /// An answer was computed but the chain had nowhere to send it.
    FinalAnswer {
        url: String,
        answer_payload: AnswerPayload,
        submit_url: Option<String>,
    },

    /// An answer was posted and the endpoint replied.
    Submitted {
        url: String,
        submit_url: String,
        submit_response: Value,
    },

    /// Posting the answer failed at the network level.
    SubmitFailed { url: String, submit_error: String },

    /// The single corrective resubmission and its response.
    Resubmitted { url: String, resubmit_response: Value },
}

impl StepRecord {
    pub fn rendered(url: &str, page_text_len: usize) -> Self {
        StepRecord::Rendered {
            url: url.to_string(),
            page_text_len,
        }
    }

    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        StepRecord::Failed {
            url: url.to_string(),
            error: error.into(),
        }
    }
}

/// Everything a finished chain reports back: the ordered step trace plus a
/// run-log header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub steps: Vec<StepRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> AnswerPayload {
        AnswerPayload {
            email: "player@example.com".to_string(),
            secret: "s3cret".to_string(),
            url: "https://quiz.example/q1".to_string(),
            answer: json!(4),
        }
    }

    #[test]
    fn rendered_step_serializes_flat() {
        let step = StepRecord::rendered("https://quiz.example/q1", 120);
        let v = serde_json::to_value(&step).unwrap();
        assert_eq!(
            v,
            json!({"url": "https://quiz.example/q1", "page_text_len": 120})
        );
    }

    #[test]
    fn failed_step_carries_only_url_and_error() {
        let step = StepRecord::failed("https://quiz.example/q1", "timeout");
        let v = serde_json::to_value(&step).unwrap();
        assert_eq!(v, json!({"url": "https://quiz.example/q1", "error": "timeout"}));
    }

    #[test]
    fn final_answer_step_keeps_explicit_null_submit_url() {
        let step = StepRecord::FinalAnswer {
            url: "https://quiz.example/q1".to_string(),
            answer_payload: payload(),
            submit_url: None,
        };
        let v = serde_json::to_value(&step).unwrap();
        assert!(v.get("submit_url").is_some());
        assert_eq!(v["submit_url"], Value::Null);
        assert_eq!(v["answer_payload"]["answer"], json!(4));
    }

    #[test]
    fn chain_result_round_trips() {
        let result = ChainResult {
            run_id: "run-1".to_string(),
            started_at: Utc::now(),
            elapsed_ms: 42,
            steps: vec![
                StepRecord::rendered("https://quiz.example/q1", 10),
                StepRecord::Submitted {
                    url: "https://quiz.example/q1".to_string(),
                    submit_url: "https://quiz.example/submit".to_string(),
                    submit_response: json!({"correct": true}),
                },
            ],
        };

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: ChainResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.steps, result.steps);
    }
}
