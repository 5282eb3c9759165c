//! The hard cap on submitted payload size.

use ai_client::util::truncate_chars;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use quizchain_common::AnswerPayload;

/// Serialized payloads above this many bytes are never submitted.
pub const MAX_PAYLOAD_BYTES: usize = 900_000;

/// String answers longer than this get truncated when the payload is over
/// the cap.
const LONG_ANSWER_CHARS: usize = 2_000;
const TRUNCATED_ANSWER_CHARS: usize = 1_800;
const TRUNCATION_MARKER: &str = "...[truncated]";

#[derive(Debug, Error)]
#[error("payload exceeds {MAX_PAYLOAD_BYTES} bytes even after truncation")]
pub struct PayloadTooLarge;

fn serialized_len(payload: &AnswerPayload) -> usize {
    serde_json::to_vec(payload).map(|b| b.len()).unwrap_or(usize::MAX)
}

/// Shrink an oversized payload by truncating its answer; error if the
/// payload is still over the cap afterwards. The cap is never bypassed.
pub fn enforce_payload_cap(payload: &mut AnswerPayload) -> Result<(), PayloadTooLarge> {
    if serialized_len(payload) <= MAX_PAYLOAD_BYTES {
        return Ok(());
    }

    warn!(bytes = serialized_len(payload), "answer payload over size cap, truncating");

    payload.answer = match &payload.answer {
        Value::String(s) if s.chars().count() > LONG_ANSWER_CHARS => Value::String(format!(
            "{}{TRUNCATION_MARKER}",
            truncate_chars(s, TRUNCATED_ANSWER_CHARS)
        )),
        other => {
            let rendered = other.to_string();
            Value::String(truncate_chars(&rendered, TRUNCATED_ANSWER_CHARS).to_string())
        }
    };

    if serialized_len(payload) > MAX_PAYLOAD_BYTES {
        return Err(PayloadTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(answer: Value) -> AnswerPayload {
        AnswerPayload {
            email: "player@example.com".to_string(),
            secret: "s3cret".to_string(),
            url: "https://quiz.example/q1".to_string(),
            answer,
        }
    }

    #[test]
    fn small_payloads_pass_through_unchanged() {
        let mut p = payload(json!(4));
        enforce_payload_cap(&mut p).unwrap();
        assert_eq!(p.answer, json!(4));
    }

    #[test]
    fn long_string_answers_are_truncated_with_marker() {
        let mut p = payload(Value::String("a".repeat(MAX_PAYLOAD_BYTES + 100)));
        enforce_payload_cap(&mut p).unwrap();

        let answer = p.answer.as_str().unwrap();
        assert!(answer.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            answer.chars().count(),
            TRUNCATED_ANSWER_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert!(serialized_len(&p) <= MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn non_string_answers_are_stringified_and_truncated() {
        let mut p = payload(json!({ "blob": "b".repeat(MAX_PAYLOAD_BYTES + 100) }));
        enforce_payload_cap(&mut p).unwrap();

        assert!(p.answer.is_string());
        assert!(p.answer.as_str().unwrap().chars().count() <= TRUNCATED_ANSWER_CHARS);
        assert!(serialized_len(&p) <= MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn oversized_non_answer_fields_cannot_be_saved_by_truncation() {
        let mut p = payload(json!(1));
        p.email = "e".repeat(MAX_PAYLOAD_BYTES + 100);
        assert!(enforce_payload_cap(&mut p).is_err());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut p = payload(Value::String("世".repeat(MAX_PAYLOAD_BYTES)));
        enforce_payload_cap(&mut p).unwrap();
        // Reaching here without a panic means no mid-char slice happened.
        assert!(serialized_len(&p) <= MAX_PAYLOAD_BYTES);
    }
}
