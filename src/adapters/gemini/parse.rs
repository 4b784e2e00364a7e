//! Response Shape Probing
//!
//! Maps whatever the analysis backend returned into a `Verdict`. Known shapes
//! are tried in a fixed order; the first rule that matches wins:
//!
//! 1. `{ "text": "..." }` free-text explanation
//! 2. `{ "signal": "BUY", "comment": "..." }`
//! 3. `{ "decision": "SELL", "reasoning": "..." }`
//!
//! Gemini wraps the payload in `candidates[0].content.parts[0]`; that envelope
//! is unwrapped first when present. Anything else becomes `Verdict::Failure`.

use serde_json::{Map, Value};

use crate::domain::{Action, Verdict};
use crate::ports::analyzer::AnalyzerError;

type Object = Map<String, Value>;
type ShapeRule = fn(&Object) -> Option<Verdict>;

const SHAPE_RULES: [(&str, ShapeRule); 3] = [
    ("text", free_text),
    ("signal/comment", signal_comment),
    ("decision/reasoning", decision_reasoning),
];

/// Rules usable on JSON embedded inside a free-text answer
const STRUCTURED_RULES: [(&str, ShapeRule); 2] = [
    ("signal/comment", signal_comment),
    ("decision/reasoning", decision_reasoning),
];

const GEMINI_PART_POINTER: &str = "/candidates/0/content/parts/0";

/// Parse a raw response body. Never panics, never errors.
pub fn parse_response(body: &str) -> Verdict {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => interpret(&value),
        Err(e) => AnalyzerError::ParseError(e.to_string()).into(),
    }
}

/// Interpret an already-decoded response
pub fn interpret(value: &Value) -> Verdict {
    if let Some(message) = error_message(value) {
        return Verdict::failure(message);
    }

    let payload = value.pointer(GEMINI_PART_POINTER).unwrap_or(value);
    match payload.as_object().and_then(|obj| probe(obj, &SHAPE_RULES)) {
        Some(verdict) => verdict,
        None => AnalyzerError::UnknownShape(describe(value, payload)).into(),
    }
}

/// `error.message` of a backend error envelope
pub fn error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| error.as_str().map(str::to_string))
}

fn probe(obj: &Object, rules: &[(&str, ShapeRule)]) -> Option<Verdict> {
    rules.iter().find_map(|(name, rule)| {
        let verdict = rule(obj)?;
        tracing::debug!("Analyzer response matched shape '{}'", name);
        Some(verdict)
    })
}

fn free_text(obj: &Object) -> Option<Verdict> {
    let text = obj.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(verdict) = embedded_object(text).and_then(|inner| probe(&inner, &STRUCTURED_RULES)) {
        return Some(verdict);
    }

    let action = Action::find_in(text).unwrap_or(Action::Hold);
    Some(Verdict::recommendation(action, text))
}

fn signal_comment(obj: &Object) -> Option<Verdict> {
    structured(obj, "signal", "comment")
}

fn decision_reasoning(obj: &Object) -> Option<Verdict> {
    structured(obj, "decision", "reasoning")
}

fn structured(obj: &Object, action_key: &str, rationale_key: &str) -> Option<Verdict> {
    let action = obj.get(action_key)?.as_str().and_then(Action::find_in)?;
    let rationale = obj
        .get(rationale_key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();
    Some(Verdict::recommendation(action, rationale))
}

/// A JSON object written as the whole text, optionally inside a ``` fence
fn embedded_object(text: &str) -> Option<Object> {
    let unfenced = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(text)
        .trim();
    if !unfenced.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<Value>(unfenced) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn describe(root: &Value, payload: &Value) -> String {
    if let Some(reason) = root
        .pointer("/candidates/0/finishReason")
        .and_then(Value::as_str)
    {
        return format!("no usable content (finishReason: {})", reason);
    }
    match payload {
        Value::Object(obj) if obj.is_empty() => "empty object".to_string(),
        Value::Object(obj) => {
            let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
            format!("keys [{}]", keys.join(", "))
        }
        other => format!("expected an object, got {}", kind(other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gemini_envelope(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_signal_comment_shape() {
        let verdict = parse_response(r#"{"signal":"BUY","comment":"momentum up"}"#);
        assert_eq!(verdict, Verdict::recommendation(Action::Buy, "momentum up"));
    }

    #[test]
    fn test_decision_reasoning_shape() {
        let verdict = parse_response(r#"{"decision":"sell","reasoning":"lower highs"}"#);
        assert_eq!(verdict, Verdict::recommendation(Action::Sell, "lower highs"));
    }

    #[test]
    fn test_gemini_free_text() {
        let verdict = parse_response(&gemini_envelope("HOLD. Price is ranging between 0.08 and 0.081."));
        assert_eq!(verdict.action(), Some(Action::Hold));
        match verdict {
            Verdict::Recommendation { rationale, .. } => assert!(rationale.contains("ranging")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_free_text_without_keyword_defaults_to_hold() {
        let verdict = parse_response(r#"{"text":"Not enough volatility to say."}"#);
        assert_eq!(
            verdict,
            Verdict::recommendation(Action::Hold, "Not enough volatility to say.")
        );
    }

    #[test]
    fn test_text_takes_priority_over_signal() {
        let verdict = parse_response(r#"{"text":"SELL now","signal":"BUY","comment":"x"}"#);
        assert_eq!(verdict.action(), Some(Action::Sell));
    }

    #[test]
    fn test_fenced_json_inside_text() {
        let text = "```json\n{\"signal\": \"SELL\", \"comment\": \"breakdown\"}\n```";
        let verdict = parse_response(&gemini_envelope(text));
        assert_eq!(verdict, Verdict::recommendation(Action::Sell, "breakdown"));
    }

    #[test]
    fn test_unknown_signal_value_falls_through() {
        let verdict = parse_response(r#"{"signal":"MAYBE","comment":"unclear"}"#);
        assert!(matches!(verdict, Verdict::Failure { .. }));
    }

    #[test]
    fn test_unknown_shape_is_failure() {
        let verdict = parse_response(r#"{"foo": 1, "bar": 2}"#);
        match verdict {
            Verdict::Failure { detail } => {
                assert!(detail.contains("foo"));
                assert!(detail.contains("bar"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_object_json_is_failure() {
        assert!(matches!(parse_response("[1,2,3]"), Verdict::Failure { .. }));
        assert!(matches!(parse_response("\"BUY\""), Verdict::Failure { .. }));
        assert!(matches!(parse_response("null"), Verdict::Failure { .. }));
    }

    #[test]
    fn test_malformed_body_is_failure() {
        assert!(matches!(parse_response("<html>502</html>"), Verdict::Failure { .. }));
        assert!(matches!(parse_response(""), Verdict::Failure { .. }));
    }

    #[test]
    fn test_backend_error_envelope() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(parse_response(body), Verdict::failure("API key not valid"));
    }

    #[test]
    fn test_blocked_candidate_reports_finish_reason() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        match parse_response(body) {
            Verdict::Failure { detail } => assert!(detail.contains("SAFETY")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
