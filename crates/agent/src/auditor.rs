//! Reflection audit of executed tool calls
//!
//! The gateway is asked for a structured verdict, but its raw text is never
//! trusted: parsing runs in three stages — strict JSON, first balanced
//! object-like substring, then a heuristic derived from the execution result
//! alone. Each stage is a separate function so each is testable on its own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use peanut_executor::{ToolCall, ToolResult};
use peanut_gateway::{Gateway, Message};

use crate::context::audit_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Retry,
    Finalize,
}

/// The audit's judgment of one tool-call attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionVerdict {
    pub success: bool,
    pub analysis: String,
    pub next_action: NextAction,
    /// Full replacement call, present only when retrying
    pub improved_input: Option<ToolCall>,
}

/// Wire shape of the verdict; every field is optional so a partial object
/// still parses
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    next_action: Option<String>,
    #[serde(default)]
    improved_input: Option<ToolCall>,
}

impl RawVerdict {
    fn into_verdict(self) -> ReflectionVerdict {
        let next_action = match self.next_action.as_deref().map(str::to_lowercase).as_deref() {
            Some("retry") => NextAction::Retry,
            Some("finalize") => NextAction::Finalize,
            _ if self.success => NextAction::Finalize,
            _ => NextAction::Retry,
        };

        ReflectionVerdict {
            success: self.success,
            analysis: self.analysis,
            next_action,
            improved_input: self.improved_input,
        }
    }
}

pub struct Auditor {
    gateway: Arc<dyn Gateway>,
    retry_ceiling: u32,
}

impl Auditor {
    pub fn new(gateway: Arc<dyn Gateway>, retry_ceiling: u32) -> Self {
        Self {
            gateway,
            retry_ceiling,
        }
    }

    /// Judge one attempt. Never fails: a dead gateway degrades to the
    /// heuristic verdict.
    pub async fn audit(
        &self,
        task: &str,
        call: &ToolCall,
        result: &ToolResult,
        retries: u32,
    ) -> ReflectionVerdict {
        let prompt = audit_prompt(task, call, result);

        let verdict = match self.gateway.chat(&[Message::user(prompt)], &[]).await {
            Ok(reply) => parse_lenient(&reply.content).unwrap_or_else(|| {
                debug!("audit reply unparsable, using heuristic");
                heuristic_verdict(result)
            }),
            Err(e) => {
                warn!("audit request failed, using heuristic: {}", e);
                heuristic_verdict(result)
            }
        };

        self.normalize(verdict, retries)
    }

    /// Enforce the invariants the raw verdict cannot be trusted to uphold:
    /// success always finalizes, the retry ceiling always wins, and a
    /// finalizing verdict carries no improved input.
    fn normalize(&self, mut verdict: ReflectionVerdict, retries: u32) -> ReflectionVerdict {
        if verdict.success {
            verdict.next_action = NextAction::Finalize;
        }

        if verdict.next_action == NextAction::Retry && retries >= self.retry_ceiling {
            debug!("retry ceiling reached, forcing finalize");
            verdict.next_action = NextAction::Finalize;
        }

        if verdict.next_action == NextAction::Finalize {
            verdict.improved_input = None;
        }

        verdict
    }
}

/// Stage 1 + 2: strict parse, then first balanced object substring
fn parse_lenient(text: &str) -> Option<ReflectionVerdict> {
    let text = straighten_quotes(text);

    parse_strict(&text)
        .or_else(|| extract_balanced_object(&text).and_then(|slice| parse_strict(&slice)))
}

/// Stage 1: the whole reply is the object
fn parse_strict(text: &str) -> Option<ReflectionVerdict> {
    serde_json::from_str::<RawVerdict>(text.trim())
        .ok()
        .map(RawVerdict::into_verdict)
}

/// Stage 2 helper: first syntactically balanced `{...}` substring,
/// string- and escape-aware
fn extract_balanced_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Models love typographic quotes; JSON does not
fn straighten_quotes(text: &str) -> String {
    text.replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Stage 3: verdict from the execution result alone
fn heuristic_verdict(result: &ToolResult) -> ReflectionVerdict {
    const FAILURE_MARKERS: &[&str] = &[
        "error",
        "exception",
        "traceback",
        "denied",
        "permission",
        "not found",
        "failed",
    ];

    let lowered = result.output.to_lowercase();
    let noisy = FAILURE_MARKERS.iter().any(|m| lowered.contains(m));
    let success = result.ok && !noisy;

    ReflectionVerdict {
        success,
        analysis: if success {
            "heuristic: execution succeeded with no failure signals".to_string()
        } else {
            "heuristic: execution failed or output carries failure signals".to_string()
        },
        next_action: if success {
            NextAction::Finalize
        } else {
            NextAction::Retry
        },
        improved_input: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peanut_executor::ErrorKind;
    use peanut_gateway::{ChatReply, MockGateway};
    use serde_json::json;

    fn ok_result() -> ToolResult {
        ToolResult {
            ok: true,
            output: "a.txt\nnotes/".to_string(),
            error: None,
            duration_ms: 5,
        }
    }

    fn failed_result() -> ToolResult {
        ToolResult {
            ok: false,
            output: "exit status 1\nls: cannot access 'x': No such file or directory".to_string(),
            error: None,
            duration_ms: 5,
        }
    }

    // ========== Stage 1: strict parse ==========

    #[test]
    fn test_parse_strict_full_verdict() {
        let text = r#"{"success": false, "analysis": "wrong path",
            "next_action": "retry",
            "improved_input": {"name": "read_file", "arguments": {"path": "b.txt"}}}"#;

        let verdict = parse_strict(text).unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.next_action, NextAction::Retry);
        assert_eq!(verdict.improved_input.unwrap().name, "read_file");
    }

    #[test]
    fn test_parse_strict_defaults_missing_fields() {
        let verdict = parse_strict(r#"{"success": true}"#).unwrap();
        assert!(verdict.success);
        assert_eq!(verdict.next_action, NextAction::Finalize);
        assert!(verdict.improved_input.is_none());
    }

    #[test]
    fn test_parse_strict_rejects_prose() {
        assert!(parse_strict("The call succeeded, well done!").is_none());
    }

    // ========== Stage 2: balanced substring ==========

    #[test]
    fn test_extract_balanced_from_prose() {
        let text = r#"Sure! Here is my verdict: {"success": true, "analysis": "fine"} hope it helps"#;
        let slice = extract_balanced_object(text).unwrap();
        assert_eq!(slice, r#"{"success": true, "analysis": "fine"}"#);

        let verdict = parse_lenient(text).unwrap();
        assert!(verdict.success);
    }

    #[test]
    fn test_extract_balanced_nested_objects() {
        let text = r#"{"success": false, "improved_input": {"name": "shell", "arguments": {"command": "ls"}}} trailing"#;
        let slice = extract_balanced_object(text).unwrap();
        assert!(slice.ends_with("}}}"));
        assert!(parse_strict(&slice).is_some());
    }

    #[test]
    fn test_extract_balanced_ignores_braces_in_strings() {
        let text = r#"{"analysis": "use {curly} braces", "success": true}"#;
        let slice = extract_balanced_object(text).unwrap();
        assert_eq!(slice, text);
    }

    #[test]
    fn test_extract_balanced_unclosed_is_none() {
        assert!(extract_balanced_object(r#"{"success": tru"#).is_none());
        assert!(extract_balanced_object("no object here").is_none());
    }

    #[test]
    fn test_curly_quotes_straightened() {
        let text = "{\u{201c}success\u{201d}: true, \u{201c}analysis\u{201d}: \u{201c}ok\u{201d}}";
        let verdict = parse_lenient(text).unwrap();
        assert!(verdict.success);
    }

    // ========== Stage 3: heuristic ==========

    #[test]
    fn test_heuristic_clean_success() {
        let verdict = heuristic_verdict(&ok_result());
        assert!(verdict.success);
        assert_eq!(verdict.next_action, NextAction::Finalize);
    }

    #[test]
    fn test_heuristic_failure_markers() {
        let verdict = heuristic_verdict(&failed_result());
        assert!(!verdict.success);
        assert_eq!(verdict.next_action, NextAction::Retry);

        let ok_but_noisy = ToolResult {
            ok: true,
            output: "Traceback (most recent call last): ...".to_string(),
            error: None,
            duration_ms: 1,
        };
        assert!(!heuristic_verdict(&ok_but_noisy).success);
    }

    // ========== Normalization and ceiling ==========

    #[tokio::test]
    async fn test_audit_ceiling_overrides_retry() {
        let mock = MockGateway::with_replies(vec![ChatReply::text(
            r#"{"success": false, "analysis": "try again",
                "next_action": "retry",
                "improved_input": {"name": "shell", "arguments": {"command": "ls"}}}"#,
        )]);
        let auditor = Auditor::new(Arc::new(mock), crate::RETRY_CEILING);

        let call = ToolCall::new("shell", json!({"command": "ls /nope"}));
        let verdict = auditor
            .audit("list stuff", &call, &failed_result(), crate::RETRY_CEILING)
            .await;

        assert_eq!(verdict.next_action, NextAction::Finalize);
        assert!(verdict.improved_input.is_none());
    }

    #[tokio::test]
    async fn test_audit_success_clears_improved_input() {
        let mock = MockGateway::with_replies(vec![ChatReply::text(
            r#"{"success": true, "analysis": "done", "next_action": "retry",
                "improved_input": {"name": "shell", "arguments": {}}}"#,
        )]);
        let auditor = Auditor::new(Arc::new(mock), crate::RETRY_CEILING);

        let call = ToolCall::new("shell", json!({"command": "ls"}));
        let verdict = auditor.audit("list", &call, &ok_result(), 0).await;

        assert!(verdict.success);
        assert_eq!(verdict.next_action, NextAction::Finalize);
        assert!(verdict.improved_input.is_none());
    }

    #[tokio::test]
    async fn test_audit_gateway_down_uses_heuristic() {
        // empty script: the first chat call errors
        let mock = MockGateway::new();
        let auditor = Auditor::new(Arc::new(mock), crate::RETRY_CEILING);

        let call = ToolCall::new(
            "read_file",
            json!({"path": "../../etc/passwd"}),
        );
        let result = ToolResult {
            ok: false,
            output: "path '../../etc/passwd' resolves outside the workspace".to_string(),
            error: Some(ErrorKind::PathTraversal),
            duration_ms: 1,
        };

        let verdict = auditor.audit("read passwd", &call, &result, 0).await;
        assert!(!verdict.success);
        assert_eq!(verdict.next_action, NextAction::Retry);
        assert!(verdict.improved_input.is_none());
    }
}
