//! Validation gates on either side of delegation. Input gates run before the
//! model is ever called; output gates run on what it said before the customer
//! sees it. A rejection carries a stable machine reason code for logs and a
//! customer-facing message that replaces the rejected text.

use clerky_core::config::GuardrailsConfig;

pub const DEFAULT_MAX_QUERY_CHARS: usize = 2000;
pub const DEFAULT_MIN_RESPONSE_CHARS: usize = 10;

/// Substrings that mark a response as leaking implementation detail.
/// Matched case-insensitively against the trimmed response.
const LEAK_MARKERS: &[&str] = &["sql", "traceback", "panicked at", "stack backtrace"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Accept,
    Reject { reason_code: &'static str, user_message: String },
}

impl GuardrailDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Limits applied to one query lifecycle. Character counts, not bytes, so
/// multibyte text is not penalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub max_query_chars: usize,
    pub min_response_chars: usize,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
            min_response_chars: DEFAULT_MIN_RESPONSE_CHARS,
        }
    }
}

impl GuardrailPolicy {
    pub fn from_config(config: &GuardrailsConfig) -> Self {
        Self {
            max_query_chars: config.max_query_chars,
            min_response_chars: config.min_response_chars,
        }
    }

    /// Gate on the raw customer query. Rejections here mean the model is
    /// never called.
    pub fn validate_input(&self, query_text: &str) -> GuardrailDecision {
        if query_text.trim().is_empty() {
            return GuardrailDecision::Reject {
                reason_code: "empty_query",
                user_message: "Please enter a question so I can help you.".to_string(),
            };
        }

        if query_text.chars().count() > self.max_query_chars {
            return GuardrailDecision::Reject {
                reason_code: "query_too_long",
                user_message: format!(
                    "Your message is too long for me to process. Please shorten it to {} characters or fewer.",
                    self.max_query_chars
                ),
            };
        }

        GuardrailDecision::Accept
    }

    /// Gate on the model's final text. Rejections here substitute the
    /// customer-facing message and escalate the query.
    pub fn validate_output(&self, response_text: &str) -> GuardrailDecision {
        let trimmed = response_text.trim();

        if trimmed.chars().count() < self.min_response_chars {
            return GuardrailDecision::Reject {
                reason_code: "uninformative_response",
                user_message: "I'm sorry, I wasn't able to put together a useful answer. \
                               Would you like me to escalate this to our support team?"
                    .to_string(),
            };
        }

        if leaks_internal_detail(trimmed) {
            return GuardrailDecision::Reject {
                reason_code: "internal_detail_leak",
                user_message: "I'm sorry, something went wrong while preparing your answer. \
                               Would you like me to escalate this to our support team?"
                    .to_string(),
            };
        }

        GuardrailDecision::Accept
    }
}

fn leaks_internal_detail(trimmed: &str) -> bool {
    if trimmed.starts_with("{\"error\"") {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    LEAK_MARKERS.iter().any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::{GuardrailDecision, GuardrailPolicy};

    fn reason(decision: GuardrailDecision) -> &'static str {
        match decision {
            GuardrailDecision::Reject { reason_code, .. } => reason_code,
            GuardrailDecision::Accept => panic!("expected a rejection"),
        }
    }

    #[test]
    fn ordinary_queries_pass_the_input_gate() {
        let policy = GuardrailPolicy::default();
        assert!(policy.validate_input("Where is order #12345?").is_accept());
    }

    #[test]
    fn empty_and_whitespace_queries_are_rejected() {
        let policy = GuardrailPolicy::default();
        assert_eq!(reason(policy.validate_input("")), "empty_query");
        assert_eq!(reason(policy.validate_input("   \n\t  ")), "empty_query");
    }

    #[test]
    fn overlong_queries_are_rejected_at_the_character_boundary() {
        let policy = GuardrailPolicy::default();
        assert!(policy.validate_input(&"x".repeat(2000)).is_accept());
        assert_eq!(reason(policy.validate_input(&"x".repeat(2001))), "query_too_long");
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        // 2000 two-byte characters; a byte count would reject this.
        let policy = GuardrailPolicy::default();
        assert!(policy.validate_input(&"é".repeat(2000)).is_accept());
    }

    #[test]
    fn rejection_messages_are_customer_facing() {
        let policy = GuardrailPolicy::default();
        match policy.validate_input("") {
            GuardrailDecision::Reject { user_message, .. } => {
                assert!(user_message.contains("enter a question"));
            }
            GuardrailDecision::Accept => panic!("empty query must be rejected"),
        }
    }

    #[test]
    fn short_responses_are_uninformative() {
        let policy = GuardrailPolicy::default();
        assert_eq!(reason(policy.validate_output("OK")), "uninformative_response");
        assert_eq!(reason(policy.validate_output("   yes   ")), "uninformative_response");
    }

    #[test]
    fn responses_at_the_minimum_length_pass() {
        let policy = GuardrailPolicy { min_response_chars: 10, ..Default::default() };
        assert!(policy.validate_output("exactly 10").is_accept());
    }

    #[test]
    fn leak_markers_are_matched_case_insensitively() {
        let policy = GuardrailPolicy::default();
        for leaky in [
            "An SQL error occurred while looking that up.",
            "Traceback (most recent call last): something broke",
            "thread 'main' panicked at src/main.rs:10",
            "stack backtrace: 0: rust_begin_unwind",
        ] {
            assert_eq!(reason(policy.validate_output(leaky)), "internal_detail_leak");
        }
    }

    #[test]
    fn raw_error_payloads_are_treated_as_leaks() {
        let policy = GuardrailPolicy::default();
        let decision = policy.validate_output(r#"{"error": "Order not found"}"#);
        assert_eq!(reason(decision), "internal_detail_leak");
    }

    #[test]
    fn helpful_answers_pass_the_output_gate() {
        let policy = GuardrailPolicy::default();
        let decision = policy
            .validate_output("Order #12345 shipped on 2024-01-10 and totals $89.99.");
        assert!(decision.is_accept());
    }

    #[test]
    fn limits_come_from_configuration() {
        let policy = GuardrailPolicy { max_query_chars: 5, min_response_chars: 3 };
        assert_eq!(reason(policy.validate_input("toolong")), "query_too_long");
        assert!(policy.validate_output("yes").is_accept());
    }
}
