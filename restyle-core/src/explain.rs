//! Hand-off of a diff to an external explanation service.

use serde::Serialize;

use crate::error::ExplainError;

/// Label shown to the user for the explanation request.
pub const DISPLAY_MESSAGE: &str = "Explain Changes";

/// Body forwarded to the explanation service.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExplainPayload {
    pub api: String,
    pub config: String,
    pub diff: String,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExplainRequest {
    pub display_message: String,
    /// Display message followed by the diff in a fenced block.
    pub context_message: String,
    pub payload: ExplainPayload,
}

impl ExplainRequest {
    /// Builds the request for an already bounded diff prefix.
    pub fn new(diff: String) -> Self {
        let context_message = format!("{DISPLAY_MESSAGE}:\n```diff\n{diff}```");
        Self {
            display_message: DISPLAY_MESSAGE.to_owned(),
            context_message,
            payload: ExplainPayload {
                api: "/api/v1/style".to_owned(),
                config: "chat_cs50".to_owned(),
                diff,
                stream: true,
            },
        }
    }
}

/// The explanation service. Implementations must not block the event loop
/// for long; the bundled command explainer only spawns a process.
pub trait Explainer {
    fn explain(&mut self, request: ExplainRequest) -> Result<(), ExplainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serialises_with_fixed_route() {
        let req = ExplainRequest::new("@@ -1 +1 @@\n-a\n+b\n".to_owned());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["payload"]["api"], "/api/v1/style");
        assert_eq!(json["payload"]["stream"], true);
        assert_eq!(json["display_message"], DISPLAY_MESSAGE);
        assert!(req.context_message.starts_with("Explain Changes:\n```diff\n@@"));
    }
}
