//! The provider trait and the validated-completion helper.

use serde_json::Value;

use pl_domain::error::Result;
use pl_domain::trace::TraceEvent;

use crate::schema::Schema;

/// A structured-completion request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// Short label for tracing ("classify_target", "extract_slots",
    /// "session_text", "summarize").
    pub purpose: &'static str,
    /// Instruction prompt (loaded through the prompt tool server).
    pub system_prompt: String,
    /// The user-visible input being worked on.
    pub user_input: String,
    /// Supplementary context rendered as JSON (known slots, summary).
    pub context: Value,
}

/// Trait every completion adapter must implement.
///
/// Implementations return raw JSON; callers validate it through
/// [`complete_validated`] before trusting a single field.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, req: StructuredRequest) -> Result<Value>;

    /// A stable identifier for tracing.
    fn provider_id(&self) -> &str;
}

/// Call the provider and validate the output against `schema`.
///
/// Emits a [`TraceEvent::CompletionCall`]; a schema violation is an
/// `Error::Validation`, which callers handle with their own fallback.
pub async fn complete_validated(
    provider: &dyn CompletionProvider,
    req: StructuredRequest,
    schema: &Schema,
) -> Result<Value> {
    let purpose = req.purpose;
    let start = std::time::Instant::now();

    let result = provider.complete(req).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    TraceEvent::CompletionCall {
        purpose: purpose.to_owned(),
        duration_ms,
        fallback_used: false,
    }
    .emit();

    let value = result?;
    schema.validate(&value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use crate::scripted::ScriptedProvider;
    use serde_json::json;

    fn request() -> StructuredRequest {
        StructuredRequest {
            purpose: "classify_target",
            system_prompt: "classify".into(),
            user_input: "plan my marathon".into(),
            context: json!({}),
        }
    }

    #[tokio::test]
    async fn validated_completion_passes_schema() {
        let provider = ScriptedProvider::new();
        provider.push(json!({"target_action": "plan_race_build"}));

        let schema = Schema::object().required("target_action", FieldType::String);
        let out = complete_validated(&provider, request(), &schema).await.unwrap();
        assert_eq!(out["target_action"], "plan_race_build");
    }

    #[tokio::test]
    async fn schema_violation_is_an_error() {
        let provider = ScriptedProvider::new();
        provider.push(json!({"target_action": 7}));

        let schema = Schema::object().required("target_action", FieldType::String);
        assert!(complete_validated(&provider, request(), &schema).await.is_err());
    }
}
