//! Slot module - the unit of extraction

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single named field to extract from a clinical narrative
///
/// Slots are loaded once at process start and never mutated. The `id` is the
/// unique key within a catalog.
///
/// # Examples
///
/// ```
/// use anamnesis_domain::SlotSpec;
///
/// let slot = SlotSpec::new("allergy_history", "State any known allergies.")
///     .with_max_output_tokens(40);
/// assert_eq!(slot.id, "allergy_history");
/// assert!(!slot.expects_structured());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Unique key of the slot (e.g. "chief_complaints")
    pub id: String,

    /// Instruction text placed ahead of the narrative
    pub instruction: String,

    /// Example JSON structure the answer must follow, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_template: Option<Value>,

    /// Output length budget passed to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl SlotSpec {
    /// Create a free-text slot with no template and no explicit budget
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instruction: instruction.into(),
            shape_template: None,
            max_output_tokens: None,
        }
    }

    /// Attach a shape template; answers will be decoded as JSON
    pub fn with_shape_template(mut self, template: Value) -> Self {
        self.shape_template = Some(template);
        self
    }

    /// Set the output length budget
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Whether answers for this slot are decoded as structured data
    pub fn expects_structured(&self) -> bool {
        self.shape_template.is_some()
    }

    /// Output budget, falling back to `default` when the slot has none
    pub fn output_budget(&self, default: u32) -> u32 {
        self.max_output_tokens.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_sets_fields() {
        let slot = SlotSpec::new("chief_complaints", "What are the complaints?")
            .with_shape_template(json!({"Complaint": ""}))
            .with_max_output_tokens(120);

        assert_eq!(slot.id, "chief_complaints");
        assert!(slot.expects_structured());
        assert_eq!(slot.max_output_tokens, Some(120));
    }

    #[test]
    fn test_output_budget_fallback() {
        let slot = SlotSpec::new("family_history", "Note family conditions.");
        assert_eq!(slot.output_budget(50), 50);

        let slot = slot.with_max_output_tokens(40);
        assert_eq!(slot.output_budget(50), 40);
    }

    #[test]
    fn test_optional_fields_skipped_when_absent() {
        let slot = SlotSpec::new("personal_history", "Describe habits.");
        let json = serde_json::to_value(&slot).unwrap();
        assert!(json.get("shape_template").is_none());
        assert!(json.get("max_output_tokens").is_none());
    }
}
