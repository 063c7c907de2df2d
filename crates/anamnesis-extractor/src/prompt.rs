//! LLM prompt composition for slot extraction

use anamnesis_domain::SlotSpec;

/// Builds the prompt for one slot over one narrative
pub struct PromptBuilder<'a> {
    slot: &'a SlotSpec,
    narrative: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(slot: &'a SlotSpec, narrative: &'a str) -> Self {
        Self { slot, narrative }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(
            self.slot.instruction.len()
                + self.narrative.len()
                + STRUCTURED_OUTPUT_DIRECTIVE.len()
                + 4,
        );

        // 1. What to extract
        prompt.push_str(&self.slot.instruction);
        prompt.push_str("\n\n");

        // 2. The narrative, untouched
        prompt.push_str(self.narrative);

        // 3. Output shape, if the slot has one
        if let Some(template) = &self.slot.shape_template {
            prompt.push_str("\n\n");
            prompt.push_str(STRUCTURED_OUTPUT_DIRECTIVE);
            prompt.push('\n');
            prompt.push_str(&format!("{:#}", template));
        }

        prompt
    }
}

/// Compose the prompt for `slot` over `narrative`
pub fn build_prompt(slot: &SlotSpec, narrative: &str) -> String {
    PromptBuilder::new(slot, narrative).build()
}

const STRUCTURED_OUTPUT_DIRECTIVE: &str = "Respond ONLY with valid JSON matching exactly this structure. \
Do not add any commentary, explanations or markdown:";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_free_text_prompt_is_instruction_then_narrative() {
        let slot = SlotSpec::new("family_history", "Note any family health conditions.");
        let prompt = build_prompt(&slot, "Mother has diabetes.");
        assert_eq!(prompt, "Note any family health conditions.\n\nMother has diabetes.");
    }

    #[test]
    fn test_structured_prompt_includes_directive_and_template() {
        let slot = SlotSpec::new("chief_complaints", "What are the complaints?")
            .with_shape_template(json!({"Complaint": "", "Duration": ""}));

        let prompt = build_prompt(&slot, "Patient reports headache for 3 days.");

        assert!(prompt.starts_with("What are the complaints?\n\nPatient reports headache"));
        assert!(prompt.contains("valid JSON"));
        assert!(prompt.contains("\"Complaint\""));
        assert!(prompt.contains("\"Duration\""));
        assert!(prompt.find("headache").unwrap() < prompt.find("valid JSON").unwrap());
    }

    #[test]
    fn test_template_is_embedded_as_json() {
        let template = json!({"Allergen": "", "Reaction": ""});
        let slot = SlotSpec::new("allergy_history", "List allergies.")
            .with_shape_template(template.clone());

        let prompt = build_prompt(&slot, "None.");
        let embedded = &prompt[prompt.find('{').unwrap()..];
        let parsed: serde_json::Value = serde_json::from_str(embedded).unwrap();
        assert_eq!(parsed, template);
    }

    #[test]
    fn test_empty_narrative_passes_through() {
        let slot = SlotSpec::new("clinical_findings", "Mention any findings.");
        let prompt = PromptBuilder::new(&slot, "").build();
        assert_eq!(prompt, "Mention any findings.\n\n");
    }
}
