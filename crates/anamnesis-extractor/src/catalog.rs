//! Slot catalog: which fields are extracted, and how

use crate::error::{CatalogError, ExtractorError};
use anamnesis_domain::SlotSpec;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;

/// Ordered, id-unique collection of slots
///
/// Iteration order is stable and determines start order (and thus the
/// staggered delay) of each slot in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCatalog {
    slots: Vec<SlotSpec>,
}

/// On-disk catalog layout: a list of `[[slots]]` tables
#[derive(Deserialize)]
struct CatalogFile {
    slots: Vec<SlotSpec>,
}

impl SlotCatalog {
    /// Build a catalog, rejecting empty or duplicate ids
    pub fn new(slots: Vec<SlotSpec>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for (idx, slot) in slots.iter().enumerate() {
            if slot.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(idx));
            }
            if !seen.insert(slot.id.as_str()) {
                return Err(CatalogError::DuplicateSlot(slot.id.clone()));
            }
        }
        Ok(Self { slots })
    }

    /// The built-in clinical history catalog
    pub fn clinical() -> Self {
        Self {
            slots: clinical_slots(),
        }
    }

    /// Load a catalog from a TOML document
    ///
    /// ```
    /// use anamnesis_extractor::SlotCatalog;
    ///
    /// let catalog = SlotCatalog::from_toml(r#"
    ///     [[slots]]
    ///     id = "allergy_history"
    ///     instruction = "State any known or suspected allergies."
    ///     max_output_tokens = 40
    /// "#).unwrap();
    /// assert_eq!(catalog.len(), 1);
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(toml_str).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(file.slots)
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&contents)?)
    }

    /// All slots, in catalog order
    pub fn get_slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    /// Look a slot up by id
    pub fn get(&self, id: &str) -> Option<&SlotSpec> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Slot ids, in catalog order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.id.as_str())
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the catalog has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::clinical()
    }
}

fn clinical_slots() -> Vec<SlotSpec> {
    vec![
        SlotSpec::new(
            "brief_medical_history",
            "Summarize the patient's overall medical history briefly.",
        )
        .with_max_output_tokens(50),
        SlotSpec::new(
            "chief_complaints",
            "What are the patient's main complaints or symptoms that led them to seek care?",
        )
        .with_shape_template(json!({
            "Complaint": "main complaint or symptom",
            "Duration": "how long it has been present",
            "Description": "short description in the patient's terms"
        }))
        .with_max_output_tokens(120),
        SlotSpec::new(
            "past_medical_history",
            "Mention any significant past medical events, surgeries, or chronic conditions.",
        )
        .with_max_output_tokens(60),
        SlotSpec::new(
            "personal_history",
            "Describe relevant personal health or lifestyle factors such as habits, occupation, or routines.",
        )
        .with_max_output_tokens(50),
        SlotSpec::new(
            "family_history",
            "Note any family health conditions or hereditary illnesses.",
        )
        .with_max_output_tokens(40),
        SlotSpec::new(
            "treatment_history",
            "Mention any medications, therapies, or treatments the patient has tried.",
        )
        .with_max_output_tokens(40),
        SlotSpec::new(
            "allergy_history",
            "State any known or suspected allergies and reactions.",
        )
        .with_max_output_tokens(40),
        SlotSpec::new(
            "diagnostic_reports",
            "Summarize any diagnostic tests mentioned and their results.",
        )
        .with_max_output_tokens(30),
        SlotSpec::new(
            "clinical_findings",
            "Mention any clinical observations or findings from examination.",
        )
        .with_max_output_tokens(50),
        SlotSpec::new(
            "provisional_diagnosis",
            "Based on the symptoms and context, what could be a possible diagnosis?",
        )
        .with_max_output_tokens(60),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinical_catalog_order_is_stable() {
        let ids: Vec<_> = SlotCatalog::clinical().ids().map(str::to_string).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], "brief_medical_history");
        assert_eq!(ids[1], "chief_complaints");
        assert_eq!(ids[9], "provisional_diagnosis");

        let again: Vec<_> = SlotCatalog::clinical().ids().map(str::to_string).collect();
        assert_eq!(ids, again);
    }

    #[test]
    fn test_clinical_catalog_is_valid() {
        let slots = SlotCatalog::clinical().get_slots().to_vec();
        assert!(SlotCatalog::new(slots).is_ok());
    }

    #[test]
    fn test_chief_complaints_has_shape_template() {
        let catalog = SlotCatalog::clinical();
        let slot = catalog.get("chief_complaints").unwrap();
        let template = slot.shape_template.as_ref().unwrap();
        for field in ["Complaint", "Duration", "Description"] {
            assert!(template.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_every_clinical_slot_has_budget() {
        let catalog = SlotCatalog::clinical();
        assert!(catalog.get_slots().iter().all(|s| s.max_output_tokens.is_some()));
        assert_eq!(catalog.get("diagnostic_reports").unwrap().max_output_tokens, Some(30));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let slots = vec![
            SlotSpec::new("a", "first"),
            SlotSpec::new("b", "second"),
            SlotSpec::new("a", "third"),
        ];
        assert_eq!(
            SlotCatalog::new(slots),
            Err(CatalogError::DuplicateSlot("a".to_string()))
        );
    }

    #[test]
    fn test_empty_id_rejected() {
        let slots = vec![SlotSpec::new("a", "first"), SlotSpec::new(" ", "blank")];
        assert_eq!(SlotCatalog::new(slots), Err(CatalogError::EmptyId(1)));
    }

    #[test]
    fn test_from_toml_with_template() {
        let catalog = SlotCatalog::from_toml(
            r#"
            [[slots]]
            id = "vitals"
            instruction = "List the recorded vital signs."
            max_output_tokens = 80

            [slots.shape_template]
            BloodPressure = ""
            HeartRate = ""

            [[slots]]
            id = "notes"
            instruction = "Anything else?"
            "#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        let vitals = catalog.get("vitals").unwrap();
        assert!(vitals.expects_structured());
        assert!(vitals.shape_template.as_ref().unwrap().get("HeartRate").is_some());
        assert_eq!(catalog.get("notes").unwrap().max_output_tokens, None);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(
            SlotCatalog::from_toml("slots = 3"),
            Err(CatalogError::Parse(_))
        ));
    }
}
