//! Prompt templating applied to user input before generation.

const PLACEHOLDER: &str = "{user_input}";

const CAD_TEMPLATE: &str = r#"<|im_start|>user
<objective>
Generate a JSON file describing the sketching and extrusion steps needed to construct a 3D CAD model. Generate only the JSON file, no other text.
</objective>

<instruction>
You will be given a natural language description of a CAD design task. Your goal is to convert it into a structured JSON representation, which includes sketch geometry and extrusion operations.

The extrusion <operation> must be one of the following:

1. <NewBodyFeatureOperation>: Creates a new solid body.
2. <JoinFeatureOperation>: Fuses the shape with an existing body.
3. <CutFeatureOperation>: Subtracts the shape from an existing body.
4. <IntersectFeatureOperation>: Keeps only the overlapping volume between the new shape and existing body.

Ensure all coordinates, geometry, and extrusion depths are extracted accurately from the input.
</instruction>

<description>
{user_input}
</description><|im_end|>
<|im_start|>assistant
"#;

/// A prompt template with a single `{user_input}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create a template; every `{user_input}` occurrence is substituted.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Chat-formatted instruction for text-to-CAD JSON generation.
    pub fn cad() -> Self {
        Self::new(CAD_TEMPLATE)
    }

    /// Pass the user input through unchanged.
    pub fn raw() -> Self {
        Self::new(PLACEHOLDER)
    }

    /// Look up a built-in template by name (`cad` or `raw`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "cad" => Some(Self::cad()),
            "raw" => Some(Self::raw()),
            _ => None,
        }
    }

    pub fn render(&self, user_input: &str) -> String {
        self.template.replace(PLACEHOLDER, user_input)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::cad()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cad_template_wraps_input_in_chat_turns() {
        let prompt = PromptTemplate::cad().render("a 10mm cube");
        assert!(prompt.starts_with("<|im_start|>user"));
        assert!(prompt.contains("<description>\na 10mm cube\n</description>"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn raw_template_is_identity() {
        assert_eq!(PromptTemplate::raw().render("say OK"), "say OK");
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(PromptTemplate::by_name("cad").is_some());
        assert!(PromptTemplate::by_name("llama3").is_none());
    }
}
