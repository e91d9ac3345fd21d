//! Prompt construction
//!
//! Builds the grounded answer prompt from the relevant chunks and the
//! user's question.

use docent_core::RetrievedChunk;

/// System role for answer generation
pub const SYSTEM_PROMPT: &str =
    "You are an assistant specialized in answering questions based on documents.";

const PROMPT_INTRO: &str =
    "You are an assistant specialized in answering questions based on the documents provided.";

const ANSWER_RULES: [&str; 4] = [
    "Answer the question using ONLY the information provided in the context.",
    "If the information is not available in the context, say that you could not find it.",
    "Be clear and objective, and cite the documents when relevant.",
    "Keep a professional and helpful tone.",
];

/// Concatenate chunk texts, each labeled by ordinal and source file.
///
/// Chunks keep the order they are given in (most similar first).
pub fn assemble_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("Document {} ({}):\n{}\n", i + 1, chunk.filename, chunk.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The user prompt for a question over an assembled context
pub fn grounded_prompt(question: &str, context: &str) -> String {
    ANSWER_RULES
        .iter()
        .fold(
            PromptBuilder::new()
                .system(PROMPT_INTRO)
                .add_context(context)
                .question(question),
            |builder, rule| builder.add_instruction(*rule),
        )
        .build()
}

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for constructing RAG prompts
pub struct PromptBuilder {
    system_instruction: String,
    context_sections: Vec<String>,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self {
            system_instruction: String::new(),
            context_sections: Vec::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Set the opening instruction
    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Build the final prompt, ending with the answer cue
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.system_instruction.is_empty() {
            prompt.push_str(&self.system_instruction);
            prompt.push_str("\n\n");
        }

        if !self.context_sections.is_empty() {
            prompt.push_str("Document context:\n");
            prompt.push_str(&self.context_sections.join("\n"));
            prompt.push_str("\n\n");
        }

        if !self.question.is_empty() {
            prompt.push_str("Question: ");
            prompt.push_str(&self.question);
            prompt.push_str("\n\n");
        }

        if !self.instructions.is_empty() {
            prompt.push_str("Instructions:\n");
            for (i, inst) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, inst));
            }
            prompt.push('\n');
        }

        prompt.push_str("Answer:");
        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
