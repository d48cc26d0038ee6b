//! crates/proposal_core/src/prompt.rs
//!
//! Deterministic assembly of the generation instructions from a free-text
//! description and a tone selector. Pure code: no I/O, no failure modes.

const ROLE_LINE: &str = "You are a professional proposal writer.";
const OUTPUT_FORMAT_LINE: &str = "Output format: Plain text, no markdown (e.g., no asterisks for bolding, no hashes for headings).";

/// Default output budget, in tokens, for every tone except `Concise`.
const DEFAULT_MAX_TOKENS: u32 = 1500;
/// Output budget for the `Concise` tone.
const CONCISE_MAX_TOKENS: u32 = 200;

/// The closed set of rhetorical tone selectors.
///
/// Parsing never fails: any selector outside the known five maps to
/// `Neutral`. Callers keep the raw selector string around for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Formal,
    Friendly,
    Technical,
    Persuasive,
    Concise,
    Neutral,
}

impl Tone {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "formal" => Tone::Formal,
            "friendly" => Tone::Friendly,
            "technical" => Tone::Technical,
            "persuasive" => Tone::Persuasive,
            "concise" => Tone::Concise,
            _ => Tone::Neutral,
        }
    }

    fn clause(&self) -> &'static str {
        match self {
            Tone::Formal => "Formal",
            Tone::Friendly => "Friendly and approachable",
            Tone::Technical => "Technical and precise",
            Tone::Persuasive => "Persuasive and compelling",
            Tone::Concise => {
                "Concise. Keep the proposal to approximately 100-150 words and only include essential information."
            }
            Tone::Neutral => "Neutral",
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            Tone::Concise => CONCISE_MAX_TOKENS,
            _ => DEFAULT_MAX_TOKENS,
        }
    }
}

/// A composed request for the generator collaborator: the full instruction
/// text plus the tone-derived output budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub instructions: String,
    pub max_tokens: u32,
}

/// Builds the generation request. The description is embedded verbatim,
/// including when it is empty.
pub fn compose(description: &str, tone: Tone) -> GenerationRequest {
    let mut instructions = String::from(ROLE_LINE);
    instructions.push('\n');
    instructions.push_str(OUTPUT_FORMAT_LINE);
    instructions.push_str("\nTone: ");
    instructions.push_str(tone.clause());
    instructions.push_str("\nTask: Write a detailed proposal based on this description:\n");
    instructions.push_str(description);

    GenerationRequest {
        instructions,
        max_tokens: tone.max_tokens(),
    }
}
