//! Tokens and annotated sequences.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TokenRole {
    Prompt,
    Generated,
    Padding,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub text: String,
    pub id: Option<u32>,
    pub position: usize,
    pub role: TokenRole,
}

impl Token {
    pub fn new(text: impl Into<String>, id: Option<u32>, position: usize, role: TokenRole) -> Self {
        Self {
            text: text.into(),
            id,
            position,
            role,
        }
    }

    pub fn is_prompt(&self) -> bool {
        self.role == TokenRole::Prompt
    }

    pub fn is_generated(&self) -> bool {
        self.role == TokenRole::Generated
    }

    pub fn is_padding(&self) -> bool {
        self.role == TokenRole::Padding
    }
}

/// Per-token scalars. Only generated tokens carry values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenAnnotations {
    pub old_log_prob: Option<f64>,
    pub new_log_prob: Option<f64>,
    pub advantage: Option<f64>,
    pub ret: Option<f64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    pub tokens: Vec<Token>,
    pub annotations: Vec<TokenAnnotations>,
}

impl Sequence {
    /// Prompt tokens followed by generated tokens; positions are assigned
    /// in order.
    pub fn from_parts(prompt: &[&str], completion: &[&str]) -> Self {
        let tokens: Vec<Token> = prompt
            .iter()
            .map(|t| (t, TokenRole::Prompt))
            .chain(completion.iter().map(|t| (t, TokenRole::Generated)))
            .enumerate()
            .map(|(i, (t, role))| Token::new(*t, None, i, role))
            .collect();
        let annotations = vec![TokenAnnotations::default(); tokens.len()];
        Self {
            tokens,
            annotations,
        }
    }

    /// Attach ids in order. Extra ids are ignored; missing ids stay `None`.
    pub fn with_ids(mut self, ids: &[u32]) -> Self {
        for (tok, &id) in self.tokens.iter_mut().zip(ids) {
            tok.id = Some(id);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn prompt_len(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_prompt()).count()
    }

    pub fn generated(&self) -> impl Iterator<Item = (&Token, &TokenAnnotations)> {
        self.tokens
            .iter()
            .zip(self.annotations.iter())
            .filter(|(t, _)| t.is_generated())
    }

    pub fn texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

/// `completion[:-1]` and `completion[1:]`: each input predicts the next
/// target. Fewer than two tokens yields two empty slices.
pub fn shift_for_next_token<T>(tokens: &[T]) -> (&[T], &[T]) {
    if tokens.len() < 2 {
        return (&tokens[..0], &tokens[..0]);
    }
    (&tokens[..tokens.len() - 1], &tokens[1..])
}

/// The running example shared by several pages: "Where is Pune? Pune is in India."
pub mod demo {
    pub const PROMPT: &[&str] = &["Where", " is", " Pune", "?"];
    pub const RESPONSE: &[&str] = &[" Pune", " is", " in", " India", "."];
    pub const COMPLETION: &[&str] = &["Where", " is", " Pune", "?", " Pune", " is", " in", " India", "."];
    pub const COMPLETION_IDS: &[u32] = &[2940, 318, 24723, 30, 24723, 318, 287, 3794, 13];

    pub fn sequence() -> super::Sequence {
        super::Sequence::from_parts(PROMPT, RESPONSE).with_ids(COMPLETION_IDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_drops_last_input_and_first_target() {
        let (inputs, targets) = shift_for_next_token(demo::COMPLETION);
        assert_eq!(inputs.len(), 8);
        assert_eq!(targets.len(), 8);
        assert_eq!(inputs[0], "Where");
        assert_eq!(targets[0], " is");
        assert_eq!(*inputs.last().unwrap(), " India");
        assert_eq!(*targets.last().unwrap(), ".");
    }

    #[test]
    fn shift_of_short_input_is_empty() {
        let one = [1u32];
        let (i, t) = shift_for_next_token(&one);
        assert!(i.is_empty() && t.is_empty());
    }

    #[test]
    fn demo_sequence_roles_and_ids() {
        let seq = demo::sequence();
        assert_eq!(seq.len(), 9);
        assert_eq!(seq.prompt_len(), 4);
        assert_eq!(seq.generated().count(), 5);
        assert_eq!(seq.tokens[2].id, Some(24723));
        assert_eq!(seq.tokens[8].position, 8);
        assert!(seq.tokens[3].is_prompt());
        assert!(seq.tokens[4].is_generated());
    }
}
