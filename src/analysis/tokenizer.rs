use crate::analysis::token::Token;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Lowercasing whitespace tokenizer used for customer names.
///
/// Every word becomes a token, however long.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.split_whitespace()
            .enumerate()
            .map(|(position, word)| Token::new(word.to_lowercase(), position as u32))
            .collect()
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Lowercase and trim a free-text query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
