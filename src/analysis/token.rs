/// Token representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,      // Lowercased token text
    pub position: u32,     // Position in the field
}

impl Token {
    pub fn new(text: String, position: u32) -> Self {
        Token { text, position }
    }
}
