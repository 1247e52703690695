pub mod word_index;
pub mod phone_index;
pub mod search_index;
pub mod background;
