pub mod meme;
pub mod share;
