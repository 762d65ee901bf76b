pub mod parser;
pub mod render;
pub mod tree;
