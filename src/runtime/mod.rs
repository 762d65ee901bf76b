pub mod deque;
pub mod fizzle_map;
pub mod stack;
