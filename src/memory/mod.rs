pub mod arena;
pub mod arena_vec;
pub mod block_list;
