pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;

pub use compile::Compiler;
pub use ir::Ir;
