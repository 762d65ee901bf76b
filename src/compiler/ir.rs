use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One lowered operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Open a resource scope (arena + stack segment) at function entry.
    /// Emitted only for functions that construct something.
    OpenScope,
    /// Pass an argument by reference; the argument string names a variable.
    RefArg,
    /// Pass a literal argument by value.
    ValArg,
    /// Invoke the named function with the arguments staged before it.
    Call,
    /// Terminates a function's instruction run.
    EndOfFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub command: Command,
    pub arguments: Vec<String>,
}

impl Instruction {
    pub fn new(command: Command, arguments: Vec<String>) -> Self {
        Instruction { command, arguments }
    }

    pub fn plain(command: Command) -> Self {
        Instruction {
            command,
            arguments: Vec::new(),
        }
    }
}

/// A compiled program: one flat instruction stream with functions delimited
/// by their starting offset and an `EndOfFunction` marker. There is no
/// nested structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ir {
    pub instructions: Vec<Instruction>,

    /// Function name -> offset of its first instruction.
    pub function_offsets: HashMap<String, usize>,
}

impl Ir {
    pub fn new() -> Self {
        Ir {
            instructions: Vec::new(),
            function_offsets: HashMap::new(),
        }
    }

    /// Appends a compiled function body to the master stream: records the
    /// starting offset, prepends `OpenScope` when the function constructs
    /// something, and terminates with `EndOfFunction`.
    pub fn merge_as_function(&mut self, name: &str, body: Vec<Instruction>, use_scope: bool) {
        self.function_offsets
            .insert(name.to_string(), self.instructions.len());
        if use_scope {
            self.instructions.push(Instruction::plain(Command::OpenScope));
        }
        self.instructions.extend(body);
        self.instructions
            .push(Instruction::plain(Command::EndOfFunction));
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

impl Default for Ir {
    fn default() -> Self {
        Self::new()
    }
}
