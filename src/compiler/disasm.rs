use crate::compiler::ir::{Command, Instruction, Ir};
use std::collections::HashMap;

/// Print a compiled program's instruction stream
pub fn print_ir(ir: &Ir) {
    println!("=== COMPILED PROGRAM ===\n");
    println!("{} instruction(s), {} function(s)", ir.instructions.len(), ir.function_offsets.len());
    println!("════════════════════════════════════════");
    print!("{}", describe(ir));
}

/// Return the instruction stream as a String, one line per instruction,
/// annotated with `<- (def name` where a function starts.
pub fn describe(ir: &Ir) -> String {
    // Reverse the offset map so each function start can be annotated.
    let mut starts: HashMap<usize, Vec<&str>> = HashMap::new();
    for (name, offset) in &ir.function_offsets {
        starts.entry(*offset).or_default().push(name);
    }
    for names in starts.values_mut() {
        names.sort();
    }

    let mut output = String::new();
    for (ip, instruction) in ir.instructions.iter().enumerate() {
        output.push_str(&format!("{:04}   {}", ip, format_instruction(instruction)));
        if let Some(names) = starts.get(&ip) {
            for name in names {
                output.push_str(&format!("   <- (def {}", name));
            }
        }
        output.push('\n');
    }
    output
}

fn format_instruction(instruction: &Instruction) -> String {
    let name = match instruction.command {
        Command::OpenScope => "OPEN_SCOPE",
        Command::RefArg => "REF_ARG",
        Command::ValArg => "VAL_ARG",
        Command::Call => "CALL",
        Command::EndOfFunction => "END_OF_FUNCTION",
    };
    let mut line = format!("{:<16}", name);
    for argument in &instruction.arguments {
        line.push_str(&format!(" \"{}\"", argument));
    }
    line.trim_end().to_string()
}
