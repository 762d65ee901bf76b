mod compiler;
mod frontend;
mod memory;
mod runtime;

use std::{env, fs, path::Path};

use crate::compiler::disasm::print_ir;
use crate::compiler::{Compiler, Ir};
use crate::frontend::parser;
use crate::frontend::render::render;
use crate::memory::arena::Arena;
use crate::runtime::stack::{DeferredAction, SegmentedStack};

fn main() {
    let args: Vec<String> = env::args().collect();

    let tree_only = args.contains(&"--tree".to_string());
    let render_only = args.contains(&"--render".to_string());
    let emit_ir = args.contains(&"--emit-ir".to_string());
    let load_ir = args.contains(&"--load-ir".to_string());

    // first non-flag argument is the filename
    let filename = args.iter().skip(1).find(|a| !a.starts_with('-'));

    match filename {
        Some(filename) => {
            if load_ir {
                ensure_extension(filename, "ir");
                load_compiled(filename);
                return;
            }
            ensure_extension(filename, "cin");
            match fs::read_to_string(filename) {
                Ok(source) => {
                    run_source(&source, filename, tree_only, render_only, emit_ir);
                }
                Err(e) => {
                    eprintln!("Failed to read '{}': {}", filename, e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            if args.len() == 1 {
                demo();
            } else {
                print_usage();
            }
        }
    }
}

fn ensure_extension(filename: &str, expected: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some(expected) {
        eprintln!("Error: expected a .{} file, got {}", expected, filename);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("CINDER - Scope-Lifetime S-Expression Language");
    println!();
    println!("Usage:");
    println!("  cinder                      Run the built-in demo");
    println!("  cinder <file.cin>           Compile a program and show its IR");
    println!("  cinder --tree <file.cin>    Show the syntax tree only");
    println!("  cinder --render <file.cin>  Parse and render back to source");
    println!("  cinder --emit-ir <file.cin> Compile and write <file>.ir");
    println!("  cinder --load-ir <file.ir>  Load a compiled program and show it");
}

fn run_source(
    source: &str,
    filename: &str,
    tree_only: bool,
    render_only: bool,
    emit_ir: bool,
) {
    let tree = parser::parse(source);

    // Tree and render modes work even on invalid input; the reasons are
    // part of what there is to inspect.
    if tree_only {
        if !tree.is_valid {
            for reason in &tree.reasons {
                eprintln!("Parse: {}", reason);
            }
        }
        println!("{:#?}", tree.root);
        return;
    }

    if render_only {
        print!("{}", render(&tree));
        return;
    }

    let ir = match Compiler::new().compile(&tree) {
        Ok(ir) => ir,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if emit_ir {
        let out_path = Path::new(filename).with_extension("ir");
        let bytes = match ir.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Failed to serialize program: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = fs::write(&out_path, bytes) {
            eprintln!("Failed to write '{}': {}", out_path.display(), e);
            std::process::exit(1);
        }
        println!("wrote {}", out_path.display());
        return;
    }

    print_ir(&ir);
}

fn load_compiled(filename: &str) {
    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            std::process::exit(1);
        }
    };
    match Ir::from_bytes(&bytes) {
        Ok(ir) => print_ir(&ir),
        Err(e) => {
            eprintln!("Failed to load '{}': {}", filename, e);
            std::process::exit(1);
        }
    }
}

/// No-argument walkthrough of the runtime primitives: allocate from an
/// arena, open a stack segment, pass a value by reference, and watch the
/// deferred cleanup fire at segment exit.
fn demo() {
    println!("demo mode");

    let arena = Arena::new();
    let span = arena.allocate(16);
    span.write(b"cinder", 0);
    println!("arena: {} byte(s) held", arena.size());

    let mut stack = SegmentedStack::new();
    let greeting = stack.push_data(b"hello, world".to_vec());

    stack.call();
    stack.push_reference(greeting);
    stack.push_deferred(DeferredAction::new(|| println!("scope closed")));
    if let Some(bytes) = stack.peek_index(0) {
        println!("through the reference: {}", String::from_utf8_lossy(&bytes));
    }

    if let Some(deferred) = stack.ret() {
        for action in &deferred {
            action.run();
        }
    }

    let source = "(def main (stdin stdout) (log stdout `hello, world`))";
    println!();
    println!("compiling: {}", source);
    match Compiler::new().compile(&parser::parse(source)) {
        Ok(ir) => print_ir(&ir),
        Err(e) => eprintln!("{}", e),
    }
}
