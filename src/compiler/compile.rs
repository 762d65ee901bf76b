use crate::compiler::compile_error::CompileError;
use crate::compiler::ir::{Command, Instruction, Ir};
use crate::frontend::tree::{NodeKind, QuoteKind, SyntaxNode, SyntaxTree, TokenKind};
use crate::runtime::fizzle_map::FizzleMap;

/// Fixed size of the function registry; a program with more definitions
/// than this is rejected as a redefinition-table overflow.
const REGISTRY_SLOTS: usize = 256;

/// Built-in forms carry argument-name lists identical in shape to
/// user-defined function argument lists, so labeled parameters work on
/// them too.
fn builtin_arguments(name: &str) -> Option<Vec<String>> {
    match name {
        "new" => Some(vec!["type".to_string()]),
        "log" => Some(vec!["target".to_string(), "message".to_string()]),
        _ => None,
    }
}

/// Pass 1: lowers a validated syntax tree into flat per-function IR.
///
/// Nothing is evaluated. Each `(def name (args...) body...)` becomes a
/// contiguous instruction run; calls inside a body stage their arguments
/// (by reference for variables, by value for literals) and end in a `Call`.
/// A body that calls `new` marks the enclosing function as scope-opening.
pub struct Compiler {
    registry: FizzleMap<String, Vec<String>>,
}

struct Definition<'t> {
    name: String,
    body: Vec<&'t SyntaxNode>,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            registry: FizzleMap::new(REGISTRY_SLOTS),
        }
    }

    /// Compiles a whole program. Fails fast on the first error.
    pub fn compile(&mut self, tree: &SyntaxTree) -> Result<Ir, CompileError> {
        if !tree.is_valid {
            return Err(CompileError::invalid_tree(&tree.reasons));
        }

        let definitions = self.register_definitions(tree)?;
        if self.registry.try_get(&"main".to_string()).is_none() {
            return Err(CompileError::MissingMain);
        }

        let mut ir = Ir::new();
        for def in &definitions {
            let (body, use_scope) = self.compile_body(&def.body)?;
            ir.merge_as_function(&def.name, body, use_scope);
        }
        Ok(ir)
    }

    /// First walk: collect every top-level `(def ...)` into the registry so
    /// bodies can call functions defined later in the file.
    fn register_definitions<'t>(
        &mut self,
        tree: &'t SyntaxTree,
    ) -> Result<Vec<Definition<'t>>, CompileError> {
        let mut definitions = Vec::new();

        for item in tree.root.items() {
            let children: Vec<&SyntaxNode> = match &item.kind {
                NodeKind::List(QuoteKind::Code) => item.items().collect(),
                _ => {
                    return Err(CompileError::unsupported_with_hint(
                        "a top-level form that is not a definition",
                        "only (def name (args...) body...) may appear at the top level",
                    ));
                }
            };

            if children.first().and_then(|n| n.atom_value()) != Some("def") {
                return Err(CompileError::unsupported_with_hint(
                    "a top-level form that is not a definition",
                    "only (def name (args...) body...) may appear at the top level",
                ));
            }

            let name = children
                .get(1)
                .and_then(|n| n.atom_value())
                .ok_or_else(|| CompileError::unsupported("a definition without a name"))?
                .to_string();

            let argument_names = match children.get(2).map(|n| &n.kind) {
                Some(NodeKind::List(QuoteKind::Code)) => {
                    let mut names = Vec::new();
                    for arg in children[2].items() {
                        match arg.atom_value() {
                            Some(text) => names.push(text.to_string()),
                            None => {
                                return Err(CompileError::unsupported(
                                    "an argument declaration that is not a plain name",
                                ));
                            }
                        }
                    }
                    names
                }
                _ => {
                    return Err(CompileError::unsupported(
                        "a definition without an argument list",
                    ));
                }
            };

            if !self.registry.try_add(name.clone(), argument_names) {
                return Err(CompileError::redefined(name));
            }
            definitions.push(Definition {
                name,
                body: children[3..].to_vec(),
            });
        }
        Ok(definitions)
    }

    /// Lowers one function body. Returns the instructions and whether the
    /// body constructs anything (calls `new`), which obliges the function
    /// to open a scope at entry.
    fn compile_body(
        &self,
        body: &[&SyntaxNode],
    ) -> Result<(Vec<Instruction>, bool), CompileError> {
        let mut instructions = Vec::new();
        let mut use_scope = false;

        for item in body {
            match &item.kind {
                NodeKind::List(QuoteKind::Code) => {
                    let target = self.compile_call(item, &mut instructions)?;
                    if target == "new" {
                        use_scope = true;
                    }
                }
                NodeKind::List(QuoteKind::Stack) => {
                    return Err(CompileError::unsupported_with_hint(
                        "a stack-quote in call position",
                        "stack quotations are not lowered yet",
                    ));
                }
                _ => {
                    return Err(CompileError::unsupported(
                        "a bare token in call position",
                    ));
                }
            }
        }
        Ok((instructions, use_scope))
    }

    /// Lowers one call: binds parameters to the callee's declared argument
    /// positions, stages them in position order, then emits `Call`. Returns
    /// the callee name for scope detection.
    fn compile_call(
        &self,
        call: &SyntaxNode,
        out: &mut Vec<Instruction>,
    ) -> Result<String, CompileError> {
        let items: Vec<&SyntaxNode> = call.items().collect();
        let name = items
            .first()
            .and_then(|n| n.atom_value())
            .ok_or_else(|| CompileError::unsupported("a call whose head is not a name"))?
            .to_string();

        let declared = match builtin_arguments(&name) {
            Some(args) => args,
            None => self
                .registry
                .try_get(&name)
                .cloned()
                .ok_or_else(|| CompileError::unknown_function(&name))?,
        };

        let params = &items[1..];
        let bound = self.bind_arguments(&name, &declared, params)?;

        for param in bound.into_iter().flatten() {
            out.push(self.compile_parameter(param)?);
        }
        out.push(Instruction::new(Command::Call, vec![name.clone()]));
        Ok(name)
    }

    /// The binding protocol: labeled parameters claim their declared
    /// position first, then unlabeled parameters fill the remaining
    /// positions strictly left to right. Positions left unfilled are
    /// allowed; the callee sees fewer staged arguments.
    fn bind_arguments<'t>(
        &self,
        function: &str,
        declared: &[String],
        params: &[&'t SyntaxNode],
    ) -> Result<Vec<Option<&'t SyntaxNode>>, CompileError> {
        let mut positions: Vec<Option<&SyntaxNode>> = vec![None; declared.len()];

        for param in params.iter().filter(|p| p.label.is_some()) {
            let label = param.label.as_deref().unwrap_or_default();
            let position = declared
                .iter()
                .position(|arg| arg == label)
                .ok_or_else(|| CompileError::unknown_label(function, label))?;
            if positions[position].is_some() {
                return Err(CompileError::duplicate_position(function, label));
            }
            positions[position] = Some(param);
        }

        let free_positions: Vec<usize> =
            (0..declared.len()).filter(|&i| positions[i].is_none()).collect();
        let mut free = free_positions.into_iter();
        for param in params.iter().filter(|p| p.label.is_none()) {
            match free.next() {
                Some(position) => positions[position] = Some(param),
                None => {
                    return Err(CompileError::too_many_arguments(
                        function,
                        declared.len(),
                        params.len(),
                    ));
                }
            }
        }
        Ok(positions)
    }

    fn compile_parameter(&self, param: &SyntaxNode) -> Result<Instruction, CompileError> {
        match &param.kind {
            NodeKind::Token { kind, value } => match kind {
                TokenKind::Atom => Ok(Instruction::new(
                    Command::RefArg,
                    vec![value.clone()],
                )),
                TokenKind::Number | TokenKind::Str => Ok(Instruction::new(
                    Command::ValArg,
                    vec![value.clone()],
                )),
                TokenKind::Invalid => Err(CompileError::internal(
                    "invalid token in a tree marked valid",
                )),
            },
            NodeKind::List(_) => Err(CompileError::unsupported_with_hint(
                "a quoted parameter",
                "list-valued arguments are not lowered yet",
            )),
            _ => Err(CompileError::internal("meta node in parameter position")),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;

    fn compile(source: &str) -> Result<Ir, CompileError> {
        Compiler::new().compile(&parse(source))
    }

    fn function_run(ir: &Ir, name: &str) -> Vec<Instruction> {
        let start = ir.function_offsets[name];
        let mut run = Vec::new();
        for instruction in &ir.instructions[start..] {
            run.push(instruction.clone());
            if instruction.command == Command::EndOfFunction {
                break;
            }
        }
        run
    }

    #[test]
    fn test_hello_world_golden() {
        let ir = compile("(def main (stdin stdout) (log stdout `hello, world`))")
            .expect("compiles");

        assert!(ir.function_offsets.contains_key("main"));
        let run = function_run(&ir, "main");
        assert_eq!(
            run,
            vec![
                Instruction::new(Command::RefArg, vec!["stdout".to_string()]),
                Instruction::new(Command::ValArg, vec!["hello, world".to_string()]),
                Instruction::new(Command::Call, vec!["log".to_string()]),
                Instruction::plain(Command::EndOfFunction),
            ]
        );
    }

    #[test]
    fn test_labeled_argument_binding_order() {
        let ir = compile(
            "(def test (one two three))\n(def main () (test three: `c` `a` `b`))",
        )
        .expect("compiles");

        let run = function_run(&ir, "main");
        // Unlabeled parameters fill positions 0 and 1; the label claims 2.
        assert_eq!(
            run[..3],
            [
                Instruction::new(Command::ValArg, vec!["a".to_string()]),
                Instruction::new(Command::ValArg, vec!["b".to_string()]),
                Instruction::new(Command::ValArg, vec!["c".to_string()]),
            ]
        );
        assert_eq!(run[3], Instruction::new(Command::Call, vec!["test".to_string()]));
    }

    #[test]
    fn test_labels_work_on_builtins() {
        let ir = compile("(def main (out) (log message: `hi` target: out))")
            .expect("compiles");

        let run = function_run(&ir, "main");
        assert_eq!(run[0], Instruction::new(Command::RefArg, vec!["out".to_string()]));
        assert_eq!(run[1], Instruction::new(Command::ValArg, vec!["hi".to_string()]));
    }

    #[test]
    fn test_fewer_arguments_than_declared() {
        let ir = compile("(def main (out) (log out))").expect("compiles");
        let run = function_run(&ir, "main");
        assert_eq!(run.len(), 3);
        assert_eq!(run[0].command, Command::RefArg);
        assert_eq!(run[1].command, Command::Call);
    }

    #[test]
    fn test_new_opens_scope_for_enclosing_function() {
        let ir = compile("(def main () (new `file`))").expect("compiles");

        let run = function_run(&ir, "main");
        assert_eq!(run[0].command, Command::OpenScope);
        assert_eq!(run[1], Instruction::new(Command::ValArg, vec!["file".to_string()]));
        assert_eq!(run[2], Instruction::new(Command::Call, vec!["new".to_string()]));
    }

    #[test]
    fn test_function_without_new_opens_no_scope() {
        let ir = compile("(def main (out) (log out `x`))").expect("compiles");
        let run = function_run(&ir, "main");
        assert!(run.iter().all(|i| i.command != Command::OpenScope));
    }

    #[test]
    fn test_calls_between_defined_functions() {
        // 'helper' is defined after 'main' but is still callable.
        let ir = compile("(def main () (helper `x`))\n(def helper (value))")
            .expect("compiles");

        let run = function_run(&ir, "main");
        assert_eq!(run[1], Instruction::new(Command::Call, vec!["helper".to_string()]));
        assert!(ir.function_offsets.contains_key("helper"));
    }

    #[test]
    fn test_invalid_tree_is_rejected() {
        let err = compile("(def main () (log `oops)").expect_err("invalid");
        assert!(matches!(err, CompileError::InvalidTree { .. }));
    }

    #[test]
    fn test_missing_main_is_rejected() {
        let err = compile("(def helper (x))").expect_err("no main");
        assert!(matches!(err, CompileError::MissingMain));
    }

    #[test]
    fn test_redefinition_is_rejected() {
        let err = compile("(def main ())\n(def main ())").expect_err("redefined");
        assert!(matches!(err, CompileError::Redefined { .. }));
    }

    #[test]
    fn test_unknown_function_is_rejected() {
        let err = compile("(def main () (missing `x`))").expect_err("unknown");
        assert!(matches!(err, CompileError::UnknownFunction { .. }));
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = compile("(def main (out) (log volume: `11`))").expect_err("label");
        assert!(matches!(err, CompileError::UnknownLabel { .. }));
    }

    #[test]
    fn test_doubly_claimed_position_is_rejected() {
        let err = compile("(def main (out) (log target: out target: out))")
            .expect_err("duplicate");
        assert!(matches!(err, CompileError::DuplicatePosition { .. }));
    }

    #[test]
    fn test_label_plus_overflow_is_rejected() {
        let err = compile("(def main (out) (log target: out `a` `b`))")
            .expect_err("overflow");
        assert!(matches!(err, CompileError::TooManyArguments { .. }));
    }

    #[test]
    fn test_quoted_parameter_is_unsupported() {
        let err = compile("(def main (out) (log out (compute)))").expect_err("quote");
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn test_non_def_top_level_is_rejected() {
        let err = compile("(log `stray`)\n(def main ())").expect_err("top level");
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn test_comments_and_blank_lines_are_ignored() {
        let ir = compile("// entry point\n(def main (out)\n    (log out `hi`)\n)")
            .expect("compiles");
        assert!(ir.function_offsets.contains_key("main"));
    }
}
