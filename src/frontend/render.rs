use crate::frontend::tree::{NodeKind, QuoteKind, SyntaxNode, SyntaxTree, TokenKind};

const INDENT: &str = "    ";

/// What to emit before the next item on the current line.
enum Sep {
    /// Start of a list body, nothing yet.
    None,
    /// A sibling was just emitted on this line.
    Space,
    /// A newline was just emitted; indent to the current depth.
    Indent,
}

/// Renders a syntax tree back to source text.
///
/// Canonical layout: one space between siblings, four spaces of indentation
/// per list depth after a line break, a close bracket on its own line
/// indented to the list's own depth. Comments come back verbatim and blank
/// lines are preserved, so text already in canonical layout round-trips
/// byte for byte through parse and render. Other layouts cannot: the
/// scanner keeps only newline counts from whitespace runs, so spaces and
/// tabs between siblings collapse to the canonical single-space form.
pub fn render(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    render_items(&tree.root.children, 0, &mut out);
    out
}

fn render_items(children: &[SyntaxNode], depth: usize, out: &mut String) {
    let mut sep = Sep::None;
    for child in children {
        match &child.kind {
            NodeKind::LineBreak(count) => {
                for _ in 0..*count {
                    out.push('\n');
                }
                sep = Sep::Indent;
            }
            NodeKind::Comment(text) => {
                match sep {
                    Sep::None => {}
                    Sep::Space => out.push(' '),
                    Sep::Indent => indent(depth, out),
                }
                out.push_str(text);
                // A comment normally owns its trailing newline; one cut off
                // by end of input leaves the line open.
                sep = if text.ends_with('\n') {
                    Sep::Indent
                } else {
                    Sep::Space
                };
            }
            NodeKind::Token { kind, value } => {
                match sep {
                    Sep::None => {}
                    Sep::Space => out.push(' '),
                    Sep::Indent => indent(depth, out),
                }
                if let Some(label) = &child.label {
                    out.push_str(label);
                    out.push_str(": ");
                }
                match kind {
                    TokenKind::Str => {
                        out.push('`');
                        out.push_str(value);
                        out.push('`');
                    }
                    _ => out.push_str(value),
                }
                sep = Sep::Space;
            }
            NodeKind::List(quote) => {
                match sep {
                    Sep::None => {}
                    Sep::Space => out.push(' '),
                    Sep::Indent => indent(depth, out),
                }
                if let Some(label) = &child.label {
                    out.push_str(label);
                    out.push_str(": ");
                }
                let (open, close) = match quote {
                    QuoteKind::Code => ('(', ')'),
                    QuoteKind::Stack => ('{', '}'),
                };
                out.push(open);
                let body_ends_on_new_line = matches!(
                    child.children.last().map(|n| &n.kind),
                    Some(NodeKind::LineBreak(_))
                );
                render_items(&child.children, depth + 1, out);
                if body_ends_on_new_line {
                    indent(depth, out);
                }
                out.push(close);
                sep = Sep::Space;
            }
            NodeKind::Root => {
                // Root never appears as a child.
                unreachable!("nested root node");
            }
        }
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
