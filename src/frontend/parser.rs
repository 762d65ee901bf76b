use crate::frontend::tree::{NodeKind, QuoteKind, SyntaxNode, SyntaxTree, TokenKind};

/// Error-tolerant scanner producing a syntax tree.
///
/// Malformed input never panics and never aborts the scan: every problem is
/// appended to `reasons` and parsing continues as far as the structure
/// allows. The one exception is a stray close bracket at the top level,
/// which halts immediately since there is no enclosing list to continue in.
/// Internal logic violations, by contrast, are bugs and panic.
pub struct Parser {
    source: Vec<char>,
    pos: usize,
    reasons: Vec<String>,
}

/// Parses source text into a syntax tree, preserving comments, blank lines,
/// and labels for faithful re-rendering.
pub fn parse(source: &str) -> SyntaxTree {
    let mut parser = Parser {
        source: source.chars().collect(),
        pos: 0,
        reasons: Vec::new(),
    };

    let start = parser.pos;
    let mut children = parser.parse_items(None);
    let end = parser.pos;

    // Blank lines are kept between items but trimmed at the document edges.
    while matches!(children.first().map(|n| &n.kind), Some(NodeKind::LineBreak(_))) {
        children.remove(0);
    }
    while matches!(children.last().map(|n| &n.kind), Some(NodeKind::LineBreak(_))) {
        children.pop();
    }

    let root = SyntaxNode {
        kind: NodeKind::Root,
        label: None,
        children,
        start,
        end,
    };
    SyntaxTree {
        root,
        is_valid: parser.reasons.is_empty(),
        reasons: parser.reasons,
    }
}

impl Parser {
    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        self.pos += 1;
        ch
    }

    fn report(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Scans items until the matching closer (or end of input at top level).
    fn parse_items(&mut self, closer: Option<char>) -> Vec<SyntaxNode> {
        let mut items: Vec<SyntaxNode> = Vec::new();
        let mut pending_label: Option<String> = None;

        loop {
            self.scan_whitespace(&mut items);

            let start = self.pos;
            match self.current() {
                None => {
                    if let Some(expected) = closer {
                        self.report(format!(
                            "unterminated list, expected '{}' before end of input",
                            expected
                        ));
                    }
                    if let Some(label) = pending_label.take() {
                        self.report(format!("label '{}:' has nothing to apply to", label));
                    }
                    return items;
                }

                Some(ch @ (')' | '}')) => {
                    match closer {
                        Some(expected) => {
                            self.advance();
                            if ch != expected {
                                self.report(format!(
                                    "mismatched close: expected '{}' but found '{}'",
                                    expected, ch
                                ));
                            }
                            if let Some(label) = pending_label.take() {
                                self.report(format!(
                                    "label '{}:' has nothing to apply to",
                                    label
                                ));
                            }
                            return items;
                        }
                        None => {
                            // No enclosing list to continue in: halt.
                            self.report(format!("unexpected '{}' at top level", ch));
                            return items;
                        }
                    }
                }

                Some(ch @ ('(' | '{')) => {
                    self.advance();
                    let quote = if ch == '(' {
                        QuoteKind::Code
                    } else {
                        QuoteKind::Stack
                    };
                    let expected = if ch == '(' { ')' } else { '}' };
                    let children = self.parse_items(Some(expected));
                    let mut node = SyntaxNode::list(quote, children, start, self.pos);
                    node.label = pending_label.take();
                    items.push(node);
                }

                Some('`') => {
                    let mut node = self.scan_string();
                    node.label = pending_label.take();
                    items.push(node);
                }

                Some('/') if self.peek() == Some('/') => {
                    items.push(self.scan_comment());
                }

                Some(_) => {
                    let text = self.scan_token_text();
                    if text.len() > 1 && text.ends_with(':') {
                        if let Some(dropped) = pending_label.take() {
                            self.report(format!(
                                "label '{}:' has nothing to apply to",
                                dropped
                            ));
                        }
                        pending_label = Some(text[..text.len() - 1].to_string());
                    } else {
                        let kind = classify(&text);
                        let mut node = SyntaxNode::token(kind, text, start, self.pos);
                        node.label = pending_label.take();
                        items.push(node);
                    }
                }
            }
        }
    }

    /// Skips spaces, keeping newline runs as LineBreak meta nodes.
    fn scan_whitespace(&mut self, items: &mut Vec<SyntaxNode>) {
        let start = self.pos;
        let mut newlines = 0usize;
        while let Some(ch) = self.current() {
            if ch == '\n' {
                newlines += 1;
                self.advance();
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
        if newlines > 0 {
            items.push(SyntaxNode {
                kind: NodeKind::LineBreak(newlines),
                label: None,
                children: Vec::new(),
                start,
                end: self.pos,
            });
        }
    }

    /// Backtick-delimited string, no escape sequences. An unterminated
    /// string becomes an Invalid token and the scan continues.
    fn scan_string(&mut self) -> SyntaxNode {
        let start = self.pos;
        self.advance(); // opening backtick

        let mut value = String::new();
        loop {
            match self.advance() {
                Some('`') => {
                    return SyntaxNode::token(TokenKind::Str, value, start, self.pos);
                }
                Some(ch) => value.push(ch),
                None => {
                    self.report("unterminated string literal".to_string());
                    return SyntaxNode::token(TokenKind::Invalid, value, start, self.pos);
                }
            }
        }
    }

    /// `//` comment captured verbatim, including the trailing newline, so
    /// the renderer can put it back untouched.
    fn scan_comment(&mut self) -> SyntaxNode {
        let start = self.pos;
        let mut text = String::new();
        while let Some(ch) = self.current() {
            text.push(ch);
            self.advance();
            if ch == '\n' {
                break;
            }
        }
        SyntaxNode {
            kind: NodeKind::Comment(text),
            label: None,
            children: Vec::new(),
            start,
            end: self.pos,
        }
    }

    fn scan_token_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '{' | '}' | '`') {
                break;
            }
            if ch == '/' && self.peek() == Some('/') {
                break;
            }
            text.push(ch);
            self.advance();
        }
        debug_assert!(!text.is_empty(), "token scan at non-token character");
        text
    }
}

/// A token is a number if, after stripping digit-group separators, it parses
/// as a float or as a `0x`/`0b` literal. Everything else is an atom.
fn classify(text: &str) -> TokenKind {
    let stripped: String = text.chars().filter(|c| *c != '\'' && *c != '_').collect();
    let is_number = if let Some(hex) = stripped.strip_prefix("0x") {
        !hex.is_empty() && u64::from_str_radix(hex, 16).is_ok()
    } else if let Some(bin) = stripped.strip_prefix("0b") {
        !bin.is_empty() && u64::from_str_radix(bin, 2).is_ok()
    } else {
        stripped.parse::<f64>().is_ok()
    };
    if is_number {
        TokenKind::Number
    } else {
        TokenKind::Atom
    }
}
