/// Which bracket opened a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    /// `( ... )` — ordinary code list.
    Code,
    /// `{ ... }` — stack-quote literal region.
    Stack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Atom,
    /// Float, `0x`, or `0b` literal (digit separators `'` and `_` allowed).
    Number,
    /// Backtick-delimited string; `value` holds the text between backticks.
    Str,
    /// A token the scanner could not finish (e.g. unterminated string).
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    List(QuoteKind),
    Token { kind: TokenKind, value: String },
    /// Comment captured verbatim, including the `//` and trailing newline.
    Comment(String),
    /// Run of newlines between items, kept for faithful re-rendering.
    LineBreak(usize),
}

/// One syntax tree node. `label` is the `name:` prefix attached to this
/// node; `start`/`end` are source offsets (in chars) for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub label: Option<String>,
    pub children: Vec<SyntaxNode>,
    pub start: usize,
    pub end: usize,
}

impl SyntaxNode {
    pub fn token(kind: TokenKind, value: impl Into<String>, start: usize, end: usize) -> Self {
        SyntaxNode {
            kind: NodeKind::Token {
                kind,
                value: value.into(),
            },
            label: None,
            children: Vec::new(),
            start,
            end,
        }
    }

    pub fn list(quote: QuoteKind, children: Vec<SyntaxNode>, start: usize, end: usize) -> Self {
        SyntaxNode {
            kind: NodeKind::List(quote),
            label: None,
            children,
            start,
            end,
        }
    }

    /// Comments and line breaks carry no semantics.
    pub fn is_meta(&self) -> bool {
        matches!(self.kind, NodeKind::Comment(_) | NodeKind::LineBreak(_))
    }

    /// The token text, if this node is a plain atom.
    pub fn atom_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Token {
                kind: TokenKind::Atom,
                value,
            } => Some(value),
            _ => None,
        }
    }

    /// Semantic (non-meta) children.
    pub fn items(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| !c.is_meta())
    }
}

/// Parse result: the tree plus accumulated validity information.
///
/// The parser never aborts on malformed input; it records a human-readable
/// reason, clears `is_valid`, and keeps scanning as far as the structure
/// allows, so partial diagnostics stay possible.
#[derive(Debug)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
    pub is_valid: bool,
    pub reasons: Vec<String>,
}
