#[derive(Debug, Clone)]
pub enum CompileError {
    /// The parser flagged the tree invalid; compilation never starts.
    InvalidTree { reasons: Vec<String> },
    /// No `main` function among the top-level definitions.
    MissingMain,
    /// The same function name was defined twice.
    Redefined { name: String },
    /// A call targets a name that is neither a built-in nor a defined
    /// function.
    UnknownFunction { name: String },
    /// A labeled parameter names no declared argument of the callee.
    UnknownLabel { function: String, label: String },
    /// Two parameters claim the same argument position.
    DuplicatePosition { function: String, argument: String },
    /// More parameters than the callee declares positions for.
    TooManyArguments {
        function: String,
        expected: usize,
        given: usize,
    },
    /// A construct the compiler does not lower yet.
    Unsupported { what: String, hint: Option<String> },
    /// Internal compiler error (shouldn't happen in normal use)
    Internal(String),
}

impl CompileError {
    pub fn invalid_tree(reasons: &[String]) -> Self {
        CompileError::InvalidTree {
            reasons: reasons.to_vec(),
        }
    }

    pub fn redefined(name: impl Into<String>) -> Self {
        CompileError::Redefined { name: name.into() }
    }

    pub fn unknown_function(name: impl Into<String>) -> Self {
        CompileError::UnknownFunction { name: name.into() }
    }

    pub fn unknown_label(function: impl Into<String>, label: impl Into<String>) -> Self {
        CompileError::UnknownLabel {
            function: function.into(),
            label: label.into(),
        }
    }

    pub fn duplicate_position(function: impl Into<String>, argument: impl Into<String>) -> Self {
        CompileError::DuplicatePosition {
            function: function.into(),
            argument: argument.into(),
        }
    }

    pub fn too_many_arguments(function: impl Into<String>, expected: usize, given: usize) -> Self {
        CompileError::TooManyArguments {
            function: function.into(),
            expected,
            given,
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        CompileError::Unsupported {
            what: what.into(),
            hint: None,
        }
    }

    pub fn unsupported_with_hint(what: impl Into<String>, hint: impl Into<String>) -> Self {
        CompileError::Unsupported {
            what: what.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::InvalidTree { reasons } => {
                write!(f, "compile error: the syntax tree is not valid")?;
                for reason in reasons {
                    write!(f, "\n  parse: {}", reason)?;
                }
                Ok(())
            }
            CompileError::MissingMain => {
                write!(f, "compile error: no 'main' function is defined")
            }
            CompileError::Redefined { name } => {
                write!(f, "compile error: function '{}' is defined twice", name)
            }
            CompileError::UnknownFunction { name } => {
                write!(f, "compile error: call to unknown function '{}'", name)
            }
            CompileError::UnknownLabel { function, label } => {
                write!(
                    f,
                    "compile error: '{}' has no argument named '{}'",
                    function, label
                )
            }
            CompileError::DuplicatePosition { function, argument } => {
                write!(
                    f,
                    "compile error: argument '{}' of '{}' is supplied twice",
                    argument, function
                )
            }
            CompileError::TooManyArguments {
                function,
                expected,
                given,
            } => {
                write!(
                    f,
                    "compile error: '{}' takes {} argument(s) but {} were supplied",
                    function, expected, given
                )
            }
            CompileError::Unsupported { what, hint } => {
                write!(f, "compile error: cannot compile {}", what)?;
                if let Some(h) = hint {
                    write!(f, "\n  hint: {}", h)?;
                }
                Ok(())
            }
            CompileError::Internal(msg) => {
                write!(f, "compile error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompileError {}
