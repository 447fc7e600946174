use core::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionErrorKind {
    /// The name belongs to a native function
    Builtin,
    /// A user function may only be redefined with the same parameter count
    ArityChanged { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    SyntaxError(String),
    /// The input ended before the statement did
    IncompleteInput,
    ArityError { name: String, expected: usize, found: usize },
    DefinitionError { name: String, kind: DefinitionErrorKind },
    UnboundVariableError(String),
    /// Only reachable from a hand-built tree, the parser never emits a call
    /// to a function it cannot resolve
    UndefinedFunction(String),
    /// Evaluation nested deeper than the given limit, usually runaway recursion
    RecursionLimit(usize),
}

impl CalcError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::SyntaxError(message.into())
    }

    /// Stable name of the error variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SyntaxError(_) => "SyntaxError",
            Self::IncompleteInput => "IncompleteInput",
            Self::ArityError { .. } => "ArityError",
            Self::DefinitionError { .. } => "DefinitionError",
            Self::UnboundVariableError(_) => "UnboundVariableError",
            Self::UndefinedFunction(_) => "UndefinedFunction",
            Self::RecursionLimit(_) => "RecursionLimit",
        }
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError(message) => write!(f, "syntax error: {}", message),
            Self::IncompleteInput => write!(f, "syntax error: unexpected end of input"),
            Self::ArityError { name, expected, found }
                => write!(f, "wrong number of arguments: {} expects {}, got {}", name, expected, found),
            Self::DefinitionError { name, kind: DefinitionErrorKind::Builtin }
                => write!(f, "{} is built-in function", name),
            Self::DefinitionError { name, kind: DefinitionErrorKind::ArityChanged { expected, found } }
                => write!(f, "wrong number of arguments: {} is defined with {} parameters, got {}", name, expected, found),
            Self::UnboundVariableError(name) => write!(f, "unbound variable: {}", name),
            Self::UndefinedFunction(name) => write!(f, "undefined function: {}", name),
            Self::RecursionLimit(limit) => write!(f, "recursion limit exceeded: more than {} nested evaluations", limit),
        }
    }
}

impl Error for CalcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        assert_eq!(CalcError::UnboundVariableError("b".into()).to_string(), "unbound variable: b");
        assert_eq!(CalcError::syntax("'then' expected").to_string(), "syntax error: 'then' expected");
        assert_eq!(
            CalcError::DefinitionError { name: "sqrt".into(), kind: DefinitionErrorKind::Builtin }.to_string(),
            "sqrt is built-in function"
        );
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(CalcError::IncompleteInput.kind(), "IncompleteInput");
        assert_eq!(CalcError::ArityError { name: "f".into(), expected: 1, found: 2 }.kind(), "ArityError");
        assert_eq!(CalcError::RecursionLimit(10).kind(), "RecursionLimit");
    }
}
