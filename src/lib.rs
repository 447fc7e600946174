mod builtin;
mod context;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod repl;

#[cfg(test)]
mod test_utils;

pub use error::{CalcError, DefinitionErrorKind};
pub use context::{EvaluationContext, Outcome};
pub use interpreter::{bool_to_value, is_true, Function, FunctionTable, UserFunction, Value, MAX_EVALUATION_DEPTH};
pub use lexer::{Token, TokenStream};
pub use parser::{parse, BinaryOperator, Definition, Expr, LogicalOperator, Parser, Statement, UnaryOperator, MAX_NESTING};
pub use repl::{Flow, Repl};
