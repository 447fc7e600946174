use std::collections::HashMap;

use crate::{builtin::builtin_table, error::CalcError, interpreter::{evaluate, FunctionTable, Runtime, Value}, lexer::{Token, TokenStream}, parser::{parse, Parser, Statement}};

/// What a successfully executed statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    /// A function definition, carrying the defined name
    Defined(String),
    Quit,
}

/// An evaluation context owns the global variable table and the function
/// table, and executes statements against them.
///
/// Every context starts with only the native functions defined, so two
/// contexts never observe each other's variables or definitions.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    globals: HashMap<String, Value>,
    functions: FunctionTable,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            functions: builtin_table(),
        }
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.globals.get(name).copied()
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Parses one statement against the current function table without
    /// running it
    pub fn parse(&self, input: &str) -> Result<Statement, CalcError> {
        parse(input, &self.functions)
    }

    fn run_statement(&mut self, statement: Statement) -> Result<Outcome, CalcError> {
        match statement {
            Statement::Definition(definition) => {
                let name = definition.name.clone();
                self.functions.define(definition)?;
                Ok(Outcome::Defined(name))
            }
            Statement::Expression(expression) => {
                let mut runtime = Runtime::new(&mut self.globals, &self.functions);
                evaluate(&expression, None, &mut runtime).map(Outcome::Value)
            }
            Statement::Quit => Ok(Outcome::Quit),
        }
    }

    /// Parses and runs the next statement of `stream`.
    ///
    /// On failure the stream is left at the start of the next statement: a
    /// broken expression statement is skipped through its `;`, and a failed
    /// definition discards the rest of the stream. Incomplete input leaves
    /// the stream untouched so the caller can retry with more text.
    pub fn execute(&mut self, stream: &mut TokenStream) -> Result<Outcome, CalcError> {
        let is_definition = matches!(stream.peek(), Ok(Some(Token::Def)));

        let statement = match Parser::new(stream, &self.functions).statement() {
            Ok(statement) => statement,
            Err(CalcError::IncompleteInput) => return Err(CalcError::IncompleteInput),
            Err(err) => {
                if is_definition { stream.clear() } else { stream.skip_statement() }
                return Err(err)
            }
        };

        let result = self.run_statement(statement);
        if is_definition && result.is_err() {
            stream.clear();
        }
        result
    }

    /// Evaluates a source string holding exactly one statement
    pub fn evaluate_str(&mut self, input: &str) -> Result<Outcome, CalcError> {
        let statement = self.parse(input)?;
        self.run_statement(statement)
    }

    /// Runs every statement of `input`, recovering after each error. Stops
    /// after `quit` or when the input ends inside a statement.
    pub fn run(&mut self, input: &str) -> Vec<Result<Outcome, CalcError>> {
        let mut stream = TokenStream::new(input);
        let mut results = Vec::new();

        while !stream.is_exhausted() {
            let result = self.execute(&mut stream);
            let stop = matches!(result, Ok(Outcome::Quit) | Err(CalcError::IncompleteInput));
            results.push(result);
            if stop { break; }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use crate::{interpreter::MAX_EVALUATION_DEPTH, parser::MAX_NESTING};

    use super::*;

    fn value(value: Value) -> Result<Outcome, CalcError> {
        Ok(Outcome::Value(value))
    }

    #[test]
    fn concrete_scenarios() {
        let mut context = EvaluationContext::new();
        assert_eq!(context.evaluate_str("1 + 2 * 3;"), value(7.0));
        assert_eq!(context.evaluate_str("if 1 < 2 then 10 else 20 end;"), value(10.0));
        assert_eq!(context.run("a = 5; a + 1;"), vec![value(5.0), value(6.0)]);
        assert_eq!(context.evaluate_str("let x = 10 in x * x end;"), value(100.0));
        assert_eq!(context.evaluate_str("def inc(n) n + 1 end"), Ok(Outcome::Defined("inc".to_owned())));
        assert_eq!(context.evaluate_str("inc(41);"), value(42.0));
        assert_eq!(context.evaluate_str("b + 1;"), Err(CalcError::UnboundVariableError("b".to_owned())));
    }

    #[test]
    fn let_assignment_stays_local() {
        let mut context = EvaluationContext::new();
        assert_eq!(context.evaluate_str("let x = 1 in x = 2, x end;"), value(2.0));
        assert_eq!(context.variable("x"), None);

        assert_eq!(context.evaluate_str("let x = 1 in y = 2, x + y end;"), value(3.0));
        assert_eq!(context.variable("y"), Some(2.0));
    }

    #[test]
    fn short_circuit_skips_assignment() {
        let mut context = EvaluationContext::new();
        assert_eq!(context.evaluate_str("0 and (a = 5);"), value(0.0));
        assert_eq!(context.evaluate_str("1 or (a = 5);"), value(1.0));
        assert_eq!(context.variable("a"), None);

        assert_eq!(context.evaluate_str("a = 3;"), value(3.0));
        assert_eq!(context.evaluate_str("0 and (a = 5);"), value(0.0));
        assert_eq!(context.variable("a"), Some(3.0));
    }

    #[test]
    fn function_bodies_do_not_see_caller_locals() {
        let mut context = EvaluationContext::new();
        context.evaluate_str("def get() v end").unwrap();
        assert_eq!(
            context.evaluate_str("let v = 1 in get() end;"),
            Err(CalcError::UnboundVariableError("v".to_owned()))
        );
        context.evaluate_str("v = 9;").unwrap();
        assert_eq!(context.evaluate_str("let v = 1 in get() end;"), value(9.0));
    }

    #[test]
    fn redefinition_rules() {
        let mut context = EvaluationContext::new();
        assert_eq!(context.evaluate_str("def sq(x) x * x end"), Ok(Outcome::Defined("sq".to_owned())));
        assert_eq!(context.evaluate_str("sq(3);"), value(9.0));
        assert_eq!(context.evaluate_str("def sq(y) y + y end"), Ok(Outcome::Defined("sq".to_owned())));
        assert_eq!(context.evaluate_str("sq(3);"), value(6.0));
        assert_eq!(context.evaluate_str("def sq(a, b) a end").map_err(|err| err.kind()), Err("DefinitionError"));
        assert_eq!(context.evaluate_str("def sqrt(x) x end").map_err(|err| err.kind()), Err("DefinitionError"));
        assert_eq!(context.evaluate_str("sqrt(9);"), value(3.0));
    }

    #[test]
    fn calls_parsed_before_redefinition_use_the_new_body() {
        let mut context = EvaluationContext::new();
        context.evaluate_str("def f(x) x end").unwrap();
        context.evaluate_str("def g(x) f(x) * 10 end").unwrap();
        assert_eq!(context.evaluate_str("g(2);"), value(20.0));
        context.evaluate_str("def f(x) x + 1 end").unwrap();
        assert_eq!(context.evaluate_str("g(2);"), value(30.0));
    }

    #[test]
    fn recursion() {
        let mut context = EvaluationContext::new();
        context.evaluate_str("def fact(n) if n < 2 then 1 else n * fact(n - 1) end end").unwrap();
        assert_eq!(context.evaluate_str("fact(10);"), value(3628800.0));
    }

    #[test]
    fn runaway_recursion_fails_the_statement_only() {
        let mut context = EvaluationContext::new();
        context.evaluate_str("a = 1;").unwrap();
        context.evaluate_str("def f(n) f(n + 1) end").unwrap();
        assert_eq!(context.evaluate_str("f(1);"), Err(CalcError::RecursionLimit(MAX_EVALUATION_DEPTH)));

        context.evaluate_str("def count(n) if n < 1 then 0 else 1 + count(n - 1) end end").unwrap();
        assert_eq!(context.evaluate_str("count(100);"), value(100.0));
        assert_eq!(context.evaluate_str("a + 1;"), value(2.0));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let mut context = EvaluationContext::new();
        let source = format!("{}1{}; 2;", "(".repeat(50_000), ")".repeat(50_000));
        assert_eq!(context.run(&source), vec![Err(CalcError::syntax("expression nested too deeply")), value(2.0)]);

        let source = format!("{}1{};", "(".repeat(MAX_NESTING - 1), ")".repeat(MAX_NESTING - 1));
        assert_eq!(context.evaluate_str(&source), value(1.0));
    }

    #[test]
    fn run_recovers_after_errors() {
        let mut context = EvaluationContext::new();
        let results = context.run("1 +; 2; b; 3 4 5; 6;");
        assert_eq!(results, vec![
            Err(CalcError::syntax("unexpected token: ;")),
            value(2.0),
            Err(CalcError::UnboundVariableError("b".to_owned())),
            Err(CalcError::syntax("invalid expression")),
            value(6.0),
        ]);
    }

    #[test]
    fn failed_definition_discards_the_rest() {
        let mut context = EvaluationContext::new();
        let results = context.run("def sqrt(x) x end 1; 2;");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().map_err(CalcError::kind), Err("DefinitionError"));

        let results = context.run("def f(x x end; 2;");
        assert_eq!(results, vec![Err(CalcError::syntax("unexpected token in parameter list"))]);
    }

    #[test]
    fn run_stops_at_quit_and_incomplete_input() {
        let mut context = EvaluationContext::new();
        assert_eq!(context.run("1; quit; 2;"), vec![value(1.0), Ok(Outcome::Quit)]);
        assert_eq!(context.run("1; 2 +"), vec![value(1.0), Err(CalcError::IncompleteInput)]);
    }

    #[test]
    fn contexts_are_isolated() {
        let mut first = EvaluationContext::new();
        let mut second = EvaluationContext::new();
        first.run("a = 1; def f() 1 end");
        assert_eq!(second.evaluate_str("a;"), Err(CalcError::UnboundVariableError("a".to_owned())));
        assert!(second.functions().get("f").is_none());
        assert!(first.functions().get("f").is_some());
    }
}
