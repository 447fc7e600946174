use core::fmt;
use std::{cell::RefCell, collections::HashMap};

use itertools::Itertools;

use crate::{error::{CalcError, DefinitionErrorKind}, parser::{BinaryOperator, Definition, Expr, LogicalOperator, UnaryOperator}};

pub(crate) type EvaluationResult = Result<Value, CalcError>;

/// The only runtime type. Zero is false, anything else is true
pub type Value = f64;

pub fn is_true(value: Value) -> bool {
    value != 0.0
}

pub fn bool_to_value(value: bool) -> Value {
    if value { 1.0 } else { 0.0 }
}

/// One scope level of local bindings, created by a `let` or a function call
/// and dropped when that evaluation returns.
///
/// Frames live on the Rust stack and borrow their parent, so the chain can
/// never outlive the evaluation that built it. The global table is not part
/// of the chain.
#[derive(Debug)]
pub(crate) struct Frame<'p> {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<&'p Frame<'p>>,
}

impl<'p> Frame<'p> {
    pub(crate) fn new(parent: Option<&'p Frame<'p>>) -> Self {
        Self { bindings: RefCell::new(HashMap::new()), parent }
    }

    fn insert(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_owned(), value);
    }

    fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(*value)
        }
        self.parent.and_then(|parent| parent.get(name))
    }

    /// Updates the nearest binding of `name`, returns false if there is none
    fn update(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
            *slot = value;
            return true
        }
        match self.parent {
            Some(parent) => parent.update(name, value),
            None => false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    pub parameters: Vec<String>,
    pub body: Expr,
}

#[derive(Clone)]
pub enum Function {
    Native1(fn(f64) -> f64),
    Native2(fn(f64, f64) -> f64),
    User(UserFunction),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native1(_) => write!(f, "BUILTIN(x)"),
            Self::Native2(_) => write!(f, "BUILTIN(x, y)"),
            Self::User(function) => write!(f, "User(({}) {})", function.parameters.iter().join(", "), function.body),
        }
    }
}

impl Function {
    pub fn arity(&self) -> usize {
        match self {
            Self::Native1(_) => 1,
            Self::Native2(_) => 2,
            Self::User(function) => function.parameters.len(),
        }
    }
}

/// Functions by name. Natives and user functions share the table with
/// nothing else, variables live in the global table.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable(HashMap<String, Function>);

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.0.get(name)
    }

    pub(crate) fn insert_native(&mut self, name: &str, function: Function) {
        self.0.insert(name.to_owned(), function);
    }

    /// Creates a user function, or replaces the parameters and body of an
    /// existing one in place. The slot keeps its arity for its whole lifetime,
    /// so every call parsed against it stays valid.
    pub fn define(&mut self, definition: Definition) -> Result<(), CalcError> {
        let Definition { name, parameters, body } = definition;

        match self.0.get_mut(&name) {
            Some(Function::User(function)) => {
                if function.parameters.len() != parameters.len() {
                    return Err(CalcError::DefinitionError {
                        kind: DefinitionErrorKind::ArityChanged { expected: function.parameters.len(), found: parameters.len() },
                        name,
                    });
                }
                function.parameters = parameters;
                function.body = body;
            }
            Some(_) => return Err(CalcError::DefinitionError { name, kind: DefinitionErrorKind::Builtin }),
            None => {
                self.0.insert(name, Function::User(UserFunction { parameters, body }));
            }
        }

        Ok(())
    }
}

/// How deeply one statement's evaluation may nest, counting every node
/// entered, including those of called function bodies
pub const MAX_EVALUATION_DEPTH: usize = 1000;

/// The process-wide state an evaluation reads and writes
pub(crate) struct Runtime<'c> {
    globals: &'c mut HashMap<String, Value>,
    functions: &'c FunctionTable,
    depth: usize,
}

impl<'c> Runtime<'c> {
    pub(crate) fn new(globals: &'c mut HashMap<String, Value>, functions: &'c FunctionTable) -> Self {
        Self { globals, functions, depth: 0 }
    }
}

fn evaluate_variable(name: &str, frame: Option<&Frame>, runtime: &Runtime) -> EvaluationResult {
    // Locals first, nearest frame first, then the global table
    if let Some(value) = frame.and_then(|frame| frame.get(name)) {
        return Ok(value)
    }
    runtime.globals.get(name)
        .copied()
        .ok_or_else(|| CalcError::UnboundVariableError(name.to_owned()))
}

fn evaluate_unary(operator: UnaryOperator, operand: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    let value = evaluate(operand, frame, runtime)?;
    Ok(match operator {
        UnaryOperator::Plus => value,
        UnaryOperator::Minus => -value,
        UnaryOperator::Not => bool_to_value(!is_true(value)),
    })
}

fn evaluate_binary(operator: BinaryOperator, left: &Expr, right: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    let x = evaluate(left, frame, runtime)?;
    let y = evaluate(right, frame, runtime)?;

    // Plain IEEE-754, division by zero gives an infinity or NaN
    Ok(match operator {
        BinaryOperator::Add => x + y,
        BinaryOperator::Sub => x - y,
        BinaryOperator::Mul => x * y,
        BinaryOperator::Div => x / y,
        BinaryOperator::Equal => bool_to_value(x == y),
        BinaryOperator::NotEqual => bool_to_value(x != y),
        BinaryOperator::Less => bool_to_value(x < y),
        BinaryOperator::Greater => bool_to_value(x > y),
        BinaryOperator::LessEqual => bool_to_value(x <= y),
        BinaryOperator::GreaterEqual => bool_to_value(x >= y),
    })
}

fn evaluate_logical(operator: LogicalOperator, left: &Expr, right: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    // The right operand is only evaluated when the left one does not decide
    // the result, and the deciding value is returned as is
    let x = evaluate(left, frame, runtime)?;
    match (operator, is_true(x)) {
        (LogicalOperator::And, false) | (LogicalOperator::Or, true) => Ok(x),
        _ => evaluate(right, frame, runtime),
    }
}

fn evaluate_assign(name: &str, value: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    let value = evaluate(value, frame, runtime)?;
    if !frame.is_some_and(|frame| frame.update(name, value)) {
        runtime.globals.insert(name.to_owned(), value);
    }
    Ok(value)
}

fn evaluate_conditional(test: &Expr, then: &Expr, otherwise: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    if is_true(evaluate(test, frame, runtime)?) {
        evaluate(then, frame, runtime)
    } else {
        evaluate(otherwise, frame, runtime)
    }
}

fn evaluate_sequence(body: &[Expr], frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    let mut result = 0.0;
    for expression in body {
        result = evaluate(expression, frame, runtime)?;
    }
    Ok(result)
}

fn evaluate_loop(test: &Expr, body: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    while is_true(evaluate(test, frame, runtime)?) {
        evaluate(body, frame, runtime)?;
    }
    Ok(0.0)
}

fn evaluate_let(bindings: &[(String, Expr)], body: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    // Initializers run left to right inside the new frame, so each one sees
    // the bindings made before it
    let scope = Frame::new(frame);
    for (name, initializer) in bindings {
        let value = evaluate(initializer, Some(&scope), runtime)?;
        scope.insert(name, value);
    }

    evaluate(body, Some(&scope), runtime)
}

fn evaluate_list(list: &[Expr], frame: Option<&Frame>, runtime: &mut Runtime) -> Result<Vec<Value>, CalcError> {
    let mut values = Vec::with_capacity(list.len());
    for expression in list {
        values.push(evaluate(expression, frame, runtime)?);
    }
    Ok(values)
}

fn evaluate_call(name: &str, arguments: &[Expr], frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    let functions = runtime.functions;
    let function = functions.get(name)
        .ok_or_else(|| CalcError::UndefinedFunction(name.to_owned()))?;

    // Arguments are evaluated in the caller's environment
    let values = evaluate_list(arguments, frame, runtime)?;
    if values.len() != function.arity() {
        return Err(CalcError::ArityError { name: name.to_owned(), expected: function.arity(), found: values.len() })
    }

    match function {
        Function::Native1(function) => Ok(function(values[0])),
        Function::Native2(function) => Ok(function(values[0], values[1])),
        Function::User(function) => {
            // The body only sees its parameters and the globals, never the
            // caller's locals
            let scope = Frame::new(None);
            for (parameter, value) in function.parameters.iter().zip(values) {
                scope.insert(parameter, value);
            }
            evaluate(&function.body, Some(&scope), runtime)
        }
    }
}

pub(crate) fn evaluate(expression: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    if runtime.depth >= MAX_EVALUATION_DEPTH {
        return Err(CalcError::RecursionLimit(MAX_EVALUATION_DEPTH));
    }

    runtime.depth += 1;
    let result = evaluate_node(expression, frame, runtime);
    runtime.depth -= 1;
    result
}

fn evaluate_node(expression: &Expr, frame: Option<&Frame>, runtime: &mut Runtime) -> EvaluationResult {
    match expression {
        Expr::Literal(value) => Ok(*value),
        Expr::Variable(name) => evaluate_variable(name, frame, runtime),
        Expr::Unary(operator, operand) => evaluate_unary(*operator, operand, frame, runtime),
        Expr::Binary(operator, left, right) => evaluate_binary(*operator, left, right, frame, runtime),
        Expr::Logical(operator, left, right) => evaluate_logical(*operator, left, right, frame, runtime),
        Expr::Assign(name, value) => evaluate_assign(name, value, frame, runtime),
        Expr::Conditional(test, then, otherwise) => evaluate_conditional(test, then, otherwise, frame, runtime),
        Expr::Sequence(body) => evaluate_sequence(body, frame, runtime),
        Expr::Loop(test, body) => evaluate_loop(test, body, frame, runtime),
        Expr::Let(bindings, body) => evaluate_let(bindings, body, frame, runtime),
        Expr::Call(name, arguments) => evaluate_call(name, arguments, frame, runtime),
    }
}
