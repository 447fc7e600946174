#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Names are drawn from a small pool so that statements refer to each other
#[derive(Arbitrary, Debug, Clone, Copy)]
enum CalcName {
    A, B, C, F, G,
}

impl fmt::Display for CalcName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            CalcName::A => "a",
            CalcName::B => "b",
            CalcName::C => "c",
            CalcName::F => "f",
            CalcName::G => "g",
        })
    }
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum CalcOperator {
    Add, Sub, Mul, Div,
    Eq, Ne, Lt, Gt, Le, Ge,
    And, Or,
}

impl fmt::Display for CalcOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            CalcOperator::Add => "+",
            CalcOperator::Sub => "-",
            CalcOperator::Mul => "*",
            CalcOperator::Div => "/",
            CalcOperator::Eq => "==",
            CalcOperator::Ne => "!=",
            CalcOperator::Lt => "<",
            CalcOperator::Gt => ">",
            CalcOperator::Le => "<=",
            CalcOperator::Ge => ">=",
            CalcOperator::And => "and",
            CalcOperator::Or => "or",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum CalcExpr {
    Number(f64),
    Variable(CalcName),
    Negate(Box<CalcExpr>),
    Not(Box<CalcExpr>),
    Binary(CalcOperator, Box<CalcExpr>, Box<CalcExpr>),
    Assign(CalcName, Box<CalcExpr>),
    If(Box<CalcExpr>, Box<CalcExpr>, Option<Box<CalcExpr>>),
    Begin(Vec<CalcExpr>),
    Let(Vec<(CalcName, CalcExpr)>, Vec<CalcExpr>),
    Call(CalcName, Vec<CalcExpr>),
    Sqrt(Box<CalcExpr>),
    Pow(Box<CalcExpr>, Box<CalcExpr>),
}

fn join(values: &[CalcExpr]) -> String {
    values.iter()
        .map(CalcExpr::to_string)
        .join(", ")
}

impl fmt::Display for CalcExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcExpr::Number(value) => write!(f, "{}", value.abs()),
            CalcExpr::Variable(name) => write!(f, "{}", name),
            CalcExpr::Negate(operand) => write!(f, "-({})", operand),
            CalcExpr::Not(operand) => write!(f, "not ({})", operand),
            CalcExpr::Binary(operator, left, right) => write!(f, "({}) {} ({})", left, operator, right),
            CalcExpr::Assign(name, value) => write!(f, "{} = ({})", name, value),
            CalcExpr::If(test, then, Some(otherwise)) => write!(f, "if {} then {} else {} end", test, then, otherwise),
            CalcExpr::If(test, then, None) => write!(f, "if {} then {} end", test, then),
            CalcExpr::Begin(body) => write!(f, "begin {} end", join(body)),
            CalcExpr::Let(bindings, body) => write!(
                f,
                "let {} in {} end",
                bindings.iter().map(|(name, value)| format!("{} = {}", name, value)).join(", "),
                join(body)
            ),
            CalcExpr::Call(name, arguments) => write!(f, "{}({})", name, join(arguments)),
            CalcExpr::Sqrt(operand) => write!(f, "sqrt({})", operand),
            CalcExpr::Pow(base, exponent) => write!(f, "pow({}, {})", base, exponent),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum CalcStatement {
    // Bodies are kept free of calls, a recursion that branches would run for
    // exponential time before reaching the depth limit
    Define(CalcName, Vec<CalcName>, CalcExpr),
    Expression(CalcExpr),
}

impl fmt::Display for CalcStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcStatement::Define(name, parameters, body)
                => write!(f, "def {}({}) {} end", name, parameters.iter().join(", "), body),
            CalcStatement::Expression(expression) => write!(f, "{};", expression),
        }
    }
}

fn has_call(expression: &CalcExpr) -> bool {
    match expression {
        CalcExpr::Number(_) | CalcExpr::Variable(_) => false,
        CalcExpr::Call(..) => true,
        CalcExpr::Negate(operand) | CalcExpr::Not(operand) | CalcExpr::Sqrt(operand) => has_call(operand),
        CalcExpr::Assign(_, value) => has_call(value),
        CalcExpr::Binary(_, left, right) | CalcExpr::Pow(left, right) => has_call(left) || has_call(right),
        CalcExpr::If(test, then, otherwise) => has_call(test) || has_call(then) || otherwise.as_deref().is_some_and(has_call),
        CalcExpr::Begin(body) => body.iter().any(has_call),
        CalcExpr::Let(bindings, body) => bindings.iter().any(|(_, value)| has_call(value)) || body.iter().any(has_call),
    }
}

fuzz_target!(|statements: Vec<CalcStatement>| {
    {
        // Loops are left out of the generator, a true test would never end
        let mut context = calc::EvaluationContext::new();

        for statement in statements {
            if let CalcStatement::Define(_, _, body) = &statement {
                if has_call(body) { continue; }
            }
            let _ = context.run(&statement.to_string());
        }
    }
});
