use crate::interpreter::{Function, FunctionTable};

// Native functions keep the standard library's floating point semantics,
// a domain error gives NaN or an infinity rather than an error
const UNARY: [(&str, fn(f64) -> f64); 15] = [
    ("sqrt", f64::sqrt),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("sinh", f64::sinh),
    ("cosh", f64::cosh),
    ("tanh", f64::tanh),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
    ("exp", f64::exp),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("log2", f64::log2),
    ("abs", f64::abs),
];

const BINARY: [(&str, fn(f64, f64) -> f64); 2] = [
    ("atan2", f64::atan2),
    ("pow", f64::powf),
];

pub(crate) fn builtin_table() -> FunctionTable {
    let mut table = FunctionTable::new();
    for (name, function) in UNARY {
        table.insert_native(name, Function::Native1(function));
    }
    for (name, function) in BINARY {
        table.insert_native(name, Function::Native2(function));
    }
    table
}
