use core::fmt;

use itertools::Itertools;

use crate::{error::CalcError, interpreter::{FunctionTable, Value}, lexer::{Token, TokenStream}};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

// Expressions are the basic building blocks of every statement. They are
// never mutated once built
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Unary(UnaryOperator, Box<Expr>),
    Binary(BinaryOperator, Box<Expr>, Box<Expr>),
    Logical(LogicalOperator, Box<Expr>, Box<Expr>),
    Assign(String, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Sequence(Vec<Expr>),
    Loop(Box<Expr>, Box<Expr>),
    Let(Vec<(String, Expr)>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Definition(Definition),
    Expression(Expr),
    Quit,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "not ",
        })
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
        })
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

/// Prints the expression back as source, fully parenthesized
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{}", value),
            Self::Variable(name) => f.write_str(name),
            Self::Unary(operator, operand) => write!(f, "({}{})", operator, operand),
            Self::Binary(operator, left, right) => write!(f, "({} {} {})", left, operator, right),
            Self::Logical(operator, left, right) => write!(f, "({} {} {})", left, operator, right),
            Self::Assign(name, value) => write!(f, "({} = {})", name, value),
            Self::Conditional(test, then, otherwise) => write!(f, "if {} then {} else {} end", test, then, otherwise),
            Self::Sequence(body) => write!(f, "begin {} end", body.iter().join(", ")),
            Self::Loop(test, body) => write!(f, "while {} do {} end", test, body),
            Self::Let(bindings, body) => write!(
                f,
                "let {} in {} end",
                bindings.iter().map(|(name, value)| format!("{} = {}", name, value)).join(", "),
                body
            ),
            Self::Call(name, arguments) => write!(f, "{}({})", name, arguments.iter().join(", ")),
        }
    }
}

type ParseResult<O> = Result<O, CalcError>;

/// How deeply factors and operator chains may nest within one statement
pub const MAX_NESTING: usize = 256;

/// Recursive descent parser over a token stream.
///
/// Calls are resolved against the function table while parsing, so the
/// argument count of every call is checked before anything is evaluated.
pub struct Parser<'s, 'f> {
    stream: &'s mut TokenStream,
    functions: &'f FunctionTable,
    // Name and arity of the definition currently being parsed, so that its
    // body may call itself
    defining: Option<(String, usize)>,
    depth: usize,
}

impl<'s, 'f> Parser<'s, 'f> {
    pub fn new(stream: &'s mut TokenStream, functions: &'f FunctionTable) -> Self {
        Self { stream, functions, defining: None, depth: 0 }
    }

    fn peek(&self) -> ParseResult<Option<Token>> {
        self.stream.peek()
    }

    fn advance(&mut self) {
        self.stream.advance()
    }

    /// Consumes `expected`, failing with `message` on any other token
    fn expect(&mut self, expected: Token, message: &str) -> ParseResult<()> {
        match self.peek()? {
            Some(token) if token == expected => {
                self.advance();
                Ok(())
            }
            Some(_) => Err(CalcError::syntax(message)),
            None => Err(CalcError::IncompleteInput),
        }
    }

    /// Enters one more level of nesting
    fn nest(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(CalcError::syntax("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn arity_of(&self, name: &str) -> Option<usize> {
        match &self.defining {
            Some((defining, arity)) if defining == name => Some(*arity),
            _ => self.functions.get(name).map(|function| function.arity()),
        }
    }

    /// statement = definition | "quit" [";"] | expression ";"
    pub fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek()? {
            Some(Token::Def) => {
                self.advance();
                self.definition().map(Statement::Definition)
            }
            Some(Token::Identifier(name)) if name == "quit"
                && matches!(self.stream.peek_next()?, None | Some(Token::Semicolon)) =>
            {
                self.advance();
                if self.peek()? == Some(Token::Semicolon) {
                    self.advance();
                }
                Ok(Statement::Quit)
            }
            _ => {
                let expression = self.expression()?;
                self.expect(Token::Semicolon, "invalid expression")?;
                Ok(Statement::Expression(expression))
            }
        }
    }

    /// definition = "def" identifier "(" parameters ")" expression "end" [";"]
    fn definition(&mut self) -> ParseResult<Definition> {
        let name = match self.peek()? {
            Some(Token::Identifier(name)) => name,
            Some(_) => return Err(CalcError::syntax("invalid define form")),
            None => return Err(CalcError::IncompleteInput),
        };
        self.advance();

        let parameters = self.parameters()?;
        self.defining = Some((name.clone(), parameters.len()));
        let body = self.expression();
        self.defining = None;
        let body = body?;

        self.expect(Token::End, "'end' expected")?;
        if self.peek()? == Some(Token::Semicolon) {
            self.advance();
        }

        Ok(Definition { name, parameters, body })
    }

    fn parameters(&mut self) -> ParseResult<Vec<String>> {
        self.expect(Token::LeftParen, "'(' expected")?;
        let mut parameters = Vec::new();
        if self.peek()? == Some(Token::RightParen) {
            self.advance();
            return Ok(parameters);
        }

        loop {
            match self.peek()? {
                Some(Token::Identifier(name)) => parameters.push(name),
                Some(_) => return Err(CalcError::syntax("unexpected token in parameter list")),
                None => return Err(CalcError::IncompleteInput),
            }
            self.advance();

            match self.peek()? {
                Some(Token::RightParen) => {
                    self.advance();
                    return Ok(parameters);
                }
                Some(Token::Comma) => self.advance(),
                Some(_) => return Err(CalcError::syntax("unexpected token in parameter list")),
                None => return Err(CalcError::IncompleteInput),
            }
        }
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LeftParen, "'(' expected")?;
        let mut arguments = Vec::new();
        if self.peek()? == Some(Token::RightParen) {
            self.advance();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.expression()?);
            match self.peek()? {
                Some(Token::RightParen) => {
                    self.advance();
                    return Ok(arguments);
                }
                Some(Token::Comma) => self.advance(),
                Some(_) => return Err(CalcError::syntax("unexpected token in argument list")),
                None => return Err(CalcError::IncompleteInput),
            }
        }
    }

    /// expression = logical ["=" expression]
    pub fn expression(&mut self) -> ParseResult<Expr> {
        let expression = self.logical()?;
        if self.peek()? != Some(Token::Assign) {
            return Ok(expression);
        }

        match expression {
            Expr::Variable(name) => {
                self.advance();
                self.nest()?;
                let value = self.expression()?;
                self.depth -= 1;
                Ok(Expr::Assign(name, Box::new(value)))
            }
            _ => Err(CalcError::syntax("invalid assign form")),
        }
    }

    /// logical = comparison {("and" | "or") comparison}
    fn logical(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expression = self.comparison()?;
        loop {
            let operator = match self.peek()? {
                Some(Token::And) => LogicalOperator::And,
                Some(Token::Or) => LogicalOperator::Or,
                _ => break,
            };
            self.advance();
            // Every operator deepens the left-leaning tree
            self.nest()?;
            expression = Expr::Logical(operator, Box::new(expression), Box::new(self.comparison()?));
        }
        self.depth = depth;
        Ok(expression)
    }

    /// comparison = arithmetic [comparator arithmetic]
    fn comparison(&mut self) -> ParseResult<Expr> {
        let left = self.arithmetic()?;
        let operator = match self.peek()? {
            Some(Token::Equal) => BinaryOperator::Equal,
            Some(Token::NotEqual) => BinaryOperator::NotEqual,
            Some(Token::Less) => BinaryOperator::Less,
            Some(Token::Greater) => BinaryOperator::Greater,
            Some(Token::LessEqual) => BinaryOperator::LessEqual,
            Some(Token::GreaterEqual) => BinaryOperator::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();
        Ok(Expr::Binary(operator, Box::new(left), Box::new(self.arithmetic()?)))
    }

    /// arithmetic = term {("+" | "-") term}
    fn arithmetic(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expression = self.term()?;
        loop {
            let operator = match self.peek()? {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            // Every operator deepens the left-leaning tree
            self.nest()?;
            expression = Expr::Binary(operator, Box::new(expression), Box::new(self.term()?));
        }
        self.depth = depth;
        Ok(expression)
    }

    /// term = factor {("*" | "/") factor}
    fn term(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expression = self.factor()?;
        loop {
            let operator = match self.peek()? {
                Some(Token::Star) => BinaryOperator::Mul,
                Some(Token::Slash) => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            // Every operator deepens the left-leaning tree
            self.nest()?;
            expression = Expr::Binary(operator, Box::new(expression), Box::new(self.factor()?));
        }
        self.depth = depth;
        Ok(expression)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.nest()?;
        let factor = self.primary();
        self.depth -= 1;
        factor
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = match self.peek()? {
            Some(token) => token,
            None => return Err(CalcError::IncompleteInput),
        };

        // Each accepting arm consumes its token, anything else stays in the
        // stream for error recovery
        match token {
            Token::Number(number) => {
                self.advance();
                Ok(Expr::Literal(number))
            }
            Token::Identifier(name) => {
                self.advance();
                self.reference(name)
            }
            Token::LeftParen => {
                self.advance();
                let expression = self.expression()?;
                self.expect(Token::RightParen, "')' expected")?;
                Ok(expression)
            }
            Token::Plus => self.unary(UnaryOperator::Plus),
            Token::Minus => self.unary(UnaryOperator::Minus),
            Token::Not => self.unary(UnaryOperator::Not),
            Token::If => {
                self.advance();
                self.conditional()
            }
            Token::Begin => {
                self.advance();
                self.sequence()
            }
            Token::While => {
                self.advance();
                self.repetition()
            }
            Token::Let => {
                self.advance();
                self.binding()
            }
            token => Err(CalcError::syntax(format!("unexpected token: {}", token))),
        }
    }

    /// A call when `name` is a known function, a variable otherwise
    fn reference(&mut self, name: String) -> ParseResult<Expr> {
        let Some(arity) = self.arity_of(&name) else {
            return Ok(Expr::Variable(name));
        };

        let arguments = self.arguments()?;
        if arguments.len() != arity {
            return Err(CalcError::ArityError { name, expected: arity, found: arguments.len() });
        }
        Ok(Expr::Call(name, arguments))
    }

    fn unary(&mut self, operator: UnaryOperator) -> ParseResult<Expr> {
        self.advance();
        Ok(Expr::Unary(operator, Box::new(self.factor()?)))
    }

    /// "if" expression "then" expression ["else" expression] "end"
    fn conditional(&mut self) -> ParseResult<Expr> {
        let test = self.expression()?;
        self.expect(Token::Then, "'then' expected")?;
        let then = self.expression()?;

        let otherwise = match self.peek()? {
            Some(Token::Else) => {
                self.advance();
                let otherwise = self.expression()?;
                self.expect(Token::End, "'end' expected")?;
                otherwise
            }
            Some(Token::End) => {
                self.advance();
                Expr::Literal(0.0)
            }
            Some(_) => return Err(CalcError::syntax("'else' or 'end' expected")),
            None => return Err(CalcError::IncompleteInput),
        };

        Ok(Expr::Conditional(Box::new(test), Box::new(then), Box::new(otherwise)))
    }

    /// body = expression {"," expression} "end"
    fn body(&mut self) -> ParseResult<Expr> {
        if self.peek()? == Some(Token::End) {
            return Err(CalcError::syntax("invalid begin form"));
        }

        let mut body = vec![self.expression()?];
        while self.peek()? == Some(Token::Comma) {
            self.advance();
            body.push(self.expression()?);
        }

        self.expect(Token::End, "'end' expected")?;
        Ok(Expr::Sequence(body))
    }

    /// "begin" body
    fn sequence(&mut self) -> ParseResult<Expr> {
        self.body()
    }

    /// "while" expression "do" body
    fn repetition(&mut self) -> ParseResult<Expr> {
        let test = self.expression()?;
        self.expect(Token::Do, "'do' expected")?;
        Ok(Expr::Loop(Box::new(test), Box::new(self.body()?)))
    }

    /// "let" identifier "=" expression {"," identifier "=" expression} "in" body
    fn binding(&mut self) -> ParseResult<Expr> {
        let mut bindings = Vec::new();
        loop {
            let name = match self.peek()? {
                Some(Token::Identifier(name)) if self.arity_of(&name).is_none() => name,
                Some(_) => return Err(CalcError::syntax("invalid assign form")),
                None => return Err(CalcError::IncompleteInput),
            };
            self.advance();
            self.expect(Token::Assign, "invalid assign form")?;
            bindings.push((name, self.expression()?));

            match self.peek()? {
                Some(Token::In) => {
                    self.advance();
                    break;
                }
                Some(Token::Comma) => self.advance(),
                Some(_) => return Err(CalcError::syntax("'in' expected")),
                None => return Err(CalcError::IncompleteInput),
            }
        }

        Ok(Expr::Let(bindings, Box::new(self.body()?)))
    }
}

/// Parses exactly one statement from `input`
pub fn parse(input: &str, functions: &FunctionTable) -> ParseResult<Statement> {
    let mut stream = TokenStream::new(input);
    let statement = Parser::new(&mut stream, functions).statement()?;
    if !stream.is_exhausted() { return Err(CalcError::syntax("unexpected input after statement")); }
    Ok(statement)
}
