use core::fmt;
use std::ops::Range;

use logos::Logos;

use crate::error::CalcError;

fn parse_number<'a>(lex: &mut logos::Lexer<'a, Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    #[token("def")]
    Def,
    #[token("end")]
    End,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    #[token("!")]
    Not,
    #[token("begin")]
    Begin,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("let")]
    Let,
    #[token("in")]
    In,

    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,

    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", parse_number)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", parse_number)]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Identifier(String),

    /// A `/*` with no closing `*/` before the end of the input
    #[regex(r"/\*([^*]|\*+[^*/])*\**")]
    OpenComment,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Def => "def",
            Self::End => "end",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Begin => "begin",
            Self::While => "while",
            Self::Do => "do",
            Self::Let => "let",
            Self::In => "in",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Assign => "=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Number(number) => return write!(f, "{}", number),
            Self::Identifier(name) => name,
            Self::OpenComment => "/*",
        };
        f.write_str(text)
    }
}

type Lexeme = (Result<Token, CalcError>, Range<usize>);

/// The tokens of one chunk of input with a single token of lookahead.
///
/// Characters the lexer does not recognize are kept in place as errors, so
/// everything in front of them can still be parsed and evaluated. The parser
/// only sees the error once it reaches that position.
#[derive(Debug)]
pub struct TokenStream {
    lexemes: Vec<Lexeme>,
    position: usize,
    length: usize,
}

impl TokenStream {
    pub fn new(input: &str) -> Self {
        let mut lexemes = Vec::new();
        let mut lexer = Token::lexer(input);

        while let Some(result) = lexer.next() {
            let token = match result {
                // The rest of the comment may still arrive on a later line
                Ok(Token::OpenComment) => Err(CalcError::IncompleteInput),
                Ok(token) => Ok(token),
                Err(()) => Err(CalcError::syntax(format!("unexpected character: {}", lexer.slice()))),
            };
            lexemes.push((token, lexer.span()));
        }

        Self { lexemes, position: 0, length: input.len() }
    }

    fn lookahead(&self, distance: usize) -> Result<Option<Token>, CalcError> {
        match self.lexemes.get(self.position + distance) {
            Some((Ok(token), _)) => Ok(Some(token.clone())),
            Some((Err(err), _)) => Err(err.clone()),
            None => Ok(None),
        }
    }

    /// The current token, `None` once the input is exhausted
    pub fn peek(&self) -> Result<Option<Token>, CalcError> {
        self.lookahead(0)
    }

    pub fn peek_next(&self) -> Result<Option<Token>, CalcError> {
        self.lookahead(1)
    }

    pub fn advance(&mut self) {
        if self.position < self.lexemes.len() {
            self.position += 1;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.lexemes.len()
    }

    /// Byte offset of the current token in the input
    pub fn offset(&self) -> usize {
        self.lexemes.get(self.position)
            .map(|(_, span)| span.start)
            .unwrap_or(self.length)
    }

    /// Discards everything up to and including the next `;`
    pub fn skip_statement(&mut self) {
        while let Some((token, _)) = self.lexemes.get(self.position) {
            self.position += 1;
            if matches!(token, Ok(Token::Semicolon)) {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.position = self.lexemes.len();
    }
}

#[cfg(test)]
mod tests {
    use super::Token::*;
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Token::lexer(input)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(tokens("1 + 3 ;"), vec![Number(1.0), Plus, Number(3.0), Semicolon]);
        assert_eq!(tokens("1-3*4/2"), vec![Number(1.0), Minus, Number(3.0), Star, Number(4.0), Slash, Number(2.0)]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("42 1.5 1. .25 1e3 2.5E-2"), vec![
            Number(42.0), Number(1.5), Number(1.0), Number(0.25), Number(1000.0), Number(0.025)
        ]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("def end if then else and or not begin while do let in"),
            vec![Def, End, If, Then, Else, And, Or, Not, Begin, While, Do, Let, In]
        );
        assert_eq!(tokens("define ends x_1"), vec![
            Identifier("define".to_owned()), Identifier("ends".to_owned()), Identifier("x_1".to_owned())
        ]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(tokens("= == ! != < <= > >="), vec![
            Assign, Equal, Not, NotEqual, Less, LessEqual, Greater, GreaterEqual
        ]);
        assert_eq!(tokens("a==b"), vec![Identifier("a".to_owned()), Equal, Identifier("b".to_owned())]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(tokens("1 // one\n+ /* two\n */ 2"), vec![Number(1.0), Plus, Number(2.0)]);
        assert_eq!(tokens("4 /**/ / /* ** / */ 2"), vec![Number(4.0), Slash, Number(2.0)]);
        assert_eq!(tokens("1 /* two\n* three"), vec![Number(1.0), OpenComment]);
    }

    #[test]
    fn test_open_comment_is_incomplete() {
        let mut stream = TokenStream::new("1 + /* two\n");
        stream.advance();
        stream.advance();
        assert_eq!(stream.peek(), Err(CalcError::IncompleteInput));
        assert_eq!(stream.offset(), 4);
    }

    #[test]
    fn test_stream_keeps_unknown_characters_in_place() {
        let mut stream = TokenStream::new("1 @ 2");
        assert_eq!(stream.peek(), Ok(Some(Number(1.0))));
        stream.advance();
        assert_eq!(stream.peek(), Err(CalcError::syntax("unexpected character: @")));
        stream.advance();
        assert_eq!(stream.peek(), Ok(Some(Number(2.0))));
        stream.advance();
        assert_eq!(stream.peek(), Ok(None));
        assert!(stream.is_exhausted());
    }

    #[test]
    fn test_skip_statement() {
        let mut stream = TokenStream::new("1 2 ; 3;");
        stream.advance();
        stream.skip_statement();
        assert_eq!(stream.peek(), Ok(Some(Number(3.0))));
        assert_eq!(stream.offset(), 6);
        stream.skip_statement();
        assert!(stream.is_exhausted());
        assert_eq!(stream.offset(), 8);
    }
}
