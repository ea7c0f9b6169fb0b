use crate::language::span::{Position, Positioned};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            literal: literal.into(),
            line,
            column,
        }
    }
}

impl Positioned for Token {
    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type: {}, Literal: {}", self.kind, self.literal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Illegal,
    Eof,

    Ident,
    Number,
    String,

    Assign,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Bang,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    PlusEq,
    MinusEq,
    AsteriskEq,
    SlashEq,

    Comma,
    Semicolon,
    Colon,
    Dot,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Let,
    Function,
    Return,
    If,
    ElseIf,
    Else,
    While,
    Do,
    For,
    Domain,
    True,
    False,
    And,
    Or,
    Not,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Ident => "IDENT",
            TokenKind::Number => "NUM",
            TokenKind::String => "STRING",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Asterisk => "ASTERISK",
            TokenKind::Slash => "SLASH",
            TokenKind::Bang => "BANG",
            TokenKind::Lt => "LT",
            TokenKind::Gt => "GT",
            TokenKind::LtEq => "LT_EQ",
            TokenKind::GtEq => "GT_EQ",
            TokenKind::Eq => "EQ",
            TokenKind::NotEq => "NEQ",
            TokenKind::PlusEq => "PLUS_EQ",
            TokenKind::MinusEq => "MINUS_EQ",
            TokenKind::AsteriskEq => "ASTERISK_EQ",
            TokenKind::SlashEq => "SLASH_EQ",
            TokenKind::Comma => "COMMA",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Colon => "COLON",
            TokenKind::Dot => "DOT",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::Let => "LET",
            TokenKind::Function => "FUNCTION",
            TokenKind::Return => "RETURN",
            TokenKind::If => "IF",
            TokenKind::ElseIf => "ELSEIF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Do => "DO",
            TokenKind::For => "FOR",
            TokenKind::Domain => "DOMAIN",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
        }
    }

    /// Operators accepted at the head of an assignment statement.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::AsteriskEq
                | TokenKind::SlashEq
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("variable", TokenKind::Let),
    ("procedimiento", TokenKind::Function),
    ("regresa", TokenKind::Return),
    ("si", TokenKind::If),
    ("o_si", TokenKind::ElseIf),
    ("si_no", TokenKind::Else),
    ("mientras", TokenKind::While),
    ("hacer", TokenKind::Do),
    ("para", TokenKind::For),
    ("dominio", TokenKind::Domain),
    ("verdadero", TokenKind::True),
    ("falso", TokenKind::False),
    ("y", TokenKind::And),
    ("o", TokenKind::Or),
    ("no", TokenKind::Not),
];

/// Reserved words of the language.
///
/// The table is immutable and shared by the lexer (identifier resolution),
/// the parser (declaration checks) and the interpreter (identifier checks).
#[derive(Clone, Copy, Debug)]
pub struct KeywordTable {
    entries: &'static [(&'static str, TokenKind)],
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl KeywordTable {
    pub const fn standard() -> Self {
        Self { entries: KEYWORDS }
    }

    pub fn lookup(&self, word: &str) -> TokenKind {
        self.entries
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, kind)| *kind)
            .unwrap_or(TokenKind::Ident)
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.entries.iter().any(|(keyword, _)| *keyword == word)
    }
}
