use crate::language::token::{KeywordTable, Token, TokenKind};

const TAB_WIDTH: usize = 4;

/// Pull-based tokenizer. Each call to [`Lexer::next_token`] yields one token;
/// once the input is exhausted every further call yields `EOF`.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    read_position: usize,
    current: Option<char>,
    line: usize,
    column: usize,
    keywords: KeywordTable,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::with_keywords(source, KeywordTable::standard())
    }

    pub fn with_keywords(source: &str, keywords: KeywordTable) -> Self {
        let input: Vec<char> = source.chars().collect();
        let current = input.first().copied();
        Self {
            input,
            position: 0,
            read_position: 1,
            current,
            line: 1,
            column: 1,
            keywords,
        }
    }

    pub fn keywords(&self) -> KeywordTable {
        self.keywords
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let (line, column) = (self.line, self.column);

        let Some(ch) = self.current else {
            return Token::new(TokenKind::Eof, "", line, column);
        };

        match ch {
            '=' => self.one_or_two(TokenKind::Assign, TokenKind::Eq, line, column),
            '!' => self.one_or_two(TokenKind::Bang, TokenKind::NotEq, line, column),
            '<' => self.one_or_two(TokenKind::Lt, TokenKind::LtEq, line, column),
            '>' => self.one_or_two(TokenKind::Gt, TokenKind::GtEq, line, column),
            '+' => self.one_or_two(TokenKind::Plus, TokenKind::PlusEq, line, column),
            '-' => self.one_or_two(TokenKind::Minus, TokenKind::MinusEq, line, column),
            '*' => self.one_or_two(TokenKind::Asterisk, TokenKind::AsteriskEq, line, column),
            '/' => self.one_or_two(TokenKind::Slash, TokenKind::SlashEq, line, column),
            ',' => self.single(TokenKind::Comma, line, column),
            ';' => self.single(TokenKind::Semicolon, line, column),
            ':' => self.single(TokenKind::Colon, line, column),
            '(' => self.single(TokenKind::LParen, line, column),
            ')' => self.single(TokenKind::RParen, line, column),
            '{' => self.single(TokenKind::LBrace, line, column),
            '}' => self.single(TokenKind::RBrace, line, column),
            '[' => self.single(TokenKind::LBracket, line, column),
            ']' => self.single(TokenKind::RBracket, line, column),
            '.' if self.peek().is_some_and(|next| next.is_ascii_digit()) => {
                self.lex_number(line, column)
            }
            '.' => self.single(TokenKind::Dot, line, column),
            '"' | '\'' => self.lex_string(ch, line, column),
            ch if is_letter(ch) => self.lex_identifier(line, column),
            ch if ch.is_ascii_digit() => self.lex_number(line, column),
            other => {
                self.bump();
                Token::new(TokenKind::Illegal, other.to_string(), line, column)
            }
        }
    }

    fn bump(&mut self) {
        match self.current {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some('\t') => self.column += TAB_WIDTH,
            Some(_) => self.column += 1,
            None => return,
        }
        self.position = self.read_position;
        self.current = self.input.get(self.position).copied();
        self.read_position += 1;
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.read_position).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.current.is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn single(&mut self, kind: TokenKind, line: usize, column: usize) -> Token {
        let literal = self.slice_from(self.position, self.position + 1);
        self.bump();
        Token::new(kind, literal, line, column)
    }

    fn one_or_two(
        &mut self,
        single: TokenKind,
        with_eq: TokenKind,
        line: usize,
        column: usize,
    ) -> Token {
        if self.peek() == Some('=') {
            let start = self.position;
            self.bump();
            self.bump();
            Token::new(with_eq, self.slice_from(start, start + 2), line, column)
        } else {
            self.single(single, line, column)
        }
    }

    fn lex_identifier(&mut self, line: usize, column: usize) -> Token {
        let start = self.position;
        while self
            .current
            .is_some_and(|ch| is_letter(ch) || ch.is_ascii_digit())
        {
            self.bump();
        }
        let literal = self.slice_from(start, self.position);
        let kind = self.keywords.lookup(&literal);
        Token::new(kind, literal, line, column)
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Token {
        let start = self.position;
        let mut seen_dot = false;
        while let Some(ch) = self.current {
            if ch.is_ascii_digit() {
                self.bump();
            } else if ch == '.' && !seen_dot && self.peek().is_some_and(|n| n.is_ascii_digit()) {
                seen_dot = true;
                self.bump();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number, self.slice_from(start, self.position), line, column)
    }

    fn lex_string(&mut self, quote: char, line: usize, column: usize) -> Token {
        self.bump();
        let start = self.position;
        while let Some(ch) = self.current {
            if ch == quote {
                let literal = self.slice_from(start, self.position);
                self.bump();
                return Token::new(TokenKind::String, literal, line, column);
            }
            self.bump();
        }
        let mut literal = quote.to_string();
        literal.push_str(&self.slice_from(start, self.position));
        Token::new(TokenKind::Illegal, literal, line, column)
    }

    fn slice_from(&self, start: usize, end: usize) -> String {
        let end = end.min(self.input.len());
        self.input[start.min(end)..end].iter().collect()
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || "áéíóúüÁÉÍÓÚÜñÑ".contains(ch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push((token.kind, token.literal));
        }
        out
    }

    #[test]
    fn operators_use_one_character_lookahead() {
        let tokens = kinds("= == ! != < <= > >= + += - -= * *= / /=");
        let expected = [
            TokenKind::Assign,
            TokenKind::Eq,
            TokenKind::Bang,
            TokenKind::NotEq,
            TokenKind::Lt,
            TokenKind::LtEq,
            TokenKind::Gt,
            TokenKind::GtEq,
            TokenKind::Plus,
            TokenKind::PlusEq,
            TokenKind::Minus,
            TokenKind::MinusEq,
            TokenKind::Asterisk,
            TokenKind::AsteriskEq,
            TokenKind::Slash,
            TokenKind::SlashEq,
        ];
        let actual: Vec<TokenKind> = tokens.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(actual, expected);
        assert_eq!(tokens[3].1, "!=");
    }

    #[test]
    fn keywords_and_accented_identifiers() {
        let tokens = kinds("variable año = procedimiento(x) { regresa x; };");
        assert_eq!(tokens[0], (TokenKind::Let, "variable".to_string()));
        assert_eq!(tokens[1], (TokenKind::Ident, "año".to_string()));
        assert_eq!(tokens[3], (TokenKind::Function, "procedimiento".to_string()));
        assert_eq!(tokens[8], (TokenKind::Return, "regresa".to_string()));
    }

    #[test]
    fn numbers_allow_one_decimal_point() {
        let tokens = kinds("10 3.5 .8 1.2.3");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Number, "10".to_string()),
                (TokenKind::Number, "3.5".to_string()),
                (TokenKind::Number, ".8".to_string()),
                (TokenKind::Number, "1.2".to_string()),
                (TokenKind::Number, ".3".to_string()),
            ]
        );
    }

    #[test]
    fn strings_are_read_verbatim() {
        let tokens = kinds(r#""hola mundo" 'dice "si"' "a\n""#);
        assert_eq!(tokens[0], (TokenKind::String, "hola mundo".to_string()));
        assert_eq!(tokens[1], (TokenKind::String, "dice \"si\"".to_string()));
        assert_eq!(tokens[2], (TokenKind::String, "a\\n".to_string()));
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let tokens = kinds("\"sin cierre");
        assert_eq!(tokens, vec![(TokenKind::Illegal, "\"sin cierre".to_string())]);
    }

    #[test]
    fn unknown_characters_are_illegal() {
        let tokens = kinds("@ #");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Illegal, "@".to_string()),
                (TokenKind::Illegal, "#".to_string()),
            ]
        );
    }

    #[test]
    fn positions_track_lines_and_tabs() {
        let mut lexer = Lexer::new("variable a = 1;\n\tb;\n  c");
        let mut positions = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            positions.push((token.literal, token.line, token.column));
        }
        assert_eq!(positions[0], ("variable".to_string(), 1, 1));
        assert_eq!(positions[1], ("a".to_string(), 1, 10));
        assert_eq!(positions[4], (";".to_string(), 1, 15));
        assert_eq!(positions[5], ("b".to_string(), 2, 5));
        assert_eq!(positions[6], (";".to_string(), 2, 6));
        assert_eq!(positions[7], ("c".to_string(), 3, 3));
    }

    #[test]
    fn eof_repeats_forever() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
        for _ in 0..3 {
            assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        }
    }
}
