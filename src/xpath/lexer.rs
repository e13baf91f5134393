//! XPath Lexer
//!
//! Tokenizes path expressions. Operator names (`and`, `or`, `div`, `mod`)
//! are only recognized where an operator can appear, so an element named
//! `mod` still lexes as a name test.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DoubleDot,
    At,
    Pipe,
    Plus,
    Minus,
    Star,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Mod,
    Div,

    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    Number(f64),
    Literal(String),

    /// NCName or function name
    Name(String),
    /// `prefix:local` or `prefix:*`
    QName(String),
    /// node(), text(), comment(), processing-instruction()
    NodeType(String),
    /// Axis name, consumed together with the following `::`
    Axis(String),

    Comma,
}

impl Token {
    /// Whether an operator may follow this token (XPath 1.0 §3.7)
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::Literal(_)
                | Token::Name(_)
                | Token::QName(_)
                | Token::Star
                | Token::Dot
                | Token::DoubleDot
                | Token::RightParen
                | Token::RightBracket
        )
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    prev_ends_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            prev_ends_operand: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !is_xml_space(c) {
                break;
            }
            self.advance(c.len_utf8());
        }
    }

    /// Next token, `Ok(None)` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, String> {
        let token = self.scan()?;
        if let Some(t) = &token {
            self.prev_ends_operand = t.ends_operand();
        }
        Ok(token)
    }

    fn scan(&mut self) -> Result<Option<Token>, String> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let single = |lexer: &mut Self, token: Token| -> Result<Option<Token>, String> {
            lexer.advance(1);
            Ok(Some(token))
        };

        match c {
            '/' => {
                if self.peek_at(1) == Some('/') {
                    self.advance(2);
                    Ok(Some(Token::DoubleSlash))
                } else {
                    single(self, Token::Slash)
                }
            }
            '.' => match self.peek_at(1) {
                Some('.') => {
                    self.advance(2);
                    Ok(Some(Token::DoubleDot))
                }
                Some(d) if d.is_ascii_digit() => Ok(Some(self.read_number())),
                _ => single(self, Token::Dot),
            },
            '@' => single(self, Token::At),
            '|' => single(self, Token::Pipe),
            '+' => single(self, Token::Plus),
            '-' => single(self, Token::Minus),
            '*' => single(self, Token::Star),
            '=' => single(self, Token::Eq),
            '(' => single(self, Token::LeftParen),
            ')' => single(self, Token::RightParen),
            '[' => single(self, Token::LeftBracket),
            ']' => single(self, Token::RightBracket),
            ',' => single(self, Token::Comma),
            '!' if self.peek_at(1) == Some('=') => {
                self.advance(2);
                Ok(Some(Token::NotEq))
            }
            '<' | '>' => {
                let with_eq = self.peek_at(1) == Some('=');
                self.advance(if with_eq { 2 } else { 1 });
                Ok(Some(match (c, with_eq) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::LtEq,
                    ('>', false) => Token::Gt,
                    _ => Token::GtEq,
                }))
            }
            '"' | '\'' => self.read_literal(c).map(Some),
            '0'..='9' => Ok(Some(self.read_number())),
            '$' => Err("Variable references are not supported".to_string()),
            _ if is_name_start_char(c) => Ok(Some(self.read_name())),
            _ => Err(format!("Unexpected character '{}' at offset {}", c, self.pos)),
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance(1);
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.advance(1);
            } else {
                break;
            }
        }
        Token::Number(self.input[start..self.pos].parse().unwrap_or(f64::NAN))
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, String> {
        let start = self.pos;
        self.advance(1);
        let Some(len) = self.remaining().find(quote) else {
            return Err(format!("Unterminated string literal at offset {}", start));
        };
        let value = self.remaining()[..len].to_string();
        self.advance(len + 1);
        Ok(Token::Literal(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_name_char(c) {
                break;
            }
            self.advance(c.len_utf8());
        }
        &self.input[start..self.pos]
    }

    fn read_name(&mut self) -> Token {
        let name = self.read_ncname();

        if self.prev_ends_operand {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:local or prefix:*
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.advance(2);
                    return Token::QName(format!("{}:*", name));
                }
                Some(c) if is_name_start_char(c) => {
                    self.advance(1);
                    let local = self.read_ncname();
                    return Token::QName(format!("{}:{}", name, local));
                }
                _ => {}
            }
        }

        let mark = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            self.advance(2);
            return Token::Axis(name.to_string());
        }
        let is_call = self.peek() == Some('(');
        self.pos = mark;

        match name {
            "node" | "text" | "comment" | "processing-instruction" if is_call => {
                Token::NodeType(name.to_string())
            }
            _ => Token::Name(name.to_string()),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(s: &str) -> Vec<Token> {
        Lexer::new(s).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        assert_eq!(
            lex("/root/child"),
            vec![
                Token::Slash,
                Token::Name("root".to_string()),
                Token::Slash,
                Token::Name("child".to_string()),
            ]
        );
    }

    #[test]
    fn test_hyphenated_names() {
        assert_eq!(
            lex("physical-interface/oper-status"),
            vec![
                Token::Name("physical-interface".to_string()),
                Token::Slash,
                Token::Name("oper-status".to_string()),
            ]
        );
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            lex("item[@id='test']"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::Literal("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis_consumes_colons() {
        assert_eq!(
            lex("preceding-sibling::item"),
            vec![
                Token::Axis("preceding-sibling".to_string()),
                Token::Name("item".to_string()),
            ]
        );
    }

    #[test]
    fn test_operator_names_depend_on_position() {
        assert_eq!(
            lex("mod mod 2"),
            vec![Token::Name("mod".to_string()), Token::Mod, Token::Number(2.0)]
        );
    }

    #[test]
    fn test_qname_and_node_type() {
        assert_eq!(
            lex("junos:comment/text()"),
            vec![
                Token::QName("junos:comment".to_string()),
                Token::Slash,
                Token::NodeType("text".to_string()),
                Token::LeftParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lex(".5"), vec![Token::Number(0.5)]);
        assert_eq!(lex("12.25"), vec![Token::Number(12.25)]);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("name = 'open").tokenize().is_err());
        assert!(Lexer::new("$var").tokenize().is_err());
        assert!(Lexer::new("a # b").tokenize().is_err());
    }
}
