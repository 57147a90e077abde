//! Tokenizer for the semantic query language.
//!
//! Scanning is lenient: characters that start no token are dropped so a
//! half-typed query never fails to tokenize.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use super::parser::CompareOp;

/// Logical connective, from `&&`/`||` or the bare words `AND`/`OR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare word: field name or unquoted value.
    Ident(String),
    /// All-digit run that fits in an i64.
    Number(i64),
    /// Quoted string, contents taken verbatim.
    Str(String),
    /// Comparison operator (`=`, `:`, `!=`, `>`, `<`, `>=`, `<=`).
    Op(CompareOp),
    Logic(LogicOp),
    /// Bare `!`.
    Not,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::Op(op) => write!(f, "operator '{}'", op),
            Token::Logic(LogicOp::And) => write!(f, "'&&'"),
            Token::Logic(LogicOp::Or) => write!(f, "'||'"),
            Token::Not => write!(f, "'!'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Pull-based lexer. Each call to [`Lexer::next_token`] scans one token;
/// after the input is exhausted it keeps returning [`Token::Eof`].
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Token {
        while let Some(c) = self.chars.next() {
            match c {
                c if c.is_whitespace() => {}
                '(' => return Token::LParen,
                ')' => return Token::RParen,
                ':' => return Token::Op(CompareOp::Eq),
                '=' => {
                    // `==` reads the same as `=`
                    self.chars.next_if_eq(&'=');
                    return Token::Op(CompareOp::Eq);
                }
                '>' => {
                    return if self.chars.next_if_eq(&'=').is_some() {
                        Token::Op(CompareOp::Gte)
                    } else {
                        Token::Op(CompareOp::Gt)
                    };
                }
                '<' => {
                    return if self.chars.next_if_eq(&'=').is_some() {
                        Token::Op(CompareOp::Lte)
                    } else {
                        Token::Op(CompareOp::Lt)
                    };
                }
                '!' => {
                    return if self.chars.next_if_eq(&'=').is_some() {
                        Token::Op(CompareOp::NotEq)
                    } else {
                        Token::Not
                    };
                }
                '&' if self.chars.next_if_eq(&'&').is_some() => {
                    return Token::Logic(LogicOp::And);
                }
                '|' if self.chars.next_if_eq(&'|').is_some() => {
                    return Token::Logic(LogicOp::Or);
                }
                '"' | '\'' => return Token::Str(self.quoted(c)),
                c if c.is_ascii_digit() => return self.number(c),
                c if is_word_start(c) => return self.word(c),
                // Anything else is skipped
                _ => {}
            }
        }
        Token::Eof
    }

    /// Read up to the matching quote (or end of input).
    fn quoted(&mut self, quote: char) -> String {
        let mut text = String::new();
        for c in self.chars.by_ref() {
            if c == quote {
                break;
            }
            text.push(c);
        }
        text
    }

    fn run(&mut self, first: char) -> String {
        let mut text = String::from(first);
        while let Some(c) = self.chars.next_if(|&c| is_word_char(c)) {
            text.push(c);
        }
        text
    }

    /// Digit-led run: NUMBER when all digits, otherwise IDENTIFIER
    /// (`10.0.0.1`, `8080-`).
    fn number(&mut self, first: char) -> Token {
        let text = self.run(first);
        if text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = text.parse::<i64>() {
                return Token::Number(n);
            }
        }
        Token::Ident(text)
    }

    fn word(&mut self, first: char) -> Token {
        let text = self.run(first);
        if text.eq_ignore_ascii_case("and") {
            Token::Logic(LogicOp::And)
        } else if text.eq_ignore_ascii_case("or") {
            Token::Logic(LogicOp::Or)
        } else {
            Token::Ident(text)
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields tokens up to, but not including, [`Token::Eof`].
    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::Eof => None,
            token => Some(token),
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '*'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '*' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).collect()
    }

    #[test]
    fn test_empty_input_is_eof_forever() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token(), Token::Eof);
        assert_eq!(lexer.next_token(), Token::Eof);
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            tokens("lport>=1000"),
            vec![
                Token::Ident("lport".to_string()),
                Token::Op(CompareOp::Gte),
                Token::Number(1000),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("= : != > < >= <= !"),
            vec![
                Token::Op(CompareOp::Eq),
                Token::Op(CompareOp::Eq),
                Token::Op(CompareOp::NotEq),
                Token::Op(CompareOp::Gt),
                Token::Op(CompareOp::Lt),
                Token::Op(CompareOp::Gte),
                Token::Op(CompareOp::Lte),
                Token::Not,
            ]
        );
    }

    #[test]
    fn test_logic_words_are_case_insensitive() {
        assert_eq!(
            tokens("and AND Or || &&"),
            vec![
                Token::Logic(LogicOp::And),
                Token::Logic(LogicOp::And),
                Token::Logic(LogicOp::Or),
                Token::Logic(LogicOp::Or),
                Token::Logic(LogicOp::And),
            ]
        );
    }

    #[test]
    fn test_logic_word_prefix_stays_identifier() {
        assert_eq!(tokens("oracle"), vec![Token::Ident("oracle".to_string())]);
        assert_eq!(tokens("android"), vec![Token::Ident("android".to_string())]);
    }

    #[test]
    fn test_digit_led_word_degrades_to_identifier() {
        assert_eq!(tokens("10.0.0.1"), vec![Token::Ident("10.0.0.1".to_string())]);
        assert_eq!(tokens("8080-"), vec![Token::Ident("8080-".to_string())]);
    }

    #[test]
    fn test_number_overflow_degrades_to_identifier() {
        assert_eq!(
            tokens("99999999999999999999"),
            vec![Token::Ident("99999999999999999999".to_string())]
        );
    }

    #[test]
    fn test_wildcard_identifier() {
        assert_eq!(tokens("*exe"), vec![Token::Ident("*exe".to_string())]);
        assert_eq!(tokens("chrom*"), vec![Token::Ident("chrom*".to_string())]);
    }

    #[test]
    fn test_quoted_strings_are_verbatim() {
        assert_eq!(
            tokens(r#""Google Chrome" 'a\nb'"#),
            vec![
                Token::Str("Google Chrome".to_string()),
                Token::Str("a\\nb".to_string()),
            ]
        );
    }

    #[test]
    fn test_mismatched_quote_kinds_nest() {
        assert_eq!(tokens(r#"'say "hi"'"#), vec![Token::Str("say \"hi\"".to_string())]);
    }

    #[test]
    fn test_unterminated_string_consumes_rest() {
        assert_eq!(tokens("\"abc && x"), vec![Token::Str("abc && x".to_string())]);
    }

    #[test]
    fn test_unknown_characters_are_skipped() {
        assert_eq!(
            tokens("pid # = $ 1 @"),
            vec![
                Token::Ident("pid".to_string()),
                Token::Op(CompareOp::Eq),
                Token::Number(1),
            ]
        );
        // Single & and | are not operators
        assert_eq!(tokens("a & b | c").len(), 3);
    }

    #[test]
    fn test_parens_and_not() {
        assert_eq!(
            tokens("!(pid=1)"),
            vec![
                Token::Not,
                Token::LParen,
                Token::Ident("pid".to_string()),
                Token::Op(CompareOp::Eq),
                Token::Number(1),
                Token::RParen,
            ]
        );
    }
}
