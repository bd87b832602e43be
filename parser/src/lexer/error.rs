/// 字句解析を中断する致命的なエラー
/// `Display` の内容は `Illegal` トークンのテキストになる
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated raw string literal")]
    UnterminatedRawString,
    #[error("unterminated rune literal")]
    UnterminatedRune,
    #[error("empty rune literal")]
    EmptyRune,
    #[error("expected {expected} after `{prefix}`")]
    MissingDigits {
        prefix: &'static str,
        expected: &'static str,
    },
    #[error("expected `+` or `-` after exponent, got {}", describe(.0))]
    MissingExponentSign(Option<char>),
    #[error("expected a digit after exponent sign, got {}", describe(.0))]
    MissingExponentDigits(Option<char>),
    #[error("unsupported base prefix `0{0}`; expected one of [xXbBoO] after `0`")]
    UnsupportedBasePrefix(char),
    #[error("expected a macro name after `@`")]
    MissingMacroName,
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
}

/// 字句解析を継続できる警告
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Warning {
    #[error("lexeme is {0} characters long (expected at most {max})", max = super::MAX_LEXEME_LENGTH)]
    LexemeTooLong(usize),
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("unbalanced braces at end of file (nesting depth {0})")]
    UnbalancedBraces(i64),
}

fn describe(c: &Option<char>) -> String {
    match c {
        Some(c) => format!("{c:?}"),
        None => "end of file".into(),
    }
}
