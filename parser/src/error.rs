use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::lexer::token::Location;

/// 翻訳単位の解析を中断するエラー
#[derive(thiserror::Error, Debug, PartialEq, Clone)]
pub enum Error {
    /// トークン列に `Illegal` が含まれていた
    #[error("{location}: {message}")]
    Lexer { message: String, location: Location },
    #[error("{location}: {message}")]
    Syntax { message: String, location: Location },
    /// パーサ自身の不変条件違反 (入力の誤りではない)
    #[error("{location}: internal error: {message}")]
    Internal { message: String, location: Location },
}

impl Error {
    pub fn location(&self) -> &Location {
        match self {
            Error::Lexer { location, .. }
            | Error::Syntax { location, .. }
            | Error::Internal { location, .. } => location,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Lexer { message, .. }
            | Error::Syntax { message, .. }
            | Error::Internal { message, .. } => message,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = match self {
            Error::Internal { message, .. } => format!("internal error: {message}"),
            _ => self.message().to_string(),
        };

        Diagnostic::new(Severity::Error, self.location(), message)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// 診断情報 (ファイル名, 行, 列, メッセージ)
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file_name: Arc<str>,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, location: &Location, message: impl Into<String>) -> Self {
        Self {
            severity,
            file_name: location.file_name.clone(),
            line: location.line,
            column: location.column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file_name, self.line, self.column, self.severity, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case(
        Error::Syntax { message: "expected `;`, got `}`".into(), location: Location::new(2, 5, "a.hz") },
        "a.hz:2:5: expected `;`, got `}`",
        "a.hz:2:5: error: expected `;`, got `}`"
    )]
    #[case(
        Error::Internal { message: "cannot put back at position 0".into(), location: Location::new(1, 1, "b.hz") },
        "b.hz:1:1: internal error: cannot put back at position 0",
        "b.hz:1:1: error: internal error: cannot put back at position 0"
    )]
    fn display(#[case] error: Error, #[case] want: &str, #[case] want_diagnostic: &str) {
        assert_eq!(error.to_string(), want);
        assert_eq!(error.to_diagnostic().to_string(), want_diagnostic);
    }
}
