use std::sync::Arc;

use crate::{
    error::{Diagnostic, Severity},
    lexer::{
        error::{Error, Warning},
        token::{Location, Token, TokenKind, TokenStream},
    },
    source_buffer::SourceBuffer,
};

pub mod error;
pub mod token;

/// 識別子・数値リテラルの最大長 (超えた場合は警告のみ)
pub const MAX_LEXEME_LENGTH: usize = 256;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

/// ソーステキストを字句解析して `EndOfFile` で終わるトークン列を返す
pub fn lex(source: &str, file_name: &str) -> TokenStream {
    Lexer::new(source, file_name).lex_all()
}

/// 走査中のトークンの開始位置
struct Start {
    offset: usize,
    location: Location,
}

pub struct Lexer<'a> {
    buffer: SourceBuffer<'a>,
    file_name: Arc<str>,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    brace_depth: i64,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file_name: &str) -> Self {
        Self {
            buffer: SourceBuffer::new(source),
            file_name: file_name.into(),
            tokens: vec![],
            diagnostics: vec![],
            brace_depth: 0,
        }
    }

    /// 入力の終端まで1パスで走査する
    /// 致命的なエラーの場合は `Illegal` トークンを積んで打ち切り、最後に必ず `EndOfFile` を積む
    #[tracing::instrument(skip_all, fields(file = %self.file_name))]
    pub fn lex_all(mut self) -> TokenStream {
        let mut failed = false;

        loop {
            let offset = self.buffer.offset();
            let Some(c) = self.buffer.advance() else {
                break;
            };
            let start = Start {
                offset,
                location: self.location(),
            };

            match self.lex_token(c, &start) {
                Ok(Some(token)) => self.tokens.push(token),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(location = %start.location, "lexing stopped: {e}");
                    let token = Token::new(
                        TokenKind::Illegal,
                        e.to_string(),
                        to_u32(start.offset),
                        start.location,
                    );
                    self.tokens.push(token);
                    failed = true;
                    break;
                }
            }
        }

        let (line, column) = self.buffer.position();
        let end = Location::new(line, column + 1, self.file_name.clone());

        if !failed && self.brace_depth != 0 {
            self.warn(Warning::UnbalancedBraces(self.brace_depth), &end);
        }

        self.tokens.push(Token::new(
            TokenKind::EndOfFile,
            "",
            to_u32(self.buffer.offset()),
            end,
        ));

        tracing::debug!(
            tokens = self.tokens.len(),
            warnings = self.diagnostics.len(),
            "lexed"
        );

        TokenStream::new(self.file_name, self.tokens, self.diagnostics)
    }

    fn lex_token(&mut self, c: char, start: &Start) -> Result<Option<Token>, Error> {
        let token = match c {
            BYTE_ORDER_MARK if start.offset == 0 => return Ok(None),
            '\n' | '\r' => return Ok(None),
            c if c.is_whitespace() => return Ok(None),
            c if c.is_alphabetic() || c == '_' => self.lex_identifier(start),
            c if c.is_ascii_digit() => self.lex_number(c, start)?,
            '"' => self.lex_string(start)?,
            '`' => self.lex_raw_string(start)?,
            '\'' => self.lex_rune(start)?,
            '/' if self.buffer.peek() == Some('/') => {
                self.buffer.advance();
                return Ok(self.lex_line_comment(start));
            }
            '/' if self.buffer.peek() == Some('*') => {
                self.lex_block_comment(start);
                return Ok(None);
            }
            '#' if self.at_first_character(start)
                && self.buffer.peek() == Some('!')
                && self.buffer.peek_n(1) == Some('/') =>
            {
                self.skip_line();
                return Ok(None);
            }
            '#' => return Ok(self.lex_line_comment(start)),
            '@' => self.lex_macro(start)?,
            _ => self.lex_operator(c, start)?,
        };

        Ok(Some(token))
    }

    /// BOM を除いたファイル先頭の文字かどうか
    fn at_first_character(&self, start: &Start) -> bool {
        start.offset == 0
            || (start.offset == BYTE_ORDER_MARK.len_utf8()
                && self.buffer.previous(2) == Some(BYTE_ORDER_MARK))
    }

    fn lex_identifier(&mut self, start: &Start) -> Token {
        self.eat_while(|c| c.is_alphanumeric() || c == '_');

        let text = self.buffer.slice(start.offset, self.buffer.offset());
        self.check_length(text, start);

        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
        self.token(kind, start)
    }

    fn lex_number(&mut self, first: char, start: &Start) -> Result<Token, Error> {
        if first == '0' {
            let base = match self.buffer.peek() {
                Some('x' | 'X') => Some((
                    TokenKind::IntegerHex,
                    16,
                    "0x",
                    "hexadecimal digits [0-9A-Fa-f]",
                )),
                Some('b' | 'B') => Some((TokenKind::IntegerBin, 2, "0b", "binary digits [0-1]")),
                Some('o' | 'O') => Some((TokenKind::IntegerOct, 8, "0o", "octal digits [0-7]")),
                Some(c) if c.is_alphabetic() => return Err(Error::UnsupportedBasePrefix(c)),
                _ => None,
            };

            if let Some((kind, radix, prefix, expected)) = base {
                self.buffer.advance();

                let mut digits = 0;
                while let Some(c) = self.buffer.peek() {
                    if c.is_digit(radix) {
                        digits += 1;
                    } else if c != '_' {
                        break;
                    }
                    self.buffer.advance();
                }

                if digits == 0 {
                    return Err(Error::MissingDigits { prefix, expected });
                }

                return Ok(self.number_token(kind, start));
            }
        }

        self.lex_decimal(start)
    }

    /// 10進数の整数・浮動小数点数・虚数
    /// `.` と `_` は直後が数字の場合のみリテラルの一部とみなす (`1..5` は `1` `..` `5`)
    fn lex_decimal(&mut self, start: &Start) -> Result<Token, Error> {
        let mut kind = TokenKind::IntegerDec;
        let mut exponent = false;

        loop {
            let next_is_digit = self.buffer.peek_n(1).is_some_and(|c| c.is_ascii_digit());

            match self.buffer.peek() {
                Some(c) if c.is_ascii_digit() => {}
                Some('_') if next_is_digit => {}
                Some('.') if kind == TokenKind::IntegerDec && next_is_digit => {
                    kind = TokenKind::FloatLit;
                }
                Some('e' | 'E') if !exponent => {
                    self.buffer.advance();
                    exponent = true;
                    kind = TokenKind::FloatLit;

                    match self.buffer.peek() {
                        Some('+' | '-') => {}
                        other => return Err(Error::MissingExponentSign(other)),
                    }
                    self.buffer.advance();

                    match self.buffer.peek() {
                        Some(c) if c.is_ascii_digit() => {}
                        other => return Err(Error::MissingExponentDigits(other)),
                    }
                }
                _ => break,
            }

            self.buffer.advance();
        }

        if let Some('j' | 'J') = self.buffer.peek() {
            self.buffer.advance();
            kind = TokenKind::ImagLit;
        }

        Ok(self.number_token(kind, start))
    }

    fn number_token(&mut self, kind: TokenKind, start: &Start) -> Token {
        let text = self.buffer.slice(start.offset, self.buffer.offset());
        self.check_length(text, start);

        self.token(kind, start)
    }

    /// `""` は空文字列、`"""` は三重引用符の文字列
    /// エスケープシーケンスは解釈せずそのまま残す
    fn lex_string(&mut self, start: &Start) -> Result<Token, Error> {
        match (self.buffer.peek(), self.buffer.peek_n(1)) {
            (Some('"'), Some('"')) => return self.lex_triple_string(start),
            (Some('"'), _) => {
                self.buffer.advance();
                return Ok(self.token_with_text(TokenKind::StringLit, "", start));
            }
            _ => {}
        }

        let content = self.buffer.offset();
        loop {
            match self.buffer.advance() {
                None => return Err(Error::UnterminatedString),
                Some('\\') => {
                    if self.buffer.advance().is_none() {
                        return Err(Error::UnterminatedString);
                    }
                }
                Some('"') => break,
                Some(_) => {}
            }
        }

        let text = self.buffer.slice(content, self.buffer.offset() - 1);
        Ok(self.token_with_text(TokenKind::StringLit, text, start))
    }

    fn lex_triple_string(&mut self, start: &Start) -> Result<Token, Error> {
        self.buffer.advance_n(2);

        let content = self.buffer.offset();
        loop {
            match self.buffer.advance() {
                None => return Err(Error::UnterminatedString),
                Some('\\') => {
                    if self.buffer.advance().is_none() {
                        return Err(Error::UnterminatedString);
                    }
                }
                Some('"')
                    if self.buffer.peek() == Some('"') && self.buffer.peek_n(1) == Some('"') =>
                {
                    break;
                }
                Some(_) => {}
            }
        }

        let text = self.buffer.slice(content, self.buffer.offset() - 1);
        self.buffer.advance_n(2);

        Ok(self.token_with_text(TokenKind::TripleStringLit, text, start))
    }

    fn lex_raw_string(&mut self, start: &Start) -> Result<Token, Error> {
        let content = self.buffer.offset();
        loop {
            match self.buffer.advance() {
                None => return Err(Error::UnterminatedRawString),
                Some('`') => break,
                Some(_) => {}
            }
        }

        let text = self.buffer.slice(content, self.buffer.offset() - 1);
        Ok(self.token_with_text(TokenKind::RawStringLit, text, start))
    }

    fn lex_rune(&mut self, start: &Start) -> Result<Token, Error> {
        if self.buffer.peek() == Some('\'') {
            self.buffer.advance();
            return Err(Error::EmptyRune);
        }

        let content = self.buffer.offset();
        loop {
            match self.buffer.advance() {
                None | Some('\n' | '\r') => return Err(Error::UnterminatedRune),
                Some('\\') => {
                    if self.buffer.advance().is_none() {
                        return Err(Error::UnterminatedRune);
                    }
                }
                Some('\'') => break,
                Some(_) => {}
            }
        }

        let text = self.buffer.slice(content, self.buffer.offset() - 1);
        Ok(self.token_with_text(TokenKind::RuneLit, text, start))
    }

    /// 行コメント (`//` または `#`)
    /// 本文が空白のみのコメントはトークンにしない
    fn lex_line_comment(&mut self, start: &Start) -> Option<Token> {
        let kind = if self.buffer.peek() == Some('/') && self.buffer.previous(1) == Some('/') {
            self.buffer.advance();
            TokenKind::DocComment
        } else {
            TokenKind::Comment
        };

        let body = self.buffer.offset();
        self.skip_line();

        let text = self.buffer.slice(body, self.buffer.offset()).trim();
        if text.is_empty() {
            return None;
        }

        Some(self.token_with_text(kind, text, start))
    }

    /// ブロックコメントは入れ子にならず、トークンも生成しない
    fn lex_block_comment(&mut self, start: &Start) {
        self.buffer.advance();

        loop {
            match self.buffer.advance() {
                None => {
                    self.warn(Warning::UnterminatedBlockComment, &start.location);
                    return;
                }
                Some('*') if self.buffer.peek() == Some('/') => {
                    self.buffer.advance();
                    return;
                }
                Some(_) => {}
            }
        }
    }

    fn lex_macro(&mut self, start: &Start) -> Result<Token, Error> {
        let name = self.buffer.offset();
        self.eat_while(|c| c.is_alphanumeric() || c == '_');

        let text = self.buffer.slice(name, self.buffer.offset());
        if text.is_empty() {
            return Err(Error::MissingMacroName);
        }
        self.check_length(text, start);

        Ok(self.token_with_text(TokenKind::Macro, text, start))
    }

    /// 演算子・区切り記号は最長一致
    fn lex_operator(&mut self, c: char, start: &Start) -> Result<Token, Error> {
        use TokenKind::*;

        let (kind, extra) = match (c, self.buffer.peek(), self.buffer.peek_n(1)) {
            ('=', Some('='), _) => (EqEq, 1),
            ('=', Some('>'), _) => (FatArrow, 1),
            ('=', ..) => (Assign, 0),
            ('+', Some('+'), _) => (PlusPlus, 1),
            ('+', Some('='), _) => (PlusAssign, 1),
            ('+', ..) => (Plus, 0),
            ('-', Some('-'), _) => (MinusMinus, 1),
            ('-', Some('='), _) => (MinusAssign, 1),
            ('-', Some('>'), _) => (Arrow, 1),
            ('-', ..) => (Minus, 0),
            ('*', Some('*'), _) => (StarStar, 1),
            ('*', Some('='), _) => (StarAssign, 1),
            ('*', ..) => (Star, 0),
            ('/', Some('='), _) => (SlashAssign, 1),
            ('/', ..) => (Slash, 0),
            ('%', Some('%'), _) => (PercentPercent, 1),
            ('%', Some('='), _) => (PercentAssign, 1),
            ('%', ..) => (Percent, 0),
            ('&', Some('&'), _) => (AndAnd, 1),
            ('&', Some('^'), _) => (AndNot, 1),
            ('&', Some('='), _) => (AndAssign, 1),
            ('&', ..) => (Ampersand, 0),
            ('|', Some('|'), _) => (OrOr, 1),
            ('|', Some('='), _) => (OrAssign, 1),
            ('|', ..) => (Pipe, 0),
            ('^', Some('='), _) => (XorAssign, 1),
            ('^', ..) => (Caret, 0),
            ('<', Some('='), _) => (Le, 1),
            ('<', Some('-'), _) => (LeftArrow, 1),
            ('<', Some('<'), Some('=')) => (LBitshiftEquals, 2),
            ('<', Some('<'), _) => (LBitshift, 1),
            ('<', ..) => (Lt, 0),
            ('>', Some('='), _) => (Ge, 1),
            ('>', Some('>'), Some('=')) => (RBitshiftEquals, 2),
            ('>', Some('>'), _) => (RBitshift, 1),
            ('>', ..) => (Gt, 0),
            ('~', Some('='), _) => (TildeAssign, 1),
            ('~', ..) => (Tilde, 0),
            ('!', Some('='), _) => (NotEq, 1),
            ('!', ..) => (Bang, 0),
            ('.', Some('.'), Some('.')) => (Ellipsis, 2),
            ('.', Some('.'), _) => (DotDot, 1),
            ('.', ..) => (Dot, 0),
            (':', Some(':'), _) => (ColonColon, 1),
            (':', ..) => (Colon, 0),
            ('?', ..) => (Question, 0),
            (';', ..) => (Semicolon, 0),
            (',', ..) => (Comma, 0),
            ('\\', ..) => (Backslash, 0),
            ('(', ..) => (LParen, 0),
            (')', ..) => (RParen, 0),
            ('[', ..) => (LBracket, 0),
            (']', ..) => (RBracket, 0),
            ('{', ..) => (LBrace, 0),
            ('}', ..) => (RBrace, 0),
            _ => return Err(Error::InvalidCharacter(c)),
        };

        match kind {
            LBrace => self.brace_depth += 1,
            RBrace => self.brace_depth -= 1,
            _ => {}
        }

        self.buffer.advance_n(extra);
        Ok(self.token(kind, start))
    }

    /// 改行の手前まで読み飛ばす
    fn skip_line(&mut self) {
        self.eat_while(|c| c != '\n' && c != '\r');
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.buffer.peek().is_some_and(&predicate) {
            self.buffer.advance();
        }
    }

    fn check_length(&mut self, text: &str, start: &Start) {
        let length = text.chars().count();
        if length > MAX_LEXEME_LENGTH {
            self.warn(Warning::LexemeTooLong(length), &start.location);
        }
    }

    fn warn(&mut self, warning: Warning, location: &Location) {
        tracing::warn!(%location, "{warning}");
        self.diagnostics
            .push(Diagnostic::new(Severity::Warning, location, warning.to_string()));
    }

    fn location(&self) -> Location {
        let (line, column) = self.buffer.position();
        Location::new(line, column, self.file_name.clone())
    }

    fn token(&self, kind: TokenKind, start: &Start) -> Token {
        let text = self.buffer.slice(start.offset, self.buffer.offset());
        self.token_with_text(kind, text, start)
    }

    fn token_with_text(&self, kind: TokenKind, text: &str, start: &Start) -> Token {
        Token::new(kind, text, to_u32(start.offset), start.location.clone())
    }
}

fn to_u32(offset: usize) -> u32 {
    u32::try_from(offset).unwrap_or(u32::MAX)
}
