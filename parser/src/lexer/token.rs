use std::{fmt, ops::Index, sync::Arc};

use serde::Serialize;

use crate::error::Diagnostic;

/// トークンの出現位置
/// 列は1始まり (行頭の文字が1列目)
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub file_name: Arc<str>,
}

impl Location {
    pub fn new(line: u32, column: u32, file_name: impl Into<Arc<str>>) -> Self {
        Self {
            line,
            column,
            file_name: file_name.into(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.line, self.column)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OperatorBand {
    Arithmetic,
    Comparison,
    Assignment,
    Arrow,
    Bitwise,
}

/// `TokenKind` の分類
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Band {
    Special,
    Literal,
    Operator(OperatorBand),
    Delimiter,
    Separator,
    Keyword,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum TokenKind {
    // special
    Illegal,
    EndOfFile,
    Comment,
    DocComment,

    // literals
    Identifier,
    Macro,
    IntegerDec,
    IntegerBin,
    IntegerHex,
    IntegerOct,
    FloatLit,
    ImagLit,
    RuneLit,
    StringLit,
    RawStringLit,
    TripleStringLit,
    True,
    False,

    // arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PercentPercent,
    PlusPlus,
    MinusMinus,
    StarStar,
    Question,

    // comparison
    Gt,
    Lt,
    Ge,
    Le,
    EqEq,
    NotEq,

    // assignment
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    LBitshiftEquals,
    RBitshiftEquals,
    TildeAssign,

    // arrows
    FatArrow,
    Arrow,
    LeftArrow,

    // bitwise
    LBitshift,
    RBitshift,
    Ampersand,
    Pipe,
    Bang,
    Caret,
    AndNot,
    AndAnd,
    OrOr,
    Tilde,

    // delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // separators
    Colon,
    ColonColon,
    Semicolon,
    Comma,
    Dot,
    DotDot,
    Ellipsis,
    Backslash,

    // keywords
    And,
    Break,
    Case,
    Catch,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    ElseIf,
    Enum,
    Export,
    Extern,
    For,
    Func,
    If,
    Import,
    In,
    Include,
    Match,
    Mutable,
    Nil,
    Not,
    Or,
    OrElse,
    Raise,
    Return,
    Struct,
    Try,
    Union,
    Unreachable,
    While,
}

const KEYWORDS: &[TokenKind] = &[
    TokenKind::True,
    TokenKind::False,
    TokenKind::And,
    TokenKind::Break,
    TokenKind::Case,
    TokenKind::Catch,
    TokenKind::Const,
    TokenKind::Continue,
    TokenKind::Default,
    TokenKind::Defer,
    TokenKind::Else,
    TokenKind::ElseIf,
    TokenKind::Enum,
    TokenKind::Export,
    TokenKind::Extern,
    TokenKind::For,
    TokenKind::Func,
    TokenKind::If,
    TokenKind::Import,
    TokenKind::In,
    TokenKind::Include,
    TokenKind::Match,
    TokenKind::Mutable,
    TokenKind::Nil,
    TokenKind::Not,
    TokenKind::Or,
    TokenKind::OrElse,
    TokenKind::Raise,
    TokenKind::Return,
    TokenKind::Struct,
    TokenKind::Try,
    TokenKind::Union,
    TokenKind::Unreachable,
    TokenKind::While,
];

impl TokenKind {
    /// 予約語であれば対応する `TokenKind` を返す
    /// `true` / `false` はリテラルだが予約語と同じ表から引く
    pub fn keyword(text: &str) -> Option<Self> {
        KEYWORDS.iter().copied().find(|kind| kind.name() == text)
    }

    pub fn band(self) -> Band {
        use TokenKind::*;

        match self {
            Illegal | EndOfFile | Comment | DocComment => Band::Special,
            Identifier | Macro | IntegerDec | IntegerBin | IntegerHex | IntegerOct | FloatLit
            | ImagLit | RuneLit | StringLit | RawStringLit | TripleStringLit | True | False => {
                Band::Literal
            }
            Plus | Minus | Star | Slash | Percent | PercentPercent | PlusPlus | MinusMinus
            | StarStar | Question => Band::Operator(OperatorBand::Arithmetic),
            Gt | Lt | Ge | Le | EqEq | NotEq => Band::Operator(OperatorBand::Comparison),
            Assign | PlusAssign | MinusAssign | StarAssign | SlashAssign | PercentAssign
            | AndAssign | OrAssign | XorAssign | LBitshiftEquals | RBitshiftEquals
            | TildeAssign => Band::Operator(OperatorBand::Assignment),
            FatArrow | Arrow | LeftArrow => Band::Operator(OperatorBand::Arrow),
            LBitshift | RBitshift | Ampersand | Pipe | Bang | Caret | AndNot | AndAnd | OrOr
            | Tilde => Band::Operator(OperatorBand::Bitwise),
            LParen | RParen | LBrace | RBrace | LBracket | RBracket => Band::Delimiter,
            Colon | ColonColon | Semicolon | Comma | Dot | DotDot | Ellipsis | Backslash => {
                Band::Separator
            }
            And | Break | Case | Catch | Const | Continue | Default | Defer | Else | ElseIf
            | Enum | Export | Extern | For | Func | If | Import | In | Include | Match
            | Mutable | Nil | Not | Or | OrElse | Raise | Return | Struct | Try | Union
            | Unreachable | While => Band::Keyword,
        }
    }

    pub fn is_literal(self) -> bool {
        self.band() == Band::Literal
    }

    pub fn is_keyword(self) -> bool {
        self.band() == Band::Keyword
    }

    pub fn is_operator(self) -> bool {
        matches!(self.band(), Band::Operator(_))
    }

    pub fn is_comparison_operator(self) -> bool {
        self.band() == Band::Operator(OperatorBand::Comparison)
    }

    pub fn is_assignment_operator(self) -> bool {
        self.band() == Band::Operator(OperatorBand::Assignment)
    }

    pub fn is_bitwise_operator(self) -> bool {
        self.band() == Band::Operator(OperatorBand::Bitwise)
    }

    pub fn is_arrow_operator(self) -> bool {
        self.band() == Band::Operator(OperatorBand::Arrow)
    }

    pub fn is_delimiter(self) -> bool {
        self.band() == Band::Delimiter
    }

    pub fn is_separator(self) -> bool {
        self.band() == Band::Separator
    }

    pub fn is_identifier(self) -> bool {
        self == TokenKind::Identifier
    }

    pub fn is_end_of_file(self) -> bool {
        self == TokenKind::EndOfFile
    }

    pub fn is_illegal(self) -> bool {
        self == TokenKind::Illegal
    }

    pub fn is_semicolon(self) -> bool {
        self == TokenKind::Semicolon
    }

    /// コメント類は構文解析の対象外
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::DocComment)
    }

    /// 字句または種別の表示名
    pub fn name(self) -> &'static str {
        use TokenKind::*;

        match self {
            Illegal => "ILLEGAL",
            EndOfFile => "EOF",
            Comment => "COMMENT",
            DocComment => "DOC_COMMENT",
            Identifier => "IDENTIFIER",
            Macro => "MACRO",
            IntegerDec => "INTEGER",
            IntegerBin => "BIN_INT",
            IntegerHex => "HEX_INT",
            IntegerOct => "OCT_INT",
            FloatLit => "FLOAT",
            ImagLit => "IMAG",
            RuneLit => "RUNE",
            StringLit => "STRING",
            RawStringLit => "RAW_STRING",
            TripleStringLit => "TRIPLE_STRING",
            True => "true",
            False => "false",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            PercentPercent => "%%",
            PlusPlus => "++",
            MinusMinus => "--",
            StarStar => "**",
            Question => "?",
            Gt => ">",
            Lt => "<",
            Ge => ">=",
            Le => "<=",
            EqEq => "==",
            NotEq => "!=",
            Assign => "=",
            PlusAssign => "+=",
            MinusAssign => "-=",
            StarAssign => "*=",
            SlashAssign => "/=",
            PercentAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            LBitshiftEquals => "<<=",
            RBitshiftEquals => ">>=",
            TildeAssign => "~=",
            FatArrow => "=>",
            Arrow => "->",
            LeftArrow => "<-",
            LBitshift => "<<",
            RBitshift => ">>",
            Ampersand => "&",
            Pipe => "|",
            Bang => "!",
            Caret => "^",
            AndNot => "&^",
            AndAnd => "&&",
            OrOr => "||",
            Tilde => "~",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
            Colon => ":",
            ColonColon => "::",
            Semicolon => ";",
            Comma => ",",
            Dot => ".",
            DotDot => "..",
            Ellipsis => "...",
            Backslash => "\\",
            And => "and",
            Break => "break",
            Case => "case",
            Catch => "catch",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Defer => "defer",
            Else => "else",
            ElseIf => "elseif",
            Enum => "enum",
            Export => "export",
            Extern => "extern",
            For => "for",
            Func => "func",
            If => "if",
            Import => "import",
            In => "in",
            Include => "include",
            Match => "match",
            Mutable => "mutable",
            Nil => "nil",
            Not => "not",
            Or => "or",
            OrElse => "orelse",
            Raise => "raise",
            Return => "return",
            Struct => "struct",
            Try => "try",
            Union => "union",
            Unreachable => "unreachable",
            While => "while",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 字句1つ分の出現
/// `text` は演算子や予約語では字句そのもの、文字列では引用符を除いた中身、
/// `EndOfFile` では空文字列
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start_offset: u32,
    pub location: Location,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        start_offset: u32,
        location: Location,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start_offset,
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {:?} {:?}",
            self.location.line, self.location.column, self.kind, self.text
        )
    }
}

/// 字句解析の結果
/// 常に `EndOfFile` ちょうど1つで終わる
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct TokenStream {
    file_name: Arc<str>,
    tokens: Vec<Token>,
    #[serde(skip)]
    diagnostics: Vec<Diagnostic>,
}

impl TokenStream {
    pub(crate) fn new(file_name: Arc<str>, tokens: Vec<Token>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            file_name,
            tokens,
            diagnostics,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// 字句解析中の警告
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// 致命的なエラーで字句解析が中断した場合の `Illegal` トークン
    pub fn illegal(&self) -> Option<&Token> {
        self.tokens.iter().rev().find(|token| token.kind.is_illegal())
    }
}

impl Index<usize> for TokenStream {
    type Output = Token;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
