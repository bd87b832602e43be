use std::fmt::Display;

use node::{Kind, Node};

use crate::{
    error::Error,
    lexer::token::{Token, TokenKind, TokenStream},
};

pub use crate::lexer::lex;

pub mod error;
mod expression;
pub mod lexer;
#[cfg(test)]
mod lexer_property_tests;
pub mod source_buffer;
mod statement;

/// 括弧・前置演算子・文・型の入れ子を合わせた深さの上限
const MAX_NESTING_DEPTH: usize = 64;

/// 構文規則1つ分の解析関数
/// `Ok(None)` はその規則が現在のトークンから始まらないことを表す
type Production<'a> = fn(&mut Parser<'a>) -> Result<Option<Node>, Error>;

/// トークン列から構文木を組み立てる
/// エラーからの回復は行わず、最初のエラーで解析全体を中断する
pub fn parse(stream: &TokenStream) -> Result<Node, Error> {
    Parser::new(stream).parse()
}

/// トークン列を読み進めるカーソルを持つ再帰下降パーサ
/// コメント類のトークンは読み飛ばす
pub struct Parser<'a> {
    stream: &'a TokenStream,
    indices: Vec<usize>,
    cursor: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a TokenStream) -> Self {
        let indices = stream
            .iter()
            .enumerate()
            .filter(|(_, token)| !token.kind.is_trivia())
            .map(|(i, _)| i)
            .collect();

        Self {
            stream,
            indices,
            cursor: 0,
            depth: 0,
        }
    }

    #[tracing::instrument(skip_all, fields(file = %self.stream.file_name()))]
    pub fn parse(&mut self) -> Result<Node, Error> {
        if let Some(token) = self.stream.illegal() {
            return Err(Error::Lexer {
                message: token.text.clone(),
                location: token.location.clone(),
            });
        }

        let root = self.translation_unit()?;
        if let Kind::Root { items } = &root.kind {
            tracing::debug!(items = items.len(), "parsed");
        }

        Ok(root)
    }

    /// カーソル位置のトークン (消費しない)
    pub fn current(&self) -> &'a Token {
        let stream: &'a TokenStream = self.stream;
        &stream[self.current_index()]
    }

    /// カーソル位置のトークンのトークン列上の添字
    pub fn current_index(&self) -> usize {
        self.indices[self.cursor]
    }

    pub fn peek_next(&self) -> Option<&'a Token> {
        let stream: &'a TokenStream = self.stream;
        self.indices.get(self.cursor + 1).map(|&i| &stream[i])
    }

    /// カーソル位置のトークンを返して1つ進める
    /// `EndOfFile` では進まずに `None` を返す
    pub fn chomp(&mut self) -> Option<&'a Token> {
        let token = self.current();
        if token.kind.is_end_of_file() {
            return None;
        }
        self.cursor += 1;

        Some(token)
    }

    pub fn chomp_if(&mut self, kind: TokenKind) -> Option<&'a Token> {
        if self.current().kind == kind {
            self.chomp()
        } else {
            None
        }
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, Error> {
        match self.chomp_if(kind) {
            Some(token) => Ok(token),
            None => Err(self.expected_token(kind)),
        }
    }

    /// カーソルを1つ戻す
    pub fn put_back(&mut self) -> Result<(), Error> {
        if self.cursor == 0 {
            return Err(Error::Internal {
                message: "cannot put back a token at position 0".into(),
                location: self.current().location.clone(),
            });
        }
        self.cursor -= 1;

        Ok(())
    }

    /// `chomp_if` して消費したトークンの添字を返す
    fn accept(&mut self, kind: TokenKind) -> Option<usize> {
        let index = self.current_index();
        self.chomp_if(kind).map(|_| index)
    }

    fn require(&mut self, production: Production<'a>, what: &str) -> Result<Node, Error> {
        match production(self)? {
            Some(node) => Ok(node),
            None => Err(self.expected(what)),
        }
    }

    /// 入れ子1段分の解析
    /// 上限を超えたら構文エラーとし、残りのスタックが少なければヒープ上に継ぎ足す
    fn nested<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.syntax_error(format!(
                "nested too deeply (maximum {MAX_NESTING_DEPTH} levels)"
            )));
        }

        self.depth += 1;
        let result = stacker::maybe_grow(32 * 1024, 256 * 1024, || production(self));
        self.depth -= 1;

        result
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            message: message.into(),
            location: self.current().location.clone(),
        }
    }

    fn expected(&self, what: impl Display) -> Error {
        self.syntax_error(format!("expected {what}, got `{}`", self.current().kind))
    }

    fn expected_token(&self, kind: TokenKind) -> Error {
        self.expected(format_args!("`{kind}`"))
    }

    fn translation_unit(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        let mut items = vec![];

        while !self.current().kind.is_end_of_file() {
            items.push(self.require(Self::statement, "statement")?);
        }

        Ok(Node::new(at, Kind::Root { items }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lexer::token::Location;
    use pretty_assertions::assert_eq;

    /// 解析結果をS式で返す
    pub(crate) fn render(source: &str) -> Result<String, Error> {
        parse(&lex(source, "test.hz")).map(|root| root.to_string())
    }

    /// エラーメッセージと (行, 列)
    pub(crate) fn failure(source: &str) -> (String, (u32, u32)) {
        match parse(&lex(source, "test.hz")) {
            Ok(root) => panic!("parsed unexpectedly: {root}"),
            Err(e) => {
                let location = e.location();
                (e.message().to_string(), (location.line, location.column))
            }
        }
    }

    #[test]
    fn cursor_operations() {
        let stream = lex("a // note\n+ b", "test.hz");
        let mut parser = Parser::new(&stream);

        assert_eq!(parser.current().text, "a");
        assert_eq!(parser.peek_next().map(|t| t.kind), Some(TokenKind::Plus));
        assert_eq!(parser.chomp_if(TokenKind::Plus), None);
        assert_eq!(parser.chomp().map(|t| t.text.as_str()), Some("a"));
        assert_eq!(parser.current_index(), 2);

        assert!(parser.put_back().is_ok());
        assert_eq!(parser.current().text, "a");
        assert_eq!(
            parser.put_back(),
            Err(Error::Internal {
                message: "cannot put back a token at position 0".into(),
                location: Location::new(1, 1, "test.hz"),
            })
        );

        parser.chomp();
        assert_eq!(parser.expect(TokenKind::Plus).map(|t| t.kind), Ok(TokenKind::Plus));
        assert_eq!(parser.expect(TokenKind::Identifier).map(|t| t.text.as_str()), Ok("b"));
        assert_eq!(parser.peek_next(), None);
        assert_eq!(parser.chomp(), None);
        assert_eq!(parser.chomp(), None);
        assert!(parser.current().kind.is_end_of_file());
    }

    #[test]
    fn expect_reports_both_kinds() {
        let stream = lex("x", "test.hz");
        let mut parser = Parser::new(&stream);

        assert_eq!(
            parser.expect(TokenKind::Semicolon),
            Err(Error::Syntax {
                message: "expected `;`, got `IDENTIFIER`".into(),
                location: Location::new(1, 1, "test.hz"),
            })
        );
    }

    #[test]
    fn illegal_token_is_a_lexer_error() {
        assert_eq!(
            parse(&lex("x = \"abc", "test.hz")),
            Err(Error::Lexer {
                message: "unterminated string literal".into(),
                location: Location::new(1, 5, "test.hz"),
            })
        );
    }

    #[rstest::rstest]
    #[case::parentheses(format!("x = {}1{};", "(".repeat(300), ")".repeat(300)))]
    #[case::prefix_operators(format!("x = {}y;", "!".repeat(300)))]
    #[case::blocks(format!("{}{}", "{".repeat(300), "}".repeat(300)))]
    #[case::optional_types(format!("{}int x;", "?".repeat(300)))]
    #[case::init_lists(format!("x = {}1{};", "{".repeat(300), "}".repeat(300)))]
    fn deep_nesting_is_a_syntax_error(#[case] source: String) {
        let (message, _) = failure(&source);

        assert_eq!(message, "nested too deeply (maximum 64 levels)");
    }

    #[test]
    fn moderate_nesting_parses() {
        let source = format!("x = {}1{};", "(".repeat(40), ")".repeat(40));

        assert_eq!(render(&source), Ok("(= x 1)".to_string()));
        assert_eq!(
            render(&format!("{}{}", "{".repeat(40), "}".repeat(40))).map(|tree| !tree.is_empty()),
            Ok(true)
        );
    }

    #[test]
    fn empty_unit() {
        let root = parse(&lex("// nothing here\n", "test.hz"));

        assert_eq!(root, Ok(Node::new(1, Kind::Root { items: vec![] })));
    }

    #[test]
    fn anchors_point_into_the_token_stream() {
        let stream = lex("// c\nx = 1 + 2;", "test.hz");
        let root = parse(&stream).ok();
        let Some(Node {
            kind: Kind::Root { items },
            ..
        }) = root
        else {
            panic!("expected root");
        };

        assert_eq!(stream[items[0].token].kind, TokenKind::Assign);
        let Kind::BinaryOpExpr { lhs, rhs, .. } = &items[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(stream[lhs.token].text, "x");
        assert_eq!(stream[rhs.token].kind, TokenKind::Plus);
    }
}
