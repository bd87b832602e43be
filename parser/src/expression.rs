use node::{ArrayTypeKind, BinaryOp, IntBase, Kind, Node, PrefixOp, StringForm};

use crate::{Parser, Production, error::Error, lexer::token::TokenKind};

/// 同じ優先順位の演算子を何回まで連ねられるか
#[derive(Debug, PartialEq, Clone, Copy)]
enum Chain {
    Once,
    Infinite,
}

type OperatorParser<'a> = fn(&mut Parser<'a>) -> Option<BinaryOp>;

// 優先順位の低い順
//
//   Expr           := TRY* BoolAndExpr
//   BoolAndExpr    := BoolOrExpr (AND BoolOrExpr)*
//   BoolOrExpr     := ComparisonExpr (OR ComparisonExpr)*
//   ComparisonExpr := CatchExpr (ComparisonOp CatchExpr)?
//   CatchExpr      := BitwiseExpr (CATCH Payload? (Block | BitwiseExpr))*
//   BitwiseExpr    := BitshiftExpr (BitwiseOp BitshiftExpr)*
//   BitshiftExpr   := AdditionExpr (BitshiftOp AdditionExpr)*
//   AdditionExpr   := MultiplyExpr (AdditionOp MultiplyExpr)*
//   MultiplyExpr   := PrefixExpr (MultiplyOp PrefixExpr)*
//   PrefixExpr     := PrefixOp* PrimaryExpr
impl<'a> Parser<'a> {
    pub(crate) fn expr(&mut self) -> Result<Option<Node>, Error> {
        self.nested(Self::try_expr)
    }

    fn try_expr(&mut self) -> Result<Option<Node>, Error> {
        let mut tries = vec![];
        while let Some(at) = self.accept(TokenKind::Try) {
            tries.push(at);
        }

        let Some(mut expr) = self.bool_and_expr()? else {
            return match tries.is_empty() {
                true => Ok(None),
                false => Err(self.expected("expression")),
            };
        };

        while let Some(at) = tries.pop() {
            expr = Node::new(
                at,
                Kind::PrefixOpExpr {
                    op: PrefixOp::Try,
                    operand: expr.boxed(),
                },
            );
        }

        Ok(Some(expr))
    }

    pub(crate) fn assignment_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::assignment_op, Self::expr, Chain::Once)
    }

    fn bool_and_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::bool_and_op, Self::bool_or_expr, Chain::Infinite)
    }

    fn bool_or_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::bool_or_op, Self::comparison_expr, Chain::Infinite)
    }

    fn comparison_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::comparison_op, Self::catch_expr, Chain::Once)
    }

    fn catch_expr(&mut self) -> Result<Option<Node>, Error> {
        let Some(mut lhs) = self.bitwise_expr()? else {
            return Ok(None);
        };

        while let Some(at) = self.accept(TokenKind::Catch) {
            let payload = self.payload()?;
            let rhs = match self.block(None)? {
                Some(block) => block,
                None => self.require(Self::bitwise_expr, "expression")?,
            };

            lhs = Node::new(
                at,
                Kind::CatchExpr {
                    lhs: lhs.boxed(),
                    payload,
                    rhs: rhs.boxed(),
                },
            );
        }

        Ok(Some(lhs))
    }

    /// `|name|`
    fn payload(&mut self) -> Result<Option<String>, Error> {
        if self.chomp_if(TokenKind::Pipe).is_none() {
            return Ok(None);
        }
        let name = self.expect(TokenKind::Identifier)?.text.clone();
        self.expect(TokenKind::Pipe)?;

        Ok(Some(name))
    }

    fn bitwise_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::bitwise_op, Self::bitshift_expr, Chain::Infinite)
    }

    fn bitshift_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::bitshift_op, Self::addition_expr, Chain::Infinite)
    }

    fn addition_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::addition_op, Self::multiply_expr, Chain::Infinite)
    }

    fn multiply_expr(&mut self) -> Result<Option<Node>, Error> {
        self.binary_op_expr(Self::multiply_op, Self::prefix_expr, Chain::Infinite)
    }

    /// 左オペランドを読み、演算子が続く限り右オペランドを読んで左結合の木を作る
    fn binary_op_expr(
        &mut self,
        operator: OperatorParser<'a>,
        child: Production<'a>,
        chain: Chain,
    ) -> Result<Option<Node>, Error> {
        let Some(mut lhs) = child(self)? else {
            return Ok(None);
        };

        loop {
            let at = self.current_index();
            let Some(op) = operator(self) else {
                break;
            };
            let rhs = self.require(child, "expression")?;

            lhs = Node::new(
                at,
                Kind::BinaryOpExpr {
                    op,
                    lhs: lhs.boxed(),
                    rhs: rhs.boxed(),
                },
            );

            if chain == Chain::Once {
                break;
            }
        }

        Ok(Some(lhs))
    }

    fn chomp_operator(&mut self, operator: fn(TokenKind) -> Option<BinaryOp>) -> Option<BinaryOp> {
        let op = operator(self.current().kind)?;
        self.chomp();

        Some(op)
    }

    fn assignment_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            kind if !kind.is_assignment_operator() => None,
            TokenKind::Assign => Some(BinaryOp::Assign),
            TokenKind::PlusAssign => Some(BinaryOp::AddAssign),
            TokenKind::MinusAssign => Some(BinaryOp::SubtractAssign),
            TokenKind::StarAssign => Some(BinaryOp::MultiplyAssign),
            TokenKind::SlashAssign => Some(BinaryOp::DivideAssign),
            TokenKind::PercentAssign => Some(BinaryOp::ModuloAssign),
            TokenKind::AndAssign => Some(BinaryOp::BitAndAssign),
            TokenKind::OrAssign => Some(BinaryOp::BitOrAssign),
            TokenKind::XorAssign => Some(BinaryOp::BitXorAssign),
            TokenKind::LBitshiftEquals => Some(BinaryOp::ShiftLeftAssign),
            TokenKind::RBitshiftEquals => Some(BinaryOp::ShiftRightAssign),
            _ => None,
        })
    }

    fn bool_and_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            TokenKind::AndAnd | TokenKind::And => Some(BinaryOp::BoolAnd),
            _ => None,
        })
    }

    fn bool_or_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            TokenKind::OrOr | TokenKind::Or => Some(BinaryOp::BoolOr),
            _ => None,
        })
    }

    fn comparison_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            kind if !kind.is_comparison_operator() => None,
            TokenKind::EqEq => Some(BinaryOp::Equal),
            TokenKind::NotEq => Some(BinaryOp::NotEqual),
            TokenKind::Lt => Some(BinaryOp::Less),
            TokenKind::Gt => Some(BinaryOp::Greater),
            TokenKind::Le => Some(BinaryOp::LessEqual),
            TokenKind::Ge => Some(BinaryOp::GreaterEqual),
            _ => None,
        })
    }

    fn bitwise_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            TokenKind::Ampersand => Some(BinaryOp::BitAnd),
            TokenKind::Pipe => Some(BinaryOp::BitOr),
            TokenKind::Caret => Some(BinaryOp::BitXor),
            TokenKind::AndNot => Some(BinaryOp::BitAndNot),
            TokenKind::OrElse => Some(BinaryOp::OrElse),
            _ => None,
        })
    }

    fn bitshift_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            TokenKind::LBitshift => Some(BinaryOp::ShiftLeft),
            TokenKind::RBitshift => Some(BinaryOp::ShiftRight),
            _ => None,
        })
    }

    fn addition_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Subtract),
            _ => None,
        })
    }

    fn multiply_op(&mut self) -> Option<BinaryOp> {
        self.chomp_operator(|kind| match kind {
            TokenKind::Star => Some(BinaryOp::Multiply),
            TokenKind::Slash => Some(BinaryOp::Divide),
            TokenKind::Percent => Some(BinaryOp::Modulo),
            _ => None,
        })
    }

    fn prefix_expr(&mut self) -> Result<Option<Node>, Error> {
        let op = match self.current().kind {
            TokenKind::Not => PrefixOp::BoolNot,
            TokenKind::Bang => PrefixOp::Negation,
            TokenKind::Ampersand => PrefixOp::AddressOf,
            TokenKind::Try => PrefixOp::Try,
            TokenKind::Minus => PrefixOp::Minus,
            TokenKind::Tilde => PrefixOp::BitNot,
            _ => return self.primary_expr(),
        };
        let at = self.current_index();
        self.chomp();

        let operand = self.nested(|parser| parser.require(Self::prefix_expr, "expression"))?;

        Ok(Some(Node::new(
            at,
            Kind::PrefixOpExpr {
                op,
                operand: operand.boxed(),
            },
        )))
    }

    fn primary_expr(&mut self) -> Result<Option<Node>, Error> {
        match self.current().kind {
            TokenKind::LBrace => self.init_list(),
            _ => self.suffix_expr(),
        }
    }

    /// `{a, b, c}` / `{}`
    fn init_list(&mut self) -> Result<Option<Node>, Error> {
        let Some(at) = self.accept(TokenKind::LBrace) else {
            return Ok(None);
        };

        let mut elements = vec![];
        while self.chomp_if(TokenKind::RBrace).is_none() {
            elements.push(self.require(Self::expr, "expression")?);
            if self.chomp_if(TokenKind::Comma).is_none() {
                self.expect(TokenKind::RBrace)?;
                break;
            }
        }

        Ok(Some(Node::new(at, Kind::ArrayInit { elements })))
    }

    /// 後置のフィールドアクセス・添字・スライス・関数呼び出し
    fn suffix_expr(&mut self) -> Result<Option<Node>, Error> {
        let Some(mut expr) = self.primary_type_expr()? else {
            return Ok(None);
        };

        loop {
            let at = self.current_index();
            let kind = match self.current().kind {
                TokenKind::Dot => {
                    self.chomp();
                    let field = self.expect(TokenKind::Identifier)?.text.clone();

                    Kind::FieldAccess {
                        target: expr.boxed(),
                        field,
                    }
                }
                TokenKind::LBracket => {
                    self.chomp();
                    let start = self.require(Self::expr, "expression")?;

                    if self.chomp_if(TokenKind::DotDot).is_some() {
                        let end = self.require(Self::expr, "expression")?;
                        let sentinel = match self.chomp_if(TokenKind::Colon) {
                            Some(_) => Some(self.require(Self::expr, "expression")?.boxed()),
                            None => None,
                        };
                        self.expect(TokenKind::RBracket)?;

                        Kind::SliceExpr {
                            target: expr.boxed(),
                            start: start.boxed(),
                            end: end.boxed(),
                            sentinel,
                        }
                    } else {
                        self.expect(TokenKind::RBracket)?;

                        Kind::ArrayAccess {
                            target: expr.boxed(),
                            index: start.boxed(),
                        }
                    }
                }
                TokenKind::LParen => {
                    self.chomp();
                    let args = self.call_args()?;

                    Kind::FuncCallExpr {
                        callee: expr.boxed(),
                        args,
                    }
                }
                _ => break,
            };

            expr = Node::new(at, kind);
        }

        Ok(Some(expr))
    }

    /// `(` の直後から `)` まで
    fn call_args(&mut self) -> Result<Vec<Node>, Error> {
        let mut args = vec![];

        while self.chomp_if(TokenKind::RParen).is_none() {
            args.push(self.require(Self::expr, "expression")?);
            if self.chomp_if(TokenKind::Comma).is_none() {
                self.expect(TokenKind::RParen)?;
                break;
            }
        }

        Ok(args)
    }

    fn primary_type_expr(&mut self) -> Result<Option<Node>, Error> {
        let at = self.current_index();
        let token = self.current();
        let text = || token.text.clone();

        let kind = match token.kind {
            TokenKind::RuneLit => Kind::CharLiteral { text: text() },
            TokenKind::FloatLit => Kind::FloatLiteral {
                text: text(),
                imaginary: false,
            },
            TokenKind::ImagLit => Kind::FloatLiteral {
                text: text(),
                imaginary: true,
            },
            TokenKind::IntegerDec => int_literal(text(), IntBase::Decimal),
            TokenKind::IntegerBin => int_literal(text(), IntBase::Binary),
            TokenKind::IntegerHex => int_literal(text(), IntBase::Hexadecimal),
            TokenKind::IntegerOct => int_literal(text(), IntBase::Octal),
            TokenKind::StringLit => string_literal(text(), StringForm::Plain),
            TokenKind::RawStringLit => string_literal(text(), StringForm::Raw),
            TokenKind::TripleStringLit => string_literal(text(), StringForm::Triple),
            TokenKind::Identifier => Kind::Identifier { name: text() },
            TokenKind::True => Kind::BoolLiteral { value: true },
            TokenKind::False => Kind::BoolLiteral { value: false },
            TokenKind::Nil => Kind::NilLiteral,
            TokenKind::Unreachable => Kind::Unreachable,
            TokenKind::Macro => Kind::Builtin { name: text() },
            TokenKind::Func => {
                let prototype = self.func_prototype(false, false)?;
                return match self.block(None)? {
                    Some(body) => Ok(Some(Node::new(
                        at,
                        Kind::FuncDef {
                            prototype: prototype.boxed(),
                            body: body.boxed(),
                        },
                    ))),
                    None => Ok(Some(prototype)),
                };
            }
            TokenKind::Match => return self.match_expr().map(Some),
            TokenKind::LParen => {
                self.chomp();
                let inner = self.require(Self::expr, "expression")?;
                self.expect(TokenKind::RParen)?;
                return Ok(Some(inner));
            }
            _ => return Ok(None),
        };
        self.chomp();

        Ok(Some(Node::new(at, kind)))
    }

    /// TypeExpr := PrefixTypeOp* SuffixExpr
    pub(crate) fn type_expr(&mut self) -> Result<Option<Node>, Error> {
        let at = self.current_index();

        if self.chomp_if(TokenKind::Question).is_some() {
            let child = self.nested(|parser| parser.require(Self::type_expr, "type"))?;
            return Ok(Some(Node::new(
                at,
                Kind::OptionalType {
                    child: child.boxed(),
                },
            )));
        }

        if self.chomp_if(TokenKind::LBracket).is_none() {
            return self.suffix_expr();
        }

        let (kind, size) = if self.current().kind == TokenKind::RBracket {
            (ArrayTypeKind::Slice, None)
        } else if self.current().kind == TokenKind::Identifier
            && self.current().text == "_"
            && matches!(
                self.peek_next().map(|t| t.kind),
                Some(TokenKind::RBracket | TokenKind::Colon)
            )
        {
            self.chomp();
            (ArrayTypeKind::Inferred, None)
        } else {
            let size = self.require(Self::expr, "array length")?;
            (ArrayTypeKind::Sized, Some(size.boxed()))
        };

        let sentinel = match (kind, self.chomp_if(TokenKind::Colon)) {
            (ArrayTypeKind::Slice, _) | (_, None) => None,
            (_, Some(_)) => Some(self.require(Self::expr, "expression")?.boxed()),
        };
        self.expect(TokenKind::RBracket)?;

        let element = self.nested(|parser| parser.require(Self::type_expr, "type"))?;

        Ok(Some(Node::new(
            at,
            Kind::ArrayType {
                kind,
                size,
                sentinel,
                element: element.boxed(),
            },
        )))
    }
}

fn int_literal(text: String, base: IntBase) -> Kind {
    Kind::IntLiteral { text, base }
}

fn string_literal(text: String, form: StringForm) -> Kind {
    Kind::StringLiteral { text, form }
}

#[cfg(test)]
mod tests {
    use crate::lex;
    use crate::tests::{failure, render};
    use pretty_assertions::assert_eq;

    fn expr(source: &str) -> String {
        match render(&format!("{source};")) {
            Ok(tree) => tree,
            Err(e) => panic!("{source}: {e}"),
        }
    }

    #[rstest::rstest]
    #[case("1 + 2 - 3", "(- (+ 1 2) 3)")]
    #[case("1 - 2 - 3 - 4", "(- (- (- 1 2) 3) 4)")]
    #[case("1 + 2 * 3", "(+ 1 (* 2 3))")]
    #[case("a * b & c", "(& (* a b) c)")]
    #[case("a & b * c", "(& a (* b c))")]
    #[case("a << 1 + 2", "(<< a (+ 1 2))")]
    #[case("a | b ^ c &^ d", "(&^ (^ (| a b) c) d)")]
    #[case("a == b", "(== a b)")]
    #[case("a + 1 >= b * 2", "(>= (+ a 1) (* b 2))")]
    #[case("a < b && c > d", "(and (< a b) (> c d))")]
    #[case("a and b or c", "(and a (or b c))")]
    #[case("a || b && c || d", "(and (or a b) (or c d))")]
    #[case("x = y + 1", "(= x (+ y 1))")]
    #[case("x <<= 2", "(<<= x 2)")]
    #[case("total %= n", "(%= total n)")]
    #[case("a orelse b", "(orelse a b)")]
    fn binary_precedence_and_associativity(#[case] source: &str, #[case] want: &str) {
        assert_eq!(expr(source), want);
    }

    #[rstest::rstest]
    fn assignment_band_operators(
        #[values("=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=")] op: &str,
    ) {
        assert!(lex(op, "test.hz")[0].kind.is_assignment_operator());
        assert_eq!(expr(&format!("x {op} y")), format!("({op} x y)"));
    }

    #[rstest::rstest]
    fn comparison_band_operators(#[values("==", "!=", "<", ">", "<=", ">=")] op: &str) {
        assert!(lex(op, "test.hz")[0].kind.is_comparison_operator());
        assert_eq!(expr(&format!("x {op} y")), format!("({op} x y)"));
    }

    #[rstest::rstest]
    #[case("not done", "(not done)")]
    #[case("!flag", "(! flag)")]
    #[case("&value", "(& value)")]
    #[case("-x * 2", "(* (- x) 2)")]
    #[case("~mask", "(~ mask)")]
    #[case("!!x", "(! (! x))")]
    #[case("try open(path)", "(try (call open path))")]
    #[case("try a + b", "(try (+ a b))")]
    #[case("a + try b", "(+ a (try b))")]
    #[case("try try f()", "(try (try (call f)))")]
    fn prefix_operators(#[case] source: &str, #[case] want: &str) {
        assert_eq!(expr(source), want);
    }

    #[rstest::rstest]
    #[case("f()", "(call f)")]
    #[case("f(1, x + 2)", "(call f 1 (+ x 2))")]
    #[case("f(1,)", "(call f 1)")]
    #[case("point.x", "(. point x)")]
    #[case("a.b.c", "(. (. a b) c)")]
    #[case("xs[0]", "(index xs 0)")]
    #[case("xs[1..n]", "(slice xs 1 n)")]
    #[case("buf[0..len:0]", "(slice buf 0 len 0)")]
    #[case("obj.items[i].name()", "(call (. (index (. obj items) i) name))")]
    #[case("(1 + 2) * 3", "(* (+ 1 2) 3)")]
    fn suffix_expressions(#[case] source: &str, #[case] want: &str) {
        assert_eq!(expr(source), want);
    }

    #[rstest::rstest]
    #[case("42", "42")]
    #[case("0xFF", "0xFF")]
    #[case("2.5", "2.5")]
    #[case("3j", "3j")]
    #[case("'c'", "'c'")]
    #[case("\"hi\"", "\"hi\"")]
    #[case("`raw`", "`raw`")]
    #[case("true", "true")]
    #[case("nil", "nil")]
    #[case("unreachable", "unreachable")]
    #[case("@sizeof(int)", "(call @sizeof int)")]
    #[case("x = {1, 2, 3,}", "(= x (init 1 2 3))")]
    #[case("x = {}", "(= x (init))")]
    #[case("x = {{1}, {2}}", "(= x (init (init 1) (init 2)))")]
    fn primaries(#[case] source: &str, #[case] want: &str) {
        assert_eq!(expr(source), want);
    }

    #[test]
    fn literal_nodes_keep_their_base() {
        use node::{IntBase, Kind};

        let stream = crate::lex("0b11;", "test.hz");
        let root = crate::parse(&stream).ok().map(|root| root.kind);
        let Some(Kind::Root { items }) = root else {
            panic!("expected root");
        };

        assert_eq!(
            items[0].kind,
            Kind::IntLiteral {
                text: "0b11".into(),
                base: IntBase::Binary
            }
        );
    }

    #[rstest::rstest]
    #[case("add = func(int a, int b) int { return a + b; };", "(= add (def (func ((int a) (int b)) int) (block (return (+ a b)))))")]
    #[case("cb = func() void;", "(= cb (func () void))")]
    #[case("x = f() catch 0;", "(= x (catch (call f) 0))")]
    #[case("x = f() catch |err| { raise err; };", "(= x (catch (call f) |err| (block (raise err))))")]
    #[case("ok = a catch b == c;", "(= ok (== (catch a b) c))")]
    fn function_literals_and_catch(#[case] source: &str, #[case] want: &str) {
        assert_eq!(render(source).map_err(|e| e.to_string()), Ok(want.to_string()));
    }

    #[rstest::rstest]
    // 比較演算子は連結できない
    #[case("a < b < c;", ("expected `;`, got `<`".to_string(), (1, 7)))]
    #[case("1 + ;", ("expected expression, got `;`".to_string(), (1, 5)))]
    #[case("f(1 2);", ("expected `)`, got `INTEGER`".to_string(), (1, 5)))]
    #[case("xs[1..];", ("expected expression, got `]`".to_string(), (1, 7)))]
    #[case("a.1;", ("expected `IDENTIFIER`, got `INTEGER`".to_string(), (1, 3)))]
    #[case("x = (1 + 2;", ("expected `)`, got `;`".to_string(), (1, 11)))]
    #[case("try;", ("expected expression, got `;`".to_string(), (1, 4)))]
    #[case("x = {1 2};", ("expected `}`, got `INTEGER`".to_string(), (1, 8)))]
    #[case("x = f() catch |e {};", ("expected `|`, got `{`".to_string(), (1, 18)))]
    // 代入の帯にあっても対応する演算がない
    #[case("x ~= 1;", ("expected `;`, got `~=`".to_string(), (1, 3)))]
    fn expression_errors(#[case] source: &str, #[case] want: (String, (u32, u32))) {
        assert_eq!(failure(source), want);
    }
}
