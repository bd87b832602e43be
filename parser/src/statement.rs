use node::{EnumVariant, Kind, MatchBranch, MatchItem, Node, Param};

use crate::{Parser, error::Error, lexer::token::TokenKind};

impl<'a> Parser<'a> {
    /// Statement := ContainerDecl | VarDecl | DeferStmt | IfExpr | LabeledStatement
    ///            | MatchExpr | BreakStmt | ContinueStmt | ReturnStmt | RaiseStmt
    ///            | AssignmentExpr SEMICOLON
    pub(crate) fn statement(&mut self) -> Result<Option<Node>, Error> {
        self.nested(Self::any_statement)
    }

    fn any_statement(&mut self) -> Result<Option<Node>, Error> {
        if let Some(decl) = self.container_decl()? {
            return Ok(Some(decl));
        }
        if let Some(decl) = self.var_decl()? {
            return Ok(Some(decl));
        }

        match self.current().kind {
            TokenKind::Defer => return self.defer_statement().map(Some),
            TokenKind::If => return self.if_expr().map(Some),
            TokenKind::Match => {
                let expr = self.match_expr()?;
                self.chomp_if(TokenKind::Semicolon);
                return Ok(Some(expr));
            }
            TokenKind::Break => return self.break_statement().map(Some),
            TokenKind::Continue => return self.continue_statement().map(Some),
            TokenKind::Return => return self.return_statement().map(Some),
            TokenKind::Raise => return self.raise_statement().map(Some),
            _ => {}
        }

        if let Some(statement) = self.labeled_statement()? {
            return Ok(Some(statement));
        }

        let Some(expr) = self.assignment_expr()? else {
            return Ok(None);
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Some(expr))
    }

    /// 関数・構造体・共用体・列挙型の宣言
    fn container_decl(&mut self) -> Result<Option<Node>, Error> {
        let next = self.peek_next().map(|t| t.kind);

        match (self.current().kind, next) {
            (TokenKind::Func, _) | (TokenKind::Export | TokenKind::Extern, Some(TokenKind::Func)) => {
                self.func_decl().map(Some)
            }
            (TokenKind::Struct | TokenKind::Union, _)
            | (TokenKind::Export, Some(TokenKind::Struct | TokenKind::Union)) => {
                self.struct_decl().map(Some)
            }
            (TokenKind::Enum, _) | (TokenKind::Export, Some(TokenKind::Enum)) => {
                self.enum_decl().map(Some)
            }
            _ => Ok(None),
        }
    }

    /// (EXPORT | EXTERN)? FuncProto (Block | SEMICOLON)
    fn func_decl(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        let is_export = self.chomp_if(TokenKind::Export).is_some();
        let is_extern = self.chomp_if(TokenKind::Extern).is_some();

        let prototype = self.func_prototype(is_export, is_extern)?;

        match self.block(None)? {
            Some(body) => Ok(Node::new(
                at,
                Kind::FuncDef {
                    prototype: prototype.boxed(),
                    body: body.boxed(),
                },
            )),
            None => {
                self.expect(TokenKind::Semicolon)?;
                Ok(prototype)
            }
        }
    }

    /// FUNC IDENTIFIER? LPAREN ParamList RPAREN TypeExpr
    pub(crate) fn func_prototype(&mut self, is_export: bool, is_extern: bool) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Func)?;

        let name = self
            .chomp_if(TokenKind::Identifier)
            .map(|token| token.text.clone());
        self.expect(TokenKind::LParen)?;
        let params = self.param_list()?;
        self.expect(TokenKind::RParen)?;

        let Some(return_type) = self.type_expr()? else {
            return Err(self.expected("return type"));
        };

        Ok(Node::new(
            at,
            Kind::FuncPrototype {
                name,
                params,
                return_type: return_type.boxed(),
                is_export,
                is_extern,
            },
        ))
    }

    /// 可変長引数 (`T... name`) は最後の引数のみ
    fn param_list(&mut self) -> Result<Vec<Param>, Error> {
        let mut params = vec![];

        loop {
            let at = self.current_index();
            let Some(param_type) = self.type_expr()? else {
                break;
            };
            let variadic = self.chomp_if(TokenKind::Ellipsis).is_some();
            let name = self.expect(TokenKind::Identifier)?.text.clone();

            params.push(Param {
                token: at,
                name,
                param_type,
                variadic,
            });

            if variadic || self.chomp_if(TokenKind::Comma).is_none() {
                break;
            }
        }

        Ok(params)
    }

    /// EXPORT? (STRUCT | UNION) IDENTIFIER LBRACE TypeField* RBRACE
    fn struct_decl(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        let is_export = self.chomp_if(TokenKind::Export).is_some();
        let is_union = self.chomp_if(TokenKind::Union).is_some();
        if !is_union {
            self.expect(TokenKind::Struct)?;
        }
        let name = self.expect(TokenKind::Identifier)?.text.clone();
        self.expect(TokenKind::LBrace)?;

        let mut fields = vec![];
        while self.chomp_if(TokenKind::RBrace).is_none() {
            fields.push(self.type_field()?);
        }

        Ok(Node::new(
            at,
            Kind::StructDecl {
                name,
                is_export,
                is_union,
                fields,
            },
        ))
    }

    /// TypeExpr IDENTIFIER (EQUALS Expr)? SEMICOLON
    fn type_field(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        let Some(field_type) = self.type_expr()? else {
            return Err(self.expected_token(TokenKind::RBrace));
        };
        let name = self.expect(TokenKind::Identifier)?.text.clone();
        let default = match self.chomp_if(TokenKind::Assign) {
            Some(_) => Some(self.require(Self::expr, "expression")?.boxed()),
            None => None,
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(
            at,
            Kind::TypeField {
                name,
                field_type: field_type.boxed(),
                default,
            },
        ))
    }

    /// EXPORT? ENUM IDENTIFIER LBRACE EnumVariant (COMMA EnumVariant)* COMMA? RBRACE
    fn enum_decl(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        let is_export = self.chomp_if(TokenKind::Export).is_some();
        self.expect(TokenKind::Enum)?;
        let name = self.expect(TokenKind::Identifier)?.text.clone();
        self.expect(TokenKind::LBrace)?;

        let mut variants = vec![];
        loop {
            let token = self.current_index();
            let name = self.expect(TokenKind::Identifier)?.text.clone();
            let value = match self.chomp_if(TokenKind::Assign) {
                Some(_) => Some(self.require(Self::expr, "expression")?),
                None => None,
            };
            variants.push(EnumVariant { token, name, value });

            if self.chomp_if(TokenKind::Comma).is_none() {
                self.expect(TokenKind::RBrace)?;
                break;
            }
            if self.chomp_if(TokenKind::RBrace).is_some() {
                break;
            }
        }

        Ok(Node::new(
            at,
            Kind::EnumDecl {
                name,
                is_export,
                variants,
            },
        ))
    }

    /// VarDecl := EXPORT? (MUTABLE | CONST)* TypeExpr? IDENTIFIER (EQUALS Expr)? SEMICOLON
    ///
    /// 修飾子がない場合は `T name` のように識別子が2つ並ぶか、`?` `[` で始まる型の場合のみ
    fn var_decl(&mut self) -> Result<Option<Node>, Error> {
        let next = self.peek_next().map(|t| t.kind);
        let starts = match self.current().kind {
            TokenKind::Export | TokenKind::Mutable | TokenKind::Const => true,
            TokenKind::Question | TokenKind::LBracket => true,
            TokenKind::Identifier => next == Some(TokenKind::Identifier),
            _ => false,
        };
        if !starts {
            return Ok(None);
        }

        let at = self.current_index();
        let is_export = self.chomp_if(TokenKind::Export).is_some();
        let (mut is_mutable, mut is_const) = (false, false);
        loop {
            match self.current().kind {
                TokenKind::Mutable => is_mutable = true,
                TokenKind::Const => is_const = true,
                _ => break,
            }
            self.chomp();
        }
        if is_mutable && is_const {
            return Err(self.syntax_error("a variable cannot be both `mutable` and `const`"));
        }

        let next = self.peek_next().map(|t| t.kind);
        let var_type = match (self.current().kind, next) {
            (TokenKind::Identifier, Some(TokenKind::Assign | TokenKind::Semicolon)) => None,
            _ => Some(self.require(Self::type_expr, "type")?.boxed()),
        };
        let name = self.expect(TokenKind::Identifier)?.text.clone();
        let init = match self.chomp_if(TokenKind::Assign) {
            Some(_) => Some(self.require(Self::expr, "expression")?.boxed()),
            None => None,
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(Some(Node::new(
            at,
            Kind::VarDecl {
                name,
                var_type,
                init,
                is_export,
                is_mutable,
                is_const,
            },
        )))
    }

    /// DEFER (Block | AssignmentExpr SEMICOLON)
    fn defer_statement(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Defer)?;
        let body = self.block_or_expression_statement()?;

        Ok(Node::new(at, Kind::Defer { body: body.boxed() }))
    }

    /// IF LPAREN Expr RPAREN Body (ELSE Statement | ELSEIF ...)?
    fn if_expr(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        if self.chomp_if(TokenKind::ElseIf).is_none() {
            self.expect(TokenKind::If)?;
        }
        self.expect(TokenKind::LParen)?;
        let condition = self.require(Self::expr, "expression")?;
        self.expect(TokenKind::RParen)?;

        let then_body = self.block_or_expression_statement()?;

        let else_body = if self.chomp_if(TokenKind::Else).is_some() {
            Some(self.require(Self::statement, "statement")?.boxed())
        } else if self.current().kind == TokenKind::ElseIf {
            Some(self.if_expr()?.boxed())
        } else {
            None
        };

        Ok(Node::new(
            at,
            Kind::IfExpr {
                condition: condition.boxed(),
                then_body: then_body.boxed(),
                else_body,
            },
        ))
    }

    fn block_or_expression_statement(&mut self) -> Result<Node, Error> {
        if let Some(block) = self.block(None)? {
            return Ok(block);
        }
        let expr = self.require(Self::assignment_expr, "expression")?;
        self.expect(TokenKind::Semicolon)?;

        Ok(expr)
    }

    /// LBRACE Statement* RBRACE
    pub(crate) fn block(&mut self, label: Option<String>) -> Result<Option<Node>, Error> {
        let Some(at) = self.accept(TokenKind::LBrace) else {
            return Ok(None);
        };

        let mut statements = vec![];
        while self.chomp_if(TokenKind::RBrace).is_none() {
            match self.statement()? {
                Some(statement) => statements.push(statement),
                None => return Err(self.expected_token(TokenKind::RBrace)),
            }
        }

        Ok(Some(Node::new(at, Kind::Block { label, statements })))
    }

    /// BlockLabel? (Block | LoopStatement)
    fn labeled_statement(&mut self) -> Result<Option<Node>, Error> {
        let label = self.block_label()?;

        if let Some(block) = self.block(label.clone())? {
            return Ok(Some(block));
        }
        if let Some(statement) = self.loop_statement(label.clone())? {
            return Ok(Some(statement));
        }

        match label {
            Some(_) => Err(self.expected("block or loop after label")),
            None => Ok(None),
        }
    }

    /// IDENTIFIER COLON
    fn block_label(&mut self) -> Result<Option<String>, Error> {
        if self.current().kind != TokenKind::Identifier {
            return Ok(None);
        }

        let name = self.chomp().map(|token| token.text.clone());
        if self.chomp_if(TokenKind::Colon).is_some() {
            return Ok(name);
        }
        self.put_back()?;

        Ok(None)
    }

    fn loop_statement(&mut self, label: Option<String>) -> Result<Option<Node>, Error> {
        match self.current().kind {
            TokenKind::For => self.for_statement(label).map(Some),
            TokenKind::While => self.while_statement(label).map(Some),
            _ => Ok(None),
        }
    }

    /// FOR Block
    /// | FOR LPAREN IDENTIFIER IN Expr RPAREN Block
    /// | FOR LPAREN Init? SEMICOLON Expr? SEMICOLON AssignmentExpr? RPAREN Block
    /// | FOR LPAREN Expr RPAREN Block
    fn for_statement(&mut self, label: Option<String>) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::For)?;

        if let Some(body) = self.block(None)? {
            return Ok(Node::new(
                at,
                Kind::ForExpr {
                    label,
                    condition: None,
                    body: body.boxed(),
                },
            ));
        }

        self.expect(TokenKind::LParen)?;

        if self.current().kind == TokenKind::Identifier
            && self.peek_next().map(|t| t.kind) == Some(TokenKind::In)
        {
            let binding = self.current().text.clone();
            self.chomp();
            self.chomp();
            let iterable = self.require(Self::expr, "expression")?;
            self.expect(TokenKind::RParen)?;
            let body = self.expect_block()?;

            return Ok(Node::new(
                at,
                Kind::ForInExpr {
                    label,
                    binding,
                    iterable: iterable.boxed(),
                    body: body.boxed(),
                },
            ));
        }

        let init = match self.var_decl()? {
            Some(decl) => Some(decl),
            None if self.chomp_if(TokenKind::Semicolon).is_some() => None,
            None => {
                let expr = self.require(Self::assignment_expr, "expression")?;
                if self.chomp_if(TokenKind::Semicolon).is_none() {
                    self.expect(TokenKind::RParen)?;
                    let body = self.expect_block()?;

                    return Ok(Node::new(
                        at,
                        Kind::ForExpr {
                            label,
                            condition: Some(expr.boxed()),
                            body: body.boxed(),
                        },
                    ));
                }
                Some(expr)
            }
        };

        let condition = self.expr()?;
        self.expect(TokenKind::Semicolon)?;
        let step = self.assignment_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.expect_block()?;

        Ok(Node::new(
            at,
            Kind::ForCExpr {
                label,
                init: init.map(Node::boxed),
                condition: condition.map(Node::boxed),
                step: step.map(Node::boxed),
                body: body.boxed(),
            },
        ))
    }

    /// WHILE LPAREN Expr RPAREN Block
    fn while_statement(&mut self, label: Option<String>) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.require(Self::expr, "expression")?;
        self.expect(TokenKind::RParen)?;
        let body = self.expect_block()?;

        Ok(Node::new(
            at,
            Kind::ForExpr {
                label,
                condition: Some(condition.boxed()),
                body: body.boxed(),
            },
        ))
    }

    fn expect_block(&mut self) -> Result<Node, Error> {
        match self.block(None)? {
            Some(block) => Ok(block),
            None => Err(self.expected_token(TokenKind::LBrace)),
        }
    }

    /// MATCH LPAREN? Expr RPAREN? LBRACE MatchBranch (COMMA MatchBranch)* COMMA? RBRACE
    pub(crate) fn match_expr(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Match)?;

        let parenthesized = self.chomp_if(TokenKind::LParen).is_some();
        let subject = self.require(Self::expr, "expression")?;
        if parenthesized {
            self.expect(TokenKind::RParen)?;
        }
        self.expect(TokenKind::LBrace)?;

        let mut branches = vec![];
        loop {
            branches.push(self.match_branch()?);

            if self.chomp_if(TokenKind::Comma).is_none() {
                self.expect(TokenKind::RBrace)?;
                break;
            }
            if self.chomp_if(TokenKind::RBrace).is_some() {
                break;
            }
        }

        Ok(Node::new(
            at,
            Kind::MatchExpr {
                subject: subject.boxed(),
                branches,
            },
        ))
    }

    /// CASE? (MatchItem (COMMA MatchItem)* | ELSE | DEFAULT) (COLON | FATARROW) (Block | AssignmentExpr)
    fn match_branch(&mut self) -> Result<MatchBranch, Error> {
        let token = self.current_index();
        self.chomp_if(TokenKind::Case);

        let mut items = vec![];
        if self.chomp_if(TokenKind::Else).is_none() && self.chomp_if(TokenKind::Default).is_none() {
            loop {
                items.push(self.match_item()?);
                if self.chomp_if(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        if self.chomp_if(TokenKind::Colon).is_none() && self.chomp_if(TokenKind::FatArrow).is_none()
        {
            return Err(self.expected("`:` or `=>`"));
        }

        let body = match self.block(None)? {
            Some(block) => block,
            None => self.require(Self::assignment_expr, "expression")?,
        };

        Ok(MatchBranch { token, items, body })
    }

    /// Expr (ELLIPSIS Expr)?
    fn match_item(&mut self) -> Result<MatchItem, Error> {
        let start = self.require(Self::expr, "expression")?;

        if self.chomp_if(TokenKind::Ellipsis).is_none() {
            return Ok(MatchItem::Single { value: start });
        }
        let end = self.require(Self::expr, "expression")?;

        Ok(MatchItem::Range { start, end })
    }

    /// COLON IDENTIFIER
    fn break_label(&mut self) -> Result<Option<String>, Error> {
        if self.chomp_if(TokenKind::Colon).is_none() {
            return Ok(None);
        }

        Ok(Some(self.expect(TokenKind::Identifier)?.text.clone()))
    }

    fn break_statement(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Break)?;
        let label = self.break_label()?;
        let value = self.expr()?.map(Node::boxed);
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(at, Kind::Break { label, value }))
    }

    fn continue_statement(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Continue)?;
        let label = self.break_label()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(at, Kind::Continue { label }))
    }

    fn return_statement(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Return)?;
        let value = self.expr()?.map(Node::boxed);
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(at, Kind::Return { value }))
    }

    fn raise_statement(&mut self) -> Result<Node, Error> {
        let at = self.current_index();
        self.expect(TokenKind::Raise)?;
        let value = self.require(Self::expr, "expression")?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Node::new(
            at,
            Kind::Raise {
                value: value.boxed(),
            },
        ))
    }
}
