use std::fmt;

use serde::Serialize;

pub use crate::op::{BinaryOp, PrefixOp};

mod op;

/// 構文木のノード
/// `token` は位置情報の基準となるトークンのトークン列上の添字
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Node {
    pub token: usize,
    #[serde(flatten)]
    pub kind: Kind,
}

impl Node {
    pub fn new(token: usize, kind: Kind) -> Self {
        Self { token, kind }
    }

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntBase {
    Decimal,
    Binary,
    Hexadecimal,
    Octal,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringForm {
    Plain,
    Raw,
    Triple,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayTypeKind {
    /// `[]T`
    Slice,
    /// `[_]T`
    Inferred,
    /// `[N]T`
    Sized,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Param {
    pub token: usize,
    pub name: String,
    pub param_type: Node,
    pub variadic: bool,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct EnumVariant {
    pub token: usize,
    pub name: String,
    pub value: Option<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum MatchItem {
    Single { value: Node },
    /// `start ... end`
    Range { start: Node, end: Node },
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct MatchBranch {
    pub token: usize,
    /// 空の場合は `else` / `default`
    pub items: Vec<MatchItem>,
    pub body: Node,
}

impl MatchBranch {
    pub fn is_default(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "node")]
pub enum Kind {
    Root {
        items: Vec<Node>,
    },
    Identifier {
        name: String,
    },
    Block {
        label: Option<String>,
        statements: Vec<Node>,
    },
    FuncPrototype {
        name: Option<String>,
        params: Vec<Param>,
        return_type: Box<Node>,
        is_export: bool,
        is_extern: bool,
    },
    FuncDef {
        prototype: Box<Node>,
        body: Box<Node>,
    },
    IntLiteral {
        text: String,
        base: IntBase,
    },
    FloatLiteral {
        text: String,
        imaginary: bool,
    },
    CharLiteral {
        text: String,
    },
    StringLiteral {
        text: String,
        form: StringForm,
    },
    BoolLiteral {
        value: bool,
    },
    NilLiteral,
    Unreachable,
    /// `@name`
    Builtin {
        name: String,
    },
    EnumDecl {
        name: String,
        is_export: bool,
        variants: Vec<EnumVariant>,
    },
    /// `struct` / `union`
    StructDecl {
        name: String,
        is_export: bool,
        is_union: bool,
        fields: Vec<Node>,
    },
    TypeField {
        name: String,
        field_type: Box<Node>,
        default: Option<Box<Node>>,
    },
    VarDecl {
        name: String,
        var_type: Option<Box<Node>>,
        init: Option<Box<Node>>,
        is_export: bool,
        is_mutable: bool,
        is_const: bool,
    },
    FuncCallExpr {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    FieldAccess {
        target: Box<Node>,
        field: String,
    },
    ArrayAccess {
        target: Box<Node>,
        index: Box<Node>,
    },
    SliceExpr {
        target: Box<Node>,
        start: Box<Node>,
        end: Box<Node>,
        sentinel: Option<Box<Node>>,
    },
    ArrayInit {
        elements: Vec<Node>,
    },
    IfExpr {
        condition: Box<Node>,
        then_body: Box<Node>,
        else_body: Option<Box<Node>>,
    },
    /// `for { }`、`for (cond) { }`、`while (cond) { }`
    ForExpr {
        label: Option<String>,
        condition: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForCExpr {
        label: Option<String>,
        init: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        step: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForInExpr {
        label: Option<String>,
        binding: String,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    MatchExpr {
        subject: Box<Node>,
        branches: Vec<MatchBranch>,
    },
    CatchExpr {
        lhs: Box<Node>,
        payload: Option<String>,
        rhs: Box<Node>,
    },
    BinaryOpExpr {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    PrefixOpExpr {
        op: PrefixOp,
        operand: Box<Node>,
    },
    /// `?T`
    OptionalType {
        child: Box<Node>,
    },
    ArrayType {
        kind: ArrayTypeKind,
        size: Option<Box<Node>>,
        sentinel: Option<Box<Node>>,
        element: Box<Node>,
    },
    Defer {
        body: Box<Node>,
    },
    Return {
        value: Option<Box<Node>>,
    },
    Raise {
        value: Box<Node>,
    },
    Break {
        label: Option<String>,
        value: Option<Box<Node>>,
    },
    Continue {
        label: Option<String>,
    },
}

/// S式として表示する
///
/// ```
/// use node::{BinaryOp, IntBase, Kind, Node};
///
/// let int = |token, text: &str| {
///     Node::new(token, Kind::IntLiteral { text: text.into(), base: IntBase::Decimal })
/// };
/// let sum = Node::new(
///     1,
///     Kind::BinaryOpExpr { op: BinaryOp::Add, lhs: int(0, "1").boxed(), rhs: int(2, "2").boxed() },
/// );
/// assert_eq!(sum.to_string(), "(+ 1 2)");
/// ```
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Root { items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Kind::Identifier { name } => f.write_str(name),
            Kind::Block { label, statements } => {
                f.write_str("(block")?;
                write_label(f, label)?;
                write_all(f, statements)?;
                f.write_str(")")
            }
            Kind::FuncPrototype {
                name,
                params,
                return_type,
                is_export,
                is_extern,
            } => {
                f.write_str("(func")?;
                if *is_export {
                    f.write_str(" export")?;
                }
                if *is_extern {
                    f.write_str(" extern")?;
                }
                if let Some(name) = name {
                    write!(f, " {name}")?;
                }
                f.write_str(" (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    let dots = if param.variadic { "..." } else { "" };
                    write!(f, "({}{dots} {})", param.param_type, param.name)?;
                }
                write!(f, ") {return_type})")
            }
            Kind::FuncDef { prototype, body } => write!(f, "(def {prototype} {body})"),
            Kind::IntLiteral { text, .. } | Kind::FloatLiteral { text, .. } => f.write_str(text),
            Kind::CharLiteral { text } => write!(f, "'{text}'"),
            Kind::StringLiteral { text, form } => match form {
                StringForm::Plain => write!(f, "\"{text}\""),
                StringForm::Raw => write!(f, "`{text}`"),
                StringForm::Triple => write!(f, "\"\"\"{text}\"\"\""),
            },
            Kind::BoolLiteral { value } => write!(f, "{value}"),
            Kind::NilLiteral => f.write_str("nil"),
            Kind::Unreachable => f.write_str("unreachable"),
            Kind::Builtin { name } => write!(f, "@{name}"),
            Kind::EnumDecl {
                name,
                is_export,
                variants,
            } => {
                f.write_str("(enum")?;
                if *is_export {
                    f.write_str(" export")?;
                }
                write!(f, " {name}")?;
                for variant in variants {
                    match &variant.value {
                        Some(value) => write!(f, " ({} {value})", variant.name)?,
                        None => write!(f, " {}", variant.name)?,
                    }
                }
                f.write_str(")")
            }
            Kind::StructDecl {
                name,
                is_export,
                is_union,
                fields,
            } => {
                f.write_str(if *is_union { "(union" } else { "(struct" })?;
                if *is_export {
                    f.write_str(" export")?;
                }
                write!(f, " {name}")?;
                write_all(f, fields)?;
                f.write_str(")")
            }
            Kind::TypeField {
                name,
                field_type,
                default,
            } => {
                write!(f, "(field {field_type} {name}")?;
                if let Some(default) = default {
                    write!(f, " {default}")?;
                }
                f.write_str(")")
            }
            Kind::VarDecl {
                name,
                var_type,
                init,
                is_export,
                is_mutable,
                is_const,
            } => {
                f.write_str("(var")?;
                if *is_export {
                    f.write_str(" export")?;
                }
                if *is_mutable {
                    f.write_str(" mutable")?;
                }
                if *is_const {
                    f.write_str(" const")?;
                }
                write_optional(f, var_type)?;
                write!(f, " {name}")?;
                if let Some(init) = init {
                    write!(f, " {init}")?;
                }
                f.write_str(")")
            }
            Kind::FuncCallExpr { callee, args } => {
                write!(f, "(call {callee}")?;
                write_all(f, args)?;
                f.write_str(")")
            }
            Kind::FieldAccess { target, field } => write!(f, "(. {target} {field})"),
            Kind::ArrayAccess { target, index } => write!(f, "(index {target} {index})"),
            Kind::SliceExpr {
                target,
                start,
                end,
                sentinel,
            } => {
                write!(f, "(slice {target} {start} {end}")?;
                if let Some(sentinel) = sentinel {
                    write!(f, " {sentinel}")?;
                }
                f.write_str(")")
            }
            Kind::ArrayInit { elements } => {
                f.write_str("(init")?;
                write_all(f, elements)?;
                f.write_str(")")
            }
            Kind::IfExpr {
                condition,
                then_body,
                else_body,
            } => {
                write!(f, "(if {condition} {then_body}")?;
                if let Some(else_body) = else_body {
                    write!(f, " {else_body}")?;
                }
                f.write_str(")")
            }
            Kind::ForExpr {
                label,
                condition,
                body,
            } => {
                f.write_str("(for")?;
                write_label(f, label)?;
                if let Some(condition) = condition {
                    write!(f, " {condition}")?;
                }
                write!(f, " {body})")
            }
            Kind::ForCExpr {
                label,
                init,
                condition,
                step,
                body,
            } => {
                f.write_str("(for-c")?;
                write_label(f, label)?;
                write_optional(f, init)?;
                write_optional(f, condition)?;
                write_optional(f, step)?;
                write!(f, " {body})")
            }
            Kind::ForInExpr {
                label,
                binding,
                iterable,
                body,
            } => {
                f.write_str("(for-in")?;
                write_label(f, label)?;
                write!(f, " {binding} {iterable} {body})")
            }
            Kind::MatchExpr { subject, branches } => {
                write!(f, "(match {subject}")?;
                for branch in branches {
                    if branch.is_default() {
                        f.write_str(" (else")?;
                    } else {
                        f.write_str(" (case")?;
                    }
                    for item in &branch.items {
                        match item {
                            MatchItem::Single { value } => write!(f, " {value}")?,
                            MatchItem::Range { start, end } => {
                                write!(f, " (... {start} {end})")?
                            }
                        }
                    }
                    write!(f, " => {})", branch.body)?;
                }
                f.write_str(")")
            }
            Kind::CatchExpr { lhs, payload, rhs } => {
                write!(f, "(catch {lhs}")?;
                if let Some(payload) = payload {
                    write!(f, " |{payload}|")?;
                }
                write!(f, " {rhs})")
            }
            Kind::BinaryOpExpr { op, lhs, rhs } => write!(f, "({op} {lhs} {rhs})"),
            Kind::PrefixOpExpr { op, operand } => write!(f, "({op} {operand})"),
            Kind::OptionalType { child } => write!(f, "(? {child})"),
            Kind::ArrayType {
                kind,
                size,
                sentinel,
                element,
            } => {
                f.write_str("([")?;
                match (kind, size) {
                    (ArrayTypeKind::Inferred, _) => f.write_str("_")?,
                    (_, Some(size)) => write!(f, "{size}")?,
                    _ => {}
                }
                if let Some(sentinel) = sentinel {
                    write!(f, " :{sentinel}")?;
                }
                write!(f, "] {element})")
            }
            Kind::Defer { body } => write!(f, "(defer {body})"),
            Kind::Return { value } => {
                f.write_str("(return")?;
                if let Some(value) = value {
                    write!(f, " {value}")?;
                }
                f.write_str(")")
            }
            Kind::Raise { value } => write!(f, "(raise {value})"),
            Kind::Break { label, value } => {
                f.write_str("(break")?;
                write_label(f, label)?;
                if let Some(value) = value {
                    write!(f, " {value}")?;
                }
                f.write_str(")")
            }
            Kind::Continue { label } => {
                f.write_str("(continue")?;
                write_label(f, label)?;
                f.write_str(")")
            }
        }
    }
}

fn write_label(f: &mut fmt::Formatter<'_>, label: &Option<String>) -> fmt::Result {
    match label {
        Some(label) => write!(f, " :{label}"),
        None => Ok(()),
    }
}

/// 省略された要素は `_`
fn write_optional(f: &mut fmt::Formatter<'_>, node: &Option<Box<Node>>) -> fmt::Result {
    match node {
        Some(node) => write!(f, " {node}"),
        None => f.write_str(" _"),
    }
}

fn write_all(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for node in nodes {
        write!(f, " {node}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(token: usize, name: &str) -> Node {
        Node::new(token, Kind::Identifier { name: name.into() })
    }

    fn int(token: usize, text: &str) -> Node {
        Node::new(
            token,
            Kind::IntLiteral {
                text: text.into(),
                base: IntBase::Decimal,
            },
        )
    }

    fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
        Node::new(
            lhs.token + 1,
            Kind::BinaryOpExpr {
                op,
                lhs: lhs.boxed(),
                rhs: rhs.boxed(),
            },
        )
    }

    #[rstest::rstest]
    #[case(
        binary(BinaryOp::Subtract, binary(BinaryOp::Add, int(0, "1"), int(2, "2")), int(4, "3")),
        "(- (+ 1 2) 3)"
    )]
    #[case(
        Node::new(0, Kind::PrefixOpExpr { op: PrefixOp::BoolNot, operand: ident(1, "ok").boxed() }),
        "(not ok)"
    )]
    #[case(
        Node::new(1, Kind::VarDecl {
            name: "x".into(),
            var_type: None,
            init: Some(int(3, "10").boxed()),
            is_export: false,
            is_mutable: true,
            is_const: false,
        }),
        "(var mutable _ x 10)"
    )]
    #[case(
        Node::new(0, Kind::ArrayType {
            kind: ArrayTypeKind::Sized,
            size: Some(int(1, "4").boxed()),
            sentinel: Some(int(3, "0").boxed()),
            element: ident(5, "u8").boxed(),
        }),
        "([4 :0] u8)"
    )]
    #[case(
        Node::new(0, Kind::ArrayType {
            kind: ArrayTypeKind::Slice,
            size: None,
            sentinel: None,
            element: ident(2, "int").boxed(),
        }),
        "([] int)"
    )]
    #[case(
        Node::new(0, Kind::StringLiteral { text: "hi".into(), form: StringForm::Raw }),
        "`hi`"
    )]
    #[case(
        Node::new(0, Kind::MatchExpr {
            subject: ident(2, "x").boxed(),
            branches: vec![
                MatchBranch {
                    token: 5,
                    items: vec![
                        MatchItem::Single { value: int(5, "1") },
                        MatchItem::Range { start: int(7, "2"), end: int(9, "5") },
                    ],
                    body: ident(11, "a"),
                },
                MatchBranch { token: 13, items: vec![], body: ident(15, "b") },
            ],
        }),
        "(match x (case 1 (... 2 5) => a) (else => b))"
    )]
    #[case(
        Node::new(0, Kind::Break { label: Some("outer".into()), value: None }),
        "(break :outer)"
    )]
    fn display(#[case] node: Node, #[case] want: &str) {
        assert_eq!(node.to_string(), want);
    }

    #[test]
    fn root_is_one_item_per_line() {
        let root = Node::new(
            0,
            Kind::Root {
                items: vec![
                    Node::new(0, Kind::Return { value: None }),
                    Node::new(2, Kind::Continue { label: None }),
                ],
            },
        );

        assert_eq!(root.to_string(), "(return)\n(continue)");
    }

    #[test]
    fn serializes_with_node_tag() {
        let node = binary(BinaryOp::Add, ident(0, "a"), int(2, "1"));

        assert_eq!(
            serde_json::to_value(&node).ok(),
            Some(serde_json::json!({
                "token": 1,
                "node": "BinaryOpExpr",
                "op": "add",
                "lhs": { "token": 0, "node": "Identifier", "name": "a" },
                "rhs": { "token": 2, "node": "IntLiteral", "text": "1", "base": "decimal" },
            }))
        );
    }
}
