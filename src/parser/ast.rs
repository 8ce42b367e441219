//! AST (Abstract Syntax Tree) definitions for the Rill front end.
//!
//! The tree is heterogeneous but statically typed: a [`Node`] is either a
//! [`Node::Leaf`] carrying one token (identifiers, literals, `break`,
//! `continue`) or a [`Node::NonLeaf`] carrying an ordered child list.
//! Children are `Option<Node>` so that an optional slot (an `if` without
//! `else`, a parameter without initializer) is an explicit `None` marker
//! and every kind keeps a fixed child layout:
//!
//! | kind | children (positional) |
//! |---|---|
//! | `Module` | declarations |
//! | `ImportDecl` | path string, alias ident or absent |
//! | `TypeDecl` | ident, type params or absent, type |
//! | `TypeParams` | params (`Ident` or `Constraint`) |
//! | `Constraint` | ident, type |
//! | `Intersect` | lhs type, rhs type |
//! | `FuncDecl` | return type, name or absent, `Params`, body or absent |
//! | `Params` | `VarDecl` parameters (or bare types in a `FuncType`) |
//! | `InoutParam` | type |
//! | `StructDecl` | ident, type params or absent, field `VarDecl`s |
//! | `InterfaceDecl` | ident, type params or absent, base type or absent, prototypes |
//! | `VarDecl` | type, ident, initializer or absent |
//! | `LetDecl` | ident, initializer |
//! | `Ref` | lvalue chain |
//! | `FuncType` | return type, `Params` |
//! | `Type` | ident, type arguments |
//! | `Block` | statements |
//! | `Assign`..`ModAssign` | lvalue, expression |
//! | `If` | condition, then branch, else branch or absent |
//! | `Loop` | block |
//! | `While` | condition, block |
//! | `DoWhile` | block, condition |
//! | `For` | binding ident, iterable, block |
//! | `Switch` | scrutinee, `Case`s, trailing `Default` if present |
//! | `Case` | value, block |
//! | `Default` | block |
//! | `Return` | expression or absent |
//! | binary operators | lhs, rhs |
//! | `Not` `Neg` `BitNot` `Try` | operand |
//! | `New` | type, arguments |
//! | `Call` | callee, arguments |
//! | `Array` | elements |
//! | `Element` | base, index |
//! | `Field` | base, member ident |
//!
//! Ownership is strictly tree shaped: every non-leaf exclusively owns its
//! children and the whole tree is dropped at once.

use std::fmt::Write as _;

use super::lexer::Token;

/// Closed set of AST node kinds.  The code generator walks the tree by
/// matching on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    ImportDecl,
    TypeDecl,
    TypeParams,
    Constraint,
    Intersect,
    FuncDecl,
    Params,
    InoutParam,
    StructDecl,
    InterfaceDecl,
    VarDecl,
    LetDecl,
    Ref,
    FuncType,
    Type,
    Block,
    Assign,
    BitOrAssign,
    BitXorAssign,
    BitAndAssign,
    ShlAssign,
    ShrAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    If,
    Loop,
    While,
    DoWhile,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Range,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Not,
    Neg,
    BitNot,
    New,
    Call,
    Try,
    Null,
    False,
    True,
    Int,
    Float,
    Rune,
    Str,
    Array,
    Element,
    Field,
    Ident,
}

impl NodeKind {
    /// Printable name, total over the enum.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Module => "Module",
            NodeKind::ImportDecl => "ImportDecl",
            NodeKind::TypeDecl => "TypeDecl",
            NodeKind::TypeParams => "TypeParams",
            NodeKind::Constraint => "Constraint",
            NodeKind::Intersect => "Intersect",
            NodeKind::FuncDecl => "FuncDecl",
            NodeKind::Params => "Params",
            NodeKind::InoutParam => "InoutParam",
            NodeKind::StructDecl => "StructDecl",
            NodeKind::InterfaceDecl => "InterfaceDecl",
            NodeKind::VarDecl => "VarDecl",
            NodeKind::LetDecl => "LetDecl",
            NodeKind::Ref => "Ref",
            NodeKind::FuncType => "FuncType",
            NodeKind::Type => "Type",
            NodeKind::Block => "Block",
            NodeKind::Assign => "Assign",
            NodeKind::BitOrAssign => "BitOrAssign",
            NodeKind::BitXorAssign => "BitXorAssign",
            NodeKind::BitAndAssign => "BitAndAssign",
            NodeKind::ShlAssign => "ShlAssign",
            NodeKind::ShrAssign => "ShrAssign",
            NodeKind::AddAssign => "AddAssign",
            NodeKind::SubAssign => "SubAssign",
            NodeKind::MulAssign => "MulAssign",
            NodeKind::DivAssign => "DivAssign",
            NodeKind::ModAssign => "ModAssign",
            NodeKind::If => "If",
            NodeKind::Loop => "Loop",
            NodeKind::While => "While",
            NodeKind::DoWhile => "DoWhile",
            NodeKind::For => "For",
            NodeKind::Switch => "Switch",
            NodeKind::Case => "Case",
            NodeKind::Default => "Default",
            NodeKind::Break => "Break",
            NodeKind::Continue => "Continue",
            NodeKind::Return => "Return",
            NodeKind::Or => "Or",
            NodeKind::And => "And",
            NodeKind::Eq => "Eq",
            NodeKind::Ne => "Ne",
            NodeKind::Lt => "Lt",
            NodeKind::Le => "Le",
            NodeKind::Gt => "Gt",
            NodeKind::Ge => "Ge",
            NodeKind::BitOr => "BitOr",
            NodeKind::BitXor => "BitXor",
            NodeKind::BitAnd => "BitAnd",
            NodeKind::Shl => "Shl",
            NodeKind::Shr => "Shr",
            NodeKind::Range => "Range",
            NodeKind::Add => "Add",
            NodeKind::Sub => "Sub",
            NodeKind::Mul => "Mul",
            NodeKind::Div => "Div",
            NodeKind::Mod => "Mod",
            NodeKind::Not => "Not",
            NodeKind::Neg => "Neg",
            NodeKind::BitNot => "BitNot",
            NodeKind::New => "New",
            NodeKind::Call => "Call",
            NodeKind::Try => "Try",
            NodeKind::Null => "Null",
            NodeKind::False => "False",
            NodeKind::True => "True",
            NodeKind::Int => "Int",
            NodeKind::Float => "Float",
            NodeKind::Rune => "Rune",
            NodeKind::Str => "String",
            NodeKind::Array => "Array",
            NodeKind::Element => "Element",
            NodeKind::Field => "Field",
            NodeKind::Ident => "Ident",
        }
    }
}

/// An AST node: either a leaf carrying its token, or an interior node
/// carrying an ordered child list with explicit `None` for absent slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'src> {
    Leaf {
        kind: NodeKind,
        token: Token<'src>,
    },
    NonLeaf {
        kind: NodeKind,
        children: Vec<Option<Node<'src>>>,
    },
}

impl<'src> Node<'src> {
    pub fn leaf(kind: NodeKind, token: Token<'src>) -> Self {
        Node::Leaf { kind, token }
    }

    pub fn non_leaf(kind: NodeKind) -> Self {
        Node::NonLeaf {
            kind,
            children: Vec::with_capacity(1),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf { kind, .. } | Node::NonLeaf { kind, .. } => *kind,
        }
    }

    /// Append a child slot; `None` marks an absent optional child.
    /// Appending to a leaf is a programming error.
    pub fn append(&mut self, child: Option<Node<'src>>) {
        match self {
            Node::NonLeaf { children, .. } => children.push(child),
            Node::Leaf { kind, .. } => {
                unreachable!("appending a child to leaf node {}", kind.name())
            }
        }
    }

    /// Child slots of a non-leaf; a leaf has none.
    pub fn children(&self) -> &[Option<Node<'src>>] {
        match self {
            Node::NonLeaf { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }

    /// Indented tree dump used for debugging and golden tests.  Each
    /// non-leaf prints its kind name and its children one level deeper;
    /// token-carrying leaves print their source text; absent children
    /// print `(empty)`.
    pub fn to_tree_string(&self) -> String {
        let mut out = String::new();
        write_node(&mut out, Some(self), 0);
        out
    }

    /// Print the tree dump to stdout.
    pub fn print(&self) {
        print!("{}", self.to_tree_string());
    }
}

fn write_node(out: &mut String, node: Option<&Node<'_>>, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
    let Some(node) = node else {
        out.push_str("(empty)\n");
        return;
    };
    match node {
        Node::NonLeaf { kind, children } => {
            let _ = writeln!(out, "{}:", kind.name());
            for child in children {
                write_node(out, child.as_ref(), level + 1);
            }
        }
        Node::Leaf { kind, token } => match kind {
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Null
            | NodeKind::False
            | NodeKind::True => {
                let _ = writeln!(out, "{}", kind.name());
            }
            _ => {
                let _ = writeln!(out, "{}: {}", kind.name(), token.text);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::diag::SourceLocation;
    use crate::parser::lexer::TokenKind;

    fn ident(text: &str) -> Token<'_> {
        Token {
            kind: TokenKind::Ident,
            loc: SourceLocation::new(1, 1),
            text,
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(NodeKind::Module.name(), "Module");
        assert_eq!(NodeKind::BitOrAssign.name(), "BitOrAssign");
        assert_eq!(NodeKind::Str.name(), "String");
        assert_eq!(NodeKind::Ident.name(), "Ident");
    }

    #[test]
    fn test_append_and_children() {
        let mut params = Node::non_leaf(NodeKind::Params);
        assert_eq!(params.children().len(), 0);
        params.append(Some(Node::leaf(NodeKind::Ident, ident("x"))));
        params.append(None);
        assert_eq!(params.children().len(), 2);
        assert!(params.children()[1].is_none());
    }

    #[test]
    fn test_tree_dump() {
        let mut if_node = Node::non_leaf(NodeKind::If);
        if_node.append(Some(Node::leaf(NodeKind::Ident, ident("cond"))));
        if_node.append(Some(Node::non_leaf(NodeKind::Block)));
        if_node.append(None);
        assert_eq!(
            if_node.to_tree_string(),
            "If:\n  Ident: cond\n  Block:\n  (empty)\n"
        );
    }

    #[test]
    fn test_nullary_leaf_dump() {
        let node = Node::leaf(
            NodeKind::Break,
            Token {
                kind: TokenKind::Break,
                loc: SourceLocation::new(2, 3),
                text: "break",
            },
        );
        assert_eq!(node.to_tree_string(), "Break\n");
    }
}
