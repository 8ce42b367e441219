//! Recursive descent parser for Rill.
//!
//! Each grammar rule is one method; the only parser state is the embedded
//! [`Lexer`] and its single current token.  Every rule either commits to a
//! production based on that token or fails with a syntax error — there is
//! no backtracking and no recovery.  Nodes are built bottom-up as each
//! rule returns, so the AST for a construct exists only once the whole
//! construct parsed.

use super::ast::{Node, NodeKind};
use super::diag::Error;
use super::lexer::{Lexer, Token, TokenKind};

/// Assignment operators, checked at the top of the expression ladder.
const ASSIGN_OPS: &[TokenKind] = &[
    TokenKind::Eq,
    TokenKind::PipeEq,
    TokenKind::CaretEq,
    TokenKind::AmpEq,
    TokenKind::ShlEq,
    TokenKind::ShrEq,
    TokenKind::PlusEq,
    TokenKind::MinusEq,
    TokenKind::StarEq,
    TokenKind::SlashEq,
    TokenKind::PercentEq,
];

/// Maps a binary or assignment operator token to its AST node kind.
/// Total over the operator tokens; every operator has exactly one kind.
fn operator_node_kind(kind: TokenKind) -> Option<NodeKind> {
    Some(match kind {
        TokenKind::Eq => NodeKind::Assign,
        TokenKind::PipeEq => NodeKind::BitOrAssign,
        TokenKind::CaretEq => NodeKind::BitXorAssign,
        TokenKind::AmpEq => NodeKind::BitAndAssign,
        TokenKind::ShlEq => NodeKind::ShlAssign,
        TokenKind::ShrEq => NodeKind::ShrAssign,
        TokenKind::PlusEq => NodeKind::AddAssign,
        TokenKind::MinusEq => NodeKind::SubAssign,
        TokenKind::StarEq => NodeKind::MulAssign,
        TokenKind::SlashEq => NodeKind::DivAssign,
        TokenKind::PercentEq => NodeKind::ModAssign,
        TokenKind::PipePipe => NodeKind::Or,
        TokenKind::AmpAmp => NodeKind::And,
        TokenKind::Pipe => NodeKind::BitOr,
        TokenKind::Caret => NodeKind::BitXor,
        TokenKind::Amp => NodeKind::BitAnd,
        TokenKind::EqEq => NodeKind::Eq,
        TokenKind::BangEq => NodeKind::Ne,
        TokenKind::Lt => NodeKind::Lt,
        TokenKind::Le => NodeKind::Le,
        TokenKind::Gt => NodeKind::Gt,
        TokenKind::Ge => NodeKind::Ge,
        TokenKind::Shl => NodeKind::Shl,
        TokenKind::Shr => NodeKind::Shr,
        TokenKind::DotDot => NodeKind::Range,
        TokenKind::Plus => NodeKind::Add,
        TokenKind::Minus => NodeKind::Sub,
        TokenKind::Star => NodeKind::Mul,
        TokenKind::Slash => NodeKind::Div,
        TokenKind::Percent => NodeKind::Mod,
        _ => return None,
    })
}

fn binary<'src>(kind: NodeKind, lhs: Node<'src>, rhs: Node<'src>) -> Node<'src> {
    let mut node = Node::non_leaf(kind);
    node.append(Some(lhs));
    node.append(Some(rhs));
    node
}

fn unary<'src>(kind: NodeKind, operand: Node<'src>) -> Node<'src> {
    let mut node = Node::non_leaf(kind);
    node.append(Some(operand));
    node
}

/// Recursive descent parser driving a [`Lexer`] with one token of
/// lookahead.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
}

impl<'src> Parser<'src> {
    /// Create a parser over `source`, scanning the first token.
    pub fn new(file: &'src str, source: &'src str) -> Result<Self, Error> {
        Ok(Self {
            lexer: Lexer::new(file, source)?,
        })
    }

    /// Parse a whole module: declarations until end of file.  Ownership
    /// of the tree transfers to the caller.
    pub fn parse_module(&mut self) -> Result<Node<'src>, Error> {
        let mut module = Node::non_leaf(NodeKind::Module);
        while !self.check(TokenKind::Eof) {
            let decl = self.parse_decl()?;
            module.append(Some(decl));
        }
        Ok(module)
    }

    // ===== Declarations =====

    fn parse_decl(&mut self) -> Result<Node<'src>, Error> {
        match self.current().kind {
            TokenKind::Import => self.parse_import_decl(),
            TokenKind::Typealias => self.parse_typealias_decl(),
            TokenKind::Fn => self.parse_func_decl(false),
            TokenKind::Struct => self.parse_struct_decl(),
            TokenKind::Interface => self.parse_interface_decl(),
            TokenKind::Let => self.parse_let_decl(),
            TokenKind::Var => self.parse_var_decl(),
            _ => Err(self.unexpected()),
        }
    }

    /// `import "path" (as ident)? ;`
    fn parse_import_decl(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        if !self.check(TokenKind::Str) {
            return Err(self.unexpected());
        }
        let path = Node::leaf(NodeKind::Str, self.current());
        self.next()?;
        let mut import = Node::non_leaf(NodeKind::ImportDecl);
        import.append(Some(path));
        if self.check(TokenKind::As) {
            self.next()?;
            let alias = self.parse_ident()?;
            import.append(Some(alias));
        } else {
            import.append(None);
        }
        self.consume(TokenKind::Semicolon)?;
        Ok(import)
    }

    /// `typealias Name<params>? = type ;`
    fn parse_typealias_decl(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ident = self.parse_ident()?;
        let type_params = self.parse_type_params()?;
        self.consume(TokenKind::Eq)?;
        let ty = self.parse_type()?;
        self.consume(TokenKind::Semicolon)?;
        let mut decl = Node::non_leaf(NodeKind::TypeDecl);
        decl.append(Some(ident));
        decl.append(type_params);
        decl.append(Some(ty));
        Ok(decl)
    }

    /// `<param (, param)*>` where `param` is `Ident` or `Ident: type`.
    /// Returns `None` when there is no parameter list.
    fn parse_type_params(&mut self) -> Result<Option<Node<'src>>, Error> {
        if !self.check(TokenKind::Lt) {
            return Ok(None);
        }
        self.next()?;
        let mut params = Node::non_leaf(NodeKind::TypeParams);
        let param = self.parse_type_param()?;
        params.append(Some(param));
        while self.check(TokenKind::Comma) {
            self.next()?;
            let param = self.parse_type_param()?;
            params.append(Some(param));
        }
        self.consume(TokenKind::Gt)?;
        Ok(Some(params))
    }

    fn parse_type_param(&mut self) -> Result<Node<'src>, Error> {
        let ident = self.parse_ident()?;
        if !self.check(TokenKind::Colon) {
            return Ok(ident);
        }
        self.next()?;
        let ty = self.parse_type()?;
        Ok(binary(NodeKind::Constraint, ident, ty))
    }

    // ===== Types =====

    /// Intersection of primary types, left-associative over `+`.
    fn parse_type(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_prim_type()?;
        while self.check(TokenKind::Plus) {
            self.next()?;
            let rhs = self.parse_prim_type()?;
            lhs = binary(NodeKind::Intersect, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_prim_type(&mut self) -> Result<Node<'src>, Error> {
        if self.check(TokenKind::Fn) {
            return self.parse_func_type();
        }
        if self.check(TokenKind::Ident) {
            return self.parse_named_type();
        }
        Err(self.unexpected())
    }

    /// `fn RetType(ParamType, ...)`
    fn parse_func_type(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ret_type = self.parse_type()?;
        self.consume(TokenKind::LParen)?;
        let mut params = Node::non_leaf(NodeKind::Params);
        if !self.check(TokenKind::RParen) {
            let param = self.parse_param_type()?;
            params.append(Some(param));
            while self.check(TokenKind::Comma) {
                self.next()?;
                let param = self.parse_param_type()?;
                params.append(Some(param));
            }
        }
        self.consume(TokenKind::RParen)?;
        let mut func_type = Node::non_leaf(NodeKind::FuncType);
        func_type.append(Some(ret_type));
        func_type.append(Some(params));
        Ok(func_type)
    }

    fn parse_param_type(&mut self) -> Result<Node<'src>, Error> {
        if self.check(TokenKind::Inout) {
            self.next()?;
            let ty = self.parse_type()?;
            return Ok(unary(NodeKind::InoutParam, ty));
        }
        self.parse_type()
    }

    /// A named type, optionally generic: `Name` or `Name<type, ...>`.
    /// A bare name stays a plain `Ident` leaf.
    fn parse_named_type(&mut self) -> Result<Node<'src>, Error> {
        let ident = self.parse_ident()?;
        if !self.check(TokenKind::Lt) {
            return Ok(ident);
        }
        self.next()?;
        let mut ty = Node::non_leaf(NodeKind::Type);
        ty.append(Some(ident));
        if self.check(TokenKind::Gt) {
            self.next()?;
            return Ok(ty);
        }
        let arg = self.parse_type()?;
        ty.append(Some(arg));
        while self.check(TokenKind::Comma) {
            self.next()?;
            let arg = self.parse_type()?;
            ty.append(Some(arg));
        }
        self.consume(TokenKind::Gt)?;
        Ok(ty)
    }

    // ===== Functions, structs, interfaces =====

    /// `fn RetType name?(params) { ... }`; the name is optional even in
    /// declaration position, and `anon` (anonymous function literal)
    /// never takes one.
    fn parse_func_decl(&mut self, anon: bool) -> Result<Node<'src>, Error> {
        self.next()?;
        let ret_type = self.parse_type()?;
        let name = if !anon && self.check(TokenKind::Ident) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        self.consume(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.consume(TokenKind::RParen)?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let block = self.parse_block()?;
        let mut decl = Node::non_leaf(NodeKind::FuncDecl);
        decl.append(Some(ret_type));
        decl.append(name);
        decl.append(Some(params));
        decl.append(Some(block));
        Ok(decl)
    }

    fn parse_params(&mut self) -> Result<Node<'src>, Error> {
        let mut params = Node::non_leaf(NodeKind::Params);
        if self.check(TokenKind::RParen) {
            return Ok(params);
        }
        let param = self.parse_param()?;
        params.append(Some(param));
        while self.check(TokenKind::Comma) {
            self.next()?;
            let param = self.parse_param()?;
            params.append(Some(param));
        }
        Ok(params)
    }

    /// A parameter is a `VarDecl` with an absent initializer.
    fn parse_param(&mut self) -> Result<Node<'src>, Error> {
        let ty = self.parse_param_type()?;
        let ident = self.parse_ident()?;
        let mut param = Node::non_leaf(NodeKind::VarDecl);
        param.append(Some(ty));
        param.append(Some(ident));
        param.append(None);
        Ok(param)
    }

    /// Brace-delimited statement list.  The caller has checked for `{`.
    fn parse_block(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let mut block = Node::non_leaf(NodeKind::Block);
        while !self.check(TokenKind::RBrace) {
            let stmt = self.parse_stmt()?;
            block.append(Some(stmt));
        }
        self.next()?;
        Ok(block)
    }

    /// `struct Name<params>? { field* }`
    fn parse_struct_decl(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ident = self.parse_ident()?;
        let type_params = self.parse_type_params()?;
        let mut decl = Node::non_leaf(NodeKind::StructDecl);
        decl.append(Some(ident));
        decl.append(type_params);
        self.consume(TokenKind::LBrace)?;
        while !self.check(TokenKind::RBrace) {
            let field = self.parse_field()?;
            decl.append(Some(field));
        }
        self.next()?;
        Ok(decl)
    }

    /// A field is a `VarDecl` with an absent initializer.
    fn parse_field(&mut self) -> Result<Node<'src>, Error> {
        let ty = self.parse_type()?;
        let ident = self.parse_ident()?;
        self.consume(TokenKind::Semicolon)?;
        let mut field = Node::non_leaf(NodeKind::VarDecl);
        field.append(Some(ty));
        field.append(Some(ident));
        field.append(None);
        Ok(field)
    }

    /// `interface Name<params>? (: base)? { proto* }`
    fn parse_interface_decl(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ident = self.parse_ident()?;
        let type_params = self.parse_type_params()?;
        let mut decl = Node::non_leaf(NodeKind::InterfaceDecl);
        decl.append(Some(ident));
        decl.append(type_params);
        if self.check(TokenKind::Colon) {
            self.next()?;
            let base = self.parse_type()?;
            decl.append(Some(base));
        } else {
            decl.append(None);
        }
        self.consume(TokenKind::LBrace)?;
        while !self.check(TokenKind::RBrace) {
            let proto = self.parse_method_proto()?;
            decl.append(Some(proto));
        }
        self.next()?;
        Ok(decl)
    }

    /// `name RetType(params);` — a `FuncDecl` with an absent body.
    fn parse_method_proto(&mut self) -> Result<Node<'src>, Error> {
        let name = self.parse_ident()?;
        let ret_type = self.parse_type()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::Semicolon)?;
        let mut proto = Node::non_leaf(NodeKind::FuncDecl);
        proto.append(Some(ret_type));
        proto.append(Some(name));
        proto.append(Some(params));
        proto.append(None);
        Ok(proto)
    }

    /// `let name = expr ;`
    fn parse_let_decl(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ident = self.parse_ident()?;
        self.consume(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(binary(NodeKind::LetDecl, ident, expr))
    }

    /// `var Type name (= expr)? ;`
    fn parse_var_decl(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ty = self.parse_type()?;
        let ident = self.parse_ident()?;
        let mut decl = Node::non_leaf(NodeKind::VarDecl);
        decl.append(Some(ty));
        decl.append(Some(ident));
        if self.check(TokenKind::Eq) {
            self.next()?;
            let init = self.parse_expr()?;
            decl.append(Some(init));
        } else {
            decl.append(None);
        }
        self.consume(TokenKind::Semicolon)?;
        Ok(decl)
    }

    // ===== Statements =====

    fn parse_stmt(&mut self) -> Result<Node<'src>, Error> {
        match self.current().kind {
            TokenKind::Typealias => self.parse_typealias_decl(),
            TokenKind::Fn => self.parse_func_decl(false),
            TokenKind::Struct => self.parse_struct_decl(),
            TokenKind::Interface => self.parse_interface_decl(),
            TokenKind::Let => self.parse_let_decl(),
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Loop => self.parse_loop_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::Do => self.parse_do_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            _ => {
                let expr = self.parse_expr()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(expr)
            }
        }
    }

    /// `if expr { ... } (else { ... })?` — always three children, the
    /// else branch is an explicit absent marker when missing.
    fn parse_if_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let cond = self.parse_expr()?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let then_block = self.parse_block()?;
        let mut if_stmt = Node::non_leaf(NodeKind::If);
        if_stmt.append(Some(cond));
        if_stmt.append(Some(then_block));
        if self.check(TokenKind::Else) {
            self.next()?;
            if !self.check(TokenKind::LBrace) {
                return Err(self.unexpected());
            }
            let else_block = self.parse_block()?;
            if_stmt.append(Some(else_block));
        } else {
            if_stmt.append(None);
        }
        Ok(if_stmt)
    }

    fn parse_loop_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let block = self.parse_block()?;
        Ok(unary(NodeKind::Loop, block))
    }

    fn parse_while_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let cond = self.parse_expr()?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let block = self.parse_block()?;
        Ok(binary(NodeKind::While, cond, block))
    }

    /// `do { ... } while expr ;`
    fn parse_do_while_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let block = self.parse_block()?;
        self.consume(TokenKind::While)?;
        let cond = self.parse_expr()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(binary(NodeKind::DoWhile, block, cond))
    }

    /// `for name in expr { ... }`
    fn parse_for_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ident = self.parse_ident()?;
        self.consume(TokenKind::In)?;
        let expr = self.parse_expr()?;
        if !self.check(TokenKind::LBrace) {
            return Err(self.unexpected());
        }
        let block = self.parse_block()?;
        let mut for_stmt = Node::non_leaf(NodeKind::For);
        for_stmt.append(Some(ident));
        for_stmt.append(Some(expr));
        for_stmt.append(Some(block));
        Ok(for_stmt)
    }

    /// `switch expr { case expr: stmt* ... default: stmt* }` — cases
    /// first, one optional trailing default.
    fn parse_switch_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let scrutinee = self.parse_expr()?;
        self.consume(TokenKind::LBrace)?;
        let mut switch = Node::non_leaf(NodeKind::Switch);
        switch.append(Some(scrutinee));
        while self.check(TokenKind::Case) {
            self.next()?;
            let value = self.parse_expr()?;
            self.consume(TokenKind::Colon)?;
            let mut body = Node::non_leaf(NodeKind::Block);
            while !self.check(TokenKind::Case)
                && !self.check(TokenKind::Default)
                && !self.check(TokenKind::RBrace)
            {
                let stmt = self.parse_stmt()?;
                body.append(Some(stmt));
            }
            switch.append(Some(binary(NodeKind::Case, value, body)));
        }
        if self.check(TokenKind::Default) {
            self.next()?;
            self.consume(TokenKind::Colon)?;
            let mut body = Node::non_leaf(NodeKind::Block);
            while !self.check(TokenKind::RBrace) {
                let stmt = self.parse_stmt()?;
                body.append(Some(stmt));
            }
            switch.append(Some(unary(NodeKind::Default, body)));
        }
        self.consume(TokenKind::RBrace)?;
        Ok(switch)
    }

    fn parse_jump_stmt(&mut self) -> Result<Node<'src>, Error> {
        let token = self.current();
        let kind = if token.kind == TokenKind::Break {
            NodeKind::Break
        } else {
            NodeKind::Continue
        };
        self.next()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(Node::leaf(kind, token))
    }

    /// `return expr? ;` — always one child.
    fn parse_return_stmt(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let mut ret = Node::non_leaf(NodeKind::Return);
        if self.check(TokenKind::Semicolon) {
            self.next()?;
            ret.append(None);
            return Ok(ret);
        }
        let expr = self.parse_expr()?;
        self.consume(TokenKind::Semicolon)?;
        ret.append(Some(expr));
        Ok(ret)
    }

    // ===== Expressions =====

    /// Assignment level, right-associative: `a = b = c` nests to the
    /// right.  Covers plain and compound assignment operators.
    fn parse_expr(&mut self) -> Result<Node<'src>, Error> {
        let lhs = self.parse_or_expr()?;
        let Some(kind) = self.match_operator(ASSIGN_OPS) else {
            return Ok(lhs);
        };
        self.next()?;
        let rhs = self.parse_expr()?;
        Ok(binary(kind, lhs, rhs))
    }

    fn parse_or_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_and_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::PipePipe]) {
            self.next()?;
            let rhs = self.parse_and_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_bor_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::AmpAmp]) {
            self.next()?;
            let rhs = self.parse_bor_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bor_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_bxor_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::Pipe]) {
            self.next()?;
            let rhs = self.parse_bxor_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bxor_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_band_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::Caret]) {
            self.next()?;
            let rhs = self.parse_band_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_band_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_eq_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::Amp]) {
            self.next()?;
            let rhs = self.parse_eq_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_eq_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_comp_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::EqEq, TokenKind::BangEq]) {
            self.next()?;
            let rhs = self.parse_comp_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comp_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_shift_expr()?;
        while let Some(kind) = self.match_operator(&[
            TokenKind::Lt,
            TokenKind::Le,
            TokenKind::Gt,
            TokenKind::Ge,
        ]) {
            self.next()?;
            let rhs = self.parse_shift_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_range_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::Shl, TokenKind::Shr]) {
            self.next()?;
            let rhs = self.parse_range_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    /// `..` is non-associative: at most one range per level.
    fn parse_range_expr(&mut self) -> Result<Node<'src>, Error> {
        let lhs = self.parse_add_expr()?;
        if self.check(TokenKind::DotDot) {
            self.next()?;
            let rhs = self.parse_add_expr()?;
            return Ok(binary(NodeKind::Range, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_add_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_mul_expr()?;
        while let Some(kind) = self.match_operator(&[TokenKind::Plus, TokenKind::Minus]) {
            self.next()?;
            let rhs = self.parse_mul_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_mul_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut lhs = self.parse_unary_expr()?;
        while let Some(kind) =
            self.match_operator(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent])
        {
            self.next()?;
            let rhs = self.parse_unary_expr()?;
            lhs = binary(kind, lhs, rhs);
        }
        Ok(lhs)
    }

    /// Prefix `!`, `-`, `~`, right-associative by recursion.
    fn parse_unary_expr(&mut self) -> Result<Node<'src>, Error> {
        let kind = match self.current().kind {
            TokenKind::Bang => NodeKind::Not,
            TokenKind::Minus => NodeKind::Neg,
            TokenKind::Tilde => NodeKind::BitNot,
            _ => return self.parse_postfix_expr(),
        };
        self.next()?;
        let operand = self.parse_unary_expr()?;
        Ok(unary(kind, operand))
    }

    /// Postfix chain over any primary: call `(...)`, index `[...]`, and
    /// field access `.ident`, applied left to right.
    fn parse_postfix_expr(&mut self) -> Result<Node<'src>, Error> {
        let mut expr = self.parse_prim_expr()?;
        loop {
            match self.current().kind {
                TokenKind::LParen => expr = self.parse_call(expr)?,
                TokenKind::LBracket | TokenKind::Dot => expr = self.parse_subscript(expr)?,
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call(&mut self, callee: Node<'src>) -> Result<Node<'src>, Error> {
        self.next()?;
        let mut call = Node::non_leaf(NodeKind::Call);
        call.append(Some(callee));
        if self.check(TokenKind::RParen) {
            self.next()?;
            return Ok(call);
        }
        let arg = self.parse_expr()?;
        call.append(Some(arg));
        while self.check(TokenKind::Comma) {
            self.next()?;
            let arg = self.parse_expr()?;
            call.append(Some(arg));
        }
        self.consume(TokenKind::RParen)?;
        Ok(call)
    }

    /// One index or field-access step.  The caller has checked for `[`
    /// or `.`.
    fn parse_subscript(&mut self, base: Node<'src>) -> Result<Node<'src>, Error> {
        if self.check(TokenKind::LBracket) {
            self.next()?;
            let index = self.parse_expr()?;
            self.consume(TokenKind::RBracket)?;
            return Ok(binary(NodeKind::Element, base, index));
        }
        self.next()?;
        let member = self.parse_ident()?;
        Ok(binary(NodeKind::Field, base, member))
    }

    fn parse_prim_expr(&mut self) -> Result<Node<'src>, Error> {
        let token = self.current();
        let leaf_kind = match token.kind {
            TokenKind::Null => Some(NodeKind::Null),
            TokenKind::False => Some(NodeKind::False),
            TokenKind::True => Some(NodeKind::True),
            TokenKind::Int => Some(NodeKind::Int),
            TokenKind::Float => Some(NodeKind::Float),
            TokenKind::Rune => Some(NodeKind::Rune),
            TokenKind::Str => Some(NodeKind::Str),
            TokenKind::Ident => Some(NodeKind::Ident),
            _ => None,
        };
        if let Some(kind) = leaf_kind {
            self.next()?;
            return Ok(Node::leaf(kind, token));
        }
        match token.kind {
            TokenKind::LBracket => self.parse_array_expr(),
            TokenKind::Fn => self.parse_func_decl(true),
            TokenKind::New => self.parse_new_expr(),
            TokenKind::Amp => self.parse_ref_expr(),
            TokenKind::Try => self.parse_try_expr(),
            TokenKind::If => self.parse_if_expr(),
            TokenKind::LParen => {
                self.next()?;
                let expr = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// `[expr, ...]`
    fn parse_array_expr(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let mut array = Node::non_leaf(NodeKind::Array);
        if !self.check(TokenKind::RBracket) {
            let expr = self.parse_expr()?;
            array.append(Some(expr));
            while self.check(TokenKind::Comma) {
                self.next()?;
                let expr = self.parse_expr()?;
                array.append(Some(expr));
            }
        }
        self.consume(TokenKind::RBracket)?;
        Ok(array)
    }

    /// `new Type(args...)`
    fn parse_new_expr(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let ty = self.parse_type()?;
        let mut new_expr = Node::non_leaf(NodeKind::New);
        new_expr.append(Some(ty));
        self.consume(TokenKind::LParen)?;
        if self.check(TokenKind::RParen) {
            self.next()?;
            return Ok(new_expr);
        }
        let arg = self.parse_expr()?;
        new_expr.append(Some(arg));
        while self.check(TokenKind::Comma) {
            self.next()?;
            let arg = self.parse_expr()?;
            new_expr.append(Some(arg));
        }
        self.consume(TokenKind::RParen)?;
        Ok(new_expr)
    }

    /// `&lvalue` — a reference to an identifier followed by index and
    /// field steps only (no calls).
    fn parse_ref_expr(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let mut lvalue = self.parse_ident()?;
        while self.check(TokenKind::LBracket) || self.check(TokenKind::Dot) {
            lvalue = self.parse_subscript(lvalue)?;
        }
        Ok(unary(NodeKind::Ref, lvalue))
    }

    /// `try expr` — the tried expression must start with an identifier
    /// (a call is what is being tried).
    fn parse_try_expr(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        if !self.check(TokenKind::Ident) {
            return Err(self.unexpected());
        }
        let expr = self.parse_expr()?;
        Ok(unary(NodeKind::Try, expr))
    }

    /// `if cond { expr } else { expr }` in expression position: both
    /// branches are mandatory, the node still has the fixed three-child
    /// layout of `If`.
    fn parse_if_expr(&mut self) -> Result<Node<'src>, Error> {
        self.next()?;
        let cond = self.parse_expr()?;
        self.consume(TokenKind::LBrace)?;
        let then_expr = self.parse_expr()?;
        self.consume(TokenKind::RBrace)?;
        self.consume(TokenKind::Else)?;
        self.consume(TokenKind::LBrace)?;
        let else_expr = self.parse_expr()?;
        self.consume(TokenKind::RBrace)?;
        let mut if_expr = Node::non_leaf(NodeKind::If);
        if_expr.append(Some(cond));
        if_expr.append(Some(then_expr));
        if_expr.append(Some(else_expr));
        Ok(if_expr)
    }

    // ===== Helper methods =====

    fn current(&self) -> Token<'src> {
        self.lexer.token()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn next(&mut self) -> Result<(), Error> {
        self.lexer.advance()
    }

    fn consume(&mut self, kind: TokenKind) -> Result<(), Error> {
        if !self.check(kind) {
            return Err(self.unexpected());
        }
        self.next()
    }

    /// When the current token is one of `ops`, its AST operator kind.
    fn match_operator(&self, ops: &[TokenKind]) -> Option<NodeKind> {
        let kind = self.current().kind;
        if !ops.contains(&kind) {
            return None;
        }
        operator_node_kind(kind)
    }

    fn parse_ident(&mut self) -> Result<Node<'src>, Error> {
        if !self.check(TokenKind::Ident) {
            return Err(self.unexpected());
        }
        let token = self.current();
        self.next()?;
        Ok(Node::leaf(NodeKind::Ident, token))
    }

    fn unexpected(&self) -> Error {
        let token = self.current();
        let message = match token.kind {
            TokenKind::Eof => format!("unexpected {}", token),
            _ => format!("unexpected token {}", token),
        };
        Error::syntax(self.lexer.file(), token.loc, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::diag::{ErrorKind, SourceLocation};

    fn parse(source: &str) -> Node<'_> {
        let mut parser = Parser::new("test.rill", source).unwrap();
        parser.parse_module().unwrap()
    }

    fn parse_expr(source: &str) -> Node<'_> {
        let mut parser = Parser::new("test.rill", source).unwrap();
        let expr = parser.parse_expr().unwrap();
        assert!(parser.check(TokenKind::Eof), "trailing input after expression");
        expr
    }

    fn parse_err(source: &str) -> Error {
        let mut parser = match Parser::new("test.rill", source) {
            Ok(parser) => parser,
            Err(err) => return err,
        };
        parser.parse_module().unwrap_err()
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expr("a || b && c");
        assert_eq!(
            expr.to_tree_string(),
            "Or:\n  Ident: a\n  And:\n    Ident: b\n    Ident: c\n"
        );
    }

    #[test]
    fn test_mul_binds_tighter_than_add() {
        let expr = parse_expr("1 + 2 * 3");
        assert_eq!(
            expr.to_tree_string(),
            "Add:\n  Int: 1\n  Mul:\n    Int: 2\n    Int: 3\n"
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b = c");
        assert_eq!(
            expr.to_tree_string(),
            "Assign:\n  Ident: a\n  Assign:\n    Ident: b\n    Ident: c\n"
        );
    }

    #[test]
    fn test_compound_assignment_kinds() {
        assert_eq!(parse_expr("a <<= 1").kind(), NodeKind::ShlAssign);
        assert_eq!(parse_expr("a |= 1").kind(), NodeKind::BitOrAssign);
        assert_eq!(parse_expr("a %= 1").kind(), NodeKind::ModAssign);
    }

    #[test]
    fn test_left_associative_chain() {
        let expr = parse_expr("a - b - c");
        assert_eq!(
            expr.to_tree_string(),
            "Sub:\n  Sub:\n    Ident: a\n    Ident: b\n  Ident: c\n"
        );
    }

    #[test]
    fn test_range_binds_looser_than_additive() {
        let expr = parse_expr("0 .. n + 1");
        assert_eq!(
            expr.to_tree_string(),
            "Range:\n  Int: 0\n  Add:\n    Ident: n\n    Int: 1\n"
        );
    }

    #[test]
    fn test_unary_is_right_associative() {
        let expr = parse_expr("!!x");
        assert_eq!(expr.to_tree_string(), "Not:\n  Not:\n    Ident: x\n");
        let expr = parse_expr("-~1");
        assert_eq!(expr.to_tree_string(), "Neg:\n  BitNot:\n    Int: 1\n");
    }

    #[test]
    fn test_postfix_chaining() {
        // Call whose callee is an index whose base is a field access.
        let expr = parse_expr("a.b[0](c)");
        assert_eq!(
            expr.to_tree_string(),
            "Call:\n  Element:\n    Field:\n      Ident: a\n      Ident: b\n    Int: 0\n  Ident: c\n"
        );
    }

    #[test]
    fn test_postfix_applies_to_parenthesized_primary() {
        let expr = parse_expr("(f)(x)");
        assert_eq!(expr.kind(), NodeKind::Call);
        assert_eq!(expr.children().len(), 2);
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expr("null").kind(), NodeKind::Null);
        assert_eq!(parse_expr("true").kind(), NodeKind::True);
        assert_eq!(parse_expr("false").kind(), NodeKind::False);
        assert_eq!(parse_expr("1.5").kind(), NodeKind::Float);
        assert_eq!(parse_expr("'a'").kind(), NodeKind::Rune);
        assert_eq!(parse_expr("\"s\"").kind(), NodeKind::Str);
        assert_eq!(parse_expr("[1, 2]").kind(), NodeKind::Array);
    }

    #[test]
    fn test_new_and_ref_and_try() {
        let expr = parse_expr("new Point(1, 2)");
        assert_eq!(
            expr.to_tree_string(),
            "New:\n  Ident: Point\n  Int: 1\n  Int: 2\n"
        );

        let expr = parse_expr("&xs[0].y");
        assert_eq!(
            expr.to_tree_string(),
            "Ref:\n  Field:\n    Element:\n      Ident: xs\n      Int: 0\n    Ident: y\n"
        );

        let expr = parse_expr("try f(1)");
        assert_eq!(
            expr.to_tree_string(),
            "Try:\n  Call:\n    Ident: f\n    Int: 1\n"
        );
    }

    #[test]
    fn test_if_expression() {
        let expr = parse_expr("if x { 1 } else { 2 }");
        assert_eq!(
            expr.to_tree_string(),
            "If:\n  Ident: x\n  Int: 1\n  Int: 2\n"
        );
    }

    #[test]
    fn test_anonymous_function_literal() {
        let expr = parse_expr("fn Int() { return 1; }");
        assert_eq!(expr.kind(), NodeKind::FuncDecl);
        let children = expr.children();
        assert_eq!(children.len(), 4);
        assert!(children[1].is_none(), "anonymous function has no name");
    }

    #[test]
    fn test_function_declaration() {
        let module = parse("fn Int add(Int a, inout Int b) { return a + b; }");
        let decl = module.children()[0].as_ref().unwrap();
        assert_eq!(decl.kind(), NodeKind::FuncDecl);
        let children = decl.children();
        assert_eq!(children.len(), 4);
        let params = children[2].as_ref().unwrap();
        assert_eq!(params.children().len(), 2);
        let second = params.children()[1].as_ref().unwrap();
        assert_eq!(second.kind(), NodeKind::VarDecl);
        assert_eq!(second.children().len(), 3);
        assert_eq!(
            second.children()[0].as_ref().unwrap().kind(),
            NodeKind::InoutParam
        );
        assert!(second.children()[2].is_none());
    }

    #[test]
    fn test_if_arity_with_and_without_else() {
        let module = parse("fn Int f() { if x { } if y { } else { } }");
        let body = module.children()[0].as_ref().unwrap().children()[3]
            .as_ref()
            .unwrap();
        let without_else = body.children()[0].as_ref().unwrap();
        let with_else = body.children()[1].as_ref().unwrap();
        assert_eq!(without_else.children().len(), 3);
        assert!(without_else.children()[2].is_none());
        assert_eq!(with_else.children().len(), 3);
        assert!(with_else.children()[2].is_some());
    }

    #[test]
    fn test_loops() {
        let module = parse(
            "fn Int f() {\n  loop { break; }\n  while x { continue; }\n  do { } while x;\n  for i in 0..10 { }\n}",
        );
        let body = module.children()[0].as_ref().unwrap().children()[3]
            .as_ref()
            .unwrap();
        let kinds: Vec<NodeKind> = body
            .children()
            .iter()
            .map(|c| c.as_ref().unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Loop, NodeKind::While, NodeKind::DoWhile, NodeKind::For]
        );
    }

    #[test]
    fn test_switch_statement() {
        let module = parse(
            "fn Int f() { switch x { case 1: return 1; case 2: return 2; default: return 0; } }",
        );
        let body = module.children()[0].as_ref().unwrap().children()[3]
            .as_ref()
            .unwrap();
        let switch = body.children()[0].as_ref().unwrap();
        assert_eq!(switch.kind(), NodeKind::Switch);
        let children = switch.children();
        assert_eq!(children.len(), 4);
        assert_eq!(children[1].as_ref().unwrap().kind(), NodeKind::Case);
        assert_eq!(children[2].as_ref().unwrap().kind(), NodeKind::Case);
        assert_eq!(children[3].as_ref().unwrap().kind(), NodeKind::Default);
    }

    #[test]
    fn test_import_declarations() {
        let module = parse("import \"math\";\nimport \"linalg\" as la;");
        let plain = module.children()[0].as_ref().unwrap();
        assert_eq!(plain.to_tree_string(), "ImportDecl:\n  String: math\n  (empty)\n");
        let renamed = module.children()[1].as_ref().unwrap();
        assert_eq!(
            renamed.to_tree_string(),
            "ImportDecl:\n  String: linalg\n  Ident: la\n"
        );
    }

    #[test]
    fn test_typealias_and_generic_types() {
        let module = parse("typealias Table<K, V: Hash> = Map<K, V> + Printable;");
        let decl = module.children()[0].as_ref().unwrap();
        assert_eq!(
            decl.to_tree_string(),
            "TypeDecl:\n  Ident: Table\n  TypeParams:\n    Ident: K\n    Constraint:\n      Ident: V\n      Ident: Hash\n  Intersect:\n    Type:\n      Ident: Map\n      Ident: K\n      Ident: V\n    Ident: Printable\n"
        );
    }

    #[test]
    fn test_function_type() {
        let module = parse("typealias Op = fn Int(Int, inout Int);");
        let decl = module.children()[0].as_ref().unwrap();
        assert_eq!(
            decl.to_tree_string(),
            "TypeDecl:\n  Ident: Op\n  (empty)\n  FuncType:\n    Ident: Int\n    Params:\n      Ident: Int\n      InoutParam:\n        Ident: Int\n"
        );
    }

    #[test]
    fn test_struct_declaration() {
        let module = parse("struct Point { Float x; Float y; }");
        let decl = module.children()[0].as_ref().unwrap();
        assert_eq!(decl.kind(), NodeKind::StructDecl);
        let children = decl.children();
        assert_eq!(children.len(), 4);
        assert!(children[1].is_none(), "no type params");
        let field = children[2].as_ref().unwrap();
        assert_eq!(field.kind(), NodeKind::VarDecl);
        assert_eq!(field.children().len(), 3);
        assert!(field.children()[2].is_none());
    }

    #[test]
    fn test_interface_declaration() {
        let module = parse("interface Shape : Printable { area Float(); scale Void(Float s); }");
        let decl = module.children()[0].as_ref().unwrap();
        assert_eq!(decl.kind(), NodeKind::InterfaceDecl);
        let children = decl.children();
        assert_eq!(children.len(), 5);
        assert!(children[1].is_none());
        assert_eq!(children[2].as_ref().unwrap().kind(), NodeKind::Ident);
        let proto = children[3].as_ref().unwrap();
        assert_eq!(proto.kind(), NodeKind::FuncDecl);
        assert!(proto.children()[3].is_none(), "prototype has no body");
    }

    #[test]
    fn test_let_and_var_declarations() {
        let module = parse("let x = 1;\nvar Int y;\nvar Int z = 2;");
        let let_decl = module.children()[0].as_ref().unwrap();
        assert_eq!(let_decl.to_tree_string(), "LetDecl:\n  Ident: x\n  Int: 1\n");
        let bare = module.children()[1].as_ref().unwrap();
        assert_eq!(
            bare.to_tree_string(),
            "VarDecl:\n  Ident: Int\n  Ident: y\n  (empty)\n"
        );
        let init = module.children()[2].as_ref().unwrap();
        assert_eq!(
            init.to_tree_string(),
            "VarDecl:\n  Ident: Int\n  Ident: z\n  Int: 2\n"
        );
    }

    #[test]
    fn test_whitespace_and_comments_do_not_change_tree() {
        let compact = parse("fn Int f(){return 1+2;}");
        let spaced = parse("fn Int f() {\n  // add\n  return 1 + 2; /* done */\n}");
        assert_eq!(compact.to_tree_string(), spaced.to_tree_string());
    }

    #[test]
    fn test_syntax_error_reports_offending_token() {
        // The name slot is optional, so after `fn f(` the parse is inside
        // the parameter list and `{` is the first token that cannot start
        // a parameter type.
        let err = parse_err("fn f( { }");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(
            err.to_string(),
            "ERROR: unexpected token '{'\n--> test.rill:1:7"
        );

        let err = parse_err("fn Int f( { }");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("unexpected token '{'"));
        assert_eq!(err.location(), SourceLocation::new(1, 11));
    }

    #[test]
    fn test_function_declaration_name_is_optional() {
        let module = parse("fn Int() { return 1; }");
        let decl = module.children()[0].as_ref().unwrap();
        assert_eq!(decl.kind(), NodeKind::FuncDecl);
        let children = decl.children();
        assert_eq!(children.len(), 4);
        assert!(children[1].is_none());
        assert!(children[3].is_some());
    }

    #[test]
    fn test_unexpected_end_of_file() {
        let err = parse_err("fn Int f() {");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("unexpected end of file"));
    }

    #[test]
    fn test_lexical_error_propagates() {
        let err = parse_err("fn Int f() { let s = \"abc");
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert!(err.message.contains("unterminated string literal"));
    }

    #[test]
    fn test_unexpected_declaration_token() {
        let err = parse_err("42;");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.message.contains("unexpected token '42'"));
    }
}
