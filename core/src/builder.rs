use crate::node::{IdentInfo, Node, NodeId, NodeKind, Payload};
use anyhow::{anyhow, bail, Result};
use swc_core::{
    common::{sync::Lrc, FileName, SourceMap, Span, Spanned},
    ecma::{
        ast as js,
        parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax},
    },
};

/// Parses `source` as a script and flattens it into the arborist's node
/// table. Ids are assigned in pre-order; each node's subtree occupies the
/// contiguous id range `id ..= last_descendant`.
pub(crate) fn build(source: &str) -> Result<Vec<Node>> {
    let (script, base) = parse(source)?;
    let mut builder = Builder {
        base,
        source_len: source.len(),
        nodes: Vec::new(),
    };
    builder.script(&script)?;
    Ok(builder.nodes)
}

fn parse(source: &str) -> Result<(js::Script, usize)> {
    let source_map: Lrc<SourceMap> = Lrc::default();
    let source_file = source_map.new_source_file(FileName::Anon.into(), source.to_string());
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        js::EsVersion::default(),
        StringInput::from(&*source_file),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let script = parser
        .parse_script()
        .map_err(|error| anyhow!("{error:?}"))?;
    if let Some(error) = parser.take_errors().into_iter().next() {
        bail!("{error:?}");
    }
    Ok((script, source_file.start_pos.0 as usize))
}

struct Builder {
    base: usize,
    source_len: usize,
    nodes: Vec<Node>,
}

impl Builder {
    fn push(
        &mut self,
        kind: NodeKind,
        span: Span,
        parent: Option<NodeId>,
        parent_key: &'static str,
        payload: Payload,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            kind,
            start: span.lo.0 as usize - self.base,
            end: span.hi.0 as usize - self.base,
            parent,
            parent_key,
            children: Vec::new(),
            scope: 0,
            last_descendant: id,
            payload,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    fn seal(&mut self, id: NodeId) {
        self.nodes[id].last_descendant = self.nodes.len() - 1;
    }

    fn ident(&mut self, ident: &js::Ident, parent: NodeId, key: &'static str) -> NodeId {
        self.push(
            NodeKind::Identifier,
            ident.span,
            Some(parent),
            key,
            Payload::Ident(IdentInfo {
                sym: ident.sym.to_string(),
                ..IdentInfo::default()
            }),
        )
    }

    fn ident_name(&mut self, ident: &js::IdentName, parent: NodeId, key: &'static str) -> NodeId {
        self.push(
            NodeKind::Identifier,
            ident.span,
            Some(parent),
            key,
            Payload::Ident(IdentInfo {
                sym: ident.sym.to_string(),
                ..IdentInfo::default()
            }),
        )
    }

    fn script(&mut self, script: &js::Script) -> Result<()> {
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            kind: NodeKind::Program,
            start: 0,
            end: self.source_len,
            parent: None,
            parent_key: "",
            children: Vec::new(),
            scope: 0,
            last_descendant: id,
            payload: Payload::None,
        });
        for stmt in &script.body {
            self.stmt(stmt, id, "body")?;
        }
        self.seal(id);
        Ok(())
    }

    fn stmt(&mut self, stmt: &js::Stmt, parent: NodeId, key: &'static str) -> Result<()> {
        match stmt {
            js::Stmt::Block(block) => self.block(block, parent, key),
            js::Stmt::Empty(empty) => {
                self.push(NodeKind::EmptyStatement, empty.span, Some(parent), key, Payload::None);
                Ok(())
            }
            js::Stmt::Debugger(debugger) => {
                self.push(
                    NodeKind::DebuggerStatement,
                    debugger.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                Ok(())
            }
            js::Stmt::Return(ret) => {
                let id = self.push(NodeKind::ReturnStatement, ret.span, Some(parent), key, Payload::None);
                if let Some(arg) = &ret.arg {
                    self.expr(arg, id, "argument")?;
                }
                self.seal(id);
                Ok(())
            }
            js::Stmt::Labeled(labeled) => {
                let id = self.push(
                    NodeKind::LabeledStatement,
                    labeled.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.ident(&labeled.label, id, "label");
                self.stmt(&labeled.body, id, "body")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::Break(brk) => {
                let id = self.push(NodeKind::BreakStatement, brk.span, Some(parent), key, Payload::None);
                if let Some(label) = &brk.label {
                    self.ident(label, id, "label");
                }
                self.seal(id);
                Ok(())
            }
            js::Stmt::Continue(cont) => {
                let id = self.push(
                    NodeKind::ContinueStatement,
                    cont.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                if let Some(label) = &cont.label {
                    self.ident(label, id, "label");
                }
                self.seal(id);
                Ok(())
            }
            js::Stmt::If(if_stmt) => {
                let id = self.push(NodeKind::IfStatement, if_stmt.span, Some(parent), key, Payload::None);
                self.expr(&if_stmt.test, id, "test")?;
                self.stmt(&if_stmt.cons, id, "consequent")?;
                if let Some(alt) = &if_stmt.alt {
                    self.stmt(alt, id, "alternate")?;
                }
                self.seal(id);
                Ok(())
            }
            js::Stmt::Switch(switch) => {
                let id = self.push(
                    NodeKind::SwitchStatement,
                    switch.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.expr(&switch.discriminant, id, "discriminant")?;
                for case in &switch.cases {
                    let case_id =
                        self.push(NodeKind::SwitchCase, case.span, Some(id), "cases", Payload::None);
                    if let Some(test) = &case.test {
                        self.expr(test, case_id, "test")?;
                    }
                    for stmt in &case.cons {
                        self.stmt(stmt, case_id, "consequent")?;
                    }
                    self.seal(case_id);
                }
                self.seal(id);
                Ok(())
            }
            js::Stmt::Throw(throw) => {
                let id = self.push(NodeKind::ThrowStatement, throw.span, Some(parent), key, Payload::None);
                self.expr(&throw.arg, id, "argument")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::Try(try_stmt) => {
                let id = self.push(NodeKind::TryStatement, try_stmt.span, Some(parent), key, Payload::None);
                self.block(&try_stmt.block, id, "block")?;
                if let Some(handler) = &try_stmt.handler {
                    let handler_id = self.push(
                        NodeKind::CatchClause,
                        handler.span,
                        Some(id),
                        "handler",
                        Payload::None,
                    );
                    if let Some(param) = &handler.param {
                        self.pat(param, handler_id, "param")?;
                    }
                    self.block(&handler.body, handler_id, "body")?;
                    self.seal(handler_id);
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.block(finalizer, id, "finalizer")?;
                }
                self.seal(id);
                Ok(())
            }
            js::Stmt::While(while_stmt) => {
                let id = self.push(
                    NodeKind::WhileStatement,
                    while_stmt.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.expr(&while_stmt.test, id, "test")?;
                self.stmt(&while_stmt.body, id, "body")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::DoWhile(do_while) => {
                let id = self.push(
                    NodeKind::DoWhileStatement,
                    do_while.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.stmt(&do_while.body, id, "body")?;
                self.expr(&do_while.test, id, "test")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::For(for_stmt) => {
                let id = self.push(NodeKind::ForStatement, for_stmt.span, Some(parent), key, Payload::None);
                match &for_stmt.init {
                    Some(js::VarDeclOrExpr::VarDecl(decl)) => self.var_decl(decl, id, "init")?,
                    Some(js::VarDeclOrExpr::Expr(expr)) => self.expr(expr, id, "init")?,
                    None => {}
                }
                if let Some(test) = &for_stmt.test {
                    self.expr(test, id, "test")?;
                }
                if let Some(update) = &for_stmt.update {
                    self.expr(update, id, "update")?;
                }
                self.stmt(&for_stmt.body, id, "body")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::ForIn(for_in) => {
                let id = self.push(NodeKind::ForInStatement, for_in.span, Some(parent), key, Payload::None);
                self.for_head(&for_in.left, id)?;
                self.expr(&for_in.right, id, "right")?;
                self.stmt(&for_in.body, id, "body")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::ForOf(for_of) => {
                let id = self.push(NodeKind::ForOfStatement, for_of.span, Some(parent), key, Payload::None);
                self.for_head(&for_of.left, id)?;
                self.expr(&for_of.right, id, "right")?;
                self.stmt(&for_of.body, id, "body")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::Decl(decl) => self.decl(decl, parent, key),
            js::Stmt::Expr(expr_stmt) => {
                let id = self.push(
                    NodeKind::ExpressionStatement,
                    expr_stmt.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.expr(&expr_stmt.expr, id, "expression")?;
                self.seal(id);
                Ok(())
            }
            js::Stmt::With(_) => bail!("`with` statements are not supported"),
        }
    }

    fn block(&mut self, block: &js::BlockStmt, parent: NodeId, key: &'static str) -> Result<()> {
        let id = self.push(NodeKind::BlockStatement, block.span, Some(parent), key, Payload::None);
        for stmt in &block.stmts {
            self.stmt(stmt, id, "body")?;
        }
        self.seal(id);
        Ok(())
    }

    fn for_head(&mut self, head: &js::ForHead, parent: NodeId) -> Result<()> {
        match head {
            js::ForHead::VarDecl(decl) => self.var_decl(decl, parent, "left"),
            js::ForHead::Pat(pat) => self.pat(pat, parent, "left"),
            js::ForHead::UsingDecl(_) => bail!("`using` declarations are not supported"),
        }
    }

    fn decl(&mut self, decl: &js::Decl, parent: NodeId, key: &'static str) -> Result<()> {
        match decl {
            js::Decl::Class(class_decl) => {
                let id = self.push(
                    NodeKind::ClassDeclaration,
                    class_decl.class.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.ident(&class_decl.ident, id, "id");
                self.class(&class_decl.class, id)?;
                self.seal(id);
                Ok(())
            }
            js::Decl::Fn(fn_decl) => {
                let id = self.push(
                    NodeKind::FunctionDeclaration,
                    fn_decl.function.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.ident(&fn_decl.ident, id, "id");
                self.function(&fn_decl.function, id)?;
                self.seal(id);
                Ok(())
            }
            js::Decl::Var(var_decl) => self.var_decl(var_decl, parent, key),
            _ => bail!("unsupported declaration"),
        }
    }

    fn var_decl(&mut self, decl: &js::VarDecl, parent: NodeId, key: &'static str) -> Result<()> {
        let kind = match decl.kind {
            js::VarDeclKind::Var => "var",
            js::VarDeclKind::Let => "let",
            js::VarDeclKind::Const => "const",
        };
        let id = self.push(
            NodeKind::VariableDeclaration,
            decl.span,
            Some(parent),
            key,
            Payload::VarKind(kind),
        );
        for declarator in &decl.decls {
            let declarator_id = self.push(
                NodeKind::VariableDeclarator,
                declarator.span,
                Some(id),
                "declarations",
                Payload::None,
            );
            self.pat(&declarator.name, declarator_id, "id")?;
            if let Some(init) = &declarator.init {
                self.expr(init, declarator_id, "init")?;
            }
            self.seal(declarator_id);
        }
        self.seal(id);
        Ok(())
    }

    fn function(&mut self, function: &js::Function, parent: NodeId) -> Result<()> {
        for param in &function.params {
            self.pat(&param.pat, parent, "params")?;
        }
        if let Some(body) = &function.body {
            self.block(body, parent, "body")?;
        }
        Ok(())
    }

    fn class(&mut self, class: &js::Class, parent: NodeId) -> Result<()> {
        if let Some(super_class) = &class.super_class {
            self.expr(super_class, parent, "superClass")?;
        }
        let body_id = self.push(NodeKind::ClassBody, class.span, Some(parent), "body", Payload::None);
        for member in &class.body {
            self.class_member(member, body_id)?;
        }
        self.seal(body_id);
        Ok(())
    }

    fn class_member(&mut self, member: &js::ClassMember, parent: NodeId) -> Result<()> {
        match member {
            js::ClassMember::Constructor(ctor) => {
                let id = self.push(
                    NodeKind::MethodDefinition,
                    ctor.span,
                    Some(parent),
                    "body",
                    Payload::Computed(false),
                );
                self.prop_name(&ctor.key, id)?;
                let function_id = self.push(
                    NodeKind::FunctionExpression,
                    ctor.span,
                    Some(id),
                    "value",
                    Payload::None,
                );
                for param in &ctor.params {
                    if let js::ParamOrTsParamProp::Param(param) = param {
                        self.pat(&param.pat, function_id, "params")?;
                    }
                }
                if let Some(body) = &ctor.body {
                    self.block(body, function_id, "body")?;
                }
                self.seal(function_id);
                self.seal(id);
                Ok(())
            }
            js::ClassMember::Method(method) => {
                let id = self.push(
                    NodeKind::MethodDefinition,
                    method.span,
                    Some(parent),
                    "body",
                    Payload::Computed(matches!(method.key, js::PropName::Computed(_))),
                );
                self.prop_name(&method.key, id)?;
                let function_id = self.push(
                    NodeKind::FunctionExpression,
                    method.function.span,
                    Some(id),
                    "value",
                    Payload::None,
                );
                self.function(&method.function, function_id)?;
                self.seal(function_id);
                self.seal(id);
                Ok(())
            }
            js::ClassMember::ClassProp(prop) => {
                let id = self.push(
                    NodeKind::PropertyDefinition,
                    prop.span,
                    Some(parent),
                    "body",
                    Payload::Computed(matches!(prop.key, js::PropName::Computed(_))),
                );
                self.prop_name(&prop.key, id)?;
                if let Some(value) = &prop.value {
                    self.expr(value, id, "value")?;
                }
                self.seal(id);
                Ok(())
            }
            js::ClassMember::StaticBlock(block) => {
                let id = self.push(NodeKind::StaticBlock, block.span, Some(parent), "body", Payload::None);
                for stmt in &block.body.stmts {
                    self.stmt(stmt, id, "body")?;
                }
                self.seal(id);
                Ok(())
            }
            js::ClassMember::Empty(_) => Ok(()),
            _ => bail!("unsupported class member"),
        }
    }

    fn prop_name(&mut self, key: &js::PropName, parent: NodeId) -> Result<()> {
        match key {
            js::PropName::Ident(ident) => {
                self.ident_name(ident, parent, "key");
                Ok(())
            }
            js::PropName::Str(value) => {
                self.push(
                    NodeKind::Literal,
                    value.span,
                    Some(parent),
                    "key",
                    Payload::Str(value.value.to_string()),
                );
                Ok(())
            }
            js::PropName::Num(value) => {
                self.push(
                    NodeKind::Literal,
                    value.span,
                    Some(parent),
                    "key",
                    Payload::Num(value.value),
                );
                Ok(())
            }
            js::PropName::BigInt(value) => {
                self.push(
                    NodeKind::BigIntLiteral,
                    value.span,
                    Some(parent),
                    "key",
                    Payload::BigInt(value.value.to_string()),
                );
                Ok(())
            }
            js::PropName::Computed(computed) => self.expr(&computed.expr, parent, "key"),
        }
    }

    fn pat(&mut self, pat: &js::Pat, parent: NodeId, key: &'static str) -> Result<()> {
        match pat {
            js::Pat::Ident(binding) => {
                self.ident(&binding.id, parent, key);
                Ok(())
            }
            js::Pat::Array(array) => {
                let id = self.push(NodeKind::ArrayPattern, array.span, Some(parent), key, Payload::None);
                for elem in array.elems.iter().flatten() {
                    self.pat(elem, id, "elements")?;
                }
                self.seal(id);
                Ok(())
            }
            js::Pat::Rest(rest) => {
                let id = self.push(NodeKind::RestElement, rest.span, Some(parent), key, Payload::None);
                self.pat(&rest.arg, id, "argument")?;
                self.seal(id);
                Ok(())
            }
            js::Pat::Object(object) => {
                let id = self.push(NodeKind::ObjectPattern, object.span, Some(parent), key, Payload::None);
                for prop in &object.props {
                    match prop {
                        js::ObjectPatProp::KeyValue(key_value) => {
                            let prop_id = self.push(
                                NodeKind::Property,
                                key_value.span(),
                                Some(id),
                                "properties",
                                Payload::Computed(matches!(key_value.key, js::PropName::Computed(_))),
                            );
                            self.prop_name(&key_value.key, prop_id)?;
                            self.pat(&key_value.value, prop_id, "value")?;
                            self.seal(prop_id);
                        }
                        js::ObjectPatProp::Assign(assign) => {
                            let prop_id = self.push(
                                NodeKind::Property,
                                assign.span,
                                Some(id),
                                "properties",
                                Payload::Computed(false),
                            );
                            self.ident(&assign.key.id, prop_id, "value");
                            if let Some(value) = &assign.value {
                                self.expr(value, prop_id, "right")?;
                            }
                            self.seal(prop_id);
                        }
                        js::ObjectPatProp::Rest(rest) => {
                            let rest_id = self.push(
                                NodeKind::RestElement,
                                rest.span,
                                Some(id),
                                "properties",
                                Payload::None,
                            );
                            self.pat(&rest.arg, rest_id, "argument")?;
                            self.seal(rest_id);
                        }
                    }
                }
                self.seal(id);
                Ok(())
            }
            js::Pat::Assign(assign) => {
                let id = self.push(
                    NodeKind::AssignmentPattern,
                    assign.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.pat(&assign.left, id, "left")?;
                self.expr(&assign.right, id, "right")?;
                self.seal(id);
                Ok(())
            }
            js::Pat::Expr(expr) => self.expr(expr, parent, key),
            js::Pat::Invalid(_) => bail!("invalid pattern"),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn expr(&mut self, expr: &js::Expr, parent: NodeId, key: &'static str) -> Result<()> {
        match expr {
            js::Expr::This(this) => {
                self.push(NodeKind::ThisExpression, this.span, Some(parent), key, Payload::None);
                Ok(())
            }
            js::Expr::Array(array) => {
                let id = self.push(NodeKind::ArrayExpression, array.span, Some(parent), key, Payload::None);
                for elem in array.elems.iter().flatten() {
                    if elem.spread.is_some() {
                        let spread_id = self.push(
                            NodeKind::SpreadElement,
                            elem.span(),
                            Some(id),
                            "elements",
                            Payload::None,
                        );
                        self.expr(&elem.expr, spread_id, "argument")?;
                        self.seal(spread_id);
                    } else {
                        self.expr(&elem.expr, id, "elements")?;
                    }
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::Object(object) => {
                let id = self.push(NodeKind::ObjectExpression, object.span, Some(parent), key, Payload::None);
                for prop in &object.props {
                    self.prop(prop, id)?;
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::Fn(fn_expr) => {
                let id = self.push(
                    NodeKind::FunctionExpression,
                    fn_expr.function.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                if let Some(ident) = &fn_expr.ident {
                    self.ident(ident, id, "id");
                }
                self.function(&fn_expr.function, id)?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Unary(unary) => {
                let id = self.push(
                    NodeKind::UnaryExpression,
                    unary.span,
                    Some(parent),
                    key,
                    Payload::Op(unary_op(unary.op)),
                );
                self.expr(&unary.arg, id, "argument")?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Update(update) => {
                let id = self.push(
                    NodeKind::UpdateExpression,
                    update.span,
                    Some(parent),
                    key,
                    Payload::Op(match update.op {
                        js::UpdateOp::PlusPlus => "++",
                        js::UpdateOp::MinusMinus => "--",
                    }),
                );
                self.expr(&update.arg, id, "argument")?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Bin(bin) => {
                let (kind, op) = binary_op(bin.op);
                let id = self.push(kind, bin.span, Some(parent), key, Payload::Op(op));
                self.expr(&bin.left, id, "left")?;
                self.expr(&bin.right, id, "right")?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Assign(assign) => {
                let id = self.push(
                    NodeKind::AssignmentExpression,
                    assign.span,
                    Some(parent),
                    key,
                    Payload::Op(assign_op(assign.op)),
                );
                self.assign_target(&assign.left, id)?;
                self.expr(&assign.right, id, "right")?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Member(member) => self.member(member, parent, key),
            js::Expr::SuperProp(super_prop) => {
                let id = self.push(
                    NodeKind::MemberExpression,
                    super_prop.span,
                    Some(parent),
                    key,
                    Payload::Computed(matches!(super_prop.prop, js::SuperProp::Computed(_))),
                );
                self.push(NodeKind::Super, super_prop.obj.span, Some(id), "object", Payload::None);
                match &super_prop.prop {
                    js::SuperProp::Ident(ident) => {
                        self.ident_name(ident, id, "property");
                    }
                    js::SuperProp::Computed(computed) => {
                        self.expr(&computed.expr, id, "property")?;
                    }
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::Cond(cond) => {
                let id = self.push(
                    NodeKind::ConditionalExpression,
                    cond.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.expr(&cond.test, id, "test")?;
                self.expr(&cond.cons, id, "consequent")?;
                self.expr(&cond.alt, id, "alternate")?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Call(call) => {
                let id = self.push(NodeKind::CallExpression, call.span, Some(parent), key, Payload::None);
                match &call.callee {
                    js::Callee::Expr(callee) => self.expr(callee, id, "callee")?,
                    js::Callee::Super(sup) => {
                        self.push(NodeKind::Super, sup.span, Some(id), "callee", Payload::None);
                    }
                    js::Callee::Import(_) => bail!("dynamic `import` is not supported"),
                }
                for arg in &call.args {
                    self.arg(arg, id)?;
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::New(new) => {
                let id = self.push(NodeKind::NewExpression, new.span, Some(parent), key, Payload::None);
                self.expr(&new.callee, id, "callee")?;
                for arg in new.args.iter().flatten() {
                    self.arg(arg, id)?;
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::Seq(seq) => {
                let id = self.push(
                    NodeKind::SequenceExpression,
                    seq.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                for expr in &seq.exprs {
                    self.expr(expr, id, "expressions")?;
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::Ident(ident) => {
                self.ident(ident, parent, key);
                Ok(())
            }
            js::Expr::Lit(lit) => self.lit(lit, parent, key),
            js::Expr::Tpl(tpl) => {
                let id = self.push(NodeKind::TemplateLiteral, tpl.span, Some(parent), key, Payload::None);
                self.template(tpl, id)?;
                self.seal(id);
                Ok(())
            }
            js::Expr::TaggedTpl(tagged) => {
                let id = self.push(
                    NodeKind::TaggedTemplateExpression,
                    tagged.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.expr(&tagged.tag, id, "tag")?;
                let quasi_id = self.push(
                    NodeKind::TemplateLiteral,
                    tagged.tpl.span,
                    Some(id),
                    "quasi",
                    Payload::None,
                );
                self.template(&tagged.tpl, quasi_id)?;
                self.seal(quasi_id);
                self.seal(id);
                Ok(())
            }
            js::Expr::Arrow(arrow) => {
                let id = self.push(
                    NodeKind::ArrowFunctionExpression,
                    arrow.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                for param in &arrow.params {
                    self.pat(param, id, "params")?;
                }
                match &*arrow.body {
                    js::BlockStmtOrExpr::BlockStmt(block) => self.block(block, id, "body")?,
                    js::BlockStmtOrExpr::Expr(body) => self.expr(body, id, "body")?,
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::Class(class_expr) => {
                let id = self.push(
                    NodeKind::ClassExpression,
                    class_expr.class.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                if let Some(ident) = &class_expr.ident {
                    self.ident(ident, id, "id");
                }
                self.class(&class_expr.class, id)?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Yield(yield_expr) => {
                let id = self.push(
                    NodeKind::YieldExpression,
                    yield_expr.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                if let Some(arg) = &yield_expr.arg {
                    self.expr(arg, id, "argument")?;
                }
                self.seal(id);
                Ok(())
            }
            js::Expr::MetaProp(meta) => {
                self.push(NodeKind::MetaProperty, meta.span, Some(parent), key, Payload::None);
                Ok(())
            }
            js::Expr::Await(await_expr) => {
                let id = self.push(
                    NodeKind::AwaitExpression,
                    await_expr.span,
                    Some(parent),
                    key,
                    Payload::None,
                );
                self.expr(&await_expr.arg, id, "argument")?;
                self.seal(id);
                Ok(())
            }
            js::Expr::Paren(paren) => self.expr(&paren.expr, parent, key),
            js::Expr::OptChain(opt_chain) => match &*opt_chain.base {
                js::OptChainBase::Member(member) => self.member(member, parent, key),
                js::OptChainBase::Call(call) => {
                    let id = self.push(
                        NodeKind::CallExpression,
                        call.span,
                        Some(parent),
                        key,
                        Payload::None,
                    );
                    self.expr(&call.callee, id, "callee")?;
                    for arg in &call.args {
                        self.arg(arg, id)?;
                    }
                    self.seal(id);
                    Ok(())
                }
            },
            _ => bail!("unsupported expression"),
        }
    }

    fn member(&mut self, member: &js::MemberExpr, parent: NodeId, key: &'static str) -> Result<()> {
        let id = self.push(
            NodeKind::MemberExpression,
            member.span,
            Some(parent),
            key,
            Payload::Computed(matches!(member.prop, js::MemberProp::Computed(_))),
        );
        self.expr(&member.obj, id, "object")?;
        match &member.prop {
            js::MemberProp::Ident(ident) => {
                self.ident_name(ident, id, "property");
            }
            js::MemberProp::Computed(computed) => {
                self.expr(&computed.expr, id, "property")?;
            }
            js::MemberProp::PrivateName(_) => bail!("private names are not supported"),
        }
        self.seal(id);
        Ok(())
    }

    fn assign_target(&mut self, target: &js::AssignTarget, parent: NodeId) -> Result<()> {
        match target {
            js::AssignTarget::Simple(simple) => match simple {
                js::SimpleAssignTarget::Ident(binding) => {
                    self.ident(&binding.id, parent, "left");
                    Ok(())
                }
                js::SimpleAssignTarget::Member(member) => self.member(member, parent, "left"),
                js::SimpleAssignTarget::Paren(paren) => self.expr(&paren.expr, parent, "left"),
                _ => bail!("unsupported assignment target"),
            },
            js::AssignTarget::Pat(pat) => match pat {
                js::AssignTargetPat::Array(array) => {
                    self.pat(&js::Pat::Array(array.clone()), parent, "left")
                }
                js::AssignTargetPat::Object(object) => {
                    self.pat(&js::Pat::Object(object.clone()), parent, "left")
                }
                js::AssignTargetPat::Invalid(_) => bail!("invalid assignment target"),
            },
        }
    }

    fn arg(&mut self, arg: &js::ExprOrSpread, parent: NodeId) -> Result<()> {
        if arg.spread.is_some() {
            let id = self.push(
                NodeKind::SpreadElement,
                arg.span(),
                Some(parent),
                "arguments",
                Payload::None,
            );
            self.expr(&arg.expr, id, "argument")?;
            self.seal(id);
            Ok(())
        } else {
            self.expr(&arg.expr, parent, "arguments")
        }
    }

    fn prop(&mut self, prop: &js::PropOrSpread, parent: NodeId) -> Result<()> {
        match prop {
            js::PropOrSpread::Spread(spread) => {
                let id = self.push(
                    NodeKind::SpreadElement,
                    spread.expr.span(),
                    Some(parent),
                    "properties",
                    Payload::None,
                );
                self.expr(&spread.expr, id, "argument")?;
                self.seal(id);
                Ok(())
            }
            js::PropOrSpread::Prop(prop) => match &**prop {
                js::Prop::Shorthand(ident) => {
                    let id = self.push(
                        NodeKind::Property,
                        ident.span,
                        Some(parent),
                        "properties",
                        Payload::Computed(false),
                    );
                    self.ident(ident, id, "value");
                    self.seal(id);
                    Ok(())
                }
                js::Prop::KeyValue(key_value) => {
                    let id = self.push(
                        NodeKind::Property,
                        key_value.span(),
                        Some(parent),
                        "properties",
                        Payload::Computed(matches!(key_value.key, js::PropName::Computed(_))),
                    );
                    self.prop_name(&key_value.key, id)?;
                    self.expr(&key_value.value, id, "value")?;
                    self.seal(id);
                    Ok(())
                }
                js::Prop::Assign(assign) => {
                    let id = self.push(
                        NodeKind::Property,
                        assign.span,
                        Some(parent),
                        "properties",
                        Payload::Computed(false),
                    );
                    self.ident(&assign.key, id, "key");
                    self.expr(&assign.value, id, "value")?;
                    self.seal(id);
                    Ok(())
                }
                js::Prop::Getter(getter) => {
                    let id = self.push(
                        NodeKind::Property,
                        getter.span,
                        Some(parent),
                        "properties",
                        Payload::Computed(matches!(getter.key, js::PropName::Computed(_))),
                    );
                    self.prop_name(&getter.key, id)?;
                    let function_id = self.push(
                        NodeKind::FunctionExpression,
                        getter.span,
                        Some(id),
                        "value",
                        Payload::None,
                    );
                    if let Some(body) = &getter.body {
                        self.block(body, function_id, "body")?;
                    }
                    self.seal(function_id);
                    self.seal(id);
                    Ok(())
                }
                js::Prop::Setter(setter) => {
                    let id = self.push(
                        NodeKind::Property,
                        setter.span,
                        Some(parent),
                        "properties",
                        Payload::Computed(matches!(setter.key, js::PropName::Computed(_))),
                    );
                    self.prop_name(&setter.key, id)?;
                    let function_id = self.push(
                        NodeKind::FunctionExpression,
                        setter.span,
                        Some(id),
                        "value",
                        Payload::None,
                    );
                    self.pat(&setter.param, function_id, "params")?;
                    if let Some(body) = &setter.body {
                        self.block(body, function_id, "body")?;
                    }
                    self.seal(function_id);
                    self.seal(id);
                    Ok(())
                }
                js::Prop::Method(method) => {
                    let id = self.push(
                        NodeKind::Property,
                        method.span(),
                        Some(parent),
                        "properties",
                        Payload::Computed(matches!(method.key, js::PropName::Computed(_))),
                    );
                    self.prop_name(&method.key, id)?;
                    let function_id = self.push(
                        NodeKind::FunctionExpression,
                        method.function.span,
                        Some(id),
                        "value",
                        Payload::None,
                    );
                    self.function(&method.function, function_id)?;
                    self.seal(function_id);
                    self.seal(id);
                    Ok(())
                }
            },
        }
    }

    fn template(&mut self, tpl: &js::Tpl, parent: NodeId) -> Result<()> {
        let mut exprs = tpl.exprs.iter();
        for quasi in &tpl.quasis {
            self.push(
                NodeKind::TemplateElement,
                quasi.span,
                Some(parent),
                "quasis",
                Payload::Str(
                    quasi
                        .cooked
                        .as_ref()
                        .map_or_else(|| quasi.raw.to_string(), ToString::to_string),
                ),
            );
            if let Some(expr) = exprs.next() {
                self.expr(expr, parent, "expressions")?;
            }
        }
        Ok(())
    }

    fn lit(&mut self, lit: &js::Lit, parent: NodeId, key: &'static str) -> Result<()> {
        match lit {
            js::Lit::Str(value) => {
                self.push(
                    NodeKind::Literal,
                    value.span,
                    Some(parent),
                    key,
                    Payload::Str(value.value.to_string()),
                );
            }
            js::Lit::Bool(value) => {
                self.push(
                    NodeKind::Literal,
                    value.span,
                    Some(parent),
                    key,
                    Payload::Bool(value.value),
                );
            }
            js::Lit::Null(value) => {
                self.push(NodeKind::Literal, value.span, Some(parent), key, Payload::Null);
            }
            js::Lit::Num(value) => {
                self.push(
                    NodeKind::Literal,
                    value.span,
                    Some(parent),
                    key,
                    Payload::Num(value.value),
                );
            }
            js::Lit::BigInt(value) => {
                self.push(
                    NodeKind::BigIntLiteral,
                    value.span,
                    Some(parent),
                    key,
                    Payload::BigInt(value.value.to_string()),
                );
            }
            js::Lit::Regex(value) => {
                self.push(
                    NodeKind::RegExpLiteral,
                    value.span,
                    Some(parent),
                    key,
                    Payload::Regex {
                        pattern: value.exp.to_string(),
                        flags: value.flags.to_string(),
                    },
                );
            }
            js::Lit::JSXText(_) => bail!("unsupported literal"),
        }
        Ok(())
    }
}

fn unary_op(op: js::UnaryOp) -> &'static str {
    match op {
        js::UnaryOp::Minus => "-",
        js::UnaryOp::Plus => "+",
        js::UnaryOp::Bang => "!",
        js::UnaryOp::Tilde => "~",
        js::UnaryOp::TypeOf => "typeof",
        js::UnaryOp::Void => "void",
        js::UnaryOp::Delete => "delete",
    }
}

fn binary_op(op: js::BinaryOp) -> (NodeKind, &'static str) {
    let logical = NodeKind::LogicalExpression;
    let binary = NodeKind::BinaryExpression;
    match op {
        js::BinaryOp::EqEq => (binary, "=="),
        js::BinaryOp::NotEq => (binary, "!="),
        js::BinaryOp::EqEqEq => (binary, "==="),
        js::BinaryOp::NotEqEq => (binary, "!=="),
        js::BinaryOp::Lt => (binary, "<"),
        js::BinaryOp::LtEq => (binary, "<="),
        js::BinaryOp::Gt => (binary, ">"),
        js::BinaryOp::GtEq => (binary, ">="),
        js::BinaryOp::LShift => (binary, "<<"),
        js::BinaryOp::RShift => (binary, ">>"),
        js::BinaryOp::ZeroFillRShift => (binary, ">>>"),
        js::BinaryOp::Add => (binary, "+"),
        js::BinaryOp::Sub => (binary, "-"),
        js::BinaryOp::Mul => (binary, "*"),
        js::BinaryOp::Div => (binary, "/"),
        js::BinaryOp::Mod => (binary, "%"),
        js::BinaryOp::BitOr => (binary, "|"),
        js::BinaryOp::BitXor => (binary, "^"),
        js::BinaryOp::BitAnd => (binary, "&"),
        js::BinaryOp::In => (binary, "in"),
        js::BinaryOp::InstanceOf => (binary, "instanceof"),
        js::BinaryOp::Exp => (binary, "**"),
        js::BinaryOp::LogicalOr => (logical, "||"),
        js::BinaryOp::LogicalAnd => (logical, "&&"),
        js::BinaryOp::NullishCoalescing => (logical, "??"),
    }
}

fn assign_op(op: js::AssignOp) -> &'static str {
    match op {
        js::AssignOp::Assign => "=",
        js::AssignOp::AddAssign => "+=",
        js::AssignOp::SubAssign => "-=",
        js::AssignOp::MulAssign => "*=",
        js::AssignOp::DivAssign => "/=",
        js::AssignOp::ModAssign => "%=",
        js::AssignOp::LShiftAssign => "<<=",
        js::AssignOp::RShiftAssign => ">>=",
        js::AssignOp::ZeroFillRShiftAssign => ">>>=",
        js::AssignOp::BitOrAssign => "|=",
        js::AssignOp::BitXorAssign => "^=",
        js::AssignOp::BitAndAssign => "&=",
        js::AssignOp::ExpAssign => "**=",
        js::AssignOp::AndAssign => "&&=",
        js::AssignOp::OrAssign => "||=",
        js::AssignOp::NullishAssign => "??=",
    }
}
