//! Shared helpers for the lowering tests: IR shorthands and a compact,
//! single-line C#-like renderer so expected output reads like source.

#![allow(dead_code)]

use unfold_core::ast::{
    Arg, BinOp, CatchClause, Expr, InitValue, Initializer, LambdaBody, Literal, Pattern, PostfixOp, Stmt, SwitchLabel,
    Syntax, UnaryOp,
};
use unfold_core::ir::{MethodRef, ParamMode, Type};
use unfold_core::{CoreError, LowerConfig, Mode, Node, Translation, Translator};

// ---------------------------------------------------------------------------
// IR shorthands
// ---------------------------------------------------------------------------

pub fn program() -> Type {
    Type::named("Demo", "Program")
}

/// Static `Program.name(args)` call returning `ty`.
pub fn call(name: &str, args: Vec<Node>, ty: Type) -> Node {
    Node::call_static(MethodRef::new(program(), name), args, ty)
}

/// Static void call `Program.name(args)`.
pub fn call_void(name: &str, args: Vec<Node>) -> Node {
    call(name, args, Type::Void)
}

/// Static `Program.name()` returning an int.
pub fn call_int(name: &str) -> Node {
    call(name, vec![], Type::int())
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

pub fn translate(node: &Node, mode: Mode) -> Translation {
    translate_with(LowerConfig::default(), node, mode)
}

pub fn translate_with(config: LowerConfig, node: &Node, mode: Mode) -> Translation {
    match Translator::new(config).translate(node, mode) {
        Ok(t) => t,
        Err(e) => panic!("translation failed: {e}"),
    }
}

pub fn stmt_text(node: &Node) -> String {
    render(&translate(node, Mode::Statement).syntax)
}

pub fn expr_text(node: &Node) -> String {
    render(&translate(node, Mode::Expression).syntax)
}

pub fn translate_err(node: &Node, mode: Mode) -> CoreError {
    match Translator::default().translate(node, mode) {
        Ok(t) => panic!("Expected an error, got: {}", render(&t.syntax)),
        Err(e) => e,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(syntax: &Syntax) -> String {
    match syntax {
        Syntax::Expr(e) => expr(e),
        Syntax::Stmt(s) => stmt(s),
    }
}

pub fn ty(t: &Type) -> String {
    match t {
        Type::Void => "void".into(),
        Type::Bool => "bool".into(),
        Type::Char => "char".into(),
        Type::Int(8) => "sbyte".into(),
        Type::Int(16) => "short".into(),
        Type::Int(64) => "long".into(),
        Type::Int(_) => "int".into(),
        Type::UInt(8) => "byte".into(),
        Type::UInt(16) => "ushort".into(),
        Type::UInt(64) => "ulong".into(),
        Type::UInt(_) => "uint".into(),
        Type::Float(32) => "float".into(),
        Type::Float(_) => "double".into(),
        Type::Decimal => "decimal".into(),
        Type::String => "string".into(),
        Type::Object => "object".into(),
        Type::Array(elem) => format!("{}[]", ty(elem)),
        Type::Named(named) => {
            let path = named.path.join(".");
            if named.args.is_empty() {
                path
            } else {
                let args: Vec<String> = named.args.iter().map(ty).collect();
                format!("{path}<{}>", args.join(", "))
            }
        }
        Type::Anonymous(name) => name.clone(),
    }
}

fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Null => "null".into(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::UInt(u) => format!("{u}u"),
        Literal::Float(f) => format!("{f:?}"),
        Literal::Decimal(d) => format!("{d}m"),
        Literal::Char(c) => format!("'{c}'"),
        Literal::String(s) => format!("{s:?}"),
    }
}

fn bin_op(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::LogicalAnd => "&&",
        BinOp::LogicalOr => "||",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::Coalesce => "??",
    }
}

/// Operand position: anything that is not a primary expression gets
/// parentheses.
fn operand(e: &Expr) -> String {
    match e {
        Expr::Literal(_)
        | Expr::Ident(_)
        | Expr::Call { .. }
        | Expr::CallIndirect { .. }
        | Expr::Field { .. }
        | Expr::TypeRef(_)
        | Expr::Index { .. }
        | Expr::New { .. }
        | Expr::NewWithInit { .. }
        | Expr::AnonymousNew { .. }
        | Expr::ArrayInit { .. }
        | Expr::ArrayBounds { .. }
        | Expr::TypeOf(_)
        | Expr::Default(_)
        | Expr::TupleInit(_) => expr(e),
        _ => format!("({})", expr(e)),
    }
}

fn args(list: &[Arg]) -> String {
    list.iter()
        .map(|a| {
            let prefix = match a.mode {
                ParamMode::Value => "",
                ParamMode::Ref => "ref ",
                ParamMode::Out => "out ",
                ParamMode::In => "in ",
            };
            format!("{prefix}{}", expr(&a.value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn exprs(list: &[Expr]) -> String {
    list.iter().map(expr).collect::<Vec<_>>().join(", ")
}

pub fn expr(e: &Expr) -> String {
    match e {
        Expr::Literal(lit) => literal(lit),
        Expr::Ident(name) => name.clone(),
        Expr::Binary { op, lhs, rhs } => format!("{} {} {}", operand(lhs), bin_op(*op), operand(rhs)),
        Expr::Unary { op, expr: inner } => {
            let op = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Plus => "+",
                UnaryOp::Not => "!",
                UnaryOp::BitNot => "~",
                UnaryOp::PreIncrement => "++",
                UnaryOp::PreDecrement => "--",
            };
            format!("{op}{}", operand(inner))
        }
        Expr::Postfix { op, expr: inner } => {
            let op = match op {
                PostfixOp::PostIncrement => "++",
                PostfixOp::PostDecrement => "--",
            };
            format!("{}{op}", operand(inner))
        }
        Expr::Assign { op, target, value } => match op {
            Some(op) => format!("{} {}= {}", expr(target), bin_op(*op), expr(value)),
            None => format!("{} = {}", expr(target), expr(value)),
        },
        Expr::Ternary {
            cond,
            then_val,
            else_val,
        } => format!("{} ? {} : {}", operand(cond), operand(then_val), operand(else_val)),
        Expr::Switch { value, arms } => {
            let arms: Vec<String> = arms
                .iter()
                .map(|arm| {
                    let pattern = match &arm.pattern {
                        Pattern::Const(e) => expr(e),
                        Pattern::Discard => "_".into(),
                    };
                    format!("{pattern} => {}", expr(&arm.value))
                })
                .collect();
            format!("{} switch {{ {} }}", operand(value), arms.join(", "))
        }
        Expr::Call {
            callee,
            generic_args,
            args: list,
        } => {
            let generics = if generic_args.is_empty() {
                String::new()
            } else {
                format!("<{}>", generic_args.iter().map(ty).collect::<Vec<_>>().join(", "))
            };
            format!("{}{generics}({})", expr(callee), args(list))
        }
        Expr::CallIndirect { callee, args: list } => format!("{}({})", operand(callee), args(list)),
        Expr::Field { object, field } => format!("{}.{field}", operand(object)),
        Expr::TypeRef(t) => ty(t),
        Expr::Index { collection, indices } => format!("{}[{}]", operand(collection), exprs(indices)),
        Expr::New { ty: t, args: list } => format!("new {}({})", ty(t), args(list)),
        Expr::NewWithInit {
            ty: t,
            args: list,
            init: body,
        } => {
            if list.is_empty() {
                format!("new {} {}", ty(t), initializer(body))
            } else {
                format!("new {}({}) {}", ty(t), args(list), initializer(body))
            }
        }
        Expr::AnonymousNew { fields } => {
            let fields: Vec<String> = fields.iter().map(|(n, v)| format!("{n} = {}", expr(v))).collect();
            format!("new {{ {} }}", fields.join(", "))
        }
        Expr::ArrayInit { element, items } => format!("new {}[] {{ {} }}", ty(element), exprs(items)),
        Expr::ArrayBounds { element, len } => format!("new {}[{}]", ty(element), expr(len)),
        Expr::Lambda { params, body } => {
            let params: Vec<String> = params
                .iter()
                .map(|p| match &p.ty {
                    Some(t) => format!("{} {}", ty(t), p.name),
                    None => p.name.clone(),
                })
                .collect();
            let body = match body {
                LambdaBody::Expr(e) => expr(e),
                LambdaBody::Block(stmts) => block(stmts),
            };
            format!("({}) => {body}", params.join(", "))
        }
        Expr::Cast { expr: inner, ty: t } => format!("({}){}", ty(t), operand(inner)),
        Expr::As { expr: inner, ty: t } => format!("{} as {}", operand(inner), ty(t)),
        Expr::TypeCheck { expr: inner, ty: t } => format!("{} is {}", operand(inner), ty(t)),
        Expr::TypeOf(t) => format!("typeof({})", ty(t)),
        Expr::Default(t) => format!("default({})", ty(t)),
        Expr::Throw(inner) => format!("throw {}", expr(inner)),
        Expr::TupleInit(items) => format!("({})", exprs(items)),
    }
}

fn initializer(init: &Initializer) -> String {
    let parts: Vec<String> = match init {
        Initializer::Object(fields) => fields
            .iter()
            .map(|(name, value)| match value {
                InitValue::Value(e) => format!("{name} = {}", expr(e)),
                InitValue::Nested(nested) => format!("{name} = {}", initializer(nested)),
            })
            .collect(),
        Initializer::Collection(items) => items.iter().map(expr).collect(),
    };
    if parts.is_empty() {
        "{ }".into()
    } else {
        format!("{{ {} }}", parts.join(", "))
    }
}

pub fn block(stmts: &[Stmt]) -> String {
    if stmts.is_empty() {
        return "{ }".into();
    }
    let inner: Vec<String> = stmts.iter().map(stmt).collect();
    format!("{{ {} }}", inner.join(" "))
}

fn catch(clause: &CatchClause) -> String {
    let mut out = String::from("catch");
    match (&clause.ty, &clause.name) {
        (Some(t), Some(name)) => out.push_str(&format!(" ({} {name})", ty(t))),
        (Some(t), None) => out.push_str(&format!(" ({})", ty(t))),
        _ => {}
    }
    if let Some(filter) = &clause.filter {
        out.push_str(&format!(" when ({})", expr(filter)));
    }
    format!("{out} {}", block(&clause.body))
}

pub fn stmt(s: &Stmt) -> String {
    match s {
        Stmt::Expr(e) => format!("{};", expr(e)),
        Stmt::VarDecl { name, ty: t, init } => {
            let t = t.as_ref().map_or_else(|| "var".to_string(), ty);
            match init {
                Some(init) => format!("{t} {name} = {};", expr(init)),
                None => format!("{t} {name};"),
            }
        }
        Stmt::Block(stmts) => block(stmts),
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            let head = format!("if ({}) {}", expr(cond), block(then_body));
            match else_body.as_slice() {
                [] => head,
                [nested @ Stmt::If { .. }] => format!("{head} else {}", stmt(nested)),
                body => format!("{head} else {}", block(body)),
            }
        }
        Stmt::Switch { value, sections } => {
            let sections: Vec<String> = sections
                .iter()
                .map(|section| {
                    let mut parts: Vec<String> = section
                        .labels
                        .iter()
                        .map(|label| match label {
                            SwitchLabel::Case(e) => format!("case {}:", expr(e)),
                            SwitchLabel::Default => "default:".into(),
                        })
                        .collect();
                    parts.extend(section.body.iter().map(stmt));
                    parts.join(" ")
                })
                .collect();
            format!("switch ({}) {{ {} }}", expr(value), sections.join(" "))
        }
        Stmt::Loop { body } => format!("while (true) {}", block(body)),
        Stmt::Break => "break;".into(),
        Stmt::Goto(label) => format!("goto {label};"),
        Stmt::Labeled { label, stmt: inner } => format!("{label}: {}", stmt(inner)),
        Stmt::Return(Some(e)) => format!("return {};", expr(e)),
        Stmt::Return(None) => "return;".into(),
        Stmt::Throw(Some(e)) => format!("throw {};", expr(e)),
        Stmt::Throw(None) => "throw;".into(),
        Stmt::Try {
            body,
            catches,
            finally,
        } => {
            let mut out = format!("try {}", block(body));
            for clause in catches {
                out.push(' ');
                out.push_str(&catch(clause));
            }
            if let Some(finally) = finally {
                out.push_str(&format!(" finally {}", block(finally)));
            }
            out
        }
        Stmt::Empty => ";".into(),
    }
}
