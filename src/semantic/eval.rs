//! Constant folding over `Expr` trees against a symbol table.
//!
//! Used by both passes: pass 1 folds everything that doesn't depend on
//! a forward reference (to size instructions and evaluate eager
//! constants); pass 2 folds everything, now that every label has a
//! final address, and turns any remaining failure into `UndefinedSymbol`.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::semantic::symbol::{qualify_local, SymbolTable};

/// Contextual information needed to resolve the handful of expression
/// forms that aren't plain constant arithmetic.
pub struct EvalContext<'a> {
    pub symbols: &'a SymbolTable,
    /// The nearest enclosing global label, for qualifying local-label
    /// references (`@name`/`.name`).
    pub scope: Option<&'a str>,
    /// The program counter the expression is being evaluated at, for
    /// the `*` "current address" primary.
    pub current_address: u32,
    /// This statement's position in source order, for resolving
    /// anonymous labels to the nearest matching occurrence.
    pub statement_order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The expression references a name that isn't (yet, or ever)
    /// defined in the symbol table.
    Undefined(String),
    DivisionByZero,
}

pub fn eval(expr: &Expr, ctx: &EvalContext) -> Result<i64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Str(s) => {
            // A string used in numeric-expression position folds to
            // its first byte, matching the char-literal convention;
            // multi-byte strings belong in `.ascii`/`.db`, not here.
            Ok(s.bytes().next().unwrap_or(0) as i64)
        }
        Expr::CurrentAddress => Ok(ctx.current_address as i64),
        Expr::Identifier(name) => ctx
            .symbols
            .value_of(name)
            .ok_or_else(|| EvalError::Undefined(name.clone())),
        Expr::LocalLabel(name) => {
            let qualified = match ctx.scope {
                Some(scope) => qualify_local(scope, name),
                None => name.clone(),
            };
            ctx.symbols
                .value_of(&qualified)
                .ok_or_else(|| EvalError::Undefined(qualified))
        }
        Expr::AnonymousLabelRef { glyph, depth } => ctx
            .symbols
            .resolve_anonymous(*glyph, *depth, ctx.statement_order)
            .map(|addr| addr as i64)
            .ok_or_else(|| {
                EvalError::Undefined(format!(
                    "{}",
                    std::iter::repeat(*glyph).take(*depth).collect::<String>()
                ))
            }),
        Expr::MacroParam(name) => Err(EvalError::Undefined(format!("\\{}", name))),
        Expr::MacroArgCount => Err(EvalError::Undefined("\\#".to_string())),
        Expr::Unary { op, operand, .. } => {
            let v = eval(operand, ctx)?;
            Ok(match op {
                UnaryOp::Neg => -v,
                UnaryOp::BitNot => !v,
                UnaryOp::LogicalNot => (v == 0) as i64,
                UnaryOp::LowByte => v & 0xff,
                UnaryOp::HighByte => (v >> 8) & 0xff,
                UnaryOp::BankByte => (v >> 16) & 0xff,
            })
        }
        Expr::Binary { op, lhs, rhs, .. } => {
            let l = eval(lhs, ctx)?;
            let r = eval(rhs, ctx)?;
            Ok(match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),
                BinaryOp::Div => {
                    if r == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    l / r
                }
                BinaryOp::Mod => {
                    if r == 0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    l % r
                }
                BinaryOp::BitAnd => l & r,
                BinaryOp::BitOr => l | r,
                BinaryOp::BitXor => l ^ r,
                BinaryOp::Shl => l << (r & 63),
                BinaryOp::Shr => l >> (r & 63),
                BinaryOp::Eq => (l == r) as i64,
                BinaryOp::NotEq => (l != r) as i64,
                BinaryOp::Lt => (l < r) as i64,
                BinaryOp::Gt => (l > r) as i64,
                BinaryOp::Le => (l <= r) as i64,
                BinaryOp::Ge => (l >= r) as i64,
                BinaryOp::LogicalAnd => ((l != 0) && (r != 0)) as i64,
                BinaryOp::LogicalOr => ((l != 0) || (r != 0)) as i64,
            })
        }
    }
}

/// Collects every free identifier/local-label/anonymous-label name an
/// expression references, used to report which symbol is missing when
/// `eval` fails deep inside a larger expression, and by the macro
/// expander to validate `\param` substitutions.
pub fn referenced_names(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Identifier(name) => out.push(name.clone()),
        Expr::LocalLabel(name) => out.push(name.clone()),
        Expr::Unary { operand, .. } => referenced_names(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            referenced_names(lhs, out);
            referenced_names(rhs, out);
        }
        _ => {}
    }
}
