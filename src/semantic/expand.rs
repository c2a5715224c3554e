//! Generic AST rewriting used to implement macro-parameter substitution
//! (spec §4.4: `\param`/`\#`) and `.repeat` counter binding with a single
//! traversal instead of one bespoke walker per case.
//!
//! `replace` is consulted at every expression node before recursing into
//! its children; returning `Some` substitutes the whole subtree and stops
//! the walk there. `rename_local` renames a local label's bare name
//! (used to uniquify macro-local labels per expansion).

use crate::ast::*;

pub fn rewrite_expr(expr: &Expr, replace: &impl Fn(&Expr) -> Option<Expr>) -> Expr {
    if let Some(replacement) = replace(expr) {
        return replacement;
    }
    match expr {
        Expr::Unary { op, operand, loc } => Expr::Unary {
            op: op.clone(),
            operand: Box::new(rewrite_expr(operand, replace)),
            loc: loc.clone(),
        },
        Expr::Binary { op, lhs, rhs, loc } => Expr::Binary {
            op: *op,
            lhs: Box::new(rewrite_expr(lhs, replace)),
            rhs: Box::new(rewrite_expr(rhs, replace)),
            loc: loc.clone(),
        },
        other => other.clone(),
    }
}

fn rewrite_mode(mode: &AddressingMode, replace: &impl Fn(&Expr) -> Option<Expr>) -> AddressingMode {
    use AddressingMode::*;
    match mode {
        Implied => Implied,
        Accumulator => Accumulator,
        Immediate(e) => Immediate(rewrite_expr(e, replace)),
        Absolute(e) => Absolute(rewrite_expr(e, replace)),
        ZeroPage(e) => ZeroPage(rewrite_expr(e, replace)),
        Indirect(e) => Indirect(rewrite_expr(e, replace)),
        IndexedIndirect(e) => IndexedIndirect(rewrite_expr(e, replace)),
        IndirectIndexed(e) => IndirectIndexed(rewrite_expr(e, replace)),
        LongIndirect(e) => LongIndirect(rewrite_expr(e, replace)),
        LongIndirectIndexed(e) => LongIndirectIndexed(rewrite_expr(e, replace)),
        Indexed(e, r) => Indexed(rewrite_expr(e, replace), *r),
        Relative(e) => Relative(rewrite_expr(e, replace)),
        Register(name) => Register(name.clone()),
    }
}

pub fn rewrite_statements(
    stmts: &[Statement],
    replace: &impl Fn(&Expr) -> Option<Expr>,
    rename_local: &impl Fn(&str) -> Option<String>,
) -> Vec<Statement> {
    stmts
        .iter()
        .map(|s| rewrite_statement(s, replace, rename_local))
        .collect()
}

fn rewrite_statement(
    stmt: &Statement,
    replace: &impl Fn(&Expr) -> Option<Expr>,
    rename_local: &impl Fn(&str) -> Option<String>,
) -> Statement {
    match stmt {
        Statement::Label(label) => {
            if label.kind == LabelKind::Local {
                if let Some(renamed) = rename_local(&label.name) {
                    return Statement::Label(LabelNode { name: renamed, ..label.clone() });
                }
            }
            stmt.clone()
        }
        Statement::Instruction(instr) => Statement::Instruction(InstructionNode {
            mode: rewrite_mode(&instr.mode, replace),
            ..instr.clone()
        }),
        Statement::Directive(dir) => Statement::Directive(DirectiveNode {
            args: dir.args.iter().map(|e| rewrite_expr(e, replace)).collect(),
            ..dir.clone()
        }),
        Statement::MacroDefinition(_) => stmt.clone(),
        Statement::MacroInvocation(inv) => Statement::MacroInvocation(MacroInvocationNode {
            args: inv.args.iter().map(|e| rewrite_expr(e, replace)).collect(),
            ..inv.clone()
        }),
        Statement::Conditional(cond) => Statement::Conditional(ConditionalNode {
            branches: cond
                .branches
                .iter()
                .map(|b| ConditionalBranch {
                    condition: b.condition.as_ref().map(|e| rewrite_expr(e, replace)),
                    body: rewrite_statements(&b.body, replace, rename_local),
                    ..b.clone()
                })
                .collect(),
            else_body: cond
                .else_body
                .as_ref()
                .map(|body| rewrite_statements(body, replace, rename_local)),
            ..cond.clone()
        }),
        Statement::RepeatBlock(rep) => Statement::RepeatBlock(RepeatBlockNode {
            count: rewrite_expr(&rep.count, replace),
            body: rewrite_statements(&rep.body, replace, rename_local),
            ..rep.clone()
        }),
        Statement::EnumerationBlock(en) => Statement::EnumerationBlock(EnumerationBlockNode {
            start: rewrite_expr(&en.start, replace),
            step: en.step.as_ref().map(|e| rewrite_expr(e, replace)),
            ..en.clone()
        }),
    }
}
