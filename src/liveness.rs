//! Per-block use/def computation.
//!
//! Grounded on `original_source/runac/liveness.py`: for every step in a
//! block, record which variable names it reads (`uses`) and which it binds
//! (`assigns`), indexed by the step's position in the block. Later passes
//! (escape analysis, destructor insertion) consult these tables instead of
//! re-walking expressions themselves.

use crate::ast::Expr;
use crate::cfg::{FlowGraph, Step};
use crate::symbol::Symbol;

fn visit_expr(e: &Expr, uses: &mut Vec<Symbol>) {
  match e {
    Expr::Name(_, n) => uses.push(*n),
    Expr::Attrib(_, obj, _) => visit_expr(obj, uses),
    Expr::Elem(_, obj, key) => { visit_expr(obj, uses); visit_expr(key, uses); }
    Expr::As(_, l, _) => visit_expr(l, uses),
    Expr::Not(_, v) | Expr::Owner(_, v) | Expr::Ref(_, v) | Expr::Opt(_, v) | Expr::Mut(_, v) => visit_expr(v, uses),
    Expr::Binary(_, _, l, r) => { visit_expr(l, uses); visit_expr(r, uses); }
    Expr::Tuple(_, vs) => vs.iter().for_each(|v| visit_expr(v, uses)),
    Expr::Call(_, callee, args) => {
      visit_expr(callee, uses);
      args.iter().for_each(|a| visit_expr(a, uses));
    }
    Expr::NamedArg(_, _, v) => visit_expr(v, uses),
    Expr::Ternary(_, cond, l, r) => { visit_expr(cond, uses); visit_expr(l, uses); visit_expr(r, uses); }
    Expr::None(_) | Expr::Bool(..) | Expr::Int(..) | Expr::Float(..) | Expr::String(..) => {}
  }
}

/// Record one step's reads/writes into `uses`/`assigns`.
fn visit_step(step: &Step, uses: &mut Vec<Symbol>, assigns: &mut Vec<Symbol>) {
  match step {
    Step::Pass(_) | Step::Branch(_) | Step::LPad(_) => {}
    Step::Free(n) => uses.push(*n),
    Step::Return(_, v) => { if let Some(v) = v { visit_expr(v, uses); } }
    Step::Raise(_, v) | Step::Yield(_, v, _) => visit_expr(v, uses),
    Step::CondBranch(cond, _, _) => visit_expr(cond, uses),
    Step::Assign(_, left, right) => {
      match left {
        Expr::Name(_, n) => assigns.push(*n),
        other => visit_expr(other, uses),
      }
      visit_expr(right, uses);
    }
    Step::IAdd(_, left, right) => {
      // `x += y` both reads and rewrites `x`.
      visit_expr(left, uses);
      if let Expr::Name(_, n) = left { assigns.push(*n); }
      visit_expr(right, uses);
    }
    Step::Phi(_, dst, (_, l), (_, r)) => { assigns.push(*dst); visit_expr(l, uses); visit_expr(r, uses); }
    Step::LoopSetup(_, var, source) => { assigns.push(*var); visit_expr(source, uses); }
    Step::LoopHeader(_, ctx, lvar, _, _) => { uses.push(*ctx); assigns.push(*lvar); }
  }
}

/// Fill in `assigns`/`uses` for every block of `flow`.
pub fn analyze(flow: &mut FlowGraph) {
  for block in flow.blocks.iter_mut() {
    for (i, step) in block.steps.iter().enumerate() {
      let mut uses = Vec::new();
      let mut assigns = Vec::new();
      visit_step(step, &mut uses, &mut assigns);
      for n in uses { block.uses.entry(n).or_default().push(i); }
      for n in assigns { block.assigns.entry(n).or_default().push(i); }
    }
  }
}
