//! Literal specialization: resolves every still-generic `AnyInt`/`AnyFloat`
//! expression type to a concrete width once its context fixes one.
//!
//! Grounded on `original_source/runac/specialize.py`: a comparison or
//! arithmetic operation with one generic and one concrete operand
//! specializes the generic side to match; a call specializes each generic
//! argument to its formal parameter's type. Unlike `specialize.py`, which
//! mutates `node.type` in place, this walks the same [`crate::cfg::FlowGraph`]
//! but rewrites the [`crate::typeck::Annotations`] side table instead.

use crate::ast::{BinOp, Expr};
use crate::cfg::{FlowGraph, Step};
use crate::idx::NodeId;
use crate::typeck::Annotations;
use crate::types::Type;

struct Specializer<'a, 'ty> {
  anno: &'a mut Annotations<'ty>,
}

impl<'a, 'ty> Specializer<'a, 'ty> {
  fn specialize_to(&mut self, id: NodeId, dst: &'ty Type<'ty>) {
    let cur = self.anno.of(id);
    match (cur, dst) {
      (Type::AnyInt, Type::IntN(_) | Type::UintN(_)) | (Type::AnyFloat, Type::Float) => {
        self.anno.types.insert(id, dst);
      }
      _ => {}
    }
  }

  fn compare(&mut self, l: &Expr, r: &Expr) {
    let lt = self.anno.of(l.tag().id);
    let rt = self.anno.of(r.tag().id);
    if lt.is_generic() && !rt.is_generic() {
      self.specialize_to(l.tag().id, rt);
    } else if rt.is_generic() && !lt.is_generic() {
      self.specialize_to(r.tag().id, lt);
    }
  }

  fn expr(&mut self, e: &Expr) {
    match e {
      Expr::Binary(_, BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt, l, r) => {
        self.expr(l);
        self.expr(r);
        self.compare(l, r);
      }
      Expr::Binary(_, _, l, r) => { self.expr(l); self.expr(r); }
      Expr::Not(_, v) | Expr::Owner(_, v) | Expr::Ref(_, v) | Expr::Opt(_, v) | Expr::Mut(_, v) => self.expr(v),
      Expr::Attrib(_, obj, _) => self.expr(obj),
      Expr::Elem(_, obj, key) => { self.expr(obj); self.expr(key); }
      Expr::Tuple(_, vs) => vs.iter().for_each(|v| self.expr(v)),
      Expr::NamedArg(_, _, v) => self.expr(v),
      Expr::Ternary(_, cond, l, r) => { self.expr(cond); self.expr(l); self.expr(r); }
      Expr::Call(_, callee, args) => {
        self.expr(callee);
        args.iter().for_each(|a| self.expr(a));
        let callee_ty = self.anno.of(callee.tag().id);
        if let Type::Function(_, formals) = callee_ty {
          let formals = formals.clone();
          for (arg, formal) in args.iter().zip(formals.iter()) {
            if self.anno.of(arg.tag().id).is_generic() {
              self.specialize_to(arg.tag().id, formal);
            }
          }
        }
      }
      Expr::As(..) | Expr::None(_) | Expr::Bool(..) | Expr::Int(..) | Expr::Float(..) | Expr::String(..) => {}
    }
  }

  fn step(&mut self, step: &Step) {
    match step {
      Step::Return(_, Some(v)) | Step::Raise(_, v) | Step::Yield(_, v, _) => self.expr(v),
      Step::Assign(_, left, right) => { self.expr(left); self.expr(right); }
      Step::IAdd(_, left, right) => { self.expr(left); self.expr(right); }
      Step::CondBranch(cond, ..) => self.expr(cond),
      Step::Phi(_, _, (_, l), (_, r)) => { self.expr(l); self.expr(r); self.compare(l, r); }
      Step::LoopSetup(_, _, source) => self.expr(source),
      _ => {}
    }
  }
}

/// Walk every step of `flow`, specializing generic literal types in place.
pub fn propagate<'ty>(anno: &mut Annotations<'ty>, flow: &FlowGraph) {
  let mut s = Specializer { anno };
  for block in flow.blocks.iter() {
    for step in &block.steps { s.step(step); }
  }
}
