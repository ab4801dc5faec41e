//! Escape analysis: decides which owned values are moved out of the
//! function (returned, yielded, stored into a field, or passed to a
//! function that takes ownership of its argument) versus staying local and
//! therefore needing an inserted `Free`.
//!
//! Grounded on `original_source/runac/escapes.py`: a single backward walk
//! over every block (latest block first, latest step first) threads an
//! `escape` flag down into each expression; a bare `Name` reached with
//! `escape = true` is added to a tracked set, and the `Assign` that
//! produces it is the one expression whose right-hand side is then visited
//! with `escape = true` in turn. Ports the per-node `node.escapes = True`
//! mutation to a [`NodeId`]-keyed side table, and records which block each
//! tracked variable's producing assignment was consumed in via
//! [`crate::cfg::Block::escapes`] (consulted by [`crate::destruct`] to skip
//! inserting a redundant `Free` for a variable this pass already
//! transferred out).

use hashbrown::{HashMap, HashSet};
use crate::ast::Expr;
use crate::cfg::{FlowGraph, Step};
use crate::idx::NodeId;
use crate::symbol::Symbol;
use crate::typeck::Annotations;
use crate::types::Type;

/// Per-expression escape flags, keyed by [`NodeId`].
#[derive(Default)]
pub struct EscapeInfo {
  /// Whether the expression at this id is moved out of the function.
  pub escapes: HashMap<NodeId, bool>,
}

impl EscapeInfo {
  /// Whether the node at `id` was marked as escaping; `false` if never visited.
  #[must_use] pub fn escapes(&self, id: NodeId) -> bool { self.escapes.get(&id).copied().unwrap_or(false) }
}

struct Finder<'a, 'ty> {
  anno: &'a Annotations<'ty>,
  info: EscapeInfo,
  track: HashSet<Symbol>,
}

impl<'a, 'ty> Finder<'a, 'ty> {
  fn mark(&mut self, e: &Expr) { self.info.escapes.insert(e.tag().id, true); }

  fn visit(&mut self, e: &Expr, escape: bool) {
    match e {
      Expr::String(..) => { if escape { self.mark(e); } }
      Expr::Name(_, n) => { if escape { self.track.insert(*n); } }
      Expr::Ternary(_, _, l, r) => { self.visit(l, escape); self.visit(r, escape); }
      // Reading `obj.field` into an escaping position moves that field's
      // value out of `obj`; propagate the escape back to `obj` itself so
      // whatever assignment produced it is, in turn, visited as escaping.
      Expr::Attrib(_, obj, _) => self.visit(obj, escape),
      Expr::Call(_, callee, args) => self.call(callee, args, escape),
      Expr::NamedArg(_, _, v) => self.visit(v, escape),
      Expr::As(_, l, _) => self.visit(l, false),
      _ => {}
    }
  }

  fn call(&mut self, callee: &Expr, args: &[Expr], escape: bool) {
    if let Type::Function(_, formals) = self.anno.of(callee.tag().id) {
      for (arg, formal) in args.iter().zip(formals.iter()) {
        if matches!(formal, Type::Owner(_)) { self.visit(arg, true); } else { self.visit(arg, false); }
      }
    } else {
      for arg in args { self.visit(arg, false); }
    }
    if !escape { return; }
    self.mark(callee);
  }

  fn step(&mut self, block: &mut crate::cfg::Block, step: &Step) {
    match step {
      Step::Return(_, Some(v)) | Step::Yield(_, v, _) => {
        if matches!(self.anno.of(v.tag().id), Type::Owner(_)) { self.visit(v, true); }
      }
      Step::Assign(_, left, right) => match left {
        Expr::Name(_, n) => {
          if self.track.remove(n) {
            block.escapes.insert(*n, true);
            self.visit(right, true);
          } else {
            self.visit(right, false);
          }
        }
        Expr::Attrib(_, obj, _) => {
          self.visit(obj, false);
          self.visit(right, true);
        }
        _ => { self.visit(right, false); }
      },
      Step::IAdd(_, _, right) => self.visit(right, false),
      Step::Raise(_, v) => self.visit(v, false),
      Step::CondBranch(cond, ..) => self.visit(cond, false),
      Step::Phi(_, dst, (_, l), (_, r)) => {
        let escaping = self.track.remove(dst);
        if escaping { block.escapes.insert(*dst, true); }
        self.visit(l, escaping);
        self.visit(r, escaping);
      }
      _ => {}
    }
  }
}

/// Run escape analysis over one function's flow graph.
pub fn find<'ty>(anno: &Annotations<'ty>, flow: &mut FlowGraph) -> EscapeInfo {
  let mut finder = Finder { anno, info: EscapeInfo::default(), track: HashSet::new() };
  let ids: Vec<_> = flow.blocks.iter_enum().map(|(id, _)| id).collect();
  for &id in ids.iter().rev() {
    let steps: Vec<Step> = flow.blocks[id].steps.clone();
    for step in steps.iter().rev() {
      finder.step(&mut flow.blocks[id], step);
    }
  }
  finder.info
}
