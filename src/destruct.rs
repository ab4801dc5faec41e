//! Destructor insertion: finds every owned local that is still live at a
//! function's exit points without having escaped, and inserts a `Free` step
//! immediately before each terminating `Return` it can actually reach.
//!
//! Grounded on `original_source/runac/destructor.py`: a variable enters the
//! `left`-to-free set when its assigning step's right-hand side has an
//! `Owner` type; it is removed again if escape analysis marked it as having
//! transferred out of this block, or if it is one side of a `Phi` whose
//! merged destination is itself owner-typed (the double-free guard — a
//! `Phi` operand was already freed, or escaped, along whichever arm produced
//! it, so only the merged destination is freed at exit, never the arms).
//! `main`'s `args` parameter is special-cased since it is allocated by the
//! runtime entry point rather than by any visible `Assign`.
//!
//! Unlike `destructor.py`, which assumes at most one assignment per variable
//! per block and frees every tracked variable at every return block
//! unconditionally, this pass (a) frees the old value of a variable
//! reassigned more than once within the same block right at the
//! reassignment site, and (b) only frees a variable at a return block that
//! its owning assignment can actually reach, via forward reachability over
//! [`FlowGraph::edges`] — otherwise a branch that never executes the
//! assignment would still free an uninitialized/unrelated value.

use hashbrown::{HashMap, HashSet};
use crate::cfg::{FlowGraph, Step};
use crate::idx::BlockId;
use crate::symbol::Symbol;
use crate::typeck::Annotations;
use crate::types::Type;

fn assign_type<'ty>(anno: &Annotations<'ty>, var: Symbol, step: &Step) -> Option<&'ty Type<'ty>> {
  match step {
    Step::LoopHeader(..) | Step::Phi(..) => anno.vars.get(&var).copied(),
    Step::Assign(_, _, right) => Some(anno.of(right.tag().id)),
    _ => None,
  }
}

/// Every block reachable from `start`, `start` included.
fn reachable_from(flow: &FlowGraph, start: BlockId) -> HashSet<BlockId> {
  let mut seen = HashSet::new();
  let mut stack = vec![start];
  seen.insert(start);
  while let Some(b) = stack.pop() {
    if let Some(next) = flow.edges.get(&b) {
      for &n in next {
        if seen.insert(n) { stack.push(n); }
      }
    }
  }
  seen
}

/// Insert `Free` steps into `flow` for every owned local not already freed
/// by escaping. `is_main_with_args` special-cases the synthetic `args`
/// array the runtime entry point receives.
pub fn destructify<'ty>(anno: &Annotations<'ty>, flow: &mut FlowGraph, is_main_with_args: bool) {
  let mut left: HashMap<Symbol, BlockId> = HashMap::new();
  let mut returns: Vec<BlockId> = Vec::new();
  let mut reassign_frees: Vec<(BlockId, usize, Symbol)> = Vec::new();

  let block_ids: Vec<BlockId> = flow.blocks.iter_enum().map(|(id, _)| id).collect();

  for &id in &block_ids {
    let block = &flow.blocks[id];
    if block.returns { returns.push(id); }

    for (&var, steps) in &block.assigns {
      if steps.is_empty() { continue; }

      let mut last_owner = false;
      for (pos, &step_idx) in steps.iter().enumerate() {
        let is_owner = matches!(assign_type(anno, var, &block.steps[step_idx]), Some(Type::Owner(_)));
        if pos > 0 && last_owner {
          // A later assignment in the same block overwrites an owner value
          // still held by `var` — free the old value right there.
          reassign_frees.push((id, step_idx, var));
        }
        last_owner = is_owner;
      }

      if last_owner { left.insert(var, id); } else { left.remove(&var); }
    }

    for step in &block.steps {
      if let Step::Phi(_, _, (_, l), (_, r)) = step {
        if let crate::ast::Expr::Name(_, n) = l {
          if matches!(anno.of(l.tag().id), Type::Owner(_)) { left.remove(n); }
        }
        if let crate::ast::Expr::Name(_, n) = r {
          if matches!(anno.of(r.tag().id), Type::Owner(_)) { left.remove(n); }
        }
      }
    }

    for var in flow.blocks[id].escapes.keys() { left.remove(var); }
  }

  if is_main_with_args && anno.vars.contains_key(&crate::symbol::intern("args")) {
    left.insert(crate::symbol::intern("args"), BlockId::ENTRY);
  }

  // Insert same-block reassignment frees first, descending by step index per
  // block, so earlier insertions don't invalidate later ones' positions.
  reassign_frees.sort_by(|a, b| b.1.cmp(&a.1));
  for (bid, at, var) in reassign_frees {
    flow.blocks[bid].steps.insert(at, Step::Free(var));
  }

  for (var, origin) in left {
    let reach = reachable_from(flow, origin);
    for &rbid in &returns {
      if !reach.contains(&rbid) { continue; }
      let steps = &mut flow.blocks[rbid].steps;
      let at = steps.len().saturating_sub(1);
      steps.insert(at, Step::Free(var));
    }
  }
}
