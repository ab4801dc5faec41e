//! AST to control flow graph lowering.
//!
//! Grounded on `original_source/runac/blocks.py`: every basic block is a
//! flat list of [`Step`]s terminated by a `Branch`/`CondBranch` (or a
//! `Return`/`Raise` that needs none), non-atomic subexpressions are hoisted
//! into a `$N` temporary via [`FlowFinder::inter`], and `Ternary` expands
//! into a three-block diamond collapsed back through a `Phi` step.

use hashbrown::HashMap;
use crate::ast::{BinOp, Catch, Expr, Stmt, Suite, Tag};
use crate::idx::{BlockId, IdxVec};
use crate::symbol::{Symbol, intern};

/// One instruction inside a basic block. Mirrors `blocks.py`'s mix of
/// reused `ast` statement nodes and its own `Branch`/`CondBranch`/`Phi`/
/// `LoopSetup`/`LoopHeader`/`LPad` control nodes, flattened into one enum
/// since Rust has no dynamic `isinstance` dispatch to lean on.
#[derive(Debug, Clone)]
pub enum Step {
  /// `pass`; kept as a real step so an otherwise-empty block still has one.
  Pass(Tag),
  /// `return value?`.
  Return(Tag, Option<Expr>),
  /// `raise value`.
  Raise(Tag, Expr),
  /// `lvalue = value`; `lvalue` is a `Name` or `Attrib` left-hand side.
  Assign(Tag, Expr, Expr),
  /// `left += right`, for the rare case specialization leaves it scalar
  /// (the typer rejects this on `Owner`-typed operands before this stage).
  IAdd(Tag, Expr, Expr),
  /// `yield value`, falling through to `resume`.
  Yield(Tag, Expr, BlockId),
  /// Unconditional jump.
  Branch(BlockId),
  /// Jump to `then` if `cond`, else to `else_` (filled in once known).
  CondBranch(Expr, BlockId, Option<BlockId>),
  /// Join point for a `Ternary`: binds `dst` to whichever of `left`/`right`
  /// was produced, each paired with the predecessor block it came from.
  Phi(Tag, Symbol, (BlockId, Expr), (BlockId, Expr)),
  /// Materializes the iterator/range state for a `for` loop.
  LoopSetup(Tag, Symbol, Expr),
  /// The head of a `for` loop: binds `lvar` from the setup in `ctx_var`,
  /// then branches to `body` while more remain, else to `exit`.
  LoopHeader(Tag, Symbol, Symbol, BlockId, Option<BlockId>),
  /// Landing pad for a `try` block: `handlers` maps a caught type name to
  /// the block implementing that `except` clause.
  LPad(HashMap<Symbol, BlockId>),
  /// Destructor insertion's output: release `var`'s heap allocation. Never
  /// produced by [`FlowFinder`] itself; inserted by [`crate::destruct`]
  /// right before the terminating `Return` of a block that owns `var` at
  /// exit without having transferred it out.
  Free(Symbol),
}

/// A single basic block: a flat instruction list plus the bookkeeping later
/// passes attach (`assigns`/`uses` from liveness, `escapes` from escape
/// analysis).
#[derive(Debug, Default)]
pub struct Block {
  /// In-order instructions; well-formed blocks end in a terminator.
  pub steps: Vec<Step>,
  /// Predecessor block ids, populated once the whole graph is built.
  pub preds: Vec<BlockId>,
  /// Whether this block's last step is (or forwards to) a `Return`.
  pub returns: bool,
  /// Whether this block ends in a `Raise`.
  pub raises: bool,
  /// Per-variable step indices that assign it, filled by `liveness`.
  pub assigns: HashMap<Symbol, Vec<usize>>,
  /// Per-variable step indices that read it, filled by `liveness`.
  pub uses: HashMap<Symbol, Vec<usize>>,
  /// Variables whose ownership escapes out of this block (e.g. stored into
  /// a field, returned, or passed to a call that takes ownership).
  pub escapes: HashMap<Symbol, bool>,
}

impl Block {
  /// Whether this block still needs an explicit terminator appended (no
  /// steps yet, or the last one was not already a control transfer).
  #[must_use] pub fn needs_branch(&self) -> bool {
    !matches!(self.steps.last(), Some(
      Step::Return(..) | Step::Raise(..) | Step::Branch(_) | Step::CondBranch(..) | Step::LoopHeader(..) | Step::LPad(_)
    ))
  }
}

/// The control flow graph for one function body.
#[derive(Debug, Default)]
pub struct FlowGraph {
  /// Blocks, indexed by [`BlockId`]; `BlockId::ENTRY` is always present.
  pub blocks: IdxVec<BlockId, Block>,
  /// Raw successor edges, populated during construction and used to derive `preds`.
  pub edges: HashMap<BlockId, Vec<BlockId>>,
  /// Blocks with no successor that are reachable from the entry, i.e. the
  /// function's exit points after dead-block pruning.
  pub exits: Vec<BlockId>,
  /// A call-site block protected by a `try`, mapped to the landing pad it
  /// unwinds to. Consulted by the emitter to lower the block's call as
  /// `invoke … to … unwind …` instead of a plain `call`.
  pub invokes: HashMap<BlockId, BlockId>,
}

impl FlowGraph {
  fn new() -> Self {
    let mut blocks = IdxVec::new();
    blocks.push(Block::default());
    Self { blocks, edges: HashMap::new(), exits: Vec::new(), invokes: HashMap::new() }
  }

  fn block(&mut self) -> BlockId { self.blocks.push(Block::default()) }

  fn edge(&mut self, src: BlockId, dst: BlockId) {
    self.edges.entry(src).or_default().push(dst);
  }
}

/// Whether an expression is atomic enough to use directly as an operand
/// without hoisting it into a temporary first. Mirrors `blocks.py`'s
/// `ATOMIC` tuple via [`Expr::is_atomic`].
fn is_atomic(e: &Expr) -> bool { e.is_atomic() }

/// Lowers one function body's [`Suite`] into a [`FlowGraph`].
pub struct FlowFinder {
  flow: FlowGraph,
  cur: BlockId,
  tmp: u32,
  /// When inside a `try` suite, the landing-pad edges accumulated so far:
  /// `(block, normal-continuation-block)` pairs for each call that might raise.
  caught: Option<Vec<BlockId>>,
  /// Enclosing loops' `(continue target, break target)`, innermost last.
  loop_stack: Vec<(BlockId, BlockId)>,
}

impl Default for FlowFinder {
  fn default() -> Self { Self::new() }
}

impl FlowFinder {
  /// A fresh builder with one empty entry block.
  #[must_use] pub fn new() -> Self {
    Self { flow: FlowGraph::new(), cur: BlockId::ENTRY, tmp: 0, caught: None, loop_stack: Vec::new() }
  }

  fn name(&mut self) -> Symbol {
    let s = intern(&format!("${}", self.tmp));
    self.tmp += 1;
    s
  }

  fn push(&mut self, step: Step) { self.flow.blocks[self.cur].steps.push(step); }

  /// Lower `suite` (a function body) into the finished graph.
  #[must_use] pub fn build(mut self, suite: &Suite) -> FlowGraph {
    self.suite(suite);
    self.flow
  }

  fn suite(&mut self, suite: &Suite) {
    for stmt in &suite.stmts { self.stmt(stmt); }
  }

  /// Hoist `e` into a `$k` temporary unless it is already atomic, returning
  /// the value to use in its place.
  fn inter(&mut self, e: &Expr) -> Expr {
    if is_atomic(e) { return e.clone(); }
    let tag = e.tag();
    let lhs = Expr::Name(tag, self.name());
    let rhs = self.expr(e);
    let is_call = matches!(rhs, Expr::Call(..));
    self.push(Step::Assign(tag, lhs.clone(), rhs));
    if is_call { self.redirect(); }
    lhs
  }

  /// Recursively hoist an expression's non-atomic subexpressions, without
  /// hoisting the expression itself (used for the top of an assignment's
  /// right-hand side, which becomes the step directly).
  fn expr(&mut self, e: &Expr) -> Expr {
    match e {
      Expr::None(_) | Expr::Bool(..) | Expr::Int(..) | Expr::Float(..) | Expr::String(..) | Expr::Name(..) => e.clone(),
      Expr::As(tag, l, r) => Expr::As(*tag, l.clone(), r.clone()),
      Expr::Not(tag, v) => Expr::Not(*tag, Box::new(self.inter(v))),
      Expr::Binary(tag, op, l, r) => Expr::Binary(*tag, *op, Box::new(self.inter(l)), Box::new(self.inter(r))),
      Expr::Attrib(tag, obj, name) => Expr::Attrib(*tag, Box::new(self.inter(obj)), *name),
      Expr::Elem(tag, obj, key) => Expr::Elem(*tag, Box::new(self.inter(obj)), Box::new(self.inter(key))),
      Expr::Call(tag, callee, args) => {
        let args = args.iter().map(|a| self.inter(a)).collect();
        Expr::Call(*tag, callee.clone(), args)
      }
      Expr::NamedArg(tag, name, v) => Expr::NamedArg(*tag, *name, Box::new(self.inter(v))),
      Expr::Tuple(tag, vs) => Expr::Tuple(*tag, vs.iter().map(|v| self.inter(v)).collect()),
      Expr::Ternary(tag, cond, l, r) => self.ternary(*tag, cond, l, r),
      Expr::Owner(tag, v) => Expr::Owner(*tag, Box::new(self.expr(v))),
      Expr::Ref(tag, v) => Expr::Ref(*tag, Box::new(self.expr(v))),
      Expr::Opt(tag, v) => Expr::Opt(*tag, Box::new(self.expr(v))),
      Expr::Mut(tag, v) => Expr::Mut(*tag, Box::new(self.expr(v))),
    }
  }

  fn ternary(&mut self, tag: Tag, cond: &Expr, l: &Expr, r: &Expr) -> Expr {
    let entry = self.cur;
    let cond = self.inter(cond);
    let left = self.flow.block();
    self.cur = left;
    let lvar = self.inter(l);

    let right = self.flow.block();
    self.cur = right;
    let rvar = self.inter(r);

    self.flow.blocks[entry].steps.push(Step::CondBranch(cond, left, Some(right)));
    let exit = self.flow.block();
    self.flow.blocks[left].steps.push(Step::Branch(exit));
    self.flow.blocks[right].steps.push(Step::Branch(exit));

    self.cur = exit;
    self.flow.edge(entry, left);
    self.flow.edge(entry, right);
    self.flow.edge(left, exit);
    self.flow.edge(right, exit);
    let dst = self.name();
    self.push(Step::Phi(tag, dst, (left, lvar), (right, rvar)));
    Expr::Name(tag, dst)
  }

  /// After a call inside a `try`, split the block: the call's own block gets
  /// an explicit `Branch` to the fresh continuation, recorded as `caught` so
  /// `try_stmt` can wire it to the pad — the emitter collapses that
  /// `call; branch` pair into one `invoke … to … unwind …` terminator.
  fn redirect(&mut self) {
    let Some(caught) = &mut self.caught else { return };
    let next = self.flow.block();
    self.flow.edge(self.cur, next);
    self.push(Step::Branch(next));
    caught.push(self.cur);
    self.cur = next;
  }

  fn stmt(&mut self, s: &Stmt) {
    match s {
      Stmt::Pass(tag) => self.push(Step::Pass(*tag)),
      Stmt::ExprStmt(tag, e) => {
        let rhs = self.expr(e);
        let is_call = matches!(rhs, Expr::Call(..));
        self.push(Step::Assign(*tag, Expr::Name(*tag, self.name()), rhs));
        if is_call { self.redirect(); }
      }
      Stmt::Return(tag, v) => {
        let v = v.as_ref().map(|v| self.inter(v));
        self.push(Step::Return(*tag, v));
        self.flow.blocks[self.cur].returns = true;
      }
      Stmt::Raise(tag, v) => {
        let v = self.inter(v);
        self.push(Step::Raise(*tag, v));
        self.flow.blocks[self.cur].raises = true;
      }
      Stmt::Assign(tag, left, right) => {
        let rhs = self.expr(right);
        let is_call = matches!(rhs, Expr::Call(..));
        let lhs = match left.as_ref() {
          Expr::Attrib(t, obj, name) => Expr::Attrib(*t, Box::new(self.inter(obj)), *name),
          other => other.clone(),
        };
        self.push(Step::Assign(*tag, lhs, rhs));
        if is_call { self.redirect(); }
      }
      Stmt::IAdd(tag, left, right) => {
        let rhs = self.inter(right);
        self.push(Step::IAdd(*tag, (**left).clone(), rhs));
      }
      Stmt::Yield(tag, v) => {
        let v = self.inter(v);
        let next = self.flow.block();
        self.push(Step::Yield(*tag, v, next));
        self.flow.blocks[self.cur].returns = true;
        self.flow.edge(self.cur, next);
        self.cur = next;
      }
      Stmt::Break(_) => {
        let (_, exit) = *self.loop_stack.last().expect("break outside a loop");
        self.push(Step::Branch(exit));
        self.flow.edge(self.cur, exit);
      }
      Stmt::Continue(_) => {
        let (head, _) = *self.loop_stack.last().expect("continue outside a loop");
        self.push(Step::Branch(head));
        self.flow.edge(self.cur, head);
      }
      Stmt::If(_, blocks) => self.if_stmt(blocks),
      Stmt::While(_, cond, suite) => self.while_stmt(cond, suite),
      Stmt::For(_, lvar, source, suite) => self.for_stmt(*lvar, source, suite),
      Stmt::TryBlock(_, suite, catches) => self.try_stmt(suite, catches),
      Stmt::Import(..) | Stmt::RelImport(..) => {}
    }
  }

  fn if_stmt(&mut self, blocks: &[(Option<Expr>, Suite)]) {
    let mut prevcond: Option<BlockId> = None;
    let mut exits = Vec::new();

    for (i, (cond, suite)) in blocks.iter().enumerate() {
      let body = self.flow.block();

      match (i, cond) {
        (0, Some(c)) => {
          let c = self.inter(c);
          self.flow.edge(self.cur, body);
          self.push(Step::CondBranch(c, body, None));
          prevcond = Some(self.cur);
        }
        (_, Some(c)) => {
          let prev = prevcond.expect("elif without a preceding if");
          let cond_block = self.flow.block();
          self.flow.edge(prev, cond_block);
          patch_else(&mut self.flow.blocks[prev].steps, cond_block);
          self.cur = cond_block;
          let c = self.inter(c);
          self.flow.edge(cond_block, body);
          self.push(Step::CondBranch(c, body, None));
          prevcond = Some(cond_block);
        }
        (_, None) => {
          let prev = prevcond.expect("else without a preceding if");
          self.flow.edge(prev, body);
          patch_else(&mut self.flow.blocks[prev].steps, body);
          prevcond = None;
        }
      }

      self.cur = body;
      self.suite(suite);
      if self.flow.blocks[self.cur].needs_branch() { exits.push(self.cur); }
    }

    let exit = self.flow.block();
    if let Some(prev) = prevcond {
      self.flow.edge(prev, exit);
      patch_else(&mut self.flow.blocks[prev].steps, exit);
    }

    self.cur = exit;
    for b in exits {
      self.flow.blocks[b].steps.push(Step::Branch(exit));
      self.flow.edge(b, exit);
    }
  }

  fn while_stmt(&mut self, cond: &Expr, suite: &Suite) {
    let head = self.flow.block();
    let body = self.flow.block();
    self.push(Step::Branch(head));
    self.flow.edge(self.cur, head);

    self.cur = head;
    let c = self.inter(cond);
    self.push(Step::CondBranch(c, body, None));
    self.flow.edge(head, body);

    self.cur = body;
    let exit = self.flow.block();
    self.loop_stack.push((head, exit));
    self.suite(suite);
    self.loop_stack.pop();
    if self.flow.blocks[self.cur].needs_branch() {
      self.push(Step::Branch(head));
      self.flow.edge(self.cur, head);
    }

    patch_else(&mut self.flow.blocks[head].steps, exit);
    self.flow.edge(head, exit);
    self.cur = exit;
  }

  fn for_stmt(&mut self, lvar: Symbol, source: &Expr, suite: &Suite) {
    let head = self.flow.block();
    let body = self.flow.block();

    let ctx = self.name();
    let source = self.expr(source);
    self.push(Step::LoopSetup(source.tag(), ctx, source));
    self.push(Step::Branch(head));
    self.flow.edge(self.cur, head);

    self.cur = head;
    self.push(Step::LoopHeader(Tag { id: crate::idx::NodeId::from_u32(0), span: Default::default() }, ctx, lvar, body, None));
    self.flow.edge(head, body);

    self.cur = body;
    let exit = self.flow.block();
    self.loop_stack.push((head, exit));
    self.suite(suite);
    self.loop_stack.pop();
    if self.flow.blocks[self.cur].needs_branch() {
      self.push(Step::Branch(head));
      self.flow.edge(self.cur, head);
    }

    if let Step::LoopHeader(_, _, _, _, else_) = self.flow.blocks[head].steps.last_mut().unwrap() {
      *else_ = Some(exit);
    }
    self.flow.edge(head, exit);
    self.cur = exit;
  }

  fn try_stmt(&mut self, suite: &Suite, catches: &[Catch]) {
    let prev_caught = self.caught.take();
    self.caught = Some(Vec::new());
    self.suite(suite);
    let caught = self.caught.take().unwrap_or_default();
    self.caught = prev_caught;

    let pad = self.flow.block();
    for &b in &caught {
      self.flow.edge(b, pad);
      self.flow.invokes.insert(b, pad);
    }

    let mut map = HashMap::new();
    for catch in catches {
      let handler = self.flow.block();
      self.cur = handler;
      self.suite(&catch.suite);
      map.insert(catch.ty, handler);
      self.flow.edge(pad, handler);
    }
    self.flow.blocks[pad].steps.push(Step::LPad(map.clone()));

    let exit = self.flow.block();
    for &id in map.values() {
      self.flow.blocks[id].steps.push(Step::Branch(exit));
      self.flow.edge(id, exit);
    }
    self.cur = exit;
  }
}

fn patch_else(steps: &mut [Step], target: BlockId) {
  if let Some(Step::CondBranch(_, _, else_)) = steps.last_mut() { *else_ = Some(target); }
}

/// Finish building a whole module's set of function CFGs: insert an
/// implicit `return` into any block that falls off the end, prune
/// unreachable blocks, and populate `preds`/`exits`.
pub fn finish(flow: &mut FlowGraph) {
  for block in flow.blocks.iter_mut() {
    if block.steps.is_empty() {
      block.steps.push(Step::Return(Tag { id: crate::idx::NodeId::from_u32(0), span: Default::default() }, None));
      continue;
    }
    if block.needs_branch() {
      block.steps.push(Step::Return(Tag { id: crate::idx::NodeId::from_u32(0), span: Default::default() }, None));
      block.returns = true;
    }
  }

  let mut reachable = vec![false; flow.blocks.len()];
  let mut stack = vec![BlockId::ENTRY];
  reachable[BlockId::ENTRY.as_u32() as usize] = true;
  let mut exits = Vec::new();
  while let Some(b) = stack.pop() {
    match flow.edges.get(&b) {
      Some(next) if !next.is_empty() => {
        for &n in next {
          let idx = n.as_u32() as usize;
          if !reachable[idx] { reachable[idx] = true; stack.push(n); }
        }
      }
      _ => exits.push(b),
    }
  }
  flow.exits = exits;

  for (src, dsts) in &flow.edges {
    if !reachable[src.as_u32() as usize] { continue; }
    for &dst in dsts {
      if reachable[dst.as_u32() as usize] {
        flow.blocks[dst].preds.push(*src);
      }
    }
  }
}
