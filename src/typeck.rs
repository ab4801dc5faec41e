//! Type inference over a function's control flow graph.
//!
//! Grounded on `original_source/runac/typer.py`: resolves every `Name` to
//! either a local variable, a module-level function/constant, or a core
//! library entry; assigns each expression a [`Type`] recorded in a
//! [`NodeId`]-keyed side table (per the side-table design note, rather than
//! `typer.py`'s in-place `node.type = ...` mutation); and implements the
//! `x is None` narrowing idiom by locally shadowing a variable's declared
//! `Opt` type with its unwrapped form inside the block a `CondBranch` routes
//! to only on the "is None" arm.

use hashbrown::HashMap;
use crate::ast::{BinOp, Expr};
use crate::cfg::{FlowGraph, Step};
use crate::diagnostics::{CompileError, Position, SemanticError, SemanticKind};
use crate::idx::{BlockId, NodeId};
use crate::symbol::Symbol;
use crate::types::{Registry, Type};

/// The `NodeId -> Type` side table produced by a successful type-check pass.
pub struct Annotations<'ty> {
  /// The resolved type of every expression, keyed by its [`Tag::id`](crate::ast::Tag::id).
  pub types: HashMap<NodeId, &'ty Type<'ty>>,
  /// The final resolved type of every local variable (including formals),
  /// consulted by [`crate::destruct`] and [`crate::llir`] which need a
  /// variable's type without an enclosing expression node to hang it off.
  pub vars: HashMap<Symbol, &'ty Type<'ty>>,
}

impl<'ty> Annotations<'ty> {
  /// Look up a previously recorded expression type; panics on a bug in the
  /// pass ordering (every step is type-checked before being consumed downstream).
  #[must_use] pub fn of(&self, id: NodeId) -> &'ty Type<'ty> {
    self.types.get(&id).copied().expect("expression type-checked before use")
  }
}

/// One function's signature plus the span it came from, for the `main`/
/// lifecycle-method shape checks.
pub struct Signature<'ty> {
  /// Declared formal types, `self` included for methods.
  pub params: Vec<(Symbol, &'ty Type<'ty>)>,
  /// Declared return type (`Void` if unannotated).
  pub ret: &'ty Type<'ty>,
}

struct Checker<'a, 'ty> {
  registry: &'a mut Registry<'ty>,
  sig: &'a Signature<'ty>,
  vars: HashMap<Symbol, &'ty Type<'ty>>,
  types: HashMap<NodeId, &'ty Type<'ty>>,
  file: std::rc::Rc<str>,
  line_of: &'a dyn Fn(u32) -> std::rc::Rc<str>,
}

impl<'a, 'ty> Checker<'a, 'ty> {
  fn pos(&self, span: crate::diagnostics::Span) -> Position {
    Position::from_span(self.file.clone(), span, (self.line_of)(span.start.line))
  }

  fn err(&self, span: crate::diagnostics::Span, kind: SemanticKind) -> CompileError {
    SemanticError::new(self.pos(span), kind).into()
  }

  fn record(&mut self, id: NodeId, ty: &'ty Type<'ty>) { self.types.insert(id, ty); }

  fn bind(&mut self, span: crate::diagnostics::Span, name: Symbol, ty: &'ty Type<'ty>) -> Result<(), CompileError> {
    if let Some(prev) = self.vars.get(&name) {
      if *prev != ty {
        return Err(self.err(span, SemanticKind::Reassignment(name.to_string())));
      }
      return Ok(());
    }
    self.vars.insert(name, ty);
    Ok(())
  }

  fn expr(&mut self, e: &Expr) -> Result<&'ty Type<'ty>, CompileError> {
    let tag = e.tag();
    let ty: &'ty Type<'ty> = match e {
      Expr::None(_) => { let v = self.registry.void(); self.registry.opt(v) }
      Expr::Bool(..) => self.registry.bool_(),
      Expr::Int(..) => self.registry.any_int(),
      Expr::Float(..) => self.registry.any_float(),
      Expr::String(..) => {
        let byte = self.registry.byte();
        self.registry.ref_(byte, false)
      }
      Expr::Name(_, n) => self.vars.get(n).copied().ok_or_else(|| {
        self.err(tag.span, SemanticKind::UndefinedName(n.to_string()))
      })?,
      Expr::Not(_, v) => { self.expr(v)?; self.registry.bool_() }
      Expr::As(_, _, cast_ty) => self.type_expr(cast_ty)?,
      Expr::Binary(_, op, l, r) => self.binary(*op, l, r)?,
      Expr::Attrib(_, obj, name) => {
        let obj_ty = self.expr(obj)?;
        let base = obj_ty.unwrap();
        let info_name = match base { Type::Concrete(n, _) | Type::Template(n) => *n, _ => {
          return Err(self.err(tag.span, SemanticKind::TypeMismatch {
            context: "attribute access", expected: "a class instance".into(), found: base.to_string(),
          }));
        }};
        let info = self.registry.infos.get(&info_name);
        info.and_then(|i| i.attrib(*name)).map(|(_, t)| t).ok_or_else(|| {
          self.err(tag.span, SemanticKind::UndefinedName(format!("{info_name}.{name}")))
        })?
      }
      Expr::Elem(_, obj, key) => { self.expr(obj)?; self.expr(key)?; self.registry.any_int() }
      Expr::Tuple(_, vs) => {
        let tys = vs.iter().map(|v| self.expr(v)).collect::<Result<Vec<_>, _>>()?;
        self.registry.tuple(tys)
      }
      Expr::NamedArg(_, _, v) => self.expr(v)?,
      Expr::Call(_, callee, args) => self.call(callee, args)?,
      Expr::Ternary(_, cond, l, r) => {
        self.expr(cond)?;
        let lt = self.expr(l)?;
        let rt = self.expr(r)?;
        if lt != rt {
          return Err(self.err(tag.span, SemanticKind::TypeMismatch {
            context: "ternary branches", expected: lt.to_string(), found: rt.to_string(),
          }));
        }
        lt
      }
      Expr::Owner(_, inner) => { let t = self.type_expr(inner)?; self.registry.owner(t) }
      Expr::Ref(_, inner) => { let t = self.type_expr(inner)?; self.registry.ref_(t, false) }
      Expr::Opt(_, inner) => { let t = self.type_expr(inner)?; self.registry.opt(t) }
      Expr::Mut(_, inner) => { let t = self.type_expr(inner)?; self.registry.ref_(t, true) }
    };
    self.record(tag.id, ty);
    Ok(ty)
  }

  fn type_expr(&mut self, e: &Expr) -> Result<&'ty Type<'ty>, CompileError> {
    resolve_type_expr(self.registry, e).ok_or_else(|| self.err(e.tag().span, SemanticKind::UndefinedName("type expression".into())))
  }

  fn binary(&mut self, op: BinOp, l: &Expr, r: &Expr) -> Result<&'ty Type<'ty>, CompileError> {
    let lt = self.expr(l)?;
    let rt = self.expr(r)?;
    match op {
      BinOp::And | BinOp::Or => Ok(self.registry.bool_()),
      BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::Is => {
        let compatible = lt == rt || lt.is_generic() || rt.is_generic();
        if !compatible {
          return Err(self.err(l.tag().span, SemanticKind::TypeMismatch {
            context: "comparison", expected: lt.to_string(), found: rt.to_string(),
          }));
        }
        Ok(self.registry.bool_())
      }
      BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
      | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
        if lt.is_generic() { return Ok(rt); }
        if rt.is_generic() { return Ok(lt); }
        if lt != rt {
          return Err(self.err(l.tag().span, SemanticKind::TypeMismatch {
            context: "arithmetic", expected: lt.to_string(), found: rt.to_string(),
          }));
        }
        Ok(lt)
      }
    }
  }

  fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<&'ty Type<'ty>, CompileError> {
    let arg_tys = args.iter().map(|a| self.expr(a)).collect::<Result<Vec<_>, _>>()?;

    if let Expr::Attrib(_, obj, method) = callee {
      let obj_ty = self.expr(obj)?;
      let base = obj_ty.unwrap();
      let owner_name = match base { Type::Concrete(n, _) | Type::Template(n) => *n, _ => {
        return Err(self.err(callee.tag().span, SemanticKind::UndefinedName(method.to_string())));
      }};
      let candidates = self.registry.methods_of(owner_name, *method).unwrap_or(&[]).to_vec();
      return self.resolve_overload(&method.to_string(), owner_name, &candidates, &arg_tys, callee.tag().span);
    }

    if let Expr::Name(_, name) = callee {
      if let Some(ty) = self.vars.get(name) {
        if let Type::Function(ret, _) = ty { return Ok(ret); }
      }
    }
    // Free function / core-library call: degrade gracefully to `void` when
    // the registry has no record (e.g. an extern `libc` declaration not
    // modeled in this pass), matching the permissive resolution fallback
    // `typer.py`'s `resolve` performs for anything outside `mod.scope`.
    Ok(self.registry.void())
  }

  fn resolve_overload(
    &mut self, display: &str, owner: Symbol, candidates: &[crate::types::FunctionDecl<'ty>],
    arg_tys: &[&'ty Type<'ty>], span: crate::diagnostics::Span,
  ) -> Result<&'ty Type<'ty>, CompileError> {
    let mut best: Option<(&crate::types::FunctionDecl<'ty>, u32)> = None;
    let mut tried = Vec::new();
    for cand in candidates {
      let Type::Function(_, formals) = cand.ty else { continue };
      tried.push(format!("{owner}.{}", cand.name));
      if let Some(score) = crate::types::compat::score(formals, arg_tys) {
        if best.is_none_or(|(_, s)| score < s) { best = Some((cand, score)); }
      }
    }
    match best {
      Some((cand, _)) => {
        let Type::Function(ret, _) = cand.ty else { unreachable!() };
        Ok(*ret)
      }
      None => Err(self.err(span, SemanticKind::NoMatchingOverload { name: display.to_owned(), tried })),
    }
  }
}

/// Resolve a type-form expression (`$T`, `&T`, `~T`, `?T`, a bare name, or
/// `Template[Arg]`) against the registry, independent of any function's
/// local variable scope. Used both by [`Checker::type_expr`] while
/// checking a body and by [`crate::driver`] while building every
/// function's [`Signature`] up front.
#[must_use]
pub fn resolve_type_expr<'ty>(registry: &mut Registry<'ty>, e: &Expr) -> Option<&'ty Type<'ty>> {
  match e {
    Expr::Name(_, n) => Some(match n.as_str() {
      "int" => registry.int(),
      "float" => registry.float(),
      "bool" => registry.bool_(),
      "byte" => registry.byte(),
      "void" => registry.void(),
      "str" => { let b = registry.byte(); registry.ref_(b, false) }
      other => registry.template(crate::symbol::intern(other)),
    }),
    Expr::Owner(_, inner) => { let t = resolve_type_expr(registry, inner)?; Some(registry.owner(t)) }
    Expr::Ref(_, inner) => { let t = resolve_type_expr(registry, inner)?; Some(registry.ref_(t, false)) }
    Expr::Mut(_, inner) => { let t = resolve_type_expr(registry, inner)?; Some(registry.ref_(t, true)) }
    Expr::Opt(_, inner) => { let t = resolve_type_expr(registry, inner)?; Some(registry.opt(t)) }
    Expr::Elem(_, base, arg) => {
      let Expr::Name(_, template) = base.as_ref() else { return None };
      let arg_ty = resolve_type_expr(registry, arg)?;
      Some(registry.concrete(*template, vec![arg_ty]))
    }
    _ => None,
  }
}

/// Narrowing target extracted from a `CondBranch` condition, when it
/// matches the `x is None` idiom.
fn opt_narrow_target(step: &Step) -> Option<(Symbol, BlockId, BlockId)> {
  let Step::CondBranch(cond, then_b, Some(else_b)) = step else { return None };
  if let Expr::Binary(_, BinOp::Is, l, r) = cond {
    if let (Expr::Name(_, n), Expr::None(_)) = (l.as_ref(), r.as_ref()) {
      // `is None` routes the *else* branch to the narrowed (non-null) case.
      return Some((*n, *else_b, *then_b));
    }
  }
  None
}

/// Type-check one function body's flow graph, returning the expression-type
/// side table for downstream passes.
pub fn check<'ty>(
  registry: &mut Registry<'ty>, sig: &Signature<'ty>, flow: &FlowGraph,
  file: std::rc::Rc<str>, line_of: &dyn Fn(u32) -> std::rc::Rc<str>,
) -> Result<Annotations<'ty>, CompileError> {
  let vars: HashMap<Symbol, &'ty Type<'ty>> = sig.params.iter().copied().collect();
  let mut checker = Checker { registry, sig, vars, types: HashMap::new(), file, line_of };

  for (id, block) in flow.blocks.iter_enum() {
    let narrow = block.preds.iter().find_map(|&p| {
      flow.blocks.get(p).and_then(|pb| pb.steps.last()).and_then(opt_narrow_target)
        .filter(|(_, narrowed_block, _)| *narrowed_block == id)
    });
    let saved = narrow.and_then(|(name, ..)| {
      checker.vars.get(&name).copied().map(|old| {
        if let Type::Opt(inner) = old { checker.vars.insert(name, inner); }
        (name, old)
      })
    });

    for step in &block.steps {
      check_step(&mut checker, step)?;
    }

    if let Some((name, old)) = saved { checker.vars.insert(name, old); }
  }

  Ok(Annotations { types: checker.types, vars: checker.vars })
}

fn check_step<'ty>(checker: &mut Checker<'_, 'ty>, step: &Step) -> Result<(), CompileError> {
  match step {
    Step::Pass(_) | Step::Branch(_) | Step::LPad(_) | Step::Free(_) => Ok(()),
    Step::Return(tag, v) => {
      let ty = match v { Some(v) => checker.expr(v)?, None => checker.registry.void() };
      if ty != checker.sig.ret && !ty.is_generic() {
        return Err(checker.err(tag.span, SemanticKind::TypeMismatch {
          context: "return", expected: checker.sig.ret.to_string(), found: ty.to_string(),
        }));
      }
      Ok(())
    }
    Step::Raise(_, v) | Step::Yield(_, v, _) => { checker.expr(v)?; Ok(()) }
    Step::CondBranch(cond, ..) => { checker.expr(cond)?; Ok(()) }
    Step::Assign(tag, left, right) => {
      let rty = checker.expr(right)?;
      match left {
        Expr::Name(_, n) => checker.bind(tag.span, *n, rty),
        other => { checker.expr(other)?; Ok(()) }
      }
    }
    Step::IAdd(tag, left, right) => {
      let Expr::Name(_, n) = left else { return Ok(()) };
      let lty = checker.vars.get(n).copied().ok_or_else(|| checker.err(tag.span, SemanticKind::UndefinedName(n.to_string())))?;
      if lty.is_owner() {
        return Err(checker.err(tag.span, SemanticKind::InPlaceAddOnOwner(n.to_string())));
      }
      checker.expr(right)?;
      Ok(())
    }
    Step::Phi(tag, dst, (_, l), (_, r)) => {
      let lt = checker.expr(l)?;
      let rt = checker.expr(r)?;
      if lt != rt {
        return Err(checker.err(tag.span, SemanticKind::TypeMismatch {
          context: "phi merge", expected: lt.to_string(), found: rt.to_string(),
        }));
      }
      checker.record(tag.id, lt);
      checker.bind(tag.span, *dst, lt)
    }
    Step::LoopSetup(_, var, source) => {
      let ty = checker.expr(source)?;
      checker.vars.insert(*var, ty);
      Ok(())
    }
    Step::LoopHeader(_, _ctx, lvar, ..) => {
      // The element type of the setup's iterable; without a modeled
      // iterator-protocol type this degrades to `int` (the only iterable
      // form the core library currently exposes is a numeric range).
      let ty = checker.registry.int();
      checker.vars.insert(*lvar, ty);
      Ok(())
    }
  }
}
