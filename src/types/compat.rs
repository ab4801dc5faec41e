//! Type compatibility and overload scoring.
//!
//! Grounded on `original_source/runac/types.py`'s `compat`/`score` free
//! functions: a three-valued compatibility check (`Exact`/`Coerce`/`None`)
//! used both to validate a single assignment and, summed across a call's
//! actual arguments, to rank overload candidates.

use super::Type;

/// How well an actual type satisfies a formal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompatMode {
  /// Identical types, or a match so direct no instruction is needed.
  Exact,
  /// Compatible given an implicit coercion (literal specialization, `Owner`
  /// unwrapping to its contained type for `self`, mutable-ref to immutable-ref).
  Coerce,
}

/// Whether an actual value of type `found` may be used where `expected` is
/// required, and how. `None` means incompatible.
#[must_use]
pub fn compat<'ty>(expected: &'ty Type<'ty>, found: &'ty Type<'ty>) -> Option<CompatMode> {
  use Type::{AnyFloat, AnyInt, Bool, Byte, Concrete, Float, Function, IntN, Opt, Owner, Ref, Tuple, UintN, VarArgs, Void};

  if expected == found { return Some(CompatMode::Exact); }

  match (expected, found) {
    // A generic literal specializes to any sized numeric of the matching family.
    (IntN(_) | UintN(_), AnyInt) => Some(CompatMode::Coerce),
    (Float, AnyFloat) => Some(CompatMode::Coerce),
    (AnyInt, AnyInt) | (AnyFloat, AnyFloat) => Some(CompatMode::Exact),

    // `?T` accepts a bare `T`, or `None` (callers check `None` separately
    // since it has no `Type` representation to compare against here), or
    // another `?T'` where `T'` is itself compatible with `T`.
    (Opt(inner), _) => {
      if let Some(m) = compat(inner, found) { return Some(m); }
      if let Opt(found_inner) = found { return compat(inner, found_inner); }
      None
    }

    // `&T` accepts `~&T` (mutable is strictly more capable than immutable)
    // and, transparently, the wrapped type itself when taking by reference
    // is legal at a call site (formal `&T`, actual owner `$T`).
    (Ref(e, want_mut), Ref(f, has_mut)) => {
      if *want_mut && !*has_mut { return None; }
      compat(e, f)
    }
    (Ref(e, _), Owner(f)) => compat(e, f),

    // `$T` only accepts another `$T` with a compatible payload: ownership
    // cannot be manufactured from a borrow.
    (Owner(e), Owner(f)) => compat(e, f),

    (Function(r1, a1), Function(r2, a2)) if a1.len() == a2.len() => {
      let ret_ok = compat(r1, r2).is_some();
      let args_ok = a1.iter().zip(a2.iter()).all(|(x, y)| compat(x, y).is_some());
      (ret_ok && args_ok).then_some(CompatMode::Coerce)
    }

    (Tuple(e), Tuple(f)) if e.len() == f.len() =>
      e.iter().zip(f.iter()).all(|(x, y)| compat(x, y).is_some()).then_some(CompatMode::Coerce),

    (Concrete(n1, a1), Concrete(n2, a2)) if n1 == n2 && a1.len() == a2.len() =>
      a1.iter().zip(a2.iter()).all(|(x, y)| compat(x, y).is_some()).then_some(CompatMode::Exact),

    // Byte and Bool are distinct 1-byte scalars in the source language;
    // neither coerces to the other or to a sized int.
    (Bool, Bool) | (Byte, Byte) | (Void, Void) | (VarArgs, VarArgs) => Some(CompatMode::Exact),

    _ => None,
  }
}

/// Score one candidate signature against a call's actual argument types:
/// `Some(n)` where `n` is the number of non-`Exact` coercions needed (lower
/// is a better match), or `None` if any argument is incompatible or the
/// arities disagree and the formal list has no trailing `VarArgs`.
#[must_use]
pub fn score<'ty>(formals: &[&'ty Type<'ty>], actuals: &[&'ty Type<'ty>]) -> Option<u32> {
  let varargs = formals.last().is_some_and(|t| matches!(t, Type::VarArgs));
  let fixed = if varargs { &formals[.. formals.len() - 1] } else { formals };

  if varargs {
    if actuals.len() < fixed.len() { return None; }
  } else if actuals.len() != fixed.len() {
    return None;
  }

  let mut penalty = 0;
  for (f, a) in fixed.iter().zip(actuals.iter()) {
    match compat(f, a)? {
      CompatMode::Exact => {}
      CompatMode::Coerce => penalty += 1,
    }
  }
  Some(penalty)
}
