//! Module assembly: collects one source file's top-level declarations into
//! name and code tables, and merges an imported module's tables into the
//! importer's.
//!
//! Grounded on `original_source/runac/blocks.py`'s `Module` class and
//! `module()` function: a flat `names` table covers classes, traits,
//! declarations, aliases introduced by `from x import y`, and top-level
//! constants; a separate `code` list holds every function and method body,
//! keyed so methods carry their owning class's name alongside their own.

use hashbrown::HashMap;
use crate::ast::{Class, Decl, Expr, File, Function, Stmt, TopLevel, Trait};
use crate::symbol::Symbol;

/// A resolved top-level name: anything a `Name` expression might refer to
/// outside of a local variable.
#[derive(Debug, Clone)]
pub enum NameEntry {
  /// A class definition (its attributes and non-method-body shape).
  Class(Class),
  /// A trait definition.
  Trait(Trait),
  /// An external declaration with no body.
  Decl(Decl),
  /// A dotted alias introduced by `from base import name`, e.g. `"libc.write"`.
  Alias(String),
  /// A top-level `name = value` binding, folded to its value expression.
  Const(Expr),
}

/// Identifies one function body in [`Module::code`]: either a free function
/// or a method qualified by its owning class's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKey {
  /// A module-level `def`.
  Free(Symbol),
  /// A `class`'s method, named `(class, method)`.
  Method(Symbol, Symbol),
}

impl std::fmt::Display for CodeKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Free(n) => write!(f, "{n}"),
      Self::Method(c, m) => write!(f, "{c}.{m}"),
    }
  }
}

/// One file's (or merged set of files') top-level declarations.
#[derive(Debug, Default)]
pub struct Module {
  /// Every name resolvable without going through a local scope.
  pub names: HashMap<Symbol, NameEntry>,
  /// Every function/method body, in declaration order.
  pub code: Vec<(CodeKey, Function)>,
}

fn dotted_name(base: &Expr) -> String {
  match base {
    Expr::Name(_, n) => n.to_string(),
    Expr::Attrib(_, obj, attrib) => format!("{}.{attrib}", dotted_name(obj)),
    _ => String::new(),
  }
}

impl Module {
  /// Build a module from one parsed file's top-level items.
  #[must_use] pub fn build(file: &File) -> Self {
    let mut mod_ = Self::default();
    for item in &file.items {
      match item {
        TopLevel::Function(f) => mod_.code.push((CodeKey::Free(f.name), f.clone())),
        TopLevel::Decl(d) => { mod_.names.insert(d.name, NameEntry::Decl(d.clone())); }
        TopLevel::Class(c) => {
          for m in &c.methods {
            mod_.code.push((CodeKey::Method(c.name, m.name), m.clone()));
          }
          mod_.names.insert(c.name, NameEntry::Class(c.clone()));
        }
        TopLevel::Trait(t) => { mod_.names.insert(t.name, NameEntry::Trait(t.clone())); }
        TopLevel::Assign(_, name, value) => { mod_.names.insert(*name, NameEntry::Const(value.clone())); }
        TopLevel::Import(Stmt::RelImport(_, base, names)) => {
          let base = dotted_name(base);
          for name in names {
            mod_.names.insert(*name, NameEntry::Alias(format!("{base}.{name}")));
          }
        }
        TopLevel::Import(Stmt::Import(_, name)) => {
          mod_.names.insert(*name, NameEntry::Alias(name.to_string()));
        }
        TopLevel::Import(_) => {}
      }
    }
    mod_
  }

  /// Merge `other`'s tables into `self`, asserting no name collides — the
  /// core library and the main file are expected to define disjoint sets
  /// of top-level names, matching `blocks.py`'s `merge`'s `assert k not in
  /// self.names`.
  ///
  /// # Panics
  /// If `other` defines a name already present in `self`.
  pub fn merge(&mut self, other: Self) {
    for (name, entry) in other.names {
      assert!(!self.names.contains_key(&name), "duplicate top-level name '{name}'");
      self.names.insert(name, entry);
    }
    self.code.extend(other.code);
  }
}
