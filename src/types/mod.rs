//! The type registry: a set-of-instances model with wrapper types, template
//! instantiation, trait structural matching, and overload selection.
//!
//! Grounded on `original_source/runac/types.py` (base class hierarchy,
//! method tables, `add()`/`get()` dynamic class construction) and mmcc's
//! `types/entity.rs` arena-interning style, adapted: canonical [`Type`]
//! instances are interned in a [`typed_arena::Arena`] owned by the
//! [`Registry`] so that equal types really are the same `&Type` pointer,
//! letting later passes use pointer equality instead of deep structural
//! comparison in the hot path.

mod compat;
pub use compat::{CompatMode, compat};

use hashbrown::HashMap;
use itertools::Itertools;
use typed_arena::Arena;
use crate::symbol::Symbol;

/// A canonical type instance. `Registry::intern` guarantees that two calls
/// producing an equal `Type` value return the same `&'ty Type<'ty>`.
#[derive(Debug)]
pub enum Type<'ty> {
  /// Absence of a value; the only legal return type for a function that
  /// falls off the end of its body.
  Void,
  /// A single-bit boolean.
  Bool,
  /// An unsigned 8-bit byte.
  Byte,
  /// A signed integer of the given bit width.
  IntN(u32),
  /// An unsigned integer of the given bit width.
  UintN(u32),
  /// A 64-bit IEEE float.
  Float,
  /// An integer literal whose concrete width/signedness is not yet fixed.
  AnyInt,
  /// A float literal not yet fixed to a concrete representation.
  AnyFloat,
  /// An imported namespace; `functions` maps a bare name to its signature.
  Module(Symbol),
  /// `$T` — an owned heap value.
  Owner(&'ty Type<'ty>),
  /// `&T` — a borrowed pointer; `mutable` tracks `~&T` vs `&T`.
  Ref(&'ty Type<'ty>, bool),
  /// `?T` — a nullable wrapper.
  Opt(&'ty Type<'ty>),
  /// A first-class function signature.
  Function(&'ty Type<'ty>, Vec<&'ty Type<'ty>>),
  /// A marker occupying the last slot of a C-style varargs formal list.
  VarArgs,
  /// A method-only structural interface.
  Trait(Symbol),
  /// An uninstantiated generic class/trait.
  Template(Symbol),
  /// `Template[Args]` — a concrete instantiation of a template.
  Concrete(Symbol, Vec<&'ty Type<'ty>>),
  /// A product type.
  Tuple(Vec<&'ty Type<'ty>>),
  /// A placeholder for a template's own type parameter, before substitution.
  Stub(Symbol),
}

impl PartialEq for Type<'_> {
  fn eq(&self, other: &Self) -> bool {
    use Type::{AnyFloat, AnyInt, Bool, Byte, Concrete, Float, Function, IntN, Module, Opt, Owner, Ref, Stub, Template, Trait, Tuple, UintN, VarArgs, Void};
    match (self, other) {
      (Void, Void) | (Bool, Bool) | (Byte, Byte) | (Float, Float) | (AnyInt, AnyInt)
      | (AnyFloat, AnyFloat) | (VarArgs, VarArgs) => true,
      (IntN(a), IntN(b)) | (UintN(a), UintN(b)) => a == b,
      (Module(a), Module(b)) | (Trait(a), Trait(b)) | (Template(a), Template(b)) | (Stub(a), Stub(b)) => a == b,
      (Owner(a), Owner(b)) => std::ptr::eq(*a, *b),
      (Ref(a, m1), Ref(b, m2)) => std::ptr::eq(*a, *b) && m1 == m2,
      (Opt(a), Opt(b)) => std::ptr::eq(*a, *b),
      (Function(r1, a1), Function(r2, a2)) =>
        std::ptr::eq(*r1, *r2) && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| std::ptr::eq(*x, *y)),
      (Concrete(n1, p1), Concrete(n2, p2)) =>
        n1 == n2 && p1.len() == p2.len() && p1.iter().zip(p2).all(|(x, y)| std::ptr::eq(*x, *y)),
      (Tuple(p1), Tuple(p2)) =>
        p1.len() == p2.len() && p1.iter().zip(p2).all(|(x, y)| std::ptr::eq(*x, *y)),
      _ => false,
    }
  }
}
impl Eq for Type<'_> {}

impl<'ty> Type<'ty> {
  /// Strip `Owner`/`Ref`/`Opt` wrappers, returning the innermost type.
  #[must_use] pub fn unwrap(&'ty self) -> &'ty Type<'ty> {
    match self {
      Self::Owner(t) | Self::Ref(t, _) | Self::Opt(t) => t.unwrap(),
      _ => self,
    }
  }

  /// Whether this type (after unwrapping) is `AnyInt` or `AnyFloat`.
  #[must_use] pub fn is_generic(&'ty self) -> bool { matches!(self.unwrap(), Self::AnyInt | Self::AnyFloat) }

  /// Whether this is a sized signed or unsigned integer.
  #[must_use] pub fn is_sized_int(&self) -> bool { matches!(self, Self::IntN(_) | Self::UintN(_)) }

  /// Whether this type carries `Owner` semantics at the top level (i.e. a
  /// value of this type must be freed unless it escapes).
  #[must_use] pub fn is_owner(&self) -> bool { matches!(self, Self::Owner(_)) }

  /// Mangle this type into a link-name fragment disambiguating method
  /// overloads: `&` becomes `R`, `$` becomes `O`, and a template's `[...]`
  /// argument list becomes `BT...ET` (begin/end template), recursively.
  #[must_use] pub fn mangle(&self) -> String {
    match self {
      Self::Void => "void".into(),
      Self::Bool => "bool".into(),
      Self::Byte => "byte".into(),
      Self::IntN(n) => format!("i{n}"),
      Self::UintN(n) => format!("u{n}"),
      Self::Float => "float".into(),
      Self::AnyInt => "i64".into(),
      Self::AnyFloat => "float".into(),
      Self::Module(n) => n.to_string(),
      Self::Owner(t) => format!("O{}", t.mangle()),
      Self::Ref(t, _) => format!("R{}", t.mangle()),
      Self::Opt(t) => format!("Q{}", t.mangle()),
      Self::Function(r, args) => format!("F{}{}{}", r.mangle(), args.iter().map(|t| t.mangle()).join(""), "E"),
      Self::VarArgs => "V".into(),
      Self::Trait(n) | Self::Template(n) | Self::Stub(n) => n.to_string(),
      Self::Concrete(n, args) => format!("{n}BT{}ET", args.iter().map(|t| t.mangle()).join("")),
      Self::Tuple(params) => format!("TBT{}ET", params.iter().map(|t| t.mangle()).join("")),
    }
  }
}

/// The word-sized signed integer width used for untyped `int` defaulting.
pub const WORD_BITS: u32 = 64;

/// A function/method declaration: a display name, the mangled link name
/// produced once overload resolution picks a candidate, and its type.
#[derive(Debug, Clone)]
pub struct FunctionDecl<'ty> {
  /// Source-level name (unmangled).
  pub name: Symbol,
  /// The mangled symbol emitted into the LLIR, computed at registration time.
  pub link_name: String,
  /// Declared type; always a `Type::Function`.
  pub ty: &'ty Type<'ty>,
}

/// Everything known about one concrete or template type: its fields and
/// overload sets.
#[derive(Debug, Default)]
pub struct TypeInfo<'ty> {
  /// `name -> (index, type)` for struct-like fields, in declaration order.
  pub attribs: Vec<(Symbol, &'ty Type<'ty>)>,
  /// `name -> overload set`.
  pub methods: HashMap<Symbol, Vec<FunctionDecl<'ty>>>,
  /// Template parameter names, for `Template`/`Concrete` entries only.
  pub params: Vec<Symbol>,
}

impl<'ty> TypeInfo<'ty> {
  /// Look up a field's index and type by name.
  #[must_use] pub fn attrib(&self, name: Symbol) -> Option<(usize, &'ty Type<'ty>)> {
    self.attribs.iter().position(|(n, _)| *n == name).map(|i| (i, self.attribs[i].1))
  }
}

/// The module-scoped type registry: owns the arena all `Type` instances are
/// interned into, plus the side tables of attributes/methods keyed by the
/// type's canonical name.
pub struct Registry<'ty> {
  arena: &'ty Arena<Type<'ty>>,
  cache: HashMap<CacheKey<'ty>, &'ty Type<'ty>>,
  /// Per-named-type field/method tables, keyed by the type's declared name
  /// (for both `Template`s and the non-generic `base` classes of
  /// `original_source/runac/types.py`).
  pub infos: HashMap<Symbol, TypeInfo<'ty>>,
}

#[derive(PartialEq, Eq, Hash)]
enum CacheKey<'ty> {
  Void, Bool, Byte, Float, AnyInt, AnyFloat, VarArgs,
  IntN(u32), UintN(u32),
  Module(Symbol), Trait(Symbol), Template(Symbol), Stub(Symbol),
  Owner(*const Type<'ty>), Ref(*const Type<'ty>, bool), Opt(*const Type<'ty>),
  Function(*const Type<'ty>, Vec<*const Type<'ty>>),
  Concrete(Symbol, Vec<*const Type<'ty>>),
  Tuple(Vec<*const Type<'ty>>),
}

impl<'ty> Registry<'ty> {
  /// Build a fresh registry backed by the given arena (owned by the caller,
  /// typically the [`crate::module::Module`], so its lifetime outlives
  /// every pass that needs to hold `&'ty Type<'ty>` references).
  #[must_use] pub fn new(arena: &'ty Arena<Type<'ty>>) -> Self {
    Self { arena, cache: HashMap::new(), infos: HashMap::new() }
  }

  fn intern(&mut self, key: CacheKey<'ty>, build: impl FnOnce() -> Type<'ty>) -> &'ty Type<'ty> {
    if let Some(t) = self.cache.get(&key) { return t; }
    let t = self.arena.alloc(build());
    // SAFETY-free: we just allocated `t` in `self.arena`, which outlives
    // `self.cache`'s accesses, so re-storing the pointer form of `key` is sound.
    self.cache.insert(key, t);
    t
  }

  /// The `Void` singleton.
  pub fn void(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::Void, || Type::Void) }
  /// The `Bool` singleton.
  pub fn bool_(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::Bool, || Type::Bool) }
  /// The `Byte` singleton.
  pub fn byte(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::Byte, || Type::Byte) }
  /// The 64-bit `Float` singleton.
  pub fn float(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::Float, || Type::Float) }
  /// The unresolved integer-literal singleton.
  pub fn any_int(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::AnyInt, || Type::AnyInt) }
  /// The unresolved float-literal singleton.
  pub fn any_float(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::AnyFloat, || Type::AnyFloat) }
  /// The varargs-tail marker.
  pub fn varargs(&mut self) -> &'ty Type<'ty> { self.intern(CacheKey::VarArgs, || Type::VarArgs) }
  /// A signed integer of `bits` width.
  pub fn int_n(&mut self, bits: u32) -> &'ty Type<'ty> { self.intern(CacheKey::IntN(bits), || Type::IntN(bits)) }
  /// An unsigned integer of `bits` width.
  pub fn uint_n(&mut self, bits: u32) -> &'ty Type<'ty> { self.intern(CacheKey::UintN(bits), || Type::UintN(bits)) }
  /// The word-sized default `int`.
  pub fn int(&mut self) -> &'ty Type<'ty> { self.int_n(WORD_BITS) }
  /// A module namespace.
  pub fn module(&mut self, name: Symbol) -> &'ty Type<'ty> { self.intern(CacheKey::Module(name), || Type::Module(name)) }
  /// A trait interface by name.
  pub fn trait_(&mut self, name: Symbol) -> &'ty Type<'ty> { self.intern(CacheKey::Trait(name), || Type::Trait(name)) }
  /// An uninstantiated template by name.
  pub fn template(&mut self, name: Symbol) -> &'ty Type<'ty> { self.intern(CacheKey::Template(name), || Type::Template(name)) }
  /// A template type-parameter placeholder.
  pub fn stub(&mut self, name: Symbol) -> &'ty Type<'ty> { self.intern(CacheKey::Stub(name), || Type::Stub(name)) }

  /// `$T`.
  pub fn owner(&mut self, inner: &'ty Type<'ty>) -> &'ty Type<'ty> {
    self.intern(CacheKey::Owner(inner), || Type::Owner(inner))
  }
  /// `&T` (or `~&T` if `mutable`).
  pub fn ref_(&mut self, inner: &'ty Type<'ty>, mutable: bool) -> &'ty Type<'ty> {
    self.intern(CacheKey::Ref(inner, mutable), || Type::Ref(inner, mutable))
  }
  /// `?T`.
  pub fn opt(&mut self, inner: &'ty Type<'ty>) -> &'ty Type<'ty> {
    self.intern(CacheKey::Opt(inner), || Type::Opt(inner))
  }
  /// `(args...) -> ret`.
  pub fn function(&mut self, ret: &'ty Type<'ty>, args: Vec<&'ty Type<'ty>>) -> &'ty Type<'ty> {
    let key_args = args.iter().map(|t| *t as *const _).collect();
    self.intern(CacheKey::Function(ret, key_args), || Type::Function(ret, args))
  }
  /// `(a, b, c)`.
  pub fn tuple(&mut self, params: Vec<&'ty Type<'ty>>) -> &'ty Type<'ty> {
    let key = params.iter().map(|t| *t as *const _).collect();
    self.intern(CacheKey::Tuple(key), || Type::Tuple(params))
  }
  /// `Template[Args]`: substitute every `Stub(p)` in the template's field
  /// and method tables with `Args[p]`, caching the result so repeated
  /// instantiations with the same arguments return one shared `Concrete`.
  pub fn concrete(&mut self, template: Symbol, args: Vec<&'ty Type<'ty>>) -> &'ty Type<'ty> {
    let key = args.iter().map(|t| *t as *const _).collect();
    let t = self.intern(CacheKey::Concrete(template, key), || Type::Concrete(template, args.clone()));
    if !self.infos.contains_key(&concrete_cache_name(template, &args)) {
      self.instantiate_info(template, &args);
    }
    t
  }

  fn instantiate_info(&mut self, template: Symbol, args: &[&'ty Type<'ty>]) {
    let Some(base) = self.infos.get(&template) else { return };
    let subst = base.params.clone().into_iter().zip(args.iter().copied()).collect::<HashMap<_, _>>();
    let attribs = base.attribs.iter().map(|(n, t)| (*n, self.substitute(t, &subst))).collect();
    let methods = base.methods.clone();
    let name = concrete_cache_name(template, args);
    self.infos.insert(name, TypeInfo { attribs, methods, params: Vec::new() });
  }

  fn substitute(&self, ty: &'ty Type<'ty>, subst: &HashMap<Symbol, &'ty Type<'ty>>) -> &'ty Type<'ty> {
    match ty {
      Type::Stub(p) => subst.get(p).copied().unwrap_or(ty),
      _ => ty,
    }
  }

  /// The overload set for `method` on the type named `name`.
  #[must_use] pub fn methods_of(&self, name: Symbol, method: Symbol) -> Option<&[FunctionDecl<'ty>]> {
    self.infos.get(&name).and_then(|info| info.methods.get(&method)).map(Vec::as_slice)
  }
}

fn concrete_cache_name(template: Symbol, args: &[&Type<'_>]) -> Symbol {
  let joined = args.iter().map(|t| format!("{t:?}")).join(",");
  crate::symbol::intern(&format!("{template}[{joined}]"))
}

impl std::fmt::Display for Type<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Void => write!(f, "void"),
      Self::Bool => write!(f, "bool"),
      Self::Byte => write!(f, "byte"),
      Self::IntN(n) => write!(f, "i{n}"),
      Self::UintN(n) => write!(f, "u{n}"),
      Self::Float => write!(f, "float"),
      Self::AnyInt => write!(f, "anyint"),
      Self::AnyFloat => write!(f, "anyfloat"),
      Self::Module(n) => write!(f, "module {n}"),
      Self::Owner(t) => write!(f, "${t}"),
      Self::Ref(t, false) => write!(f, "&{t}"),
      Self::Ref(t, true) => write!(f, "~&{t}"),
      Self::Opt(t) => write!(f, "?{t}"),
      Self::Function(r, args) => write!(f, "({}) -> {r}", args.iter().join(", ")),
      Self::VarArgs => write!(f, "..."),
      Self::Trait(n) => write!(f, "trait {n}"),
      Self::Template(n) => write!(f, "{n}"),
      Self::Concrete(n, args) => write!(f, "{n}[{}]", args.iter().join(", ")),
      Self::Tuple(params) => write!(f, "({})", params.iter().join(", ")),
      Self::Stub(n) => write!(f, "'{n}"),
    }
  }
}
