//! The abstract syntax tree produced by the parser.
//!
//! Grounded on `original_source/runac/ast.py`'s node hierarchy, translated
//! from a class-per-node-kind `Registry` into tagged unions as directed by
//! the design notes: visitor dispatch becomes pattern matching, and later
//! passes attach `type`/`escapes` annotations through a side table keyed by
//! [`NodeId`] rather than mutating the node itself.

use smallvec::SmallVec;
use crate::diagnostics::Span;
use crate::idx::NodeId;
use crate::symbol::Symbol;

/// A node identifier paired with its span; every expression and statement
/// carries one so later passes can look up its type/escape annotation.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
  /// Side-table key.
  pub id: NodeId,
  /// Source span.
  pub span: Span,
}

/// An expression form. Mirrors `ast.py`'s terminal/binary-op/ternary node
/// classes; `Owner`/`Ref`/`Opt`/`Mut` are the type-form prefixes (`$`, `&`,
/// `?`, `~`) used both as expressions (in `as`-casts) and inside type syntax.
#[derive(Debug, Clone)]
pub enum Expr {
  /// Literal `None`.
  None(Tag),
  /// Literal `True`/`False`.
  Bool(Tag, bool),
  /// An integer literal, as written (sign folded in by the lexer for
  /// negative literals where unambiguous).
  Int(Tag, String),
  /// A floating point literal.
  Float(Tag, String),
  /// A string literal, contents only (quotes already stripped).
  String(Tag, String),
  /// A bare identifier reference.
  Name(Tag, Symbol),
  /// `obj.attrib`.
  Attrib(Tag, Box<Expr>, Symbol),
  /// `obj[key]`.
  Elem(Tag, Box<Expr>, Box<Expr>),
  /// `(a, b, c)`.
  Tuple(Tag, Vec<Expr>),
  /// `callee(args...)`.
  Call(Tag, Box<Expr>, Vec<Expr>),
  /// `name=value` inside a call's argument list.
  NamedArg(Tag, Symbol, Box<Expr>),
  /// A binary operator application.
  Binary(Tag, BinOp, Box<Expr>, Box<Expr>),
  /// `not value`.
  Not(Tag, Box<Expr>),
  /// `left as T`.
  As(Tag, Box<Expr>, Box<Expr>),
  /// `left if cond else right`.
  Ternary(Tag, Box<Expr>, Box<Expr>, Box<Expr>),
  /// `$T` — owner-wrapped type form.
  Owner(Tag, Box<Expr>),
  /// `&T` — reference type form.
  Ref(Tag, Box<Expr>),
  /// `?T` — optional-wrapped type form.
  Opt(Tag, Box<Expr>),
  /// `~T` — mutable-reference type form.
  Mut(Tag, Box<Expr>),
}

impl Expr {
  /// The tag (id + span) every variant carries.
  #[must_use] pub fn tag(&self) -> Tag {
    match self {
      Self::None(t) | Self::Bool(t, _) | Self::Int(t, _) | Self::Float(t, _) | Self::String(t, _)
      | Self::Name(t, _) | Self::Attrib(t, ..) | Self::Elem(t, ..) | Self::Tuple(t, _)
      | Self::Call(t, ..) | Self::NamedArg(t, ..) | Self::Binary(t, ..) | Self::Not(t, _)
      | Self::As(t, ..) | Self::Ternary(t, ..) | Self::Owner(t, _) | Self::Ref(t, _)
      | Self::Opt(t, _) | Self::Mut(t, _) => *t,
    }
  }

  /// Whether this is one of the atomic forms that [`crate::flow::FlowFinder`]
  /// leaves in place rather than hoisting into a `$k` temporary: `None`,
  /// `Bool`, `Int`, `Float`, `Name`. Mirrors `blocks.py`'s `ATOMIC` tuple
  /// (which also includes `String`, carried here as non-atomic since our
  /// escape analysis needs a real assignment site to attach its decision to).
  #[must_use] pub fn is_atomic(&self) -> bool {
    matches!(self, Self::None(_) | Self::Bool(..) | Self::Int(..) | Self::Float(..) | Self::Name(..))
  }
}

/// The binary operators, collapsing `ast.py`'s `Add`/`Sub`/.../`LT`/`GT`/...
/// classes into one tagged variant instead of one struct per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
  Add, Sub, Mul, Div, Mod,
  BitAnd, BitOr, BitXor,
  And, Or,
  Eq, NotEq, Lt, Gt, Is,
}

/// A formal argument in a function/method signature.
#[derive(Debug, Clone)]
pub struct Arg {
  /// Parameter name.
  pub name: Symbol,
  /// Declared type expression (a type-form `Expr`), absent only for the
  /// implicit `self` on a method before the typer fills it in.
  pub ty: Option<Expr>,
  /// Source span of the argument.
  pub span: Span,
}

/// A single indented block of statements.
#[derive(Debug, Clone, Default)]
pub struct Suite {
  /// Statements in source order.
  pub stmts: Vec<Stmt>,
}

/// An `except` clause inside a `try` block.
#[derive(Debug, Clone)]
pub struct Catch {
  /// The exception type name being caught.
  pub ty: Symbol,
  /// The handler body.
  pub suite: Suite,
}

/// A statement form. Mirrors `ast.py`'s statement-level classes.
#[derive(Debug, Clone)]
pub enum Stmt {
  /// A bare expression used for its side effect, typically a `Call`.
  /// `ast.py` has no distinct node for this — a statement-level expression
  /// is simply whatever `Pratt.expr()` returns, pushed as-is into the
  /// enclosing suite; we give it an explicit wrapper since `Stmt` and
  /// `Expr` are separate Rust types.
  ExprStmt(Tag, Box<Expr>),
  /// `left = right`.
  Assign(Tag, Box<Expr>, Box<Expr>),
  /// `left += right` (`IAdd` in the source grammar).
  IAdd(Tag, Box<Expr>, Box<Expr>),
  /// `return value?`.
  Return(Tag, Option<Expr>),
  /// `yield value`.
  Yield(Tag, Box<Expr>),
  /// `raise value`.
  Raise(Tag, Box<Expr>),
  /// `pass`.
  Pass(Tag),
  /// `break`.
  Break(Tag),
  /// `continue`.
  Continue(Tag),
  /// `if cond: suite (elif cond: suite)* (else: suite)?`, represented as an
  /// ordered list of `(cond, suite)` with a final `None` condition for the
  /// trailing `else`, matching `ast.py`'s `If.blocks`.
  If(Tag, Vec<(Option<Expr>, Suite)>),
  /// `while cond: suite`.
  While(Tag, Box<Expr>, Suite),
  /// `for lvar in source: suite`.
  For(Tag, Symbol, Box<Expr>, Suite),
  /// `try: suite except T: suite ...`.
  TryBlock(Tag, Suite, Vec<Catch>),
  /// `import name`.
  Import(Tag, Symbol),
  /// `from base import names...`.
  RelImport(Tag, Box<Expr>, Vec<Symbol>),
}

impl Stmt {
  /// The tag every statement variant carries.
  #[must_use] pub fn tag(&self) -> Tag {
    match self {
      Self::ExprStmt(t, _) | Self::Assign(t, ..) | Self::IAdd(t, ..) | Self::Return(t, _) | Self::Yield(t, _)
      | Self::Raise(t, _) | Self::Pass(t) | Self::Break(t) | Self::Continue(t) | Self::If(t, _)
      | Self::While(t, ..) | Self::For(t, ..) | Self::TryBlock(t, ..) | Self::Import(t, _)
      | Self::RelImport(t, ..) => *t,
    }
  }
}

/// Decorator names accumulated onto the next `def`/`class`/`trait`, e.g.
/// `@intrinsic`. Small and rarely more than one or two, hence `SmallVec`.
pub type Decor = SmallVec<[Symbol; 2]>;

/// A function or method definition, or (if `suite` is empty and the source
/// had no `:`) an external declaration.
#[derive(Debug, Clone)]
pub struct Function {
  /// Decorators applied via `@name` lines.
  pub decor: Decor,
  /// Function name.
  pub name: Symbol,
  /// Formal arguments, `self` included explicitly for methods.
  pub args: Vec<Arg>,
  /// Declared return type, `None` meaning `Void`.
  pub rtype: Option<Expr>,
  /// Body.
  pub suite: Suite,
  /// Source span of the whole definition.
  pub span: Span,
}

/// `def name(args) -> rtype` with no body: an external declaration.
#[derive(Debug, Clone)]
pub struct Decl {
  /// Declared name.
  pub name: Symbol,
  /// Formal arguments.
  pub args: Vec<Arg>,
  /// Declared return type.
  pub rtype: Option<Expr>,
  /// Source span.
  pub span: Span,
}

/// A `class name[params]: attribs methods` definition.
#[derive(Debug, Clone)]
pub struct Class {
  /// Class name.
  pub name: Symbol,
  /// Template parameters, empty for non-generic classes.
  pub params: Vec<Symbol>,
  /// `(type, name)` attribute declarations in declared order.
  pub attribs: Vec<(Expr, Symbol)>,
  /// Method definitions.
  pub methods: Vec<Function>,
  /// Source span.
  pub span: Span,
}

/// A `trait name[params]: methods` definition.
#[derive(Debug, Clone)]
pub struct Trait {
  /// Trait name.
  pub name: Symbol,
  /// Template parameters.
  pub params: Vec<Symbol>,
  /// Method signatures the trait requires.
  pub methods: Vec<Decl>,
  /// Source span.
  pub span: Span,
}

/// A single top-level declaration.
#[derive(Debug, Clone)]
pub enum TopLevel {
  /// `def ...`.
  Function(Function),
  /// `def ...` with no body.
  Decl(Decl),
  /// `class ...`.
  Class(Class),
  /// `trait ...`.
  Trait(Trait),
  /// A top-level `name = value` binding (treated as a named constant).
  Assign(Tag, Symbol, Expr),
  /// `import name` / `from base import names` at the top level.
  Import(Stmt),
}

/// The full parse of one source file: an ordered list of top-level items.
#[derive(Debug, Clone, Default)]
pub struct File {
  /// Top-level declarations in source order.
  pub items: Vec<TopLevel>,
}

/// Allocates fresh [`NodeId`]s while parsing a single file.
#[derive(Default)]
pub struct NodeIdGen(u32);

impl NodeIdGen {
  /// A fresh generator starting at zero.
  #[must_use] pub fn new() -> Self { Self::default() }

  /// Allocate the next id.
  pub fn next(&mut self) -> NodeId {
    let id = NodeId::from_u32(self.0);
    self.0 += 1;
    id
  }
}
