//! Error types and source-position tracking for every compiler stage.
//!
//! Mirrors the `file [L.C]: message` plus caret-pointed source line
//! rendering used throughout the pipeline's CLI contract.

use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A single point in the source file, 0-indexed internally but rendered
/// 1-indexed to match the caret-column convention of the CLI contract.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Point {
  /// Zero-based line number.
  pub line: u32,
  /// Zero-based column number.
  pub col: u32,
}

impl Point {
  /// Construct a point from zero-based coordinates.
  #[must_use] pub const fn new(line: u32, col: u32) -> Self { Self { line, col } }
}

/// A start/end span within a single line. Cheap, `Copy`, carried on every
/// token and AST node; promoted to a full [`Position`] only when an error
/// actually needs to render (at which point the file name and source line
/// are attached).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Span {
  /// Inclusive start point.
  pub start: Point,
  /// Exclusive end point.
  pub end: Point,
}

impl Span {
  /// A span covering a single point.
  #[must_use] pub const fn point(at: Point) -> Self { Self { start: at, end: at } }
}

/// A span plus enough context (file name, full source line of `start`) to
/// render a caret diagnostic without re-reading the file. File name and
/// line text are `Rc<str>` since many positions within one file share them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Position {
  /// Source file name as given on the command line.
  pub file: Rc<str>,
  /// Inclusive start point.
  pub start: Point,
  /// Exclusive end point.
  pub end: Point,
  /// The full text of the line containing `start`, without its trailing newline.
  pub line_text: Rc<str>,
}

impl Position {
  /// Build a position spanning a single point.
  #[must_use] pub fn point(file: Rc<str>, at: Point, line_text: Rc<str>) -> Self {
    Self { file, start: at, end: at, line_text }
  }

  /// Attach file name and source line context to a bare [`Span`].
  #[must_use] pub fn from_span(file: Rc<str>, span: Span, line_text: Rc<str>) -> Self {
    Self { file, start: span.start, end: span.end, line_text }
  }

  fn render_caret(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.line_text)?;
    let mut caret = String::new();
    for _ in 0 .. self.start.col { caret.push(' '); }
    caret.push('^');
    write!(f, "{caret}")
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} [{}.{}]", self.file, self.start.line + 1, self.start.col + 1)
  }
}

/// A lexer or parser failure: some token did not fit any production.
#[derive(Error, Debug)]
#[error("{pos}: unexpected token {kind} ({literal:?})\n{}", render(pos))]
pub struct ParseError {
  /// Where the offending token began.
  pub pos: Position,
  /// The token's class name, e.g. `"Name"` or `"Colon"`.
  pub kind: String,
  /// The token's literal text.
  pub literal: String,
}

fn render(pos: &Position) -> String {
  struct W<'a>(&'a Position);
  impl fmt::Display for W<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.render_caret(f) }
  }
  W(pos).to_string()
}

impl ParseError {
  /// Construct from a position and the offending token's description.
  pub fn new(pos: Position, kind: impl Into<String>, literal: impl Into<String>) -> Self {
    Self { pos, kind: kind.into(), literal: literal.into() }
  }
}

/// The distinguishable subkinds of a type/overload/escape failure. Carried
/// as data (not just a formatted string) so callers embedding the compiler
/// as a library can match on the failure without scraping text.
#[derive(Debug, Clone)]
pub enum SemanticKind {
  /// Use of a name with no reaching definition.
  UndefinedName(String),
  /// A name was assigned a second, incompatibly-typed value in the same scope.
  Reassignment(String),
  /// Two branches of a `Phi`, an assignment, a return, a yield, or a
  /// comparison produced incompatible types.
  TypeMismatch { context: &'static str, expected: String, found: String },
  /// No overload candidate scored above zero; every attempted signature is listed.
  NoMatchingOverload { name: String, tried: Vec<String> },
  /// An `Opt`-wrapped value was used where its unwrapped form was required.
  OptionalRequired(String),
  /// `self` was missing, or had the wrong type, on a method definition.
  BadSelf(String),
  /// `main`'s argument list or return type did not match the accepted forms.
  BadMain(String),
  /// `__init__`/`__del__` declared a non-`Void` return type.
  NonVoidLifecycleMethod(String),
  /// In-place add (`+=`/`IAdd`) on an owned value, which has no defined semantics.
  InPlaceAddOnOwner(String),
}

impl fmt::Display for SemanticKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::UndefinedName(n) => write!(f, "undefined name '{n}'"),
      Self::Reassignment(n) => write!(f, "reassignment of '{n}' with a different type"),
      Self::TypeMismatch { context, expected, found } =>
        write!(f, "{context}: expected {expected}, found {found}"),
      Self::NoMatchingOverload { name, tried } => {
        writeln!(f, "no matching method found for '{name}'")?;
        for (i, sig) in tried.iter().enumerate() {
          if i > 0 { writeln!(f)?; }
          write!(f, "  tried: {sig}")?;
        }
        Ok(())
      }
      Self::OptionalRequired(n) => write!(f, "'{n}' is optional where a value is required"),
      Self::BadSelf(m) => write!(f, "bad 'self' argument on '{m}'"),
      Self::BadMain(m) => write!(f, "invalid 'main' signature: {m}"),
      Self::NonVoidLifecycleMethod(m) => write!(f, "'{m}' must return Void"),
      Self::InPlaceAddOnOwner(n) => write!(f, "in-place add on owned value '{n}' is not supported"),
    }
  }
}

/// A semantic (type-checking / overload-resolution / escape-analysis) error.
#[derive(Error, Debug)]
#[error("{pos}: {kind}\n{}", render(pos))]
pub struct SemanticError {
  /// Where the offending construct appears.
  pub pos: Position,
  /// What went wrong.
  pub kind: SemanticKind,
}

impl SemanticError {
  /// Construct from a position and kind.
  #[must_use] pub fn new(pos: Position, kind: SemanticKind) -> Self { Self { pos, kind } }
}

/// Top-level error type returned by the driver, unifying every stage's
/// failure mode behind a single `Result`.
#[derive(Error, Debug)]
pub enum CompileError {
  /// Failure reading the main source file or a core library file.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  /// Lexer/parser failure.
  #[error(transparent)]
  Parse(#[from] ParseError),
  /// Type-checking / overload-resolution / escape-analysis failure.
  #[error(transparent)]
  Semantic(#[from] SemanticError),
}

impl CompileError {
  /// Render exactly as the CLI contract specifies: `file [L.C]: message`
  /// followed by the source line and a caret.
  #[must_use] pub fn render(&self) -> String { self.to_string() }
}
