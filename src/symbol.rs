//! Global string interning and the keyword/operator tables the lexer and
//! parser consult, in the style of mmcc's `make_prims!`-generated primitive
//! enums (see `types/entity.rs` in the reference material kept under
//! `src/_teacher_ref/`), adapted to a self-contained interner since this
//! crate has no sibling `Compiler`/`intern` infrastructure to reuse.

use std::sync::{LazyLock, Mutex};
use hashbrown::HashMap;

/// An interned identifier or string literal. Cheap to copy and compare.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl std::fmt::Debug for Symbol {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}", self.as_str())
  }
}

impl std::fmt::Display for Symbol {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

struct Interner {
  map: HashMap<&'static str, Symbol>,
  strings: Vec<&'static str>,
}

impl Interner {
  fn new() -> Self { Self { map: HashMap::new(), strings: Vec::new() } }

  fn intern(&mut self, s: &str) -> Symbol {
    if let Some(&sym) = self.map.get(s) { return sym; }
    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    let sym = Symbol(u32::try_from(self.strings.len()).expect("symbol table overflow"));
    self.strings.push(leaked);
    self.map.insert(leaked, sym);
    sym
  }
}

static INTERNER: LazyLock<Mutex<Interner>> = LazyLock::new(|| Mutex::new(Interner::new()));

/// Intern a string, returning a stable [`Symbol`] for it.
pub fn intern(s: &str) -> Symbol { INTERNER.lock().unwrap().intern(s) }

impl Symbol {
  /// The interned string this symbol denotes. Valid for the process lifetime.
  #[must_use] pub fn as_str(self) -> &'static str {
    INTERNER.lock().unwrap().strings[self.0 as usize]
  }
}

/// Declares a fieldless enum whose variants correspond 1-1 with fixed source
/// spellings, with `from_str`/`as_str` lookup tables built once.
macro_rules! make_table {
  {$(#[$attr0:meta])* enum $name:ident { $($(#[$attr:meta])* $x:ident: $e:expr,)* }} => {
    $(#[$attr0])*
    #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
    pub enum $name { $($(#[$attr])* $x),* }

    impl $name {
      /// Convert a source spelling into this type, if recognized.
      #[must_use] pub fn from_str(s: &str) -> Option<Self> {
        match s { $($e => Some(Self::$x),)* _ => None }
      }
      /// The canonical source spelling for this variant.
      #[must_use] pub fn as_str(self) -> &'static str {
        match self { $(Self::$x => $e,)* }
      }
    }
  };
}

make_table! {
  /// Reserved words; an identifier lexing to one of these spellings is
  /// retagged from `Name` to `Keyword` by the lexer.
  enum Keyword {
    And: "and", As: "as", Break: "break", Class: "class", Continue: "continue",
    Def: "def", Elif: "elif", Else: "else", Except: "except", For: "for",
    From: "from", If: "if", Import: "import", In: "in", Is: "is", Not: "not",
    Or: "or", Pass: "pass", Raise: "raise", Return: "return", Trait: "trait",
    Try: "try", While: "while", Yield: "yield",
  }
}

make_table! {
  /// Fixed-spelling operator and punctuation tokens, longest-match-first
  /// order is enforced by the lexer's matcher list, not by this table.
  enum Operator {
    Arrow: "->", PlusEq: "+=", EqEq: "==", NotEq: "!=", Ge: ">=", Le: "<=",
    LBracket: "[", RBracket: "]", Plus: "+", Minus: "-", Star: "*", Slash: "/",
    LBrace: "{", RBrace: "}", Lt: "<", Gt: ">", Dot: ".", Amp: "&", Dollar: "$",
    Pipe: "|", Caret: "^", Tilde: "~", Percent: "%", LParen: "(", RParen: ")",
    Eq: "=", Comma: ",", Colon: ":", Question: "?",
  }
}
