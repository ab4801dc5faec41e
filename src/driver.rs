//! Pipeline orchestration: wires the lexer, parser, module assembler, and
//! every analysis/codegen pass together into the `tokens`/`parse`/`show`/
//! `generate`/`compile` CLI contract.
//!
//! Grounded on `original_source/runac/__main__.py`'s command dispatch (read
//! a source file, run a fixed sequence of named passes, print or write the
//! result) and on the staged `compile_file` shape in
//! `other_examples/.../llts_driver/pipeline/compile.rs`, adapted to return
//! a [`CompileError`] at the first failing stage instead of panicking.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use log::{debug, info};
use typed_arena::Arena;
use crate::ast::{Arg, File, Stmt, Suite};
use crate::cfg::{self, FlowFinder};
use crate::diagnostics::CompileError;
use crate::escape;
use crate::lexer;
use crate::liveness;
use crate::llir::Program;
use crate::module::{CodeKey, Module, NameEntry};
use crate::parser;
use crate::specialize;
use crate::symbol::Symbol;
use crate::typeck::{self, Signature};
use crate::types::{Registry, Type};

/// Knobs controlling one compilation run, in place of `__main__.py`'s
/// `optparse` flags.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
  /// Directory the core library's `.rns` sources live in; `None` skips
  /// loading the core library (used by the unit/integration tests, which
  /// exercise the pipeline on free-standing snippets).
  pub core_library: Option<PathBuf>,
  /// Whether to emit a full Rust backtrace on an internal panic, mirroring
  /// `__main__.py`'s `--traceback` flag. Only affects panic hook wiring at
  /// the binary entry point, not anything in this module.
  pub traceback: bool,
}

impl Default for CompilerOptions {
  fn default() -> Self { Self { core_library: None, traceback: false } }
}

fn line_of(src: &str) -> impl Fn(u32) -> Rc<str> + '_ {
  let lines: Vec<&str> = src.lines().collect();
  move |n: u32| Rc::from(*lines.get(n as usize).unwrap_or(&""))
}

/// Whether `suite` contains a `yield` anywhere in its own body (not inside a
/// nested `def`, which `ast.py`'s grammar doesn't allow anyway — every
/// `Suite` here belongs to one function).
fn contains_yield(suite: &Suite) -> bool { suite.stmts.iter().any(stmt_has_yield) }

fn stmt_has_yield(s: &Stmt) -> bool {
  match s {
    Stmt::Yield(..) => true,
    Stmt::If(_, blocks) => blocks.iter().any(|(_, suite)| contains_yield(suite)),
    Stmt::While(_, _, suite) | Stmt::For(_, _, _, suite) => contains_yield(suite),
    Stmt::TryBlock(_, suite, catches) =>
      contains_yield(suite) || catches.iter().any(|c| contains_yield(&c.suite)),
    _ => false,
  }
}

/// Lex `src`, returning one line per token in the `tokens` CLI command's format.
pub fn tokens(file: &str, src: &str) -> Result<Vec<String>, CompileError> {
  let toks = lexer::lex(file.to_owned(), src)?;
  Ok(toks.iter().map(|t| format!("{}: {:?}", t.kind.class_name(), t.kind.literal())).collect())
}

/// Lex and parse `src`, returning the resulting [`File`].
pub fn parse(file: &str, src: &str) -> Result<File, CompileError> {
  let toks = lexer::lex(file.to_owned(), src)?;
  Ok(parser::parse(file.to_owned(), src, &toks)?)
}

fn arg_type<'ty>(registry: &mut Registry<'ty>, self_ty: Option<&'ty Type<'ty>>, arg: &Arg, index: usize) -> &'ty Type<'ty> {
  if index == 0 && arg.ty.is_none() {
    if let Some(t) = self_ty { return t; }
  }
  arg.ty.as_ref()
    .and_then(|t| typeck::resolve_type_expr(registry, t))
    .unwrap_or_else(|| registry.void())
}

fn signature_of<'ty>(
  registry: &mut Registry<'ty>, self_ty: Option<&'ty Type<'ty>>, args: &[Arg], rtype: Option<&crate::ast::Expr>,
) -> Signature<'ty> {
  let params = args.iter().enumerate()
    .map(|(i, a)| (a.name, arg_type(registry, self_ty, a, i)))
    .collect();
  let ret = rtype.and_then(|t| typeck::resolve_type_expr(registry, t)).unwrap_or_else(|| registry.void());
  Signature { params, ret }
}

/// A method's link name, mangled with its formal parameter types (the
/// receiver included) so that overloads never collide and clobber one
/// another's vtable slot — `"{class}.{method}"` alone is not unique.
fn mangled_link_name(class: Symbol, method: Symbol, sig: &Signature<'_>) -> String {
  let formals: String = sig.params.iter().map(|(_, t)| t.mangle()).collect();
  format!("{class}.{method}.{formals}")
}

/// Build the `(trait name, [(method name, signature)])` table
/// [`crate::llir::Program::declare_traits`] needs, by scanning `module`'s
/// registered [`NameEntry::Trait`] entries (never themselves folded into
/// `registry.infos`, since traits have no fields of their own).
fn trait_signatures<'ty>(registry: &mut Registry<'ty>, module: &Module) -> Vec<(Symbol, Vec<(Symbol, Signature<'ty>)>)> {
  let mut traits = Vec::new();
  for entry in module.names.values() {
    let NameEntry::Trait(t) = entry else { continue };
    let self_ty = { let tpl = registry.template(t.name); Some(registry.ref_(tpl, false)) };
    let mut methods: Vec<(Symbol, Signature<'ty>)> = t.methods.iter()
      .map(|d| (d.name, signature_of(registry, self_ty, &d.args, d.rtype.as_ref())))
      .collect();
    methods.sort_by_key(|(name, _)| name.to_string());
    traits.push((t.name, methods));
  }
  traits
}

/// Register every class's fields and every function/method's signature
/// into `registry`, ahead of type-checking any function body (every
/// function may call any other, in any declaration order).
fn register_module<'ty>(registry: &mut Registry<'ty>, module: &Module) -> hashbrown::HashMap<CodeKey, Signature<'ty>> {
  for entry in module.names.values() {
    if let NameEntry::Class(c) = entry {
      let attribs = c.attribs.iter()
        .map(|(ty, name)| (*name, typeck::resolve_type_expr(registry, ty).unwrap_or_else(|| registry.void())))
        .collect();
      registry.infos.entry(c.name).or_default().attribs = attribs;
      registry.infos.entry(c.name).or_default().params = c.params.clone();
    }
  }

  let mut sigs = hashbrown::HashMap::new();
  for (key, f) in &module.code {
    let self_ty = match key {
      CodeKey::Method(class, _) => { let t = registry.template(*class); Some(registry.ref_(t, false)) }
      CodeKey::Free(_) => None,
    };
    let sig = signature_of(registry, self_ty, &f.args, f.rtype.as_ref());
    if let CodeKey::Method(class, method) = key {
      let ty = registry.function(sig.ret, sig.params.iter().map(|(_, t)| *t).collect());
      let link_name = mangled_link_name(*class, *method, &sig);
      let decl = crate::types::FunctionDecl { name: *method, link_name, ty };
      registry.infos.entry(*class).or_default().methods.entry(*method).or_default().push(decl);
    }
    sigs.insert(*key, sig);
  }
  sigs
}

/// Compile `src` (the main source file, already read) through every pass,
/// producing the final textual IR for every function in the module.
pub fn compile(file: &str, src: &str, opts: &CompilerOptions) -> Result<String, CompileError> {
  let ast = parse(file, src)?;
  let mut module = Module::build(&ast);

  let mut core_sources = Vec::new();
  if let Some(dir) = &opts.core_library {
    if let Ok(entries) = fs::read_dir(dir) {
      for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "rns") {
          core_sources.push(path);
        }
      }
    }
  }
  for path in &core_sources {
    debug!("loading core library file {}", path.display());
    let text = fs::read_to_string(path)?;
    let name = path.display().to_string();
    let core_ast = parse(&name, &text)?;
    module.merge(Module::build(&core_ast));
  }

  let arena: Arena<Type<'_>> = Arena::new();
  let mut registry = Registry::new(&arena);
  let sigs = register_module(&mut registry, &module);
  let traits = trait_signatures(&mut registry, &module);

  let generators: hashbrown::HashSet<Symbol> = module.code.iter()
    .filter_map(|(key, f)| match key {
      CodeKey::Free(n) if contains_yield(&f.suite) => Some(*n),
      _ => None,
    })
    .collect();

  let rc_file: Rc<str> = Rc::from(file);
  let line_fn = line_of(src);

  let mut program = Program::new();
  program.declare_types(&registry);
  program.declare_traits(&traits);

  for (key, function) in &module.code {
    info!("compiling {key}");
    let sig = sigs.get(key).expect("signature computed for every function in register_module");

    let mut flow = FlowFinder::new().build(&function.suite);
    cfg::finish(&mut flow);
    liveness::analyze(&mut flow);

    let mut anno = typeck::check(&mut registry, sig, &flow, rc_file.clone(), &line_fn)?;
    specialize::propagate(&mut anno, &flow);
    let escapes = escape::find(&anno, &mut flow);

    let is_main = matches!(key, CodeKey::Free(n) if n.as_str() == "main");
    let has_args = is_main && !function.args.is_empty();
    crate::destruct::destructify(&anno, &mut flow, has_args);

    let link_name = link_name_of(*key, sig);
    program.function(&link_name, sig.ret, &sig.params, &flow, &anno, &escapes, &registry, &generators, has_args);
  }

  Ok(program.finish())
}

fn link_name_of(key: CodeKey, sig: &Signature<'_>) -> String {
  match key {
    CodeKey::Free(n) if n.as_str() == "main" => "main".to_owned(),
    CodeKey::Free(n) => n.to_string(),
    CodeKey::Method(c, m) => mangled_link_name(c, m, sig),
  }
}

/// Look up a core library directory relative to `main_file`, used as the
/// default when `--core` is not given on the command line: a sibling
/// `corelib/` directory, matching where `__main__.py` looks relative to
/// its own package.
#[must_use] pub fn default_core_library(main_file: &Path) -> Option<PathBuf> {
  let dir = main_file.parent()?.join("corelib");
  dir.is_dir().then_some(dir)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn compiles_hello_world() {
    let src = "def main() -> int:\n\tprint('hello')\n\treturn 0\n";
    let opts = CompilerOptions::default();
    let ir = compile("hello.rns", src, &opts).expect("should compile");
    assert!(ir.contains("define i64 @main"));
    assert!(ir.contains("ret"));
  }

  #[test]
  fn compiles_int_arithmetic() {
    let src = "def main() -> int:\n\tx = 1 + 2\n\treturn x\n";
    let ir = compile("arith.rns", src, &CompilerOptions::default()).expect("should compile");
    assert!(ir.contains("add"));
  }

  #[test]
  fn for_range_lowers_to_loop_header() {
    let src = "def main() -> int:\n\tfor i in range(0, 10):\n\t\tpass\n\treturn 0\n";
    let ir = compile("forloop.rns", src, &CompilerOptions::default()).expect("should compile");
    assert!(ir.contains("nextval"));
  }

  #[test]
  fn reassignment_with_different_type_is_rejected() {
    let src = "def main() -> int:\n\tx = 1\n\tx = 1.5\n\treturn 0\n";
    let err = compile("badreassign.rns", src, &CompilerOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Semantic(_)));
  }
}
