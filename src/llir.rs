//! Textual SSA IR emission.
//!
//! Grounded on `original_source/lang/codegen.py`'s naming conventions
//! (`%N` SSA registers, `@name` globals, `LN` block labels) and its
//! `TRIPLES`-keyed target triple plus `Init`'s alloca/malloc split,
//! generalized from its `Frame`/`Constants`/per-node-class emitter methods
//! into a [`Program`] that declares every module-level type once and then
//! walks each function's already-destructed [`FlowGraph`], writing one IR
//! line per [`Step`]. Mirrors mmcc's `codegen.rs` in shape: plain `String`
//! buffers every instruction writer appends to, rather than an in-memory
//! instruction tree.
//!
//! The runtime support library (`malloc`/`free`/`raise`/the personality
//! routine/`args`) is not carried anywhere in this workspace as a `.ll`
//! source to concatenate against, unlike `codegen.py`'s `corelib.ll` read;
//! [`RUNTIME_DECLS`] stands in as a fixed set of `declare`s against a
//! runtime assumed to be linked in separately.

use std::fmt::Write as _;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use crate::ast::{BinOp, Expr};
use crate::cfg::{Block, FlowGraph, Step};
use crate::escape::EscapeInfo;
use crate::idx::{BlockId, NodeId};
use crate::symbol::Symbol;
use crate::typeck::Annotations;
use crate::types::{Registry, Type};

/// Fixed runtime entry points every emitted module calls into: heap
/// allocation, the unwinder's personality routine and type-id lookup, a
/// memcpy for escaping string literals, and the `argc`/`argv` reader `main`
/// uses to build its `args` array.
const RUNTIME_DECLS: &str = "\
declare i8* @runa.malloc(i64)
declare void @runa.free(i8*)
declare void @runa.raise(i8*)
declare i8* @runa.args(i64, i8**)
declare i32 @runa.personality(...)
declare i32 @llvm.eh.typeid.for(i8*)
declare void @llvm.memcpy.p0i8.p0i8.i64(i8*, i8*, i64, i1)
";

/// The host triple to emit, chosen by arch/OS the way `codegen.py` indexes
/// its `TRIPLES` dict by `sys.platform`.
fn target_triple() -> &'static str {
  match (std::env::consts::ARCH, std::env::consts::OS) {
    ("x86_64", "linux") => "x86_64-unknown-linux-gnu",
    ("aarch64", "linux") => "aarch64-unknown-linux-gnu",
    ("x86_64", "macos") => "x86_64-apple-darwin",
    ("aarch64", "macos") => "aarch64-apple-darwin",
    ("x86_64", "windows") => "x86_64-pc-windows-msvc",
    _ => "x86_64-unknown-linux-gnu",
  }
}

/// Lower a type to its LLIR spelling: scalars to plain integer/float
/// mnemonics, every wrapper (`Owner`/`Ref`/`Opt`) to a pointer to its inner
/// type's rendering (not doubly-pointered when the inner type is already an
/// aggregate pointer), and a `Trait` to its erased `%T.wrap*` carrier.
fn ir_type(ty: &Type<'_>) -> String {
  match ty {
    Type::Void => "void".into(),
    Type::Bool => "i1".into(),
    Type::Byte => "i8".into(),
    Type::IntN(n) | Type::UintN(n) => format!("i{n}"),
    Type::Float | Type::AnyFloat => "double".into(),
    Type::AnyInt => "i64".into(),
    Type::Module(_) => "i8*".into(),
    Type::Owner(t) | Type::Ref(t, _) | Type::Opt(t) => pointer_to(t),
    Type::Concrete(n, _) | Type::Template(n) | Type::Stub(n) => format!("%{n}*"),
    Type::Trait(n) => format!("%{n}.wrap*"),
    Type::Function(r, args) => format!("{} ({})*", ir_type(r), args.iter().map(|a| ir_type(a)).join(", ")),
    Type::VarArgs => "...".into(),
    Type::Tuple(params) => format!("{{ {} }}", params.iter().map(|p| ir_type(p)).join(", ")),
  }
}

/// A pointer to `inner`'s rendering, without double-pointering a type whose
/// own rendering is already a pointer (every aggregate: classes, traits,
/// templates).
fn pointer_to(inner: &Type<'_>) -> String {
  let t = ir_type(inner);
  if t.ends_with('*') { t } else { format!("{t}*") }
}

/// The LLVM mnemonic for a binary operator, dispatching on whether its
/// operands are floating point.
fn binop_mnemonic(op: BinOp, operand_ty: &str) -> String {
  let f = operand_ty == "double";
  match op {
    BinOp::Add => if f { "fadd" } else { "add" }.to_owned(),
    BinOp::Sub => if f { "fsub" } else { "sub" }.to_owned(),
    BinOp::Mul => if f { "fmul" } else { "mul" }.to_owned(),
    BinOp::Div => if f { "fdiv" } else { "sdiv" }.to_owned(),
    BinOp::Mod => if f { "frem" } else { "srem" }.to_owned(),
    BinOp::BitAnd => "and".to_owned(),
    BinOp::BitOr => "or".to_owned(),
    BinOp::BitXor => "xor".to_owned(),
    BinOp::And => "and".to_owned(),
    BinOp::Or => "or".to_owned(),
    BinOp::Eq => if f { "fcmp oeq" } else { "icmp eq" }.to_owned(),
    BinOp::NotEq => if f { "fcmp one" } else { "icmp ne" }.to_owned(),
    BinOp::Lt => if f { "fcmp olt" } else { "icmp slt" }.to_owned(),
    BinOp::Gt => if f { "fcmp ogt" } else { "icmp sgt" }.to_owned(),
    BinOp::Is => "icmp eq".to_owned(),
  }
}

/// Render a string literal's bytes as an LLVM textual constant body,
/// hex-escaping anything outside printable ASCII minus `"`/`\`.
fn escape_bytes(s: &str) -> String {
  let mut out = String::new();
  for b in s.bytes() {
    if (0x20..=0x7e).contains(&b) && b != b'"' && b != b'\\' {
      out.push(b as char);
    } else {
      write!(out, "\\{b:02X}").unwrap();
    }
  }
  out
}

/// Deduplicated pool of string-literal globals, keyed by their text.
#[derive(Default)]
struct Constants {
  seen: HashMap<String, usize>,
  decls: Vec<String>,
}

impl Constants {
  /// Intern `text`, returning its global name and byte length.
  fn intern(&mut self, text: &str) -> (String, usize) {
    if let Some(&i) = self.seen.get(text) {
      return (format!("@str.{i}"), text.len());
    }
    let i = self.decls.len();
    let len = text.len();
    self.decls.push(format!(
      "@str.{i} = constant [{len} x i8] c\"{}\"\n@str.{i}.size = constant i64 {len}",
      escape_bytes(text),
    ));
    self.seen.insert(text.to_owned(), i);
    (format!("@str.{i}"), len)
  }
}

/// A whole module's emitted IR: global type/trait declarations, the string
/// constant pool, and every function's body, assembled in [`Program::finish`].
pub struct Program {
  types: String,
  gen_types: String,
  constants: Constants,
  functions: String,
  typeinfos: HashSet<Symbol>,
  trait_slots: HashMap<Symbol, Vec<(Symbol, String)>>,
}

impl Default for Program {
  fn default() -> Self { Self::new() }
}

impl Program {
  /// A fresh, empty module.
  #[must_use] pub fn new() -> Self {
    Self {
      types: String::new(), gen_types: String::new(), constants: Constants::default(),
      functions: String::new(), typeinfos: HashSet::new(), trait_slots: HashMap::new(),
    }
  }

  /// Emit a `%Name = type { fields }` declaration plus its `@Name.size`
  /// size constant for every registered class/template, in name order (a
  /// stable order suffices since every aggregate field is itself pointer-
  /// typed, so no declaration ever needs another's layout completed first).
  pub fn declare_types(&mut self, registry: &Registry<'_>) {
    let mut names: Vec<&Symbol> = registry.infos.keys().collect();
    names.sort_by_key(|n| n.to_string());
    for name in names {
      let info = &registry.infos[name];
      if info.attribs.is_empty() { continue; }
      let fields: Vec<String> = info.attribs.iter().map(|(_, t)| ir_type(t)).collect();
      writeln!(self.types, "%{name} = type {{ {} }}", fields.join(", ")).unwrap();
      writeln!(
        self.types,
        "@{name}.size = constant i64 ptrtoint (%{name}* getelementptr (%{name}, %{name}* null, i32 1) to i64)",
      ).unwrap();
    }
    self.types.push('\n');
  }

  /// Emit `%T.vt`/`%T.wrap` for every trait: one function-pointer slot per
  /// method (sorted by name), its receiver retyped to the erased `i8*`.
  pub fn declare_traits(&mut self, traits: &[(Symbol, Vec<(Symbol, crate::typeck::Signature<'_>)>)]) {
    for (name, methods) in traits {
      let mut slots = Vec::new();
      for (mname, sig) in methods {
        let ret = ir_type(sig.ret);
        let param_tys: Vec<String> = std::iter::once("i8*".to_owned())
          .chain(sig.params.iter().skip(1).map(|(_, t)| ir_type(t)))
          .collect();
        slots.push((*mname, format!("{ret} ({})*", param_tys.join(", "))));
      }
      let slot_tys: Vec<&str> = slots.iter().map(|(_, t)| t.as_str()).collect();
      writeln!(self.types, "%{name}.vt = type {{ {} }}", slot_tys.join(", ")).unwrap();
      writeln!(self.types, "%{name}.wrap = type {{ %{name}.vt*, i8* }}").unwrap();
      self.trait_slots.insert(*name, slots);
    }
    self.types.push('\n');
  }

  /// Emit one function/method/generator entry point.
  #[allow(clippy::too_many_arguments)]
  pub fn function<'ty>(
    &mut self, name: &str, ret: &'ty Type<'ty>, params: &[(Symbol, &'ty Type<'ty>)], flow: &FlowGraph,
    anno: &Annotations<'ty>, escapes: &EscapeInfo, registry: &Registry<'ty>, generators: &HashSet<Symbol>,
    is_main_with_args: bool,
  ) {
    let is_generator = flow.blocks.iter().any(|b| b.steps.iter().any(|s| matches!(s, Step::Yield(..))));
    let mut em = FuncEmitter {
      anno, flow, escapes, registry, generators, trait_slots: &self.trait_slots,
      typeinfos: &mut self.typeinfos, constants: &mut self.constants,
      out: String::new(), preamble: String::new(), next_reg: 0, next_label: 0,
      names: HashMap::new(), is_generator, gen_fn_name: name.to_owned(), gen_value_ty: ir_type(ret),
      ctx_fields: HashMap::new(), gen_ctx_vars: HashMap::new(), yield_targets: HashSet::new(),
    };

    if is_generator {
      em.emit_generator(name, params, flow);
    } else if is_main_with_args {
      em.emit_main_with_args(name, ret, params, flow);
    } else {
      em.emit_plain(name, ret, params, flow);
    }

    self.gen_types.push_str(&em.preamble);
    self.functions.push_str(&em.out);
    self.functions.push('\n');
  }

  /// Consume the program, assembling the final module text: target triple,
  /// runtime declarations, typeinfo externs referenced by any `landingpad`,
  /// type/trait/generator-context declarations, the string constant pool,
  /// then every function body.
  #[must_use] pub fn finish(self) -> String {
    let mut out = String::new();
    writeln!(out, "target triple = \"{}\"", target_triple()).unwrap();
    out.push('\n');
    out.push_str(RUNTIME_DECLS);
    out.push('\n');
    let mut typeinfos: Vec<&Symbol> = self.typeinfos.iter().collect();
    typeinfos.sort_by_key(|s| s.to_string());
    for ty in typeinfos { writeln!(out, "@{ty}.typeinfo = external global i8*").unwrap(); }
    if !self.typeinfos.is_empty() { out.push('\n'); }
    out.push_str(&self.types);
    out.push_str(&self.gen_types);
    out.push('\n');
    for decl in &self.constants.decls { out.push_str(decl); out.push('\n'); }
    out.push('\n');
    out.push_str(&self.functions);
    out
  }
}

/// Per-function emission state: the shared module-level pools borrowed
/// mutably, the function's own register/label counters and local-name
/// table, and (for a generator) its context-struct layout.
struct FuncEmitter<'a, 'ty> {
  anno: &'a Annotations<'ty>,
  flow: &'a FlowGraph,
  escapes: &'a EscapeInfo,
  registry: &'a Registry<'ty>,
  generators: &'a HashSet<Symbol>,
  trait_slots: &'a HashMap<Symbol, Vec<(Symbol, String)>>,
  typeinfos: &'a mut HashSet<Symbol>,
  constants: &'a mut Constants,
  out: String,
  /// Type-level declarations this function's emission discovered it needs
  /// (only ever a generator's `%fn.ctx` struct) — folded into the module's
  /// type section ahead of every function body.
  preamble: String,
  next_reg: u32,
  next_label: u32,
  names: HashMap<Symbol, String>,
  is_generator: bool,
  gen_fn_name: String,
  gen_value_ty: String,
  /// For a generator: each live local's `(field index, type)` within its
  /// `%fn.ctx` struct (index 0 is always the resume pointer).
  ctx_fields: HashMap<Symbol, (usize, &'ty Type<'ty>)>,
  /// For a `for` loop whose source is a known generator call: the loop
  /// variable's context pointer, keyed by the `LoopSetup` context symbol.
  gen_ctx_vars: HashMap<Symbol, Symbol>,
  /// Blocks a `Yield` can resume into, i.e. valid `indirectbr` targets.
  yield_targets: HashSet<BlockId>,
}

impl<'a, 'ty> FuncEmitter<'a, 'ty> {
  fn fresh_temp(&mut self) -> String {
    let r = format!("%t{}", self.next_reg);
    self.next_reg += 1;
    r
  }

  fn label(b: BlockId) -> String { format!("L{}", b.as_u32()) }

  fn raw_slot(&mut self, var: Symbol) -> String {
    self.names.entry(var).or_insert_with(|| format!("%{var}")).clone()
  }

  /// The value currently held by `var`: a plain named register, or (inside
  /// a generator) a fresh load from its context-struct field.
  fn slot(&mut self, var: Symbol) -> String {
    if self.is_generator {
      if let Some((idx, fty)) = self.ctx_fields.get(&var).copied() {
        let ctx_ty = format!("%{}.ctx", self.gen_fn_name);
        let ty = ir_type(fty);
        let fp = self.fresh_temp();
        writeln!(self.out, "  {fp} = getelementptr {ctx_ty}, {ctx_ty}* %ctx, i32 0, i32 {idx}").unwrap();
        let v = self.fresh_temp();
        writeln!(self.out, "  {v} = load {ty}, {ty}* {fp}").unwrap();
        return v;
      }
    }
    self.raw_slot(var)
  }

  /// Bind `var` to `value`: a plain `%name = value` pseudo-assignment, or
  /// (inside a generator) a store through its context-struct field.
  fn store_var(&mut self, var: Symbol, value: &str, ty: &'ty Type<'ty>) {
    if self.is_generator {
      if let Some((idx, fty)) = self.ctx_fields.get(&var).copied() {
        let ctx_ty = format!("%{}.ctx", self.gen_fn_name);
        let field_ty = ir_type(fty);
        let fp = self.fresh_temp();
        writeln!(self.out, "  {fp} = getelementptr {ctx_ty}, {ctx_ty}* %ctx, i32 0, i32 {idx}").unwrap();
        writeln!(self.out, "  store {field_ty} {value}, {field_ty}* {fp}").unwrap();
        return;
      }
    }
    let _ = ty;
    let slot = self.raw_slot(var);
    if value != slot { writeln!(self.out, "  {slot} = {value}").unwrap(); }
  }

  fn string_operand(&mut self, id: NodeId, s: &str) -> String {
    let escaping = self.escapes.escapes(id);
    let (global, len) = self.constants.intern(s);
    if !escaping {
      return format!("bitcast ([{len} x i8]* {global} to i8*)");
    }
    let raw = self.fresh_temp();
    writeln!(self.out, "  {raw} = call i8* @runa.malloc(i64 {len})").unwrap();
    writeln!(
      self.out,
      "  call void @llvm.memcpy.p0i8.p0i8.i64(i8* {raw}, i8* bitcast ([{len} x i8]* {global} to i8*), i64 {len}, i1 false)",
    ).unwrap();
    raw
  }

  /// An atomic value: a literal or a variable's current value, falling
  /// through to [`Self::expr_value`] for anything that needs instructions
  /// to compute.
  fn operand(&mut self, e: &Expr) -> String {
    match e {
      Expr::None(_) => "null".to_owned(),
      Expr::Bool(_, b) => if *b { "1".into() } else { "0".into() },
      Expr::Int(_, s) | Expr::Float(_, s) => s.clone(),
      Expr::String(tag, s) => self.string_operand(tag.id, s),
      Expr::Name(_, n) => self.slot(*n),
      _ => self.expr_value(e),
    }
  }

  /// Every expression form that needs its own instructions to compute.
  /// `Owner`/`Ref`/`Opt`/`Mut` are type-form syntax that never appears as a
  /// runtime value, and `Ternary` is lowered away into a `Phi` step before
  /// this pass ever sees it — both panic loudly rather than silently
  /// degrading to a placeholder.
  fn expr_value(&mut self, e: &Expr) -> String {
    match e {
      Expr::Binary(_, op, l, r) => {
        let lv = self.operand(l);
        let rv = self.operand(r);
        let operand_ty = ir_type(self.anno.of(l.tag().id));
        let mnemonic = binop_mnemonic(*op, &operand_ty);
        let dst = self.fresh_temp();
        writeln!(self.out, "  {dst} = {mnemonic} {operand_ty} {lv}, {rv}").unwrap();
        dst
      }
      Expr::Not(_, v) => {
        let vv = self.operand(v);
        let dst = self.fresh_temp();
        writeln!(self.out, "  {dst} = xor i1 {vv}, 1").unwrap();
        dst
      }
      Expr::As(tag, l, _) => {
        let target = self.anno.of(tag.id);
        if let Type::Trait(trait_name) = target { return self.wrap_as_trait(l, *trait_name); }
        let from_ty = ir_type(self.anno.of(l.tag().id));
        let lv = self.operand(l);
        let to_ty = ir_type(target);
        let dst = self.fresh_temp();
        writeln!(self.out, "  {dst} = bitcast {from_ty} {lv} to {to_ty}").unwrap();
        dst
      }
      Expr::Attrib(_, obj, name) => {
        let obj_ty = self.anno.of(obj.tag().id);
        let owner_name = match obj_ty.unwrap() {
          Type::Concrete(n, _) | Type::Template(n) => *n,
          _ => unreachable!("field access receiver must be a class instance"),
        };
        let info = self.registry.infos.get(&owner_name).expect("class registered before codegen");
        let (idx, fty) = info.attrib(*name).expect("declared field");
        let struct_ty = format!("%{owner_name}");
        let field_ty = ir_type(fty);
        let ov = self.operand(obj);
        let fp = self.fresh_temp();
        writeln!(self.out, "  {fp} = getelementptr {struct_ty}, {struct_ty}* {ov}, i32 0, i32 {idx}").unwrap();
        let dst = self.fresh_temp();
        writeln!(self.out, "  {dst} = load {field_ty}, {field_ty}* {fp}").unwrap();
        dst
      }
      Expr::Elem(_, obj, key) => {
        let ty = ir_type(self.anno.of(e.tag().id));
        let obj_ty = ir_type(self.anno.of(obj.tag().id));
        let ov = self.operand(obj);
        let kv = self.operand(key);
        let ep = self.fresh_temp();
        writeln!(self.out, "  {ep} = getelementptr {ty}, {obj_ty} {ov}, i64 {kv}").unwrap();
        let dst = self.fresh_temp();
        writeln!(self.out, "  {dst} = load {ty}, {ty}* {ep}").unwrap();
        dst
      }
      Expr::Call(tag, callee, args) => {
        let (callee_text, ret_ty, arg_vals) = self.call_parts(tag.id, callee, args);
        if ret_ty == "void" {
          writeln!(self.out, "  call void {callee_text}({})", arg_vals.join(", ")).unwrap();
          String::new()
        } else {
          let dst = self.fresh_temp();
          writeln!(self.out, "  {dst} = call {ret_ty} {callee_text}({})", arg_vals.join(", ")).unwrap();
          dst
        }
      }
      Expr::Tuple(tag, vs) => {
        let tty = ir_type(self.anno.of(tag.id));
        let mut acc = "undef".to_owned();
        for (i, v) in vs.iter().enumerate() {
          let vv = self.operand(v);
          let vty = ir_type(self.anno.of(v.tag().id));
          let dst = self.fresh_temp();
          writeln!(self.out, "  {dst} = insertvalue {tty} {acc}, {vty} {vv}, {i}").unwrap();
          acc = dst;
        }
        acc
      }
      Expr::NamedArg(_, _, v) => self.operand(v),
      Expr::None(_) | Expr::Bool(..) | Expr::Int(..) | Expr::Float(..) | Expr::String(..) | Expr::Name(..) => self.operand(e),
      Expr::Owner(..) | Expr::Ref(..) | Expr::Opt(..) | Expr::Mut(..) =>
        unreachable!("type-form expression never appears in value position"),
      Expr::Ternary(..) => unreachable!("Ternary is lowered to a Phi step before codegen"),
    }
  }

  /// Wrap a class instance into a trait: fill an `alloca`'d `%T.vt` with
  /// each implementing method bitcast to the trait's erased signature, then
  /// an `alloca`'d `%T.wrap` pointing at it alongside the `i8*`-erased object.
  fn wrap_as_trait(&mut self, l: &Expr, trait_name: Symbol) -> String {
    let concrete_ty = self.anno.of(l.tag().id);
    let concrete_name = match concrete_ty.unwrap() {
      Type::Concrete(n, _) | Type::Template(n) => *n,
      _ => unreachable!("trait cast source must be a class instance"),
    };
    let lv = self.operand(l);
    let slots = self.trait_slots.get(&trait_name).cloned().unwrap_or_default();
    let vt_ty = format!("%{trait_name}.vt");
    let wrap_ty = format!("%{trait_name}.wrap");

    let vt_slot = self.fresh_temp();
    writeln!(self.out, "  {vt_slot} = alloca {vt_ty}").unwrap();
    for (i, (method, slot_ty)) in slots.iter().enumerate() {
      let cand = self.registry.methods_of(concrete_name, *method).and_then(|c| c.first()).cloned();
      let (link, orig_fn_ty) = match cand {
        Some(c) => {
          let Type::Function(ret, params) = c.ty else { unreachable!("method decl is always a Function type") };
          let parts: Vec<String> = params.iter().map(|p| ir_type(p)).collect();
          (c.link_name, format!("{} ({})", ir_type(ret), parts.join(", ")))
        }
        None => (format!("{concrete_name}.{method}"), slot_ty.trim_end_matches('*').to_owned()),
      };
      let slotp = self.fresh_temp();
      writeln!(self.out, "  {slotp} = getelementptr {vt_ty}, {vt_ty}* {vt_slot}, i32 0, i32 {i}").unwrap();
      let casted = self.fresh_temp();
      writeln!(self.out, "  {casted} = bitcast {orig_fn_ty}* @{link} to {slot_ty}").unwrap();
      writeln!(self.out, "  store {slot_ty} {casted}, {slot_ty}* {slotp}").unwrap();
    }

    let wrap_slot = self.fresh_temp();
    writeln!(self.out, "  {wrap_slot} = alloca {wrap_ty}").unwrap();
    let vtfield = self.fresh_temp();
    writeln!(self.out, "  {vtfield} = getelementptr {wrap_ty}, {wrap_ty}* {wrap_slot}, i32 0, i32 0").unwrap();
    writeln!(self.out, "  store {vt_ty}* {vt_slot}, {vt_ty}** {vtfield}").unwrap();
    let objfield = self.fresh_temp();
    writeln!(self.out, "  {objfield} = getelementptr {wrap_ty}, {wrap_ty}* {wrap_slot}, i32 0, i32 1").unwrap();
    let concrete_ir = format!("%{concrete_name}*");
    let casted_obj = self.fresh_temp();
    writeln!(self.out, "  {casted_obj} = bitcast {concrete_ir} {lv} to i8*").unwrap();
    writeln!(self.out, "  store i8* {casted_obj}, i8** {objfield}").unwrap();
    wrap_slot
  }

  fn call_args(&mut self, args: &[Expr]) -> Vec<String> {
    args.iter().map(|a| {
      let ty = ir_type(self.anno.of(a.tag().id));
      let v = self.operand(a);
      format!("{ty} {v}")
    }).collect()
  }

  /// The callee text, return type, and rendered argument list for a call
  /// expression, shared by plain `call` lowering and `invoke` lowering.
  /// Handles virtual trait dispatch, static method dispatch (re-resolving
  /// the chosen overload's mangled link name), free-function calls, and an
  /// indirect fallback for any other callee shape.
  fn call_parts(&mut self, call_id: NodeId, callee: &Expr, args: &[Expr]) -> (String, String, Vec<String>) {
    let ret_ty = ir_type(self.anno.of(call_id));
    if let Expr::Attrib(_, obj, method) = callee {
      let obj_ty = self.anno.of(obj.tag().id);
      if let Type::Trait(trait_name) = obj_ty.unwrap() {
        let (callee_text, arg_vals) = self.virtual_call_parts(*trait_name, obj, *method, args);
        return (callee_text, ret_ty, arg_vals);
      }
      let (callee_text, arg_vals) = self.static_method_call_parts(obj, *method, args);
      return (callee_text, ret_ty, arg_vals);
    }
    if let Expr::Name(_, n) = callee {
      let arg_vals = self.call_args(args);
      let text = format!("@{n}");
      return (text, ret_ty, arg_vals);
    }
    let indirect = self.operand(callee);
    let arg_vals = self.call_args(args);
    (indirect, ret_ty, arg_vals)
  }

  fn static_method_call_parts(&mut self, obj: &Expr, method: Symbol, args: &[Expr]) -> (String, Vec<String>) {
    let obj_ty = self.anno.of(obj.tag().id);
    let owner_name = match obj_ty.unwrap() {
      Type::Concrete(n, _) | Type::Template(n) => *n,
      _ => unreachable!("method call receiver must be a class instance"),
    };
    let obj_ir_ty = ir_type(obj_ty);
    let mut arg_tys: Vec<&'ty Type<'ty>> = vec![obj_ty];
    arg_tys.extend(args.iter().map(|a| self.anno.of(a.tag().id)));
    let link = self.resolve_method_link(owner_name, method, &arg_tys)
      .unwrap_or_else(|| format!("{owner_name}.{method}"));
    let ov = self.operand(obj);
    let mut arg_vals = vec![format!("{obj_ir_ty} {ov}")];
    arg_vals.extend(self.call_args(args));
    (format!("@{link}"), arg_vals)
  }

  /// Re-run the same scoring `typeck::Checker::resolve_overload` used to
  /// type-check the call, since [`Annotations`] only records the call's
  /// resolved result type, not which overload produced it.
  fn resolve_method_link(&self, owner: Symbol, method: Symbol, arg_tys: &[&'ty Type<'ty>]) -> Option<String> {
    let candidates = self.registry.methods_of(owner, method)?;
    let mut best: Option<(&str, u32)> = None;
    for cand in candidates {
      let Type::Function(_, formals) = cand.ty else { continue };
      if let Some(score) = crate::types::compat::score(formals, arg_tys) {
        if best.is_none_or(|(_, s)| score < s) { best = Some((&cand.link_name, score)); }
      }
    }
    best.map(|(n, _)| n.to_owned())
  }

  /// Load the fn pointer from the receiver's vtable slot and the erased
  /// receiver pointer from its wrap struct, returning them as the
  /// indirect-call callee and the first argument.
  fn virtual_call_parts(&mut self, trait_name: Symbol, obj: &Expr, method: Symbol, args: &[Expr]) -> (String, Vec<String>) {
    let slots = self.trait_slots.get(&trait_name).cloned().unwrap_or_default();
    let idx = slots.iter().position(|(m, _)| *m == method).unwrap_or(0);
    let slot_ty = slots.get(idx).map(|(_, t)| t.clone()).unwrap_or_else(|| "i8*".to_owned());
    let ov = self.operand(obj);
    let wrap_ty = format!("%{trait_name}.wrap");
    let vt_ty = format!("%{trait_name}.vt");
    let vtfield = self.fresh_temp();
    writeln!(self.out, "  {vtfield} = getelementptr {wrap_ty}, {wrap_ty}* {ov}, i32 0, i32 0").unwrap();
    let vt = self.fresh_temp();
    writeln!(self.out, "  {vt} = load {vt_ty}*, {vt_ty}** {vtfield}").unwrap();
    let slotp = self.fresh_temp();
    writeln!(self.out, "  {slotp} = getelementptr {vt_ty}, {vt_ty}* {vt}, i32 0, i32 {idx}").unwrap();
    let fnptr = self.fresh_temp();
    writeln!(self.out, "  {fnptr} = load {slot_ty}, {slot_ty}* {slotp}").unwrap();
    let objfield = self.fresh_temp();
    writeln!(self.out, "  {objfield} = getelementptr {wrap_ty}, {wrap_ty}* {ov}, i32 0, i32 1").unwrap();
    let recv = self.fresh_temp();
    writeln!(self.out, "  {recv} = load i8*, i8** {objfield}").unwrap();
    let mut arg_vals = vec![format!("i8* {recv}")];
    arg_vals.extend(self.call_args(args));
    (fnptr, arg_vals)
  }

  fn lower_return(&mut self, v: Option<&Expr>) {
    if self.is_generator {
      let agg = format!("{{ i1, {} }}", self.gen_value_ty);
      let a = self.fresh_temp();
      writeln!(self.out, "  {a} = insertvalue {agg} undef, i1 0, 0").unwrap();
      writeln!(self.out, "  ret {agg} {a}").unwrap();
      return;
    }
    match v {
      Some(v) => {
        let ty = ir_type(self.anno.of(v.tag().id));
        let r = self.operand(v);
        writeln!(self.out, "  ret {ty} {r}").unwrap();
      }
      None => { writeln!(self.out, "  ret void").unwrap(); }
    }
  }

  fn lower_yield(&mut self, v: &Expr, next: BlockId) {
    let vty = ir_type(self.anno.of(v.tag().id));
    let vv = self.operand(v);
    let ctx_ty = format!("%{}.ctx", self.gen_fn_name);
    let fp = self.fresh_temp();
    writeln!(self.out, "  {fp} = getelementptr {ctx_ty}, {ctx_ty}* %ctx, i32 0, i32 0").unwrap();
    writeln!(self.out, "  store i8* blockaddress(@{}.next, %{}), i8** {fp}", self.gen_fn_name, Self::label(next)).unwrap();
    let agg = format!("{{ i1, {} }}", self.gen_value_ty);
    let a0 = self.fresh_temp();
    writeln!(self.out, "  {a0} = insertvalue {agg} undef, i1 1, 0").unwrap();
    let a1 = self.fresh_temp();
    writeln!(self.out, "  {a1} = insertvalue {agg} {a0}, {vty} {vv}, 1").unwrap();
    writeln!(self.out, "  ret {agg} {a1}").unwrap();
  }

  fn lower_assign(&mut self, left: &Expr, right: &Expr) {
    match left {
      Expr::Name(_, n) => {
        let rv = self.expr_value(right);
        if rv.is_empty() { return; }
        let ty = self.anno.vars.get(n).copied().unwrap_or_else(|| self.anno.of(right.tag().id));
        self.store_var(*n, &rv, ty);
      }
      Expr::Attrib(_, obj, name) => {
        let obj_ty = self.anno.of(obj.tag().id);
        let owner_name = match obj_ty.unwrap() {
          Type::Concrete(n, _) | Type::Template(n) => *n,
          _ => unreachable!("field assignment receiver must be a class instance"),
        };
        let info = self.registry.infos.get(&owner_name).expect("class registered before codegen");
        let (idx, fty) = info.attrib(*name).expect("declared field");
        let struct_ty = format!("%{owner_name}");
        let field_ty = ir_type(fty);
        let ov = self.operand(obj);
        let rv = self.expr_value(right);
        let fp = self.fresh_temp();
        writeln!(self.out, "  {fp} = getelementptr {struct_ty}, {struct_ty}* {ov}, i32 0, i32 {idx}").unwrap();
        writeln!(self.out, "  store {field_ty} {rv}, {field_ty}* {fp}").unwrap();
      }
      _ => { self.expr_value(right); }
    }
  }

  fn lower_phi(&mut self, dst: Symbol, lb: BlockId, l: &Expr, rb: BlockId, r: &Expr) {
    let ty = self.anno.vars.get(&dst).copied().unwrap_or_else(|| self.anno.of(l.tag().id));
    let tyi = ir_type(ty);
    let lv = self.operand(l);
    let rv = self.operand(r);
    let reg = self.fresh_temp();
    writeln!(self.out, "  {reg} = phi {tyi} [ {lv}, %{} ], [ {rv}, %{} ]", Self::label(lb), Self::label(rb)).unwrap();
    self.store_var(dst, &reg, ty);
  }

  fn lower_loop_setup(&mut self, var: Symbol, source: &Expr) {
    if let Expr::Call(_, callee, args) = source {
      if let Expr::Name(_, cname) = callee.as_ref() {
        if self.generators.contains(cname) {
          let arg_vals = self.call_args(args);
          let ctx_ty = format!("%{cname}.ctx*");
          let dst = self.fresh_temp();
          writeln!(self.out, "  {dst} = call {ctx_ty} @{cname}({})", arg_vals.join(", ")).unwrap();
          self.gen_ctx_vars.insert(var, *cname);
          let vty = self.anno.vars.get(&var).copied().unwrap_or_else(|| self.anno.of(source.tag().id));
          self.store_var(var, &dst, vty);
          return;
        }
      }
    }
    let sv = self.operand(source);
    let vty = self.anno.vars.get(&var).copied().unwrap_or_else(|| self.anno.of(source.tag().id));
    let text = format!("iter {sv}");
    self.store_var(var, &text, vty);
  }

  fn lower_loop_header(&mut self, ctx: Symbol, lvar: Symbol, body: BlockId, exit: Option<BlockId>) {
    let ex = exit.map_or_else(|| "<unset>".to_owned(), Self::label);
    if let Some(gen_name) = self.gen_ctx_vars.get(&ctx).copied() {
      let ctxv = self.slot(ctx);
      let lty = self.anno.vars.get(&lvar).copied().expect("loop variable type recorded by typeck");
      let agg = format!("{{ i1, {} }}", ir_type(lty));
      let res = self.fresh_temp();
      writeln!(self.out, "  {res} = call {agg} @{gen_name}.next(%{gen_name}.ctx* {ctxv})").unwrap();
      let more = self.fresh_temp();
      writeln!(self.out, "  {more} = extractvalue {agg} {res}, 0").unwrap();
      let val = self.fresh_temp();
      writeln!(self.out, "  {val} = extractvalue {agg} {res}, 1").unwrap();
      self.store_var(lvar, &val, lty);
      writeln!(self.out, "  br i1 {more}, label %{}, label %{ex}", Self::label(body)).unwrap();
      return;
    }
    let ctxv = self.slot(ctx);
    let lv = self.raw_slot(lvar);
    writeln!(self.out, "  {lv} = nextval {ctxv}, {}, {ex}", Self::label(body)).unwrap();
  }

  fn lower_lpad(&mut self, handlers: &HashMap<Symbol, BlockId>) {
    let mut ordered: Vec<(Symbol, BlockId)> = handlers.iter().map(|(t, b)| (*t, *b)).collect();
    ordered.sort_by_key(|(ty, _)| ty.to_string());
    let lp = self.fresh_temp();
    writeln!(self.out, "  {lp} = landingpad {{ i8*, i32 }} personality i32 (...)* @runa.personality").unwrap();
    for (ty, _) in &ordered {
      self.typeinfos.insert(*ty);
      writeln!(self.out, "    catch i8* bitcast (i8** @{ty}.typeinfo to i8*)").unwrap();
    }
    let sel = self.fresh_temp();
    writeln!(self.out, "  {sel} = extractvalue {{ i8*, i32 }} {lp}, 1").unwrap();
    for (ty, block) in &ordered {
      let tid = self.fresh_temp();
      writeln!(self.out, "  {tid} = call i32 @llvm.eh.typeid.for(i8* bitcast (i8** @{ty}.typeinfo to i8*))").unwrap();
      let cmp = self.fresh_temp();
      writeln!(self.out, "  {cmp} = icmp eq i32 {sel}, {tid}").unwrap();
      self.next_label += 1;
      let cont = format!("lpcont{}", self.next_label);
      writeln!(self.out, "  br i1 {cmp}, label %{}, label %{cont}", Self::label(*block)).unwrap();
      writeln!(self.out, "{cont}:").unwrap();
    }
    writeln!(self.out, "  resume {{ i8*, i32 }} {lp}").unwrap();
  }

  /// Release `var`'s heap allocation: free any `Owner`-typed field first
  /// (one level only — an array's data is a single contiguous block, not
  /// recursed into), then free `var` itself.
  fn free_value(&mut self, var: Symbol, ty: &'ty Type<'ty>) {
    let slot = self.slot(var);
    let inner = match ty { Type::Owner(t) => *t, _ => ty };
    if let Type::Concrete(n, _) | Type::Template(n) = inner.unwrap() {
      if let Some(info) = self.registry.infos.get(n) {
        let owner_fields: Vec<(usize, &'ty Type<'ty>)> = info.attribs.iter().enumerate()
          .filter_map(|(i, (_, t))| matches!(t, Type::Owner(_)).then_some((i, *t)))
          .collect();
        let struct_ty = format!("%{n}");
        for (idx, fty) in owner_fields {
          let field_ty = ir_type(fty);
          let fp = self.fresh_temp();
          writeln!(self.out, "  {fp} = getelementptr {struct_ty}, {struct_ty}* {slot}, i32 0, i32 {idx}").unwrap();
          let fv = self.fresh_temp();
          writeln!(self.out, "  {fv} = load {field_ty}, {field_ty}* {fp}").unwrap();
          let casted = self.fresh_temp();
          writeln!(self.out, "  {casted} = bitcast {field_ty} {fv} to i8*").unwrap();
          writeln!(self.out, "  call void @runa.free(i8* {casted})").unwrap();
        }
      }
    }
    let ty_ir = ir_type(ty);
    let casted = self.fresh_temp();
    writeln!(self.out, "  {casted} = bitcast {ty_ir} {slot} to i8*").unwrap();
    writeln!(self.out, "  call void @runa.free(i8* {casted})").unwrap();
  }

  fn step(&mut self, step: &Step) {
    match step {
      Step::Pass(_) => {}
      Step::Return(_, v) => self.lower_return(v.as_ref()),
      Step::Raise(_, v) => {
        let rv = self.operand(v);
        writeln!(self.out, "  call void @runa.raise(i8* {rv})").unwrap();
        writeln!(self.out, "  unreachable").unwrap();
      }
      Step::Assign(_, left, right) => self.lower_assign(left, right),
      Step::IAdd(_, left, right) => {
        let Expr::Name(_, n) = left else { return };
        let ty = ir_type(self.anno.of(right.tag().id));
        let rv = self.operand(right);
        let slot = self.slot(*n);
        let dst = self.fresh_temp();
        writeln!(self.out, "  {dst} = add {ty} {slot}, {rv}").unwrap();
        let vty = self.anno.vars.get(n).copied().unwrap_or_else(|| self.anno.of(right.tag().id));
        self.store_var(*n, &dst, vty);
      }
      Step::Yield(_, v, next) => self.lower_yield(v, *next),
      Step::Branch(to) => { writeln!(self.out, "  br label %{}", Self::label(*to)).unwrap(); }
      Step::CondBranch(cond, t, f) => {
        let cv = self.operand(cond);
        let fl = f.map_or_else(|| "<unset>".to_owned(), Self::label);
        writeln!(self.out, "  br i1 {cv}, label %{}, label %{fl}", Self::label(*t)).unwrap();
      }
      Step::Phi(_, dst, (lb, l), (rb, r)) => self.lower_phi(*dst, *lb, l, *rb, r),
      Step::LoopSetup(_, var, source) => self.lower_loop_setup(*var, source),
      Step::LoopHeader(_, ctx, lvar, body, exit) => self.lower_loop_header(*ctx, *lvar, *body, *exit),
      Step::LPad(handlers) => self.lower_lpad(handlers),
      Step::Free(var) => {
        let ty = self.anno.vars.get(var).copied().expect("freed variable has a recorded type");
        self.free_value(*var, ty);
      }
    }
  }

  /// Emit one block's label and steps, collapsing a call this block's
  /// `try` protects (per [`FlowGraph::invokes`]) from its trailing
  /// `Assign(.., Call) ; Branch` pair into a single `invoke … to … unwind …`.
  fn block(&mut self, id: BlockId, block: &Block) {
    writeln!(self.out, "{}:", Self::label(id)).unwrap();
    let steps = &block.steps;
    let mut i = 0;
    while i < steps.len() {
      if let Some(&pad) = self.flow.invokes.get(&id) {
        if i + 1 < steps.len() {
          if let Step::Assign(_, left, right) = &steps[i] {
            if matches!(right, Expr::Call(..)) {
              if let Step::Branch(next) = &steps[i + 1] {
                self.invoke(left, right, *next, pad);
                i += 2;
                continue;
              }
            }
          }
        }
      }
      self.step(&steps[i]);
      i += 1;
    }
  }

  fn invoke(&mut self, left: &Expr, call: &Expr, next: BlockId, pad: BlockId) {
    let Expr::Call(tag, callee, args) = call else { unreachable!("invoke target must be a Call") };
    let (callee_text, ret_ty, arg_vals) = self.call_parts(tag.id, callee, args);
    let dst_name = match left { Expr::Name(_, n) => Some(*n), _ => None };
    if ret_ty == "void" {
      writeln!(
        self.out, "  invoke void {callee_text}({}) to label %{} unwind label %{}",
        arg_vals.join(", "), Self::label(next), Self::label(pad),
      ).unwrap();
    } else {
      let dst = self.fresh_temp();
      writeln!(
        self.out, "  {dst} = invoke {ret_ty} {callee_text}({}) to label %{} unwind label %{}",
        arg_vals.join(", "), Self::label(next), Self::label(pad),
      ).unwrap();
      if let Some(n) = dst_name {
        let ty = self.anno.of(call.tag().id);
        self.store_var(n, &dst, ty);
      }
    }
  }

  fn emit_plain(&mut self, name: &str, ret: &'ty Type<'ty>, params: &[(Symbol, &'ty Type<'ty>)], flow: &FlowGraph) {
    let args: Vec<String> = params.iter().map(|(n, t)| format!("{} %{n}", ir_type(t))).collect();
    writeln!(self.out, "define {} @{name}({}) uwtable {{", ir_type(ret), args.join(", ")).unwrap();
    for (id, block) in flow.blocks.iter_enum() { self.block(id, block); }
    writeln!(self.out, "}}").unwrap();
  }

  /// `main`'s real entry shape: `i64 @main(i64 %argc, i8** %argv)`, binding
  /// the declared `args` parameter from a runtime call before the rest of
  /// the entry block (destructor insertion has already arranged a `Free`
  /// for it at every exit it reaches).
  fn emit_main_with_args(&mut self, name: &str, ret: &'ty Type<'ty>, params: &[(Symbol, &'ty Type<'ty>)], flow: &FlowGraph) {
    writeln!(self.out, "define {} @{name}(i64 %argc, i8** %argv) uwtable {{", ir_type(ret)).unwrap();
    writeln!(self.out, "{}:", Self::label(BlockId::ENTRY)).unwrap();
    if let Some((argname, argty)) = params.first() {
      let ty = ir_type(argty);
      let raw = self.fresh_temp();
      writeln!(self.out, "  {raw} = call i8* @runa.args(i64 %argc, i8** %argv)").unwrap();
      let casted = self.fresh_temp();
      writeln!(self.out, "  {casted} = bitcast i8* {raw} to {ty}").unwrap();
      self.store_var(*argname, &casted, argty);
    }
    let entry_steps = &flow.blocks[BlockId::ENTRY].steps;
    let mut i = 0;
    while i < entry_steps.len() {
      if let Some(&pad) = self.flow.invokes.get(&BlockId::ENTRY) {
        if i + 1 < entry_steps.len() {
          if let Step::Assign(_, left, right) = &entry_steps[i] {
            if matches!(right, Expr::Call(..)) {
              if let Step::Branch(next) = &entry_steps[i + 1] {
                self.invoke(left, right, *next, pad);
                i += 2;
                continue;
              }
            }
          }
        }
      }
      self.step(&entry_steps[i].clone());
      i += 1;
    }
    for (id, block) in flow.blocks.iter_enum() {
      if id == BlockId::ENTRY { continue; }
      self.block(id, block);
    }
    writeln!(self.out, "}}").unwrap();
  }

  /// A generator function lowers to two real functions: a constructor
  /// allocating its `%fn.ctx` (one field per live local, conservatively
  /// every local ever assigned rather than precisely those live across a
  /// yield), and `fn.next`, which on first entry runs the body from the
  /// top and on resumption `indirectbr`s to whichever block the last
  /// `Yield` left its resume pointer pointing at.
  fn emit_generator(&mut self, name: &str, params: &[(Symbol, &'ty Type<'ty>)], flow: &FlowGraph) {
    let mut fields: Vec<Symbol> = params.iter().map(|(n, _)| *n).collect();
    let mut extra: Vec<Symbol> = flow.blocks.iter().flat_map(|b| b.assigns.keys().copied())
      .filter(|s| !fields.contains(s)).collect();
    extra.sort_by_key(Symbol::to_string);
    extra.dedup();
    fields.extend(extra);

    let fallback_ty = self.anno.vars.values().next().copied();
    let field_tys: Vec<&'ty Type<'ty>> = fields.iter().map(|s| {
      params.iter().find(|(n, _)| n == s).map(|(_, t)| *t)
        .or_else(|| self.anno.vars.get(s).copied())
        .or(fallback_ty)
        .expect("generator local has a recorded type")
    }).collect();

    for (i, f) in fields.iter().enumerate() { self.ctx_fields.insert(*f, (i + 1, field_tys[i])); }
    for block in flow.blocks.iter() {
      for s in &block.steps {
        if let Step::Yield(_, _, next) = s { self.yield_targets.insert(*next); }
      }
    }

    let ctx_ty = format!("%{name}.ctx");
    let field_decls: Vec<String> = std::iter::once("i8*".to_owned())
      .chain(field_tys.iter().map(|t| ir_type(t))).collect();
    writeln!(self.preamble, "{ctx_ty} = type {{ {} }}", field_decls.join(", ")).unwrap();
    writeln!(
      self.preamble,
      "@{name}.ctx.size = constant i64 ptrtoint ({ctx_ty}* getelementptr ({ctx_ty}, {ctx_ty}* null, i32 1) to i64)",
    ).unwrap();

    let ctor_params: Vec<String> = params.iter().map(|(n, t)| format!("{} %{n}", ir_type(t))).collect();
    writeln!(self.out, "define {ctx_ty}* @{name}({}) uwtable {{", ctor_params.join(", ")).unwrap();
    writeln!(self.out, "L0:").unwrap();
    let sz = self.fresh_temp();
    writeln!(self.out, "  {sz} = load i64, i64* @{name}.ctx.size").unwrap();
    let raw = self.fresh_temp();
    writeln!(self.out, "  {raw} = call i8* @runa.malloc(i64 {sz})").unwrap();
    let ctx = self.fresh_temp();
    writeln!(self.out, "  {ctx} = bitcast i8* {raw} to {ctx_ty}*").unwrap();
    let rp = self.fresh_temp();
    writeln!(self.out, "  {rp} = getelementptr {ctx_ty}, {ctx_ty}* {ctx}, i32 0, i32 0").unwrap();
    writeln!(self.out, "  store i8* null, i8** {rp}").unwrap();
    for (n, t) in params {
      let (idx, _) = self.ctx_fields[n];
      let fty = ir_type(t);
      let fp = self.fresh_temp();
      writeln!(self.out, "  {fp} = getelementptr {ctx_ty}, {ctx_ty}* {ctx}, i32 0, i32 {idx}").unwrap();
      writeln!(self.out, "  store {fty} %{n}, {fty}* {fp}").unwrap();
    }
    writeln!(self.out, "  ret {ctx_ty}* {ctx}").unwrap();
    writeln!(self.out, "}}").unwrap();
    self.out.push('\n');

    let agg_ty = format!("{{ i1, {} }}", self.gen_value_ty);
    writeln!(self.out, "define {agg_ty} @{name}.next({ctx_ty}* %ctx) uwtable {{").unwrap();
    writeln!(self.out, "entry:").unwrap();
    let rp2 = self.fresh_temp();
    writeln!(self.out, "  {rp2} = getelementptr {ctx_ty}, {ctx_ty}* %ctx, i32 0, i32 0").unwrap();
    let resume = self.fresh_temp();
    writeln!(self.out, "  {resume} = load i8*, i8** {rp2}").unwrap();
    let isnull = self.fresh_temp();
    writeln!(self.out, "  {isnull} = icmp eq i8* {resume}, null").unwrap();
    writeln!(self.out, "  br i1 {isnull}, label %{}, label %dispatch", Self::label(BlockId::ENTRY)).unwrap();
    writeln!(self.out, "dispatch:").unwrap();
    if self.yield_targets.is_empty() {
      writeln!(self.out, "  unreachable").unwrap();
    } else {
      let mut targets: Vec<BlockId> = self.yield_targets.iter().copied().collect();
      targets.sort_by_key(|b| b.as_u32());
      let labels: Vec<String> = targets.iter().map(|b| format!("label %{}", Self::label(*b))).collect();
      writeln!(self.out, "  indirectbr i8* {resume}, [ {} ]", labels.join(", ")).unwrap();
    }
    for (id, block) in flow.blocks.iter_enum() { self.block(id, block); }
    writeln!(self.out, "}}").unwrap();
  }
}
