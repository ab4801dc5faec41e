//! A Pratt parser for expressions plus recursive descent for statements and
//! top-level declarations.
//!
//! Grounded on `original_source/runac/ast.py`'s `Pratt` class: `nud`/`led`/
//! `lbp` become an explicit `parse_expr(min_bp)` loop and a `prefix`/`infix`
//! dispatch over the current token, since Rust has no metaclass registry to
//! collect node types from.

use crate::ast::*;
use crate::diagnostics::{ParseError, Point, Position, Span};
use crate::lexer::{Token, TokenKind};
use crate::symbol::{self, Keyword, Operator, Symbol};
use std::rc::Rc;

struct Parser<'a> {
  toks: Vec<&'a Token>,
  pos: usize,
  file: Rc<str>,
  lines: Vec<&'a str>,
  ids: NodeIdGen,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
  fn cur(&self) -> &'a Token { self.toks[self.pos] }

  fn line_text(&self, line: u32) -> Rc<str> { Rc::from(*self.lines.get(line as usize).unwrap_or(&"")) }

  fn pos_of(&self, span: Span) -> Position { Position::from_span(self.file.clone(), span, self.line_text(span.start.line)) }

  fn err_here(&self, msg: &str) -> ParseError {
    let t = self.cur();
    ParseError::new(self.pos_of(t.span), t.kind.class_name(), format!("{}: {}", msg, t.kind.literal()))
  }

  fn bump(&mut self) -> &'a Token {
    let t = self.toks[self.pos];
    if self.pos + 1 < self.toks.len() { self.pos += 1; }
    t
  }

  fn skip_nl(&mut self) { while matches!(self.cur().kind, TokenKind::Nl) { self.bump(); } }

  fn at_op(&self, op: Operator) -> bool { matches!(&self.cur().kind, TokenKind::Operator(o) if *o == op) }
  fn at_kw(&self, kw: Keyword) -> bool { matches!(&self.cur().kind, TokenKind::Keyword(k) if *k == kw) }

  fn expect_op(&mut self, op: Operator) -> PResult<Span> {
    if self.at_op(op) { Ok(self.bump().span) } else { Err(self.err_here(&format!("expected '{}'", op.as_str()))) }
  }

  fn expect_kw(&mut self, kw: Keyword) -> PResult<Span> {
    if self.at_kw(kw) { Ok(self.bump().span) } else { Err(self.err_here(&format!("expected '{}'", kw.as_str()))) }
  }

  fn expect_name(&mut self) -> PResult<(Symbol, Span)> {
    if let TokenKind::Name(n) = &self.cur().kind {
      let n = n.clone();
      let span = self.cur().span;
      self.bump();
      Ok((symbol::intern(&n), span))
    } else {
      Err(self.err_here("expected a name"))
    }
  }

  fn tag(&mut self, span: Span) -> Tag { Tag { id: self.ids.next(), span } }

  // ---- expressions ----

  fn parse_expr(&mut self, min_bp: u8) -> PResult<Expr> {
    let mut left = self.parse_prefix()?;
    loop {
      let Some((lbp, op)) = self.peek_infix() else { break };
      if lbp < min_bp { break; }
      left = self.parse_infix(left, lbp, op)?;
    }
    Ok(left)
  }

  fn peek_infix(&self) -> Option<(u8, InfixOp)> {
    match &self.cur().kind {
      TokenKind::Keyword(Keyword::If) => Some((5, InfixOp::Ternary)),
      TokenKind::Keyword(Keyword::Or) => Some((10, InfixOp::Bin(BinOp::Or))),
      TokenKind::Keyword(Keyword::And) => Some((15, InfixOp::Bin(BinOp::And))),
      TokenKind::Keyword(Keyword::Is) => Some((25, InfixOp::Bin(BinOp::Is))),
      TokenKind::Operator(Operator::EqEq) => Some((25, InfixOp::Bin(BinOp::Eq))),
      TokenKind::Operator(Operator::NotEq) => Some((25, InfixOp::Bin(BinOp::NotEq))),
      TokenKind::Operator(Operator::Lt) => Some((25, InfixOp::Bin(BinOp::Lt))),
      TokenKind::Operator(Operator::Gt) => Some((25, InfixOp::Bin(BinOp::Gt))),
      TokenKind::Operator(Operator::Pipe) => Some((30, InfixOp::Bin(BinOp::BitOr))),
      TokenKind::Operator(Operator::Caret) => Some((35, InfixOp::Bin(BinOp::BitXor))),
      TokenKind::Operator(Operator::Amp) => Some((40, InfixOp::Bin(BinOp::BitAnd))),
      TokenKind::Operator(Operator::Plus) => Some((50, InfixOp::Bin(BinOp::Add))),
      TokenKind::Operator(Operator::Minus) => Some((50, InfixOp::Bin(BinOp::Sub))),
      TokenKind::Operator(Operator::Star) => Some((60, InfixOp::Bin(BinOp::Mul))),
      TokenKind::Operator(Operator::Slash) => Some((60, InfixOp::Bin(BinOp::Div))),
      TokenKind::Operator(Operator::Percent) => Some((60, InfixOp::Bin(BinOp::Mod))),
      TokenKind::Keyword(Keyword::As) => Some((65, InfixOp::As)),
      TokenKind::Operator(Operator::LBracket) => Some((70, InfixOp::Elem)),
      TokenKind::Operator(Operator::LParen) => Some((70, InfixOp::Call)),
      TokenKind::Operator(Operator::Dot) => Some((80, InfixOp::Attrib)),
      _ => None,
    }
  }

  fn parse_infix(&mut self, left: Expr, lbp: u8, op: InfixOp) -> PResult<Expr> {
    let start = left.tag().span;
    match op {
      InfixOp::Ternary => {
        self.bump();
        let cond = self.parse_expr(lbp + 1)?;
        self.expect_kw(Keyword::Else)?;
        let alt = self.parse_expr(lbp)?;
        let span = Span { start: start.start, end: alt.tag().span.end };
        let tag = self.tag(span);
        Ok(Expr::Ternary(tag, Box::new(left), Box::new(cond), Box::new(alt)))
      }
      InfixOp::Bin(bop) => {
        self.bump();
        let right = self.parse_expr(lbp + 1)?;
        let span = Span { start: start.start, end: right.tag().span.end };
        let tag = self.tag(span);
        Ok(Expr::Binary(tag, bop, Box::new(left), Box::new(right)))
      }
      InfixOp::As => {
        self.bump();
        let ty = self.parse_expr(lbp + 1)?;
        let span = Span { start: start.start, end: ty.tag().span.end };
        let tag = self.tag(span);
        Ok(Expr::As(tag, Box::new(left), Box::new(ty)))
      }
      InfixOp::Elem => {
        self.bump();
        let key = self.parse_expr(0)?;
        let end = self.expect_op(Operator::RBracket)?.end;
        let tag = self.tag(Span { start: start.start, end });
        Ok(Expr::Elem(tag, Box::new(left), Box::new(key)))
      }
      InfixOp::Attrib => {
        self.bump();
        let (name, span) = self.expect_name()?;
        let tag = self.tag(Span { start: start.start, end: span.end });
        Ok(Expr::Attrib(tag, Box::new(left), name))
      }
      InfixOp::Call => {
        self.bump();
        let mut args = Vec::new();
        if !self.at_op(Operator::RParen) {
          loop {
            args.push(self.parse_call_arg()?);
            if self.at_op(Operator::Comma) { self.bump(); continue; }
            break;
          }
        }
        let end = self.expect_op(Operator::RParen)?.end;
        let tag = self.tag(Span { start: start.start, end });
        Ok(Expr::Call(tag, Box::new(left), args))
      }
    }
  }

  fn parse_call_arg(&mut self) -> PResult<Expr> {
    if let TokenKind::Name(n) = &self.cur().kind {
      let n = n.clone();
      let save = self.pos;
      let name_span = self.bump().span;
      if self.at_op(Operator::Eq) {
        self.bump();
        let val = self.parse_expr(0)?;
        let tag = self.tag(Span { start: name_span.start, end: val.tag().span.end });
        return Ok(Expr::NamedArg(tag, symbol::intern(&n), Box::new(val)));
      }
      self.pos = save;
    }
    self.parse_expr(0)
  }

  fn parse_prefix(&mut self) -> PResult<Expr> {
    let t = self.cur();
    let span = t.span;
    match &t.kind {
      TokenKind::Keyword(Keyword::Not) => {
        self.bump();
        let v = self.parse_expr(20)?;
        let tag = self.tag(Span { start: span.start, end: v.tag().span.end });
        Ok(Expr::Not(tag, Box::new(v)))
      }
      TokenKind::Operator(Operator::Dollar) => { self.bump(); self.wrap(span, Expr::Owner) }
      TokenKind::Operator(Operator::Amp) => { self.bump(); self.wrap(span, Expr::Ref) }
      TokenKind::Operator(Operator::Question) => { self.bump(); self.wrap(span, Expr::Opt) }
      TokenKind::Operator(Operator::Tilde) => { self.bump(); self.wrap(span, Expr::Mut) }
      TokenKind::Operator(Operator::LParen) => {
        self.bump();
        let mut values = vec![self.parse_expr(0)?];
        let mut is_tuple = false;
        while self.at_op(Operator::Comma) {
          is_tuple = true;
          self.bump();
          if self.at_op(Operator::RParen) { break; }
          values.push(self.parse_expr(0)?);
        }
        let end = self.expect_op(Operator::RParen)?.end;
        if is_tuple {
          let tag = self.tag(Span { start: span.start, end });
          Ok(Expr::Tuple(tag, values))
        } else {
          Ok(values.pop().unwrap())
        }
      }
      _ => self.parse_terminal(),
    }
  }

  fn wrap(&mut self, span: Span, ctor: impl FnOnce(Tag, Box<Expr>) -> Expr) -> PResult<Expr> {
    let inner = self.parse_expr(65)?;
    let tag = self.tag(Span { start: span.start, end: inner.tag().span.end });
    Ok(ctor(tag, Box::new(inner)))
  }

  fn parse_terminal(&mut self) -> PResult<Expr> {
    let t = self.bump();
    let span = t.span;
    match &t.kind {
      TokenKind::Name(n) if n == "None" => Ok(Expr::None(self.tag(span))),
      TokenKind::Name(n) if n == "True" => Ok(Expr::Bool(self.tag(span), true)),
      TokenKind::Name(n) if n == "False" => Ok(Expr::Bool(self.tag(span), false)),
      TokenKind::Name(n) => { let s = symbol::intern(n); Ok(Expr::Name(self.tag(span), s)) }
      TokenKind::Int(n) => Ok(Expr::Int(self.tag(span), n.clone())),
      TokenKind::Float(n) => Ok(Expr::Float(self.tag(span), n.clone())),
      TokenKind::String(s) => Ok(Expr::String(self.tag(span), s.clone())),
      other => Err(ParseError::new(self.pos_of(span), other.class_name(), other.literal())),
    }
  }

  // ---- statements ----

  fn parse_suite(&mut self) -> PResult<Suite> {
    self.skip_nl();
    let start = self.cur().span;
    if !matches!(self.cur().kind, TokenKind::Indent) {
      return Err(ParseError::new(self.pos_of(start), "Indent", "expected an indented block"));
    }
    self.bump();
    self.skip_nl();
    let mut stmts = Vec::new();
    loop {
      stmts.push(self.parse_stmt()?);
      self.skip_nl();
      if matches!(self.cur().kind, TokenKind::Dedent) { break; }
    }
    self.bump();
    Ok(Suite { stmts })
  }

  fn parse_type_expr(&mut self) -> PResult<Expr> { self.parse_expr(65) }

  fn parse_stmt(&mut self) -> PResult<Stmt> {
    let t = self.cur();
    let span = t.span;
    match &t.kind {
      TokenKind::Keyword(Keyword::Return) => {
        self.bump();
        let value = if matches!(self.cur().kind, TokenKind::Nl) { None } else { Some(self.parse_expr(0)?) };
        Ok(Stmt::Return(self.tag(span), value))
      }
      TokenKind::Keyword(Keyword::Yield) => {
        self.bump();
        let value = self.parse_expr(0)?;
        Ok(Stmt::Yield(self.tag(span), Box::new(value)))
      }
      TokenKind::Keyword(Keyword::Raise) => {
        self.bump();
        let value = self.parse_expr(0)?;
        Ok(Stmt::Raise(self.tag(span), Box::new(value)))
      }
      TokenKind::Keyword(Keyword::Pass) => { self.bump(); Ok(Stmt::Pass(self.tag(span))) }
      TokenKind::Keyword(Keyword::Break) => { self.bump(); Ok(Stmt::Break(self.tag(span))) }
      TokenKind::Keyword(Keyword::Continue) => { self.bump(); Ok(Stmt::Continue(self.tag(span))) }
      TokenKind::Keyword(Keyword::If) => self.parse_if(),
      TokenKind::Keyword(Keyword::While) => self.parse_while(),
      TokenKind::Keyword(Keyword::For) => self.parse_for(),
      TokenKind::Keyword(Keyword::Try) => self.parse_try(),
      TokenKind::Keyword(Keyword::Import) => {
        self.bump();
        let (name, _) = self.expect_name()?;
        Ok(Stmt::Import(self.tag(span), name))
      }
      TokenKind::Keyword(Keyword::From) => self.parse_from_import(),
      _ => self.parse_simple_stmt(),
    }
  }

  fn parse_simple_stmt(&mut self) -> PResult<Stmt> {
    let left = self.parse_expr(0)?;
    let span = left.tag().span;
    if self.at_op(Operator::Eq) {
      self.bump();
      let right = self.parse_expr(0)?;
      Ok(Stmt::Assign(self.tag(Span { start: span.start, end: right.tag().span.end }), Box::new(left), Box::new(right)))
    } else if self.at_op(Operator::PlusEq) {
      self.bump();
      let right = self.parse_expr(0)?;
      Ok(Stmt::IAdd(self.tag(Span { start: span.start, end: right.tag().span.end }), Box::new(left), Box::new(right)))
    } else {
      // A bare expression statement; only calls are meaningful here but we
      // don't reject others, matching the source grammar's permissiveness.
      Ok(Stmt::ExprStmt(self.tag(span), Box::new(left)))
    }
  }

  fn parse_if(&mut self) -> PResult<Stmt> {
    let span = self.bump().span; // `if`
    let mut blocks = Vec::new();
    let cond = self.parse_expr(0)?;
    self.expect_op(Operator::Colon)?;
    let suite = self.parse_suite()?;
    blocks.push((Some(cond), suite));

    loop {
      self.skip_nl();
      if self.at_kw(Keyword::Elif) {
        self.bump();
        let cond = self.parse_expr(0)?;
        self.expect_op(Operator::Colon)?;
        let suite = self.parse_suite()?;
        blocks.push((Some(cond), suite));
      } else if self.at_kw(Keyword::Else) {
        self.bump();
        self.expect_op(Operator::Colon)?;
        let suite = self.parse_suite()?;
        blocks.push((None, suite));
        break;
      } else {
        break;
      }
    }
    Ok(Stmt::If(self.tag(span), blocks))
  }

  fn parse_while(&mut self) -> PResult<Stmt> {
    let span = self.bump().span;
    let cond = self.parse_expr(0)?;
    self.expect_op(Operator::Colon)?;
    let suite = self.parse_suite()?;
    Ok(Stmt::While(self.tag(span), Box::new(cond), suite))
  }

  fn parse_for(&mut self) -> PResult<Stmt> {
    let span = self.bump().span;
    let (lvar, _) = self.expect_name()?;
    self.expect_kw(Keyword::In)?;
    let source = self.parse_expr(0)?;
    self.expect_op(Operator::Colon)?;
    let suite = self.parse_suite()?;
    Ok(Stmt::For(self.tag(span), lvar, Box::new(source), suite))
  }

  fn parse_try(&mut self) -> PResult<Stmt> {
    let span = self.bump().span;
    self.expect_op(Operator::Colon)?;
    let suite = self.parse_suite()?;
    let mut catches = Vec::new();
    loop {
      self.skip_nl();
      if !self.at_kw(Keyword::Except) { break; }
      self.bump();
      let (ty, _) = self.expect_name()?;
      self.expect_op(Operator::Colon)?;
      let handler = self.parse_suite()?;
      catches.push(Catch { ty, suite: handler });
    }
    Ok(Stmt::TryBlock(self.tag(span), suite, catches))
  }

  fn parse_from_import(&mut self) -> PResult<Stmt> {
    let span = self.bump().span;
    let base = self.parse_expr(80)?;
    self.expect_kw(Keyword::Import)?;
    let mut names = vec![self.expect_name()?.0];
    while self.at_op(Operator::Comma) {
      self.bump();
      names.push(self.expect_name()?.0);
    }
    Ok(Stmt::RelImport(self.tag(span), Box::new(base), names))
  }

  // ---- top level ----

  fn parse_args(&mut self) -> PResult<Vec<Arg>> {
    self.expect_op(Operator::LParen)?;
    let mut args = Vec::new();
    if !self.at_op(Operator::RParen) {
      loop {
        let (name, span) = self.expect_name()?;
        let ty = if self.at_op(Operator::Colon) {
          self.bump();
          Some(self.parse_type_expr()?)
        } else {
          None
        };
        args.push(Arg { name, ty, span });
        if self.at_op(Operator::Comma) { self.bump(); continue; }
        break;
      }
    }
    self.expect_op(Operator::RParen)?;
    Ok(args)
  }

  fn parse_function(&mut self, decor: Decor) -> PResult<TopLevel> {
    let span = self.expect_kw(Keyword::Def)?;
    let (name, _) = self.expect_name()?;
    let args = self.parse_args()?;
    let rtype = if self.at_op(Operator::Arrow) { self.bump(); Some(self.parse_type_expr()?) } else { None };

    if !self.at_op(Operator::Colon) {
      // No `:` — this is an external declaration.
      return Ok(TopLevel::Decl(Decl { name, args, rtype, span }));
    }
    self.expect_op(Operator::Colon)?;
    let suite = self.parse_suite()?;
    Ok(TopLevel::Function(Function { decor, name, args, rtype, suite, span }))
  }

  fn parse_class(&mut self) -> PResult<TopLevel> {
    let span = self.expect_kw(Keyword::Class)?;
    let (name, _) = self.expect_name()?;
    let params = self.parse_template_params()?;
    self.expect_op(Operator::Colon)?;
    self.skip_nl();
    let suite_span = self.cur().span;
    if !matches!(self.cur().kind, TokenKind::Indent) {
      return Err(ParseError::new(self.pos_of(suite_span), "Indent", "expected class body"));
    }
    self.bump();
    self.skip_nl();
    let mut attribs = Vec::new();
    let mut methods = Vec::new();
    loop {
      if self.at_kw(Keyword::Pass) { self.bump(); self.skip_nl(); if matches!(self.cur().kind, TokenKind::Dedent) { break; } continue; }
      if self.at_kw(Keyword::Def) {
        if let TopLevel::Function(f) = self.parse_function(Decor::new())? { methods.push(f); }
      } else {
        let ty = self.parse_type_expr()?;
        let (aname, _) = self.expect_name()?;
        attribs.push((ty, aname));
      }
      self.skip_nl();
      if matches!(self.cur().kind, TokenKind::Dedent) { break; }
    }
    self.bump();
    Ok(TopLevel::Class(Class { name, params, attribs, methods, span }))
  }

  fn parse_template_params(&mut self) -> PResult<Vec<Symbol>> {
    if !self.at_op(Operator::LBracket) { return Ok(Vec::new()); }
    self.bump();
    let mut params = vec![self.expect_name()?.0];
    while self.at_op(Operator::Comma) { self.bump(); params.push(self.expect_name()?.0); }
    self.expect_op(Operator::RBracket)?;
    Ok(params)
  }

  fn parse_trait(&mut self) -> PResult<TopLevel> {
    let span = self.expect_kw(Keyword::Trait)?;
    let (name, _) = self.expect_name()?;
    let params = self.parse_template_params()?;
    self.expect_op(Operator::Colon)?;
    self.skip_nl();
    if !matches!(self.cur().kind, TokenKind::Indent) {
      return Err(ParseError::new(self.pos_of(span), "Indent", "expected trait body"));
    }
    self.bump();
    self.skip_nl();
    let mut methods = Vec::new();
    loop {
      if let TopLevel::Decl(d) = self.parse_function(Decor::new())? { methods.push(d); }
      else { return Err(self.err_here("trait methods must be declarations")); }
      self.skip_nl();
      if matches!(self.cur().kind, TokenKind::Dedent) { break; }
    }
    self.bump();
    Ok(TopLevel::Trait(Trait { name, params, methods, span }))
  }

  fn parse_top(&mut self) -> PResult<TopLevel> {
    let mut decor = Decor::new();
    while let TokenKind::Decorator(name) = &self.cur().kind {
      decor.push(symbol::intern(name));
      self.bump();
      self.skip_nl();
    }
    match &self.cur().kind {
      TokenKind::Keyword(Keyword::Def) => self.parse_function(decor),
      TokenKind::Keyword(Keyword::Class) => self.parse_class(),
      TokenKind::Keyword(Keyword::Trait) => self.parse_trait(),
      TokenKind::Keyword(Keyword::Import) | TokenKind::Keyword(Keyword::From) => {
        let stmt = self.parse_stmt()?;
        Ok(TopLevel::Import(stmt))
      }
      _ => {
        let left = self.parse_expr(0)?;
        let span = left.tag().span;
        self.expect_op(Operator::Eq)?;
        let right = self.parse_expr(0)?;
        let Expr::Name(_, name) = left else { return Err(self.err_here("expected a name on the left of a top-level assignment")); };
        Ok(TopLevel::Assign(self.tag(span), name, right))
      }
    }
  }

  fn parse_file(&mut self) -> PResult<File> {
    let mut items = Vec::new();
    self.skip_nl();
    while !matches!(self.cur().kind, TokenKind::End) {
      items.push(self.parse_top()?);
      self.skip_nl();
    }
    Ok(File { items })
  }
}

#[derive(Clone, Copy)]
enum InfixOp { Ternary, Bin(BinOp), As, Elem, Attrib, Call }

/// Parse a full source file's token stream (as produced by
/// [`crate::lexer::lex`], comments included) into an AST.
pub fn parse(file: impl Into<Rc<str>>, src: &str, tokens: &[Token]) -> PResult<File> {
  let toks: Vec<&Token> = tokens.iter().filter(|t| !matches!(t.kind, TokenKind::Comment)).collect();
  let mut parser = Parser {
    toks,
    pos: 0,
    file: file.into(),
    lines: src.lines().collect(),
    ids: NodeIdGen::new(),
  };
  parser.parse_file()
}

/// Ensure every position's zero-based [`Point`] can be rendered; kept as a
/// free function so other modules building synthetic nodes (e.g. auto
/// `Return` insertion) can reuse it without constructing a [`Parser`].
#[must_use] pub fn synthetic_span(at: Point) -> Span { Span::point(at) }

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::lex;

  fn parse_src(src: &str) -> File {
    let toks = lex("t.rns", src).unwrap();
    parse("t.rns", src, &toks).unwrap()
  }

  #[test]
  fn parses_hello_world() {
    let f = parse_src("def main() -> i32:\n\tprint('Hello, world!\\n')\n\treturn 0\n");
    assert_eq!(f.items.len(), 1);
    let TopLevel::Function(func) = &f.items[0] else { panic!("expected a function") };
    assert_eq!(func.suite.stmts.len(), 2);
    assert!(matches!(func.suite.stmts[0], Stmt::ExprStmt(_, _)));
    assert!(matches!(func.suite.stmts[1], Stmt::Return(_, Some(_))));
  }

  #[test]
  fn parses_arithmetic_precedence() {
    let f = parse_src("def main() -> int:\n\treturn 2 + 3 * 4\n");
    let TopLevel::Function(func) = &f.items[0] else { panic!() };
    let Stmt::Return(_, Some(Expr::Binary(_, BinOp::Add, _, rhs))) = &func.suite.stmts[0] else {
      panic!("expected top-level add");
    };
    assert!(matches!(**rhs, Expr::Binary(_, BinOp::Mul, ..)));
  }

  #[test]
  fn parses_if_elif_else() {
    let f = parse_src("def f(x: int) -> int:\n\tif x:\n\t\treturn 1\n\telif x:\n\t\treturn 2\n\telse:\n\t\treturn 3\n");
    let TopLevel::Function(func) = &f.items[0] else { panic!() };
    let Stmt::If(_, blocks) = &func.suite.stmts[0] else { panic!("expected if") };
    assert_eq!(blocks.len(), 3);
    assert!(blocks[2].0.is_none());
  }

  #[test]
  fn parses_for_loop() {
    let f = parse_src("def f() -> int:\n\tfor i in range(3):\n\t\tpass\n\treturn 0\n");
    let TopLevel::Function(func) = &f.items[0] else { panic!() };
    assert!(matches!(func.suite.stmts[0], Stmt::For(..)));
  }

  #[test]
  fn parses_class_with_method() {
    let f = parse_src("class Point:\n\tint x\n\tdef len(self) -> int:\n\t\treturn self.x\n");
    let TopLevel::Class(c) = &f.items[0] else { panic!("expected class") };
    assert_eq!(c.attribs.len(), 1);
    assert_eq!(c.methods.len(), 1);
  }
}
