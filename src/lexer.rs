//! Byte stream to token stream, with indentation promoted to explicit
//! `Indent`/`Dedent` tokens.
//!
//! Grounded on `original_source/runac/tokenizer.py`: tokens are produced
//! line by line; a line's indentation is compared to the running level
//! only on the first token matched on that line, and only when that line
//! produced at least one non-whitespace token (a wholly blank line never
//! touches the indent level; a comment-only line does, since the comment
//! token itself stands in as "the first token on the line" before later
//! stages filter comments out).

use std::rc::Rc;
use crate::diagnostics::{ParseError, Point, Position, Span};
use crate::symbol::{Keyword, Operator};

/// A lexical token and the span of source it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  /// What kind of token this is.
  pub kind: TokenKind,
  /// Where in the source it was found.
  pub span: Span,
}

/// The tagged union of lexical token classes.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  /// An identifier that is not a reserved keyword.
  Name(String),
  /// An integer literal, stored as its original digit text.
  Int(String),
  /// A floating point literal, stored as its original digit text.
  Float(String),
  /// A quoted string literal, with quotes stripped and no escape processing
  /// beyond what the source matcher captures.
  String(String),
  /// A reserved word.
  Keyword(Keyword),
  /// A fixed-spelling operator or punctuation token.
  Operator(Operator),
  /// A `@name` decorator applying to the following `def`/`class`/`trait`.
  Decorator(String),
  /// Synthetic: indentation increased by one tab from the previous line.
  Indent,
  /// Synthetic: indentation decreased by one tab from the previous line.
  Dedent,
  /// End of a logical line.
  Nl,
  /// End of input; always the last token, preceded by enough `Dedent`s to
  /// return to level 0.
  End,
  /// A `#`-prefixed comment; filtered out by the parser before any grammar
  /// production sees it, but retained at the lexer level for `tokens` output.
  Comment,
}

impl TokenKind {
  /// The class name as printed by the `tokens` CLI command, matching each
  /// variant's identifier.
  #[must_use] pub fn class_name(&self) -> &'static str {
    match self {
      Self::Name(_) => "Name", Self::Int(_) => "Int", Self::Float(_) => "Float",
      Self::String(_) => "String", Self::Keyword(_) => "Keyword", Self::Operator(_) => "Operator",
      Self::Decorator(_) => "Decorator", Self::Indent => "Indent", Self::Dedent => "Dedent",
      Self::Nl => "NL", Self::End => "End", Self::Comment => "Comment",
    }
  }

  /// The literal text this token was built from, used for `tokens` output
  /// and for embedding the offending token in a [`ParseError`].
  #[must_use] pub fn literal(&self) -> String {
    match self {
      Self::Name(s) | Self::Int(s) | Self::Float(s) | Self::String(s) | Self::Decorator(s) => s.clone(),
      Self::Keyword(k) => k.as_str().to_owned(),
      Self::Operator(o) => o.as_str().to_owned(),
      Self::Indent => "INDENT".to_owned(),
      Self::Dedent => "DEDENT".to_owned(),
      Self::Nl => "\\n".to_owned(),
      Self::End => "EOF".to_owned(),
      Self::Comment => "#".to_owned(),
    }
  }
}

/// Longest-match-first fixed spellings for [`Operator`], tried in this
/// order so that e.g. `->` is not lexed as `-` followed by `>`.
const OPERATOR_SPELLINGS: &[&str] = &[
  "->", "+=", "==", "!=", ">=", "<=",
  "[", "]", "+", "-", "*", "/", "{", "}", "<", ">", ".", "&", "$", "|", "^", "~", "%",
  "(", ")", "=", ",", ":", "?",
];

struct Lexer<'a> {
  file: Rc<str>,
  lines: Vec<&'a str>,
  tokens: Vec<Token>,
  level: u32,
}

impl<'a> Lexer<'a> {
  fn line_text(&self, line: u32) -> Rc<str> {
    Rc::from(*self.lines.get(line as usize).unwrap_or(&""))
  }

  fn err(&self, line: u32, col: u32, kind: &str, literal: &str) -> ParseError {
    let pos = Position::point(self.file.clone(), Point::new(line, col), self.line_text(line));
    ParseError::new(pos, kind, literal)
  }

  fn push(&mut self, kind: TokenKind, line: u32, start_col: u32, end_col: u32) {
    self.tokens.push(Token {
      kind,
      span: Span { start: Point::new(line, start_col), end: Point::new(line, end_col) },
    });
  }

  /// Lex one logical line's worth of tokens starting past its leading tabs.
  /// Returns whether any non-whitespace token was produced, which governs
  /// whether this line participates in indent-level comparison.
  fn lex_line(&mut self, line_no: u32, text: &str, indent: u32) -> Result<bool, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut col = indent as usize;
    let mut produced_any = false;
    let mut indent_checked = false;

    while col < chars.len() {
      let c = chars[col];
      if c == ' ' || c == '\t' { col += 1; continue; }
      if c == '#' {
        if !indent_checked { self.check_indent(line_no, indent); indent_checked = true; }
        let start = col;
        col = chars.len();
        self.push(TokenKind::Comment, line_no, start as u32, col as u32);
        produced_any = true;
        break;
      }

      if !indent_checked { self.check_indent(line_no, indent); indent_checked = true; }
      produced_any = true;

      if c == '\'' || c == '"' {
        let quote = c;
        let start = col;
        col += 1;
        while col < chars.len() && chars[col] != quote { col += 1; }
        if col >= chars.len() {
          return Err(self.err(line_no, start as u32, "String", "unterminated string literal"));
        }
        let value: String = chars[start + 1 .. col].iter().collect();
        col += 1;
        self.push(TokenKind::String(value), line_no, start as u32, col as u32);
        continue;
      }

      if c == '@' {
        let start = col;
        col += 1;
        let name_start = col;
        while col < chars.len() && (chars[col].is_alphanumeric() || chars[col] == '_') { col += 1; }
        let name: String = chars[name_start .. col].iter().collect();
        self.push(TokenKind::Decorator(name), line_no, start as u32, col as u32);
        continue;
      }

      if c.is_ascii_digit() || (c == '-' && col + 1 < chars.len() && chars[col + 1].is_ascii_digit()
        && self.tokens.last().is_none_or(|t| !matches!(t.kind,
          TokenKind::Name(_) | TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Operator(Operator::RParen)
            | TokenKind::Operator(Operator::RBracket)))) {
        let start = col;
        if c == '-' { col += 1; }
        let mut is_float = false;
        while col < chars.len() && (chars[col].is_ascii_digit() || chars[col] == '.') {
          if chars[col] == '.' { is_float = true; }
          col += 1;
        }
        let text: String = chars[start .. col].iter().collect();
        let kind = if is_float { TokenKind::Float(text) } else { TokenKind::Int(text) };
        self.push(kind, line_no, start as u32, col as u32);
        continue;
      }

      if c.is_alphabetic() || c == '_' {
        let start = col;
        while col < chars.len() && (chars[col].is_alphanumeric() || chars[col] == '_') { col += 1; }
        let word: String = chars[start .. col].iter().collect();
        let kind = Keyword::from_str(&word).map_or_else(|| TokenKind::Name(word.clone()), TokenKind::Keyword);
        self.push(kind, line_no, start as u32, col as u32);
        continue;
      }

      let rest: String = chars[col ..].iter().collect();
      let matched = OPERATOR_SPELLINGS.iter().find(|spelling| rest.starts_with(*spelling));
      if let Some(spelling) = matched {
        let start = col;
        col += spelling.chars().count();
        // "is" followed immediately by another token participates as a keyword,
        // handled above; here we only match punctuation/operator spellings.
        self.push(TokenKind::Operator(Operator::from_str(spelling).unwrap()), line_no, start as u32, col as u32);
        continue;
      }

      return Err(self.err(line_no, col as u32, "char", &c.to_string()));
    }

    Ok(produced_any)
  }

  fn check_indent(&mut self, line_no: u32, indent: u32) {
    match indent.cmp(&self.level) {
      std::cmp::Ordering::Equal => {}
      std::cmp::Ordering::Greater => {
        self.push(TokenKind::Indent, line_no, 0, indent);
        self.level = indent;
      }
      std::cmp::Ordering::Less => {
        self.push(TokenKind::Dedent, line_no, 0, indent);
        self.level = indent;
      }
    }
  }
}

/// Lex a complete source file into a flat token stream, including the
/// trailing `Nl`/`Dedent`*/`End` sequence.
pub fn lex(file: impl Into<Rc<str>>, src: &str) -> Result<Vec<Token>, ParseError> {
  let file = file.into();
  let lines: Vec<&str> = src.lines().collect();
  let mut lexer = Lexer { file, lines: lines.clone(), tokens: Vec::new(), level: 0 };

  let mut prev_line_had_content = false;
  for (i, line) in lines.iter().enumerate() {
    let line_no = u32::try_from(i).expect("absurdly large source file");
    let indent = line.chars().take_while(|&c| c == '\t').count() as u32;

    if prev_line_had_content {
      lexer.push(TokenKind::Nl, line_no.saturating_sub(1), 0, 0);
    }

    let produced = lexer.lex_line(line_no, line, indent)?;
    prev_line_had_content = produced;
  }

  let last_line = u32::try_from(lines.len()).unwrap_or(0);
  lexer.push(TokenKind::Nl, last_line.saturating_sub(1), 0, 0);
  while lexer.level > 0 {
    lexer.push(TokenKind::Dedent, last_line, 0, 0);
    lexer.level -= 1;
  }
  lexer.push(TokenKind::End, last_line, 0, 0);

  Ok(lexer.tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    lex("t.rns", src).unwrap().into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn simple_assignment_round_trips() {
    let ks = kinds("x = 1\n");
    assert_eq!(ks, vec![
      TokenKind::Name("x".into()),
      TokenKind::Operator(Operator::Eq),
      TokenKind::Int("1".into()),
      TokenKind::Nl,
      TokenKind::End,
    ]);
  }

  #[test]
  fn indent_and_dedent_are_balanced() {
    let ks = kinds("def f():\n\treturn 1\nx = 2\n");
    let indents = ks.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
    let dedents = ks.iter().filter(|k| matches!(k, TokenKind::Dedent)).count();
    assert_eq!(indents, dedents);
    assert_eq!(indents, 1);
  }

  #[test]
  fn trailing_dedents_return_to_level_zero() {
    let ks = kinds("def f():\n\tif True:\n\t\treturn 1\n");
    // two indents in, and the lexer must emit two dedents to close out at EOF.
    let indents = ks.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
    let dedents = ks.iter().filter(|k| matches!(k, TokenKind::Dedent)).count();
    assert_eq!(indents, 2);
    assert_eq!(dedents, 2);
    assert!(matches!(ks.last(), Some(TokenKind::End)));
  }

  #[test]
  fn blank_lines_do_not_affect_indentation() {
    let ks = kinds("def f():\n\treturn 1\n\n\treturn 2\n");
    // blank line in the middle of a suite must not trigger a spurious
    // indent/dedent pair.
    let indents = ks.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
    let dedents = ks.iter().filter(|k| matches!(k, TokenKind::Dedent)).count();
    assert_eq!(indents, 1);
    assert_eq!(dedents, 1);
  }

  #[test]
  fn string_and_comment_literals() {
    let ks = kinds("x = 'hi' # comment\n");
    assert!(ks.iter().any(|k| matches!(k, TokenKind::String(s) if s == "hi")));
    assert!(ks.iter().any(|k| matches!(k, TokenKind::Comment)));
  }
}
