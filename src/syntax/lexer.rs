#![allow(non_camel_case_types)]

use logos::Logos;

use super::SyntaxError;
use crate::buffer::Buffer;

/// A lexed token. Identifier, number and string tokens carry no payload;
/// `index` points into the lexer's identifier or literal side table.
#[derive(Clone, Copy, Debug)]
pub struct Token {
  pub kind: TokenKind,
  pub line: u32,
  pub column: u32,
  pub index: u32,
}

/// Identifier tokens with the same bytes share one table entry; the entry
/// counts how many tokens reference it.
pub struct Identifier<'src> {
  pub name: &'src str,
  pub references: u32,
}

#[derive(Clone, Copy)]
pub enum Literal<'src> {
  Number(f64),
  Str(&'src str),
}

/// Identifier token equality: same kind, same table entry.
pub fn token_equals(a: &Token, b: &Token) -> bool {
  a.kind == TokenKind::Lit_Ident && b.kind == TokenKind::Lit_Ident && a.index == b.index
}

/// Produces one token per call. Whitespace and comments are skipped;
/// malformed input is reported and surfaces as `Tok_Unknown` so lexing
/// can continue and collect further diagnostics.
pub struct Lexer<'src> {
  src: &'src str,
  module: &'src str,
  inner: logos::Lexer<'src, TokenKind>,
  pos: usize,
  line: u32,
  column: u32,
  pub identifiers: Buffer<Identifier<'src>>,
  pub literals: Buffer<Literal<'src>>,
  pub errors: Vec<SyntaxError>,
}

impl<'src> Lexer<'src> {
  pub fn new(src: &'src str, module: &'src str) -> Self {
    Self {
      src,
      module,
      inner: TokenKind::lexer(src),
      pos: 0,
      line: 1,
      column: 1,
      identifiers: Buffer::new(),
      literals: Buffer::new(),
      errors: Vec::new(),
    }
  }

  pub fn next_token(&mut self) -> Token {
    loop {
      let Some(result) = self.inner.next() else {
        self.advance_to(self.src.len());
        return self.token(TokenKind::Tok_Eof, 0);
      };
      let span = self.inner.span();
      let slice = self.inner.slice();
      self.advance_to(span.start);

      match result {
        Ok(
          TokenKind::_Tok_Whitespace | TokenKind::_Tok_LineComment | TokenKind::_Tok_BlockComment,
        ) => continue,
        Ok(TokenKind::Lit_Ident) => return self.identifier(slice),
        Ok(TokenKind::Lit_Number) => return self.number(slice),
        Ok(TokenKind::Lit_String) => {
          // everything between the quotes is the literal
          let index = self.literal(Literal::Str(&slice[1..slice.len() - 1]));
          return self.token(TokenKind::Lit_String, index);
        }
        Ok(kind) => return self.token(kind, 0),
        Err(()) => {
          if slice.starts_with('"') {
            self.error("unterminated string");
          } else {
            self.error("unknown character");
          }
          return self.token(TokenKind::Tok_Unknown, 0);
        }
      }
    }
  }

  fn token(&self, kind: TokenKind, index: u32) -> Token {
    Token {
      kind,
      line: self.line,
      column: self.column,
      index,
    }
  }

  fn identifier(&mut self, name: &'src str) -> Token {
    for i in 0..self.identifiers.len() {
      if self.identifiers[i].name == name {
        self.identifiers[i].references += 1;
        return self.token(TokenKind::Lit_Ident, i as u32);
      }
    }
    self.identifiers.push(Identifier {
      name,
      references: 1,
    });
    self.token(TokenKind::Lit_Ident, (self.identifiers.len() - 1) as u32)
  }

  fn number(&mut self, slice: &str) -> Token {
    match slice.parse::<f64>() {
      Ok(number) => {
        let index = self.literal(Literal::Number(number));
        self.token(TokenKind::Lit_Number, index)
      }
      Err(_) => {
        self.error("invalid number");
        self.token(TokenKind::Tok_Unknown, 0)
      }
    }
  }

  fn literal(&mut self, literal: Literal<'src>) -> u32 {
    self.literals.push(literal);
    (self.literals.len() - 1) as u32
  }

  /// Scan forward to `offset`, updating the line and column counters.
  fn advance_to(&mut self, offset: usize) {
    for &b in &self.src.as_bytes()[self.pos..offset] {
      if b == b'\n' {
        self.line += 1;
        self.column = 1;
      } else {
        self.column += 1;
      }
    }
    self.pos = offset;
  }

  fn error(&mut self, message: &str) {
    self.errors.push(SyntaxError::lex(
      self.module,
      self.line,
      self.column,
      message,
    ));
  }
}

#[derive(Clone, Copy, Debug, Logos, PartialEq, Eq)]
pub enum TokenKind {
  // Keywords
  #[token("else")]
  Kw_Else,
  #[token("for")]
  Kw_For,
  #[token("fn")]
  Kw_Fn,
  #[token("if")]
  Kw_If,
  #[token("match")]
  Kw_Match,
  #[token("return")]
  Kw_Return,
  #[token("var")]
  Kw_Var,
  #[token("while")]
  Kw_While,

  // Brackets
  #[token("{")]
  Brk_CurlyL,
  #[token("}")]
  Brk_CurlyR,
  #[token("(")]
  Brk_ParenL,
  #[token(")")]
  Brk_ParenR,
  #[token("[")]
  Brk_SquareL,
  #[token("]")]
  Brk_SquareR,

  // Misc characters
  #[token(",")]
  Tok_Comma,
  #[token(";")]
  Tok_Semicolon,
  #[token(":")]
  Tok_Colon,
  #[token("?")]
  Tok_Question,

  // Operators
  #[token("!")]
  Op_Bang,
  #[token("!=")]
  Op_BangEqual,
  #[token("%")]
  Op_Percent,
  #[token("%=")]
  Op_PercentEqual,
  #[token("&")]
  Op_Amp,
  #[token("&&")]
  Op_AmpAmp,
  #[token("&&=")]
  Op_AmpAmpEqual,
  #[token("&=")]
  Op_AmpEqual,
  #[token("*")]
  Op_Star,
  #[token("**")]
  Op_StarStar,
  #[token("**=")]
  Op_StarStarEqual,
  #[token("*=")]
  Op_StarEqual,
  #[token("+")]
  Op_Plus,
  #[token("++")]
  Op_PlusPlus,
  #[token("+=")]
  Op_PlusEqual,
  #[token("-")]
  Op_Minus,
  #[token("--")]
  Op_MinusMinus,
  #[token("-=")]
  Op_MinusEqual,
  #[token(".")]
  Op_Dot,
  #[token("..")]
  Op_DotDot,
  #[token("...")]
  Op_DotDotDot,
  #[token("/")]
  Op_Slash,
  #[token("/=")]
  Op_SlashEqual,
  #[token("<")]
  Op_Less,
  #[token("<=")]
  Op_LessEqual,
  #[token("<=>")]
  Op_LessEqualMore,
  #[token("<<")]
  Op_LessLess,
  #[token("<<=")]
  Op_LessLessEqual,
  #[token("=")]
  Op_Equal,
  #[token("==")]
  Op_EqualEqual,
  #[token("=>")]
  Op_Arrow,
  #[token(">")]
  Op_More,
  #[token(">=")]
  Op_MoreEqual,
  #[token(">>")]
  Op_MoreMore,
  #[token(">>=")]
  Op_MoreMoreEqual,
  #[token("?.")]
  Op_QuestionDot,
  #[token("?:")]
  Op_QuestionColon,
  #[token("??")]
  Op_QuestionQuestion,
  #[token("??=")]
  Op_QuestionQuestionEqual,
  #[token("^")]
  Op_Caret,
  #[token("^=")]
  Op_CaretEqual,
  #[token("|")]
  Op_Pipe,
  #[token("|=")]
  Op_PipeEqual,
  #[token("||")]
  Op_PipePipe,
  #[token("||=")]
  Op_PipePipeEqual,
  #[token("~")]
  Op_Tilde,

  // Literals
  #[token("null")]
  Lit_Null,
  #[token("true")]
  Lit_True,
  #[token("false")]
  Lit_False,
  /// `123`, `1.5`, `.5`, `1e10`
  #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
  #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
  Lit_Number,
  /// Double-quoted, no escapes.
  #[regex(r#""[^"]*""#)]
  Lit_String,
  #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
  Lit_Ident,

  #[doc(hidden)]
  #[regex(r"[ \t\r\n\f]+")]
  _Tok_Whitespace,
  #[doc(hidden)]
  #[regex(r"//[^\n]*")]
  _Tok_LineComment,
  #[doc(hidden)]
  #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
  _Tok_BlockComment,

  Tok_Unknown,
  Tok_Eof,
}

impl TokenKind {
  pub fn name(&self) -> &'static str {
    match self {
      TokenKind::Kw_Else => "else",
      TokenKind::Kw_For => "for",
      TokenKind::Kw_Fn => "fn",
      TokenKind::Kw_If => "if",
      TokenKind::Kw_Match => "match",
      TokenKind::Kw_Return => "return",
      TokenKind::Kw_Var => "var",
      TokenKind::Kw_While => "while",
      TokenKind::Brk_CurlyL => "{",
      TokenKind::Brk_CurlyR => "}",
      TokenKind::Brk_ParenL => "(",
      TokenKind::Brk_ParenR => ")",
      TokenKind::Brk_SquareL => "[",
      TokenKind::Brk_SquareR => "]",
      TokenKind::Tok_Comma => ",",
      TokenKind::Tok_Semicolon => ";",
      TokenKind::Tok_Colon => ":",
      TokenKind::Tok_Question => "?",
      TokenKind::Op_Bang => "!",
      TokenKind::Op_BangEqual => "!=",
      TokenKind::Op_Percent => "%",
      TokenKind::Op_PercentEqual => "%=",
      TokenKind::Op_Amp => "&",
      TokenKind::Op_AmpAmp => "&&",
      TokenKind::Op_AmpAmpEqual => "&&=",
      TokenKind::Op_AmpEqual => "&=",
      TokenKind::Op_Star => "*",
      TokenKind::Op_StarStar => "**",
      TokenKind::Op_StarStarEqual => "**=",
      TokenKind::Op_StarEqual => "*=",
      TokenKind::Op_Plus => "+",
      TokenKind::Op_PlusPlus => "++",
      TokenKind::Op_PlusEqual => "+=",
      TokenKind::Op_Minus => "-",
      TokenKind::Op_MinusMinus => "--",
      TokenKind::Op_MinusEqual => "-=",
      TokenKind::Op_Dot => ".",
      TokenKind::Op_DotDot => "..",
      TokenKind::Op_DotDotDot => "...",
      TokenKind::Op_Slash => "/",
      TokenKind::Op_SlashEqual => "/=",
      TokenKind::Op_Less => "<",
      TokenKind::Op_LessEqual => "<=",
      TokenKind::Op_LessEqualMore => "<=>",
      TokenKind::Op_LessLess => "<<",
      TokenKind::Op_LessLessEqual => "<<=",
      TokenKind::Op_Equal => "=",
      TokenKind::Op_EqualEqual => "==",
      TokenKind::Op_Arrow => "=>",
      TokenKind::Op_More => ">",
      TokenKind::Op_MoreEqual => ">=",
      TokenKind::Op_MoreMore => ">>",
      TokenKind::Op_MoreMoreEqual => ">>=",
      TokenKind::Op_QuestionDot => "?.",
      TokenKind::Op_QuestionColon => "?:",
      TokenKind::Op_QuestionQuestion => "??",
      TokenKind::Op_QuestionQuestionEqual => "??=",
      TokenKind::Op_Caret => "^",
      TokenKind::Op_CaretEqual => "^=",
      TokenKind::Op_Pipe => "|",
      TokenKind::Op_PipeEqual => "|=",
      TokenKind::Op_PipePipe => "||",
      TokenKind::Op_PipePipeEqual => "||=",
      TokenKind::Op_Tilde => "~",
      TokenKind::Lit_Null => "null",
      TokenKind::Lit_True => "true",
      TokenKind::Lit_False => "false",
      TokenKind::Lit_Number => "number",
      TokenKind::Lit_String => "string",
      TokenKind::Lit_Ident => "identifier",
      TokenKind::_Tok_Whitespace => "<whitespace>",
      TokenKind::_Tok_LineComment | TokenKind::_Tok_BlockComment => "<comment>",
      TokenKind::Tok_Unknown => "<unknown>",
      TokenKind::Tok_Eof => "<eof>",
    }
  }
}
