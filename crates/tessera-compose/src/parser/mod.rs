//! `.tsr` file parser built on `nom`.
//!
//! Transforms raw `.tsr` text into a validated AST through lexing,
//! recursive-descent parsing, and structural checks.

pub mod ast;
pub mod lexer;
pub mod validator;

use std::collections::BTreeMap;

use tessera_common::error::{Result, TesseraError};
use tessera_common::types::Value;
use tessera_schema::instance::{FieldValue, OutputRef};

use self::ast::{CompositionFile, FieldDecl, ModuleDecl};
use self::lexer::Token;

/// Cursor into a token stream for recursive-descent parsing.
struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s.clone()),
            other => Err(parse_err(format!("expected identifier, got {other:?}"))),
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(parse_err(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::StringLiteral(s)) => Ok(s.clone()),
            other => Err(parse_err(format!("expected string literal, got {other:?}"))),
        }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

const fn parse_err(message: String) -> TesseraError {
    TesseraError::Parse { message }
}

fn skip_optional_comma(cursor: &mut TokenCursor<'_>) {
    if cursor.peek() == Some(&Token::Comma) {
        let _ = cursor.advance();
    }
}

/// Parses a `.tsr` file from its source text.
///
/// # Errors
///
/// Returns an error if the input contains syntax errors or fails validation.
pub fn parse_tsr(input: &str) -> Result<CompositionFile> {
    tracing::info!("parsing .tsr input");
    let tokens = lexer::tokenize(input)?;
    let mut cursor = TokenCursor::new(&tokens);
    let file = parse_file(&mut cursor)?;
    validator::validate(&file)?;
    Ok(file)
}

fn parse_file(cursor: &mut TokenCursor<'_>) -> Result<CompositionFile> {
    let mut file = CompositionFile::default();

    while let Some(tok) = cursor.peek() {
        match tok {
            Token::Module => file.modules.push(parse_module(cursor)?),
            other => {
                return Err(parse_err(format!(
                    "expected MODULE at top level, got {other:?}"
                )));
            }
        }
    }

    Ok(file)
}

fn parse_module(cursor: &mut TokenCursor<'_>) -> Result<ModuleDecl> {
    cursor.expect_token(&Token::Module)?;
    let name = cursor.expect_identifier()?;
    cursor.expect_token(&Token::Kind)?;
    let kind = cursor.expect_identifier()?;
    cursor.expect_token(&Token::BraceOpen)?;

    let mut module = ModuleDecl {
        name,
        kind,
        fields: Vec::new(),
    };

    while cursor.peek() != Some(&Token::BraceClose) {
        if cursor.at_end() {
            return Err(parse_err(format!(
                "unexpected end of input inside MODULE {} block",
                module.name
            )));
        }
        let name = cursor.expect_identifier()?;
        cursor.expect_token(&Token::Equals)?;
        let value = parse_value(cursor)?;
        module.fields.push(FieldDecl { name, value });
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(module)
}

fn parse_value(cursor: &mut TokenCursor<'_>) -> Result<FieldValue> {
    let value = match cursor.advance() {
        Some(Token::StringLiteral(s)) => Value::String(s.clone()),
        Some(Token::Number(n)) => Value::Number(*n),
        Some(Token::True) => Value::Bool(true),
        Some(Token::False) => Value::Bool(false),
        Some(Token::Null) => Value::Null,
        Some(Token::BracketOpen) => Value::List(parse_string_list(cursor)?),
        Some(Token::BraceOpen) => Value::Map(parse_string_map(cursor)?),
        Some(Token::Identifier(instance)) => {
            let instance = instance.clone();
            cursor.expect_token(&Token::Dot)?;
            let output = cursor.expect_identifier()?;
            return Ok(FieldValue::Reference(OutputRef::new(instance, output)));
        }
        other => return Err(parse_err(format!("expected a value, got {other:?}"))),
    };
    Ok(FieldValue::Literal(value))
}

/// Parses list items after the opening bracket.
fn parse_string_list(cursor: &mut TokenCursor<'_>) -> Result<Vec<String>> {
    let mut items = Vec::new();

    while cursor.peek() != Some(&Token::BracketClose) {
        if cursor.at_end() {
            return Err(parse_err("unexpected end of input inside list".into()));
        }
        items.push(cursor.expect_string()?);
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BracketClose)?;
    Ok(items)
}

/// Parses map entries after the opening brace. Keys may be bare or quoted.
fn parse_string_map(cursor: &mut TokenCursor<'_>) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    while cursor.peek() != Some(&Token::BraceClose) {
        if cursor.at_end() {
            return Err(parse_err("unexpected end of input inside map".into()));
        }
        let key = match cursor.advance() {
            Some(Token::Identifier(s) | Token::StringLiteral(s)) => s.clone(),
            other => return Err(parse_err(format!("expected map key, got {other:?}"))),
        };
        cursor.expect_token(&Token::Equals)?;
        let value = cursor.expect_string()?;
        if map.insert(key.clone(), value).is_some() {
            return Err(parse_err(format!("map key \"{key}\" assigned twice")));
        }
        skip_optional_comma(cursor);
    }

    cursor.expect_token(&Token::BraceClose)?;
    Ok(map)
}
