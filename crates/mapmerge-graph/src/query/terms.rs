//! Term-based query compiler.
//!
//! A query is a whitespace-separated conjunction of terms:
//!
//! | Term | Matches |
//! |---|---|
//! | `type:node` / `type:way` / `type:relation` | entity kind (`vertex`, `polyline`, `group` also accepted) |
//! | `closed` | closed polylines |
//! | `key=*` | entities carrying `key` |
//! | `key=value` | entities whose `key` equals `value` |
//!
//! Keys and values may be double-quoted (`"addr:housenumber"=*`), and any
//! term may be negated with a leading `-`.

use super::{Predicate, QueryCompiler};
use crate::graph::Graph;
use mapmerge_core::{EntityKind, EntityRef, QueryError, QueryResult};
use tracing::trace;

/// Compiles term queries into [`Predicate`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermQueryCompiler;

impl QueryCompiler for TermQueryCompiler {
    fn compile(&self, query: &str) -> QueryResult<Box<dyn Predicate>> {
        let terms = Parser::new(query).parse()?;
        trace!(query, terms = terms.len(), "query compiled");
        Ok(Box::new(Conjunction { terms }))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    Kind(EntityKind),
    Closed,
    HasKey(String),
    TagEquals(String, String),
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    negated: bool,
    test: Test,
}

impl Term {
    fn matches(&self, graph: &Graph, entity: EntityRef) -> bool {
        let hit = match &self.test {
            Test::Kind(kind) => entity.kind() == *kind,
            Test::Closed => matches!(entity, EntityRef::Polyline(id) if graph.is_closed(id)),
            Test::HasKey(key) => graph.tags(entity).is_some_and(|t| t.contains_key(key)),
            Test::TagEquals(key, value) => graph
                .tags(entity)
                .and_then(|t| t.get(key))
                .is_some_and(|v| v == value),
        };
        hit != self.negated
    }
}

struct Conjunction {
    terms: Vec<Term>,
}

impl Predicate for Conjunction {
    fn matches(&self, graph: &Graph, entity: EntityRef) -> bool {
        graph.contains(entity) && self.terms.iter().all(|t| t.matches(graph, entity))
    }
}

/// A key, value or keyword as written in the query.
struct Word {
    text: String,
    quoted: bool,
}

struct Parser<'a> {
    query: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            query,
            chars: query.char_indices().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> QueryResult<Vec<Term>> {
        let mut terms = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            terms.push(self.term()?);
        }
        if terms.is_empty() {
            return Err(self.error(0, "empty query"));
        }
        Ok(terms)
    }

    fn term(&mut self) -> QueryResult<Term> {
        let start = self.offset();
        let negated = self.eat('-');
        if self.at_term_end() {
            return Err(self.error(start, "empty term"));
        }

        let word = self.word(true)?;
        let test = match self.peek() {
            Some(':') if !word.quoted => {
                self.pos += 1;
                if word.text != "type" {
                    return Err(self.error(start, format!("unknown prefix '{}:'", word.text)));
                }
                let value = self.word(false)?;
                Test::Kind(parse_kind(&value.text).ok_or_else(|| {
                    self.error(start, format!("unknown type '{}'", value.text))
                })?)
            }
            Some('=') => {
                self.pos += 1;
                if word.text.is_empty() {
                    return Err(self.error(start, "empty key"));
                }
                if self.peek() == Some('*') {
                    self.pos += 1;
                    if !self.at_term_end() {
                        return Err(self.error(start, "unexpected text after '*'"));
                    }
                    Test::HasKey(word.text)
                } else {
                    let value = self.word(false)?;
                    if value.text.is_empty() && !value.quoted {
                        return Err(self.error(start, format!("missing value for '{}'", word.text)));
                    }
                    Test::TagEquals(word.text, value.text)
                }
            }
            _ if !word.quoted && word.text == "closed" => Test::Closed,
            _ => {
                return Err(self.error(
                    start,
                    format!("expected key=value, key=*, type:... or closed, found '{}'", word.text),
                ))
            }
        };
        if !self.at_term_end() {
            return Err(self.error(start, "unexpected text after term"));
        }
        Ok(Term { negated, test })
    }

    /// Reads a quoted string, or a bare run of characters up to whitespace.
    /// Bare keys also stop at `=` and `:`.
    fn word(&mut self, is_key: bool) -> QueryResult<Word> {
        let start = self.offset();
        if self.eat('"') {
            let mut text = String::new();
            loop {
                match self.next() {
                    None => return Err(self.error(start, "unterminated quote")),
                    Some('"') => break,
                    Some('\\') => match self.next() {
                        Some(c) => text.push(c),
                        None => return Err(self.error(start, "unterminated quote")),
                    },
                    Some(c) => text.push(c),
                }
            }
            return Ok(Word { text, quoted: true });
        }
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || (is_key && (c == '=' || c == ':')) {
                break;
            }
            if c == '"' {
                return Err(self.error(self.offset(), "quote inside bare word"));
            }
            text.push(c);
            self.pos += 1;
        }
        Ok(Word { text, quoted: false })
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn at_term_end(&self) -> bool {
        self.peek().is_none_or(char::is_whitespace)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.query.len(), |(offset, _)| *offset)
    }

    fn error(&self, position: usize, reason: impl Into<String>) -> QueryError {
        QueryError::syntax(self.query, position, reason)
    }
}

fn parse_kind(text: &str) -> Option<EntityKind> {
    match text {
        "node" | "vertex" => Some(EntityKind::Vertex),
        "way" | "polyline" => Some(EntityKind::Polyline),
        "relation" | "group" => Some(EntityKind::Group),
        _ => None,
    }
}
