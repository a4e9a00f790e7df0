//! Template parsing and text normalization
//!
//! The model only depends on the two traits below. The default implementations
//! cover the template syntax used by intent documents:
//!
//! - `{list}` or `{list:slot}` references a slot list
//! - `<rule>` references an expansion rule
//! - `(a|b)` alternatives, `(a;b)` permutations
//! - `[optional]` groups
//! - `\` escapes the next character

use crate::expression::{
    Expression, Group, GroupKind, ListReference, RuleReference, Sentence, TextChunk,
};
use crate::{IntentsError, Result};
use regex::Regex;
use std::fmt::Debug;
use std::sync::OnceLock;

/// Turns a template string into an expression tree
pub trait TemplateParser: Debug + Send + Sync {
    /// Parse `text`; the source text is stored on the sentence when `keep_text` is set.
    fn parse(&self, text: &str, keep_text: bool) -> Result<Sentence>;
}

/// Normalizes literal text and detects template syntax
pub trait TextNormalizer: Debug + Send + Sync {
    fn normalize(&self, text: &str) -> String;

    fn is_template(&self, text: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNormalizer;

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern - this is a bug"))
}

fn template_syntax_regex() -> &'static Regex {
    static TEMPLATE_SYNTAX: OnceLock<Regex> = OnceLock::new();
    TEMPLATE_SYNTAX
        .get_or_init(|| Regex::new(r"[(){}<>\[\]|]").expect("Invalid regex pattern - this is a bug"))
}

impl TextNormalizer for DefaultNormalizer {
    fn normalize(&self, text: &str) -> String {
        whitespace_regex().replace_all(text, " ").into_owned()
    }

    fn is_template(&self, text: &str) -> bool {
        template_syntax_regex().is_match(text)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTemplateParser;

impl TemplateParser for DefaultTemplateParser {
    fn parse(&self, text: &str, keep_text: bool) -> Result<Sentence> {
        let mut cursor = Cursor {
            text,
            chars: text.chars().collect(),
            pos: 0,
        };
        let expression = cursor.parse_group(None)?;
        Ok(Sentence {
            expression,
            text: keep_text.then(|| text.to_string()),
        })
    }
}

struct Cursor<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Cursor<'_> {
    fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn error(&self, reason: impl Into<String>) -> IntentsError {
        IntentsError::TemplateSyntax {
            text: self.text.to_string(),
            reason: reason.into(),
        }
    }

    fn parse_group(&mut self, close: Option<char>) -> Result<Group> {
        let mut branches: Vec<Expression> = Vec::new();
        let mut current: Vec<Expression> = Vec::new();
        let mut literal = String::new();
        let mut kind = GroupKind::Sequence;

        loop {
            let Some(c) = self.next() else {
                if let Some(close) = close {
                    return Err(self.error(format!("missing closing '{close}'")));
                }
                break;
            };
            if Some(c) == close {
                break;
            }

            match c {
                '\\' => match self.next() {
                    Some(escaped) => literal.push(escaped),
                    None => return Err(self.error("dangling escape at end of template")),
                },
                '(' => {
                    flush_literal(&mut literal, &mut current);
                    let group = self.parse_group(Some(')'))?;
                    current.push(Expression::Group(group));
                }
                '[' => {
                    flush_literal(&mut literal, &mut current);
                    let group = self.parse_group(Some(']'))?;
                    current.push(Expression::Group(make_optional(group)));
                }
                '{' => {
                    flush_literal(&mut literal, &mut current);
                    let body = self.read_until('}')?;
                    current.push(self.list_reference(&body)?);
                }
                '<' => {
                    flush_literal(&mut literal, &mut current);
                    let body = self.read_until('>')?;
                    let rule_name = body.trim();
                    if rule_name.is_empty() {
                        return Err(self.error("empty rule reference"));
                    }
                    current.push(Expression::Rule(RuleReference {
                        rule_name: rule_name.to_string(),
                    }));
                }
                '|' | ';' => {
                    flush_literal(&mut literal, &mut current);
                    let separator = if c == '|' {
                        GroupKind::Alternative
                    } else {
                        GroupKind::Permutation
                    };
                    if kind != GroupKind::Sequence && kind != separator {
                        return Err(self.error("cannot mix '|' and ';' in one group"));
                    }
                    kind = separator;
                    branches.push(Expression::Group(Group::sequence(std::mem::take(
                        &mut current,
                    ))));
                }
                ')' | ']' | '}' | '>' => {
                    return Err(self.error(format!("unexpected '{c}'")));
                }
                other => literal.push(other),
            }
        }

        flush_literal(&mut literal, &mut current);
        if kind == GroupKind::Sequence {
            return Ok(Group::sequence(current));
        }
        branches.push(Expression::Group(Group::sequence(current)));
        Ok(Group {
            kind,
            items: branches,
            is_optional: false,
        })
    }

    fn read_until(&mut self, close: char) -> Result<String> {
        let mut body = String::new();
        loop {
            match self.next() {
                Some(c) if c == close => return Ok(body),
                Some(c) => body.push(c),
                None => return Err(self.error(format!("missing closing '{close}'"))),
            }
        }
    }

    fn list_reference(&self, body: &str) -> Result<Expression> {
        let (list_name, slot_name) = match body.split_once(':') {
            Some((list, slot)) => (list.trim(), slot.trim()),
            None => (body.trim(), body.trim()),
        };
        if list_name.is_empty() || slot_name.is_empty() {
            return Err(self.error("empty list reference"));
        }
        Ok(Expression::List(ListReference {
            list_name: list_name.to_string(),
            slot_name: slot_name.to_string(),
        }))
    }
}

fn flush_literal(literal: &mut String, items: &mut Vec<Expression>) {
    if !literal.is_empty() {
        items.push(Expression::Text(TextChunk::new(std::mem::take(literal))));
    }
}

fn make_optional(group: Group) -> Group {
    let mut items = match group.kind {
        GroupKind::Alternative => group.items,
        GroupKind::Sequence | GroupKind::Permutation => vec![Expression::Group(group)],
    };
    items.push(Expression::Text(TextChunk::empty()));
    Group {
        kind: GroupKind::Alternative,
        items,
        is_optional: true,
    }
}
