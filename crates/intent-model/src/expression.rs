//! Expression tree produced by a template parser

/// Literal text inside a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Normalized text used for matching
    pub text: String,
    /// Text as it appeared in the template
    pub original_text: String,
}

impl TextChunk {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            original_text: text.clone(),
            text,
        }
    }

    pub fn empty() -> Self {
        Self::new("")
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Reference to a slot list, written `{list}` or `{list:slot}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReference {
    pub list_name: String,
    pub slot_name: String,
}

/// Reference to an expansion rule, written `<rule>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReference {
    pub rule_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Items matched one after another
    Sequence,
    /// Exactly one item matches, `(a|b)`
    Alternative,
    /// All items match in any order, `(a;b)`
    Permutation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub kind: GroupKind,
    pub items: Vec<Expression>,
    /// Set for `[...]` groups, which carry a trailing empty alternative
    pub is_optional: bool,
}

impl Group {
    pub fn sequence(items: Vec<Expression>) -> Self {
        Self {
            kind: GroupKind::Sequence,
            items,
            is_optional: false,
        }
    }

    fn collect_list_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        for item in &self.items {
            match item {
                Expression::List(list) => out.push(list.list_name.as_str()),
                Expression::Group(group) => group.collect_list_names(out),
                Expression::Text(_) | Expression::Rule(_) => {}
            }
        }
    }

    pub fn text_chunk_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                Expression::Text(_) => 1,
                Expression::Group(group) => group.text_chunk_count(),
                Expression::List(_) | Expression::Rule(_) => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Text(TextChunk),
    List(ListReference),
    Rule(RuleReference),
    Group(Group),
}

impl Expression {
    pub fn as_text(&self) -> Option<&TextChunk> {
        match self {
            Expression::Text(chunk) => Some(chunk),
            _ => None,
        }
    }
}

/// A parsed sentence template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub expression: Group,
    /// Source template, kept when the parser was asked to
    pub text: Option<String>,
}

impl Sentence {
    /// Names of every slot list referenced anywhere in the sentence, in order
    pub fn list_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.expression.collect_list_names(&mut names);
        names
    }

    pub fn text_chunk_count(&self) -> usize {
        self.expression.text_chunk_count()
    }

    pub fn into_expression(self) -> Expression {
        Expression::Group(self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(name: &str) -> Expression {
        Expression::List(ListReference {
            list_name: name.to_string(),
            slot_name: name.to_string(),
        })
    }

    #[test]
    fn test_nested_list_names_and_chunks() {
        let inner = Group {
            kind: GroupKind::Alternative,
            items: vec![
                Expression::Group(Group::sequence(vec![
                    Expression::Text(TextChunk::new(" in ")),
                    list("room"),
                ])),
                Expression::Text(TextChunk::empty()),
            ],
            is_optional: true,
        };
        let sentence = Sentence {
            expression: Group::sequence(vec![
                Expression::Text(TextChunk::new("play ")),
                list("album"),
                Expression::Group(inner),
            ]),
            text: None,
        };

        assert_eq!(sentence.list_names(), vec!["album", "room"]);
        assert_eq!(sentence.text_chunk_count(), 3);
    }
}
