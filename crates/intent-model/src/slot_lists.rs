//! Slot lists and the decoder that builds them from list specifications

use crate::entities::{EntitySlotFilter, EntitySlotList};
use crate::expression::{Expression, TextChunk};
use crate::template::{TemplateParser, TextNormalizer};
use crate::{IntentsError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;

/// Key/value metadata attached to a slot value
pub type SlotContext = HashMap<String, Value>;

/// Named source of candidate values for a slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotList {
    Text(TextSlotList),
    Range(RangeSlotList),
    Wildcard(WildcardSlotList),
    Entity(EntitySlotList),
}

impl SlotList {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SlotList::Text(_) => "text",
            SlotList::Range(_) => "range",
            SlotList::Wildcard(_) => "wildcard",
            SlotList::Entity(_) => "entities",
        }
    }

    /// The text list, when this is one
    pub fn as_text(&self) -> Option<&TextSlotList> {
        match self {
            SlotList::Text(list) => Some(list),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, SlotList::Wildcard(_))
    }
}

/// Single value in a text slot list
#[derive(Debug, Clone, PartialEq)]
pub struct TextSlotValue {
    /// Parsed template, or a normalized literal chunk
    pub text_in: Expression,
    /// Value put into the slot when matched
    pub value_out: Value,
    /// Items added to the context when matched
    pub context: Option<SlotContext>,
}

impl TextSlotValue {
    /// True when the value carries at least one context item
    pub fn has_context(&self) -> bool {
        self.context.as_ref().is_some_and(|ctx| !ctx.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSlotList {
    pub values: Vec<TextSlotValue>,
}

impl TextSlotList {
    pub fn new(values: Vec<TextSlotValue>) -> Self {
        Self { values }
    }

    /// Build a list where each string is both the input text and the output value.
    pub fn from_strings<I, S>(strings: I, decoder: &SlotListDecoder<'_>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = strings
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                decoder.text_value(s, Value::String(s.to_string()), None)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    /// Build a list from `(text in, value out, context)` tuples.
    pub fn from_tuples<I, S>(tuples: I, decoder: &SlotListDecoder<'_>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Value, Option<SlotContext>)>,
        S: AsRef<str>,
    {
        let values = tuples
            .into_iter()
            .map(|(text_in, value_out, context)| {
                decoder.text_value(text_in.as_ref(), value_out, context)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeType {
    #[default]
    Number,
    Percentage,
    Temperature,
}

/// Inclusive range of integers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSlotList {
    start: i64,
    stop: i64,
    step: i64,
    range_type: RangeType,
    digits: bool,
    words: bool,
    words_language: Option<String>,
    words_ruleset: Option<String>,
}

impl RangeSlotList {
    pub fn new(
        start: i64,
        stop: i64,
        step: i64,
        range_type: RangeType,
        digits: bool,
        words: bool,
    ) -> Result<Self> {
        if start >= stop {
            return Err(IntentsError::InvalidRange("start must be less than stop"));
        }
        if step <= 0 {
            return Err(IntentsError::InvalidRange("step must be positive"));
        }
        if !(digits || words) {
            return Err(IntentsError::InvalidRange("must have digits, words, or both"));
        }
        Ok(Self {
            start,
            stop,
            step,
            range_type,
            digits,
            words,
            words_language: None,
            words_ruleset: None,
        })
    }

    /// Hints for rendering numbers as words
    pub fn with_words_hints(mut self, language: Option<String>, ruleset: Option<String>) -> Self {
        self.words_language = language;
        self.words_ruleset = ruleset;
        self
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn stop(&self) -> i64 {
        self.stop
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn range_type(&self) -> RangeType {
        self.range_type
    }

    pub fn digits(&self) -> bool {
        self.digits
    }

    pub fn words(&self) -> bool {
        self.words
    }

    pub fn words_language(&self) -> Option<&str> {
        self.words_language.as_deref()
    }

    pub fn words_ruleset(&self) -> Option<&str> {
        self.words_ruleset.as_deref()
    }

    /// Every value in the range, `stop` included when reachable by `step`.
    pub fn values(&self) -> impl Iterator<Item = i64> {
        let step = usize::try_from(self.step).unwrap_or(usize::MAX);
        (self.start..=self.stop).step_by(step)
    }
}

/// Matches as much free text as possible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WildcardSlotList;

// Raw list specification shapes

/// Top-level keys only; the body of the selected key is decoded on its own.
#[derive(Debug, Deserialize)]
struct ListSpec {
    values: Option<Value>,
    range: Option<Value>,
    wildcard: Option<Value>,
    entities: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValueSpec {
    Plain(String),
    Mapped {
        #[serde(rename = "in")]
        text_in: String,
        out: Value,
        #[serde(default)]
        context: Option<SlotContext>,
    },
}

fn default_step() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RangeSpec {
    from: i64,
    to: i64,
    #[serde(default = "default_step")]
    step: i64,
    #[serde(default, rename = "type")]
    range_type: RangeType,
    #[serde(default = "default_true")]
    digits: bool,
    #[serde(default = "default_true")]
    words: bool,
    #[serde(default)]
    words_language: Option<String>,
    #[serde(default)]
    words_ruleset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FiltersSpec {
    Many(Vec<EntitySlotFilter>),
    One(EntitySlotFilter),
}

#[derive(Debug, Deserialize)]
struct EntitiesSpec {
    #[serde(default)]
    filters: Option<FiltersSpec>,
    target: String,
}

fn decode_body<T: DeserializeOwned>(name: &str, key: &str, body: Value) -> Result<T> {
    serde_yaml::from_value(body)
        .map_err(|e| IntentsError::Validation(format!("list {name}.{key}: {e}")))
}

/// Decodes list specifications into [`SlotList`] variants
#[derive(Debug, Clone, Copy)]
pub struct SlotListDecoder<'a> {
    parser: &'a dyn TemplateParser,
    normalizer: &'a dyn TextNormalizer,
    allow_template: bool,
}

impl<'a> SlotListDecoder<'a> {
    pub fn new(parser: &'a dyn TemplateParser, normalizer: &'a dyn TextNormalizer) -> Self {
        Self {
            parser,
            normalizer,
            allow_template: true,
        }
    }

    /// When disabled, every input text becomes a literal chunk.
    pub fn allow_template(mut self, allow: bool) -> Self {
        self.allow_template = allow;
        self
    }

    /// Decode one list specification.
    ///
    /// Variant precedence: `values`, then `range`, then `wildcard: true`, then `entities`.
    pub fn decode(&self, name: &str, spec: &Value) -> Result<SlotList> {
        let spec_parsed: ListSpec = serde_yaml::from_value(spec.clone())
            .map_err(|e| IntentsError::Validation(format!("list {name}: {e}")))?;

        let wildcard = spec_parsed
            .wildcard
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let list = if let Some(values) = spec_parsed.values {
            let values: Vec<ValueSpec> = decode_body(name, "values", values)?;
            SlotList::Text(self.decode_values(values)?)
        } else if let Some(range) = spec_parsed.range {
            let range: RangeSpec = decode_body(name, "range", range)?;
            SlotList::Range(
                RangeSlotList::new(
                    range.from,
                    range.to,
                    range.step,
                    range.range_type,
                    range.digits,
                    range.words,
                )?
                .with_words_hints(range.words_language, range.words_ruleset),
            )
        } else if wildcard {
            SlotList::Wildcard(WildcardSlotList)
        } else if let Some(entities) = spec_parsed.entities {
            let entities: EntitiesSpec = decode_body(name, "entities", entities)?;
            let filters = match entities.filters {
                None => Vec::new(),
                Some(FiltersSpec::One(filter)) => vec![filter],
                Some(FiltersSpec::Many(filters)) => filters,
            };
            SlotList::Entity(EntitySlotList::new(filters, entities.target))
        } else {
            return Err(IntentsError::UnknownListType(format!("{name}: {spec:?}")));
        };

        tracing::debug!(list = name, kind = list.kind_name(), "decoded slot list");
        Ok(list)
    }

    fn decode_values(&self, values: Vec<ValueSpec>) -> Result<TextSlotList> {
        let values = values
            .into_iter()
            .map(|value| match value {
                ValueSpec::Plain(text) => {
                    let value_out = Value::String(text.clone());
                    self.text_value(&text, value_out, None)
                }
                ValueSpec::Mapped {
                    text_in,
                    out,
                    context,
                } => self.text_value(&text_in, out, context),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TextSlotList::new(values))
    }

    pub fn text_value(
        &self,
        text_in: &str,
        value_out: Value,
        context: Option<SlotContext>,
    ) -> Result<TextSlotValue> {
        Ok(TextSlotValue {
            text_in: self.text_in(text_in)?,
            value_out,
            context,
        })
    }

    /// Parse `text` as a template if it has template syntax, otherwise normalize it.
    pub fn text_in(&self, text: &str) -> Result<Expression> {
        if self.allow_template && self.normalizer.is_template(text) {
            return Ok(self.parser.parse(text, false)?.into_expression());
        }
        Ok(Expression::Text(TextChunk::new(self.normalizer.normalize(text))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{DefaultNormalizer, DefaultTemplateParser};

    fn decoder() -> SlotListDecoder<'static> {
        SlotListDecoder::new(&DefaultTemplateParser, &DefaultNormalizer)
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_range_construction() {
        assert!(RangeSlotList::new(0, 100, 1, RangeType::Number, true, true).is_ok());
        assert!(RangeSlotList::new(-10, -5, 5, RangeType::Temperature, false, true).is_ok());

        for (start, stop, step) in [(5, 5, 1), (10, 1, 1), (0, 10, 0), (0, 10, -2)] {
            let err = RangeSlotList::new(start, stop, step, RangeType::Number, true, true)
                .unwrap_err();
            assert!(matches!(err, IntentsError::InvalidRange(_)));
        }

        let err = RangeSlotList::new(0, 10, 1, RangeType::Number, false, false).unwrap_err();
        assert!(matches!(err, IntentsError::InvalidRange(_)));
    }

    #[test]
    fn test_range_values() {
        let range = RangeSlotList::new(0, 10, 5, RangeType::Percentage, true, false).unwrap();
        assert_eq!(range.values().collect::<Vec<_>>(), vec![0, 5, 10]);

        let range = RangeSlotList::new(1, 4, 2, RangeType::Number, true, true).unwrap();
        assert_eq!(range.values().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_decode_text_values() {
        let spec = yaml(
            r#"
values:
  - "living   room"
  - in: "light[s]"
    out: light
  - in: kitchen
    out: 7
    context:
      area: kitchen
"#,
        );
        let SlotList::Text(list) = decoder().decode("names", &spec).unwrap() else {
            panic!("expected text list");
        };
        assert_eq!(list.len(), 3);

        let first = &list.values[0];
        assert_eq!(first.text_in, Expression::Text(TextChunk::new("living room")));
        assert_eq!(first.value_out, Value::String("living   room".into()));
        assert!(first.context.is_none());

        assert!(matches!(list.values[1].text_in, Expression::Group(_)));
        assert_eq!(list.values[1].value_out, Value::String("light".into()));

        let third = &list.values[2];
        assert_eq!(third.value_out, Value::Number(7i64.into()));
        assert!(third.has_context());
    }

    #[test]
    fn test_no_template_keeps_literal() {
        let decoder = decoder().allow_template(false);
        let list = TextSlotList::from_strings(["light[s]"], &decoder).unwrap();
        assert_eq!(list.values[0].text_in, Expression::Text(TextChunk::new("light[s]")));

        let list = TextSlotList::from_strings(["light[s]"], &self::decoder()).unwrap();
        assert!(matches!(list.values[0].text_in, Expression::Group(_)));
    }

    #[test]
    fn test_decode_range() {
        let spec = yaml("range: {from: 0, to: 100, step: 10, type: percentage}");
        let SlotList::Range(range) = decoder().decode("brightness", &spec).unwrap() else {
            panic!("expected range list");
        };
        assert_eq!((range.start(), range.stop(), range.step()), (0, 100, 10));
        assert_eq!(range.range_type(), RangeType::Percentage);
        assert!(range.digits() && range.words());

        let spec = yaml("range: {from: 1, to: 5, words: false, words_language: de}");
        let SlotList::Range(range) = decoder().decode("count", &spec).unwrap() else {
            panic!("expected range list");
        };
        assert_eq!(range.step(), 1);
        assert_eq!(range.range_type(), RangeType::Number);
        assert!(!range.words());
        assert_eq!(range.words_language(), Some("de"));

        let spec = yaml("range: {from: 10, to: 1}");
        assert!(matches!(
            decoder().decode("bad", &spec),
            Err(IntentsError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_decode_precedence() {
        let spec = yaml("{values: [a, b], range: {from: 0, to: 3}, wildcard: true}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Text(_))));

        let spec = yaml("{range: {from: 0, to: 3}, wildcard: true}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Range(_))));

        let spec = yaml("{wildcard: true, entities: {target: all}}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Wildcard(_))));

        let spec = yaml("{wildcard: false, entities: {target: all}}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Entity(_))));
    }

    #[test]
    fn test_decode_precedence_ignores_losing_bodies() {
        let spec = yaml("{values: [a], range: {from: 1}}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Text(_))));

        let spec = yaml("{values: [a], entities: {filters: {domain: light}}}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Text(_))));

        let spec = yaml("{range: {from: 0, to: 3}, values: null, entities: 5}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Range(_))));

        let spec = yaml("{wildcard: true, entities: {filters: {area: x}, target: t}}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Wildcard(_))));

        let spec = yaml("{wildcard: maybe, entities: {target: all}}");
        assert!(matches!(decoder().decode("x", &spec), Ok(SlotList::Entity(_))));
    }

    #[test]
    fn test_decode_winning_body_still_validated() {
        let err = decoder()
            .decode("x", &yaml("{entities: {filters: {area: x}, target: t}}"))
            .unwrap_err();
        assert!(matches!(err, IntentsError::Validation(_)));

        let err = decoder()
            .decode("x", &yaml("{wildcard: false, entities: {filters: {domain: light}}}"))
            .unwrap_err();
        assert!(matches!(err, IntentsError::Validation(_)));
    }

    #[test]
    fn test_decode_entities_filters() {
        let spec = yaml("entities: {filters: {domain: light}, target: entities}");
        let SlotList::Entity(list) = decoder().decode("lights", &spec).unwrap() else {
            panic!("expected entity list");
        };
        assert_eq!(list.target_name, "entities");
        assert_eq!(list.filters.len(), 1);
        assert_eq!(list.filters[0].domain.as_deref(), Some("light"));

        let spec = yaml(
            "entities: {filters: [{domain: cover, device_class: garage}, {domain: lock}], target: entities}",
        );
        let SlotList::Entity(list) = decoder().decode("doors", &spec).unwrap() else {
            panic!("expected entity list");
        };
        assert_eq!(list.filters.len(), 2);
        assert_eq!(list.filters[0].device_class.as_deref(), Some("garage"));

        let spec = yaml("entities: {target: entities}");
        let SlotList::Entity(list) = decoder().decode("all", &spec).unwrap() else {
            panic!("expected entity list");
        };
        assert!(list.filters.is_empty());
    }

    #[test]
    fn test_decode_unknown_type() {
        for text in ["{}", "{wildcard: false}", "{description: nothing}"] {
            let err = decoder().decode("mystery", &yaml(text)).unwrap_err();
            assert!(matches!(err, IntentsError::UnknownListType(_)), "{text}: {err:?}");
        }
    }

    #[test]
    fn test_decode_bad_shape() {
        let err = decoder()
            .decode("bad", &yaml("range: {from: 1}"))
            .unwrap_err();
        assert!(matches!(err, IntentsError::Validation(_)));

        let err = decoder()
            .decode("bad", &yaml("range: {from: 1, to: 2, type: speed}"))
            .unwrap_err();
        assert!(matches!(err, IntentsError::Validation(_)));
    }
}
