//! Intents model and the builder that decodes it from a merged document

use crate::entities::EntitySlotList;
use crate::expression::Sentence;
use crate::loader;
use crate::priority::prioritize;
use crate::slot_lists::{SlotList, SlotListDecoder, TextSlotList};
use crate::template::{DefaultNormalizer, DefaultTemplateParser, TemplateParser, TextNormalizer};
use crate::{IntentsError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Kind of response produced after recognition; the value space for
/// [`IntentData::response`] keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Success,
    NoIntent,
    NoArea,
    NoDomain,
    NoDeviceClass,
    NoEntity,
    HandleError,
}

/// Settings that may change recognition
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntentsSettings {
    /// Whitespace is ignored during matching
    pub ignore_whitespace: bool,
}

/// Block of sentences and known slots for an intent
#[derive(Debug, Clone)]
pub struct IntentData {
    /// Sentence templates as written in the document
    pub sentence_texts: Vec<String>,
    /// Slot values assumed when the intent matches
    pub slots: HashMap<String, Value>,
    /// Key of the response to the intent
    pub response: Option<String>,
    /// Context items required before a match succeeds
    pub requires_context: HashMap<String, Value>,
    /// Context items that must not be present for a match
    pub excludes_context: HashMap<String, Value>,
    /// Expansion rules local to this block
    pub expansion_rules: HashMap<String, Sentence>,
    /// Names of the document's wildcard lists, shared by every block
    pub wildcard_list_names: Arc<HashSet<String>>,
    parser: Arc<dyn TemplateParser>,
    sentences: OnceLock<Vec<Sentence>>,
}

impl IntentData {
    pub fn new(sentence_texts: Vec<String>, parser: Arc<dyn TemplateParser>) -> Self {
        Self {
            sentence_texts,
            slots: HashMap::new(),
            response: None,
            requires_context: HashMap::new(),
            excludes_context: HashMap::new(),
            expansion_rules: HashMap::new(),
            wildcard_list_names: Arc::new(HashSet::new()),
            parser,
            sentences: OnceLock::new(),
        }
    }

    /// Parsed sentences in match-priority order.
    ///
    /// Computed on first access and cached. Concurrent first accesses may each
    /// parse, but they produce the same ordering and only one is kept.
    pub fn sentences(&self) -> Result<&[Sentence]> {
        if let Some(sentences) = self.sentences.get() {
            return Ok(sentences);
        }

        let parsed = self
            .sentence_texts
            .iter()
            .map(|text| self.parser.parse(text, true))
            .collect::<Result<Vec<_>>>()?;
        let ordered = prioritize(parsed, &self.wildcard_list_names);
        Ok(self.sentences.get_or_init(|| ordered))
    }
}

impl PartialEq for IntentData {
    fn eq(&self, other: &Self) -> bool {
        self.sentence_texts == other.sentence_texts
            && self.slots == other.slots
            && self.response == other.response
            && self.requires_context == other.requires_context
            && self.excludes_context == other.excludes_context
            && self.expansion_rules == other.expansion_rules
            && self.wildcard_list_names == other.wildcard_list_names
    }
}

/// A named intent with sentences and slots
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub name: String,
    pub data: Vec<IntentData>,
}

/// Intents, rules and lists for one language
#[derive(Debug, Clone, PartialEq)]
pub struct Intents {
    /// Language code (e.g. `en`)
    pub language: String,
    pub intents: HashMap<String, Intent>,
    pub slot_lists: HashMap<String, SlotList>,
    pub expansion_rules: HashMap<String, Sentence>,
    /// Words that can be skipped during recognition
    pub skip_words: Vec<String>,
    pub settings: IntentsSettings,
}

impl Intents {
    /// Build from an already merged document with the default collaborators.
    pub fn from_value(doc: Value) -> Result<Self> {
        IntentsBuilder::default().build(doc)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let doc = loader::merge_yaml_strs([raw])?;
        Self::from_value(doc)
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|e| IntentsError::ConfigDecode(format!("reading intents: {e}")))?;
        Self::from_yaml_str(&raw)
    }

    /// Load, deep-merge and build a set of YAML files.
    pub fn from_files<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let doc = loader::load_files(paths)?;
        Self::from_value(doc)
    }

    /// Filter the entity list `name` against the current slot lists.
    pub fn resolve_entity_list(&self, name: &str) -> Result<TextSlotList> {
        match self.slot_lists.get(name) {
            Some(SlotList::Entity(list)) => list.apply(&self.slot_lists),
            Some(other) => Err(IntentsError::Validation(format!(
                "list {name} is a {} list, not an entity list",
                other.kind_name()
            ))),
            None => Err(IntentsError::MissingList(name.to_string())),
        }
    }

    /// Entity lists declared in the document, by name.
    pub fn entity_lists(&self) -> impl Iterator<Item = (&str, &EntitySlotList)> {
        self.slot_lists.iter().filter_map(|(name, list)| match list {
            SlotList::Entity(entity) => Some((name.as_str(), entity)),
            _ => None,
        })
    }
}

// Document shapes

#[derive(Debug, Deserialize)]
struct IntentsDoc {
    language: String,
    #[serde(default)]
    settings: IntentsSettings,
    intents: HashMap<String, IntentDoc>,
    #[serde(default)]
    lists: HashMap<String, Value>,
    #[serde(default)]
    expansion_rules: HashMap<String, String>,
    #[serde(default)]
    skip_words: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IntentDoc {
    data: Vec<IntentDataDoc>,
}

#[derive(Debug, Deserialize)]
struct IntentDataDoc {
    sentences: Vec<String>,
    #[serde(default)]
    slots: HashMap<String, Value>,
    #[serde(default)]
    requires_context: HashMap<String, Value>,
    #[serde(default)]
    excludes_context: HashMap<String, Value>,
    #[serde(default)]
    expansion_rules: HashMap<String, String>,
    #[serde(default)]
    response: Option<String>,
}

/// Decodes a merged document into [`Intents`]
#[derive(Debug, Clone)]
pub struct IntentsBuilder {
    parser: Arc<dyn TemplateParser>,
    normalizer: Arc<dyn TextNormalizer>,
    allow_template: bool,
}

impl Default for IntentsBuilder {
    fn default() -> Self {
        Self::new(Arc::new(DefaultTemplateParser), Arc::new(DefaultNormalizer))
    }
}

impl IntentsBuilder {
    pub fn new(parser: Arc<dyn TemplateParser>, normalizer: Arc<dyn TextNormalizer>) -> Self {
        Self {
            parser,
            normalizer,
            allow_template: true,
        }
    }

    /// Whether text list values may be templates
    pub fn allow_template(mut self, allow: bool) -> Self {
        self.allow_template = allow;
        self
    }

    pub fn build(&self, doc: Value) -> Result<Intents> {
        let wildcard_list_names = Arc::new(collect_wildcard_list_names(&doc));
        let doc: IntentsDoc =
            serde_yaml::from_value(doc).map_err(|e| IntentsError::Validation(e.to_string()))?;

        let decoder = SlotListDecoder::new(self.parser.as_ref(), self.normalizer.as_ref())
            .allow_template(self.allow_template);
        let slot_lists = doc
            .lists
            .iter()
            .map(|(name, spec)| -> Result<(String, SlotList)> {
                Ok((name.clone(), decoder.decode(name, spec)?))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let expansion_rules = self.parse_rules(&doc.expansion_rules)?;

        let mut intents = HashMap::with_capacity(doc.intents.len());
        for (name, intent_doc) in doc.intents {
            let intent = self.build_intent(&name, intent_doc, &wildcard_list_names)?;
            intents.insert(name, intent);
        }

        tracing::info!(
            language = %doc.language,
            intents = intents.len(),
            lists = slot_lists.len(),
            wildcards = wildcard_list_names.len(),
            "built intents"
        );

        Ok(Intents {
            language: doc.language,
            intents,
            slot_lists,
            expansion_rules,
            skip_words: doc.skip_words,
            settings: doc.settings,
        })
    }

    fn build_intent(
        &self,
        name: &str,
        intent_doc: IntentDoc,
        wildcard_list_names: &Arc<HashSet<String>>,
    ) -> Result<Intent> {
        if intent_doc.data.is_empty() {
            return Err(IntentsError::Validation(format!(
                "intent {name} has no data blocks"
            )));
        }

        let data = intent_doc
            .data
            .into_iter()
            .map(|data_doc| -> Result<IntentData> {
                if data_doc.sentences.is_empty() {
                    return Err(IntentsError::Validation(format!(
                        "intent {name} has a data block without sentences"
                    )));
                }
                let mut data = IntentData::new(data_doc.sentences, Arc::clone(&self.parser));
                data.slots = data_doc.slots;
                data.response = data_doc.response;
                data.requires_context = data_doc.requires_context;
                data.excludes_context = data_doc.excludes_context;
                data.expansion_rules = self.parse_rules(&data_doc.expansion_rules)?;
                data.wildcard_list_names = Arc::clone(wildcard_list_names);
                Ok(data)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Intent {
            name: name.to_string(),
            data,
        })
    }

    fn parse_rules(&self, rules: &HashMap<String, String>) -> Result<HashMap<String, Sentence>> {
        rules
            .iter()
            .map(|(name, body)| -> Result<(String, Sentence)> {
                Ok((name.clone(), self.parser.parse(body, true)?))
            })
            .collect()
    }
}

/// Names of top-level lists flagged `wildcard: true`
fn collect_wildcard_list_names(doc: &Value) -> HashSet<String> {
    let Some(Value::Mapping(lists)) = doc.get("lists") else {
        return HashSet::new();
    };
    lists
        .iter()
        .filter(|(_, spec)| spec.get("wildcard").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|(name, _)| name.as_str().map(str::to_string))
        .collect()
}
