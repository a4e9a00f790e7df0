//! intent-model: YAML-driven intent definitions for voice commands
//!
//! This crate decodes intent documents (sentence templates, slot lists,
//! expansion rules and context requirements) into an immutable [`Intents`]
//! model that a sentence matcher consumes. It covers:
//! - Deep-merging several YAML documents into one
//! - Decoding slot lists into text, range, wildcard and entity variants
//! - Filtering entity lists by domain and device class
//! - Ordering an intent's sentences so wildcard templates match correctly

mod error;
pub use error::{IntentsError, Result};

pub mod expression;
pub use expression::{
    Expression, Group, GroupKind, ListReference, RuleReference, Sentence, TextChunk,
};

mod template;
pub use template::{DefaultNormalizer, DefaultTemplateParser, TemplateParser, TextNormalizer};

mod slot_lists;
pub use slot_lists::{
    RangeSlotList, RangeType, SlotContext, SlotList, SlotListDecoder, TextSlotList, TextSlotValue,
    WildcardSlotList,
};

mod entities;
pub use entities::{apply_filters, EntitySlotFilter, EntitySlotList};

mod priority;
pub use priority::{prioritize, sentence_order};

mod intents;
pub use intents::{Intent, IntentData, Intents, IntentsBuilder, IntentsSettings, ResponseType};

pub mod loader;
pub use loader::{load_dir, load_files, merge_documents, merge_yaml_strs};
