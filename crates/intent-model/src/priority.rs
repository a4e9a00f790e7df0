//! Match-priority ordering of sentence templates
//!
//! A wildcard list absorbs arbitrary text, so a template like
//! `play {album} by {artist}` would swallow `... in {room}` when `album`,
//! `artist` and `room` are wildcards. Templates that reference a wildcard list
//! are ordered by how much literal text they carry, most first:
//!
//! - `play {album} by {artist} in {room}`
//! - `play {album} by {artist}`

use crate::expression::Sentence;
use std::collections::HashSet;

/// Sort key for one sentence; lower keys are tried first.
pub fn sentence_order(sentence: &Sentence, wildcard_list_names: &HashSet<String>) -> i64 {
    if wildcard_list_names.is_empty() {
        return 0;
    }

    let has_wildcards = sentence
        .list_names()
        .into_iter()
        .any(|name| wildcard_list_names.contains(name));

    if has_wildcards {
        -i64::try_from(sentence.text_chunk_count()).unwrap_or(i64::MAX)
    } else {
        0
    }
}

/// Order sentences for matching. The sort is stable, so sentences with equal
/// keys keep their input order.
pub fn prioritize(mut sentences: Vec<Sentence>, wildcard_list_names: &HashSet<String>) -> Vec<Sentence> {
    sentences.sort_by_key(|sentence| sentence_order(sentence, wildcard_list_names));
    sentences
}
