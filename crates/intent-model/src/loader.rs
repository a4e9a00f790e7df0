//! Deep-merge loader for intent documents

use crate::{IntentsError, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Deep-merge `overlay` into `base`.
///
/// Mappings merge key by key; any other value in `overlay` replaces the one in
/// `base`. Sequences are replaced, never concatenated.
pub fn merge_documents(base: &mut Value, overlay: Value) {
    let (base_map, overlay_map) = match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => (base_map, overlay_map),
        (base, overlay) => {
            *base = overlay;
            return;
        }
    };

    for (key, value) in overlay_map {
        let both_mappings = matches!(
            (base_map.get(&key), &value),
            (Some(Value::Mapping(_)), Value::Mapping(_))
        );
        if both_mappings {
            if let Some(existing) = base_map.get_mut(&key) {
                merge_documents(existing, value);
            }
        } else {
            base_map.insert(key, value);
        }
    }
}

/// Decode one YAML document. Empty documents decode to `None`.
pub fn parse_document(raw: &str, origin: &str) -> Result<Option<Value>> {
    let doc: Value = serde_yaml::from_str(raw)
        .map_err(|e| IntentsError::ConfigDecode(format!("parsing yaml {origin}: {e}")))?;
    match doc {
        Value::Null => Ok(None),
        Value::Mapping(_) => Ok(Some(doc)),
        _ => Err(IntentsError::ConfigDecode(format!(
            "{origin}: document root must be a mapping"
        ))),
    }
}

/// Decode and merge YAML sources in order.
pub fn merge_yaml_strs<I, S>(sources: I) -> Result<Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut merged = Value::Mapping(Mapping::new());
    for (index, raw) in sources.into_iter().enumerate() {
        let origin = format!("source #{index}");
        merge_source(&mut merged, raw.as_ref(), &origin)?;
    }
    Ok(merged)
}

/// Read, decode and merge YAML files in order.
pub fn load_files<I, P>(paths: I) -> Result<Value>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut merged = Value::Mapping(Mapping::new());
    for path in paths {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            IntentsError::ConfigDecode(format!("reading {}: {e}", path.display()))
        })?;
        merge_source(&mut merged, &raw, &path.display().to_string())?;
    }
    Ok(merged)
}

/// Load every `.yml`/`.yaml` file in `dir`, merged in file name order.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Value> {
    let dir = dir.as_ref();
    let read_err =
        |e: std::io::Error| IntentsError::ConfigDecode(format!("reading {}: {e}", dir.display()));

    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if let Some(ext) = path.extension() {
            if ext == "yml" || ext == "yaml" {
                entries.push(path);
            }
        }
    }
    entries.sort();
    load_files(entries)
}

fn merge_source(merged: &mut Value, raw: &str, origin: &str) -> Result<()> {
    match parse_document(raw, origin)? {
        Some(doc) => {
            tracing::debug!(source = origin, "merging intents document");
            merge_documents(merged, doc);
        }
        None => tracing::warn!(source = origin, "skipping empty intents document"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_merge_recurses_into_mappings() {
        let mut base = yaml("{language: en, settings: {ignore_whitespace: false, other: 1}}");
        merge_documents(&mut base, yaml("{settings: {ignore_whitespace: true}}"));
        assert_eq!(
            base,
            yaml("{language: en, settings: {ignore_whitespace: true, other: 1}}")
        );
    }

    #[test]
    fn test_merge_replaces_lists_and_scalars() {
        let mut base = yaml("{skip_words: [please, the], lists: {area: {values: [kitchen]}}}");
        merge_documents(
            &mut base,
            yaml("{skip_words: [could], lists: {area: {values: [bedroom]}}}"),
        );
        assert_eq!(
            base,
            yaml("{skip_words: [could], lists: {area: {values: [bedroom]}}}")
        );

        let mut base = yaml("{lists: {area: {values: [kitchen]}}}");
        merge_documents(&mut base, yaml("{lists: {area: 5}}"));
        assert_eq!(base, yaml("{lists: {area: 5}}"));
    }

    #[test]
    fn test_merge_yaml_strs_in_order() {
        let merged = merge_yaml_strs(["language: en\nskip_words: [a]", "", "skip_words: [b]"]).unwrap();
        assert_eq!(merged, yaml("{language: en, skip_words: [b]}"));
    }

    #[test]
    fn test_decode_errors() {
        let err = merge_yaml_strs(["language: [unclosed"]).unwrap_err();
        assert!(matches!(err, IntentsError::ConfigDecode(_)));

        let err = merge_yaml_strs(["- just\n- a list\n"]).unwrap_err();
        assert!(matches!(err, IntentsError::ConfigDecode(_)));

        let err = load_files(["/nonexistent/intents.yaml"]).unwrap_err();
        assert!(matches!(err, IntentsError::ConfigDecode(_)));
    }

    #[test]
    fn test_load_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("b.yaml", "language: de\n"),
            ("a.yml", "language: en\nskip_words: [bitte]\n"),
            ("notes.txt", "not yaml: ["),
        ] {
            let mut file = fs::File::create(dir.path().join(name)).unwrap();
            file.write_all(body.as_bytes()).unwrap();
        }

        let merged = load_dir(dir.path()).unwrap();
        assert_eq!(merged, yaml("{language: de, skip_words: [bitte]}"));
    }
}
