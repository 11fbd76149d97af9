use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use affiliator_core::{Entity, EntityLabel, TaggedDoc};

use crate::config::ParsingConfig;

/// Default key pattern: a single lowercase letter, a footnote symbol, or a
/// number of up to three digits.
pub static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z*†‡§¶#]$|^\d{1,3}$").unwrap());

/// Turn tagger output into the ordered, non-overlapping entity stream the
/// graph builders consume.
pub fn normalize_entities(doc: &TaggedDoc) -> Vec<Entity> {
    normalize_entities_with_config(doc, &ParsingConfig::default())
}

/// Config-aware version of [`normalize_entities`].
pub(crate) fn normalize_entities_with_config(doc: &TaggedDoc, config: &ParsingConfig) -> Vec<Entity> {
    let key_re = config.key_pattern.as_ref().unwrap_or(&*KEY_PATTERN);

    let mut entities = retain_entities(doc, key_re, config.strip_leading_keys);
    let keys = detect_keys(doc, &entities, key_re, config);
    let key_count = insert_keys(doc, &mut entities, &keys);

    tracing::debug!(
        entities = entities.len(),
        keys = key_count,
        "normalized entities"
    );
    entities
}

/// Add a KEY entity for each token index and restore start order.
///
/// A key overlapping an existing entity is skipped. Returns how many keys
/// were inserted.
fn insert_keys(doc: &TaggedDoc, entities: &mut Vec<Entity>, keys: &[usize]) -> usize {
    let mut inserted = 0;
    for &index in keys {
        let Some(token) = doc.tokens.get(index) else {
            continue;
        };
        if entities.iter().any(|e| e.overlaps(index, index + 1)) {
            tracing::trace!(token = index, text = %token.text, "skipping key overlapping an entity");
            continue;
        }
        entities.push(Entity::new(EntityLabel::Key, index, index + 1, &token.text));
        inserted += 1;
    }
    entities.sort_by_key(|e| e.start);
    inserted
}

/// Keep PERSON/ORG/GPE spans, trimming key-like leading tokens the tagger
/// swallowed into the entity.
fn retain_entities(doc: &TaggedDoc, key_re: &Regex, strip_leading_keys: bool) -> Vec<Entity> {
    let mut raw: Vec<_> = doc
        .entities
        .iter()
        .filter_map(|e| EntityLabel::from_tagger(&e.label).map(|label| (label, e.start, e.end)))
        .collect();
    raw.sort_by_key(|&(_, start, _)| start);

    let mut retained: Vec<Entity> = Vec::with_capacity(raw.len());
    for (label, mut start, end) in raw {
        let end = end.min(doc.tokens.len());
        if start >= end {
            continue;
        }
        if strip_leading_keys {
            while end - start > 1 && key_re.is_match(&doc.tokens[start].text) {
                start += 1;
            }
        }
        if retained.iter().any(|e| e.overlaps(start, end)) {
            tracing::trace!(%label, start, end, "dropping overlapping tagger entity");
            continue;
        }
        retained.push(Entity::new(label, start, end, doc.span_text(start, end)));
    }
    retained
}

/// Token indices promoted to keys, in document order.
///
/// A candidate is a token outside every retained entity that matches the key
/// pattern. Candidates are grouped by exact text and a group survives only
/// with at least `min_key_occurrences` members; tokens whose part of speech is
/// excluded are then dropped.
fn detect_keys(
    doc: &TaggedDoc,
    entities: &[Entity],
    key_re: &Regex,
    config: &ParsingConfig,
) -> Vec<usize> {
    let mut covered = vec![false; doc.tokens.len()];
    for e in entities {
        covered[e.start..e.end].iter_mut().for_each(|c| *c = true);
    }

    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, token) in doc.tokens.iter().enumerate() {
        if !covered[i] && key_re.is_match(&token.text) {
            groups.entry(token.text.as_str()).or_default().push(i);
        }
    }

    let excluded = config.excluded_pos();
    let mut keys: Vec<usize> = groups
        .into_values()
        .filter(|indices| indices.len() >= config.min_key_occurrences)
        .flatten()
        .filter(|&i| {
            doc.tokens[i]
                .pos
                .as_ref()
                .is_none_or(|pos| !excluded.iter().any(|x| x == pos))
        })
        .collect();
    keys.sort_unstable();
    keys
}
