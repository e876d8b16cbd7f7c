//! Small record and list helpers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cast::Record;

/// Call `f(chunk, page)` for consecutive chunks of `items`.
///
/// Pages are numbered from 1. Nothing is called for empty input, and a
/// `len` of zero treats the whole slice as one chunk.
pub fn chunk_each<T, F>(items: &[T], len: usize, mut f: F)
where
    F: FnMut(&[T], usize),
{
    if items.is_empty() {
        return;
    }
    if len == 0 || items.len() <= len {
        f(items, 1);
        return;
    }
    for (i, chunk) in items.chunks(len).enumerate() {
        f(chunk, i + 1);
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: usize,
    pub list: T,
}

/// Wrap a list with its total count.
pub fn paginate<T>(total: usize, list: T) -> Page<T> {
    Page { total, list }
}

/// Like [`paginate`], loading the list only when `total` is non-zero.
pub fn paginate_with<T, F>(total: usize, load: F) -> Page<T>
where
    T: Default,
    F: FnOnce(usize) -> T,
{
    let list = if total > 0 { load(total) } else { T::default() };
    paginate(total, list)
}

/// Rename record keys, following the order of `renames`.
///
/// Missing keys are skipped. A renamed key moves to the end of the record
/// unless the target already exists, in which case it is overwritten in
/// place.
pub fn rename_keys(mut record: Record, renames: &IndexMap<String, String>) -> Record {
    for (old, new) in renames {
        if old == new {
            continue;
        }
        let Some(value) = record.shift_remove(old) else {
            continue;
        };
        record.insert(new.clone(), value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_chunk_each() {
        let items: Vec<u32> = (1..=5).collect();
        let mut seen = Vec::new();
        chunk_each(&items, 2, |chunk, page| seen.push((chunk.to_vec(), page)));

        assert_eq!(
            seen,
            vec![(vec![1, 2], 1), (vec![3, 4], 2), (vec![5], 3)]
        );
    }

    #[test]
    fn test_chunk_each_small_and_empty() {
        let mut calls = 0;
        chunk_each(&[1, 2], 10, |chunk, page| {
            calls += 1;
            assert_eq!(chunk, &[1, 2]);
            assert_eq!(page, 1);
        });
        chunk_each::<u8, _>(&[], 10, |_, _| calls += 100);
        chunk_each(&[1, 2, 3], 0, |chunk, _| {
            calls += 1;
            assert_eq!(chunk.len(), 3);
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_paginate_with_skips_load() {
        let page: Page<Vec<u8>> = paginate_with(0, |_| panic!("should not load"));
        assert_eq!(page, paginate(0, Vec::new()));

        let page = paginate_with(2, |total| vec![total; total]);
        assert_eq!(page.list, vec![2, 2]);
    }

    #[test]
    fn test_page_serializes() {
        let page = paginate(1, vec![json!({"a": 1})]);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"total": 1, "list": [{"a": 1}]})
        );
    }

    #[test]
    fn test_rename_keys() {
        let mut renames = IndexMap::new();
        renames.insert("a".to_string(), "b".to_string());
        renames.insert("b".to_string(), "c".to_string());
        renames.insert("missing".to_string(), "x".to_string());

        // Chains follow map order: a -> b, then b -> c.
        let out = rename_keys(record(json!({"a": 1, "z": 2})), &renames);
        assert_eq!(out, record(json!({"z": 2, "c": 1})));
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "c"]);
    }

    #[test]
    fn test_rename_keys_overwrites_existing_target() {
        let mut renames = IndexMap::new();
        renames.insert("old".to_string(), "new".to_string());

        let out = rename_keys(record(json!({"new": 1, "old": 2, "k": 3})), &renames);
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["new", "k"]);
        assert_eq!(out["new"], json!(2));
    }

    #[test]
    fn test_rename_keys_keeps_other_keys_in_place() {
        let mut renames = IndexMap::new();
        renames.insert("b".to_string(), "renamed".to_string());

        let out = rename_keys(record(json!({"a": 1, "b": 2, "c": 3, "d": 4})), &renames);
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c", "d", "renamed"]);
        assert_eq!(out["renamed"], json!(2));
    }
}
