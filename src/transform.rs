use crate::error::Result;
use crate::ir::{canonical_key, FieldCatalog, Record};
use crate::resolve::resolve_field;
use serde_json::Value as Json;
use std::collections::HashMap;

/// Records sharing one resolved value of the grouping field.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'r> {
    pub key: Json,
    /// Label of the first record that introduced the key.
    pub label: Json,
    pub entries: Vec<&'r Record>,
}

/// Buckets in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Groups<'r> {
    buckets: Vec<Bucket<'r>>,
    index: HashMap<String, usize>,
}

impl<'r> Groups<'r> {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket<'r>> {
        self.buckets.iter()
    }

    pub fn get(&self, key: &Json) -> Option<&Bucket<'r>> {
        self.index.get(&canonical_key(key)).map(|&i| &self.buckets[i])
    }

    fn insert(&mut self, key: Json, label: Json, entry: &'r Record) {
        let slot = match self.index.get(&canonical_key(&key)) {
            Some(&i) => i,
            None => {
                self.index.insert(canonical_key(&key), self.buckets.len());
                self.buckets.push(Bucket {
                    key,
                    label,
                    entries: Vec::new(),
                });
                self.buckets.len() - 1
            }
        };
        self.buckets[slot].entries.push(entry);
    }
}

/// Partition records by the resolved value of `field_name`.
pub fn group_by<'r, I>(field_name: &str, catalog: &FieldCatalog, records: I) -> Result<Groups<'r>>
where
    I: IntoIterator<Item = &'r Record>,
{
    let mut groups = Groups::default();
    for record in records {
        let resolved = resolve_field(catalog, record, field_name)?;
        groups.insert(resolved.value, resolved.label, record);
    }
    Ok(groups)
}

/// Flatten grouped buckets back into one list, bucket by bucket.
pub fn all_entries<'r>(groups: &Groups<'r>) -> Vec<&'r Record> {
    groups
        .iter()
        .flat_map(|b| b.entries.iter().copied())
        .collect()
}

/// Resolved labels of `field_name` across entries.
pub fn values_for_y_field(entries: &[&Record], field_name: &str, catalog: &FieldCatalog) -> Result<Vec<Json>> {
    entries
        .iter()
        .map(|entry| resolve_field(catalog, entry, field_name).map(|r| r.label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldDescriptor;
    use serde_json::json;

    fn make_catalog() -> FieldCatalog {
        FieldCatalog::new()
            .with(
                "category",
                FieldDescriptor::selection(vec![(1, "Fruit"), (2, "Vegetable")]),
            )
            .with("name", FieldDescriptor::scalar())
    }

    fn make_records() -> Vec<Record> {
        [
            json!({"category": 1, "name": "Apple"}),
            json!({"category": 1, "name": "Banana"}),
            json!({"category": 2, "name": "Carrot"}),
            json!({"category": 2, "name": "Lettuce"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn test_group_by_selection() {
        let records = make_records();
        let groups = group_by("category", &make_catalog(), &records).unwrap();
        assert_eq!(groups.len(), 2);

        let fruit = groups.get(&json!(1)).unwrap();
        assert_eq!(fruit.label, json!("Fruit"));
        assert_eq!(fruit.entries.len(), 2);
        assert_eq!(fruit.entries[1]["name"], json!("Banana"));

        let keys: Vec<&Json> = groups.iter().map(|b| &b.key).collect();
        assert_eq!(keys, vec![&json!(1), &json!(2)]);
    }

    #[test]
    fn test_group_by_first_label_wins() {
        let catalog = FieldCatalog::new().with("partner", FieldDescriptor::reference());
        let records: Vec<Record> = [
            json!({"partner": [7, "Old name"]}),
            json!({"partner": [7, "New name"]}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let groups = group_by("partner", &catalog, &records).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(&json!(7)).unwrap().label, json!("Old name"));
    }

    #[test]
    fn test_group_by_is_a_partition() {
        let records = make_records();
        let groups = group_by("name", &make_catalog(), &records).unwrap();
        let flattened = all_entries(&groups);
        assert_eq!(flattened.len(), records.len());
        for record in &records {
            assert_eq!(flattened.iter().filter(|r| **r == record).count(), 1);
        }
    }

    #[test]
    fn test_group_by_unknown_field() {
        let records = make_records();
        assert!(group_by("missing", &make_catalog(), &records).is_err());
    }

    #[test]
    fn test_values_for_y_field() {
        let records = make_records();
        let entries = vec![&records[0], &records[2], &records[1]];
        let labels = values_for_y_field(&entries, "category", &make_catalog()).unwrap();
        assert_eq!(labels, vec![json!("Fruit"), json!("Vegetable"), json!("Fruit")]);
    }
}
