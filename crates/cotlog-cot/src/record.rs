//! Flat key/value records used for extraction.

/// Insertion-ordered string map.
///
/// Re-inserting an existing key replaces its value in place, so column
/// order follows the first time each key was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord {
    fields: Vec<(String, String)>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = FlatRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Parses `key: value` lines out of free text into `remarks_<key>` fields.
///
/// Keys are trimmed and inner spaces become underscores; values are
/// trimmed. Lines without a colon are skipped.
pub fn parse_remarks_lines(remarks: &str, record: &mut FlatRecord) {
    for line in remarks.lines() {
        let line = line.trim();
        if let Some((key, value)) = line.split_once(':') {
            let clean_key = key.trim().replace(' ', "_");
            record.insert(format!("remarks_{}", clean_key), value.trim());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = FlatRecord::new();
        record.insert("a", "1");
        record.insert("b", "2");
        record.insert("a", "3");
        let pairs: Vec<_> = record.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_parse_remarks_lines() {
        let mut record = FlatRecord::new();
        parse_remarks_lines(
            "Unit Name: Bravo 6\n  Grid : 18S UJ 2345 6789\nno colon here\nTime: 12:30",
            &mut record,
        );

        assert_eq!(record.get("remarks_Unit_Name"), Some("Bravo 6"));
        assert_eq!(record.get("remarks_Grid"), Some("18S UJ 2345 6789"));
        assert_eq!(record.get("remarks_Time"), Some("12:30"));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut base: FlatRecord = [("uid", "A"), ("point_lat", "1")].into_iter().collect();
        base.insert("point_lat", "2");
        base.insert("point_lon", "3");
        assert_eq!(base.get("point_lat"), Some("2"));
        assert_eq!(base.keys().collect::<Vec<_>>(), vec!["uid", "point_lat", "point_lon"]);
    }
}
