//! Read-only access to the uploader store.
//!
//! The upload bot records who submitted each icon in `uploaders.json`, keyed
//! by base name:
//!
//! ```json
//! {
//!   "logo": { "userName": "alice", "userId": 123456789, "uploadTime": "2024-05-01T10:00:00.000Z" }
//! }
//! ```
//!
//! The pipeline never creates or edits records. It only copies them into the
//! manifest. A missing file means no uploader blocks. A record that does not
//! parse is skipped with a warning, and so is an unparsable file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Uploader id as the bot wrote it: Telegram ids are numbers, older records
/// stored strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(serde_json::Number),
    Text(String),
}

/// One uploader block, carried into the manifest verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<String>,
}

/// Base name → uploader record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploaderStore {
    records: BTreeMap<String, UploaderRecord>,
}

impl UploaderStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from `path`, skipping anything that does not parse.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::empty(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read uploader store");
                return Self::empty();
            }
        };
        let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "uploader store unreadable");
                return Self::empty();
            }
        };

        let mut records = BTreeMap::new();
        for (base, value) in raw {
            match serde_json::from_value::<UploaderRecord>(value) {
                Ok(record) => {
                    records.insert(base, record);
                }
                Err(e) => tracing::warn!(base = %base, error = %e, "skipping uploader record"),
            }
        }
        Self { records }
    }

    pub fn get(&self, base: &str) -> Option<&UploaderRecord> {
        self.records.get(base)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, UploaderRecord)> for UploaderStore {
    fn from_iter<I: IntoIterator<Item = (String, UploaderRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(UploaderStore::load(&tmp.path().join("uploaders.json")).is_empty());
    }

    #[test]
    fn load_numeric_and_string_ids() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uploaders.json");
        fs::write(
            &path,
            r#"{
  "logo": {"userName": "alice", "userId": 123456789, "uploadTime": "2024-05-01T10:00:00.000Z"},
  "cat": {"userName": "bob", "userId": "u-42", "uploadTime": "2024-05-02T10:00:00.000Z"}
}"#,
        )
        .unwrap();

        let store = UploaderStore::load(&path);

        assert_eq!(store.len(), 2);
        let logo = store.get("logo").unwrap();
        assert_eq!(logo.user_name.as_deref(), Some("alice"));
        assert!(matches!(&logo.user_id, Some(UserId::Number(n)) if n.as_u64() == Some(123456789)));
        assert_eq!(
            store.get("cat").unwrap().user_id,
            Some(UserId::Text("u-42".into()))
        );
    }

    #[test]
    fn serializes_back_to_camel_case_verbatim() {
        let record: UploaderRecord =
            serde_json::from_str(r#"{"userName":"alice","userId":7,"uploadTime":"t"}"#).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"userName":"alice","userId":7,"uploadTime":"t"}"#);
    }

    #[test]
    fn bad_record_is_skipped_others_kept() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uploaders.json");
        fs::write(&path, r#"{"ok": {"userName": "a"}, "bad": "not an object"}"#).unwrap();

        let store = UploaderStore::load(&path);

        assert_eq!(store.len(), 1);
        assert!(store.get("ok").is_some());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("uploaders.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(UploaderStore::load(&path).is_empty());
    }
}
