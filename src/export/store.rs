use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::trace::EvaluationArtifact;
use super::ExportError;

/// Persisted, appendable collection of artifacts for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCollection {
    pub collection_id: String,
    pub name: String,
    pub description: String,
    /// Epoch seconds.
    pub created_at: i64,
    #[serde(default)]
    pub artifacts: Vec<EvaluationArtifact>,
}

/// Create-or-append persistence for [`ArtifactCollection`] files.
///
/// Every append is a whole-file read-modify-write: parse, push, rewrite
/// through a sibling temp file and rename. Single-writer by contract;
/// relative paths resolve against the process working directory at call time.
pub struct ArtifactStore;

impl ArtifactStore {
    pub fn append(
        path: impl AsRef<Path>,
        artifact: EvaluationArtifact,
    ) -> Result<(), ExportError> {
        let path = path.as_ref();

        let mut collection = if path.exists() {
            Self::load(path)?
        } else {
            debug!(path = %path.display(), "creating new artifact collection");
            ArtifactCollection {
                collection_id: Uuid::new_v4().to_string(),
                name: path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("artifacts")
                    .to_string(),
                description: String::new(),
                created_at: Utc::now().timestamp(),
                artifacts: Vec::new(),
            }
        };

        collection.artifacts.push(artifact);
        Self::write(path, &collection)?;
        info!(
            path = %path.display(),
            artifacts = collection.artifacts.len(),
            "artifact collection written"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<ArtifactCollection, ExportError> {
        let raw = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|error| ExportError::CollectionParse(error.to_string()))
    }

    fn write(path: &Path, collection: &ArtifactCollection) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(collection)?;

        // Whole-file rewrite via sibling temp file + rename; the target is
        // never left truncated.
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::export::trace::{ResultPayload, ToolInvocation, ToolResult};
    use crate::history::new_call_id;

    fn artifact(id: &str) -> EvaluationArtifact {
        let call_id = new_call_id();
        EvaluationArtifact {
            artifact_id: id.to_string(),
            user_query: "2+2?".to_string(),
            final_response: Some("4".to_string()),
            tool_invocations: vec![ToolInvocation {
                call_id,
                tool_name: "add".to_string(),
                arguments: json!({"a": 2, "b": 2}),
            }],
            tool_results: vec![ToolResult {
                call_id,
                payload: ResultPayload::Success { result: json!(4) },
            }],
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn creates_a_collection_with_one_artifact() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("golden.json");

        ArtifactStore::append(&path, artifact("first")).expect("append");

        let collection = ArtifactStore::load(&path).expect("load");
        assert_eq!(collection.name, "golden");
        assert_eq!(collection.artifacts.len(), 1);
        assert_eq!(collection.artifacts[0].artifact_id, "first");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/golden.json");

        ArtifactStore::append(&path, artifact("first")).expect("append");
        assert!(path.exists());
    }

    #[test]
    fn appends_leave_prior_artifacts_untouched() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("golden.json");

        ArtifactStore::append(&path, artifact("first")).expect("append");
        let before = ArtifactStore::load(&path).expect("load");

        ArtifactStore::append(&path, artifact("second")).expect("append");
        let after = ArtifactStore::load(&path).expect("load");

        assert_eq!(after.collection_id, before.collection_id);
        assert_eq!(after.artifacts.len(), 2);
        assert_eq!(after.artifacts[0], before.artifacts[0]);
        assert_eq!(after.artifacts[1].artifact_id, "second");
    }

    #[test]
    fn refuses_to_overwrite_a_foreign_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("golden.json");
        fs::write(&path, "not a collection").expect("write");

        let error = ArtifactStore::append(&path, artifact("first")).unwrap_err();
        assert!(matches!(error, ExportError::CollectionParse(_)));

        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw, "not a collection");
    }

    #[test]
    fn persisted_format_uses_stable_field_names() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("golden.json");
        ArtifactStore::append(&path, artifact("first")).expect("append");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert!(raw["collectionId"].is_string());
        assert!(raw["createdAt"].is_number());
        let entry = &raw["artifacts"][0];
        assert_eq!(entry["artifactId"], "first");
        assert_eq!(entry["userQuery"], "2+2?");
        assert_eq!(entry["finalResponse"], "4");
        assert_eq!(entry["toolInvocations"][0]["toolName"], "add");
        assert_eq!(entry["toolResults"][0]["payload"]["result"], 4);
    }
}
