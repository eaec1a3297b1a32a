//! Prompt tools — validated reads from the prompt directory.
//!
//! Filenames must match `^[A-Za-z0-9_.-]+$`; anything else (path
//! separators, traversal, empty) is `INVALID_FILENAME` before the
//! filesystem is touched.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};

use pl_domain::tool::{ToolError, ToolErrorCode};

/// The orchestrator prompt's well-known filename.
pub const ORCHESTRATOR_PROMPT: &str = "orchestrator.md";

/// Prompt directory handle.
pub struct PromptStore {
    root: PathBuf,
}

impl PromptStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// `load_prompt(filename)` — validated read.
    pub fn load_prompt(&self, args: LoadPromptArgs) -> Result<Value, ToolError> {
        if !is_valid_filename(&args.filename) {
            return Err(ToolError {
                code: ToolErrorCode::InvalidFilename,
                message: format!("invalid prompt filename {:?}", args.filename),
            });
        }

        let path = self.root.join(&args.filename);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError {
                    code: ToolErrorCode::FileNotFound,
                    message: format!("no prompt file named {}", args.filename),
                });
            }
            Err(e) => {
                return Err(ToolError {
                    code: ToolErrorCode::ReadError,
                    message: e.to_string(),
                });
            }
        };

        let content = String::from_utf8(bytes).map_err(|_| ToolError {
            code: ToolErrorCode::EncodingError,
            message: format!("prompt file {} is not valid UTF-8", args.filename),
        })?;

        Ok(json!({ "filename": args.filename, "content": content }))
    }

    /// `load_orchestrator_prompt()` — the fixed entry prompt.
    pub fn load_orchestrator_prompt(&self) -> Result<Value, ToolError> {
        self.load_prompt(LoadPromptArgs {
            filename: ORCHESTRATOR_PROMPT.to_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoadPromptArgs {
    pub filename: String,
}

/// `^[A-Za-z0-9_.-]+$`, with the extra guard that the name is not made
/// entirely of dots.
fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        && name.chars().any(|c| c != '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_filenames() {
        assert!(is_valid_filename("orchestrator.md"));
        assert!(is_valid_filename("extract_slots-v2.md"));
    }

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(!is_valid_filename("../secrets.md"));
        assert!(!is_valid_filename("sub/dir.md"));
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename(".."));
        assert!(!is_valid_filename("a b.md"));
    }

    #[test]
    fn load_prompt_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greet.md"), "Ask one question.").unwrap();
        let store = PromptStore::new(dir.path());

        let out = store
            .load_prompt(LoadPromptArgs {
                filename: "greet.md".into(),
            })
            .unwrap();
        assert_eq!(out["content"], "Ask one question.");
    }

    #[test]
    fn traversal_yields_invalid_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path());
        let err = store
            .load_prompt(LoadPromptArgs {
                filename: "../../etc/passwd".into(),
            })
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::InvalidFilename);
    }

    #[test]
    fn missing_file_yields_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path());
        let err = store
            .load_prompt(LoadPromptArgs {
                filename: "absent.md".into(),
            })
            .unwrap_err();
        assert_eq!(err.code, ToolErrorCode::FileNotFound);
    }
}
