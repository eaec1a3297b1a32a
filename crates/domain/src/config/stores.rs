//! Filesystem locations for the corpus, the data server's database, and
//! the prompt server's prompt directory.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    /// Directory of corpus documents (philosophies, structures, templates).
    #[serde(default = "d_corpus_path")]
    pub corpus_path: PathBuf,

    /// SQLite database file owned by the data tool server.
    #[serde(default = "d_database_path")]
    pub database_path: PathBuf,

    /// Directory of prompt files served by the prompt tool server.
    #[serde(default = "d_prompts_path")]
    pub prompts_path: PathBuf,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            corpus_path: d_corpus_path(),
            database_path: d_database_path(),
            prompts_path: d_prompts_path(),
        }
    }
}

fn d_corpus_path() -> PathBuf {
    PathBuf::from("corpus")
}

fn d_database_path() -> PathBuf {
    PathBuf::from("paceline.db")
}

fn d_prompts_path() -> PathBuf {
    PathBuf::from("prompts")
}
