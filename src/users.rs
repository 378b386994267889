use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

/// The API users and their tokens, fixed for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Users {
    tokens: Arc<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct UsersFile {
    users: HashMap<String, String>,
}

impl Users {
    /// Load the `[users]` table of a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read users file {}", path.display()))?;
        let file: UsersFile = toml::from_str(&source).context("failed to deserialize users file")?;
        Ok(file.users.into_iter().collect())
    }

    /// Check that `username` exists and `token` is its token.
    pub fn validate(&self, username: &str, token: &str) -> bool {
        self.tokens
            .get(username)
            .map_or(false, |expected| expected == token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl FromIterator<(String, String)> for Users {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Users {
            tokens: Arc::new(iter.into_iter().collect()),
        }
    }
}
