use color_eyre::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Question history file name inside the cache directory
pub const HISTORY_FILE: &str = "query_history.txt";

/// Registry of known cache files
const CACHE_FILES: &[&str] = &[HISTORY_FILE];

/// Manages cache directory and cache file operations
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    /// Create a CacheManager with a custom cache directory (primarily for testing)
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get path to a specific cache file
    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Ensure the cache directory exists
    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Clear all registered cache files
    pub fn clear_all(&self) -> Result<()> {
        for filename in CACHE_FILES {
            let file_path = self.cache_file(filename);
            if file_path.exists() {
                if let Err(e) = fs::remove_file(&file_path) {
                    tracing::warn!("Could not remove cache file {}: {}", filename, e);
                }
            }
        }

        Ok(())
    }
}

/// Previously asked questions, oldest first, persisted one per line.
pub struct QueryHistory {
    cache: CacheManager,
    entries: Vec<String>,
    limit: usize,
}

impl QueryHistory {
    /// Load history from the cache directory. A missing or unreadable file starts empty.
    pub fn load(cache: CacheManager, limit: usize) -> Self {
        let history_file = cache.cache_file(HISTORY_FILE);
        let entries = match fs::read_to_string(&history_file) {
            Ok(content) => {
                let lines: Vec<String> = content
                    .lines()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                let skip = lines.len().saturating_sub(limit);
                lines.into_iter().skip(skip).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("Could not read query history: {}", e);
                Vec::new()
            }
        };
        Self {
            cache,
            entries,
            limit,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Append a question, skipping blanks and immediate repeats, keeping at most `limit` entries.
    pub fn add(&mut self, question: &str) {
        let question = question.trim();
        if question.is_empty() || question.contains('\n') {
            return;
        }
        if self.entries.last().map(String::as_str) == Some(question) {
            return;
        }
        self.entries.push(question.to_string());
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
    }

    /// Rewrite the history file under an exclusive lock.
    pub fn save(&self) -> Result<()> {
        self.cache.ensure_cache_dir()?;
        let history_file = self.cache.cache_file(HISTORY_FILE);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&history_file)?;

        if let Err(e) = fs2::FileExt::try_lock_exclusive(&file) {
            tracing::warn!("Could not lock history file: {}", e);
        }

        for question in &self.entries {
            writeln!(file, "{}", question)?;
        }
        file.flush()?;
        Ok(())
    }
}
