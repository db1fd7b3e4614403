use super::{DomainSource, DomainTask, SourceError};
use crate::config::InputConfig;
use crate::url::{extract_domain, normalize_url};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Plain-text domain list, one entry per line
///
/// ```text
/// # comments and blank lines are ignored
/// example.com
/// https://www.shop.example.org/
/// blog.example.net  https://blog.example.net/en/
/// ```
///
/// An entry is a bare domain or a URL, optionally followed by an explicit URL
/// to fetch. Bare domains are fetched over `http://`. When the same domain
/// appears twice, the first line wins.
#[derive(Debug, Clone)]
pub struct DomainListFile {
    path: PathBuf,
    strict: bool,
}

impl DomainListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            strict: false,
        }
    }

    /// The list named by the `[input]` section
    pub fn from_config(input: &InputConfig) -> Self {
        Self::new(&input.domains_path).strict(input.strict)
    }

    /// Fail on malformed lines instead of skipping them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DomainSource for DomainListFile {
    fn load_tasks(&self) -> Result<Vec<DomainTask>, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;

        let tasks = parse_domain_list(&content, self.strict)?;
        tracing::info!(
            "Loaded {} domains from {}",
            tasks.len(),
            self.path.display()
        );
        Ok(tasks)
    }
}

/// Parses the text of a domain list
pub(crate) fn parse_domain_list(content: &str, strict: bool) -> Result<Vec<DomainTask>, SourceError> {
    let mut tasks = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_entry(line) {
            Ok(task) => {
                if seen.insert(task.domain.clone()) {
                    tasks.push(task);
                } else {
                    tracing::debug!("Duplicate domain {} on line {}", task.domain, index + 1);
                }
            }
            Err(message) if strict => {
                return Err(SourceError::InvalidEntry {
                    line: index + 1,
                    message,
                });
            }
            Err(message) => {
                tracing::warn!("Skipping line {}: {}", index + 1, message);
            }
        }
    }

    Ok(tasks)
}

fn parse_entry(line: &str) -> Result<DomainTask, String> {
    let mut parts = line.split(|c: char| c.is_whitespace() || c == ',' || c == ';');
    let first = parts.next().unwrap_or_default();
    let explicit = parts.find(|p| !p.is_empty());

    let entry = normalize_url(first).map_err(|e| format!("'{}': {}", first, e))?;
    let domain = extract_domain(&entry).ok_or_else(|| format!("'{}' has no host", first))?;

    let url = match explicit {
        Some(target) => normalize_url(target)
            .map_err(|e| format!("'{}': {}", target, e))?
            .to_string(),
        None => entry.to_string(),
    };

    Ok(DomainTask { url, domain })
}
