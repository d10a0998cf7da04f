//! Include/exclude regex pairs for paths and authors.

use regex::Regex;

use crate::error::{Error, Result};

/// An include pattern plus an optional exclude pattern.
#[derive(Debug, Clone, Default)]
struct Matcher {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Matcher {
    /// Compile `include` and `exclude`; an empty include matches everything
    /// and an empty exclude matches nothing.
    fn new(
        include: &str,
        exclude: &str,
        include_name: &'static str,
        exclude_name: &'static str,
    ) -> Result<Self> {
        Ok(Self {
            include: compile(include, include_name)?,
            exclude: compile(exclude, exclude_name)?,
        })
    }

    /// Whether any of `candidates` is included and none is excluded.
    fn accepts(&self, candidates: &[&str]) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|re| candidates.iter().any(|c| re.is_match(c)));
        let excluded = self
            .exclude
            .as_ref()
            .is_some_and(|re| candidates.iter().any(|c| re.is_match(c)));
        included && !excluded
    }
}

fn compile(pattern: &str, name: &'static str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| Error::FilterConfig { name, source })
}

/// Path filter built from `--files` / `--files-not`.
#[derive(Debug, Clone, Default)]
pub struct FileFilter(Matcher);

impl FileFilter {
    pub fn new(files: &str, files_not: &str) -> Result<Self> {
        Matcher::new(files, files_not, "files", "files-not").map(Self)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.0.accepts(&[path])
    }
}

/// Author filter built from `--authors` / `--authors-not`. Patterns are
/// tried against both the author name and email.
#[derive(Debug, Clone, Default)]
pub struct AuthorFilter(Matcher);

impl AuthorFilter {
    pub fn new(authors: &str, authors_not: &str) -> Result<Self> {
        Matcher::new(authors, authors_not, "authors", "authors-not").map(Self)
    }

    pub fn matches(&self, name: &str, email: &str) -> bool {
        self.0.accepts(&[name, email])
    }
}

/// The two filters every analysis applies. The default accepts everything.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub files: FileFilter,
    pub authors: AuthorFilter,
}

impl Filters {
    pub fn new(files: &str, files_not: &str, authors: &str, authors_not: &str) -> Result<Self> {
        Ok(Self {
            files: FileFilter::new(files, files_not)?,
            authors: AuthorFilter::new(authors, authors_not)?,
        })
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
