/// The process-wide "address bar" a view projects its state into.
///
/// Views read the query once when mounted and afterwards only write it.
pub trait Location {
    /// Current query string, without the leading `?`.
    fn query(&self) -> &str;

    /// Replace the query string (history-replace semantics).
    fn replace_query(&mut self, query: String);
}

/// A location held in memory, e.g. for the CLI or tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    path: String,
    query: String,
    writes: usize,
}

impl MemoryLocation {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        let query: String = query.into();
        Self {
            path: path.into(),
            query: query.trim_start_matches('?').to_owned(),
            writes: 0,
        }
    }

    /// `path?query`, or just the path when the query is empty.
    pub fn href(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// How many times the query has been replaced.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> &str {
        &self.query
    }

    fn replace_query(&mut self, query: String) {
        self.query = query;
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn href_joins_path_and_query() {
        let mut loc = MemoryLocation::new("/projects/demo", "?page=1");
        assert_eq!(loc.query(), "page=1");
        assert_eq!(loc.href(), "/projects/demo?page=1");
        loc.replace_query(String::new());
        assert_eq!(loc.href(), "/projects/demo");
        assert_eq!(loc.writes(), 1);
    }
}
