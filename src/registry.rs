use std::{collections::HashMap, fs, path::Path};

/// Identifier → display-name mapping loaded once at startup. The source is a
/// line-oriented UTF-8 file, one `name,identifier` record per line.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: HashMap<String, String>,
}

impl Registry {
    /// A missing or unreadable source yields an empty registry; the kiosk
    /// still runs, every verification attempt will simply miss.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    target: "registry",
                    path = %path.display(),
                    error = %err,
                    "registry_source_unavailable"
                );
                return Self::default();
            }
        };
        Self::parse(&content)
    }

    pub(crate) fn parse(content: &str) -> Self {
        let mut records = HashMap::new();
        for line in content.lines() {
            let fields: Vec<&str> = line.trim().split(',').collect();
            let [name, identifier] = fields.as_slice() else {
                continue;
            };
            // Last write wins on duplicate identifiers.
            records.insert(identifier.to_string(), name.to_string());
        }
        Self { records }
    }

    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.records.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
