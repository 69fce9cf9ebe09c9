//! Line pattern tables used by the classifier.
//!
//! The tables are plain configuration: callers can swap in patterns for other
//! ecosystems without touching the rule chain. Patterns are compiled once
//! with `regex-lite` and matched against trimmed lines.

use regex_lite::Regex;

use crate::errors::ConfigError;

/// Import/include/use statement shapes across common languages.
pub const DEFAULT_IMPORT_PATTERNS: &[&str] = &[
    r"^import\s",
    r"^from\s",
    r"^require\(",
    r"^export\s.*\sfrom\s",
    r"^const\s+[\w{].*=\s*require",
    r"^@import\s",
    r"^@use\s",
];

/// `"name": "version-range"` entries as found in dependency manifests.
pub const DEFAULT_VERSION_PATTERN: &str = r#"^\s*"[^"]+"\s*:\s*"[\w^~>=<.*:| -]"#;

/// Compiled, immutable pattern tables.
#[derive(Debug, Clone)]
pub struct PatternTable {
    import: Vec<Regex>,
    version: Regex,
}

impl PatternTable {
    /// Compile the given tables. Fails on the first pattern that does not
    /// compile, naming the config field it came from.
    pub fn new<S: AsRef<str>>(
        import_patterns: &[S],
        version_pattern: &str,
    ) -> Result<Self, ConfigError> {
        let import = import_patterns
            .iter()
            .map(|p| compile("classifier.import_patterns", p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let version = compile("classifier.version_pattern", version_pattern)?;
        Ok(Self { import, version })
    }

    /// `true` if `line` looks like an import-style statement.
    pub fn is_import(&self, line: &str) -> bool {
        self.import.iter().any(|re| re.is_match(line))
    }

    /// `true` if `line` looks like a manifest version entry.
    pub fn is_version_entry(&self, line: &str) -> bool {
        self.version.is_match(line)
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new(DEFAULT_IMPORT_PATTERNS, DEFAULT_VERSION_PATTERN)
            .expect("built-in pattern tables must compile")
    }
}

fn compile(field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        field: field.to_string(),
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}
