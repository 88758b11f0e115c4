/// Key-construction helpers for version counter records.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub separator: &'a str,
    pub version_field: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(separator: &'a str, version_field: &'a str) -> Self {
        Self {
            separator,
            version_field,
        }
    }

    /// Key of the record holding the latest version for `doc_type`.
    /// Format: doc_type + separator + version_field
    pub fn counter(&self, doc_type: &str) -> String {
        format!("{}{}{}", doc_type, self.separator, self.version_field)
    }

    pub fn is_counter(&self, key: &str) -> bool {
        key.strip_suffix(self.version_field)
            .is_some_and(|rest| rest.ends_with(self.separator) && rest.len() > self.separator.len())
    }
}

/// Prefix a store key with a namespace, when one is configured.
pub fn namespaced(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{key}"),
        _ => key.to_string(),
    }
}
