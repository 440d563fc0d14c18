use rustc_hash::{FxHashMap, FxHashSet};

/// Hands out collision-free identifiers for one generation pass.
///
/// Names are sanitized to `[A-Za-z_$][A-Za-z0-9_$]*`, prefixed, and suffixed with an
/// increasing number until they are neither reserved nor already taken. The same id
/// always gets the same name until `reset`.
#[derive(Debug, Clone)]
pub struct NameManager {
    reserved: FxHashSet<String>,
    prefix: String,
    used: FxHashSet<String>,
    names_by_id: FxHashMap<String, String>,
}

impl NameManager {
    pub fn new<S: Into<String>>(reserved: impl IntoIterator<Item = S>, prefix: &str) -> Self {
        NameManager {
            reserved: reserved.into_iter().map(Into::into).collect(),
            prefix: prefix.to_owned(),
            used: FxHashSet::default(),
            names_by_id: FxHashMap::default(),
        }
    }

    /// The name previously given to `id`, or a fresh one allocated from `base`.
    pub fn get_name(&mut self, id: &str, base: &str) -> String {
        if let Some(name) = self.names_by_id.get(id) {
            return name.clone();
        }

        let name = self.get_distinct_name(base);
        self.names_by_id.insert(id.to_owned(), name.clone());
        name
    }

    pub fn get_distinct_name(&mut self, base: &str) -> String {
        let identifier = sanitize_identifier(&format!("{}{}", self.prefix, base));

        let mut candidate = identifier.clone();
        let mut suffix = 1usize;

        while self.reserved.contains(&candidate) || self.used.contains(&candidate) {
            candidate = format!("{}{}", identifier, suffix);
            suffix += 1;
        }

        self.used.insert(candidate.clone());
        candidate
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names_by_id.get(id).map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.used.clear();
        self.names_by_id.clear();
    }
}

pub fn sanitize_identifier(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());

    for (index, ch) in raw.chars().enumerate() {
        let is_valid = if index == 0 {
            ch == '_' || ch == '$' || ch.is_ascii_alphabetic()
        } else {
            ch == '_' || ch == '$' || ch.is_ascii_alphanumeric()
        };

        if is_valid {
            result.push(ch);
        } else if index == 0 && ch.is_ascii_digit() {
            result.push('_');
            result.push(ch);
        } else {
            result.push('_');
        }
    }

    if result.is_empty() {
        "_value".to_owned()
    } else {
        result
    }
}
