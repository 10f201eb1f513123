/// Partial assignment of driver variables, in the order the wire
/// message listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverSet {
    fixes: Vec<(String, bool)>,
}

impl DriverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fix. A repeated name overwrites the earlier value,
    /// keeping its position.
    pub fn insert(&mut self, name: String, value: bool) {
        if let Some(fix) = self.fixes.iter_mut().find(|(n, _)| *n == name) {
            fix.1 = value;
        } else {
            self.fixes.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.fixes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.fixes.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Fixed-width label over `var_names`: the assigned bit where the
    /// variable is fixed, `-` where it is free. Fails if the set fixes
    /// a variable the model does not know about.
    pub fn label(&self, var_names: &[String]) -> Result<String, UnknownVariable> {
        for (name, _) in &self.fixes {
            if !var_names.iter().any(|v| v == name) {
                return Err(UnknownVariable(name.clone()));
            }
        }
        Ok(var_names
            .iter()
            .map(|name| match self.get(name) {
                Some(true) => '1',
                Some(false) => '0',
                None => '-',
            })
            .collect())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown variable '{0}' in driver set")]
pub struct UnknownVariable(pub String);
