use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::error::DepError;

/// Lookup side of the variable store a build unit is configured from.
///
/// Values are already expanded; an empty or blank value is the same as an
/// undefined one.
pub trait Variables {
    fn get(&self, name: &str) -> Result<Option<String>, DepError>;

    fn get_list(&self, name: &str) -> Result<Vec<String>, DepError> {
        Ok(self
            .get(name)?
            .map(|value| value.split_whitespace().map(String::from).collect())
            .unwrap_or_default())
    }

    /// Per-file variable `<file>_<name>`, with non-alphanumerics in the file
    /// name replaced by underscores.
    fn get_file_local(&self, file: &str, name: &str) -> Result<Vec<String>, DepError> {
        let mut var: String = file
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        var.push('_');
        var.push_str(name);
        self.get_list(&var)
    }
}

impl Variables for HashMap<String, String> {
    fn get(&self, name: &str) -> Result<Option<String>, DepError> {
        Ok(HashMap::get(self, name)
            .filter(|value| !value.trim().is_empty())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_split_on_blanks() {
        let mut vars = HashMap::new();
        vars.insert(String::from("C_SRCS"), String::from(" a.c\tb.c  c.c "));
        vars.insert(String::from("EMPTY"), String::from("   "));
        vars.insert(String::from("foo_tab_DEPS"), String::from("x.h"));

        assert_eq!(vars.get_list("C_SRCS").unwrap(), ["a.c", "b.c", "c.c"]);
        assert_eq!(Variables::get(&vars, "EMPTY").unwrap(), None);
        assert!(vars.get_list("MISSING").unwrap().is_empty());
        assert_eq!(vars.get_file_local("foo.tab", "DEPS").unwrap(), ["x.h"]);
    }
}
