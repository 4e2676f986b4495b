//! Job variables and the `$NAME` substitutors

use serde::{Deserialize, Serialize};

/// A job variable
///
/// File variables are materialized to a file under the job's temporary
/// directory; their exported value is the path of that file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,

    /// Export the path of a file holding `value` instead of `value` itself
    #[serde(default)]
    pub file: bool,

    /// Never expand variable references inside `value`
    #[serde(default)]
    pub raw: bool,

    #[serde(default)]
    pub public: bool,

    #[serde(default)]
    pub internal: bool,

    /// Hidden from job logs
    #[serde(default)]
    pub masked: bool,
}

impl Variable {
    /// Creates a plain exported variable
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Creates a file-backed variable
    pub fn file(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            file: true,
            ..Self::new(key, value)
        }
    }

    /// Marks the variable as raw
    pub fn with_raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Marks the variable as masked
    pub fn with_masked(mut self) -> Self {
        self.masked = true;
        self
    }

    /// Marks the variable as internal and public (runner-provided)
    pub fn with_internal(mut self) -> Self {
        self.internal = true;
        self.public = true;
        self
    }
}

/// Ordered sequence of variables; later entries shadow earlier ones
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Vec<Variable>);

impl Variables {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, variable: Variable) {
        self.0.push(variable);
    }

    pub fn extend(&mut self, variables: impl IntoIterator<Item = Variable>) {
        self.0.extend(variables);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last variable declared with `key`
    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.0.iter().rev().find(|v| v.key == key)
    }

    /// Value of the last variable declared with `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(|v| v.value.as_str())
    }

    /// Boolean value of `key`; `"true"` and `"1"` are true, other set values false
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value(key).map(parse_bool)
    }

    /// File-backed variables, deduplicated by key (last declaration wins)
    pub fn file_variables(&self) -> Vec<&Variable> {
        let mut seen = std::collections::HashSet::new();
        let mut files: Vec<&Variable> = self
            .0
            .iter()
            .rev()
            .filter(|v| seen.insert(v.key.as_str()))
            .filter(|v| v.file)
            .collect();
        files.reverse();
        files
    }

    /// Expands `$NAME`, `${NAME}` and `%NAME%` against the variable values
    ///
    /// This is the cache key substitutor. Undefined names expand to the
    /// empty string.
    pub fn expand(&self, text: &str) -> String {
        expand_key_with(text, |name| self.value(name).map(str::to_string))
    }

    /// Expands `$NAME` and `${NAME}` only, as exported values are
    pub fn expand_value(&self, text: &str) -> String {
        expand_with(text, |name| self.value(name).map(str::to_string))
    }
}

impl FromIterator<Variable> for Variables {
    fn from_iter<T: IntoIterator<Item = Variable>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Variables {
    type Item = Variable;
    type IntoIter = std::vec::IntoIter<Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Variables {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parses the boolean spelling used by job variables
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A piece of an exported value after expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSegment {
    Text(String),
    /// Backing file of the named file variable; the writer renders the path
    FilePath(String),
}

/// One piece of a tokenized value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    /// Name of a referenced variable
    Reference(String),
}

/// Splits `text` into literal runs and variable references
///
/// `$$` produces a single `$`. A `$` or `%` that does not start a valid
/// reference is kept verbatim. `%NAME%` is only recognized with
/// `percent`. This is not a shell: no defaults, no command substitution,
/// no nested references.
pub fn tokenize(text: &str, percent: bool) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '$' if chars.get(i + 1) == Some(&'$') => {
                literal.push('$');
                i += 2;
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                let close = chars[i + 2..].iter().position(|&c| c == '}');
                match close {
                    Some(len) if len > 0 && chars[i + 2..i + 2 + len].iter().all(|&c| is_name_char(c)) => {
                        let name: String = chars[i + 2..i + 2 + len].iter().collect();
                        push_reference(&mut tokens, &mut literal, name);
                        i += len + 3;
                    }
                    _ => {
                        literal.push(c);
                        i += 1;
                    }
                }
            }
            '$' if chars.get(i + 1).is_some_and(|&c| is_name_start(c)) => {
                let len = chars[i + 1..]
                    .iter()
                    .take_while(|&&c| is_name_char(c))
                    .count();
                let name: String = chars[i + 1..i + 1 + len].iter().collect();
                push_reference(&mut tokens, &mut literal, name);
                i += len + 1;
            }
            '%' if percent && chars.get(i + 1).is_some_and(|&c| is_name_start(c)) => {
                let len = chars[i + 1..]
                    .iter()
                    .take_while(|&&c| is_name_char(c))
                    .count();
                if chars.get(i + 1 + len) == Some(&'%') {
                    let name: String = chars[i + 1..i + 1 + len].iter().collect();
                    push_reference(&mut tokens, &mut literal, name);
                    i += len + 2;
                } else {
                    literal.push(c);
                    i += 1;
                }
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Text(literal));
    }
    tokens
}

fn push_reference(tokens: &mut Vec<Token>, literal: &mut String, name: String) {
    if !literal.is_empty() {
        tokens.push(Token::Text(std::mem::take(literal)));
    }
    tokens.push(Token::Reference(name));
}

fn substitute<F>(tokens: Vec<Token>, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    tokens
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => text,
            Token::Reference(name) => lookup(&name).unwrap_or_default(),
        })
        .collect()
}

/// Substitutes `$NAME` and `${NAME}` using `lookup`
///
/// `%` is always literal, so Windows-style values such as
/// `%USERPROFILE%\bin` pass through untouched.
pub fn expand_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    substitute(tokenize(text, false), lookup)
}

/// Substitutes `$NAME`, `${NAME}` and `%NAME%` using `lookup`
pub fn expand_key_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    substitute(tokenize(text, true), lookup)
}
