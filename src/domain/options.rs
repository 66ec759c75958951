//! Selectable fields and operators supplied by the host.

/// One selectable field: display label and stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl From<&str> for FieldOption {
    fn from(value: &str) -> Self {
        Self::new(value, value)
    }
}

impl From<String> for FieldOption {
    fn from(value: String) -> Self {
        Self::new(value.clone(), value)
    }
}

/// Option lists a condition may select from.
///
/// An empty list accepts any value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    pub fields: Vec<FieldOption>,
    pub operators: Vec<String>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            fields: ["Amount", "Tags.Name", "Status"]
                .into_iter()
                .map(FieldOption::from)
                .collect(),
            operators: ["=", "!=", ">", "<", "contains"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EditorOptions {
    pub fn new(fields: Vec<FieldOption>, operators: Vec<String>) -> Self {
        Self { fields, operators }
    }

    pub fn accepts_field(&self, value: &str) -> bool {
        value.is_empty() || self.fields.is_empty() || self.fields.iter().any(|f| f.value == value)
    }

    pub fn accepts_operator(&self, value: &str) -> bool {
        value.is_empty() || self.operators.is_empty() || self.operators.iter().any(|o| o == value)
    }
}
