use serde::{Deserialize, Serialize};

/// Declarative form handed to the host for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub title: String,
    pub description: String,
    pub buttons: Vec<Button>,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Cancel,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Input,
    Password,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    DigitsOnly,
}

impl Validator {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Validator::DigitsOnly => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placeholder: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub readonly: bool,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
}

impl FormField {
    pub fn input(key: &str, label: &str, value: impl Into<String>) -> Self {
        FormField {
            field_type: FieldType::Input,
            key: key.to_string(),
            label: label.to_string(),
            placeholder: String::new(),
            required: true,
            readonly: false,
            value: value.into(),
            validator: None,
            lines: None,
        }
    }

    pub fn password(key: &str, label: &str, value: impl Into<String>) -> Self {
        FormField {
            field_type: FieldType::Password,
            ..Self::input(key, label, value)
        }
    }

    pub fn console(key: &str, label: &str, value: impl Into<String>, lines: usize) -> Self {
        FormField {
            field_type: FieldType::Console,
            required: false,
            readonly: true,
            lines: Some(lines),
            ..Self::input(key, label, value)
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Value as the host should display it. Masked fields never echo the secret.
    pub fn display_value(&self) -> String {
        match self.field_type {
            FieldType::Password => "*".repeat(self.value.chars().count()),
            _ => self.value.clone(),
        }
    }
}
