use super::controller::FieldKey;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Text,
    Email,
    Url,
    Number,
    Password,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Hidden,
    Submit,
    Reset,
    Button,
}

impl FieldKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Self::Email,
            "url" => Self::Url,
            "number" | "range" => Self::Number,
            "password" => Self::Password,
            "textarea" => Self::Textarea,
            "select" | "select-one" | "select-multiple" => Self::Select,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "hidden" => Self::Hidden,
            "submit" | "image" => Self::Submit,
            "reset" => Self::Reset,
            "button" => Self::Button,
            _ => Self::Text,
        }
    }

    pub const fn is_validatable(self) -> bool {
        !matches!(
            self,
            Self::Hidden | Self::Submit | Self::Reset | Self::Button
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
    Selected(bool),
}

impl FieldValue {
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Text(text) => !text.trim().is_empty(),
            FieldValue::Checked(checked) | FieldValue::Selected(checked) => *checked,
        }
    }

    /// Untrimmed: whitespace counts as a value.
    pub fn is_non_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => !text.is_empty(),
            FieldValue::Checked(checked) | FieldValue::Selected(checked) => *checked,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text().map_or(0, |text| text.chars().count())
    }

    pub fn to_query_value(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Checked(checked) | FieldValue::Selected(checked) => checked.to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NativeValidity {
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub pattern_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
    pub bad_input: bool,
    pub message: Option<String>,
}

impl NativeValidity {
    pub fn is_valid(&self) -> bool {
        !(self.value_missing
            || self.type_mismatch
            || self.pattern_mismatch
            || self.too_long
            || self.too_short
            || self.range_underflow
            || self.range_overflow
            || self.step_mismatch
            || self.bad_input)
    }

    pub fn message(&self) -> String {
        match &self.message {
            Some(message) if !message.is_empty() => message.clone(),
            _ => self.default_message().to_string(),
        }
    }

    fn default_message(&self) -> &'static str {
        if self.value_missing {
            "Please fill out this field."
        } else if self.type_mismatch {
            "Please enter a valid value."
        } else if self.pattern_mismatch {
            "Please match the requested format."
        } else if self.too_long {
            "Please shorten this text."
        } else if self.too_short {
            "Please lengthen this text."
        } else if self.range_underflow {
            "Value must be greater."
        } else if self.range_overflow {
            "Value must be less."
        } else {
            "Please enter a valid value."
        }
    }

    pub fn error_attribute(&self) -> Option<&'static str> {
        if self.type_mismatch {
            Some("data-type-error")
        } else if self.pattern_mismatch {
            Some("data-pattern-error")
        } else if self.step_mismatch {
            Some("data-step-error")
        } else if self.range_overflow {
            Some("data-max-error")
        } else if self.range_underflow {
            Some("data-min-error")
        } else if self.value_missing {
            Some("data-required-error")
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GroupState {
    #[default]
    Neutral,
    Error,
    Success,
}

pub trait FormSurface: Send + Sync + 'static {
    fn field_keys(&self) -> Vec<FieldKey>;

    fn kind(&self, key: &FieldKey) -> Option<FieldKind>;

    fn value(&self, key: &FieldKey) -> Option<FieldValue>;

    fn attribute(&self, key: &FieldKey, name: &str) -> Option<String>;

    fn form_attribute(&self, name: &str) -> Option<String>;

    fn validity(&self, key: &FieldKey) -> NativeValidity;

    fn error_region(&self, key: &FieldKey) -> Option<String>;

    fn set_error_region(&self, key: &FieldKey, markup: &str);

    fn group_state(&self, key: &FieldKey) -> GroupState;

    fn set_group_state(&self, key: &FieldKey, state: GroupState);

    fn has_feedback(&self, key: &FieldKey) -> bool;

    fn set_feedback_icon(&self, key: &FieldKey, class: Option<&str>);

    fn set_submit_disabled(&self, disabled: bool);

    fn set_native_validation(&self, enabled: bool);

    fn offset_top(&self, key: &FieldKey) -> f64;

    fn scroll_to(&self, top: f64);

    fn focus(&self, key: &FieldKey);
}
