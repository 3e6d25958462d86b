use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::controller::{FormError, FormResult};
use super::surface::FormSurface;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    pub delay: u64,
    pub html: bool,
    pub disable: bool,
    pub focus: bool,
    pub errors: ErrorMessages,
    pub feedback: FeedbackClasses,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            delay: 500,
            html: false,
            disable: true,
            focus: true,
            errors: ErrorMessages::default(),
            feedback: FeedbackClasses::default(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessages {
    #[serde(rename = "match")]
    pub mismatch: String,
    pub minlength: String,
    pub remote: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            mismatch: "Does not match".to_string(),
            minlength: "Not long enough".to_string(),
            remote: "Remote check failed".to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackClasses {
    pub success: String,
    pub error: String,
}

impl Default for FeedbackClasses {
    fn default() -> Self {
        Self {
            success: "glyphicon-ok".to_string(),
            error: "glyphicon-remove".to_string(),
        }
    }
}

impl FormOptions {
    pub fn from_json(input: &str) -> FormResult<Self> {
        serde_json::from_str(input).map_err(|error| FormError::InvalidConfig(error.to_string()))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn with_form_attributes<S>(mut self, surface: &S) -> FormResult<Self>
    where
        S: FormSurface + ?Sized,
    {
        if let Some(raw) = surface.form_attribute("data-delay") {
            self.delay = raw.trim().parse().map_err(|_| {
                FormError::InvalidConfig(format!("data-delay must be milliseconds, got {raw:?}"))
            })?;
        }
        if let Some(html) = form_flag(surface, "data-html")? {
            self.html = html;
        }
        if let Some(disable) = form_flag(surface, "data-disable")? {
            self.disable = disable;
        }
        if let Some(focus) = form_flag(surface, "data-focus")? {
            self.focus = focus;
        }
        Ok(self)
    }
}

fn form_flag<S>(surface: &S, name: &str) -> FormResult<Option<bool>>
where
    S: FormSurface + ?Sized,
{
    let Some(raw) = surface.form_attribute(name) else {
        return Ok(None);
    };
    match raw.trim() {
        "" | "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        other => Err(FormError::InvalidConfig(format!(
            "{name} must be true or false, got {other:?}"
        ))),
    }
}
