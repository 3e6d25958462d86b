use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::controller::FieldKey;
use super::surface::{FieldKind, FieldValue, FormSurface, GroupState, NativeValidity};

#[derive(Clone, Debug)]
pub struct InMemoryField {
    key: FieldKey,
    kind: FieldKind,
    value: FieldValue,
    attributes: BTreeMap<String, String>,
    validity: Option<NativeValidity>,
    region: Option<String>,
    region_writes: usize,
    group: GroupState,
    feedback: bool,
    feedback_icon: Option<String>,
    offset_top: f64,
}

impl InMemoryField {
    pub fn new(key: impl Into<FieldKey>, kind: FieldKind) -> Self {
        let value = match kind {
            FieldKind::Checkbox => FieldValue::Checked(false),
            FieldKind::Radio => FieldValue::Selected(false),
            _ => FieldValue::Text(String::new()),
        };
        Self {
            key: key.into(),
            kind,
            value,
            attributes: BTreeMap::new(),
            validity: None,
            region: None,
            region_writes: 0,
            group: GroupState::Neutral,
            feedback: false,
            feedback_icon: None,
            offset_top: 0.0,
        }
    }

    pub fn text(key: impl Into<FieldKey>) -> Self {
        Self::new(key, FieldKind::Text)
    }

    pub fn checkbox(key: impl Into<FieldKey>) -> Self {
        Self::new(key, FieldKind::Checkbox)
    }

    pub fn radio_group(key: impl Into<FieldKey>) -> Self {
        Self::new(key, FieldKind::Radio)
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = FieldValue::Text(value.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.value = checked_value(self.kind, checked);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn required(self) -> Self {
        self.attr("required", "")
    }

    pub fn error_region(mut self, content: impl Into<String>) -> Self {
        self.region = Some(content.into());
        self
    }

    pub fn feedback(mut self) -> Self {
        self.feedback = true;
        self
    }

    pub fn group(mut self, group: GroupState) -> Self {
        self.group = group;
        self
    }

    pub fn offset_top(mut self, top: f64) -> Self {
        self.offset_top = top;
        self
    }

    pub fn validity(mut self, validity: NativeValidity) -> Self {
        self.validity = Some(validity);
        self
    }

    fn computed_validity(&self) -> NativeValidity {
        if let Some(validity) = &self.validity {
            return validity.clone();
        }

        let mut validity = NativeValidity {
            value_missing: self.attributes.contains_key("required") && !self.value.is_filled(),
            ..NativeValidity::default()
        };
        let text = match &self.value {
            FieldValue::Text(text) if self.value.is_non_empty() => text.trim(),
            _ => return validity,
        };

        match self.kind {
            FieldKind::Email => validity.type_mismatch = !looks_like_email(text),
            FieldKind::Url => {
                validity.type_mismatch =
                    !(text.starts_with("http://") || text.starts_with("https://"))
            }
            FieldKind::Number => match text.parse::<f64>() {
                Ok(number) => {
                    let bound = |name: &str| {
                        self.attributes
                            .get(name)
                            .and_then(|raw| raw.trim().parse::<f64>().ok())
                    };
                    validity.range_underflow = bound("min").is_some_and(|min| number < min);
                    validity.range_overflow = bound("max").is_some_and(|max| number > max);
                }
                Err(_) => validity.bad_input = true,
            },
            _ => {}
        }
        if let Some(max) = self
            .attributes
            .get("maxlength")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
        {
            validity.too_long = text.chars().count() > max;
        }
        validity
    }
}

#[derive(Default)]
struct SurfaceState {
    fields: Vec<InMemoryField>,
    form_attributes: BTreeMap<String, String>,
    submit_disabled: bool,
    native_validation: bool,
    scroll_top: Option<f64>,
    focused: Option<FieldKey>,
}

impl SurfaceState {
    fn field(&self, key: &FieldKey) -> Option<&InMemoryField> {
        self.fields.iter().find(|field| &field.key == key)
    }

    fn field_mut(&mut self, key: &FieldKey) -> Option<&mut InMemoryField> {
        self.fields.iter_mut().find(|field| &field.key == key)
    }
}

#[derive(Clone)]
pub struct InMemorySurface {
    state: Arc<RwLock<SurfaceState>>,
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SurfaceState {
                native_validation: true,
                ..SurfaceState::default()
            })),
        }
    }

    pub fn with_field(self, field: InMemoryField) -> Self {
        self.insert_field(field);
        self
    }

    pub fn insert_field(&self, field: InMemoryField) {
        let mut state = self.write();
        match state.field_mut(&field.key) {
            Some(slot) => *slot = field,
            None => state.fields.push(field),
        }
    }

    pub fn remove_field(&self, key: impl Into<FieldKey>) {
        let key = key.into();
        self.write().fields.retain(|field| field.key != key);
    }

    pub fn set_form_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write()
            .form_attributes
            .insert(name.into(), value.into());
    }

    pub fn set_value(&self, key: impl Into<FieldKey>, value: impl Into<String>) {
        let key = key.into();
        if let Some(field) = self.write().field_mut(&key) {
            field.value = FieldValue::Text(value.into());
        }
    }

    pub fn set_checked(&self, key: impl Into<FieldKey>, checked: bool) {
        let key = key.into();
        if let Some(field) = self.write().field_mut(&key) {
            field.value = checked_value(field.kind, checked);
        }
    }

    pub fn set_attribute(
        &self,
        key: impl Into<FieldKey>,
        name: impl Into<String>,
        value: Option<String>,
    ) {
        let key = key.into();
        if let Some(field) = self.write().field_mut(&key) {
            let name = name.into();
            match value {
                Some(value) => field.attributes.insert(name, value),
                None => field.attributes.remove(&name),
            };
        }
    }

    pub fn set_validity(&self, key: impl Into<FieldKey>, validity: Option<NativeValidity>) {
        let key = key.into();
        if let Some(field) = self.write().field_mut(&key) {
            field.validity = validity;
        }
    }

    pub fn region(&self, key: impl Into<FieldKey>) -> Option<String> {
        let key = key.into();
        self.read().field(&key).and_then(|field| field.region.clone())
    }

    pub fn region_writes(&self, key: impl Into<FieldKey>) -> usize {
        let key = key.into();
        self.read()
            .field(&key)
            .map_or(0, |field| field.region_writes)
    }

    pub fn group(&self, key: impl Into<FieldKey>) -> GroupState {
        let key = key.into();
        self.read()
            .field(&key)
            .map_or(GroupState::Neutral, |field| field.group)
    }

    pub fn feedback_icon(&self, key: impl Into<FieldKey>) -> Option<String> {
        let key = key.into();
        self.read()
            .field(&key)
            .and_then(|field| field.feedback_icon.clone())
    }

    pub fn submit_disabled(&self) -> bool {
        self.read().submit_disabled
    }

    pub fn native_validation(&self) -> bool {
        self.read().native_validation
    }

    pub fn scroll_top(&self) -> Option<f64> {
        self.read().scroll_top
    }

    pub fn focused(&self) -> Option<FieldKey> {
        self.read().focused.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SurfaceState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, SurfaceState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FormSurface for InMemorySurface {
    fn field_keys(&self) -> Vec<FieldKey> {
        self.read()
            .fields
            .iter()
            .map(|field| field.key.clone())
            .collect()
    }

    fn kind(&self, key: &FieldKey) -> Option<FieldKind> {
        self.read().field(key).map(|field| field.kind)
    }

    fn value(&self, key: &FieldKey) -> Option<FieldValue> {
        self.read().field(key).map(|field| field.value.clone())
    }

    fn attribute(&self, key: &FieldKey, name: &str) -> Option<String> {
        self.read()
            .field(key)
            .and_then(|field| field.attributes.get(name).cloned())
    }

    fn form_attribute(&self, name: &str) -> Option<String> {
        self.read().form_attributes.get(name).cloned()
    }

    fn validity(&self, key: &FieldKey) -> NativeValidity {
        self.read()
            .field(key)
            .map(InMemoryField::computed_validity)
            .unwrap_or_default()
    }

    fn error_region(&self, key: &FieldKey) -> Option<String> {
        self.read().field(key).and_then(|field| field.region.clone())
    }

    fn set_error_region(&self, key: &FieldKey, markup: &str) {
        if let Some(field) = self.write().field_mut(key) {
            if field.region.is_some() {
                field.region = Some(markup.to_string());
                field.region_writes += 1;
            }
        }
    }

    fn group_state(&self, key: &FieldKey) -> GroupState {
        self.read()
            .field(key)
            .map_or(GroupState::Neutral, |field| field.group)
    }

    fn set_group_state(&self, key: &FieldKey, state: GroupState) {
        if let Some(field) = self.write().field_mut(key) {
            field.group = state;
        }
    }

    fn has_feedback(&self, key: &FieldKey) -> bool {
        self.read().field(key).is_some_and(|field| field.feedback)
    }

    fn set_feedback_icon(&self, key: &FieldKey, class: Option<&str>) {
        if let Some(field) = self.write().field_mut(key) {
            field.feedback_icon = class.map(str::to_string);
        }
    }

    fn set_submit_disabled(&self, disabled: bool) {
        self.write().submit_disabled = disabled;
    }

    fn set_native_validation(&self, enabled: bool) {
        self.write().native_validation = enabled;
    }

    fn offset_top(&self, key: &FieldKey) -> f64 {
        self.read().field(key).map_or(0.0, |field| field.offset_top)
    }

    fn scroll_to(&self, top: f64) {
        self.write().scroll_top = Some(top);
    }

    fn focus(&self, key: &FieldKey) {
        self.write().focused = Some(key.clone());
    }
}

fn checked_value(kind: FieldKind, checked: bool) -> FieldValue {
    match kind {
        FieldKind::Radio => FieldValue::Selected(checked),
        _ => FieldValue::Checked(checked),
    }
}

fn looks_like_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !text.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
