use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures_timer::Delay;
use tracing::{debug, warn};

use super::controller::{
    FieldKey, FormController, FormError, FormResult, PassOutcome, Trigger, ValidationTicket,
    match_target, write_lock,
};
use super::events::{EventControl, ValidationEvent};
use super::options::ErrorMessages;
use super::remote::{RemoteRequest, RemoteVerdict};
use super::surface::{FieldValue, FormSurface, NativeValidity};

pub const NATIVE: &str = "native";
pub const MATCH: &str = "match";
pub const MINLENGTH: &str = "minlength";
pub const REMOTE: &str = "remote";

pub struct FieldContext<'a> {
    key: &'a FieldKey,
    value: &'a FieldValue,
    surface: &'a dyn FormSurface,
}

impl<'a> FieldContext<'a> {
    pub fn new(key: &'a FieldKey, value: &'a FieldValue, surface: &'a dyn FormSurface) -> Self {
        Self {
            key,
            value,
            surface,
        }
    }

    pub fn key(&self) -> &FieldKey {
        self.key
    }

    pub fn value(&self) -> &FieldValue {
        self.value
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.surface.attribute(self.key, name)
    }

    pub fn is_required(&self) -> bool {
        self.attribute("required").is_some()
    }

    pub fn config(&self, validator: &str) -> Option<String> {
        self.attribute(&format!("data-{validator}"))
    }

    pub fn value_of(&self, other: &FieldKey) -> Option<FieldValue> {
        self.surface.value(other)
    }

    pub fn validity(&self) -> NativeValidity {
        self.surface.validity(self.key)
    }
}

pub trait Validator: Send + Sync {
    fn validate(&self, field: &FieldContext<'_>) -> Option<String>;
}

impl<F> Validator for F
where
    F: Fn(&FieldContext<'_>) -> Option<String> + Send + Sync,
{
    fn validate(&self, field: &FieldContext<'_>) -> Option<String> {
        (self)(field)
    }
}

pub struct NativeValidator;

impl Validator for NativeValidator {
    fn validate(&self, field: &FieldContext<'_>) -> Option<String> {
        let validity = field.validity();
        (!validity.is_valid()).then(|| validity.message())
    }
}

pub struct MatchValidator {
    message: String,
}

impl MatchValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator for MatchValidator {
    fn validate(&self, field: &FieldContext<'_>) -> Option<String> {
        let target = match_target(&field.config(MATCH)?);
        let other = field
            .value_of(&target)
            .unwrap_or_else(|| FieldValue::Text(String::new()));
        (field.value() != &other).then(|| self.message.clone())
    }
}

pub struct MinLengthValidator {
    message: String,
}

impl MinLengthValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Validator for MinLengthValidator {
    fn validate(&self, field: &FieldContext<'_>) -> Option<String> {
        let threshold = field.config(MINLENGTH)?.trim().parse::<usize>().ok()?;
        (field.value().char_len() < threshold).then(|| self.message.clone())
    }
}

#[derive(Clone)]
pub struct ValidatorSet {
    entries: Vec<(String, Arc<dyn Validator>)>,
}

impl ValidatorSet {
    pub fn builtin(messages: &ErrorMessages) -> Self {
        let mut set = Self {
            entries: Vec::new(),
        };
        set.register(NATIVE, Arc::new(NativeValidator));
        set.register(MATCH, Arc::new(MatchValidator::new(&messages.mismatch)));
        set.register(
            MINLENGTH,
            Arc::new(MinLengthValidator::new(&messages.minlength)),
        );
        set
    }

    pub fn register(&mut self, name: impl Into<String>, validator: Arc<dyn Validator>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            Some((_, slot)) => *slot = validator,
            None => self.entries.push((name, validator)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn run(&self, field: &FieldContext<'_>) -> Vec<String> {
        let mut errors = Vec::new();
        if !field.value().is_non_empty() && !field.is_required() {
            return errors;
        }

        for (name, validator) in &self.entries {
            if name != NATIVE && field.config(name).is_none() {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| validator.validate(field)));
            let error = match outcome {
                Ok(error) => error,
                Err(payload) => {
                    warn!(
                        field = %field.key(),
                        validator = %name,
                        panic = panic_message(payload.as_ref()),
                        "validator panicked, treating it as passed"
                    );
                    None
                }
            };
            if let Some(error) = error {
                let message = resolve_message(field, name, error);
                if !errors.contains(&message) {
                    errors.push(message);
                }
            }
        }
        errors
    }
}

/// `data-<key>-error`, then the attribute for the failing native constraint,
/// then `data-error`, then the validator's own message.
pub(super) fn resolve_message(field: &FieldContext<'_>, key: &str, fallback: String) -> String {
    field
        .attribute(&format!("data-{key}-error"))
        .or_else(|| {
            field
                .validity()
                .error_attribute()
                .and_then(|name| field.attribute(name))
        })
        .or_else(|| field.attribute("data-error"))
        .unwrap_or(fallback)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

pub(super) struct PendingPass {
    pub(super) key: FieldKey,
    pub(super) trigger: Trigger,
    pub(super) ticket: ValidationTicket,
    pub(super) errors: Vec<String>,
    pub(super) remote: Option<RemoteRequest>,
}

impl<S> FormController<S>
where
    S: FormSurface,
{
    pub(super) async fn run_pass(&self, key: &FieldKey, trigger: Trigger) -> FormResult<PassOutcome> {
        let Some(pass) = self.begin_pass(key, trigger)? else {
            return Ok(PassOutcome::Cancelled);
        };
        let Some(errors) = self.resolve_remote(&pass).await? else {
            return Ok(PassOutcome::Superseded);
        };
        if !self.finish_pass(&pass, errors.clone())? {
            return Ok(PassOutcome::Superseded);
        }

        if !errors.is_empty() && pass.trigger.defers_errors() && self.options.delay > 0 {
            Delay::new(self.options.delay()).await;
            if self.is_latest(&pass.key, pass.ticket)? {
                self.show_errors(&pass.key)?;
            }
        }
        Ok(PassOutcome::Completed { errors })
    }

    pub(super) fn begin_pass(
        &self,
        key: &FieldKey,
        trigger: Trigger,
    ) -> FormResult<Option<PendingPass>> {
        let value = self
            .surface
            .value(key)
            .ok_or_else(|| FormError::UnknownField(key.clone()))?;

        let control = self.emit(ValidationEvent::Validate { field: key.clone() })?;
        if control == EventControl::Cancel {
            debug!(field = %key, "validation cancelled by listener");
            return Ok(None);
        }

        let ticket = {
            let mut state = write_lock(&self.state, "starting field validation")?;
            if state.destroyed {
                return Err(FormError::Destroyed);
            }
            state.next_ticket(key)
        };

        let context = FieldContext::new(key, &value, self.surface.as_ref());
        let errors = self.validators.run(&context);
        let remote = if errors.is_empty() && value.is_non_empty() {
            context
                .config(REMOTE)
                .filter(|endpoint| !endpoint.trim().is_empty())
                .map(|endpoint| RemoteRequest {
                    endpoint,
                    name: context.attribute("name").unwrap_or_else(|| key.to_string()),
                    value: value.to_query_value(),
                })
        } else {
            None
        };

        debug!(
            field = %key,
            ?trigger,
            ticket = ticket.0,
            errors = errors.len(),
            remote = remote.is_some(),
            "field validators ran"
        );
        Ok(Some(PendingPass {
            key: key.clone(),
            trigger,
            ticket,
            errors,
            remote,
        }))
    }

    pub(super) async fn resolve_remote(
        &self,
        pass: &PendingPass,
    ) -> FormResult<Option<Vec<String>>> {
        let mut errors = pass.errors.clone();
        let Some(request) = pass.remote.as_ref() else {
            return Ok(Some(errors));
        };

        if self.options.delay > 0 {
            Delay::new(self.options.delay()).await;
            if !self.is_latest(&pass.key, pass.ticket)? {
                return Ok(None);
            }
        }

        {
            let mut state = write_lock(&self.state, "marking remote check in flight")?;
            if !state.is_latest(&pass.key, pass.ticket) {
                return Ok(None);
            }
            state.ensure_meta(&pass.key).validating = true;
        }

        let verdict = match &self.transport {
            Some(transport) => transport.check(request).await,
            None => RemoteVerdict::Failed("no remote transport configured".to_string()),
        };

        if !self.is_latest(&pass.key, pass.ticket)? {
            debug!(field = %pass.key, ticket = pass.ticket.0, "discarding stale remote result");
            return Ok(None);
        }

        match verdict {
            RemoteVerdict::Accepted => {}
            RemoteVerdict::Rejected(message) => {
                errors.push(self.remote_message(&pass.key, message));
            }
            RemoteVerdict::Failed(reason) => {
                warn!(
                    field = %pass.key,
                    endpoint = %request.endpoint,
                    %reason,
                    "remote check failed"
                );
                errors.push(self.remote_message(&pass.key, None));
            }
        }
        Ok(Some(errors))
    }

    fn remote_message(&self, key: &FieldKey, message: Option<String>) -> String {
        let fallback = message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| self.options.errors.remote.clone());
        match self.surface.value(key) {
            Some(value) => {
                let context = FieldContext::new(key, &value, self.surface.as_ref());
                resolve_message(&context, REMOTE, fallback)
            }
            None => fallback,
        }
    }

    pub(super) fn finish_pass(&self, pass: &PendingPass, errors: Vec<String>) -> FormResult<bool> {
        let previous = {
            let mut state = write_lock(&self.state, "persisting field validation result")?;
            if !state.is_latest(&pass.key, pass.ticket) {
                return Ok(false);
            }
            let meta = state.ensure_meta(&pass.key);
            let previous = meta.validated.then(|| meta.errors.clone());
            meta.errors = errors.clone();
            meta.validated = true;
            meta.validating = false;
            previous
        };

        if errors.is_empty() {
            self.clear_errors(&pass.key)?;
        } else if !pass.trigger.defers_errors() || self.options.delay == 0 {
            self.show_errors(&pass.key)?;
        }

        if previous.as_ref() != Some(&errors) {
            let event = if errors.is_empty() {
                ValidationEvent::Valid {
                    field: pass.key.clone(),
                    previous: previous.unwrap_or_default(),
                }
            } else {
                ValidationEvent::Invalid {
                    field: pass.key.clone(),
                    errors,
                }
            };
            self.emit(event)?;
        }

        self.toggle_submit()?;
        self.emit(ValidationEvent::Validated {
            field: pass.key.clone(),
        })?;
        Ok(true)
    }
}
