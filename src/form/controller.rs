use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{join, join_all};
use tracing::{debug, info};

use super::events::{EventControl, Listener, Listeners, ValidationEvent};
use super::options::FormOptions;
use super::remote::RemoteTransport;
use super::surface::{FormSurface, GroupState};
use super::validation::{Validator, ValidatorSet};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(Arc<str>);

impl FieldKey {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&FieldKey> for FieldKey {
    fn from(value: &FieldKey) -> Self {
        value.clone()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Trigger {
    Input,
    Change,
    Focusout,
    Submit,
}

impl Trigger {
    pub const fn defers_errors(self) -> bool {
        matches!(self, Trigger::Input | Trigger::Change)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldEvent {
    pub key: FieldKey,
    pub trigger: Trigger,
}

impl FieldEvent {
    pub fn new(key: impl Into<FieldKey>, trigger: Trigger) -> Self {
        Self {
            key: key.into(),
            trigger,
        }
    }

    pub fn input(key: impl Into<FieldKey>) -> Self {
        Self::new(key, Trigger::Input)
    }

    pub fn change(key: impl Into<FieldKey>) -> Self {
        Self::new(key, Trigger::Change)
    }

    pub fn focusout(key: impl Into<FieldKey>) -> Self {
        Self::new(key, Trigger::Focusout)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PassOutcome {
    Ignored,
    Cancelled,
    Superseded,
    Completed { errors: Vec<String> },
}

impl PassOutcome {
    pub fn errors(&self) -> Option<&[String]> {
        match self {
            PassOutcome::Completed { errors } => Some(errors.as_slice()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldMeta {
    pub validated: bool,
    pub validating: bool,
    pub showing: bool,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub form_id: FormId,
    pub fields: Vec<FieldKey>,
    pub field_meta: BTreeMap<FieldKey, FieldMeta>,
    pub has_errors: bool,
    pub is_incomplete: bool,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("form validation has been destroyed")]
    Destroyed,
    #[error("unknown field `{0}`")]
    UnknownField(FieldKey),
    #[error("invalid form configuration: {0}")]
    InvalidConfig(String),
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) struct FormState {
    pub(super) id: FormId,
    pub(super) destroyed: bool,
    pub(super) fields: Vec<FieldKey>,
    pub(super) dependencies: BTreeMap<FieldKey, BTreeSet<FieldKey>>,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta>,
    pub(super) tickets: BTreeMap<FieldKey, ValidationTicket>,
    pub(super) original_content: BTreeMap<FieldKey, String>,
}

impl FormState {
    fn new(
        id: FormId,
        fields: Vec<FieldKey>,
        dependencies: BTreeMap<FieldKey, BTreeSet<FieldKey>>,
    ) -> Self {
        Self {
            id,
            destroyed: false,
            fields,
            dependencies,
            field_meta: BTreeMap::new(),
            tickets: BTreeMap::new(),
            original_content: BTreeMap::new(),
        }
    }

    pub(super) fn ensure_meta(&mut self, key: &FieldKey) -> &mut FieldMeta {
        self.field_meta.entry(key.clone()).or_default()
    }

    pub(super) fn next_ticket(&mut self, key: &FieldKey) -> ValidationTicket {
        let next = ValidationTicket(
            self.tickets
                .get(key)
                .copied()
                .unwrap_or_default()
                .0
                .saturating_add(1),
        );
        self.tickets.insert(key.clone(), next);
        next
    }

    pub(super) fn is_latest(&self, key: &FieldKey, ticket: ValidationTicket) -> bool {
        !self.destroyed && self.tickets.get(key).copied() == Some(ticket)
    }

    pub(super) fn errors(&self, key: &FieldKey) -> &[String] {
        self.field_meta
            .get(key)
            .map(|meta| meta.errors.as_slice())
            .unwrap_or_default()
    }
}

/// Handles are cheap to clone and share the same state. Every operation
/// that reads or changes form state fails with [`FormError::Destroyed`]
/// after `destroy`; `options` and `surface` stay readable.
pub struct FormController<S>
where
    S: FormSurface,
{
    pub(super) options: Arc<FormOptions>,
    pub(super) surface: Arc<S>,
    pub(super) validators: Arc<ValidatorSet>,
    pub(super) transport: Option<Arc<dyn RemoteTransport>>,
    pub(super) listeners: Arc<RwLock<Listeners>>,
    pub(super) state: Arc<RwLock<FormState>>,
}

impl<S> Clone for FormController<S>
where
    S: FormSurface,
{
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            surface: self.surface.clone(),
            validators: self.validators.clone(),
            transport: self.transport.clone(),
            listeners: self.listeners.clone(),
            state: self.state.clone(),
        }
    }
}

pub struct FormBuilder<S>
where
    S: FormSurface,
{
    surface: S,
    options: FormOptions,
    read_form_attributes: bool,
    custom: Vec<(String, Arc<dyn Validator>)>,
    transport: Option<Arc<dyn RemoteTransport>>,
    listeners: Vec<Listener>,
}

impl<S> FormBuilder<S>
where
    S: FormSurface,
{
    pub fn options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    pub fn read_form_attributes(mut self) -> Self {
        self.read_form_attributes = true;
        self
    }

    pub fn custom<V>(mut self, name: impl Into<String>, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        self.custom.push((name.into(), Arc::new(validator)));
        self
    }

    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: RemoteTransport,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn on<F>(mut self, listener: F) -> Self
    where
        F: Fn(&ValidationEvent) -> EventControl + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub async fn attach(self) -> FormResult<FormController<S>> {
        let surface = Arc::new(self.surface);
        let mut options = self.options;
        if self.read_form_attributes {
            options = options.with_form_attributes(surface.as_ref())?;
        }

        let mut validators = ValidatorSet::builtin(&options.errors);
        for (name, validator) in self.custom {
            validators.register(name, validator);
        }

        let mut listeners = Listeners::default();
        for listener in self.listeners {
            listeners.insert(listener);
        }

        let (fields, dependencies) = collect_fields(surface.as_ref());
        let id = FormId::next();
        info!(
            form_id = id.0,
            fields = fields.len(),
            validators = validators.len(),
            "attaching form validation"
        );

        let controller = FormController {
            options: Arc::new(options),
            surface,
            validators: Arc::new(validators),
            transport: self.transport,
            listeners: Arc::new(RwLock::new(listeners)),
            state: Arc::new(RwLock::new(FormState::new(id, fields, dependencies))),
        };
        controller.surface.set_native_validation(false);
        controller.prime().await?;
        controller.toggle_submit()?;
        Ok(controller)
    }
}

impl<S> FormController<S>
where
    S: FormSurface,
{
    pub fn builder(surface: S) -> FormBuilder<S> {
        FormBuilder {
            surface,
            options: FormOptions::default(),
            read_form_attributes: false,
            custom: Vec::new(),
            transport: None,
            listeners: Vec::new(),
        }
    }

    pub async fn attach(surface: S, options: FormOptions) -> FormResult<Self> {
        Self::builder(surface).options(options).attach().await
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(self.attached_state("reading form id")?.id)
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn fields(&self) -> FormResult<Vec<FieldKey>> {
        Ok(self.attached_state("reading fields")?.fields.clone())
    }

    pub fn errors(&self, key: impl Into<FieldKey>) -> FormResult<Vec<String>> {
        let key = key.into();
        Ok(self
            .attached_state("reading field errors")?
            .errors(&key)
            .to_vec())
    }

    pub fn field_meta(&self, key: impl Into<FieldKey>) -> FormResult<Option<FieldMeta>> {
        let key = key.into();
        Ok(self
            .attached_state("reading field meta")?
            .field_meta
            .get(&key)
            .cloned())
    }

    pub fn has_errors(&self) -> FormResult<bool> {
        Ok(self
            .attached_state("checking field errors")?
            .field_meta
            .values()
            .any(|meta| !meta.errors.is_empty()))
    }

    pub fn is_incomplete(&self) -> FormResult<bool> {
        let fields = self.fields()?;
        Ok(self.any_required_empty(&fields))
    }

    pub fn is_valid(&self) -> FormResult<bool> {
        Ok(!self.has_errors()? && !self.is_incomplete()?)
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let (form_id, fields, field_meta) = {
            let state = self.attached_state("creating form snapshot")?;
            (state.id, state.fields.clone(), state.field_meta.clone())
        };
        let has_errors = field_meta.values().any(|meta| !meta.errors.is_empty());
        let is_incomplete = self.any_required_empty(&fields);
        Ok(FormSnapshot {
            form_id,
            fields,
            field_meta,
            has_errors,
            is_incomplete,
            is_valid: !has_errors && !is_incomplete,
        })
    }

    pub async fn handle(&self, event: FieldEvent) -> FormResult<PassOutcome> {
        let tracked = self
            .attached_state("dispatching field event")?
            .fields
            .contains(&event.key);
        let source = async {
            if tracked {
                self.run_pass(&event.key, event.trigger).await
            } else {
                Ok(PassOutcome::Ignored)
            }
        };
        if event.trigger != Trigger::Input {
            return source.await;
        }
        let (outcome, dependents) = join(source, self.revalidate_dependents(&event.key)).await;
        dependents?;
        outcome
    }

    pub async fn validate_field(&self, key: impl Into<FieldKey>) -> FormResult<PassOutcome> {
        let key = key.into();
        if !self
            .attached_state("validating field")?
            .fields
            .contains(&key)
        {
            return Err(FormError::UnknownField(key));
        }
        self.run_pass(&key, Trigger::Focusout).await
    }

    pub fn update(&self) -> FormResult<()> {
        let (fields, dependencies) = collect_fields(self.surface.as_ref());
        let mut state = write_lock(&self.state, "updating field set")?;
        ensure_attached(&state)?;
        debug!(form_id = state.id.0, fields = fields.len(), "field set updated");
        state.fields = fields;
        state.dependencies = dependencies;
        Ok(())
    }

    pub fn reset(&self) -> FormResult<()> {
        let (fields, original_content) = {
            let mut state = write_lock(&self.state, "resetting form")?;
            ensure_attached(&state)?;
            let mut keys = state.tickets.keys().cloned().collect::<BTreeSet<_>>();
            keys.extend(state.fields.iter().cloned());
            for key in &keys {
                state.next_ticket(key);
            }
            state.field_meta.clear();
            debug!(form_id = state.id.0, "form reset");
            (
                state.fields.clone(),
                std::mem::take(&mut state.original_content),
            )
        };

        for key in &fields {
            if self.surface.has_feedback(key) {
                self.surface.set_feedback_icon(key, None);
            }
            self.surface.set_group_state(key, GroupState::Neutral);
        }
        for (key, content) in &original_content {
            self.surface.set_error_region(key, content);
        }
        self.surface.set_submit_disabled(false);
        Ok(())
    }

    pub fn destroy(&self) -> FormResult<()> {
        self.reset()?;
        self.surface.set_native_validation(true);
        write_lock(&self.listeners, "dropping listeners")?.clear();
        let mut state = write_lock(&self.state, "destroying form")?;
        state.destroyed = true;
        state.fields.clear();
        state.dependencies.clear();
        state.tickets.clear();
        state.field_meta.clear();
        info!(form_id = state.id.0, "form validation destroyed");
        Ok(())
    }

    async fn prime(&self) -> FormResult<()> {
        let fields = self.fields()?;
        let prefilled = fields
            .iter()
            .filter(|key| {
                self.surface.value(key).is_some_and(|value| value.is_non_empty())
                    && self.surface.group_state(key) != GroupState::Error
            })
            .collect::<Vec<_>>();
        let passes = prefilled
            .into_iter()
            .map(|key| self.run_pass(key, Trigger::Focusout));
        for result in join_all(passes).await {
            result?;
        }
        Ok(())
    }

    async fn revalidate_dependents(&self, source: &FieldKey) -> FormResult<()> {
        let dependents = self
            .attached_state("reading field dependencies")?
            .dependencies
            .get(source)
            .cloned()
            .unwrap_or_default();
        let filled = dependents
            .iter()
            .filter(|key| self.surface.value(key).is_some_and(|value| value.is_non_empty()))
            .collect::<Vec<_>>();
        let passes = filled
            .into_iter()
            .map(|key| self.run_pass(key, Trigger::Input));
        for result in join_all(passes).await {
            result?;
        }
        Ok(())
    }

    pub(super) fn any_required_empty(&self, fields: &[FieldKey]) -> bool {
        fields.iter().any(|key| {
            self.surface.attribute(key, "required").is_some()
                && !self.surface.value(key).is_some_and(|value| value.is_filled())
        })
    }

    pub(super) fn attached_state(
        &self,
        context: &'static str,
    ) -> FormResult<RwLockReadGuard<'_, FormState>> {
        let state = read_lock(&self.state, context)?;
        ensure_attached(&state)?;
        Ok(state)
    }

    pub(super) fn is_latest(&self, key: &FieldKey, ticket: ValidationTicket) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking latest validation ticket")?.is_latest(key, ticket))
    }
}

fn collect_fields<S>(surface: &S) -> (Vec<FieldKey>, BTreeMap<FieldKey, BTreeSet<FieldKey>>)
where
    S: FormSurface + ?Sized,
{
    let fields = surface
        .field_keys()
        .into_iter()
        .filter(
            |key| match surface.attribute(key, "data-validate").as_deref() {
                Some("true") => true,
                Some("false") => false,
                _ => surface.kind(key).is_some_and(|kind| kind.is_validatable()),
            },
        )
        .collect::<Vec<_>>();

    let mut dependencies = BTreeMap::<FieldKey, BTreeSet<FieldKey>>::new();
    for key in &fields {
        if let Some(target) = surface.attribute(key, "data-match") {
            dependencies
                .entry(match_target(&target))
                .or_default()
                .insert(key.clone());
        }
    }
    (fields, dependencies)
}

pub(super) fn match_target(raw: &str) -> FieldKey {
    FieldKey::from(raw.trim().trim_start_matches('#'))
}

fn ensure_attached(state: &FormState) -> FormResult<()> {
    if state.destroyed {
        Err(FormError::Destroyed)
    } else {
        Ok(())
    }
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
