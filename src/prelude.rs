pub use crate::form::{
    EventControl, FieldContext, FieldEvent, FieldKey, FieldKind, FieldValue, FormController,
    FormError, FormOptions, FormResult, FormSurface, GroupState, InMemoryField, InMemorySurface,
    PassOutcome, RemoteRequest, RemoteTransport, RemoteVerdict, SubmitDecision, Trigger,
    ValidationEvent, Validator,
};
