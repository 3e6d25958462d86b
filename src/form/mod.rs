mod controller;
mod events;
mod memory;
mod options;
mod presentation;
mod remote;
mod submit;
mod surface;
mod validation;


pub use controller::{
    FieldEvent, FieldKey, FieldMeta, FormBuilder, FormController, FormError, FormId, FormResult,
    FormSnapshot, PassOutcome, Trigger, ValidationTicket,
};
pub use events::{EventControl, ListenerId, ValidationEvent};
pub use memory::{InMemoryField, InMemorySurface};
pub use options::{ErrorMessages, FeedbackClasses, FormOptions};
pub use presentation::FOCUS_OFFSET;
#[cfg(feature = "http")]
pub use remote::HttpTransport;
pub use remote::{BoxedRemoteFuture, RemoteRequest, RemoteTransport, RemoteVerdict};
pub use submit::{SubmitDecision, SubmitGate};
pub use surface::{FieldKind, FieldValue, FormSurface, GroupState, NativeValidity};
pub use validation::{
    FieldContext, MATCH, MINLENGTH, MatchValidator, MinLengthValidator, NATIVE, NativeValidator,
    REMOTE, Validator, ValidatorSet,
};
