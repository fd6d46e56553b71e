pub mod domain;
pub mod form;
pub mod matching;
pub mod ports;
pub mod resolution;
pub mod session;

pub use domain::{MatchResult, NewProfile, Profile, ProfileId, ProfilePatch, Session};
pub use form::{Field, FieldError, ProfileDraft, ValidationError};
pub use ports::{IdentityProvider, PortError, PortResult, ProfileStore, SessionStream};
pub use resolution::{Resolution, ResolutionService, Route, View};
pub use session::{SessionState, SessionTracker, Subscription};
