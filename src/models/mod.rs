pub mod event;
pub mod event_request;
pub mod user;

pub use event::{Category, CreatorSummary, EventEdit, EventRow, EventView, NewEvent};
pub use event_request::{EventRequest, RequestStatus, RequestWithEvent};
pub use user::{IdentityProfile, Role, User};
