pub mod academic;
pub mod action;
pub mod conversation;
pub mod intent;

pub use academic::{Created, NewProfessor, NewReservation, NewSubject, Professor, Reservation, Subject};
pub use action::ActionResult;
pub use conversation::{ConversationMessage, Role, TurnOutcome};
pub use intent::{ExtractedIntent, Intent, Parameters, PartialIntent};
