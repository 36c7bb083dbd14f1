pub mod presenter;

pub use presenter::{PresenterSnapshot, StudyCard, StudySession, TRANSITION_DELAY};
