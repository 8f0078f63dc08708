//! Presentation-side state published to rendering surfaces.

pub mod notes_state;
