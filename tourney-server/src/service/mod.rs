//! The operations behind the HTTP routes. Services know nothing about HTTP; they report
//! failures through their return values.
mod tournaments;
mod users;

pub use tournaments::TournamentService;
pub use users::{is_valid_nickname, Session, UserService};
