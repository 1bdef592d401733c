//! Stateless repositories: every method takes `&Connection`.

mod game;
mod player;

pub use game::GameRepo;
pub use player::PlayerRepo;
