pub mod artifacts;
pub mod trello;
