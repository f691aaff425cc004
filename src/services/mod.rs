pub mod board_directory;
pub mod card_service;

pub use board_directory::BoardDirectory;
pub use card_service::CardService;
