pub mod attachment;
pub mod board;
pub mod ticket;
