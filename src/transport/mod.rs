pub mod messenger;
pub mod polling;
pub mod telegram;
