pub mod cadet;
pub mod checkin;
pub mod event;
pub mod role;
