pub mod admin_menu;
pub mod checkin;
pub mod context;
pub mod dispatch;
pub mod health;
pub mod keyboards;
pub mod metrics;
pub mod registration;
