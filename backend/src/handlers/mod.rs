pub mod auth;
pub mod health;
pub mod sms;
pub mod user_data;
