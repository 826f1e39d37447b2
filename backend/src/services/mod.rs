pub mod access_requests;
pub mod sms;
