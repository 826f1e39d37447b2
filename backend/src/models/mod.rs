pub mod access_request;
pub mod mood;
pub mod task;
pub mod user;
