pub mod conversation;
pub mod query;
pub mod response;
