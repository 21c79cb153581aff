pub mod messages;
pub mod query_actor;
