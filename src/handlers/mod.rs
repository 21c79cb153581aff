pub mod query_handler;
