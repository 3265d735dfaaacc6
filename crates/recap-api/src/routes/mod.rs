pub mod health;
pub mod threads;
pub mod messages;
pub mod summaries;
