mod message;
mod summary;
mod thread;

pub use message::MongoMessageRepository;
pub use summary::MongoSummaryRepository;
pub use thread::MongoThreadRepository;
