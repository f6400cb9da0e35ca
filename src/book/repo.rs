mod mongo;

pub use mongo::{MongoBookRepository, DEFAULT_COLLECTION, DEFAULT_DATABASE};
