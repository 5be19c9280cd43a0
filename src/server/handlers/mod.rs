pub mod documents;
pub mod feedback;
pub mod health;
pub mod query;
