pub mod extract;
pub mod handlers;
pub mod router;
