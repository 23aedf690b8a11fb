pub mod handlers;
pub mod presenter;
