pub mod message;
pub mod project;
pub mod proposal;
pub mod service;
pub mod template;
pub mod user;
