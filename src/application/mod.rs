//! Application services sitting between the HTTP boundary and the repositories.

pub mod admin;
pub mod auth;
pub mod error;
pub mod feed;
pub mod follow;
pub mod pagination;
pub mod posts;
pub mod repos;
