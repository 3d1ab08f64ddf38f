pub mod dao;
pub mod models;

pub use dao::{BlogDao, InMemoryBlogDao, PgBlogDao, RunStatus, RunTrigger};
pub use models::{
    Artifact, ModelError, Pagination, PostFilter, RunCompletion, RunRecord, RunStats,
};
