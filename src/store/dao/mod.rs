// モジュールの公開と型の再エクスポート
pub mod dao_impl;
pub mod dao_trait;
pub mod memory;
pub(crate) mod post;
pub(crate) mod run;
pub(crate) mod schema;
pub mod types;

// 型の再エクスポート
pub use dao_impl::PgBlogDao;
pub use dao_trait::BlogDao;
pub use memory::InMemoryBlogDao;
pub use types::{RunStatus, RunTrigger};
