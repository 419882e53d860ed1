pub mod ai_backend;
pub mod db;
pub mod files;
pub mod firebase;
pub mod openrouter;

pub use ai_backend::PrimaryBackendAdapter;
pub use db::DbAdapter;
pub use files::LocalFileStore;
pub use firebase::FirebaseVerifier;
pub use openrouter::OpenRouterAdapter;
