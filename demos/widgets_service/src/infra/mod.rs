//! Infrastructure: expression evaluation and storage.

pub mod cel;
pub mod memory_repository;

pub use cel::CelEvaluator;
pub use memory_repository::InMemoryWidgetRepository;
