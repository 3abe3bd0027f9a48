mod repository;

pub use repository::WorkflowRepository;
