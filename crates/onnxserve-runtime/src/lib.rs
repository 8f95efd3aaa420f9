pub mod request;
pub mod scheduler;
pub mod worker;
pub mod worker_model;

pub use request::*;
pub use scheduler::*;
pub use worker::*;
pub use worker_model::*;
