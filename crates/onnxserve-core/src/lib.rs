pub mod backend;
pub mod binder;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod spec;
pub mod tensor;

pub use backend::*;
pub use binder::*;
pub use dispatch::*;
pub use error::*;
pub use extract::*;
pub use spec::*;
pub use tensor::*;
