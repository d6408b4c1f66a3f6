pub mod cost;
pub mod outcome;
pub mod partition;
pub mod recommendation;
pub mod report;
pub mod request;
pub mod run;

pub use cost::*;
pub use outcome::*;
pub use partition::*;
pub use recommendation::*;
pub use report::*;
pub use request::*;
pub use run::*;
