pub mod audit;
pub mod fraud;
pub mod payout;
pub mod response;
pub mod submission;

pub use audit::*;
pub use fraud::*;
pub use payout::*;
pub use response::*;
pub use submission::*;
