pub mod clock;
pub mod models;
pub mod rating_type;
pub mod records;
pub mod validation;

pub use models::*;
pub use rating_type::{RatingTypePolicy, RatingTypeResolver};
pub use records::{RecordBuilder, RejectReason};
pub use validation::{ValidationError, Validator};
