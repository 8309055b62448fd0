pub mod rating;
pub mod response;

pub use rating::Rating;
pub use response::{FeedbackResponse, NewFeedbackResponse};
