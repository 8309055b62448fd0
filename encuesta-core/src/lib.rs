pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod form;
pub mod models;
pub mod results;
pub mod routes;
pub mod store;
pub mod submission;

pub use aggregate::{average, filter_by_group, groups_present, load_all, Average, GroupFilter, RatingField};
pub use config::EncuestaConfig;
pub use error::EncuestaError;
pub use export::{export_delimited, export_filename, ExportOptions, QuoteStyle, EXPORT_CONTENT_TYPE};
pub use form::{FormError, FormStatus, VoteForm};
pub use models::{FeedbackResponse, NewFeedbackResponse, Rating};
pub use results::{LoadState, ResultsPage, ResultsView};
pub use routes::{share_link, Route};
pub use store::{create_store, MemoryStore, ResponseStore, StoreError, SupabaseStore};
pub use submission::{validate, SubmissionInput, SubmitError, Submitter, ValidationError};
