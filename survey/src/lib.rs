//! Survey inspection core.
//!
//! Loads survey workbooks (or cached/dumped JSON), and provides the pieces an
//! interactive inspector is built from: command line tokenizing, the
//! response query language, and answer distributions.

pub mod analysis;
pub mod cache;
pub mod command_line;
pub mod config;
pub mod error;
pub mod ingest;
pub mod query;
pub mod schema;

pub use analysis::{distribution, subset, Distribution, OptionCount};
pub use cache::{load_survey, DataOrigin, LoadOptions, LoadedSurvey};
pub use command_line::{CommandLine, TokenizeError};
pub use config::{Config, DisplayConfig};
pub use error::{Error, Result};
pub use query::{
    parse_response_query, EndpointKind, IndexRange, QueryError, RangeEndpoint, RangeSelector,
    ResponseQuery,
};
pub use schema::{QuestionType, Response, ResponseValue, Schema, SchemaEntry, SurveyData};
