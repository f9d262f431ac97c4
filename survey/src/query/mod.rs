//! Response query micro-language.
//!
//! # Syntax Overview
//!
//! A query is a list of sections separated by `;` or newlines:
//!
//! - **Keys**: `keys=name,email` or `keys: 'a,b', "c d"` selects the fields to show
//! - **Range**: `range=[first+1..last-2]` selects a contiguous slice of responses
//!
//! Range endpoints are `first`, `last` (each with an optional `+N`/`-N`) or a
//! bare zero-based index. Endpoints are resolved and clamped against the
//! length of a concrete sequence by [`RangeSelector::evaluate`].

mod parser;
mod range;

pub use parser::{parse_response_query, QueryError, ResponseQuery};
pub use range::{EndpointKind, IndexRange, RangeEndpoint, RangeSelector};
