mod error;
mod model;

pub use error::{FetchError, MepError, SchemaError};
pub use model::{
    BondPair, InstrumentCategory, MepRate, MepSummary, Quote, QuoteTable, SourceId,
};
