//! Percolator - Slab Decoder and Instruction Encoder
//!
//! Root package of the workspace. It re-exports the SDK so integration tests
//! and downstream tools can depend on a single crate; the decoding and
//! encoding logic lives in `sdk/rust`, the command-line front end in `cli`.

pub use percolator_sdk as sdk;

pub use percolator_sdk::{
    parse_address, parse_slab, LpContext, MarketContext, PercolatorClient, PercolatorSdkError,
    SlabState,
};
