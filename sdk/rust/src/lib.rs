//! Percolator Protocol Rust SDK
//!
//! Decodes the Percolator slab account (header, market config, risk engine
//! and the bitmap-indexed position records) and encodes the instructions a
//! trader submits against it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use percolator_sdk::{parse_address, MarketContext, PercolatorClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PercolatorClient::new("https://api.devnet.solana.com");
//!     let program_id = parse_address("<program id>")?;
//!     let slab = parse_address("<slab address>")?;
//!
//!     let (ctx, snapshot) = client.market_context(&program_id, &slab).await?;
//!     println!("{} accounts at slot {}", snapshot.state.total_accounts(), snapshot.slot);
//!
//!     let deposit = client.build_deposit(&ctx, &wallet, user_idx, 1_000_000).await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod codec;
pub mod constants;
pub mod error;
pub mod instructions;
pub mod pda;
pub mod slab;
pub mod types;
pub mod client;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use account::*;
pub use constants::*;
pub use error::*;
pub use instructions::*;
pub use pda::*;
pub use slab::*;
pub use types::*;
pub use client::*;
