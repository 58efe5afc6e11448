//! # Tickmatch
//!
//! A single-symbol, in-process limit order book with a price-time priority
//! matching engine.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the engine exclusively (no locks)
//! - **Bounded Hot Path**: O(1) or O(log L) per operation, L = price levels
//! - **Pooled Storage**: slab-backed order pool, no steady-state heap churn
//! - **Deterministic**: a logical admission clock makes replays bit-identical
//!
//! ## Architecture
//!
//! ```text
//! submit/cancel/modify --> [MatchingEngine] --> trades (buffer + callback)
//!                               |
//!                          [OrderBook]  bid/ask ladders + id index
//!                               |
//!                          [OrderPool]  slab allocator, free-list reuse
//! ```

pub mod types;
pub mod pool;
pub mod price_level;
pub mod order_book;
pub mod matching;

// Re-exports for convenience
pub use types::{OrderId, OrderStatus, OrderType, Price, Quantity, Side, TickClock, Timestamp, Trade};
pub use pool::{Order, OrderPool, PoolIndex, PoolStats, NULL_INDEX};
pub use price_level::PriceLevel;
pub use order_book::OrderBook;
pub use matching::{EngineConfig, MarketResidual, MatchingEngine, TradeCallback};
