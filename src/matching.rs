//! Matching engine - the crossing loop and per-type order policies.
//!
//! Every submission is admitted to the book first, then crossed against the
//! opposite side under price-time priority: best opposite level first, FIFO
//! head within the level. Each fill updates both parties' filled quantity,
//! folds the resting order's new remaining quantity into its level total,
//! and emits a trade to the internal buffer and the optional callback.

use crate::order_book::OrderBook;
use crate::pool::{PoolIndex, DEFAULT_SLAB_SIZE};
use crate::types::{OrderId, OrderStatus, OrderType, Price, Quantity, Side, Trade};

/// Synchronous trade observer, invoked on the submitter's call stack for
/// every fill, in matching order.
pub type TradeCallback = Box<dyn FnMut(&Trade)>;

/// What happens to the unfilled portion of a market order once the opposite
/// side is exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MarketResidual {
    /// Cancel the residual unconditionally, like IOC (default).
    #[default]
    Cancel,
    /// Leave the residual resting at the order's nominal price.
    Rest,
}

/// Construction-time knobs.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Records per pool slab.
    pub slab_size: usize,
    pub market_residual: MarketResidual,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slab_size: DEFAULT_SLAB_SIZE,
            market_residual: MarketResidual::Cancel,
        }
    }
}

/// Price-time priority matching engine over a single order book.
///
/// Single-writer: every public operation is synchronous and runs to
/// completion. The trade callback cannot re-enter the engine - the engine is
/// exclusively borrowed for the whole submit call.
pub struct MatchingEngine {
    book: OrderBook,
    trades: Vec<Trade>,
    trade_callback: Option<TradeCallback>,
    market_residual: MarketResidual,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            book: OrderBook::with_slab_size(config.slab_size),
            trades: Vec::new(),
            trade_callback: None,
            market_residual: config.market_residual,
        }
    }

    pub fn with_callback(callback: TradeCallback) -> Self {
        Self::with_config_and_callback(EngineConfig::default(), callback)
    }

    pub fn with_config_and_callback(config: EngineConfig, callback: TradeCallback) -> Self {
        let mut engine = Self::with_config(config);
        engine.trade_callback = Some(callback);
        engine
    }

    // ========================================================================
    // Public Surface
    // ========================================================================

    /// Submit an order and run it through the matching loop for its type.
    ///
    /// Returns the order's resulting status: `Rejected` on validation or
    /// pool failure, `Filled` if fully executed (the record is released),
    /// `Cancelled` if a residual was discarded (IOC, FOK, market residual
    /// under the default policy), otherwise `PartiallyFilled` or `New` for a
    /// residual now resting in the book.
    pub fn submit_order(
        &mut self,
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    ) -> OrderStatus {
        if quantity == 0 {
            return OrderStatus::Rejected;
        }
        if !self.book.add_order(id, side, order_type, price, quantity) {
            return OrderStatus::Rejected;
        }
        let handle = match self.book.handle_of(id) {
            Some(handle) => handle,
            None => return OrderStatus::Rejected,
        };

        match order_type {
            OrderType::Limit => self.match_limit(handle),
            OrderType::Market => self.match_market(handle, id),
            OrderType::IOC => self.match_ioc(handle, id),
            OrderType::FOK => self.match_fok(handle, id),
        }

        // The record is gone if a residual was cancelled during matching.
        let handle = match self.book.handle_of(id) {
            Some(handle) => handle,
            None => return OrderStatus::Cancelled,
        };
        if self.book.order(handle).is_filled() {
            self.book.remove_filled_order(handle);
            return OrderStatus::Filled;
        }
        self.book.order(handle).status
    }

    /// Cancel a resting order. Returns whether an order was cancelled.
    pub fn cancel_order(&mut self, id: OrderId) -> bool {
        self.book.cancel_order(id)
    }

    /// Modify a resting order; see [`OrderBook::modify_order`] for the
    /// priority rules.
    pub fn modify_order(&mut self, id: OrderId, new_price: Price, new_quantity: Quantity) -> bool {
        self.book.modify_order(id, new_price, new_quantity)
    }

    /// Read-only view of the book.
    #[inline]
    pub fn order_book(&self) -> &OrderBook {
        &self.book
    }

    /// Move out every trade recorded since construction or the last drain.
    pub fn drain_trades(&mut self) -> Vec<Trade> {
        std::mem::take(&mut self.trades)
    }

    /// Trades buffered and not yet drained.
    #[inline]
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    // ========================================================================
    // Per-Type Matching
    // ========================================================================

    /// Limit: cross while the price gate holds; the residual rests.
    fn match_limit(&mut self, handle: PoolIndex) {
        self.cross(handle, true);
        self.reconcile_status(handle);
    }

    /// Market: cross with no price gate until the opposite side is empty;
    /// the residual is cancelled or rests per the configured policy.
    fn match_market(&mut self, handle: PoolIndex, id: OrderId) {
        self.cross(handle, false);
        self.reconcile_status(handle);
        if self.market_residual == MarketResidual::Cancel && !self.book.order(handle).is_filled() {
            self.book.cancel_order(id);
        }
    }

    /// IOC: one pass of limit matching, then cancel any residual.
    fn match_ioc(&mut self, handle: PoolIndex, id: OrderId) {
        self.cross(handle, true);
        self.reconcile_status(handle);
        if !self.book.order(handle).is_filled() {
            self.book.cancel_order(id);
        }
    }

    /// FOK: all-or-nothing. Walk the opposite side first, summing the
    /// quantity reachable at acceptable prices; unless the full quantity is
    /// covered, cancel without matching at all.
    fn match_fok(&mut self, handle: PoolIndex, id: OrderId) {
        let (side, price, quantity) = {
            let order = self.book.order(handle);
            (order.side, order.price, order.quantity)
        };
        if self.book.crossable_quantity(side, price, quantity) < quantity {
            self.book.cancel_order(id);
            return;
        }
        self.cross(handle, true);
        self.reconcile_status(handle);
        debug_assert!(self.book.order(handle).is_filled());
    }

    // ========================================================================
    // Crossing Loop
    // ========================================================================

    /// Repeatedly match the aggressor against the best opposite level until
    /// it fills, the opposite side empties, or (when `price_gated`) the best
    /// opposite price stops crossing the aggressor's limit.
    fn cross(&mut self, handle: PoolIndex, price_gated: bool) {
        loop {
            let (side, limit, remaining) = {
                let order = self.book.order(handle);
                (order.side, order.price, order.remaining())
            };
            if remaining == 0 {
                break;
            }
            let match_price = match self.book.best_opposite(side) {
                Some(price) => price,
                None => break,
            };
            if price_gated && !Self::crosses(side, limit, match_price) {
                break;
            }
            let resting = match self.book.first_order_at_price(side.opposite(), match_price) {
                Some(resting) => resting,
                None => break,
            };
            self.fill(handle, resting, match_price);
        }
    }

    /// Whether an aggressive limit price crosses the best opposite price.
    #[inline]
    fn crosses(side: Side, limit: Price, best_opposite: Price) -> bool {
        match side {
            Side::Buy => limit >= best_opposite,
            Side::Sell => limit <= best_opposite,
        }
    }

    /// One matching step: trade the smaller remaining quantity at the
    /// resting order's price, emit the trade, and drop the resting order if
    /// it is now filled.
    fn fill(&mut self, aggressor: PoolIndex, resting: PoolIndex, price: Price) {
        let (trade_qty, old_remaining) = {
            let agg = self.book.order(aggressor);
            let rest = self.book.order(resting);
            (agg.remaining().min(rest.remaining()), rest.remaining())
        };
        debug_assert!(trade_qty > 0);

        self.book.order_mut(aggressor).filled_quantity += trade_qty;
        {
            let rest = self.book.order_mut(resting);
            rest.filled_quantity += trade_qty;
            rest.status = if rest.is_filled() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
        }
        self.book.update_level_total_incremental(resting, old_remaining);

        let (buy_order_id, sell_order_id) = {
            let agg = self.book.order(aggressor);
            let rest = self.book.order(resting);
            match agg.side {
                Side::Buy => (agg.id, rest.id),
                Side::Sell => (rest.id, agg.id),
            }
        };
        let trade = Trade {
            buy_order_id,
            sell_order_id,
            price,
            quantity: trade_qty,
            timestamp: self.book.stamp(),
        };
        if let Some(callback) = self.trade_callback.as_mut() {
            callback(&trade);
        }
        self.trades.push(trade);

        if self.book.order(resting).is_filled() {
            self.book.remove_filled_order(resting);
        }
    }

    /// Post-matching status for the aggressor.
    fn reconcile_status(&mut self, handle: PoolIndex) {
        let order = self.book.order_mut(handle);
        if order.is_filled() {
            order.status = OrderStatus::Filled;
        } else if order.filled_quantity > 0 {
            order.status = OrderStatus::PartiallyFilled;
        }
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
