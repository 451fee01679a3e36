use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, Level};

use bourse::config::SimulatorConfig;
use bourse::Exchange;
use event_pipeline::{DeliveryError, Notifiable};
use order_book::{OrderId, Qty};

/// A subscriber that prints every notification it receives. Stands in for a
/// real transport during local runs.
struct ConsoleClient {
    name: &'static str,
}

impl Notifiable for ConsoleClient {
    fn notify_order(
        &self,
        order_id: OrderId,
        average_executed_price: Decimal,
        executed_quantity: Qty,
        status: &str,
    ) -> Result<(), DeliveryError> {
        info!(
            "[{}] order {}: {} executed {} @ avg {}",
            self.name, order_id, status, executed_quantity, average_executed_price
        );
        Ok(())
    }

    fn notify_trade(
        &self,
        ticker: &str,
        time_ms: i64,
        side: &str,
        price: Decimal,
        quantity: Qty,
    ) -> Result<(), DeliveryError> {
        info!(
            "[{}] trade {}: {} {} @ {} ({}ms)",
            self.name, ticker, side, quantity, price, time_ms
        );
        Ok(())
    }

    fn notify_quote(
        &self,
        ticker: &str,
        time_ms: i64,
        bid_price: Decimal,
        ask_price: Decimal,
    ) -> Result<(), DeliveryError> {
        info!(
            "[{}] quote {}: bid {} / ask {} ({}ms)",
            self.name, ticker, bid_price, ask_price, time_ms
        );
        Ok(())
    }
}

fn run_demo_session(exchange: &Exchange) -> anyhow::Result<()> {
    info!("Running demo trading session...");

    exchange.register_instrument("GOOG");
    let buyer = exchange.register(Arc::new(ConsoleClient { name: "buyer" }));
    let seller = exchange.register(Arc::new(ConsoleClient { name: "seller" }));
    exchange.subscribe(buyer, "GOOG")?;
    exchange.subscribe(seller, "GOOG")?;

    exchange.submit_order("GOOG", buyer, "BUY", "LIMIT", Decimal::from(15), 100)?;
    exchange.submit_order("GOOG", seller, "SELL", "LIMIT", Decimal::from(14), 60)?;
    exchange.submit_order("GOOG", seller, "SELL", "LIMIT", Decimal::from(16), 50)?;
    let resting = exchange.submit_order("GOOG", buyer, "BUY", "LIMIT", Decimal::from(13), 40)?;
    exchange.submit_order("GOOG", buyer, "BUY", "MARKET", Decimal::ZERO, 20)?;

    // Give the pipeline a moment to drain before reading statistics.
    std::thread::sleep(Duration::from_millis(200));

    if let Some(cancelled) = exchange.cancel_order(buyer, resting)? {
        info!("Cancelled order {} ({})", cancelled.order_id, cancelled.status);
    }

    info!(
        "GOOG last {} | best bid {} / best ask {} | bid vol {} ask vol {} | traded avg {}",
        exchange.last_price("GOOG")?,
        exchange.best_bid("GOOG")?,
        exchange.best_ask("GOOG")?,
        exchange.bid_volume("GOOG")?,
        exchange.ask_volume("GOOG")?,
        exchange.average_price("GOOG")?,
    );
    info!(
        "GOOG bid vwap {} ask vwap {} | bid hi/lo {}/{} | ask hi/lo {}/{}",
        exchange.bid_vwap("GOOG")?,
        exchange.ask_vwap("GOOG")?,
        exchange.bid_high("GOOG")?,
        exchange.bid_low("GOOG")?,
        exchange.ask_high("GOOG")?,
        exchange.ask_low("GOOG")?,
    );

    info!("Demo trading session complete");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulatorConfig::load_from_file(&path)?,
        None => SimulatorConfig::default(),
    };

    info!("Starting {} v{}", bourse::NAME, bourse::VERSION);

    let exchange = Exchange::with_queue_capacity(config.queue_capacity);
    exchange.start()?;
    for ticker in &config.tickers {
        exchange.register_instrument(ticker);
    }
    info!("Registered instruments: {:?}", exchange.tickers());

    if config.run_demo_session {
        run_demo_session(&exchange)?;
    }

    exchange.stop();
    info!("Shutdown complete");
    Ok(())
}
