//! Concurrent-access validation: many producer threads against one
//! dispatcher, with the book and statistic invariants checked after drain.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bourse::Exchange;
use common::{wait_until, RecordingClient};
use order_book::OrderSnapshot;

/// A low-priced resting buy per ticker, submitted after the load; the global
/// queue is FIFO, so once it rests everything before it has been matched.
fn drain(exchange: &Exchange, tickers: &[&str], client: u64) {
    for ticker in tickers {
        exchange
            .submit_order(ticker, client, "BUY", "LIMIT", dec!(0.01), 1)
            .unwrap();
    }
    for ticker in tickers {
        wait_until("the sentinel order to rest", || {
            exchange.bid_volume_at_price(ticker, dec!(0.01)).unwrap() == 1
        });
    }
}

fn assert_book_sorted(book: &[OrderSnapshot], descending: bool) {
    for pair in book.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if descending {
            assert!(
                a.limit_price > b.limit_price
                    || (a.limit_price == b.limit_price && a.entry_time <= b.entry_time),
                "bid book out of order: {:?} before {:?}",
                a,
                b
            );
        } else {
            assert!(
                a.limit_price < b.limit_price
                    || (a.limit_price == b.limit_price && a.entry_time <= b.entry_time),
                "ask book out of order: {:?} before {:?}",
                a,
                b
            );
        }
    }
}

#[test]
fn test_concurrent_submitters_preserve_invariants() {
    let exchange = Arc::new(Exchange::with_queue_capacity(100_000));
    exchange.start().unwrap();
    let tickers = ["ALPHA", "BETA"];
    for ticker in tickers {
        exchange.register_instrument(ticker);
    }

    let num_threads = 8;
    let orders_per_thread = 200;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = Vec::new();

    for thread_id in 0..num_threads {
        let exchange = Arc::clone(&exchange);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let client = exchange.register(Arc::new(RecordingClient::default()));
            barrier.wait();
            let mut order_ids = Vec::with_capacity(orders_per_thread);
            for i in 0..orders_per_thread {
                let ticker = tickers[i % 2];
                let side = if thread_id % 2 == 0 { "BUY" } else { "SELL" };
                // Overlapping price bands so a healthy share of orders cross.
                let cents = 990 + ((thread_id * 7 + i * 13) % 30) as i64;
                let price = Decimal::from(cents) / Decimal::from(100);
                let id = exchange
                    .submit_order(ticker, client, side, "LIMIT", price, 10)
                    .unwrap();
                order_ids.push(id);
            }
            (client, order_ids)
        }));
    }

    let submitters: Vec<(u64, Vec<u64>)> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let drain_client = exchange.register(Arc::new(RecordingClient::default()));
    drain(&exchange, &tickers, drain_client);

    // Per-order accounting never drifts.
    for (client, order_ids) in &submitters {
        for order_id in order_ids {
            let snapshot = exchange.get_client_order(*client, *order_id).unwrap();
            assert_eq!(
                snapshot.open_quantity + snapshot.executed_quantity,
                snapshot.original_quantity,
                "quantity invariant broken for {:?}",
                snapshot
            );
        }
    }

    for ticker in tickers {
        let bids = exchange.bid_book(ticker).unwrap();
        let asks = exchange.ask_book(ticker).unwrap();
        assert_book_sorted(&bids, true);
        assert_book_sorted(&asks, false);

        // Incremental side volumes agree with the books themselves.
        let bid_open: u64 = bids.iter().map(|o| o.open_quantity).sum();
        let ask_open: u64 = asks.iter().map(|o| o.open_quantity).sum();
        assert_eq!(exchange.bid_volume(ticker).unwrap(), bid_open);
        assert_eq!(exchange.ask_volume(ticker).unwrap(), ask_open);

        // Every match has one buy and one sell participant.
        assert_eq!(
            exchange.buy_volume(ticker).unwrap(),
            exchange.sell_volume(ticker).unwrap()
        );

        // Resting orders always carry open quantity.
        for snapshot in bids.iter().chain(asks.iter()) {
            assert!(snapshot.open_quantity > 0, "closed order resting: {:?}", snapshot);
        }
    }

    exchange.stop();
}

#[test]
fn test_concurrent_registration_is_idempotent() {
    let exchange = Arc::new(Exchange::with_queue_capacity(1024));
    exchange.start().unwrap();

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = Vec::new();
    for _ in 0..num_threads {
        let exchange = Arc::clone(&exchange);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            exchange.register_instrument("SAME");
            exchange.register(Arc::new(RecordingClient::default()))
        }));
    }

    let mut client_ids: Vec<u64> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(exchange.tickers(), vec!["SAME"]);
    client_ids.sort();
    client_ids.dedup();
    assert_eq!(client_ids.len(), num_threads);

    exchange.stop();
}

#[test]
fn test_cancel_races_with_matching() {
    let exchange = Arc::new(Exchange::with_queue_capacity(100_000));
    exchange.start().unwrap();
    exchange.register_instrument("RACE");

    let maker = exchange.register(Arc::new(RecordingClient::default()));
    let taker = exchange.register(Arc::new(RecordingClient::default()));

    let mut resting_ids = Vec::new();
    for _ in 0..200 {
        let id = exchange
            .submit_order("RACE", maker, "BUY", "LIMIT", dec!(10.00), 10)
            .unwrap();
        resting_ids.push(id);
    }

    // One thread lifts the book while another cancels the same orders.
    let canceller = {
        let exchange = Arc::clone(&exchange);
        let ids = resting_ids.clone();
        thread::spawn(move || {
            let mut cancelled = 0;
            for id in ids {
                if let Ok(Some(_)) = exchange.cancel_order(maker, id) {
                    cancelled += 1;
                }
            }
            cancelled
        })
    };
    let seller = {
        let exchange = Arc::clone(&exchange);
        thread::spawn(move || {
            for _ in 0..100 {
                exchange
                    .submit_order("RACE", taker, "SELL", "LIMIT", dec!(10.00), 10)
                    .unwrap();
            }
        })
    };

    seller.join().unwrap();
    let cancelled: u64 = canceller.join().unwrap();
    drain(&exchange, &["RACE"], taker);

    // Every resting order ended exactly one way: filled, cancelled, or still
    // resting; quantities stay consistent regardless of how the race fell.
    let mut filled = 0u64;
    let mut still_open = 0u64;
    for id in &resting_ids {
        let snapshot = exchange.get_client_order(maker, *id).unwrap();
        assert_eq!(
            snapshot.open_quantity + snapshot.executed_quantity,
            snapshot.original_quantity
        );
        match snapshot.status {
            order_book::OrderStatus::Filled => filled += 1,
            order_book::OrderStatus::Cancelled => {}
            order_book::OrderStatus::New | order_book::OrderStatus::PartiallyFilled => {
                still_open += 1
            }
            other => panic!("Unexpected terminal status {:?}", other),
        }
    }
    assert_eq!(filled + cancelled + still_open, 200);

    exchange.stop();
}
