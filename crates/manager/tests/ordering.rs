use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use steward_manager::{Manager, Payload, Registry, Reply, Request};

#[derive(Default)]
struct Ledger {
	count: u64,
	seen: Vec<(usize, usize)>,
}

type Snapshot = (u64, Vec<(usize, usize)>);

/// Registers a manager whose `record` handler does an unsynchronized
/// read-modify-write and flags any overlapping invocation.
fn ledger_manager(registry: &Registry, buffer: usize, overlaps: Arc<AtomicUsize>) -> Arc<Manager> {
	let manager = registry.new_manager("ledger", buffer).unwrap();
	let in_flight = Arc::new(AtomicUsize::new(0));
	manager
		.attach("record", move |ledger: &mut Ledger, payload: Payload| {
			if in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
				overlaps.fetch_add(1, Ordering::SeqCst);
			}
			let entry = payload.downcast::<(usize, usize)>()?;
			let before = ledger.count;
			std::thread::yield_now();
			ledger.count = before + 1;
			ledger.seen.push(entry);
			in_flight.fetch_sub(1, Ordering::SeqCst);
			Ok(Reply::empty())
		})
		.unwrap();
	manager
		.attach("snapshot", |ledger: &mut Ledger, _payload: Payload| {
			Ok(Reply::value((ledger.count, ledger.seen.clone())))
		})
		.unwrap();
	manager
}

fn run_producers(producers: usize, per_producer: usize, buffer: usize) -> (Snapshot, usize) {
	let rt = tokio::runtime::Builder::new_multi_thread()
		.worker_threads(4)
		.enable_all()
		.build()
		.unwrap();
	rt.block_on(async move {
		let registry = Registry::new();
		let overlaps = Arc::new(AtomicUsize::new(0));
		ledger_manager(&registry, buffer, Arc::clone(&overlaps)).start(Ledger::default()).unwrap();

		let mut handles = Vec::new();
		for producer in 0..producers {
			let registry = registry.clone();
			handles.push(tokio::spawn(async move {
				for seq in 0..per_producer {
					registry.send("ledger", "record", Payload::new((producer, seq))).await.unwrap();
				}
			}));
		}
		for handle in handles {
			handle.await.unwrap();
		}

		let snapshot = registry
			.ask("ledger", "snapshot", Payload::empty())
			.await
			.unwrap()
			.downcast::<Snapshot>()
			.unwrap();
		registry.kill_and_remove("ledger").await.unwrap();
		(snapshot, overlaps.load(Ordering::SeqCst))
	})
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(16))]

	/// Concurrent producers never see lost updates or overlapping handlers,
	/// and each producer's requests are served in the order it sent them.
	#[test]
	fn prop_concurrent_sends_are_serialized(producers in 1usize..6, per_producer in 1usize..40, buffer in 1usize..8) {
		let ((count, seen), overlaps) = run_producers(producers, per_producer, buffer);

		prop_assert_eq!(overlaps, 0);
		prop_assert_eq!(count, (producers * per_producer) as u64);
		prop_assert_eq!(seen.len(), producers * per_producer);
		for producer in 0..producers {
			let order: Vec<usize> = seen.iter().filter(|(p, _)| *p == producer).map(|(_, seq)| *seq).collect();
			prop_assert_eq!(order, (0..per_producer).collect::<Vec<_>>());
		}
	}
}

#[tokio::test]
async fn send_and_send_request_share_one_fifo() {
	let registry = Registry::new();
	let manager = registry.new_manager("fifo", 16).unwrap();
	manager
		.attach("log", |log: &mut Vec<u32>, payload: Payload| {
			log.push(payload.downcast::<u32>()?);
			Ok(Reply::empty())
		})
		.unwrap();
	manager.attach("dump", |log: &mut Vec<u32>, _payload: Payload| Ok(Reply::value(log.clone()))).unwrap();

	// Queue everything before the loop starts so nothing is dispatched early.
	let mut tickets = Vec::new();
	for n in 0..10u32 {
		let ticket = if n % 2 == 0 {
			manager.send("log", Payload::new(n)).await.unwrap()
		} else {
			manager.send_request(Request::new("log", Payload::new(n))).await.unwrap()
		};
		tickets.push(ticket);
	}
	manager.start(Vec::<u32>::new()).unwrap();
	for ticket in tickets {
		ticket.wait().await.unwrap();
	}

	let log = manager.ask("dump", Payload::empty()).await.unwrap().downcast::<Vec<u32>>().unwrap();
	assert_eq!(log, (0..10).collect::<Vec<_>>());
	manager.kill().await.unwrap();
}
