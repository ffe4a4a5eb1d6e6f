#![cfg(test)]

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use crate::event::{
    Cancellable, CancelFlag, Envelope, Event, EventBus, EventBusConfig, EventSystemError, FailurePolicy,
    FnSubscriber, Priority, Subscriber,
};
use crate::tests::integration::common::{entries, init_logging, new_journal, ModerationPlugin, PlayerChat, PlayerJoin};

fn moderated_bus() -> (EventBus, ModerationPlugin, crate::tests::integration::common::Journal) {
    init_logging();
    let bus = EventBus::with_config(EventBusConfig::named("chat"));
    let journal = new_journal();
    let plugin = ModerationPlugin::new(&bus, &journal);
    plugin.listeners().enable(&bus).expect("enable moderation listeners");
    (bus, plugin, journal)
}

#[test]
fn test_chat_moderation_flow() {
    let (bus, _plugin, journal) = moderated_bus();

    let clean = PlayerChat::new("alice", "hello");
    bus.dispatch(None, &clean).unwrap();
    let rude = PlayerChat::new("bob", "darn it");
    bus.dispatch(None, &rude).unwrap();
    let staff = PlayerChat::new("staff_carol", "darn lag");
    bus.dispatch(None, &staff).unwrap();

    assert!(!clean.as_cancellable().unwrap().is_cancelled());
    assert!(rude.as_cancellable().unwrap().is_cancelled());
    assert!(!staff.as_cancellable().unwrap().is_cancelled());
    assert_eq!(
        entries(&journal),
        vec![
            "audit:player.chat:sent",
            "censor:bob",
            "audit:player.chat:blocked",
            "censor:staff_carol",
            "override:staff_carol",
            "audit:player.chat:sent",
        ]
    );
}

#[test]
fn test_staff_override_resumes_skipped_listeners() {
    let (bus, _plugin, journal) = moderated_bus();
    let delivered = Arc::new(AtomicUsize::new(0));
    let delivered_clone = Arc::clone(&delivered);
    let relay: Arc<dyn Subscriber> = FnSubscriber::typed::<PlayerChat, _>(move |_, _chat| {
        delivered_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .name("discord-relay")
    .priority(Priority::Normal)
    .build();
    bus.add_subscriber(&relay).unwrap();

    // Skipped while cancelled, then delivered once the override un-cancels
    bus.dispatch(None, &PlayerChat::new("staff_dave", "darn")).unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 1);

    bus.dispatch(None, &PlayerChat::new("eve", "darn")).unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(entries(&journal).last().map(String::as_str), Some("audit:player.chat:blocked"));
}

#[test]
fn test_non_cancellable_event_reaches_everyone() {
    let (bus, _plugin, journal) = moderated_bus();
    bus.dispatch(None, &PlayerJoin { player: "frank".into() }).unwrap();
    assert_eq!(entries(&journal), vec!["audit:player.join:sent"]);
}

#[test]
fn test_engine_envelope_cancellation() {
    init_logging();
    #[derive(Debug)]
    struct Interact {
        cancelled: Arc<CancelFlag>,
    }
    impl Event for Interact {
        fn name(&self) -> &str {
            "player.interact"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    let bus = EventBus::new();
    let blocker: Arc<dyn Subscriber> = FnSubscriber::typed::<Interact, _>(|_, interact| {
        interact.cancelled.set_cancelled(true);
        Ok(())
    })
    .priority(Priority::First)
    .build();
    bus.add_subscriber(&blocker).unwrap();

    let engine_flag = Arc::new(CancelFlag::default());
    let holder: Arc<dyn Cancellable> = engine_flag.clone();
    let envelope = Envelope::with_holder(
        Interact {
            cancelled: Arc::clone(&engine_flag),
        },
        holder,
    );
    bus.dispatch(None, &envelope).unwrap();

    assert!(envelope.is_cancelled());
    assert!(engine_flag.is_cancelled());
}

#[test]
fn test_isolated_failures_do_not_stop_other_plugins() {
    init_logging();
    let bus = EventBus::with_config(EventBusConfig::named("isolated").with_failure_policy(FailurePolicy::Isolate));
    let reached = Arc::new(AtomicUsize::new(0));

    let broken: Arc<dyn Subscriber> = FnSubscriber::builder(|_, _| Err("database offline".into()))
        .name("stats")
        .priority(Priority::High)
        .build();
    let reached_clone = Arc::clone(&reached);
    let healthy: Arc<dyn Subscriber> = FnSubscriber::builder(move |_, _| {
        reached_clone.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .build();
    bus.add_subscriber(&broken).unwrap();
    bus.add_subscriber(&healthy).unwrap();

    bus.dispatch(None, &PlayerJoin { player: "gina".into() }).unwrap();
    assert_eq!(reached.load(Ordering::SeqCst), 1);

    let strict = EventBus::new();
    strict.add_subscriber(&broken).unwrap();
    strict.add_subscriber(&healthy).unwrap();
    let err = strict.dispatch(None, &PlayerJoin { player: "hal".into() }).unwrap_err();
    assert!(matches!(err, EventSystemError::SubscriberFailed { ref subscriber, .. } if subscriber == "stats"));
    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_dispatch_is_serialized_per_bus() {
    init_logging();
    let bus = EventBus::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicUsize::new(0));

    let (in_flight_c, overlaps_c, total_c) = (Arc::clone(&in_flight), Arc::clone(&overlaps), Arc::clone(&total));
    let counter: Arc<dyn Subscriber> = FnSubscriber::builder(move |_, _| {
        if in_flight_c.fetch_add(1, Ordering::SeqCst) != 0 {
            overlaps_c.fetch_add(1, Ordering::SeqCst);
        }
        thread::yield_now();
        total_c.fetch_add(1, Ordering::SeqCst);
        in_flight_c.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    })
    .build();
    bus.add_subscriber(&counter).unwrap();

    let threads = 4;
    let per_thread = 50;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let bus = bus.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    bus.dispatch(None, &PlayerJoin { player: format!("t{}", i) }).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(total.load(Ordering::SeqCst), threads * per_thread);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}
