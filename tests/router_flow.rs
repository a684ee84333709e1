use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use erouter::{
    Event, EventType, Fault, FaultAction, ForwardingAgent, Generator, Listener, ListenerFn,
    ManualClock, ProcessRole, QueueForwarder, Router, RouterConfig, SubscriberId, TIMER_CANCEL, TimerDriver,
    TrapperFn,
};
use tokio_util::sync::CancellationToken;

type Log = Arc<Mutex<Vec<String>>>;

fn setup() -> (Arc<Router>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let router = Router::builder(RouterConfig::default())
        .with_clock(clock.clone())
        .build();
    (router, clock)
}

fn recorder(tag: &'static str, log: &Log) -> Arc<dyn Listener> {
    let log = log.clone();
    ListenerFn::arc(tag, move |_r: &Router, e: &Event| {
        log.lock().unwrap().push(format!("{tag} {}", e.name()));
    })
}

fn meta_log(router: &Router) -> Arc<Mutex<Vec<(Generator, EventType)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    router.add_listener(
        ListenerFn::arc("meta", move |_r: &Router, e: &Event| {
            if let Some(g) = Generator::from_index(e.source) {
                l.lock().unwrap().push((g, e.kind));
            }
        }),
        Generator::Router,
    );
    log.lock().unwrap().clear();
    log
}

/// Counts events delivered to the owning listener.
struct Ticker {
    fired: Mutex<Vec<(u64, u64)>>,
}

impl Ticker {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fired: Mutex::new(Vec::new()),
        })
    }

    fn fired(&self) -> Vec<(u64, u64)> {
        self.fired.lock().unwrap().clone()
    }
}

impl Listener for Ticker {
    fn process_event(&self, _router: &Router, event: &Event) {
        self.fired
            .lock()
            .unwrap()
            .push((event.timestamp, event.duration));
    }
}

#[test]
fn test_sensor_scenario() {
    let (router, _) = setup();
    let meta = meta_log(&router);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let l = ListenerFn::arc("L", move |_r: &Router, e: &Event| {
        s.lock().unwrap().push((e.generator, e.source, e.kind));
    });
    router.add_listener(l.clone(), Generator::Sensor);

    router.post(Generator::Sensor, 3, EventType::Activate);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(Generator::Sensor, 3, EventType::Activate)]
    );

    assert!(router.remove_listener(SubscriberId::of(&l), Generator::Sensor));
    assert_eq!(
        *meta.lock().unwrap(),
        vec![
            (Generator::Sensor, EventType::Activate),
            (Generator::Sensor, EventType::Deactivate),
        ]
    );

    router.post(Generator::Sensor, 3, EventType::Activate);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_has_listeners_tracks_live_subscriptions() {
    let (router, _) = setup();
    let log = Log::default();
    let a = recorder("a", &log);
    let b = recorder("b", &log);
    let (a_id, b_id) = (SubscriberId::of(&a), SubscriberId::of(&b));

    assert!(!router.has_listeners(Generator::VisObject));

    router.add_listener(a.clone(), (Generator::VisObject, 7, EventType::Status));
    router.add_listener(b.clone(), (Generator::VisObject, 8));
    assert!(router.has_listeners(Generator::VisObject));
    assert!(router.has_listeners((Generator::VisObject, 7)));
    assert!(router.has_listeners((Generator::VisObject, 7, EventType::Status)));
    assert!(!router.has_listeners((Generator::VisObject, 7, EventType::Activate)));
    assert!(!router.has_listeners((Generator::VisObject, 9)));

    assert!(router.remove_listener(a_id, (Generator::VisObject, 7, EventType::Status)));
    assert!(router.has_listeners(Generator::VisObject));
    assert!(router.remove_listener(b_id, (Generator::VisObject, 8)));
    assert!(!router.has_listeners(Generator::VisObject));

    let t = TrapperFn::arc("t", |_r: &Router, _e: &Event| false);
    router.add_trapper(t.clone(), Generator::VisObject);
    assert!(router.has_listeners(Generator::VisObject));
    router.remove_trapper(SubscriberId::of(&t), Generator::VisObject);
    assert!(!router.has_listeners(Generator::VisObject));
}

#[test]
fn test_three_level_matching() {
    let (router, _) = setup();
    let log = Log::default();
    router.add_listener(recorder("all", &log), Generator::Button);
    router.add_listener(recorder("src", &log), (Generator::Button, 1));
    router.add_listener(recorder("exact", &log), (Generator::Button, 1, EventType::Deactivate));

    router.post(Generator::Button, 1, EventType::Activate);
    router.post(Generator::Button, 1, EventType::Deactivate);
    router.post(Generator::Button, 2, EventType::Deactivate);
    router.post(Generator::Power, 1, EventType::Deactivate);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "src (button,1,A)",
            "all (button,1,A)",
            "src (button,1,D)",
            "exact (button,1,D)",
            "all (button,1,D)",
            "all (button,2,D)",
        ]
    );
}

#[test]
fn test_trapped_event_reaches_no_listener() {
    let (router, _) = setup();
    let log = Log::default();
    router.add_listener(recorder("l", &log), Generator::MicSound);

    let calls = Arc::new(Mutex::new(0));
    let c = calls.clone();
    router.add_trapper(
        TrapperFn::arc("first", move |_r: &Router, _e: &Event| {
            *c.lock().unwrap() += 1;
            false
        }),
        Generator::MicSound,
    );
    router.add_trapper(
        TrapperFn::arc("mute", |_r: &Router, e: &Event| e.source == 0),
        Generator::MicSound,
    );

    router.post(Generator::MicSound, 0, EventType::Status);
    router.post(Generator::MicSound, 1, EventType::Status);

    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["l (mic_sound,1,S)"]);
}

#[test]
fn test_membership_meta_events_count_transitions() {
    let (router, _) = setup();
    let meta = meta_log(&router);
    let log = Log::default();
    let a = recorder("a", &log);
    let b = recorder("b", &log);

    router.add_listener(a.clone(), Generator::Pilot);
    router.add_listener(b.clone(), (Generator::Pilot, 2));
    router.remove_listener_all(SubscriberId::of(&a));
    router.remove_listener_all(SubscriberId::of(&b));

    assert_eq!(
        *meta.lock().unwrap(),
        vec![
            (Generator::Pilot, EventType::Activate),
            (Generator::Pilot, EventType::Status),
            (Generator::Pilot, EventType::Status),
            (Generator::Pilot, EventType::Deactivate),
        ]
    );
}

#[test]
fn test_nested_post_waits_for_current_event() {
    let (router, _) = setup();
    let log = Log::default();

    let l = log.clone();
    router.add_listener(
        ListenerFn::arc("poster", move |r: &Router, e: &Event| {
            l.lock().unwrap().push(format!("poster {}", e.name()));
            if e.generator == Generator::Button {
                r.post(Generator::StateSignal, 9, EventType::Status);
                l.lock().unwrap().push("poster returned".to_owned());
            }
        }),
        Generator::Button,
    );
    router.add_listener(recorder("after", &log), Generator::Button);
    router.add_listener(recorder("signal", &log), Generator::StateSignal);

    router.post(Generator::Button, 0, EventType::Activate);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "poster (button,0,A)",
            "after (button,0,A)",
            "signal (state_signal,9,S)",
            "poster returned",
        ]
    );
}

#[test]
fn test_listener_removing_itself() {
    let (router, _) = setup();
    let hits = Arc::new(Mutex::new(0));
    let h = hits.clone();

    struct Once {
        hits: Arc<Mutex<u32>>,
    }
    impl Listener for Once {
        fn process_event(&self, router: &Router, event: &Event) {
            *self.hits.lock().unwrap() += 1;
            router.remove_listener(SubscriberId::of_ref(self), event.generator);
        }
    }

    router.add_listener(Arc::new(Once { hits: h }), Generator::Grasper);
    router.post(Generator::Grasper, 0, EventType::Status);
    router.post(Generator::Grasper, 0, EventType::Status);

    assert_eq!(*hits.lock().unwrap(), 1);
    assert!(!router.has_listeners(Generator::Grasper));
}

#[test]
fn test_one_shot_timer_fires_once() {
    let (router, clock) = setup();
    let t = Ticker::new();
    let id = SubscriberId::of(&t);

    clock.set(10);
    router.add_timer(t.clone(), 1, 50, false);
    assert_eq!(router.next_timer(), Some(60));

    router.process_timers_at(59);
    assert!(t.fired().is_empty());

    router.process_timers_at(61);
    assert_eq!(t.fired(), vec![(61, 60)]);
    assert!(router.next_timer_info(id, Some(1)).is_none());
    assert_eq!(router.timer_count(), 0);

    router.process_timers_at(500);
    assert_eq!(t.fired().len(), 1);
}

#[test]
fn test_repeating_timer_catches_up_without_bursts() {
    let (router, _) = setup();
    let t = Ticker::new();
    let id = SubscriberId::of(&t);

    router.add_timer(t.clone(), 0, 100, true);
    router.process_timers_at(260);

    assert_eq!(t.fired(), vec![(260, 100)]);
    let info = router.next_timer_info(id, None).unwrap();
    assert!(info.next_ms > 260);
    assert_eq!(info.next_ms, 300);
    assert!(info.repeat);
}

#[test]
fn test_readding_timer_updates_single_entry() {
    let (router, clock) = setup();
    let t = Ticker::new();
    let id = SubscriberId::of(&t);

    router.add_timer(t.clone(), 4, 100, false);
    clock.set(20);
    router.add_timer(t.clone(), 4, 30, true);

    assert_eq!(router.timer_count(), 1);
    let info = router.next_timer_info(id, Some(4)).unwrap();
    assert_eq!((info.delay_ms, info.repeat, info.next_ms), (30, true, 50));

    router.add_timer(t.clone(), 4, TIMER_CANCEL, true);
    assert_eq!(router.timer_count(), 0);
}

#[test]
fn test_timer_is_broadcast_after_owner() {
    let (router, _) = setup();
    let log = Log::default();
    let owner = recorder("owner", &log);
    router.add_listener(recorder("spy", &log), Generator::Timer);

    router.add_timer(owner.clone(), 5, 10, false);
    router.process_timers_at(10);

    assert_eq!(
        *log.lock().unwrap(),
        vec!["owner (timer,5,S)", "spy (timer,5,S)"]
    );
}

#[test]
fn test_handler_can_rearm_its_own_timer() {
    let (router, _) = setup();

    struct Blink {
        count: Mutex<u32>,
    }
    impl Listener for Blink {
        fn process_event(&self, router: &Router, event: &Event) {
            let mut count = self.count.lock().unwrap();
            *count += 1;
            if *count < 3 {
                let me = SubscriberId::of_ref(self);
                assert!(router.add_timer_by_id(me, event.source, 10, false));
            }
        }
    }

    let blink = Arc::new(Blink {
        count: Mutex::new(0),
    });
    router.add_timer(blink.clone(), 0, 10, false);
    for now in [10, 20, 30, 40, 50] {
        // Timers are re-armed relative to the router clock, which stays at 0.
        router.process_timers_at(now);
    }

    assert_eq!(*blink.count.lock().unwrap(), 3);
    assert_eq!(router.timer_count(), 0);
}

#[test]
fn test_sibling_timer_removed_mid_batch_does_not_fire() {
    let (router, _) = setup();
    let victim = Ticker::new();
    let victim_id = SubscriberId::of(&victim);

    let killer = ListenerFn::arc("killer", move |r: &Router, _e: &Event| {
        r.remove_timer(victim_id, 0);
    });
    router.add_timer(killer, 0, 5, false);
    router.add_timer(victim.clone(), 0, 5, false);

    router.process_timers_at(5);
    assert!(victim.fired().is_empty());
    assert_eq!(router.timer_count(), 0);
}

#[test]
fn test_remove_drops_listeners_and_timers_but_not_trappers() {
    let (router, _) = setup();
    let t = Ticker::new();
    let id = SubscriberId::of(&t);
    router.add_listener(t.clone(), Generator::Ai);
    router.add_timer(t.clone(), 0, 5, true);
    router.add_trapper(TrapperFn::arc("keep", |_r: &Router, _e: &Event| false), Generator::Ai);

    router.remove(id);
    assert!(!router.is_listening_any(id, Generator::Ai));
    assert_eq!(router.timer_count(), 0);
    assert!(router.has_listeners(Generator::Ai));
}

#[test]
fn test_introspection_queries() {
    let (router, _) = setup();
    let log = Log::default();
    let a = recorder("a", &log);
    let id = SubscriberId::of(&a);
    router.add_listener(a.clone(), (Generator::Lookout, 2));

    let ev = Event::new(Generator::Lookout, 2, EventType::Activate);
    assert!(router.is_listening(id, &ev));
    assert!(router.is_listening_any(id, Generator::Lookout));
    assert!(router.is_listening_all(id, (Generator::Lookout, 2)));
    assert!(!router.is_listening_all(id, Generator::Lookout));

    let t = TrapperFn::arc("t", |_r: &Router, _e: &Event| false);
    router.add_trapper_all(t.clone());
    let tid = SubscriberId::of(&t);
    assert!(router.is_trapping(tid, &ev));
    assert!(router.is_trapping_all(tid, Generator::WorldModel));
    assert!(router.remove_trapper_all(tid));
    assert!(!router.is_trapping_any(tid, Generator::WorldModel));
}

#[test]
fn test_reset_is_silent() {
    let (router, _) = setup();
    let meta = meta_log(&router);
    let log = Log::default();
    router.add_listener(recorder("a", &log), Generator::Audio);
    router.add_timer(recorder("b", &log), 0, 1, true);
    meta.lock().unwrap().clear();

    router.reset();
    assert!(!router.has_listeners(Generator::Audio));
    assert!(!router.has_listeners(Generator::Router));
    assert_eq!(router.next_timer(), None);
    assert!(meta.lock().unwrap().is_empty());
}

#[test]
fn test_fault_hook_sees_context_and_others_still_run() {
    let (router, _) = setup();
    let reports = Arc::new(Mutex::new(Vec::new()));
    let r = reports.clone();
    router.set_fault_hook(Arc::new(move |fault: &Fault<'_>| {
        r.lock()
            .unwrap()
            .push((fault.subscriber.to_owned(), fault.message.clone()));
        FaultAction::Continue
    }));

    let log = Log::default();
    router.add_listener(
        ListenerFn::arc("broken", |_r: &Router, _e: &Event| panic!("lost calibration")),
        Generator::MoCap,
    );
    router.add_listener(recorder("ok", &log), Generator::MoCap);

    router.post(Generator::MoCap, 0, EventType::Status);

    assert_eq!(*log.lock().unwrap(), vec!["ok (mocap,0,S)"]);
    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "broken");
    assert!(reports[0].1.contains("lost calibration"));
    assert!(reports[0].1.contains("(mocap,0,S)"));
}

#[test]
fn test_deferred_queue_and_requeue() {
    let (router, _) = setup();
    let log = Log::default();
    router.add_listener(recorder("l", &log), Generator::WatchedVar);

    router
        .queue_event(Event::new(Generator::WatchedVar, 1, EventType::Status).with_name("old"))
        .unwrap();
    router
        .queue_event(Event::new(Generator::WatchedVar, 2, EventType::Status))
        .unwrap();
    router
        .requeue_event(Event::new(Generator::WatchedVar, 1, EventType::Status).with_name("new"))
        .unwrap();
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(router.process_queue(), 2);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["l (watched_var,2,S)", "l new"]
    );
}

#[test]
fn test_forwarding_agent_diverts_secondary_role() {
    let (router, _) = setup();
    let log = Log::default();
    router.add_listener(recorder("main", &log), Generator::MotionManager);
    router.set_forwarding_agent(
        ProcessRole::Motion,
        Some(Arc::new(QueueForwarder::new(router.queue().clone()))),
    );

    let r = router.clone();
    thread::spawn(move || {
        ProcessRole::set_current(Some(ProcessRole::Motion));
        r.post(Generator::MotionManager, 3, EventType::Activate);
    })
    .join()
    .unwrap();

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(router.process_queue(), 1);
    assert_eq!(*log.lock().unwrap(), vec!["main (motion_manager,3,A)"]);
}

/// Watches every post from its role but lets the router dispatch locally.
struct Tap {
    seen: Mutex<Vec<String>>,
}

impl ForwardingAgent for Tap {
    fn forward_event(&self, event: &Event) -> bool {
        self.seen.lock().unwrap().push(event.name());
        false
    }
}

#[test]
fn test_declining_agent_still_dispatches_locally() {
    let (router, _) = setup();
    let log = Log::default();
    router.add_listener(recorder("local", &log), Generator::MicPitch);
    let tap = Arc::new(Tap {
        seen: Mutex::new(Vec::new()),
    });
    router.set_forwarding_agent(ProcessRole::Sound, Some(tap.clone()));

    let r = router.clone();
    thread::spawn(move || {
        ProcessRole::set_current(Some(ProcessRole::Sound));
        r.post(Generator::MicPitch, 4, EventType::Status);
    })
    .join()
    .unwrap();

    assert_eq!(*tap.seen.lock().unwrap(), vec!["(mic_pitch,4,S)"]);
    assert_eq!(*log.lock().unwrap(), vec!["local (mic_pitch,4,S)"]);
    assert_eq!(router.process_queue(), 0);
}

#[test]
fn test_exemplar_event_filter_matches_exact_triple() {
    let (router, _) = setup();
    let log = Log::default();
    let exact = recorder("exact", &log);
    let id = SubscriberId::of(&exact);
    router.add_listener(recorder("all", &log), Generator::Button);

    let ev = Event::new(Generator::Button, 2, EventType::Activate);
    router.add_listener(exact.clone(), &ev);
    assert!(router.is_listening_all(id, &ev));
    assert!(!router.is_listening_all(id, (Generator::Button, 2)));

    let gate = Event::new(Generator::Button, 3, EventType::Status);
    let t = TrapperFn::arc("gate", |_r: &Router, _e: &Event| true);
    router.add_trapper(t.clone(), &gate);
    assert!(router.is_trapping(SubscriberId::of(&t), &gate));

    router.post(Generator::Button, 2, EventType::Activate);
    router.post(Generator::Button, 2, EventType::Status);
    router.post(Generator::Button, 1, EventType::Activate);
    router.post(Generator::Button, 3, EventType::Status);
    router.post(Generator::Button, 3, EventType::Activate);

    assert!(router.remove_listener(id, &ev));
    assert!(!router.is_listening_any(id, Generator::Button));
    router.post(Generator::Button, 2, EventType::Activate);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "exact (button,2,A)",
            "all (button,2,A)",
            "all (button,2,S)",
            "all (button,1,A)",
            "all (button,3,A)",
            "all (button,2,A)",
        ]
    );
}

#[test]
fn test_router_event_uses_router_clock() {
    let (router, clock) = setup();
    clock.set(1_000_000);
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let s = stamps.clone();
    router.add_listener(
        ListenerFn::arc("stamp", move |_r: &Router, e: &Event| s.lock().unwrap().push(e.timestamp)),
        Generator::Sensor,
    );

    router.post_event(router.event(Generator::Sensor, 0, EventType::Status).with_magnitude(0.5));
    router.post(Generator::Sensor, 1, EventType::Status);

    assert_eq!(*stamps.lock().unwrap(), vec![1_000_000, 1_000_000]);
}

#[test]
fn test_timer_count_skips_fired_one_shot_during_batch() {
    let (router, _) = setup();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let c = counts.clone();
    let once = ListenerFn::arc("once", move |r: &Router, _e: &Event| {
        c.lock().unwrap().push(r.timer_count());
    });
    router.add_timer(once, 0, 10, false);
    router.add_timer(Ticker::new(), 0, 50, true);

    router.process_timers_at(10);
    assert_eq!(*counts.lock().unwrap(), vec![1]);
    assert_eq!(router.timer_count(), 1);
}

#[test]
fn test_cascades_from_threads_do_not_interleave() {
    let (router, _) = setup();
    let log = Log::default();
    let l = log.clone();
    router.add_listener(
        ListenerFn::arc("slow", move |r: &Router, e: &Event| {
            l.lock().unwrap().push(format!("begin {}", e.source));
            if e.kind == EventType::Activate {
                thread::sleep(Duration::from_millis(5));
                r.post(Generator::User, e.source, EventType::Deactivate);
            }
            l.lock().unwrap().push(format!("end {}", e.source));
        }),
        Generator::User,
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let r = router.clone();
            thread::spawn(move || r.post(Generator::User, i, EventType::Activate))
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Each cascade writes four lines for one source with nothing in between.
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 16);
    for chunk in log.chunks(4) {
        let src = chunk[0].trim_start_matches("begin ");
        for line in chunk {
            assert!(line.ends_with(src), "interleaved cascade: {chunk:?}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_driver_fires_timers() {
    let clock = Arc::new(ManualClock::new(0));
    let router = Router::builder(RouterConfig {
        tick: Duration::from_millis(5),
        ..RouterConfig::default()
    })
    .with_clock(clock.clone())
    .build();

    let t = Ticker::new();
    router.add_timer(t.clone(), 0, 100, false);

    let driver = TimerDriver::spawn(router.clone(), CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(t.fired().is_empty());

    clock.set(100);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(t.fired(), vec![(100, 100)]);

    driver.stop().await.unwrap();
}
