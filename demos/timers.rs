//! # Example: Timers, meta-events and the async driver
//!
//! A "camera driver" only produces frames while somebody listens to
//! `VisRawCamera`; a blinking behavior uses a repeating timer and stops
//! watching the camera after a few blinks.
//!
//! Run with: `cargo run --example timers --features logging`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use erouter::{
    Event, EventType, Generator, Listener, ListenerFn, LogWriter, Router, RouterConfig,
    SubscriberId, TimerDriver,
};

/// Blinks on a repeating timer; watches the camera until the fifth blink.
struct Blinker {
    blinks: AtomicU32,
}

impl Listener for Blinker {
    fn process_event(&self, router: &Router, event: &Event) {
        match event.generator {
            Generator::Timer => {
                let n = self.blinks.fetch_add(1, Ordering::Relaxed) + 1;
                println!("[blinker] blink #{n} (due at {}ms)", event.duration);
                if n == 5 {
                    let me = SubscriberId::of_ref(self);
                    router.remove_listener(me, Generator::VisRawCamera);
                    router.remove_timer(me, event.source);
                }
            }
            Generator::VisRawCamera => println!("[blinker] frame {}", event.source),
            _ => {}
        }
    }

    fn name(&self) -> &str {
        "blinker"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let router = Router::builder(RouterConfig {
        tick: Duration::from_millis(10),
        ..RouterConfig::default()
    })
    .build();

    router.add_listener(Arc::new(LogWriter::new()), Generator::Router);

    // The driver flips its gate from the membership announcements.
    let camera_on = Arc::new(AtomicBool::new(false));
    let gate = camera_on.clone();
    let camera_index = Generator::VisRawCamera.index();
    router.add_listener(
        ListenerFn::arc("camera-gate", move |_r: &Router, e: &Event| {
            if e.source == camera_index {
                gate.store(e.kind != EventType::Deactivate, Ordering::Relaxed);
            }
        }),
        Generator::Router,
    );

    let blinker = Arc::new(Blinker {
        blinks: AtomicU32::new(0),
    });
    router.add_listener(blinker.clone(), Generator::VisRawCamera);
    router.add_timer(blinker.clone(), 0, 40, true);

    let token = CancellationToken::new();
    let driver = TimerDriver::spawn(router.clone(), token.clone());

    for frame in 0..30 {
        if camera_on.load(Ordering::Relaxed) {
            router.queue_event(Event::new(Generator::VisRawCamera, frame, EventType::Status))?;
        }
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    driver.stop().await?;
    println!(
        "[main] camera on: {}, timers left: {}",
        camera_on.load(Ordering::Relaxed),
        router.timer_count()
    );
    Ok(())
}
