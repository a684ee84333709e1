//! # Event envelope routed between components.
//!
//! Every occurrence is identified by a 3-tuple:
//! - the [`Generator`]: the domain the event comes from (buttons, sensors, timers, ...);
//! - the [`SourceId`]: which specific origin inside that domain (button 3, timer 42);
//! - the [`EventType`]: where it sits in a standing condition
//!   (activate → status* → deactivate).
//!
//! The [`Event`] struct carries that identity plus timing and diagnostic
//! metadata, and an optional opaque payload for richer producers.
//!
//! ## Example
//! ```rust
//! use erouter::{Event, EventType, Generator};
//!
//! let ev = Event::new(Generator::Button, 3, EventType::Activate)
//!     .with_duration(120)
//!     .with_name("head-button");
//!
//! assert_eq!(ev.generator, Generator::Button);
//! assert_eq!(ev.source, 3);
//! assert_eq!(ev.name(), "head-button");
//! assert_eq!(ev.magnitude, 1.0);
//! ```

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::core::clock::process_millis;
use crate::error::RouterError;
use crate::subscribers::SubscriberId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Identifies the specific origin of an event within its generator.
///
/// Interpretation is generator-specific; callers may also smuggle an opaque
/// handle through it.
pub type SourceId = usize;

/// Declares [`Generator`] together with its stable display names.
macro_rules! generators {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, )+) => {
        /// Coarse classification of an event's origin domain.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Generator {
            $( $(#[$doc])* $variant, )+
        }

        impl Generator {
            /// Every generator, in declaration order.
            pub const ALL: &'static [Generator] = &[ $( Generator::$variant, )+ ];

            /// Stable short name (used in generated event names and parsing).
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Generator::$variant => $name, )+
                }
            }
        }
    };
}

generators! {
    /// Default generator, meant for tests and quick hacks.
    Unknown => "unknown",
    /// Decisions made by planning code.
    Ai => "ai",
    /// Sound playback start/stop; source is the play id.
    Audio => "audio",
    /// Button press (activate), pressure change (status), release (deactivate).
    Button => "button",
    /// Camera resolution changed or a camera was hot-swapped.
    CameraResolution => "camera_resolution",
    /// Membership meta-events synthesized by the router; source is the affected generator index.
    Router => "router",
    /// Emergency stop toggled.
    Estop => "estop",
    /// Grasp requests processed.
    Grasper => "grasper",
    /// Locomotion updates; source is the posting motion command.
    Locomotion => "locomotion",
    /// Look-at requests completed.
    Lookout => "lookout",
    /// Map building completed.
    MapBuilder => "map_builder",
    /// Raw microphone buffers.
    MicSound => "mic_sound",
    /// Frequency detections.
    MicPitch => "mic_pitch",
    /// External position/orientation updates.
    MoCap => "mocap",
    /// Motion commands added or removed.
    MotionManager => "motion_manager",
    /// Navigation pilot updates.
    Pilot => "pilot",
    /// Power and temperature warnings.
    Power => "power",
    /// Startup (activate) and shutdown (deactivate).
    Runtime => "runtime",
    /// New sensor readings available.
    Sensor => "sensor",
    /// Servo errors; source is the output offset.
    Servo => "servo",
    /// State machine node entered/left.
    StateMachine => "state_machine",
    /// Data signals monitored by state transitions.
    StateSignal => "state_signal",
    /// State transition fired.
    StateTransition => "state_transition",
    /// Console text messages.
    TextMsg => "text_msg",
    /// Timer expirations (see `Router::add_timer`); always status.
    Timer => "timer",
    /// Reserved for application events.
    User => "user",
    /// Raw camera frames.
    VisRawCamera => "vis_raw_camera",
    /// Depth frames.
    VisRawDepth => "vis_raw_depth",
    /// JPEG-compressed frames.
    VisJpeg => "vis_jpeg",
    /// PNG-compressed frames.
    VisPng => "vis_png",
    /// Color-segmented frames.
    VisSegment => "vis_segment",
    /// Run-length-encoded segmented frames.
    VisRle => "vis_rle",
    /// Connected color regions.
    VisRegion => "vis_region",
    /// Detected objects.
    VisObject => "vis_object",
    /// Watched memory changed.
    WatchedVar => "watched_var",
    /// World model updates.
    WorldModel => "world_model",
}

impl Generator {
    /// Position of this generator in [`Generator::ALL`].
    ///
    /// Used as the source id of membership meta-events.
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Inverse of [`Generator::index`].
    pub fn from_index(index: usize) -> Option<Generator> {
        Generator::ALL.get(index).copied()
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generator {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Generator::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RouterError::UnknownGenerator { name: s.to_string() })
    }
}

/// Role of an event within a standing condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// The condition just began (button down).
    Activate,
    /// The condition continues or its value changed (new sensor reading).
    Status,
    /// The condition ended (button up).
    Deactivate,
}

impl EventType {
    /// All types, in declaration order.
    pub const ALL: [EventType; 3] = [EventType::Activate, EventType::Status, EventType::Deactivate];

    /// Full lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Activate => "activate",
            EventType::Status => "status",
            EventType::Deactivate => "deactivate",
        }
    }

    /// One-letter abbreviation used in generated event names.
    pub fn abbr(&self) -> &'static str {
        match self {
            EventType::Activate => "A",
            EventType::Status => "S",
            EventType::Deactivate => "D",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s) || t.abbr().eq_ignore_ascii_case(s))
            .ok_or_else(|| RouterError::UnknownEventType { name: s.to_string() })
    }
}

/// Opaque payload attached by richer producers (camera frames, sensor snapshots).
pub type Payload = Arc<dyn Any + Send + Sync>;

/// One routed occurrence.
///
/// - `generator` / `source` / `kind`: identity, never changed by the router
/// - `timestamp`: creation time in milliseconds since process start
/// - `seq`: monotonic global sequence (creation order)
/// - remaining fields are optional metadata
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Origin domain.
    pub generator: Generator,
    /// Specific origin within the generator.
    pub source: SourceId,
    /// Activate / status / deactivate.
    pub kind: EventType,
    /// Creation time (ms).
    pub timestamp: u64,
    /// Generator-specific duration (ms); for timers, the time the timer was due.
    pub duration: u64,
    /// "Strength" of the event: 1.0 for activate/status, 0.0 for deactivate by default.
    pub magnitude: f32,
    /// Remote host that produced this event (`None` = local).
    pub host: Option<i32>,
    /// For timer events: the listener that requested the timer.
    pub target: Option<SubscriberId>,
    /// Custom diagnostic name; a name is generated when unset.
    pub label: Option<Arc<str>>,
    /// Optional richer payload.
    pub payload: Option<Payload>,
}

impl Event {
    /// Creates a new event stamped with the process clock and the next sequence number.
    ///
    /// The timestamp ignores any custom router clock; use
    /// [`Router::event`](crate::Router::event) for router time.
    pub fn new(generator: Generator, source: SourceId, kind: EventType) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            generator,
            source,
            kind,
            timestamp: process_millis(),
            duration: 0,
            magnitude: match kind {
                EventType::Deactivate => 0.0,
                _ => 1.0,
            },
            host: None,
            target: None,
            label: None,
            payload: None,
        }
    }

    /// Overrides the creation timestamp.
    #[inline]
    pub fn with_timestamp(mut self, ms: u64) -> Self {
        self.timestamp = ms;
        self
    }

    /// Attaches a duration (ms).
    #[inline]
    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration = ms;
        self
    }

    /// Overrides the default magnitude.
    #[inline]
    pub fn with_magnitude(mut self, magnitude: f32) -> Self {
        self.magnitude = magnitude;
        self
    }

    /// Attaches a custom diagnostic name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.label = Some(name.into());
        self
    }

    /// Marks the event as coming from a remote host.
    #[inline]
    pub fn with_host(mut self, host: i32) -> Self {
        self.host = Some(host);
        self
    }

    /// Attaches an opaque payload.
    #[inline]
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    #[inline]
    pub(crate) fn with_target(mut self, target: SubscriberId) -> Self {
        self.target = Some(target);
        self
    }

    /// Borrows the payload as `T`, if present and of that type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    /// Diagnostic name: the custom label, or `(generator,source,A|S|D)`.
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.to_string(),
            None => format!(
                "({},{},{})",
                self.generator,
                self.source,
                self.kind.abbr()
            ),
        }
    }

    /// True if generator, source and type all match.
    #[inline]
    pub fn same_id(&self, other: &Event) -> bool {
        self.generator == other.generator && self.source == other.source && self.kind == other.kind
    }

    /// True if generator and source match (type may differ).
    #[inline]
    pub fn same_origin(&self, other: &Event) -> bool {
        self.generator == other.generator && self.source == other.source
    }

    /// Tab-separated description with increasing detail.
    ///
    /// - `0`: name, generator, source, type
    /// - `1`: adds duration and timestamp
    /// - `2+`: adds magnitude
    pub fn description(&self, verbosity: u8) -> String {
        let mut out = format!(
            "{}\t{}\t{}\t{}",
            self.name(),
            self.generator,
            self.source,
            self.kind
        );
        if verbosity >= 1 {
            out.push_str(&format!("\t{}\t{}", self.duration, self.timestamp));
        }
        if verbosity >= 2 {
            out.push_str(&format!("\t{}", self.magnitude));
        }
        out
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("generator", &self.generator)
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("timestamp", &self.timestamp)
            .field("duration", &self.duration)
            .field("magnitude", &self.magnitude)
            .field("host", &self.host)
            .field("target", &self.target)
            .field("label", &self.label)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}
