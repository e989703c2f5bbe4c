use rand::rngs::StdRng;
use rand::Rng;
use uuid::timestamp::context::Context;
use uuid::{NoContext, Timestamp, Uuid};

use super::{KeyGenerator, KeyType, KeyValue};

/// Width of a binary-encoded UUID column.
const UUID_LEN: usize = 16;

/// RFC 4122 timestamps are 60 bits wide.
const RFC4122_TICK_MASK: u64 = (1 << 60) - 1;

/// Timestamp multiplier for the fast-rollover variant. `time_low` rolls
/// over roughly every 7 minutes of real time; scaling by 1000 brings that
/// under half a second, so a run crosses many rollover boundaries.
pub const FAST_ROLLOVER_MULTIPLIER: u64 = 1000;

fn key(uuid: Uuid) -> KeyValue {
    KeyValue::Bytes(uuid.into_bytes().to_vec())
}

/// Clock sequence state and node id shared by the time-based variants.
///
/// The node id is synthesized from the orchestrator's RNG instead of a
/// MAC address, with the multicast bit set as RFC 4122 requires for
/// random node ids.
struct NodeClock {
    context: Context,
    node_id: [u8; 6],
}

impl NodeClock {
    fn new(rng: &mut StdRng) -> Self {
        let mut node_id = [0u8; 6];
        rng.fill(&mut node_id[..]);
        node_id[0] |= 0x01;
        Self {
            context: Context::new(rng.gen()),
            node_id,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::now(&self.context)
    }
}

/// Version 1 UUIDs: 60-bit wall-clock timestamp plus node id.
pub struct UuidV1Generator {
    clock: NodeClock,
}

impl UuidV1Generator {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            clock: NodeClock::new(rng),
        }
    }
}

impl KeyGenerator for UuidV1Generator {
    fn get_next(&mut self) -> KeyValue {
        key(Uuid::new_v1(self.clock.now(), &self.clock.node_id))
    }

    fn datatype(&self) -> KeyType {
        KeyType::Binary(UUID_LEN)
    }
}

/// Version 1 UUIDs with the timestamp scaled so the low timestamp segment
/// rolls over far more often than real time would make it, exercising
/// index fragmentation around the rollover boundary.
pub struct UuidV1FastRolloverGenerator {
    clock: NodeClock,
    multiplier: u64,
}

impl UuidV1FastRolloverGenerator {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            clock: NodeClock::new(rng),
            multiplier: FAST_ROLLOVER_MULTIPLIER,
        }
    }
}

impl KeyGenerator for UuidV1FastRolloverGenerator {
    fn get_next(&mut self) -> KeyValue {
        let (ticks, counter) = self.clock.now().to_rfc4122();
        let scaled = Timestamp::from_rfc4122(scale_ticks(ticks, self.multiplier), counter);
        key(Uuid::new_v1(scaled, &self.clock.node_id))
    }

    fn datatype(&self) -> KeyType {
        KeyType::Binary(UUID_LEN)
    }
}

/// Scales an RFC 4122 tick count, wrapping within the 60-bit field.
fn scale_ticks(ticks: u64, multiplier: u64) -> u64 {
    ticks.wrapping_mul(multiplier) & RFC4122_TICK_MASK
}

/// Version 4 UUIDs, fully random.
///
/// Draws from the OS entropy source like every v4 implementation; these
/// keys are not meant to be reproducible across runs.
#[derive(Default)]
pub struct UuidV4Generator;

impl KeyGenerator for UuidV4Generator {
    fn get_next(&mut self) -> KeyValue {
        key(Uuid::new_v4())
    }

    fn datatype(&self) -> KeyType {
        KeyType::Binary(UUID_LEN)
    }
}

/// Version 6 UUIDs: the v1 timestamp reordered so byte order matches
/// chronological order.
pub struct UuidV6Generator {
    clock: NodeClock,
}

impl UuidV6Generator {
    pub fn new(rng: &mut StdRng) -> Self {
        Self {
            clock: NodeClock::new(rng),
        }
    }
}

impl KeyGenerator for UuidV6Generator {
    fn get_next(&mut self) -> KeyValue {
        key(Uuid::new_v6(self.clock.now(), &self.clock.node_id))
    }

    fn datatype(&self) -> KeyType {
        KeyType::Binary(UUID_LEN)
    }
}

/// Version 7 UUIDs: millisecond unix timestamp prefix, random tail.
#[derive(Default)]
pub struct UuidV7Generator;

impl KeyGenerator for UuidV7Generator {
    fn get_next(&mut self) -> KeyValue {
        key(Uuid::new_v7(Timestamp::now(NoContext)))
    }

    fn datatype(&self) -> KeyType {
        KeyType::Binary(UUID_LEN)
    }
}
