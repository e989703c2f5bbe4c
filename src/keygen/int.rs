use rand::rngs::StdRng;
use rand::Rng;

use super::{KeyGenerator, KeyType, KeyValue};

/// Uniformly random non-negative integers fitting a signed 64-bit column.
///
/// The top bit is always clear, so the full value range is `0..2^63`.
/// Reproducibility comes from the caller: the orchestrator seeds the RNG
/// once and threads it into this constructor.
pub struct RandomInt64Generator {
    rng: StdRng,
}

impl RandomInt64Generator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl KeyGenerator for RandomInt64Generator {
    fn get_next(&mut self) -> KeyValue {
        KeyValue::Int((self.rng.gen::<u64>() >> 1) as i64)
    }

    fn datatype(&self) -> KeyType {
        KeyType::BigInt
    }
}

/// Monotonic counter starting at 1, incrementing by 1 on every call.
#[derive(Default)]
pub struct SequentialInt64Generator {
    current: i64,
}

impl SequentialInt64Generator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyGenerator for SequentialInt64Generator {
    fn get_next(&mut self) -> KeyValue {
        self.current += 1;
        KeyValue::Int(self.current)
    }

    fn datatype(&self) -> KeyType {
        KeyType::BigInt
    }
}
