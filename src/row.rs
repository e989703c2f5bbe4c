//! Synthetic row generation shared by every writer.

use anyhow::Result;
use chrono::Utc;
use rand::RngCore;

use crate::keygen::{KeyGenerator, KeyType, KeyValue};

/// Payload length in bytes. Constant across a run so that size deltas
/// reflect key and index effects, not payload variance.
pub const PAYLOAD_LEN: usize = 512;

/// One row of the benchmark table. Rows are write-once; nothing updates
/// or deletes them within a run.
pub struct Row {
    pub id: KeyValue,
    pub time_created: String,
    pub data: String,
}

/// Produces batches of rows keyed by the configured generation strategy.
pub struct RowGenerator {
    key_gen: Box<dyn KeyGenerator>,
}

impl RowGenerator {
    pub fn new(key_gen: Box<dyn KeyGenerator>) -> Self {
        Self { key_gen }
    }

    /// Column datatype of the keys this generator produces.
    pub fn key_type(&self) -> KeyType {
        self.key_gen.datatype()
    }

    pub fn generate_batch(&mut self, batch_size: usize) -> Result<Vec<Row>> {
        (0..batch_size).map(|_| self.generate_row()).collect()
    }

    fn generate_row(&mut self) -> Result<Row> {
        let id = self.key_gen.get_next();
        anyhow::ensure!(
            id.fits(self.key_gen.datatype()),
            "key generator produced a {}-byte value for a {:?} column",
            id.width(),
            self.key_gen.datatype(),
        );

        Ok(Row {
            id,
            time_created: Utc::now().to_rfc3339(),
            data: random_payload(PAYLOAD_LEN),
        })
    }
}

/// Random printable payload of exactly `len` bytes: base64 over random
/// bytes, truncated. Some entropy is wasted, which does not matter here.
fn random_payload(len: usize) -> String {
    let mut raw = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut raw);
    let mut encoded = base64::encode(&raw);
    encoded.truncate(len);
    encoded
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::keygen::SequentialInt64Generator;

    #[test]
    fn payload_length_is_constant() {
        let mut rows = RowGenerator::new(Box::new(SequentialInt64Generator::new()));
        for row in rows.generate_batch(100).unwrap() {
            assert_eq!(PAYLOAD_LEN, row.data.len());
        }
    }

    #[test]
    fn batch_has_requested_size_and_sequential_keys() {
        let mut rows = RowGenerator::new(Box::new(SequentialInt64Generator::new()));
        let batch = rows.generate_batch(10).unwrap();
        assert_eq!(10, batch.len());
        for (i, row) in batch.iter().enumerate() {
            assert_eq!(KeyValue::Int(i as i64 + 1), row.id);
        }
    }

    #[test]
    fn timestamps_are_valid_rfc3339() {
        let mut rows = RowGenerator::new(Box::new(SequentialInt64Generator::new()));
        let batch = rows.generate_batch(3).unwrap();
        for row in &batch {
            DateTime::parse_from_rfc3339(&row.time_created).unwrap();
        }
    }

    #[test]
    fn misdeclared_key_width_fails_fast() {
        use crate::keygen::{KeyGenerator, KeyType};

        // Claims a 16-byte binary column but emits 3-byte values.
        struct Lying;
        impl KeyGenerator for Lying {
            fn get_next(&mut self) -> KeyValue {
                KeyValue::Bytes(vec![1, 2, 3])
            }
            fn datatype(&self) -> KeyType {
                KeyType::Binary(16)
            }
        }

        let mut rows = RowGenerator::new(Box::new(Lying));
        assert!(rows.generate_batch(1).is_err());
    }
}
