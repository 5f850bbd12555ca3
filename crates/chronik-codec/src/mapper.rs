//! Translation between domain events and stored records.
//!
//! The mapper owns the codec pipeline. Write path: stamp the wall-clock
//! timestamp and current schema version into the state, transcode, compress,
//! encrypt. Read path: decrypt, decompress, transcode-decode, run the
//! upcaster chain, reject unknown topics, strip the bookkeeping keys back
//! out. The stage order is fixed; decryption happens before decompression so
//! the decompressor only ever sees authenticated input.

use std::sync::Arc;

use tracing::debug;

use chronik_core::{
    DomainEvent, EventTypeRegistry, Result, StateMap, StoreError, StoredEvent, TranscodingError,
    Value,
};

use crate::cipher::Cipher;
use crate::compress::Compressor;
use crate::transcoder::JsonTranscoder;
use crate::upcast::{UpcasterChain, SCHEMA_VERSION_KEY};

/// Reserved state key carrying an event's timestamp on the wire.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Composes the transcoder with the optional compressor and cipher, and
/// translates between [`DomainEvent`]s and [`StoredEvent`]s.
///
/// Built once at application construction and shared read-only.
pub struct Mapper {
    transcoder: Arc<JsonTranscoder>,
    registry: Arc<EventTypeRegistry>,
    upcasters: Arc<UpcasterChain>,
    compressor: Option<Arc<dyn Compressor>>,
    cipher: Option<Arc<dyn Cipher>>,
}

impl Mapper {
    /// A mapper with neither compression nor encryption.
    pub fn new(transcoder: Arc<JsonTranscoder>, registry: Arc<EventTypeRegistry>) -> Self {
        Self {
            transcoder,
            registry,
            upcasters: Arc::new(UpcasterChain::new()),
            compressor: None,
            cipher: None,
        }
    }

    /// Enable the compression stage.
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Enable the encryption stage.
    pub fn with_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Install the upcaster chain run before decoding.
    pub fn with_upcasters(mut self, upcasters: Arc<UpcasterChain>) -> Self {
        self.upcasters = upcasters;
        self
    }

    /// Map a domain event to its stored record.
    pub fn to_stored_event(&self, event: &DomainEvent) -> Result<StoredEvent> {
        let mut state = event.state.clone();
        state.insert(
            TIMESTAMP_KEY.to_owned(),
            Value::Timestamp(event.timestamp.fixed_offset()),
        );
        let version = self.registry.schema_version(&event.topic).unwrap_or(1);
        state.insert(SCHEMA_VERSION_KEY.to_owned(), Value::from(version));

        Ok(StoredEvent {
            originator_id: event.originator_id,
            originator_version: event.originator_version,
            topic: event.topic.clone(),
            state: self.encode_state(&state)?,
        })
    }

    /// Map a stored record back to its domain event.
    pub fn to_domain_event(&self, stored: &StoredEvent) -> Result<DomainEvent> {
        let (topic, mut state) = self.decode_state(stored.topic.clone(), &stored.state)?;

        let timestamp = state
            .remove(TIMESTAMP_KEY)
            .and_then(|v| v.as_timestamp())
            .ok_or_else(|| StoreError::Integrity("record state is missing its timestamp".into()))?;

        Ok(DomainEvent {
            originator_id: stored.originator_id,
            originator_version: stored.originator_version,
            timestamp: timestamp.with_timezone(&chrono::Utc),
            topic,
            state,
        })
    }

    /// Run a state map through the write pipeline.
    ///
    /// Used directly for snapshot state, which carries no timestamp.
    pub fn encode_state(&self, state: &StateMap) -> Result<Vec<u8>> {
        let mut bytes = self.transcoder.encode(&Value::Map(state.clone()))?;
        if let Some(compressor) = &self.compressor {
            bytes = compressor.compress(&bytes)?;
        }
        if let Some(cipher) = &self.cipher {
            bytes = cipher.encrypt(&bytes)?;
        }
        Ok(bytes)
    }

    /// Run stored bytes through the read pipeline, upcast, and verify the
    /// resulting topic is addressable.
    pub fn decode_state(&self, topic: String, bytes: &[u8]) -> Result<(String, StateMap)> {
        let mut bytes = bytes.to_vec();
        if let Some(cipher) = &self.cipher {
            bytes = cipher.decrypt(&bytes)?;
        }
        if let Some(compressor) = &self.compressor {
            bytes = compressor.decompress(&bytes)?;
        }

        let state = match self.transcoder.decode(&bytes)? {
            Value::Map(map) => map,
            other => {
                return Err(TranscodingError::Document(format!(
                    "record state must decode to a mapping, got {}",
                    other.kind()
                ))
                .into())
            }
        };

        let original_topic = topic.clone();
        let (topic, mut state) = self.upcasters.apply(topic, state)?;
        if topic != original_topic {
            debug!(from = %original_topic, to = %topic, "upcast renamed record topic");
        }

        if !self.registry.contains(&topic) {
            return Err(TranscodingError::UnknownTopic(topic).into());
        }
        state.remove(SCHEMA_VERSION_KEY);

        Ok((topic, state))
    }

    /// Stamp a snapshot state map with the current schema version for its
    /// topic before encoding.
    pub fn encode_snapshot_state(&self, topic: &str, state: &StateMap) -> Result<Vec<u8>> {
        let mut state = state.clone();
        let version = self.registry.schema_version(topic).unwrap_or(1);
        state.insert(SCHEMA_VERSION_KEY.to_owned(), Value::from(version));
        self.encode_state(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::Aes256GcmCipher;
    use crate::compress::ZlibCompressor;
    use crate::upcast::Upcaster;
    use uuid::Uuid;

    fn registry() -> Arc<EventTypeRegistry> {
        let mut registry = EventTypeRegistry::new();
        registry.register("order.placed");
        Arc::new(registry)
    }

    fn sample_event() -> DomainEvent {
        let mut state = StateMap::new();
        state.insert("what".into(), Value::from("dinosaurs"));
        state.insert("count".into(), Value::Int(3));
        DomainEvent::new(Uuid::new_v4(), 1, "order.placed", state)
    }

    fn mapper_with(compress: bool, encrypt: bool) -> Mapper {
        let mut mapper = Mapper::new(Arc::new(JsonTranscoder::new()), registry());
        if compress {
            mapper = mapper.with_compressor(Arc::new(ZlibCompressor::new()));
        }
        if encrypt {
            mapper = mapper.with_cipher(Arc::new(Aes256GcmCipher::new(
                &Aes256GcmCipher::generate_key(),
            )));
        }
        mapper
    }

    #[test]
    fn roundtrip_through_every_pipeline_shape() {
        for (compress, encrypt) in [(false, false), (true, false), (false, true), (true, true)] {
            let mapper = mapper_with(compress, encrypt);
            let event = sample_event();
            let stored = mapper.to_stored_event(&event).unwrap();
            let decoded = mapper.to_domain_event(&stored).unwrap();
            assert_eq!(decoded, event, "compress={compress} encrypt={encrypt}");
        }
    }

    #[test]
    fn timestamps_survive_with_microsecond_precision() {
        let mapper = mapper_with(false, false);
        let mut event = sample_event();
        event.timestamp = "2024-03-01T09:30:15.123456Z".parse().unwrap();
        let stored = mapper.to_stored_event(&event).unwrap();
        let decoded = mapper.to_domain_event(&stored).unwrap();
        assert_eq!(decoded.timestamp, event.timestamp);
    }

    #[test]
    fn encrypted_state_hides_the_plaintext() {
        let mapper = mapper_with(false, true);
        let stored = mapper.to_stored_event(&sample_event()).unwrap();
        let needle: &[u8] = b"dinosaurs";
        assert!(!stored.state.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn plain_state_is_a_readable_document() {
        let mapper = mapper_with(false, false);
        let stored = mapper.to_stored_event(&sample_event()).unwrap();
        let text = std::str::from_utf8(&stored.state).unwrap();
        assert!(text.contains("dinosaurs"));
        assert!(text.contains(SCHEMA_VERSION_KEY));
    }

    #[test]
    fn unknown_topic_after_upcast_is_rejected() {
        struct Rename;
        impl Upcaster for Rename {
            fn topic(&self) -> &str {
                "order.placed"
            }
            fn from_version(&self) -> u64 {
                1
            }
            fn upcast(&self, _: &str, state: StateMap) -> Result<(String, StateMap)> {
                Ok(("order.unheard_of".into(), state))
            }
        }

        let mut chain = UpcasterChain::new();
        chain.push(Rename);
        let mapper = mapper_with(false, false).with_upcasters(Arc::new(chain));

        let stored = mapper.to_stored_event(&sample_event()).unwrap();
        let err = mapper.to_domain_event(&stored).unwrap_err();
        match err {
            StoreError::Transcoding(TranscodingError::UnknownTopic(topic)) => {
                assert_eq!(topic, "order.unheard_of")
            }
            other => panic!("expected UnknownTopic, got {other}"),
        }
    }

    #[test]
    fn identity_upcaster_changes_nothing_observable() {
        struct Identity;
        impl Upcaster for Identity {
            fn topic(&self) -> &str {
                "order.placed"
            }
            fn from_version(&self) -> u64 {
                1
            }
            fn upcast(&self, topic: &str, state: StateMap) -> Result<(String, StateMap)> {
                Ok((topic.to_owned(), state))
            }
        }

        let event = sample_event();
        let plain = mapper_with(false, false);
        let stored = plain.to_stored_event(&event).unwrap();

        let mut chain = UpcasterChain::new();
        chain.push(Identity);
        let upcasting = mapper_with(false, false).with_upcasters(Arc::new(chain));

        assert_eq!(
            upcasting.to_domain_event(&stored).unwrap(),
            plain.to_domain_event(&stored).unwrap()
        );
    }

    #[test]
    fn tampered_ciphertext_surfaces_integrity_error() {
        let mapper = mapper_with(false, true);
        let mut stored = mapper.to_stored_event(&sample_event()).unwrap();
        let last = stored.state.len() - 1;
        stored.state[last] ^= 0x01;
        assert!(matches!(
            mapper.to_domain_event(&stored),
            Err(StoreError::Integrity(_))
        ));
    }
}
