//! Messages exchanged with the peer over the wire.
//!
//! The peer describes its messages in a protobuf schema (package `mta`).
//! [`wire`] declares the same messages with `prost`, and [`MessageSchema`]
//! is the seam through which the client encodes and decodes them, so a
//! different schema implementation can be plugged into the state machine.

use bytes::Bytes;
use prost::Message;

use crate::protocols::messages;
use crate::protocols::ProtocolError;

/// Protobuf messages of the `mta` package.
pub mod wire {
    /// First frame sent by Alice once connected.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CorrelationDelta {
        #[prost(uint32, tag = "1")]
        pub delta: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct BobSetup {
        #[prost(bool, tag = "1")]
        pub success: bool,
        /// One 65-byte point per OT instance.
        #[prost(bytes = "vec", repeated, tag = "2")]
        pub ot_messages: Vec<Vec<u8>>,
        #[prost(bytes = "vec", tag = "3")]
        pub public_key: Vec<u8>,
        #[prost(uint32, tag = "4")]
        pub num_ot_instances: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct AliceMessages {
        #[prost(uint32, tag = "1")]
        pub masked_share: u32,
        #[prost(bool, repeated, tag = "2")]
        pub ot_choices: Vec<bool>,
        #[prost(bytes = "vec", repeated, tag = "3")]
        pub encrypted_shares: Vec<Vec<u8>>,
        /// Binary `AliceMessages` layout. Left empty unless the client is
        /// configured to attach it.
        #[prost(bytes = "vec", tag = "4")]
        pub ot_payload: Vec<u8>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct BobMessages {
        #[prost(bool, tag = "1")]
        pub success: bool,
        #[prost(bytes = "vec", repeated, tag = "2")]
        pub ot_responses: Vec<Vec<u8>>,
        #[prost(bytes = "vec", tag = "3")]
        pub encrypted_result: Vec<u8>,
        #[prost(uint32, tag = "4")]
        pub correlation_check: u32,
        #[prost(uint32, tag = "5")]
        pub masked_share: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct MtaResult {
        #[prost(bool, tag = "1")]
        pub success: bool,
        #[prost(uint32, tag = "2")]
        pub additive_share: u32,
        #[prost(string, tag = "3")]
        pub error_message: String,
    }
}

/// Encoding and decoding of each message kind.
pub trait MessageSchema {
    /// # Errors
    ///
    /// Will return `Err` if the message cannot be encoded.
    fn encode_correlation_delta(
        &self,
        message: &wire::CorrelationDelta,
    ) -> Result<Bytes, ProtocolError>;

    /// # Errors
    ///
    /// Will return `Err` if `frame` is not a valid `BobSetup`.
    fn decode_bob_setup(&self, frame: &[u8]) -> Result<wire::BobSetup, ProtocolError>;

    /// # Errors
    ///
    /// Will return `Err` if the message cannot be encoded.
    fn encode_alice_messages(&self, message: &wire::AliceMessages)
        -> Result<Bytes, ProtocolError>;

    /// # Errors
    ///
    /// Will return `Err` if `frame` is not a valid `BobMessages`.
    fn decode_bob_messages(&self, frame: &[u8]) -> Result<wire::BobMessages, ProtocolError>;

    /// # Errors
    ///
    /// Will return `Err` if the message cannot be encoded.
    fn encode_mta_result(&self, message: &wire::MtaResult) -> Result<Bytes, ProtocolError>;

    /// # Errors
    ///
    /// Will return `Err` if `frame` is not a valid `MTAResult`.
    fn decode_mta_result(&self, frame: &[u8]) -> Result<wire::MtaResult, ProtocolError>;
}

/// [`MessageSchema`] backed by `prost`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProstSchema;

impl ProstSchema {
    fn decode<M: Message + Default>(frame: &[u8], name: &'static str) -> Result<M, ProtocolError> {
        M::decode(frame).map_err(|error| ProtocolError::Schema {
            message: name,
            reason: error.to_string(),
        })
    }
}

impl MessageSchema for ProstSchema {
    fn encode_correlation_delta(
        &self,
        message: &wire::CorrelationDelta,
    ) -> Result<Bytes, ProtocolError> {
        Ok(message.encode_to_vec().into())
    }

    fn decode_bob_setup(&self, frame: &[u8]) -> Result<wire::BobSetup, ProtocolError> {
        ProstSchema::decode(frame, "BobSetup")
    }

    fn encode_alice_messages(
        &self,
        message: &wire::AliceMessages,
    ) -> Result<Bytes, ProtocolError> {
        Ok(message.encode_to_vec().into())
    }

    fn decode_bob_messages(&self, frame: &[u8]) -> Result<wire::BobMessages, ProtocolError> {
        ProstSchema::decode(frame, "BobMessages")
    }

    fn encode_mta_result(&self, message: &wire::MtaResult) -> Result<Bytes, ProtocolError> {
        Ok(message.encode_to_vec().into())
    }

    fn decode_mta_result(&self, frame: &[u8]) -> Result<wire::MtaResult, ProtocolError> {
        ProstSchema::decode(frame, "MTAResult")
    }
}

// The schema has no correlation field in BobSetup, so the internal value is 0.
impl From<&wire::BobSetup> for messages::BobSetup {
    fn from(message: &wire::BobSetup) -> Self {
        messages::BobSetup {
            success: message.success,
            correlation_delta: 0,
            points_b: message.ot_messages.concat(),
        }
    }
}

impl From<&wire::BobMessages> for messages::BobMessages {
    fn from(message: &wire::BobMessages) -> Self {
        messages::BobMessages {
            success: message.success,
            masked_share: message.masked_share,
        }
    }
}

impl From<messages::MtaResult> for wire::MtaResult {
    fn from(result: messages::MtaResult) -> Self {
        wire::MtaResult {
            success: result.success,
            additive_share: result.additive_share,
            error_message: if result.success {
                String::new()
            } else {
                "MTA protocol failed".to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_delta_encoding() {
        let frame = ProstSchema
            .encode_correlation_delta(&wire::CorrelationDelta { delta: 300 })
            .unwrap();

        // Field 1, varint: 300 = 0xAC 0x02.
        assert_eq!(frame.as_ref(), &[0x08, 0xAC, 0x02]);
    }

    #[test]
    fn test_bob_setup_decoding() {
        let message = wire::BobSetup {
            success: true,
            ot_messages: vec![vec![4u8; 65], vec![5u8; 65]],
            public_key: vec![2u8; 33],
            num_ot_instances: 2,
        };

        let decoded = ProstSchema
            .decode_bob_setup(&message.encode_to_vec())
            .unwrap();
        assert_eq!(decoded, message);

        let internal = messages::BobSetup::from(&decoded);
        assert!(internal.success);
        assert_eq!(internal.points_b.len(), 130);
        assert_eq!(internal.points_b[64], 4);
        assert_eq!(internal.points_b[65], 5);
    }

    #[test]
    fn test_empty_frame_decodes_to_defaults() {
        // Proto3 omits default values, so an empty frame is a valid message.
        let decoded = ProstSchema.decode_bob_messages(&[]).unwrap();
        assert!(!decoded.success);
        assert_eq!(decoded.masked_share, 0);
    }

    #[test]
    fn test_invalid_frame_is_a_schema_error() {
        // Field 2 announces 10 bytes but only 1 follows.
        let result = ProstSchema.decode_bob_setup(&[0x12, 0x0A, 0x00]);
        assert!(matches!(
            result,
            Err(ProtocolError::Schema {
                message: "BobSetup",
                ..
            })
        ));

        assert!(ProstSchema.decode_bob_messages(&[0xFF]).is_err());
    }

    #[test]
    fn test_alice_messages_optional_payload() {
        let without_payload = wire::AliceMessages {
            masked_share: 1,
            ot_choices: vec![true, false],
            encrypted_shares: vec![vec![0u8; 32]],
            ot_payload: Vec::new(),
        };
        let with_payload = wire::AliceMessages {
            ot_payload: vec![1, 2, 3],
            ..without_payload.clone()
        };

        let short = ProstSchema.encode_alice_messages(&without_payload).unwrap();
        let long = ProstSchema.encode_alice_messages(&with_payload).unwrap();

        // Field 4 is only on the wire when it has content.
        assert_eq!(long.len(), short.len() + 5);
        assert_eq!(&long[..short.len()], short.as_ref());
    }

    #[test]
    fn test_mta_result_conversion() {
        let result = messages::MtaResult {
            success: true,
            additive_share: 77,
        };
        let frame = ProstSchema.encode_mta_result(&result.into()).unwrap();
        let decoded = ProstSchema.decode_mta_result(&frame).unwrap();
        assert!(decoded.success);
        assert_eq!(decoded.additive_share, 77);
        assert!(decoded.error_message.is_empty());

        let failed = wire::MtaResult::from(messages::MtaResult::failure());
        assert!(!failed.success);
        assert!(!failed.error_message.is_empty());
    }
}
