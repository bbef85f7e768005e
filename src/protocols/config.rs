use serde::{Deserialize, Serialize};

use crate::protocols::framing::DEFAULT_MAX_FRAME_LENGTH;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;

/// Where to reach the peer and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Largest frame accepted or sent, in bytes (prefix excluded).
    pub max_frame_length: usize,
    /// Attach the binary `AliceMessages` layout to the response frame,
    /// for peers that complete the OT math on their side.
    pub attach_ot_payload: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            attach_ot_payload: false,
        }
    }
}

impl ClientConfig {
    /// `host:port`, as accepted by `TcpStream::connect`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "localhost:8080");
        assert_eq!(config.max_frame_length, 1 << 20);
        assert!(!config.attach_ot_payload);
    }

    #[test]
    fn test_deserialize() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"host":"10.0.0.2","port":9000,"max_frame_length":4096,"attach_ot_payload":true}"#,
        )
        .unwrap();
        assert_eq!(config.address(), "10.0.0.2:9000");
        assert!(config.attach_ot_payload);
    }
}
