/// This file implements the client that runs Alice's side of the protocol
/// against a remote peer.
///
/// The flow is
///
///   Alice -> peer: `CorrelationDelta`
///   peer -> Alice: `BobSetup`
///   Alice -> peer: `AliceMessages`
///   peer -> Alice: `BobMessages`
///
/// after which Alice holds her additive share. [`StateMachine`] has the
/// protocol logic without any I/O, and [`AliceClient`] drives it over a
/// framed byte stream.
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::protocols::config::ClientConfig;
use crate::protocols::framing::FrameCodec;
use crate::protocols::messages::{BobMessages, BobSetup};
use crate::protocols::mta::MtaAlice;
use crate::protocols::schema::{wire, MessageSchema, ProstSchema};
use crate::protocols::ProtocolError;
use crate::utilities::rng;
use crate::{BIT_LENGTH, KEY_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientState {
    Connecting,
    SendingCorrelationDelta,
    WaitingForPeerSetup,
    SendingResponseMessages,
    WaitingForPeerMessages,
    Complete,
}

/// Summary of a run, printed by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolStats {
    pub state: ClientState,
    pub x_share: u32,
    pub additive_share: u32,
}

// STATE MACHINE

/// Protocol logic of a single run, independent of the transport.
///
/// Outgoing frames are returned to the caller, who must call
/// [`StateMachine::frame_sent`] once they are written.
pub struct StateMachine<S = ProstSchema> {
    schema: S,
    attach_ot_payload: bool,
    max_instances: usize,
    state: ClientState,
    x_share: u32,
    additive_share: u32,
    mta: Option<MtaAlice>,
}

impl StateMachine<ProstSchema> {
    #[must_use]
    pub fn new(config: &ClientConfig) -> StateMachine<ProstSchema> {
        StateMachine::with_schema(ProstSchema, config)
    }
}

impl<S: MessageSchema> StateMachine<S> {
    /// Every OT instance adds at least `KEY_SIZE` bytes to the response, so
    /// the peer may ask for at most `max_frame_length / KEY_SIZE` of them.
    #[must_use]
    pub fn with_schema(schema: S, config: &ClientConfig) -> StateMachine<S> {
        StateMachine {
            schema,
            attach_ot_payload: config.attach_ot_payload,
            max_instances: config.max_frame_length / KEY_SIZE,
            state: ClientState::Connecting,
            x_share: 0,
            additive_share: 0,
            mta: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Alice's additive share. It is 0 until the run is complete.
    #[must_use]
    pub fn additive_share(&self) -> u32 {
        self.additive_share
    }

    #[must_use]
    pub fn stats(&self) -> ProtocolStats {
        ProtocolStats {
            state: self.state,
            x_share: self.x_share,
            additive_share: self.additive_share,
        }
    }

    /// Starts the run and returns the `CorrelationDelta` frame.
    ///
    /// # Errors
    ///
    /// Will return `Err` if a run was already started or if the frame
    /// cannot be encoded.
    pub fn connect(&mut self, x_share: u32) -> Result<Bytes, ProtocolError> {
        if self.state != ClientState::Connecting {
            return Err(ProtocolError::AlreadyStarted);
        }

        let (mta, _) = MtaAlice::initialize(x_share);
        self.x_share = x_share;
        self.mta = Some(mta);

        let delta = rng::random_small_share();
        let frame = self
            .schema
            .encode_correlation_delta(&wire::CorrelationDelta { delta })?;

        info!(delta, "sending correlation delta");
        self.transition(ClientState::SendingCorrelationDelta);

        Ok(frame)
    }

    /// Records that the pending outgoing frame has been written.
    pub fn frame_sent(&mut self) {
        match self.state {
            ClientState::SendingCorrelationDelta => {
                self.transition(ClientState::WaitingForPeerSetup);
            }
            ClientState::SendingResponseMessages => {
                self.transition(ClientState::WaitingForPeerMessages);
            }
            _ => {}
        }
    }

    /// Processes one incoming frame and returns the reply, if any.
    ///
    /// Frames that arrive while no message is expected are discarded.
    /// On error the state is left unchanged.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the frame does not decode, if the peer reports
    /// a failure or if Alice cannot compute her messages.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Option<Bytes>, ProtocolError> {
        match self.state {
            ClientState::WaitingForPeerSetup => self.on_peer_setup(frame).map(Some),
            ClientState::WaitingForPeerMessages => {
                self.on_peer_messages(frame)?;
                Ok(None)
            }
            state => {
                warn!(?state, length = frame.len(), "discarding unexpected frame");
                Ok(None)
            }
        }
    }

    fn on_peer_setup(&mut self, frame: &[u8]) -> Result<Bytes, ProtocolError> {
        let message = self.schema.decode_bob_setup(frame)?;
        if !message.success {
            return Err(ProtocolError::PeerReportedFailure("BobSetup"));
        }

        let instances = message.num_ot_instances as usize;
        if instances > self.max_instances {
            return Err(ProtocolError::MalformedFrame(format!(
                "the peer asks for {instances} OT instances, at most {} fit in a frame",
                self.max_instances
            )));
        }

        info!(instances, "received peer setup");

        let mta = self.mta.as_mut().ok_or(ProtocolError::ResponseFailed)?;
        let response = mta.prepare_response(&BobSetup::from(&message));
        if !response.success {
            return Err(ProtocolError::ResponseFailed);
        }

        let reply = wire::AliceMessages {
            masked_share: response.masked_share,
            ot_choices: ot_choices(self.x_share, instances),
            encrypted_shares: filler_shares(self.x_share, instances),
            ot_payload: if self.attach_ot_payload {
                response.to_bytes()
            } else {
                Vec::new()
            },
        };
        let frame = self.schema.encode_alice_messages(&reply)?;

        self.transition(ClientState::SendingResponseMessages);
        Ok(frame)
    }

    fn on_peer_messages(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        let message = self.schema.decode_bob_messages(frame)?;
        if !message.success {
            return Err(ProtocolError::PeerReportedFailure("BobMessages"));
        }

        let mta = self.mta.take().ok_or(ProtocolError::FinalizeFailed)?;
        let result = mta.finalize(&BobMessages::from(&message));
        if !result.success {
            return Err(ProtocolError::FinalizeFailed);
        }

        self.additive_share = result.additive_share;
        self.transition(ClientState::Complete);
        Ok(())
    }

    fn transition(&mut self, next: ClientState) {
        info!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}

// Bit (i mod 32) of x for each instance.
fn ot_choices(x_share: u32, instances: usize) -> Vec<bool> {
    (0..instances)
        .map(|i| (x_share >> (i % BIT_LENGTH)) & 1 == 1)
        .collect()
}

// Fixed filler the peer expects in `encrypted_shares`: byte j of entry i
// is (x + i + j) mod 256.
fn filler_shares(x_share: u32, instances: usize) -> Vec<Vec<u8>> {
    (0..instances)
        .map(|i| {
            (0..KEY_SIZE)
                .map(|j| x_share.wrapping_add(i as u32).wrapping_add(j as u32) as u8)
                .collect()
        })
        .collect()
}

// DRIVER

/// Runs a [`StateMachine`] over a framed stream.
pub struct AliceClient<T, S = ProstSchema> {
    framed: Framed<T, FrameCodec>,
    machine: StateMachine<S>,
}

impl AliceClient<TcpStream> {
    /// Opens a TCP connection to the peer.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the connection cannot be established.
    pub async fn connect(config: &ClientConfig) -> Result<AliceClient<TcpStream>, ProtocolError> {
        let address = config.address();
        let stream = TcpStream::connect(&address).await?;
        info!(%address, "connected to the peer");

        Ok(AliceClient::new(stream, config))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> AliceClient<T> {
    #[must_use]
    pub fn new(io: T, config: &ClientConfig) -> AliceClient<T> {
        AliceClient::with_schema(io, config, ProstSchema)
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin, S: MessageSchema> AliceClient<T, S> {
    #[must_use]
    pub fn with_schema(io: T, config: &ClientConfig, schema: S) -> AliceClient<T, S> {
        AliceClient {
            framed: Framed::new(io, FrameCodec::new(config.max_frame_length)),
            machine: StateMachine::with_schema(schema, config),
        }
    }

    /// Runs the protocol with Alice's share until she holds her additive share.
    ///
    /// # Errors
    ///
    /// Will return `Err` on any protocol failure, on transport errors and
    /// if the peer closes the stream before the run is complete.
    pub async fn start_run(&mut self, x_share: u32) -> Result<(), ProtocolError> {
        self.run(x_share).instrument(info_span!("mta_run")).await
    }

    async fn run(&mut self, x_share: u32) -> Result<(), ProtocolError> {
        let frame = self.machine.connect(x_share)?;
        self.send(frame).await?;

        while self.machine.state() != ClientState::Complete {
            let frame = match self.framed.next().await {
                Some(frame) => frame?,
                None => {
                    warn!(state = ?self.machine.state(), "the peer closed the connection");
                    return Err(ProtocolError::PrematureDisconnect);
                }
            };
            debug!(length = frame.len(), "frame received");

            if let Some(reply) = self.machine.handle_frame(&frame)? {
                self.send(reply).await?;
            }
        }

        info!("MTA protocol completed");
        Ok(())
    }

    async fn send(&mut self, frame: Bytes) -> Result<(), ProtocolError> {
        let length = frame.len();
        self.framed.send(frame).await?;
        debug!(length, "frame sent");

        self.machine.frame_sent();
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> ClientState {
        self.machine.state()
    }

    #[must_use]
    pub fn additive_share(&self) -> u32 {
        self.machine.additive_share()
    }

    #[must_use]
    pub fn stats(&self) -> ProtocolStats {
        self.machine.stats()
    }

    /// Flushes pending frames and shuts the stream down.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the stream cannot be flushed or closed.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        SinkExt::<Bytes>::close(&mut self.framed).await
    }
}
