/// This file implements Alice's side of the multiplication-to-addition protocol.
///
/// Alice holds `x` and the peer holds `y`. Alice acts as the sender of a
/// correlated OT batch with correlation `x`, and the peer selects with the
/// bits of `y`. At the end Alice holds `U` and the peer holds `V` with
///
///   `V - U = x * y (mod 2^32)`.
///
/// Alice also sends `x * alpha` for a fresh random `alpha`. The value is part
/// of the message format but no party uses it to compute its share.
use tracing::warn;

use crate::protocols::messages::{AliceMessages, BobMessages, BobSetup, CotSetup, MtaResult};
use crate::utilities::ot::correlated::COTSender;
use crate::utilities::rng;

/// State kept by Alice during one run.
pub struct MtaAlice {
    cot: COTSender,
    alpha: u32,
    responded: bool,
}

impl MtaAlice {
    /// Starts a run with Alice's multiplicative share.
    ///
    /// A new COT batch is sampled every time, so the returned points are
    /// never reused across runs.
    #[must_use]
    pub fn initialize(x_share: u32) -> (MtaAlice, CotSetup) {
        let cot = COTSender::init(x_share);
        let setup = CotSetup {
            success: true,
            correlation_x: x_share,
            points_a: cot.build_outgoing_points(),
        };

        let mta = MtaAlice {
            cot,
            alpha: 0,
            responded: false,
        };

        (mta, setup)
    }

    /// Answers the peer's setup with the blinded share and the OT messages.
    ///
    /// A batch answers exactly one setup. Any failure (peer flag not set,
    /// malformed points, second call) gives [`AliceMessages::failure`].
    pub fn prepare_response(&mut self, peer_setup: &BobSetup) -> AliceMessages {
        if self.responded {
            warn!("the batch has already answered a peer setup");
            return AliceMessages::failure();
        }

        if !peer_setup.success {
            warn!("the peer setup is marked as failed");
            return AliceMessages::failure();
        }

        self.alpha = rng::random_u32();
        let masked_share = self.cot.input().wrapping_mul(self.alpha);

        let cot_messages = self.cot.process_peer_setup(&peer_setup.points_b);
        if !cot_messages.success {
            return AliceMessages::failure();
        }

        self.responded = true;

        AliceMessages {
            success: true,
            masked_share,
            points_a: cot_messages.points_a,
            encrypted_m0: cot_messages.encrypted_m0,
            encrypted_m1: cot_messages.encrypted_m1,
        }
    }

    /// Ends the run and returns Alice's additive share `U`.
    ///
    /// The peer's masked share is not an input of the computation.
    #[must_use]
    pub fn finalize(self, peer_messages: &BobMessages) -> MtaResult {
        if !peer_messages.success {
            warn!("the peer messages are marked as failed");
            return MtaResult::failure();
        }

        if !self.responded {
            warn!("cannot finalize a run that never answered the peer setup");
            return MtaResult::failure();
        }

        MtaResult {
            success: true,
            additive_share: self.cot.additive_share(),
        }
    }

    /// Runs the whole protocol in one call, for peers that hand over both
    /// of their messages at once.
    ///
    /// If the response fails, the result fails too.
    #[must_use]
    pub fn run_full(
        x_share: u32,
        peer_setup: &BobSetup,
        peer_messages: &BobMessages,
    ) -> (AliceMessages, MtaResult) {
        let (mut mta, _) = MtaAlice::initialize(x_share);

        let response = mta.prepare_response(peer_setup);
        if !response.success {
            return (response, MtaResult::failure());
        }

        let result = mta.finalize(peer_messages);
        (response, result)
    }

    /// Computes `received + mask * own (mod 2^32)`.
    ///
    /// This is the unblinding step of the multiplicative variant of the
    /// protocol. The additive run above does not call it.
    #[must_use]
    pub fn compute_final_share(received: u32, mask: u32, own: u32) -> u32 {
        received.wrapping_add(mask.wrapping_mul(own))
    }

    /// The blinding factor drawn by [`MtaAlice::prepare_response`], or 0 before.
    #[must_use]
    pub fn alpha(&self) -> u32 {
        self.alpha
    }
}
