use crate::session::PeerTransport;
use huddle_core::IceCandidate;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Proof that a session's remote description is in place.
/// Only `PeerSession` hands these out, right after applying one.
#[derive(Debug, Clone, Copy)]
pub struct RemoteDescriptionApplied(());

impl RemoteDescriptionApplied {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// Candidates that arrived before the remote description, in arrival order.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
}

impl CandidateQueue {
    pub fn enqueue(&mut self, candidate: IceCandidate) {
        self.pending.push_back(candidate);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Applies and removes every queued candidate, oldest first.
    /// A candidate the transport rejects is logged and skipped.
    /// Returns how many were accepted.
    pub async fn flush(
        &mut self,
        transport: &dyn PeerTransport,
        _applied: RemoteDescriptionApplied,
    ) -> usize {
        let mut accepted = 0;

        while let Some(candidate) = self.pending.pop_front() {
            match transport.add_ice_candidate(candidate.clone()).await {
                Ok(()) => accepted += 1,
                Err(e) => warn!("Skipping ICE candidate {:?}: {:#}", candidate.candidate, e),
            }
        }

        if accepted > 0 {
            debug!("Flushed {} queued ICE candidates", accepted);
        }
        accepted
    }
}
