//! Nullable quorum transport: scripted peer replies, recorded solicitations.

use async_trait::async_trait;
use lhraft_consensus::{Ack, Phase, QuorumTransport, Transaction, TransportError};
use lhraft_types::{NodeId, ZoneId};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// How a scripted peer answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject,
    /// Fail with [`TransportError::Unreachable`].
    Unreachable,
    /// Never answer.
    Silent,
    /// Answer with the given ack after a delay.
    After(Duration, Ack),
}

/// One recorded call to [`QuorumTransport::solicit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solicitation {
    pub peer: NodeId,
    pub phase: Phase,
    pub zone: ZoneId,
}

/// A test transport whose peers answer from a script.
///
/// Peers without an explicit reply use the default reply.
#[derive(Debug)]
pub struct NullTransport {
    default: Reply,
    replies: Mutex<HashMap<NodeId, Reply>>,
    calls: Mutex<Vec<Solicitation>>,
}

impl NullTransport {
    pub fn new(default: Reply) -> Self {
        Self {
            default,
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(Reply::Accept)
    }

    /// Script `peer`'s reply for every later solicitation.
    pub fn reply(&self, peer: impl Into<NodeId>, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer.into(), reply);
        self
    }

    /// Every solicitation so far, in call order.
    pub fn calls(&self) -> Vec<Solicitation> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Peers solicited during `phase`, in call order.
    pub fn peers_in(&self, phase: Phase) -> Vec<NodeId> {
        self.calls()
            .into_iter()
            .filter(|c| c.phase == phase)
            .map(|c| c.peer)
            .collect()
    }

    /// Forget recorded calls; scripted replies stay.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn reply_for(&self, peer: &NodeId) -> Reply {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(peer)
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::accepting()
    }
}

#[async_trait]
impl QuorumTransport for NullTransport {
    async fn solicit(&self, peer: &NodeId, phase: Phase, tx: &Transaction) -> Result<Ack, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Solicitation {
                peer: peer.clone(),
                phase,
                zone: tx.zone.clone(),
            });

        match self.reply_for(peer) {
            Reply::Accept => Ok(Ack::Accept),
            Reply::Reject => Ok(Ack::Reject),
            Reply::Unreachable => Err(TransportError::Unreachable(peer.clone())),
            Reply::Silent => std::future::pending().await,
            Reply::After(delay, ack) => {
                tokio::time::sleep(delay).await;
                Ok(ack)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_and_recording() {
        let transport = NullTransport::accepting();
        transport.reply("b", Reply::Reject).reply("c", Reply::Unreachable);
        let tx = Transaction::new(ZoneId::from("Z1"), b"x".to_vec());

        let a = transport.solicit(&NodeId::from("a"), Phase::Local, &tx).await;
        let b = transport.solicit(&NodeId::from("b"), Phase::Local, &tx).await;
        let c = transport.solicit(&NodeId::from("c"), Phase::Global, &tx).await;

        assert_eq!(a, Ok(Ack::Accept));
        assert_eq!(b, Ok(Ack::Reject));
        assert_eq!(c, Err(TransportError::Unreachable(NodeId::from("c"))));
        assert_eq!(transport.peers_in(Phase::Local), vec![NodeId::from("a"), NodeId::from("b")]);
        assert_eq!(transport.calls().len(), 3);

        transport.clear_calls();
        assert!(transport.calls().is_empty());
    }
}
