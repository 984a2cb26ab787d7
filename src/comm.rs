//! Point-to-point messaging substrate between tree neighbours.
//!
//! One unbounded channel exists per directed tree edge and tag, so messages
//! between a fixed `(sender, receiver, tag)` triple arrive in the order they
//! were sent. Sends never block. Receives are non-blocking tests except for
//! the startup barrier and the finalize handshake, which are the protocol's
//! only synchronous steps.
//!
//! Bursty senders are absorbed by [`Endpoint::drain_latest`]: the receiver
//! empties the inbound queue and keeps only the newest payload, so a fast
//! child can never stall its parent.

use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::debug;

use crate::error::{Result, TesoroError};
use crate::tree::Topology;

/// Child is running its search phase.
pub const STATUS_RUNNING: i32 = 1;
/// Child exhausted its budgets and entered residual drain.
pub const STATUS_RESIDUAL: i32 = -1;
/// Child finished residual drain and will only handshake from now on.
pub const STATUS_TERMINATED: i32 = -2;

/// Message classes exchanged between neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Leaf-to-root cascade releasing the search (synchronous).
    Startup,
    /// Candidate publications flowing up the tree.
    ChildToParent,
    /// Best-list gifts flowing down the tree.
    ParentToChild,
    /// Tree-ordered termination handshake (synchronous).
    Finalize,
}

const ALL_TAGS: [Tag; 4] = [
    Tag::Startup,
    Tag::ChildToParent,
    Tag::ParentToChild,
    Tag::Finalize,
];

/// A candidate solution on the wire: flattened positions, the fitness tuple
/// and the sender's status.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// `n_dims * position_width` values, dimension-major
    pub positions: Vec<f64>,
    /// `fitness_width` values
    pub fitness: Vec<f64>,
    /// Sender status: [`STATUS_RUNNING`], [`STATUS_RESIDUAL`] or
    /// [`STATUS_TERMINATED`] child-to-parent; `0` on gifts
    pub status: i32,
}

/// One message on a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Bare integer, used by `Startup` and `Finalize`
    Signal(i32),
    /// A candidate publication or gift
    Candidate(Candidate),
}

/// A node's view of the substrate: one sender/receiver per neighbour and tag.
pub struct Endpoint {
    node_id: usize,
    senders: HashMap<(usize, Tag), Sender<Message>>,
    receivers: HashMap<(usize, Tag), Receiver<Message>>,
}

impl Endpoint {
    /// The node this endpoint belongs to.
    #[must_use]
    pub fn node_id(&self) -> usize {
        self.node_id
    }

    /// Post a message to `to`. Never blocks.
    pub fn send(&self, to: usize, tag: Tag, message: Message) -> Result<()> {
        let sender = self
            .senders
            .get(&(to, tag))
            .ok_or(TesoroError::UnknownNode { id: to })?;
        sender
            .send(message)
            .map_err(|_| TesoroError::ChannelClosed { peer: to })
    }

    /// Non-blocking receive from `from`. `Ok(None)` when nothing is pending.
    pub fn try_recv(&self, from: usize, tag: Tag) -> Result<Option<Message>> {
        let receiver = self
            .receivers
            .get(&(from, tag))
            .ok_or(TesoroError::UnknownNode { id: from })?;
        match receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TesoroError::ChannelClosed { peer: from }),
        }
    }

    /// Blocking receive from `from`. Startup barrier and finalize handshake
    /// only.
    pub fn recv(&self, from: usize, tag: Tag) -> Result<Message> {
        let receiver = self
            .receivers
            .get(&(from, tag))
            .ok_or(TesoroError::UnknownNode { id: from })?;
        receiver
            .recv()
            .map_err(|_| TesoroError::ChannelClosed { peer: from })
    }

    /// Empty the inbound queue from `from`, keeping only the newest pending
    /// message. The discarded messages are intentional: coalescing keeps a
    /// quiescent receiver from lagging behind a bursty sender.
    pub fn drain_latest(&self, from: usize, tag: Tag) -> Result<Option<Message>> {
        let mut latest = None;
        let mut discarded = 0usize;
        while let Some(message) = self.try_recv(from, tag)? {
            if latest.is_some() {
                discarded += 1;
            }
            latest = Some(message);
        }
        if discarded > 0 {
            debug!(
                node = self.node_id,
                peer = from,
                discarded,
                "coalesced inbound queue"
            );
        }
        Ok(latest)
    }
}

/// Builds the channel mesh for a topology and hands out per-node endpoints.
pub struct Mesh;

impl Mesh {
    /// Create one endpoint per node of `tree`, wired along its edges for
    /// every tag.
    pub fn for_topology(tree: &Topology) -> Result<HashMap<usize, Endpoint>> {
        let mut endpoints: HashMap<usize, Endpoint> = tree
            .node_ids()
            .iter()
            .map(|&id| {
                (
                    id,
                    Endpoint {
                        node_id: id,
                        senders: HashMap::new(),
                        receivers: HashMap::new(),
                    },
                )
            })
            .collect();

        for &id in tree.node_ids() {
            let Some(parent) = tree.parent_of(id)? else {
                continue;
            };
            for tag in ALL_TAGS {
                // child -> parent
                let (tx, rx) = unbounded();
                if let Some(child_end) = endpoints.get_mut(&id) {
                    child_end.senders.insert((parent, tag), tx);
                }
                if let Some(parent_end) = endpoints.get_mut(&parent) {
                    parent_end.receivers.insert((id, tag), rx);
                }
                // parent -> child
                let (tx, rx) = unbounded();
                if let Some(parent_end) = endpoints.get_mut(&parent) {
                    parent_end.senders.insert((id, tag), tx);
                }
                if let Some(child_end) = endpoints.get_mut(&id) {
                    child_end.receivers.insert((parent, tag), rx);
                }
            }
        }
        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Endpoint, Endpoint) {
        let mut tree = Topology::new();
        tree.add_root(0).unwrap();
        tree.add_child(1, 0).unwrap();
        tree.lock().unwrap();
        let mut endpoints = Mesh::for_topology(&tree).unwrap();
        let parent = endpoints.remove(&0).unwrap();
        let child = endpoints.remove(&1).unwrap();
        (parent, child)
    }

    fn candidate(status: i32, marker: f64) -> Message {
        Message::Candidate(Candidate {
            positions: vec![marker, marker],
            fitness: vec![marker],
            status,
        })
    }

    #[test]
    fn test_messages_arrive_in_send_order() {
        let (parent, child) = pair();
        child
            .send(0, Tag::ChildToParent, Message::Signal(1))
            .unwrap();
        child
            .send(0, Tag::ChildToParent, Message::Signal(2))
            .unwrap();
        assert_eq!(
            parent.try_recv(1, Tag::ChildToParent).unwrap(),
            Some(Message::Signal(1))
        );
        assert_eq!(
            parent.try_recv(1, Tag::ChildToParent).unwrap(),
            Some(Message::Signal(2))
        );
        assert_eq!(parent.try_recv(1, Tag::ChildToParent).unwrap(), None);
    }

    #[test]
    fn test_drain_latest_keeps_only_newest() {
        let (parent, child) = pair();
        for i in 0..3 {
            child
                .send(0, Tag::ChildToParent, candidate(1, f64::from(i)))
                .unwrap();
        }
        let latest = parent.drain_latest(1, Tag::ChildToParent).unwrap();
        assert_eq!(latest, Some(candidate(1, 2.0)));
        assert_eq!(parent.drain_latest(1, Tag::ChildToParent).unwrap(), None);
    }

    #[test]
    fn test_tags_do_not_cross() {
        let (parent, child) = pair();
        child.send(0, Tag::Startup, Message::Signal(1)).unwrap();
        assert_eq!(parent.try_recv(1, Tag::ChildToParent).unwrap(), None);
        assert_eq!(
            parent.try_recv(1, Tag::Startup).unwrap(),
            Some(Message::Signal(1))
        );
    }

    #[test]
    fn test_both_directions_are_independent() {
        let (parent, child) = pair();
        parent
            .send(1, Tag::ParentToChild, candidate(0, 7.0))
            .unwrap();
        child
            .send(0, Tag::ChildToParent, candidate(1, 8.0))
            .unwrap();
        assert_eq!(
            child.drain_latest(0, Tag::ParentToChild).unwrap(),
            Some(candidate(0, 7.0))
        );
        assert_eq!(
            parent.drain_latest(1, Tag::ChildToParent).unwrap(),
            Some(candidate(1, 8.0))
        );
    }

    #[test]
    fn test_unknown_peer_is_rejected() {
        let (parent, _child) = pair();
        assert!(matches!(
            parent.send(9, Tag::Finalize, Message::Signal(1)),
            Err(TesoroError::UnknownNode { id: 9 })
        ));
        assert!(parent.try_recv(9, Tag::Finalize).is_err());
    }
}
