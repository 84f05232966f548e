//! Friendship state machine.
//!
//! Each ordered pair of users is in one of three states:
//!
//! ```text
//! NONE --send_request--> REQUEST_SENT --accept_request--> FRIENDS
//!                             |                              |
//!                      reject_request                  remove_friend
//!                             v                              v
//!                           NONE                           NONE
//! ```
//!
//! A pending request is a directed `FRIEND_REQUEST` edge from requester to
//! target. A friendship is a single `FRIEND` edge, written from the smaller to
//! the larger user id. Reads accept an edge in either direction.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

use social_graph_repository::{EdgeMerge, EdgePattern, EdgeType, GraphStore, NodeRef};
use social_graph_shared::{EventKind, FriendshipStatus, UserId};

use crate::errors::EngineError;
use crate::events::{emit, EventPublisher};
use crate::lookup::{require_present, require_user};

/// The orientation new `FRIEND` edges are written in.
fn friend_endpoints(a: &UserId, b: &UserId) -> (NodeRef, NodeRef) {
    let (low, high) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
    (NodeRef::user(low), NodeRef::user(high))
}

fn friend_edge(from: &UserId, to: &UserId) -> EdgePattern {
    EdgePattern::exact(NodeRef::user(from), EdgeType::Friend, NodeRef::user(to))
}

fn request_edge(from: &UserId, to: &UserId) -> EdgePattern {
    EdgePattern::exact(NodeRef::user(from), EdgeType::FriendRequest, NodeRef::user(to))
}

/// Owns friend requests and friendships.
#[derive(Clone)]
pub struct RelationshipManager {
    store: Arc<dyn GraphStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl RelationshipManager {
    pub fn new(store: Arc<dyn GraphStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    fn validate_pair(&self, a: &UserId, b: &UserId) -> Result<(), EngineError> {
        require_present("user id", a.as_str())?;
        require_present("user id", b.as_str())?;
        Ok(())
    }

    async fn require_pair(&self, a: &UserId, b: &UserId) -> Result<(), EngineError> {
        self.validate_pair(a, b)?;
        require_user(self.store.as_ref(), a).await?;
        require_user(self.store.as_ref(), b).await?;
        Ok(())
    }

    async fn edge_exists(&self, pattern: &EdgePattern) -> Result<bool, EngineError> {
        Ok(self.store.count_edges(pattern).await? > 0)
    }

    /// Whether a confirmed friendship exists between `a` and `b`.
    ///
    /// Performs no existence checks; unknown users are simply not friends.
    pub async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, EngineError> {
        if a == b {
            return Ok(false);
        }
        let forward = self.edge_exists(&friend_edge(a, b)).await?;
        Ok(forward || self.edge_exists(&friend_edge(b, a)).await?)
    }

    /// Friendship status between `viewer` and `target`. Symmetric.
    ///
    /// # Returns
    ///
    /// * `Ok(FriendshipStatus::Friends)` - A confirmed friendship exists
    /// * `Ok(FriendshipStatus::RequestSent)` - A request is pending in either direction
    /// * `Ok(FriendshipStatus::None)` - Neither
    /// * `Err(EngineError::NotFound)` - Either user does not exist
    #[instrument(skip(self))]
    pub async fn status(
        &self,
        viewer: &UserId,
        target: &UserId,
    ) -> Result<FriendshipStatus, EngineError> {
        self.require_pair(viewer, target).await?;
        self.status_unchecked(viewer, target).await
    }

    async fn status_unchecked(
        &self,
        viewer: &UserId,
        target: &UserId,
    ) -> Result<FriendshipStatus, EngineError> {
        if viewer == target {
            return Ok(FriendshipStatus::None);
        }
        if self.are_friends(viewer, target).await? {
            return Ok(FriendshipStatus::Friends);
        }
        if self.edge_exists(&request_edge(viewer, target)).await?
            || self.edge_exists(&request_edge(target, viewer)).await?
        {
            return Ok(FriendshipStatus::RequestSent);
        }
        Ok(FriendshipStatus::None)
    }

    /// Send a friend request from `requester` to `target`.
    ///
    /// Fails with `Conflict` when the users are already friends or a request
    /// is already pending in either direction.
    #[instrument(skip(self))]
    pub async fn send_request(
        &self,
        requester: &UserId,
        target: &UserId,
    ) -> Result<FriendshipStatus, EngineError> {
        self.validate_pair(requester, target)?;
        if requester == target {
            return Err(EngineError::validation("cannot send a friend request to yourself"));
        }
        self.require_pair(requester, target).await?;

        if self.are_friends(requester, target).await? {
            return Err(EngineError::conflict(format!(
                "{requester} and {target} are already friends"
            )));
        }
        if self.edge_exists(&request_edge(requester, target)).await? {
            return Err(EngineError::conflict(format!(
                "friend request from {requester} to {target} already sent"
            )));
        }
        if self.edge_exists(&request_edge(target, requester)).await? {
            return Err(EngineError::conflict(format!(
                "{target} already sent a friend request to {requester}"
            )));
        }

        match self
            .store
            .merge_edge(
                &NodeRef::user(requester),
                EdgeType::FriendRequest,
                &NodeRef::user(target),
            )
            .await?
        {
            EdgeMerge::Created => {}
            EdgeMerge::Existed => {
                return Err(EngineError::conflict(format!(
                    "friend request from {requester} to {target} already sent"
                )))
            }
            EdgeMerge::MissingEndpoint => {
                return Err(EngineError::not_found("User", target.as_str()))
            }
        }

        info!(requester = %requester, target = %target, "Friend request sent");
        emit(
            self.publisher.as_ref(),
            EventKind::FriendRequested {
                actor_id: requester.clone(),
                target_id: target.clone(),
            },
        )
        .await;

        Ok(FriendshipStatus::RequestSent)
    }

    /// Accept the pending request `requester -> accepter`.
    ///
    /// The `FRIEND` edge is written before the request is removed, so an
    /// interruption between the two steps leaves the pair as friends with a
    /// stale request that the next accept cleans up.
    #[instrument(skip(self))]
    pub async fn accept_request(
        &self,
        accepter: &UserId,
        requester: &UserId,
    ) -> Result<FriendshipStatus, EngineError> {
        self.require_pair(accepter, requester).await?;

        let pending = request_edge(requester, accepter);
        if !self.edge_exists(&pending).await? {
            return Err(EngineError::not_found(
                "FriendRequest",
                format!("{requester}->{accepter}"),
            ));
        }

        let (low, high) = friend_endpoints(accepter, requester);
        let written = self.store.merge_edge(&low, EdgeType::Friend, &high).await?;
        if !written.is_linked() {
            return Err(EngineError::not_found("User", requester.as_str()));
        }
        self.store.delete_edges(&pending).await?;

        info!(accepter = %accepter, requester = %requester, "Friend request accepted");
        emit(
            self.publisher.as_ref(),
            EventKind::FriendAccepted {
                actor_id: accepter.clone(),
                target_id: requester.clone(),
            },
        )
        .await;

        Ok(FriendshipStatus::Friends)
    }

    /// Reject the pending request `requester -> rejecter`.
    #[instrument(skip(self))]
    pub async fn reject_request(
        &self,
        rejecter: &UserId,
        requester: &UserId,
    ) -> Result<FriendshipStatus, EngineError> {
        self.require_pair(rejecter, requester).await?;

        let deleted = self
            .store
            .delete_edges(&request_edge(requester, rejecter))
            .await?;
        if deleted == 0 {
            return Err(EngineError::not_found(
                "FriendRequest",
                format!("{requester}->{rejecter}"),
            ));
        }

        info!(rejecter = %rejecter, requester = %requester, "Friend request rejected");
        emit(
            self.publisher.as_ref(),
            EventKind::FriendRejected {
                actor_id: rejecter.clone(),
                target_id: requester.clone(),
            },
        )
        .await;

        Ok(FriendshipStatus::None)
    }

    /// End the friendship between `user` and `friend`.
    #[instrument(skip(self))]
    pub async fn remove_friend(
        &self,
        user: &UserId,
        friend: &UserId,
    ) -> Result<FriendshipStatus, EngineError> {
        self.require_pair(user, friend).await?;

        let deleted = if user == friend {
            0
        } else {
            self.store.delete_edges(&friend_edge(user, friend)).await?
                + self.store.delete_edges(&friend_edge(friend, user)).await?
        };
        if deleted == 0 {
            return Err(EngineError::not_found(
                "Friendship",
                format!("{user}<->{friend}"),
            ));
        }

        info!(user = %user, friend = %friend, "Friendship removed");
        emit(
            self.publisher.as_ref(),
            EventKind::FriendRemoved {
                actor_id: user.clone(),
                target_id: friend.clone(),
            },
        )
        .await;

        Ok(FriendshipStatus::None)
    }

    /// Confirmed friends of `user`, ordered by id.
    pub async fn list_friends(&self, user: &UserId) -> Result<Vec<UserId>, EngineError> {
        require_present("user id", user.as_str())?;
        require_user(self.store.as_ref(), user).await?;

        let node = NodeRef::user(user);
        let outgoing = self
            .store
            .query_edges(&EdgePattern::of(EdgeType::Friend).from_node(node.clone()))
            .await?;
        let incoming = self
            .store
            .query_edges(&EdgePattern::of(EdgeType::Friend).to_node(node))
            .await?;

        let friends: BTreeSet<String> = outgoing
            .into_iter()
            .map(|edge| edge.to.id)
            .chain(incoming.into_iter().map(|edge| edge.from.id))
            .filter(|id| id != user.as_str())
            .collect();

        Ok(friends.into_iter().map(UserId::new).collect())
    }

    /// Number of confirmed friends of `user`.
    pub async fn friend_count(&self, user: &UserId) -> Result<u64, EngineError> {
        Ok(self.list_friends(user).await?.len() as u64)
    }
}
