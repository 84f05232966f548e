//! Engine facade.
//!
//! [`SocialGraphEngine`] wires the components to one graph store and one
//! event publisher. The transport layer in front of it calls one operation
//! per inbound request; the engine keeps no state between calls beyond the
//! shared handles.

use std::sync::Arc;
use tracing::{info, instrument};

use social_graph_repository::GraphStore;
use social_graph_shared::{User, UserId};

use crate::admin::AdminCapability;
use crate::config::EngineConfig;
use crate::content::ContentManager;
use crate::counters::LikeCounter;
use crate::errors::EngineError;
use crate::events::EventPublisher;
use crate::lookup::{load_user, require_present};
use crate::relationship::RelationshipManager;
use crate::visibility::VisibilityGate;

/// Entry point for every social graph operation.
///
/// # Example
///
/// ```ignore
/// let engine = SocialGraphEngine::new(store, publisher, EngineConfig::from_env());
/// engine.relationships().send_request(&alice, &bob).await?;
/// engine.relationships().accept_request(&bob, &alice).await?;
/// engine.likes().like(&story_id, &alice).await?;
/// ```
#[derive(Clone)]
pub struct SocialGraphEngine {
    store: Arc<dyn GraphStore>,
    config: EngineConfig,
    relationships: RelationshipManager,
    content: ContentManager,
    visibility: VisibilityGate,
    likes: LikeCounter,
}

impl SocialGraphEngine {
    pub fn new(
        store: Arc<dyn GraphStore>,
        publisher: Arc<dyn EventPublisher>,
        config: EngineConfig,
    ) -> Self {
        let relationships = RelationshipManager::new(store.clone(), publisher.clone());
        let content = ContentManager::new(store.clone(), publisher.clone());
        let visibility = VisibilityGate::new(store.clone(), relationships.clone());
        let likes = LikeCounter::new(store.clone(), publisher, relationships.clone());

        Self {
            store,
            config,
            relationships,
            content,
            visibility,
            likes,
        }
    }

    /// Friend requests and friendships.
    pub fn relationships(&self) -> &RelationshipManager {
        &self.relationships
    }

    /// Story and highlight lifecycle.
    pub fn content(&self) -> &ContentManager {
        &self.content
    }

    /// Highlight and story listings.
    pub fn visibility(&self) -> &VisibilityGate {
        &self.visibility
    }

    /// Likes and like counters.
    pub fn likes(&self) -> &LikeCounter {
        &self.likes
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read a user profile.
    pub async fn get_user(&self, user_id: &UserId) -> Result<User, EngineError> {
        require_present("user id", user_id.as_str())?;
        load_user(self.store.as_ref(), user_id).await
    }

    /// Exchange the administrative token for an [`AdminCapability`].
    ///
    /// # Returns
    ///
    /// * `Ok(AdminCapability)` - The token matches the configured `ADMIN_TOKEN`
    /// * `Err(EngineError::Forbidden)` - Wrong token, or no token configured
    #[instrument(skip(self, token))]
    pub fn authorize_admin(&self, token: &str) -> Result<AdminCapability, EngineError> {
        let capability = AdminCapability::authorize(self.config.admin_token.as_deref(), token)?;
        info!("Administrative capability granted");
        Ok(capability)
    }
}
