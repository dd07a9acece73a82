//! Recommendation feed
//!
//! The feed is server-authoritative for its contents and client-authoritative for
//! removals. Whichever response lands last replaces the feed, regardless of the
//! order requests were issued in. Each fetch carries a sequence number so items
//! removed locally while it was in flight are filtered out of its response.

use std::collections::{BTreeMap, BTreeSet};

use super::api::RecommendationApi;
use crate::{
    config::Config,
    error::ClientResult,
    models::{
        AccessToken, Domain, DomainFilter, FeedPage, ItemKey, ProfileSummary, RecommendationItem,
        Session,
    },
};

/// Page sizes sent with feed requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    pub per_domain: u32,
    pub domain_count: u32,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            per_domain: 5,
            domain_count: 10,
        }
    }
}

impl From<&Config> for FeedLimits {
    fn from(config: &Config) -> Self {
        Self {
            per_domain: config.unified_items_per_domain,
            domain_count: config.domain_item_count,
        }
    }
}

/// One issued fetch, detached from the controller so it can run on its own task
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub seq: u64,
    pub filter: DomainFilter,
    token: AccessToken,
    user_id: i64,
    limits: FeedLimits,
}

impl FeedRequest {
    pub async fn execute(&self, api: &dyn RecommendationApi) -> ClientResult<FeedPage> {
        match self.filter {
            DomainFilter::Unified => {
                api.unified_recommendations(&self.token, self.limits.per_domain)
                    .await
            }
            DomainFilter::Single(domain) => {
                api.domain_recommendations(
                    &self.token,
                    domain,
                    self.user_id,
                    self.limits.domain_count,
                )
                .await
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tombstone {
    key: ItemKey,
    /// Latest sequence number issued when the item was removed
    issued: u64,
}

#[derive(Debug, Default)]
pub struct FeedController {
    limits: FeedLimits,
    filter: DomainFilter,
    items: Vec<RecommendationItem>,
    profile_summary: Option<ProfileSummary>,
    issued: u64,
    in_flight: BTreeSet<u64>,
    tombstones: Vec<Tombstone>,
}

impl FeedController {
    pub fn new(limits: FeedLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn filter(&self) -> DomainFilter {
        self.filter
    }

    pub fn items(&self) -> &[RecommendationItem] {
        &self.items
    }

    pub fn profile_summary(&self) -> Option<&ProfileSummary> {
        self.profile_summary.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, key: ItemKey) -> Option<&RecommendationItem> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Item counts per domain, for the stats view
    pub fn domain_counts(&self) -> BTreeMap<Domain, usize> {
        self.items.iter().fold(BTreeMap::new(), |mut counts, item| {
            *counts.entry(item.domain()).or_insert(0) += 1;
            counts
        })
    }

    /// Marks the feed loading and returns the request to run
    pub fn begin_fetch(&mut self, session: &Session) -> FeedRequest {
        self.issued += 1;
        self.in_flight.insert(self.issued);
        tracing::debug!(seq = self.issued, filter = %self.filter, "Fetching recommendations");

        FeedRequest {
            seq: self.issued,
            filter: self.filter,
            token: session.token.clone(),
            user_id: session.user.id,
            limits: self.limits,
        }
    }

    /// Changes the domain filter, returning the fetch it requires
    pub fn select_domain(&mut self, filter: DomainFilter, session: &Session) -> Option<FeedRequest> {
        if filter == self.filter {
            return None;
        }
        self.filter = filter;
        Some(self.begin_fetch(session))
    }

    /// Applies a fetch result as it lands; returns false for a sequence number
    /// that is not in flight
    pub fn apply(&mut self, seq: u64, result: ClientResult<FeedPage>) -> bool {
        if !self.in_flight.remove(&seq) {
            tracing::debug!(seq, "Ignoring feed response that is not in flight");
            return false;
        }

        match result {
            Ok(page) => {
                let received = page.items.len();
                let tombstones = &self.tombstones;
                self.items = page
                    .items
                    .into_iter()
                    .filter(|item| {
                        !tombstones
                            .iter()
                            .any(|t| t.key == item.key && t.issued >= seq)
                    })
                    .collect();
                self.profile_summary = page.profile_summary;
                tracing::info!(
                    seq,
                    filter = %self.filter,
                    received,
                    shown = self.items.len(),
                    "Feed updated"
                );
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "Feed fetch failed, showing empty feed");
                self.items.clear();
                self.profile_summary = None;
            }
        }

        // A tombstone matters only while a request issued before it is outstanding
        match self.in_flight.first().copied() {
            Some(oldest) => self.tombstones.retain(|t| t.issued >= oldest),
            None => self.tombstones.clear(),
        }
        true
    }

    /// Removes every item with `key` immediately; returns how many were removed
    pub fn optimistic_remove(&mut self, key: ItemKey) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.key != key);
        let removed = before - self.items.len();

        if self.is_loading() {
            // Responses already in flight may still carry the item
            let issued = self.issued;
            match self.tombstones.iter_mut().find(|t| t.key == key) {
                Some(tombstone) => tombstone.issued = issued,
                None => self.tombstones.push(Tombstone { key, issued }),
            }
        }

        tracing::debug!(item = %key, removed, "Removed item from feed");
        removed
    }
}
