//! Rolling per-category decision metrics, bucketed by campaign.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::DecisionEvent;

/// Counters for one campaign's decisions within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignBucket {
    pub campaign_id: Uuid,
    pub decisions: u32,
    pub accepted: u32,
    pub overridden: u32,
    pub false_positives: u32,
    consensus_sum: f32,
    churn_sum: f32,
}

impl CampaignBucket {
    fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            decisions: 0,
            accepted: 0,
            overridden: 0,
            false_positives: 0,
            consensus_sum: 0.0,
            churn_sum: 0.0,
        }
    }
}

/// Rolling metrics over the trailing campaigns of one category.
///
/// Buckets are appended per campaign and evicted beyond the configured
/// window; every rate accessor aggregates across the retained buckets.
/// Updates are append-only per decision event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    buckets: VecDeque<CampaignBucket>,
    window: usize,
}

impl CategoryMetrics {
    pub fn new(window: usize) -> Self {
        Self {
            buckets: VecDeque::new(),
            window: window.max(1),
        }
    }

    /// Fold one decision into the bucket for its campaign, opening a new
    /// bucket (and evicting the oldest beyond the window) as needed.
    pub fn record(&mut self, event: &DecisionEvent) {
        let needs_new = self
            .buckets
            .back()
            .map(|b| b.campaign_id != event.campaign_id)
            .unwrap_or(true);
        if needs_new {
            // A campaign seen earlier in the window reopens its bucket.
            if let Some(pos) = self
                .buckets
                .iter()
                .position(|b| b.campaign_id == event.campaign_id)
            {
                let bucket = self.buckets.remove(pos);
                if let Some(bucket) = bucket {
                    self.buckets.push_back(bucket);
                }
            } else {
                self.buckets.push_back(CampaignBucket::new(event.campaign_id));
                while self.buckets.len() > self.window {
                    self.buckets.pop_front();
                }
            }
        }

        let bucket = match self.buckets.back_mut() {
            Some(b) => b,
            None => return,
        };
        bucket.decisions += 1;
        if event.accepted() {
            bucket.accepted += 1;
        }
        if event.overridden() {
            bucket.overridden += 1;
        }
        if event.false_positive {
            bucket.false_positives += 1;
        }
        bucket.consensus_sum += event.consensus;
        bucket.churn_sum += event.cluster_churn;
    }

    /// Drop all buckets, e.g. on re-entry to Observation after suspension.
    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    pub fn campaign_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn decision_count(&self) -> u32 {
        self.buckets.iter().map(|b| b.decisions).sum()
    }

    pub fn acceptance_rate(&self) -> f32 {
        self.rate(|b| b.accepted)
    }

    pub fn override_rate(&self) -> f32 {
        self.rate(|b| b.overridden)
    }

    pub fn false_positive_rate(&self) -> f32 {
        self.rate(|b| b.false_positives)
    }

    pub fn mean_consensus(&self) -> f32 {
        let decisions = self.decision_count();
        if decisions == 0 {
            return 0.0;
        }
        self.buckets.iter().map(|b| b.consensus_sum).sum::<f32>() / decisions as f32
    }

    pub fn mean_cluster_churn(&self) -> f32 {
        let decisions = self.decision_count();
        if decisions == 0 {
            return 0.0;
        }
        self.buckets.iter().map(|b| b.churn_sum).sum::<f32>() / decisions as f32
    }

    pub fn buckets(&self) -> impl Iterator<Item = &CampaignBucket> {
        self.buckets.iter()
    }

    fn rate(&self, count: impl Fn(&CampaignBucket) -> u32) -> f32 {
        let decisions = self.decision_count();
        if decisions == 0 {
            return 0.0;
        }
        self.buckets.iter().map(|b| count(b)).sum::<u32>() as f32 / decisions as f32
    }
}
