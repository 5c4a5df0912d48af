//! Campaign catalog and local donation history.
//!
//! The catalog is static for the process lifetime. Donation records are a
//! client-side attribution of successful deposits; the ledger itself does not
//! know about campaigns.

use serde::{Deserialize, Serialize};

use crate::error::{AtmError, AtmResult};
use crate::units::{format_amount, ONE_UNIT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u32,
    pub name: String,
    /// Goal in base units.
    #[serde(with = "crate::units::base_units")]
    pub goal: u128,
    pub description: String,
}

impl Campaign {
    /// `goal` is in base units; any `u128` is accepted as-is.
    pub fn new(id: u32, name: impl Into<String>, goal: u128, description: impl Into<String>) -> Self {
        Self { id, name: name.into(), goal, description: description.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    campaigns: Vec<Campaign>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            campaigns: vec![
                Campaign::new(1, "Save the Children", 100 * ONE_UNIT, "Provide essential resources and support to children in need around the world."),
                Campaign::new(2, "Clean Water Project", 150 * ONE_UNIT, "Ensure access to clean and safe drinking water in underserved communities."),
                Campaign::new(3, "Plant a Tree", 50 * ONE_UNIT, "Help combat climate change by planting trees in deforested areas."),
                Campaign::new(4, "Educate Every Child", 200 * ONE_UNIT, "Support educational programs for children worldwide."),
                Campaign::new(5, "Renewable Energy Initiative", 300 * ONE_UNIT, "Promote the adoption of renewable energy sources for a sustainable future."),
            ],
        }
    }
}

impl Catalog {
    pub fn new(campaigns: Vec<Campaign>) -> AtmResult<Self> {
        for (i, c) in campaigns.iter().enumerate() {
            if campaigns[..i].iter().any(|prev| prev.id == c.id) {
                return Err(AtmError::DuplicateCampaign(c.id));
            }
        }
        Ok(Self { campaigns })
    }

    /// Linear scan; catalogs are small and fixed.
    pub fn get(&self, id: u32) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    pub fn all(&self) -> &[Campaign] { &self.campaigns }

    /// Info text for a campaign: name, goal and description on separate lines.
    pub fn describe(&self, id: u32) -> Option<String> {
        self.get(id).map(|c| format!("{}\nGoal: {}\nDescription: {}", c.name, format_amount(c.goal), c.description))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationRecord {
    pub campaign_id: u32,
    /// Snapshot of the name at donation time.
    pub campaign_name: String,
    #[serde(with = "crate::units::base_units")]
    pub amount: u128,
}

#[derive(Debug, Clone, Default)]
pub struct DonationHistory {
    records: Vec<DonationRecord>,
}

impl DonationHistory {
    pub(crate) fn append(&mut self, record: DonationRecord) {
        self.records.push(record);
    }

    pub fn all(&self) -> &[DonationRecord] { &self.records }

    pub fn for_campaign(&self, id: u32) -> Vec<DonationRecord> {
        self.records.iter().filter(|r| r.campaign_id == id).cloned().collect()
    }

    pub fn total_for(&self, id: u32) -> u128 {
        self.records.iter().filter(|r| r.campaign_id == id).map(|r| r.amount).sum()
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}
