//! Role-specific profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on the number of bio videos attached to one influencer
pub const MAX_BIO_VIDEOS: usize = 5;

/// Influencer approval lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

/// Content category an influencer works in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Tech,
    Travel,
    Comedy,
    Sports,
    Entrepreneurship,
    Gaming,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "Tech",
            Category::Travel => "Travel",
            Category::Comedy => "Comedy",
            Category::Sports => "Sports",
            Category::Entrepreneurship => "Entrepreneurship",
            Category::Gaming => "Gaming",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Tech" => Ok(Category::Tech),
            "Travel" => Ok(Category::Travel),
            "Comedy" => Ok(Category::Comedy),
            "Sports" => Ok(Category::Sports),
            "Entrepreneurship" => Ok(Category::Entrepreneurship),
            "Gaming" => Ok(Category::Gaming),
            other => Err(format!("Value '{}' is not a valid choice.", other)),
        }
    }
}

/// Decimal price kept in its canonical textual form (at most 10 digits, 2 after the point)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(String);

impl Price {
    /// Wrap a textual price that has already passed validation.
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raised when a bio-video list would grow past [`MAX_BIO_VIDEOS`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("An influencer can have a maximum of {} bio videos.", MAX_BIO_VIDEOS)]
pub struct BioVideoLimitExceeded;

/// Profile attached to a client account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Profile attached to an influencer account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluencerProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub category: Option<Category>,
    pub profile_picture: Option<String>,
    pub bio_videos: Vec<String>,
    pub daily_price: Option<Price>,
    pub weekly_price: Option<Price>,
    pub instagram_acc_link: Option<String>,
    pub tiktok_acc_link: Option<String>,
    pub snapchat_acc_link: Option<String>,
    pub youtube_acc_link: Option<String>,
    pub status: ApprovalStatus,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
}

impl InfluencerProfile {
    /// Append freshly stored bio videos, refusing to exceed the cap.
    ///
    /// The list is left untouched when the limit would be exceeded.
    pub fn append_bio_videos(&mut self, videos: &[String]) -> Result<(), BioVideoLimitExceeded> {
        check_bio_video_count(self.bio_videos.len() + videos.len())?;
        self.bio_videos.extend_from_slice(videos);
        Ok(())
    }
}

/// Data needed to create an influencer profile at registration time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewInfluencerProfile {
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub category: Option<Category>,
    pub profile_picture: Option<String>,
    pub bio_videos: Vec<String>,
    pub daily_price: Option<Price>,
    pub weekly_price: Option<Price>,
    pub instagram_acc_link: Option<String>,
    pub tiktok_acc_link: Option<String>,
    pub snapchat_acc_link: Option<String>,
    pub youtube_acc_link: Option<String>,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
}

impl NewInfluencerProfile {
    /// Materialize the profile for a freshly created account. New influencers always start pending.
    pub fn into_profile(self, id: Uuid, account_id: Uuid) -> Result<InfluencerProfile, BioVideoLimitExceeded> {
        check_bio_video_count(self.bio_videos.len())?;
        Ok(InfluencerProfile {
            id,
            account_id,
            full_name: self.full_name,
            biography: self.biography,
            category: self.category,
            profile_picture: self.profile_picture,
            bio_videos: self.bio_videos,
            daily_price: self.daily_price,
            weekly_price: self.weekly_price,
            instagram_acc_link: self.instagram_acc_link,
            tiktok_acc_link: self.tiktok_acc_link,
            snapchat_acc_link: self.snapchat_acc_link,
            youtube_acc_link: self.youtube_acc_link,
            status: ApprovalStatus::Pending,
            bank_name: self.bank_name,
            iban: self.iban,
        })
    }
}

/// Role-specific profile created together with an account
#[derive(Debug, Clone, PartialEq)]
pub enum NewProfile {
    Client,
    Influencer(NewInfluencerProfile),
}

/// Outcome of an approval status write, used to decide on notifications
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub account_id: Uuid,
    pub email: String,
    pub previous: ApprovalStatus,
    pub current: ApprovalStatus,
}

pub fn check_bio_video_count(count: usize) -> Result<(), BioVideoLimitExceeded> {
    if count > MAX_BIO_VIDEOS {
        return Err(BioVideoLimitExceeded);
    }
    Ok(())
}
