//! Account service models

pub mod account;
pub mod profile;
pub mod role;

// Re-export for convenience
pub use account::{Account, AccountSummary, NewAccount};
pub use profile::{
    ApprovalStatus, BioVideoLimitExceeded, Category, ClientProfile, InfluencerProfile,
    MAX_BIO_VIDEOS, NewInfluencerProfile, NewProfile, Price, StatusChange, check_bio_video_count,
};
pub use role::Role;
