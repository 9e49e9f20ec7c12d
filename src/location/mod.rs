pub mod adapter;
pub mod lease;
pub mod manager;

pub use adapter::{AccuracyProfile, AuthorizationStatus, LocationAdapter, LocationSample};
pub use lease::{BackgroundLease, LeaseProvider, NoopLeaseProvider, WarnOnAcquireProvider};
pub use manager::LocationTrackingManager;
