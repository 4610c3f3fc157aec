//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod device_repo;
pub mod directory_repo;
pub mod notification_repo;
pub mod preference_repo;
pub mod queue_repo;
pub mod subscription_repo;
pub mod user_repo;

pub use device_repo::DeviceRepo;
pub use directory_repo::DirectoryRepo;
pub use notification_repo::NotificationRepo;
pub use preference_repo::PreferenceRepo;
pub use queue_repo::QueueRepo;
pub use subscription_repo::SubscriptionRepo;
pub use user_repo::UserRepo;
