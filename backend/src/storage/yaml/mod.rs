pub mod notification_repository;

pub use notification_repository::NotificationRecordRepository;
