pub mod deadline;
pub mod deadline_scheduler;
pub mod notification_dto;
pub mod notification_handlers;
pub mod notification_models;
pub mod notification_repository;
pub mod notification_service;
pub mod notifier;
pub mod push;

pub use deadline_scheduler::start_deadline_scheduler;
