pub mod template_dto;
pub mod template_handlers;
pub mod template_models;
pub mod template_repository;
pub mod template_service;
