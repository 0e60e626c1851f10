pub mod case_dto;
pub mod case_handlers;
pub mod case_models;
pub mod case_repository;
pub mod case_service;
