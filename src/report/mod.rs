pub mod docx;
pub mod report_dto;
pub mod report_handlers;
pub mod report_service;
