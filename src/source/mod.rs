//! Sources are tip-offs tracked before they become cases. They reuse the
//! case model, service and DTOs over their own tables.

pub mod source_handlers;
