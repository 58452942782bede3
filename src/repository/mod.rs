//! Data access layer

pub mod declaration_type;
pub mod user;

pub use declaration_type::DeclarationTypeRepository;
pub use user::UserRepository;
