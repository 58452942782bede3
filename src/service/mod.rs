//! Business logic layer

pub mod admin_user;
pub mod declaration_type;

pub use admin_user::AdminUserService;
pub use declaration_type::DeclarationTypeService;
