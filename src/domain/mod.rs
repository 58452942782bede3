//! Domain models

pub mod declaration;
pub mod user;

pub use declaration::{DeclarationFormat, DeclarationFrequence, DeclarationType, DeclarationTypeInput};
pub use user::{
    is_valid_email, CreateUserRequest, CreateUserResponse, LocalUser, LocalUserRow, RoleDto,
    SyncReport, UpdateUserRequest, UpsertLocalUserInput, UserDto,
};
