//! REST API handlers and shared response types

pub mod admin_user;
pub mod declaration_type;
pub mod health;
pub mod role;
pub mod test_endpoints;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Default number of users returned by a listing
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 100;

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Offset paging for identity-provider listings
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    #[serde(default)]
    pub first: u32,
    #[serde(default = "default_max")]
    pub max: u32,
}

fn default_max() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            first: 0,
            max: DEFAULT_PAGE_SIZE,
        }
    }
}
