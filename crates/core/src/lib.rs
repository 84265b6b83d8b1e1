//! `userhub-core`: user domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the user read/write models, the search filter, and the keyset
//! pagination mechanics (cursor codec + paginator).

pub mod cursor;
pub mod error;
pub mod id;
pub mod page;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use page::{MAX_PAGE_SIZE, UserPage, clamp_limit, paginate};
pub use user::{User, UserFilter, UserInput};
