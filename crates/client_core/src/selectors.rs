//! Read-only projections of [`AppState`](crate::store::AppState). Every
//! selector is total: before the first fetch it returns `None`, an empty
//! slice, `false` or empty field errors.

pub use crate::resources::{
    comments::selectors::*, contacts::selectors::*, invoices::selectors::*,
    leases::selectors::*, rent_basis::selectors::*,
};
pub use crate::store::{auth::selectors::*, errors::selectors::*};
