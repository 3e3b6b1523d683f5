use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(LeaseId);
id_newtype!(ContactId);
id_newtype!(InvoiceId);
id_newtype!(RentBasisId);
id_newtype!(CommentId);

/// Back-office resources exposed by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Lease,
    Contact,
    Invoice,
    RentBasis,
    Comment,
}

impl Resource {
    /// Collection path relative to the API root, with the trailing slash the
    /// backend router expects.
    pub fn collection_path(self) -> &'static str {
        match self {
            Resource::Lease => "lease/",
            Resource::Contact => "contact/",
            Resource::Invoice => "invoice/",
            Resource::RentBasis => "rent_basis/",
            Resource::Comment => "comment/",
        }
    }

    pub fn item_path(self, id: i64) -> String {
        format!("{}{id}/", self.collection_path())
    }
}
