use derive_more::Display;
use serde::{Deserialize, Serialize};

/// One entry of the NFT gallery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Display)]
#[display("#{id} {name}")]
pub struct NftItem {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub image_url: String,
}
