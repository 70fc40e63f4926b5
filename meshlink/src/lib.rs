pub use meshlink_core::model::{PeerId, RoomId};

pub mod model {
    pub use meshlink_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use meshlink_client::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use meshlink_server::*;
}
