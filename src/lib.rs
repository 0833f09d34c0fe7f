mod accessory;
mod accessory_store;
mod command;
mod config;
mod door_state;
#[cfg(feature = "framework")]
mod garadget_client;
#[cfg(feature = "framework")]
pub mod garadget_mqtt_client;
mod garage_door;
mod hap;
#[cfg(feature = "framework")]
mod platform;
mod poll_timer;
mod status_message;

pub use accessory::*;
pub use accessory_store::*;
pub use command::*;
pub use config::*;
pub use door_state::*;
#[cfg(feature = "framework")]
pub use garadget_client::*;
#[cfg(feature = "framework")]
pub use garadget_mqtt_client::*;
pub use garage_door::*;
pub use hap::*;
#[cfg(feature = "framework")]
pub use platform::*;
pub use poll_timer::*;
pub use status_message::*;
