//! Plugin-side runtime for the Stream Deck protocol: connects to the
//! controller, registers, and routes each inbound event to the live action
//! instance it addresses and then to the plugin-wide delegate.

pub mod action;
pub mod cli;
pub mod delegate;
pub mod dispatch;
pub mod logging;
pub mod registry;
pub mod runtime;
pub mod sender;
pub mod stream;

pub use action::{
    Action, ActionCatalog, ActionDescriptor, ActionMetadata, ActionState, ActionType,
};
pub use cli::{launch, normalize_args, PluginArgs};
pub use delegate::PluginDelegate;
pub use dispatch::{DispatchReport, Dispatcher, InstanceDispatch};
pub use logging::{init_logging, LogGuard, LogSettings};
pub use registry::{Instance, InstanceRegistry};
pub use runtime::{ConnectionConfig, ConnectionState, PluginRuntime};
pub use sender::CommandSender;
pub use stream::{subscribe, Demand, OutboundFrame, Outbox, SendOutcome, Subscription};
