//! # privsh
//!
//! Privilege-level navigation and session lifecycle for network device CLIs.
//!
//! privsh drives an already-established interactive session (SSH, telnet,
//! serial, anything that is `AsyncRead + AsyncWrite`) through a device's
//! privilege levels: it works out where the session is from the prompt,
//! walks the escalate/de-escalate edges to a target level, answers
//! authentication prompts, and detects failed commands.
//!
//! ## Features
//!
//! - Privilege tree with shortest-path navigation through the common ancestor
//! - Streaming prompt matcher with ANSI escape stripping and tail search
//! - Failure triggers that take precedence over prompt matches
//! - Pluggable open/close hooks per platform
//! - Built-in platforms: SONiC, Arista EOS, Linux
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use privsh::{Driver, DriverBuilder, StreamChannel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Any established byte stream; the transport is up to the caller.
//!     let stream = tokio::net::TcpStream::connect("192.0.2.10:2323").await?;
//!
//!     let mut driver = DriverBuilder::new("192.0.2.10")
//!         .platform("sonic")
//!         .default_privilege("cli")
//!         .build(StreamChannel::new(stream))?;
//!
//!     driver.open().await?;
//!
//!     let response = driver.send_command("show version").await?;
//!     println!("{}", response.result);
//!
//!     driver.acquire_privilege("configuration").await?;
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod platform;
pub mod transport;

// Re-export main types for convenience
pub use channel::{ChannelConfig, SessionChannel, StreamChannel};
pub use driver::{
    Driver, DriverBuilder, GenericDriver, Response, SessionState, SessionStatus,
};
pub use error::Error;
pub use platform::{PlatformDefinition, PlatformRegistry, PrivilegeLevel, SessionHook};
pub use transport::{Transport, TransportOptions};
