//! # Bee Client
//!
//! An async client for the Bee statement protocol: length-framed binary
//! messages over one TCP connection, with statements whose rows stream back
//! as they are produced.
//!
//! ## Features
//!
//! - **Framing** - Resynchronizing frame decoder built on `tokio-util` codecs
//! - **Async/Await** - Built on Tokio; one read task per connection
//! - **Multiplexing** - Many statements in flight on one connection, matched by id
//! - **Streaming** - Rows are buffered with backpressure and consumed as they arrive
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use bee_client::{Connection, ConnectionConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::builder("127.0.0.1", 6142)
//!         .with_application("monitor")
//!         .with_statement_timeout(Duration::from_secs(10))
//!         .build();
//!     let conn = Connection::connect(config).await?;
//!
//!     let mut response = conn.execute("SELECT host, load FROM agents").await?;
//!     let columns = response.columns().await?;
//!     println!("{} columns", columns.len());
//!
//!     while let Some(row) = response.next_row().await? {
//!         println!("{}", row);
//!     }
//!
//!     conn.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Client operations return [`ClientResult`]:
//!
//! ```rust,no_run
//! # use bee_client::{ClientError, Connection, ConnectionConfig};
//! # async fn example() {
//! match Connection::connect(ConnectionConfig::new("127.0.0.1", 6142)).await {
//!     Ok(_) => println!("Connected!"),
//!     Err(ClientError::Application { code, message }) => {
//!         eprintln!("Rejected [{}]: {}", code, message)
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`client`] - Connection, transport and streamed results
//! - [`bee`] - Low-level frame, value and message codecs
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bee;
pub mod client;

// Re-exports for convenience
pub use client::{
    ClientError, ClientResult, Connection, ConnectionConfig, ConnectionConfigBuilder,
    ConnectionState, Phase, Promise, ResultRow, StreamingResponse,
};

pub use bee::{BeeError, Blob, ColumnInfo, DataType, Frame, FrameCodec, Value};
