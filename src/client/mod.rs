//! Client Module
//!
//! Connection, request demultiplexing and streamed statement results.
//!
//! # Example
//!
//! ```no_run
//! use bee_client::client::{Connection, ConnectionConfig};
//!
//! # async fn example() -> bee_client::ClientResult<()> {
//! let config = ConnectionConfig::builder("127.0.0.1", 6142)
//!     .with_application("reporting")
//!     .build();
//! let conn = Connection::connect(config).await?;
//!
//! let mut response = conn.execute("SELECT name FROM agents").await?;
//! while let Some(row) = response.next_row().await? {
//!     println!("{}", row.get_string("name")?);
//! }
//!
//! conn.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod promise;
pub mod record;
pub mod response;
pub mod transport;

pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::Connection;
pub use error::{ClientError, ClientResult};
pub use handler::{PendingHandler, PromiseHandler};
pub use promise::Promise;
pub use record::ResultRow;
pub use response::{statement_channel, Phase, StatementHandler, StreamingResponse};
pub use transport::{ConnectionState, Transport};
