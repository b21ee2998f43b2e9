//! Async SNMP client core for ALBEDO test and measurement devices.
//!
//! One [`Session`] per device owns one UDP socket for its whole life and
//! exposes the four operations management code uses:
//!
//! - [`get`](Session::get) — read one object, `None` on any failure
//! - [`set`](Session::set) — write one object, `true` iff accepted
//! - [`walk`](Session::walk) — enumerate a subtree in ascending OID order
//! - [`table_operation`](Session::table_operation) — run an RFC 2579
//!   RowStatus provisioning sequence with guaranteed row cleanup
//!
//! Symbolic names (`MODULE::object.index`) resolve through a shared
//! [`MibRegistry`]; dotted numeric OIDs work everywhere a name does.
//! Multifunction devices additionally go through a [`FunctionGuard`] so
//! mode-specific table regions are only touched while their mode is active.
//!
//! # Example
//!
//! ```no_run
//! use albedo_snmp::{FileOpAction, SessionBuilder, TableOperation};
//!
//! # async fn example() -> albedo_snmp::Result<()> {
//! let session = SessionBuilder::new("192.0.2.10:161".parse().unwrap())
//!     .read_community("public")
//!     .write_community("private")
//!     .connect()
//!     .await?;
//!
//! let descr = session.get("1.3.6.1.2.1.1.1.0").await;
//! println!("device: {descr:?}");
//!
//! let save = TableOperation::new(
//!     "ALBEDO-CONFIG-MIB::configFilesOpsStatus",
//!     "ALBEDO-CONFIG-MIB::configFilesOpsResult",
//!     1,
//! )
//! .column("ALBEDO-CONFIG-MIB::configFilesOpsFileName", "backup.cfg")
//! .column("ALBEDO-CONFIG-MIB::configFilesOpsAction", FileOpAction::Save);
//!
//! if session.table_operation(&save).await {
//!     println!("configuration saved");
//! }
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod ber;
mod error;
mod function;
mod message;
mod oid;
mod pdu;
mod resolver;
mod rowstatus;
mod session;
pub mod transport;
mod util;
mod value;
mod varbind;
mod version;

pub use error::{DecodeErrorKind, Error, ErrorStatus, OidErrorKind, Result};
pub use function::{FunctionClass, FunctionGuard, FunctionMode};
pub use message::CommunityMessage;
pub use oid::{MAX_OID_LEN, Oid};
pub use pdu::{Pdu, PduType};
pub use resolver::{MibRegistry, OidResolver};
pub use rowstatus::{FileOpAction, FileOpResult, RowStatus, TableOperation};
pub use session::{Session, SessionBuilder, SessionConfig, Walk};
pub use transport::{Transport, UdpTransport};
pub use value::Value;
pub use varbind::VarBind;
pub use version::Version;
