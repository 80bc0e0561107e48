//! Function registry for embedding in rule engines, policy evaluators,
//! routers and templating systems.
//!
//! Six modules (`http`, `json`, `map`, `url`, `time`, `types`) share one
//! dynamic value universe. Callers look a function up by name, pass an
//! argument slice and get back a value or an error:
//!
//! ```
//! use rulekit::{Registry, Value};
//!
//! let registry = Registry::standard();
//! let parsed = registry
//!     .call("json.parse", &[Value::String(r#"{"user": {"name": "John"}}"#.into())])
//!     .unwrap();
//! let name = registry
//!     .call("json.get", &[parsed, Value::String("user.name".into())])
//!     .unwrap();
//! assert_eq!(name, Value::String("John".into()));
//! ```

pub mod error;
pub mod modules;
pub mod path;
pub mod proto;
pub mod value;

pub use error::{ErrorKind, FnError};
pub use modules::{Function, ModuleProvider, Registry};
pub use proto::{Cookie, Protocol, RequestView, ResponseView};
pub use value::Value;
