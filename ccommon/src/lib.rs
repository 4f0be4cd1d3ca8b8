//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use ccommon::{MessageId, MetadataMap, SendOptions, SessionId};
//!
//! let session = SessionId::from("session-1");
//! let message = MessageId::new("user-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("theme".to_string(), "dark".to_string());
//!
//! let options = SendOptions::default().with_web_search(true);
//! assert_eq!(session.as_str(), "session-1");
//! assert_eq!(message.to_string(), "user-1");
//! assert!(options.web_search);
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use ccommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use ccommon::{MessageId, MetadataMap, SessionId};
    //!
    //! let session = SessionId::new("session-42");
    //! let message = MessageId::from("model-42");
    //! let mut metadata = MetadataMap::new();
    //! metadata.insert("device_type".to_string(), "desktop".to_string());
    //!
    //! assert_eq!(session.to_string(), "session-42");
    //! assert_eq!(message.as_str(), "model-42");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct MessageId(String);

    impl MessageId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for MessageId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for MessageId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for MessageId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod options {
    //! Per-turn generation settings carried alongside the user message.
    //!
    //! ```rust
    //! use ccommon::SendOptions;
    //!
    //! let options = SendOptions::default()
    //!     .with_web_search(true)
    //!     .with_metadata("local_hour", "14");
    //!
    //! assert!(options.web_search);
    //! assert!(!options.censorship);
    //! assert_eq!(options.metadata.get("local_hour").map(String::as_str), Some("14"));
    //! ```

    use crate::context::MetadataMap;

    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct SendOptions {
        pub web_search: bool,
        pub censorship: bool,
        pub metadata: MetadataMap,
    }

    impl SendOptions {
        pub fn with_web_search(mut self, web_search: bool) -> Self {
            self.web_search = web_search;
            self
        }

        pub fn with_censorship(mut self, censorship: bool) -> Self {
            self.censorship = censorship;
            self
        }

        pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
            self.metadata.insert(key.into(), value.into());
            self
        }
    }
}

pub use context::{MessageId, MetadataMap, SessionId};
pub use future::BoxFuture;
pub use options::SendOptions;
