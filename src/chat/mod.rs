pub mod store;

pub use store::{
    BoxedSessionStore, InMemorySessionStore, SessionPolicy, SessionStore, SessionSummary,
};
