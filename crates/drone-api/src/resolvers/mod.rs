//! # GraphQL Resolvers Module
//!
//! Query, Mutation, and Subscription resolvers.

pub mod mutation;
pub mod query;
pub mod subscription;

pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;
