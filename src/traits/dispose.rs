//! Disposal contracts for resource cleanup.

use crate::error::DisposeError;

/// Synchronous disposal contract.
///
/// Implement this for components that hold resources requiring explicit cleanup
/// (flushing buffers, closing handles). Register the capability with
/// [`RegistrationBuilder::disposable`](crate::RegistrationBuilder::disposable) so the
/// owning scope or container disposes the instance, in reverse creation order.
///
/// # Examples
///
/// ```
/// use ferrous_lifestyle::{Dispose, DisposeError, ServiceCollection};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), DisposeError> {
///         println!("Flushing cache: {}", self.name);
///         Ok(())
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton_factory::<Cache, _>(|_| Cache { name: "user_cache".to_string() })
///     .disposable();
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self) -> Result<(), DisposeError>;
}

/// Asynchronous disposal contract.
///
/// Preferred over [`Dispose`] when a scope is torn down with
/// [`Scope::dispose_async`](crate::Scope::dispose_async). A component that only
/// implements this contract cannot be disposed by a blocking teardown; that
/// teardown records it as a failure.
///
/// # Examples
///
/// ```
/// use ferrous_lifestyle::{AsyncDispose, DisposeError, ServiceCollection};
/// use async_trait::async_trait;
///
/// struct DatabaseClient {
///     connection_id: String,
/// }
///
/// #[async_trait]
/// impl AsyncDispose for DatabaseClient {
///     async fn dispose_async(&self) -> Result<(), DisposeError> {
///         println!("Closing database connection: {}", self.connection_id);
///         Ok(())
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_scoped_factory::<DatabaseClient, _>(|_| DatabaseClient {
///         connection_id: "conn_123".to_string(),
///     })
///     .async_disposable();
/// ```
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose_async(&self) -> Result<(), DisposeError>;
}
