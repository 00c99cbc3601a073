use crate::outcome::Outcome;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// A single unit of business logic: one input, one [`Outcome`]
///
/// Implementations must not assume which thread `run` executes on and never
/// see the delivery callback; the [`Executor`](crate::executor::Executor)
/// owns delivery. A panic inside `run` is caught by the executor and
/// delivered as a failure.
///
/// # Examples
///
/// ```
/// use interactor::{ErrorInfo, ErrorKind, Operation, Outcome};
/// use async_trait::async_trait;
///
/// struct Greet;
///
/// #[async_trait]
/// impl Operation for Greet {
///     type Params = String;
///     type Output = String;
///
///     async fn run(&self, name: String) -> Outcome<String> {
///         if name.is_empty() {
///             return Outcome::Failure(ErrorInfo::new(ErrorKind::InvalidInput, "empty name"));
///         }
///         Outcome::Success(format!("hello, {name}"))
///     }
/// }
/// ```
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    type Params: Send + 'static;
    type Output: Send + 'static;

    async fn run(&self, params: Self::Params) -> Outcome<Self::Output>;

    /// Name used in log fields
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

type RunFn<P, T> = dyn Fn(P) -> BoxFuture<'static, Outcome<T>> + Send + Sync;

/// Operation backed by a closure
///
/// ```
/// use interactor::{FnOperation, Outcome};
///
/// let double = FnOperation::new("double", |n: u64| async move { Outcome::Success(n * 2) });
/// ```
pub struct FnOperation<P, T> {
    name: String,
    run: Arc<RunFn<P, T>>,
}

impl<P, T> FnOperation<P, T>
where
    P: Send + 'static,
    T: Send + 'static,
{
    #[must_use]
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |params| f(params).boxed()),
        }
    }
}

#[async_trait]
impl<P, T> Operation for FnOperation<P, T>
where
    P: Send + 'static,
    T: Send + 'static,
{
    type Params = P;
    type Output = T;

    async fn run(&self, params: P) -> Outcome<T> {
        (self.run)(params).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<P, T> std::fmt::Debug for FnOperation<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .field("run", &"<closure>")
            .finish()
    }
}
