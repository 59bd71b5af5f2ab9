//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// The block evaluates to `Option<Action>`; a `Some` is fed back into the
/// reducer by the runtime.
///
/// # Example
///
/// ```rust,ignore
/// use rocket_cart_core::async_effect;
///
/// async_effect! {
///     match stock.stock(product_id).await {
///         Ok(record) => Some(CartAction::UpdateChecked { request_id, product_id, amount, stock: record }),
///         Err(error) => Some(CartAction::CommandFailed { request_id, error: error.into() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
