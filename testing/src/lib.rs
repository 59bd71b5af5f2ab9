//! # Rocket Cart Testing
//!
//! Testing utilities and helpers for Rocket Cart reducers.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//! - [`effect_actions`], which runs effect descriptions and collects the
//!   actions they would feed back into the store
//!
//! ## Example
//!
//! ```ignore
//! use rocket_cart_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(CartReducer)
//!     .with_env(test_environment())
//!     .given_state(CartState::default())
//!     .when_action(CartAction::RemoveProduct { request_id, product_id })
//!     .then_effects(assertions::assert_has_future_effect)
//!     .then_emits(|actions| assert_eq!(actions.len(), 1))
//!     .run();
//! ```

use rocket_cart_core::effect::Effect;


pub use reducer_test::{ReducerTest, assertions};

/// Execute effects and collect the actions they produce, in order.
///
/// Every `Future` is awaited one after another. Produced actions are only
/// collected, never reduced.
pub async fn effect_actions<A, I>(effects: I) -> Vec<A>
where
    I: IntoIterator<Item = Effect<A>>,
{
    let mut actions = Vec::new();

    for effect in effects {
        if let Effect::Future(fut) = effect {
            if let Some(action) = fut.await {
                actions.push(action);
            }
        }
    }

    actions
}
