//! Cart business logic.
//!
//! Every command is validated against fresh stock (except removal, which is
//! purely local), then committed: the new cart is written to storage first
//! and only replaces the in-memory cart if the write succeeds. Commit
//! decisions are always taken against the state current at commit time, so
//! concurrent commands on the same product serialize correctly.
//!
//! A request is settled (committed, rejected or ignored) by claiming it from
//! [`PendingRequests`](crate::environment::PendingRequests). The claim hands
//! the outcome to the waiting caller, and a request its caller abandoned is
//! dropped there without touching the cart or the notifier.

use crate::environment::{CartEnvironment, Claim};
use crate::error::{CartError, CollaboratorError};
use crate::metrics::CartMetrics;
use crate::types::{
    CartAction, CartState, CatalogProduct, Operation, Product, ProductId, RequestId, StockRecord,
};
use rocket_cart_core::effect::Effect;
use rocket_cart_core::reducer::Reducer;
use rocket_cart_core::{SmallVec, async_effect, smallvec};
use std::sync::Arc;

/// Effects returned by the cart reducer
type Effects = SmallVec<[Effect<CartAction>; 4]>;

/// Reducer for [`CartState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Create a cart reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        state: &mut CartState,
        action: CartAction,
        env: &CartEnvironment,
    ) -> Effects {
        match action {
            CartAction::AddProduct {
                request_id,
                product_id,
            } => {
                CartMetrics::record_command(Operation::Add.as_str());
                tracing::debug!(%request_id, %product_id, "Add requested");
                smallvec![check_add(
                    env,
                    request_id,
                    product_id,
                    state.get(product_id).is_some(),
                    state.amount_of(product_id),
                )]
            },

            CartAction::AddChecked {
                request_id,
                product_id,
                stock,
                product,
            } => apply_add(state, env, request_id, product_id, stock, product),

            CartAction::RemoveProduct {
                request_id,
                product_id,
            } => {
                CartMetrics::record_command(Operation::Remove.as_str());
                tracing::debug!(%request_id, %product_id, "Remove requested");

                if state.get(product_id).is_none() {
                    return fail(env, request_id, CartError::NotFound {
                        operation: Operation::Remove,
                        product_id,
                    });
                }

                let items = state
                    .items
                    .iter()
                    .filter(|item| item.id != product_id)
                    .cloned()
                    .collect();
                commit(state, env, request_id, Operation::Remove, product_id, items)
            },

            CartAction::UpdateProductAmount {
                request_id,
                product_id,
                amount,
            } => {
                CartMetrics::record_command(Operation::UpdateAmount.as_str());

                if amount <= 0 {
                    tracing::debug!(%request_id, %product_id, amount, "Ignoring non-positive amount");
                    return ignore(env, request_id);
                }

                let amount = amount.unsigned_abs();
                tracing::debug!(%request_id, %product_id, amount, "Update requested");

                let stock = Arc::clone(&env.stock);
                smallvec![async_effect! {
                    match stock.stock(product_id).await {
                        Ok(record) => Some(CartAction::UpdateChecked {
                            request_id,
                            product_id,
                            amount,
                            stock: record,
                        }),
                        Err(error) => Some(CartAction::LookupFailed {
                            request_id,
                            error: CartError::Collaborator {
                                operation: Operation::UpdateAmount,
                                product_id,
                                source: CollaboratorError::Stock(error),
                            },
                        }),
                    }
                }]
            },

            CartAction::UpdateChecked {
                request_id,
                product_id,
                amount: requested,
                stock,
            } => {
                let amount = match u32::try_from(requested) {
                    Ok(amount) if amount <= stock.amount => amount,
                    _ => {
                        return fail(env, request_id, CartError::OutOfStock {
                            product_id,
                            requested,
                            available: stock.amount,
                        });
                    },
                };

                if state.get(product_id).is_none() {
                    return fail(env, request_id, CartError::NotFound {
                        operation: Operation::UpdateAmount,
                        product_id,
                    });
                }

                let items = state
                    .items
                    .iter()
                    .map(|item| {
                        let mut item = item.clone();
                        if item.id == product_id {
                            item.amount = amount;
                        }
                        item
                    })
                    .collect();
                commit(state, env, request_id, Operation::UpdateAmount, product_id, items)
            },

            CartAction::LookupFailed { request_id, error } => fail(env, request_id, error),

            // Announcements for observers; the request is already settled
            CartAction::CartCommitted { .. }
            | CartAction::CommandFailed { .. }
            | CartAction::CommandIgnored { .. } => SmallVec::new(),
        }
    }
}

/// Fetch stock for an add and, when the item is new and the pre-check
/// passes, its catalog entry.
///
/// The pre-check only avoids a pointless catalog call; the authoritative
/// check happens again when `AddChecked` is reduced.
fn check_add(
    env: &CartEnvironment,
    request_id: RequestId,
    product_id: ProductId,
    in_cart: bool,
    current: u32,
) -> Effect<CartAction> {
    let stock = Arc::clone(&env.stock);
    let catalog = Arc::clone(&env.catalog);

    async_effect! {
        let failed = |source| CartAction::LookupFailed {
            request_id,
            error: CartError::Collaborator {
                operation: Operation::Add,
                product_id,
                source,
            },
        };

        let record = match stock.stock(product_id).await {
            Ok(record) => record,
            Err(error) => return Some(failed(CollaboratorError::Stock(error))),
        };

        let product = if !in_cart && current < record.amount {
            match catalog.product(product_id).await {
                Ok(product) => Some(product),
                Err(error) => return Some(failed(CollaboratorError::Catalog(error))),
            }
        } else {
            None
        };

        Some(CartAction::AddChecked {
            request_id,
            product_id,
            stock: record,
            product,
        })
    }
}

fn apply_add(
    state: &mut CartState,
    env: &CartEnvironment,
    request_id: RequestId,
    product_id: ProductId,
    stock: StockRecord,
    product: Option<CatalogProduct>,
) -> Effects {
    let current = state.amount_of(product_id);
    let requested = u64::from(current) + 1;

    if requested > u64::from(stock.amount) {
        return fail(env, request_id, CartError::OutOfStock {
            product_id,
            requested,
            available: stock.amount,
        });
    }

    let items = if state.get(product_id).is_some() {
        state
            .items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                if item.id == product_id {
                    item.amount = current + 1;
                }
                item
            })
            .collect()
    } else if let Some(product) = product {
        let mut items = state.items.clone();
        items.push(Product::from_catalog(product));
        items
    } else {
        // Removed while the stock lookup was in flight; fetch the entry now
        tracing::debug!(%request_id, %product_id, "Item left the cart during validation");
        let catalog = Arc::clone(&env.catalog);
        return smallvec![async_effect! {
            match catalog.product(product_id).await {
                Ok(product) => Some(CartAction::AddChecked {
                    request_id,
                    product_id,
                    stock,
                    product: Some(product),
                }),
                Err(error) => Some(CartAction::LookupFailed {
                    request_id,
                    error: CartError::Collaborator {
                        operation: Operation::Add,
                        product_id,
                        source: CollaboratorError::Catalog(error),
                    },
                }),
            }
        }];
    };

    commit(state, env, request_id, Operation::Add, product_id, items)
}

/// Persist `items`, then apply and publish them.
fn commit(
    state: &mut CartState,
    env: &CartEnvironment,
    request_id: RequestId,
    operation: Operation,
    product_id: ProductId,
    items: Vec<Product>,
) -> Effects {
    let claim = env.pending.claim(request_id);
    if matches!(claim, Claim::Abandoned) {
        return abandoned(request_id);
    }

    if let Err(error) = env.storage.save(&items) {
        return reject(env, claim, request_id, CartError::Collaborator {
            operation,
            product_id,
            source: CollaboratorError::Storage(error),
        });
    }

    state.items.clone_from(&items);
    env.feed.publish(items.clone());
    CartMetrics::record_commit();
    tracing::debug!(%request_id, %operation, %product_id, unique_items = items.len(), "Cart committed");

    claim.resolve(Ok(()));
    smallvec![Effect::send(CartAction::CartCommitted { request_id, items })]
}

fn fail(env: &CartEnvironment, request_id: RequestId, error: CartError) -> Effects {
    match env.pending.claim(request_id) {
        Claim::Abandoned => abandoned(request_id),
        claim => reject(env, claim, request_id, error),
    }
}

/// Report `error` once and settle the request with it
fn reject(env: &CartEnvironment, claim: Claim, request_id: RequestId, error: CartError) -> Effects {
    tracing::warn!(%request_id, %error, "Cart command rejected");
    CartMetrics::record_rejection(error.kind().as_str());
    env.notifier.notify(&error);

    claim.resolve(Err(error.clone()));
    smallvec![Effect::send(CartAction::CommandFailed { request_id, error })]
}

fn ignore(env: &CartEnvironment, request_id: RequestId) -> Effects {
    match env.pending.claim(request_id) {
        Claim::Abandoned => abandoned(request_id),
        claim => {
            claim.resolve(Ok(()));
            smallvec![Effect::send(CartAction::CommandIgnored { request_id })]
        },
    }
}

fn abandoned(request_id: RequestId) -> Effects {
    tracing::debug!(%request_id, "Dropping request abandoned by its caller");
    SmallVec::new()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::environment::{CartStorage, KeyValueStore};
    use crate::error::{ErrorKind, LookupError};
    use crate::mocks::{InMemoryKeyValueStore, MockProductCatalog, MockStockOracle, RecordingNotifier};
    use rocket_cart_testing::{ReducerTest, assertions};

    const KEY: &str = "@rocket-cart:cart";

    struct Fixture {
        stock: MockStockOracle,
        catalog: MockProductCatalog,
        storage: InMemoryKeyValueStore,
        notifier: RecordingNotifier,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                stock: MockStockOracle::new().with_stock(1, 5).with_stock(2, 1),
                catalog: MockProductCatalog::new()
                    .with_product(1, "Sneaker", 179.9)
                    .with_product(2, "Boot", 219.0),
                storage: InMemoryKeyValueStore::new(),
                notifier: RecordingNotifier::new(),
            }
        }

        fn env(&self) -> CartEnvironment {
            CartEnvironment::new(
                Arc::new(self.stock.clone()),
                Arc::new(self.catalog.clone()),
                CartStorage::new(Arc::new(self.storage.clone()), KEY),
                Arc::new(self.notifier.clone()),
            )
        }

        fn persisted(&self) -> Option<Vec<Product>> {
            self.storage
                .raw(KEY)
                .map(|raw| serde_json::from_str(&raw).unwrap())
        }
    }

    fn req(n: u64) -> RequestId {
        RequestId::new(n)
    }

    fn pid(n: u64) -> ProductId {
        ProductId::new(n)
    }

    fn item(id: u64, amount: u32) -> Product {
        Product {
            id: pid(id),
            attributes: serde_json::Map::new(),
            amount,
        }
    }

    fn stock(id: u64, amount: u32) -> StockRecord {
        StockRecord { id: pid(id), amount }
    }

    fn failure(actions: &[CartAction]) -> &CartError {
        match actions {
            [CartAction::CommandFailed { error, .. }] => error,
            other => panic!("expected a single CommandFailed, got {other:?}"),
        }
    }

    fn lookup_failure(actions: &[CartAction]) -> &CartError {
        match actions {
            [CartAction::LookupFailed { error, .. }] => error,
            other => panic!("expected a single LookupFailed, got {other:?}"),
        }
    }

    #[test]
    fn add_new_item_fetches_stock_then_catalog() {
        let fx = Fixture::new();
        let stock_calls = fx.stock.clone();
        let catalog_calls = fx.catalog.clone();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::AddProduct {
                request_id: req(1),
                product_id: pid(1),
            })
            .then_state(|state| assert!(state.is_empty()))
            .then_effects(assertions::assert_has_future_effect)
            .then_emits(move |actions| {
                let [CartAction::AddChecked { stock, product, .. }] = actions else {
                    panic!("expected AddChecked, got {actions:?}");
                };
                assert_eq!(stock.amount, 5);
                assert_eq!(product.as_ref().map(|p| p.id), Some(pid(1)));
                assert_eq!(stock_calls.calls(), 1);
                assert_eq!(catalog_calls.calls(), 1);
            })
            .run();
    }

    #[test]
    fn add_existing_item_skips_catalog() {
        let fx = Fixture::new();
        let catalog_calls = fx.catalog.clone();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 2)]))
            .when_action(CartAction::AddProduct {
                request_id: req(1),
                product_id: pid(1),
            })
            .then_emits(move |actions| {
                assert!(matches!(
                    actions,
                    [CartAction::AddChecked { product: None, .. }]
                ));
                assert_eq!(catalog_calls.calls(), 0);
            })
            .run();
    }

    #[test]
    fn add_out_of_stock_never_queries_catalog() {
        let fx = Fixture::new();
        fx.stock.set_stock(3, 0);
        let catalog_calls = fx.catalog.clone();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::AddProduct {
                request_id: req(1),
                product_id: pid(3),
            })
            .then_emits(move |actions| {
                assert!(matches!(
                    actions,
                    [CartAction::AddChecked { product: None, .. }]
                ));
                assert_eq!(catalog_calls.calls(), 0);
            })
            .run();
    }

    #[test]
    fn add_stock_failure_is_add_failed() {
        let fx = Fixture::new();
        fx.stock.fail_for(2);

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::AddProduct {
                request_id: req(1),
                product_id: pid(2),
            })
            .then_emits(|actions| {
                let error = lookup_failure(actions);
                assert_eq!(error.kind(), ErrorKind::CollaboratorFailure);
                assert_eq!(error.user_message(), "Failed to add product");
            })
            .run();
    }

    #[test]
    fn add_catalog_failure_is_add_failed() {
        let fx = Fixture::new();
        fx.catalog.fail_for(1);

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::AddProduct {
                request_id: req(1),
                product_id: pid(1),
            })
            .then_emits(|actions| {
                assert!(matches!(
                    lookup_failure(actions),
                    CartError::Collaborator {
                        source: CollaboratorError::Catalog(LookupError::Status { status: 503 }),
                        ..
                    }
                ));
            })
            .run();
    }

    #[test]
    fn add_checked_appends_and_persists() {
        let fx = Fixture::new();
        let catalog_entry: CatalogProduct =
            serde_json::from_str(r#"{"id":1,"title":"Sneaker","amount":99}"#).unwrap();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(2, 1)]))
            .when_action(CartAction::AddChecked {
                request_id: req(1),
                product_id: pid(1),
                stock: stock(1, 5),
                product: Some(catalog_entry),
            })
            .then_state(|state| {
                assert_eq!(state.items.len(), 2);
                assert_eq!(state.items[0].id, pid(2));
                assert_eq!(state.items[1].id, pid(1));
                assert_eq!(state.items[1].amount, 1);
                assert_eq!(state.items[1].title(), Some("Sneaker"));
            })
            .then_emits(|actions| {
                assert!(matches!(actions, [CartAction::CartCommitted { items, .. }] if items.len() == 2));
            })
            .run();

        assert_eq!(fx.persisted().unwrap().len(), 2);
    }

    #[test]
    fn add_checked_increments_in_place() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1), item(2, 1)]))
            .when_action(CartAction::AddChecked {
                request_id: req(1),
                product_id: pid(1),
                stock: stock(1, 5),
                product: None,
            })
            .then_state(|state| {
                assert_eq!(state.items, vec![item(1, 2), item(2, 1)]);
            })
            .run();
    }

    #[test]
    fn add_checked_rechecks_against_current_amount() {
        let fx = Fixture::new();
        let notifier = fx.notifier.clone();

        // Stock was validated for amount 2, but a concurrent add already took it there
        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 2)]))
            .when_action(CartAction::AddChecked {
                request_id: req(1),
                product_id: pid(1),
                stock: stock(1, 2),
                product: None,
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 2)]))
            .then_emits(move |actions| {
                assert_eq!(
                    failure(actions),
                    &CartError::OutOfStock {
                        product_id: pid(1),
                        requested: 3,
                        available: 2,
                    }
                );
                assert_eq!(notifier.messages(), vec!["Requested quantity is out of stock"]);
            })
            .run();

        assert_eq!(fx.storage.write_count(), 0);
    }

    #[test]
    fn add_checked_for_item_removed_meanwhile_fetches_catalog() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::AddChecked {
                request_id: req(1),
                product_id: pid(1),
                stock: stock(1, 5),
                product: None,
            })
            .then_state(|state| assert!(state.is_empty()))
            .then_emits(|actions| {
                assert!(matches!(
                    actions,
                    [CartAction::AddChecked { product: Some(_), .. }]
                ));
            })
            .run();
    }

    #[test]
    fn remove_is_local_and_preserves_order() {
        let fx = Fixture::new();
        let stock_calls = fx.stock.clone();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1), item(2, 1), item(3, 4)]))
            .when_action(CartAction::RemoveProduct {
                request_id: req(1),
                product_id: pid(2),
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 1), item(3, 4)]))
            .then_emits(move |_| assert_eq!(stock_calls.calls(), 0))
            .run();

        assert_eq!(fx.persisted().unwrap(), vec![item(1, 1), item(3, 4)]);
    }

    #[test]
    fn remove_absent_is_not_found() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::RemoveProduct {
                request_id: req(1),
                product_id: pid(9),
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 1)]))
            .then_emits(|actions| {
                assert_eq!(failure(actions).user_message(), "Failed to remove product");
            })
            .run();

        assert_eq!(fx.storage.write_count(), 0);
    }

    #[test]
    fn update_non_positive_is_ignored() {
        for amount in [0, -3] {
            let fx = Fixture::new();
            let stock_calls = fx.stock.clone();

            ReducerTest::new(CartReducer)
                .with_env(fx.env())
                .given_state(CartState::new(vec![item(1, 2)]))
                .when_action(CartAction::UpdateProductAmount {
                    request_id: req(1),
                    product_id: pid(1),
                    amount,
                })
                .then_state(|state| assert_eq!(state.items, vec![item(1, 2)]))
                .then_emits(move |actions| {
                    assert_eq!(actions, [CartAction::CommandIgnored { request_id: req(1) }]);
                    assert_eq!(stock_calls.calls(), 0);
                })
                .run();
        }
    }

    #[test]
    fn update_fetches_stock() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::UpdateProductAmount {
                request_id: req(1),
                product_id: pid(1),
                amount: 4,
            })
            .then_emits(|actions| {
                assert_eq!(
                    actions,
                    [CartAction::UpdateChecked {
                        request_id: req(1),
                        product_id: pid(1),
                        amount: 4,
                        stock: stock(1, 5),
                    }]
                );
            })
            .run();
    }

    #[test]
    fn update_stock_failure_is_update_failed() {
        let fx = Fixture::new();
        fx.stock.fail_for(1);

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::UpdateProductAmount {
                request_id: req(1),
                product_id: pid(1),
                amount: 2,
            })
            .then_emits(|actions| {
                assert_eq!(
                    lookup_failure(actions).user_message(),
                    "Failed to update product quantity"
                );
            })
            .run();
    }

    #[test]
    fn update_checked_sets_amount() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1), item(2, 1)]))
            .when_action(CartAction::UpdateChecked {
                request_id: req(1),
                product_id: pid(1),
                amount: 5,
                stock: stock(1, 5),
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 5), item(2, 1)]))
            .run();
    }

    #[test]
    fn update_checked_over_stock_is_rejected() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::UpdateChecked {
                request_id: req(1),
                product_id: pid(1),
                amount: 10,
                stock: stock(1, 5),
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 1)]))
            .then_emits(|actions| {
                assert_eq!(failure(actions).kind(), ErrorKind::OutOfStock);
            })
            .run();
    }

    #[test]
    fn update_checked_absent_is_not_found() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::UpdateChecked {
                request_id: req(1),
                product_id: pid(1),
                amount: 2,
                stock: stock(1, 5),
            })
            .then_emits(|actions| {
                assert_eq!(
                    failure(actions),
                    &CartError::NotFound {
                        operation: Operation::UpdateAmount,
                        product_id: pid(1),
                    }
                );
            })
            .run();
    }

    #[test]
    fn failed_write_leaves_state_and_storage() {
        let fx = Fixture::new();
        fx.storage.set(KEY, r#"[{"id":1,"amount":1}]"#).unwrap();
        fx.storage.fail_writes(true);

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::RemoveProduct {
                request_id: req(1),
                product_id: pid(1),
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 1)]))
            .then_emits(|actions| {
                assert!(matches!(
                    failure(actions),
                    CartError::Collaborator {
                        source: CollaboratorError::Storage(_),
                        ..
                    }
                ));
            })
            .run();

        assert_eq!(fx.persisted().unwrap(), vec![item(1, 1)]);
    }

    #[test]
    fn commit_publishes_to_feed() {
        let fx = Fixture::new();
        let env = fx.env();
        let feed = env.feed.subscribe();

        ReducerTest::new(CartReducer)
            .with_env(env)
            .given_state(CartState::new(vec![item(1, 3)]))
            .when_action(CartAction::UpdateChecked {
                request_id: req(1),
                product_id: pid(1),
                amount: 1,
                stock: stock(1, 5),
            })
            .run();

        assert_eq!(*feed.borrow(), vec![item(1, 1)]);
    }

    #[test]
    fn lookup_failure_is_reported_once() {
        let fx = Fixture::new();
        let notifier = fx.notifier.clone();
        let error = CartError::Collaborator {
            operation: Operation::Add,
            product_id: pid(1),
            source: CollaboratorError::Stock(LookupError::Transport("reset".to_string())),
        };
        let expected = error.clone();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::default())
            .when_action(CartAction::LookupFailed {
                request_id: req(1),
                error,
            })
            .then_emits(move |actions| assert_eq!(failure(actions), &expected))
            .run();

        assert_eq!(notifier.messages(), vec!["Failed to add product"]);
    }

    #[test]
    fn announcements_have_no_effect() {
        let fx = Fixture::new();
        let notifier = fx.notifier.clone();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::CommandFailed {
                request_id: req(1),
                error: CartError::NotFound {
                    operation: Operation::Remove,
                    product_id: pid(1),
                },
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 1)]))
            .then_effects(assertions::assert_no_effects)
            .run();

        assert!(notifier.errors().is_empty());
    }

    #[test]
    fn waiting_caller_receives_the_outcome() {
        let fx = Fixture::new();
        let env = fx.env();
        let mut committed = env.pending.register(req(1));
        let mut rejected = env.pending.register(req(2));

        let mut state = CartState::new(vec![item(1, 1)]);
        let _ = CartReducer.reduce(
            &mut state,
            CartAction::RemoveProduct {
                request_id: req(1),
                product_id: pid(1),
            },
            &env,
        );
        let _ = CartReducer.reduce(
            &mut state,
            CartAction::RemoveProduct {
                request_id: req(2),
                product_id: pid(1),
            },
            &env,
        );

        assert_eq!(committed.try_recv().unwrap(), Ok(()));
        assert!(matches!(
            rejected.try_recv().unwrap(),
            Err(CartError::NotFound { .. })
        ));
        assert_eq!(env.pending.waiting(), 0);
    }

    #[test]
    fn abandoned_request_does_not_commit_or_notify() {
        let fx = Fixture::new();
        let env = fx.env();
        let _outcome = env.pending.register(req(1));
        assert!(env.pending.abandon(req(1)));

        ReducerTest::new(CartReducer)
            .with_env(env)
            .given_state(CartState::default())
            .when_action(CartAction::AddChecked {
                request_id: req(1),
                product_id: pid(1),
                stock: stock(1, 5),
                product: Some(serde_json::from_str(r#"{"id":1,"title":"Sneaker"}"#).unwrap()),
            })
            .then_state(|state| assert!(state.is_empty()))
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(fx.storage.write_count(), 0);
        assert!(fx.notifier.errors().is_empty());
    }

    #[test]
    fn abandoned_request_failure_is_silent() {
        let fx = Fixture::new();
        let env = fx.env();
        let _outcome = env.pending.register(req(1));
        assert!(env.pending.abandon(req(1)));

        ReducerTest::new(CartReducer)
            .with_env(env)
            .given_state(CartState::default())
            .when_action(CartAction::LookupFailed {
                request_id: req(1),
                error: CartError::Collaborator {
                    operation: Operation::Add,
                    product_id: pid(1),
                    source: CollaboratorError::Stock(LookupError::Status { status: 502 }),
                },
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        assert!(fx.notifier.errors().is_empty());
    }

    #[test]
    fn update_beyond_u32_reports_the_requested_amount() {
        let fx = Fixture::new();
        let requested = u64::from(u32::MAX) + 1;

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::UpdateChecked {
                request_id: req(1),
                product_id: pid(1),
                amount: requested,
                stock: stock(1, u32::MAX),
            })
            .then_state(|state| assert_eq!(state.items, vec![item(1, 1)]))
            .then_emits(move |actions| {
                assert_eq!(
                    failure(actions),
                    &CartError::OutOfStock {
                        product_id: pid(1),
                        requested,
                        available: u32::MAX,
                    }
                );
            })
            .run();

        assert_eq!(fx.storage.write_count(), 0);
    }

    #[test]
    fn update_command_keeps_large_amounts() {
        let fx = Fixture::new();

        ReducerTest::new(CartReducer)
            .with_env(fx.env())
            .given_state(CartState::new(vec![item(1, 1)]))
            .when_action(CartAction::UpdateProductAmount {
                request_id: req(1),
                product_id: pid(1),
                amount: i64::MAX,
            })
            .then_emits(|actions| {
                assert!(matches!(
                    actions,
                    [CartAction::UpdateChecked { amount, .. }] if *amount == i64::MAX.unsigned_abs()
                ));
            })
            .run();
    }
}
